//! Pipeline Translation Tests
//!
//! Tests for lowering operation chains into aggregation pipelines:
//! - One stage per operation, in append order
//! - Stage shapes for every operation
//! - Field path resolution through the mapping
//! - Compile-time rejection of unsupported shapes

use std::sync::Arc;

use aeroquery::config::{ConnectiveFlattening, QueryConfig};
use aeroquery::driver::MemoryDriver;
use aeroquery::expression::{field, lit, new_object, Expr, Literal};
use aeroquery::mapping::{EntityMapping, MappingRegistry};
use aeroquery::query::{QueryError, Queryable};
use aeroquery::translation::TranslationError;
use aeroquery::Entity;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct User {
    id: String,
    name: String,
    age: i64,
    active: bool,
}

impl Entity for User {
    const ENTITY_TYPE: &'static str = "User";
}

fn mapping() -> MappingRegistry {
    MappingRegistry::new()
        .with(
            EntityMapping::new("User")
                .members(["Id", "Name", "Age", "Active", "Created", "Tags"])
                .renamed("Key", "_id")
                .renamed("Email", "email_address")
                .nested("Address", "Address"),
        )
        .with(
            EntityMapping::new("Address")
                .members(["City"])
                .renamed("PostCode", "zip"),
        )
}

fn users() -> Queryable<User> {
    users_with(QueryConfig::default())
}

fn users_with(config: QueryConfig) -> Queryable<User> {
    let driver = Arc::new(MemoryDriver::default());
    Queryable::new(driver, Arc::new(mapping())).with_config(config)
}

fn stages(query: &Queryable<User>) -> Value {
    Value::Array(query.pipeline().unwrap().to_documents())
}

fn translation_error(query: &Queryable<User>) -> TranslationError {
    match query.to_query() {
        Err(QueryError::Translation(err)) => err,
        other => panic!("expected translation error, got {:?}", other),
    }
}

// =============================================================================
// Operation Stage Tests
// =============================================================================

#[test]
fn test_where_equality() {
    let query = users().filter(field("Id").eq(""));
    assert_eq!(stages(&query), json!([{ "$match": { "Id": { "$eq": "" } } }]));
}

#[test]
fn test_order_by_ascending_and_descending() {
    assert_eq!(
        stages(&users().order_by(field("Id"))),
        json!([{ "$sort": { "Id": 1 } }])
    );
    assert_eq!(
        stages(&users().order_by_descending(field("Id"))),
        json!([{ "$sort": { "Id": -1 } }])
    );
}

#[test]
fn test_select_member() {
    assert_eq!(
        stages(&users().select(field("Id"))),
        json!([{ "$project": { "Id": "$Id", "_id": 0 } }])
    );
}

#[test]
fn test_select_object_construction() {
    let query = users().select(new_object([("CustomPropertyName", field("Id"))]));
    assert_eq!(
        stages(&query),
        json!([{ "$project": { "CustomPropertyName": "$Id", "_id": 0 } }])
    );
}

#[test]
fn test_skip_and_take() {
    assert_eq!(stages(&users().skip(5)), json!([{ "$skip": 5 }]));
    assert_eq!(stages(&users().take(5)), json!([{ "$limit": 5 }]));
}

#[test]
fn test_stage_count_and_order_follow_appends() {
    let query = users()
        .take(20)
        .filter(field("Age").gte(18))
        .order_by(field("Name"))
        .order_by_descending(field("Age"))
        .skip(2)
        .select(field("Name"));

    assert_eq!(
        stages(&query),
        json!([
            { "$limit": 20 },
            { "$match": { "Age": { "$gte": 18 } } },
            { "$sort": { "Name": 1 } },
            { "$sort": { "Age": -1 } },
            { "$skip": 2 },
            { "$project": { "Name": "$Name", "_id": 0 } }
        ])
    );
}

#[test]
fn test_to_query_string_is_stable() {
    let query = users().filter(field("Id").eq("")).select(field("Id"));
    let first = query.to_query().unwrap();
    let second = query.to_query().unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first,
        r#"[{"$match":{"Id":{"$eq":""}}},{"$project":{"Id":"$Id","_id":0}}]"#
    );
}

#[test]
fn test_empty_chain_is_empty_pipeline() {
    assert_eq!(users().to_query().unwrap(), "[]");
}

// =============================================================================
// Field Path Tests
// =============================================================================

#[test]
fn test_renamed_and_nested_paths() {
    let query = users()
        .filter(field("Email").eq("ada@example.com"))
        .filter(field("Address.PostCode").eq("N1"))
        .order_by(field("Address.City"));

    assert_eq!(
        stages(&query),
        json!([
            { "$match": { "email_address": { "$eq": "ada@example.com" } } },
            { "$match": { "Address.zip": { "$eq": "N1" } } },
            { "$sort": { "Address.City": 1 } }
        ])
    );
}

#[test]
fn test_explicit_id_projection_keeps_id() {
    let query = users().select(new_object([("_id", field("Key")), ("Name", field("Name"))]));
    assert_eq!(
        stages(&query),
        json!([{ "$project": { "_id": "$_id", "Name": "$Name" } }])
    );
}

#[test]
fn test_operations_after_select_use_projected_names() {
    let query = users()
        .select(new_object([("Who", field("Name")), ("Years", field("Age"))]))
        .filter(field("Years").gt(30))
        .order_by(field("Who"));

    assert_eq!(
        stages(&query),
        json!([
            { "$project": { "Who": "$Name", "Years": "$Age", "_id": 0 } },
            { "$match": { "Years": { "$gt": 30 } } },
            { "$sort": { "Who": 1 } }
        ])
    );

    let err = translation_error(&users().select(field("Name")).order_by(field("Age")));
    assert_eq!(err, TranslationError::unknown_field("projection", "Age"));
}

#[test]
fn test_projected_paths_resolve_every_segment() {
    let err = translation_error(
        &users()
            .select(new_object([("A", field("Id"))]))
            .filter(field("A.Bogus.Deeper").eq(1)),
    );
    assert_eq!(err, TranslationError::unknown_field("projection.A", "Bogus"));

    let err = translation_error(
        &users()
            .select(new_object([("Where", new_object([("Town", field("Address.City"))]))]))
            .order_by(field("Where.City")),
    );
    assert_eq!(err, TranslationError::unknown_field("projection.Where", "City"));
}

#[test]
fn test_projected_entity_member_keeps_renames() {
    let query = users()
        .select(new_object([("Home", field("Address")), ("Name", field("Name"))]))
        .filter(field("Home.PostCode").eq("N1"))
        .order_by(field("Home.City"));

    assert_eq!(
        stages(&query),
        json!([
            { "$project": { "Home": "$Address", "Name": "$Name", "_id": 0 } },
            { "$match": { "Home.zip": { "$eq": "N1" } } },
            { "$sort": { "Home.City": 1 } }
        ])
    );

    let err = translation_error(
        &users()
            .select(field("Address"))
            .filter(field("Address.Country").eq(1)),
    );
    assert_eq!(err, TranslationError::unknown_field("Address", "Country"));
}

// =============================================================================
// Predicate Grammar Tests
// =============================================================================

#[test]
fn test_constant_on_left_is_mirrored() {
    let query = users().filter(lit(18).lte(field("Age")));
    assert_eq!(
        stages(&query),
        json!([{ "$match": { "Age": { "$gte": 18 } } }])
    );
}

#[test]
fn test_connective_flattening_modes() {
    let predicate = field("Age")
        .gt(18)
        .and(field("Active").eq(true))
        .and(field("Name").ne("root"));

    let nested = users_with(QueryConfig::default().with_flattening(ConnectiveFlattening::Nested))
        .filter(predicate.clone());
    assert_eq!(
        stages(&nested),
        json!([{ "$match": { "$and": [
            { "$and": [
                { "Age": { "$gt": 18 } },
                { "Active": { "$eq": true } }
            ]},
            { "Name": { "$ne": "root" } }
        ]}}])
    );

    let flat = users().filter(predicate.clone());
    assert_eq!(
        stages(&flat),
        json!([{ "$match": { "$and": [
            { "Age": { "$gt": 18 } },
            { "Active": { "$eq": true } },
            { "Name": { "$ne": "root" } }
        ]}}])
    );

    let merged = users_with(QueryConfig::default().with_flattening(ConnectiveFlattening::Merge))
        .filter(predicate);
    assert_eq!(
        stages(&merged),
        json!([{ "$match": {
            "Age": { "$gt": 18 },
            "Active": { "$eq": true },
            "Name": { "$ne": "root" }
        }}])
    );
}

#[test]
fn test_merge_falls_back_on_repeated_field() {
    let query = users_with(QueryConfig::default().with_flattening(ConnectiveFlattening::Merge))
        .filter(field("Age").gt(18).and(field("Age").lt(65)));
    assert_eq!(
        stages(&query),
        json!([{ "$match": { "$and": [
            { "Age": { "$gt": 18 } },
            { "Age": { "$lt": 65 } }
        ]}}])
    );
}

#[test]
fn test_or_and_negation() {
    let query = users().filter(
        field("Name")
            .eq("Ada")
            .or(field("Name").eq("Grace"))
            .and(field("Active").not()),
    );
    assert_eq!(
        stages(&query),
        json!([{ "$match": { "$and": [
            { "$or": [
                { "Name": { "$eq": "Ada" } },
                { "Name": { "$eq": "Grace" } }
            ]},
            { "Active": { "$ne": true } }
        ]}}])
    );

    let query = users().filter(field("Age").lt(18).not());
    assert_eq!(
        stages(&query),
        json!([{ "$match": { "$nor": [{ "Age": { "$lt": 18 } }] } }])
    );
}

#[test]
fn test_contains_lowers_to_in() {
    let query = users().filter(lit(Literal::array(["a", "b"])).contains(field("Id")));
    assert_eq!(
        stages(&query),
        json!([{ "$match": { "Id": { "$in": ["a", "b"] } } }])
    );
}

#[test]
fn test_extended_literals() {
    let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let query = users()
        .filter(field("Created").gte(created))
        .filter(field("Key").eq(Uuid::nil()))
        .filter(field("Key").eq(Literal::object_id("507F1F77BCF86CD799439011").unwrap()))
        .filter(field("Name").eq(Literal::Null));

    assert_eq!(
        stages(&query),
        json!([
            { "$match": { "Created": { "$gte": { "$date": "2024-01-02T03:04:05.000Z" } } } },
            { "$match": { "_id": { "$eq": { "$uuid": "00000000-0000-0000-0000-000000000000" } } } },
            { "$match": { "_id": { "$eq": { "$oid": "507f1f77bcf86cd799439011" } } } },
            { "$match": { "Name": { "$eq": null } } }
        ])
    );
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_unknown_field() {
    let err = translation_error(&users().filter(field("Missing").eq(1)));
    assert_eq!(err, TranslationError::unknown_field("User", "Missing"));

    let err = translation_error(&users().order_by(field("Address.Country")));
    assert_eq!(err, TranslationError::unknown_field("Address", "Country"));
}

#[test]
fn test_unsupported_shapes() {
    let cases: Vec<Queryable<User>> = vec![
        users().filter(lit(1).eq(1)),
        users().filter(field("Age").eq(field("Id"))),
        users().filter(field("Name").call("starts_with", vec![lit("A")])),
        users().order_by(lit("Name")),
        users().select(Expr::Parameter),
        users().filter(field("Age").eq(f64::NAN)),
        users().select(new_object([("Score", lit(f64::INFINITY))])),
    ];

    for query in cases {
        let err = translation_error(&query);
        assert!(
            matches!(err, TranslationError::UnsupportedExpression(_)),
            "{:?}",
            err
        );
        assert_eq!(err.code(), "AERO_TRANSLATION_UNSUPPORTED_EXPRESSION");
    }
}

#[test]
fn test_invalid_counts() {
    for query in [users().skip(-1), users().take(1.5), users().take(field("Age"))] {
        let err = translation_error(&query);
        assert_eq!(err.code(), "AERO_TRANSLATION_INVALID_ARGUMENT");
    }
}

#[test]
fn test_failure_anywhere_fails_whole_chain() {
    let query = users()
        .filter(field("Age").gt(1))
        .order_by(field("Missing"))
        .take(3);
    assert!(query.pipeline().is_err());
}

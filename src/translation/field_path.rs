//! Field path resolution
//!
//! Turns a member-access chain into the dotted field name used in pipeline
//! stages, consulting the field mapping for renamed members. After a
//! `Select`, paths resolve against the projected shape instead.

use crate::expression::Expr;
use crate::mapping::FieldMapping;

use super::errors::{TranslationError, TranslationResult};

/// Shape of a member in the output of a `Select`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectedShape {
    /// A value with no members of its own
    Scalar,
    /// A copied entity-typed member; deeper access resolves through the mapping
    Entity(String),
    /// A constructed document, members in projection order
    Document(Vec<(String, ProjectedShape)>),
}

impl ProjectedShape {
    /// Returns the named member of a document shape
    pub fn member(&self, name: &str) -> Option<&ProjectedShape> {
        match self {
            ProjectedShape::Document(members) => members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, shape)| shape),
            _ => None,
        }
    }
}

/// What member accesses resolve against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldScope {
    /// Documents of a mapped entity type
    Entity(String),
    /// Output of a shape-changing `Select`
    Projection(ProjectedShape),
}

impl FieldScope {
    /// Returns true while results still have the tracked entity's shape
    pub fn is_entity(&self) -> bool {
        matches!(self, FieldScope::Entity(_))
    }
}

/// Resolves member chains to dotted wire paths
pub struct FieldPathResolver<'a> {
    mapping: &'a dyn FieldMapping,
}

impl<'a> FieldPathResolver<'a> {
    pub fn new(mapping: &'a dyn FieldMapping) -> Self {
        Self { mapping }
    }

    /// Resolves `chain` (root first) against `scope`.
    ///
    /// Pure: same chain and mapping → same path. Every segment must resolve.
    pub fn resolve(&self, scope: &FieldScope, chain: &[&str]) -> TranslationResult<String> {
        self.walk(scope, chain).map(|(path, _)| path)
    }

    /// Describes the documents yielded by `Select { projection }` over `scope`
    pub fn projected_scope(
        &self,
        scope: &FieldScope,
        projection: &Expr,
    ) -> TranslationResult<FieldScope> {
        let shape = match projection {
            // A bare member lands under its own wire path
            Expr::Member { .. } => {
                let (path, leaf) = self.walk(scope, &member_chain(projection)?)?;
                path.rsplit('.').fold(leaf, |inner, segment| {
                    ProjectedShape::Document(vec![(segment.to_string(), inner)])
                })
            }
            other => self.shape_of(scope, other)?,
        };
        Ok(FieldScope::Projection(shape))
    }

    fn shape_of(&self, scope: &FieldScope, expr: &Expr) -> TranslationResult<ProjectedShape> {
        match expr {
            Expr::New(members) => members
                .iter()
                .map(|(name, member)| Ok((name.clone(), self.shape_of(scope, member)?)))
                .collect::<TranslationResult<Vec<_>>>()
                .map(ProjectedShape::Document),
            Expr::Member { .. } => self
                .walk(scope, &member_chain(expr)?)
                .map(|(_, shape)| shape),
            _ => Ok(ProjectedShape::Scalar),
        }
    }

    fn walk(&self, scope: &FieldScope, chain: &[&str]) -> TranslationResult<(String, ProjectedShape)> {
        if chain.is_empty() {
            return Err(TranslationError::unsupported("empty member chain"));
        }

        match scope {
            FieldScope::Entity(entity_type) => {
                self.walk_entity(entity_type, entity_type.clone(), chain, Vec::new())
            }
            FieldScope::Projection(root) => self.walk_projection(root, chain),
        }
    }

    fn walk_entity(
        &self,
        entity_type: &str,
        mut declared_path: String,
        chain: &[&str],
        mut segments: Vec<String>,
    ) -> TranslationResult<(String, ProjectedShape)> {
        let mut owner = Some(entity_type.to_string());

        for member in chain {
            // A scalar member has no members of its own
            let owner_type = owner
                .take()
                .ok_or_else(|| TranslationError::unknown_field(&declared_path, *member))?;

            let mapped = self
                .mapping
                .resolve(&owner_type, member)
                .ok_or_else(|| TranslationError::unknown_field(&owner_type, *member))?;

            segments.push(mapped.wire_name(member).to_string());
            declared_path.push('.');
            declared_path.push_str(member);
            owner = mapped.nested_type;
        }

        let shape = owner.map_or(ProjectedShape::Scalar, ProjectedShape::Entity);
        Ok((segments.join("."), shape))
    }

    fn walk_projection(
        &self,
        root: &ProjectedShape,
        chain: &[&str],
    ) -> TranslationResult<(String, ProjectedShape)> {
        let mut node = root;
        let mut declared_path = String::from("projection");

        for (depth, member) in chain.iter().enumerate() {
            match node {
                ProjectedShape::Entity(entity_type) => {
                    let segments = chain[..depth].iter().map(|s| s.to_string()).collect();
                    return self.walk_entity(entity_type, declared_path, &chain[depth..], segments);
                }
                ProjectedShape::Document(_) => {
                    node = node
                        .member(member)
                        .ok_or_else(|| TranslationError::unknown_field(&declared_path, *member))?;
                }
                ProjectedShape::Scalar => {
                    return Err(TranslationError::unknown_field(&declared_path, *member));
                }
            }
            declared_path.push('.');
            declared_path.push_str(member);
        }

        Ok((chain.join("."), node.clone()))
    }
}

fn member_chain(expr: &Expr) -> TranslationResult<Vec<&str>> {
    expr.member_chain().ok_or_else(|| {
        TranslationError::unsupported(format!("{} where a field was expected", expr.describe()))
    })
}

//! Query expression subsystem for aeroquery
//!
//! Closed expression grammar used by predicates, projections and sort keys.
//! Expressions are plain values built with ordinary constructors:
//!
//! ```
//! use aeroquery::expression::{field, lit, new_object};
//!
//! let predicate = field("Age").gte(18).and(field("Active").eq(true));
//! let shape = new_object([("CustomPropertyName", field("Id"))]);
//! let ids = lit(aeroquery::expression::Literal::array(["a", "b"])).contains(field("Id"));
//! # let _ = (predicate, shape, ids);
//! ```

mod ast;
mod literal;

pub use ast::{field, lit, new_object, CompareOp, Expr, LogicalOp};
pub use literal::Literal;

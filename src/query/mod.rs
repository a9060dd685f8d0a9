//! Query subsystem for aeroquery
//!
//! Deferred, chainable queries over typed entities.
//!
//! # Design Principles
//!
//! - Deferred: building a query never touches the driver
//! - Immutable: every append allocates a new node; prefixes are shared
//! - Shared processors: derived queries reuse the root's processor chain
//! - Tagged results: only `QueryItem::Entity` reaches processors
//!
//! ```ignore
//! let adults = users
//!     .filter(field("Age").gte(18))
//!     .order_by(field("Name"))
//!     .take(10);
//!
//! for user in adults.iter() {
//!     println!("{:?}", user?);
//! }
//! ```

mod errors;
mod operation;
mod provider;
mod queryable;
mod result;

pub use errors::{QueryError, QueryResult};
pub use operation::{OperationKind, QueryNode, QueryOperation};
pub use provider::{QueryCursor, QueryProvider};
pub use queryable::{Enumeration, QueryState, Queryable};
pub use result::QueryItem;

//! Ordered multi-strategy element resolution.
//!
//! Given the locator fields recorded with a step, this crate builds an
//! ordered list of candidate strategies and resolves them against a page
//! through the [`PageQuery`] port. The first strategy that yields a
//! visible element wins; later candidates are never consulted.

pub mod candidates;
pub mod resolver;
pub mod types;

pub use candidates::candidate_locators;
pub use resolver::{ElementResolver, LocatorError, PageQuery, QueryError, Resolved};
pub use types::{ElementHandle, LocatorKind, LocatorSpec, RoleHint};

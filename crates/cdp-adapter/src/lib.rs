//! Chromium DevTools Protocol adapter.
//!
//! Implements the engine's page ports on top of chromiumoxide: one
//! browser and one page per session, an element registry keyed by
//! opaque handles, and translation from locator strategies to concrete
//! CSS/XPath queries.

pub mod queries;
pub mod session;

pub use queries::{build_query, Query};
pub use session::{CdpSession, LaunchOptions, SessionError};

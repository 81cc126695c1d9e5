//! URL routing for the forum.
//!
//! Patterns use `{name}` placeholders with optional converters (`{id:int}`,
//! `{slug:slug}`). A trailing slash is optional on both sides, so
//! `/question/ask` and `/question/ask/` reach the same route.

pub mod pattern;
pub mod router;

pub use pattern::{PathPattern, PatternError};
pub use router::{Route, Router, path};

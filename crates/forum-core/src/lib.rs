//! Core types shared by every forum crate.
//!
//! The [`exception`] module defines the error taxonomy used from the storage layer
//! up to the HTTP surface. Each variant knows the status code it maps to, so the
//! HTTP crate can turn any failure into a response without matching on it.

pub mod exception;

pub use exception::{Error, FieldErrors, Result};

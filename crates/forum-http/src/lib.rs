//! HTTP abstractions for the forum.
//!
//! A [`Request`] flows through a [`MiddlewareChain`] into a [`Handler`] which
//! produces a [`Response`] or a [`forum_core::Error`]. Errors convert into JSON
//! responses carrying the status the error maps to.

pub mod extensions;
pub mod middleware;
pub mod request;
pub mod response;

pub use extensions::Extensions;
pub use forum_core::exception::{Error, Result};
pub use middleware::{FnHandler, Handler, Middleware, MiddlewareChain, handler_fn};
pub use request::{FormData, Request, RequestBuilder};
pub use response::Response;

pub use hyper::{HeaderMap, Method, StatusCode, Uri, Version};

//! HTTP server for the forum.
//!
//! [`HttpServer`] accepts TCP connections, serves each on its own task with
//! hyper's HTTP/1.1 connection driver, and stops accepting when the
//! [`ShutdownCoordinator`] fires.

pub mod http;
pub mod logging;
pub mod shutdown;

pub use http::{HttpServer, serve_with_shutdown};
pub use logging::LoggingMiddleware;
pub use shutdown::ShutdownCoordinator;

//! Middleware and handler traits for HTTP request processing.
//!
//! ## Handler
//!
//! ```rust
//! use forum_http::{Handler, Request, Response};
//! use async_trait::async_trait;
//!
//! struct About;
//!
//! #[async_trait]
//! impl Handler for About {
//!     async fn handle(&self, _request: Request) -> forum_core::Result<Response> {
//!         Ok(Response::ok().with_body("A small Q&A forum"))
//!     }
//! }
//! ```
//!
//! Plain async functions can be used through [`handler_fn`]:
//!
//! ```rust
//! use forum_http::{handler_fn, Request, Response};
//!
//! let handler = handler_fn(|_request: Request| async { Ok(Response::ok()) });
//! ```
//!
//! ## Middleware
//!
//! Middleware wraps the rest of the chain and may act before and after it.

use async_trait::async_trait;
use forum_core::exception::Result;
use std::future::Future;
use std::sync::Arc;

use crate::{Request, Response};

/// Handler trait for processing requests.
#[async_trait]
pub trait Handler: Send + Sync {
	/// Handles an HTTP request and produces a response.
	///
	/// # Errors
	///
	/// Returns an error if the request cannot be processed. Callers at the edge
	/// turn it into a response with `Response::from`.
	async fn handle(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request) -> Result<Response> {
		(**self).handle(request).await
	}
}

/// Handler backed by an async closure
pub struct FnHandler<F> {
	func: F,
}

/// Wrap an async function or closure as a [`Handler`]
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
	F: Fn(Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	FnHandler { func }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
	F: Fn(Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	async fn handle(&self, request: Request) -> Result<Response> {
		(self.func)(request).await
	}
}

/// Middleware trait for request/response processing.
#[async_trait]
pub trait Middleware: Send + Sync {
	/// Processes a request, calling `next` to continue the chain.
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response>;

	/// Whether this middleware runs for `request`. Defaults to always.
	fn should_continue(&self, _request: &Request) -> bool {
		true
	}
}

/// Composes middleware, in insertion order, around a final handler.
pub struct MiddlewareChain {
	middlewares: Vec<Arc<dyn Middleware>>,
	handler: Arc<dyn Handler>,
}

impl MiddlewareChain {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			middlewares: Vec::new(),
			handler,
		}
	}

	/// Add a middleware; the first one added sees the request first.
	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
		self.middlewares.push(middleware);
	}

	pub fn len(&self) -> usize {
		self.middlewares.len()
	}

	pub fn is_empty(&self) -> bool {
		self.middlewares.is_empty()
	}
}

#[async_trait]
impl Handler for MiddlewareChain {
	async fn handle(&self, request: Request) -> Result<Response> {
		if self.middlewares.is_empty() {
			return self.handler.handle(request).await;
		}

		let mut current_handler = self.handler.clone();

		let active_middlewares: Vec<_> = self
			.middlewares
			.iter()
			.rev()
			.filter(|mw| mw.should_continue(&request))
			.collect();

		for middleware in active_middlewares {
			current_handler = Arc::new(ComposedHandler {
				middleware: middleware.clone(),
				next: current_handler,
			});
		}

		current_handler.handle(request).await
	}
}

struct ComposedHandler {
	middleware: Arc<dyn Middleware>,
	next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for ComposedHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		self.middleware.process(request, self.next.clone()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use forum_core::Error;
	use rstest::rstest;

	struct MockHandler {
		response_body: String,
	}

	#[async_trait]
	impl Handler for MockHandler {
		async fn handle(&self, _request: Request) -> Result<Response> {
			Ok(Response::ok().with_body(self.response_body.clone()))
		}
	}

	struct PrefixMiddleware {
		prefix: String,
	}

	#[async_trait]
	impl Middleware for PrefixMiddleware {
		async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
			let response = next.handle(request).await?;
			let body = format!("{}{}", self.prefix, response.body_text());
			Ok(Response::ok().with_body(body))
		}
	}

	struct SkipOnPost;

	#[async_trait]
	impl Middleware for SkipOnPost {
		async fn process(&self, _request: Request, _next: Arc<dyn Handler>) -> Result<Response> {
			Err(Error::Forbidden("blocked".to_string()))
		}

		fn should_continue(&self, request: &Request) -> bool {
			request.method != hyper::Method::POST
		}
	}

	fn create_test_request(method: hyper::Method) -> Request {
		Request::builder().method(method).uri("/").build().unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_middleware_order() {
		// Arrange
		let handler = Arc::new(MockHandler {
			response_body: "body".to_string(),
		});
		let chain = MiddlewareChain::new(handler)
			.with_middleware(Arc::new(PrefixMiddleware {
				prefix: "outer-".to_string(),
			}))
			.with_middleware(Arc::new(PrefixMiddleware {
				prefix: "inner-".to_string(),
			}));

		// Act
		let response = chain
			.handle(create_test_request(hyper::Method::GET))
			.await
			.unwrap();

		// Assert
		assert_eq!(response.body_text(), "outer-inner-body");
	}

	#[rstest]
	#[tokio::test]
	async fn test_should_continue_skips_middleware() {
		let handler = Arc::new(MockHandler {
			response_body: "ok".to_string(),
		});
		let chain = MiddlewareChain::new(handler).with_middleware(Arc::new(SkipOnPost));

		let skipped = chain.handle(create_test_request(hyper::Method::POST)).await;
		let blocked = chain.handle(create_test_request(hyper::Method::GET)).await;

		assert_eq!(skipped.unwrap().body_text(), "ok");
		assert!(matches!(blocked, Err(Error::Forbidden(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_handler_fn() {
		let handler = handler_fn(|request: Request| async move {
			Ok(Response::ok().with_body(request.path().to_string()))
		});

		let response = handler
			.handle(Request::builder().uri("/about").build().unwrap())
			.await
			.unwrap();

		assert_eq!(response.body_text(), "/about");
	}
}

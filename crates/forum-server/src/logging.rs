use async_trait::async_trait;
use forum_core::exception::Result;
use forum_http::{Handler, Middleware, Request, Response};
use std::sync::Arc;
use std::time::Instant;

/// Emits one tracing event per request with method, path, status and duration.
pub struct LoggingMiddleware;

impl LoggingMiddleware {
	pub fn new() -> Self {
		Self
	}
}

impl Default for LoggingMiddleware {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Middleware for LoggingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let start = Instant::now();
		let method = request.method.to_string();
		let path = request.path().to_string();

		let result = next.handle(request).await;

		let elapsed_ms = start.elapsed().as_millis() as u64;
		match &result {
			Ok(response) => {
				tracing::info!(
					%method,
					%path,
					status = response.status.as_u16(),
					elapsed_ms,
					"request completed"
				);
			}
			Err(err) if err.is_server_error() => {
				tracing::error!(%method, %path, status = err.status_code(), elapsed_ms, error = %err, "request failed");
			}
			Err(err) => {
				tracing::info!(%method, %path, status = err.status_code(), elapsed_ms, error = %err, "request rejected");
			}
		}

		result
	}
}

use bytes::Bytes;
use forum_http::{Handler, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

use crate::shutdown::ShutdownCoordinator;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serves one handler, typically a full `MiddlewareChain`, over HTTP/1.1.
pub struct HttpServer {
	pub handler: Arc<dyn Handler>,
}

impl HttpServer {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self { handler }
	}

	/// Bind `addr` and serve until `coordinator` signals shutdown.
	pub async fn listen_with_shutdown(
		self,
		addr: SocketAddr,
		coordinator: ShutdownCoordinator,
	) -> Result<(), BoxError> {
		let listener = TcpListener::bind(addr).await?;
		tracing::info!(%addr, "server listening on http://{}", addr);
		self.serve(listener, coordinator).await
	}

	/// Serve on an already bound listener until shutdown.
	pub async fn serve(
		self,
		listener: TcpListener,
		coordinator: ShutdownCoordinator,
	) -> Result<(), BoxError> {
		let handler = self.handler;
		let mut shutdown_rx = coordinator.subscribe();

		loop {
			tokio::select! {
				result = listener.accept() => {
					let (stream, socket_addr) = match result {
						Ok(accepted) => accepted,
						Err(e) => {
							tracing::warn!(error = %e, "failed to accept connection");
							continue;
						}
					};
					let handler = handler.clone();
					let mut conn_shutdown = coordinator.subscribe();

					tokio::task::spawn(async move {
						tokio::select! {
							result = Self::handle_connection(stream, socket_addr, handler) => {
								if let Err(err) = result {
									tracing::debug!(peer = %socket_addr, error = %err, "connection error");
								}
							}
							_ = conn_shutdown.recv() => {
								tracing::debug!(peer = %socket_addr, "connection closed by shutdown");
							}
						}
					});
				}
				_ = shutdown_rx.recv() => {
					tracing::info!("shutdown signal received, stopping server");
					break;
				}
			}
		}

		Ok(())
	}

	pub async fn handle_connection(
		stream: TcpStream,
		socket_addr: SocketAddr,
		handler: Arc<dyn Handler>,
	) -> Result<(), BoxError> {
		let io = TokioIo::new(stream);
		let service = RequestService {
			handler,
			remote_addr: socket_addr,
		};

		http1::Builder::new().serve_connection(io, service).await?;

		Ok(())
	}
}

struct RequestService {
	handler: Arc<dyn Handler>,
	remote_addr: SocketAddr,
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = BoxError;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let handler = self.handler.clone();
		let remote_addr = self.remote_addr;

		Box::pin(async move {
			let (parts, body) = req.into_parts();
			let body_bytes = body.collect().await?.to_bytes();

			let mut request = Request::new(
				parts.method,
				parts.uri,
				parts.version,
				parts.headers,
				body_bytes,
			);
			request.remote_addr = Some(remote_addr);

			let response = handler
				.handle(request)
				.await
				.unwrap_or_else(Response::from);

			let mut hyper_response = hyper::Response::builder().status(response.status);
			for (key, value) in response.headers.iter() {
				hyper_response = hyper_response.header(key, value);
			}

			Ok(hyper_response.body(Full::new(response.body))?)
		})
	}
}

/// Serve `handler` on `addr` until `coordinator` fires
pub async fn serve_with_shutdown(
	addr: SocketAddr,
	handler: Arc<dyn Handler>,
	coordinator: ShutdownCoordinator,
) -> Result<(), BoxError> {
	HttpServer::new(handler)
		.listen_with_shutdown(addr, coordinator)
		.await
}

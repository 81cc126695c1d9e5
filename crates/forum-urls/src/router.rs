//! Method-aware router.

use crate::pattern::{PathPattern, PatternError};
use async_trait::async_trait;
use forum_core::exception::{Error, Result};
use forum_http::{Handler, Method, Request, Response};
use std::sync::Arc;

/// A pattern bound to a handler, with an optional name and method restriction.
pub struct Route {
	pattern: PathPattern,
	handler: Arc<dyn Handler>,
	name: Option<String>,
	methods: Option<Vec<Method>>,
}

impl Route {
	pub fn new(pattern: &str, handler: Arc<dyn Handler>) -> std::result::Result<Self, PatternError> {
		Ok(Self {
			pattern: PathPattern::new(pattern)?,
			handler,
			name: None,
			methods: None,
		})
	}

	/// Name used for reversing and listing
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Restrict the route to `methods`; other methods get 405
	pub fn methods(mut self, methods: &[Method]) -> Self {
		self.methods = Some(methods.to_vec());
		self
	}

	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	pub fn route_name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn allowed_methods(&self) -> Option<&[Method]> {
		self.methods.as_deref()
	}

	fn allows(&self, method: &Method) -> bool {
		match &self.methods {
			None => true,
			// HEAD is answered wherever GET is
			Some(methods) => {
				methods.contains(method) || (*method == Method::HEAD && methods.contains(&Method::GET))
			}
		}
	}
}

/// Shorthand for [`Route::new`] in route tables
pub fn path(
	pattern: &str,
	handler: Arc<dyn Handler>,
) -> std::result::Result<Route, PatternError> {
	Route::new(pattern, handler)
}

/// Dispatches requests to the first route whose pattern matches.
///
/// # Examples
///
/// ```
/// use forum_http::{handler_fn, Method, Request, Response};
/// use forum_urls::{path, Router};
/// use std::sync::Arc;
///
/// let about = Arc::new(handler_fn(|_req: Request| async { Ok(Response::ok()) }));
/// let router = Router::new().route(path("/about", about).unwrap().name("about").methods(&[Method::GET]));
///
/// assert_eq!(router.reverse("about", &[]).as_deref(), Some("/about"));
/// ```
#[derive(Default)]
pub struct Router {
	routes: Vec<Route>,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn route(mut self, route: Route) -> Self {
		self.routes.push(route);
		self
	}

	pub fn add_route(&mut self, route: Route) {
		self.routes.push(route);
	}

	pub fn routes(&self) -> &[Route] {
		&self.routes
	}

	/// Build the path of the route called `name`
	pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
		self.routes
			.iter()
			.find(|route| route.route_name() == Some(name))
			.and_then(|route| route.pattern.reverse(params))
	}

	/// Match `request`, filling in its path parameters
	fn resolve(&self, request: &mut Request) -> Result<Arc<dyn Handler>> {
		let path = request.path().to_string();
		let mut method_mismatch = false;

		for route in &self.routes {
			let Some(params) = route.pattern.matches(&path) else {
				continue;
			};
			if !route.allows(&request.method) {
				method_mismatch = true;
				continue;
			}
			for (key, value) in params {
				request.set_path_param(key, value);
			}
			return Ok(route.handler.clone());
		}

		if method_mismatch {
			Err(Error::MethodNotAllowed(format!(
				"{} {}",
				request.method, path
			)))
		} else {
			Err(Error::NotFound(format!("no route for {}", path)))
		}
	}
}

#[async_trait]
impl Handler for Router {
	async fn handle(&self, mut request: Request) -> Result<Response> {
		let handler = self.resolve(&mut request)?;
		tracing::debug!(method = %request.method, path = %request.path(), "route matched");
		handler.handle(request).await
	}
}

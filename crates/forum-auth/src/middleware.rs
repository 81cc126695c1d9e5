use crate::current_user::RequestUserExt;
use crate::remote_user::RemoteUserAuthentication;
use async_trait::async_trait;
use forum_core::exception::Result;
use forum_http::{Handler, Middleware, Request, Response};
use std::sync::Arc;

/// Resolves the [`CurrentUser`](crate::CurrentUser) for every request before
/// it reaches the router.
pub struct AuthenticationMiddleware {
	backend: Arc<RemoteUserAuthentication>,
}

impl AuthenticationMiddleware {
	pub fn new(backend: Arc<RemoteUserAuthentication>) -> Self {
		Self { backend }
	}
}

#[async_trait]
impl Middleware for AuthenticationMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let user = self.backend.authenticate(&request).await?;
		request.set_current_user(user);
		next.handle(request).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::migrations::MIGRATIONS;
	use crate::user::UserManager;
	use forum_db::{DatabaseConnection, Migrator};
	use forum_http::{MiddlewareChain, handler_fn};
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_handler_sees_resolved_user() {
		// Arrange
		let db = DatabaseConnection::connect_memory().await.unwrap();
		Migrator::new(db.clone())
			.with_migrations(MIGRATIONS.iter().copied())
			.migrate()
			.await
			.unwrap();
		let backend = Arc::new(RemoteUserAuthentication::new(UserManager::new(db)));
		let handler = Arc::new(handler_fn(|request: Request| async move {
			let name = request
				.current_user()
				.user()
				.map(|u| u.username.clone())
				.unwrap_or_else(|| "anonymous".to_string());
			Ok(Response::ok().with_body(name))
		}));
		let chain = MiddlewareChain::new(handler)
			.with_middleware(Arc::new(AuthenticationMiddleware::new(backend)));

		// Act
		let named = chain
			.handle(Request::builder().header("REMOTE_USER", "carol").build().unwrap())
			.await
			.unwrap();
		let anonymous = chain
			.handle(Request::builder().build().unwrap())
			.await
			.unwrap();

		// Assert
		assert_eq!(named.body_text(), "carol");
		assert_eq!(anonymous.body_text(), "anonymous");
	}
}

//! The identity a request acts as.

use crate::user::User;
use forum_core::exception::{Error, Result};
use forum_http::{Request, Response};

/// Who is making the request, as resolved by the authentication middleware.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CurrentUser {
	#[default]
	Anonymous,
	Authenticated(User),
}

impl CurrentUser {
	pub fn is_authenticated(&self) -> bool {
		matches!(self, CurrentUser::Authenticated(_))
	}

	pub fn user(&self) -> Option<&User> {
		match self {
			CurrentUser::Authenticated(user) => Some(user),
			CurrentUser::Anonymous => None,
		}
	}

	pub fn into_user(self) -> Option<User> {
		match self {
			CurrentUser::Authenticated(user) => Some(user),
			CurrentUser::Anonymous => None,
		}
	}

	pub fn id(&self) -> Option<i64> {
		self.user().map(|u| u.id)
	}
}

/// Access to the [`CurrentUser`] stored on a request
pub trait RequestUserExt {
	/// Resolved identity; anonymous when no middleware ran
	fn current_user(&self) -> CurrentUser;

	/// The authenticated user, or `Unauthenticated`
	fn require_user(&self) -> Result<User>;

	fn set_current_user(&self, user: CurrentUser);
}

impl RequestUserExt for Request {
	fn current_user(&self) -> CurrentUser {
		self.extensions.get::<CurrentUser>().unwrap_or_default()
	}

	fn require_user(&self) -> Result<User> {
		self.current_user()
			.into_user()
			.ok_or_else(|| Error::Unauthenticated(self.path().to_string()))
	}

	fn set_current_user(&self, user: CurrentUser) {
		self.extensions.insert(user);
	}
}

/// 302 to `login_url`, carrying `next` so the login page can send the user back
///
/// # Examples
///
/// ```
/// use forum_auth::redirect_to_login;
///
/// let response = redirect_to_login("/users/login/", "/question/ask");
///
/// assert_eq!(response.location(), Some("/users/login/?next=%2Fquestion%2Fask"));
/// ```
pub fn redirect_to_login(login_url: &str, next: &str) -> Response {
	let query = serde_urlencoded::to_string([("next", next)]).unwrap_or_default();
	let separator = if login_url.contains('?') { '&' } else { '?' };
	Response::redirect(format!("{}{}{}", login_url, separator, query))
}

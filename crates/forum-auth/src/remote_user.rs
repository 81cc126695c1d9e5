//! Remote User Authentication
//!
//! Trusts a header set by an upstream authentication layer (a reverse proxy's
//! auth module, an SSO gateway) and maps its value onto a local user row.

use crate::current_user::CurrentUser;
use crate::user::UserManager;
use forum_core::exception::Result;
use forum_http::Request;

pub struct RemoteUserAuthentication {
	header_name: String,
	create_unknown_user: bool,
	users: UserManager,
}

impl RemoteUserAuthentication {
	pub fn new(users: UserManager) -> Self {
		Self {
			header_name: "REMOTE_USER".to_string(),
			create_unknown_user: true,
			users,
		}
	}

	pub fn with_header(mut self, header: impl Into<String>) -> Self {
		self.header_name = header.into();
		self
	}

	/// Whether a username seen for the first time gets a local row
	pub fn create_unknown_user(mut self, create: bool) -> Self {
		self.create_unknown_user = create;
		self
	}

	pub fn header_name(&self) -> &str {
		&self.header_name
	}

	/// Resolve the request's identity. Missing or empty header means anonymous.
	pub async fn authenticate(&self, request: &Request) -> Result<CurrentUser> {
		let username = match request.header(&self.header_name).map(str::trim) {
			Some(name) if !name.is_empty() => name,
			_ => return Ok(CurrentUser::Anonymous),
		};

		let user = if self.create_unknown_user {
			Some(self.users.get_or_create(username).await?.0)
		} else {
			self.users.get_by_username(username).await?
		};

		match user {
			Some(user) if user.is_active => Ok(CurrentUser::Authenticated(user)),
			Some(user) => {
				tracing::debug!(user_id = user.id, "inactive user treated as anonymous");
				Ok(CurrentUser::Anonymous)
			}
			None => {
				tracing::debug!(%username, "unknown remote user treated as anonymous");
				Ok(CurrentUser::Anonymous)
			}
		}
	}
}

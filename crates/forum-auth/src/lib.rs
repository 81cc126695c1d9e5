//! Authentication for the forum.
//!
//! Registration, passwords and sessions live in an upstream layer that puts the
//! authenticated username in a trusted header. [`RemoteUserAuthentication`]
//! reads that header, mirrors the user into the local `users` table and
//! [`AuthenticationMiddleware`] exposes the result to handlers as a
//! [`CurrentUser`].

pub mod current_user;
pub mod middleware;
pub mod migrations;
pub mod remote_user;
pub mod user;

pub use current_user::{CurrentUser, RequestUserExt, redirect_to_login};
pub use middleware::AuthenticationMiddleware;
pub use migrations::MIGRATIONS;
pub use remote_user::RemoteUserAuthentication;
pub use user::{User, UserManager, Users};

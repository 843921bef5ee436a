//! Authentication: password hashing, signed session tokens, the user store,
//! credential checks and the cookie-based route guard.

pub mod guard;
pub mod handlers;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

/// Name of the HTTP-only cookie carrying the session token.
pub const AUTH_COOKIE: &str = "auth-token";

pub use guard::AuthUser;
pub use store::{PgUserStore, UserStore};
pub use token::{Claims, TokenKeys};

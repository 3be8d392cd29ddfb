//! Authentication and authorization for the WiMo gateway.
//!
//! - [`UserRepository`] / [`TokenRepository`]: validated access to the two
//!   entity collections through the persistence facade
//! - [`TokenCache`]: lock-free snapshot of known token strings
//! - [`Authenticator`]: `verify`, `issue`, credential exchange and the
//!   role-group permission check
//! - [`BearerAuth`] / [`BasicCredentials`]: axum extractors

mod authenticator;
pub mod cache;
mod error;
pub mod extractors;
pub mod repository;

pub use authenticator::{Authenticator, CredentialCheck, Principal};
pub use cache::{CacheState, TokenCache, TokenSnapshot};
pub use error::{AuthError, AuthResult, UNAUTHORIZED_ACCESS, UNAUTHORIZED_USER_LEVEL};
pub use extractors::{AuthState, BasicCredentials, BearerAuth, has_basic_auth};
pub use repository::{TokenRepository, UserRepository};

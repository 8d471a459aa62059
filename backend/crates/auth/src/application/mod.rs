//! Application Layer
//!
//! Token codec, principal resolution, the request access scope and the
//! authentication coordinator's use cases.

pub mod access_scope;
pub mod config;
pub mod coordinator;
pub mod login;
pub mod password_reset;
pub mod principal;
pub mod refresh;
pub mod register;
pub mod token_codec;
pub mod verify_email;

// Re-exports
pub use access_scope::AccessScope;
pub use config::{AuthConfig, TokenTtls};
pub use coordinator::{AuthenticationCoordinator, TokenPair, UserView};
pub use login::LoginInput;
pub use password_reset::ResetPasswordInput;
pub use principal::{Principal, PrincipalResolver};
pub use register::RegisterInput;
pub use token_codec::{Claims, SigningKey, SigningKeyError, TokenCodec, TokenError};

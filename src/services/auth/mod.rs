pub mod identity;
pub mod policy;
pub mod token;

pub use identity::{Identity, UserId};
pub use policy::{AccessPolicy, AllowedRoles};
pub use token::{TokenError, TokenVerifier};

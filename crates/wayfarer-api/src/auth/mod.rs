pub mod identity;
pub mod middleware;
pub mod models;

pub use identity::{HttpIdentityProvider, IdentityProvider};
pub use models::{AdminContext, CurrentUser, User};

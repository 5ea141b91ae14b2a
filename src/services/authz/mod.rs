pub mod engine;
pub mod error;
pub mod tenant;
pub mod token;

pub use engine::{AuthzDecision, AuthzEngine};
pub use error::AuthzError;
pub use token::TokenPolicy;

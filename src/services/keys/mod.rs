pub mod jwks;
pub mod resolver;
pub mod source;

pub use jwks::{KeySet, SigningKey};
pub use resolver::{KeyResolver, keycloak_certs_url};
pub use source::{KeyError, KeyFetchError, KeySource};

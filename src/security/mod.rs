pub mod auth_api;
pub mod jwt;
pub mod password;

pub use auth_api::{auth_middleware, AuthConfig};
pub use jwt::{extract_bearer_token, AccessToken, Claims, JwtConfig, JwtManager};
pub use password::PasswordHasher;

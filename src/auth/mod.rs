//! Authentication and authorization module
//!
//! Tokens are issued by the platform's central auth service; this subsystem
//! validates bearer tokens and gates handlers on admin roles.

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtService};
pub use middleware::{extract_token, jwt_auth_middleware, require_admin_roles, AuthContext};

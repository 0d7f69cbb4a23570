//! Authentication Module
//! Mission: Session tokens for ledger users and bearer-token protection of the bet API

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;

pub use api::AuthState;
pub use jwt::{JwtHandler, SessionToken};
pub use middleware::auth_middleware;
pub use models::Claims;

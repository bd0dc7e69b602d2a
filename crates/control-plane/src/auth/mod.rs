// Authentication module
//
// Members log in through the membership API and receive JWTs issued here.
// Every event route requires a bearer access token.

pub mod config;
pub mod jwt;
pub mod middleware;
pub mod routes;

pub use config::AuthConfig;
pub use jwt::JwtService;
pub use middleware::{AuthState, AuthUser, FromRef, MemberUser};
pub use routes::{routes, LoginState};

pub mod password;
pub mod service;
pub mod service_impl;
pub mod token;

pub use service::{AuthError, AuthService, Session};
pub use service_impl::SeaOrmAuthService;
pub use token::{Claims, TokenError, TokenService};

//! HTTP trigger API for vocab-seed

pub mod auth;
pub mod health;
pub mod maintenance;
pub mod seed;
pub mod validate;

pub use auth::Authorized;
pub use health::health_routes;
pub use maintenance::maintenance_routes;
pub use seed::seed_routes;
pub use validate::validate_routes;

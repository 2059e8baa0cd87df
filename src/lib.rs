pub mod approval;
pub mod authz;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod jwt;
pub mod models;
pub mod session;
pub mod utils;

pub use authz::{Decision, Guard, NavigationPaths, RouteTable};
pub use client::ApiClient;
pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use session::SessionStore;

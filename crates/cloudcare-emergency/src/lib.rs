pub mod alerts;
pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;

pub use alerts::{AlertService, AlertStatistics, CreateAlertRequest};
pub use config::AppConfig;
pub use server::{AppState, EmergencyServer, ServerBuilder, build_app, build_router};

pub mod app;
pub mod database;
pub mod email;
pub mod rate_limit;

pub use app::AppConfig;

pub mod cli;
pub mod configuration;
pub mod notifications;
pub mod telemetry;
pub mod traits;

mod detection;
mod encoder;
mod gateway;
mod overlay;
mod routes;
mod server;
mod telemetry;
mod tensor;

pub mod app;
pub mod config;

pub use app::start_app;

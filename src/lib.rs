pub mod config;
pub mod error;
pub mod generation;
pub mod publish;
pub mod server;
pub mod studio;
mod vendor;

pub use config::AppConfig;
pub use error::ServiceError;
pub use generation::{GenerationRequest, GenerationResult};
pub use publish::{PublishRequest, PublishResult};
pub use server::{AppState, build_router};
pub use studio::{Studio, StudioClient};

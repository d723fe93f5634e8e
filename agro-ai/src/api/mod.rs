//! HTTP API handlers for agro-ai

pub mod crops;
pub mod health;
pub mod identify;
pub mod sse;

pub use crops::crop_routes;
pub use health::health_routes;
pub use identify::identify_routes;
pub use sse::event_routes;

//! Outbound ports - Interfaces that the application requires from external systems

mod stage_sink_port;
mod textgen_port;

pub use stage_sink_port::{CacheInvalidationPort, EntityType, SinkError, StageSinkPort};
pub use textgen_port::{GenerationRequest, GenerationResponse, TextGenPort};

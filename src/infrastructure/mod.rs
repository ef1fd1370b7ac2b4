//! Infrastructure layer - Configuration, HTTP surface, and outbound adapters

pub mod config;
pub mod http;
pub mod state;
pub mod textgen;

//! Application layer - Pipeline services, ports and stage payloads

pub mod dto;
pub mod ports;
pub mod services;

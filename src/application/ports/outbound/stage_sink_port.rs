//! Collaborator ports - Persistence callbacks and cache invalidation
//!
//! The engine does not persist anything itself. It hands each completed
//! stage to a collaborator, which stores it with upsert semantics keyed by
//! entity id; re-delivery of the same event must be idempotent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::dto::StageEvent;

/// Persistence collaborator: receives every stage completion
#[async_trait]
pub trait StageSinkPort: Send + Sync {
    async fn on_stage_complete(&self, event: &StageEvent) -> Result<(), SinkError>;
}

/// Cache collaborator: told which entity changed so it can invalidate
/// its own keys (key-pattern translation and TTL policy live over there)
#[async_trait]
pub trait CacheInvalidationPort: Send + Sync {
    async fn invalidate(&self, entity_type: EntityType, entity_id: Uuid) -> Result<(), SinkError>;
}

/// Entity kinds the cache layer distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Story,
    Part,
    Chapter,
    Scene,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Story => "story",
            Self::Part => "part",
            Self::Chapter => "chapter",
            Self::Scene => "scene",
        };
        f.write_str(s)
    }
}

/// Error from a collaborator
///
/// Sink errors are logged and never abort a pipeline run; losing one event
/// must not corrupt later ones.
#[derive(Debug, thiserror::Error)]
#[error("sink error: {0}")]
pub struct SinkError(pub String);

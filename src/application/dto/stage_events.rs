//! Stage events - What the engine tells its collaborators as a run progresses
//!
//! Each event is individually serializable; the persistence collaborator
//! writes them independently, so losing one event must not corrupt the next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::GenerationId;

/// The eight generation stages, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Summary,
    Characters,
    Settings,
    Parts,
    Chapters,
    SceneSummaries,
    SceneContent,
    Evaluation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Characters => "characters",
            Self::Settings => "settings",
            Self::Parts => "parts",
            Self::Chapters => "chapters",
            Self::SceneSummaries => "scene_summaries",
            Self::SceneContent => "scene_content",
            Self::Evaluation => "evaluation",
        }
    }

    /// Ordinal position in the pipeline (1-based)
    pub fn number(&self) -> u8 {
        match self {
            Self::Summary => 1,
            Self::Characters => 2,
            Self::Settings => 3,
            Self::Parts => 4,
            Self::Chapters => 5,
            Self::SceneSummaries => 6,
            Self::SceneContent => 7,
            Self::Evaluation => 8,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status carried by a stage event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Started,
    Completed,
    Failed,
}

/// One stage-completion (or start/failure) notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    pub generation_id: GenerationId,
    pub stage: Stage,
    pub status: StageStatus,
    /// Stage output (for `Completed`) or error details (for `Failed`)
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl StageEvent {
    pub fn started(generation_id: GenerationId, stage: Stage) -> Self {
        Self {
            generation_id,
            stage,
            status: StageStatus::Started,
            payload: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    pub fn completed(generation_id: GenerationId, stage: Stage, payload: serde_json::Value) -> Self {
        Self {
            generation_id,
            stage,
            status: StageStatus::Completed,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(generation_id: GenerationId, stage: Stage, cause: &str) -> Self {
        Self {
            generation_id,
            stage,
            status: StageStatus::Failed,
            payload: serde_json::json!({ "error": cause }),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_through_json() {
        let event = StageEvent::completed(
            GenerationId::new(),
            Stage::SceneSummaries,
            serde_json::json!({ "chapter": 3, "scenes": 6 }),
        );

        let wire = serde_json::to_string(&event).unwrap();
        assert!(wire.contains("\"scene_summaries\""));
        assert!(wire.contains("\"completed\""));

        let back: StageEvent = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.stage, Stage::SceneSummaries);
        assert_eq!(back.status, StageStatus::Completed);
        assert_eq!(back.generation_id, event.generation_id);
    }

    #[test]
    fn stages_are_numbered_in_dependency_order() {
        assert_eq!(Stage::Summary.number(), 1);
        assert_eq!(Stage::Evaluation.number(), 8);
    }
}

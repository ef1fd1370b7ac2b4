//! Application services - The story generation pipeline

mod continuity;
mod evaluator;
pub mod llm;
mod pipeline;
mod structured_client;

pub use continuity::{ContinuityTracker, ContinuityViolation, PlantedSeed};
pub use evaluator::{EvaluationContext, SceneEvaluator, ScoreBand};
pub use pipeline::{
    PartialFailure, PipelineConfig, PipelineOrchestrator, StageError, StageSettings, StoryRequest,
};
pub use structured_client::{extract_structured, ClientError, ParseFailure, StructuredClient};

//! Data transfer objects - Stage draft payloads and stage events

mod drafts;
mod stage_events;

pub use drafts::{
    ChapterDraft, CharacterDraft, EvaluationDraft, EvaluationScoresDraft, MacroArcDraft,
    PartDraft, PhaseAmplificationDraft, RelationshipDraft, SceneSummaryDraft, SeedDraft,
    SeedResolutionDraft, SettingDraft, SummaryDraft,
};
pub use stage_events::{Stage, StageEvent, StageStatus};

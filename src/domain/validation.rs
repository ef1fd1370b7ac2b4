//! Structural validation errors for the story model
//!
//! Every level of the hierarchy exposes `validate() -> Vec<ValidationError>`.
//! A non-empty result is fatal to the pipeline run: stage outputs are never
//! coerced into shape, the run aborts instead.

use crate::domain::value_objects::{ChapterId, CyclePhase, SceneId, SeedId};

/// A structural rule violated by a story entity
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{entity}: required field '{field}' is empty")]
    MissingField { entity: String, field: String },

    #[error("story has {count} characters, expected 2-4")]
    CharacterCountOutOfRange { count: usize },

    #[error("story has {count} settings, expected 2-3")]
    SettingCountOutOfRange { count: usize },

    #[error("story has {count} primary protagonists, expected exactly 1")]
    ProtagonistCount { count: usize },

    #[error("setting '{setting}': adversity category '{category}' is empty")]
    EmptyAdversityElements { setting: String, category: String },

    #[error("setting '{setting}': no sensory details for '{sense}'")]
    MissingSensoryDetail { setting: String, sense: String },

    #[error("setting '{setting}': no amplification for the {phase} phase")]
    EmptyPhaseAmplification { setting: String, phase: CyclePhase },

    #[error("part '{part}': act number {act} outside 1-5")]
    ActNumberOutOfRange { part: String, act: u8 },

    #[error("story splits more than one part into sub-parts")]
    MultiplePartSplits,

    #[error("macro arc for '{character}': estimated {count} chapters, expected 2-4")]
    EstimatedChaptersOutOfRange { character: String, count: u8 },

    #[error("character '{character}': relationship intensity {intensity} outside 0-10")]
    IntensityOutOfRange { character: String, intensity: u8 },

    #[error("{entity}: references unknown character '{reference}'")]
    UnknownCharacterReference { entity: String, reference: String },

    #[error("chapter {chapter}: has {count} scenes, expected 5-8")]
    SceneCountOutOfRange { chapter: ChapterId, count: usize },

    #[error("chapter {chapter}: has {count} virtue-phase scenes, expected exactly 1")]
    VirtueSceneCount { chapter: ChapterId, count: usize },

    #[error("chapter {chapter}: virtue scene {scene} is not length class 'long'")]
    VirtueSceneNotLong { chapter: ChapterId, scene: SceneId },

    #[error("scene {scene}: {count} focus characters, expected at most 4")]
    FocusCharacterOverflow { scene: SceneId, count: usize },

    #[error("scene {scene}: {count} sensory anchors, expected 3-5")]
    SensoryAnchorCountOutOfRange { scene: SceneId, count: usize },

    #[error("seed {seed} resolved in chapter {chapter} was never planted")]
    SeedResolvedWithoutPlant { chapter: ChapterId, seed: SeedId },

    #[error("seed {seed} resolved more than once")]
    SeedResolvedTwice { seed: SeedId },

    #[error("seed {seed} resolved at ordinal {resolved_ordinal} but planted at ordinal {planted_ordinal}")]
    SeedResolvedBeforePlant {
        seed: SeedId,
        planted_ordinal: u32,
        resolved_ordinal: u32,
    },
}

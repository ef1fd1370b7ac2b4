//! Domain entities - The hierarchical story model

mod chapter;
mod character;
mod part;
mod scene;
mod setting;
mod story;

pub use chapter::{Chapter, Seed, SeedResolution};
pub use character::{Character, Relationship};
pub use part::{MacroArc, Part, SubPart};
pub use scene::{CategoryScores, Scene, SceneEvaluation};
pub use setting::{AdversityElements, PhaseAmplification, SensoryPalette, Setting};
pub use story::Story;

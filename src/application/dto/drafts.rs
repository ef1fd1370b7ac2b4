//! Stage draft payloads - The JSON shapes the model is asked to emit
//!
//! Drafts reference characters by *name* and planted seeds by a short
//! string key, because the model cannot know the engine's ids. The
//! orchestrator resolves names and keys to typed ids when merging a draft
//! into the story model, and a draft that fails validation after merge is
//! a hard stage error.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{
    AdversityType, ArcPosition, CyclePhase, EmotionalBeat, EmotionalTone, LengthClass,
    RelationshipCategory, VirtueType,
};

/// Stage 1 output: the story premise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryDraft {
    pub central_dramatic_question: String,
    pub genre: String,
    pub tone: EmotionalTone,
    pub moral_framework: String,
}

/// Stage 2 output: one cast member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDraft {
    pub name: String,
    #[serde(default)]
    pub is_primary_protagonist: bool,
    pub strength: String,
    pub internal_flaw: String,
    pub external_goal: String,
    #[serde(default)]
    pub relationships: Vec<RelationshipDraft>,
}

/// One directed relationship entry, keyed by the other character's name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDraft {
    /// Name of the other character
    pub with: String,
    pub category: RelationshipCategory,
    pub intensity: u8,
    #[serde(default)]
    pub shared_history: String,
    #[serde(default)]
    pub current_dynamic: String,
}

/// Stage 3 output: one setting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingDraft {
    pub name: String,
    pub physical_obstacles: Vec<String>,
    pub scarcity_factors: Vec<String>,
    pub danger_sources: Vec<String>,
    pub social_dynamics: Vec<String>,
    pub symbolic_meaning: String,
    pub mood: String,
    pub phase_amplification: PhaseAmplificationDraft,
    pub sights: Vec<String>,
    pub sounds: Vec<String>,
    #[serde(default)]
    pub smells: Vec<String>,
    #[serde(default)]
    pub textures: Vec<String>,
}

/// Per-phase amplification text, one entry per micro-cycle phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseAmplificationDraft {
    pub setup: String,
    pub confrontation: String,
    pub virtue: String,
    pub consequence: String,
    pub transition: String,
}

/// Stage 4 output: one act
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartDraft {
    pub act_number: u8,
    /// "A" or "B" on the halves of a split part
    #[serde(default)]
    pub sub_label: Option<String>,
    pub title: String,
    pub summary: String,
    pub macro_arcs: Vec<MacroArcDraft>,
}

/// One character's MACRO arc within a part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroArcDraft {
    /// Character name, resolved to an id at merge time
    pub character: String,
    pub internal_adversity: String,
    pub external_adversity: String,
    pub virtue: String,
    pub consequence: String,
    pub new_adversity: String,
    pub estimated_chapters: u8,
}

/// Stage 5 output: one chapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDraft {
    pub title: String,
    pub summary: String,
    /// Name of the character whose MACRO arc this chapter advances
    pub owning_character: String,
    pub arc_position: ArcPosition,
    pub arc_contribution: String,
    #[serde(default)]
    pub focus_characters: Vec<String>,
    pub adversity_type: AdversityType,
    pub virtue_type: VirtueType,
    #[serde(default)]
    pub seeds_planted: Vec<SeedDraft>,
    #[serde(default)]
    pub seeds_resolved: Vec<SeedResolutionDraft>,
    /// How this chapter follows from the previous one; empty for chapter 1
    #[serde(default)]
    pub causal_link: String,
    pub next_adversity: String,
}

/// A planted seed; `key` is the handle later chapters use to resolve it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDraft {
    pub key: String,
    pub description: String,
    pub expected_payoff: String,
}

/// Resolution of a previously planted seed, referenced by key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResolutionDraft {
    pub key: String,
    pub payoff: String,
}

/// Stage 6 output: one scene summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSummaryDraft {
    pub title: String,
    pub summary: String,
    pub cycle_phase: CyclePhase,
    pub emotional_beat: EmotionalBeat,
    #[serde(default)]
    pub focus_characters: Vec<String>,
    pub sensory_anchors: Vec<String>,
    pub length_class: LengthClass,
}

/// Stage 8 output: the evaluation rubric scores and feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationDraft {
    pub scores: EvaluationScoresDraft,
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub priority_fixes: Vec<String>,
}

/// Per-category rubric scores on the 1.0-4.0 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvaluationScoresDraft {
    pub plot: f32,
    pub character: f32,
    pub pacing: f32,
    pub prose: f32,
    pub world_building: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_draft_parses_with_defaults() {
        let json = r#"{
            "name": "Mira",
            "strength": "Curiosity",
            "internal_flaw": "Believes needing help is weakness",
            "external_goal": "Map the drowned archive"
        }"#;

        let draft: CharacterDraft = serde_json::from_str(json).unwrap();
        assert!(!draft.is_primary_protagonist);
        assert!(draft.relationships.is_empty());
    }

    #[test]
    fn chapter_draft_parses_enums_lowercase() {
        let json = r#"{
            "title": "The Locked Stacks",
            "summary": "Mira trades her map for one night inside",
            "owning_character": "Mira",
            "arc_position": "middle",
            "arc_contribution": "First crack in her self-reliance",
            "adversity_type": "both",
            "virtue_type": "courage",
            "seeds_planted": [
                {"key": "brass-key", "description": "A brass key", "expected_payoff": "Opens the vault"}
            ],
            "next_adversity": "The archivists know what she carries"
        }"#;

        let draft: ChapterDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.arc_position, ArcPosition::Middle);
        assert_eq!(draft.virtue_type, VirtueType::Courage);
        assert_eq!(draft.seeds_planted.len(), 1);
        assert!(draft.causal_link.is_empty());
    }
}

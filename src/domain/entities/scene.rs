//! Scene entity - The smallest storytelling unit, plus its evaluation record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::validation::ValidationError;
use crate::domain::value_objects::{
    ChapterId, CharacterId, CyclePhase, EmotionalBeat, LengthClass, SceneId,
};

/// A scene within a chapter
///
/// Lifecycle: created with summary-level fields by the scene-summary stage,
/// filled with prose by the content stage, then evaluated. A scene that
/// fails its quality gate is regenerated in place, at most twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub chapter_id: ChapterId,
    /// Order within the owning chapter
    pub ordinal: u32,
    pub title: String,
    pub summary: String,
    pub cycle_phase: CyclePhase,
    pub emotional_beat: EmotionalBeat,
    pub focus_characters: Vec<CharacterId>,
    /// Specific sensory details the prose must anchor to (3-5)
    pub sensory_anchors: Vec<String>,
    pub length_class: LengthClass,
    /// Generated prose, absent until the content stage runs
    pub content: Option<String>,
    /// Most recent evaluation of `content`
    pub evaluation: Option<SceneEvaluation>,
    /// How many times content was regenerated after a failed evaluation
    pub regeneration_count: u8,
    /// Set when the scene exhausted its regeneration budget without passing
    pub needs_improvement: bool,
}

impl Scene {
    pub fn new(chapter_id: ChapterId, ordinal: u32, title: impl Into<String>) -> Self {
        Self {
            id: SceneId::new(),
            chapter_id,
            ordinal,
            title: title.into(),
            summary: String::new(),
            cycle_phase: CyclePhase::Setup,
            emotional_beat: EmotionalBeat::Tension,
            focus_characters: Vec::new(),
            sensory_anchors: Vec::new(),
            length_class: LengthClass::Medium,
            content: None,
            evaluation: None,
            regeneration_count: 0,
            needs_improvement: false,
        }
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                entity: format!("scene {}", self.id),
                field: "title".to_string(),
            });
        }
        if self.summary.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                entity: format!("scene {}", self.id),
                field: "summary".to_string(),
            });
        }
        if self.focus_characters.len() > 4 {
            errors.push(ValidationError::FocusCharacterOverflow {
                scene: self.id,
                count: self.focus_characters.len(),
            });
        }
        if self.sensory_anchors.len() < 3 || self.sensory_anchors.len() > 5 {
            errors.push(ValidationError::SensoryAnchorCountOutOfRange {
                scene: self.id,
                count: self.sensory_anchors.len(),
            });
        }

        errors
    }
}

/// Per-category rubric scores, each on the 1.0-4.0 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CategoryScores {
    pub plot: f32,
    pub character: f32,
    pub pacing: f32,
    pub prose: f32,
    pub world_building: f32,
}

impl CategoryScores {
    /// Arithmetic mean of the five categories
    pub fn mean(&self) -> f32 {
        (self.plot + self.character + self.pacing + self.prose + self.world_building) / 5.0
    }

    pub fn as_array(&self) -> [f32; 5] {
        [
            self.plot,
            self.character,
            self.pacing,
            self.prose,
            self.world_building,
        ]
    }
}

/// Result of evaluating a scene's prose against the rubric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneEvaluation {
    pub scores: CategoryScores,
    /// Arithmetic mean of the five category scores
    pub overall_score: f32,
    /// True iff `overall_score >= 3.0`
    pub passed: bool,
    /// 2-3 things the prose does well, populated even on failure
    pub strengths: Vec<String>,
    /// Specific, actionable improvement items
    pub improvements: Vec<String>,
    /// Up to 3 fixes, highest priority first
    pub priority_fixes: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

/// Overall score at or above this passes the quality gate
pub const PASSING_THRESHOLD: f32 = 3.0;

impl SceneEvaluation {
    pub fn from_scores(
        scores: CategoryScores,
        strengths: Vec<String>,
        improvements: Vec<String>,
        priority_fixes: Vec<String>,
    ) -> Self {
        let overall_score = scores.mean();
        Self {
            scores,
            overall_score,
            passed: overall_score >= PASSING_THRESHOLD,
            strengths,
            improvements,
            priority_fixes,
            evaluated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with(anchors: usize, focus: usize) -> Scene {
        let mut scene = Scene::new(ChapterId::new(), 1, "The Vault Door");
        scene.summary = "Mira finds the vault and must choose who enters first".into();
        scene.sensory_anchors = (0..anchors).map(|i| format!("anchor {i}")).collect();
        scene.focus_characters = (0..focus).map(|_| CharacterId::new()).collect();
        scene
    }

    #[test]
    fn well_formed_scene_validates() {
        assert!(scene_with(4, 2).validate().is_empty());
    }

    #[test]
    fn too_few_sensory_anchors_flagged() {
        let errors = scene_with(2, 2).validate();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::SensoryAnchorCountOutOfRange { count: 2, .. }
        )));
    }

    #[test]
    fn too_many_focus_characters_flagged() {
        let errors = scene_with(3, 5).validate();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::FocusCharacterOverflow { count: 5, .. })));
    }

    #[test]
    fn overall_score_is_mean_of_categories() {
        let scores = CategoryScores {
            plot: 3.0,
            character: 3.5,
            pacing: 2.5,
            prose: 4.0,
            world_building: 2.0,
        };
        let evaluation = SceneEvaluation::from_scores(scores, vec![], vec![], vec![]);
        assert!((evaluation.overall_score - 3.0).abs() < 1e-6);
        assert!(evaluation.passed);
    }

    #[test]
    fn just_below_threshold_fails() {
        let scores = CategoryScores {
            plot: 2.9,
            character: 2.9,
            pacing: 2.9,
            prose: 2.9,
            world_building: 2.9,
        };
        let evaluation = SceneEvaluation::from_scores(scores, vec![], vec![], vec![]);
        assert!(!evaluation.passed);
    }
}

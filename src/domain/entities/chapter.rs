//! Chapter entity - One complete micro-cycle advancing a character's MACRO arc

use serde::{Deserialize, Serialize};

use crate::domain::entities::Scene;
use crate::domain::validation::ValidationError;
use crate::domain::value_objects::{
    AdversityType, ArcPosition, ChapterId, CharacterId, CyclePhase, LengthClass, PartId, SceneId,
    SeedId, VirtueType,
};

/// A chapter, globally ordered within the story
///
/// Each chapter advances exactly one character's MACRO arc, runs its own
/// adversity/virtue/consequence/transition micro-cycle across 5-8 scenes,
/// and is causally linked to its neighbors: `causal_link` continues the
/// previous chapter's consequence, `next_adversity` sets up the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub part_id: PartId,
    /// Global position within the story, starting at 1
    pub ordinal: u32,
    pub title: String,
    pub summary: String,
    /// The character whose MACRO arc this chapter advances
    pub owning_character: CharacterId,
    pub arc_position: ArcPosition,
    /// What this chapter contributes to the owning character's MACRO arc
    pub arc_contribution: String,
    pub focus_characters: Vec<CharacterId>,
    pub adversity_type: AdversityType,
    pub virtue_type: VirtueType,
    pub seeds_planted: Vec<Seed>,
    pub seeds_resolved: Vec<SeedResolution>,
    /// How this chapter follows from the previous chapter's consequence
    pub causal_link: String,
    /// The adversity this chapter sets up for the next one
    pub next_adversity: String,
    pub scenes: Vec<Scene>,
}

impl Chapter {
    pub fn new(part_id: PartId, ordinal: u32, owning_character: CharacterId) -> Self {
        Self {
            id: ChapterId::new(),
            part_id,
            ordinal,
            title: String::new(),
            summary: String::new(),
            owning_character,
            arc_position: ArcPosition::Beginning,
            arc_contribution: String::new(),
            focus_characters: Vec::new(),
            adversity_type: AdversityType::Both,
            virtue_type: VirtueType::Courage,
            seeds_planted: Vec::new(),
            seeds_resolved: Vec::new(),
            causal_link: String::new(),
            next_adversity: String::new(),
            scenes: Vec::new(),
        }
    }

    /// The scene carrying this chapter's virtue phase, if present
    pub fn virtue_scene(&self) -> Option<&Scene> {
        self.scenes
            .iter()
            .find(|s| s.cycle_phase == CyclePhase::Virtue)
    }

    /// Check the chapter's own fields (scenes are checked separately,
    /// because chapters exist before their scenes are generated)
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("title", &self.title),
            ("summary", &self.summary),
            ("arc_contribution", &self.arc_contribution),
            ("next_adversity", &self.next_adversity),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    entity: format!("chapter {}", self.ordinal),
                    field: field.to_string(),
                });
            }
        }
        // The first chapter has nothing to link back to
        if self.ordinal > 1 && self.causal_link.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                entity: format!("chapter {}", self.ordinal),
                field: "causal_link".to_string(),
            });
        }

        errors
    }

    /// Check scene-level structure: 5-8 scenes, exactly one virtue-phase
    /// scene, and that scene at length class `long`
    pub fn validate_scenes(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.scenes.len() < 5 || self.scenes.len() > 8 {
            errors.push(ValidationError::SceneCountOutOfRange {
                chapter: self.id,
                count: self.scenes.len(),
            });
        }

        let virtue_scenes: Vec<&Scene> = self
            .scenes
            .iter()
            .filter(|s| s.cycle_phase == CyclePhase::Virtue)
            .collect();
        if virtue_scenes.len() != 1 {
            errors.push(ValidationError::VirtueSceneCount {
                chapter: self.id,
                count: virtue_scenes.len(),
            });
        }
        for scene in virtue_scenes {
            if scene.length_class != LengthClass::Long {
                errors.push(ValidationError::VirtueSceneNotLong {
                    chapter: self.id,
                    scene: scene.id,
                });
            }
        }

        for scene in &self.scenes {
            errors.extend(scene.validate());
        }

        errors
    }
}

/// A narrative detail planted for later payoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    pub id: SeedId,
    pub description: String,
    /// Where and how the seed is expected to pay off
    pub expected_payoff: String,
}

impl Seed {
    pub fn new(description: impl Into<String>, expected_payoff: impl Into<String>) -> Self {
        Self {
            id: SeedId::new(),
            description: description.into(),
            expected_payoff: expected_payoff.into(),
        }
    }
}

/// The payoff of a previously planted seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResolution {
    pub seed_id: SeedId,
    /// Chapter where the seed was planted
    pub source_chapter: ChapterId,
    /// Scene where the seed was planted, when known
    pub source_scene: Option<SceneId>,
    pub payoff: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EmotionalBeat;

    fn filled_chapter(ordinal: u32) -> Chapter {
        let mut chapter = Chapter::new(PartId::new(), ordinal, CharacterId::new());
        chapter.title = "The Locked Stacks".into();
        chapter.summary = "Mira trades her map for one night in the stacks".into();
        chapter.arc_contribution = "First crack in her refusal to rely on anyone".into();
        chapter.causal_link = "The flooded vault from chapter one forced her topside".into();
        chapter.next_adversity = "The archivists now know what she carries".into();
        chapter
    }

    fn scene(chapter: &Chapter, ordinal: u32, phase: CyclePhase, length: LengthClass) -> Scene {
        let mut s = Scene::new(chapter.id, ordinal, format!("Scene {ordinal}"));
        s.summary = "Something happens".into();
        s.cycle_phase = phase;
        s.emotional_beat = EmotionalBeat::Tension;
        s.length_class = length;
        s.sensory_anchors = vec![
            "Wet rope fraying".into(),
            "Lantern smoke".into(),
            "Cold brass keys".into(),
        ];
        s
    }

    fn filled_scenes(chapter: &Chapter) -> Vec<Scene> {
        vec![
            scene(chapter, 1, CyclePhase::Setup, LengthClass::Short),
            scene(chapter, 2, CyclePhase::Confrontation, LengthClass::Medium),
            scene(chapter, 3, CyclePhase::Virtue, LengthClass::Long),
            scene(chapter, 4, CyclePhase::Consequence, LengthClass::Medium),
            scene(chapter, 5, CyclePhase::Transition, LengthClass::Short),
        ]
    }

    #[test]
    fn filled_chapter_validates() {
        let mut chapter = filled_chapter(2);
        chapter.scenes = filled_scenes(&chapter);
        assert!(chapter.validate().is_empty());
        assert!(chapter.validate_scenes().is_empty());
    }

    #[test]
    fn first_chapter_needs_no_causal_link() {
        let mut chapter = filled_chapter(1);
        chapter.causal_link = String::new();
        assert!(chapter.validate().is_empty());
    }

    #[test]
    fn later_chapter_requires_causal_link() {
        let mut chapter = filled_chapter(3);
        chapter.causal_link = String::new();
        assert!(chapter.validate().iter().any(|e| matches!(
            e,
            ValidationError::MissingField { field, .. } if field == "causal_link"
        )));
    }

    #[test]
    fn two_virtue_scenes_are_flagged() {
        let mut chapter = filled_chapter(2);
        chapter.scenes = filled_scenes(&chapter);
        chapter.scenes[0].cycle_phase = CyclePhase::Virtue;
        chapter.scenes[0].length_class = LengthClass::Long;

        let errors = chapter.validate_scenes();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::VirtueSceneCount { count: 2, .. })));
    }

    #[test]
    fn short_virtue_scene_is_flagged() {
        let mut chapter = filled_chapter(2);
        chapter.scenes = filled_scenes(&chapter);
        chapter.scenes[2].length_class = LengthClass::Medium;

        let errors = chapter.validate_scenes();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::VirtueSceneNotLong { .. })));
    }

    #[test]
    fn four_scenes_are_flagged() {
        let mut chapter = filled_chapter(2);
        chapter.scenes = filled_scenes(&chapter);
        chapter.scenes.pop();

        let errors = chapter.validate_scenes();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::SceneCountOutOfRange { count: 4, .. })));
    }
}

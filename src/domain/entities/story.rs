//! Story entity - Root of the hierarchical story model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::entities::{Chapter, Character, Part, Setting};
use crate::domain::validation::ValidationError;
use crate::domain::value_objects::{CharacterId, EmotionalTone, SeedId, StoryId};

/// The root story entity
///
/// Created by the summary/characters/settings stages and treated as
/// immutable once parts begin generating, except for corrective edits made
/// by the orchestrator (the sole mutator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub central_dramatic_question: String,
    pub genre: String,
    pub tone: EmotionalTone,
    /// Short statement of the story's moral framework
    pub moral_framework: String,
    pub characters: Vec<Character>,
    pub settings: Vec<Setting>,
    pub parts: Vec<Part>,
    pub created_at: DateTime<Utc>,
}

impl Story {
    pub fn new(
        central_dramatic_question: impl Into<String>,
        genre: impl Into<String>,
        tone: EmotionalTone,
    ) -> Self {
        Self {
            id: StoryId::new(),
            central_dramatic_question: central_dramatic_question.into(),
            genre: genre.into(),
            tone,
            moral_framework: String::new(),
            characters: Vec::new(),
            settings: Vec::new(),
            parts: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == *id)
    }

    /// Case-insensitive lookup by name, used when resolving draft payloads
    /// that reference characters by name
    pub fn character_by_name(&self, name: &str) -> Option<&Character> {
        let needle = name.trim().to_lowercase();
        self.characters
            .iter()
            .find(|c| c.name.to_lowercase() == needle)
    }

    pub fn protagonist(&self) -> Option<&Character> {
        self.characters.iter().find(|c| c.is_primary_protagonist)
    }

    /// All chapters across all parts, in global ordinal order
    pub fn chapters(&self) -> impl Iterator<Item = &Chapter> {
        self.parts.iter().flat_map(|p| p.chapters.iter())
    }

    pub fn scene_count(&self) -> usize {
        self.chapters().map(|c| c.scenes.len()).sum()
    }

    /// Validate the complete story: top-level counts, every child entity,
    /// and the cross-chapter seed ledger
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = self.validate_premise();
        errors.extend(self.validate_cast());
        errors.extend(self.validate_settings());
        errors.extend(self.validate_parts());
        errors.extend(self.validate_seed_ledger());
        errors
    }

    /// Checks applicable as soon as the summary stage completes
    pub fn validate_premise(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (field, value) in [
            (
                "central_dramatic_question",
                &self.central_dramatic_question,
            ),
            ("genre", &self.genre),
            ("moral_framework", &self.moral_framework),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    entity: "story".to_string(),
                    field: field.to_string(),
                });
            }
        }
        errors
    }

    /// Checks applicable once the character stage completes
    pub fn validate_cast(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.characters.len() < 2 || self.characters.len() > 4 {
            errors.push(ValidationError::CharacterCountOutOfRange {
                count: self.characters.len(),
            });
        }
        let protagonists = self
            .characters
            .iter()
            .filter(|c| c.is_primary_protagonist)
            .count();
        if protagonists != 1 {
            errors.push(ValidationError::ProtagonistCount {
                count: protagonists,
            });
        }

        for character in &self.characters {
            errors.extend(character.validate());
            for other in character.relationships.keys() {
                if self.character(other).is_none() {
                    errors.push(ValidationError::UnknownCharacterReference {
                        entity: format!("character '{}'", character.name),
                        reference: other.to_string(),
                    });
                }
            }
        }

        errors
    }

    /// Checks applicable once the settings stage completes
    pub fn validate_settings(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.settings.len() < 2 || self.settings.len() > 3 {
            errors.push(ValidationError::SettingCountOutOfRange {
                count: self.settings.len(),
            });
        }
        for setting in &self.settings {
            errors.extend(setting.validate());
        }
        errors
    }

    fn validate_parts(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let split_acts: std::collections::HashSet<u8> = self
            .parts
            .iter()
            .filter(|p| p.sub_label.is_some())
            .map(|p| p.act_number)
            .collect();
        if split_acts.len() > 1 {
            errors.push(ValidationError::MultiplePartSplits);
        }

        for part in &self.parts {
            errors.extend(part.validate());
            for chapter in &part.chapters {
                errors.extend(chapter.validate());
                if !chapter.scenes.is_empty() {
                    errors.extend(chapter.validate_scenes());
                }
                if self.character(&chapter.owning_character).is_none() {
                    errors.push(ValidationError::UnknownCharacterReference {
                        entity: format!("chapter {}", chapter.ordinal),
                        reference: chapter.owning_character.to_string(),
                    });
                }
            }
        }

        errors
    }

    /// Every resolved seed must have been planted in a strictly earlier
    /// chapter, and no seed may resolve twice across the whole story
    fn validate_seed_ledger(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let mut planted: HashMap<SeedId, u32> = HashMap::new();
        for chapter in self.chapters() {
            for seed in &chapter.seeds_planted {
                planted.insert(seed.id, chapter.ordinal);
            }
        }

        let mut resolved: HashMap<SeedId, u32> = HashMap::new();
        for chapter in self.chapters() {
            for resolution in &chapter.seeds_resolved {
                match planted.get(&resolution.seed_id) {
                    None => errors.push(ValidationError::SeedResolvedWithoutPlant {
                        chapter: chapter.id,
                        seed: resolution.seed_id,
                    }),
                    Some(&planted_ordinal) if planted_ordinal >= chapter.ordinal => {
                        errors.push(ValidationError::SeedResolvedBeforePlant {
                            seed: resolution.seed_id,
                            planted_ordinal,
                            resolved_ordinal: chapter.ordinal,
                        });
                    }
                    Some(_) => {}
                }
                if resolved.insert(resolution.seed_id, chapter.ordinal).is_some() {
                    errors.push(ValidationError::SeedResolvedTwice {
                        seed: resolution.seed_id,
                    });
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Seed, SeedResolution};
    use crate::domain::value_objects::PartId;

    fn story_with_cast(count: usize) -> Story {
        let mut story = Story::new(
            "Can Mira save the archive without losing the crew?",
            "fantasy",
            EmotionalTone::Hopeful,
        );
        story.moral_framework = "Help accepted is not weakness".into();
        for i in 0..count {
            let mut c = Character::new(format!("Character {i}"))
                .with_strength("s")
                .with_internal_flaw("f")
                .with_external_goal("g");
            c.is_primary_protagonist = i == 0;
            story.characters.push(c);
        }
        story
    }

    #[test]
    fn two_protagonists_are_flagged() {
        let mut story = story_with_cast(3);
        story.characters[1].is_primary_protagonist = true;

        let errors = story.validate_cast();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ProtagonistCount { count: 2 })));
    }

    #[test]
    fn five_characters_are_flagged() {
        let story = story_with_cast(5);
        let errors = story.validate_cast();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::CharacterCountOutOfRange { count: 5 })));
    }

    #[test]
    fn seed_resolution_must_follow_plant() {
        let mut story = story_with_cast(2);
        let owner = story.characters[0].id;
        let mut part = Part::new(1, "Act One");
        part.summary = "summary".into();

        let seed = Seed::new("A stolen key", "Opens the vault in a later chapter");
        let seed_id = seed.id;

        let mut ch1 = Chapter::new(part.id, 1, owner);
        ch1.title = "One".into();
        ch1.summary = "s".into();
        ch1.arc_contribution = "a".into();
        ch1.next_adversity = "n".into();
        // Resolved in the same chapter it was planted: invalid
        ch1.seeds_planted.push(seed);
        ch1.seeds_resolved.push(SeedResolution {
            seed_id,
            source_chapter: ch1.id,
            source_scene: None,
            payoff: "The key opens the vault".into(),
        });
        part.chapters.push(ch1);
        story.parts.push(part);

        let errors = story.validate();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::SeedResolvedBeforePlant { .. })));
    }

    #[test]
    fn seed_resolved_twice_is_flagged() {
        let mut story = story_with_cast(2);
        let owner = story.characters[0].id;
        let mut part = Part::new(1, "Act One");
        part.summary = "summary".into();

        let seed = Seed::new("A stolen key", "Opens the vault");
        let seed_id = seed.id;

        let mut ch1 = Chapter::new(part.id, 1, owner);
        ch1.title = "One".into();
        ch1.summary = "s".into();
        ch1.arc_contribution = "a".into();
        ch1.next_adversity = "n".into();
        let source_chapter = ch1.id;
        ch1.seeds_planted.push(seed);

        let resolution = SeedResolution {
            seed_id,
            source_chapter,
            source_scene: None,
            payoff: "Opened".into(),
        };
        let mut ch2 = Chapter::new(part.id, 2, owner);
        ch2.title = "Two".into();
        ch2.summary = "s".into();
        ch2.arc_contribution = "a".into();
        ch2.causal_link = "c".into();
        ch2.next_adversity = "n".into();
        ch2.seeds_resolved.push(resolution.clone());

        let mut ch3 = Chapter::new(part.id, 3, owner);
        ch3.title = "Three".into();
        ch3.summary = "s".into();
        ch3.arc_contribution = "a".into();
        ch3.causal_link = "c".into();
        ch3.next_adversity = "n".into();
        ch3.seeds_resolved.push(resolution);

        part.chapters.extend([ch1, ch2, ch3]);
        story.parts.push(part);

        let errors = story.validate();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::SeedResolvedTwice { .. })));
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        let story = story_with_cast(2);
        assert!(story.character_by_name("character 1").is_some());
        assert!(story.character_by_name("CHARACTER 0").is_some());
        assert!(story.character_by_name("nobody").is_none());
    }
}

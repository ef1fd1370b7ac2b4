//! Setting entity - Places that actively resist the characters

use serde::{Deserialize, Serialize};

use crate::domain::validation::ValidationError;
use crate::domain::value_objects::{CyclePhase, SettingId};

/// A setting in the story
///
/// Settings are adversarial: each one carries concrete obstacles, scarcity,
/// danger and social friction, plus guidance for how the place should press
/// harder during each phase of a chapter's micro-cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub id: SettingId,
    pub name: String,
    pub adversity: AdversityElements,
    pub symbolic_meaning: String,
    pub mood: String,
    pub phase_amplification: PhaseAmplification,
    pub sensory: SensoryPalette,
}

impl Setting {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SettingId::new(),
            name: name.into(),
            adversity: AdversityElements::default(),
            symbolic_meaning: String::new(),
            mood: String::new(),
            phase_amplification: PhaseAmplification::default(),
            sensory: SensoryPalette::default(),
        }
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                entity: "setting".to_string(),
                field: "name".to_string(),
            });
        }
        for (field, value) in [
            ("symbolic_meaning", &self.symbolic_meaning),
            ("mood", &self.mood),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    entity: format!("setting '{}'", self.name),
                    field: field.to_string(),
                });
            }
        }

        for (category, list) in [
            ("physical_obstacles", &self.adversity.physical_obstacles),
            ("scarcity_factors", &self.adversity.scarcity_factors),
            ("danger_sources", &self.adversity.danger_sources),
            ("social_dynamics", &self.adversity.social_dynamics),
        ] {
            if list.is_empty() {
                errors.push(ValidationError::EmptyAdversityElements {
                    setting: self.name.clone(),
                    category: category.to_string(),
                });
            }
        }

        for phase in CyclePhase::ALL {
            if self.phase_amplification.for_phase(phase).trim().is_empty() {
                errors.push(ValidationError::EmptyPhaseAmplification {
                    setting: self.name.clone(),
                    phase,
                });
            }
        }

        // Sight and sound are required; smell and texture are optional color
        if self.sensory.sights.is_empty() {
            errors.push(ValidationError::MissingSensoryDetail {
                setting: self.name.clone(),
                sense: "sight".to_string(),
            });
        }
        if self.sensory.sounds.is_empty() {
            errors.push(ValidationError::MissingSensoryDetail {
                setting: self.name.clone(),
                sense: "sound".to_string(),
            });
        }

        errors
    }
}

/// The ways a setting pushes back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdversityElements {
    pub physical_obstacles: Vec<String>,
    pub scarcity_factors: Vec<String>,
    pub danger_sources: Vec<String>,
    pub social_dynamics: Vec<String>,
}

/// How the setting should intensify during each micro-cycle phase
///
/// One field per phase so coverage of all five is guaranteed by
/// construction; validation only has to check for empty text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseAmplification {
    pub setup: String,
    pub confrontation: String,
    pub virtue: String,
    pub consequence: String,
    pub transition: String,
}

impl PhaseAmplification {
    pub fn for_phase(&self, phase: CyclePhase) -> &str {
        match phase {
            CyclePhase::Setup => &self.setup,
            CyclePhase::Confrontation => &self.confrontation,
            CyclePhase::Virtue => &self.virtue,
            CyclePhase::Consequence => &self.consequence,
            CyclePhase::Transition => &self.transition,
        }
    }
}

/// Sensory details available to scene prompts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensoryPalette {
    pub sights: Vec<String>,
    pub sounds: Vec<String>,
    #[serde(default)]
    pub smells: Vec<String>,
    #[serde(default)]
    pub textures: Vec<String>,
}

//! Character entity - Cast members with wound-driven arcs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::validation::ValidationError;
use crate::domain::value_objects::{CharacterId, RelationshipCategory};

/// A character in the story
///
/// The internal flaw is a wound or false belief, not a mere weakness; the
/// external goal is tangible but deliberately insufficient to resolve that
/// flaw. Chapters advance one character's MACRO arc at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    /// Exactly one character per story carries this flag
    pub is_primary_protagonist: bool,
    /// Core trait the character can lean on
    pub strength: String,
    /// Wound or false belief driving the internal arc
    pub internal_flaw: String,
    /// Tangible goal, insufficient on its own to resolve the flaw
    pub external_goal: String,
    /// Relationships keyed by the other character's id
    pub relationships: HashMap<CharacterId, Relationship>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            is_primary_protagonist: false,
            strength: String::new(),
            internal_flaw: String::new(),
            external_goal: String::new(),
            relationships: HashMap::new(),
        }
    }

    pub fn as_protagonist(mut self) -> Self {
        self.is_primary_protagonist = true;
        self
    }

    pub fn with_strength(mut self, strength: impl Into<String>) -> Self {
        self.strength = strength.into();
        self
    }

    pub fn with_internal_flaw(mut self, flaw: impl Into<String>) -> Self {
        self.internal_flaw = flaw.into();
        self
    }

    pub fn with_external_goal(mut self, goal: impl Into<String>) -> Self {
        self.external_goal = goal.into();
        self
    }

    pub fn with_relationship(mut self, other: CharacterId, relationship: Relationship) -> Self {
        self.relationships.insert(other, relationship);
        self
    }

    pub fn relationship_to(&self, other: &CharacterId) -> Option<&Relationship> {
        self.relationships.get(other)
    }

    /// Check this character's own structural rules
    ///
    /// Relationship symmetry spans two characters and is checked by the
    /// continuity tracker, not here.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("name", &self.name),
            ("strength", &self.strength),
            ("internal_flaw", &self.internal_flaw),
            ("external_goal", &self.external_goal),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    entity: format!("character '{}'", self.name),
                    field: field.to_string(),
                });
            }
        }

        for relationship in self.relationships.values() {
            if relationship.intensity > 10 {
                errors.push(ValidationError::IntensityOutOfRange {
                    character: self.name.clone(),
                    intensity: relationship.intensity,
                });
            }
        }

        errors
    }
}

/// One directed edge in the relationship graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub category: RelationshipCategory,
    /// Bond intensity, 0 (strangers) to 10 (inseparable)
    pub intensity: u8,
    pub shared_history: String,
    pub current_dynamic: String,
}

impl Relationship {
    pub fn new(category: RelationshipCategory, intensity: u8) -> Self {
        Self {
            category,
            intensity,
            shared_history: String::new(),
            current_dynamic: String::new(),
        }
    }

    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.shared_history = history.into();
        self
    }

    pub fn with_dynamic(mut self, dynamic: impl Into<String>) -> Self {
        self.current_dynamic = dynamic.into();
        self
    }
}

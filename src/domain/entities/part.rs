//! Part entity - An act of the story, carrying character MACRO arcs

use serde::{Deserialize, Serialize};

use crate::domain::entities::Chapter;
use crate::domain::validation::ValidationError;
use crate::domain::value_objects::{CharacterId, PartId};

/// An act of the story
///
/// Parts are ordered by act number (1..3 or 1..5). At most one part in a
/// story may be split into "A"/"B" sub-parts for pacing; the split keeps
/// the original act number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub act_number: u8,
    /// Present only on the halves of a split part
    pub sub_label: Option<SubPart>,
    pub title: String,
    pub summary: String,
    pub macro_arcs: Vec<MacroArc>,
    pub chapters: Vec<Chapter>,
}

impl Part {
    pub fn new(act_number: u8, title: impl Into<String>) -> Self {
        Self {
            id: PartId::new(),
            act_number,
            sub_label: None,
            title: title.into(),
            summary: String::new(),
            macro_arcs: Vec::new(),
            chapters: Vec::new(),
        }
    }

    /// Display label, e.g. "2" or "2A"
    pub fn label(&self) -> String {
        match self.sub_label {
            Some(SubPart::A) => format!("{}A", self.act_number),
            Some(SubPart::B) => format!("{}B", self.act_number),
            None => self.act_number.to_string(),
        }
    }

    pub fn macro_arc_for(&self, character: &CharacterId) -> Option<&MacroArc> {
        self.macro_arcs.iter().find(|a| a.character == *character)
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.act_number < 1 || self.act_number > 5 {
            errors.push(ValidationError::ActNumberOutOfRange {
                part: self.label(),
                act: self.act_number,
            });
        }
        for (field, value) in [("title", &self.title), ("summary", &self.summary)] {
            if value.trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    entity: format!("part {}", self.label()),
                    field: field.to_string(),
                });
            }
        }

        for arc in &self.macro_arcs {
            errors.extend(arc.validate());
        }

        errors
    }

    /// Pacing check: a climax chapter should land in the second half of its
    /// owning character's chapter allotment within this part.
    ///
    /// Advisory only (returned as human-readable warnings): the arc still
    /// functions with an early climax, it just sags afterwards.
    pub fn arc_pacing_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for chapter in &self.chapters {
            if chapter.arc_position != crate::domain::value_objects::ArcPosition::Climax {
                continue;
            }
            let Some(arc) = self.macro_arc_for(&chapter.owning_character) else {
                continue;
            };
            // Position of this chapter among the owner's chapters in this part
            let position = self
                .chapters
                .iter()
                .filter(|c| c.owning_character == chapter.owning_character)
                .position(|c| c.id == chapter.id)
                .map(|p| p as u8 + 1)
                .unwrap_or(1);
            let midpoint = arc.estimated_chapters.div_ceil(2);
            if position < midpoint && arc.estimated_chapters > 2 {
                warnings.push(format!(
                    "part {}: climax chapter '{}' is chapter {} of {} for its owner, earlier than the arc midpoint",
                    self.label(),
                    chapter.title,
                    position,
                    arc.estimated_chapters
                ));
            }
        }

        warnings
    }
}

/// Which half of a split part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubPart {
    A,
    B,
}

/// One character's multi-chapter adversity/virtue/consequence cycle
/// within a part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroArc {
    pub character: CharacterId,
    /// Display name kept for prompts and diagnostics
    pub character_name: String,
    pub internal_adversity: String,
    pub external_adversity: String,
    pub virtue: String,
    pub consequence: String,
    pub new_adversity: String,
    /// Chapters this arc is expected to span (2-4)
    pub estimated_chapters: u8,
}

impl MacroArc {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.estimated_chapters < 2 || self.estimated_chapters > 4 {
            errors.push(ValidationError::EstimatedChaptersOutOfRange {
                character: self.character_name.clone(),
                count: self.estimated_chapters,
            });
        }
        for (field, value) in [
            ("internal_adversity", &self.internal_adversity),
            ("external_adversity", &self.external_adversity),
            ("virtue", &self.virtue),
            ("consequence", &self.consequence),
            ("new_adversity", &self.new_adversity),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    entity: format!("macro arc for '{}'", self.character_name),
                    field: field.to_string(),
                });
            }
        }

        errors
    }
}

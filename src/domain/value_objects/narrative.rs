//! Narrative enumerations shared across the story model
//!
//! These are the closed vocabularies the generation stages are asked to
//! emit and the validation layer checks against. Serde representations are
//! lowercase so they match the wire format the prompts request.

use serde::{Deserialize, Serialize};

/// Emotional tone of the whole story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalTone {
    Hopeful,
    Dark,
    Bittersweet,
    Satirical,
}

impl EmotionalTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hopeful => "hopeful",
            Self::Dark => "dark",
            Self::Bittersweet => "bittersweet",
            Self::Satirical => "satirical",
        }
    }
}

impl std::fmt::Display for EmotionalTone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a relationship between two characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipCategory {
    Ally,
    Rival,
    Family,
    Romantic,
    Mentor,
    Adversary,
}

impl RelationshipCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ally => "ally",
            Self::Rival => "rival",
            Self::Family => "family",
            Self::Romantic => "romantic",
            Self::Mentor => "mentor",
            Self::Adversary => "adversary",
        }
    }
}

impl std::fmt::Display for RelationshipCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a chapter sits within its owning character's MACRO arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArcPosition {
    Beginning,
    Middle,
    Climax,
    Resolution,
}

impl ArcPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginning => "beginning",
            Self::Middle => "middle",
            Self::Climax => "climax",
            Self::Resolution => "resolution",
        }
    }
}

impl std::fmt::Display for ArcPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of adversity a chapter confronts its owning character with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdversityType {
    Internal,
    External,
    Both,
}

impl AdversityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Both => "both",
        }
    }
}

impl std::fmt::Display for AdversityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Virtue demonstrated in a chapter's micro-cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VirtueType {
    Courage,
    Compassion,
    Integrity,
    Loyalty,
    Wisdom,
    Sacrifice,
}

impl VirtueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Courage => "courage",
            Self::Compassion => "compassion",
            Self::Integrity => "integrity",
            Self::Loyalty => "loyalty",
            Self::Wisdom => "wisdom",
            Self::Sacrifice => "sacrifice",
        }
    }
}

impl std::fmt::Display for VirtueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrative function a scene plays inside its chapter's micro-cycle
///
/// Exactly one scene per chapter carries the `Virtue` phase; it is the
/// chapter's emotional core and is always generated at `LengthClass::Long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Setup,
    Confrontation,
    Virtue,
    Consequence,
    Transition,
}

impl CyclePhase {
    /// All five phases, in micro-cycle order
    pub const ALL: [CyclePhase; 5] = [
        Self::Setup,
        Self::Confrontation,
        Self::Virtue,
        Self::Consequence,
        Self::Transition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Confrontation => "confrontation",
            Self::Virtue => "virtue",
            Self::Consequence => "consequence",
            Self::Transition => "transition",
        }
    }
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dominant emotional beat of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalBeat {
    Fear,
    Hope,
    Tension,
    Relief,
    Elevation,
    Catharsis,
    Despair,
    Joy,
}

impl EmotionalBeat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fear => "fear",
            Self::Hope => "hope",
            Self::Tension => "tension",
            Self::Relief => "relief",
            Self::Elevation => "elevation",
            Self::Catharsis => "catharsis",
            Self::Despair => "despair",
            Self::Joy => "joy",
        }
    }
}

impl std::fmt::Display for EmotionalBeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target prose length of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthClass {
    Short,
    Medium,
    Long,
}

impl LengthClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    /// Rough word-count guidance passed to the prose prompt
    pub fn word_target(&self) -> u32 {
        match self {
            Self::Short => 400,
            Self::Medium => 800,
            Self::Long => 1400,
        }
    }
}

impl std::fmt::Display for LengthClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

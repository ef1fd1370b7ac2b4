//! Value objects - Immutable objects defined by their attributes

mod ids;
mod narrative;

pub use ids::*;
pub use narrative::{
    AdversityType, ArcPosition, CyclePhase, EmotionalBeat, EmotionalTone, LengthClass,
    RelationshipCategory, VirtueType,
};

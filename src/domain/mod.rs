//! Domain layer - Core story model with no external dependencies
//!
//! This layer contains:
//! - Entities: Story, Character, Setting, Part, Chapter, Scene
//! - Value Objects: typed ids, narrative enumerations
//! - Validation: structural rules each level must satisfy

pub mod entities;
pub mod validation;
pub mod value_objects;

//! Narrative continuity tracker
//!
//! Pure bookkeeping over the story model: a character registry, a
//! relationship snapshot, and the seed ledger. The orchestrator consults it
//! after every chapter- and scene-stage completion; its violation lists are
//! surfaced as warnings, never hard failures. It makes no generation calls.

use std::collections::HashMap;

use crate::domain::entities::{Character, Seed, Setting};
use crate::domain::value_objects::{ChapterId, CharacterId, SceneId, SeedId, SettingId};

/// Cross-stage continuity state owned by a single pipeline run
pub struct ContinuityTracker {
    characters: HashMap<CharacterId, CharacterRecord>,
    settings: HashMap<SettingId, String>,
    seeds: HashMap<SeedId, PlantedSeed>,
    seeds_by_key: HashMap<String, SeedId>,
    resolutions: HashMap<SeedId, ResolutionRecord>,
    /// A planted seed unresolved for this many chapters counts as stale
    staleness_window: u32,
}

struct CharacterRecord {
    name: String,
    /// Other character id -> bond intensity
    bonds: HashMap<CharacterId, u8>,
}

/// Ledger entry for a planted seed
#[derive(Debug, Clone)]
pub struct PlantedSeed {
    pub id: SeedId,
    /// Short handle the model uses to reference the seed across chapters
    pub key: String,
    pub chapter: ChapterId,
    pub chapter_ordinal: u32,
    pub description: String,
    pub expected_payoff: String,
}

#[derive(Debug, Clone)]
struct ResolutionRecord {
    chapter_ordinal: u32,
}

impl ContinuityTracker {
    pub fn new(staleness_window: u32) -> Self {
        Self {
            characters: HashMap::new(),
            settings: HashMap::new(),
            seeds: HashMap::new(),
            seeds_by_key: HashMap::new(),
            resolutions: HashMap::new(),
            staleness_window: staleness_window.max(1),
        }
    }

    pub fn register_characters(&mut self, characters: &[Character]) {
        for character in characters {
            let bonds = character
                .relationships
                .iter()
                .map(|(other, rel)| (*other, rel.intensity))
                .collect();
            self.characters.insert(
                character.id,
                CharacterRecord {
                    name: character.name.clone(),
                    bonds,
                },
            );
        }
    }

    pub fn register_settings(&mut self, settings: &[Setting]) {
        for setting in settings {
            self.settings.insert(setting.id, setting.name.clone());
        }
    }

    pub fn record_seed_planted(
        &mut self,
        chapter: ChapterId,
        chapter_ordinal: u32,
        key: &str,
        seed: &Seed,
    ) {
        let planted = PlantedSeed {
            id: seed.id,
            key: key.to_string(),
            chapter,
            chapter_ordinal,
            description: seed.description.clone(),
            expected_payoff: seed.expected_payoff.clone(),
        };
        self.seeds_by_key.insert(planted.key.clone(), seed.id);
        self.seeds.insert(seed.id, planted);
    }

    /// Ledger lookup by the model-facing key
    pub fn seed_by_key(&self, key: &str) -> Option<&PlantedSeed> {
        self.seeds_by_key.get(key).and_then(|id| self.seeds.get(id))
    }

    /// Record a seed payoff. Returns advisory violations (unknown seed,
    /// double resolution, resolution not after plant); the resolution is
    /// recorded regardless, matching the advisory-only policy.
    pub fn record_seed_resolved(
        &mut self,
        _chapter: ChapterId,
        chapter_ordinal: u32,
        _scene: Option<SceneId>,
        seed_id: SeedId,
        _payoff: &str,
    ) -> Vec<ContinuityViolation> {
        let mut violations = Vec::new();

        match self.seeds.get(&seed_id) {
            None => violations.push(ContinuityViolation::UnknownSeed {
                seed: seed_id,
                chapter_ordinal,
            }),
            Some(planted) if planted.chapter_ordinal >= chapter_ordinal => {
                violations.push(ContinuityViolation::SeedResolvedBeforePlant {
                    description: planted.description.clone(),
                    planted_ordinal: planted.chapter_ordinal,
                    resolved_ordinal: chapter_ordinal,
                });
            }
            Some(_) => {}
        }

        if let Some(existing) = self.resolutions.get(&seed_id) {
            let description = self
                .seeds
                .get(&seed_id)
                .map(|s| s.description.clone())
                .unwrap_or_else(|| seed_id.to_string());
            violations.push(ContinuityViolation::SeedResolvedTwice {
                description,
                first_ordinal: existing.chapter_ordinal,
                second_ordinal: chapter_ordinal,
            });
        } else {
            self.resolutions
                .insert(seed_id, ResolutionRecord { chapter_ordinal });
        }

        violations
    }

    /// Check near-symmetry of the relationship graph: for every A->B bond
    /// of intensity n, B->A must exist with intensity within ±1
    pub fn check_relationship_symmetry(&self) -> Vec<ContinuityViolation> {
        let mut violations = Vec::new();

        for (a_id, a) in &self.characters {
            for (b_id, &a_to_b) in &a.bonds {
                let Some(b) = self.characters.get(b_id) else {
                    continue; // dangling reference is a validation error, not a continuity one
                };
                match b.bonds.get(a_id) {
                    None => violations.push(ContinuityViolation::MissingReciprocal {
                        from: a.name.clone(),
                        to: b.name.clone(),
                    }),
                    Some(&b_to_a) if a_to_b.abs_diff(b_to_a) > 1 => {
                        violations.push(ContinuityViolation::AsymmetricIntensity {
                            from: a.name.clone(),
                            to: b.name.clone(),
                            forward: a_to_b,
                            backward: b_to_a,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        violations
    }

    /// Seeds planted more than the staleness window ago with no resolution
    pub fn check_unresolved_seeds(&self, as_of_ordinal: u32) -> Vec<ContinuityViolation> {
        let mut stale: Vec<ContinuityViolation> = self
            .seeds
            .values()
            .filter(|seed| !self.resolutions.contains_key(&seed.id))
            .filter(|seed| {
                as_of_ordinal.saturating_sub(seed.chapter_ordinal) >= self.staleness_window
            })
            .map(|seed| ContinuityViolation::StaleSeed {
                description: seed.description.clone(),
                planted_ordinal: seed.chapter_ordinal,
                as_of_ordinal,
            })
            .collect();
        stale.sort_by_key(|v| match v {
            ContinuityViolation::StaleSeed {
                planted_ordinal, ..
            } => *planted_ordinal,
            _ => u32::MAX,
        });
        stale
    }

    /// All planted seeds still awaiting a payoff, oldest first
    pub fn open_seeds(&self) -> Vec<&PlantedSeed> {
        let mut open: Vec<&PlantedSeed> = self
            .seeds
            .values()
            .filter(|seed| !self.resolutions.contains_key(&seed.id))
            .collect();
        open.sort_by_key(|s| s.chapter_ordinal);
        open
    }
}

/// Advisory continuity problem
///
/// These never abort a run; the orchestrator logs them and moves on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContinuityViolation {
    #[error("'{from}' has a bond to '{to}' with no reciprocal entry")]
    MissingReciprocal { from: String, to: String },

    #[error("bond '{from}'->'{to}' has intensity {forward} but reciprocal is {backward}")]
    AsymmetricIntensity {
        from: String,
        to: String,
        forward: u8,
        backward: u8,
    },

    #[error("chapter {chapter_ordinal} resolves seed {seed} that was never planted")]
    UnknownSeed {
        seed: SeedId,
        chapter_ordinal: u32,
    },

    #[error("seed '{description}' resolved twice (chapters {first_ordinal} and {second_ordinal})")]
    SeedResolvedTwice {
        description: String,
        first_ordinal: u32,
        second_ordinal: u32,
    },

    #[error("seed '{description}' resolved in chapter {resolved_ordinal}, not after its planting in chapter {planted_ordinal}")]
    SeedResolvedBeforePlant {
        description: String,
        planted_ordinal: u32,
        resolved_ordinal: u32,
    },

    #[error("seed '{description}' planted in chapter {planted_ordinal} still unresolved as of chapter {as_of_ordinal}")]
    StaleSeed {
        description: String,
        planted_ordinal: u32,
        as_of_ordinal: u32,
    },
}

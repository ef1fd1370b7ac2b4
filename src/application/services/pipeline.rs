//! Pipeline orchestrator - Eight dependent generation stages
//!
//! Sequences the stages in dependency order, feeding each stage's output
//! (validated against the story model) as structured context into the next:
//!
//! ```text
//! SUMMARY -> CHARACTERS ‖ SETTINGS -> PARTS -> CHAPTERS (per part)
//!   -> SCENE_SUMMARIES (per chapter) -> SCENE_CONTENT ⇄ EVALUATION (per scene)
//! ```
//!
//! The content⇄evaluation cycle is bounded: at most `max_regenerations`
//! retries per scene, after which the scene is accepted as-is with
//! `needs_improvement` set. Forward progress beats perfection.
//!
//! The orchestrator is the sole mutator of the story and the continuity
//! tracker; each run owns both, so concurrent runs share nothing but the
//! outbound connection pool.

use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::dto::{
    ChapterDraft, CharacterDraft, PartDraft, SceneSummaryDraft, SettingDraft, Stage, StageEvent,
    SummaryDraft,
};
use crate::application::ports::outbound::{
    CacheInvalidationPort, EntityType, GenerationRequest, StageSinkPort, TextGenPort,
};
use crate::application::services::continuity::{ContinuityTracker, PlantedSeed};
use crate::application::services::evaluator::{EvaluationContext, SceneEvaluator};
use crate::application::services::llm::prompt_builder;
use crate::application::services::structured_client::{
    ClientError, ParseFailure, StructuredClient,
};
use crate::domain::entities::{
    Chapter, Character, Part, Relationship, Scene, SceneEvaluation, Seed, SeedResolution, Setting,
    Story, SubPart,
};
use crate::domain::validation::ValidationError;
use crate::domain::value_objects::{CharacterId, EmotionalTone, GenerationId};

/// Per-stage generation parameters
#[derive(Debug, Clone, Copy)]
pub struct StageSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl StageSettings {
    /// Defaults for narrative stages
    pub fn narrative_default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            top_p: 0.9,
        }
    }

    /// Defaults for the evaluation stage: colder, for scoring consistency
    pub fn evaluation_default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1024,
            top_p: 0.9,
        }
    }
}

/// Pipeline-wide configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub narrative: StageSettings,
    pub evaluation: StageSettings,
    /// Regeneration ceiling per scene after a failed evaluation
    pub max_regenerations: u8,
    /// Chapters a seed may stay unresolved before it counts as stale
    pub seed_staleness_window: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            narrative: StageSettings::narrative_default(),
            evaluation: StageSettings::evaluation_default(),
            max_regenerations: 2,
            seed_staleness_window: 5,
        }
    }
}

/// Inbound request to generate a story
#[derive(Debug, Clone, serde::Deserialize)]
pub struct StoryRequest {
    pub user_prompt: String,
    #[serde(default)]
    pub preferred_genre: Option<String>,
    #[serde(default)]
    pub preferred_tone: Option<EmotionalTone>,
    /// 2-4; defaults to 3
    #[serde(default)]
    pub character_count: Option<u8>,
}

/// A stage failed; the run aborts
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Network failure, timeout, or service error during generation
    #[error("stage {stage}: generation failed: {cause}")]
    Generation { stage: Stage, cause: String },
    /// Model output could not be coerced to the stage schema
    #[error("stage {stage}: {failure}")]
    Parse { stage: Stage, failure: ParseFailure },
    /// Stage output violates the story model's structural invariants
    #[error("stage {stage}: output failed validation: {}", format_errors(.errors))]
    Validation {
        stage: Stage,
        errors: Vec<ValidationError>,
    },
    /// The run was cancelled before this stage issued its calls
    #[error("stage {stage}: run cancelled")]
    Cancelled { stage: Stage },
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Generation { stage, .. }
            | Self::Parse { stage, .. }
            | Self::Validation { stage, .. }
            | Self::Cancelled { stage } => *stage,
        }
    }

    fn from_client(stage: Stage, error: ClientError) -> Self {
        match error {
            ClientError::Generation(cause) => Self::Generation { stage, cause },
            ClientError::Parse(failure) => Self::Parse { stage, failure },
        }
    }
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A pipeline run that aborted partway
///
/// Carries the last stage that completed successfully so the caller can
/// resume from there instead of restarting from scratch.
#[derive(Debug)]
pub struct PartialFailure {
    pub last_good_stage: Option<Stage>,
    pub error: StageError,
}

impl std::fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.last_good_stage {
            Some(stage) => write!(f, "{} (last completed stage: {})", self.error, stage),
            None => write!(f, "{} (no stage completed)", self.error),
        }
    }
}

impl std::error::Error for PartialFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Orchestrator for one story-generation run
pub struct PipelineOrchestrator<L: TextGenPort> {
    client: Arc<StructuredClient<L>>,
    evaluator: SceneEvaluator<L>,
    config: PipelineConfig,
    sinks: Vec<Arc<dyn StageSinkPort>>,
    caches: Vec<Arc<dyn CacheInvalidationPort>>,
    cancel: CancellationToken,
    generation_id: GenerationId,
}

impl<L: TextGenPort> PipelineOrchestrator<L> {
    pub fn new(client: Arc<StructuredClient<L>>, config: PipelineConfig) -> Self {
        let evaluator = SceneEvaluator::new(client.clone(), config.evaluation);
        Self {
            client,
            evaluator,
            config,
            sinks: Vec::new(),
            caches: Vec::new(),
            cancel: CancellationToken::new(),
            generation_id: GenerationId::new(),
        }
    }

    /// Attach a persistence collaborator
    pub fn with_sink(mut self, sink: Arc<dyn StageSinkPort>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Attach a cache-invalidation collaborator
    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidationPort>) -> Self {
        self.caches.push(cache);
        self
    }

    /// Use an external cancellation token. Cancelling stops new stage
    /// calls; in-flight calls complete or time out normally.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn generation_id(&self) -> GenerationId {
        self.generation_id
    }

    /// Run the complete pipeline: prompt in, full story out
    pub async fn run_full_pipeline(&self, request: StoryRequest) -> Result<Story, PartialFailure> {
        let mut last_good: Option<Stage> = None;
        match self.run_pipeline_inner(&request, &mut last_good).await {
            Ok(story) => Ok(story),
            Err(error) => {
                tracing::error!(stage = %error.stage(), %error, "pipeline run aborted");
                self.emit(StageEvent::failed(
                    self.generation_id,
                    error.stage(),
                    &error.to_string(),
                ))
                .await;
                Err(PartialFailure {
                    last_good_stage: last_good,
                    error,
                })
            }
        }
    }

    async fn run_pipeline_inner(
        &self,
        request: &StoryRequest,
        last_good: &mut Option<Stage>,
    ) -> Result<Story, StageError> {
        let mut tracker = ContinuityTracker::new(self.config.seed_staleness_window);

        // Stage 1: premise
        self.emit(StageEvent::started(self.generation_id, Stage::Summary))
            .await;
        let mut story = self.run_summary(request).await?;
        self.complete_stage(Stage::Summary, serde_json::json!({
            "story_id": story.id,
            "central_dramatic_question": story.central_dramatic_question,
            "genre": story.genre,
            "tone": story.tone,
        }))
        .await;
        self.invalidate(EntityType::Story, *story.id.as_uuid()).await;
        *last_good = Some(Stage::Summary);

        // Stages 2+3: cast and settings, no mutual dependency
        let character_count = request.character_count.unwrap_or(3).clamp(2, 4);
        self.emit(StageEvent::started(self.generation_id, Stage::Characters))
            .await;
        self.emit(StageEvent::started(self.generation_id, Stage::Settings))
            .await;
        let (characters, settings) = tokio::join!(
            self.run_characters(&story, character_count),
            self.run_settings(&story)
        );

        story.characters = characters?;
        self.complete_stage(
            Stage::Characters,
            serde_json::to_value(&story.characters).unwrap_or_default(),
        )
        .await;
        *last_good = Some(Stage::Characters);

        story.settings = settings?;
        self.complete_stage(
            Stage::Settings,
            serde_json::to_value(&story.settings).unwrap_or_default(),
        )
        .await;
        self.invalidate(EntityType::Story, *story.id.as_uuid()).await;
        *last_good = Some(Stage::Settings);

        tracker.register_characters(&story.characters);
        tracker.register_settings(&story.settings);
        for violation in tracker.check_relationship_symmetry() {
            tracing::warn!(%violation, "continuity violation (advisory)");
        }

        // Stage 4: acts and MACRO arcs
        self.emit(StageEvent::started(self.generation_id, Stage::Parts))
            .await;
        story.parts = self.run_parts(&story).await?;
        self.complete_stage(
            Stage::Parts,
            serde_json::to_value(&story.parts).unwrap_or_default(),
        )
        .await;
        for part in &story.parts {
            self.invalidate(EntityType::Part, *part.id.as_uuid()).await;
        }
        *last_good = Some(Stage::Parts);

        // Stage 5: chapters, concurrent across parts, merged in order
        self.emit(StageEvent::started(self.generation_id, Stage::Chapters))
            .await;
        self.run_chapters(&mut story, &mut tracker).await?;
        for part in &story.parts {
            self.complete_stage(
                Stage::Chapters,
                serde_json::json!({
                    "part_id": part.id,
                    "chapters": part.chapters,
                }),
            )
            .await;
            for chapter in &part.chapters {
                self.invalidate(EntityType::Chapter, *chapter.id.as_uuid())
                    .await;
            }
        }
        *last_good = Some(Stage::Chapters);

        // Stage 6: scene summaries, concurrent across chapters
        self.emit(StageEvent::started(self.generation_id, Stage::SceneSummaries))
            .await;
        self.run_scene_summaries(&mut story).await?;
        for chapter in story.chapters() {
            self.complete_stage(
                Stage::SceneSummaries,
                serde_json::json!({
                    "chapter_id": chapter.id,
                    "scenes": chapter.scenes,
                }),
            )
            .await;
        }
        *last_good = Some(Stage::SceneSummaries);

        // Stages 7+8: prose and its quality gate, concurrent across
        // chapters, strictly sequential within each chapter
        self.emit(StageEvent::started(self.generation_id, Stage::SceneContent))
            .await;
        self.emit(StageEvent::started(self.generation_id, Stage::Evaluation))
            .await;
        self.run_scene_content(&mut story).await?;
        for chapter in story.chapters() {
            self.complete_stage(
                Stage::SceneContent,
                serde_json::json!({
                    "chapter_id": chapter.id,
                    "scenes": chapter.scenes,
                }),
            )
            .await;
            for scene in &chapter.scenes {
                self.invalidate(EntityType::Scene, *scene.id.as_uuid()).await;
            }
        }
        *last_good = Some(Stage::SceneContent);

        // Final structural pass over the assembled story
        let errors = story.validate();
        if !errors.is_empty() {
            return Err(StageError::Validation {
                stage: Stage::Evaluation,
                errors,
            });
        }

        // Final advisory sweep now that the whole story is assembled
        let last_ordinal = story.chapters().map(|c| c.ordinal).max().unwrap_or(0);
        for violation in tracker
            .check_relationship_symmetry()
            .into_iter()
            .chain(tracker.check_unresolved_seeds(last_ordinal))
        {
            tracing::warn!(%violation, "continuity violation (advisory)");
        }
        let seeds_unresolved = tracker.open_seeds().len();

        let evaluated = story.scene_count();
        let flagged = story
            .chapters()
            .flat_map(|c| c.scenes.iter())
            .filter(|s| s.needs_improvement)
            .count();
        self.complete_stage(
            Stage::Evaluation,
            serde_json::json!({
                "story_id": story.id,
                "scenes_evaluated": evaluated,
                "scenes_needing_improvement": flagged,
                "seeds_unresolved": seeds_unresolved,
            }),
        )
        .await;
        self.invalidate(EntityType::Story, *story.id.as_uuid()).await;
        *last_good = Some(Stage::Evaluation);

        tracing::info!(
            story_id = %story.id,
            chapters = story.chapters().count(),
            scenes = evaluated,
            flagged,
            "story generation complete"
        );
        Ok(story)
    }

    /// Stage 1: distill the user prompt into a premise
    pub async fn run_summary(&self, request: &StoryRequest) -> Result<Story, StageError> {
        self.ensure_active(Stage::Summary)?;

        let prompt = prompt_builder::build_summary_prompt(request);
        let draft: SummaryDraft = self
            .client
            .generate_structured(self.narrative_request(prompt))
            .await
            .map_err(|e| StageError::from_client(Stage::Summary, e))?;

        let mut story = Story::new(draft.central_dramatic_question, draft.genre, draft.tone);
        story.moral_framework = draft.moral_framework;

        let errors = story.validate_premise();
        if !errors.is_empty() {
            return Err(StageError::Validation {
                stage: Stage::Summary,
                errors,
            });
        }
        Ok(story)
    }

    /// Stage 2: generate the cast
    pub async fn run_characters(
        &self,
        story: &Story,
        character_count: u8,
    ) -> Result<Vec<Character>, StageError> {
        self.ensure_active(Stage::Characters)?;

        let prompt = prompt_builder::build_characters_prompt(story, character_count);
        let drafts: Vec<CharacterDraft> = self
            .client
            .generate_structured(self.narrative_request(prompt))
            .await
            .map_err(|e| StageError::from_client(Stage::Characters, e))?;

        // First pass: create the characters so every name has an id
        let mut characters: Vec<Character> = drafts
            .iter()
            .map(|draft| {
                let mut character = Character::new(draft.name.trim())
                    .with_strength(&draft.strength)
                    .with_internal_flaw(&draft.internal_flaw)
                    .with_external_goal(&draft.external_goal);
                character.is_primary_protagonist = draft.is_primary_protagonist;
                character
            })
            .collect();

        // Second pass: resolve relationship names to ids
        let ids: Vec<(String, CharacterId)> = characters
            .iter()
            .map(|c| (c.name.to_lowercase(), c.id))
            .collect();
        let lookup = |name: &str| -> Option<CharacterId> {
            let needle = name.trim().to_lowercase();
            ids.iter().find(|(n, _)| *n == needle).map(|(_, id)| *id)
        };

        let mut errors = Vec::new();
        for (character, draft) in characters.iter_mut().zip(&drafts) {
            for rel in &draft.relationships {
                match lookup(&rel.with) {
                    Some(other) => {
                        character.relationships.insert(
                            other,
                            Relationship::new(rel.category, rel.intensity)
                                .with_history(&rel.shared_history)
                                .with_dynamic(&rel.current_dynamic),
                        );
                    }
                    None => errors.push(ValidationError::UnknownCharacterReference {
                        entity: format!("character '{}'", character.name),
                        reference: rel.with.clone(),
                    }),
                }
            }
        }

        let mut preview = story.clone();
        preview.characters = characters.clone();
        errors.extend(preview.validate_cast());
        if !errors.is_empty() {
            return Err(StageError::Validation {
                stage: Stage::Characters,
                errors,
            });
        }
        Ok(characters)
    }

    /// Stage 3: generate the settings
    pub async fn run_settings(&self, story: &Story) -> Result<Vec<Setting>, StageError> {
        self.ensure_active(Stage::Settings)?;

        let prompt = prompt_builder::build_settings_prompt(story);
        let drafts: Vec<SettingDraft> = self
            .client
            .generate_structured(self.narrative_request(prompt))
            .await
            .map_err(|e| StageError::from_client(Stage::Settings, e))?;

        let settings: Vec<Setting> = drafts
            .into_iter()
            .map(|draft| {
                let mut setting = Setting::new(draft.name.trim());
                setting.adversity.physical_obstacles = draft.physical_obstacles;
                setting.adversity.scarcity_factors = draft.scarcity_factors;
                setting.adversity.danger_sources = draft.danger_sources;
                setting.adversity.social_dynamics = draft.social_dynamics;
                setting.symbolic_meaning = draft.symbolic_meaning;
                setting.mood = draft.mood;
                setting.phase_amplification.setup = draft.phase_amplification.setup;
                setting.phase_amplification.confrontation = draft.phase_amplification.confrontation;
                setting.phase_amplification.virtue = draft.phase_amplification.virtue;
                setting.phase_amplification.consequence = draft.phase_amplification.consequence;
                setting.phase_amplification.transition = draft.phase_amplification.transition;
                setting.sensory.sights = draft.sights;
                setting.sensory.sounds = draft.sounds;
                setting.sensory.smells = draft.smells;
                setting.sensory.textures = draft.textures;
                setting
            })
            .collect();

        let mut preview = story.clone();
        preview.settings = settings.clone();
        let errors = preview.validate_settings();
        if !errors.is_empty() {
            return Err(StageError::Validation {
                stage: Stage::Settings,
                errors,
            });
        }
        Ok(settings)
    }

    /// Stage 4: generate the acts and their MACRO arcs
    pub async fn run_parts(&self, story: &Story) -> Result<Vec<Part>, StageError> {
        self.ensure_active(Stage::Parts)?;

        let prompt = prompt_builder::build_parts_prompt(story);
        let drafts: Vec<PartDraft> = self
            .client
            .generate_structured(self.narrative_request(prompt))
            .await
            .map_err(|e| StageError::from_client(Stage::Parts, e))?;

        let mut errors = Vec::new();
        let mut parts = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let mut part = Part::new(draft.act_number, draft.title.trim());
            part.summary = draft.summary;
            part.sub_label = match draft.sub_label.as_deref().map(str::trim) {
                Some("A") | Some("a") => Some(SubPart::A),
                Some("B") | Some("b") => Some(SubPart::B),
                Some(other) if !other.is_empty() => {
                    tracing::warn!(label = other, "unrecognized sub-part label, ignoring");
                    None
                }
                _ => None,
            };

            for arc_draft in draft.macro_arcs {
                match story.character_by_name(&arc_draft.character) {
                    Some(character) => part.macro_arcs.push(crate::domain::entities::MacroArc {
                        character: character.id,
                        character_name: character.name.clone(),
                        internal_adversity: arc_draft.internal_adversity,
                        external_adversity: arc_draft.external_adversity,
                        virtue: arc_draft.virtue,
                        consequence: arc_draft.consequence,
                        new_adversity: arc_draft.new_adversity,
                        estimated_chapters: arc_draft.estimated_chapters,
                    }),
                    None => errors.push(ValidationError::UnknownCharacterReference {
                        entity: format!("part {}", part.label()),
                        reference: arc_draft.character.clone(),
                    }),
                }
            }

            errors.extend(part.validate());
            parts.push(part);
        }

        let mut preview = story.clone();
        preview.parts = parts.clone();
        let split_count = preview
            .parts
            .iter()
            .filter(|p| p.sub_label.is_some())
            .map(|p| p.act_number)
            .collect::<std::collections::HashSet<u8>>()
            .len();
        if split_count > 1 {
            errors.push(ValidationError::MultiplePartSplits);
        }
        if !errors.is_empty() {
            return Err(StageError::Validation {
                stage: Stage::Parts,
                errors,
            });
        }
        Ok(parts)
    }

    /// Stage 5: generate chapters for every part (parts run concurrently,
    /// chapters are merged and causally chained in story order)
    async fn run_chapters(
        &self,
        story: &mut Story,
        tracker: &mut ContinuityTracker,
    ) -> Result<(), StageError> {
        self.ensure_active(Stage::Chapters)?;

        let open_seeds: Vec<PlantedSeed> = tracker.open_seeds().into_iter().cloned().collect();
        let seed_refs: Vec<&PlantedSeed> = open_seeds.iter().collect();

        let drafts: Vec<Vec<ChapterDraft>> = {
            let story_ref = &*story;
            try_join_all(story_ref.parts.iter().enumerate().map(|(idx, part)| {
                let previous = if idx == 0 {
                    None
                } else {
                    part_handoff(story_ref, &story_ref.parts[idx - 1])
                };
                let seed_refs = seed_refs.clone();
                async move {
                    self.ensure_active(Stage::Chapters)?;
                    let prompt = prompt_builder::build_chapters_prompt(
                        story_ref,
                        part,
                        previous.as_deref(),
                        &seed_refs,
                    );
                    self.client
                        .generate_structured::<Vec<ChapterDraft>>(self.narrative_request(prompt))
                        .await
                        .map_err(|e| StageError::from_client(Stage::Chapters, e))
                }
            }))
            .await?
        };

        let mut ordinal: u32 = 0;
        for (idx, part_drafts) in drafts.into_iter().enumerate() {
            let part_id = story.parts[idx].id;
            let mut chapters = Vec::with_capacity(part_drafts.len());
            let mut errors = Vec::new();
            let mut previous_next_adversity: Option<String> =
                chapters_last_adversity(&story.parts[..idx]);

            for draft in part_drafts {
                ordinal += 1;

                let Some(owner) = story.character_by_name(&draft.owning_character) else {
                    errors.push(ValidationError::UnknownCharacterReference {
                        entity: format!("chapter {}", ordinal),
                        reference: draft.owning_character.clone(),
                    });
                    continue;
                };

                let mut chapter = Chapter::new(part_id, ordinal, owner.id);
                chapter.title = draft.title;
                chapter.summary = draft.summary;
                chapter.arc_position = draft.arc_position;
                chapter.arc_contribution = draft.arc_contribution;
                chapter.adversity_type = draft.adversity_type;
                chapter.virtue_type = draft.virtue_type;
                chapter.next_adversity = draft.next_adversity;

                for name in &draft.focus_characters {
                    match story.character_by_name(name) {
                        Some(c) => chapter.focus_characters.push(c.id),
                        None => errors.push(ValidationError::UnknownCharacterReference {
                            entity: format!("chapter {}", ordinal),
                            reference: name.clone(),
                        }),
                    }
                }

                // Causal chaining: prefer the model's own link, fall back to
                // the previous chapter's declared next-adversity
                chapter.causal_link = if draft.causal_link.trim().is_empty() {
                    previous_next_adversity.clone().unwrap_or_default()
                } else {
                    draft.causal_link
                };

                for seed_draft in &draft.seeds_planted {
                    let seed = Seed::new(&seed_draft.description, &seed_draft.expected_payoff);
                    tracker.record_seed_planted(chapter.id, ordinal, &seed_draft.key, &seed);
                    chapter.seeds_planted.push(seed);
                }
                for resolution in &draft.seeds_resolved {
                    match tracker.seed_by_key(&resolution.key) {
                        Some(planted) => {
                            let seed_id = planted.id;
                            let source_chapter = planted.chapter;
                            for violation in tracker.record_seed_resolved(
                                chapter.id,
                                ordinal,
                                None,
                                seed_id,
                                &resolution.payoff,
                            ) {
                                tracing::warn!(%violation, "continuity violation (advisory)");
                            }
                            chapter.seeds_resolved.push(SeedResolution {
                                seed_id,
                                source_chapter,
                                source_scene: None,
                                payoff: resolution.payoff.clone(),
                            });
                        }
                        None => {
                            // Dropping the payoff keeps the ledger sound; the
                            // model referenced a key it never planted
                            tracing::warn!(
                                key = %resolution.key,
                                chapter = ordinal,
                                "resolution references unknown seed key, dropping"
                            );
                        }
                    }
                }

                errors.extend(chapter.validate());
                for violation in tracker.check_unresolved_seeds(ordinal) {
                    tracing::warn!(%violation, "continuity violation (advisory)");
                }

                previous_next_adversity = Some(chapter.next_adversity.clone());
                chapters.push(chapter);
            }

            if !errors.is_empty() {
                return Err(StageError::Validation {
                    stage: Stage::Chapters,
                    errors,
                });
            }
            story.parts[idx].chapters = chapters;

            for warning in story.parts[idx].arc_pacing_warnings() {
                tracing::warn!(%warning, "arc pacing (advisory)");
            }
        }

        Ok(())
    }

    /// Stage 6: generate scene summaries for every chapter (concurrent
    /// across chapters)
    async fn run_scene_summaries(&self, story: &mut Story) -> Result<(), StageError> {
        self.ensure_active(Stage::SceneSummaries)?;

        let positions: Vec<(usize, usize)> = story
            .parts
            .iter()
            .enumerate()
            .flat_map(|(pi, p)| (0..p.chapters.len()).map(move |ci| (pi, ci)))
            .collect();

        let drafts: Vec<Vec<SceneSummaryDraft>> = {
            let story_ref = &*story;
            try_join_all(positions.iter().map(|&(pi, ci)| async move {
                self.ensure_active(Stage::SceneSummaries)?;
                let part = &story_ref.parts[pi];
                let chapter = &part.chapters[ci];
                let prompt = prompt_builder::build_scene_summaries_prompt(story_ref, part, chapter);
                self.client
                    .generate_structured::<Vec<SceneSummaryDraft>>(self.narrative_request(prompt))
                    .await
                    .map_err(|e| StageError::from_client(Stage::SceneSummaries, e))
            }))
            .await?
        };

        for (&(pi, ci), chapter_drafts) in positions.iter().zip(drafts) {
            let mut errors = Vec::new();
            let mut scenes = Vec::with_capacity(chapter_drafts.len());
            let chapter_id = story.parts[pi].chapters[ci].id;

            for (i, draft) in chapter_drafts.into_iter().enumerate() {
                let mut scene = Scene::new(chapter_id, (i + 1) as u32, draft.title.trim());
                scene.summary = draft.summary;
                scene.cycle_phase = draft.cycle_phase;
                scene.emotional_beat = draft.emotional_beat;
                scene.sensory_anchors = draft.sensory_anchors;
                scene.length_class = draft.length_class;
                for name in &draft.focus_characters {
                    match story.character_by_name(name) {
                        Some(c) => scene.focus_characters.push(c.id),
                        None => errors.push(ValidationError::UnknownCharacterReference {
                            entity: format!("scene '{}'", scene.title),
                            reference: name.clone(),
                        }),
                    }
                }
                scenes.push(scene);
            }

            let chapter = &mut story.parts[pi].chapters[ci];
            chapter.scenes = scenes;
            errors.extend(chapter.validate_scenes());
            if !errors.is_empty() {
                return Err(StageError::Validation {
                    stage: Stage::SceneSummaries,
                    errors,
                });
            }
        }

        Ok(())
    }

    /// Stages 7+8: generate and gate prose for every scene (concurrent
    /// across chapters, sequential within a chapter)
    async fn run_scene_content(&self, story: &mut Story) -> Result<(), StageError> {
        self.ensure_active(Stage::SceneContent)?;

        let positions: Vec<(usize, usize)> = story
            .parts
            .iter()
            .enumerate()
            .flat_map(|(pi, p)| (0..p.chapters.len()).map(move |ci| (pi, ci)))
            .collect();

        let snapshot = story.clone();
        let finished: Vec<Chapter> = try_join_all(positions.iter().map(|&(pi, ci)| {
            let chapter = snapshot.parts[pi].chapters[ci].clone();
            let snapshot = &snapshot;
            async move { self.fill_chapter_scenes(snapshot, chapter).await }
        }))
        .await?;

        for (&(pi, ci), chapter) in positions.iter().zip(finished) {
            story.parts[pi].chapters[ci] = chapter;
        }
        Ok(())
    }

    /// Generate prose for each scene of one chapter, in order, applying the
    /// bounded evaluate-regenerate cycle
    async fn fill_chapter_scenes(
        &self,
        story: &Story,
        mut chapter: Chapter,
    ) -> Result<Chapter, StageError> {
        for i in 0..chapter.scenes.len() {
            let previous_summary = (i > 0).then(|| chapter.scenes[i - 1].summary.clone());
            let context = EvaluationContext {
                central_dramatic_question: story.central_dramatic_question.clone(),
                genre: story.genre.clone(),
                tone: story.tone,
                chapter_summary: chapter.summary.clone(),
                scene_summary: chapter.scenes[i].summary.clone(),
                cycle_phase: chapter.scenes[i].cycle_phase,
                emotional_beat: chapter.scenes[i].emotional_beat,
            };

            let mut feedback: Option<SceneEvaluation> = None;
            let mut attempts: u8 = 0;
            loop {
                self.ensure_active(Stage::SceneContent)?;

                let prompt = prompt_builder::build_scene_content_prompt(
                    story,
                    &chapter,
                    &chapter.scenes[i],
                    previous_summary.as_deref(),
                    feedback.as_ref(),
                );
                let content = self
                    .client
                    .generate(self.narrative_request(prompt))
                    .await
                    .map_err(|e| StageError::from_client(Stage::SceneContent, e))?;

                let evaluation = self
                    .evaluator
                    .evaluate(&content, &context)
                    .await
                    .map_err(|e| StageError::from_client(Stage::Evaluation, e))?;
                let passed = evaluation.passed;

                let scene = &mut chapter.scenes[i];
                scene.content = Some(content);
                scene.regeneration_count = attempts;
                scene.evaluation = Some(evaluation.clone());

                if passed {
                    scene.needs_improvement = false;
                    break;
                }
                if attempts >= self.config.max_regenerations {
                    // Quality gate exhausted: accept imperfect prose rather
                    // than stalling the run
                    scene.needs_improvement = true;
                    tracing::warn!(
                        scene = %scene.id,
                        overall = evaluation.overall_score,
                        "scene accepted after exhausting regenerations"
                    );
                    break;
                }
                attempts += 1;
                tracing::debug!(
                    scene = %chapter.scenes[i].id,
                    attempt = attempts,
                    overall = evaluation.overall_score,
                    "scene failed quality gate, regenerating"
                );
                feedback = Some(evaluation);
            }
        }
        Ok(chapter)
    }

    fn narrative_request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest::new(prompt)
            .with_temperature(self.config.narrative.temperature)
            .with_max_tokens(self.config.narrative.max_tokens)
            .with_top_p(self.config.narrative.top_p)
    }

    fn ensure_active(&self, stage: Stage) -> Result<(), StageError> {
        if self.cancel.is_cancelled() {
            return Err(StageError::Cancelled { stage });
        }
        Ok(())
    }

    async fn complete_stage(&self, stage: Stage, payload: serde_json::Value) {
        self.emit(StageEvent::completed(self.generation_id, stage, payload))
            .await;
    }

    async fn emit(&self, event: StageEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.on_stage_complete(&event).await {
                tracing::warn!(stage = %event.stage, error = %e, "stage sink failed");
            }
        }
    }

    async fn invalidate(&self, entity_type: EntityType, entity_id: Uuid) {
        for cache in &self.caches {
            if let Err(e) = cache.invalidate(entity_type, entity_id).await {
                tracing::warn!(%entity_type, %entity_id, error = %e, "cache invalidation failed");
            }
        }
    }
}

/// What the previous part hands to the next one as a causal anchor:
/// the protagonist's macro new-adversity, or the first arc's
fn part_handoff(story: &Story, previous: &Part) -> Option<String> {
    let protagonist = story.protagonist()?;
    previous
        .macro_arc_for(&protagonist.id)
        .or_else(|| previous.macro_arcs.first())
        .map(|arc| arc.new_adversity.clone())
}

/// Next-adversity of the last merged chapter in the given parts, if any
fn chapters_last_adversity(parts: &[Part]) -> Option<String> {
    parts
        .iter()
        .rev()
        .flat_map(|p| p.chapters.iter().rev())
        .next()
        .map(|c| c.next_adversity.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use crate::application::dto::StageStatus;
    use crate::application::ports::outbound::{GenerationResponse, SinkError};

    fn summary_json() -> String {
        r#"```json
{
  "central_dramatic_question": "Can Mira save the drowned archive without losing the crew?",
  "genre": "fantasy",
  "tone": "hopeful",
  "moral_framework": "Help accepted is not weakness"
}
```"#
            .to_string()
    }

    fn characters_json() -> String {
        r#"```json
[
  {
    "name": "Mira",
    "is_primary_protagonist": true,
    "strength": "Reads the water like a ledger",
    "internal_flaw": "Believes needing help is weakness",
    "external_goal": "Map the drowned archive before it collapses",
    "relationships": [
      {"with": "Tamsin", "category": "ally", "intensity": 7,
       "shared_history": "Grew up on the same barge", "current_dynamic": "Strained trust"}
    ]
  },
  {
    "name": "Tamsin",
    "strength": "Keeps the crew fed and honest",
    "internal_flaw": "Avoids conflict until it boils",
    "external_goal": "Get the crew out solvent",
    "relationships": [
      {"with": "Mira", "category": "ally", "intensity": 6,
       "shared_history": "Grew up on the same barge", "current_dynamic": "Protective"}
    ]
  },
  {
    "name": "Orrin",
    "strength": "Knows every archivist by debt",
    "internal_flaw": "Sells loyalty cheap",
    "external_goal": "Buy back his name",
    "relationships": []
  }
]
```"#
            .to_string()
    }

    fn settings_json() -> String {
        r#"[
  {
    "name": "The Drowned Archive",
    "physical_obstacles": ["Flooded stairwells", "Collapsed stacks"],
    "scarcity_factors": ["Dry paper", "Lamp oil"],
    "danger_sources": ["Rising tide", "Archivist patrols"],
    "social_dynamics": ["Archivists despise salvagers"],
    "symbolic_meaning": "Memory that refuses to stay buried",
    "mood": "Hushed, waterlogged dread",
    "phase_amplification": {
      "setup": "Low water reveals forbidden shelves",
      "confrontation": "The tide turns and exits close",
      "virtue": "A dry room worth dying for",
      "consequence": "Flotsam carries evidence of the choice",
      "transition": "The water settles into new channels"
    },
    "sights": ["Ink blooming through water"],
    "sounds": ["Dripping in the stacks"],
    "smells": ["Wet vellum"],
    "textures": ["Swollen bindings"]
  },
  {
    "name": "The Barge Market",
    "physical_obstacles": ["Shifting gangplanks"],
    "scarcity_factors": ["Honest brokers"],
    "danger_sources": ["Debt collectors"],
    "social_dynamics": ["Everyone owes everyone"],
    "symbolic_meaning": "Community held together by obligation",
    "mood": "Loud, brittle cheer",
    "phase_amplification": {
      "setup": "Stalls open and rumors travel",
      "confrontation": "Creditors call their markers",
      "virtue": "A debt forgiven in public",
      "consequence": "The market re-prices the crew",
      "transition": "Night stalls fold away"
    },
    "sights": ["Lanterns doubled in the water"],
    "sounds": ["Hull timbers groaning"],
    "smells": [],
    "textures": []
  }
]"#
        .to_string()
    }

    fn parts_json() -> String {
        r#"```json
[
  {
    "act_number": 1,
    "title": "Low Water",
    "summary": "Mira finds the archive open and the crew divided",
    "macro_arcs": [
      {
        "character": "Mira",
        "internal_adversity": "Trusting the crew with the map",
        "external_adversity": "The archive floods on a schedule",
        "virtue": "Asks for help at real cost",
        "consequence": "The crew saves the maps together",
        "new_adversity": "The archivists know what she carries",
        "estimated_chapters": 2
      }
    ]
  }
]
```"#
            .to_string()
    }

    fn chapters_json(resolve_key: &str) -> String {
        format!(
            r#"```json
[
  {{
    "title": "The Locked Stacks",
    "summary": "Mira trades her map for one night inside",
    "owning_character": "Mira",
    "arc_position": "middle",
    "arc_contribution": "First crack in her self-reliance",
    "focus_characters": ["Mira", "Tamsin"],
    "adversity_type": "both",
    "virtue_type": "courage",
    "seeds_planted": [
      {{"key": "brass-key", "description": "A brass key taken from the flood line",
        "expected_payoff": "Opens the sealed vault"}}
    ],
    "seeds_resolved": [],
    "causal_link": "",
    "next_adversity": "The tide turns early and the exits close"
  }},
  {{
    "title": "The Sealed Vault",
    "summary": "The crew reaches the vault as the water rises",
    "owning_character": "Mira",
    "arc_position": "climax",
    "arc_contribution": "She hands Tamsin the key and the decision",
    "focus_characters": ["Mira", "Tamsin", "Orrin"],
    "adversity_type": "external",
    "virtue_type": "sacrifice",
    "seeds_planted": [],
    "seeds_resolved": [
      {{"key": "{resolve_key}", "payoff": "The brass key opens the vault at the worst moment"}}
    ],
    "causal_link": "With the exits closing, the vault is the only way through",
    "next_adversity": "The archivists seal the outer doors"
  }}
]
```"#
        )
    }

    fn scenes_json() -> String {
        r#"```json
[
  {"title": "Flood Line", "summary": "Mira reads the high-water marks",
   "cycle_phase": "setup", "emotional_beat": "tension",
   "focus_characters": ["Mira"],
   "sensory_anchors": ["Ink blooming through water", "A cold brass handle", "Dripping in the stacks"],
   "length_class": "short"},
  {"title": "The Archivist", "summary": "An archivist names Mira's debt",
   "cycle_phase": "confrontation", "emotional_beat": "fear",
   "focus_characters": ["Mira", "Orrin"],
   "sensory_anchors": ["Lamp oil smoke", "Wet vellum", "A ledger's red thread"],
   "length_class": "medium"},
  {"title": "The Ask", "summary": "Mira hands over the map and asks for help",
   "cycle_phase": "virtue", "emotional_beat": "elevation",
   "focus_characters": ["Mira", "Tamsin"],
   "sensory_anchors": ["The map's worn crease", "Tamsin's chapped hands", "Water at ankle height"],
   "length_class": "long"},
  {"title": "What the Water Returns", "summary": "The crew works the stacks together",
   "cycle_phase": "consequence", "emotional_beat": "relief",
   "focus_characters": ["Tamsin"],
   "sensory_anchors": ["Paper drying on lines", "Hull timbers groaning", "Salt on split lips"],
   "length_class": "medium"},
  {"title": "High Water", "summary": "The tide takes the lower floor behind them",
   "cycle_phase": "transition", "emotional_beat": "hope",
   "focus_characters": ["Mira"],
   "sensory_anchors": ["Lanterns doubled in the water", "A closed door's last click", "The smell of rain"],
   "length_class": "short"}
]
```"#
            .to_string()
    }

    fn evaluation_json(score: f32) -> String {
        format!(
            r#"{{"scores": {{"plot": {score}, "character": {score}, "pacing": {score}, "prose": {score}, "world_building": {score}}},
"strengths": ["The water imagery carries the theme"],
"improvements": ["Ground the stakes earlier"],
"priority_fixes": ["Cut the opening throat-clearing"]}}"#
        )
    }

    /// Routes canned responses by recognizing which stage's prompt arrived.
    /// Evaluation responses pop from a scripted queue; when the queue is
    /// empty a passing evaluation is returned.
    struct RoutedTextGen {
        evaluations: Mutex<VecDeque<String>>,
        garble_characters: bool,
        resolve_key: String,
    }

    impl RoutedTextGen {
        fn new() -> Self {
            Self {
                evaluations: Mutex::new(VecDeque::new()),
                garble_characters: false,
                resolve_key: "brass-key".to_string(),
            }
        }

        fn with_evaluations(scores: &[f32]) -> Self {
            let textgen = Self::new();
            {
                let mut queue = textgen.evaluations.lock().unwrap();
                for &score in scores {
                    queue.push_back(evaluation_json(score));
                }
            }
            textgen
        }

        fn route(&self, prompt: &str) -> String {
            if prompt.contains("Distill the user's idea") {
                summary_json()
            } else if prompt.contains("designing the cast") {
                if self.garble_characters {
                    "no structure here at all".to_string()
                } else {
                    characters_json()
                }
            } else if prompt.contains("designing settings") {
                settings_json()
            } else if prompt.contains("structuring a story into acts") {
                parts_json()
            } else if prompt.contains("writing the chapter outline") {
                chapters_json(&self.resolve_key)
            } else if prompt.contains("breaking chapter") {
                scenes_json()
            } else if prompt.contains("fiction editor scoring") {
                self.evaluations
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| evaluation_json(3.4))
            } else {
                "The rain kept its own ledger over the drowned stacks.".to_string()
            }
        }
    }

    #[async_trait]
    impl TextGenPort for RoutedTextGen {
        type Error = std::io::Error;

        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, Self::Error> {
            Ok(GenerationResponse {
                text: self.route(&request.prompt),
                model: "routed".to_string(),
                tokens_used: 0,
                finish_reason: "stop".to_string(),
            })
        }
    }

    struct RecordingSink {
        events: Mutex<Vec<StageEvent>>,
    }

    #[async_trait]
    impl StageSinkPort for RecordingSink {
        async fn on_stage_complete(&self, event: &StageEvent) -> Result<(), SinkError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl StageSinkPort for FailingSink {
        async fn on_stage_complete(&self, _event: &StageEvent) -> Result<(), SinkError> {
            Err(SinkError("disk full".to_string()))
        }
    }

    /// Upsert-style sink: re-delivering the same event leaves the store
    /// unchanged
    struct MemorySink {
        store: Mutex<HashMap<(GenerationId, Stage, String), serde_json::Value>>,
    }

    #[async_trait]
    impl StageSinkPort for MemorySink {
        async fn on_stage_complete(&self, event: &StageEvent) -> Result<(), SinkError> {
            let key = (
                event.generation_id,
                event.stage,
                format!("{:?}", event.status),
            );
            self.store.lock().unwrap().insert(key, event.payload.clone());
            Ok(())
        }
    }

    /// Cancels the run once a given stage reports completed
    struct CancellingSink {
        token: CancellationToken,
        after: Stage,
    }

    #[async_trait]
    impl StageSinkPort for CancellingSink {
        async fn on_stage_complete(&self, event: &StageEvent) -> Result<(), SinkError> {
            if event.stage == self.after && event.status == StageStatus::Completed {
                self.token.cancel();
            }
            Ok(())
        }
    }

    struct RecordingCache {
        invalidations: Mutex<Vec<(EntityType, Uuid)>>,
    }

    #[async_trait]
    impl CacheInvalidationPort for RecordingCache {
        async fn invalidate(&self, entity_type: EntityType, entity_id: Uuid) -> Result<(), SinkError> {
            self.invalidations.lock().unwrap().push((entity_type, entity_id));
            Ok(())
        }
    }

    fn orchestrator(textgen: RoutedTextGen) -> PipelineOrchestrator<RoutedTextGen> {
        PipelineOrchestrator::new(
            Arc::new(StructuredClient::new(textgen)),
            PipelineConfig::default(),
        )
    }

    fn request() -> StoryRequest {
        StoryRequest {
            user_prompt: "A salvager maps a flooded library".to_string(),
            preferred_genre: Some("fantasy".to_string()),
            preferred_tone: Some(EmotionalTone::Hopeful),
            character_count: Some(3),
        }
    }

    #[tokio::test]
    async fn full_pipeline_assembles_a_valid_story() {
        let story = orchestrator(RoutedTextGen::new())
            .run_full_pipeline(request())
            .await
            .unwrap();

        assert_eq!(story.characters.len(), 3);
        assert_eq!(story.protagonist().unwrap().name, "Mira");
        assert_eq!(story.settings.len(), 2);
        assert_eq!(story.parts.len(), 1);

        let chapters: Vec<&Chapter> = story.chapters().collect();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].ordinal, 1);
        assert_eq!(chapters[1].ordinal, 2);
        assert!(!chapters[1].causal_link.is_empty());

        // Seed planted in chapter 1 resolves in chapter 2 with the right id
        assert_eq!(chapters[0].seeds_planted.len(), 1);
        assert_eq!(chapters[1].seeds_resolved.len(), 1);
        assert_eq!(
            chapters[1].seeds_resolved[0].seed_id,
            chapters[0].seeds_planted[0].id
        );

        for chapter in &chapters {
            assert_eq!(chapter.scenes.len(), 5);
            for scene in &chapter.scenes {
                assert!(scene.content.is_some());
                let evaluation = scene.evaluation.as_ref().unwrap();
                assert!(evaluation.passed);
                assert!(!scene.needs_improvement);
            }
        }

        assert!(story.validate().is_empty());
    }

    #[tokio::test]
    async fn stage_events_arrive_in_dependency_order() {
        let sink = Arc::new(RecordingSink {
            events: Mutex::new(Vec::new()),
        });
        let orchestrator = orchestrator(RoutedTextGen::new()).with_sink(sink.clone());
        let generation_id = orchestrator.generation_id();

        orchestrator.run_full_pipeline(request()).await.unwrap();

        let events = sink.events.lock().unwrap();
        assert!(events.iter().all(|e| e.generation_id == generation_id));

        let completed: Vec<u8> = events
            .iter()
            .filter(|e| e.status == StageStatus::Completed)
            .map(|e| e.stage.number())
            .collect();
        assert!(!completed.is_empty());
        assert!(completed.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*completed.last().unwrap(), Stage::Evaluation.number());
    }

    #[tokio::test]
    async fn failed_scene_is_regenerated_with_feedback_then_accepted() {
        // First scene fails all three attempts; everything after passes
        let orchestrator =
            orchestrator(RoutedTextGen::with_evaluations(&[2.4, 2.8, 2.6]));

        let story = orchestrator.run_full_pipeline(request()).await.unwrap();

        let first = &story.chapters().next().unwrap().scenes[0];
        assert_eq!(first.regeneration_count, 2);
        assert!(first.needs_improvement);
        assert!(first.content.is_some());
        assert!(!first.evaluation.as_ref().unwrap().passed);

        // The run still finished and the rest of the scenes passed
        let flagged = story
            .chapters()
            .flat_map(|c| c.scenes.iter())
            .filter(|s| s.needs_improvement)
            .count();
        assert_eq!(flagged, 1);
    }

    #[tokio::test]
    async fn scene_passing_on_retry_clears_the_flag() {
        let orchestrator = orchestrator(RoutedTextGen::with_evaluations(&[2.4, 3.5]));

        let story = orchestrator.run_full_pipeline(request()).await.unwrap();

        let first = &story.chapters().next().unwrap().scenes[0];
        assert_eq!(first.regeneration_count, 1);
        assert!(!first.needs_improvement);
        assert!(first.evaluation.as_ref().unwrap().passed);
    }

    #[tokio::test]
    async fn cancelled_run_fails_fast_with_no_completed_stage() {
        let token = CancellationToken::new();
        token.cancel();
        let orchestrator = orchestrator(RoutedTextGen::new()).with_cancellation(token);

        let failure = orchestrator.run_full_pipeline(request()).await.unwrap_err();
        assert!(failure.last_good_stage.is_none());
        assert!(matches!(
            failure.error,
            StageError::Cancelled {
                stage: Stage::Summary
            }
        ));
    }

    #[tokio::test]
    async fn cancelling_mid_run_stops_at_the_next_stage_boundary() {
        let token = CancellationToken::new();
        let orchestrator = orchestrator(RoutedTextGen::new())
            .with_cancellation(token.clone())
            .with_sink(Arc::new(CancellingSink {
                token,
                after: Stage::Parts,
            }));

        let failure = orchestrator.run_full_pipeline(request()).await.unwrap_err();
        assert_eq!(failure.last_good_stage, Some(Stage::Parts));
        assert!(matches!(
            failure.error,
            StageError::Cancelled {
                stage: Stage::Chapters
            }
        ));
    }

    #[tokio::test]
    async fn parse_failure_reports_the_last_good_stage() {
        let mut textgen = RoutedTextGen::new();
        textgen.garble_characters = true;

        let failure = orchestrator(textgen)
            .run_full_pipeline(request())
            .await
            .unwrap_err();

        assert_eq!(failure.last_good_stage, Some(Stage::Summary));
        assert!(matches!(
            failure.error,
            StageError::Parse {
                stage: Stage::Characters,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_seed_resolution_is_dropped_not_fatal() {
        let mut textgen = RoutedTextGen::new();
        textgen.resolve_key = "never-planted".to_string();

        let story = orchestrator(textgen)
            .run_full_pipeline(request())
            .await
            .unwrap();

        let chapters: Vec<&Chapter> = story.chapters().collect();
        assert!(chapters[1].seeds_resolved.is_empty());
        assert!(story.validate().is_empty());
    }

    #[tokio::test]
    async fn final_event_counts_seeds_left_unresolved() {
        // The brass-key seed is planted but the only resolution targets an
        // unknown key, so the story ends with one seed still open
        let mut textgen = RoutedTextGen::new();
        textgen.resolve_key = "never-planted".to_string();
        let sink = Arc::new(RecordingSink {
            events: Mutex::new(Vec::new()),
        });

        orchestrator(textgen)
            .with_sink(sink.clone())
            .run_full_pipeline(request())
            .await
            .unwrap();

        let events = sink.events.lock().unwrap();
        let final_event = events
            .iter()
            .rev()
            .find(|e| e.stage == Stage::Evaluation && e.status == StageStatus::Completed)
            .unwrap();
        assert_eq!(final_event.payload["seeds_unresolved"], 1);
    }

    #[tokio::test]
    async fn final_event_reports_no_open_seeds_when_all_resolve() {
        let sink = Arc::new(RecordingSink {
            events: Mutex::new(Vec::new()),
        });

        orchestrator(RoutedTextGen::new())
            .with_sink(sink.clone())
            .run_full_pipeline(request())
            .await
            .unwrap();

        let events = sink.events.lock().unwrap();
        let final_event = events
            .iter()
            .rev()
            .find(|e| e.stage == Stage::Evaluation && e.status == StageStatus::Completed)
            .unwrap();
        assert_eq!(final_event.payload["seeds_unresolved"], 0);
    }

    #[tokio::test]
    async fn sink_failures_do_not_abort_the_run() {
        let orchestrator = orchestrator(RoutedTextGen::new()).with_sink(Arc::new(FailingSink));
        assert!(orchestrator.run_full_pipeline(request()).await.is_ok());
    }

    #[tokio::test]
    async fn cache_invalidations_cover_every_entity_level() {
        let cache = Arc::new(RecordingCache {
            invalidations: Mutex::new(Vec::new()),
        });
        orchestrator(RoutedTextGen::new())
            .with_cache(cache.clone())
            .run_full_pipeline(request())
            .await
            .unwrap();

        let invalidations = cache.invalidations.lock().unwrap();
        for entity_type in [
            EntityType::Story,
            EntityType::Part,
            EntityType::Chapter,
            EntityType::Scene,
        ] {
            assert!(invalidations.iter().any(|(t, _)| *t == entity_type));
        }
    }

    #[test]
    fn defaults_match_the_documented_policy() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_regenerations, 2);
        assert_eq!(config.seed_staleness_window, 5);
        assert!((config.narrative.temperature - 0.7).abs() < 1e-6);
        assert!((config.evaluation.temperature - 0.3).abs() < 1e-6);
        assert_eq!(config.narrative.max_tokens, 4096);
        assert_eq!(config.evaluation.max_tokens, 1024);
    }

    #[tokio::test]
    async fn redelivered_stage_events_are_idempotent() {
        let sink = MemorySink {
            store: Mutex::new(HashMap::new()),
        };
        let event = StageEvent::completed(
            GenerationId::new(),
            Stage::Parts,
            serde_json::json!({"parts": 3}),
        );

        sink.on_stage_complete(&event).await.unwrap();
        sink.on_stage_complete(&event).await.unwrap();

        let store = sink.store.lock().unwrap();
        assert_eq!(store.len(), 1);
    }
}

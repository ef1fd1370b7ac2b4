//! Scene evaluator - The quality gate on generated prose
//!
//! Scores a scene against a fixed five-category rubric via one structured
//! generation call, run at a lower temperature than the narrative stages
//! for scoring consistency. Pass/fail is decided on the overall mean; the
//! feedback lists feed the regeneration prompt.

use std::sync::Arc;

use crate::application::dto::EvaluationDraft;
use crate::application::ports::outbound::{GenerationRequest, TextGenPort};
use crate::application::services::llm::prompt_builder;
use crate::application::services::pipeline::StageSettings;
use crate::application::services::structured_client::{
    ClientError, ParseFailure, StructuredClient,
};
use crate::domain::entities::{CategoryScores, SceneEvaluation};
use crate::domain::value_objects::{CyclePhase, EmotionalBeat, EmotionalTone};

/// Named anchor points on the 1.0-4.0 rubric scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Nascent,
    Developing,
    Effective,
    Exemplary,
}

impl ScoreBand {
    pub fn from_score(score: f32) -> Self {
        if score >= 4.0 {
            Self::Exemplary
        } else if score >= 3.0 {
            Self::Effective
        } else if score >= 2.0 {
            Self::Developing
        } else {
            Self::Nascent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nascent => "nascent",
            Self::Developing => "developing",
            Self::Effective => "effective",
            Self::Exemplary => "exemplary",
        }
    }
}

/// Story and chapter context the rubric is judged against
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub central_dramatic_question: String,
    pub genre: String,
    pub tone: EmotionalTone,
    pub chapter_summary: String,
    pub scene_summary: String,
    pub cycle_phase: CyclePhase,
    pub emotional_beat: EmotionalBeat,
}

/// Evaluator for generated scene prose
pub struct SceneEvaluator<L: TextGenPort> {
    client: Arc<StructuredClient<L>>,
    settings: StageSettings,
}

impl<L: TextGenPort> SceneEvaluator<L> {
    /// `settings` should carry the evaluation temperature (default 0.3),
    /// not the narrative one
    pub fn new(client: Arc<StructuredClient<L>>, settings: StageSettings) -> Self {
        Self { client, settings }
    }

    /// Score one scene's prose. Exactly one generation call, no side effects.
    pub async fn evaluate(
        &self,
        content: &str,
        context: &EvaluationContext,
    ) -> Result<SceneEvaluation, ClientError> {
        let prompt = prompt_builder::build_evaluation_prompt(content, context);
        let request = GenerationRequest::new(prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let draft: EvaluationDraft = self.client.generate_structured(request).await?;

        // Strengths are part of the contract even on failing evaluations;
        // an evaluation with none is unusable as regeneration feedback.
        // The prompt asks for 2-3: fewer than two is tolerated as degraded
        // but usable, more than three are cut below.
        if draft.strengths.is_empty() {
            return Err(ClientError::Parse(ParseFailure {
                expected: "evaluation with populated strengths",
                cause: "evaluator returned no strengths".to_string(),
                raw_output: serde_json::to_string(&draft).unwrap_or_default(),
            }));
        }

        let scores = CategoryScores {
            plot: clamp_score("plot", draft.scores.plot),
            character: clamp_score("character", draft.scores.character),
            pacing: clamp_score("pacing", draft.scores.pacing),
            prose: clamp_score("prose", draft.scores.prose),
            world_building: clamp_score("world_building", draft.scores.world_building),
        };

        let mut strengths = draft.strengths;
        strengths.truncate(3);
        let mut priority_fixes = draft.priority_fixes;
        priority_fixes.truncate(3);

        let evaluation =
            SceneEvaluation::from_scores(scores, strengths, draft.improvements, priority_fixes);

        tracing::debug!(
            overall = evaluation.overall_score,
            band = ScoreBand::from_score(evaluation.overall_score).as_str(),
            passed = evaluation.passed,
            "scene evaluated"
        );

        Ok(evaluation)
    }
}

/// Rubric scores are anchors, not structural data: a value outside the
/// scale is clamped with a warning rather than failing the stage
fn clamp_score(category: &str, score: f32) -> f32 {
    if !(1.0..=4.0).contains(&score) {
        tracing::warn!(category, score, "evaluator score outside 1.0-4.0, clamping");
    }
    score.clamp(1.0, 4.0)
}

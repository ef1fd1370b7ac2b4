//! Prompt building functions for the eight generation stages
//!
//! Every structured stage ends with a RESPONSE FORMAT block that names the
//! exact JSON shape and demands a fenced block, which is what the
//! structured client's first extraction strategy expects. The prose stage
//! (scene content) asks for plain text instead.

use crate::application::services::continuity::PlantedSeed;
use crate::application::services::evaluator::EvaluationContext;
use crate::application::services::pipeline::StoryRequest;
use crate::domain::entities::{Chapter, Part, Scene, SceneEvaluation, Story};
use crate::domain::value_objects::CyclePhase;

/// Stage 1: story premise from the user prompt
pub fn build_summary_prompt(request: &StoryRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are a story architect. Distill the user's idea into a premise.\n\n");
    prompt.push_str(&format!("USER PROMPT: {}\n", request.user_prompt));
    if let Some(genre) = &request.preferred_genre {
        prompt.push_str(&format!("PREFERRED GENRE: {}\n", genre));
    }
    if let Some(tone) = &request.preferred_tone {
        prompt.push_str(&format!("PREFERRED TONE: {}\n", tone));
    }

    prompt.push_str(
        r#"
The premise needs:
- a central dramatic question the whole story answers
- a genre (one or two words)
- an emotional tone: exactly one of "hopeful", "dark", "bittersweet", "satirical"
- a one-sentence moral framework: what the story treats as worth suffering for

RESPONSE FORMAT:
Respond with ONLY a fenced JSON block:

```json
{
  "central_dramatic_question": "...",
  "genre": "...",
  "tone": "hopeful",
  "moral_framework": "..."
}
```
"#,
    );

    prompt
}

/// Stage 2: the cast
pub fn build_characters_prompt(story: &Story, character_count: u8) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are a story architect designing the cast for a {} story.\n\n",
        story.genre
    ));
    push_premise(&mut prompt, story);

    prompt.push_str(&format!(
        "\nCreate exactly {} characters. Exactly ONE is the primary protagonist.\n",
        character_count
    ));
    prompt.push_str(
        r#"For each character:
- "strength": a core trait they can lean on
- "internal_flaw": a wound or false belief with a causal origin, not a mere weakness
- "external_goal": something tangible they pursue that cannot, by itself, heal the flaw
- "relationships": one entry per OTHER character, with:
  - "with": the other character's name
  - "category": one of "ally", "rival", "family", "romantic", "mentor", "adversary"
  - "intensity": bond strength 0-10; reciprocal entries must agree within 1 point
  - "shared_history" and "current_dynamic"

Every pair of characters must have entries in BOTH directions.

RESPONSE FORMAT:
Respond with ONLY a fenced JSON block containing an array:

```json
[
  {
    "name": "...",
    "is_primary_protagonist": true,
    "strength": "...",
    "internal_flaw": "...",
    "external_goal": "...",
    "relationships": [
      {"with": "...", "category": "ally", "intensity": 6, "shared_history": "...", "current_dynamic": "..."}
    ]
  }
]
```
"#,
    );

    prompt
}

/// Stage 3: the settings
pub fn build_settings_prompt(story: &Story) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are a story architect designing settings for a {} story.\n\n",
        story.genre
    ));
    push_premise(&mut prompt, story);

    prompt.push_str(
        r#"
Create 2 or 3 settings. A setting is an antagonist: it resists the characters.
For each setting provide, all non-empty:
- "physical_obstacles", "scarcity_factors", "danger_sources", "social_dynamics": string arrays
- "symbolic_meaning" and "mood"
- "phase_amplification": how the place presses harder in each scene phase,
  with all five keys "setup", "confrontation", "virtue", "consequence", "transition"
- "sights" and "sounds": specific sensory details (arrays); "smells" and "textures" optional

RESPONSE FORMAT:
Respond with ONLY a fenced JSON block containing an array:

```json
[
  {
    "name": "...",
    "physical_obstacles": ["..."],
    "scarcity_factors": ["..."],
    "danger_sources": ["..."],
    "social_dynamics": ["..."],
    "symbolic_meaning": "...",
    "mood": "...",
    "phase_amplification": {
      "setup": "...", "confrontation": "...", "virtue": "...",
      "consequence": "...", "transition": "..."
    },
    "sights": ["..."],
    "sounds": ["..."]
  }
]
```
"#,
    );

    prompt
}

/// Stage 4: the acts and their MACRO arcs
pub fn build_parts_prompt(story: &Story) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are a story architect structuring a story into acts.\n\n");
    push_premise(&mut prompt, story);
    push_cast(&mut prompt, story);
    push_settings(&mut prompt, story);

    prompt.push_str(
        r#"
Structure the story into 3 acts (or 5 for a sprawling premise). Acts are
numbered from 1. If exactly one act needs splitting for pacing, emit two
entries sharing that act number with "sub_label" "A" and "B"; never split
more than one act.

Each act carries MACRO arcs: for each character active in the act, one
adversity -> virtue -> consequence -> new-adversity cycle spanning 2-4
chapters. The protagonist gets an arc in every act.

RESPONSE FORMAT:
Respond with ONLY a fenced JSON block containing an array:

```json
[
  {
    "act_number": 1,
    "title": "...",
    "summary": "...",
    "macro_arcs": [
      {
        "character": "<name>",
        "internal_adversity": "...",
        "external_adversity": "...",
        "virtue": "...",
        "consequence": "...",
        "new_adversity": "...",
        "estimated_chapters": 3
      }
    ]
  }
]
```
"#,
    );

    prompt
}

/// Stage 5: the chapters of one part
///
/// Chapters chain causally: each chapter's `causal_link` continues the
/// previous chapter's consequence, and the part's first chapter continues
/// from the previous part's macro consequence.
pub fn build_chapters_prompt(
    story: &Story,
    part: &Part,
    previous_part_consequence: Option<&str>,
    open_seeds: &[&PlantedSeed],
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are a story architect writing the chapter outline for act {} of a {} story.\n\n",
        part.label(),
        story.genre
    ));
    push_premise(&mut prompt, story);
    push_cast(&mut prompt, story);

    prompt.push_str(&format!("\nACT {}: {}\n{}\n", part.label(), part.title, part.summary));
    prompt.push_str("\nMACRO ARCS FOR THIS ACT:\n");
    for arc in &part.macro_arcs {
        prompt.push_str(&format!(
            "- {} ({} chapters): internal adversity: {}; external adversity: {}; virtue: {}; consequence: {}; new adversity: {}\n",
            arc.character_name,
            arc.estimated_chapters,
            arc.internal_adversity,
            arc.external_adversity,
            arc.virtue,
            arc.consequence,
            arc.new_adversity
        ));
    }

    if let Some(consequence) = previous_part_consequence {
        prompt.push_str(&format!(
            "\nTHE PREVIOUS ACT ENDED WITH: {}\nThe first chapter's \"causal_link\" must continue from this.\n",
            consequence
        ));
    } else {
        prompt.push_str("\nThis is the first act; the first chapter has no \"causal_link\".\n");
    }

    if !open_seeds.is_empty() {
        prompt.push_str("\nUNRESOLVED SEEDS available for payoff (reference by key, resolve each at most once):\n");
        for seed in open_seeds {
            prompt.push_str(&format!(
                "- key \"{}\" (planted chapter {}): {}; expected payoff: {}\n",
                seed.key, seed.chapter_ordinal, seed.description, seed.expected_payoff
            ));
        }
    }

    prompt.push_str(
        r#"
Write the act's chapters in order, honoring each arc's estimated chapter
count. Each chapter advances exactly one character's MACRO arc. Place each
arc's "climax" chapter in the second half of that character's chapters.
Chapters must chain: chapter N's "causal_link" continues chapter N-1's
consequence, and "next_adversity" sets up chapter N+1.

Seeds: plant forward-pointing details with a short unique "key"; resolve
previously planted seeds by their key. Never resolve a seed in the chapter
that plants it.

RESPONSE FORMAT:
Respond with ONLY a fenced JSON block containing an array of chapters:

```json
[
  {
    "title": "...",
    "summary": "...",
    "owning_character": "<name>",
    "arc_position": "beginning|middle|climax|resolution",
    "arc_contribution": "...",
    "focus_characters": ["<name>"],
    "adversity_type": "internal|external|both",
    "virtue_type": "courage|compassion|integrity|loyalty|wisdom|sacrifice",
    "seeds_planted": [{"key": "...", "description": "...", "expected_payoff": "..."}],
    "seeds_resolved": [{"key": "...", "payoff": "..."}],
    "causal_link": "...",
    "next_adversity": "..."
  }
]
```
"#,
    );

    prompt
}

/// Stage 6: scene summaries for one chapter
pub fn build_scene_summaries_prompt(story: &Story, part: &Part, chapter: &Chapter) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are a story architect breaking chapter {} of a {} story into scenes.\n\n",
        chapter.ordinal, story.genre
    ));
    push_premise(&mut prompt, story);
    push_settings(&mut prompt, story);

    prompt.push_str(&format!(
        "\nACT {}: {}\nCHAPTER {}: {}\n{}\n",
        part.label(),
        part.title,
        chapter.ordinal,
        chapter.title,
        chapter.summary
    ));
    if let Some(owner) = story.character(&chapter.owning_character) {
        prompt.push_str(&format!(
            "OWNING CHARACTER: {} (virtue this chapter: {})\n",
            owner.name, chapter.virtue_type
        ));
    }
    if !chapter.causal_link.is_empty() {
        prompt.push_str(&format!("FOLLOWS FROM: {}\n", chapter.causal_link));
    }
    prompt.push_str(&format!("SETS UP NEXT: {}\n", chapter.next_adversity));

    prompt.push_str(
        r#"
Break the chapter into 5 to 8 scenes forming one complete micro-cycle.
Rules:
- "cycle_phase": "setup", "confrontation", "virtue", "consequence" or "transition";
  EXACTLY ONE scene has phase "virtue", and that scene's "length_class" is "long"
- "emotional_beat": one of "fear", "hope", "tension", "relief", "elevation",
  "catharsis", "despair", "joy"
- "focus_characters": at most 4 names
- "sensory_anchors": 3-5 specific, concrete details (never generic ones like "a sound")
- "length_class": "short", "medium" or "long"

RESPONSE FORMAT:
Respond with ONLY a fenced JSON block containing an array of scenes in order:

```json
[
  {
    "title": "...",
    "summary": "...",
    "cycle_phase": "setup",
    "emotional_beat": "tension",
    "focus_characters": ["<name>"],
    "sensory_anchors": ["...", "...", "..."],
    "length_class": "medium"
  }
]
```
"#,
    );

    prompt
}

/// Stage 7: prose for one scene
///
/// When the scene failed evaluation, `feedback` carries the evaluation so
/// the regeneration can address the priority fixes.
pub fn build_scene_content_prompt(
    story: &Story,
    chapter: &Chapter,
    scene: &Scene,
    previous_scene_summary: Option<&str>,
    feedback: Option<&SceneEvaluation>,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are a novelist writing one scene of a {} {} story.\n\n",
        story.tone, story.genre
    ));
    prompt.push_str(&format!(
        "CENTRAL QUESTION: {}\n",
        story.central_dramatic_question
    ));
    prompt.push_str(&format!("MORAL FRAMEWORK: {}\n", story.moral_framework));
    prompt.push_str(&format!(
        "\nCHAPTER {}: {}\n{}\n",
        chapter.ordinal, chapter.title, chapter.summary
    ));
    if let Some(previous) = previous_scene_summary {
        prompt.push_str(&format!("PREVIOUS SCENE: {}\n", previous));
    }

    prompt.push_str(&format!("\nSCENE: {}\n{}\n", scene.title, scene.summary));
    prompt.push_str(&format!(
        "CYCLE PHASE: {}, EMOTIONAL BEAT: {}\n",
        scene.cycle_phase, scene.emotional_beat
    ));
    if scene.cycle_phase == CyclePhase::Virtue {
        prompt.push_str(
            "This is the chapter's virtue scene: the moment of moral choice. Give it room.\n",
        );
    }
    let focus_names: Vec<&str> = scene
        .focus_characters
        .iter()
        .filter_map(|id| story.character(id).map(|c| c.name.as_str()))
        .collect();
    if !focus_names.is_empty() {
        prompt.push_str(&format!("FOCUS CHARACTERS: {}\n", focus_names.join(", ")));
    }
    prompt.push_str("SENSORY ANCHORS (work each one in):\n");
    for anchor in &scene.sensory_anchors {
        prompt.push_str(&format!("- {}\n", anchor));
    }
    prompt.push_str(&format!(
        "TARGET LENGTH: roughly {} words\n",
        scene.length_class.word_target()
    ));

    if let Some(evaluation) = feedback {
        prompt.push_str("\nA previous draft of this scene scored below the quality bar. Address these first:\n");
        for fix in &evaluation.priority_fixes {
            prompt.push_str(&format!("- {}\n", fix));
        }
        for item in &evaluation.improvements {
            prompt.push_str(&format!("- {}\n", item));
        }
        prompt.push_str("Keep what worked:\n");
        for strength in &evaluation.strengths {
            prompt.push_str(&format!("- {}\n", strength));
        }
    }

    prompt.push_str(
        "\nRESPONSE FORMAT:\nRespond with the scene prose only. No JSON, no headings, no commentary.\n",
    );

    prompt
}

/// Stage 8: rubric evaluation of one scene's prose
pub fn build_evaluation_prompt(content: &str, context: &EvaluationContext) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are a rigorous fiction editor scoring one scene against a fixed rubric.\n\n");
    prompt.push_str(&format!("STORY QUESTION: {}\n", context.central_dramatic_question));
    prompt.push_str(&format!("GENRE/TONE: {} / {}\n", context.genre, context.tone));
    prompt.push_str(&format!("CHAPTER CONTEXT: {}\n", context.chapter_summary));
    prompt.push_str(&format!(
        "SCENE BRIEF: {} (phase: {}, beat: {})\n",
        context.scene_summary, context.cycle_phase, context.emotional_beat
    ));

    prompt.push_str("\nSCENE PROSE:\n---\n");
    prompt.push_str(content);
    prompt.push_str("\n---\n");

    prompt.push_str(
        r#"
Score five categories on a continuous 1.0-4.0 scale:
  1.0 nascent, 2.0 developing, 3.0 effective, 4.0 exemplary
Categories: "plot", "character", "pacing", "prose", "world_building".
Judge each independently; fractional scores like 2.7 are expected.

Also provide:
- "strengths": 2-3 things the prose does well (REQUIRED even when scores are low)
- "improvements": specific, actionable items
- "priority_fixes": at most 3, the highest-impact fixes first

RESPONSE FORMAT:
Respond with ONLY a fenced JSON block:

```json
{
  "scores": {"plot": 3.1, "character": 2.8, "pacing": 3.0, "prose": 3.4, "world_building": 2.9},
  "strengths": ["..."],
  "improvements": ["..."],
  "priority_fixes": ["..."]
}
```
"#,
    );

    prompt
}

fn push_premise(prompt: &mut String, story: &Story) {
    prompt.push_str(&format!(
        "CENTRAL DRAMATIC QUESTION: {}\n",
        story.central_dramatic_question
    ));
    prompt.push_str(&format!("GENRE: {}\n", story.genre));
    prompt.push_str(&format!("TONE: {}\n", story.tone));
    prompt.push_str(&format!("MORAL FRAMEWORK: {}\n", story.moral_framework));
}

fn push_cast(prompt: &mut String, story: &Story) {
    if story.characters.is_empty() {
        return;
    }
    prompt.push_str("\nCAST:\n");
    for character in &story.characters {
        prompt.push_str(&format!(
            "- {}{}: strength: {}; flaw: {}; goal: {}\n",
            character.name,
            if character.is_primary_protagonist {
                " (protagonist)"
            } else {
                ""
            },
            character.strength,
            character.internal_flaw,
            character.external_goal
        ));
    }
}

fn push_settings(prompt: &mut String, story: &Story) {
    if story.settings.is_empty() {
        return;
    }
    prompt.push_str("\nSETTINGS:\n");
    for setting in &story.settings {
        prompt.push_str(&format!(
            "- {}: {} (mood: {})\n",
            setting.name, setting.symbolic_meaning, setting.mood
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EmotionalTone;

    fn premise_story() -> Story {
        let mut story = Story::new(
            "Can Mira save the archive without losing the crew?",
            "fantasy",
            EmotionalTone::Hopeful,
        );
        story.moral_framework = "Help accepted is not weakness".into();
        story
    }

    #[test]
    fn summary_prompt_carries_user_preferences() {
        let request = StoryRequest {
            user_prompt: "A librarian in a flooding city".into(),
            preferred_genre: Some("fantasy".into()),
            preferred_tone: Some(EmotionalTone::Hopeful),
            character_count: Some(3),
        };

        let prompt = build_summary_prompt(&request);
        assert!(prompt.contains("A librarian in a flooding city"));
        assert!(prompt.contains("PREFERRED GENRE: fantasy"));
        assert!(prompt.contains("PREFERRED TONE: hopeful"));
        assert!(prompt.contains("```json"));
    }

    #[test]
    fn characters_prompt_fixes_the_count() {
        let prompt = build_characters_prompt(&premise_story(), 3);
        assert!(prompt.contains("exactly 3 characters"));
        assert!(prompt.contains("within 1 point"));
    }

    #[test]
    fn first_act_chapters_prompt_has_no_causal_anchor() {
        let mut part = Part::new(1, "Act One");
        part.summary = "Mira enters the archive".into();

        let prompt = build_chapters_prompt(&premise_story(), &part, None, &[]);
        assert!(prompt.contains("first act"));
        assert!(!prompt.contains("THE PREVIOUS ACT ENDED WITH"));
    }
}

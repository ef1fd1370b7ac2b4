//! LLM helpers - Prompt construction for the generation stages

pub mod prompt_builder;

//! User-facing pipelines
//!
//! - `GenerationPipeline`: summaries, quizzes, structured output and narration
//! - `EvaluationPipeline`: answer grading with a heuristic fallback
//!
//! Both report a structured list of [`PipelineEvent`]s with every result.

mod evaluation;
mod events;
mod generation;
pub mod prompts;
pub mod quiz;

pub use evaluation::{Evaluation, EvaluationPipeline, EvaluationSource};
pub use events::{PipelineEvent, PipelineReport};
pub use generation::{AudioNarration, GenerationPipeline, NarratedChunk};
pub use quiz::{QuestionKind, QuizOption, QuizQuestion};

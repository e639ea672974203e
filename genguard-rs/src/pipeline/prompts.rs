//! System prompts and message templates for each pipeline

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a study assistant. Summarize the provided material for a student.

- Keep every key fact, definition, date and figure.
- Preserve the order in which topics appear.
- Use short paragraphs and plain language.
- Do not add information that is not in the material.";

pub const EVALUATION_SYSTEM_PROMPT: &str = r#"You grade a student's answer against a reference answer.

Reply with a single JSON object and nothing else:
{"isCorrect": true or false, "feedback": "one or two sentences addressed to the student", "score": integer from 0 to 100}

Judge meaning, not wording. Partial answers earn partial scores."#;

/// System prompt asking for `count` quiz questions as a JSON array
pub fn quiz_system_prompt(count: usize) -> String {
    format!(
        r#"You write quiz questions from study material.

Return ONLY a JSON array of exactly {count} objects, with no prose and no markdown. Each object has:
- "question": the question text
- "type": one of "multiple-choice", "true-false", "short-answer"
- "options": an array of answer options (multiple-choice only, otherwise [])
- "correctAnswer": the correct answer
- "explanation": why the answer is correct

Every question must be answerable from the material alone."#
    )
}

/// User message for one evaluation
pub fn evaluation_message(question: &str, reference_answer: &str, candidate: &str) -> String {
    format!(
        "Question:\n{}\n\nReference answer:\n{}\n\nStudent answer:\n{}",
        question.trim(),
        reference_answer.trim(),
        candidate.trim()
    )
}

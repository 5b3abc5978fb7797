//! Centralized prompt definitions
//!
//! This module contains the system prompts sent to the AI gateway.
//! Centralizing prompts makes them easier to maintain, test, and version.

/// System prompt for conversational-text summarization.
pub const SUMMARIZE_SYSTEM_PROMPT: &str = r#"You are a meeting and conversation summarizer. Produce a concise, faithful summary of the conversation below.

Guidelines:
- Lead with the main outcome or decision
- Preserve names, dates, and commitments exactly as stated
- Keep the summary under a quarter of the original length
- Use plain prose, no headings or bullet lists unless the source is a list
- Do not invent information that is not in the source text"#;

/// System prompt for structured tag extraction from a summary.
///
/// The model is asked for JSON; downstream validation still treats the
/// output as untrusted and coerces malformed fields.
pub const TAG_EXTRACTION_PROMPT: &str = r#"You extract structured tags from a conversation summary.

Your response MUST be valid JSON in this exact format:
{
  "skills": [],
  "technologies": [],
  "roles": [],
  "action_items": [],
  "decisions": [],
  "sentiments": [],
  "emotions": [],
  "confidence_score": 0.8
}

Guidelines:
- Each field is a list of short strings taken from the summary
- action_items are concrete follow-ups with an owner when one is named
- sentiments and emotions describe the overall tone, one or two words each
- confidence_score is between 0.0 and 1.0
- Leave a list empty when the summary has nothing for it

Always respond with valid JSON only, no other text."#;

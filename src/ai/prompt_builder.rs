//! Prompt construction shared by leaf chunks and the merge step.

use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};

/// Placeholder substituted with the sentence budget in custom templates.
pub const SENTENCE_PLACEHOLDER: &str = "{nSent}";

/// Returned when a successful completion carries no message content.
pub const NO_SUMMARY_RETURNED: &str = "No summary returned.";

/// Resolve the system instruction for a summarization call.
///
/// A non-blank template wins and is used verbatim after placeholder
/// substitution; otherwise the built-in instruction is used.
#[must_use]
pub fn system_instruction(sentence_budget: u32, template: Option<&str>) -> String {
    match template.map(str::trim).filter(|t| !t.is_empty()) {
        Some(template) => template.replace(SENTENCE_PLACEHOLDER, &sentence_budget.to_string()),
        None => {
            let plural = if sentence_budget == 1 { "" } else { "s" };
            format!(
                "You are a concise assistant. Summarize the following text in {sentence_budget} sentence{plural}."
            )
        }
    }
}

/// Fence the text in triple quotes so instructions inside it read as data.
#[must_use]
pub fn wrap_user_text(text: &str) -> String {
    format!("TEXT:\n\"\"\"\n{text}\n\"\"\"")
}

/// Join partial summaries into the document handed to the merge step.
#[must_use]
pub fn merge_document<S: AsRef<str>>(partials: &[S]) -> String {
    partials
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Chunk {}:\n{}", i + 1, s.as_ref()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System + user message pair for one chat completion.
#[must_use]
pub fn build_prompt(system_prompt: &str, user_content: &str) -> Vec<ChatCompletionMessage> {
    vec![
        ChatCompletionMessage {
            role: MessageRole::system,
            content: Content::Text(system_prompt.to_string()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        },
        ChatCompletionMessage {
            role: MessageRole::user,
            content: Content::Text(user_content.to_string()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        },
    ]
}

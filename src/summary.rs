use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::error::AssistantError;
use crate::generation::GenerationClient;
use crate::index::ChatRecord;

/// Cap on the conversation text handed to the model.
const MAX_INPUT_CHARS: usize = 10_000;

/// A one-shot summary of a batch of team messages, with participant stats.
#[derive(Debug, Clone)]
pub struct ChatSummary {
    pub summary: String,
    pub total_messages: usize,
    pub text_messages_count: usize,
    pub participants: Vec<String>,
}

/// Summarize a team conversation through the generation client. Only text
/// messages feed the prompt; stats cover the whole batch.
pub async fn summarize_messages(
    client: &dyn GenerationClient,
    records: &[ChatRecord],
) -> Result<ChatSummary, AssistantError> {
    if records.is_empty() {
        return Err(AssistantError::NothingToSummarize);
    }

    let text_messages: Vec<&ChatRecord> = records
        .iter()
        .filter(|r| r.message_type == "text" && !r.content.is_empty())
        .collect();

    let mut chat_text = text_messages
        .iter()
        .map(|r| format!("{}: {}", r.sender_name, r.content))
        .collect::<Vec<_>>()
        .join("\n");
    if chat_text.trim().is_empty() {
        return Err(AssistantError::NothingToSummarize);
    }
    if chat_text.chars().count() > MAX_INPUT_CHARS {
        let cut = chat_text
            .char_indices()
            .nth(MAX_INPUT_CHARS)
            .map(|(idx, _)| idx)
            .unwrap_or(chat_text.len());
        chat_text.truncate(cut);
        chat_text.push_str("...");
    }

    // BTreeSet keeps participant order stable across runs.
    let participants: Vec<String> = records
        .iter()
        .map(|r| r.sender_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut prompt = String::from(
        "You are an expert at summarizing team conversations.\n\n\
         Please analyze the following team chat conversation and create a comprehensive summary.\n\n\
         Conversation:\n",
    );
    prompt.push_str(&chat_text);
    let _ = write!(
        prompt,
        "\n\nContext:\n\
         - Total Messages: {}\n\
         - Participants: {}\n\
         - Text Messages: {}\n\n\
         Your Task:\n\
         1. Create a concise summary (2-3 sentences) highlighting the main discussion points\n\
         2. Identify key decisions or action items if any\n\
         3. Note any important topics or concerns raised\n\
         4. Keep it professional and clear\n\n\
         Please provide the summary in a structured format:\n\n\
         Summary: [Your concise overview]\n\n\
         Important decisions made in the conversation:\n\
         - [Decision 1]\n\
         - [Decision 2 if exist]\n",
        records.len(),
        participants.join(", "),
        text_messages.len(),
    );

    let summary = client.generate(&prompt).await?;

    Ok(ChatSummary {
        summary: summary.trim().to_string(),
        total_messages: records.len(),
        text_messages_count: text_messages.len(),
        participants,
    })
}

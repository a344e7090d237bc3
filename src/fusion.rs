use std::fmt::Write as _;

use crate::index::RetrievedItem;
use crate::types::{ConversationTurn, SourceRef, TeamMessage};

/// Persona block for retrieval-augmented requests.
pub const RAG_PERSONA: &str = "You are ThinkBuddy — an intelligent AI assistant.

You are helpful, concise, and provide actionable insights.

IMPORTANT:
You have access to:
1. Team Chat Logs: Messages from ALL team members. Use these to understand the discussion history.
2. Project Knowledge: Facts and descriptions about the project.
3. Code Snippets: Actual code from the project.

When answering:
- Synthesize information from ALL sources.
- If the user asks about code, look at the Code Snippets.
- If the user asks about project status, look at Chat Logs and Project Knowledge.
- Be specific, citing who said what if relevant.";

/// Persona block when RAG is disabled for the call.
pub const PLAIN_PERSONA: &str = "You are ThinkBuddy — an intelligent AI assistant.
You are helpful, concise, and provide actionable insights.";

pub const ACTIVITY_HEADER: &str = "**Recent Team Activity (Last 20 messages):**";
pub const CONTEXT_HEADER: &str = "**Retrieved Context (RAG):**";
pub const MESSAGES_HEADER: &str = "**Relevant Team Messages:**";
pub const KNOWLEDGE_HEADER: &str = "**Relevant Project Knowledge & Code:**";
pub const CONVERSATION_HEADER: &str = "**Recent Conversation:**";
pub const QUESTION_HEADER: &str = "**User Question:**";
pub const RESPONSE_CUE: &str = "**Your Response:**";

/// Per-section character budgets. Characters stand in for tokens; the point
/// is a bounded prompt, not an exact count.
#[derive(Debug, Clone)]
pub struct SectionBudgets {
    /// Each retrieved chat message in the prompt.
    pub message_chars: usize,
    /// Each knowledge item in the prompt.
    pub knowledge_chars: usize,
    /// Each recent-activity line.
    pub activity_chars: usize,
    /// Each citation copy in the `sources` side channel.
    pub citation_chars: usize,
}

impl Default for SectionBudgets {
    fn default() -> Self {
        Self {
            message_chars: 500,
            knowledge_chars: 1000,
            activity_chars: 200,
            citation_chars: 100,
        }
    }
}

/// Everything the fusion stage merges for one request.
pub struct FusionInput<'a> {
    pub question: &'a str,
    pub activity: &'a [TeamMessage],
    pub messages: &'a [RetrievedItem],
    pub knowledge: &'a [RetrievedItem],
    pub history: &'a [ConversationTurn],
    pub use_rag: bool,
}

/// The composed prompt plus the citation list, in retrieval order
/// (messages first, then knowledge).
pub struct AssembledPrompt {
    pub prompt: String,
    pub sources: Vec<SourceRef>,
}

/// Builds the generation prompt as a fixed sequence of named sections, so
/// truncation policy and section order are testable independent of wording.
pub struct PromptBuilder {
    budgets: SectionBudgets,
    /// How many of the caller's own turns to replay.
    history_window: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            budgets: SectionBudgets::default(),
            history_window: 5,
        }
    }
}

impl PromptBuilder {
    pub fn new(budgets: SectionBudgets, history_window: usize) -> Self {
        Self {
            budgets,
            history_window,
        }
    }

    /// Section order is fixed: persona, team activity, retrieved context,
    /// recent conversation, question, response cue. With `use_rag` off the
    /// activity and context sections are skipped entirely.
    pub fn assemble(&self, input: &FusionInput<'_>) -> AssembledPrompt {
        let mut sources = Vec::new();
        let mut prompt = String::new();

        if input.use_rag {
            prompt.push_str(RAG_PERSONA);
            prompt.push_str("\n\n");

            prompt.push_str(ACTIVITY_HEADER);
            prompt.push('\n');
            if input.activity.is_empty() {
                prompt.push_str("No recent messages.\n");
            } else {
                for msg in input.activity {
                    let _ = writeln!(
                        prompt,
                        "[{}]: {}",
                        msg.sender_name,
                        truncate_chars(&msg.content, self.budgets.activity_chars)
                    );
                }
            }
            prompt.push('\n');

            prompt.push_str(CONTEXT_HEADER);
            prompt.push('\n');
            if input.messages.is_empty() && input.knowledge.is_empty() {
                prompt.push_str("No relevant context found.\n");
            } else {
                if !input.messages.is_empty() {
                    prompt.push_str(MESSAGES_HEADER);
                    prompt.push('\n');
                    for (i, item) in input.messages.iter().enumerate() {
                        sources.push(self.message_source(item));
                        let _ = writeln!(
                            prompt,
                            "{}. [{}] ({}): {}",
                            i + 1,
                            item.sender_name,
                            item.timestamp.to_rfc3339(),
                            truncate_chars(&item.content, self.budgets.message_chars)
                        );
                    }
                }
                if !input.knowledge.is_empty() {
                    prompt.push_str(KNOWLEDGE_HEADER);
                    prompt.push('\n');
                    for item in input.knowledge {
                        sources.push(self.knowledge_source(item));
                        let _ = writeln!(
                            prompt,
                            "[{}] {}",
                            item.kind.label().to_uppercase(),
                            truncate_chars(&item.content, self.budgets.knowledge_chars)
                        );
                    }
                }
            }
            prompt.push('\n');
        } else {
            prompt.push_str(PLAIN_PERSONA);
            prompt.push_str("\n\n");
        }

        let recent = recent_turns(input.history, self.history_window);
        if !recent.is_empty() {
            prompt.push_str(CONVERSATION_HEADER);
            prompt.push('\n');
            for turn in recent {
                let _ = writeln!(prompt, "{}: {}", turn.role.label(), turn.content);
            }
            prompt.push('\n');
        }

        let _ = writeln!(prompt, "{QUESTION_HEADER} {}", input.question);
        prompt.push('\n');
        prompt.push_str(RESPONSE_CUE);
        prompt.push('\n');

        AssembledPrompt { prompt, sources }
    }

    fn message_source(&self, item: &RetrievedItem) -> SourceRef {
        let clipped = if item.content.chars().count() > self.budgets.citation_chars {
            format!(
                "{}...",
                truncate_chars(&item.content, self.budgets.citation_chars)
            )
        } else {
            item.content.clone()
        };
        SourceRef {
            kind: "chat".into(),
            sender: item.sender_name.clone(),
            content: clipped,
            timestamp: item.timestamp.to_rfc3339(),
            relevance: round2(item.relevance),
        }
    }

    fn knowledge_source(&self, item: &RetrievedItem) -> SourceRef {
        SourceRef {
            kind: item.kind.label().into(),
            sender: "System".into(),
            content: format!(
                "[{}] {}...",
                item.kind.label(),
                truncate_chars(&item.content, self.budgets.citation_chars)
            ),
            timestamp: item.timestamp.to_rfc3339(),
            relevance: round2(item.relevance),
        }
    }
}

fn recent_turns(history: &[ConversationTurn], window: usize) -> &[ConversationTurn] {
    let start = history.len().saturating_sub(window);
    &history[start..]
}

/// Char-boundary-safe prefix, at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

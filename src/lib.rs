pub mod activity;
pub mod error;
pub mod fusion;
pub mod generation;
pub mod history;
pub mod index;
pub mod retriever;
pub mod summary;
pub mod types;

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use activity::{ActivityError, ActivityFeed, NoActivityFeed};
pub use error::{AssistantError, GenerationError};
pub use fusion::{AssembledPrompt, FusionInput, PromptBuilder, SectionBudgets};
pub use generation::{GeminiClient, GenerationClient};
pub use history::{
    ChatSessionSummary, ConversationHistory, FileHistoryStore, HistoryKey, HistoryStore,
    NoHistoryStore,
};
pub use index::{
    ChatRecord, CodeSnippet, EntryKind, IndexedEntry, MemoryVectorStore, OllamaEmbedder,
    ProjectFact, RetrievedItem, SemanticIndex, VectorStore,
};
#[cfg(feature = "qdrant")]
pub use index::QdrantVectorStore;
pub use retriever::ContextRetriever;
pub use summary::{summarize_messages, ChatSummary};
pub use types::{
    AssistantReply, AssistantRequest, ConversationTurn, Role, SourceRef, TeamMessage,
};

/// Retrieval knobs for one assistant instance.
pub struct AssistantConfig {
    /// Broad message-search results fed into the prompt.
    pub message_results: usize,
    /// Knowledge-search results fed into the prompt.
    pub knowledge_results: usize,
    /// Raw team messages in the recent-activity block.
    pub activity_window: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            message_results: 10,
            knowledge_results: 3,
            activity_window: 20,
        }
    }
}

/// The assistant core. Wire up a generation client, a semantic index, and a
/// conversation history, then call `respond`.
pub struct Assistant {
    generation: Box<dyn GenerationClient>,
    index: Arc<SemanticIndex>,
    retriever: ContextRetriever,
    history: ConversationHistory,
    activity: Box<dyn ActivityFeed>,
    prompt: PromptBuilder,
    config: AssistantConfig,
}

impl Assistant {
    pub fn new(
        generation: impl GenerationClient + 'static,
        index: SemanticIndex,
        history: ConversationHistory,
    ) -> Self {
        let index = Arc::new(index);
        Self {
            generation: Box::new(generation),
            retriever: ContextRetriever::new(index.clone()),
            index,
            history,
            activity: Box::new(NoActivityFeed),
            prompt: PromptBuilder::default(),
            config: AssistantConfig::default(),
        }
    }

    pub fn with_activity_feed(mut self, feed: impl ActivityFeed + 'static) -> Self {
        self.activity = Box::new(feed);
        self
    }

    pub fn with_config(mut self, config: AssistantConfig) -> Self {
        self.config = config;
        self
    }

    /// Answer one request. Retrieval and history are best-effort; only
    /// generation and configuration failures surface as errors, and no
    /// conversation turns are recorded unless generation fully succeeds.
    pub async fn respond(
        &self,
        request: &AssistantRequest,
    ) -> Result<AssistantReply, AssistantError> {
        self.respond_inner(request, None).await
    }

    /// Like `respond`, but the generation call races against the token. A
    /// cancelled request records no turns.
    pub async fn respond_with_cancel(
        &self,
        request: &AssistantRequest,
        cancel: CancellationToken,
    ) -> Result<AssistantReply, AssistantError> {
        self.respond_inner(request, Some(cancel)).await
    }

    async fn respond_inner(
        &self,
        request: &AssistantRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<AssistantReply, AssistantError> {
        let team = request.project_id.as_deref();
        let history = self.history.get(&request.user_id, team).await;

        let (activity, messages, knowledge) = if request.use_rag {
            let activity = match team {
                Some(t) => match self
                    .activity
                    .recent_messages(t, self.config.activity_window)
                    .await
                {
                    Ok(messages) => messages,
                    Err(e) => {
                        warn!(team_id = t, error = %e, "activity feed failed, skipping block");
                        Vec::new()
                    }
                },
                None => Vec::new(),
            };
            let messages = self
                .retriever
                .search_messages(&request.message, team, self.config.message_results)
                .await;
            let knowledge = self
                .retriever
                .search_knowledge(&request.message, team, self.config.knowledge_results)
                .await;
            info!(
                user_id = %request.user_id,
                messages = messages.len(),
                knowledge = knowledge.len(),
                "retrieved context"
            );
            (activity, messages, knowledge)
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };

        let assembled = self.prompt.assemble(&FusionInput {
            question: &request.message,
            activity: &activity,
            messages: &messages,
            knowledge: &knowledge,
            history: &history,
            use_rag: request.use_rag,
        });

        let result = match cancel {
            Some(token) => tokio::select! {
                result = self.generation.generate(&assembled.prompt) => result,
                _ = token.cancelled() => {
                    info!(user_id = %request.user_id, "request cancelled during generation");
                    return Err(AssistantError::Cancelled);
                }
            },
            None => self.generation.generate(&assembled.prompt).await,
        };

        let response = match result {
            Ok(text) => text.trim().to_string(),
            Err(GenerationError::Configuration(var)) => {
                return Err(AssistantError::Configuration(var));
            }
            Err(e) => return Err(e.into()),
        };
        if response.is_empty() {
            return Err(AssistantError::Generation(GenerationError::Empty));
        }

        // Exactly two turns, only after a complete response.
        self.history
            .append(&request.user_id, team, Role::User, &request.message)
            .await;
        self.history
            .append(&request.user_id, team, Role::Assistant, &response)
            .await;

        Ok(AssistantReply {
            response,
            sources: assembled.sources,
            timestamp: Utc::now(),
            project_context: team.unwrap_or("general").to_string(),
        })
    }

    /// Add a project fact to the knowledge base. Failures are logged and
    /// reported as `false`; ingestion never takes a request down.
    pub async fn add_project_knowledge(&self, fact: ProjectFact) -> bool {
        match self.index.ingest(fact.into_entry()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "project knowledge ingestion failed");
                false
            }
        }
    }

    /// Add a code snippet to the knowledge base.
    pub async fn add_code_knowledge(&self, snippet: CodeSnippet) -> bool {
        match self.index.ingest(snippet.into_entry()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "code knowledge ingestion failed");
                false
            }
        }
    }

    /// Batch-ingest chat feed records. Returns how many were indexed; zero
    /// on failure.
    pub async fn ingest_chat_messages(&self, records: Vec<ChatRecord>) -> usize {
        match self.index.ingest_batch(records).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "chat batch ingestion failed");
                0
            }
        }
    }

    /// Delete every indexed entry for a team. Returns how many were removed.
    pub async fn purge_team(&self, team_id: &str) -> usize {
        match self.index.purge_team(team_id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(team_id, error = %e, "team purge failed");
                0
            }
        }
    }

    /// Total entries currently indexed, zero if the store is unreachable.
    pub async fn index_size(&self) -> usize {
        self.index.count().await.unwrap_or(0)
    }

    /// The caller's conversation log for a project.
    pub async fn conversation(
        &self,
        user_id: &str,
        project_id: Option<&str>,
    ) -> Vec<ConversationTurn> {
        self.history.get(user_id, project_id).await
    }

    /// Reset the caller's conversation log for a project.
    pub async fn clear_conversation(&self, user_id: &str, project_id: Option<&str>) {
        self.history.clear(user_id, project_id).await;
    }

    /// All of a user's conversation logs across projects.
    pub async fn sessions(&self, user_id: &str) -> Vec<ChatSessionSummary> {
        self.history.sessions(user_id).await
    }

    /// Summarize a batch of team messages through the generation client.
    pub async fn summarize(&self, records: &[ChatRecord]) -> Result<ChatSummary, AssistantError> {
        summary::summarize_messages(self.generation.as_ref(), records).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::activity::{ActivityError, ActivityFeed};
    use crate::error::GenerationError;
    use crate::generation::GenerationClient;
    use crate::index::embedding::EmbeddingProvider;
    use crate::index::error::IndexError;
    use crate::types::TeamMessage;

    const DIMS: usize = 1024;

    /// Deterministic bag-of-stems embedder: each word's first six characters
    /// hash into one of `DIMS` buckets. Shared stems overlap, unrelated text
    /// does not, which is all retrieval ranking tests need.
    #[derive(Default)]
    pub struct HashEmbedder;

    fn bucket(token: &str) -> usize {
        let mut h: u64 = 5381;
        for b in token.bytes() {
            h = h.wrapping_mul(33).wrapping_add(b as u64);
        }
        (h % DIMS as u64) as usize
    }

    pub fn embed_text(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMS];
        for word in text.split_whitespace() {
            let token: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .take(6)
                .collect();
            if token.is_empty() {
                continue;
            }
            v[bucket(&token)] += 1.0;
        }
        v
    }

    #[async_trait]
    impl EmbeddingProvider for HashEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
            Ok(embed_text(text))
        }

        fn dimensions(&self) -> usize {
            DIMS
        }
    }

    /// Scripted generation client. Records every prompt it sees.
    pub struct MockGeneration {
        responses: Mutex<VecDeque<Result<String, GenerationError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockGeneration {
        pub fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(
                    responses.into_iter().map(|s| Ok(s.to_string())).collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: GenerationError) -> Self {
            Self {
                responses: Mutex::new(VecDeque::from([Err(error)])),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl GenerationClient for MockGeneration {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::Request("no more mock responses".into())))
        }
    }

    // Lets tests keep a handle on the mock after handing it to an assistant.
    #[async_trait]
    impl GenerationClient for Arc<MockGeneration> {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.as_ref().generate(prompt).await
        }
    }

    /// Generation that never completes, for cancellation tests.
    pub struct PendingGeneration;

    #[async_trait]
    impl GenerationClient for PendingGeneration {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            std::future::pending::<()>().await;
            unreachable!("pending generation never resolves")
        }
    }

    /// Fixed activity window.
    pub struct StaticActivityFeed(pub Vec<TeamMessage>);

    #[async_trait]
    impl ActivityFeed for StaticActivityFeed {
        async fn recent_messages(
            &self,
            _: &str,
            limit: usize,
        ) -> Result<Vec<TeamMessage>, ActivityError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::{ACTIVITY_HEADER, CONTEXT_HEADER, CONVERSATION_HEADER};
    use crate::test_support::{
        HashEmbedder, MockGeneration, PendingGeneration, StaticActivityFeed,
    };
    use chrono::Utc;

    fn record(id: &str, content: &str, team: &str) -> ChatRecord {
        ChatRecord {
            message_id: id.into(),
            content: content.into(),
            message_type: "text".into(),
            sender_name: "alice".into(),
            sender_id: "u1".into(),
            team_id: team.into(),
            timestamp: Utc::now(),
        }
    }

    fn make_assistant(generation: impl GenerationClient + 'static) -> Assistant {
        let index = SemanticIndex::new(MemoryVectorStore::new(), HashEmbedder::default());
        let history = ConversationHistory::new(NoHistoryStore);
        Assistant::new(generation, index, history)
    }

    #[tokio::test]
    async fn successful_response_appends_two_turns() {
        let assistant = make_assistant(MockGeneration::new(vec!["We ship on Friday."]));

        let request = AssistantRequest::new("u1", "when do we ship?").with_project("T1");
        let reply = assistant.respond(&request).await.unwrap();

        assert_eq!(reply.response, "We ship on Friday.");
        assert_eq!(reply.project_context, "T1");

        let turns = assistant.conversation("u1", Some("T1")).await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "when do we ship?");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "We ship on Friday.");
    }

    #[tokio::test]
    async fn empty_generation_fails_with_no_turns() {
        let assistant = make_assistant(MockGeneration::new(vec!["   "]));

        let request = AssistantRequest::new("u1", "anything").with_project("T1");
        let err = assistant.respond(&request).await.unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Generation(GenerationError::Empty)
        ));

        assert!(assistant.conversation("u1", Some("T1")).await.is_empty());
    }

    #[tokio::test]
    async fn generation_error_fails_with_no_turns() {
        let assistant = make_assistant(MockGeneration::failing(GenerationError::ApiError {
            status: 429,
            body: "rate limited".into(),
        }));

        let request = AssistantRequest::new("u1", "anything");
        let err = assistant.respond(&request).await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(assistant.conversation("u1", None).await.is_empty());
    }

    #[tokio::test]
    async fn missing_credential_surfaces_as_configuration() {
        let assistant = make_assistant(MockGeneration::failing(
            GenerationError::Configuration("GOOGLE_API_KEY_SUMMARY".into()),
        ));

        let err = assistant
            .respond(&AssistantRequest::new("u1", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Configuration(_)));
    }

    #[tokio::test]
    async fn rag_disabled_prompt_has_no_retrieval_sections() {
        let generation = std::sync::Arc::new(MockGeneration::new(vec!["plain answer"]));
        let assistant = make_assistant(generation.clone());
        assistant
            .ingest_chat_messages(vec![record("m1", "deploy on Friday", "T1")])
            .await;

        let request = AssistantRequest::new("u1", "what's up?")
            .with_project("T1")
            .without_rag();
        let reply = assistant.respond(&request).await.unwrap();
        assert!(reply.sources.is_empty());

        let prompt = generation.last_prompt().unwrap();
        assert!(!prompt.contains(ACTIVITY_HEADER));
        assert!(!prompt.contains(CONTEXT_HEADER));
        assert!(!prompt.contains("deploy on Friday"));
    }

    #[tokio::test]
    async fn rag_prompt_carries_scoped_context_and_activity() {
        let generation = std::sync::Arc::new(MockGeneration::new(vec!["answer"]));

        let index = SemanticIndex::new(MemoryVectorStore::new(), HashEmbedder::default());
        index
            .ingest_batch(vec![
                record("m1", "deploy on Friday", "T1"),
                record("m2", "bug in login", "T1"),
                record("m3", "unrelated topic", "T2"),
            ])
            .await
            .unwrap();

        let assistant = Assistant::new(
            generation.clone(),
            index,
            ConversationHistory::new(NoHistoryStore),
        )
        .with_activity_feed(StaticActivityFeed(vec![TeamMessage {
            sender_name: "carol".into(),
            content: "standup moved to 10am".into(),
            timestamp: Utc::now(),
        }]));

        let request = AssistantRequest::new("u1", "when is the deployment").with_project("T1");
        let reply = assistant.respond(&request).await.unwrap();

        let prompt = generation.last_prompt().unwrap();
        assert!(prompt.contains(ACTIVITY_HEADER));
        assert!(prompt.contains("[carol]: standup moved to 10am"));
        assert!(prompt.contains("deploy on Friday"));
        // T2 content never leaks into a T1-scoped prompt.
        assert!(!prompt.contains("unrelated topic"));

        assert!(!reply.sources.is_empty());
        assert!(reply.sources.iter().all(|s| s.kind == "chat"));
    }

    #[tokio::test]
    async fn conversation_history_feeds_the_next_prompt() {
        let generation = std::sync::Arc::new(MockGeneration::new(vec!["first", "second"]));
        let assistant = make_assistant(generation.clone());

        assistant
            .respond(&AssistantRequest::new("u1", "remember the word zebra"))
            .await
            .unwrap();
        assistant
            .respond(&AssistantRequest::new("u1", "what word was it?"))
            .await
            .unwrap();

        let prompt = generation.last_prompt().unwrap();
        assert!(prompt.contains(CONVERSATION_HEADER));
        assert!(prompt.contains("User: remember the word zebra"));
        assert!(prompt.contains("Assistant: first"));
    }

    #[tokio::test]
    async fn cancellation_records_no_turns() {
        let assistant = make_assistant(PendingGeneration);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = assistant
            .respond_with_cancel(&AssistantRequest::new("u1", "slow question"), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Cancelled));
        assert!(assistant.conversation("u1", None).await.is_empty());
    }

    #[tokio::test]
    async fn reingesting_project_fact_replaces_entry() {
        let assistant = make_assistant(MockGeneration::new(vec![]));

        assert!(
            assistant
                .add_project_knowledge(ProjectFact::new("p1", "Apollo", "old description"))
                .await
        );
        assert!(
            assistant
                .add_project_knowledge(ProjectFact::new("p1", "Apollo", "new description"))
                .await
        );

        assert_eq!(assistant.index_size().await, 1);
    }

    #[tokio::test]
    async fn purge_team_removes_only_that_scope() {
        let assistant = make_assistant(MockGeneration::new(vec![]));
        assistant
            .ingest_chat_messages(vec![
                record("m1", "one", "T1"),
                record("m2", "two", "T1"),
                record("m3", "three", "T2"),
            ])
            .await;

        assert_eq!(assistant.purge_team("T1").await, 2);
        assert_eq!(assistant.index_size().await, 1);
    }

    #[tokio::test]
    async fn batch_ingestion_skips_non_text_and_empty() {
        let assistant = make_assistant(MockGeneration::new(vec![]));

        let mut image = record("m2", "cat.png", "T1");
        image.message_type = "image".into();
        let empty = record("m3", "", "T1");

        let count = assistant
            .ingest_chat_messages(vec![record("m1", "hello there", "T1"), image, empty])
            .await;
        assert_eq!(count, 1);
        assert_eq!(assistant.index_size().await, 1);
    }

    #[tokio::test]
    async fn reply_defaults_to_general_context() {
        let assistant = make_assistant(MockGeneration::new(vec!["hello"]));
        let reply = assistant
            .respond(&AssistantRequest::new("u1", "hi"))
            .await
            .unwrap();
        assert_eq!(reply.project_context, "general");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("generation not configured: {0}")]
    Configuration(String),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("request cancelled")]
    Cancelled,
    #[error("no text messages to summarize")]
    NothingToSummarize,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("missing credential: {0}")]
    Configuration(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("model returned empty response")]
    Empty,
}

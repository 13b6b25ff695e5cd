use gateway_api::RelayError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("{0}")]
    Source(#[from] RelayError),

    #[error("task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

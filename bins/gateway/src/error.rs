#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("{0}")]
    Pipeline(#[from] pipeline::PipelineError),
}

/// Ошибка компонента relay (subscriber, forwarder, publisher).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RelayError {
    /// Брокер / HTTP / сокет.
    #[error("{0}")]
    Io(String),

    /// Payload не является валидным UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Получатель канала subscriber → forward loop уже закрыт.
    #[error("forward channel closed")]
    ChannelClosed,
}

impl RelayError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

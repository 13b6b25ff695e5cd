use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use gateway_api::{Delivery, Message, MessageSink, RelayError};

use crate::PipelineError;
use crate::config::ForwarderConfig;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// ═══════════════════════════════════════════════════════════════
//  HTTP Forwarder — Message → POST url
// ═══════════════════════════════════════════════════════════════

/// Форвардит payload сообщения одним POST'ом на фиксированный URL.
///
/// Тело запроса — байты payload без изменений, `Content-Type` — JSON.
/// Одна попытка на сообщение; retry нет.
pub struct HttpForwarder {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpForwarder {
    pub fn new(config: &ForwarderConfig) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|detail| PipelineError::Config { context: "forward", detail })?;

        let mut builder = reqwest::Client::builder();
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        Self::with_client(&config.url, builder.build()?)
    }

    fn with_client(url: &str, client: reqwest::Client) -> Result<Self, PipelineError> {
        let url = reqwest::Url::parse(url).map_err(|e| PipelineError::Config {
            context: "forward",
            detail: format!("'{url}': {e}"),
        })?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }

    /// Один POST. Любой HTTP статус — `Ok`, ошибка транспорта — `Err(Io)`.
    pub async fn forward(&self, message: &Message) -> Result<Delivery, RelayError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(message.payload.clone())
            .send()
            .await
            .map_err(|e| RelayError::io(format!("POST {}: {e}", self.url)))?;

        Ok(Delivery { status: response.status().as_u16() })
    }
}

impl MessageSink for HttpForwarder {
    fn send<'a>(&'a self, message: &'a Message)
        -> Pin<Box<dyn Future<Output = Result<Delivery, RelayError>> + Send + 'a>>
    {
        Box::pin(self.forward(message))
    }
}

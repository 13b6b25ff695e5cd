use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::RelayError;

// ════════════════════════════════════════════════════════════════
//  Overflow Policy
// ════════════════════════════════════════════════════════════════

/// Стратегия поведения при переполнении bounded канала.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// try_send(): если канал полон — дропнуть сообщение, залогировать.
    Drop,
    /// .send().await: ждать пока появится место (back-pressure).
    #[serde(alias = "backpressure")]
    BackPressure,
}

// ════════════════════════════════════════════════════════════════
//  Message
// ════════════════════════════════════════════════════════════════

/// Сообщение, полученное от брокера: topic + непрозрачный payload.
///
/// Живёт ровно один цикл: receive → forward → discard.
#[derive(Clone, Debug)]
pub struct Message {
    /// Topic, на который пришла публикация.
    pub topic: String,
    /// Байты payload как есть, без перекодирования.
    pub payload: Bytes,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Payload как UTF-8 текст. `RelayError::Utf8`, если байты не валидный UTF-8.
    pub fn text(&self) -> Result<&str, RelayError> {
        Ok(std::str::from_utf8(&self.payload)?)
    }
}

// ════════════════════════════════════════════════════════════════
//  Delivery
// ════════════════════════════════════════════════════════════════

/// Результат одной попытки форварда: HTTP статус, который вернул endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
}

impl Delivery {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Delivery, Message, RelayError};

// ════════════════════════════════════════════════════════════════
//  Relay Traits
// ════════════════════════════════════════════════════════════════

/// Приёмная сторона relay: куда source сдаёт полученные сообщения.
pub trait MessagePublisher: Send + Sync {
    /// Передать сообщение дальше (в канал forward-loop'а).
    fn publish(&self, message: Message)
        -> Pin<Box<dyn Future<Output = Result<(), RelayError>> + Send + '_>>;
}

/// Source — самостоятельно получает сообщения из внешней системы
/// (MQTT брокер) и публикует их через MessagePublisher.
pub trait MessageSource: Send + Sync {
    /// Запустить source. Блокирует (async) пока source активен.
    /// Возврат `Ok(())` — штатная остановка после `stop()`.
    fn start(
        &self,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Pin<Box<dyn Future<Output = Result<(), RelayError>> + Send + '_>>;

    /// Попросить source завершиться (graceful shutdown).
    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<(), RelayError>> + Send + '_>>;
}

/// Sink — доставляет одно сообщение во внешнюю систему (HTTP endpoint).
///
/// Одна попытка, без retry. Ошибка транспорта возвращается как `Err`,
/// любой полученный статус — как `Ok(Delivery)`.
pub trait MessageSink: Send + Sync {
    fn send<'a>(&'a self, message: &'a Message)
        -> Pin<Box<dyn Future<Output = Result<Delivery, RelayError>> + Send + 'a>>;
}

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use gateway_api::{MessageSink, MessageSource, OverflowPolicy};

use crate::{ChannelPublisher, PipelineError, spawn_forward_task, spawn_source};

/// Параметры связки source → канал → sink.
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Размер буфера канала.
    pub buffer: usize,
    pub overflow: OverflowPolicy,
    /// Сколько ждать in-flight форварды после остановки source.
    pub drain_timeout: Duration,
}

// ═══════════════════════════════════════════════════════════════
//  Relay — source → channel → forward loop, graceful shutdown
// ═══════════════════════════════════════════════════════════════

/// Запустить relay и работать до `shutdown` или до завершения source.
///
/// Порядок остановки:
/// 1. source получает `stop()` и дожидается своего `start`;
/// 2. вместе с source уходит последний publisher, канал закрывается,
///    forward loop дочитывает буфер и выходит;
/// 3. in-flight форварды ждём не дольше `drain_timeout`.
///
/// Ошибка source (подключение, потеря соединения) возвращается
/// только после того, как уже принятые сообщения отданы sink'у.
pub async fn run_relay<F>(
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn MessageSink>,
    options: RelayOptions,
    shutdown: F,
) -> Result<(), PipelineError>
where
    F: Future<Output = ()> + Send,
{
    let token = CancellationToken::new();
    // In-flight forwards: по одной задаче на сообщение
    let tracker = TaskTracker::new();

    let (publisher, rx) = ChannelPublisher::channel(options.buffer, options.overflow);

    let forward_handle = spawn_forward_task(sink, "http".into(), rx, tracker.clone());
    let mut source_handle = spawn_source(source, "mqtt".into(), Arc::new(publisher), token.clone());

    let finished = tokio::select! {
        _ = shutdown => None,
        result = &mut source_handle => Some(result),
    };

    let source_result = match finished {
        Some(result) => result,
        None => {
            tracing::info!("shutting down...");
            token.cancel();
            source_handle.await
        }
    };

    if let Err(e) = forward_handle.await {
        tracing::error!(error = %e, "forward task failed");
    }

    // Drain in-flight forwards
    tracker.close();
    if tokio::time::timeout(options.drain_timeout, tracker.wait()).await.is_err() {
        tracing::warn!(in_flight = tracker.len(), "drain timeout, abandoning in-flight forwards");
    }

    source_result??;
    Ok(())
}

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use gateway_api::{MessagePublisher, MessageSource, RelayError};

// ═══════════════════════════════════════════════════════════════
//  Source task — MessageSource → MessagePublisher
// ═══════════════════════════════════════════════════════════════

/// Запустить source как отдельную задачу.
///
/// По отмене токена просит source остановиться (`stop`) и дожидается,
/// пока `start` вернётся. Результат `start` отдаётся через JoinHandle:
/// ошибка подключения должна дойти до main.
pub fn spawn_source(
    source: Arc<dyn MessageSource>,
    source_name: String,
    publisher: Arc<dyn MessagePublisher>,
    token: CancellationToken,
) -> JoinHandle<Result<(), RelayError>> {
    tokio::spawn(async move {
        tracing::info!(source = %source_name, "starting");

        let run = source.start(publisher);
        tokio::pin!(run);

        let result = tokio::select! {
            result = &mut run => result,
            _ = token.cancelled() => {
                tracing::info!(source = %source_name, "cancellation requested");
                if let Err(e) = source.stop().await {
                    tracing::error!(source = %source_name, error = ?e, "stop error");
                }
                run.await
            }
        };

        match &result {
            Ok(()) => tracing::info!(source = %source_name, "stopped"),
            Err(e) => tracing::error!(source = %source_name, error = %e, "source failed"),
        }
        result
    })
}

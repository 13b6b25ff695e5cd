use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use gateway_api::{Message, MessageSink};

// ═══════════════════════════════════════════════════════════════
//  Forward task — channel → sink.send() (one task per message)
// ═══════════════════════════════════════════════════════════════

/// Запустить forward loop: читает сообщения из канала и на каждое
/// спавнит отдельную задачу форварда в `tracker`.
///
/// Ограничения параллелизма нет. Ошибки форварда только логируются,
/// loop продолжает работу. Payload, не являющийся UTF-8, пропускается.
///
/// Токена отмены нет: loop завершается, когда закрыты все отправители
/// канала, успев забрать всё, что уже было в буфере.
pub fn spawn_forward_task(
    sink: Arc<dyn MessageSink>,
    sink_name: String,
    mut rx: mpsc::Receiver<Message>,
    tracker: TaskTracker,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message.text() {
                Ok(text) => {
                    tracing::info!(topic = %message.topic, payload = %text, "message received");
                }
                Err(e) => {
                    tracing::warn!(
                        topic = %message.topic,
                        bytes = message.payload.len(),
                        error = %e,
                        "payload is not valid UTF-8, skipping"
                    );
                    continue;
                }
            }

            let sink = sink.clone();
            let name = sink_name.clone();
            tracker.spawn(async move {
                match sink.send(&message).await {
                    Ok(delivery) if delivery.is_success() => {
                        tracing::info!(sink = %name, topic = %message.topic, status = delivery.status, "data forwarded");
                    }
                    Ok(delivery) => {
                        tracing::warn!(sink = %name, topic = %message.topic, status = delivery.status, "data forwarded, endpoint returned non-success status");
                    }
                    Err(e) => {
                        tracing::error!(sink = %name, topic = %message.topic, error = %e, "failed to forward data");
                    }
                }
            });
        }
        tracing::info!(sink = %sink_name, "stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use gateway_api::{Delivery, RelayError};

    /// Sink, который проваливает первую отправку и запоминает payload'ы.
    #[derive(Default)]
    struct Flaky {
        attempts: AtomicUsize,
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl MessageSink for Flaky {
        fn send<'a>(&'a self, message: &'a Message)
            -> Pin<Box<dyn Future<Output = Result<Delivery, RelayError>> + Send + 'a>>
        {
            Box::pin(async move {
                let n = self.attempts.fetch_add(1, Ordering::SeqCst);
                self.sent.lock().unwrap().push(message.payload.to_vec());
                if n == 0 {
                    Err(RelayError::io("POST http://endpoint: connection refused"))
                } else {
                    Ok(Delivery { status: 200 })
                }
            })
        }
    }

    async fn run_to_completion(sink: Arc<Flaky>, messages: Vec<Message>) {
        let (tx, rx) = mpsc::channel(16);
        let tracker = TaskTracker::new();
        let handle = spawn_forward_task(sink, "test".into(), rx, tracker.clone());
        for m in messages {
            tx.send(m).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();
        tracker.close();
        tracker.wait().await;
    }

    #[tokio::test]
    async fn failure_does_not_stop_forwarding() {
        let sink = Arc::new(Flaky::default());
        run_to_completion(
            sink.clone(),
            vec![Message::new("t", "one"), Message::new("t", "two"), Message::new("t", "three")],
        )
        .await;

        assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
        let mut sent = sink.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(sent, vec![b"one".to_vec(), b"three".to_vec(), b"two".to_vec()]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_not_forwarded() {
        let sink = Arc::new(Flaky::default());
        run_to_completion(
            sink.clone(),
            vec![Message::new("t", vec![0xffu8, 0xfe]), Message::new("t", "ok")],
        )
        .await;

        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(sink.sent.lock().unwrap().as_slice(), &[b"ok".to_vec()]);
    }

    #[tokio::test]
    async fn buffered_messages_are_drained_after_senders_close() {
        let (tx, rx) = mpsc::channel(8);
        for payload in ["a", "b", "c", "d"] {
            tx.send(Message::new("t", payload)).await.unwrap();
        }
        drop(tx);

        let sink = Arc::new(Flaky::default());
        let tracker = TaskTracker::new();
        spawn_forward_task(sink.clone(), "test".into(), rx, tracker.clone()).await.unwrap();
        tracker.close();
        tracker.wait().await;

        assert_eq!(sink.attempts.load(Ordering::SeqCst), 4);
    }
}

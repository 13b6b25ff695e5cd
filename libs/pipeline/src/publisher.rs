use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use gateway_api::{Message, MessagePublisher, OverflowPolicy, RelayError};

/// Publisher-сторона канала source → forward loop.
pub struct ChannelPublisher {
    tx: mpsc::Sender<Message>,
    overflow: OverflowPolicy,
}

impl ChannelPublisher {
    /// Создать bounded канал и publisher над ним.
    pub fn channel(buffer: usize, overflow: OverflowPolicy) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx, overflow }, rx)
    }
}

impl MessagePublisher for ChannelPublisher {
    fn publish(&self, message: Message)
        -> Pin<Box<dyn Future<Output = Result<(), RelayError>> + Send + '_>>
    {
        Box::pin(async move {
            match self.overflow {
                OverflowPolicy::Drop => match self.tx.try_send(message) {
                    Ok(()) => Ok(()),
                    Err(mpsc::error::TrySendError::Full(message)) => {
                        tracing::warn!(topic = %message.topic, "channel full, dropping");
                        Ok(())
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        Err(RelayError::ChannelClosed)
                    }
                },
                OverflowPolicy::BackPressure => self
                    .tx
                    .send(message)
                    .await
                    .map_err(|_| RelayError::ChannelClosed),
            }
        })
    }
}

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    SubscribeReasonCode,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use gateway_api::{Message, MessagePublisher, MessageSource, RelayError};

use crate::PipelineError;
use crate::config::SubscriberConfig;

/// Сколько ждать, пока DISCONNECT уйдёт брокеру при остановке.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

// ═══════════════════════════════════════════════════════════════
//  Session — реакция на события MQTT event loop'а
// ═══════════════════════════════════════════════════════════════

/// Что сделать после очередного события.
#[derive(Debug)]
enum Step {
    /// Брокер подтвердил подключение — выдать SUBSCRIBE.
    Subscribe,
    /// Публикация на подписанный topic — передать в relay.
    Deliver(Message),
    Idle,
}

/// Состояние одной MQTT сессии. Подписка выдаётся только после
/// успешного CONNACK, повторно — на каждом новом CONNACK. Публикации
/// доставляются только после SUBACK текущей сессии.
#[derive(Debug)]
struct Session {
    topic: String,
    connected: bool,
    subscribed: bool,
}

impl Session {
    fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            connected: false,
            subscribed: false,
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn on_event(&mut self, event: Event) -> Result<Step, RelayError> {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if !matches!(ack.code, ConnectReturnCode::Success) {
                    return Err(RelayError::io(format!("connection refused: {:?}", ack.code)));
                }
                self.connected = true;
                self.subscribed = false;
                Ok(Step::Subscribe)
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                if ack.return_codes.iter().any(|c| matches!(c, SubscribeReasonCode::Failure)) {
                    return Err(RelayError::io(format!(
                        "subscription to '{}' rejected by broker",
                        self.topic
                    )));
                }
                self.subscribed = true;
                tracing::debug!(topic = %self.topic, "subscription acknowledged");
                Ok(Step::Idle)
            }
            Event::Incoming(Packet::Publish(publish)) => {
                if !self.subscribed {
                    tracing::debug!(topic = %publish.topic, "publish before suback, ignoring");
                    return Ok(Step::Idle);
                }
                Ok(Step::Deliver(Message::new(publish.topic, publish.payload)))
            }
            other => {
                tracing::trace!(event = ?other, "mqtt event");
                Ok(Step::Idle)
            }
        }
    }
}

fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

// ═══════════════════════════════════════════════════════════════
//  MQTT Subscriber — broker → MessagePublisher
// ═══════════════════════════════════════════════════════════════

/// Подписчик на один topic MQTT брокера.
///
/// Ошибка подключения до первого CONNACK — фатальна (startup failure).
/// Потеря уже установленного соединения тоже завершает source с ошибкой:
/// переподключения нет.
pub struct MqttSubscriber {
    client: AsyncClient,
    event_loop: Mutex<EventLoop>,
    broker: String,
    client_id: String,
    topic: String,
    qos: QoS,
    shutdown: CancellationToken,
}

impl MqttSubscriber {
    pub fn new(config: &SubscriberConfig) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|detail| PipelineError::Config { context: "broker", detail })?;

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_clean_session(config.clean_session);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        let (client, event_loop) = AsyncClient::new(options, config.request_capacity);

        Ok(Self {
            client,
            event_loop: Mutex::new(event_loop),
            broker: format!("{}:{}", config.host, config.port),
            client_id: config.client_id.clone(),
            topic: config.topic.clone(),
            qos: qos_from_level(config.qos),
            shutdown: CancellationToken::new(),
        })
    }

    async fn run(&self, publisher: Arc<dyn MessagePublisher>) -> Result<(), RelayError> {
        let mut event_loop = self.event_loop.lock().await;
        let mut session = Session::new(&self.topic);

        tracing::info!(broker = %self.broker, client_id = %self.client_id, "connecting to broker");

        loop {
            let polled = tokio::select! {
                event = event_loop.poll() => Some(event),
                _ = self.shutdown.cancelled() => None,
            };
            let Some(polled) = polled else {
                if session.is_connected() {
                    self.disconnect(&mut event_loop).await;
                }
                return Ok(());
            };

            let event = match polled {
                Ok(event) => event,
                Err(e) if session.is_connected() => {
                    return Err(RelayError::io(format!("connection to {} lost: {e}", self.broker)));
                }
                Err(e) => {
                    return Err(RelayError::io(format!("connect to {}: {e}", self.broker)));
                }
            };

            match session.on_event(event)? {
                Step::Subscribe => {
                    tracing::info!(broker = %self.broker, "connected to broker");
                    self.client
                        .subscribe(self.topic.as_str(), self.qos)
                        .await
                        .map_err(|e| RelayError::io(format!("subscribe '{}': {e}", self.topic)))?;
                    tracing::info!(topic = %self.topic, qos = ?self.qos, "subscribed");
                }
                Step::Deliver(message) => publisher.publish(message).await?,
                Step::Idle => {}
            }
        }
    }

    /// DISCONNECT + короткий drain event loop'а, чтобы пакет ушёл брокеру.
    async fn disconnect(&self, event_loop: &mut EventLoop) {
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!(error = %e, "disconnect request failed");
            return;
        }
        let drain = async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_TIMEOUT, drain).await.is_err() {
            tracing::warn!(broker = %self.broker, "disconnect not flushed in time");
            return;
        }
        tracing::info!(broker = %self.broker, "disconnected from broker");
    }
}

impl MessageSource for MqttSubscriber {
    fn start(
        &self,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Pin<Box<dyn Future<Output = Result<(), RelayError>> + Send + '_>> {
        Box::pin(self.run(publisher))
    }

    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<(), RelayError>> + Send + '_>> {
        self.shutdown.cancel();
        Box::pin(async { Ok(()) })
    }
}

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

pub use gateway_api::OverflowPolicy;
pub use pipeline::config::{ForwarderConfig, SubscriberConfig};

use crate::error::GatewayError;

#[derive(Parser)]
#[command(name = "iot-gateway", about = "MQTT → HTTP relay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Подписаться на topic и форвардить сообщения на HTTP endpoint
    Run(RunArgs),
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Путь к TOML конфиг файлу
    #[arg(long, default_value = "gateway.toml", env = "GATEWAY_CONFIG")]
    pub config: String,

    /// Хост MQTT брокера
    #[arg(long, env = "GATEWAY_BROKER_HOST")]
    pub broker_host: Option<String>,

    /// Порт MQTT брокера
    #[arg(long, env = "GATEWAY_BROKER_PORT")]
    pub broker_port: Option<u16>,

    /// MQTT client identifier
    #[arg(long, env = "GATEWAY_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Topic подписки
    #[arg(long, env = "GATEWAY_TOPIC")]
    pub topic: Option<String>,

    /// QoS подписки (0, 1, 2)
    #[arg(long, env = "GATEWAY_QOS")]
    pub qos: Option<u8>,

    /// URL, на который форвардятся payload'ы
    #[arg(long, env = "GATEWAY_URL")]
    pub url: Option<String>,

    /// Завершиться по Enter в stdin (в дополнение к Ctrl+C)
    #[arg(long)]
    pub interactive: bool,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub broker: SubscriberConfig,
    #[serde(default)]
    pub forward: ForwarderConfig,
    /// Размер буфера канала subscriber → forward loop.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
    /// Стратегия переполнения этого канала.
    #[serde(default = "default_overflow")]
    pub overflow: OverflowPolicy,
    /// Сколько ждать in-flight форварды при shutdown.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            broker: SubscriberConfig::default(),
            forward: ForwarderConfig::default(),
            buffer: default_buffer(),
            overflow: default_overflow(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_buffer() -> usize {
    1024
}
fn default_overflow() -> OverflowPolicy {
    OverflowPolicy::BackPressure
}
fn default_drain_timeout_secs() -> u64 {
    5
}

impl GatewayConfig {
    pub fn load(path: &str) -> Result<Self, GatewayError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        toml::from_str(&content)
            .map_err(|e| GatewayError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }
}

// ---- Effective: defaults < config file < env/CLI ----

pub struct Effective {
    pub broker: SubscriberConfig,
    pub forward: ForwarderConfig,
    pub buffer: usize,
    pub overflow: OverflowPolicy,
    pub drain_timeout: Duration,
    pub interactive: bool,
}

impl Effective {
    /// Отсутствующий конфиг файл — не ошибка (берутся defaults),
    /// существующий, но битый — ошибка.
    pub fn new(args: &RunArgs) -> Result<Self, GatewayError> {
        let cfg = match GatewayConfig::load(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                tracing::debug!(config = %args.config, "config file not found, using defaults");
                GatewayConfig::default()
            }
        };
        Self::merge(args, cfg)
    }

    fn merge(args: &RunArgs, cfg: GatewayConfig) -> Result<Self, GatewayError> {
        let mut broker = cfg.broker;
        if let Some(host) = &args.broker_host {
            broker.host = host.clone();
        }
        if let Some(port) = args.broker_port {
            broker.port = port;
        }
        if let Some(client_id) = &args.client_id {
            broker.client_id = client_id.clone();
        }
        if let Some(topic) = &args.topic {
            broker.topic = topic.clone();
        }
        if let Some(qos) = args.qos {
            broker.qos = qos;
        }

        let mut forward = cfg.forward;
        if let Some(url) = &args.url {
            forward.url = url.clone();
        }

        broker
            .validate()
            .map_err(|detail| GatewayError::Config { context: "broker", detail })?;
        forward
            .validate()
            .map_err(|detail| GatewayError::Config { context: "forward", detail })?;
        if cfg.buffer == 0 {
            return Err(GatewayError::Config { context: "buffer", detail: "must be non-zero".into() });
        }

        Ok(Self {
            broker,
            forward,
            buffer: cfg.buffer,
            overflow: cfg.overflow,
            drain_timeout: Duration::from_secs(cfg.drain_timeout_secs),
            interactive: args.interactive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["iot-gateway", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
        }
    }

    #[test]
    fn missing_default_file_uses_defaults() {
        let eff = Effective::new(&run_args(&["--config", "/nonexistent/gateway.toml"])).unwrap();
        assert_eq!(eff.broker.host, "broker.hivemq.com");
        assert_eq!(eff.broker.topic, "iot/devices/sensor1");
        assert_eq!(eff.forward.url, "https://example-cloud-server.com/api/iot");
        assert_eq!(eff.buffer, 1024);
        assert_eq!(eff.overflow, OverflowPolicy::BackPressure);
        assert_eq!(eff.drain_timeout, Duration::from_secs(5));
        assert!(!eff.interactive);
    }

    #[test]
    fn file_values_are_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            buffer = 16
            overflow = "drop"

            [broker]
            host = "mqtt.local"
            port = 11883
            topic = "plant/line1/temp"
            qos = 1

            [forward]
            url = "http://collector.local/ingest"
            timeout_ms = 2500
            "#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let eff = Effective::new(&run_args(&["--config", &path])).unwrap();
        assert_eq!(eff.broker.host, "mqtt.local");
        assert_eq!(eff.broker.port, 11883);
        assert_eq!(eff.broker.client_id, "IoTGateway");
        assert_eq!(eff.broker.topic, "plant/line1/temp");
        assert_eq!(eff.broker.qos, 1);
        assert_eq!(eff.forward.url, "http://collector.local/ingest");
        assert_eq!(eff.forward.timeout_ms, Some(2500));
        assert_eq!(eff.buffer, 16);
        assert_eq!(eff.overflow, OverflowPolicy::Drop);
    }

    #[test]
    fn cli_overrides_file() {
        let cfg: GatewayConfig = toml::from_str(
            r#"
            [broker]
            host = "mqtt.local"
            topic = "a/b"
            "#,
        )
        .unwrap();
        let args = run_args(&[
            "--broker-host", "10.0.0.5",
            "--topic", "c/d",
            "--url", "http://localhost:9000/x",
            "--interactive",
        ]);
        let eff = Effective::merge(&args, cfg).unwrap();
        assert_eq!(eff.broker.host, "10.0.0.5");
        assert_eq!(eff.broker.topic, "c/d");
        assert_eq!(eff.forward.url, "http://localhost:9000/x");
        assert!(eff.interactive);
    }

    #[test]
    fn broken_existing_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "buffer = \"lots\"").unwrap();
        let path = file.path().to_string_lossy().to_string();
        let err = Effective::new(&run_args(&["--config", &path])).err().unwrap();
        assert!(matches!(err, GatewayError::Config { context: "parse", .. }));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let args = run_args(&["--qos", "7"]);
        let err = Effective::merge(&args, GatewayConfig::default()).err().unwrap();
        assert!(matches!(err, GatewayError::Config { context: "broker", .. }));

        let args = run_args(&["--url", "mailto:ops@example.com"]);
        let err = Effective::merge(&args, GatewayConfig::default()).err().unwrap();
        assert!(matches!(err, GatewayError::Config { context: "forward", .. }));

        let cfg = GatewayConfig { buffer: 0, ..GatewayConfig::default() };
        let err = Effective::merge(&run_args(&[]), cfg).err().unwrap();
        assert!(matches!(err, GatewayError::Config { context: "buffer", .. }));
    }
}

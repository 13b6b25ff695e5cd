use serde::Deserialize;

// ═══════════════════════════════════════════════════════════════
//  Subscriber (MQTT broker) Config
// ═══════════════════════════════════════════════════════════════

/// Подключение к MQTT брокеру и единственная подписка.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriberConfig {
    /// Хост брокера.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP порт брокера.
    #[serde(default = "default_port")]
    pub port: u16,
    /// MQTT client identifier.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Clean session: брокер не хранит состояние между подключениями.
    #[serde(default = "default_clean_session")]
    pub clean_session: bool,
    /// Keep-alive интервал в секундах.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Topic подписки (без wildcard'ов).
    #[serde(default = "default_topic")]
    pub topic: String,
    /// QoS подписки: 0, 1 или 2.
    #[serde(default)]
    pub qos: u8,
    /// Ёмкость очереди запросов MQTT клиента (subscribe/disconnect).
    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            clean_session: default_clean_session(),
            keep_alive_secs: default_keep_alive_secs(),
            topic: default_topic(),
            qos: 0,
            request_capacity: default_request_capacity(),
        }
    }
}

impl SubscriberConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("broker host must not be empty".into());
        }
        if self.port == 0 {
            return Err("broker port must be non-zero".into());
        }
        if self.client_id.is_empty() {
            return Err("client_id must not be empty".into());
        }
        if self.topic.is_empty() {
            return Err("topic must not be empty".into());
        }
        if self.topic.contains(['+', '#']) {
            return Err(format!("topic '{}' must not contain wildcards", self.topic));
        }
        if self.qos > 2 {
            return Err(format!("qos must be 0, 1 or 2, got {}", self.qos));
        }
        if self.keep_alive_secs < 5 {
            return Err(format!("keep_alive_secs must be at least 5, got {}", self.keep_alive_secs));
        }
        if self.request_capacity == 0 {
            return Err("request_capacity must be non-zero".into());
        }
        Ok(())
    }
}

fn default_host() -> String {
    "broker.hivemq.com".into()
}
fn default_port() -> u16 {
    1883
}
fn default_client_id() -> String {
    "IoTGateway".into()
}
fn default_clean_session() -> bool {
    true
}
fn default_keep_alive_secs() -> u64 {
    60
}
fn default_topic() -> String {
    "iot/devices/sensor1".into()
}
fn default_request_capacity() -> usize {
    10
}

// ═══════════════════════════════════════════════════════════════
//  Forwarder (HTTP endpoint) Config
// ═══════════════════════════════════════════════════════════════

/// Куда и как форвардить payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwarderConfig {
    /// URL endpoint'а, принимающего POST.
    #[serde(default = "default_url")]
    pub url: String,
    /// Таймаут запроса. None = дефолт HTTP клиента.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_ms: None,
        }
    }
}

impl ForwarderConfig {
    pub fn validate(&self) -> Result<(), String> {
        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| format!("invalid forward url '{}': {e}", self.url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!("forward url '{}' must be http or https", self.url));
        }
        if self.timeout_ms == Some(0) {
            return Err("timeout_ms must be non-zero when set".into());
        }
        Ok(())
    }
}

fn default_url() -> String {
    "https://example-cloud-server.com/api/iot".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_defaults_match_public_demo_broker() {
        let cfg = SubscriberConfig::default();
        assert_eq!(cfg.host, "broker.hivemq.com");
        assert_eq!(cfg.port, 1883);
        assert_eq!(cfg.client_id, "IoTGateway");
        assert!(cfg.clean_session);
        assert_eq!(cfg.topic, "iot/devices/sensor1");
        assert_eq!(cfg.qos, 0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn subscriber_partial_toml_fills_defaults() {
        let cfg: SubscriberConfig = toml::from_str(
            r#"
            host = "localhost"
            qos = 1
            "#,
        )
        .unwrap();
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.qos, 1);
        assert_eq!(cfg.port, 1883);
        assert_eq!(cfg.keep_alive_secs, 60);
    }

    #[test]
    fn subscriber_rejects_wildcards_and_bad_qos() {
        let cfg = SubscriberConfig { topic: "iot/devices/+".into(), ..Default::default() };
        assert!(cfg.validate().unwrap_err().contains("wildcards"));

        let cfg = SubscriberConfig { topic: "iot/#".into(), ..Default::default() };
        assert!(cfg.validate().is_err());

        let cfg = SubscriberConfig { qos: 3, ..Default::default() };
        assert!(cfg.validate().unwrap_err().contains("qos"));

        let cfg = SubscriberConfig { port: 0, ..Default::default() };
        assert!(cfg.validate().is_err());

        let cfg = SubscriberConfig { keep_alive_secs: 1, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn forwarder_validates_url() {
        assert!(ForwarderConfig::default().validate().is_ok());

        let cfg = ForwarderConfig { url: "not a url".into(), timeout_ms: None };
        assert!(cfg.validate().unwrap_err().contains("invalid forward url"));

        let cfg = ForwarderConfig { url: "ftp://example.com/x".into(), timeout_ms: None };
        assert!(cfg.validate().unwrap_err().contains("http or https"));

        let cfg = ForwarderConfig { url: "http://127.0.0.1:8080/api".into(), timeout_ms: Some(0) };
        assert!(cfg.validate().is_err());
    }
}

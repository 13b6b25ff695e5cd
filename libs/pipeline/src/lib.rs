pub mod config;
pub mod error;
mod forwarder;
mod publisher;
mod relay;
mod sink;
mod source;
mod subscriber;

pub use error::PipelineError;
pub use forwarder::HttpForwarder;
pub use publisher::ChannelPublisher;
pub use relay::{RelayOptions, run_relay};
pub use sink::spawn_forward_task;
pub use source::spawn_source;
pub use subscriber::MqttSubscriber;

use std::sync::Arc;

use tokio::io::AsyncBufReadExt;

use crate::config::Effective;
use crate::error::GatewayError;
use pipeline::{HttpForwarder, MqttSubscriber, RelayOptions, run_relay};

pub async fn run(eff: Effective) -> Result<(), GatewayError> {
    tracing::info!("iot-gateway starting");

    // --- Forwarder ---
    let forwarder = HttpForwarder::new(&eff.forward)?;
    tracing::info!(url = %forwarder.url(), timeout_ms = ?eff.forward.timeout_ms, "forwarder ready");

    // --- Subscriber ---
    let subscriber = MqttSubscriber::new(&eff.broker)?;

    if eff.interactive {
        tracing::info!("gateway is running, press Enter or Ctrl+C to exit");
    } else {
        tracing::info!("gateway is running, press Ctrl+C to exit");
    }

    let options = RelayOptions {
        buffer: eff.buffer,
        overflow: eff.overflow,
        drain_timeout: eff.drain_timeout,
    };
    run_relay(
        Arc::new(subscriber),
        Arc::new(forwarder),
        options,
        shutdown_signal(eff.interactive),
    )
    .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Ctrl+C, а с `--interactive` ещё и Enter.
async fn shutdown_signal(interactive: bool) {
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
            }
        }
        _ = wait_for_enter(), if interactive => {}
    }
}

/// Одна строка из stdin (или EOF).
async fn wait_for_enter() {
    let mut line = String::new();
    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let _ = stdin.read_line(&mut line).await;
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Device event subscription driven by a scripted stream.
//!
//! A feeder task plays the part of the server: it writes a heartbeat and a few
//! device frames into an in-memory pipe, then keeps sending heartbeats until the
//! subscription closes the stream. Press Ctrl+C to stop earlier.

use colored::*;
use modality_events::subscription::{Subscription, SubscriptionConfig};
use modality_events::types::{DEVICE_EVENTS_HEARTBEAT_MS, DeviceEventData, DeviceEventSubscription};
use modality_events::utils::{setup_logger, setup_signal_hook};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::Notify;
use tracing::{error, info, warn};

const RUN_FOR_SECS: u64 = 5;

const SCRIPT: &[&str] = &[
    "event: message\n",
    "data: {\"action\":\"added\",\"deviceInfo\":{\"deviceId\":\"sensor-01\",\"name\":\"Intraoral Sensor\",\"hasSensor\":true,\"status\":\"Available\"}}\n",
    "event: message\n",
    "data: {\"action\":\"changed\",\"deviceInfo\":{\"deviceId\":\"sensor-01\",\"status\":\"InUse\",\"battery\":{\"hasBattery\":true,\"percentRemaining\":42.0,\"level\":\"Good\"}}}\n",
    "event: message\n",
    "data: not-json\n",
    "event: message\n",
    "data: {\"action\":\"removed\",\"deviceInfo\":{\"deviceId\":\"sensor-01\"}}\n",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger();

    info!(
        "{}",
        "🚀 Starting Device Event Subscription Example"
            .bright_green()
            .bold()
    );

    let (server, client) = tokio::io::duplex(4096);

    let feeder = tokio::spawn(feed(server));

    let mut subscription: DeviceEventSubscription =
        Subscription::open_json(client, |data: &DeviceEventData| {
            let name = data.device_info.name.as_deref().unwrap_or("N/A");
            info!(
                "{} {} ({}) status={:?}",
                format!("{:?}", data.action).bright_blue(),
                data.device_info.device_id.bright_cyan(),
                name,
                data.device_info.status
            );
        })
        .on_heartbeat(|heartbeat| {
            info!(
                "{}",
                format!("💓 Heartbeat, timeout {:?}", heartbeat.timeout()).dimmed()
            )
        })
        .on_started(|| info!("{}", "✅ Subscription started".bright_green()))
        .on_stopped(|| info!("{}", "🔌 Subscription stopped".bright_yellow()))
        .on_error(|err| {
            if err.is_fatal() {
                error!("❌ {}", err);
            } else {
                warn!("⚠️ {}", err);
            }
        })
        .with_config(SubscriptionConfig::new().with_stop_timeout(Duration::from_millis(500)))?;

    let shutdown_signal = Arc::new(Notify::new());
    setup_signal_hook(Arc::clone(&shutdown_signal)).await?;

    subscription.start()?;

    tokio::select! {
        _ = shutdown_signal.notified() => info!("Shutdown requested"),
        _ = tokio::time::sleep(Duration::from_secs(RUN_FOR_SECS)) => info!("Demo time is up"),
    }

    let liveness = subscription.liveness();
    info!(
        "{}",
        format!(
            "📊 {} frames, {} heartbeats, {} dropped, stale: {}",
            liveness.frames,
            liveness.heartbeats,
            liveness.dropped_frames,
            liveness.is_stale(std::time::Instant::now())
        )
        .bright_yellow()
    );

    subscription.stop().await;

    match feeder.await {
        Ok(Err(err)) => info!("Feeder finished: {}", err),
        Ok(Ok(())) => {}
        Err(err) => error!("Feeder task failed: {}", err),
    }

    info!(
        "{}",
        "✨ Device event example completed!".bright_green().bold()
    );
    Ok(())
}

/// Writes the scripted frames, then a heartbeat every second until the
/// subscription closes its end of the pipe.
async fn feed(mut server: DuplexStream) -> std::io::Result<()> {
    let heartbeat = format!(
        "event: heartbeat\ndata: {{\"heartbeatTimeout\":{}}}\n",
        DEVICE_EVENTS_HEARTBEAT_MS
    );
    server.write_all(heartbeat.as_bytes()).await?;
    for line in SCRIPT {
        server.write_all(line.as_bytes()).await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        server.write_all(heartbeat.as_bytes()).await?;
    }
}

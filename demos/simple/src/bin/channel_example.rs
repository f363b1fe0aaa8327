use colored::*;
use modality_events::subscription::{ChannelSubscriptionListener, SubscriptionEvent};
use modality_events::types::{
    ACQUISITION_STATUS_HEARTBEAT_MS, AcquisitionStatus, AcquisitionStatusSubscription,
};
use modality_events::utils::setup_logger;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

/// Example demonstrating channel-based status processing.
///
/// This example shows how to use `ChannelSubscriptionListener` to receive
/// acquisition status frames through a tokio channel, processing them in a
/// separate task. The stream is a scripted in-memory pipe that ends on its own.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger();

    info!(
        "{}",
        "🚀 Starting Channel-based Acquisition Status Example"
            .bright_green()
            .bold()
    );

    let (listener, mut receiver) = ChannelSubscriptionListener::create_channel();

    let processor_handle = tokio::spawn(async move {
        let mut status_count = 0u64;

        while let Some(event) = receiver.recv().await {
            match event {
                SubscriptionEvent::Started => info!("{}", "📡 Run started".bright_cyan()),
                SubscriptionEvent::Event(status) => {
                    status_count += 1;
                    process_status(&status, status_count);
                }
                SubscriptionEvent::Heartbeat(heartbeat) => {
                    info!("💓 heartbeat ({}ms)", heartbeat.timeout_millis)
                }
                SubscriptionEvent::Error { fatal, message } => {
                    if fatal {
                        error!("❌ {}", message);
                    } else {
                        warn!("⚠️ {}", message);
                    }
                }
                SubscriptionEvent::Stopped => break,
            }
        }

        info!(
            "{}",
            format!("📈 Final Stats: {} status frames", status_count)
                .bright_yellow()
                .bold()
        );
    });

    let (mut server, client) = tokio::io::duplex(4096);

    let mut subscription: AcquisitionStatusSubscription =
        AcquisitionStatusSubscription::open_json(client, |_: &AcquisitionStatus| {});
    subscription.add_listener(Box::new(listener));
    subscription.start()?;

    let heartbeat = format!(
        "event: heartbeat\ndata: {{\"heartbeatTimeout\":{}}}\n",
        ACQUISITION_STATUS_HEARTBEAT_MS
    );
    let states = ["Initializing", "Ready", "Reading", "Processing", "NewImage", "LowBattery"];
    for (index, state) in states.iter().enumerate() {
        server.write_all(heartbeat.as_bytes()).await?;
        let frame = format!(
            "event: message\ndata: {{\"ready\":{},\"state\":\"{}\",\"totalImages\":{}}}\n",
            *state == "Ready",
            state,
            index
        );
        server.write_all(frame.as_bytes()).await?;
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    // Closing our end ends the run naturally
    drop(server);

    let _ = processor_handle.await;
    subscription.stop().await;

    info!(
        "{}",
        "✨ Channel-based subscription example completed!"
            .bright_green()
            .bold()
    );
    Ok(())
}

/// Process a single acquisition status.
///
/// # Arguments
///
/// * `status` - The status to process
/// * `count` - The sequential number of this status
fn process_status(status: &AcquisitionStatus, count: u64) {
    let state = format!("{:?}", status.state);
    let state = if status.state.is_failure() {
        state.red().to_string()
    } else {
        state.bright_cyan().to_string()
    };
    info!(
        "[{}] {} ready={} images={}",
        format!("#{}", count).bright_blue(),
        state,
        status.ready,
        status.total_images
    );
}

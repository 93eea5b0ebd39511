//! Command-line interface for avro-consumer
//!
//! # Usage
//!
//! ```bash
//! avro-consumer \
//!   --brokers localhost:9092 \
//!   --registry-urls http://localhost:8081 \
//!   --topic orders \
//!   --group-id orders-reader \
//!   --initial-offset oldest \
//!   --format json
//! ```
//!
//! Decoded messages go to stdout, one per line. Logs go to stderr and are
//! controlled with `RUST_LOG`.

use anyhow::Context;
use avro_consumer::{format_message, OutputFormat};
use avro_consumer_kafka_source::{Config, Consumer, ConsumerCallbacks};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "avro-consumer")]
#[command(about = "Consume schema-registry Avro records from Kafka and print them as JSON")]
#[command(long_about = None)]
struct Cli {
    /// Kafka and schema registry options
    #[command(flatten)]
    config: Config,

    /// Output format for decoded messages
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    let callbacks = ConsumerCallbacks::new()
        .on_data_received(move |message| match format_message(&message, format) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "Failed to format message: {e:#}"
            ),
        })
        .on_error(|e| error!(kind = ?e.kind(), "{e}"))
        .on_notification(|n| {
            info!(
                kind = ?n.kind,
                claimed = ?n.claimed,
                released = ?n.released,
                current = ?n.current,
                error = ?n.error,
                "Consumer group notification"
            )
        });

    let config = &cli.config;
    let consumer = Consumer::connect(
        &config.brokers,
        &config.registry_urls,
        &config.topic,
        &config.group_id,
        callbacks,
        config.consumer_config(),
    )
    .await
    .with_context(|| format!("Failed to start consumer for topic '{}'", config.topic))?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                signal.cancel();
            }
            Err(e) => error!("Failed to listen for interrupt: {e}"),
        }
    });

    let stats = consumer.consume(shutdown).await?;
    // Closing commits offsets synchronously.
    tokio::task::spawn_blocking(move || consumer.close())
        .await
        .context("Close task failed")?
        .context("Failed to close consumer")?;

    info!(
        received = stats.received,
        decoded = stats.decoded,
        failed = stats.failed,
        acknowledged = stats.acknowledged,
        "Consumer finished"
    );

    Ok(())
}

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use config::{Config, InputFormat};
use log::info;
use tokio::sync::mpsc;

use payload_consumer::Consumer;
use payload_source::{Payload, PayloadSource};

mod payload_consumer;
mod payload_source;

#[derive(Parser)]
#[command(
    name = "greeting-dump",
    version,
    about = "Decode captured MySQL server greeting packets"
)]
struct Cli {
    /// File holding the captured payloads.
    input: PathBuf,
    #[arg(long, value_enum, default_value_t = InputFormat::Hex)]
    format: InputFormat,
    /// Re-encode each greeting and compare it with the captured bytes.
    #[arg(long)]
    verify: bool,
    /// Payloads still carry the 4-byte MySQL packet header.
    #[arg(long)]
    strip_header: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let mut conf = Config::new(cli.input);
    conf.format = cli.format;
    conf.verify_round_trip = cli.verify;
    conf.strip_header = cli.strip_header;

    let (payload_tx, payload_rx) = mpsc::unbounded_channel::<Payload>();
    let mut consumer = Consumer::new(conf.clone(), payload_rx);
    let consumer_task = tokio::spawn(async move { consumer.run().await });

    let sent = PayloadSource::new(conf, payload_tx).run().await?;
    let summary = consumer_task.await?;
    info!("{} payloads read", sent);

    println!(
        "decoded: {}, failed: {}, mismatched: {}",
        summary.decoded, summary.failed, summary.mismatched
    );
    if summary.failed > 0 || summary.mismatched > 0 {
        return Err("some payloads are not valid greetings".into());
    }
    Ok(())
}

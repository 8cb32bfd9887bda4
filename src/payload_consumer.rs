use config::Config;
use log::{info, warn};
use packets::HandshakeV10Packet;
use tokio::sync::mpsc;

use crate::payload_source::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Decoded,
    Failed,
    /// Decoded, but re-encoding did not reproduce the captured bytes.
    Mismatched,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub decoded: usize,
    pub failed: usize,
    pub mismatched: usize,
}

impl Summary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Decoded => self.decoded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Mismatched => self.mismatched += 1,
        }
    }
}

pub struct Consumer {
    config: Config,
    payload_rx: mpsc::UnboundedReceiver<Payload>,
}

impl Consumer {
    pub fn new(config: Config, payload_rx: mpsc::UnboundedReceiver<Payload>) -> Consumer {
        Consumer { config, payload_rx }
    }

    /// Runs until the source side closes the channel.
    pub async fn run(&mut self) -> Summary {
        let mut summary = Summary::default();
        while let Some(payload) = self.payload_rx.recv().await {
            summary.record(inspect(&payload, self.config.verify_round_trip));
        }
        summary
    }
}

pub fn inspect(payload: &Payload, verify_round_trip: bool) -> Outcome {
    let greeting = match HandshakeV10Packet::decode(&payload.bytes) {
        Ok(greeting) => greeting,
        Err(e) => {
            warn!("line {}: {}", payload.line, e);
            return Outcome::Failed;
        }
    };
    info!(
        "line {}: server {}, plugin {:?}, {:?}",
        payload.line,
        greeting.server_version_lossy(),
        greeting.auth_plugin_name_lossy(),
        greeting
    );

    if !verify_round_trip {
        return Outcome::Decoded;
    }
    match greeting.encode() {
        Ok(bytes) if bytes == payload.bytes => Outcome::Decoded,
        Ok(bytes) => {
            warn!(
                "line {}: re-encoded greeting differs, {} bytes captured, {} bytes encoded",
                payload.line,
                payload.bytes.len(),
                bytes.len()
            );
            Outcome::Mismatched
        }
        Err(e) => {
            warn!("line {}: {}", payload.line, e);
            Outcome::Mismatched
        }
    }
}

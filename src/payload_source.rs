use config::{Config, InputFormat};
use log::{debug, error};
use thiserror::Error;
use tokio::sync::mpsc;

/// 3-byte payload length plus sequence id.
pub const PACKET_HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: invalid hex payload")]
    InvalidHex { line: usize },
}

/// One captured greeting. `line` is 1-based for hex input and 0 for raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub line: usize,
    pub bytes: Vec<u8>,
}

pub struct PayloadSource {
    config: Config,
    payload_tx: mpsc::UnboundedSender<Payload>,
}

impl PayloadSource {
    pub fn new(config: Config, payload_tx: mpsc::UnboundedSender<Payload>) -> PayloadSource {
        PayloadSource { config, payload_tx }
    }

    /// Reads the input file and hands every payload to the consumer.
    /// Consumes the source so the channel closes once the file is drained.
    pub async fn run(self) -> Result<usize, PayloadError> {
        let conf = &self.config;
        let contents = tokio::fs::read(&conf.input)
            .await
            .map_err(|source| PayloadError::Io {
                path: conf.input.display().to_string(),
                source,
            })?;

        let mut sent = 0;
        for mut payload in split_payloads(&contents, conf.format)? {
            if conf.strip_header {
                payload.bytes = strip_packet_header(&payload.bytes).to_vec();
            }
            let len = payload.bytes.len();
            match self.payload_tx.send(payload) {
                Ok(_) => {
                    debug!("Send payload to consumer, payload len: {}", len);
                    sent += 1;
                }
                Err(e) => {
                    error!("Error happened: {}", e);
                    break;
                }
            }
        }
        Ok(sent)
    }
}

pub fn split_payloads(contents: &[u8], format: InputFormat) -> Result<Vec<Payload>, PayloadError> {
    match format {
        InputFormat::Raw => Ok(vec![Payload {
            line: 0,
            bytes: contents.to_vec(),
        }]),
        InputFormat::Hex => {
            let text = String::from_utf8_lossy(contents);
            let mut payloads = Vec::new();
            for (index, line) in text.lines().enumerate() {
                let line_no = index + 1;
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let bytes = parse_hex(line).ok_or(PayloadError::InvalidHex { line: line_no })?;
                payloads.push(Payload {
                    line: line_no,
                    bytes,
                });
            }
            Ok(payloads)
        }
    }
}

/// Parses hex digits, ignoring any whitespace between them.
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|c| !c.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}

/// Anything shorter than a header strips to nothing and is left for the
/// decoder to reject.
pub fn strip_packet_header(bytes: &[u8]) -> &[u8] {
    &bytes[PACKET_HEADER_LEN.min(bytes.len())..]
}

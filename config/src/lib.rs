use std::path::PathBuf;

use clap::ValueEnum;

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub format: InputFormat,
    /// Re-encode every decoded greeting and compare it with the capture.
    pub verify_round_trip: bool,
    /// Drop the 4-byte packet header (3-byte length, sequence id) first.
    pub strip_header: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum InputFormat {
    /// One hex-encoded payload per line; blank lines and `#` comments are skipped.
    #[default]
    Hex,
    /// The whole file is a single binary payload.
    Raw,
}

impl Config {
    pub fn new(input: PathBuf) -> Config {
        Config {
            input,
            format: InputFormat::default(),
            verify_round_trip: false,
            strip_header: false,
        }
    }
}

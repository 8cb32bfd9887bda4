pub mod mysql;

pub use mysql::server::greeting::{CapabilityFlags, HandshakeError, HandshakeV10Packet};

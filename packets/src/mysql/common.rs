//! Constants shared by the MySQL connection-phase packets.

pub const HANDSHAKE_V10: u8 = 10;

pub const CLIENT_SESSION_TRACK: u32 = 0x0080_0000;

/// The bit the V10 greeting layout branches on: when set, the packet
/// carries the auth-plugin-data length byte, auth-plugin-data part 2 and
/// the auth plugin name. The layout branches on `0x800000`, the
/// `CLIENT_SESSION_TRACK` bit.
pub const PLUGIN_AUTH_GATE: u32 = CLIENT_SESSION_TRACK;

pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;

// V10 greeting layout.
pub const MIN_HANDSHAKE_LEN: usize = 4;
pub const AUTH_PLUGIN_DATA_PART_1_LEN: usize = 8;
pub const RESERVED_LEN: usize = 10;
/// Shortest auth-plugin-data for which the encoder writes the length byte
/// and part 2.
pub const AUTH_PLUGIN_DATA_LEN_THRESHOLD: usize = 21;

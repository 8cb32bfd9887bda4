//! Server greeting (`Protocol::HandshakeV10`), the first packet a MySQL
//! server sends on a new connection.
//!
//! Wire layout after the packet header:
//!
//! ```text
//! 1        protocol version
//! string   server version, 0x00 terminated
//! 4        connection id
//! 8        auth-plugin-data part 1
//! 1        filler
//! 2        capability flags, lower half
//! 1        character set
//! 2        status flags
//! 2        capability flags, upper half
//! 1        auth-plugin-data length   (or 0x00 when the gate bit is clear)
//! 10       reserved
//! n        auth-plugin-data part 2   (gate bit only)
//! string   auth plugin name, 0x00 terminated
//! ```

use std::borrow::Cow;

use bytes::{Buf, BufMut, BytesMut};
use pnet_macros_support::packet::PrimitiveValues;
use thiserror::Error;

use crate::mysql::common::{
    AUTH_PLUGIN_DATA_LEN_THRESHOLD, AUTH_PLUGIN_DATA_PART_1_LEN, MIN_HANDSHAKE_LEN,
    PLUGIN_AUTH_GATE, RESERVED_LEN,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("handshake packet too short for {field}: need {needed} bytes, have {available}")]
    TooShort {
        field: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("malformed handshake packet: missing null terminator for {field}")]
    MissingTerminator { field: &'static str },
    #[error("auth plugin data too short: {len} bytes, need at least 8")]
    AuthDataTooShort { len: usize },
}

/// 32-bit capability word. On the wire it travels as two little-endian
/// halves separated by the character set and status flags.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Hash)]
pub struct CapabilityFlags(pub u32);

impl CapabilityFlags {
    pub fn from_halves(lower: u16, upper: u16) -> CapabilityFlags {
        CapabilityFlags(u32::from(lower) | (u32::from(upper) << 16))
    }

    pub fn lower(&self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    pub fn upper(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn has_plugin_auth(&self) -> bool {
        self.contains(PLUGIN_AUTH_GATE)
    }
}

impl From<u32> for CapabilityFlags {
    fn from(v: u32) -> Self {
        CapabilityFlags(v)
    }
}

impl PrimitiveValues for CapabilityFlags {
    type T = (u16, u16);
    fn to_primitive_values(&self) -> (u16, u16) {
        (self.lower(), self.upper())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeV10Packet {
    pub protocol_version: u8,
    /// Raw bytes as sent, terminator excluded.
    pub server_version: Vec<u8>,
    pub connection_id: u32,
    /// Part 1 and part 2 joined; at least 8 bytes in a well-formed packet.
    pub auth_plugin_data: Vec<u8>,
    pub capability_flags: CapabilityFlags,
    pub character_set: u8,
    pub status_flags: u16,
    /// Raw bytes as sent; empty when the gate bit is clear.
    pub auth_plugin_name: Vec<u8>,
}

impl HandshakeV10Packet {
    pub fn decode(payload: &[u8]) -> Result<Self, HandshakeError> {
        decode(payload)
    }

    pub fn encode(&self) -> Result<Vec<u8>, HandshakeError> {
        encode(self)
    }

    pub fn has_plugin_auth(&self) -> bool {
        self.capability_flags.has_plugin_auth()
    }

    pub fn server_version_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.server_version)
    }

    pub fn auth_plugin_name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.auth_plugin_name)
    }
}

fn ensure(buf: &[u8], needed: usize, field: &'static str) -> Result<(), HandshakeError> {
    if buf.remaining() < needed {
        return Err(HandshakeError::TooShort {
            field,
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

/// Reads up to the next 0x00 and consumes the terminator.
fn read_null_string(buf: &mut &[u8], field: &'static str) -> Result<Vec<u8>, HandshakeError> {
    let end = buf
        .iter()
        .position(|&c| c == 0)
        .ok_or(HandshakeError::MissingTerminator { field })?;
    let value = buf[..end].to_vec();
    buf.advance(end + 1);
    Ok(value)
}

/// Decodes a greeting payload (packet header already stripped).
pub fn decode(payload: &[u8]) -> Result<HandshakeV10Packet, HandshakeError> {
    ensure(payload, MIN_HANDSHAKE_LEN, "packet")?;
    let mut reader = payload;

    let protocol_version = reader.get_u8();
    let server_version = read_null_string(&mut reader, "server_version")?;

    ensure(reader, 4, "connection_id")?;
    let connection_id = reader.get_u32_le();

    ensure(reader, AUTH_PLUGIN_DATA_PART_1_LEN + 1, "auth_plugin_data")?;
    let mut auth_plugin_data = reader[..AUTH_PLUGIN_DATA_PART_1_LEN].to_vec();
    reader.advance(AUTH_PLUGIN_DATA_PART_1_LEN + 1);

    // lower flags (2), charset (1), status (2), upper flags (2)
    ensure(reader, 7, "flags")?;
    let capability_flags_lower = reader.get_u16_le();
    let character_set = reader.get_u8();
    let status_flags = reader.get_u16_le();
    let capability_flags_upper = reader.get_u16_le();
    let capability_flags =
        CapabilityFlags::from_halves(capability_flags_lower, capability_flags_upper);

    if capability_flags.has_plugin_auth() {
        ensure(reader, 1 + RESERVED_LEN, "auth_plugin_data_len")?;
        let auth_plugin_data_len = usize::from(reader.get_u8());
        reader.advance(RESERVED_LEN);

        if auth_plugin_data_len > AUTH_PLUGIN_DATA_PART_1_LEN {
            // Declared length is trusted only as far as the buffer goes.
            let part_2_len =
                (auth_plugin_data_len - AUTH_PLUGIN_DATA_PART_1_LEN).min(reader.remaining());
            auth_plugin_data.extend_from_slice(&reader[..part_2_len]);
            reader.advance(part_2_len);
        }
    } else {
        ensure(reader, RESERVED_LEN, "reserved")?;
        reader.advance(RESERVED_LEN);
    }

    ensure(reader, 1, "auth_plugin_name")?;
    let auth_plugin_name = read_null_string(&mut reader, "auth_plugin_name")?;

    Ok(HandshakeV10Packet {
        protocol_version,
        server_version,
        connection_id,
        auth_plugin_data,
        capability_flags,
        character_set,
        status_flags,
        auth_plugin_name,
    })
}

/// Encodes a greeting payload, without the packet header.
///
/// The length byte and auth-plugin-data part 2 are written only when the
/// gate bit is set and there are at least 21 bytes of auth data, while the
/// plugin name follows the gate bit alone. A gated packet with 9..=20 bytes
/// of auth data therefore loses everything past byte 8.
pub fn encode(packet: &HandshakeV10Packet) -> Result<Vec<u8>, HandshakeError> {
    let auth_plugin_data = &packet.auth_plugin_data;
    if auth_plugin_data.len() < AUTH_PLUGIN_DATA_PART_1_LEN {
        return Err(HandshakeError::AuthDataTooShort {
            len: auth_plugin_data.len(),
        });
    }

    let mut writer = BytesMut::with_capacity(
        packet.server_version.len() + auth_plugin_data.len() + packet.auth_plugin_name.len() + 34,
    );

    writer.put_u8(packet.protocol_version);
    writer.put_slice(&packet.server_version);
    writer.put_u8(0);
    writer.put_u32_le(packet.connection_id);

    writer.put_slice(&auth_plugin_data[..AUTH_PLUGIN_DATA_PART_1_LEN]);
    writer.put_u8(0); // filler

    let (capability_flags_lower, capability_flags_upper) =
        packet.capability_flags.to_primitive_values();
    writer.put_u16_le(capability_flags_lower);
    writer.put_u8(packet.character_set);
    writer.put_u16_le(packet.status_flags);
    writer.put_u16_le(capability_flags_upper);

    let plugin_auth = packet.has_plugin_auth();
    let with_part_2 = plugin_auth && auth_plugin_data.len() >= AUTH_PLUGIN_DATA_LEN_THRESHOLD;

    if with_part_2 {
        // single length byte; longer data wraps
        writer.put_u8(auth_plugin_data.len() as u8);
    } else {
        writer.put_u8(0);
    }
    writer.put_bytes(0, RESERVED_LEN);

    if with_part_2 {
        writer.put_slice(&auth_plugin_data[AUTH_PLUGIN_DATA_PART_1_LEN..]);
    }
    if plugin_auth {
        writer.put_slice(&packet.auth_plugin_name);
        writer.put_u8(0);
    }

    Ok(writer.to_vec())
}

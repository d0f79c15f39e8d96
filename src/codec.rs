// SMPP v3.4 Codec - wire-level primitives shared by every PDU body
//
// This module owns the 16 byte header, the field helpers used by the body
// codecs in `crate::pdu`, the error type produced while decoding, and the
// per-session sequence number generator.

use crate::datatypes::{CommandId, CommandStatus, FixedString};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// Any `command_length` at or above this value is treated as nonsense
const LENGTH_CEILING: u32 = i32::MAX as u32;

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer with validation.
    ///
    /// `command_length` is checked against the bytes actually available, so
    /// callers can trim the cursor to exactly one frame afterwards.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let available = buf.remaining();
        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        if command_length < Self::SIZE as u32
            || command_length >= LENGTH_CEILING
            || command_length as usize > available
        {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: available.min(LENGTH_CEILING as usize) as u32,
            });
        }

        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::InvalidCommandId(command_id_raw))?;

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode PDU header to buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(u32::from(self.command_id));
        buf.put_u32(u32::from(self.command_status));
        buf.put_u32(self.sequence_number);
    }

    /// Best-effort read of `(command_id, sequence_number)` from a frame that
    /// failed to decode. Missing bytes read as zero.
    pub fn salvage(data: &[u8]) -> (u32, u32) {
        let word = |offset: usize| {
            data.get(offset..offset + 4)
                .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                .unwrap_or(0)
        };
        (word(4), word(12))
    }
}

/// Trait for PDU bodies that can be encoded to bytes
pub trait Encodable {
    /// Encode the mandatory fields of this body to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Calculate the encoded size without keeping the encoded bytes
    fn encoded_size(&self) -> usize {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).map(|_| buf.len()).unwrap_or(0)
    }
}

/// Trait for PDU bodies that can be decoded from the bytes after the header
pub trait Decodable: Sized {
    /// Decode the mandatory fields, leaving the TLV tail in `buf`
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid command_id: {0:#x}")]
    InvalidCommandId(u32),

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Field '{field}' has no NULL terminator within {max_len} octets")]
    MissingTerminator { field: &'static str, max_len: usize },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("Unknown destination flag {0} in submit_multi")]
    InvalidDestinationFlag(u8),

    #[error("{0} cannot be encoded as a PDU")]
    Unencodable(CommandId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert codec errors to appropriate SMPP command_status codes
impl CodecError {
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::Incomplete | CodecError::InvalidPduLength { .. } => {
                CommandStatus::InvalidCommandLength
            }
            CodecError::InvalidCommandId(_) => CommandStatus::InvalidCommandId,
            CodecError::MissingTerminator { field, .. }
            | CodecError::FieldValidation { field, .. } => match *field {
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "destination_addr" => CommandStatus::InvalidDestinationAddress,
                "short_message" | "sm_length" => CommandStatus::InvalidMsgLength,
                "system_id" => CommandStatus::InvalidSystemId,
                "password" => CommandStatus::InvalidPassword,
                "service_type" => CommandStatus::InvalidServiceType,
                "message_id" => CommandStatus::InvalidMessageId,
                "schedule_delivery_time" => CommandStatus::InvalidScheduledDeliveryTime,
                "validity_period" => CommandStatus::InvalidExpiryTime,
                "tlv" => CommandStatus::InvalidOptionalParameterValue,
                _ => CommandStatus::SystemError,
            },
            CodecError::InvalidDestinationFlag(_) => CommandStatus::InvalidDestinationFlag,
            CodecError::Unencodable(_) | CodecError::Io(_) => CommandStatus::SystemError,
        }
    }
}

/// Decode a C-octet string of at most `N` bytes on the wire (terminator included).
///
/// The cursor ends up just past the terminator.
pub fn decode_cstring<const N: usize>(
    buf: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<FixedString<N>, CodecError> {
    let window = buf.chunk();
    let scan = window.len().min(N);

    let Some(end) = window[..scan].iter().position(|&b| b == 0) else {
        return Err(if window.len() < N {
            CodecError::Incomplete
        } else {
            CodecError::MissingTerminator { field, max_len: N }
        });
    };

    let value = FixedString::new(&window[..end]).map_err(|e| CodecError::FieldValidation {
        field,
        reason: e.to_string(),
    })?;
    buf.advance(end + 1);
    Ok(value)
}

/// Decode `len` raw octets
pub fn decode_octets(buf: &mut Cursor<&[u8]>, len: usize) -> Result<Bytes, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.copy_to_bytes(len))
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

/// Decode a 32-bit big-endian integer
pub fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u32())
}

/// Peek at next 4 bytes without advancing cursor (for command_length)
pub fn peek_u32(buf: &Cursor<&[u8]>) -> Option<u32> {
    let chunk = buf.chunk();
    chunk
        .get(..4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Encode a C-octet string: content followed by one NULL
pub fn encode_cstring<const N: usize>(buf: &mut BytesMut, value: &FixedString<N>) {
    buf.put_slice(value.as_str_bytes());
    buf.put_u8(0);
}

/// Hands out session-scoped sequence numbers.
///
/// Values increase by one, wrap from `u32::MAX` back to 1 and never yield 0.
#[derive(Debug)]
pub struct SequenceGenerator {
    last: AtomicU32,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// A generator whose first value is the successor of `last`
    pub fn starting_after(last: u32) -> Self {
        Self {
            last: AtomicU32::new(last),
        }
    }

    pub fn next(&self) -> u32 {
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(Self::successor(last))
            })
            .unwrap_or_else(|last| last);
        Self::successor(previous)
    }

    /// The value most recently handed out, 0 if none yet
    pub fn current(&self) -> u32 {
        self.last.load(Ordering::Acquire)
    }

    fn successor(value: u32) -> u32 {
        match value {
            u32::MAX => 1,
            n => n + 1,
        }
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::SystemId;

    fn header_bytes(length: u32, command_id: u32, status: u32, seq: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&length.to_be_bytes());
        data.extend_from_slice(&command_id.to_be_bytes());
        data.extend_from_slice(&status.to_be_bytes());
        data.extend_from_slice(&seq.to_be_bytes());
        data
    }

    #[test]
    fn pdu_header_encode_decode() {
        let header = PduHeader {
            command_length: 16,
            command_id: CommandId::EnquireLink,
            command_status: CommandStatus::Ok,
            sequence_number: 42,
        };

        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = PduHeader::decode(&mut cursor).unwrap();

        assert_eq!(header, decoded);
    }

    #[test]
    fn pdu_header_validation() {
        let data = header_bytes(8, 0x15, 0, 1);
        let result = PduHeader::decode(&mut Cursor::new(&data[..]));
        assert!(matches!(result, Err(CodecError::InvalidPduLength { length: 8, .. })));

        // Declares more than the buffer holds
        let data = header_bytes(32, 0x15, 0, 1);
        let result = PduHeader::decode(&mut Cursor::new(&data[..]));
        assert!(matches!(result, Err(CodecError::InvalidPduLength { length: 32, .. })));

        let data = header_bytes(0x7FFF_FFFF, 0x15, 0, 1);
        let result = PduHeader::decode(&mut Cursor::new(&data[..]));
        assert!(matches!(result, Err(CodecError::InvalidPduLength { .. })));

        let data = header_bytes(16, 0x0A, 0, 1);
        let result = PduHeader::decode(&mut Cursor::new(&data[..]));
        assert!(matches!(result, Err(CodecError::InvalidCommandId(0x0A))));
    }

    #[test]
    fn unknown_status_is_preserved() {
        let data = header_bytes(16, 0x8000_0015, 0x0000_0400, 7);
        let header = PduHeader::decode(&mut Cursor::new(&data[..])).unwrap();
        assert_eq!(header.command_status, CommandStatus::Other(0x400));
    }

    #[test]
    fn salvage_reads_what_is_there() {
        let data = header_bytes(99, 0x0000_0004, 0, 77);
        assert_eq!(PduHeader::salvage(&data), (4, 77));
        assert_eq!(PduHeader::salvage(&data[..6]), (0, 0));
    }

    #[test]
    fn decode_cstring_advances_past_terminator() {
        let data = b"hello\0rest";
        let mut cursor = Cursor::new(&data[..]);
        let result: SystemId = decode_cstring(&mut cursor, "system_id").unwrap();
        assert_eq!(result, "hello");
        assert_eq!(cursor.position(), 6);
    }

    #[test]
    fn decode_cstring_missing_terminator() {
        let data = [b'a'; 20];
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_cstring::<16>(&mut cursor, "system_id");
        assert!(matches!(
            result,
            Err(CodecError::MissingTerminator { max_len: 16, .. })
        ));

        let mut cursor = Cursor::new(&b"abc"[..]);
        let result = decode_cstring::<16>(&mut cursor, "system_id");
        assert!(matches!(result, Err(CodecError::Incomplete)));
    }

    #[test]
    fn encode_cstring_terminates() {
        let mut buf = BytesMut::new();
        encode_cstring(&mut buf, &"hello".parse::<SystemId>().unwrap());
        assert_eq!(buf.as_ref(), b"hello\0");
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            CodecError::InvalidCommandId(9).to_command_status(),
            CommandStatus::InvalidCommandId
        );
        assert_eq!(
            CodecError::Incomplete.to_command_status(),
            CommandStatus::InvalidCommandLength
        );
        let err = CodecError::FieldValidation {
            field: "short_message",
            reason: "too long".into(),
        };
        assert_eq!(err.to_command_status(), CommandStatus::InvalidMsgLength);
    }

    #[test]
    fn sequence_numbers_increase() {
        let generator = SequenceGenerator::new();
        assert_eq!(generator.next(), 1);
        assert_eq!(generator.next(), 2);
        assert_eq!(generator.current(), 2);
    }

    #[test]
    fn sequence_numbers_wrap_without_zero() {
        let generator = SequenceGenerator::starting_after(u32::MAX - 1);
        assert_eq!(generator.next(), u32::MAX);
        assert_eq!(generator.next(), 1);
        assert_eq!(generator.next(), 2);
    }
}

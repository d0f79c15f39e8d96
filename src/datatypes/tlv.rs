// ABOUTME: Optional parameter (TLV) table attached to every PDU
// ABOUTME: Keeps at most one value per tag and encodes entries as tag|length|value triples

use crate::codec::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use tracing::debug;

/// Well-known optional parameter tags
pub mod tags {
    pub const DEST_ADDR_SUBUNIT: u16 = 0x0005;
    pub const DEST_NETWORK_TYPE: u16 = 0x0006;
    pub const DEST_BEARER_TYPE: u16 = 0x0007;
    pub const DEST_TELEMATICS_ID: u16 = 0x0008;
    pub const SOURCE_ADDR_SUBUNIT: u16 = 0x000D;
    pub const SOURCE_NETWORK_TYPE: u16 = 0x000E;
    pub const SOURCE_BEARER_TYPE: u16 = 0x000F;
    pub const SOURCE_TELEMATICS_ID: u16 = 0x0010;
    pub const QOS_TIME_TO_LIVE: u16 = 0x0017;
    pub const PAYLOAD_TYPE: u16 = 0x0019;
    pub const ADDITIONAL_STATUS_INFO_TEXT: u16 = 0x001D;
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const MS_MSG_WAIT_FACILITIES: u16 = 0x0030;
    pub const PRIVACY_INDICATOR: u16 = 0x0201;
    pub const SOURCE_SUBADDRESS: u16 = 0x0202;
    pub const DEST_SUBADDRESS: u16 = 0x0203;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const USER_RESPONSE_CODE: u16 = 0x0205;
    pub const SOURCE_PORT: u16 = 0x020A;
    pub const DESTINATION_PORT: u16 = 0x020B;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const LANGUAGE_INDICATOR: u16 = 0x020D;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const CALLBACK_NUM_PRES_IND: u16 = 0x0302;
    pub const CALLBACK_NUM_ATAG: u16 = 0x0303;
    pub const NUMBER_OF_MESSAGES: u16 = 0x0304;
    pub const CALLBACK_NUM: u16 = 0x0381;
    pub const DPF_RESULT: u16 = 0x0420;
    pub const SET_DPF: u16 = 0x0421;
    pub const MS_AVAILABILITY_STATUS: u16 = 0x0422;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const DELIVERY_FAILURE_REASON: u16 = 0x0425;
    pub const MORE_MESSAGES_TO_SEND: u16 = 0x0426;
    pub const MESSAGE_STATE: u16 = 0x0427;
    pub const USSD_SERVICE_OP: u16 = 0x0501;
    pub const DISPLAY_TIME: u16 = 0x1201;
    pub const SMS_SIGNAL: u16 = 0x1203;
    pub const MS_VALIDITY: u16 = 0x1204;
    pub const ALERT_ON_MESSAGE_DELIVERY: u16 = 0x130C;
    pub const ITS_REPLY_TYPE: u16 = 0x1380;
    pub const ITS_SESSION_INFO: u16 = 0x1383;
}

/// Maximum size of a single TLV value (the length field is a u16)
pub const MAX_TLV_VALUE_LENGTH: usize = u16::MAX as usize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    /// Its length is written on the wire as a u16 in front of it.
    pub value: Bytes,
}

impl Tlv {
    /// Size of this entry on the wire, tag and length fields included
    pub fn encoded_size(&self) -> usize {
        4 + self.value.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.tag);
        buf.put_u16(self.value.len() as u16);
        buf.put_slice(&self.value);
    }
}

/// Optional parameter set of one PDU.
///
/// Entries keep insertion order for encoding. Wire order carries no meaning,
/// but a stable order keeps encoded output deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlvTable {
    entries: Vec<Tlv>,
}

impl TlvTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.entries.iter().any(|tlv| tlv.tag == tag)
    }

    /// Raw value for `tag`. `Some` of an empty buffer is a present, zero-length parameter.
    pub fn get(&self, tag: u16) -> Option<&Bytes> {
        self.entries
            .iter()
            .find(|tlv| tlv.tag == tag)
            .map(|tlv| &tlv.value)
    }

    /// Inserts or overwrites `tag` with `Some(value)`, removes it with `None`.
    pub fn set(&mut self, tag: u16, value: Option<Bytes>) -> Result<(), CodecError> {
        match value {
            Some(value) => {
                if value.len() > MAX_TLV_VALUE_LENGTH {
                    return Err(CodecError::FieldValidation {
                        field: "tlv",
                        reason: format!(
                            "tag {tag:#06x} value is {} bytes (max {MAX_TLV_VALUE_LENGTH})",
                            value.len()
                        ),
                    });
                }
                self.insert(tag, value);
            }
            None => {
                self.remove(tag);
            }
        }
        Ok(())
    }

    /// Removes `tag`, returning its previous value
    pub fn remove(&mut self, tag: u16) -> Option<Bytes> {
        let index = self.entries.iter().position(|tlv| tlv.tag == tag)?;
        Some(self.entries.remove(index).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tlv> {
        self.entries.iter()
    }

    pub fn get_u8(&self, tag: u16) -> Option<u8> {
        let value = self.get(tag)?;
        (value.len() == 1).then(|| value[0])
    }

    pub fn get_u16(&self, tag: u16) -> Option<u16> {
        let value = self.get(tag)?;
        (value.len() == 2).then(|| u16::from_be_bytes([value[0], value[1]]))
    }

    pub fn get_u32(&self, tag: u16) -> Option<u32> {
        let value = self.get(tag)?;
        (value.len() == 4).then(|| u32::from_be_bytes([value[0], value[1], value[2], value[3]]))
    }

    /// Reads a C-octet string value, tolerating a missing terminator
    pub fn get_cstring(&self, tag: u16) -> Option<String> {
        let value = self.get(tag)?;
        let end = value.iter().position(|&b| b == 0).unwrap_or(value.len());
        Some(String::from_utf8_lossy(&value[..end]).into_owned())
    }

    pub fn set_u8(&mut self, tag: u16, value: u8) {
        self.insert(tag, Bytes::copy_from_slice(&[value]));
    }

    pub fn set_u16(&mut self, tag: u16, value: u16) {
        self.insert(tag, Bytes::copy_from_slice(&value.to_be_bytes()));
    }

    pub fn set_u32(&mut self, tag: u16, value: u32) {
        self.insert(tag, Bytes::copy_from_slice(&value.to_be_bytes()));
    }

    /// Stores `value` followed by a NULL terminator
    pub fn set_cstring(&mut self, tag: u16, value: &str) -> Result<(), CodecError> {
        let mut buf = BytesMut::with_capacity(value.len() + 1);
        buf.put_slice(value.as_bytes());
        buf.put_u8(0);
        self.set(tag, Some(buf.freeze()))
    }

    /// Size of every entry on the wire
    pub fn encoded_size(&self) -> usize {
        self.entries.iter().map(Tlv::encoded_size).sum()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        for tlv in &self.entries {
            tlv.encode(buf);
        }
    }

    /// All entries as consecutive tag|length|value triples
    pub fn generate_encoded(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Consumes the rest of `buf` as optional parameters.
    ///
    /// Decoding stops without error when fewer than four bytes remain or a
    /// declared length runs past the end of the buffer. When a tag repeats,
    /// the first occurrence is kept.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Self {
        let mut table = TlvTable::new();

        while buf.remaining() >= 4 {
            let tag = buf.get_u16();
            let length = buf.get_u16() as usize;

            if buf.remaining() < length {
                debug!(
                    "TLV {:#06x} declares {} bytes but only {} remain, ignoring tail",
                    tag,
                    length,
                    buf.remaining()
                );
                buf.advance(buf.remaining());
                break;
            }

            let value = buf.copy_to_bytes(length);
            if table.contains(tag) {
                debug!("Duplicate TLV {:#06x} discarded", tag);
                continue;
            }
            table.entries.push(Tlv { tag, value });
        }

        if buf.has_remaining() {
            debug!("Discarding {} trailing bytes after TLVs", buf.remaining());
            buf.advance(buf.remaining());
        }

        table
    }

    fn insert(&mut self, tag: u16, value: Bytes) {
        match self.entries.iter_mut().find(|tlv| tlv.tag == tag) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Tlv { tag, value }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty_are_distinct() {
        let mut table = TlvTable::new();
        assert_eq!(table.get(tags::MESSAGE_PAYLOAD), None);

        table.set(tags::MESSAGE_PAYLOAD, Some(Bytes::new())).unwrap();
        assert_eq!(table.get(tags::MESSAGE_PAYLOAD), Some(&Bytes::new()));

        table.set(tags::MESSAGE_PAYLOAD, None).unwrap();
        assert_eq!(table.get(tags::MESSAGE_PAYLOAD), None);
    }

    #[test]
    fn set_overwrites_existing_tag() {
        let mut table = TlvTable::new();
        table.set_u16(tags::SAR_MSG_REF_NUM, 1);
        table.set_u16(tags::SAR_MSG_REF_NUM, 0x1234);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_u16(tags::SAR_MSG_REF_NUM), Some(0x1234));
    }

    #[test]
    fn typed_helpers_are_big_endian() {
        let mut table = TlvTable::new();
        table.set_u32(tags::QOS_TIME_TO_LIVE, 0x0102_0304);
        table.set_u8(tags::MESSAGE_STATE, 2);
        table.set_cstring(tags::RECEIPTED_MESSAGE_ID, "abc").unwrap();

        assert_eq!(
            table.get(tags::QOS_TIME_TO_LIVE).unwrap().as_ref(),
            &[1, 2, 3, 4]
        );
        assert_eq!(table.get_u8(tags::MESSAGE_STATE), Some(2));
        assert_eq!(table.get_cstring(tags::RECEIPTED_MESSAGE_ID).unwrap(), "abc");
        assert_eq!(table.get_u16(tags::MESSAGE_STATE), None);
    }

    #[test]
    fn generate_encoded_writes_triples() {
        let mut table = TlvTable::new();
        table.set_u8(tags::MORE_MESSAGES_TO_SEND, 1);
        table.set_u16(tags::DEST_ADDR_SUBUNIT, 0xABCD);

        let encoded = table.generate_encoded();
        assert_eq!(
            encoded.as_ref(),
            &[0x04, 0x26, 0x00, 0x01, 0x01, 0x00, 0x05, 0x00, 0x02, 0xAB, 0xCD]
        );
        assert_eq!(encoded.len(), table.encoded_size());
    }

    #[test]
    fn decode_keeps_first_duplicate() {
        let data: &[u8] = &[
            0x04, 0x27, 0x00, 0x01, 0x02, // message_state = 2
            0x04, 0x27, 0x00, 0x01, 0x05, // message_state = 5 (discarded)
        ];
        let mut cursor = Cursor::new(data);
        let table = TlvTable::decode(&mut cursor);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_u8(tags::MESSAGE_STATE), Some(2));
    }

    #[test]
    fn decode_stops_on_overrun() {
        let data: &[u8] = &[
            0x04, 0x26, 0x00, 0x01, 0x01, // more_messages_to_send = 1
            0x04, 0x24, 0x00, 0x10, 0xAA, 0xBB, // payload claims 16 bytes, has 2
        ];
        let mut cursor = Cursor::new(data);
        let table = TlvTable::decode(&mut cursor);
        assert_eq!(table.len(), 1);
        assert!(table.get(tags::MESSAGE_PAYLOAD).is_none());
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn oversized_value_rejected() {
        let mut table = TlvTable::new();
        let value = Bytes::from(vec![0u8; MAX_TLV_VALUE_LENGTH + 1]);
        assert!(table.set(tags::MESSAGE_PAYLOAD, Some(value)).is_err());
        assert!(table.is_empty());
    }
}

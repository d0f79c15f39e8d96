use crate::codec::{CodecError, Decodable, Encodable, decode_cstring, decode_u8, encode_cstring};
use crate::datatypes::{Address, MessageId, NumericPlanIndicator, SmppTime, TypeOfNumber};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// query_sm: asks the SMSC for the state of a previously submitted message
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySm {
    pub message_id: MessageId,
    /// Must match the source address of the original submission
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: Address,
}

impl Encodable for QuerySm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.message_id);
        buf.put_u8(self.source_addr_ton.into());
        buf.put_u8(self.source_addr_npi.into());
        encode_cstring(buf, &self.source_addr);
        Ok(())
    }
}

impl Decodable for QuerySm {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            message_id: decode_cstring(buf, "message_id")?,
            source_addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            source_addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            source_addr: decode_cstring(buf, "source_addr")?,
        })
    }
}

impl fmt::Display for QuerySm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "message_id={} source_addr={:?}/{:?}/{}",
            self.message_id, self.source_addr_ton, self.source_addr_npi, self.source_addr
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySmResp {
    pub message_id: MessageId,
    /// When the message reached its final state, NULL while still pending
    pub final_date: SmppTime,
    /// ENROUTE(1), DELIVERED(2), EXPIRED(3), DELETED(4), UNDELIVERABLE(5),
    /// ACCEPTED(6), UNKNOWN(7), REJECTED(8)
    pub message_state: u8,
    /// Network specific error code when delivery failed
    pub error_code: u8,
}

impl Encodable for QuerySmResp {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.message_id);
        encode_cstring(buf, &self.final_date);
        buf.put_u8(self.message_state);
        buf.put_u8(self.error_code);
        Ok(())
    }
}

impl Decodable for QuerySmResp {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            message_id: decode_cstring(buf, "message_id")?,
            final_date: decode_cstring(buf, "final_date")?,
            message_state: decode_u8(buf)?,
            error_code: decode_u8(buf)?,
        })
    }
}

impl fmt::Display for QuerySmResp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "message_id={} final_date={} message_state={} error_code={}",
            self.message_id, self.final_date, self.message_state, self.error_code
        )
    }
}

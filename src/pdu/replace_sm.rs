use super::submit_sm::{decode_short_message, encode_short_message};
use crate::codec::{CodecError, Decodable, Encodable, decode_cstring, decode_u8, encode_cstring};
use crate::datatypes::{
    Address, MessageId, NumericPlanIndicator, ShortMessage, SmppTime, TypeOfNumber,
};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// replace_sm: swaps the content of a message still held by the SMSC.
/// The response has no body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplaceSm {
    pub message_id: MessageId,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: Address,
    pub schedule_delivery_time: SmppTime,
    pub validity_period: SmppTime,
    pub registered_delivery: u8,
    pub sm_default_msg_id: u8,
    pub short_message: ShortMessage,
}

impl Encodable for ReplaceSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.message_id);
        buf.put_u8(self.source_addr_ton.into());
        buf.put_u8(self.source_addr_npi.into());
        encode_cstring(buf, &self.source_addr);
        encode_cstring(buf, &self.schedule_delivery_time);
        encode_cstring(buf, &self.validity_period);
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.sm_default_msg_id);
        encode_short_message(buf, &self.short_message);
        Ok(())
    }
}

impl Decodable for ReplaceSm {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            message_id: decode_cstring(buf, "message_id")?,
            source_addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            source_addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            source_addr: decode_cstring(buf, "source_addr")?,
            schedule_delivery_time: decode_cstring(buf, "schedule_delivery_time")?,
            validity_period: decode_cstring(buf, "validity_period")?,
            registered_delivery: decode_u8(buf)?,
            sm_default_msg_id: decode_u8(buf)?,
            short_message: decode_short_message(buf)?,
        })
    }
}

impl fmt::Display for ReplaceSm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "message_id={} source_addr={:?}/{:?}/{} schedule_delivery_time={} validity_period={} registered_delivery={} sm_default_msg_id={} sm_length={} short_message={}",
            self.message_id,
            self.source_addr_ton,
            self.source_addr_npi,
            self.source_addr,
            self.schedule_delivery_time,
            self.validity_period,
            self.registered_delivery,
            self.sm_default_msg_id,
            self.short_message.len(),
            self.short_message
        )
    }
}

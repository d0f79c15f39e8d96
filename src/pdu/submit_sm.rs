use crate::codec::{
    CodecError, Decodable, Encodable, decode_cstring, decode_octets, decode_u8, encode_cstring,
};
use crate::datatypes::{
    Address, DataCoding, EsmClass, MessageId, NumericPlanIndicator, PriorityFlag, ServiceType,
    ShortMessage, SmppTime, TypeOfNumber,
};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Mandatory fields of submit_sm.
///
/// deliver_sm uses the identical layout, so the same struct backs both
/// `Body::SubmitSm` and `Body::DeliverSm`. For deliver_sm the scheduling and
/// validity fields are NULL and `esm_class` may flag a delivery receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitSm {
    /// SMS application service associated with the message, NULL for default
    pub service_type: ServiceType,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: Address,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: Address,
    /// Message mode, message type and UDHI/reply path flags
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    pub priority_flag: PriorityFlag,
    /// NULL for immediate delivery
    pub schedule_delivery_time: SmppTime,
    /// NULL for the SMSC default validity period
    pub validity_period: SmppTime,
    /// Bits 1-0 request an SMSC delivery receipt
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: DataCoding,
    pub sm_default_msg_id: u8,
    /// User data, written behind its `sm_length` octet. Empty when the
    /// payload travels in the `message_payload` TLV instead.
    pub short_message: ShortMessage,
}

pub type DeliverSm = SubmitSm;

impl SubmitSm {
    /// A submit_sm with default flags addressed from `source_addr` to `destination_addr`
    pub fn new(source_addr: Address, destination_addr: Address, short_message: ShortMessage) -> Self {
        Self {
            source_addr,
            destination_addr,
            short_message,
            ..Default::default()
        }
    }
}

impl Encodable for SubmitSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.service_type);
        buf.put_u8(self.source_addr_ton.into());
        buf.put_u8(self.source_addr_npi.into());
        encode_cstring(buf, &self.source_addr);
        buf.put_u8(self.dest_addr_ton.into());
        buf.put_u8(self.dest_addr_npi.into());
        encode_cstring(buf, &self.destination_addr);
        buf.put_u8(self.esm_class.into());
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.priority_flag.into());
        encode_cstring(buf, &self.schedule_delivery_time);
        encode_cstring(buf, &self.validity_period);
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.replace_if_present_flag);
        buf.put_u8(self.data_coding.into());
        buf.put_u8(self.sm_default_msg_id);
        encode_short_message(buf, &self.short_message);
        Ok(())
    }
}

impl Decodable for SubmitSm {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            service_type: decode_cstring(buf, "service_type")?,
            source_addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            source_addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            source_addr: decode_cstring(buf, "source_addr")?,
            dest_addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            dest_addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            destination_addr: decode_cstring(buf, "destination_addr")?,
            esm_class: EsmClass::from(decode_u8(buf)?),
            protocol_id: decode_u8(buf)?,
            priority_flag: PriorityFlag::from(decode_u8(buf)?),
            schedule_delivery_time: decode_cstring(buf, "schedule_delivery_time")?,
            validity_period: decode_cstring(buf, "validity_period")?,
            registered_delivery: decode_u8(buf)?,
            replace_if_present_flag: decode_u8(buf)?,
            data_coding: DataCoding::from(decode_u8(buf)?),
            sm_default_msg_id: decode_u8(buf)?,
            short_message: decode_short_message(buf)?,
        })
    }
}

impl fmt::Display for SubmitSm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service_type={} source_addr={:?}/{:?}/{} destination_addr={:?}/{:?}/{} esm_class={} protocol_id={} priority_flag={:?} schedule_delivery_time={} validity_period={} registered_delivery={} replace_if_present_flag={} data_coding={} sm_default_msg_id={} sm_length={} short_message={}",
            self.service_type,
            self.source_addr_ton,
            self.source_addr_npi,
            self.source_addr,
            self.dest_addr_ton,
            self.dest_addr_npi,
            self.destination_addr,
            self.esm_class,
            self.protocol_id,
            self.priority_flag,
            self.schedule_delivery_time,
            self.validity_period,
            self.registered_delivery,
            self.replace_if_present_flag,
            self.data_coding,
            self.sm_default_msg_id,
            self.short_message.len(),
            self.short_message
        )
    }
}

/// Body of submit_sm_resp, deliver_sm_resp and data_sm_resp
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageIdResp {
    /// SMSC assigned identifier; NULL in deliver_sm_resp
    pub message_id: MessageId,
}

impl Encodable for MessageIdResp {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.message_id);
        Ok(())
    }
}

impl Decodable for MessageIdResp {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            message_id: decode_cstring(buf, "message_id")?,
        })
    }
}

impl fmt::Display for MessageIdResp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message_id={}", self.message_id)
    }
}

/// Writes `sm_length` followed by the octets; no terminator
pub(crate) fn encode_short_message(buf: &mut BytesMut, message: &ShortMessage) {
    buf.put_u8(message.len());
    buf.put_slice(message.as_bytes());
}

pub(crate) fn decode_short_message(buf: &mut Cursor<&[u8]>) -> Result<ShortMessage, CodecError> {
    let sm_length = decode_u8(buf)? as usize;
    let data = decode_octets(buf, sm_length)?;
    ShortMessage::new(data).map_err(|e| CodecError::FieldValidation {
        field: "short_message",
        reason: e.to_string(),
    })
}

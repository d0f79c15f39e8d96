use crate::codec::{CodecError, Decodable, Encodable, decode_cstring, decode_u8, encode_cstring};
use crate::datatypes::{Address, MessageId, NumericPlanIndicator, ServiceType, TypeOfNumber};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// cancel_sm: cancels one message by id, or every pending message matching
/// the addresses and service_type when `message_id` is NULL
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CancelSm {
    pub service_type: ServiceType,
    pub message_id: MessageId,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: Address,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: Address,
}

impl Encodable for CancelSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.service_type);
        encode_cstring(buf, &self.message_id);
        buf.put_u8(self.source_addr_ton.into());
        buf.put_u8(self.source_addr_npi.into());
        encode_cstring(buf, &self.source_addr);
        buf.put_u8(self.dest_addr_ton.into());
        buf.put_u8(self.dest_addr_npi.into());
        encode_cstring(buf, &self.destination_addr);
        Ok(())
    }
}

impl Decodable for CancelSm {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            service_type: decode_cstring(buf, "service_type")?,
            message_id: decode_cstring(buf, "message_id")?,
            source_addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            source_addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            source_addr: decode_cstring(buf, "source_addr")?,
            dest_addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            dest_addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            destination_addr: decode_cstring(buf, "destination_addr")?,
        })
    }
}

impl fmt::Display for CancelSm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service_type={} message_id={} source_addr={:?}/{:?}/{} destination_addr={:?}/{:?}/{}",
            self.service_type,
            self.message_id,
            self.source_addr_ton,
            self.source_addr_npi,
            self.source_addr,
            self.dest_addr_ton,
            self.dest_addr_npi,
            self.destination_addr
        )
    }
}

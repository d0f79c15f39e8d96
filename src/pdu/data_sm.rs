use crate::codec::{CodecError, Decodable, Encodable, decode_cstring, decode_u8, encode_cstring};
use crate::datatypes::{
    DataCoding, EsmClass, LongAddress, NumericPlanIndicator, ServiceType, TypeOfNumber,
};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Mandatory fields of data_sm.
///
/// data_sm has no short_message slot; user data always travels in the
/// `message_payload` TLV. Addresses use the wider 65 octet slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataSm {
    pub service_type: ServiceType,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: LongAddress,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: LongAddress,
    pub esm_class: EsmClass,
    pub registered_delivery: u8,
    pub data_coding: DataCoding,
}

impl Encodable for DataSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.service_type);
        buf.put_u8(self.source_addr_ton.into());
        buf.put_u8(self.source_addr_npi.into());
        encode_cstring(buf, &self.source_addr);
        buf.put_u8(self.dest_addr_ton.into());
        buf.put_u8(self.dest_addr_npi.into());
        encode_cstring(buf, &self.destination_addr);
        buf.put_u8(self.esm_class.into());
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.data_coding.into());
        Ok(())
    }
}

impl Decodable for DataSm {
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
            registered_delivery: decode_u8(buf)?,
            data_coding: DataCoding::from(decode_u8(buf)?),
        })
    }
}

impl fmt::Display for DataSm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service_type={} source_addr={:?}/{:?}/{} destination_addr={:?}/{:?}/{} esm_class={} registered_delivery={} data_coding={}",
            self.service_type,
            self.source_addr_ton,
            self.source_addr_npi,
            self.source_addr,
            self.dest_addr_ton,
            self.dest_addr_npi,
            self.destination_addr,
            self.esm_class,
            self.registered_delivery,
            self.data_coding
        )
    }
}

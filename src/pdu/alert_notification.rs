use crate::codec::{CodecError, Decodable, Encodable, decode_cstring, decode_u8, encode_cstring};
use crate::datatypes::{LongAddress, NumericPlanIndicator, TypeOfNumber};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// alert_notification: the SMSC reports that a mobile subscriber has become
/// available. No response is defined; `ms_availability_status` may follow as a TLV.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertNotification {
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: LongAddress,
    pub esme_addr_ton: TypeOfNumber,
    pub esme_addr_npi: NumericPlanIndicator,
    pub esme_addr: LongAddress,
}

impl Encodable for AlertNotification {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(self.source_addr_ton.into());
        buf.put_u8(self.source_addr_npi.into());
        encode_cstring(buf, &self.source_addr);
        buf.put_u8(self.esme_addr_ton.into());
        buf.put_u8(self.esme_addr_npi.into());
        encode_cstring(buf, &self.esme_addr);
        Ok(())
    }
}

impl Decodable for AlertNotification {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            source_addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            source_addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            source_addr: decode_cstring(buf, "source_addr")?,
            esme_addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            esme_addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            esme_addr: decode_cstring(buf, "esme_addr")?,
        })
    }
}

impl fmt::Display for AlertNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source_addr={:?}/{:?}/{} esme_addr={:?}/{:?}/{}",
            self.source_addr_ton,
            self.source_addr_npi,
            self.source_addr,
            self.esme_addr_ton,
            self.esme_addr_npi,
            self.esme_addr
        )
    }
}

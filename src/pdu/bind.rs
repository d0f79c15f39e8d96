use crate::codec::{CodecError, Decodable, Encodable, decode_cstring, decode_u8, encode_cstring};
use crate::datatypes::{
    AddressRange, InterfaceVersion, NumericPlanIndicator, Password, SystemId, SystemType,
    TypeOfNumber,
};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Body shared by bind_transmitter, bind_receiver and bind_transceiver.
///
/// The three requests differ only in their command_id, which lives on the
/// enclosing `Body` variant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bind {
    /// Identifies the ESME requesting to bind
    pub system_id: SystemId,
    pub password: Password,
    /// Type of ESME system, NULL if not applicable
    pub system_type: SystemType,
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    /// Addresses this ESME serves, used by receivers and transceivers
    pub address_range: AddressRange,
}

impl Encodable for Bind {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id);
        encode_cstring(buf, &self.password);
        encode_cstring(buf, &self.system_type);
        buf.put_u8(self.interface_version.into());
        buf.put_u8(self.addr_ton.into());
        buf.put_u8(self.addr_npi.into());
        encode_cstring(buf, &self.address_range);
        Ok(())
    }
}

impl Decodable for Bind {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            system_id: decode_cstring(buf, "system_id")?,
            password: decode_cstring(buf, "password")?,
            system_type: decode_cstring(buf, "system_type")?,
            interface_version: InterfaceVersion::from(decode_u8(buf)?),
            addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            address_range: decode_cstring(buf, "address_range")?,
        })
    }
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "system_id={} password=<{} octets> system_type={} interface_version={:?} addr_ton={:?} addr_npi={:?} address_range={}",
            self.system_id,
            self.password.len(),
            self.system_type,
            self.interface_version,
            self.addr_ton,
            self.addr_npi,
            self.address_range
        )
    }
}

/// Body of every bind_*_resp. The SMSC may add `sc_interface_version` as a TLV.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindResp {
    /// Identifies the SMSC to the ESME
    pub system_id: SystemId,
}

impl Encodable for BindResp {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id);
        Ok(())
    }
}

impl Decodable for BindResp {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            system_id: decode_cstring(buf, "system_id")?,
        })
    }
}

impl fmt::Display for BindResp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system_id={}", self.system_id)
    }
}

/// outbind: the SMSC asks the ESME to bind as a receiver. It has no response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outbind {
    pub system_id: SystemId,
    pub password: Password,
}

impl Encodable for Outbind {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id);
        encode_cstring(buf, &self.password);
        Ok(())
    }
}

impl Decodable for Outbind {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            system_id: decode_cstring(buf, "system_id")?,
            password: decode_cstring(buf, "password")?,
        })
    }
}

impl fmt::Display for Outbind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "system_id={} password=<{} octets>",
            self.system_id,
            self.password.len()
        )
    }
}

use super::submit_sm::{decode_short_message, encode_short_message};
use crate::codec::{
    CodecError, Decodable, Encodable, decode_cstring, decode_u8, decode_u32, encode_cstring,
};
use crate::datatypes::{
    Address, CommandStatus, DataCoding, DistributionListName, EsmClass, MessageId,
    NumericPlanIndicator, PriorityFlag, ServiceType, ShortMessage, SmppTime, TypeOfNumber,
};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Most destinations one submit_multi may carry
pub const MAX_DESTINATIONS: usize = 254;

const SME_ADDRESS_FLAG: u8 = 1;
const DISTRIBUTION_LIST_FLAG: u8 = 2;

/// One entry of the submit_multi destination list, discriminated on the wire by `dest_flag`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    SmeAddress {
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
        address: Address,
    },
    DistributionList(DistributionListName),
}

impl Destination {
    fn encode(&self, buf: &mut BytesMut) {
        match self {
            Destination::SmeAddress { ton, npi, address } => {
                buf.put_u8(SME_ADDRESS_FLAG);
                buf.put_u8((*ton).into());
                buf.put_u8((*npi).into());
                encode_cstring(buf, address);
            }
            Destination::DistributionList(name) => {
                buf.put_u8(DISTRIBUTION_LIST_FLAG);
                encode_cstring(buf, name);
            }
        }
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        match decode_u8(buf)? {
            SME_ADDRESS_FLAG => Ok(Destination::SmeAddress {
                ton: TypeOfNumber::from(decode_u8(buf)?),
                npi: NumericPlanIndicator::from(decode_u8(buf)?),
                address: decode_cstring(buf, "destination_addr")?,
            }),
            DISTRIBUTION_LIST_FLAG => Ok(Destination::DistributionList(decode_cstring(
                buf, "dl_name",
            )?)),
            other => Err(CodecError::InvalidDestinationFlag(other)),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::SmeAddress { ton, npi, address } => {
                write!(f, "{ton:?}/{npi:?}/{address}")
            }
            Destination::DistributionList(name) => write!(f, "dl:{name}"),
        }
    }
}

/// submit_multi: one message to several SMEs and/or distribution lists
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitMulti {
    pub service_type: ServiceType,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: Address,
    /// Written behind a `number_of_dests` octet
    pub destinations: Vec<Destination>,
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    pub priority_flag: PriorityFlag,
    pub schedule_delivery_time: SmppTime,
    pub validity_period: SmppTime,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: DataCoding,
    pub sm_default_msg_id: u8,
    pub short_message: ShortMessage,
}

impl Encodable for SubmitMulti {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.destinations.len() > MAX_DESTINATIONS {
            return Err(CodecError::FieldValidation {
                field: "number_of_dests",
                reason: format!(
                    "{} destinations (max {MAX_DESTINATIONS})",
                    self.destinations.len()
                ),
            });
        }

        encode_cstring(buf, &self.service_type);
        buf.put_u8(self.source_addr_ton.into());
        buf.put_u8(self.source_addr_npi.into());
        encode_cstring(buf, &self.source_addr);
        buf.put_u8(self.destinations.len() as u8);
        for destination in &self.destinations {
            destination.encode(buf);
        }
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

impl Decodable for SubmitMulti {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let service_type = decode_cstring(buf, "service_type")?;
        let source_addr_ton = TypeOfNumber::from(decode_u8(buf)?);
        let source_addr_npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let source_addr = decode_cstring(buf, "source_addr")?;

        let number_of_dests = decode_u8(buf)? as usize;
        if number_of_dests > MAX_DESTINATIONS {
            return Err(CodecError::FieldValidation {
                field: "number_of_dests",
                reason: format!("{number_of_dests} destinations (max {MAX_DESTINATIONS})"),
            });
        }
        let destinations = (0..number_of_dests)
            .map(|_| Destination::decode(buf))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            service_type,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            destinations,
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

impl fmt::Display for SubmitMulti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service_type={} source_addr={:?}/{:?}/{} number_of_dests={} dests=[",
            self.service_type,
            self.source_addr_ton,
            self.source_addr_npi,
            self.source_addr,
            self.destinations.len()
        )?;
        for (i, destination) in self.destinations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{destination}")?;
        }
        write!(
            f,
            "] esm_class={} protocol_id={} priority_flag={:?} schedule_delivery_time={} validity_period={} registered_delivery={} replace_if_present_flag={} data_coding={} sm_default_msg_id={} sm_length={} short_message={}",
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

/// A destination the SMSC refused, reported in submit_multi_resp
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsuccessSme {
    pub ton: TypeOfNumber,
    pub npi: NumericPlanIndicator,
    pub address: Address,
    pub error_status: CommandStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitMultiResp {
    pub message_id: MessageId,
    pub unsuccess_smes: Vec<UnsuccessSme>,
}

impl Encodable for SubmitMultiResp {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.unsuccess_smes.len() > u8::MAX as usize {
            return Err(CodecError::FieldValidation {
                field: "no_unsuccess",
                reason: format!("{} entries (max 255)", self.unsuccess_smes.len()),
            });
        }

        encode_cstring(buf, &self.message_id);
        buf.put_u8(self.unsuccess_smes.len() as u8);
        for sme in &self.unsuccess_smes {
            buf.put_u8(sme.ton.into());
            buf.put_u8(sme.npi.into());
            encode_cstring(buf, &sme.address);
            buf.put_u32(sme.error_status.into());
        }
        Ok(())
    }
}

impl Decodable for SubmitMultiResp {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let message_id = decode_cstring(buf, "message_id")?;
        let no_unsuccess = decode_u8(buf)?;
        let unsuccess_smes = (0..no_unsuccess)
            .map(|_| {
                Ok(UnsuccessSme {
                    ton: TypeOfNumber::from(decode_u8(buf)?),
                    npi: NumericPlanIndicator::from(decode_u8(buf)?),
                    address: decode_cstring(buf, "destination_addr")?,
                    error_status: CommandStatus::from(decode_u32(buf)?),
                })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        Ok(Self {
            message_id,
            unsuccess_smes,
        })
    }
}

impl fmt::Display for SubmitMultiResp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "message_id={} no_unsuccess={}",
            self.message_id,
            self.unsuccess_smes.len()
        )?;
        for sme in &self.unsuccess_smes {
            write!(
                f,
                " [{:?}/{:?}/{} {:?}]",
                sme.ton, sme.npi, sme.address, sme.error_status
            )?;
        }
        Ok(())
    }
}

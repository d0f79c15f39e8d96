// Typed PDU model: one `Pdu` envelope around a `Body` sum type.
//
// The command_id is never stored; it follows from the `Body` variant, so a
// PDU cannot claim to be one command while carrying another's fields.

mod alert_notification;
mod bind;
mod cancel_sm;
mod data_sm;
mod query_sm;
mod replace_sm;
mod submit_multi;
mod submit_sm;

pub use alert_notification::AlertNotification;
pub use bind::{Bind, BindResp, Outbind};
pub use cancel_sm::CancelSm;
pub use data_sm::DataSm;
pub use query_sm::{QuerySm, QuerySmResp};
pub use replace_sm::ReplaceSm;
pub use submit_multi::{Destination, MAX_DESTINATIONS, SubmitMulti, SubmitMultiResp, UnsuccessSme};
pub use submit_sm::{DeliverSm, MessageIdResp, SubmitSm};

use crate::codec::{CodecError, Decodable, Encodable, MAX_PDU_SIZE, PduHeader};
use crate::datatypes::{CommandId, CommandStatus, MessageId, RESPONSE_BIT, TlvTable};
use bytes::{Buf, Bytes, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Command specific mandatory fields
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    BindTransmitter(Bind),
    BindTransmitterResp(BindResp),
    BindReceiver(Bind),
    BindReceiverResp(BindResp),
    BindTransceiver(Bind),
    BindTransceiverResp(BindResp),
    Outbind(Outbind),
    Unbind,
    UnbindResp,
    EnquireLink,
    EnquireLinkResp,
    GenericNack,
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(MessageIdResp),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(MessageIdResp),
    DataSm(Box<DataSm>),
    DataSmResp(MessageIdResp),
    QuerySm(QuerySm),
    QuerySmResp(QuerySmResp),
    ReplaceSm(Box<ReplaceSm>),
    ReplaceSmResp,
    CancelSm(CancelSm),
    CancelSmResp,
    SubmitMulti(Box<SubmitMulti>),
    SubmitMultiResp(SubmitMultiResp),
    AlertNotification(Box<AlertNotification>),
}

impl Body {
    pub fn command_id(&self) -> CommandId {
        match self {
            Body::BindTransmitter(_) => CommandId::BindTransmitter,
            Body::BindTransmitterResp(_) => CommandId::BindTransmitterResp,
            Body::BindReceiver(_) => CommandId::BindReceiver,
            Body::BindReceiverResp(_) => CommandId::BindReceiverResp,
            Body::BindTransceiver(_) => CommandId::BindTransceiver,
            Body::BindTransceiverResp(_) => CommandId::BindTransceiverResp,
            Body::Outbind(_) => CommandId::Outbind,
            Body::Unbind => CommandId::Unbind,
            Body::UnbindResp => CommandId::UnbindResp,
            Body::EnquireLink => CommandId::EnquireLink,
            Body::EnquireLinkResp => CommandId::EnquireLinkResp,
            Body::GenericNack => CommandId::GenericNack,
            Body::SubmitSm(_) => CommandId::SubmitSm,
            Body::SubmitSmResp(_) => CommandId::SubmitSmResp,
            Body::DeliverSm(_) => CommandId::DeliverSm,
            Body::DeliverSmResp(_) => CommandId::DeliverSmResp,
            Body::DataSm(_) => CommandId::DataSm,
            Body::DataSmResp(_) => CommandId::DataSmResp,
            Body::QuerySm(_) => CommandId::QuerySm,
            Body::QuerySmResp(_) => CommandId::QuerySmResp,
            Body::ReplaceSm(_) => CommandId::ReplaceSm,
            Body::ReplaceSmResp => CommandId::ReplaceSmResp,
            Body::CancelSm(_) => CommandId::CancelSm,
            Body::CancelSmResp => CommandId::CancelSmResp,
            Body::SubmitMulti(_) => CommandId::SubmitMulti,
            Body::SubmitMultiResp(_) => CommandId::SubmitMultiResp,
            Body::AlertNotification(_) => CommandId::AlertNotification,
        }
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Body::BindTransmitter(bind) | Body::BindReceiver(bind) | Body::BindTransceiver(bind) => {
                bind.encode(buf)
            }
            Body::BindTransmitterResp(resp)
            | Body::BindReceiverResp(resp)
            | Body::BindTransceiverResp(resp) => resp.encode(buf),
            Body::Outbind(outbind) => outbind.encode(buf),
            Body::SubmitSm(sm) | Body::DeliverSm(sm) => sm.encode(buf),
            Body::SubmitSmResp(resp) | Body::DeliverSmResp(resp) | Body::DataSmResp(resp) => {
                resp.encode(buf)
            }
            Body::DataSm(data_sm) => data_sm.encode(buf),
            Body::QuerySm(query) => query.encode(buf),
            Body::QuerySmResp(resp) => resp.encode(buf),
            Body::ReplaceSm(replace) => replace.encode(buf),
            Body::CancelSm(cancel) => cancel.encode(buf),
            Body::SubmitMulti(multi) => multi.encode(buf),
            Body::SubmitMultiResp(resp) => resp.encode(buf),
            Body::AlertNotification(alert) => alert.encode(buf),
            Body::Unbind
            | Body::UnbindResp
            | Body::EnquireLink
            | Body::EnquireLinkResp
            | Body::GenericNack
            | Body::ReplaceSmResp
            | Body::CancelSmResp => Ok(()),
        }
    }

    fn decode(command_id: CommandId, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let body = match command_id {
            CommandId::BindTransmitter => Body::BindTransmitter(Bind::decode(buf)?),
            CommandId::BindReceiver => Body::BindReceiver(Bind::decode(buf)?),
            CommandId::BindTransceiver => Body::BindTransceiver(Bind::decode(buf)?),
            CommandId::BindTransmitterResp => Body::BindTransmitterResp(response_body(buf)?),
            CommandId::BindReceiverResp => Body::BindReceiverResp(response_body(buf)?),
            CommandId::BindTransceiverResp => Body::BindTransceiverResp(response_body(buf)?),
            CommandId::Outbind => Body::Outbind(Outbind::decode(buf)?),
            CommandId::Unbind => Body::Unbind,
            CommandId::UnbindResp => Body::UnbindResp,
            CommandId::EnquireLink => Body::EnquireLink,
            CommandId::EnquireLinkResp => Body::EnquireLinkResp,
            CommandId::GenericNack => Body::GenericNack,
            CommandId::SubmitSm => Body::SubmitSm(Box::new(SubmitSm::decode(buf)?)),
            CommandId::SubmitSmResp => Body::SubmitSmResp(response_body(buf)?),
            CommandId::DeliverSm => Body::DeliverSm(Box::new(DeliverSm::decode(buf)?)),
            CommandId::DeliverSmResp => Body::DeliverSmResp(response_body(buf)?),
            CommandId::DataSm => Body::DataSm(Box::new(DataSm::decode(buf)?)),
            CommandId::DataSmResp => Body::DataSmResp(response_body(buf)?),
            CommandId::QuerySm => Body::QuerySm(QuerySm::decode(buf)?),
            CommandId::QuerySmResp => Body::QuerySmResp(response_body(buf)?),
            CommandId::ReplaceSm => Body::ReplaceSm(Box::new(ReplaceSm::decode(buf)?)),
            CommandId::ReplaceSmResp => Body::ReplaceSmResp,
            CommandId::CancelSm => Body::CancelSm(CancelSm::decode(buf)?),
            CommandId::CancelSmResp => Body::CancelSmResp,
            CommandId::SubmitMulti => Body::SubmitMulti(Box::new(SubmitMulti::decode(buf)?)),
            CommandId::SubmitMultiResp => Body::SubmitMultiResp(response_body(buf)?),
            CommandId::AlertNotification => {
                Body::AlertNotification(Box::new(AlertNotification::decode(buf)?))
            }
        };
        Ok(body)
    }
}

/// SMSCs commonly omit the body of a response carrying an error status
fn response_body<T: Decodable + Default>(buf: &mut Cursor<&[u8]>) -> Result<T, CodecError> {
    if buf.has_remaining() {
        T::decode(buf)
    } else {
        Ok(T::default())
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::BindTransmitter(bind) | Body::BindReceiver(bind) | Body::BindTransceiver(bind) => {
                bind.fmt(f)
            }
            Body::BindTransmitterResp(resp)
            | Body::BindReceiverResp(resp)
            | Body::BindTransceiverResp(resp) => resp.fmt(f),
            Body::Outbind(outbind) => outbind.fmt(f),
            Body::SubmitSm(sm) | Body::DeliverSm(sm) => sm.fmt(f),
            Body::SubmitSmResp(resp) | Body::DeliverSmResp(resp) | Body::DataSmResp(resp) => {
                resp.fmt(f)
            }
            Body::DataSm(data_sm) => data_sm.fmt(f),
            Body::QuerySm(query) => query.fmt(f),
            Body::QuerySmResp(resp) => resp.fmt(f),
            Body::ReplaceSm(replace) => replace.fmt(f),
            Body::CancelSm(cancel) => cancel.fmt(f),
            Body::SubmitMulti(multi) => multi.fmt(f),
            Body::SubmitMultiResp(resp) => resp.fmt(f),
            Body::AlertNotification(alert) => alert.fmt(f),
            Body::Unbind
            | Body::UnbindResp
            | Body::EnquireLink
            | Body::EnquireLinkResp
            | Body::GenericNack
            | Body::ReplaceSmResp
            | Body::CancelSmResp => Ok(()),
        }
    }
}

/// A complete SMPP protocol data unit.
///
/// `command_length` is not stored: it is computed by [`Pdu::to_bytes`].
/// A `sequence_number` of 0 means "not yet assigned"; the session numbers
/// such PDUs when it sends them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pdu {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub body: Body,
    pub tlvs: TlvTable,
}

impl Pdu {
    pub fn new(body: Body) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number: 0,
            body,
            tlvs: TlvTable::new(),
        }
    }

    pub fn with_sequence_number(mut self, sequence_number: u32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    pub fn with_status(mut self, command_status: CommandStatus) -> Self {
        self.command_status = command_status;
        self
    }

    pub fn with_tlvs(mut self, tlvs: TlvTable) -> Self {
        self.tlvs = tlvs;
        self
    }

    pub fn generic_nack(sequence_number: u32, command_status: CommandStatus) -> Self {
        Pdu::new(Body::GenericNack)
            .with_sequence_number(sequence_number)
            .with_status(command_status)
    }

    pub fn command_id(&self) -> CommandId {
        self.body.command_id()
    }

    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    pub fn is_request(&self) -> bool {
        !self.is_response()
    }

    /// Message id carried by a submit/deliver/data/query/submit_multi response
    pub fn message_id(&self) -> Option<&MessageId> {
        match &self.body {
            Body::SubmitSmResp(resp) | Body::DeliverSmResp(resp) | Body::DataSmResp(resp) => {
                Some(&resp.message_id)
            }
            Body::QuerySmResp(resp) => Some(&resp.message_id),
            Body::SubmitMultiResp(resp) => Some(&resp.message_id),
            _ => None,
        }
    }

    /// Decodes one PDU from the front of `data`.
    ///
    /// The buffer is trimmed to the declared `command_length`, so trailing
    /// bytes belonging to a following frame are ignored.
    pub fn decode(data: &[u8]) -> Result<Pdu, CodecError> {
        let header = PduHeader::decode(&mut Cursor::new(data))?;
        let frame = &data[..header.command_length as usize];

        let mut buf = Cursor::new(frame);
        buf.set_position(PduHeader::SIZE as u64);

        let body = Body::decode(header.command_id, &mut buf)?;
        let tlvs = TlvTable::decode(&mut buf);

        Ok(Pdu {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            body,
            tlvs,
        })
    }

    /// Read-path entry point: a frame that cannot be decoded becomes a generic_nack
    pub fn decode_or_nack(data: &[u8]) -> Pdu {
        Pdu::decode(data).unwrap_or_else(|error| Pdu::nack_for(data, &error))
    }

    /// The generic_nack answering a frame that failed with `error`,
    /// carrying whatever sequence number could be read from it
    pub fn nack_for(data: &[u8], error: &CodecError) -> Pdu {
        let (_, sequence_number) = PduHeader::salvage(data);
        Pdu::generic_nack(sequence_number, error.to_command_status())
    }

    /// Whether an undecodable frame claimed to be a response
    pub fn frame_is_response(data: &[u8]) -> bool {
        let (command_id, _) = PduHeader::salvage(data);
        command_id & RESPONSE_BIT != 0
    }

    /// Serializes header, body and TLVs, backfilling `command_length`
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(PduHeader::SIZE + 64 + self.tlvs.encoded_size());

        PduHeader {
            command_length: 0,
            command_id: self.command_id(),
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        }
        .encode(&mut buf);
        self.body.encode(&mut buf)?;
        self.tlvs.encode(&mut buf);

        let length = buf.len() as u32;
        if length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }
        buf[0..4].copy_from_slice(&length.to_be_bytes());

        Ok(buf.freeze())
    }

    /// A response to this request carrying `body`, same sequence number, status OK
    pub fn respond(&self, body: Body) -> Pdu {
        Pdu::new(body).with_sequence_number(self.sequence_number)
    }

    /// Minimal successful response for a request received without a handler.
    ///
    /// `None` for responses and for requests that have no response
    /// (outbind, alert_notification).
    pub fn default_response(&self) -> Option<Pdu> {
        let body = match &self.body {
            Body::BindTransmitter(_) => Body::BindTransmitterResp(BindResp::default()),
            Body::BindReceiver(_) => Body::BindReceiverResp(BindResp::default()),
            Body::BindTransceiver(_) => Body::BindTransceiverResp(BindResp::default()),
            Body::Unbind => Body::UnbindResp,
            Body::EnquireLink => Body::EnquireLinkResp,
            Body::SubmitSm(_) => Body::SubmitSmResp(MessageIdResp::default()),
            Body::DeliverSm(_) => Body::DeliverSmResp(MessageIdResp::default()),
            Body::DataSm(_) => Body::DataSmResp(MessageIdResp::default()),
            Body::QuerySm(query) => Body::QuerySmResp(QuerySmResp {
                message_id: query.message_id,
                ..Default::default()
            }),
            Body::ReplaceSm(_) => Body::ReplaceSmResp,
            Body::CancelSm(_) => Body::CancelSmResp,
            Body::SubmitMulti(_) => Body::SubmitMultiResp(SubmitMultiResp::default()),
            _ => return None,
        };
        Some(self.respond(body))
    }
}

impl fmt::Display for Pdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} seq={} status={:?}",
            self.command_id(),
            self.sequence_number,
            self.command_status
        )?;

        let body = self.body.to_string();
        if !body.is_empty() {
            write!(f, " {body}")?;
        }

        for tlv in self.tlvs.iter() {
            write!(f, " tlv[{:#06x}]=<{} octets>", tlv.tag, tlv.value.len())?;
        }
        Ok(())
    }
}

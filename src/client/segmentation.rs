// ABOUTME: Splits messages too long for one short message into correlated PDUs
// ABOUTME: Supports message_payload, UDH concatenation and SAR TLV strategies

use crate::client::error::{SmppError, SmppResult};
use crate::datatypes::{DataCoding, ShortMessage, tags};
use crate::pdu::{Body, Pdu};
use bytes::{BufMut, Bytes, BytesMut};

/// Largest message the `Payload` strategy carries in one message_payload TLV
pub const MAX_PAYLOAD_LENGTH: usize = 64_000;

/// Length of the concatenation header: UDHL, IEI, IEDL, ref, total, index
pub const UDH_LENGTH: usize = 6;

/// Most segments a reference byte and index octet can address
pub const MAX_SEGMENTS: usize = 255;

/// How a message longer than one short message reaches the SMSC
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SegmentationStrategy {
    /// Whole message in the message_payload TLV of a single PDU
    Payload,
    /// One PDU per segment, each prefixed with a concatenation header
    #[default]
    Udh,
    /// One PDU per segment, correlated through sar_* TLVs
    Sar,
}

/// Result of splitting one message
#[derive(Debug, Clone)]
pub struct SegmentedMessage {
    /// Shared by every segment of this message
    pub reference: u8,
    /// Ready to send in order, sequence numbers unassigned
    pub pdus: Vec<Pdu>,
}

impl SegmentedMessage {
    pub fn len(&self) -> usize {
        self.pdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pdus.is_empty()
    }
}

/// Splits `message` into PDUs built from `template`.
///
/// The template must be a submit_sm, deliver_sm or data_sm. A message that
/// fits one unsegmented PDU is returned whole with no segmentation metadata,
/// whatever the strategy.
pub fn segment(
    template: &Pdu,
    message: &[u8],
    strategy: SegmentationStrategy,
    reference: u8,
) -> SmppResult<SegmentedMessage> {
    let data_coding = template_coding(template)?;
    let base = strip(template);

    if message.len() <= data_coding.single_message_capacity() {
        let mut pdu = base;
        fill(&mut pdu, Bytes::copy_from_slice(message))?;
        return Ok(SegmentedMessage {
            reference,
            pdus: vec![pdu],
        });
    }

    if strategy == SegmentationStrategy::Payload {
        if message.len() > MAX_PAYLOAD_LENGTH {
            return Err(SmppError::InvalidData(format!(
                "message of {} octets exceeds message_payload limit of {MAX_PAYLOAD_LENGTH}",
                message.len()
            )));
        }
        let mut pdu = base;
        pdu.tlvs
            .set(tags::MESSAGE_PAYLOAD, Some(Bytes::copy_from_slice(message)))?;
        return Ok(SegmentedMessage {
            reference,
            pdus: vec![pdu],
        });
    }

    let chunks: Vec<&[u8]> = message.chunks(data_coding.segment_capacity()).collect();
    if chunks.len() > MAX_SEGMENTS {
        return Err(SmppError::InvalidData(format!(
            "message needs {} segments (max {MAX_SEGMENTS})",
            chunks.len()
        )));
    }
    let total = chunks.len() as u8;

    let mut pdus = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.into_iter().enumerate() {
        let index = i as u8 + 1;
        let mut pdu = base.clone();
        match strategy {
            SegmentationStrategy::Udh => {
                let mut data = BytesMut::with_capacity(UDH_LENGTH + chunk.len());
                data.put_slice(&[0x05, 0x00, 0x03, reference, total, index]);
                data.put_slice(chunk);
                set_udhi(&mut pdu);
                fill(&mut pdu, data.freeze())?;
            }
            SegmentationStrategy::Sar | SegmentationStrategy::Payload => {
                pdu.tlvs.set_u16(tags::SAR_MSG_REF_NUM, u16::from(reference));
                pdu.tlvs.set_u8(tags::SAR_TOTAL_SEGMENTS, total);
                pdu.tlvs.set_u8(tags::SAR_SEGMENT_SEQNUM, index);
                if index < total {
                    pdu.tlvs.set_u8(tags::MORE_MESSAGES_TO_SEND, 1);
                }
                fill(&mut pdu, Bytes::copy_from_slice(chunk))?;
            }
        }
        pdus.push(pdu);
    }

    Ok(SegmentedMessage { reference, pdus })
}

fn template_coding(template: &Pdu) -> SmppResult<DataCoding> {
    match &template.body {
        Body::SubmitSm(sm) | Body::DeliverSm(sm) => Ok(sm.data_coding),
        Body::DataSm(sm) => Ok(sm.data_coding),
        other => Err(SmppError::InvalidData(format!(
            "{} cannot carry a segmented message",
            other.command_id()
        ))),
    }
}

/// Copy of the template with any previous message and segmentation metadata removed
fn strip(template: &Pdu) -> Pdu {
    let mut pdu = template.clone();
    pdu.sequence_number = 0;
    match &mut pdu.body {
        Body::SubmitSm(sm) | Body::DeliverSm(sm) => {
            sm.esm_class = sm.esm_class.without_udhi();
            sm.short_message = ShortMessage::default();
        }
        Body::DataSm(sm) => sm.esm_class = sm.esm_class.without_udhi(),
        _ => {}
    }
    for tag in [
        tags::SAR_MSG_REF_NUM,
        tags::SAR_TOTAL_SEGMENTS,
        tags::SAR_SEGMENT_SEQNUM,
        tags::MORE_MESSAGES_TO_SEND,
        tags::MESSAGE_PAYLOAD,
    ] {
        pdu.tlvs.remove(tag);
    }
    pdu
}

fn set_udhi(pdu: &mut Pdu) {
    match &mut pdu.body {
        Body::SubmitSm(sm) | Body::DeliverSm(sm) => sm.esm_class = sm.esm_class.with_udhi(),
        Body::DataSm(sm) => sm.esm_class = sm.esm_class.with_udhi(),
        _ => {}
    }
}

/// Writes `data` into the template's message slot
fn fill(pdu: &mut Pdu, data: Bytes) -> SmppResult<()> {
    match &mut pdu.body {
        Body::SubmitSm(sm) | Body::DeliverSm(sm) => {
            sm.short_message = ShortMessage::new(data)?;
        }
        Body::DataSm(_) => pdu.tlvs.set(tags::MESSAGE_PAYLOAD, Some(data))?,
        _ => {}
    }
    Ok(())
}

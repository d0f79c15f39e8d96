// ABOUTME: Supporting types for SMPP sessions including credentials, session config and message builders
// ABOUTME: Field widths are validated when these are built, so bad values never reach the wire

use crate::client::error::{SmppError, SmppResult};
use crate::client::segmentation::SegmentationStrategy;
use crate::datatypes::{
    Address, AddressRange, DataCoding, InterfaceVersion, NumericPlanIndicator, Password,
    PriorityFlag, SystemId, SystemType, TypeOfNumber,
};
use crate::pdu::{Bind, Body, Pdu, SubmitSm};
use bytes::Bytes;
use std::time::Duration;

/// SMPP bind operation credentials
///
/// Contains authentication information and bind type for establishing
/// SMPP sessions with the SMSC.
#[derive(Debug, Clone)]
pub struct BindCredentials {
    pub system_id: SystemId,
    pub password: Password,
    /// Empty unless the SMSC asks for one
    pub system_type: SystemType,
    pub bind_type: BindType,
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    /// Addresses served by a receiver or transceiver
    pub address_range: AddressRange,
}

impl BindCredentials {
    pub fn new(bind_type: BindType, system_id: &str, password: &str) -> SmppResult<Self> {
        Ok(Self {
            system_id: system_id.parse()?,
            password: password.parse()?,
            system_type: SystemType::default(),
            bind_type,
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::default(),
            addr_npi: NumericPlanIndicator::default(),
            address_range: AddressRange::default(),
        })
    }

    /// Create new bind credentials for transmitter session
    pub fn transmitter(system_id: &str, password: &str) -> SmppResult<Self> {
        Self::new(BindType::Transmitter, system_id, password)
    }

    /// Create new bind credentials for receiver session
    pub fn receiver(system_id: &str, password: &str) -> SmppResult<Self> {
        Self::new(BindType::Receiver, system_id, password)
    }

    /// Create new bind credentials for transceiver session
    pub fn transceiver(system_id: &str, password: &str) -> SmppResult<Self> {
        Self::new(BindType::Transceiver, system_id, password)
    }

    pub fn with_system_type(mut self, system_type: &str) -> SmppResult<Self> {
        self.system_type = system_type.parse()?;
        Ok(self)
    }

    pub fn with_version(mut self, interface_version: InterfaceVersion) -> Self {
        self.interface_version = interface_version;
        self
    }

    pub fn with_address_range(
        mut self,
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
        range: &str,
    ) -> SmppResult<Self> {
        self.addr_ton = ton;
        self.addr_npi = npi;
        self.address_range = range.parse()?;
        Ok(self)
    }

    /// The bind request these credentials describe
    pub fn to_pdu(&self) -> Pdu {
        let bind = Bind {
            system_id: self.system_id,
            password: self.password,
            system_type: self.system_type,
            interface_version: self.interface_version,
            addr_ton: self.addr_ton,
            addr_npi: self.addr_npi,
            address_range: self.address_range,
        };
        Pdu::new(self.bind_type.body(bind))
    }
}

/// Type of SMPP bind operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindType {
    /// Can only send messages
    Transmitter,
    /// Can only receive messages
    Receiver,
    /// Can send and receive
    Transceiver,
}

impl BindType {
    fn body(self, bind: Bind) -> Body {
        match self {
            BindType::Transmitter => Body::BindTransmitter(bind),
            BindType::Receiver => Body::BindReceiver(bind),
            BindType::Transceiver => Body::BindTransceiver(bind),
        }
    }
}

// tokio::time::interval panics on a zero period
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Timing and buffering knobs for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long `send_and_wait` waits before failing with `Timeout`
    pub response_timeout: Duration,
    /// Response timeout applied to bind requests
    pub bind_timeout: Duration,
    /// How often the reader task evicts expired pending requests
    pub sweep_interval: Duration,
    /// Broadcast buffer size; slow subscribers lose the oldest events
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(30),
            bind_timeout: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(1),
            event_capacity: 256,
        }
    }
}

impl SessionConfig {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_bind_timeout(mut self, timeout: Duration) -> Self {
        self.bind_timeout = timeout;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(MIN_SWEEP_INTERVAL);
        self
    }

    /// `sweep_interval`, raised to the smallest period the sweep can run at
    pub(crate) fn effective_sweep_interval(&self) -> Duration {
        self.sweep_interval.max(MIN_SWEEP_INTERVAL)
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

/// Simplified SMS message for easy client usage
///
/// Hides the mandatory submit_sm fields behind sensible defaults. Text
/// longer than one short message is split by [`Session::submit`] using
/// `options.segmentation`.
///
/// [`Session::submit`]: crate::client::Session::submit
#[derive(Debug, Clone)]
pub struct SmsMessage {
    pub to: Address,
    pub from: Address,
    /// Message octets, already in the encoding named by `options.data_coding`
    pub text: Bytes,
    pub options: SmsOptions,
}

impl SmsMessage {
    /// Create a new SMS message with default options
    pub fn new(to: &str, from: &str, text: impl Into<Bytes>) -> SmppResult<Self> {
        Ok(Self {
            to: to.parse()?,
            from: from.parse()?,
            text: text.into(),
            options: SmsOptions::default(),
        })
    }

    /// Create a builder for constructing SMS messages
    pub fn builder() -> SmsMessageBuilder {
        SmsMessageBuilder::default()
    }

    /// submit_sm carrying every field but the message itself
    pub fn to_template(&self) -> Pdu {
        let submit = SubmitSm {
            source_addr_ton: self.options.source_ton,
            source_addr_npi: self.options.source_npi,
            source_addr: self.from,
            dest_addr_ton: self.options.dest_ton,
            dest_addr_npi: self.options.dest_npi,
            destination_addr: self.to,
            priority_flag: self.options.priority,
            registered_delivery: self.options.registered_delivery,
            data_coding: self.options.data_coding,
            ..Default::default()
        };
        Pdu::new(Body::SubmitSm(Box::new(submit)))
    }
}

/// SMS message options with sensible defaults
#[derive(Debug, Clone, Default)]
pub struct SmsOptions {
    pub priority: PriorityFlag,
    pub data_coding: DataCoding,
    pub source_ton: TypeOfNumber,
    pub source_npi: NumericPlanIndicator,
    pub dest_ton: TypeOfNumber,
    pub dest_npi: NumericPlanIndicator,
    /// Request delivery receipt (0 = no, 1 = yes)
    pub registered_delivery: u8,
    /// How text too long for one short message is split
    pub segmentation: SegmentationStrategy,
}

/// Builder for constructing SMS messages with fluent API
#[derive(Debug, Default)]
pub struct SmsMessageBuilder {
    to: Option<String>,
    from: Option<String>,
    text: Option<Bytes>,
    options: SmsOptions,
}

impl SmsMessageBuilder {
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn text(mut self, text: impl Into<Bytes>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn priority(mut self, priority: PriorityFlag) -> Self {
        self.options.priority = priority;
        self
    }

    pub fn data_coding(mut self, data_coding: DataCoding) -> Self {
        self.options.data_coding = data_coding;
        self
    }

    /// Request delivery receipt
    pub fn with_delivery_receipt(mut self) -> Self {
        self.options.registered_delivery = 1;
        self
    }

    pub fn source_numbering(mut self, ton: TypeOfNumber, npi: NumericPlanIndicator) -> Self {
        self.options.source_ton = ton;
        self.options.source_npi = npi;
        self
    }

    pub fn dest_numbering(mut self, ton: TypeOfNumber, npi: NumericPlanIndicator) -> Self {
        self.options.dest_ton = ton;
        self.options.dest_npi = npi;
        self
    }

    pub fn segmentation(mut self, strategy: SegmentationStrategy) -> Self {
        self.options.segmentation = strategy;
        self
    }

    /// Build the SMS message
    pub fn build(self) -> SmppResult<SmsMessage> {
        let to = self
            .to
            .ok_or_else(|| SmppError::InvalidData("Destination address is required".into()))?;
        let from = self
            .from
            .ok_or_else(|| SmppError::InvalidData("Source address is required".into()))?;
        let text = self
            .text
            .ok_or_else(|| SmppError::InvalidData("Message text is required".into()))?;

        Ok(SmsMessage {
            to: to.parse()?,
            from: from.parse()?,
            text,
            options: self.options,
        })
    }
}

// ABOUTME: SMPP esm_class bitfield with message mode, message type and GSM feature bits
// ABOUTME: Keeps the raw octet so unknown combinations survive a decode/encode cycle

use std::fmt;

/// ESM class octet.
///
/// Bits 1-0 select the messaging mode, bits 5-2 the message type and bits
/// 7-6 the GSM network specific features (UDHI, reply path).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EsmClass(u8);

impl EsmClass {
    pub const MODE_MASK: u8 = 0b0000_0011;
    pub const TYPE_MASK: u8 = 0b0011_1100;
    /// User Data Header Indicator
    pub const UDHI: u8 = 0b0100_0000;
    pub const REPLY_PATH: u8 = 0b1000_0000;
    /// Message type: SMSC delivery receipt
    pub const DELIVERY_RECEIPT: u8 = 0b0000_0100;

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn to_byte(&self) -> u8 {
        self.0
    }

    pub fn mode(&self) -> MessageMode {
        match self.0 & Self::MODE_MASK {
            0 => MessageMode::Default,
            1 => MessageMode::Datagram,
            2 => MessageMode::Forward,
            _ => MessageMode::StoreAndForward,
        }
    }

    /// Returns true if UDHI (User Data Header Indicator) is set
    pub fn has_udhi(&self) -> bool {
        self.0 & Self::UDHI != 0
    }

    /// Returns true if the message type bits mark an SMSC delivery receipt
    pub fn is_delivery_receipt(&self) -> bool {
        self.0 & Self::TYPE_MASK == Self::DELIVERY_RECEIPT
    }

    /// Adds the UDHI feature bit
    pub fn with_udhi(self) -> Self {
        Self(self.0 | Self::UDHI)
    }

    /// Clears the UDHI feature bit
    pub fn without_udhi(self) -> Self {
        Self(self.0 & !Self::UDHI)
    }

    pub fn with_mode(self, mode: MessageMode) -> Self {
        Self((self.0 & !Self::MODE_MASK) | mode as u8)
    }
}

/// Messaging mode carried in bits 1-0
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageMode {
    Default = 0,
    Datagram = 1,
    Forward = 2,
    StoreAndForward = 3,
}

impl fmt::Debug for EsmClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EsmClass(0x{:02X})", self.0)
    }
}

impl fmt::Display for EsmClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

impl From<u8> for EsmClass {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<EsmClass> for u8 {
    fn from(esm_class: EsmClass) -> Self {
        esm_class.0
    }
}

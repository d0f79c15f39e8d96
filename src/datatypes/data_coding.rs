// ABOUTME: Strongly-typed SMPP data coding scheme with per-coding message capacity accounting
// ABOUTME: Decides how many octets fit in one short message and in one concatenated segment

use std::fmt;

/// Strongly-typed data coding scheme over the raw `data_coding` octet.
///
/// Only byte-length accounting is derived from the coding; the octets of a
/// message are never transcoded by this crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataCoding {
    /// SMSC Default Alphabet (typically GSM 7-bit)
    #[default]
    SmscDefault,
    /// IA5 (CCITT T.50)/ASCII encoding
    Ascii,
    /// 8-bit binary data (no encoding), 0x02
    Binary,
    /// 8-bit binary data, the 0x04 variant
    BinaryAlt,
    /// Latin-1 (ISO-8859-1) character set
    Latin1,
    /// UCS-2 (ISO/IEC-10646) Unicode encoding
    Ucs2,
    /// Cyrillic (ISO-8859-5) character set
    Cyrillic,
    /// Latin/Hebrew (ISO-8859-8) character set
    LatinHebrew,
    /// JIS (X 0208-1990) Japanese character set
    Jis,
    /// GSM 7-bit default alphabet with message class
    Gsm7BitWithClass(MessageClass),
    /// 8-bit data with message class
    Binary8BitWithClass(MessageClass),
    /// Custom/reserved data coding value
    Custom(u8),
}

impl DataCoding {
    /// Creates a DataCoding from the raw wire value
    pub fn from_byte(value: u8) -> Self {
        match value {
            0x00 => DataCoding::SmscDefault,
            0x01 => DataCoding::Ascii,
            0x02 => DataCoding::Binary,
            0x04 => DataCoding::BinaryAlt,
            0x03 => DataCoding::Latin1,
            0x05 => DataCoding::Jis,
            0x06 => DataCoding::Cyrillic,
            0x07 => DataCoding::LatinHebrew,
            0x08 => DataCoding::Ucs2,
            0xF0..=0xF3 => DataCoding::Gsm7BitWithClass(MessageClass::from_bits(value)),
            0xF4..=0xF7 => DataCoding::Binary8BitWithClass(MessageClass::from_bits(value)),
            _ => DataCoding::Custom(value),
        }
    }

    /// Returns the raw u8 value for wire protocol
    pub fn to_byte(&self) -> u8 {
        match self {
            DataCoding::SmscDefault => 0x00,
            DataCoding::Ascii => 0x01,
            DataCoding::Binary => 0x02,
            DataCoding::BinaryAlt => 0x04,
            DataCoding::Latin1 => 0x03,
            DataCoding::Jis => 0x05,
            DataCoding::Cyrillic => 0x06,
            DataCoding::LatinHebrew => 0x07,
            DataCoding::Ucs2 => 0x08,
            DataCoding::Gsm7BitWithClass(class) => 0xF0 | class.bits(),
            DataCoding::Binary8BitWithClass(class) => 0xF4 | class.bits(),
            DataCoding::Custom(value) => *value,
        }
    }

    /// Returns true if this coding is carried as one septet per octet
    pub fn is_7bit(&self) -> bool {
        matches!(
            self,
            DataCoding::SmscDefault | DataCoding::Ascii | DataCoding::Gsm7BitWithClass(_)
        )
    }

    /// Returns true if this encoding uses 16-bit (Unicode) character encoding
    pub fn is_16bit(&self) -> bool {
        matches!(self, DataCoding::Ucs2 | DataCoding::Jis)
    }

    /// Returns the message class if this coding scheme includes one
    pub fn message_class(&self) -> Option<MessageClass> {
        match self {
            DataCoding::Gsm7BitWithClass(class) | DataCoding::Binary8BitWithClass(class) => {
                Some(*class)
            }
            _ => None,
        }
    }

    /// Octets that fit in a single, unsegmented short message
    pub fn single_message_capacity(&self) -> usize {
        if self.is_7bit() { 160 } else { 140 }
    }

    /// Octets of user data per segment once a message has to be split
    pub fn segment_capacity(&self) -> usize {
        if self.is_7bit() { 153 } else { 134 }
    }

    /// Returns the character set name for this encoding
    pub fn charset_name(&self) -> &'static str {
        match self {
            DataCoding::SmscDefault | DataCoding::Gsm7BitWithClass(_) => "GSM 7-bit Default",
            DataCoding::Ascii => "ASCII/IA5",
            DataCoding::Binary | DataCoding::BinaryAlt | DataCoding::Binary8BitWithClass(_) => {
                "Binary"
            }
            DataCoding::Latin1 => "ISO-8859-1",
            DataCoding::Jis => "JIS X 0208-1990",
            DataCoding::Cyrillic => "ISO-8859-5",
            DataCoding::LatinHebrew => "ISO-8859-8",
            DataCoding::Ucs2 => "UCS-2",
            DataCoding::Custom(_) => "Custom/Reserved",
        }
    }
}

/// Message class for SMS delivery
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MessageClass {
    /// Flash SMS (displayed immediately, not stored)
    Flash,
    /// Mobile Equipment specific message
    MobileEquipment,
    /// SIM-specific message (stored on SIM card)
    SimSpecific,
    /// Terminal Equipment specific message
    TerminalEquipment,
}

impl MessageClass {
    fn from_bits(value: u8) -> Self {
        match value & 0x03 {
            0 => MessageClass::Flash,
            1 => MessageClass::MobileEquipment,
            2 => MessageClass::SimSpecific,
            _ => MessageClass::TerminalEquipment,
        }
    }

    fn bits(&self) -> u8 {
        match self {
            MessageClass::Flash => 0,
            MessageClass::MobileEquipment => 1,
            MessageClass::SimSpecific => 2,
            MessageClass::TerminalEquipment => 3,
        }
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.charset_name())?;
        if let Some(class) = self.message_class() {
            write!(f, " ({class:?})")?;
        }
        Ok(())
    }
}

impl fmt::Debug for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataCoding(0x{:02X} {})", self.to_byte(), self)
    }
}

impl From<u8> for DataCoding {
    fn from(value: u8) -> Self {
        Self::from_byte(value)
    }
}

impl From<DataCoding> for u8 {
    fn from(data_coding: DataCoding) -> Self {
        data_coding.to_byte()
    }
}

// ABOUTME: Fixed-size string types for SMPP protocol fields, validated at construction time
// ABOUTME: Provides newtype wrappers around byte arrays with Display/Debug traits

use bytes::Bytes;
use std::fmt;
use std::str;
use std::str::FromStr;

/// A C-octet string slot of at most `N` bytes on the wire, terminator included.
///
/// Construction fails when the content does not leave room for the
/// terminating NULL, so an oversized value is rejected before any send.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedString<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> FixedString<N> {
    /// Creates a new FixedString from a byte slice, padding with nulls if needed
    pub fn new(s: &[u8]) -> Result<Self, FixedStringError> {
        if s.len() >= N {
            return Err(FixedStringError::TooLong {
                max_len: N - 1,
                actual_len: s.len(),
            });
        }
        if s.contains(&0) {
            return Err(FixedStringError::EmbeddedNull);
        }

        let mut data = [0u8; N];
        data[..s.len()].copy_from_slice(s);
        Ok(Self { data })
    }

    /// Maximum content length, excluding the terminator
    pub const fn capacity() -> usize {
        N - 1
    }

    /// Returns the string content as a byte slice, excluding null padding
    pub fn as_str_bytes(&self) -> &[u8] {
        let len = self.data.iter().position(|&b| b == 0).unwrap_or(N);
        &self.data[..len]
    }

    /// Returns the string content as a str, excluding null padding
    pub fn as_str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(self.as_str_bytes())
    }

    /// Returns the length of the string content (excluding null padding)
    pub fn len(&self) -> usize {
        self.as_str_bytes().len()
    }

    /// Returns true if the string is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bytes this value occupies on the wire (content plus terminator)
    pub fn encoded_len(&self) -> usize {
        self.len() + 1
    }

    /// Clears the string, setting all bytes to zero
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl<const N: usize> fmt::Display for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<invalid UTF-8>"),
        }
    }
}

impl<const N: usize> fmt::Debug for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "FixedString<{N}>(\"{s}\")"),
            Err(_) => write!(f, "FixedString<{}>({:?})", N, self.as_str_bytes()),
        }
    }
}

impl<const N: usize> Default for FixedString<N> {
    fn default() -> Self {
        Self { data: [0u8; N] }
    }
}

impl<const N: usize> TryFrom<&str> for FixedString<N> {
    type Error = FixedStringError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl<const N: usize> TryFrom<String> for FixedString<N> {
    type Error = FixedStringError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl<const N: usize> FromStr for FixedString<N> {
    type Err = FixedStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.as_bytes())
    }
}

impl<const N: usize> AsRef<[u8]> for FixedString<N> {
    fn as_ref(&self) -> &[u8] {
        self.as_str_bytes()
    }
}

impl<const N: usize> PartialEq<str> for FixedString<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Ok(other)
    }
}

impl<const N: usize> PartialEq<&str> for FixedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Ok(*other)
    }
}

/// Errors that can occur when creating FixedString or ShortMessage instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedStringError {
    /// The input is too long for the wire slot
    TooLong { max_len: usize, actual_len: usize },
    /// C-octet strings cannot carry a NULL before their terminator
    EmbeddedNull,
}

impl fmt::Display for FixedStringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedStringError::TooLong {
                max_len,
                actual_len,
            } => {
                write!(f, "String too long: {actual_len} bytes (max {max_len})")
            }
            FixedStringError::EmbeddedNull => write!(f, "String contains an embedded NULL"),
        }
    }
}

impl std::error::Error for FixedStringError {}

// Wire slot sizes include the NULL terminator
pub type SystemId = FixedString<16>;
pub type Password = FixedString<9>;
pub type SystemType = FixedString<13>;
pub type AddressRange = FixedString<41>;
pub type ServiceType = FixedString<6>;
pub type Address = FixedString<21>;
/// Address slot used by data_sm and alert_notification
pub type LongAddress = FixedString<65>;
pub type MessageId = FixedString<65>;
/// Absolute or relative time in `YYMMDDhhmmsstnnp` format
pub type SmppTime = FixedString<17>;
pub type DistributionListName = FixedString<21>;

/// Maximum number of octets the short_message field can carry
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;

/// A length-prefixed message (not null-terminated), at most 254 octets
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ShortMessage {
    data: Bytes,
}

impl ShortMessage {
    /// Creates a new ShortMessage from raw octets
    pub fn new(data: impl Into<Bytes>) -> Result<Self, FixedStringError> {
        let data = data.into();
        if data.len() > MAX_SHORT_MESSAGE_LENGTH {
            return Err(FixedStringError::TooLong {
                max_len: MAX_SHORT_MESSAGE_LENGTH,
                actual_len: data.len(),
            });
        }
        Ok(Self { data })
    }

    /// Returns the message content as a byte slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the message content as a cheaply cloneable buffer
    pub fn to_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Returns the message content as a str
    pub fn as_str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(&self.data)
    }

    /// Returns the value of the sm_length field
    pub fn len(&self) -> u8 {
        self.data.len() as u8
    }

    /// Returns true if the message is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Display for ShortMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<{} octets>", self.data.len()),
        }
    }
}

impl fmt::Debug for ShortMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "ShortMessage(\"{s}\")"),
            Err(_) => write!(f, "ShortMessage({:?})", self.as_bytes()),
        }
    }
}

impl TryFrom<&str> for ShortMessage {
    type Error = FixedStringError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl FromStr for ShortMessage {
    type Err = FixedStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(Bytes::copy_from_slice(s.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_string_creation() {
        let system_id = "test_system".parse::<SystemId>().unwrap();
        assert_eq!(system_id.as_str().unwrap(), "test_system");
        assert_eq!(system_id.len(), 11);
        assert_eq!(system_id.encoded_len(), 12);
    }

    #[test]
    fn test_fixed_string_too_long() {
        let long_string = "a".repeat(16);
        let result = long_string.parse::<SystemId>();
        assert!(matches!(
            result,
            Err(FixedStringError::TooLong {
                max_len: 15,
                actual_len: 16
            })
        ));
        assert!("a".repeat(15).parse::<SystemId>().is_ok());
    }

    #[test]
    fn test_embedded_null_rejected() {
        let result = Password::new(b"ab\0cd");
        assert_eq!(result, Err(FixedStringError::EmbeddedNull));
    }

    #[test]
    fn test_fixed_string_display() {
        let system_id = "test".parse::<SystemId>().unwrap();
        assert_eq!(format!("{system_id}"), "test");
    }

    #[test]
    fn test_short_message() {
        let msg = "Hello, world!".parse::<ShortMessage>().unwrap();
        assert_eq!(msg.as_str().unwrap(), "Hello, world!");
        assert_eq!(msg.len(), 13);
    }

    #[test]
    fn test_short_message_too_long() {
        let long_msg = "x".repeat(255);
        let result = long_msg.parse::<ShortMessage>();
        assert!(matches!(result, Err(FixedStringError::TooLong { .. })));
        assert!("x".repeat(254).parse::<ShortMessage>().is_ok());
    }

    #[test]
    fn test_empty_fixed_string() {
        let empty = SystemId::default();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
        assert_eq!(empty.as_str().unwrap(), "");
    }
}

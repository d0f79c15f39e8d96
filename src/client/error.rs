// ABOUTME: Error types for SMPP session operations with detailed error information
// ABOUTME: Wraps codec failures and keeps rejected request/response pairs for inspection

use crate::client::events::SessionState;
use crate::codec::CodecError;
use crate::datatypes::FixedStringError;
use crate::pdu::Pdu;
use std::io;
use thiserror::Error;

/// Errors returned by session and supervisor operations
#[derive(Debug, Error)]
pub enum SmppError {
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// The peer answered with a non-zero status or a generic_nack
    #[error("{} rejected with {}: {:?}", .request.command_id(), .response.command_id(), .response.command_status)]
    RequestRejected { request: Box<Pdu>, response: Box<Pdu> },

    /// Some members of a batch were rejected; each pair is (request, response)
    #[error("{} request(s) of the batch were rejected", .pairs.len())]
    RequestsRejected { pairs: Vec<(Pdu, Pdu)> },

    #[error("No response for sequence number {sequence_number}")]
    Timeout { sequence_number: u32 },

    /// Indices into the submitted batch that were still unanswered at the deadline
    #[error("Batch deadline expired with {} request(s) outstanding", .outstanding.len())]
    BatchTimeout { outstanding: Vec<usize> },

    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Supervisor already started")]
    AlreadyStarted,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Cancelled by shutdown")]
    Cancelled,

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl From<FixedStringError> for SmppError {
    fn from(err: FixedStringError) -> Self {
        SmppError::InvalidData(err.to_string())
    }
}

impl SmppError {
    /// The response PDU of a single rejected request
    pub fn rejection(&self) -> Option<&Pdu> {
        match self {
            SmppError::RequestRejected { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// Result type for SMPP session operations
pub type SmppResult<T> = Result<T, SmppError>;

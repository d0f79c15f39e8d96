// ABOUTME: Session lifecycle states and the events a session broadcasts to subscribers
// ABOUTME: Background failures surface here rather than as returned errors

use crate::pdu::Pdu;
use std::fmt;
use std::time::Duration;

/// Where a session is in the SMPP bind lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport
    #[default]
    Inactive,
    /// Transport open, not bound
    Connected,
    /// bind request written, response outstanding
    Binding,
    Bound,
    /// unbind request written, response outstanding
    Unbinding,
}

impl SessionState {
    /// A transport is open in every state but `Inactive`
    pub fn has_transport(&self) -> bool {
        *self != SessionState::Inactive
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Inactive => "inactive",
            SessionState::Connected => "connected",
            SessionState::Binding => "binding",
            SessionState::Bound => "bound",
            SessionState::Unbinding => "unbinding",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Published on the session's broadcast channel.
///
/// Subscribers that fall behind lose the oldest events; nothing in the
/// session blocks on a slow subscriber.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// Every PDU decoded off the wire, before dispatch
    Inbound(Pdu),
    /// A bind or unbind response arrived in a state that was not expecting it
    ProtocolViolation { pdu: Pdu, state: SessionState },
    /// A response whose sequence number matched no pending request
    UnsolicitedResponse(Pdu),
    /// A frame with a valid length whose content could not be decoded
    DecodeError {
        sequence_number: u32,
        was_response: bool,
        error: String,
    },
    Disconnected { reason: String },
    /// The supervisor bound again after `attempts` tries
    Reconnected { attempts: u32 },
    ReconnectFailed {
        attempt: u32,
        next_delay: Duration,
        error: String,
    },
    /// Keepalive gave up on the link and tore the transport down
    KeepAliveFailed { consecutive_failures: u32 },
}

// ABOUTME: Registry correlating outstanding requests with their responses by sequence number
// ABOUTME: Each tracked request resolves exactly once: response, rejection, timeout or close

use crate::client::error::{SmppError, SmppResult};
use crate::datatypes::CommandId;
use crate::pdu::Pdu;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

struct Pending {
    request: Pdu,
    resolver: oneshot::Sender<SmppResult<Pdu>>,
    expires_at: Instant,
}

impl Pending {
    /// A response fits when its command_id answers the request, or it is a generic_nack
    fn accepts(&self, response: &Pdu) -> bool {
        let id = response.command_id();
        id == CommandId::GenericNack || self.request.command_id().response_id() == Some(id)
    }
}

/// Outstanding requests keyed by sequence number.
///
/// Clones share the same map. Whoever removes an entry owns its resolver,
/// which is what makes resolution exactly-once across the reader task, the
/// expiry sweep and the waiting caller.
#[derive(Clone, Default)]
pub struct PendingRequests {
    entries: Arc<Mutex<HashMap<u32, Pending>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, Pending>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `request` under `sequence_number` until `expires_at`.
    ///
    /// A sequence number already in flight is refused and the existing
    /// entry is left alone.
    pub fn track(
        &self,
        sequence_number: u32,
        request: Pdu,
        expires_at: Instant,
    ) -> SmppResult<ResponseFuture> {
        let (resolver, receiver) = oneshot::channel();
        match self.lock().entry(sequence_number) {
            Entry::Occupied(_) => {
                debug!("Sequence number {} is already in flight", sequence_number);
                return Err(SmppError::InvalidData(format!(
                    "sequence number {sequence_number} is already in flight"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(Pending {
                    request,
                    resolver,
                    expires_at,
                });
            }
        }

        Ok(ResponseFuture {
            sequence_number,
            expires_at,
            receiver,
            registry: self.clone(),
        })
    }

    /// Takes the entry `response` answers out of the registry.
    ///
    /// `None` when no pending request matches by sequence number and kind.
    /// The claim must be completed to wake the waiter.
    pub fn claim(&self, response: &Pdu) -> Option<Claimed> {
        let mut entries = self.lock();
        match entries.get(&response.sequence_number) {
            Some(pending) if pending.accepts(response) => {}
            _ => return None,
        }
        entries.remove(&response.sequence_number).map(Claimed)
    }

    /// Hands `response` to the request it answers.
    ///
    /// Returns the PDU back when nothing pending matches it, so the caller
    /// can report it as unsolicited.
    pub fn resolve(&self, response: Pdu) -> Result<(), Pdu> {
        match self.claim(&response) {
            Some(claimed) => {
                claimed.complete(response);
                Ok(())
            }
            None => Err(response),
        }
    }

    /// Drops an entry without resolving it, returning its request
    pub fn remove(&self, sequence_number: u32) -> Option<Pdu> {
        self.lock()
            .remove(&sequence_number)
            .map(|pending| pending.request)
    }

    /// Fails every entry past its expiry with `Timeout`
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(u32, Pending)> = {
            let mut entries = self.lock();
            let keys: Vec<u32> = entries
                .iter()
                .filter(|(_, pending)| pending.expires_at <= now)
                .map(|(seq, _)| *seq)
                .collect();
            keys.into_iter()
                .filter_map(|seq| entries.remove(&seq).map(|pending| (seq, pending)))
                .collect()
        };

        let count = expired.len();
        for (sequence_number, pending) in expired {
            let _ = pending
                .resolver
                .send(Err(SmppError::Timeout { sequence_number }));
        }
        count
    }

    /// Fails every entry with `ConnectionClosed`
    pub fn close_all(&self) -> usize {
        let drained: Vec<Pending> = self.lock().drain().map(|(_, pending)| pending).collect();
        let count = drained.len();
        for pending in drained {
            let _ = pending.resolver.send(Err(SmppError::ConnectionClosed));
        }
        count
    }

    pub fn contains(&self, sequence_number: u32) -> bool {
        self.lock().contains_key(&sequence_number)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// A pending entry removed by [`PendingRequests::claim`], not yet resolved
pub struct Claimed(Pending);

impl Claimed {
    /// The command the claimed request was sent as
    pub fn request_id(&self) -> CommandId {
        self.0.request.command_id()
    }

    /// Resolves the waiter: `Ok` for an OK-status answer, `RequestRejected` otherwise
    pub fn complete(self, response: Pdu) {
        let pending = self.0;
        let outcome =
            if response.command_status.is_ok() && response.command_id() != CommandId::GenericNack {
                Ok(response)
            } else {
                Err(SmppError::RequestRejected {
                    request: Box::new(pending.request),
                    response: Box::new(response),
                })
            };
        // The waiter may have given up already
        let _ = pending.resolver.send(outcome);
    }
}

/// The caller's end of a tracked request
pub struct ResponseFuture {
    sequence_number: u32,
    expires_at: Instant,
    receiver: oneshot::Receiver<SmppResult<Pdu>>,
    registry: PendingRequests,
}

impl ResponseFuture {
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Waits for the outcome, enforcing the entry's expiry even when no sweep runs
    pub async fn wait(mut self) -> SmppResult<Pdu> {
        match tokio::time::timeout_at(self.expires_at, &mut self.receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(SmppError::ConnectionClosed),
            Err(_) => {
                if self.registry.remove(self.sequence_number).is_some() {
                    return Err(SmppError::Timeout {
                        sequence_number: self.sequence_number,
                    });
                }
                // Someone else removed the entry first and owns the outcome
                self.receiver
                    .await
                    .unwrap_or(Err(SmppError::ConnectionClosed))
            }
        }
    }
}

// ABOUTME: SMPP session over one transport connection: state machine, correlation and inbound dispatch
// ABOUTME: A single reader task decodes in order; senders serialise on the writer mutex

use crate::client::error::{SmppError, SmppResult};
use crate::client::events::{SessionEvent, SessionState};
use crate::client::pending::{PendingRequests, ResponseFuture};
use crate::client::segmentation::{self, SegmentationStrategy};
use crate::client::shutdown::{Shutdown, ShutdownSignal};
use crate::client::transport::Transport;
use crate::client::types::{BindCredentials, SessionConfig, SmsMessage};
use crate::codec::{CodecError, SequenceGenerator};
use crate::connection::{FrameReader, FrameWriter, Inbound};
use crate::datatypes::{CommandId, MessageId};
use crate::pdu::{Body, Pdu};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Application callback for an inbound request.
///
/// Returning `Some(response)` has the session send it; `None` means the
/// application answers later through [`Session::send`].
pub type RequestHandler = Arc<dyn Fn(&Pdu) -> Option<Pdu> + Send + Sync>;

type Writer<S> = Arc<tokio::sync::Mutex<FrameWriter<WriteHalf<S>>>>;

/// Writer, reader task and responder task taken off a link that is being torn down
type Detached<S> = (Option<Writer<S>>, Option<JoinHandle<()>>, Option<JoinHandle<()>>);

// Bounds how long disconnect waits for a writer stuck behind a stalled peer
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// Automatic responses the reader may queue ahead of a stalled writer
const RESPONSE_QUEUE: usize = 64;

struct Link<S> {
    state: SessionState,
    /// Bumped on every connect so a stale reader cannot touch a newer link
    connection_id: u64,
    writer: Option<Writer<S>>,
    reader: Option<JoinHandle<()>>,
    responder: Option<JoinHandle<()>>,
}

struct Inner<T: Transport> {
    transport: T,
    config: SessionConfig,
    sequence: SequenceGenerator,
    pending: PendingRequests,
    link: Mutex<Link<T::Stream>>,
    handlers: RwLock<HashMap<CommandId, RequestHandler>>,
    events: broadcast::Sender<SessionEvent>,
    state_tx: watch::Sender<SessionState>,
    shutdown: Shutdown,
    last_outbound: Mutex<Instant>,
}

/// An SMPP v3.4 ESME session.
///
/// Cheap to clone; clones share the connection, the sequence counter and
/// the pending-request registry. Sending is safe from many tasks at once.
///
/// ```no_run
/// use smpp_esme::client::{BindCredentials, Session, SessionConfig, SmsMessage, TcpTransport};
///
/// # async fn run() -> smpp_esme::client::SmppResult<()> {
/// let session = Session::new(TcpTransport::new("localhost:2775"), SessionConfig::default());
/// session.connect().await?;
/// session.bind(&BindCredentials::transceiver("esme", "secret")?).await?;
///
/// let sms = SmsMessage::new("447700900123", "INFO", "Hello")?;
/// let message_id = session.submit(&sms).await?;
/// println!("accepted as {message_id}");
///
/// session.unbind().await?;
/// session.disconnect().await
/// # }
/// ```
pub struct Session<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (state_tx, _) = watch::channel(SessionState::Inactive);
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                sequence: SequenceGenerator::new(),
                pending: PendingRequests::new(),
                link: Mutex::new(Link {
                    state: SessionState::Inactive,
                    connection_id: 0,
                    writer: None,
                    reader: None,
                    responder: None,
                }),
                handlers: RwLock::new(HashMap::new()),
                events,
                state_tx,
                shutdown: Shutdown::new(),
                last_outbound: Mutex::new(Instant::now()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn state(&self) -> SessionState {
        self.link().state
    }

    /// Follows state transitions as they happen
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Resolves once the session reaches `target`
    pub async fn wait_for_state(&self, target: SessionState) {
        let mut states = self.watch_state();
        let _ = states.wait_for(|state| *state == target).await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// When a frame was last written, or the connection opened
    pub fn last_outbound(&self) -> Instant {
        *self
            .inner
            .last_outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs `handler` for inbound requests of `command_id`, replacing any previous one
    pub fn on_request<F>(&self, command_id: CommandId, handler: F)
    where
        F: Fn(&Pdu) -> Option<Pdu> + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command_id, Arc::new(handler));
    }

    pub fn remove_handler(&self, command_id: CommandId) -> bool {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&command_id)
            .is_some()
    }

    /// Opens the transport and starts the reader task
    pub async fn connect(&self) -> SmppResult<()> {
        if self.inner.shutdown.is_triggered() {
            return Err(SmppError::Cancelled);
        }
        let state = self.state();
        if state != SessionState::Inactive {
            return Err(SmppError::InvalidState {
                operation: "connect",
                state,
            });
        }

        let stream = self.inner.transport.connect().await?;
        let (read_half, write_half) = tokio::io::split(stream);

        let mut link = self.link();
        if link.state != SessionState::Inactive {
            // Another caller connected while we were dialing
            return Err(SmppError::InvalidState {
                operation: "connect",
                state: link.state,
            });
        }
        link.connection_id += 1;
        let connection_id = link.connection_id;
        link.writer = Some(Arc::new(tokio::sync::Mutex::new(FrameWriter::new(
            write_half,
        ))));
        let (responses, queue) = mpsc::channel(RESPONSE_QUEUE);
        link.responder = Some(tokio::spawn(self.clone().answer_loop(connection_id, queue)));
        link.reader = Some(tokio::spawn(self.clone().read_loop(
            connection_id,
            FrameReader::new(read_half),
            responses,
        )));
        self.set_state(&mut link, SessionState::Connected);
        drop(link);

        self.touch();
        Ok(())
    }

    /// Closes the transport. Pending requests fail with `ConnectionClosed`.
    pub async fn disconnect(&self) -> SmppResult<()> {
        if let Some(detached) = self.detach(None, "disconnect requested") {
            self.close_link(detached, true).await;
        }
        Ok(())
    }

    /// Cancels in-flight waits and closes the transport for good.
    ///
    /// The session refuses to connect again afterwards.
    pub async fn close(&self) {
        self.inner.shutdown.trigger();
        let _ = self.disconnect().await;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_triggered()
    }

    /// Fires once [`Session::close`] has been called
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.inner.shutdown.signal()
    }

    /// Sends the bind request described by `credentials` and waits for the answer.
    ///
    /// Any failure tears the transport down, leaving the session `Inactive`.
    pub async fn bind(&self, credentials: &BindCredentials) -> SmppResult<Pdu> {
        let result = self
            .request(credentials.to_pdu(), self.inner.config.bind_timeout)
            .await;
        match &result {
            Ok(response) => info!(
                "Bound as {:?} {} ({})",
                credentials.bind_type, credentials.system_id, response.body
            ),
            Err(e) => {
                warn!("Bind as {} failed: {}", credentials.system_id, e);
                if self.state() == SessionState::Binding {
                    let _ = self.disconnect().await;
                }
            }
        }
        result
    }

    /// Unbinds and returns to `Connected`; the transport stays open
    pub async fn unbind(&self) -> SmppResult<Pdu> {
        let result = self
            .request(Pdu::new(Body::Unbind), self.inner.config.response_timeout)
            .await;
        if let Err(e) = &result {
            warn!("Unbind failed: {}", e);
            if self.state() == SessionState::Unbinding {
                let _ = self.disconnect().await;
            }
        }
        result
    }

    pub async fn enquire_link(&self) -> SmppResult<Pdu> {
        self.request(Pdu::new(Body::EnquireLink), self.inner.config.response_timeout)
            .await
    }

    /// Writes `pdu` without waiting for any response.
    ///
    /// A request with sequence number 0 is numbered by the session; the
    /// number used is returned. A hand-picked number still awaiting its
    /// response is refused with `InvalidData`.
    pub async fn send(&self, pdu: Pdu) -> SmppResult<u32> {
        let (sequence_number, _) = self.write(pdu, None).await?;
        Ok(sequence_number)
    }

    /// Sends a request and waits for its response.
    ///
    /// A non-OK status or a generic_nack fails with `RequestRejected`.
    pub async fn send_and_wait(&self, request: Pdu) -> SmppResult<Pdu> {
        self.request(request, self.inner.config.response_timeout)
            .await
    }

    /// Sends every request, then waits for all of them under one deadline.
    ///
    /// Responses come back in request order. Unanswered requests are reported
    /// by index in `BatchTimeout`; rejected ones as pairs in `RequestsRejected`.
    pub async fn send_and_wait_all(&self, requests: Vec<Pdu>) -> SmppResult<Vec<Pdu>> {
        let deadline = Instant::now() + self.inner.config.response_timeout;
        let mut futures: Vec<ResponseFuture> = Vec::with_capacity(requests.len());

        for request in requests {
            let sent = match expects_response(&request) {
                Ok(()) => self.write(request, Some(deadline)).await,
                Err(e) => Err(e),
            };
            match sent {
                Ok((_, Some(future))) => futures.push(future),
                Ok((sequence_number, None)) => {
                    futures.iter().for_each(|f| {
                        self.inner.pending.remove(f.sequence_number());
                    });
                    self.inner.pending.remove(sequence_number);
                    return Err(SmppError::ConnectionClosed);
                }
                Err(e) => {
                    futures.iter().for_each(|f| {
                        self.inner.pending.remove(f.sequence_number());
                    });
                    return Err(e);
                }
            }
        }

        let sequence_numbers: Vec<u32> = futures.iter().map(|f| f.sequence_number()).collect();
        let collect = async move {
            let mut responses = Vec::with_capacity(futures.len());
            let mut rejected = Vec::new();
            let mut outstanding = Vec::new();
            let mut closed = false;

            for (index, future) in futures.into_iter().enumerate() {
                match future.wait().await {
                    Ok(response) => responses.push(response),
                    Err(SmppError::RequestRejected { request, response }) => {
                        rejected.push((*request, *response))
                    }
                    Err(SmppError::Timeout { .. }) => outstanding.push(index),
                    Err(SmppError::ConnectionClosed) => closed = true,
                    Err(other) => return Err(other),
                }
            }

            if closed {
                Err(SmppError::ConnectionClosed)
            } else if !outstanding.is_empty() {
                Err(SmppError::BatchTimeout { outstanding })
            } else if !rejected.is_empty() {
                Err(SmppError::RequestsRejected { pairs: rejected })
            } else {
                Ok(responses)
            }
        };

        let mut shutdown = self.inner.shutdown.signal();
        tokio::select! {
            outcome = collect => outcome,
            _ = shutdown.wait() => {
                for sequence_number in sequence_numbers {
                    self.inner.pending.remove(sequence_number);
                }
                Err(SmppError::Cancelled)
            }
        }
    }

    /// Splits `message` with `strategy` and sends every piece built from `template`.
    ///
    /// Returns one message id per PDU written, in segment order.
    pub async fn send_long_message(
        &self,
        template: &Pdu,
        message: &[u8],
        strategy: SegmentationStrategy,
    ) -> SmppResult<Vec<MessageId>> {
        let segmented = segmentation::segment(template, message, strategy, rand::random())?;
        debug!(
            "Sending {} octets as {} PDU(s) with reference {}",
            message.len(),
            segmented.len(),
            segmented.reference
        );

        let responses = self.send_and_wait_all(segmented.pdus).await?;
        Ok(responses
            .iter()
            .map(|response| response.message_id().copied().unwrap_or_default())
            .collect())
    }

    /// Submits `sms`, segmenting it when needed.
    ///
    /// Returns the SMSC message id of the first PDU; use
    /// [`Session::send_long_message`] to get the id of every segment.
    pub async fn submit(&self, sms: &SmsMessage) -> SmppResult<MessageId> {
        let ids = self
            .send_long_message(&sms.to_template(), &sms.text, sms.options.segmentation)
            .await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| SmppError::InvalidData("no PDU was sent".into()))
    }

    /// Sends `request` tracked with an explicit response timeout
    pub(crate) async fn request(&self, request: Pdu, timeout: Duration) -> SmppResult<Pdu> {
        expects_response(&request)?;
        let (_, response) = self
            .write(request, Some(Instant::now() + timeout))
            .await?;
        let response = response.ok_or(SmppError::ConnectionClosed)?;

        let sequence_number = response.sequence_number();
        let mut shutdown = self.inner.shutdown.signal();
        tokio::select! {
            outcome = response.wait() => outcome,
            _ = shutdown.wait() => {
                self.inner.pending.remove(sequence_number);
                Err(SmppError::Cancelled)
            }
        }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Guard, number, register and write one PDU.
    ///
    /// The guard and any state transition run synchronously before the
    /// writer is taken, so a refused PDU never reaches the wire.
    async fn write(
        &self,
        mut pdu: Pdu,
        expires_at: Option<Instant>,
    ) -> SmppResult<(u32, Option<ResponseFuture>)> {
        let mut frame = pdu.to_bytes()?.to_vec();
        let chosen = pdu.is_request() && pdu.sequence_number != 0;
        if chosen && self.inner.pending.contains(pdu.sequence_number) {
            return Err(in_flight(pdu.sequence_number));
        }

        let (writer, connection_id, previous) = {
            let mut link = self.link();
            let next = admit(link.state, &pdu)?;
            let writer = link.writer.clone().ok_or(SmppError::ConnectionClosed)?;
            let previous = link.state;
            if let Some(next) = next {
                self.set_state(&mut link, next);
            }
            (writer, link.connection_id, previous)
        };

        let mut writer = writer.lock().await;
        if pdu.is_request() && pdu.sequence_number == 0 {
            // Skip numbers a caller picked by hand and is still waiting on
            pdu.sequence_number = self.inner.sequence.next();
            while self.inner.pending.contains(pdu.sequence_number) {
                pdu.sequence_number = self.inner.sequence.next();
            }
            frame[12..16].copy_from_slice(&pdu.sequence_number.to_be_bytes());
        }
        let sequence_number = pdu.sequence_number;
        debug!("Sending {}", pdu);

        let tracked = match expires_at {
            Some(expires_at) => self
                .inner
                .pending
                .track(sequence_number, pdu, expires_at)
                .map(Some),
            None if chosen && self.inner.pending.contains(sequence_number) => {
                Err(in_flight(sequence_number))
            }
            None => Ok(None),
        };
        let response = match tracked {
            Ok(response) => response,
            Err(e) => {
                // Lost a race for a hand-picked number; undo the guard's transition
                drop(writer);
                self.restore_state(connection_id, previous);
                return Err(e);
            }
        };

        if let Err(e) = writer.write_frame(&frame).await {
            drop(writer);
            error!("Write of seq={} failed: {}", sequence_number, e);
            if response.is_some() {
                self.inner.pending.remove(sequence_number);
            }
            if let Some(detached) = self.detach(Some(connection_id), &format!("write failed: {e}"))
            {
                self.close_link(detached, true).await;
            }
            return Err(SmppError::Connection(e));
        }
        drop(writer);

        self.touch();
        Ok((sequence_number, response))
    }

    async fn read_loop(
        self,
        connection_id: u64,
        mut reader: FrameReader<ReadHalf<T::Stream>>,
        responses: mpsc::Sender<Pdu>,
    ) {
        let mut shutdown = self.inner.shutdown.signal();
        let mut sweep = tokio::time::interval(self.inner.config.effective_sweep_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            if !self.is_current(connection_id) {
                return;
            }
            tokio::select! {
                _ = shutdown.wait() => break "session closed".to_string(),
                _ = sweep.tick() => {
                    let expired = self.inner.pending.evict_expired();
                    if expired > 0 {
                        debug!("Expired {} pending request(s)", expired);
                    }
                }
                frame = reader.read_frame() => match frame {
                    Ok(Some(Inbound::Pdu(pdu))) => {
                        self.dispatch(connection_id, pdu, &responses).await
                    }
                    Ok(Some(Inbound::Malformed { nack, was_response, error })) => {
                        self.handle_malformed(nack, was_response, error, &responses).await
                    }
                    Ok(None) => break "closed by peer".to_string(),
                    Err(e) => {
                        error!("Read failed: {}", e);
                        break e.to_string();
                    }
                },
            }
        };

        // Our own handle is dropped, not aborted
        if let Some(detached) = self.detach(Some(connection_id), &reason) {
            self.close_link(detached, false).await;
        }
    }

    /// Writes the reader's automatic responses for one connection.
    ///
    /// Runs apart from the reader so a write stalled on a slow peer only
    /// holds up further responses, not response correlation. Once
    /// `RESPONSE_QUEUE` answers are waiting the reader blocks too.
    async fn answer_loop(self, connection_id: u64, mut queue: mpsc::Receiver<Pdu>) {
        while let Some(response) = queue.recv().await {
            if !self.is_current(connection_id) {
                break;
            }
            let (id, sequence_number) = (response.command_id(), response.sequence_number);
            if let Err(e) = self.send(response).await {
                warn!("Could not send {} seq={}: {}", id, sequence_number, e);
            }
        }
    }

    async fn dispatch(&self, connection_id: u64, pdu: Pdu, responses: &mpsc::Sender<Pdu>) {
        debug!("Received {}", pdu);
        self.emit(SessionEvent::Inbound(pdu.clone()));

        if pdu.is_response() {
            self.handle_response(connection_id, pdu).await;
        } else {
            self.handle_request(connection_id, pdu, responses).await;
        }
    }

    async fn handle_response(&self, connection_id: u64, pdu: Pdu) {
        let id = pdu.command_id();
        if id == CommandId::EnquireLinkResp && !pdu.command_status.is_ok() {
            warn!(
                "enquire_link_resp seq={} carried {:?}",
                pdu.sequence_number, pdu.command_status
            );
        }

        // State only moves for the response to a bind or unbind we actually sent
        let Some(claimed) = self.inner.pending.claim(&pdu) else {
            if id.is_bind_response() || id == CommandId::UnbindResp {
                let state = self.state();
                warn!("{} seq={} answers nothing we sent ({})", id, pdu.sequence_number, state);
                self.emit(SessionEvent::ProtocolViolation {
                    pdu: pdu.clone(),
                    state,
                });
            }
            debug!("Unsolicited {}", pdu);
            self.emit(SessionEvent::UnsolicitedResponse(pdu));
            return;
        };

        let request_id = claimed.request_id();
        let mut bind_rejected = false;
        if request_id.is_bind() || request_id == CommandId::Unbind {
            let expected = if request_id.is_bind() {
                SessionState::Binding
            } else {
                SessionState::Unbinding
            };
            let mut link = self.link();
            if link.connection_id == connection_id {
                if link.state != expected {
                    warn!("{} received while {}", id, link.state);
                    self.emit(SessionEvent::ProtocolViolation {
                        pdu: pdu.clone(),
                        state: link.state,
                    });
                } else if request_id == CommandId::Unbind {
                    if id == CommandId::UnbindResp {
                        self.set_state(&mut link, SessionState::Connected);
                    }
                } else if id != CommandId::GenericNack && pdu.command_status.is_ok() {
                    // Before completing, so the caller of bind sees Bound on return
                    self.set_state(&mut link, SessionState::Bound);
                } else {
                    bind_rejected = true;
                }
            }
        }

        claimed.complete(pdu);

        if bind_rejected {
            if let Some(detached) = self.detach(Some(connection_id), "bind rejected") {
                self.close_link(detached, false).await;
            }
        }
    }

    async fn handle_request(&self, connection_id: u64, pdu: Pdu, responses: &mpsc::Sender<Pdu>) {
        let id = pdu.command_id();
        let handler = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();

        let response = match handler {
            Some(handler) => handler(&pdu).map(|mut response| {
                if response.sequence_number == 0 {
                    response.sequence_number = pdu.sequence_number;
                }
                response
            }),
            None => {
                if matches!(id, CommandId::Outbind | CommandId::AlertNotification) {
                    info!("{} from SMSC", pdu);
                }
                pdu.default_response()
            }
        };

        if let Some(response) = response {
            if responses.send(response).await.is_err() {
                warn!("Could not answer {} seq={}: link closed", id, pdu.sequence_number);
            }
        }

        if id == CommandId::Unbind {
            let mut link = self.link();
            if link.connection_id == connection_id && link.state == SessionState::Bound {
                info!("SMSC unbound the session");
                self.set_state(&mut link, SessionState::Connected);
            }
        }
    }

    async fn handle_malformed(
        &self,
        nack: Pdu,
        was_response: bool,
        error: CodecError,
        responses: &mpsc::Sender<Pdu>,
    ) {
        warn!(
            "Undecodable frame seq={}: {}",
            nack.sequence_number, error
        );
        self.emit(SessionEvent::DecodeError {
            sequence_number: nack.sequence_number,
            was_response,
            error: error.to_string(),
        });

        if was_response {
            if let Err(nack) = self.inner.pending.resolve(nack) {
                debug!(
                    "No pending request for undecodable response seq={}",
                    nack.sequence_number
                );
            }
        } else if responses.send(nack).await.is_err() {
            warn!("Could not send generic_nack: link closed");
        }
    }

    /// Marks the link dead and fails everything waiting on it.
    ///
    /// With `Some(id)` nothing happens unless that connection is still the
    /// current one. Returns the writer and reader for the caller to close.
    fn detach(&self, connection_id: Option<u64>, reason: &str) -> Option<Detached<T::Stream>> {
        let mut link = self.link();
        if connection_id.is_some_and(|id| id != link.connection_id) {
            return None;
        }
        if link.state == SessionState::Inactive && link.writer.is_none() {
            return None;
        }

        let detached = (link.writer.take(), link.reader.take(), link.responder.take());
        self.set_state(&mut link, SessionState::Inactive);
        drop(link);

        let failed = self.inner.pending.close_all();
        info!(
            "Transport closed ({}), {} pending request(s) failed",
            reason, failed
        );
        self.emit(SessionEvent::Disconnected {
            reason: reason.to_string(),
        });
        Some(detached)
    }

    async fn close_link(
        &self,
        (writer, reader, responder): Detached<T::Stream>,
        abort_reader: bool,
    ) {
        if let Some(reader) = reader {
            if abort_reader {
                reader.abort();
            }
        }
        if let Some(writer) = writer {
            let close = async { writer.lock().await.shutdown().await };
            match tokio::time::timeout(CLOSE_TIMEOUT, close).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Shutdown of write half failed: {}", e),
                Err(_) => debug!("Shutdown of write half timed out"),
            }
        }
        // Last, since the responder may be the task closing the link
        if let Some(responder) = responder {
            responder.abort();
        }
    }

    fn set_state(&self, link: &mut Link<T::Stream>, to: SessionState) {
        let from = link.state;
        if from == to {
            return;
        }
        link.state = to;
        self.inner.state_tx.send_replace(to);
        info!("Session {} -> {}", from, to);
        self.emit(SessionEvent::StateChanged { from, to });
    }

    fn restore_state(&self, connection_id: u64, previous: SessionState) {
        let mut link = self.link();
        if link.connection_id == connection_id && link.state != previous {
            self.set_state(&mut link, previous);
        }
    }

    fn is_current(&self, connection_id: u64) -> bool {
        self.link().connection_id == connection_id
    }

    fn touch(&self) {
        *self
            .inner
            .last_outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn link(&self) -> MutexGuard<'_, Link<T::Stream>> {
        self.inner
            .link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// State guard: whether `pdu` may be written in `state`, and the state it moves to
fn admit(state: SessionState, pdu: &Pdu) -> SmppResult<Option<SessionState>> {
    let id = pdu.command_id();
    let refused = || SmppError::InvalidState {
        operation: id.name(),
        state,
    };

    if id.is_response() {
        return if state.has_transport() {
            Ok(None)
        } else {
            Err(refused())
        };
    }
    match state {
        SessionState::Connected if id.is_bind() => Ok(Some(SessionState::Binding)),
        SessionState::Bound if id == CommandId::Unbind => Ok(Some(SessionState::Unbinding)),
        SessionState::Bound if !id.is_bind() => Ok(None),
        _ => Err(refused()),
    }
}

fn in_flight(sequence_number: u32) -> SmppError {
    SmppError::InvalidData(format!("sequence number {sequence_number} is already in flight"))
}

fn expects_response(request: &Pdu) -> SmppResult<()> {
    let id = request.command_id();
    if id.response_id().is_none() {
        return Err(SmppError::InvalidData(format!("{id} has no response to wait for")));
    }
    Ok(())
}

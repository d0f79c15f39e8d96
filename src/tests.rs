//! Session scenarios against an in-memory SMSC

use crate::client::keepalive;
use crate::client::{
    BindCredentials, KeepAliveConfig, RetryPlan, SegmentationStrategy, Session, SessionConfig,
    SessionEvent, SessionState, Shutdown, SmppError, SmsMessage, Supervisor, Transport,
};
use crate::connection::{FrameReader, FrameWriter, Inbound};
use crate::datatypes::{CommandId, CommandStatus, DataCoding, MessageId};
use crate::pdu::{BindResp, Body, DeliverSm, MessageIdResp, Pdu, SubmitSm};
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

/// Hands the SMSC end of every connection to the test
#[derive(Clone)]
struct DuplexTransport {
    peers: mpsc::UnboundedSender<DuplexStream>,
    refusals: Arc<AtomicU32>,
    attempts: Arc<Mutex<Vec<Instant>>>,
    buffer: usize,
}

impl DuplexTransport {
    fn new() -> (Self, mpsc::UnboundedReceiver<DuplexStream>) {
        Self::with_buffer(64 * 1024)
    }

    /// Each direction of a connection holds at most `buffer` unread bytes
    fn with_buffer(buffer: usize) -> (Self, mpsc::UnboundedReceiver<DuplexStream>) {
        let (peers, accepted) = mpsc::unbounded_channel();
        let transport = Self {
            peers,
            refusals: Arc::new(AtomicU32::new(0)),
            attempts: Arc::new(Mutex::new(Vec::new())),
            buffer,
        };
        (transport, accepted)
    }

    /// The next `count` connects fail
    fn refuse(&self, count: u32) {
        self.refusals.store(count, Ordering::SeqCst);
    }

    fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

impl Transport for DuplexTransport {
    type Stream = DuplexStream;

    async fn connect(&self) -> io::Result<DuplexStream> {
        self.attempts.lock().unwrap().push(Instant::now());
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(io::ErrorKind::ConnectionRefused.into());
        }

        let (client, server) = tokio::io::duplex(self.buffer);
        self.peers
            .send(server)
            .map_err(|_| io::Error::from(io::ErrorKind::ConnectionRefused))?;
        Ok(client)
    }
}

/// Scripted SMSC side of one connection
struct Smsc {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: FrameWriter<WriteHalf<DuplexStream>>,
}

impl Smsc {
    async fn accept(accepted: &mut mpsc::UnboundedReceiver<DuplexStream>) -> Self {
        let stream = accepted.recv().await.expect("session never connected");
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
        }
    }

    async fn recv(&mut self) -> Pdu {
        match self.reader.read_frame().await {
            Ok(Some(Inbound::Pdu(pdu))) => pdu,
            other => panic!("expected a PDU, got {other:?}"),
        }
    }

    async fn send(&mut self, pdu: &Pdu) {
        self.writer.write_pdu(pdu).await.unwrap();
    }

    async fn send_raw(&mut self, frame: &[u8]) {
        self.writer.write_frame(frame).await.unwrap();
    }

    /// Answers the next request, which must be a bind
    async fn accept_bind(&mut self) -> Pdu {
        let bind = self.recv().await;
        assert!(bind.command_id().is_bind(), "expected bind, got {bind}");
        let resp = BindResp {
            system_id: "SMSC".parse().unwrap(),
        };
        let body = match bind.command_id() {
            CommandId::BindTransmitter => Body::BindTransmitterResp(resp),
            CommandId::BindReceiver => Body::BindReceiverResp(resp),
            _ => Body::BindTransceiverResp(resp),
        };
        self.send(&bind.respond(body)).await;
        bind
    }
}

/// Answers every request with its default response until the link closes
async fn answer_everything(stream: DuplexStream) {
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);
    while let Ok(Some(Inbound::Pdu(pdu))) = reader.read_frame().await {
        if let Some(response) = pdu.default_response() {
            if writer.write_pdu(&response).await.is_err() {
                break;
            }
        }
    }
}

fn spawn_auto_smsc(mut accepted: mpsc::UnboundedReceiver<DuplexStream>) {
    tokio::spawn(async move {
        while let Some(stream) = accepted.recv().await {
            tokio::spawn(answer_everything(stream));
        }
    });
}

fn credentials() -> BindCredentials {
    BindCredentials::transceiver("esme", "secret").unwrap()
}

fn submit(text: &str) -> Pdu {
    let submit = SubmitSm {
        source_addr: "INFO".parse().unwrap(),
        destination_addr: "447700900123".parse().unwrap(),
        short_message: text.parse().unwrap(),
        ..Default::default()
    };
    Pdu::new(Body::SubmitSm(Box::new(submit)))
}

fn submit_resp(request: &Pdu, message_id: &str) -> Pdu {
    request.respond(Body::SubmitSmResp(MessageIdResp {
        message_id: message_id.parse().unwrap(),
    }))
}

fn deliver(sequence_number: u32) -> Pdu {
    let deliver = DeliverSm {
        source_addr: "447700900123".parse().unwrap(),
        destination_addr: "INFO".parse().unwrap(),
        short_message: "reply".parse().unwrap(),
        ..Default::default()
    };
    Pdu::new(Body::DeliverSm(Box::new(deliver))).with_sequence_number(sequence_number)
}

async fn bound_session(config: SessionConfig) -> (Session<DuplexTransport>, Smsc) {
    bound_over(DuplexTransport::new(), config).await
}

async fn bound_over(
    (transport, mut accepted): (DuplexTransport, mpsc::UnboundedReceiver<DuplexStream>),
    config: SessionConfig,
) -> (Session<DuplexTransport>, Smsc) {
    let session = Session::new(transport, config);
    session.connect().await.unwrap();
    let mut smsc = Smsc::accept(&mut accepted).await;

    let credentials = credentials();
    let (bound, _) = tokio::join!(session.bind(&credentials), smsc.accept_bind());
    bound.unwrap();
    (session, smsc)
}

async fn next_matching<F>(events: &mut broadcast::Receiver<SessionEvent>, mut wanted: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    loop {
        let event = events.recv().await.unwrap();
        if wanted(&event) {
            return event;
        }
    }
}

#[tokio::test]
async fn bind_transceiver_over_duplex() {
    let (transport, mut accepted) = DuplexTransport::new();
    let session = Session::new(transport, SessionConfig::default());
    let mut events = session.subscribe();

    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::Connected);
    let mut smsc = Smsc::accept(&mut accepted).await;

    let credentials = credentials();
    let (bound, bind) = tokio::join!(session.bind(&credentials), smsc.accept_bind());
    let response = bound.unwrap();

    assert_eq!(session.state(), SessionState::Bound);
    assert_eq!(bind.command_id(), CommandId::BindTransceiver);
    assert_eq!(response.sequence_number, bind.sequence_number);
    match response.body {
        Body::BindTransceiverResp(resp) => assert_eq!(resp.system_id, "SMSC"),
        other => panic!("unexpected {other:?}"),
    }

    let mut transitions = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::StateChanged { from, to } = event {
            transitions.push((from, to));
        }
    }
    assert_eq!(
        transitions,
        vec![
            (SessionState::Inactive, SessionState::Connected),
            (SessionState::Connected, SessionState::Binding),
            (SessionState::Binding, SessionState::Bound),
        ]
    );
}

#[tokio::test]
async fn rejected_bind_tears_the_link_down() {
    let (transport, mut accepted) = DuplexTransport::new();
    let session = Session::new(transport, SessionConfig::default());
    session.connect().await.unwrap();
    let mut smsc = Smsc::accept(&mut accepted).await;

    let answer = async {
        let bind = smsc.recv().await;
        let reject = bind
            .respond(Body::BindTransceiverResp(BindResp::default()))
            .with_status(CommandStatus::InvalidPassword);
        smsc.send(&reject).await;
    };
    let credentials = credentials();
    let (bound, _) = tokio::join!(session.bind(&credentials), answer);

    let err = bound.unwrap_err();
    assert_eq!(
        err.rejection().map(|pdu| pdu.command_status),
        Some(CommandStatus::InvalidPassword)
    );
    session.wait_for_state(SessionState::Inactive).await;
}

#[tokio::test]
async fn guard_refuses_submit_before_bind_without_writing() {
    let (transport, mut accepted) = DuplexTransport::new();
    let session = Session::new(transport, SessionConfig::default());
    session.connect().await.unwrap();
    let mut smsc = Smsc::accept(&mut accepted).await;

    let err = session.send(submit("too early")).await.unwrap_err();
    assert!(matches!(
        err,
        SmppError::InvalidState {
            state: SessionState::Connected,
            ..
        }
    ));
    assert!(matches!(
        session.enquire_link().await,
        Err(SmppError::InvalidState { .. })
    ));
    assert_eq!(session.pending_requests(), 0);

    // The first bytes the SMSC ever sees are the bind
    let credentials = credentials();
    let (bound, bind) = tokio::join!(session.bind(&credentials), smsc.accept_bind());
    bound.unwrap();
    assert_eq!(bind.command_id(), CommandId::BindTransceiver);
}

#[tokio::test]
async fn requests_refused_without_transport() {
    let (transport, _accepted) = DuplexTransport::new();
    let session = Session::new(transport, SessionConfig::default());

    assert!(matches!(
        session.send_and_wait(submit("nobody home")).await,
        Err(SmppError::InvalidState {
            state: SessionState::Inactive,
            ..
        })
    ));
    assert!(matches!(
        session.bind(&credentials()).await,
        Err(SmppError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn disconnect_fails_pending_with_connection_closed() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;

    let waiter = tokio::spawn({
        let session = session.clone();
        async move { session.send_and_wait(submit("lost")).await }
    });
    let request = smsc.recv().await;
    assert_eq!(request.command_id(), CommandId::SubmitSm);
    assert_eq!(session.pending_requests(), 1);

    session.disconnect().await.unwrap();

    assert!(matches!(
        waiter.await.unwrap(),
        Err(SmppError::ConnectionClosed)
    ));
    assert_eq!(session.state(), SessionState::Inactive);
    assert_eq!(session.pending_requests(), 0);
}

#[tokio::test]
async fn peer_close_fails_pending_with_connection_closed() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    let mut events = session.subscribe();

    let waiter = tokio::spawn({
        let session = session.clone();
        async move { session.enquire_link().await }
    });
    smsc.recv().await;
    drop(smsc);

    assert!(matches!(
        waiter.await.unwrap(),
        Err(SmppError::ConnectionClosed)
    ));
    next_matching(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;
    assert_eq!(session.state(), SessionState::Inactive);
}

#[tokio::test]
async fn closed_session_refuses_to_reconnect() {
    let (session, _smsc) = bound_session(SessionConfig::default()).await;

    session.close().await;

    assert!(session.is_closed());
    assert_eq!(session.state(), SessionState::Inactive);
    assert!(matches!(session.connect().await, Err(SmppError::Cancelled)));
}

#[tokio::test]
async fn response_resolves_exactly_once() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    let mut events = session.subscribe();

    let answer = async {
        let request = smsc.recv().await;
        let resp = submit_resp(&request, "first");
        smsc.send(&resp).await;
        smsc.send(&submit_resp(&request, "second")).await;
        request.sequence_number
    };
    let (response, sequence_number) = tokio::join!(session.send_and_wait(submit("hi")), answer);

    assert_eq!(response.unwrap().message_id().unwrap(), "first");
    let duplicate =
        next_matching(&mut events, |e| matches!(e, SessionEvent::UnsolicitedResponse(_))).await;
    match duplicate {
        SessionEvent::UnsolicitedResponse(pdu) => {
            assert_eq!(pdu.sequence_number, sequence_number);
            assert_eq!(pdu.message_id().unwrap(), "second");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.pending_requests(), 0);
}

#[tokio::test]
async fn generic_nack_rejects_the_request() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;

    let answer = async {
        let request = smsc.recv().await;
        smsc.send(&Pdu::generic_nack(request.sequence_number, CommandStatus::SystemError))
            .await;
    };
    let (response, _) = tokio::join!(session.send_and_wait(submit("hi")), answer);

    match response.unwrap_err() {
        SmppError::RequestRejected { request, response } => {
            assert_eq!(request.command_id(), CommandId::SubmitSm);
            assert_eq!(response.command_id(), CommandId::GenericNack);
            assert_eq!(response.command_status, CommandStatus::SystemError);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn error_status_rejects_the_request() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;

    let answer = async {
        let request = smsc.recv().await;
        let resp = request
            .respond(Body::SubmitSmResp(MessageIdResp::default()))
            .with_status(CommandStatus::MessageQueueFull);
        smsc.send(&resp).await;
    };
    let (response, _) = tokio::join!(session.send_and_wait(submit("hi")), answer);

    let err = response.unwrap_err();
    assert_eq!(
        err.rejection().map(|pdu| pdu.command_status),
        Some(CommandStatus::MessageQueueFull)
    );
}

#[tokio::test(start_paused = true)]
async fn unanswered_request_times_out() {
    let config = SessionConfig::default().with_response_timeout(Duration::from_secs(5));
    let (session, mut smsc) = bound_session(config).await;

    let (response, request) = tokio::join!(session.send_and_wait(submit("hi")), smsc.recv());

    assert!(matches!(
        response,
        Err(SmppError::Timeout { sequence_number }) if sequence_number == request.sequence_number
    ));
    assert_eq!(session.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn batch_reports_outstanding_indices() {
    let config = SessionConfig::default().with_response_timeout(Duration::from_secs(5));
    let (session, mut smsc) = bound_session(config).await;

    let answer = async {
        let first = smsc.recv().await;
        let _second = smsc.recv().await;
        let third = smsc.recv().await;
        smsc.send(&submit_resp(&first, "a")).await;
        smsc.send(&submit_resp(&third, "c")).await;
    };
    let batch = vec![submit("one"), submit("two"), submit("three")];
    let (outcome, _) = tokio::join!(session.send_and_wait_all(batch), answer);

    match outcome {
        Err(SmppError::BatchTimeout { outstanding }) => assert_eq!(outstanding, vec![1]),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn batch_returns_responses_in_request_order() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;

    let answer = async {
        let first = smsc.recv().await;
        let second = smsc.recv().await;
        // Out of order on the wire
        smsc.send(&submit_resp(&second, "b")).await;
        smsc.send(&submit_resp(&first, "a")).await;
    };
    let batch = vec![submit("one"), submit("two")];
    let (outcome, _) = tokio::join!(session.send_and_wait_all(batch), answer);

    let ids: Vec<MessageId> = outcome
        .unwrap()
        .iter()
        .map(|pdu| *pdu.message_id().unwrap())
        .collect();
    let expected: Vec<MessageId> = vec!["a".parse().unwrap(), "b".parse().unwrap()];
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn inbound_deliver_sm_gets_default_response() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    let mut events = session.subscribe();

    smsc.send(&deliver(77)).await;
    let resp = smsc.recv().await;

    assert_eq!(resp.command_id(), CommandId::DeliverSmResp);
    assert_eq!(resp.sequence_number, 77);
    assert_eq!(resp.command_status, CommandStatus::Ok);

    let inbound = next_matching(&mut events, |e| matches!(e, SessionEvent::Inbound(_))).await;
    assert!(matches!(inbound, SessionEvent::Inbound(pdu) if pdu.sequence_number == 77));
}

#[tokio::test]
async fn registered_handler_answers_inbound_requests() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    session.on_request(CommandId::DeliverSm, |pdu| {
        Some(
            pdu.respond(Body::DeliverSmResp(MessageIdResp::default()))
                .with_status(CommandStatus::MessageQueueFull),
        )
    });

    smsc.send(&deliver(5)).await;
    let resp = smsc.recv().await;
    assert_eq!(resp.sequence_number, 5);
    assert_eq!(resp.command_status, CommandStatus::MessageQueueFull);

    // A handler returning None leaves the answer to the application
    session.on_request(CommandId::DeliverSm, |_| None);
    smsc.send(&deliver(6)).await;
    smsc.send(&Pdu::new(Body::EnquireLink).with_sequence_number(7))
        .await;
    let next = smsc.recv().await;
    assert_eq!(next.command_id(), CommandId::EnquireLinkResp);
    assert_eq!(next.sequence_number, 7);

    assert!(session.remove_handler(CommandId::DeliverSm));
}

#[tokio::test]
async fn inbound_unbind_returns_session_to_connected() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;

    smsc.send(&Pdu::new(Body::Unbind).with_sequence_number(40)).await;
    let resp = smsc.recv().await;

    assert_eq!(resp.command_id(), CommandId::UnbindResp);
    assert_eq!(resp.sequence_number, 40);
    session.wait_for_state(SessionState::Connected).await;
}

#[tokio::test]
async fn unbind_keeps_transport_open() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;

    let answer = async {
        let unbind = smsc.recv().await;
        assert_eq!(unbind.command_id(), CommandId::Unbind);
        smsc.send(&unbind.respond(Body::UnbindResp)).await;
    };
    let (unbound, _) = tokio::join!(session.unbind(), answer);

    unbound.unwrap();
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn bind_response_while_bound_is_a_protocol_violation() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    let mut events = session.subscribe();

    let stray = Pdu::new(Body::BindTransceiverResp(BindResp::default())).with_sequence_number(99);
    smsc.send(&stray).await;

    let violation =
        next_matching(&mut events, |e| matches!(e, SessionEvent::ProtocolViolation { .. })).await;
    assert!(matches!(
        violation,
        SessionEvent::ProtocolViolation {
            state: SessionState::Bound,
            ..
        }
    ));
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test(start_paused = true)]
async fn stray_bind_response_does_not_bind() {
    let (transport, mut accepted) = DuplexTransport::new();
    let config = SessionConfig::default().with_bind_timeout(Duration::from_secs(5));
    let session = Session::new(transport, config);
    let mut events = session.subscribe();
    session.connect().await.unwrap();
    let mut smsc = Smsc::accept(&mut accepted).await;

    let credentials = credentials();
    let answer = async {
        let bind = smsc.recv().await;
        // Right kind, wrong sequence number
        let stray = Pdu::new(Body::BindTransceiverResp(BindResp::default()))
            .with_sequence_number(bind.sequence_number + 1000);
        smsc.send(&stray).await;
        // Right sequence number, wrong kind
        smsc.send(&bind.respond(Body::BindTransmitterResp(BindResp::default())))
            .await;
    };
    let (bound, _) = tokio::join!(session.bind(&credentials), answer);

    assert!(matches!(bound, Err(SmppError::Timeout { .. })));
    assert_eq!(session.state(), SessionState::Inactive);

    let mut violations = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::StateChanged { to, .. } => assert_ne!(to, SessionState::Bound),
            SessionEvent::ProtocolViolation { state, .. } => {
                assert_eq!(state, SessionState::Binding);
                violations += 1;
            }
            _ => {}
        }
    }
    assert_eq!(violations, 2);
}

#[tokio::test]
async fn sequence_number_in_flight_is_refused() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;

    let first = tokio::spawn({
        let session = session.clone();
        async move {
            session
                .send_and_wait(submit("first").with_sequence_number(77))
                .await
        }
    });
    let request = smsc.recv().await;
    assert_eq!(request.sequence_number, 77);

    assert!(matches!(
        session
            .send_and_wait(submit("second").with_sequence_number(77))
            .await,
        Err(SmppError::InvalidData(_))
    ));
    assert!(matches!(
        session.send(submit("third").with_sequence_number(77)).await,
        Err(SmppError::InvalidData(_))
    ));

    smsc.send(&submit_resp(&request, "first-id")).await;
    let response = first.await.unwrap().unwrap();
    assert_eq!(response.sequence_number, 77);
    assert_eq!(session.state(), SessionState::Bound);
    assert_eq!(session.pending_requests(), 0);

    // Numbering carries on past the refused attempts
    let (response, request) = tokio::join!(session.send_and_wait(submit("fourth")), async {
        let request = smsc.recv().await;
        smsc.send(&submit_resp(&request, "fourth-id")).await;
        request
    });
    assert_eq!(response.unwrap().sequence_number, request.sequence_number);
    match &request.body {
        Body::SubmitSm(submit) => assert_eq!(submit.short_message.as_bytes(), b"fourth"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn stalled_responses_do_not_hold_up_correlation() {
    let (session, mut smsc) =
        bound_over(DuplexTransport::with_buffer(128), SessionConfig::default()).await;

    let exchange = async {
        let request = smsc.recv().await;
        // The SMSC stops reading, so the deliver_sm_resps back up
        for sequence_number in 1..=20 {
            smsc.send(&deliver(sequence_number)).await;
        }
        smsc.send(&submit_resp(&request, "late-reader")).await;
        request
    };
    let (response, request) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(session.send_and_wait(submit("hi")), exchange)
    })
    .await
    .expect("reader stalled behind its own responses");
    assert_eq!(response.unwrap().sequence_number, request.sequence_number);

    for sequence_number in 1..=20 {
        let resp = smsc.recv().await;
        assert_eq!(resp.command_id(), CommandId::DeliverSmResp);
        assert_eq!(resp.sequence_number, sequence_number);
    }
}

#[tokio::test(start_paused = true)]
async fn zero_sweep_interval_keeps_the_reader_alive() {
    let config = SessionConfig {
        sweep_interval: Duration::ZERO,
        response_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let (session, mut smsc) = bound_session(config).await;

    let (response, _) = tokio::join!(session.send_and_wait(submit("unanswered")), smsc.recv());
    assert!(matches!(response, Err(SmppError::Timeout { .. })));
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test]
async fn malformed_response_rejects_the_pending_request() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    let mut events = session.subscribe();

    let answer = async {
        let request = smsc.recv().await;
        // submit_sm_resp whose message_id never terminates
        let mut bad = Vec::new();
        bad.extend_from_slice(&20u32.to_be_bytes());
        bad.extend_from_slice(&0x8000_0004u32.to_be_bytes());
        bad.extend_from_slice(&0u32.to_be_bytes());
        bad.extend_from_slice(&request.sequence_number.to_be_bytes());
        bad.extend_from_slice(b"abcd");
        smsc.send_raw(&bad).await;
    };
    let (response, _) = tokio::join!(session.send_and_wait(submit("hi")), answer);

    match response.unwrap_err() {
        SmppError::RequestRejected { response, .. } => {
            assert_eq!(response.command_id(), CommandId::GenericNack)
        }
        other => panic!("unexpected {other:?}"),
    }
    let decode =
        next_matching(&mut events, |e| matches!(e, SessionEvent::DecodeError { .. })).await;
    assert!(matches!(
        decode,
        SessionEvent::DecodeError {
            was_response: true,
            ..
        }
    ));

    // The link survives
    let (pong, _) = tokio::join!(session.enquire_link(), async {
        let ping = smsc.recv().await;
        smsc.send(&ping.respond(Body::EnquireLinkResp)).await;
    });
    pong.unwrap();
}

#[tokio::test]
async fn malformed_request_is_answered_with_generic_nack() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;

    // deliver_sm whose service_type never terminates
    let mut bad = Vec::new();
    bad.extend_from_slice(&19u32.to_be_bytes());
    bad.extend_from_slice(&0x0000_0005u32.to_be_bytes());
    bad.extend_from_slice(&0u32.to_be_bytes());
    bad.extend_from_slice(&31u32.to_be_bytes());
    bad.extend_from_slice(b"CMT");
    smsc.send_raw(&bad).await;

    let nack = smsc.recv().await;
    assert_eq!(nack.command_id(), CommandId::GenericNack);
    assert_eq!(nack.sequence_number, 31);
    assert!(!nack.command_status.is_ok());
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test]
async fn long_message_goes_out_as_two_udh_segments() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    let text = vec![b'x'; 300];
    let template = submit("");

    let answer = async {
        let mut segments = Vec::new();
        for id in ["m1", "m2"] {
            let pdu = smsc.recv().await;
            smsc.send(&submit_resp(&pdu, id)).await;
            segments.push(pdu);
        }
        segments
    };
    let (ids, segments) = tokio::join!(
        session.send_long_message(&template, &text, SegmentationStrategy::Udh),
        answer
    );

    let ids = ids.unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], "m1");
    assert_eq!(ids[1], "m2");

    let mut reference = None;
    for (index, pdu) in segments.iter().enumerate() {
        let Body::SubmitSm(sm) = &pdu.body else {
            panic!("unexpected {pdu}");
        };
        assert!(sm.esm_class.has_udhi());
        let udh = &sm.short_message.as_bytes()[..6];
        assert_eq!(&udh[..3], &[0x05, 0x00, 0x03]);
        assert_eq!(udh[4], 2);
        assert_eq!(udh[5], index as u8 + 1);
        assert_eq!(*reference.get_or_insert(udh[3]), udh[3]);
    }
    assert_ne!(segments[0].sequence_number, segments[1].sequence_number);
}

#[tokio::test]
async fn short_text_is_submitted_whole() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    let sms = SmsMessage::builder()
        .to("447700900123")
        .from("INFO")
        .text(vec![b'y'; 100])
        .data_coding(DataCoding::SmscDefault)
        .build()
        .unwrap();

    let answer = async {
        let pdu = smsc.recv().await;
        smsc.send(&submit_resp(&pdu, "only")).await;
        pdu
    };
    let (id, pdu) = tokio::join!(session.submit(&sms), answer);

    assert_eq!(id.unwrap(), "only");
    let Body::SubmitSm(sm) = &pdu.body else {
        panic!("unexpected {pdu}");
    };
    assert!(!sm.esm_class.has_udhi());
    assert_eq!(sm.short_message.len(), 100);
    assert!(pdu.tlvs.is_empty());
}

#[tokio::test(start_paused = true)]
async fn keepalive_pings_an_idle_session() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    let shutdown = Shutdown::new();
    let bound_at = Instant::now();

    tokio::spawn(keepalive::run(
        session.clone(),
        KeepAliveConfig::new(Duration::from_secs(30)),
        shutdown.signal(),
    ));

    let ping = smsc.recv().await;
    assert_eq!(ping.command_id(), CommandId::EnquireLink);
    assert!(bound_at.elapsed() >= Duration::from_secs(30));
    smsc.send(&ping.respond(Body::EnquireLinkResp)).await;

    shutdown.trigger();
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test(start_paused = true)]
async fn keepalive_drops_a_silent_link() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    let mut events = session.subscribe();
    let shutdown = Shutdown::new();

    tokio::spawn(keepalive::run(
        session.clone(),
        KeepAliveConfig::new(Duration::from_secs(30))
            .with_timeout(Duration::from_secs(5))
            .with_max_failures(2),
        shutdown.signal(),
    ));
    // Swallow the pings without answering
    tokio::spawn(async move { while smsc.reader.read_frame().await.is_ok_and(|f| f.is_some()) {} });

    let failed =
        next_matching(&mut events, |e| matches!(e, SessionEvent::KeepAliveFailed { .. })).await;
    assert!(matches!(
        failed,
        SessionEvent::KeepAliveFailed {
            consecutive_failures: 2
        }
    ));
    session.wait_for_state(SessionState::Inactive).await;
    shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn supervisor_follows_retry_plan_then_resets() {
    let (transport, accepted) = DuplexTransport::new();
    spawn_auto_smsc(accepted);
    let dialer = transport.clone();

    let supervisor = Supervisor::new(Session::new(transport, SessionConfig::default()), credentials())
        .with_retry_plan(RetryPlan::new(
            [5, 15, 30, 60].map(Duration::from_secs).to_vec(),
        ))
        .with_keepalive(KeepAliveConfig::disabled());
    let session = supervisor.session().clone();
    let mut events = session.subscribe();

    supervisor.start().unwrap();
    assert!(matches!(supervisor.start(), Err(SmppError::AlreadyStarted)));
    session.wait_for_state(SessionState::Bound).await;

    // Link lost, and the SMSC refuses the next two connects
    dialer.refuse(2);
    let lost_at = Instant::now();
    session.disconnect().await.unwrap();

    let restored =
        next_matching(&mut events, |e| matches!(e, SessionEvent::Reconnected { .. })).await;
    assert!(matches!(restored, SessionEvent::Reconnected { attempts: 3 }));
    assert_eq!(session.state(), SessionState::Bound);

    let attempts = dialer.attempts();
    assert_eq!(attempts.len(), 4);
    let mut gaps = vec![attempts[1] - lost_at];
    gaps.extend(attempts[1..].windows(2).map(|pair| pair[1] - pair[0]));
    assert_eq!(gaps, [5, 15, 30].map(Duration::from_secs).to_vec());

    // After a successful bind the plan starts over
    let lost_again = Instant::now();
    session.disconnect().await.unwrap();
    next_matching(&mut events, |e| matches!(e, SessionEvent::Reconnected { attempts: 1 })).await;
    let attempts = dialer.attempts();
    assert_eq!(attempts.len(), 5);
    assert_eq!(attempts[4] - lost_again, Duration::from_secs(5));

    supervisor.stop().await.unwrap();
    assert!(!supervisor.is_running());
    assert_eq!(session.state(), SessionState::Inactive);
}

#[tokio::test(start_paused = true)]
async fn supervisor_reports_failed_attempts() {
    let (transport, accepted) = DuplexTransport::new();
    spawn_auto_smsc(accepted);
    transport.refuse(1);

    let supervisor = Supervisor::new(Session::new(transport, SessionConfig::default()), credentials())
        .with_keepalive(KeepAliveConfig::disabled());
    let mut events = supervisor.session().subscribe();
    supervisor.start().unwrap();

    let failed =
        next_matching(&mut events, |e| matches!(e, SessionEvent::ReconnectFailed { .. })).await;
    match failed {
        SessionEvent::ReconnectFailed {
            attempt,
            next_delay,
            ..
        } => {
            assert_eq!(attempt, 1);
            assert_eq!(next_delay, Duration::from_secs(5));
        }
        other => panic!("unexpected {other:?}"),
    }
    supervisor.session().wait_for_state(SessionState::Bound).await;
    supervisor.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn closing_the_session_ends_supervision() {
    let (transport, accepted) = DuplexTransport::new();
    spawn_auto_smsc(accepted);
    let dialer = transport.clone();

    let supervisor = Supervisor::new(Session::new(transport, SessionConfig::default()), credentials());
    let session = supervisor.session().clone();
    let mut events = session.subscribe();
    supervisor.start().unwrap();
    session.wait_for_state(SessionState::Bound).await;

    session.close().await;
    tokio::time::timeout(Duration::from_secs(60), async {
        while supervisor.is_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("supervisor kept running after close");

    // Past every delay in the retry plan
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(dialer.attempts().len(), 1);
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(
                event,
                SessionEvent::ReconnectFailed { .. } | SessionEvent::Reconnected { .. }
            ),
            "{event:?}"
        );
    }

    supervisor.stop().await.unwrap();
    assert!(matches!(supervisor.start(), Err(SmppError::Cancelled)));
}

#[tokio::test]
async fn disconnect_closes_the_smsc_side() {
    let (session, mut smsc) = bound_session(SessionConfig::default()).await;
    session.disconnect().await.unwrap();

    assert!(matches!(smsc.reader.read_frame().await, Ok(None)));
    assert!(matches!(
        session.send(submit("gone")).await,
        Err(SmppError::InvalidState {
            state: SessionState::Inactive,
            ..
        })
    ));
}

// ABOUTME: Long-running supervised SMPP client demonstrating reconnects, keep-alive and events
// ABOUTME: Shows how to keep an ESME bound unattended and react to inbound traffic

//! # Supervised SMPP Client
//!
//! This example runs a transceiver session under a `Supervisor` that:
//!
//! * Reconnects and rebinds after link loss following a retry plan
//! * Pings the SMSC with enquire_link when the link goes idle
//! * Logs every session event, including inbound deliver_sm
//! * Optionally submits a message on a timer, segmenting long text
//!
//! ## Usage
//!
//! ```bash
//! # Stay bound and log inbound traffic
//! cargo run --example managed_client -- --system-id test --password secret
//!
//! # With periodic SMS sending
//! cargo run --example managed_client -- \
//!   --system-id test --password secret \
//!   --to 123456789 --from 987654321 \
//!   --sms-interval 120
//! ```

use argh::FromArgs;
use smpp_esme::client::{
    BindCredentials, KeepAliveConfig, RetryPlan, SegmentationStrategy, SessionBuilder,
    SessionEvent, SmsMessage, TcpTransport,
};
use smpp_esme::datatypes::CommandId;
use smpp_esme::pdu::{Body, MessageIdResp};
use std::error::Error;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, sleep};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Supervised SMPP client with automatic reconnects
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: String,

    /// the password
    #[argh(option)]
    password: String,

    /// the hostname or IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// keep-alive interval in seconds (default: 30)
    #[argh(option)]
    keep_alive_interval: Option<u64>,

    /// maximum consecutive keep-alive failures before reconnecting (default: 3)
    #[argh(option)]
    max_failures: Option<u32>,

    /// how long to run the client in seconds (default: 300)
    #[argh(option)]
    run_duration: Option<u64>,

    /// interval between SMS sends in seconds (default: 60)
    #[argh(option)]
    sms_interval: Option<u64>,

    /// the recipient telephone number (no SMS sent if not provided)
    #[argh(option, short = 't')]
    to: Option<String>,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let run_duration = Duration::from_secs(cli_args.run_duration.unwrap_or(300));
    let sms_interval = Duration::from_secs(cli_args.sms_interval.unwrap_or(60));

    let mut keepalive =
        KeepAliveConfig::new(Duration::from_secs(cli_args.keep_alive_interval.unwrap_or(30)));
    if let Some(max_failures) = cli_args.max_failures {
        keepalive = keepalive.with_max_failures(max_failures);
    }

    let credentials = BindCredentials::transceiver(&cli_args.system_id, &cli_args.password)?;
    let supervisor = SessionBuilder::new()
        .keepalive(keepalive)
        .retry_plan(RetryPlan::default())
        .supervise(TcpTransport::new(format!("{host}:{port}")), credentials);
    let session = supervisor.session().clone();

    // Log deliveries before acknowledging them
    session.on_request(CommandId::DeliverSm, |pdu| {
        info!("Delivery: {}", pdu);
        Some(pdu.respond(Body::DeliverSmResp(MessageIdResp::default())))
    });

    let mut events = session.subscribe();
    supervisor.start()?;
    info!("Supervising {host}:{port} for {} seconds", run_duration.as_secs());

    let message = match (&cli_args.to, &cli_args.from) {
        (Some(to), Some(from)) => Some((to.clone(), from.clone())),
        _ => None,
    };
    let mut sms_timer = interval(sms_interval);
    let deadline = sleep(run_duration);
    tokio::pin!(deadline);
    let mut message_count = 0;

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Run duration elapsed, shutting down");
                break;
            }

            event = events.recv() => match event {
                Ok(SessionEvent::StateChanged { from, to }) => info!("Session {from} -> {to}"),
                Ok(SessionEvent::Reconnected { attempts }) => {
                    info!("Reconnected after {attempts} attempt(s)")
                }
                Ok(SessionEvent::ReconnectFailed { attempt, next_delay, error }) => {
                    warn!("Attempt {attempt} failed ({error}), next in {next_delay:?}")
                }
                Ok(SessionEvent::KeepAliveFailed { consecutive_failures }) => {
                    warn!("Keep-alive failed {consecutive_failures} times")
                }
                Ok(other) => debug!("Event: {:?}", other),
                Err(RecvError::Lagged(skipped)) => warn!("Dropped {skipped} events"),
                Err(RecvError::Closed) => break,
            },

            _ = sms_timer.tick(), if message.is_some() => {
                let Some((to, from)) = &message else { continue };
                message_count += 1;
                let text = format!("Test message #{message_count} from the managed client");
                let sms = SmsMessage::builder()
                    .to(to)
                    .from(from)
                    .text(text)
                    .segmentation(SegmentationStrategy::Udh)
                    .build()?;

                match session.submit(&sms).await {
                    Ok(message_id) => info!("Message {message_count} accepted, ID: {message_id}"),
                    Err(e) => error!("Message {message_count} failed: {e}"),
                }
            }
        }
    }

    supervisor.stop().await?;
    info!("Stopped after sending {message_count} message(s)");
    Ok(())
}

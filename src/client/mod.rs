// ABOUTME: SMPP ESME client module: session state machine, correlation, supervision and segmentation
// ABOUTME: Exports the session, its supporting types, builders and error types

//! SMPP Client Module
//!
//! An ESME-side SMPP v3.4 client built around a single [`Session`]:
//!
//! * **State machine** - requests are checked against the session state before
//!   a byte is written
//! * **Correlation** - every request gets a sequence number and resolves exactly
//!   once: with its response, a rejection, a timeout or link loss
//! * **Supervision** - [`Supervisor`] reconnects and rebinds after link loss,
//!   while keepalive pings detect dead links
//! * **Long messages** - text beyond one short message is split with UDH, SAR
//!   TLVs or a single message_payload
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smpp_esme::client::{SessionBuilder, SmsMessage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionBuilder::quick_transmitter(
//!     "localhost:2775",
//!     "system_id",
//!     "password"
//! ).await?;
//!
//! let message = SmsMessage::new("123456789", "987654321", "Hello!")?;
//! let message_id = session.submit(&message).await?;
//! println!("accepted as {message_id}");
//!
//! session.unbind().await?;
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Long-Running Sessions
//!
//! ```rust,no_run
//! use smpp_esme::client::{
//!     BindCredentials, KeepAliveConfig, SessionBuilder, SessionEvent, TcpTransport,
//! };
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let supervisor = SessionBuilder::new()
//!     .keepalive(KeepAliveConfig::new(Duration::from_secs(30)))
//!     .supervise(
//!         TcpTransport::new("localhost:2775"),
//!         BindCredentials::transceiver("system_id", "password")?,
//!     );
//!
//! let mut events = supervisor.session().subscribe();
//! supervisor.start()?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let SessionEvent::Inbound(pdu) = event {
//!         println!("received {pdu}");
//!     }
//! }
//! supervisor.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod events;
pub mod keepalive;
pub mod pending;
pub mod segmentation;
pub mod session;
pub mod shutdown;
pub mod supervisor;
pub mod transport;
pub mod types;

pub use builder::SessionBuilder;
pub use error::{SmppError, SmppResult};
pub use events::{SessionEvent, SessionState};
pub use keepalive::{KeepAliveConfig, KeepAliveManager, KeepAliveStatus};
pub use pending::{PendingRequests, ResponseFuture};
pub use segmentation::{SegmentationStrategy, SegmentedMessage, segment};
pub use session::{RequestHandler, Session};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use supervisor::{RetryPlan, Supervisor};
pub use transport::{TcpTransport, Transport};
pub use types::{BindCredentials, BindType, SessionConfig, SmsMessage, SmsMessageBuilder, SmsOptions};

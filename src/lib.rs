//! SMPP v3.4 client for External Short Message Entities (ESMEs).
//!
//! The crate is layered bottom-up:
//!
//! * [`datatypes`] - enumerations, bounded strings and the TLV table
//! * [`pdu`] - typed PDU bodies and the full-frame [`Pdu`] codec
//! * [`codec`] - header codec, wire primitives and sequence numbers
//! * [`connection`] - frame reader and writer over any async byte stream
//! * [`client`] - session state machine, correlation, supervision and
//!   long-message segmentation
//!
//! ## Basic SMS Sending
//!
//! ```rust,no_run
//! use smpp_esme::client::{SessionBuilder, SmsMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = SessionBuilder::quick_transmitter(
//!         "localhost:2775",
//!         "system_id",
//!         "password"
//!     ).await?;
//!
//!     let sms = SmsMessage::new("1234567890", "0987654321", "Hello, World!")?;
//!     let message_id = session.submit(&sms).await?;
//!     println!("Message sent with ID: {}", message_id);
//!
//!     session.unbind().await?;
//!     session.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Advanced Usage with Message Options
//!
//! ```rust,no_run
//! use smpp_esme::client::{SegmentationStrategy, SessionBuilder, SmsMessage};
//! use smpp_esme::datatypes::{DataCoding, NumericPlanIndicator, PriorityFlag, TypeOfNumber};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = SessionBuilder::quick_transceiver(
//!         "localhost:2775",
//!         "system_id",
//!         "password"
//!     ).await?;
//!
//!     let sms = SmsMessage::builder()
//!         .to("1234567890")
//!         .from("COMPANY")
//!         .text("A message long enough to need more than one short message ...")
//!         .priority(PriorityFlag::Level1)
//!         .data_coding(DataCoding::SmscDefault)
//!         .source_numbering(TypeOfNumber::Alphanumeric, NumericPlanIndicator::Unknown)
//!         .segmentation(SegmentationStrategy::Sar)
//!         .with_delivery_receipt()
//!         .build()?;
//!
//!     let message_id = session.submit(&sms).await?;
//!     println!("Message sent with ID: {}", message_id);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod pdu;

#[cfg(test)]
mod tests;

pub use codec::{CodecError, PduHeader, SequenceGenerator};
pub use pdu::{Body, Pdu};

pub use client::{
    BindCredentials, Session, SessionBuilder, SessionEvent, SessionState, SmppError, SmppResult,
    SmsMessage, Supervisor,
};

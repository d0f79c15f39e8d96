// ABOUTME: Frame-based I/O over any async byte stream for SMPP v3.4 sessions
// ABOUTME: Splits the stream into a buffered frame reader and a flushing frame writer

use crate::codec::{CodecError, MAX_PDU_SIZE, PduHeader};
use crate::pdu::Pdu;
use bytes::BytesMut;
use std::io::{self, Cursor};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::trace;

/// One complete frame taken off the stream
#[derive(Debug)]
pub enum Inbound {
    /// The frame decoded cleanly
    Pdu(Pdu),
    /// The frame was delimited correctly but its content could not be decoded
    Malformed {
        /// generic_nack carrying the frame's sequence number and a status for `error`
        nack: Pdu,
        /// The frame's command_id had the response bit set
        was_response: bool,
        error: CodecError,
    },
}

/// Read half of an SMPP connection.
///
/// Frames are delimited by their `command_length`. A frame whose body fails
/// to decode does not end the stream: it is surfaced as
/// [`Inbound::Malformed`] and reading continues with the next frame. Only a
/// length that makes the frame boundary itself unknowable is fatal.
#[derive(Debug)]
pub struct FrameReader<R> {
    stream: R,

    // The buffer for reading frames.
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single frame from the underlying stream.
    ///
    /// Any data remaining in the read buffer after the frame has been parsed
    /// is kept there for the next call. Returns `None` when the peer closed
    /// the stream on a frame boundary.
    pub async fn read_frame(&mut self) -> io::Result<Option<Inbound>> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // The remote closed the connection. For this to be a clean
                // shutdown, there should be no data in the read buffer.
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection reset by peer mid-frame",
                    ))
                };
            }
        }
    }

    /// Tries to cut one frame off the front of the buffer. `Ok(None)` means
    /// more data is needed.
    fn parse_frame(&mut self) -> io::Result<Option<Inbound>> {
        let buf = Cursor::new(&self.buffer[..]);
        let Some(command_length) = crate::codec::peek_u32(&buf) else {
            return Ok(None);
        };

        if command_length < PduHeader::SIZE as u32 || command_length > MAX_PDU_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                CodecError::InvalidPduLength {
                    length: command_length,
                    min: PduHeader::SIZE as u32,
                    max: MAX_PDU_SIZE,
                },
            ));
        }

        let len = command_length as usize;
        if self.buffer.len() < len {
            self.buffer.reserve(len - self.buffer.len());
            return Ok(None);
        }

        let frame = self.buffer.split_to(len).freeze();
        trace!("Read {} byte frame", len);

        Ok(Some(match Pdu::decode(&frame) {
            Ok(pdu) => Inbound::Pdu(pdu),
            Err(error) => Inbound::Malformed {
                nack: Pdu::nack_for(&frame, &error),
                was_response: Pdu::frame_is_response(&frame),
                error,
            },
        }))
    }
}

/// Write half of an SMPP connection.
#[derive(Debug)]
pub struct FrameWriter<W> {
    // Decorated with a `BufWriter` so a frame goes out in one syscall.
    stream: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream: BufWriter::new(stream),
        }
    }

    /// Writes one encoded frame and flushes it to the stream
    pub async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await
    }

    pub async fn write_pdu(&mut self, pdu: &Pdu) -> io::Result<()> {
        let frame = pdu
            .to_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.write_frame(&frame).await
    }

    /// Flushes and closes the write direction
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{CommandId, CommandStatus};
    use crate::pdu::Body;
    use tokio::io::duplex;

    fn enquire(seq: u32) -> Pdu {
        Pdu::new(Body::EnquireLink).with_sequence_number(seq)
    }

    #[tokio::test]
    async fn reads_back_to_back_frames() {
        let (client, mut server) = duplex(1024);
        let mut reader = FrameReader::new(client);

        let mut data = enquire(1).to_bytes().unwrap().to_vec();
        data.extend_from_slice(&enquire(2).to_bytes().unwrap());
        server.write_all(&data).await.unwrap();

        for seq in [1, 2] {
            match reader.read_frame().await.unwrap() {
                Some(Inbound::Pdu(pdu)) => assert_eq!(pdu, enquire(seq)),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn reassembles_split_frame() {
        let (client, mut server) = duplex(1024);
        let mut reader = FrameReader::new(client);

        let data = enquire(9).to_bytes().unwrap();
        let task = tokio::spawn(async move {
            server.write_all(&data[..5]).await.unwrap();
            tokio::task::yield_now().await;
            server.write_all(&data[5..]).await.unwrap();
            server
        });

        let frame = reader.read_frame().await.unwrap();
        assert!(matches!(frame, Some(Inbound::Pdu(pdu)) if pdu.sequence_number == 9));
        drop(task.await.unwrap());
    }

    #[tokio::test]
    async fn malformed_frame_does_not_stop_reading() {
        let (client, mut server) = duplex(1024);
        let mut reader = FrameReader::new(client);

        // submit_sm_resp whose message_id never terminates
        let mut bad = Vec::new();
        bad.extend_from_slice(&20u32.to_be_bytes());
        bad.extend_from_slice(&0x8000_0004u32.to_be_bytes());
        bad.extend_from_slice(&0u32.to_be_bytes());
        bad.extend_from_slice(&6u32.to_be_bytes());
        bad.extend_from_slice(b"abcd");
        server.write_all(&bad).await.unwrap();
        server.write_all(&enquire(7).to_bytes().unwrap()).await.unwrap();

        match reader.read_frame().await.unwrap() {
            Some(Inbound::Malformed {
                nack,
                was_response,
                ..
            }) => {
                assert_eq!(nack.command_id(), CommandId::GenericNack);
                assert_eq!(nack.sequence_number, 6);
                assert_eq!(nack.command_status, CommandStatus::InvalidCommandLength);
                assert!(was_response);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            reader.read_frame().await.unwrap(),
            Some(Inbound::Pdu(pdu)) if pdu.sequence_number == 7
        ));
    }

    #[tokio::test]
    async fn clean_and_dirty_eof() {
        let (client, server) = duplex(64);
        let mut reader = FrameReader::new(client);
        drop(server);
        assert!(reader.read_frame().await.unwrap().is_none());

        let (client, mut server) = duplex(64);
        let mut reader = FrameReader::new(client);
        server.write_all(&[0, 0, 0, 16, 0]).await.unwrap();
        drop(server);
        let err = reader.read_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn absurd_length_is_fatal() {
        let (client, mut server) = duplex(64);
        let mut reader = FrameReader::new(client);
        server.write_all(&[0x7F, 0xFF, 0xFF, 0xFF]).await.unwrap();
        let err = reader.read_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn writer_flushes_each_frame() {
        let (client, server) = duplex(1024);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        writer.write_pdu(&enquire(3)).await.unwrap();
        assert!(matches!(
            reader.read_frame().await.unwrap(),
            Some(Inbound::Pdu(pdu)) if pdu == enquire(3)
        ));
    }
}

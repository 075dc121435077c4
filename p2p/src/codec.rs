//! Wire framing for request/response streams.
//!
//! Two framings coexist on this network, selected per stream by the
//! protocol identifier the stream was negotiated on:
//!
//! ## Delimited
//!
//! ```text
//! [4 bytes: payload length (u32-le)] [N bytes: bincode payload]
//! ```
//!
//! The reader learns the message boundary from the prefix, so a stream can
//! carry a reply back without either side closing first.
//!
//! ## Raw
//!
//! ```text
//! [N bytes: bincode payload] <writer closes its write side>
//! ```
//!
//! The boundary is end-of-input. This is the original framing; peers that
//! never upgraded still speak it, which is why negotiation can fall back
//! to it per stream.
//!
//! Every function here takes the applicable size bound explicitly. Which
//! framing a stream uses is fixed at negotiation time; mixing modes on one
//! stream is a programming error and nothing here attempts to detect it.

use {
    crate::{
        error::{P2pError, Result},
        protocol::FramingMode,
    },
    serde::{de::DeserializeOwned, Serialize},
    tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
};

/// Byte width of the delimited length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

// ── Serialisation helpers ───────────────────────────────────────────────────

/// Serialize a message to bytes using bincode.
pub fn encode_message<M: Serialize>(message: &M) -> Result<Vec<u8>> {
    bincode::serialize(message).map_err(P2pError::Serialization)
}

/// Deserialize a message from bytes.
pub fn decode_message<M: DeserializeOwned>(data: &[u8]) -> Result<M> {
    bincode::deserialize(data).map_err(P2pError::Serialization)
}

// ── Delimited framing ───────────────────────────────────────────────────────

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8], max_size: usize) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > max_size {
        return Err(P2pError::MessageTooLarge {
            size: payload.len(),
            max: max_size,
        });
    }
    let len = payload.len() as u32;
    writer
        .write_all(&len.to_le_bytes())
        .await
        .map_err(|e| P2pError::io("write frame header", e))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| P2pError::io("write frame payload", e))?;
    writer
        .flush()
        .await
        .map_err(|e| P2pError::io("flush frame", e))?;
    Ok(())
}

/// Read one length-prefixed frame.
///
/// The declared length is validated against `max_size` before any payload
/// byte is read, so an oversized prefix never allocates. A stream that
/// ends mid-payload yields [`P2pError::TruncatedFrame`].
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    reader
        .read_exact(&mut header)
        .await
        .map_err(|e| P2pError::io("read frame header", e))?;

    let len = u32::from_le_bytes(header) as usize;
    if len > max_size {
        return Err(P2pError::MessageTooLarge {
            size: len,
            max: max_size,
        });
    }

    let mut payload = vec![0u8; len];
    if let Err(e) = reader.read_exact(&mut payload).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(P2pError::TruncatedFrame { expected: len });
        }
        return Err(P2pError::io("read frame payload", e));
    }
    Ok(payload)
}

// ── Raw framing ─────────────────────────────────────────────────────────────

/// Write a bare payload. The caller signals the message boundary by
/// shutting down its write side afterwards.
pub async fn write_raw<W>(writer: &mut W, payload: &[u8], max_size: usize) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > max_size {
        return Err(P2pError::MessageTooLarge {
            size: payload.len(),
            max: max_size,
        });
    }
    writer
        .write_all(payload)
        .await
        .map_err(|e| P2pError::io("write raw payload", e))?;
    writer
        .flush()
        .await
        .map_err(|e| P2pError::io("flush raw payload", e))?;
    Ok(())
}

/// Read a bare payload: everything until the peer closes its write side.
///
/// Reads at most one byte past `max_size` so the limit check can tell an
/// exactly-full payload from an oversized one.
pub async fn read_raw<R>(reader: &mut R, max_size: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut payload = Vec::new();
    let limit = (max_size as u64).saturating_add(1);
    (&mut *reader)
        .take(limit)
        .read_to_end(&mut payload)
        .await
        .map_err(|e| P2pError::io("read raw payload", e))?;
    if payload.len() > max_size {
        return Err(P2pError::MessageTooLarge {
            size: payload.len(),
            max: max_size,
        });
    }
    Ok(payload)
}

// ── Mode dispatch ───────────────────────────────────────────────────────────

impl FramingMode {
    /// Write one message payload in this framing.
    pub(crate) async fn write_payload<W>(
        self,
        writer: &mut W,
        payload: &[u8],
        max_size: usize,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match self {
            Self::Delimited => write_frame(writer, payload, max_size).await,
            Self::Raw => write_raw(writer, payload, max_size).await,
        }
    }

    /// Read one message payload in this framing.
    pub(crate) async fn read_payload<R>(self, reader: &mut R, max_size: usize) -> Result<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        match self {
            Self::Delimited => read_frame(reader, max_size).await,
            Self::Raw => read_raw(reader, max_size).await,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

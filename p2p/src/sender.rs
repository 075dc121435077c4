//! One-shot request/response round trips to a remote peer.
//!
//! A send is four phases on a fresh stream: negotiate an identifier,
//! write the request in the negotiated framing, close the write side,
//! read the answer. [`send`] discards the answer's payload and reports
//! only that the round trip completed; [`send_receive`] decodes it.
//!
//! Success means a handler on the remote node ran for this request. It
//! says nothing about the handler's verdict: a remote that wants to
//! reject a request visibly must encode the rejection into its response
//! payload. Capability mismatches are different, and surface as
//! [`P2pError::ProtocolsNotSupported`] before any payload is written.
//!
//! Dropping the returned future cancels the exchange and closes the
//! stream; nothing is retried.

use {
    crate::{
        codec,
        config::SendRecvConfig,
        error::{P2pError, Result},
        host::Host,
        peer::PeerId,
        protocol::{candidate_protocols, ProtocolId},
    },
    log::debug,
    serde::{de::DeserializeOwned, Serialize},
    tokio::io::AsyncWriteExt,
};

/// Send `message` to `peer` and wait for the acknowledgement.
///
/// The identifiers implied by `config` are offered most preferred first,
/// and the request travels in whichever framing the selected identifier
/// is bound to. `Ok(())` means the remote handler ran to completion,
/// whether it answered with a payload or an empty acknowledgement.
pub async fn send<M: Serialize>(
    host: &Host,
    basic_protocol: ProtocolId,
    peer: PeerId,
    message: &M,
    config: &SendRecvConfig,
) -> Result<()> {
    let _reply = round_trip(host, basic_protocol, peer, message, config).await?;
    Ok(())
}

/// Send `message` to `peer` and decode the typed response.
///
/// Fails with a deserialization error when the remote handler answered
/// with an empty acknowledgement instead of a payload; exchanges without
/// response payloads belong on [`send`].
pub async fn send_receive<Req, Resp>(
    host: &Host,
    basic_protocol: ProtocolId,
    peer: PeerId,
    message: &Req,
    config: &SendRecvConfig,
) -> Result<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let reply = round_trip(host, basic_protocol, peer, message, config).await?;
    codec::decode_message(&reply)
}

/// Shared round trip: negotiate, write, close the write side, read.
async fn round_trip<M: Serialize>(
    host: &Host,
    basic_protocol: ProtocolId,
    peer: PeerId,
    message: &M,
    config: &SendRecvConfig,
) -> Result<Vec<u8>> {
    let candidates = candidate_protocols(&basic_protocol, config);
    let mut stream = host.open_stream(peer, &candidates).await?;
    let framing = stream.framing();
    let max_size = host.config().max_message_size;

    let payload = codec::encode_message(message)?;
    framing
        .write_payload(stream.inner_mut(), &payload, max_size)
        .await?;
    // The write-side close is the end-of-message signal in raw framing
    // and a no-op for correctness in delimited framing; the read half
    // stays open for the answer either way.
    stream
        .inner_mut()
        .shutdown()
        .await
        .map_err(|e| P2pError::io("close write side", e))?;

    let reply = framing.read_payload(stream.inner_mut(), max_size).await?;
    debug!(
        "round trip with {} on {} done ({} byte reply)",
        peer,
        stream.protocol(),
        reply.len()
    );
    Ok(reply)
}

// ── Tests ───────────────────────────────────────────────────────────────────

//! Ordered-preference protocol negotiation on fresh streams.
//!
//! Before any request bytes flow, the two ends of a new stream agree on
//! the protocol identifier (and therefore the framing) the stream will
//! use. The exchange is a single round trip:
//!
//! 1. The dialer sends an offer naming its identity and its candidate
//!    identifiers, most preferred first.
//! 2. The listener answers with the first offered identifier it has a
//!    handler installed for, or with an unsupported marker when the offer
//!    and the installed set do not intersect.
//!
//! Negotiation frames are length-prefixed bincode like everything else on
//! the wire, but capped independently of `max_message_size`: they carry
//! identifiers, never application payloads.

use {
    crate::{
        codec,
        error::{P2pError, Result},
        peer::PeerId,
        protocol::ProtocolId,
    },
    serde::{Deserialize, Serialize},
    tokio::io::{AsyncRead, AsyncWrite},
};

/// Upper bound on a serialized negotiation frame.
pub(crate) const MAX_NEGOTIATION_FRAME: usize = 4096;

/// One message of the negotiation exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum NegotiationFrame {
    /// Dialer to listener: identity plus candidates in preference order.
    Offer {
        peer: PeerId,
        protocols: Vec<ProtocolId>,
    },
    /// Listener to dialer: the identifier this stream will use.
    Selected(ProtocolId),
    /// Listener to dialer: no offered identifier is installed.
    Unsupported,
}

/// Runs the dialer side of the exchange and returns the identifier the
/// listener selected.
///
/// An unsupported answer maps to [`P2pError::ProtocolsNotSupported`]; the
/// caller decides whether that is fatal.
pub(crate) async fn dial_side<S>(
    stream: &mut S,
    identity: PeerId,
    remote: PeerId,
    offered: &[ProtocolId],
) -> Result<ProtocolId>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let offer = NegotiationFrame::Offer {
        peer: identity,
        protocols: offered.to_vec(),
    };
    let bytes = codec::encode_message(&offer)?;
    codec::write_frame(stream, &bytes, MAX_NEGOTIATION_FRAME).await?;

    let reply = codec::read_frame(stream, MAX_NEGOTIATION_FRAME).await?;
    match codec::decode_message::<NegotiationFrame>(&reply)? {
        NegotiationFrame::Selected(id) => Ok(id),
        NegotiationFrame::Unsupported => Err(P2pError::ProtocolsNotSupported {
            peer: remote,
            offered: offered.to_vec(),
        }),
        NegotiationFrame::Offer { .. } => Err(P2pError::Negotiation(
            "listener answered with an offer".to_string(),
        )),
    }
}

/// Runs the listener side of the exchange. `is_installed` reports whether
/// an identifier has a handler.
///
/// Returns the dialer's identity and the selected identifier, or `None`
/// after answering the unsupported marker. Either way the answer has been
/// written before this returns.
pub(crate) async fn listen_side<S, F>(
    stream: &mut S,
    is_installed: F,
) -> Result<Option<(PeerId, ProtocolId)>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Fn(&ProtocolId) -> bool,
{
    let first = codec::read_frame(stream, MAX_NEGOTIATION_FRAME).await?;
    let NegotiationFrame::Offer { peer, protocols } =
        codec::decode_message::<NegotiationFrame>(&first)?
    else {
        return Err(P2pError::Negotiation(
            "dialer opened with a non-offer frame".to_string(),
        ));
    };

    match protocols.iter().find(|id| is_installed(id)) {
        Some(id) => {
            let reply = codec::encode_message(&NegotiationFrame::Selected(id.clone()))?;
            codec::write_frame(stream, &reply, MAX_NEGOTIATION_FRAME).await?;
            Ok(Some((peer, id.clone())))
        }
        None => {
            let reply = codec::encode_message(&NegotiationFrame::Unsupported)?;
            codec::write_frame(stream, &reply, MAX_NEGOTIATION_FRAME).await?;
            Ok(None)
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

//! Handler registration and inbound request dispatch.
//!
//! [`register_handler`] is the receiving half of the layer: it installs
//! one typed handler under every protocol identifier the exchange's
//! options imply, and wires up the per-stream plumbing that decodes the
//! request, invokes the handler, and writes the reply in the stream's
//! negotiated framing.
//!
//! ## Acknowledgement contract
//!
//! Every request a handler processes gets an answer on the wire, even
//! when the handler has no payload to return: the dispatcher writes an
//! empty reply so the sender's round trip completes with success instead
//! of guessing what silence means. The only silent outcome is a request
//! that never reached the handler (read or decode failure), where the
//! dispatcher cannot know there is anything well-formed to answer.
//!
//! ## Local errors stay local
//!
//! A handler's error verdict is logged and counted on the receiving node
//! and never serialized to the peer. A node that wants the sender to see
//! a rejection must say so in its response payload.

use {
    crate::{
        codec,
        config::SendRecvConfig,
        error::{P2pError, Result},
        host::{Host, InboundStream, StreamHandler},
        metrics::HostMetrics,
        peer::PeerId,
        protocol::{candidate_protocols, FramingMode, ProtocolId},
    },
    futures::FutureExt,
    log::{debug, warn},
    serde::{de::DeserializeOwned, Serialize},
    std::{
        future::Future,
        sync::{atomic::Ordering, Arc},
    },
    tokio::{io::AsyncWriteExt, net::TcpStream},
};

/// What a handler tells the dispatcher after processing one request.
///
/// Carries two independent outcomes:
///
/// * `response` is what, if anything, goes back on the stream. `None`
///   still produces an empty acknowledgement, so the sender's call
///   succeeds either way.
/// * `local_error` is the application's verdict on the request. It is
///   logged on this node and goes no further.
#[derive(Debug)]
pub struct HandlerReply<R> {
    /// Response payload to write back, if any.
    pub response: Option<R>,
    /// Application-level verdict; stays on this side of the wire.
    pub local_error: Option<anyhow::Error>,
}

impl<R> HandlerReply<R> {
    /// Acknowledge without a payload.
    pub fn ack() -> Self {
        Self {
            response: None,
            local_error: None,
        }
    }

    /// Respond with a payload.
    pub fn respond(response: R) -> Self {
        Self {
            response: Some(response),
            local_error: None,
        }
    }

    /// Attach the application's local verdict to this reply.
    pub fn with_local_error(mut self, err: impl Into<anyhow::Error>) -> Self {
        self.local_error = Some(err.into());
        self
    }
}

/// Install `handler` for every protocol identifier implied by `config`:
/// the basic identifier, plus the delimited identifier when one is set.
///
/// `name` tags log lines for this exchange. `Req` is decoded from each
/// inbound request with bincode; `Resp` is what the handler may write
/// back. The same `config` must be used by sending peers for the
/// candidate lists on both ends to line up.
///
/// Registration happens once at startup, before traffic. Installing an
/// identifier that already has a handler fails with
/// [`P2pError::HandlerExists`] without replacing anything; the check runs
/// over the whole candidate list first, so a colliding registration does
/// not install a partial set.
pub fn register_handler<Req, Resp, F, Fut>(
    name: &'static str,
    host: &Host,
    basic_protocol: ProtocolId,
    handler: F,
    config: &SendRecvConfig,
) -> Result<()>
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: Fn(PeerId, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerReply<Resp>> + Send + 'static,
{
    let bindings = candidate_protocols(&basic_protocol, config);
    for candidate in &bindings {
        if host.supports(&candidate.id) {
            return Err(P2pError::HandlerExists(candidate.id.clone()));
        }
    }

    let handler = Arc::new(handler);
    let max_size = host.config().max_message_size;
    let metrics = host.metrics_handle();

    for candidate in bindings {
        let framing = candidate.framing;
        let handler = Arc::clone(&handler);
        let metrics = Arc::clone(&metrics);
        let stream_handler: StreamHandler = Arc::new(move |inbound: InboundStream| {
            dispatch_stream::<Req, Resp, F, Fut>(
                name,
                framing,
                max_size,
                inbound,
                Arc::clone(&handler),
                Arc::clone(&metrics),
            )
            .boxed()
        });
        host.set_stream_handler(candidate.id, stream_handler)?;
    }
    Ok(())
}

/// Serve one inbound stream end to end: decode, invoke, reply, close.
async fn dispatch_stream<Req, Resp, F, Fut>(
    name: &'static str,
    framing: FramingMode,
    max_size: usize,
    inbound: InboundStream,
    handler: Arc<F>,
    metrics: Arc<HostMetrics>,
) where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: Fn(PeerId, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerReply<Resp>> + Send + 'static,
{
    let InboundStream {
        mut stream,
        peer,
        protocol,
    } = inbound;

    // 1. Read and decode the request in the negotiated framing.
    let request = match read_request::<Req>(&mut stream, framing, max_size).await {
        Ok(request) => request,
        Err(e) => {
            metrics.decode_failures.fetch_add(1, Ordering::Relaxed);
            warn!("{name}: dropping request from {peer} on {protocol}: {e}");
            return;
        }
    };

    // 2. Invoke the handler.
    debug!("{name}: handling request from {peer} on {protocol}");
    let reply = handler(peer, request).await;
    metrics.requests_handled.fetch_add(1, Ordering::Relaxed);

    // 3. The local verdict is recorded here and goes no further.
    if let Some(err) = &reply.local_error {
        metrics.handler_errors.fetch_add(1, Ordering::Relaxed);
        warn!("{name}: handler error for request from {peer} on {protocol}: {err:#}");
    }

    // 4. Answer: the response payload, or an empty acknowledgement.
    let payload = match &reply.response {
        Some(response) => match codec::encode_message(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{name}: failed encoding response for {peer}: {e}");
                return;
            }
        },
        None => Vec::new(),
    };

    if let Err(e) = write_reply(&mut stream, framing, &payload, max_size).await {
        warn!("{name}: failed writing reply to {peer} on {protocol}: {e}");
    }
}

async fn read_request<Req: DeserializeOwned>(
    stream: &mut TcpStream,
    framing: FramingMode,
    max_size: usize,
) -> Result<Req> {
    let payload = framing.read_payload(stream, max_size).await?;
    codec::decode_message(&payload)
}

async fn write_reply(
    stream: &mut TcpStream,
    framing: FramingMode,
    payload: &[u8],
    max_size: usize,
) -> Result<()> {
    framing.write_payload(stream, payload, max_size).await?;
    stream
        .shutdown()
        .await
        .map_err(|e| P2pError::io("close reply stream", e))?;
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────

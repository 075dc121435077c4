//! TCP transport host: stream listener, address book, and outbound dialing.
//!
//! A [`Host`] owns one TCP listener plus the two tables that connect it to
//! the rest of the layer: the address book (peer identity to dial address)
//! and the handler table (protocol identifier to per-stream handler).
//! Each accepted connection gets its own Tokio task, which negotiates a
//! protocol identifier and then hands the stream to the installed handler.
//!
//! Streams are one-shot: one request/response exchange per connection,
//! closed when the serving task finishes. Connection pooling belongs to a
//! layer below this one if it ever becomes necessary; duty exchanges are
//! rare enough that a dial per send has not hurt.
//!
//! Both tables are written during setup and only read afterwards, so the
//! hot path takes no lock beyond the sharded map read.

use {
    crate::{
        config::HostConfig,
        error::{P2pError, Result},
        metrics::HostMetrics,
        negotiate,
        peer::PeerId,
        protocol::{FramingMode, ProtocolCandidate, ProtocolId},
    },
    dashmap::{mapref::entry::Entry, DashMap},
    futures::future::BoxFuture,
    log::{debug, error, info, warn},
    std::{
        net::SocketAddr,
        sync::{atomic::Ordering, Arc},
        time::Duration,
    },
    tokio::{
        net::{TcpListener, TcpStream},
        task::JoinHandle,
        time::timeout,
    },
};

/// An inbound stream whose protocol identifier has been negotiated.
///
/// Handed to the installed [`StreamHandler`]; dropping it closes the
/// connection.
pub struct InboundStream {
    pub(crate) stream: TcpStream,
    /// Identity the dialer presented during negotiation.
    pub peer: PeerId,
    /// Identifier the stream was negotiated on.
    pub protocol: ProtocolId,
}

impl InboundStream {
    /// Consumes the wrapper and returns the underlying stream. Read the
    /// `peer` and `protocol` fields first if the handler needs them.
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

/// Per-stream handler installed for one protocol identifier.
///
/// The handler owns the stream for its whole life and is responsible for
/// reading the request, writing any reply, and closing. Registration via
/// [`register_handler`](crate::dispatch::register_handler) builds these;
/// a hand-installed handler takes the stream out with
/// [`InboundStream::into_inner`] and speaks whatever it likes on it.
pub type StreamHandler = Arc<dyn Fn(InboundStream) -> BoxFuture<'static, ()> + Send + Sync>;

/// An outbound stream whose protocol identifier has been negotiated.
#[derive(Debug)]
pub struct NegotiatedStream {
    stream: TcpStream,
    candidate: ProtocolCandidate,
}

impl NegotiatedStream {
    /// The identifier both ends agreed on.
    pub fn protocol(&self) -> &ProtocolId {
        &self.candidate.id
    }

    /// Framing bound to the negotiated identifier.
    pub fn framing(&self) -> FramingMode {
        self.candidate.framing
    }

    pub(crate) fn inner_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

struct HostInner {
    identity: PeerId,
    config: HostConfig,
    local_addr: SocketAddr,
    handlers: DashMap<ProtocolId, StreamHandler>,
    address_book: DashMap<PeerId, SocketAddr>,
    metrics: Arc<HostMetrics>,
}

/// A transport host bound to one listener.
///
/// Cheap to share by reference; all methods take `&self`. Dropping the
/// host stops the accept loop, while streams already being served run to
/// completion on their own tasks.
pub struct Host {
    inner: Arc<HostInner>,
    accept_task: JoinHandle<()>,
}

impl Host {
    /// Bind the listener and start accepting streams.
    ///
    /// `identity` is what this host reports about itself during
    /// negotiation; verifying identities against transport credentials is
    /// the key layer's job, not this one's.
    pub async fn bind(config: HostConfig, identity: PeerId) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|e| P2pError::io("bind listener", e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| P2pError::io("read listener addr", e))?;
        info!("p2p host {} listening on {}", identity, local_addr);

        let inner = Arc::new(HostInner {
            identity,
            config,
            local_addr,
            handlers: DashMap::new(),
            address_book: DashMap::new(),
            metrics: Arc::new(HostMetrics::default()),
        });
        let accept_task = tokio::spawn(Self::accept_loop(listener, Arc::clone(&inner)));

        Ok(Self { inner, accept_task })
    }

    async fn accept_loop(listener: TcpListener, inner: Arc<HostInner>) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("accepted connection from {}", addr);
                    let inner = Arc::clone(&inner);
                    tokio::spawn(Self::serve_stream(stream, addr, inner));
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }

    /// Negotiate a protocol on one accepted connection and run its handler.
    async fn serve_stream(mut stream: TcpStream, addr: SocketAddr, inner: Arc<HostInner>) {
        let negotiated = timeout(
            Duration::from_millis(inner.config.negotiation_timeout_ms),
            negotiate::listen_side(&mut stream, |id| inner.handlers.contains_key(id)),
        )
        .await;

        let Ok(outcome) = negotiated else {
            warn!("negotiation with {} timed out", addr);
            return;
        };

        match outcome {
            Ok(Some((peer, protocol))) => {
                let handler = inner
                    .handlers
                    .get(&protocol)
                    .map(|entry| Arc::clone(entry.value()));
                // Handlers are installed once at setup and never removed,
                // so a selected identifier always resolves.
                let Some(handler) = handler else {
                    warn!("no handler for negotiated protocol {} from {}", protocol, addr);
                    return;
                };
                inner
                    .metrics
                    .streams_accepted
                    .fetch_add(1, Ordering::Relaxed);
                debug!("inbound stream from {} on {}", peer, protocol);
                handler(InboundStream {
                    stream,
                    peer,
                    protocol,
                })
                .await;
            }
            Ok(None) => {
                inner
                    .metrics
                    .unsupported_offers
                    .fetch_add(1, Ordering::Relaxed);
                debug!("no common protocol with {}", addr);
            }
            Err(e) => {
                warn!("negotiation with {} failed: {}", addr, e);
            }
        }
    }

    /// Identity this host presents to peers.
    pub fn identity(&self) -> PeerId {
        self.inner.identity
    }

    /// The bound listener address (useful when configured with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// The configuration the host was built with.
    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    /// Counters for this host.
    pub fn metrics(&self) -> &HostMetrics {
        &self.inner.metrics
    }

    pub(crate) fn metrics_handle(&self) -> Arc<HostMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Record where `peer` can be dialed. Overwrites any previous address.
    pub fn add_peer_addr(&self, peer: PeerId, addr: SocketAddr) {
        self.inner.address_book.insert(peer, addr);
    }

    /// Look up the dial address recorded for `peer`.
    pub fn peer_addr(&self, peer: &PeerId) -> Option<SocketAddr> {
        self.inner.address_book.get(peer).map(|entry| *entry.value())
    }

    /// Install the per-stream handler for one protocol identifier.
    ///
    /// Installing an identifier that already has a handler is a
    /// configuration bug and fails without replacing anything.
    pub fn set_stream_handler(&self, protocol: ProtocolId, handler: StreamHandler) -> Result<()> {
        match self.inner.handlers.entry(protocol) {
            Entry::Occupied(entry) => Err(P2pError::HandlerExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!("installed handler for {}", entry.key());
                entry.insert(handler);
                Ok(())
            }
        }
    }

    /// Whether a handler is installed for `protocol`.
    pub fn supports(&self, protocol: &ProtocolId) -> bool {
        self.inner.handlers.contains_key(protocol)
    }

    /// Open a stream to `peer`, offering `candidates` in preference order.
    ///
    /// Dials the address-book entry, runs negotiation, and returns the
    /// stream bound to whichever candidate the listener selected. A remote
    /// without any offered identifier yields
    /// [`P2pError::ProtocolsNotSupported`].
    pub async fn open_stream(
        &self,
        peer: PeerId,
        candidates: &[ProtocolCandidate],
    ) -> Result<NegotiatedStream> {
        let addr = self.peer_addr(&peer).ok_or(P2pError::UnknownPeer(peer))?;

        let dial_ms = self.inner.config.dial_timeout_ms;
        let mut stream =
            match timeout(Duration::from_millis(dial_ms), TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(P2pError::io("dial", e)),
                Err(_elapsed) => return Err(P2pError::Timeout { op: "dial", ms: dial_ms }),
            };

        let offered: Vec<ProtocolId> = candidates.iter().map(|c| c.id.clone()).collect();
        let negotiation_ms = self.inner.config.negotiation_timeout_ms;
        let selected = match timeout(
            Duration::from_millis(negotiation_ms),
            negotiate::dial_side(&mut stream, self.inner.identity, peer, &offered),
        )
        .await
        {
            Ok(Ok(selected)) => selected,
            Ok(Err(e)) => {
                if matches!(e, P2pError::ProtocolsNotSupported { .. }) {
                    self.inner
                        .metrics
                        .negotiation_rejects
                        .fetch_add(1, Ordering::Relaxed);
                }
                return Err(e);
            }
            Err(_elapsed) => {
                return Err(P2pError::Timeout {
                    op: "negotiation",
                    ms: negotiation_ms,
                })
            }
        };

        let candidate = candidates
            .iter()
            .find(|c| c.id == selected)
            .cloned()
            .ok_or_else(|| {
                P2pError::Negotiation(format!("listener selected unoffered protocol {selected}"))
            })?;

        self.inner
            .metrics
            .streams_opened
            .fetch_add(1, Ordering::Relaxed);
        debug!("negotiated {} with {}", candidate.id, peer);
        Ok(NegotiatedStream { stream, candidate })
    }

    /// Stop accepting inbound streams. Streams already being served run to
    /// completion.
    pub fn shutdown(&self) {
        self.accept_task.abort();
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

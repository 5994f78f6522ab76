// Node Controller - Wires ledger, peers and connections together
//
// Lifecycle: constructed (ledger loaded) -> listening -> shut down.
// The node owns its listening socket, ledger and peer set; nothing is global.
// Only connections this node dialed are registered as peers and receive
// broadcasts. Accepted connections are served (sync requests, pushed
// transactions) but never written to unprompted.

use crate::identity::WalletAddress;
use crate::ledger::{LedgerStore, Transaction};
use crate::node::{NodeConfig, NodeError, Shutdown, ShutdownController};
use crate::storage::{LedgerSink, SledSink};
use crate::sync::{
    frame_message, open_connection, request_sync, BroadcastReport, ConnectionHandler,
    ConnectionId, Message, PeerHandle, PeerRegistry,
};
use crate::transport::{self, FrameReader, TransportError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

struct NodeInner {
    config: NodeConfig,
    wallet: WalletAddress,
    ledger: Arc<LedgerStore>,
    peers: Arc<PeerRegistry>,
    shutdown: ShutdownController,
    listening: AtomicBool,
    local_addr: Mutex<Option<SocketAddr>>,
}

/// A ledger node
///
/// Cloning gives another handle onto the same node.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Create a node whose ledger lives under `config.ledger_path()`
    ///
    /// Fails if the stored ledger exists but cannot be read.
    pub fn open(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let sink = SledSink::open(config.ledger_path())?;
        Self::with_sink(config, Arc::new(sink))
    }

    /// Create a node on top of an explicit ledger sink
    pub fn with_sink(config: NodeConfig, sink: Arc<dyn LedgerSink>) -> Result<Self, NodeError> {
        config.validate()?;
        let ledger = LedgerStore::open(sink)?;
        let wallet = match &config.wallet_address {
            Some(address) => WalletAddress::new(address.as_str()),
            None => WalletAddress::generate(),
        };

        Ok(Self {
            inner: Arc::new(NodeInner {
                config,
                wallet,
                ledger: Arc::new(ledger),
                peers: Arc::new(PeerRegistry::new()),
                shutdown: ShutdownController::new(),
                listening: AtomicBool::new(false),
                local_addr: Mutex::new(None),
            }),
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// This node's identity, the sender of every transaction it creates
    pub fn wallet_address(&self) -> &WalletAddress {
        &self.inner.wallet
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.inner.ledger
    }

    /// Current ledger, in arrival order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.inner.ledger.snapshot()
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.inner.peers
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.peer_count()
    }

    /// The bound listening address, once `listen` succeeded
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .inner
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_triggered()
    }

    // ========================================================================
    // LISTEN
    // ========================================================================

    /// Bind the configured address and accept connections until shutdown
    pub async fn listen(&self) -> Result<SocketAddr, NodeError> {
        if self.is_shut_down() {
            return Err(NodeError::ShutDown);
        }
        if self.inner.listening.swap(true, Ordering::SeqCst) {
            return Err(NodeError::AlreadyListening);
        }

        let listener = match transport::bind(&self.inner.config.transport).await {
            Ok(listener) => listener,
            Err(e) => {
                self.inner.listening.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        let address = listener.local_addr()?;
        let shutdown = self.inner.shutdown.subscribe().ok_or(NodeError::ShutDown)?;

        *self
            .inner
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(address);

        info!(%address, wallet = %self.inner.wallet, "node listening");
        tokio::spawn(self.clone().accept_loop(listener, shutdown));

        Ok(address)
    }

    async fn accept_loop(self, listener: TcpListener, mut shutdown: Shutdown) {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, address)) => {
                    info!(%address, "new connection");
                    if let Err(e) = self.serve_inbound(stream) {
                        warn!(%address, error = %e, "could not start connection");
                    }
                }
                Err(e) => {
                    let error = TransportError::AcceptFailed(e.to_string());
                    warn!(%error, "could not accept connection");
                }
            }
        }

        info!("stopped accepting connections");
    }

    fn serve_inbound(&self, stream: TcpStream) -> Result<(), NodeError> {
        let config = &self.inner.config.transport;
        transport::configure(&stream, config);
        let (peer, reader) = open_connection(stream, config)?;
        self.spawn_handler(peer, reader)
    }

    fn spawn_handler(
        &self,
        peer: PeerHandle,
        reader: FrameReader<OwnedReadHalf>,
    ) -> Result<(), NodeError> {
        let shutdown = self.inner.shutdown.subscribe().ok_or(NodeError::ShutDown)?;
        let handler = ConnectionHandler::new(
            peer,
            reader,
            self.inner.ledger.clone(),
            self.inner.peers.clone(),
            &self.inner.config.transport,
        );

        tokio::spawn(handler.run(shutdown));
        Ok(())
    }

    // ========================================================================
    // CONNECT
    // ========================================================================

    /// Dial a peer, register it, request its ledger and start reading from it
    ///
    /// Failures are returned to the caller; nothing is retried.
    pub async fn connect(&self, host: &str, port: u16) -> Result<ConnectionId, NodeError> {
        if self.is_shut_down() {
            return Err(NodeError::ShutDown);
        }

        let config = &self.inner.config.transport;
        let stream = transport::connect(host, port, config).await?;
        let (peer, reader) = open_connection(stream, config)?;
        let id = peer.id();
        let address = *peer.address();

        self.inner.peers.add(peer.clone());

        if let Err(e) = request_sync(&peer, config.max_frame_bytes).await {
            self.inner.peers.remove(&id);
            return Err(e.into());
        }

        if let Err(e) = self.spawn_handler(peer, reader) {
            self.inner.peers.remove(&id);
            return Err(e);
        }

        info!(%address, connection = %id, "connected to peer");
        Ok(id)
    }

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    /// Record a transfer from this node's wallet and push it to every peer
    ///
    /// The transaction is persisted before it is broadcast. Recipient and
    /// amount are taken as given, except that NaN and infinite amounts are
    /// rejected since the JSON wire format cannot carry them.
    pub async fn create_transaction(
        &self,
        recipient: &str,
        amount: f64,
    ) -> Result<Transaction, NodeError> {
        if !amount.is_finite() {
            return Err(NodeError::InvalidAmount(amount));
        }

        let transaction = Transaction::from_wallet(&self.inner.wallet, recipient, amount);
        let outcome = self.inner.ledger.insert(transaction.clone())?;

        let report = self.broadcast(&Message::Transaction(transaction.clone())).await?;
        info!(
            %transaction,
            new = outcome.is_inserted(),
            delivered = report.delivered,
            "transaction created"
        );

        Ok(transaction)
    }

    /// Send a message to every registered peer
    ///
    /// Peers whose send fails are dropped from the registry; the rest still
    /// receive the message.
    pub async fn broadcast(&self, message: &Message) -> Result<BroadcastReport, NodeError> {
        let frame = frame_message(message, self.inner.config.transport.max_frame_bytes)?;
        Ok(self.inner.peers.broadcast_frame(&frame).await)
    }

    // ========================================================================
    // SHUTDOWN
    // ========================================================================

    /// Stop accepting, signal every connection task, and wait for them
    ///
    /// Returns false if some task was still running when the grace period
    /// ran out.
    pub async fn shutdown(&self) -> bool {
        if !self.is_shut_down() {
            info!("shutting down node");
        }
        self.inner.shutdown.trigger();

        let drained = self
            .inner
            .shutdown
            .drain(self.inner.config.shutdown_grace())
            .await;
        if !drained {
            warn!("connection tasks still running after shutdown grace period");
        }
        drained
    }
}

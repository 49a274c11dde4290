//! The tokio TCP/telnet connection multiplexer.
//!
//! One accept-loop task owns the listener; each connection gets a reader
//! task (telnet filtering, line assembly, command parsing) and a writer task
//! (draining an outgoing byte channel). The engine only ever sees the
//! [`ConnectionMux`] trait: `poll` drains event queues the tasks fill in the
//! background.

use crate::filter::TelnetFilter;
use crate::render::render;
use async_trait::async_trait;
use mud_engine::message::OutboundText;
use mud_engine::mux::{ConnId, ConnectionMux, InboundCommand, MuxEvents};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct Pending {
    connected: Vec<ConnId>,
    disconnected: Vec<ConnId>,
    commands: Vec<InboundCommand>,
}

struct ConnHandle {
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    close: Arc<Notify>,
    /// Styling is suppressed until login completes.
    authenticated: bool,
    color: bool,
}

struct Shared {
    pending: Mutex<Pending>,
    conns: Mutex<HashMap<ConnId, ConnHandle>>,
    next_id: AtomicUsize,
    max_connections: usize,
}

/// TCP/telnet implementation of [`ConnectionMux`].
pub struct TelnetMux {
    shared: Arc<Shared>,
    local_addr: SocketAddr,
}

impl TelnetMux {
    /// Binds the listener and starts accepting connections.
    pub async fn bind(addr: &str, max_connections: usize) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("📡 Telnet listener bound on {}", local_addr);

        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending::default()),
            conns: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            max_connections,
        });
        let accept_shared = shared.clone();
        tokio::spawn(async move {
            accept_loop(listener, accept_shared).await;
        });
        Ok(Self { shared, local_addr })
    }

    /// The bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Currently open connections.
    pub fn connection_count(&self) -> usize {
        self.shared.conns.lock().expect("mux mutex poisoned").len()
    }
}

#[async_trait]
impl ConnectionMux for TelnetMux {
    async fn poll(&self) -> MuxEvents {
        let mut pending = self.shared.pending.lock().expect("mux mutex poisoned");
        MuxEvents {
            connected: std::mem::take(&mut pending.connected),
            disconnected: std::mem::take(&mut pending.disconnected),
            commands: std::mem::take(&mut pending.commands),
        }
    }

    async fn send(&self, conn: ConnId, text: OutboundText) {
        let conns = self.shared.conns.lock().expect("mux mutex poisoned");
        if let Some(handle) = conns.get(&conn) {
            let bytes = render(&text, handle.authenticated && handle.color);
            // A send error means the writer is gone; the reader task will
            // surface the disconnect shortly.
            let _ = handle.outgoing.send(bytes);
        }
    }

    async fn disconnect(&self, conn: ConnId) {
        let conns = self.shared.conns.lock().expect("mux mutex poisoned");
        if let Some(handle) = conns.get(&conn) {
            handle.close.notify_one();
        }
    }

    async fn set_authenticated(&self, conn: ConnId) {
        let mut conns = self.shared.conns.lock().expect("mux mutex poisoned");
        if let Some(handle) = conns.get_mut(&conn) {
            handle.authenticated = true;
        }
    }

    async fn toggle_color(&self, conn: ConnId) {
        let mut conns = self.shared.conns.lock().expect("mux mutex poisoned");
        if let Some(handle) = conns.get_mut(&conn) {
            handle.color = !handle.color;
        }
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                let open = shared.conns.lock().expect("mux mutex poisoned").len();
                if open >= shared.max_connections {
                    warn!("🚫 Refusing {} - connection limit {} reached", peer, shared.max_connections);
                    refuse(socket);
                    continue;
                }
                let conn = shared.next_id.fetch_add(1, Ordering::Relaxed);
                debug!("Accepted {} as connection {}", peer, conn);
                spawn_connection(conn, socket, shared.clone());
            }
            Err(err) => {
                error!("Accept failed: {}", err);
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    }
}

fn refuse(mut socket: TcpStream) {
    tokio::spawn(async move {
        let _ = socket.write_all(b"Server is full, try again later.\r\n").await;
        let _ = socket.shutdown().await;
    });
}

fn spawn_connection(conn: ConnId, socket: TcpStream, shared: Arc<Shared>) {
    let _ = socket.set_nodelay(true);
    let (read_half, write_half) = socket.into_split();
    let (tx, rx) = mpsc::unbounded_channel();
    let close = Arc::new(Notify::new());

    shared.conns.lock().expect("mux mutex poisoned").insert(
        conn,
        ConnHandle {
            outgoing: tx.clone(),
            close: close.clone(),
            authenticated: false,
            color: true,
        },
    );
    shared
        .pending
        .lock()
        .expect("mux mutex poisoned")
        .connected
        .push(conn);

    tokio::spawn(writer_task(write_half, rx));
    tokio::spawn(reader_task(conn, read_half, tx, close, shared));
}

async fn writer_task(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(bytes) = rx.recv().await {
        if write_half.write_all(&bytes).await.is_err() {
            break;
        }
    }
    let _ = write_half.shutdown().await;
}

/// Reads until the peer goes away or a disconnect is requested. This task is
/// the only producer of the connection's `disconnected` event, so the engine
/// sees exactly one regardless of how the connection died.
async fn reader_task(
    conn: ConnId,
    mut read_half: OwnedReadHalf,
    replies: mpsc::UnboundedSender<Vec<u8>>,
    close: Arc<Notify>,
    shared: Arc<Shared>,
) {
    let mut filter = TelnetFilter::new();
    let mut buf = [0u8; 1024];
    loop {
        tokio::select! {
            _ = close.notified() => break,
            read = read_half.read(&mut buf) => {
                let n = match read {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                let out = filter.push(&buf[..n]);
                if !out.replies.is_empty() {
                    let _ = replies.send(out.replies);
                }
                if !out.lines.is_empty() {
                    let mut pending = shared.pending.lock().expect("mux mutex poisoned");
                    for line in out.lines {
                        pending.commands.push(InboundCommand::parse(conn, &line));
                    }
                }
            }
        }
    }

    // Dropping the handle drops the last senders, which stops the writer.
    shared
        .conns
        .lock()
        .expect("mux mutex poisoned")
        .remove(&conn);
    shared
        .pending
        .lock()
        .expect("mux mutex poisoned")
        .disconnected
        .push(conn);
    debug!("Connection {} closed", conn);
}

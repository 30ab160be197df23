//! Socket client
//!
//! One persistent connection per client instance. A single background
//! thread runs the blocking connection loop and owns all core state; the
//! send path is callable from any thread and serializes each framed write
//! behind a lock. There is no automatic reconnection: dropping the client
//! (or calling [`Client::shutdown`]) closes the socket, which unblocks the
//! pending read and ends the loop.

mod connection;

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tallyarc_core::ModelEvent;
use tallyarc_domain::{ServerConfig, TallyArcError};
use tracing::{debug, info, warn};

use crate::sequence::RequestSequence;
use crate::wire::{self, Message};

/// State shared between the client handle and the connection loop.
struct Shared {
    writer: Mutex<TcpStream>,
    connected: AtomicBool,
    /// Set once the server finishes replaying the initial configuration.
    ready: AtomicBool,
    /// Messages staged by `send_when_ready` before the handshake completes.
    staged: Mutex<Vec<Message>>,
}

impl Shared {
    /// Encode and write one message as a single contiguous frame.
    fn send_now(&self, message: &Message) -> bool {
        if !self.connected.load(Ordering::Acquire) {
            return false;
        }
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "dropping unencodable message");
                return false;
            }
        };
        let mut writer = self.writer.lock();
        match wire::write_frame(&mut *writer, message.type_code(), &payload) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "socket write failed");
                self.connected.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Flush the staging queue in order. Called from the connection loop
    /// when the configuration replay completes.
    fn flush_staged(&self) {
        let staged: Vec<Message> = std::mem::take(&mut *self.staged.lock());
        if !staged.is_empty() {
            debug!(count = staged.len(), "flushing staged messages");
        }
        for message in &staged {
            self.send_now(message);
        }
    }
}

/// Handle to one server connection.
pub struct Client {
    shared: Arc<Shared>,
    stream: TcpStream,
    sequence: RequestSequence,
    reader: Option<JoinHandle<()>>,
}

impl Client {
    /// Connect, start the connection loop, and request the initial
    /// configuration.
    ///
    /// Returns the client handle and the event channel the presentation
    /// layer consumes.
    pub fn connect(
        config: &ServerConfig,
        sequence: RequestSequence,
    ) -> Result<(Self, Receiver<ModelEvent>), TallyArcError> {
        let stream = TcpStream::connect((config.host.as_str(), config.port))
            .map_err(|e| TallyArcError::Protocol(format!("connect failed: {e}")))?;
        let reader_stream = stream
            .try_clone()
            .map_err(|e| TallyArcError::Protocol(format!("socket clone failed: {e}")))?;
        let writer_stream = stream
            .try_clone()
            .map_err(|e| TallyArcError::Protocol(format!("socket clone failed: {e}")))?;
        info!(host = %config.host, port = config.port, "connected to task server");

        let shared = Arc::new(Shared {
            writer: Mutex::new(writer_stream),
            connected: AtomicBool::new(true),
            ready: AtomicBool::new(false),
            staged: Mutex::new(Vec::new()),
        });
        let (events_tx, events_rx): (Sender<ModelEvent>, Receiver<ModelEvent>) =
            crossbeam_channel::unbounded();

        let loop_shared = Arc::clone(&shared);
        let reader = thread::Builder::new()
            .name("tallyarc-connection".to_string())
            .spawn(move || connection::run(reader_stream, &loop_shared, &events_tx))
            .map_err(|e| TallyArcError::Internal(format!("spawn failed: {e}")))?;

        let client = Self { shared, stream, sequence, reader: Some(reader) };
        client.send_message(&Message::RequestConfiguration);
        Ok((client, events_rx))
    }

    /// Send a message now. Returns `false` if not connected (the message is
    /// discarded; there is no implicit queueing).
    pub fn send_message(&self, message: &Message) -> bool {
        self.shared.send_now(message)
    }

    /// Send a message, staging it until the initial configuration replay
    /// completes. Returns `false` if not connected.
    pub fn send_when_ready(&self, message: Message) -> bool {
        if !self.shared.connected.load(Ordering::Acquire) {
            return false;
        }
        if self.shared.ready.load(Ordering::Acquire) {
            return self.shared.send_now(&message);
        }
        // Between the check and the push the loop may flip `ready`; the
        // re-check keeps the message from being stranded in the queue.
        {
            let mut staged = self.shared.staged.lock();
            if !self.shared.ready.load(Ordering::Acquire) {
                staged.push(message);
                return true;
            }
        }
        self.shared.send_now(&message)
    }

    /// The request id source for this connection.
    pub fn sequence(&self) -> &RequestSequence {
        &self.sequence
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Close the socket. The pending blocking read fails, the connection
    /// loop exits, and a `Disconnected` event is posted. This is the only
    /// way to interrupt a stalled read.
    pub fn shutdown(&self) {
        self.shared.connected.store(false, Ordering::Release);
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!(error = %e, "socket shutdown");
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

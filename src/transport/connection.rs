//! WebSocket connection and dispatch loop.
//!
//! This module owns the socket, correlates command responses with the
//! callers awaiting them and routes events to registered handlers.
//!
//! # Event Loop
//!
//! The connection spawns one tokio task that is the only reader and the only
//! writer of the socket. It handles:
//!
//! - Incoming frames from the peer (responses, events)
//! - Outgoing commands from any number of [`Connection`] clones
//! - Request/response correlation by [`CommandId`]
//! - Event handler callbacks
//!
//! Event handlers run synchronously on that task. A slow handler delays
//! every frame behind it, command responses included.
//!
//! # Termination
//!
//! A close frame, a read error, the end of the stream, [`Connection::shutdown`]
//! or dropping every handle ends the loop. All pending commands then fail
//! with [`Error::ConnectionClosed`], as does every command issued later.
//! There is no reconnect.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::builder::SocketBuilder;
use crate::error::{Error, Result};
use crate::identifiers::{CommandId, IdAllocator};
use crate::options::SocketOptions;
use crate::protocol::{Envelope, Event, EventKind, Method, Request, codec};

use super::pending::PendingTable;
use super::registry::{EventCallback, HandlerRegistry};
use super::report::Reporter;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write an encoded command frame.
    Send { id: CommandId, frame: String },
    /// Close the socket and stop.
    Shutdown,
}

// ============================================================================
// PendingGuard
// ============================================================================

/// Removes a command's wait-slot if the caller stops waiting early
/// (timeout, error, or the future being dropped).
struct PendingGuard<'a> {
    pending: &'a PendingTable,
    id: CommandId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.id);
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Client end of a DevTools protocol connection.
///
/// Cheap to clone; every clone talks to the same dispatch loop.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`. Commands may be issued from any number of
/// tasks at once; frames are written one at a time by the dispatch loop.
pub struct Connection {
    /// Channel to the event loop, the single writer.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// In-flight commands (shared with event loop).
    pending: Arc<PendingTable>,
    /// Event handlers (shared with event loop).
    handlers: Arc<HandlerRegistry>,
    /// Identifier source for this connection.
    ids: Arc<IdAllocator>,
    /// Default timeout for [`Connection::send_command`].
    command_timeout: Option<Duration>,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            pending: Arc::clone(&self.pending),
            handlers: Arc::clone(&self.handlers),
            ids: Arc::clone(&self.ids),
            command_timeout: self.command_timeout,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("pending", &self.pending.len())
            .field("closed", &self.pending.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Returns a builder for configuring and opening a connection.
    #[inline]
    #[must_use]
    pub fn builder() -> SocketBuilder {
        SocketBuilder::new()
    }

    /// Creates a connection over an open WebSocket stream.
    ///
    /// Spawns the event loop task, so this must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` fail
    /// [`SocketOptions::validate`]. Nothing is spawned in that case.
    pub fn new<S>(ws_stream: WebSocketStream<S>, options: SocketOptions) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        options.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(PendingTable::with_limit(options.max_pending));
        let handlers = Arc::new(HandlerRegistry::new());

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&pending),
            Arc::clone(&handlers),
            options.reporter,
        ));

        Ok(Self {
            command_tx,
            pending,
            handlers,
            ids: Arc::new(IdAllocator::new()),
            command_timeout: options.command_timeout,
        })
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Sends a command and waits for its result.
    ///
    /// `params` may be a [`serde_json::Value`] (sent as is) or any
    /// serializable type. Applies the configured default timeout, if any.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the peer answered with an error
    /// - [`Error::ConnectionClosed`] if the connection is or becomes dead
    /// - [`Error::RequestTimeout`] if a default timeout is configured and expires
    /// - [`Error::TooManyPending`] if the pending limit is reached
    /// - [`Error::Json`] if `params` cannot be serialized
    pub async fn send_command(
        &self,
        method: impl Into<String>,
        params: impl Serialize,
    ) -> Result<Value> {
        self.request(method.into(), params, self.command_timeout)
            .await
    }

    /// Sends a command and waits at most `request_timeout` for its result.
    ///
    /// On expiry the command is forgotten; a response arriving later is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command), plus
    /// [`Error::RequestTimeout`].
    pub async fn send_command_with_timeout(
        &self,
        method: impl Into<String>,
        params: impl Serialize,
        request_timeout: Duration,
    ) -> Result<Value> {
        self.request(method.into(), params, Some(request_timeout))
            .await
    }

    /// Sends a typed command and decodes its result into `M::Returns`.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command), plus [`Error::Json`]
    /// if the result does not match `M::Returns`.
    pub async fn execute<M: Method>(&self, params: M) -> Result<M::Returns> {
        let value = self.send_command(M::NAME, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn request(
        &self,
        method: String,
        params: impl Serialize,
        limit: Option<Duration>,
    ) -> Result<Value> {
        let id = self.ids.next_id();
        let request = Request::new(id, method, params)?;
        let frame = codec::encode(&request)?;

        let slot = self.pending.register(id)?;
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        self.command_tx
            .send(ConnectionCommand::Send { id, frame })
            .map_err(|_| Error::ConnectionClosed)?;

        trace!(%id, method = %request.method, "Command queued");

        let outcome = match limit {
            None => slot.await,
            Some(limit) => match timeout(limit, slot).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(%id, method = %request.method, "Command timed out");
                    return Err(Error::request_timeout(id, limit));
                }
            },
        };

        // Sender dropped without a value only happens when the loop is gone.
        outcome.unwrap_or(Err(Error::ConnectionClosed))
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Registers a handler for `event`, decoding its parameters into `T`.
    ///
    /// Handlers for the same event run in registration order. If the
    /// parameters do not decode into `T`, the failure is reported as
    /// [`Error::CallbackDecode`] and the other handlers still run.
    pub fn add_event_handler<T, F>(&self, event: impl Into<String>, callback: F)
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(move |event: &Event| -> Result<()> {
            let payload = T::deserialize(&event.params)
                .map_err(|e| Error::callback_decode(&event.method, e))?;
            callback(payload);
            Ok(())
        });
        self.handlers.register(event, callback);
    }

    /// Registers a handler for the typed event `E`.
    pub fn on<E, F>(&self, callback: F)
    where
        E: EventKind,
        F: Fn(E) + Send + Sync + 'static,
    {
        self.add_event_handler(E::NAME, callback);
    }

    /// Registers a handler that receives the undecoded event.
    pub fn add_raw_event_handler<F>(&self, event: impl Into<String>, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers.register(
            event,
            Arc::new(move |event: &Event| -> Result<()> {
                callback(event);
                Ok(())
            }),
        );
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Returns the number of commands awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` once the dispatch loop has terminated.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pending.is_closed()
    }

    /// Closes the connection.
    ///
    /// Pending commands fail with [`Error::ConnectionClosed`].
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    // ========================================================================
    // Event Loop
    // ========================================================================

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        pending: Arc<PendingTable>,
        handlers: Arc<HandlerRegistry>,
        reporter: Arc<dyn Reporter>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming(
                                codec::decode(text.as_str()),
                                &pending,
                                &handlers,
                                reporter.as_ref(),
                            );
                        }

                        Some(Ok(Message::Binary(bytes))) => {
                            Self::handle_incoming(
                                codec::decode_bytes(&bytes),
                                &pending,
                                &handlers,
                                reporter.as_ref(),
                            );
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Ping, Pong, raw frames
                        Some(Ok(_)) => {}
                    }
                }

                // Commands from callers
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { id, frame }) => {
                            if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                                warn!(%id, error = %e, "Failed to write command");
                                pending.resolve(id, Err(Error::connection(e.to_string())));
                            } else {
                                trace!(%id, "Command sent");
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("All connection handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        // Fail all pending commands and refuse new ones
        pending.drain_all();

        debug!("Event loop terminated");
    }

    /// Routes one decoded inbound frame.
    fn handle_incoming(
        decoded: Result<Envelope>,
        pending: &PendingTable,
        handlers: &HandlerRegistry,
        reporter: &dyn Reporter,
    ) {
        match decoded {
            Ok(Envelope::Response(response)) => {
                let id = response.id;
                if !pending.resolve(id, response.into_result()) {
                    debug!(%id, "Discarded response for unknown command");
                }
            }

            Ok(Envelope::Event(event)) => {
                let invoked = handlers.dispatch(&event, reporter);
                trace!(method = %event.method, invoked, "Event dispatched");
            }

            Ok(Envelope::Invalid { id, message }) => {
                let error = Error::malformed_frame(message);
                reporter.report(&error);
                if !pending.resolve(id, Err(error)) {
                    debug!(%id, "Discarded invalid response for unknown command");
                }
            }

            Err(e) => reporter.report(&e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeSet;

    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::io::DuplexStream;
    use tokio::task::JoinHandle;
    use tokio_test::{assert_err, assert_ok};
    use tokio_tungstenite::tungstenite::protocol::{Role, WebSocketConfig};

    use crate::protocol::Empty;

    type Peer = WebSocketStream<DuplexStream>;

    #[derive(Default)]
    struct Collecting(Mutex<Vec<String>>);

    impl Reporter for Collecting {
        fn report(&self, error: &Error) {
            self.0.lock().push(error.to_string());
        }
    }

    async fn pair_with(options: SocketOptions) -> (Connection, Peer) {
        pair_configured(options, None).await
    }

    async fn pair_configured(
        options: SocketOptions,
        client_config: Option<WebSocketConfig>,
    ) -> (Connection, Peer) {
        let (client_io, peer_io) = tokio::io::duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, client_config).await;
        let peer = WebSocketStream::from_raw_socket(peer_io, Role::Server, None).await;
        let connection = Connection::new(client, options).expect("valid options");
        (connection, peer)
    }

    fn collecting_options() -> (SocketOptions, Arc<Collecting>) {
        let reporter = Arc::new(Collecting::default());
        let sink = Arc::clone(&reporter);
        let options = SocketOptions::new().with_reporter(move |e: &Error| sink.report(e));
        (options, reporter)
    }

    async fn pair() -> (Connection, Peer) {
        pair_with(SocketOptions::default()).await
    }

    /// Reads the next command frame the client wrote.
    async fn read_command(peer: &mut Peer) -> Value {
        loop {
            match peer.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).expect("command is JSON");
                }
                Some(Ok(_)) => continue,
                other => panic!("peer expected a command, got {other:?}"),
            }
        }
    }

    async fn reply(peer: &mut Peer, frame: Value) {
        peer.send(Message::Text(frame.to_string().into()))
            .await
            .expect("peer send");
    }

    fn spawn_command(
        connection: &Connection,
        method: &'static str,
        params: Value,
    ) -> JoinHandle<Result<Value>> {
        let connection = connection.clone();
        tokio::spawn(async move { connection.send_command(method, params).await })
    }

    #[tokio::test]
    async fn test_enable_round_trip() {
        let (connection, mut peer) = pair().await;
        let call = spawn_command(&connection, "X.enable", json!({}));

        let command = read_command(&mut peer).await;
        assert_eq!(command, json!({ "id": 1, "method": "X.enable", "params": {} }));

        reply(&mut peer, json!({ "id": 1, "result": {} })).await;

        let result = call.await.expect("join").expect("success");
        assert_eq!(result, json!({}));
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_responses_are_paired_by_id() {
        const N: u64 = 16;

        let (connection, mut peer) = pair().await;
        let calls: Vec<_> = (0..N)
            .map(|n| spawn_command(&connection, "Test.echo", json!({ "n": n })))
            .collect();

        let mut commands = Vec::new();
        for _ in 0..N {
            commands.push(read_command(&mut peer).await);
        }

        let ids: BTreeSet<u64> = commands
            .iter()
            .map(|c| c["id"].as_u64().expect("id"))
            .collect();
        assert_eq!(ids.len(), N as usize, "identifiers must be unique");

        for command in commands.iter().rev() {
            reply(
                &mut peer,
                json!({ "id": command["id"], "result": { "echo": command["params"]["n"] } }),
            )
            .await;
        }

        for (n, call) in calls.into_iter().enumerate() {
            let result = call.await.expect("join").expect("success");
            assert_eq!(result, json!({ "echo": n }));
        }
    }

    #[tokio::test]
    async fn test_protocol_error_is_surfaced() {
        let (connection, mut peer) = pair().await;
        let call = spawn_command(&connection, "Nope.nope", json!({}));

        let command = read_command(&mut peer).await;
        reply(
            &mut peer,
            json!({
                "id": command["id"],
                "error": { "code": -32601, "message": "'Nope.nope' wasn't found" }
            }),
        )
        .await;

        let err = call.await.expect("join").expect_err("protocol error");
        assert!(matches!(
            err,
            Error::Protocol { code: -32601, ref message, data: None }
                if message == "'Nope.nope' wasn't found"
        ));
    }

    #[tokio::test]
    async fn test_unmatched_response_is_dropped() {
        let (connection, mut peer) = pair().await;
        let mut call = spawn_command(&connection, "Test.wait", json!({}));

        let command = read_command(&mut peer).await;
        reply(&mut peer, json!({ "id": 999, "result": { "stray": true } })).await;

        let still_waiting = timeout(Duration::from_millis(50), &mut call).await;
        assert!(still_waiting.is_err(), "caller must stay blocked");
        assert_eq!(connection.pending_count(), 1);

        reply(&mut peer, json!({ "id": command["id"], "result": { "mine": true } })).await;
        let result = call.await.expect("join").expect("success");
        assert_eq!(result, json!({ "mine": true }));
    }

    #[tokio::test]
    async fn test_events_reach_all_handlers_in_order() {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ScriptParsed {
            script_id: String,
        }

        #[derive(Debug, Deserialize)]
        struct WrongShape {
            #[allow(dead_code)]
            missing: u32,
        }

        let reporter = Arc::new(Collecting::default());
        let sink = Arc::clone(&reporter);
        let options = SocketOptions::new().with_reporter(move |e: &Error| sink.report(e));
        let (connection, mut peer) = pair_with(options).await;

        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&log);
        connection.add_event_handler("Debugger.scriptParsed", move |e: ScriptParsed| {
            first.lock().push(format!("first:{}", e.script_id));
        });
        let second = Arc::clone(&log);
        connection.add_event_handler("Debugger.scriptParsed", move |_: WrongShape| {
            second.lock().push("wrong".to_string());
        });
        let third = Arc::clone(&log);
        connection.add_raw_event_handler("Debugger.scriptParsed", move |e: &Event| {
            third.lock().push(format!("raw:{}", e.params["scriptId"]));
        });

        for script_id in ["10", "11"] {
            reply(
                &mut peer,
                json!({ "method": "Debugger.scriptParsed", "params": { "scriptId": script_id } }),
            )
            .await;
        }
        reply(&mut peer, json!({ "method": "Debugger.resumed" })).await;

        // A round trip guarantees the loop has processed the earlier frames.
        let call = spawn_command(&connection, "Test.sync", json!({}));
        let command = read_command(&mut peer).await;
        reply(&mut peer, json!({ "id": command["id"], "result": {} })).await;
        call.await.expect("join").expect("success");

        assert_eq!(
            log.lock().as_slice(),
            ["first:10", "raw:\"10\"", "first:11", "raw:\"11\""]
        );
        let reports = reporter.0.lock();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.contains("Debugger.scriptParsed")));
    }

    #[tokio::test]
    async fn test_typed_execute_and_event() {
        #[derive(Serialize)]
        struct Enable;

        impl Method for Enable {
            const NAME: &'static str = "HeapProfiler.enable";
            type Returns = Empty;
        }

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ReportHeapSnapshotProgress {
            done: u64,
            total: u64,
        }

        impl EventKind for ReportHeapSnapshotProgress {
            const NAME: &'static str = "HeapProfiler.reportHeapSnapshotProgress";
        }

        let (connection, mut peer) = pair().await;
        let progress = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&progress);
        connection.on(move |e: ReportHeapSnapshotProgress| sink.lock().push((e.done, e.total)));

        let executor = connection.clone();
        let call = tokio::spawn(async move { executor.execute(Enable).await });

        let command = read_command(&mut peer).await;
        assert_eq!(command["method"], "HeapProfiler.enable");
        assert_eq!(command["params"], json!({}));

        reply(
            &mut peer,
            json!({
                "method": "HeapProfiler.reportHeapSnapshotProgress",
                "params": { "done": 5, "total": 10 }
            }),
        )
        .await;
        reply(&mut peer, json!({ "id": command["id"], "result": {} })).await;

        assert_eq!(call.await.expect("join").expect("success"), Empty {});
        assert_eq!(progress.lock().as_slice(), [(5, 10)]);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_reported_and_skipped() {
        let reporter = Arc::new(Collecting::default());
        let sink = Arc::clone(&reporter);
        let options = SocketOptions::new().with_reporter(move |e: &Error| sink.report(e));
        let (connection, mut peer) = pair_with(options).await;

        let call = spawn_command(&connection, "Test.after", json!({}));
        let command = read_command(&mut peer).await;

        peer.send(Message::Text("{broken".into()))
            .await
            .expect("peer send");
        reply(&mut peer, json!({ "params": {} })).await;
        reply(&mut peer, json!({ "id": command["id"], "result": { "ok": 1 } })).await;

        assert_eq!(call.await.expect("join").expect("success"), json!({ "ok": 1 }));

        let reports = reporter.0.lock();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.starts_with("Malformed frame")));
    }

    #[tokio::test]
    async fn test_peer_close_fails_all_pending() {
        const M: usize = 5;

        let (connection, mut peer) = pair().await;
        let calls: Vec<_> = (0..M)
            .map(|_| spawn_command(&connection, "Test.never", json!({})))
            .collect();
        for _ in 0..M {
            read_command(&mut peer).await;
        }

        drop(peer);

        for call in calls {
            let err = call.await.expect("join").expect_err("closed");
            assert!(matches!(err, Error::ConnectionClosed));
        }
        assert!(connection.is_closed());

        let late = connection.send_command("Test.late", json!({})).await;
        assert!(matches!(late, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending_and_new_commands() {
        let (connection, mut peer) = pair().await;
        let call = spawn_command(&connection, "Test.never", json!({}));
        read_command(&mut peer).await;

        connection.shutdown();

        let err = call.await.expect("join").expect_err("closed");
        assert!(matches!(err, Error::ConnectionClosed));

        let late = connection.send_command("Test.late", ()).await;
        assert!(matches!(late, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_timeout_then_late_response() {
        let (connection, mut peer) = pair().await;

        let slow = connection.clone();
        let timed = tokio::spawn(async move {
            slow.send_command_with_timeout("Test.slow", json!({}), Duration::from_millis(30))
                .await
        });
        let slow_command = read_command(&mut peer).await;

        let err = timed.await.expect("join").expect_err("timeout");
        assert!(matches!(err, Error::RequestTimeout { timeout_ms: 30, .. }));
        assert_eq!(connection.pending_count(), 0);

        let call = spawn_command(&connection, "Test.fast", json!({}));
        let fast_command = read_command(&mut peer).await;

        reply(&mut peer, json!({ "id": slow_command["id"], "result": { "late": true } })).await;
        reply(&mut peer, json!({ "id": fast_command["id"], "result": { "fast": true } })).await;

        assert_eq!(call.await.expect("join").expect("success"), json!({ "fast": true }));
        assert!(!connection.is_closed());
    }

    #[tokio::test]
    async fn test_default_timeout_from_options() {
        let options = SocketOptions::new().with_command_timeout(Duration::from_millis(20));
        let (connection, mut peer) = pair_with(options).await;

        let call = spawn_command(&connection, "Test.slow", json!({}));
        read_command(&mut peer).await;

        let err = call.await.expect("join").expect_err("timeout");
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_cancelled_call_releases_slot() {
        let (connection, mut peer) = pair().await;

        let call = spawn_command(&connection, "Test.cancel", json!({}));
        read_command(&mut peer).await;
        assert_eq!(connection.pending_count(), 1);

        call.abort();
        let _ = call.await;
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_limit() {
        let options = SocketOptions::new().with_max_pending(1);
        let (connection, mut peer) = pair_with(options).await;

        let first = spawn_command(&connection, "Test.first", json!({}));
        let command = read_command(&mut peer).await;

        let second = connection.send_command("Test.second", json!({})).await;
        assert!(matches!(second, Err(Error::TooManyPending { limit: 1 })));

        reply(&mut peer, json!({ "id": command["id"], "result": {} })).await;
        first.await.expect("join").expect("success");
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_options() {
        let (client_io, _peer_io) = tokio::io::duplex(1024);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;

        let result = Connection::new(client, SocketOptions::new().with_max_pending(0));
        assert!(matches!(assert_err!(result), Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_odd_error_payloads_reach_the_caller() {
        let (connection, mut peer) = pair().await;

        for error in [
            json!({ "message": "boom" }),
            json!({ "code": "E1", "message": "boom" }),
        ] {
            let call = spawn_command(&connection, "Test.fail", json!({}));
            let command = read_command(&mut peer).await;
            reply(&mut peer, json!({ "id": command["id"], "error": error.clone() })).await;

            let err = assert_err!(assert_ok!(call.await));
            assert!(matches!(
                err,
                Error::Protocol { code: 0, ref message, data: Some(ref data) }
                    if message == "boom" && *data == error
            ));
        }
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_ambiguous_response_fails_its_caller() {
        let (options, reporter) = collecting_options();
        let (connection, mut peer) = pair_with(options).await;

        for shape in ["neither", "both"] {
            let call = spawn_command(&connection, "Test.ambiguous", json!({}));
            let command = read_command(&mut peer).await;
            let frame = match shape {
                "neither" => json!({ "id": command["id"] }),
                _ => json!({
                    "id": command["id"],
                    "result": {},
                    "error": { "code": 1, "message": "x" }
                }),
            };
            reply(&mut peer, frame).await;

            let err = assert_err!(assert_ok!(call.await));
            assert!(matches!(
                err,
                Error::MalformedFrame { ref message } if message.contains(shape)
            ));
        }

        assert_eq!(connection.pending_count(), 0);
        assert!(!connection.is_closed());
        let reports = reporter.0.lock();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.starts_with("Malformed frame")));
    }

    #[tokio::test]
    async fn test_binary_frames_are_dispatched() {
        let (connection, mut peer) = pair().await;
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        connection.add_raw_event_handler("Debugger.resumed", move |e: &Event| {
            sink.lock().push(e.method.clone());
        });

        let call = spawn_command(&connection, "Test.binary", json!({}));
        let command = read_command(&mut peer).await;

        let event = json!({ "method": "Debugger.resumed" }).to_string();
        peer.send(Message::Binary(event.into_bytes().into()))
            .await
            .expect("peer send");
        let response = json!({ "id": command["id"], "result": { "binary": true } }).to_string();
        peer.send(Message::Binary(response.into_bytes().into()))
            .await
            .expect("peer send");

        assert_eq!(assert_ok!(assert_ok!(call.await)), json!({ "binary": true }));
        assert_eq!(events.lock().as_slice(), ["Debugger.resumed"]);
    }

    #[tokio::test]
    async fn test_write_failure_fails_only_that_caller() {
        // Frames larger than the write buffer cap are refused by the socket.
        let config = WebSocketConfig::default()
            .write_buffer_size(0)
            .max_write_buffer_size(1024);
        let (connection, mut peer) = pair_configured(SocketOptions::default(), Some(config)).await;

        let oversized = connection
            .send_command("Test.oversized", json!({ "blob": "x".repeat(4096) }))
            .await;
        let err = assert_err!(oversized);
        assert!(matches!(err, Error::Connection { .. }));
        assert!(err.is_connection_error());
        assert_eq!(connection.pending_count(), 0);
        assert!(!connection.is_closed());

        let call = spawn_command(&connection, "Test.small", json!({}));
        let command = read_command(&mut peer).await;
        assert_eq!(command["method"], "Test.small");
        reply(&mut peer, json!({ "id": command["id"], "result": { "ok": true } })).await;

        assert_eq!(assert_ok!(assert_ok!(call.await)), json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_dropping_every_handle_ends_the_loop() {
        let (connection, mut peer) = pair().await;
        let second = connection.clone();
        let pending = Arc::clone(&connection.pending);
        let slot = assert_ok!(pending.register(CommandId::new(1_000)));

        drop(connection);
        assert!(!pending.is_closed());
        drop(second);

        let err = assert_err!(assert_ok!(slot.await));
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(pending.is_closed());
        assert!(matches!(peer.next().await, None | Some(Err(_))));
    }
}

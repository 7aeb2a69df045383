// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection worker.
//!
//! One task per receiver owns the byte stream. It reads and decodes status
//! lines, feeds them to the [`StateTracker`], performs the writes queued by
//! [`ConnectionHandle::write`] one at a time, and reconnects after a loss.
//!
//! ```text
//!  Receiver::set_volume ──► write queue ──┐
//!                                         ▼
//!                ┌──────────── worker task (select!, biased) ────────────┐
//!                │ 1. cancellation                                      │
//!                │ 2. queued writes  ──► stream                         │
//!                │ 3. stream reads   ──► LineFramer ──► Codec::decode   │
//!                │                                  └──► StateTracker   │
//!                └───────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tokio_util::sync::CancellationToken;

use crate::command::Command;
use crate::error::ProtocolError;
use crate::receiver::{ReceiverConfig, ReconnectionPolicy};
use crate::state::StateTracker;

use super::{BoxedStream, Codec, Connect, LineFramer};

/// Maximum number of queued writes before callers wait.
const WRITE_QUEUE_DEPTH: usize = 32;

/// Size of a single read from the stream.
const READ_CHUNK: usize = 512;

/// Extra time callers wait for the worker beyond the write timeout.
const REPLY_MARGIN: Duration = Duration::from_millis(500);

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Timings and policy the worker runs with.
#[derive(Debug, Clone)]
pub(crate) struct WorkerSettings {
    pub policy: ReconnectionPolicy,
    pub stale_after: Duration,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl From<&ReceiverConfig> for WorkerSettings {
    fn from(config: &ReceiverConfig) -> Self {
        Self {
            policy: config.reconnection.clone(),
            stale_after: config.stale_after,
            connect_timeout: config.connect_timeout,
            write_timeout: config.write_timeout,
        }
    }
}

/// Encoded bytes waiting to be written.
struct WriteRequest {
    bytes: Vec<u8>,
    reply: oneshot::Sender<Result<(), ProtocolError>>,
}

/// Handle to a running connection worker.
///
/// Dropping the handle cancels the worker.
pub(crate) struct ConnectionHandle {
    write_tx: mpsc::Sender<WriteRequest>,
    connected_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    write_timeout: Duration,
}

impl ConnectionHandle {
    /// Starts the worker on an already open stream.
    ///
    /// `startup` is written before anything else, typically the queries that
    /// populate the state.
    pub(crate) fn spawn<C: Connect>(
        connector: C,
        stream: BoxedStream,
        codec: Codec,
        tracker: StateTracker,
        settings: WorkerSettings,
        startup: Vec<Command>,
    ) -> Self {
        let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_DEPTH);
        let (connected_tx, connected_rx) = watch::channel(true);
        let cancel = CancellationToken::new();
        let write_timeout = settings.write_timeout;

        let worker = Worker {
            connector: Arc::new(connector),
            codec,
            tracker,
            framer: LineFramer::new(),
            write_rx,
            connected_tx,
            cancel: cancel.clone(),
            settings,
        };
        let task = tokio::spawn(worker.run(stream, startup));

        Self {
            write_tx,
            connected_rx,
            cancel,
            task: Mutex::new(Some(task)),
            write_timeout,
        }
    }

    /// Queues bytes for writing and waits until they are on the wire.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ConnectionLost` if the receiver is not
    /// connected or the write fails, `ProtocolError::Timeout` if the write
    /// does not complete in time, and `ProtocolError::ChannelClosed` after
    /// shutdown.
    pub(crate) async fn write(&self, bytes: Vec<u8>) -> Result<(), ProtocolError> {
        if self.cancel.is_cancelled() {
            return Err(self.closed_error());
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.write_tx
            .send(WriteRequest {
                bytes,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.closed_error())?;

        let limit = self.write_timeout + REPLY_MARGIN;
        match timeout(limit, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(self.closed_error()),
            Err(_) => Err(ProtocolError::Timeout(as_millis(limit))),
        }
    }

    /// Returns `true` while a stream to the receiver is open.
    pub(crate) fn is_connected(&self) -> bool {
        *self.connected_rx.borrow()
    }

    /// Creates a watch receiver for the connection flag.
    pub(crate) fn watch_connected(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// Cancels the worker and waits for it to close the stream.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Timeout` if the worker did not stop within
    /// `limit`; it is aborted in that case.
    pub(crate) async fn shutdown(&self, limit: Duration) -> Result<(), ProtocolError> {
        self.cancel.cancel();

        let Some(task) = self.task.lock().take() else {
            return Ok(());
        };
        let abort = task.abort_handle();

        if timeout(limit, task).await.is_ok() {
            Ok(())
        } else {
            tracing::warn!(
                timeout_ms = as_millis(limit),
                "Connection worker did not stop in time, aborting"
            );
            abort.abort();
            Err(ProtocolError::Timeout(as_millis(limit)))
        }
    }

    fn closed_error(&self) -> ProtocolError {
        if self.cancel.is_cancelled() {
            ProtocolError::ChannelClosed("receiver has been shut down".to_string())
        } else {
            ProtocolError::ConnectionLost
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("connected", &self.is_connected())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

enum SessionEnd {
    Cancelled,
    Lost,
}

struct Worker<C> {
    connector: Arc<C>,
    codec: Codec,
    tracker: StateTracker,
    framer: LineFramer,
    write_rx: mpsc::Receiver<WriteRequest>,
    connected_tx: watch::Sender<bool>,
    cancel: CancellationToken,
    settings: WorkerSettings,
}

impl<C: Connect> Worker<C> {
    async fn run(mut self, stream: BoxedStream, startup: Vec<Command>) {
        let receiver = self.connector.target();
        let mut stream = stream;
        let mut queries = startup;

        tracing::info!(receiver = %receiver, "Connected to receiver");

        loop {
            if let SessionEnd::Cancelled = self.session(stream, &queries).await {
                break;
            }

            self.connected_tx.send_replace(false);
            self.tracker.callbacks().dispatch_disconnected();

            let Some(reopened) = self.reconnect(&receiver).await else {
                break;
            };
            tracing::info!(receiver = %receiver, "Reconnected to receiver");
            stream = reopened;
            queries = self.tracker.resync();

            self.connected_tx.send_replace(true);
            self.tracker
                .callbacks()
                .dispatch_connected(self.tracker.state());
        }

        self.connected_tx.send_replace(false);
        tracing::debug!(receiver = %receiver, "Connection worker stopped");
    }

    /// Runs one connected period until cancellation or loss.
    async fn session(&mut self, stream: BoxedStream, queries: &[Command]) -> SessionEnd {
        let (mut reader, mut writer) = tokio::io::split(stream);
        self.framer.reset();

        for command in queries {
            let bytes = match self.codec.encode(command) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(%command, error = %e, "Skipping query the dialect cannot express");
                    continue;
                }
            };
            if let Err(e) = Self::write_bytes(&mut writer, &bytes, self.settings.write_timeout).await {
                tracing::warn!(error = %e, "Connection lost while querying state");
                return SessionEnd::Lost;
            }
        }

        let mut buf = [0u8; READ_CHUNK];
        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    tracing::debug!("Closing connection to receiver");
                    return SessionEnd::Cancelled;
                }

                request = self.write_rx.recv() => {
                    let Some(request) = request else {
                        return SessionEnd::Cancelled;
                    };
                    let result =
                        Self::write_bytes(&mut writer, &request.bytes, self.settings.write_timeout).await;
                    let failed = result.is_err();
                    let _ = request.reply.send(result);
                    if failed {
                        tracing::warn!("Connection lost while writing");
                        return SessionEnd::Lost;
                    }
                }

                read = reader.read(&mut buf) => match read {
                    Ok(0) => {
                        tracing::warn!("Connection closed by receiver");
                        return SessionEnd::Lost;
                    }
                    Ok(n) => {
                        for line in self.framer.push(&buf[..n]) {
                            self.handle_line(&line);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Read from receiver failed");
                        return SessionEnd::Lost;
                    }
                },
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        match self.codec.decode(line) {
            Ok(Some(decoded)) => {
                tracing::debug!(line = %line, "Received status");
                self.tracker.apply(&decoded);
            }
            Ok(None) => tracing::debug!(line = %line, "Ignoring unrecognised line"),
            Err(e) => tracing::warn!(line = %line, error = %e, "Dropping malformed status line"),
        }
    }

    async fn write_bytes<W>(writer: &mut W, bytes: &[u8], limit: Duration) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let write = async {
            writer.write_all(bytes).await?;
            writer.flush().await
        };

        match timeout(limit, write).await {
            Ok(Ok(())) => {
                tracing::debug!(line = %String::from_utf8_lossy(bytes).trim(), "Sent command");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Write to receiver failed");
                Err(ProtocolError::ConnectionLost)
            }
            Err(_) => Err(ProtocolError::Timeout(as_millis(limit))),
        }
    }

    /// Reopens the stream with backoff.
    ///
    /// Returns `None` on cancellation or when the policy gives up.
    async fn reconnect(&mut self, receiver: &str) -> Option<BoxedStream> {
        let stale_at = Instant::now() + self.settings.stale_after;
        let mut attempt: u32 = 0;

        loop {
            if !self.settings.policy.should_retry(attempt) {
                tracing::warn!(receiver = %receiver, attempts = attempt, "Giving up reconnecting");
                return None;
            }

            tracing::debug!(receiver = %receiver, attempt = attempt + 1, "Reconnecting");
            let connector = Arc::clone(&self.connector);
            let limit = self.settings.connect_timeout;
            let connect = async move { timeout(limit, connector.connect()).await };

            match self.while_disconnected(connect, stale_at).await? {
                Ok(Ok(stream)) => return Some(stream),
                Ok(Err(e)) => {
                    tracing::warn!(receiver = %receiver, error = %e, "Reconnect failed");
                }
                Err(_) => {
                    tracing::warn!(
                        receiver = %receiver,
                        timeout_ms = as_millis(limit),
                        "Reconnect timed out"
                    );
                }
            }

            let delay = self.settings.policy.delay_for_attempt(attempt);
            attempt = attempt.saturating_add(1);
            self.while_disconnected(sleep(delay), stale_at).await?;
        }
    }

    /// Drives `fut` while no stream is open.
    ///
    /// Queued writes are rejected, and the state is reset once the gap
    /// passes the staleness threshold. Returns `None` on cancellation.
    async fn while_disconnected<F: Future>(&mut self, fut: F, stale_at: Instant) -> Option<F::Output> {
        tokio::pin!(fut);

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => return None,

                request = self.write_rx.recv() => match request {
                    Some(request) => {
                        let _ = request.reply.send(Err(ProtocolError::ConnectionLost));
                    }
                    None => return None,
                },

                () = sleep_until(stale_at), if !self.tracker.state().is_unknown() => {
                    tracing::info!("Receiver unreachable beyond staleness threshold, state reset");
                    self.tracker.invalidate();
                }

                output = &mut fut => return Some(output),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Attribute;
    use crate::protocol::Dialect;
    use crate::subscription::CallbackRegistry;
    use crate::types::PowerState;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};

    /// Connector that hands out pre-built streams, then fails.
    struct QueueConnector {
        streams: Mutex<Vec<DuplexStream>>,
    }

    impl Connect for QueueConnector {
        async fn connect(&self) -> Result<BoxedStream, ProtocolError> {
            match self.streams.lock().pop() {
                Some(stream) => Ok(Box::new(stream)),
                None => Err(ProtocolError::ConnectionFailed {
                    target: "queue".to_string(),
                    reason: "empty".to_string(),
                }),
            }
        }

        fn target(&self) -> String {
            "queue".to_string()
        }
    }

    fn settings() -> WorkerSettings {
        WorkerSettings {
            policy: ReconnectionPolicy::disabled(),
            stale_after: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
        }
    }

    /// Connector whose attempts never complete.
    struct StalledConnector;

    impl Connect for StalledConnector {
        async fn connect(&self) -> Result<BoxedStream, ProtocolError> {
            std::future::pending().await
        }

        fn target(&self) -> String {
            "stalled".to_string()
        }
    }

    type StateRx = watch::Receiver<crate::state::DeviceState>;

    fn spawn_worker_with<C: Connect>(
        connector: C,
        settings: WorkerSettings,
        capacity: usize,
        callbacks: Arc<CallbackRegistry>,
        startup: Vec<Command>,
    ) -> (ConnectionHandle, DuplexStream, StateRx) {
        let (client, server) = tokio::io::duplex(capacity);
        let tracker = StateTracker::new(callbacks);
        let state_rx = tracker.watch();
        let handle = ConnectionHandle::spawn(
            connector,
            Box::new(client),
            Codec::new(Dialect::nad()),
            tracker,
            settings,
            startup,
        );
        (handle, server, state_rx)
    }

    fn spawn_worker(startup: Vec<Command>) -> (ConnectionHandle, DuplexStream, StateRx) {
        let connector = QueueConnector {
            streams: Mutex::new(Vec::new()),
        };
        spawn_worker_with(
            connector,
            settings(),
            1024,
            Arc::new(CallbackRegistry::new()),
            startup,
        )
    }

    #[tokio::test]
    async fn startup_queries_are_written_first() {
        let (handle, server, _) = spawn_worker(vec![
            Command::query(Attribute::Model),
            Command::query(Attribute::Power),
        ]);
        let mut lines = BufReader::new(server);

        let mut received = Vec::new();
        lines.read_until(b'?', &mut received).await.unwrap();
        assert_eq!(received, b"\rMain.Model?");

        received.clear();
        lines.read_until(b'?', &mut received).await.unwrap();
        assert_eq!(received, b"\r\rMain.Power?");

        handle.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn received_lines_update_state() {
        let (handle, mut server, mut state_rx) = spawn_worker(Vec::new());

        server.write_all(b"Main.Power=On\r\n").await.unwrap();
        state_rx.changed().await.unwrap();

        assert_eq!(state_rx.borrow().power(), Some(PowerState::On));
        handle.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn queued_write_reaches_stream() {
        let (handle, server, _) = spawn_worker(Vec::new());
        let mut lines = BufReader::new(server);

        handle.write(b"\rMain.Mute=On\r".to_vec()).await.unwrap();

        let mut received = [0u8; 14];
        lines.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"\rMain.Mute=On\r");

        handle.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn loss_without_reconnect_marks_disconnected() {
        let (handle, server, _) = spawn_worker(Vec::new());
        let mut connected = handle.watch_connected();
        assert!(handle.is_connected());

        drop(server);
        connected.wait_for(|c| !*c).await.unwrap();

        let err = handle.write(b"\rMain.Power?\r".to_vec()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionLost));
    }

    #[tokio::test]
    async fn writes_after_shutdown_fail_with_channel_closed() {
        let (handle, _server, _) = spawn_worker(Vec::new());

        handle.shutdown(Duration::from_secs(1)).await.unwrap();

        assert!(!handle.is_connected());
        let err = handle.write(b"\rMain.Power?\r".to_vec()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ChannelClosed(_)));
    }

    #[tokio::test]
    async fn state_resets_once_outage_passes_stale_threshold() {
        let callbacks = Arc::new(CallbackRegistry::new());
        let resets = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&resets);
        callbacks.on_state_reset(move || {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        let settings = WorkerSettings {
            policy: ReconnectionPolicy::new().with_infinite_retries(),
            stale_after: Duration::from_millis(200),
            connect_timeout: Duration::from_secs(30),
            ..settings()
        };
        let (handle, mut server, mut state_rx) =
            spawn_worker_with(StalledConnector, settings, 1024, callbacks, Vec::new());

        server.write_all(b"Main.Model=T758\rMain.Power=On\rMain.Volume=-40\r").await.unwrap();
        timeout(Duration::from_secs(2), state_rx.wait_for(|s| s.volume().is_some()))
            .await
            .unwrap()
            .unwrap();

        let lost_at = Instant::now();
        drop(server);
        timeout(Duration::from_secs(2), state_rx.wait_for(|s| s.is_unknown()))
            .await
            .unwrap()
            .unwrap();

        assert!(lost_at.elapsed() >= Duration::from_millis(200));
        assert!(!handle.is_connected());
        assert_eq!(state_rx.borrow().power(), None);
        assert_eq!(state_rx.borrow().model(), Some("T758"));
        assert_eq!(resets.load(std::sync::atomic::Ordering::SeqCst), 1);

        handle.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_aborts_a_stuck_worker() {
        let settings = WorkerSettings {
            write_timeout: Duration::from_secs(30),
            ..settings()
        };
        // The startup query does not fit the pipe, so the worker blocks writing it
        let (handle, mut server, _) = spawn_worker_with(
            QueueConnector {
                streams: Mutex::new(Vec::new()),
            },
            settings,
            4,
            Arc::new(CallbackRegistry::new()),
            vec![Command::query(Attribute::Model)],
        );
        let mut head = [0u8; 4];
        server.read_exact(&mut head).await.unwrap();

        let err = handle.shutdown(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(100)));

        // The aborted task drops its end of the pipe
        let mut rest = Vec::new();
        timeout(Duration::from_secs(2), server.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert!(handle.write(b"\rMain.Power?\r".to_vec()).await.is_err());
    }
}

//! Gateway connection sessions.
//!
//! A session owns one upgraded connection end to end: the
//! read-reassemble-dispatch loop, cancellation, and the orderly close. One
//! tokio task runs one session; sessions never share mutable state, and
//! messages from one connection are dispatched strictly in arrival order.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use lorawan_protocol::{ProtocolError, MAX_MESSAGE_SIZE};

use crate::server::reassembly::MessageAssembler;
use crate::server::transport::{Transport, TransportError};

/// Session lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgrade accepted, loop not started yet.
    Open,
    /// Read loop running.
    Receiving,
    /// Close sequence in progress.
    Closing,
    Closed,
}

/// Faults surfaced by a message handler. Either kind ends the session.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Caller-supplied dispatch for assembled messages. One handler serves a
/// connection for its whole lifetime; returning `true` asks the session to
/// close.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        message: &str,
        transport: &mut dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<bool, HandlerError>;
}

/// Per-session tunables.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Upper bound on waiting for the close frame to flush.
    pub close_timeout: Duration,
    /// Cap on one assembled message.
    pub max_message_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            close_timeout: Duration::from_secs(5),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// One gateway connection.
pub struct Session {
    id: u64,
    transport: Box<dyn Transport>,
    assembler: MessageAssembler,
    state: SessionState,
    config: SessionConfig,
    cancel: CancellationToken,
    disconnect_reason: Option<&'static str>,
}

impl Session {
    pub fn new(
        id: u64,
        transport: Box<dyn Transport>,
        config: SessionConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            transport,
            assembler: MessageAssembler::new(config.max_message_size),
            state: SessionState::Open,
            config,
            cancel,
            disconnect_reason: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn disconnect_reason(&self) -> Option<&'static str> {
        self.disconnect_reason
    }

    /// Run the session until the handler requests close, the peer
    /// disconnects, a fault occurs or cancellation fires, then close.
    pub async fn run(&mut self, handler: &dyn MessageHandler) {
        self.state = SessionState::Receiving;
        let cancel = self.cancel.clone();

        let reason = loop {
            let fragment = tokio::select! {
                biased;

                _ = cancel.cancelled() => break "cancelled",

                received = self.transport.receive() => match received {
                    Ok(Some(fragment)) => fragment,
                    Ok(None) => break "peer_closed",
                    Err(e) => {
                        warn!("[Session {}] Transport error: {}", self.id, e);
                        break "transport_error";
                    }
                },
            };

            match self
                .assembler
                .push(&fragment.payload, fragment.is_text, fragment.is_final)
            {
                Ok(Some(message)) => {
                    debug!(
                        "[Session {}] Message assembled ({} bytes)",
                        self.id,
                        message.len()
                    );
                    // Dispatch is sequential: no further reads happen while
                    // the handler runs, so a slow handler backpressures the
                    // connection.
                    let close_requested = tokio::select! {
                        biased;

                        _ = cancel.cancelled() => break "cancelled",

                        result = handler.handle(&message, self.transport.as_mut(), &cancel) => {
                            match result {
                                Ok(close) => close,
                                Err(e) => {
                                    warn!("[Session {}] Handler fault: {}", self.id, e);
                                    break "handler_fault";
                                }
                            }
                        }
                    };
                    if close_requested {
                        break "handler_close";
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("[Session {}] Protocol fault: {}", self.id, e);
                    break "protocol_fault";
                }
            }
        };

        self.disconnect_reason = Some(reason);
        info!("[Session {}] Closing ({})", self.id, reason);
        self.close().await;
    }

    /// Close the session. Sends a normal-closure frame when the connection
    /// is still open; a no-op on an already closed or closing session, so
    /// closing twice never sends a second frame and never faults. The send
    /// is best-effort and bounded by the close timeout.
    pub async fn close(&mut self) {
        if matches!(self.state, SessionState::Closing | SessionState::Closed) {
            return;
        }
        self.state = SessionState::Closing;

        if self.transport.is_open() {
            match tokio::time::timeout(
                self.config.close_timeout,
                self.transport.close("NormalClosure"),
            )
            .await
            {
                Ok(Ok(())) => debug!("[Session {}] Close frame sent", self.id),
                Ok(Err(e)) => warn!("[Session {}] Close failed: {}", self.id, e),
                Err(_) => warn!(
                    "[Session {}] Close timed out after {:?}",
                    self.id, self.config.close_timeout
                ),
            }
        }

        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::server::transport::testing::MockTransport;
    use crate::server::transport::Fragment;

    struct RecordingHandler {
        messages: Mutex<Vec<String>>,
        close_after: Option<usize>,
        invocations: AtomicUsize,
    }

    impl RecordingHandler {
        fn new(close_after: Option<usize>) -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
                close_after,
                invocations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle(
            &self,
            message: &str,
            _transport: &mut dyn Transport,
            _cancel: &CancellationToken,
        ) -> Result<bool, HandlerError> {
            let count = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
            self.messages.lock().unwrap().push(message.to_string());
            Ok(self.close_after.map(|n| count >= n).unwrap_or(false))
        }
    }

    fn session_with(transport: MockTransport) -> (Session, CancellationToken) {
        let cancel = CancellationToken::new();
        let session = Session::new(
            1,
            Box::new(transport),
            SessionConfig::default(),
            cancel.clone(),
        );
        (session, cancel)
    }

    #[tokio::test]
    async fn test_fragmented_message_dispatches_once() {
        let transport = MockTransport::with_fragments(vec![
            Fragment::text("long", false),
            Fragment::text("test", true),
        ]);
        let counters = transport.counters();
        let (mut session, _cancel) = session_with(transport);
        let handler = RecordingHandler::new(None);

        session.run(&handler).await;

        assert_eq!(*handler.messages.lock().unwrap(), vec!["longtest"]);
        assert_eq!(session.disconnect_reason(), Some("peer_closed"));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(counters.close_frames(), 1);
    }

    #[tokio::test]
    async fn test_two_messages_dispatch_in_order() {
        let transport = MockTransport::with_fragments(vec![
            Fragment::text("shortMessage1", true),
            Fragment::text("shortMessage2", true),
        ]);
        let (mut session, _cancel) = session_with(transport);
        let handler = RecordingHandler::new(None);

        session.run(&handler).await;

        assert_eq!(
            *handler.messages.lock().unwrap(),
            vec!["shortMessage1", "shortMessage2"]
        );
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handler_requested_close() {
        let transport = MockTransport::with_fragments(vec![
            Fragment::text("first", true),
            Fragment::text("never dispatched", true),
        ]);
        let counters = transport.counters();
        let (mut session, _cancel) = session_with(transport);
        let handler = RecordingHandler::new(Some(1));

        session.run(&handler).await;

        assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);
        assert_eq!(session.disconnect_reason(), Some("handler_close"));
        assert_eq!(counters.close_frames(), 1);
    }

    #[tokio::test]
    async fn test_binary_fragment_is_a_protocol_fault() {
        let transport =
            MockTransport::with_fragments(vec![Fragment::binary(vec![0x47, 0x11])]);
        let counters = transport.counters();
        let (mut session, _cancel) = session_with(transport);
        let handler = RecordingHandler::new(None);

        session.run(&handler).await;

        assert_eq!(handler.invocations.load(Ordering::SeqCst), 0);
        assert_eq!(session.disconnect_reason(), Some("protocol_fault"));
        assert_eq!(counters.close_frames(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transport = MockTransport::with_fragments(vec![]);
        let counters = transport.counters();
        let (mut session, _cancel) = session_with(transport);
        let handler = RecordingHandler::new(None);

        session.run(&handler).await;
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(counters.close_frames(), 1);

        // A second close sends nothing and does not fault.
        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(counters.close_frames(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_a_blocked_read() {
        let transport = MockTransport::blocking_when_drained(vec![Fragment::text(
            "handled before cancellation",
            true,
        )]);
        let counters = transport.counters();
        let (mut session, cancel) = session_with(transport);
        let handler = RecordingHandler::new(None);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        session.run(&handler).await;
        canceller.await.unwrap();

        // The already-dispatched message is not rolled back.
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);
        assert_eq!(session.disconnect_reason(), Some("cancelled"));
        // The close sequence still ran, best-effort.
        assert_eq!(counters.close_frames(), 1);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_pre_cancelled_session_closes_immediately() {
        let transport =
            MockTransport::with_fragments(vec![Fragment::text("unread", true)]);
        let (mut session, cancel) = session_with(transport);
        cancel.cancel();
        let handler = RecordingHandler::new(None);

        session.run(&handler).await;

        assert_eq!(handler.invocations.load(Ordering::SeqCst), 0);
        assert_eq!(session.disconnect_reason(), Some("cancelled"));
        assert_eq!(session.state(), SessionState::Closed);
    }
}

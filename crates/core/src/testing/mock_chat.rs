//! Scripted chat service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::testing::MockClock;
use crate::vote::{ChatConnector, ChatTransport, VoteError};

enum ScriptEvent {
    Line(String),
    Close,
}

/// Inbound chat traffic for one connection, served in order. An exhausted
/// script reads as an idle connection.
pub struct ChatScript {
    events: VecDeque<ScriptEvent>,
}

impl ChatScript {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Deliver one inbound line.
    pub fn line(&mut self, line: String) {
        self.events.push_back(ScriptEvent::Line(line));
    }

    /// Close the connection at this point.
    pub fn close(&mut self) {
        self.events.push_back(ScriptEvent::Close);
    }
}

impl Default for ChatScript {
    fn default() -> Self {
        Self::new()
    }
}

/// Connector serving a scripted transport.
///
/// Every read advances the shared [`MockClock`] by the read timeout, so a
/// wall-clock vote window closes after finitely many reads without any real
/// waiting.
pub struct MockChatConnector {
    script: Mutex<Option<ChatScript>>,
    error: Mutex<Option<VoteError>>,
    sent: Arc<Mutex<Vec<String>>>,
    clock: Arc<MockClock>,
}

impl MockChatConnector {
    pub fn new(script: ChatScript, clock: Arc<MockClock>) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            error: Mutex::new(None),
            sent: Arc::new(Mutex::new(Vec::new())),
            clock,
        }
    }

    /// Connector whose `connect` fails with the given error.
    pub fn failing(error: VoteError, clock: Arc<MockClock>) -> Self {
        Self {
            script: Mutex::new(None),
            error: Mutex::new(Some(error)),
            sent: Arc::new(Mutex::new(Vec::new())),
            clock,
        }
    }

    /// Every line sent over the transport, in order.
    pub async fn sent_lines(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatConnector for MockChatConnector {
    async fn connect(&self) -> Result<Box<dyn ChatTransport>, VoteError> {
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }

        let script = self.script.lock().unwrap().take().unwrap_or_default();
        Ok(Box::new(ScriptedTransport {
            events: script.events,
            sent: Arc::clone(&self.sent),
            clock: Arc::clone(&self.clock),
        }))
    }
}

struct ScriptedTransport {
    events: VecDeque<ScriptEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    clock: Arc<MockClock>,
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send_line(&mut self, line: &str) -> Result<(), VoteError> {
        self.sent.lock().unwrap().push(line.to_string());
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, VoteError> {
        self.clock.advance(timeout);
        tokio::task::yield_now().await;
        match self.events.pop_front() {
            Some(ScriptEvent::Line(line)) => Ok(Some(line)),
            Some(ScriptEvent::Close) => Err(VoteError::ConnectionClosed),
            None => Ok(None),
        }
    }
}

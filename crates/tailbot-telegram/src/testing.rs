//! In-memory collaborators for handler tests.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tailbot_tailnet::{Device, DeviceSource, TailnetError};

use crate::incoming::{ChatType, IncomingMessage, Sender};
use crate::messenger::{DeliveryError, DeliveryErrorKind, Messenger, OutgoingMessage, SentMessage};

pub const DEVELOPER_ID: i64 = 42;

/// A private-chat message from the developer.
pub fn incoming(text: &str) -> IncomingMessage {
    incoming_from(DEVELOPER_ID, DEVELOPER_ID, ChatType::Private, text)
}

pub fn incoming_from(user_id: i64, chat_id: i64, chat_type: ChatType, text: &str) -> IncomingMessage {
    IncomingMessage {
        update_id: 1000,
        message_id: 7,
        chat_id,
        chat_type,
        sender: Some(Sender {
            id: user_id,
            name: "Test User".to_string(),
            username: Some("tester".to_string()),
        }),
        text: Some(text.to_string()),
    }
}

/// Records every send and delete; can be told to fail or stall.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(i64, OutgoingMessage)>>,
    deleted: Mutex<Vec<(i64, i32)>>,
    failures: Vec<(String, DeliveryErrorKind)>,
    delays: Vec<(String, Duration)>,
    fail_deletes: bool,
    attempts: AtomicUsize,
    delete_attempts: AtomicUsize,
    next_id: AtomicI32,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail sends whose text contains `pattern`.
    pub fn fail_when(mut self, pattern: &str, kind: DeliveryErrorKind) -> Self {
        self.failures.push((pattern.to_string(), kind));
        self
    }

    /// Stall sends whose text contains `pattern`.
    pub fn delay_when(mut self, pattern: &str, delay: Duration) -> Self {
        self.delays.push((pattern.to_string(), delay));
        self
    }

    pub fn fail_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn sent(&self) -> Vec<(i64, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, m)| m.text).collect()
    }

    pub fn deleted(&self) -> Vec<(i64, i32)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delete_attempts(&self) -> usize {
        self.delete_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> Result<SentMessage, DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .delays
            .iter()
            .find(|(pattern, _)| message.text.contains(pattern.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((_, kind)) = self
            .failures
            .iter()
            .find(|(pattern, _)| message.text.contains(pattern.as_str()))
        {
            return Err(DeliveryError::new(*kind, format!("simulated {:?}", kind)));
        }

        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 100;
        self.sent.lock().unwrap().push((chat_id, message));
        Ok(SentMessage { chat_id, message_id })
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<(), DeliveryError> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes {
            return Err(DeliveryError::new(
                DeliveryErrorKind::Other,
                "Bad Request: message to delete not found",
            ));
        }
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }
}

/// Device source returning a fixed answer.
pub struct StubDevices {
    devices: Result<Vec<Device>, String>,
    calls: AtomicUsize,
}

impl StubDevices {
    pub fn ok(devices: Vec<Device>) -> Self {
        Self {
            devices: Ok(devices),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every fetch fails with a network error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            devices: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceSource for StubDevices {
    async fn fetch_devices(&self) -> tailbot_tailnet::Result<Vec<Device>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.devices.clone().map_err(TailnetError::Network)
    }
}

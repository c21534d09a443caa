//! SMTP transport emulation
//!
//! Sending delivers straight into each recipient's INBOX in the same
//! registry.

use crate::content::MessageContent;
use crate::error::{Error, Result};
use crate::mailbox::MailboxRegistry;
use crate::message::Message;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Observer of deliveries made by a [`Transport`]. Every method
/// defaults to a no-op.
pub trait TransportListener: Send + Sync {
    /// `content` was stored in the INBOX of `recipient`.
    fn message_delivered(&self, _content: &MessageContent, _recipient: &str) {}

    /// Delivery to `recipient` failed; no later recipient was tried.
    fn message_not_delivered(&self, _content: &MessageContent, _recipient: &str) {}
}

/// A simulated SMTP connection.
pub struct Transport {
    registry: Arc<MailboxRegistry>,
    connected: AtomicBool,
    listeners: Mutex<Vec<Arc<dyn TransportListener>>>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Transport {
    #[must_use]
    pub const fn new(registry: Arc<MailboxRegistry>) -> Self {
        Self {
            registry,
            connected: AtomicBool::new(false),
            listeners: parking_lot::const_mutex(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn TransportListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn TransportListener>) {
        self.listeners.lock().retain(|l| !Arc::ptr_eq(l, listener));
    }

    fn listeners(&self) -> Vec<Arc<dyn TransportListener>> {
        self.listeners.lock().clone()
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if already connected.
    pub fn connect(&self) -> Result<()> {
        if self.connected.swap(true, Ordering::AcqRel) {
            return Err(Error::InvalidState("already connected".into()));
        }
        debug!("Transport connected");
        Ok(())
    }

    pub fn close(&self) {
        self.connected.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Deliver `content` to the INBOX of every recipient, in order.
    /// Returns the stored copies.
    ///
    /// Delivery stops at the first recipient whose INBOX simulates
    /// errors; recipients before it keep their copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for a malformed recipient and
    /// [`Error::SimulatedFailure`] for a failing INBOX.
    pub fn send(&self, content: &MessageContent, recipients: &[&str]) -> Result<Vec<Message>> {
        let mut delivered = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let inbox = self.registry.get(recipient)?.inbox();
            if inbox.is_simulate_error() {
                for listener in self.listeners() {
                    listener.message_not_delivered(content, recipient);
                }
                return Err(Error::SimulatedFailure(format!(
                    "Simulated error sending message to {recipient}"
                )));
            }
            delivered.push(inbox.add(content.clone())?);
            info!("Message delivered to {}", recipient);
            for listener in self.listeners() {
                listener.message_delivered(content, recipient);
            }
        }
        Ok(delivered)
    }
}

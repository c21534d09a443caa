//! Folder change notification
//!
//! Folders announce structural and content changes to every
//! registered [`MailboxEventListener`]. Events produced by one
//! mutation are queued while the folder lock is held and delivered
//! after it is released, in registration order, so a listener may
//! call back into the folder that notified it.

use crate::folder::Folder;
use crate::message::Message;
use std::sync::Arc;

/// Observer of a single folder. Every method defaults to a no-op.
pub trait MailboxEventListener: Send + Sync {
    fn folder_created(&self, _folder: &Folder) {}

    fn folder_deleted(&self, _folder: &Folder) {}

    /// `old_name` is the short name before the rename; `folder`
    /// already carries the new one.
    fn folder_renamed(&self, _old_name: &str, _folder: &Folder) {}

    fn message_added(&self, _folder: &Folder, _message: &Message) {}

    fn message_changed(
        &self,
        _folder: &Folder,
        _message: &Message,
        _header_changed: bool,
        _flags_changed: bool,
    ) {
    }

    fn message_expunged(&self, _folder: &Folder, _message: &Message, _removed: bool) {}

    fn uid_invalidated(&self, _folder: &Folder) {}
}

/// A queued notification.
#[derive(Debug, Clone)]
pub(crate) enum MailboxEvent {
    FolderCreated,
    FolderDeleted,
    FolderRenamed(String),
    MessageAdded(Message),
    MessageChanged(Message),
    MessageExpunged(Message),
    UidInvalidated,
}

/// Events collected during one critical section together with the
/// listeners registered at that moment.
#[must_use]
pub(crate) struct PendingEvents {
    listeners: Vec<Arc<dyn MailboxEventListener>>,
    events: Vec<MailboxEvent>,
}

impl PendingEvents {
    pub(crate) fn new(listeners: &[Arc<dyn MailboxEventListener>]) -> Self {
        Self {
            listeners: listeners.to_vec(),
            events: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, event: MailboxEvent) {
        self.events.push(event);
    }

    /// Deliver every queued event. Must be called without holding the
    /// folder lock.
    pub(crate) fn dispatch(self, folder: &Folder) {
        for event in &self.events {
            for listener in &self.listeners {
                match event {
                    MailboxEvent::FolderCreated => listener.folder_created(folder),
                    MailboxEvent::FolderDeleted => listener.folder_deleted(folder),
                    MailboxEvent::FolderRenamed(old) => listener.folder_renamed(old, folder),
                    MailboxEvent::MessageAdded(msg) => listener.message_added(folder, msg),
                    MailboxEvent::MessageChanged(msg) => {
                        listener.message_changed(folder, msg, false, true);
                    }
                    MailboxEvent::MessageExpunged(msg) => {
                        listener.message_expunged(folder, msg, true);
                    }
                    MailboxEvent::UidInvalidated => listener.uid_invalidated(folder),
                }
            }
        }
    }
}

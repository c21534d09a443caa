//! Stored messages
//!
//! A [`Message`] is created only by [`Folder::add`](crate::Folder::add).
//! Its content is fixed; flags are the sole mutable part, and every
//! flag change is reported back to the owning folder. Clones share
//! state: a flag set through one handle is visible through all.

use crate::content::MessageContent;
use crate::error::{Error, Result};
use crate::flag::{Flag, Flags};
use crate::folder::{Folder, FolderNode};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

/// Header carrying the folder-assigned identity.
pub const MESSAGE_ID_HEADER: &str = "Message-ID";
/// Header carrying the full name of the folder a message was added to.
pub const FOLDER_HEADER: &str = "X-Mock-Folder";

/// A message stored in a folder.
#[derive(Clone)]
pub struct Message {
    inner: Arc<MessageInner>,
}

struct MessageInner {
    uid: u64,
    content: MessageContent,
    special_headers: Vec<(String, String)>,
    flags: Mutex<Flags>,
    expunged: AtomicBool,
    number: AtomicUsize,
    folder: Weak<FolderNode>,
}

impl Message {
    pub(crate) fn new(
        content: MessageContent,
        uid: u64,
        folder: Weak<FolderNode>,
        folder_name: String,
    ) -> Self {
        Self {
            inner: Arc::new(MessageInner {
                uid,
                content,
                special_headers: vec![
                    (MESSAGE_ID_HEADER.to_string(), uid.to_string()),
                    (FOLDER_HEADER.to_string(), folder_name),
                ],
                flags: Mutex::new(Flags::from(Flag::Recent)),
                expunged: AtomicBool::new(false),
                number: AtomicUsize::new(0),
                folder,
            }),
        }
    }

    /// Permanent, folder-scoped identifier.
    #[must_use]
    pub fn uid(&self) -> u64 {
        self.inner.uid
    }

    /// 1-based position assigned by the most recent folder read.
    /// Zero until the message has been read through its folder.
    #[must_use]
    pub fn message_number(&self) -> usize {
        self.inner.number.load(AtomicOrdering::Acquire)
    }

    pub(crate) fn set_message_number(&self, number: usize) {
        self.inner.number.store(number, AtomicOrdering::Release);
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.inner.flags.lock().clone()
    }

    #[must_use]
    pub fn is_set(&self, flag: &Flag) -> bool {
        self.inner.flags.lock().contains(flag)
    }

    #[must_use]
    pub fn is_expunged(&self) -> bool {
        self.inner.expunged.load(AtomicOrdering::Acquire)
    }

    pub(crate) fn mark_expunged(&self) {
        self.inner.expunged.store(true, AtomicOrdering::Release);
    }

    /// The folder this message was added to, if it is still alive.
    #[must_use]
    pub fn folder(&self) -> Option<Folder> {
        self.inner.folder.upgrade().map(Folder::from_node)
    }

    #[must_use]
    pub fn content(&self) -> &MessageContent {
        &self.inner.content
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.inner.content.subject()
    }

    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.inner.content.from()
    }

    #[must_use]
    pub fn recipients(&self) -> &[String] {
        self.inner.content.to()
    }

    #[must_use]
    pub fn sent_date(&self) -> Option<DateTime<Utc>> {
        self.inner.content.date()
    }

    #[must_use]
    pub fn body(&self) -> &str {
        self.inner.content.body()
    }

    /// Header lookup. The synthesized `Message-ID` and `X-Mock-Folder`
    /// headers shadow any header of the same name in the content.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .special_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .or_else(|| self.inner.content.header(name))
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.content.size()
    }

    /// Set or clear `flags`, then notify the owning folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once the message has been
    /// expunged.
    pub fn set_flags(&self, flags: &Flags, set: bool) -> Result<()> {
        if self.is_expunged() {
            return Err(Error::InvalidState(format!(
                "message {} has been expunged",
                self.uid()
            )));
        }

        self.inner.flags.lock().apply(flags, set);

        if let Some(folder) = self.folder() {
            folder.on_flag_change(self);
        }
        Ok(())
    }

    /// Convenience for [`set_flags`](Self::set_flags) with one flag.
    ///
    /// # Errors
    ///
    /// Same as [`set_flags`](Self::set_flags).
    pub fn set_flag(&self, flag: Flag, set: bool) -> Result<()> {
        self.set_flags(&Flags::from(flag), set)
    }

    // -- content is read-only --

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn set_subject(&self, _subject: &str) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn set_from(&self, _from: &str) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn set_recipients(&self, _recipients: &[String]) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn add_recipient(&self, _recipient: &str) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn set_header(&self, _name: &str, _value: &str) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn add_header(&self, _name: &str, _value: &str) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn remove_header(&self, _name: &str) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn set_text(&self, _text: &str) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn set_sent_date(&self, _date: DateTime<Utc>) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// # Errors
    ///
    /// Always [`Error::ReadOnly`].
    #[allow(clippy::unused_self)]
    pub const fn save_changes(&self) -> Result<()> {
        Err(Error::ReadOnly)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("uid", &self.uid())
            .field("number", &self.message_number())
            .field("flags", &self.flags())
            .field("expunged", &self.is_expunged())
            .field("subject", &self.subject())
            .finish()
    }
}

// Messages compare by UID only, which is what folders sort by when
// assigning sequence numbers.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.uid() == other.uid()
    }
}

impl Eq for Message {}

impl PartialOrd for Message {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Message {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uid().cmp(&other.uid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::MailboxRegistry;

    fn sample() -> MessageContent {
        MessageContent::builder()
            .subject("Test")
            .from("from@sender.com")
            .to("hendrik@unknown.com")
            .header("Message-ID", "<original@sender.com>")
            .text("Some text here ...")
            .build()
    }

    #[test]
    fn content_setters_are_read_only() {
        let registry = MailboxRegistry::new();
        let inbox = registry.get("hendrik@unknown.com").unwrap().inbox();
        let msg = inbox.add(sample()).unwrap();

        assert!(matches!(msg.set_header("test", "test"), Err(Error::ReadOnly)));
        assert!(matches!(msg.set_subject("other"), Err(Error::ReadOnly)));
        assert!(matches!(msg.add_recipient("x@y.z"), Err(Error::ReadOnly)));
        assert!(matches!(msg.set_text("body"), Err(Error::ReadOnly)));
        assert!(matches!(msg.save_changes(), Err(Error::ReadOnly)));
        assert_eq!(msg.subject(), Some("Test"));
    }

    #[test]
    fn synthesized_headers_shadow_content() {
        let registry = MailboxRegistry::new();
        let inbox = registry.get("hendrik@unknown.com").unwrap().inbox();
        let msg = inbox.add(sample()).unwrap();

        assert_eq!(msg.header("message-id"), Some("11"));
        assert_eq!(msg.header(FOLDER_HEADER), Some("INBOX"));
        assert_eq!(msg.header("From"), Some("from@sender.com"));
    }

    #[test]
    fn new_messages_are_recent() {
        let registry = MailboxRegistry::new();
        let inbox = registry.get("hendrik@unknown.com").unwrap().inbox();
        let msg = inbox.add(sample()).unwrap();

        assert!(msg.is_set(&Flag::Recent));
        assert!(!msg.is_set(&Flag::Seen));
    }

    #[test]
    fn flags_are_shared_between_clones() {
        let registry = MailboxRegistry::new();
        let inbox = registry.get("hendrik@unknown.com").unwrap().inbox();
        let msg = inbox.add(sample()).unwrap();
        let other = msg.clone();

        msg.set_flag(Flag::Flagged, true).unwrap();
        assert!(other.is_set(&Flag::Flagged));
        msg.set_flag(Flag::Flagged, false).unwrap();
        assert!(!other.is_set(&Flag::Flagged));
    }

    #[test]
    fn expunged_message_rejects_flag_changes() {
        let registry = MailboxRegistry::new();
        let inbox = registry.get("hendrik@unknown.com").unwrap().inbox();
        let msg = inbox.add(sample()).unwrap();

        msg.set_flag(Flag::Deleted, true).unwrap();
        inbox.expunge().unwrap();

        assert!(msg.is_expunged());
        assert!(matches!(
            msg.set_flag(Flag::Seen, true),
            Err(Error::InvalidState(_))
        ));
        // Still readable as a detached snapshot.
        assert_eq!(msg.subject(), Some("Test"));
    }

    #[test]
    fn ordering_follows_uid() {
        let registry = MailboxRegistry::new();
        let inbox = registry.get("hendrik@unknown.com").unwrap().inbox();
        let a = inbox.add(sample()).unwrap();
        let b = inbox.add(sample()).unwrap();

        assert!(a < b);
        let mut v = vec![b.clone(), a.clone()];
        v.sort();
        assert_eq!(v, vec![a, b]);
    }
}

//! Per-client folder views
//!
//! A [`FolderView`] is what a connected client holds: a [`Folder`]
//! plus the client's open/closed state, its own change observers and
//! an IDLE gate. Views register as [`MailboxEventListener`]s on their
//! folder so appends made through one client show up in every other
//! client's view of the same folder.
//!
//! Every operation first aborts a pending IDLE on the same view.

use crate::content::MessageContent;
use crate::error::{Error, Result};
use crate::event::MailboxEventListener;
use crate::flag::Flags;
use crate::folder::Folder;
use crate::idle::{IdleExit, IdleGate};
use crate::message::Message;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Wire protocol a view emulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Imap,
    Pop3,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imap => f.write_str("imap"),
            Self::Pop3 => f.write_str("pop3"),
        }
    }
}

/// Access mode of an open view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// UID assigned by an append, as reported by `APPENDUID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendUid {
    pub uid_validity: u64,
    pub uid: u64,
}

/// Client-side observer of a [`FolderView`]. Every method defaults to
/// a no-op.
pub trait ViewListener: Send + Sync {
    fn messages_added(&self, _messages: &[Message]) {}

    fn messages_removed(&self, _messages: &[Message]) {}

    fn message_changed(&self, _message: &Message) {}

    fn opened(&self, _folder: &Folder) {}

    fn closed(&self, _folder: &Folder) {}
}

struct ViewInner {
    protocol: Protocol,
    mode: Mutex<Option<OpenMode>>,
    gate: IdleGate,
    listeners: Mutex<Vec<Arc<dyn ViewListener>>>,
}

impl ViewInner {
    fn is_open(&self) -> bool {
        self.mode.lock().is_some()
    }

    fn listeners(&self) -> Vec<Arc<dyn ViewListener>> {
        self.listeners.lock().clone()
    }
}

impl MailboxEventListener for ViewInner {
    fn message_added(&self, _folder: &Folder, message: &Message) {
        if self.protocol == Protocol::Pop3 {
            return;
        }
        for listener in self.listeners() {
            listener.messages_added(std::slice::from_ref(message));
        }
        self.gate.wake();
    }

    fn message_changed(
        &self,
        _folder: &Folder,
        message: &Message,
        _header_changed: bool,
        _flags_changed: bool,
    ) {
        for listener in self.listeners() {
            listener.message_changed(message);
        }
        self.gate.wake();
    }

    fn message_expunged(&self, _folder: &Folder, _message: &Message, _removed: bool) {
        self.gate.wake();
    }
}

/// One client's handle on a folder.
pub struct FolderView {
    folder: Folder,
    inner: Arc<ViewInner>,
    registration: Arc<dyn MailboxEventListener>,
}

impl FolderView {
    #[must_use]
    pub fn new(folder: Folder, protocol: Protocol) -> Self {
        let inner = Arc::new(ViewInner {
            protocol,
            mode: Mutex::new(None),
            gate: IdleGate::new(),
            listeners: Mutex::new(Vec::new()),
        });
        let registration: Arc<dyn MailboxEventListener> = inner.clone();
        folder.add_listener(registration.clone());
        debug!("{} view on '{}' created", protocol, folder.full_name());

        Self {
            folder,
            inner,
            registration,
        }
    }

    /// The underlying folder.
    #[must_use]
    pub const fn as_folder(&self) -> &Folder {
        &self.folder
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.inner.protocol
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.folder.name()
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        self.folder.full_name()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Current mode; `None` while closed.
    #[must_use]
    pub fn mode(&self) -> Option<OpenMode> {
        *self.inner.mode.lock()
    }

    pub fn add_listener(&self, listener: Arc<dyn ViewListener>) {
        self.inner.listeners.lock().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ViewListener>) {
        self.inner
            .listeners
            .lock()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    fn sibling(&self, folder: Folder) -> Self {
        Self::new(folder, self.inner.protocol)
    }

    // -- guards --

    /// Whether a caller is blocked in [`idle`](Self::idle).
    #[must_use]
    pub fn is_idling(&self) -> bool {
        self.inner.gate.is_waiting()
    }

    /// Make a pending IDLE on this view return.
    pub fn abort_idle(&self) {
        self.inner.gate.abort();
    }

    fn check_exists(&self) -> Result<()> {
        if self.folder.exists() {
            Ok(())
        } else {
            Err(Error::NotFound(format!("{} not found", self.full_name())))
        }
    }

    fn check_opened(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "operation not allowed on a closed folder: {}",
                self.full_name()
            )))
        }
    }

    fn check_closed(&self) -> Result<()> {
        if self.is_open() {
            Err(Error::InvalidState(format!(
                "operation not allowed on an open folder: {}",
                self.full_name()
            )))
        } else {
            Ok(())
        }
    }

    fn check_write_mode(&self) -> Result<()> {
        if self.inner.protocol == Protocol::Imap && self.mode() != Some(OpenMode::ReadWrite) {
            return Err(Error::InvalidState(format!(
                "folder {} is read-only",
                self.full_name()
            )));
        }
        Ok(())
    }

    // -- lifecycle --

    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if already open and
    /// [`Error::NotFound`] if the folder does not exist.
    pub fn open(&self, mode: OpenMode) -> Result<()> {
        self.check_closed()?;
        self.check_exists()?;
        *self.inner.mode.lock() = Some(mode);
        debug!("Open folder {} ({:?})", self.full_name(), mode);

        for listener in self.inner.listeners() {
            listener.opened(&self.folder);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Always [`Error::Unsupported`] when `modseq` is given; otherwise
    /// the same as [`open`](Self::open).
    pub fn open_with_resync(&self, mode: OpenMode, modseq: Option<u64>) -> Result<()> {
        match modseq {
            None => self.open(mode),
            Some(_) => Err(Error::Unsupported("CONDSTORE and QRESYNC")),
        }
    }

    /// Close the view, optionally expunging first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if not open and
    /// [`Error::NotFound`] if the folder does not exist.
    pub fn close(&self, expunge: bool) -> Result<()> {
        self.abort_idle();
        self.check_opened()?;
        self.check_exists()?;

        if expunge {
            let removed = self.folder.expunge()?;
            if self.inner.protocol == Protocol::Imap {
                self.notify_removed(&removed);
            }
        }

        *self.inner.mode.lock() = None;
        debug!("Folder {} closed", self.full_name());

        for listener in self.inner.listeners() {
            listener.closed(&self.folder);
        }
        Ok(())
    }

    /// Create the folder. Returns `true` if it already existed.
    ///
    /// # Errors
    ///
    /// Same as [`Folder::create`].
    pub fn create(&self) -> Result<bool> {
        self.abort_idle();
        if self.folder.exists() {
            return Ok(true);
        }
        self.folder.create()?;
        Ok(self.folder.exists())
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist,
    /// [`Error::InvalidState`] while open, and otherwise the same as
    /// [`Folder::delete_folder`].
    pub fn delete(&self, recurse: bool) -> Result<bool> {
        self.abort_idle();
        self.check_exists()?;
        self.check_closed()?;
        self.folder.delete_folder(recurse)?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while open,
    /// [`Error::NotFound`] if the folder does not exist, and otherwise
    /// the same as [`Folder::rename_folder`].
    pub fn rename_to(&self, name: &str) -> Result<bool> {
        self.abort_idle();
        self.check_closed()?;
        self.check_exists()?;
        self.folder.rename_folder(name)?;
        Ok(true)
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.abort_idle();
        self.folder.exists()
    }

    // -- navigation --

    /// A view on the subfolder `name`, which may not exist yet.
    ///
    /// # Errors
    ///
    /// Same as [`Folder::get_or_add_sub_folder`].
    pub fn folder(&self, name: &str) -> Result<Self> {
        self.abort_idle();
        debug!("folder({}) on {}", name, self.full_name());
        Ok(self.sibling(self.folder.get_or_add_sub_folder(name)?))
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist or is
    /// the root.
    pub fn parent(&self) -> Result<Self> {
        self.check_exists()?;
        let parent = self.folder.parent()?.ok_or_else(|| {
            Error::NotFound("no parent, is already default root".to_string())
        })?;
        Ok(self.sibling(parent))
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist.
    pub fn list(&self) -> Result<Vec<Self>> {
        self.abort_idle();
        self.check_exists()?;
        let children = self.folder.list()?;
        debug!("Folder ({}) list returns {}", self.full_name(), children.len());
        Ok(children.into_iter().map(|f| self.sibling(f)).collect())
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist.
    pub fn list_subscribed(&self) -> Result<Vec<Self>> {
        self.abort_idle();
        self.check_exists()?;
        Ok(self
            .folder
            .list_subscribed()?
            .into_iter()
            .map(|f| self.sibling(f))
            .collect())
    }

    pub fn set_subscribed(&self, subscribed: bool) {
        self.abort_idle();
        self.folder.set_subscribed(subscribed);
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.abort_idle();
        self.folder.is_subscribed()
    }

    // -- counts --

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist.
    pub fn message_count(&self) -> Result<usize> {
        self.abort_idle();
        self.check_exists()?;
        self.folder.message_count()
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist.
    pub fn new_message_count(&self) -> Result<usize> {
        self.abort_idle();
        self.check_exists()?;
        self.folder.new_count()
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist.
    pub fn unread_message_count(&self) -> Result<usize> {
        self.abort_idle();
        self.check_exists()?;
        self.folder.unread_count()
    }

    /// `None` while the view is closed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist.
    pub fn deleted_message_count(&self) -> Result<Option<usize>> {
        self.abort_idle();
        self.check_exists()?;
        if !self.is_open() {
            return Ok(None);
        }
        self.folder.deleted_count().map(Some)
    }

    // -- reads --

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist,
    /// [`Error::InvalidState`] while closed and [`Error::Bounds`] for
    /// a number outside the folder.
    pub fn message(&self, number: usize) -> Result<Message> {
        self.abort_idle();
        self.check_exists()?;
        self.check_opened()?;
        self.folder.get_by_msg_num(number)
    }

    /// Messages `low..=high` by sequence number.
    ///
    /// # Errors
    ///
    /// Same as [`message`](Self::message) for each number.
    pub fn messages(&self, low: usize, high: usize) -> Result<Vec<Message>> {
        self.abort_idle();
        self.check_exists()?;
        self.check_opened()?;
        (low..=high)
            .map(|n| self.folder.get_by_msg_num(n))
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist and
    /// [`Error::InvalidState`] while closed.
    pub fn message_by_uid(&self, uid: u64) -> Result<Option<Message>> {
        self.abort_idle();
        self.check_exists()?;
        self.check_opened()?;
        self.folder.get_by_id(uid)
    }

    /// See [`Folder::get_by_id_range`] for the meaning of
    /// [`LAST_UID`](crate::LAST_UID) as `end`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist and
    /// [`Error::InvalidState`] while closed.
    pub fn messages_by_uid_range(&self, start: u64, end: u64) -> Result<Vec<Message>> {
        self.abort_idle();
        self.check_exists()?;
        self.check_opened()?;
        self.folder.get_by_id_range(start, end)
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist and
    /// [`Error::InvalidState`] while closed.
    pub fn messages_by_uids(&self, uids: &[u64]) -> Result<Vec<Message>> {
        self.abort_idle();
        self.check_exists()?;
        self.check_opened()?;
        self.folder.get_by_ids(uids)
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while closed.
    pub fn search(
        &self,
        predicate: impl Fn(&Message) -> bool,
        within: Option<&[Message]>,
    ) -> Result<Vec<Message>> {
        self.abort_idle();
        self.check_opened()?;
        self.folder.search(predicate, within)
    }

    // -- writes --

    /// Append messages; the view does not need to be open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist and
    /// [`Error::SimulatedFailure`] if the folder simulates errors.
    pub fn append_messages(&self, contents: &[MessageContent]) -> Result<Vec<AppendUid>> {
        self.abort_idle();
        self.check_exists()?;
        if self.folder.is_simulate_error() {
            return Err(Error::SimulatedFailure(format!(
                "Simulated error appending to {}",
                self.full_name()
            )));
        }

        let mut uids = Vec::with_capacity(contents.len());
        for content in contents {
            let message = self.folder.add(content.clone())?;
            uids.push(AppendUid {
                uid_validity: self.folder.uid_validity()?,
                uid: message.uid(),
            });
        }

        debug!("Append {} to {}", contents.len(), self.full_name());
        Ok(uids)
    }

    /// Copy `messages` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while closed,
    /// [`Error::NotFound`] if either folder does not exist, and
    /// otherwise the same as [`append_messages`](Self::append_messages)
    /// on `dest`.
    pub fn copy_messages(&self, messages: &[Message], dest: &Self) -> Result<Vec<AppendUid>> {
        self.abort_idle();
        self.check_opened()?;
        self.check_exists()?;
        if messages.is_empty() {
            return Ok(Vec::new());
        }
        if !dest.folder.exists() {
            return Err(Error::NotFound(format!(
                "{} does not exist",
                dest.full_name()
            )));
        }

        let contents: Vec<MessageContent> = messages.iter().map(|m| m.content().clone()).collect();
        let uids = dest.append_messages(&contents)?;
        debug!("Copied {} to {}", messages.len(), dest.full_name());
        Ok(uids)
    }

    /// Set or clear `flags` on the stored copies of `messages`.
    /// Messages no longer in the folder are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while closed.
    pub fn set_flags(&self, messages: &[Message], flags: &Flags, set: bool) -> Result<()> {
        self.abort_idle();
        self.check_opened()?;
        for message in messages {
            if let Some(stored) = self.folder.get_by_id(message.uid())? {
                stored.set_flags(flags, set)?;
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the folder does not exist and
    /// [`Error::InvalidState`] while closed or, over IMAP, when not
    /// opened read-write.
    pub fn expunge(&self) -> Result<Vec<Message>> {
        self.abort_idle();
        self.check_exists()?;
        self.check_opened()?;
        self.check_write_mode()?;
        let removed = self.folder.expunge()?;
        self.notify_removed(&removed);
        Ok(removed)
    }

    /// Like [`expunge`](Self::expunge), limited to `messages`.
    ///
    /// # Errors
    ///
    /// Same as [`expunge`](Self::expunge).
    pub fn expunge_messages(&self, messages: &[Message]) -> Result<Vec<Message>> {
        self.abort_idle();
        self.check_exists()?;
        self.check_opened()?;
        self.check_write_mode()?;
        let removed = self.folder.expunge_messages(messages)?;
        self.notify_removed(&removed);
        Ok(removed)
    }

    fn notify_removed(&self, removed: &[Message]) {
        if removed.is_empty() {
            return;
        }
        for listener in self.inner.listeners() {
            listener.messages_removed(removed);
        }
    }

    // -- UIDs --

    /// # Errors
    ///
    /// Same as [`Folder::uid_of`].
    pub fn uid_of(&self, message: &Message) -> Result<u64> {
        self.abort_idle();
        self.folder.uid_of(message)
    }

    #[must_use]
    pub fn uid_next(&self) -> u64 {
        self.abort_idle();
        self.folder.uid_next()
    }

    /// # Errors
    ///
    /// Same as [`Folder::uid_validity`].
    pub fn uid_validity(&self) -> Result<u64> {
        self.abort_idle();
        self.folder.uid_validity()
    }

    // -- IDLE --

    /// Wait for a change in this folder. See [`IdleGate::idle`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] for POP3 views and
    /// [`Error::InvalidState`] while closed.
    pub async fn idle(&self, once: bool) -> Result<IdleExit> {
        self.idle_with_cancel(once, &CancellationToken::new()).await
    }

    /// Like [`idle`](Self::idle), ending early when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Same as [`idle`](Self::idle).
    pub async fn idle_with_cancel(&self, once: bool, cancel: &CancellationToken) -> Result<IdleExit> {
        if self.inner.protocol != Protocol::Imap {
            return Err(Error::Unsupported("IDLE"));
        }
        self.check_opened()?;

        trace!("Now idle on {}", self.full_name());
        let exit = self
            .inner
            .gate
            .idle(once, cancel, || self.inner.is_open() && self.folder.exists())
            .await;
        trace!("Return from idle on {} ({:?})", self.full_name(), exit);
        Ok(exit)
    }

    // -- not supported --

    /// # Errors
    ///
    /// Always [`Error::Unsupported`].
    #[allow(clippy::unused_self)]
    pub const fn acl(&self) -> Result<()> {
        Err(Error::Unsupported("ACL"))
    }

    /// # Errors
    ///
    /// Always [`Error::Unsupported`].
    #[allow(clippy::unused_self)]
    pub const fn quota(&self) -> Result<()> {
        Err(Error::Unsupported("QUOTA"))
    }

    /// # Errors
    ///
    /// Always [`Error::Unsupported`].
    #[allow(clippy::unused_self)]
    pub const fn sorted_messages(&self) -> Result<Vec<Message>> {
        Err(Error::Unsupported("SORT"))
    }

    /// # Errors
    ///
    /// Always [`Error::Unsupported`].
    #[allow(clippy::unused_self)]
    pub const fn highest_mod_seq(&self) -> Result<u64> {
        Err(Error::Unsupported("CONDSTORE"))
    }

    /// # Errors
    ///
    /// Always [`Error::Unsupported`].
    #[allow(clippy::unused_self)]
    pub const fn messages_changed_since(
        &self,
        _start: u64,
        _end: u64,
        _modseq: u64,
    ) -> Result<Vec<Message>> {
        Err(Error::Unsupported("CONDSTORE"))
    }
}

impl Drop for FolderView {
    fn drop(&mut self) {
        self.inner.gate.abort();
        self.folder.remove_listener(&self.registration);
    }
}

impl fmt::Debug for FolderView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderView")
            .field("folder", &self.full_name())
            .field("protocol", &self.inner.protocol)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::Flag;
    use crate::mailbox::MailboxRegistry;

    fn content(subject: &str) -> MessageContent {
        MessageContent::builder()
            .subject(subject)
            .from("from@sender.com")
            .to("hendrik@unknown.com")
            .text("Some text here ...")
            .build()
    }

    fn inbox_view(registry: &MailboxRegistry, protocol: Protocol) -> FolderView {
        let inbox = registry.get("hendrik@unknown.com").unwrap().inbox();
        FolderView::new(inbox, protocol)
    }

    #[derive(Default)]
    struct Counter {
        added: Mutex<usize>,
        removed: Mutex<usize>,
        changed: Mutex<usize>,
    }

    impl ViewListener for Counter {
        fn messages_added(&self, messages: &[Message]) {
            *self.added.lock() += messages.len();
        }

        fn messages_removed(&self, messages: &[Message]) {
            *self.removed.lock() += messages.len();
        }

        fn message_changed(&self, _message: &Message) {
            *self.changed.lock() += 1;
        }
    }

    #[test]
    fn open_close_state_checks() {
        let registry = MailboxRegistry::new();
        let view = inbox_view(&registry, Protocol::Imap);

        assert!(matches!(view.message(1), Err(Error::InvalidState(_))));
        assert!(matches!(view.close(false), Err(Error::InvalidState(_))));

        view.open(OpenMode::ReadOnly).unwrap();
        assert!(matches!(
            view.open(OpenMode::ReadOnly),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(view.mode(), Some(OpenMode::ReadOnly));

        view.close(false).unwrap();
        assert!(!view.is_open());
    }

    #[test]
    fn read_only_imap_view_cannot_expunge() {
        let registry = MailboxRegistry::new();
        let view = inbox_view(&registry, Protocol::Imap);
        view.open(OpenMode::ReadOnly).unwrap();

        assert!(matches!(view.expunge(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn appends_are_reported_to_other_views() {
        let registry = MailboxRegistry::new();
        let writer = inbox_view(&registry, Protocol::Imap);
        let reader = inbox_view(&registry, Protocol::Imap);
        let counter = Arc::new(Counter::default());
        reader.add_listener(counter.clone());

        let uids = writer
            .append_messages(&[content("a"), content("b")])
            .unwrap();

        assert_eq!(
            uids,
            vec![
                AppendUid {
                    uid_validity: 50,
                    uid: 11
                },
                AppendUid {
                    uid_validity: 50,
                    uid: 12
                },
            ]
        );
        assert_eq!(*counter.added.lock(), 2);
    }

    #[test]
    fn pop3_view_ignores_additions() {
        let registry = MailboxRegistry::new();
        let writer = inbox_view(&registry, Protocol::Imap);
        let pop3 = inbox_view(&registry, Protocol::Pop3);
        let counter = Arc::new(Counter::default());
        pop3.add_listener(counter.clone());

        writer.append_messages(&[content("a")]).unwrap();
        assert_eq!(*counter.added.lock(), 0);
        assert_eq!(pop3.message_count().unwrap(), 1);
    }

    #[test]
    fn flag_changes_and_expunge_are_reported() {
        let registry = MailboxRegistry::new();
        let view = inbox_view(&registry, Protocol::Imap);
        let counter = Arc::new(Counter::default());
        view.add_listener(counter.clone());

        view.append_messages(&[content("a"), content("b")]).unwrap();
        view.open(OpenMode::ReadWrite).unwrap();
        let first = view.message(1).unwrap();
        view.set_flags(&[first], &Flags::from(Flag::Deleted), true)
            .unwrap();
        assert_eq!(*counter.changed.lock(), 1);
        assert_eq!(view.deleted_message_count().unwrap(), Some(1));

        let removed = view.expunge().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(*counter.removed.lock(), 1);
        assert_eq!(view.message(1).unwrap().uid(), 12);
    }

    #[test]
    fn deleted_count_is_unknown_while_closed() {
        let registry = MailboxRegistry::new();
        let view = inbox_view(&registry, Protocol::Imap);
        assert_eq!(view.deleted_message_count().unwrap(), None);
    }

    #[test]
    fn create_reports_existing_folder() {
        let registry = MailboxRegistry::new();
        let inbox = inbox_view(&registry, Protocol::Imap);
        let sub = inbox.folder("test").unwrap();

        assert!(!sub.exists());
        assert!(sub.create().unwrap());
        assert!(sub.create().unwrap());
        assert_eq!(sub.full_name(), "INBOX/test");
        assert_eq!(inbox.list().unwrap().len(), 1);
    }

    #[test]
    fn delete_and_rename_require_closed_view() {
        let registry = MailboxRegistry::new();
        let inbox = inbox_view(&registry, Protocol::Imap);
        let sub = inbox.folder("test").unwrap();
        sub.create().unwrap();
        sub.open(OpenMode::ReadWrite).unwrap();

        assert!(matches!(sub.delete(true), Err(Error::InvalidState(_))));
        assert!(matches!(sub.rename_to("other"), Err(Error::InvalidState(_))));

        sub.close(false).unwrap();
        sub.rename_to("other").unwrap();
        assert_eq!(sub.full_name(), "INBOX/other");
        assert!(sub.delete(true).unwrap());
        assert!(!sub.exists());
    }

    #[test]
    fn missing_folder_is_not_found() {
        let registry = MailboxRegistry::new();
        let inbox = inbox_view(&registry, Protocol::Imap);
        let ghost = inbox.folder("ghost").unwrap();

        assert!(matches!(ghost.open(OpenMode::ReadOnly), Err(Error::NotFound(_))));
        assert!(matches!(ghost.message_count(), Err(Error::NotFound(_))));
        assert!(matches!(
            ghost.append_messages(&[content("x")]),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn root_has_no_parent() {
        let registry = MailboxRegistry::new();
        let root = registry.get("hendrik@unknown.com").unwrap().root();
        let view = FolderView::new(root, Protocol::Imap);

        assert!(matches!(view.parent(), Err(Error::NotFound(_))));
        let inbox = view.folder("INBOX").unwrap();
        assert_eq!(inbox.parent().unwrap().full_name(), "");
    }

    #[test]
    fn simulated_error_blocks_append() {
        let registry = MailboxRegistry::new();
        let view = inbox_view(&registry, Protocol::Imap);
        view.as_folder().set_simulate_error(true);

        assert!(matches!(
            view.append_messages(&[content("x")]),
            Err(Error::SimulatedFailure(_))
        ));
        assert_eq!(view.message_count().unwrap(), 0);
    }

    #[test]
    fn copy_into_other_folder() {
        let registry = MailboxRegistry::new();
        let inbox = inbox_view(&registry, Protocol::Imap);
        let archive = inbox.folder("Archive").unwrap();
        archive.create().unwrap();
        inbox.append_messages(&[content("a"), content("b")]).unwrap();

        inbox.open(OpenMode::ReadOnly).unwrap();
        let all = inbox.messages(1, 2).unwrap();
        let uids = inbox.copy_messages(&all, &archive).unwrap();

        assert_eq!(uids.len(), 2);
        assert_eq!(archive.message_count().unwrap(), 2);
        assert_eq!(inbox.message_count().unwrap(), 2);
    }

    #[test]
    fn unsupported_probes() {
        let registry = MailboxRegistry::new();
        let view = inbox_view(&registry, Protocol::Imap);

        assert!(matches!(view.acl(), Err(Error::Unsupported("ACL"))));
        assert!(matches!(view.quota(), Err(Error::Unsupported("QUOTA"))));
        assert!(matches!(view.sorted_messages(), Err(Error::Unsupported(_))));
        assert!(matches!(view.highest_mod_seq(), Err(Error::Unsupported(_))));
        assert!(matches!(
            view.open_with_resync(OpenMode::ReadOnly, Some(1)),
            Err(Error::Unsupported(_))
        ));
        view.open_with_resync(OpenMode::ReadOnly, None).unwrap();
    }

    #[test]
    fn dropped_view_unregisters() {
        let registry = MailboxRegistry::new();
        let inbox = registry.get("hendrik@unknown.com").unwrap().inbox();
        let counter = Arc::new(Counter::default());
        {
            let view = FolderView::new(inbox.clone(), Protocol::Imap);
            view.add_listener(counter.clone());
        }

        inbox.add(content("x")).unwrap();
        assert_eq!(*counter.added.lock(), 0);
    }

    #[tokio::test]
    async fn pop3_cannot_idle() {
        let registry = MailboxRegistry::new();
        let view = inbox_view(&registry, Protocol::Pop3);
        view.open(OpenMode::ReadOnly).unwrap();

        assert!(matches!(view.idle(true).await, Err(Error::Unsupported("IDLE"))));
    }

    #[tokio::test]
    async fn idle_requires_open_view() {
        let registry = MailboxRegistry::new();
        let view = inbox_view(&registry, Protocol::Imap);

        assert!(matches!(view.idle(true).await, Err(Error::InvalidState(_))));
    }
}

//! Folder tree and message store
//!
//! Each [`Folder`] is one node of a per-user tree. A node owns its
//! messages, its child nodes and its UID state; the parent link is
//! weak so ownership always flows from the root down. A [`Folder`]
//! handle additionally holds its ancestors, so a detached node keeps
//! its path for as long as anyone can still reach it.
//!
//! Every node is its own unit of mutual exclusion. Node locks only
//! ever nest parent before child, never the other way around. Change
//! events are queued under the lock and dispatched after it.

use crate::content::MessageContent;
use crate::error::{Error, Result};
use crate::event::{MailboxEvent, MailboxEventListener, PendingEvents};
use crate::flag::{Flag, Flags};
use crate::mailbox::{Mailbox, MailboxInner};
use crate::message::Message;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Path separator between folder names.
pub const SEPARATOR: char = '/';

/// UID range end meaning "the highest UID currently in the folder".
pub const LAST_UID: u64 = u64::MAX;

const INITIAL_UID_VALIDITY: u64 = 50;
const UID_VALIDITY_STEP: u64 = 10;
const INITIAL_LAST_UID: u64 = 10;
const UID_NEXT_PADDING: u64 = 10;

/// Handle to a folder node. Cheap to clone; clones refer to the same
/// node.
///
/// Equality is by full path, so two lookups of the same path compare
/// equal even when they resolved to different placeholder nodes.
#[derive(Clone)]
pub struct Folder {
    node: Arc<FolderNode>,
    /// Ancestors, root first.
    lineage: Arc<[Arc<FolderNode>]>,
}

pub(crate) struct FolderNode {
    parent: Option<Weak<FolderNode>>,
    mailbox: Weak<MailboxInner>,
    exists: AtomicBool,
    state: Mutex<FolderState>,
}

struct FolderState {
    name: String,
    subscribed: bool,
    simulate_error: bool,
    uid_validity: u64,
    last_uid: u64,
    messages: BTreeMap<u64, Message>,
    children: Vec<Arc<FolderNode>>,
    listeners: Vec<Arc<dyn MailboxEventListener>>,
}

impl FolderNode {
    fn new(
        name: &str,
        parent: Option<&Arc<Self>>,
        mailbox: Weak<MailboxInner>,
        exists: bool,
    ) -> Arc<Self> {
        debug!("Created folder node '{}' (exists: {})", name, exists);
        Arc::new(Self {
            parent: parent.map(Arc::downgrade),
            mailbox,
            exists: AtomicBool::new(exists),
            state: Mutex::new(FolderState {
                name: name.to_string(),
                subscribed: false,
                simulate_error: false,
                uid_validity: INITIAL_UID_VALIDITY,
                last_uid: INITIAL_LAST_UID,
                messages: BTreeMap::new(),
                children: Vec::new(),
                listeners: Vec::new(),
            }),
        })
    }

    fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    fn exists(&self) -> bool {
        self.exists.load(Ordering::Acquire)
    }
}

impl FolderState {
    /// Assign sequence numbers 1..N in ascending UID order.
    fn renumber(&self) {
        for (number, message) in self.messages.values().enumerate() {
            message.set_message_number(number + 1);
        }
    }

    /// Renumber and return every message.
    fn numbered(&self) -> Vec<Message> {
        self.renumber();
        self.messages.values().cloned().collect()
    }
}

/// Rejects empty names, the reserved `INBOX` name and names that
/// contain the separator.
pub(crate) fn check_folder_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.eq_ignore_ascii_case("inbox") || name.contains(SEPARATOR) {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

impl Folder {
    pub(crate) fn new_root(mailbox: Weak<MailboxInner>) -> Self {
        Self {
            node: FolderNode::new("", None, mailbox, true),
            lineage: Arc::from([]),
        }
    }

    /// Handle for a node reached by walking its weak parent links.
    pub(crate) fn from_node(node: Arc<FolderNode>) -> Self {
        let mut lineage = Vec::new();
        let mut parent = node.parent.as_ref().and_then(Weak::upgrade);
        while let Some(current) = parent {
            parent = current.parent.as_ref().and_then(Weak::upgrade);
            lineage.push(current);
        }
        lineage.reverse();
        Self {
            node,
            lineage: lineage.into(),
        }
    }

    /// Handle for `node`, a child of this folder.
    fn child(&self, node: &Arc<FolderNode>) -> Self {
        let lineage: Vec<Arc<FolderNode>> = self
            .lineage
            .iter()
            .cloned()
            .chain(std::iter::once(self.node.clone()))
            .collect();
        Self {
            node: node.clone(),
            lineage: lineage.into(),
        }
    }

    /// Add an existing child that bypasses name validation. Used for
    /// the INBOX.
    pub(crate) fn add_special_child(&self, name: &str) -> Self {
        let node = FolderNode::new(name, Some(&self.node), self.node.mailbox.clone(), true);
        self.node.state.lock().children.push(node.clone());
        self.child(&node)
    }

    fn check_exists(&self) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(self.missing())
        }
    }

    fn missing(&self) -> Error {
        Error::InvalidState(format!("folder '{}' does not exist", self.full_name()))
    }

    // -- navigation --

    /// Short name; empty for the root.
    #[must_use]
    pub fn name(&self) -> String {
        self.node.name()
    }

    /// Names from the top-level folder down to this one, joined by
    /// [`SEPARATOR`]. The root contributes no segment.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.is_root() {
            return String::new();
        }
        let mut segments: Vec<String> = self
            .lineage
            .iter()
            .filter(|n| n.parent.is_some())
            .map(|n| n.name())
            .collect();
        segments.push(self.name());
        segments.join(&SEPARATOR.to_string())
    }

    fn parent_node(&self) -> Option<Self> {
        let (parent, rest) = self.lineage.split_last()?;
        Some(Self {
            node: parent.clone(),
            lineage: rest.into(),
        })
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.node.exists()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    #[must_use]
    pub fn is_inbox(&self) -> bool {
        self.node.state.lock().name.eq_ignore_ascii_case("inbox")
    }

    /// The owning mailbox, unless it has been discarded by
    /// [`MailboxRegistry::reset_all`](crate::MailboxRegistry::reset_all).
    #[must_use]
    pub fn mailbox(&self) -> Option<Mailbox> {
        self.node.mailbox.upgrade().map(Mailbox::from_inner)
    }

    /// The parent folder; `None` for the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if this folder does not exist.
    pub fn parent(&self) -> Result<Option<Self>> {
        self.check_exists()?;
        Ok(self.parent_node())
    }

    /// Every child node, including placeholders that do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if this folder does not exist.
    pub fn children(&self) -> Result<Vec<Self>> {
        self.check_exists()?;
        let nodes = self.node.state.lock().children.clone();
        Ok(nodes.iter().map(|n| self.child(n)).collect())
    }

    /// Children that exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if this folder does not exist.
    pub fn list(&self) -> Result<Vec<Self>> {
        Ok(self
            .children()?
            .into_iter()
            .filter(Self::exists)
            .collect())
    }

    /// Children that exist and are subscribed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if this folder does not exist.
    pub fn list_subscribed(&self) -> Result<Vec<Self>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(Self::is_subscribed)
            .collect())
    }

    /// Resolve `path` below this folder, adding placeholder nodes for
    /// missing segments. A segment spelled `inbox` in any case resolves
    /// to the mailbox's INBOX. Placeholders stay non-existent until
    /// [`create`](Self::create) is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for an empty path or an invalid
    /// segment, and [`Error::NotFound`] if the mailbox has been
    /// discarded and the path names INBOX.
    pub fn get_or_add_sub_folder(&self, path: &str) -> Result<Self> {
        if path.trim().is_empty() {
            return Err(Error::InvalidName(path.to_string()));
        }

        debug!("get_or_add_sub_folder({}) on '{}'", path, self.full_name());

        let mut last = self.clone();
        for segment in path.split(SEPARATOR) {
            if segment.eq_ignore_ascii_case("inbox") {
                last = self
                    .mailbox()
                    .ok_or_else(|| Error::NotFound("mailbox has been discarded".into()))?
                    .inbox();
                continue;
            }

            check_folder_name(segment)?;
            last = last.child_or_placeholder(segment);
        }
        Ok(last)
    }

    fn child_or_placeholder(&self, name: &str) -> Self {
        let mut state = self.node.state.lock();

        let existing = state
            .children
            .iter()
            .filter(|c| c.name() == name)
            .find(|c| c.exists())
            .or_else(|| state.children.iter().find(|c| c.name() == name))
            .cloned();
        if let Some(node) = existing {
            drop(state);
            return self.child(&node);
        }

        let node = FolderNode::new(name, Some(&self.node), self.node.mailbox.clone(), false);
        state.children.push(node.clone());
        drop(state);

        let child = self.child(&node);
        debug!("Subfolder '{}' added", child.full_name());
        child
    }

    // -- lifecycle --

    /// Create this folder and any missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder already exists and
    /// [`Error::InvalidName`] if its name is not a valid folder name.
    pub fn create(&self) -> Result<Self> {
        if self.exists() {
            return Err(Error::InvalidState(format!(
                "folder '{}' already exists",
                self.full_name()
            )));
        }
        check_folder_name(&self.name())?;

        if let Some(parent) = self.parent_node() {
            if !parent.exists() {
                match parent.create() {
                    Ok(_) => {}
                    // Lost a race with another creator.
                    Err(Error::InvalidState(_)) if parent.exists() => {}
                    Err(e) => return Err(e),
                }
            }
            parent.attach(self);
        }

        if self
            .node
            .exists
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::InvalidState(format!(
                "folder '{}' already exists",
                self.full_name()
            )));
        }

        let mut pending = self.pending();
        pending.push(MailboxEvent::FolderCreated);
        pending.dispatch(self);

        debug!("Folder '{}' created", self.full_name());
        Ok(self.clone())
    }

    /// Re-add a child that was detached by a delete.
    fn attach(&self, child: &Self) {
        let mut state = self.node.state.lock();
        if !state.children.iter().any(|c| Arc::ptr_eq(c, &child.node)) {
            state.children.push(child.node.clone());
        }
    }

    /// Delete this folder and its messages, detaching it from its
    /// parent. With `recurse`, existing children are deleted first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist and
    /// [`Error::InvalidName`] for the root and the INBOX.
    pub fn delete_folder(&self, recurse: bool) -> Result<()> {
        self.check_exists()?;
        check_folder_name(&self.name())?;
        let Some(parent) = self.parent_node() else {
            return Err(Error::InvalidState("root cannot be deleted".into()));
        };

        let (children, pending) = {
            let mut state = self.node.state.lock();
            if self
                .node
                .exists
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                drop(state);
                return Err(self.missing());
            }
            state.messages.clear();
            (state.children.clone(), PendingEvents::new(&state.listeners))
        };

        if recurse {
            for node in children.iter().filter(|c| c.exists()) {
                self.child(node).delete_folder(true)?;
            }
        }

        parent
            .node
            .state
            .lock()
            .children
            .retain(|c| !Arc::ptr_eq(c, &self.node));

        let mut pending = pending;
        pending.push(MailboxEvent::FolderDeleted);
        pending.dispatch(self);

        debug!("Folder '{}' deleted", self.full_name());
        Ok(())
    }

    /// Change this folder's short name. Descendants follow implicitly
    /// because their full names derive from the parent chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist and
    /// [`Error::InvalidName`] if either the current or the new name is
    /// not a valid folder name.
    pub fn rename_folder(&self, new_name: &str) -> Result<()> {
        self.check_exists()?;
        check_folder_name(&self.name())?;
        check_folder_name(new_name)?;

        let (old, mut pending) = {
            let mut state = self.node.state.lock();
            let old = std::mem::replace(&mut state.name, new_name.to_string());
            (old, PendingEvents::new(&state.listeners))
        };
        pending.push(MailboxEvent::FolderRenamed(old));
        pending.dispatch(self);

        debug!(
            "Folder renamed to '{}' (full name '{}')",
            new_name,
            self.full_name()
        );
        Ok(())
    }

    // -- messages --

    /// Store `content` as a new message with the next UID. The message
    /// starts out `\Recent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn add(&self, content: MessageContent) -> Result<Message> {
        self.check_exists()?;
        let full_name = self.full_name();

        let (message, mut pending) = {
            let mut state = self.node.state.lock();
            if !self.exists() {
                drop(state);
                return Err(self.missing());
            }
            state.last_uid += 1;
            let uid = state.last_uid;
            let message = Message::new(content, uid, Arc::downgrade(&self.node), full_name);
            state.messages.insert(uid, message.clone());
            (message, PendingEvents::new(&state.listeners))
        };

        pending.push(MailboxEvent::MessageAdded(message.clone()));
        pending.dispatch(self);

        if let Some(mailbox) = self.mailbox() {
            debug!(
                "Message ID {} to '{}' added for user {}",
                message.uid(),
                self.full_name(),
                mailbox.address()
            );
        }
        Ok(message)
    }

    /// Remove every `\Deleted` message. Returns the removed messages
    /// in ascending UID order; each carries the sequence number it had
    /// just before removal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn expunge(&self) -> Result<Vec<Message>> {
        self.expunge_where(|_| true)
    }

    /// Like [`expunge`](Self::expunge), restricted to messages whose
    /// UID appears in `subset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn expunge_messages(&self, subset: &[Message]) -> Result<Vec<Message>> {
        self.expunge_where(|m| subset.iter().any(|s| s.uid() == m.uid()))
    }

    fn expunge_where(&self, filter: impl Fn(&Message) -> bool) -> Result<Vec<Message>> {
        self.check_exists()?;

        let (removed, mut pending) = {
            let mut state = self.node.state.lock();
            state.renumber();
            let uids: Vec<u64> = state
                .messages
                .values()
                .filter(|m| m.is_set(&Flag::Deleted) && filter(m))
                .map(Message::uid)
                .collect();

            let mut removed = Vec::with_capacity(uids.len());
            for uid in uids {
                if let Some(message) = state.messages.remove(&uid) {
                    message.mark_expunged();
                    removed.push(message);
                }
            }
            state.renumber();
            (removed, PendingEvents::new(&state.listeners))
        };

        for message in &removed {
            pending.push(MailboxEvent::MessageExpunged(message.clone()));
        }
        pending.dispatch(self);

        debug!(
            "{} messages expunged (deleted) from '{}'",
            removed.len(),
            self.full_name()
        );
        Ok(removed)
    }

    /// Messages whose flags contain all of `flags` (`must_match`) or
    /// none of them (`!must_match`). Sequence numbers are refreshed
    /// over the whole folder first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn get_by_flags(&self, flags: &Flags, must_match: bool) -> Result<Vec<Message>> {
        self.search(
            |m| {
                let current = m.flags();
                if must_match {
                    current.contains_all(flags)
                } else {
                    !current.contains_any(flags)
                }
            },
            None,
        )
    }

    /// Messages accepted by `predicate`, optionally restricted to the
    /// UIDs in `within`, in ascending UID order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn search(
        &self,
        predicate: impl Fn(&Message) -> bool,
        within: Option<&[Message]>,
    ) -> Result<Vec<Message>> {
        self.check_exists()?;
        let found: Vec<Message> = self
            .node
            .state
            .lock()
            .numbered()
            .into_iter()
            .filter(|m| within.is_none_or(|w| w.iter().any(|x| x.uid() == m.uid())))
            .filter(|m| predicate(m))
            .collect();
        debug!("search on '{}' returns {}", self.full_name(), found.len());
        Ok(found)
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn messages(&self) -> Result<Vec<Message>> {
        self.check_exists()?;
        Ok(self.node.state.lock().numbered())
    }

    /// The message with this UID, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn get_by_id(&self, uid: u64) -> Result<Option<Message>> {
        self.check_exists()?;
        let state = self.node.state.lock();
        state.renumber();
        let found = state.messages.get(&uid).cloned();
        drop(state);

        if found.is_none() {
            debug!("No message with id {} in '{}'", uid, self.full_name());
        }
        Ok(found)
    }

    /// Messages whose UID is listed in `uids`, in ascending UID order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn get_by_ids(&self, uids: &[u64]) -> Result<Vec<Message>> {
        self.check_exists()?;
        Ok(self
            .node
            .state
            .lock()
            .numbered()
            .into_iter()
            .filter(|m| uids.contains(&m.uid()))
            .collect())
    }

    /// Messages with `start <= uid <= end`.
    ///
    /// With `end == LAST_UID` the range is open-ended, and if nothing
    /// at or above `start` exists the newest message is returned on
    /// its own, the way a server answers `UID FETCH n:*`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn get_by_id_range(&self, start: u64, end: u64) -> Result<Vec<Message>> {
        self.check_exists()?;
        let all = self.node.state.lock().numbered();

        let mut found: Vec<Message> = all
            .iter()
            .filter(|m| m.uid() >= start && (end == LAST_UID || m.uid() <= end))
            .cloned()
            .collect();

        if end == LAST_UID && found.is_empty() {
            if let Some(newest) = all.last() {
                found.push(newest.clone());
            }
        }

        debug!(
            "get_by_id_range({}, {}) for '{}' returns {}",
            start,
            end,
            self.full_name(),
            found.len()
        );
        Ok(found)
    }

    /// The message at 1-based position `number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist and
    /// [`Error::Bounds`] if `number` is outside `1..=count`.
    pub fn get_by_msg_num(&self, number: usize) -> Result<Message> {
        self.check_exists()?;
        let all = self.node.state.lock().numbered();

        if number == 0 || number > all.len() {
            return Err(Error::Bounds {
                index: number,
                len: all.len(),
                folder: self.full_name(),
            });
        }
        Ok(all[number - 1].clone())
    }

    /// Flag hook invoked by [`Message::set_flags`]. The caller's handle
    /// and the stored message share state, so only the event is left.
    pub(crate) fn on_flag_change(&self, message: &Message) {
        let mut pending = self.pending();
        pending.push(MailboxEvent::MessageChanged(message.clone()));
        pending.dispatch(self);

        debug!("Flags of message {} changed", message.uid());
    }

    /// # Errors
    ///
    /// Same as [`Message::set_flag`], plus [`Error::InvalidState`] if
    /// the folder does not exist.
    pub fn mark_deleted(&self, message: &Message) -> Result<()> {
        self.check_exists()?;
        message.set_flag(Flag::Deleted, true)
    }

    /// # Errors
    ///
    /// Same as [`Message::set_flag`], plus [`Error::InvalidState`] if
    /// the folder does not exist.
    pub fn mark_seen(&self, message: &Message) -> Result<()> {
        self.check_exists()?;
        message.set_flag(Flag::Seen, true)
    }

    // -- metadata --

    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn message_count(&self) -> Result<usize> {
        self.check_exists()?;
        Ok(self.node.state.lock().messages.len())
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn has_messages(&self) -> Result<bool> {
        Ok(self.message_count()? > 0)
    }

    /// Messages without `\Seen`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn unread_count(&self) -> Result<usize> {
        Ok(self.get_by_flags(&Flags::from(Flag::Seen), false)?.len())
    }

    /// Messages with `\Recent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn new_count(&self) -> Result<usize> {
        Ok(self.get_by_flags(&Flags::from(Flag::Recent), true)?.len())
    }

    /// Messages with `\Deleted`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn deleted_count(&self) -> Result<usize> {
        Ok(self.get_by_flags(&Flags::from(Flag::Deleted), true)?.len())
    }

    /// Total size of all messages in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn size_in_bytes(&self) -> Result<usize> {
        self.check_exists()?;
        Ok(self
            .node
            .state
            .lock()
            .messages
            .values()
            .map(Message::size)
            .sum())
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn uid_of(&self, message: &Message) -> Result<u64> {
        self.check_exists()?;
        Ok(message.uid())
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn uid_validity(&self) -> Result<u64> {
        self.check_exists()?;
        Ok(self.node.state.lock().uid_validity)
    }

    /// The most recently allocated UID (10 for a fresh folder).
    #[must_use]
    pub fn last_uid(&self) -> u64 {
        self.node.state.lock().last_uid
    }

    /// Hint for the next UID. Deliberately padded past the real next
    /// value; clients must only rely on it being larger than any
    /// existing UID.
    #[must_use]
    pub fn uid_next(&self) -> u64 {
        self.last_uid() + UID_NEXT_PADDING
    }

    /// Bump UID validity so clients drop cached UIDs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the folder does not exist.
    pub fn invalidate_uid(&self) -> Result<()> {
        self.check_exists()?;
        let (validity, mut pending) = {
            let mut state = self.node.state.lock();
            state.uid_validity += UID_VALIDITY_STEP;
            (state.uid_validity, PendingEvents::new(&state.listeners))
        };
        pending.push(MailboxEvent::UidInvalidated);
        pending.dispatch(self);

        debug!("UidValidity invalidated, new UidValidity is {}", validity);
        Ok(())
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.node.state.lock().subscribed
    }

    pub fn set_subscribed(&self, subscribed: bool) {
        self.node.state.lock().subscribed = subscribed;
    }

    #[must_use]
    pub fn is_simulate_error(&self) -> bool {
        self.node.state.lock().simulate_error
    }

    /// Make connect/append/send against this folder fail with
    /// [`Error::SimulatedFailure`].
    pub fn set_simulate_error(&self, simulate_error: bool) {
        self.node.state.lock().simulate_error = simulate_error;
    }

    // -- listeners --

    pub fn add_listener(&self, listener: Arc<dyn MailboxEventListener>) {
        self.node.state.lock().listeners.push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn MailboxEventListener>) {
        self.node
            .state
            .lock()
            .listeners
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    fn pending(&self) -> PendingEvents {
        PendingEvents::new(&self.node.state.lock().listeners)
    }
}

impl PartialEq for Folder {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
            || (self.is_root() == other.is_root() && self.full_name() == other.full_name())
    }
}

impl Eq for Folder {}

impl Hash for Folder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_root().hash(state);
        self.full_name().hash(state);
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

impl fmt::Debug for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Folder")
            .field("full_name", &self.full_name())
            .field("exists", &self.exists())
            .finish_non_exhaustive()
    }
}

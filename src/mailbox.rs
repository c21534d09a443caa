//! Per-user mailboxes and the registry that owns them

use crate::error::{Error, Result};
use crate::folder::Folder;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Name of the special folder every mailbox starts with.
pub const INBOX: &str = "INBOX";

/// The folder tree of one email address. Cheap to clone.
#[derive(Clone)]
pub struct Mailbox {
    inner: Arc<MailboxInner>,
}

pub(crate) struct MailboxInner {
    address: String,
    root: Folder,
    inbox: Folder,
}

impl Mailbox {
    fn new(address: String) -> Self {
        let inner = Arc::new_cyclic(|weak| {
            let root = Folder::new_root(weak.clone());
            let inbox = root.add_special_child(INBOX);
            MailboxInner {
                address,
                root,
                inbox,
            }
        });
        info!("Created mailbox for {}", inner.address);
        Self { inner }
    }

    pub(crate) const fn from_inner(inner: Arc<MailboxInner>) -> Self {
        Self { inner }
    }

    /// Normalized address this mailbox belongs to.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Unnamed root folder. Always exists.
    #[must_use]
    pub fn root(&self) -> Folder {
        self.inner.root.clone()
    }

    #[must_use]
    pub fn inbox(&self) -> Folder {
        self.inner.inbox.clone()
    }
}

impl PartialEq for Mailbox {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Mailbox {}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Map from email address to [`Mailbox`].
///
/// Mailboxes are created on first lookup. Tests that want isolation
/// build their own registry; [`MailboxRegistry::shared`] is the
/// process-wide instance used by the CLI.
#[derive(Default)]
pub struct MailboxRegistry {
    mailboxes: Mutex<HashMap<String, Mailbox>>,
}

impl MailboxRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    #[must_use]
    pub fn shared() -> &'static Self {
        static SHARED: OnceLock<MailboxRegistry> = OnceLock::new();
        SHARED.get_or_init(Self::new)
    }

    /// The mailbox for `address`, created on first use. Lookups are
    /// case-insensitive and accept display-name forms such as
    /// `Hendrik <hendrik@unknown.com>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `address` is not a single
    /// `local@domain` address.
    pub fn get(&self, address: &str) -> Result<Mailbox> {
        let key = normalize_address(address)?;
        let mut mailboxes = self.mailboxes.lock();
        let mailbox = mailboxes
            .entry(key)
            .or_insert_with_key(|k| Mailbox::new(k.clone()))
            .clone();
        drop(mailboxes);
        Ok(mailbox)
    }

    /// Discard every mailbox. Handles obtained earlier keep working
    /// but are no longer reachable through the registry.
    pub fn reset_all(&self) {
        let count = {
            let mut mailboxes = self.mailboxes.lock();
            let count = mailboxes.len();
            mailboxes.clear();
            count
        };
        debug!("All {} mailboxes reset", count);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mailboxes.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mailboxes.lock().is_empty()
    }

    /// Known addresses, sorted.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.mailboxes.lock().keys().cloned().collect();
        addresses.sort();
        addresses
    }
}

impl fmt::Debug for MailboxRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxRegistry")
            .field("addresses", &self.addresses())
            .finish()
    }
}

fn normalize_address(address: &str) -> Result<String> {
    let bare = match (address.find('<'), address.rfind('>')) {
        (Some(start), Some(end)) if start < end => &address[start + 1..end],
        _ => address,
    };
    let bare = bare.trim().to_lowercase();

    let mut parts = bare.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None)
            if !local.is_empty() && !domain.is_empty() && !bare.contains(char::is_whitespace) =>
        {
            Ok(bare)
        }
        _ => Err(Error::InvalidAddress(address.to_string())),
    }
}

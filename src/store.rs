//! IMAP and POP3 store emulation
//!
//! A [`Store`] is one client connection: it binds to a user's mailbox
//! on [`connect`](Store::connect) and hands out [`FolderView`]s.

use crate::error::{Error, Result};
use crate::mailbox::{Mailbox, MailboxRegistry};
use crate::view::{FolderView, Protocol};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A simulated client connection.
#[derive(Debug)]
pub struct Store {
    registry: Arc<MailboxRegistry>,
    protocol: Protocol,
    mailbox: Mutex<Option<Mailbox>>,
}

impl Store {
    #[must_use]
    pub fn new(registry: Arc<MailboxRegistry>, protocol: Protocol) -> Self {
        Self {
            registry,
            protocol,
            mailbox: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Bind to the mailbox of `user`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if already connected,
    /// [`Error::InvalidAddress`] for a malformed user, and
    /// [`Error::SimulatedFailure`] if the user's INBOX simulates errors.
    pub fn connect(&self, user: &str) -> Result<()> {
        let mut current = self.mailbox.lock();
        if current.is_some() {
            return Err(Error::InvalidState("already connected".into()));
        }

        debug!("Connect to {} ({})", user, self.protocol);
        let mailbox = self.registry.get(user)?;
        if mailbox.inbox().is_simulate_error() {
            return Err(Error::SimulatedFailure(format!(
                "Simulated error connecting to mailbox of {user}"
            )));
        }

        info!("Connected to mailbox of {} ({})", mailbox.address(), self.protocol);
        *current = Some(mailbox);
        Ok(())
    }

    pub fn close(&self) {
        if let Some(mailbox) = self.mailbox.lock().take() {
            debug!("Closed connection to {}", mailbox.address());
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.mailbox.lock().is_some()
    }

    fn connected_mailbox(&self) -> Result<Mailbox> {
        self.mailbox
            .lock()
            .clone()
            .ok_or_else(|| Error::InvalidState("Not connected".into()))
    }

    /// View on the root folder. POP3 has no hierarchy and returns the
    /// INBOX instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if not connected.
    pub fn default_folder(&self) -> Result<FolderView> {
        let mailbox = self.connected_mailbox()?;
        let folder = match self.protocol {
            Protocol::Imap => mailbox.root(),
            Protocol::Pop3 => mailbox.inbox(),
        };
        Ok(FolderView::new(folder, self.protocol))
    }

    /// View on the folder at `name`, which may not exist yet. `INBOX`
    /// matches case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if not connected,
    /// [`Error::NotFound`] for anything but INBOX over POP3, and
    /// otherwise the same as [`Folder::get_or_add_sub_folder`](crate::Folder::get_or_add_sub_folder).
    pub fn folder(&self, name: &str) -> Result<FolderView> {
        let mailbox = self.connected_mailbox()?;
        debug!("folder({})", name);

        if name.eq_ignore_ascii_case(crate::mailbox::INBOX) {
            return Ok(FolderView::new(mailbox.inbox(), self.protocol));
        }

        match self.protocol {
            Protocol::Imap => Ok(FolderView::new(
                mailbox.root().get_or_add_sub_folder(name)?,
                self.protocol,
            )),
            Protocol::Pop3 => Err(Error::NotFound(format!(
                "POP3 only provides INBOX, not {name}"
            ))),
        }
    }

    /// IMAP advertises `IMAP4*`, `IDLE` and `ID*`; POP3 nothing.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        if self.protocol != Protocol::Imap {
            return false;
        }
        let capability = capability.to_ascii_uppercase();
        capability.starts_with("IMAP4") || capability.starts_with("IDLE") || capability.starts_with("ID")
    }

    /// Server identity for the IMAP `ID` command. Client parameters
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if not connected and
    /// [`Error::Unsupported`] over POP3.
    pub fn id(&self, _client_params: &HashMap<String, String>) -> Result<HashMap<String, String>> {
        self.connected_mailbox()?;
        if self.protocol != Protocol::Imap {
            return Err(Error::Unsupported("ID"));
        }
        Ok(HashMap::from([
            ("name".to_string(), env!("CARGO_PKG_NAME").to_string()),
            ("vendor".to_string(), "mockmail".to_string()),
            (
                "version".to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
            ),
        ]))
    }

    /// # Errors
    ///
    /// Always [`Error::Unsupported`].
    #[allow(clippy::unused_self)]
    pub const fn quota(&self, _root: &str) -> Result<()> {
        Err(Error::Unsupported("QUOTA"))
    }

    /// # Errors
    ///
    /// Always [`Error::Unsupported`].
    #[allow(clippy::unused_self)]
    pub const fn set_quota(&self, _root: &str, _limit: u64) -> Result<()> {
        Err(Error::Unsupported("QUOTA"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(protocol: Protocol) -> (Arc<MailboxRegistry>, Store) {
        let registry = Arc::new(MailboxRegistry::new());
        let store = Store::new(registry.clone(), protocol);
        (registry, store)
    }

    #[test]
    fn connect_twice_fails() {
        let (_registry, store) = store(Protocol::Imap);
        store.connect("hendrik@unknown.com").unwrap();
        assert!(store.is_connected());
        assert!(matches!(
            store.connect("hendrik@unknown.com"),
            Err(Error::InvalidState(_))
        ));

        store.close();
        assert!(!store.is_connected());
        store.connect("hendrik@unknown.com").unwrap();
    }

    #[test]
    fn simulated_error_refuses_connection() {
        let (registry, store) = store(Protocol::Pop3);
        registry
            .get("hendrik@unknown.com")
            .unwrap()
            .inbox()
            .set_simulate_error(true);

        match store.connect("hendrik@unknown.com") {
            Err(Error::SimulatedFailure(msg)) => {
                assert_eq!(msg, "Simulated error connecting to mailbox of hendrik@unknown.com");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!store.is_connected());
    }

    #[test]
    fn folders_need_a_connection() {
        let (_registry, store) = store(Protocol::Imap);
        assert!(matches!(store.folder("INBOX"), Err(Error::InvalidState(_))));
        assert!(matches!(store.default_folder(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn imap_folders() {
        let (_registry, store) = store(Protocol::Imap);
        store.connect("hendrik@unknown.com").unwrap();

        let inbox = store.folder("inbox").unwrap();
        assert_eq!(inbox.full_name(), "INBOX");
        assert!(inbox.exists());

        let other = store.folder("Sent").unwrap();
        assert!(!other.exists());
        assert_eq!(store.default_folder().unwrap().full_name(), "");
    }

    #[test]
    fn pop3_only_has_inbox() {
        let (_registry, store) = store(Protocol::Pop3);
        store.connect("hendrik@unknown.com").unwrap();

        assert_eq!(store.folder("INBOX").unwrap().full_name(), "INBOX");
        assert_eq!(store.default_folder().unwrap().full_name(), "INBOX");
        assert!(matches!(store.folder("Sent"), Err(Error::NotFound(_))));
    }

    #[test]
    fn capabilities() {
        let (_registry, imap) = store(Protocol::Imap);
        assert!(imap.has_capability("IMAP4rev1"));
        assert!(imap.has_capability("idle"));
        assert!(imap.has_capability("ID"));
        assert!(!imap.has_capability("QUOTA"));

        let (_registry, pop3) = store(Protocol::Pop3);
        assert!(!pop3.has_capability("IDLE"));
    }

    #[test]
    fn id_and_quota() {
        let (_registry, store) = store(Protocol::Imap);
        assert!(store.id(&HashMap::new()).is_err());
        store.connect("hendrik@unknown.com").unwrap();

        let id = store.id(&HashMap::new()).unwrap();
        assert_eq!(id.get("name").map(String::as_str), Some("mockmail"));
        assert!(matches!(store.quota(""), Err(Error::Unsupported("QUOTA"))));
        assert!(matches!(store.set_quota("", 1), Err(Error::Unsupported("QUOTA"))));
    }
}

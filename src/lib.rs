//! In-memory mail store simulation
//!
//! A fake back end for code that talks IMAP, POP3 or SMTP. Each email
//! address owns a [`Mailbox`] holding a folder tree; folders store
//! [`Message`]s with IMAP-style UIDs and sequence numbers, report
//! changes to [`MailboxEventListener`]s and support an IDLE-style
//! wait through [`FolderView::idle`].
//!
//! ```
//! use mockmail::{MailboxRegistry, MessageContent};
//!
//! let registry = MailboxRegistry::new();
//! let inbox = registry.get("hendrik@unknown.com")?.inbox();
//! let msg = inbox.add(MessageContent::builder().subject("Test").build())?;
//! assert_eq!(msg.uid(), 11);
//! assert_eq!(inbox.message_count()?, 1);
//! # Ok::<(), mockmail::Error>(())
//! ```

mod config;
mod content;
mod error;
mod event;
mod flag;
mod folder;
mod idle;
mod mailbox;
mod message;
mod scenario;
mod store;
mod transport;
mod view;

pub use config::SimConfig;
pub use content::{MessageBuilder, MessageContent};
pub use error::{Error, Result};
pub use event::MailboxEventListener;
pub use flag::{Flag, Flags};
pub use folder::{Folder, LAST_UID, SEPARATOR};
pub use idle::{IdleExit, IdleGate};
pub use mailbox::{INBOX, Mailbox, MailboxRegistry};
pub use message::{FOLDER_HEADER, MESSAGE_ID_HEADER, Message};
pub use scenario::{
    FolderSnapshot, MailboxSnapshot, MessageSnapshot, MessageSpec, Scenario, Step, snapshot,
};
pub use store::Store;
pub use transport::{Transport, TransportListener};
pub use view::{AppendUid, FolderView, OpenMode, Protocol, ViewListener};

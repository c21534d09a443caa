//! Scripted mailbox setup and JSON snapshots
//!
//! Mailboxes live only in memory, so the way to rebuild one is to
//! replay the steps that produced it. A [`Scenario`] is such a list of
//! steps, read from JSON:
//!
//! ```json
//! {
//!   "user": "hendrik@unknown.com",
//!   "steps": [
//!     { "op": "create_folder", "path": "INBOX/Archive" },
//!     { "op": "append", "message": { "subject": "Hi", "text": "..." } },
//!     { "op": "set_flags", "uids": [11], "flags": ["\\Seen"] }
//!   ]
//! }
//! ```

use crate::content::MessageContent;
use crate::error::{Error, Result};
use crate::flag::{Flag, Flags};
use crate::folder::Folder;
use crate::mailbox::{INBOX, MailboxRegistry};
use crate::message::Message;
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A list of steps run against a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Mailbox for steps that name no user.
    #[serde(default)]
    pub user: Option<String>,
    pub steps: Vec<Step>,
}

/// Message fields accepted by `append` and `send` steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSpec {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub date: Option<DateTime<Utc>>,
    pub text: String,
    pub headers: Vec<(String, String)>,
    /// Complete RFC 5322 source; overrides every other field.
    pub raw: Option<String>,
}

impl MessageSpec {
    fn to_content(&self) -> Result<MessageContent> {
        if let Some(raw) = &self.raw {
            return MessageContent::parse(raw.as_bytes());
        }

        let mut builder = MessageContent::builder().text(self.text.clone());
        if let Some(subject) = &self.subject {
            builder = builder.subject(subject.clone());
        }
        if let Some(from) = &self.from {
            builder = builder.from(from.clone());
        }
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        for cc in &self.cc {
            builder = builder.cc(cc.clone());
        }
        if let Some(date) = self.date {
            builder = builder.date(date);
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        Ok(builder.build())
    }
}

const fn yes() -> bool {
    true
}

fn inbox() -> String {
    INBOX.to_string()
}

/// One scenario step. `user` defaults to [`Scenario::user`], `folder`
/// to `INBOX`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    CreateFolder {
        #[serde(default)]
        user: Option<String>,
        path: String,
    },
    DeleteFolder {
        #[serde(default)]
        user: Option<String>,
        path: String,
        #[serde(default = "yes")]
        recurse: bool,
    },
    RenameFolder {
        #[serde(default)]
        user: Option<String>,
        path: String,
        to: String,
    },
    Append {
        #[serde(default)]
        user: Option<String>,
        #[serde(default = "inbox")]
        folder: String,
        message: MessageSpec,
    },
    SetFlags {
        #[serde(default)]
        user: Option<String>,
        #[serde(default = "inbox")]
        folder: String,
        uids: Vec<u64>,
        flags: Vec<String>,
        #[serde(default = "yes")]
        set: bool,
    },
    Expunge {
        #[serde(default)]
        user: Option<String>,
        #[serde(default = "inbox")]
        folder: String,
    },
    Send {
        message: MessageSpec,
        recipients: Vec<String>,
    },
    SimulateError {
        #[serde(default)]
        user: Option<String>,
        #[serde(default = "yes")]
        enabled: bool,
    },
    InvalidateUid {
        #[serde(default)]
        user: Option<String>,
        #[serde(default = "inbox")]
        folder: String,
    },
    Subscribe {
        #[serde(default)]
        user: Option<String>,
        #[serde(default = "inbox")]
        folder: String,
        #[serde(default = "yes")]
        subscribed: bool,
    },
}

impl Scenario {
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Parse(format!("Invalid scenario: {e}")))
    }

    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::Parse`] for malformed JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Run every step in order against `registry`. `default_user`
    /// applies when neither the step nor the scenario names a user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Step`] wrapping the first failure.
    pub fn replay(&self, registry: &Arc<MailboxRegistry>, default_user: &str) -> Result<()> {
        let fallback = self.user.as_deref().unwrap_or(default_user);
        let transport = Transport::new(registry.clone());

        for (index, step) in self.steps.iter().enumerate() {
            debug!("Scenario step {}: {:?}", index, step);
            run_step(registry, &transport, fallback, step).map_err(|e| Error::Step {
                step: index,
                source: Box::new(e),
            })?;
        }

        info!("Replayed {} scenario steps", self.steps.len());
        Ok(())
    }
}

fn folder_of(registry: &MailboxRegistry, user: &str, path: &str) -> Result<Folder> {
    let mailbox = registry.get(user)?;
    if path.eq_ignore_ascii_case(INBOX) {
        return Ok(mailbox.inbox());
    }
    mailbox.root().get_or_add_sub_folder(path)
}

fn run_step(
    registry: &MailboxRegistry,
    transport: &Transport,
    fallback: &str,
    step: &Step,
) -> Result<()> {
    let user_or = |user: Option<&str>| user.unwrap_or(fallback).to_string();

    match step {
        Step::CreateFolder { user, path } => {
            folder_of(registry, &user_or(user.as_deref()), path)?.create()?;
        }
        Step::DeleteFolder {
            user,
            path,
            recurse,
        } => {
            folder_of(registry, &user_or(user.as_deref()), path)?.delete_folder(*recurse)?;
        }
        Step::RenameFolder { user, path, to } => {
            folder_of(registry, &user_or(user.as_deref()), path)?.rename_folder(to)?;
        }
        Step::Append {
            user,
            folder,
            message,
        } => {
            folder_of(registry, &user_or(user.as_deref()), folder)?.add(message.to_content()?)?;
        }
        Step::SetFlags {
            user,
            folder,
            uids,
            flags,
            set,
        } => {
            let flags: Flags = flags.iter().map(|f| Flag::from(f.as_str())).collect();
            let folder = folder_of(registry, &user_or(user.as_deref()), folder)?;
            for message in folder.get_by_ids(uids)? {
                message.set_flags(&flags, *set)?;
            }
        }
        Step::Expunge { user, folder } => {
            folder_of(registry, &user_or(user.as_deref()), folder)?.expunge()?;
        }
        Step::Send {
            message,
            recipients,
        } => {
            let recipients: Vec<&str> = recipients.iter().map(String::as_str).collect();
            transport.send(&message.to_content()?, &recipients)?;
        }
        Step::SimulateError { user, enabled } => {
            registry
                .get(&user_or(user.as_deref()))?
                .inbox()
                .set_simulate_error(*enabled);
        }
        Step::InvalidateUid { user, folder } => {
            folder_of(registry, &user_or(user.as_deref()), folder)?.invalidate_uid()?;
        }
        Step::Subscribe {
            user,
            folder,
            subscribed,
        } => {
            folder_of(registry, &user_or(user.as_deref()), folder)?.set_subscribed(*subscribed);
        }
    }
    Ok(())
}

/// Serializable state of one mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxSnapshot {
    pub address: String,
    pub folders: Vec<FolderSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderSnapshot {
    pub full_name: String,
    pub subscribed: bool,
    pub uid_validity: u64,
    pub uid_next: u64,
    pub messages: Vec<MessageSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSnapshot {
    pub uid: u64,
    pub number: usize,
    pub flags: Vec<String>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub size: usize,
}

impl From<&Message> for MessageSnapshot {
    fn from(message: &Message) -> Self {
        Self {
            uid: message.uid(),
            number: message.message_number(),
            flags: message.flags().iter().map(ToString::to_string).collect(),
            subject: message.subject().map(str::to_string),
            from: message.from().map(str::to_string),
            to: message.recipients().to_vec(),
            size: message.size(),
        }
    }
}

/// Capture every mailbox of `registry`, sorted by address. Folders
/// are listed depth-first; the root is omitted.
///
/// # Errors
///
/// Returns [`Error::InvalidState`] if a folder is deleted while it is
/// being captured.
pub fn snapshot(registry: &MailboxRegistry) -> Result<Vec<MailboxSnapshot>> {
    let mut mailboxes = Vec::new();
    for address in registry.addresses() {
        let mailbox = registry.get(&address)?;
        let mut folders = Vec::new();
        collect_folders(&mailbox.root(), &mut folders)?;
        mailboxes.push(MailboxSnapshot { address, folders });
    }
    Ok(mailboxes)
}

fn collect_folders(parent: &Folder, out: &mut Vec<FolderSnapshot>) -> Result<()> {
    for folder in parent.list()? {
        out.push(FolderSnapshot {
            full_name: folder.full_name(),
            subscribed: folder.is_subscribed(),
            uid_validity: folder.uid_validity()?,
            uid_next: folder.uid_next(),
            messages: folder.messages()?.iter().map(MessageSnapshot::from).collect(),
        });
        collect_folders(&folder, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "user": "hendrik@unknown.com",
        "steps": [
            { "op": "create_folder", "path": "INBOX/Archive/2013" },
            { "op": "append", "message": { "subject": "one", "from": "a@b.com", "text": "1" } },
            { "op": "append", "message": { "subject": "two", "text": "2" } },
            { "op": "append", "folder": "INBOX/Archive", "message": { "subject": "old" } },
            { "op": "set_flags", "uids": [12], "flags": ["\\Deleted", "$Junk"] },
            { "op": "expunge" },
            { "op": "rename_folder", "path": "INBOX/Archive", "to": "dummy" },
            { "op": "subscribe", "folder": "INBOX/dummy" },
            { "op": "send", "message": { "subject": "hello" }, "recipients": ["other@unknown.com"] }
        ]
    }"#;

    #[test]
    fn parse_steps() {
        let scenario = Scenario::from_json(SAMPLE).unwrap();
        assert_eq!(scenario.steps.len(), 9);
        assert_eq!(
            scenario.steps[0],
            Step::CreateFolder {
                user: None,
                path: "INBOX/Archive/2013".into()
            }
        );
        match &scenario.steps[4] {
            Step::SetFlags { folder, set, .. } => {
                assert_eq!(folder, "INBOX");
                assert!(*set);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn replay_and_snapshot() {
        let registry = Arc::new(MailboxRegistry::new());
        Scenario::from_json(SAMPLE)
            .unwrap()
            .replay(&registry, "nobody@localhost")
            .unwrap();

        let snap = snapshot(&registry).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].address, "hendrik@unknown.com");

        let names: Vec<&str> = snap[0].folders.iter().map(|f| f.full_name.as_str()).collect();
        assert_eq!(names, vec!["INBOX", "INBOX/dummy", "INBOX/dummy/2013"]);

        let inbox = &snap[0].folders[0];
        assert_eq!(inbox.messages.len(), 1);
        assert_eq!(inbox.messages[0].uid, 11);
        assert_eq!(inbox.messages[0].number, 1);
        assert!(snap[0].folders[1].subscribed);
        assert_eq!(snap[0].folders[1].messages.len(), 1);

        assert_eq!(snap[1].address, "other@unknown.com");
        assert_eq!(snap[1].folders[0].messages[0].subject.as_deref(), Some("hello"));
    }

    #[test]
    fn failing_step_is_reported() {
        let registry = Arc::new(MailboxRegistry::new());
        let scenario = Scenario::from_json(
            r#"{ "steps": [
                { "op": "create_folder", "path": "A" },
                { "op": "create_folder", "path": "A" }
            ] }"#,
        )
        .unwrap();

        match scenario.replay(&registry, "user@localhost") {
            Err(Error::Step { step, source }) => {
                assert_eq!(step, 1);
                assert!(matches!(*source, Error::InvalidState(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn raw_message_spec() {
        let spec = MessageSpec {
            raw: Some("Subject: raw\r\nFrom: x@y.org\r\n\r\nbody".into()),
            ..MessageSpec::default()
        };
        let content = spec.to_content().unwrap();
        assert_eq!(content.subject(), Some("raw"));
        assert_eq!(content.from(), Some("x@y.org"));
    }

    #[test]
    fn invalid_json() {
        assert!(matches!(
            Scenario::from_json("{ \"steps\": [ { \"op\": \"fly\" } ] }"),
            Err(Error::Parse(_))
        ));
    }
}

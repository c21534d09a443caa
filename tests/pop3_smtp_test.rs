//! POP3 store and SMTP transport emulation.

use mockmail::{
    Error, MailboxRegistry, Message, MessageContent, OpenMode, Protocol, Store, Transport,
    ViewListener,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn make_content(subject: &str, to: &str) -> MessageContent {
    MessageContent::builder()
        .subject(subject)
        .from("from@sender.com")
        .to(to)
        .text("Some text here ...")
        .build()
}

#[derive(Default)]
struct AddedListener(Mutex<usize>);

impl ViewListener for AddedListener {
    fn messages_added(&self, messages: &[Message]) {
        *self.0.lock() += messages.len();
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[test]
fn test_send_then_pop3_retrieve() {
    let registry = Arc::new(MailboxRegistry::new());
    let transport = Transport::new(registry.clone());
    transport.connect().unwrap();

    let store = Store::new(registry.clone(), Protocol::Pop3);
    store.connect("hendrik@unknown.com").unwrap();
    let inbox = store.folder("INBOX").unwrap();
    let listener = Arc::new(AddedListener::default());
    inbox.add_listener(listener.clone());

    transport
        .send(
            &make_content("Test", "hendrik@unknown.com"),
            &["hendrik@unknown.com"],
        )
        .unwrap();

    inbox.open(OpenMode::ReadOnly).unwrap();
    assert_eq!(inbox.message_count().unwrap(), 1);
    let msg = inbox.message(1).unwrap();
    assert_eq!(msg.subject(), Some("Test"));
    assert_eq!(msg.header("X-Mock-Folder"), Some("INBOX"));

    // POP3 does not report new mail to the client.
    assert_eq!(*listener.0.lock(), 0);
    inbox.close(false).unwrap();
}

#[test]
fn test_pop3_has_no_folders() {
    let registry = Arc::new(MailboxRegistry::new());
    let store = Store::new(registry, Protocol::Pop3);
    store.connect("hendrik@unknown.com").unwrap();

    assert!(matches!(store.folder("Sent"), Err(Error::NotFound(_))));
    assert!(!store.has_capability("IDLE"));
}

#[test]
fn test_send_to_failing_mailbox() {
    let registry = Arc::new(MailboxRegistry::new());
    registry
        .get("broken@unknown.com")
        .unwrap()
        .inbox()
        .set_simulate_error(true);
    let transport = Transport::new(registry.clone());

    let result = transport.send(
        &make_content("Test", "broken@unknown.com"),
        &["broken@unknown.com"],
    );
    assert!(matches!(result, Err(Error::SimulatedFailure(_))));
    assert_eq!(
        registry
            .get("broken@unknown.com")
            .unwrap()
            .inbox()
            .message_count()
            .unwrap(),
        0
    );
}

#[test]
fn test_pop3_close_with_expunge() {
    let registry = Arc::new(MailboxRegistry::new());
    let transport = Transport::new(registry.clone());
    for n in 0..3 {
        transport
            .send(&make_content(&n.to_string(), "a@b.com"), &["a@b.com"])
            .unwrap();
    }

    let store = Store::new(registry, Protocol::Pop3);
    store.connect("a@b.com").unwrap();
    let inbox = store.default_folder().unwrap();
    inbox.open(OpenMode::ReadWrite).unwrap();
    inbox
        .message(1)
        .unwrap()
        .set_flag(mockmail::Flag::Deleted, true)
        .unwrap();
    inbox.close(true).unwrap();

    assert_eq!(inbox.message_count().unwrap(), 2);
}

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for building and inspecting simulated mailboxes

use clap::{Parser, Subcommand};
use mockmail::{
    Flag, Flags, MailboxRegistry, MailboxSnapshot, MessageContent, OpenMode, Protocol,
    Scenario, SimConfig, Store, Transport, snapshot,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mockmail-cli")]
#[command(about = "Replay mailbox scenarios against an in-memory mail store")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Mailbox for steps that name no user (overrides `MAILSIM_ADDRESS`)
    #[arg(long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSON scenario file and print the resulting mailboxes
    Run {
        /// Scenario file
        file: PathBuf,
    },

    /// Deliver a few messages while a client idles, then print the
    /// resulting mailbox
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = SimConfig::from_env()?;
    if let Some(user) = &args.user {
        config.default_address.clone_from(user);
    }

    let registry = Arc::new(MailboxRegistry::new());
    config.apply(&registry)?;

    match &args.command {
        Command::Run { file } => cmd_run(&registry, &config, file)?,
        Command::Demo => cmd_demo(&registry, &config).await?,
    }

    let mailboxes = snapshot(&registry)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&mailboxes)?);
    } else {
        print_mailboxes(&mailboxes);
    }

    Ok(())
}

fn cmd_run(
    registry: &Arc<MailboxRegistry>,
    config: &SimConfig,
    file: &Path,
) -> anyhow::Result<()> {
    let scenario = Scenario::from_path(file)?;
    scenario.replay(registry, &config.default_address)?;
    Ok(())
}

async fn cmd_demo(registry: &Arc<MailboxRegistry>, config: &SimConfig) -> anyhow::Result<()> {
    let user = config.default_address.as_str();

    let store = Store::new(registry.clone(), Protocol::Imap);
    store.connect(user)?;
    let inbox = Arc::new(store.folder("INBOX")?);
    inbox.open(OpenMode::ReadWrite)?;

    let archive = store.folder("INBOX/Archive")?;
    archive.create()?;

    let idler = {
        let inbox = inbox.clone();
        tokio::spawn(async move { inbox.idle(true).await })
    };
    while !inbox.is_idling() && !idler.is_finished() {
        tokio::task::yield_now().await;
    }

    let transport = Transport::new(registry.clone());
    transport.connect()?;
    for n in 1..=3 {
        let content = MessageContent::builder()
            .subject(format!("Demo message {n}"))
            .from("demo@mockmail.local")
            .to(user)
            .text("Delivered by mockmail-cli demo")
            .build();
        transport.send(&content, &[user])?;
    }

    let exit = tokio::time::timeout(Duration::from_secs(5), idler).await???;
    info!("Idle returned: {:?}", exit);

    let first = inbox.message(1)?;
    inbox.copy_messages(std::slice::from_ref(&first), &archive)?;
    inbox.set_flags(&[first], &Flags::from(Flag::Deleted), true)?;
    inbox.close(true)?;
    store.close();

    Ok(())
}

fn print_mailboxes(mailboxes: &[MailboxSnapshot]) {
    if mailboxes.is_empty() {
        println!("No mailboxes.");
        return;
    }

    for mailbox in mailboxes {
        println!("{}", mailbox.address);
        println!("{}", "-".repeat(80));
        for folder in &mailbox.folders {
            println!(
                "{:<40} {:>5} msg(s)  uidvalidity {}{}",
                folder.full_name,
                folder.messages.len(),
                folder.uid_validity,
                if folder.subscribed { "  [subscribed]" } else { "" },
            );
            for message in &folder.messages {
                println!(
                    "  {:<6} {:<4} {:<30} {}",
                    message.uid,
                    message.number,
                    truncate(message.subject.as_deref().unwrap_or("-"), 28),
                    message.flags.join(" "),
                );
            }
        }
        println!();
    }

    println!("{} mailbox(es)", mailboxes.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

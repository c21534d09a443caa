//! Simulation configuration

use crate::error::{Error, Result};
use crate::mailbox::MailboxRegistry;
use std::env;
use tracing::info;

const DEFAULT_ADDRESS: &str = "user@localhost";

/// Environment-driven defaults for the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Mailbox used when a command names no user.
    pub default_address: String,
    /// Mailboxes whose INBOX starts out simulating errors.
    pub failing_addresses: Vec<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            default_address: DEFAULT_ADDRESS.to_string(),
            failing_addresses: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Load configuration from environment variables
    ///
    /// Reads from `.env` file if present. Optional variables:
    /// - `MAILSIM_ADDRESS` (default: `user@localhost`)
    /// - `MAILSIM_FAILING`: comma-separated addresses
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `MAILSIM_ADDRESS` is empty.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let default_address =
            env::var("MAILSIM_ADDRESS").unwrap_or_else(|_| DEFAULT_ADDRESS.to_string());
        if default_address.trim().is_empty() {
            return Err(Error::Config("MAILSIM_ADDRESS is empty".into()));
        }

        Ok(Self {
            default_address,
            failing_addresses: env::var("MAILSIM_FAILING")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
        })
    }

    /// Turn on simulated errors for every failing address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for a malformed address.
    pub fn apply(&self, registry: &MailboxRegistry) -> Result<()> {
        for address in &self.failing_addresses {
            registry.get(address)?.inbox().set_simulate_error(true);
            info!("Mailbox {} simulates errors", address);
        }
        Ok(())
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

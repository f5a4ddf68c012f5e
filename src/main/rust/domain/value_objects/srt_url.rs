use std::fmt;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, Result};

/// Length of generated listener passphrases
pub const GENERATED_PASSPHRASE_LEN: usize = 32;

/// SRT connection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SrtMode {
    #[default]
    Listener,
    Caller,
    Rendezvous,
}

impl SrtMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SrtMode::Listener => "listener",
            SrtMode::Caller => "caller",
            SrtMode::Rendezvous => "rendezvous",
        }
    }
}

impl fmt::Display for SrtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SRT URL with its query parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SrtUrl {
    base: String,
    mode: SrtMode,
    latency: Option<u32>,
    listen_timeout: Option<u32>,
    passphrase: Option<String>,
}

impl SrtUrl {
    /// Listening URL bound on every local address
    pub fn listener(port: u16) -> Self {
        Self {
            base: format!("srt://0.0.0.0:{}", port),
            mode: SrtMode::Listener,
            latency: None,
            listen_timeout: None,
            passphrase: None,
        }
    }

    /// Target URL for dialing an existing remote endpoint
    pub fn remote(base: &str, mode: SrtMode) -> Result<Self> {
        if !base.starts_with("srt://") {
            return Err(DomainError::InvalidSrtUrl(base.to_string()));
        }

        Ok(Self {
            base: base.to_string(),
            mode,
            latency: None,
            listen_timeout: None,
            passphrase: None,
        })
    }

    pub fn with_latency(mut self, latency: Option<u32>) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_listen_timeout(mut self, listen_timeout: Option<u32>) -> Self {
        self.listen_timeout = listen_timeout;
        self
    }

    pub fn with_passphrase(mut self, passphrase: Option<String>) -> Self {
        self.passphrase = passphrase.filter(|p| !p.is_empty());
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn mode(&self) -> SrtMode {
        self.mode
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }

    /// Random alphanumeric secret for listener-mode encryption
    pub fn generate_passphrase() -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_PASSPHRASE_LEN)
            .map(char::from)
            .collect()
    }
}

impl fmt::Display for SrtUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.base.contains('?') { '&' } else { '?' };
        write!(f, "{}{}mode={}", self.base, separator, self.mode)?;

        if let Some(latency) = self.latency {
            write!(f, "&latency={}", latency)?;
        }
        if let Some(listen_timeout) = self.listen_timeout {
            write!(f, "&listen_timeout={}", listen_timeout)?;
        }
        if let Some(passphrase) = &self.passphrase {
            write!(f, "&passphrase={}", passphrase)?;
        }
        Ok(())
    }
}

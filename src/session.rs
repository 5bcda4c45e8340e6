//! Per-shell session state and the credential check behind maintenance mode.

use crate::errors::CoreError;
use crate::tree::DirId;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hashes `password` into an argon2id PHC string.
pub fn hash_password(password: &str) -> crate::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CoreError::invalid_input(format!("cannot hash password: {err}")))
}

/// Checks `password` against a PHC string produced by [`hash_password`].
pub fn verify_password(phc: &str, password: &str) -> crate::Result<bool> {
    let parsed = PasswordHash::new(phc)
        .map_err(|err| CoreError::invalid_input(format!("stored password hash is malformed: {err}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Pending `EDIT` buffer.
///
/// The existing content is kept byte for byte; typed lines are appended
/// after it using the line terminator the content already uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditState {
    pub dir: DirId,
    pub file: String,
    original: String,
    added: Vec<String>,
}

impl EditState {
    /// Starts an edit of `file` seeded with its current content.
    pub fn new(dir: DirId, file: impl Into<String>, content: &str) -> Self {
        Self {
            dir,
            file: file.into(),
            original: content.to_string(),
            added: Vec::new(),
        }
    }

    /// Adds one typed line to the buffer.
    pub fn push_line(&mut self, line: &str) {
        self.added.push(line.to_string());
    }

    pub fn line_count(&self) -> usize {
        self.original.lines().count() + self.added.len()
    }

    fn terminator(&self) -> &'static str {
        if self.original.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }

    /// The buffer as file content.
    pub fn text(&self) -> String {
        if self.added.is_empty() {
            return self.original.clone();
        }
        let eol = self.terminator();
        let typed = self.added.join(eol);
        if self.original.is_empty() {
            typed
        } else if self.original.ends_with('\n') {
            format!("{}{typed}{eol}", self.original)
        } else {
            format!("{}{eol}{typed}", self.original)
        }
    }
}

/// Disk cursor used while in maintenance mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceState {
    pub cursor: PathBuf,
}

/// Mutually exclusive input modes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    Editing(EditState),
    Maintenance(MaintenanceState),
}

/// Who is at the prompt and where they are.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: String,
    pub home: DirId,
    pub cwd: DirId,
    pub mode: Mode,
    authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user: impl Into<String>, home: DirId) -> Self {
        Self {
            user: user.into(),
            home,
            cwd: home,
            mode: Mode::Normal,
            authenticated_at: None,
        }
    }

    /// Switches identity; authentication does not carry over.
    pub fn switch_user(&mut self, user: impl Into<String>, home: DirId) {
        self.user = user.into();
        self.home = home;
        self.cwd = home;
        self.mode = Mode::Normal;
        self.authenticated_at = None;
    }

    pub fn authenticate(&mut self, now: DateTime<Utc>) {
        self.authenticated_at = Some(now);
    }

    pub fn clear_authentication(&mut self) {
        self.authenticated_at = None;
    }

    /// Time left before the authentication expires, if still valid.
    pub fn auth_remaining(&self, now: DateTime<Utc>, timeout: Duration) -> Option<Duration> {
        let since = self.authenticated_at?;
        let elapsed = (now - since).to_std().unwrap_or_default();
        timeout.checked_sub(elapsed).filter(|left| !left.is_zero())
    }

    pub fn is_authenticated(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.auth_remaining(now, timeout).is_some()
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, Mode::Editing(_))
    }

    pub fn in_maintenance(&self) -> bool {
        matches!(self.mode, Mode::Maintenance(_))
    }
}

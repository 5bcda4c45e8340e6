//! Shell configuration: on-disk layout, identities and size limits.

use crate::errors::CoreError;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the persisted tree snapshot inside the data directory.
pub const SNAPSHOT_FILE_NAME: &str = "filesystem.dat";

/// Directory under the virtual root that holds one subtree per user.
pub const USERS_DIR: &str = "USERS";

pub const DEFAULT_ADMIN_USER: &str = "admin";
pub const DEFAULT_GUEST_USER: &str = "guest";

/// Sub-folders every new home directory starts with.
pub const DEFAULT_HOME_FOLDERS: [&str; 3] = ["Documents", "Projects", "Desktop"];

pub const README_FILE_NAME: &str = "README.txt";

pub const ENV_ROOT: &str = "VFSH_ROOT";
pub const ENV_ADMIN_USER: &str = "VFSH_ADMIN_USER";
pub const ENV_ADMIN_HASH: &str = "VFSH_ADMIN_HASH";
pub const ENV_SESSION_TIMEOUT: &str = "VFSH_SESSION_TIMEOUT";
pub const ENV_USER: &str = "VFSH_USER";

/// Capacity ceilings of the tree. Exceeding them is reported, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_name_len: usize,
    pub max_children: usize,
    pub max_files: usize,
    /// Largest file content kept in memory; also the disk read limit on pull.
    pub max_content: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_len: 64,
            max_children: 64,
            max_files: 64,
            max_content: 4096,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Application root; the virtual root maps onto `<app_root>/data`.
    pub app_root: PathBuf,
    /// Users seeded into a fresh tree.
    pub users: Vec<String>,
    /// The privileged identity allowed into maintenance mode.
    pub admin_user: String,
    /// Identity the shell starts as.
    pub start_user: String,
    /// argon2 PHC string for the admin password. `None` disables `LOGIN`.
    pub admin_password_hash: Option<String>,
    pub session_timeout: Duration,
    pub limits: Limits,
}

impl ShellConfig {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            users: vec![DEFAULT_ADMIN_USER.to_string(), DEFAULT_GUEST_USER.to_string()],
            admin_user: DEFAULT_ADMIN_USER.to_string(),
            start_user: DEFAULT_GUEST_USER.to_string(),
            admin_password_hash: None,
            session_timeout: Duration::from_secs(300),
            limits: Limits::default(),
        }
    }

    /// Builds a configuration from the process environment.
    pub fn from_env() -> crate::Result<Self> {
        let environ = env::vars().collect::<HashMap<String, String>>();
        Self::from_environ(&environ)
    }

    /// Builds a configuration from an explicit environment map.
    pub fn from_environ(environ: &HashMap<String, String>) -> crate::Result<Self> {
        let app_root = match environ.get(ENV_ROOT).filter(|v| !v.is_empty()) {
            Some(root) => PathBuf::from(root),
            None => env::current_dir().map_err(|err| CoreError::io(".", err))?,
        };
        let mut config = Self::new(app_root);

        if let Some(admin) = environ.get(ENV_ADMIN_USER).filter(|v| !v.is_empty()) {
            config.users.retain(|user| user != DEFAULT_ADMIN_USER);
            config.users.insert(0, admin.clone());
            config.admin_user = admin.clone();
        }
        if let Some(user) = environ.get(ENV_USER).filter(|v| !v.is_empty()) {
            config.start_user = user.clone();
        }
        if let Some(hash) = environ.get(ENV_ADMIN_HASH).filter(|v| !v.is_empty()) {
            config.admin_password_hash = Some(hash.clone());
        }
        if let Some(secs) = environ.get(ENV_SESSION_TIMEOUT) {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                CoreError::invalid_input(format!("{ENV_SESSION_TIMEOUT} must be a number of seconds, got {secs:?}"))
            })?;
            config.session_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_admin_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.admin_password_hash = Some(hash.into());
        self
    }

    pub fn with_start_user(mut self, user: impl Into<String>) -> Self {
        self.start_user = user.into();
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn data_dir(&self) -> PathBuf {
        self.app_root.join("data")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir().join(SNAPSHOT_FILE_NAME)
    }
}

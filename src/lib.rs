//! Core of the vfsh shell: an in-memory directory tree mirrored to a real
//! directory on disk, a soft-delete trash, and the command dispatcher that
//! drives them one input line at a time.
//!
//! The terminal front end lives in the `vfsh-repl` crate; everything it needs
//! goes through [`Shell`].

pub mod config;
pub mod errors;
pub mod external;
pub mod fs;
pub mod helpers;
pub mod mirror;
pub mod models;
pub mod path;
pub mod seed;
pub mod session;
pub mod shell;
pub mod snapshot;
pub mod trash;
pub mod tree;

pub use config::{Limits, ShellConfig};
pub use errors::{CoreError, Result};
pub use external::{ProcessRunner, ToolOutput, ToolRunner};
pub use fs::{FileSystem, RealFileSystem};
pub use helpers::{format_duration, format_timestamp, print_size};
pub use mirror::{DiskMirror, PullReport, PushReport};
pub use models::{CommandOutput, EffectClass, Flow, OutputLine, Privilege, Stream};
pub use session::{hash_password, verify_password, Clock, Mode, Session, SystemClock};
pub use shell::Shell;
pub use trash::{TrashItem, TrashKind, TrashLedger};
pub use tree::{DirId, DirImage, Directory, File, Tree};

/// Re-export a small stable API surface for front ends and tests.
pub mod prelude {
    pub use crate::{
        config::{Limits, ShellConfig},
        errors::{CoreError, Result},
        external::{ToolOutput, ToolRunner},
        fs::{FileSystem, RealFileSystem},
        models::*,
        session::{Clock, Mode, SystemClock},
        shell::Shell,
        tree::{DirId, Tree},
    };
}

/// What the prompt loop should do after a line.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Flow {
    Continue,
    Terminate,
}

/// Effect class of a command, used for help output and for deciding what
/// follows a handler.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EffectClass {
    ReadOnly,
    Mutating,
    Navigation,
    PassThrough,
}

impl EffectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::Mutating => "mutating",
            Self::Navigation => "navigation",
            Self::PassThrough => "pass-through",
        }
    }
}

impl std::fmt::Display for EffectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimum identity a command needs.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Privilege {
    Anyone,
    Admin,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Stream {
    Out,
    Err,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

/// Text produced by commands since the last drain.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub lines: Vec<OutputLine>,
    /// Set by `CLS`; the terminal clears before printing `lines`.
    pub clear_screen: bool,
}

impl CommandOutput {
    pub fn out(&mut self, text: impl Into<String>) {
        self.lines.push(OutputLine {
            stream: Stream::Out,
            text: text.into(),
        });
    }

    pub fn err(&mut self, text: impl Into<String>) {
        self.lines.push(OutputLine {
            stream: Stream::Err,
            text: text.into(),
        });
    }

    /// Pushes every line of `text` to stdout.
    pub fn out_block(&mut self, text: &str) {
        for line in text.lines() {
            self.out(line);
        }
    }

    /// Pushes every line of `text` to stderr.
    pub fn err_block(&mut self, text: &str) {
        for line in text.lines() {
            self.err(line);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && !self.clear_screen
    }

    fn joined(&self, stream: Stream) -> String {
        self.lines
            .iter()
            .filter(|line| line.stream == stream)
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Stdout lines joined with `\n`.
    pub fn stdout_text(&self) -> String {
        self.joined(Stream::Out)
    }

    /// Stderr lines joined with `\n`.
    pub fn stderr_text(&self) -> String {
        self.joined(Stream::Err)
    }
}

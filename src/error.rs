use thiserror::Error;

/// Errors that can escape a handler. Handlers own their failure types; the
/// dispatcher carries them through unmodified.
pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Process exit status for argument and usage errors.
pub const USAGE_EXIT_CODE: i32 = 2;

/// Setup-time errors: raised while a parser is being built, before any
/// argv token has been looked at. Construction aborts immediately; a parser
/// is never left partially built.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("parameter `{name}` has unsupported kind `{kind}`")]
    UnsupportedParameter { name: String, kind: &'static str },

    #[error("failed to generate a flag for argument: {0}")]
    FlagGeneration(String),

    #[error("annotation `{name}` is not supported (depth {depth})")]
    UnsupportedAnnotation { name: String, depth: usize },

    #[error("duplicate parameter name: {0}")]
    DuplicateParameter(String),

    #[error("more than one variadic positional parameter: {0}")]
    ExtraVariadicPositional(String),

    #[error("unknown argument in group: {0}")]
    UnknownGroupMember(String),
}

/// Parse-time errors: the user supplied something the parser could not
/// accept. Reported with the usage line on stderr and exit code 2 when
/// parsing through the exiting entry points.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct UsageError {
    /// Program name of the parser that rejected the input; for a
    /// sub-command this is `"prog sub"`.
    pub prog: String,
    pub message: String,
    /// Rendered usage line for that parser.
    pub usage: String,
}

impl UsageError {
    pub fn new(
        prog: impl Into<String>,
        message: impl Into<String>,
        usage: impl Into<String>,
    ) -> Self {
        Self {
            prog: prog.into(),
            message: message.into(),
            usage: usage.into(),
        }
    }
}

/// Everything the dispatcher can hand back to its caller.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    /// The wrapped callable failed; the inner error is untouched.
    #[error("command failed: {0}")]
    Handler(DynError),

    /// Sub-command dispatch found no registered callable for the parsed
    /// name. This is a programming error, not a user error: registration
    /// and selection disagree.
    #[error("no command registered for parsed sub-command `{0}`")]
    NoMatchingCommand(String),
}

pub type Result<T> = std::result::Result<T, RunError>;

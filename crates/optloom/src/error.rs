use std::io;

/// Failure kinds raised while declaring, parsing or running a command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value failed coercion, or a long option was given without `=value`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A `store` destination received a second value from argv.
    #[error("received too many values for {option}: rejected {value:?}")]
    DuplicateStore { option: String, value: String },

    /// Tokens were left over once no option could make further progress.
    #[error("unknown arguments: {}", .0.join(" "))]
    UnknownArguments(Vec<String>),

    /// More than one short-circuit option was matched in one invocation.
    #[error("more than one short-circuit option: cannot mix {first} and {second}")]
    ConflictingShortCircuit { first: String, second: String },

    /// An option or sub-command was declared with invalid settings.
    #[error("declaration error: {0}")]
    Declaration(String),

    /// The option registry could not produce the options of a namespace.
    #[error("option registry error: {0}")]
    Registry(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// The command's `execute` hook failed.
    #[error(transparent)]
    Execute(#[from] anyhow::Error),
}

impl Error {
    /// Whether this is a malformed-argument report that the parse loop
    /// recovers from instead of aborting.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::DuplicateStore { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

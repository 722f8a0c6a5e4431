//! Option descriptors and the action table that stores parsed values.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;

use crate::args::ArgMap;
use crate::command::{Command, CommandDef};
use crate::consumer::{Consumer, Mode};
use crate::error::{Error, Result};
use crate::value::{Coerce, Value};

static SHORT_TRIGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\w[\w-]*$").expect("short trigger pattern is valid"));
static LONG_TRIGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^--\w[\w-]*$").expect("long trigger pattern is valid"));

/// Process-wide creation sequence. Options sort by this index unless
/// [`CliOption::index_for`] says otherwise.
static NEXT_INDEX: AtomicU64 = AtomicU64::new(1);

fn next_index() -> u64 {
    NEXT_INDEX.fetch_add(1, Ordering::Relaxed)
}

/// How many values an option may consume during one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    /// `?`: zero or one value.
    Optional,
    /// `*`: any number of values.
    Any,
}

impl FromStr for Arity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "?" => Ok(Self::Optional),
            "*" => Ok(Self::Any),
            other => other.parse::<usize>().map(Self::Exactly).map_err(|_| {
                Error::Declaration(format!("nargs must be an integer, ?, or * (got {other:?})"))
            }),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "{n}"),
            Self::Optional => f.write_str("?"),
            Self::Any => f.write_str("*"),
        }
    }
}

/// What a matched option does with the result mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Store,
    StoreTrue,
    StoreFalse,
    Append,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::StoreTrue => "store_true",
            Self::StoreFalse => "store_false",
            Self::Append => "append",
        }
    }

    /// Whether a match consumes a value token besides the trigger.
    pub fn takes_value(self) -> bool {
        matches!(self, Self::Store | Self::Append)
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "store" => Ok(Self::Store),
            "store_true" | "store-true" => Ok(Self::StoreTrue),
            "store_false" | "store-false" => Ok(Self::StoreFalse),
            "append" => Ok(Self::Append),
            other => Err(Error::Declaration(format!("unknown action {other:?}"))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value seeded into an option's destination before parsing.
#[derive(Debug, Clone, Default)]
pub enum DefaultValue {
    /// No default: the destination is dropped before `execute` unless argv
    /// supplies a value.
    #[default]
    None,
    Value(Value),
    /// Evaluated afresh for every parse.
    Factory(fn() -> Value),
}

impl DefaultValue {
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Value(v) => Some(v.clone()),
            Self::Factory(f) => Some(f()),
        }
    }
}

/// Declares how one flag or positional slot is recognized, consumed,
/// coerced and stored.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    short: Option<String>,
    long: Option<String>,
    dest: Option<String>,
    arity: Arity,
    action: Action,
    coerce: Coerce,
    short_circuit: bool,
    constant: Option<Value>,
    default: DefaultValue,
    help: String,
    index: u64,
}

impl OptionSpec {
    pub fn builder() -> OptionSpecBuilder {
        OptionSpecBuilder::default()
    }

    /// Start a positional option storing into `dest`.
    pub fn positional(dest: impl Into<String>) -> OptionSpecBuilder {
        OptionSpecBuilder::default().dest(dest)
    }

    /// A spec that never matches on its own, for options that implement
    /// their own `parse` (sub-commands).
    pub(crate) fn detached(help: String) -> Self {
        Self {
            short: None,
            long: None,
            dest: None,
            arity: Arity::Any,
            action: Action::Store,
            coerce: Coerce::default(),
            short_circuit: false,
            constant: None,
            default: DefaultValue::None,
            help,
            index: next_index(),
        }
    }

    pub(crate) fn set_help(&mut self, help: impl Into<String>) {
        self.help = help.into();
    }

    pub fn short(&self) -> Option<&str> {
        self.short.as_deref()
    }

    pub fn long(&self) -> Option<&str> {
        self.long.as_deref()
    }

    pub fn dest(&self) -> Option<&str> {
        self.dest.as_deref()
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn coerce(&self) -> &Coerce {
        &self.coerce
    }

    pub fn short_circuit(&self) -> bool {
        self.short_circuit
    }

    pub fn constant(&self) -> Option<&Value> {
        self.constant.as_ref()
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Creation index, monotonic across the process.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn is_positional(&self) -> bool {
        self.short.is_none() && self.long.is_none()
    }

    /// How `first` matches this option, if at all. Short beats long beats
    /// positional.
    pub fn match_mode(&self, first: &str) -> Option<Mode> {
        if self.short.as_deref() == Some(first) {
            return Some(Mode::Short);
        }
        if let Some(long) = &self.long {
            let name = first.split_once('=').map_or(first, |(name, _)| name);
            if name == long {
                return Some(Mode::Long);
            }
        }
        if self.is_positional() {
            return Some(Mode::Positional);
        }
        None
    }

    /// The value seeded into the destination before parsing.
    pub fn initial_value(&self) -> Option<Value> {
        match (self.default.resolve(), self.action) {
            (Some(v), _) => Some(v),
            (None, Action::Append) => Some(Value::Array(Vec::new())),
            (None, _) => None,
        }
    }

    /// Try to claim the token at the front of `consumer`.
    ///
    /// Returns `Ok(true)` when something was consumed and `Ok(false)` when
    /// the option does not apply. A malformed value is returned as `Err` for
    /// flag options so the caller can report it and continue; positional
    /// options decline a value that fails coercion, leaving the token to
    /// later options. A duplicate store is always returned as `Err` and
    /// consumes nothing.
    pub fn attempt(&self, consumer: &mut Consumer<'_>, args: &mut ArgMap) -> Result<bool> {
        let Some(mode) = consumer.peek().and_then(|first| self.match_mode(first)) else {
            return Ok(false);
        };
        match self.apply(consumer, args, mode) {
            Ok(()) => Ok(true),
            Err(err @ Error::InvalidArgument(_)) if self.is_positional() => {
                tracing::debug!(option = %self, error = %err, "positional declined token");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn apply(&self, consumer: &mut Consumer<'_>, args: &mut ArgMap, mode: Mode) -> Result<()> {
        let dest = self
            .dest
            .as_deref()
            .ok_or_else(|| Error::Declaration(format!("{self} has no destination")))?;
        match self.action {
            Action::Store => self.store(consumer, args, dest, mode),
            Action::StoreTrue => {
                consumer.skip_trigger();
                args.set(dest, Value::Bool(true));
                Ok(())
            }
            Action::StoreFalse => {
                consumer.skip_trigger();
                args.set(dest, Value::Bool(false));
                Ok(())
            }
            Action::Append => {
                let value = consumer.consume(mode, &self.coerce)?;
                args.push(dest, value);
                Ok(())
            }
        }
    }

    fn store(
        &self,
        consumer: &mut Consumer<'_>,
        args: &mut ArgMap,
        dest: &str,
        mode: Mode,
    ) -> Result<()> {
        if args.is_explicit(dest) {
            return Err(Error::DuplicateStore {
                option: self.to_string(),
                value: consumer.peek().unwrap_or_default().to_string(),
            });
        }
        let value = match &self.constant {
            Some(constant) => {
                consumer.skip_trigger();
                constant.clone()
            }
            None => consumer.consume(mode, &self.coerce)?,
        };
        args.set(dest, value);
        Ok(())
    }
}

impl fmt::Display for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.long, &self.short, &self.dest) {
            (Some(long), _, _) => f.write_str(long),
            (None, Some(short), _) => f.write_str(short),
            (None, None, Some(dest)) => write!(f, "<{dest}>"),
            (None, None, None) => f.write_str("<positional>"),
        }
    }
}

/// Builder for [`OptionSpec`]; `build` validates the declaration.
#[derive(Debug, Clone, Default)]
pub struct OptionSpecBuilder {
    short: Option<String>,
    long: Option<String>,
    dest: Option<String>,
    arity: Option<Arity>,
    action: Action,
    coerce: Coerce,
    short_circuit: bool,
    constant: Option<Value>,
    default: DefaultValue,
    help: String,
}

impl OptionSpecBuilder {
    pub fn short(mut self, short: impl Into<String>) -> Self {
        self.short = Some(short.into());
        self
    }

    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn coerce(mut self, coerce: Coerce) -> Self {
        self.coerce = coerce;
        self
    }

    pub fn short_circuit(mut self, short_circuit: bool) -> Self {
        self.short_circuit = short_circuit;
        self
    }

    pub fn constant(mut self, value: impl Into<Value>) -> Self {
        self.constant = Some(value.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    pub fn default_with(mut self, factory: fn() -> Value) -> Self {
        self.default = DefaultValue::Factory(factory);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn build(self) -> Result<OptionSpec> {
        if let Some(short) = &self.short {
            if !SHORT_TRIGGER.is_match(short) {
                return Err(Error::Declaration(format!(
                    "short option {short:?} must begin with a single -"
                )));
            }
        }
        if let Some(long) = &self.long {
            if !LONG_TRIGGER.is_match(long) {
                return Err(Error::Declaration(format!(
                    "long option {long:?} must begin with --"
                )));
            }
        }

        let dest = match self.dest {
            Some(dest) if dest.trim().is_empty() => {
                return Err(Error::Declaration("dest cannot be empty".to_string()));
            }
            Some(dest) => Some(dest),
            None => self
                .long
                .as_deref()
                .map(|l| &l[2..])
                .or_else(|| self.short.as_deref().map(|s| &s[1..]))
                .map(|name| name.replace('-', "_")),
        };
        let Some(dest) = dest else {
            return Err(Error::Declaration(
                "positional option requires a dest".to_string(),
            ));
        };

        let arity = self.arity.unwrap_or(match self.action {
            Action::Append => Arity::Any,
            _ => Arity::Optional,
        });

        Ok(OptionSpec {
            short: self.short,
            long: self.long,
            dest: Some(dest),
            arity,
            action: self.action,
            coerce: self.coerce,
            short_circuit: self.short_circuit,
            constant: self.constant,
            default: self.default,
            help: self.help,
            index: next_index(),
        })
    }
}

/// The option capability: anything a command can hold in its option list.
///
/// Plain options are [`OptionSpec`]s; types with side effects wrap a spec
/// and override [`run`](CliOption::run).
pub trait CliOption: fmt::Debug {
    fn spec(&self) -> &OptionSpec;

    /// Ordering key within `command`. Defaults to the creation index.
    fn index_for(&self, _command: &dyn CommandDef) -> u64 {
        self.spec().index()
    }

    /// Attempt to claim tokens; see [`OptionSpec::attempt`].
    fn parse(&mut self, consumer: &mut Consumer<'_>, args: &mut ArgMap) -> Result<bool> {
        self.spec().attempt(consumer, args)
    }

    /// Side effect invoked during the command's run phase.
    fn run(&self, _command: &Command<'_>, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    /// The trigger name when this option delegates to a sub-command.
    fn command_name(&self) -> Option<&str> {
        None
    }

    /// Drop state captured by a previous parse.
    fn reset(&mut self) {}
}

impl CliOption for OptionSpec {
    fn spec(&self) -> &OptionSpec {
        self
    }
}

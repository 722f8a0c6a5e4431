//! The command: owns the option list, runs the fixed-point parse loop and
//! dispatches option side effects before the command's own task.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::args::ArgMap;
use crate::consumer::{ArgCursor, Consumer, Remaining};
use crate::error::{Error, Result};
use crate::option::CliOption;
use crate::registry::{DEFAULT_NAMESPACE, OptionRegistry, StaticRegistry};
use crate::value::is_truthy;

/// What to do with tokens no option would claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeftoverPolicy {
    /// Fail with [`Error::UnknownArguments`].
    #[default]
    Reject,
    /// Keep them in [`Command::remaining`].
    Keep,
}

/// A command type: its metadata, its declared options and its task.
pub trait CommandDef {
    fn name(&self) -> &str {
        ""
    }

    fn version(&self) -> &str {
        "unknown"
    }

    fn summary(&self) -> &str {
        ""
    }

    /// Options declared directly by this command type.
    fn options(&self) -> Result<Vec<Box<dyn CliOption>>> {
        Ok(Vec::new())
    }

    /// Registry namespaces whose options are added to the declared ones.
    fn namespaces(&self) -> Vec<String> {
        vec![DEFAULT_NAMESPACE.to_string()]
    }

    fn leftover_policy(&self) -> LeftoverPolicy {
        LeftoverPolicy::Reject
    }

    /// Called after parsing, once no short-circuit conflict was found and
    /// before any option side effect runs.
    fn before_options(&mut self, _args: &ArgMap) {}

    /// The command's task, given the fully parsed result mapping.
    fn execute(&mut self, _invocation: Invocation<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Everything `execute` gets to see.
pub struct Invocation<'a> {
    pub args: &'a ArgMap,
    /// Leftover tokens kept under [`LeftoverPolicy::Keep`].
    pub remaining: &'a [String],
    pub parent: Option<&'a Command<'a>>,
    pub out: &'a mut dyn Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Unparsed,
    Parsing,
    Parsed,
    ShortCircuited,
    Executed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Option side effects ran and `execute` was called.
    Executed,
    /// Only the named short-circuit option ran.
    ShortCircuited { option: String },
}

/// Parser and dispatcher for one invocation of a [`CommandDef`].
pub struct Command<'p> {
    def: Box<dyn CommandDef>,
    parent: Option<&'p Command<'p>>,
    registry: Arc<dyn OptionRegistry>,
    options: Vec<Box<dyn CliOption>>,
    args: ArgMap,
    remaining: Vec<String>,
    diagnostics: Vec<Error>,
    passes: usize,
    state: CommandState,
}

impl Command<'static> {
    /// Build a top-level command that loads plugin options from the
    /// built-in registry (help and version).
    pub fn new<D: CommandDef + 'static>(def: D) -> Result<Self> {
        Self::with_registry(def, Arc::new(StaticRegistry::with_defaults()))
    }

    pub fn with_registry<D: CommandDef + 'static>(
        def: D,
        registry: Arc<dyn OptionRegistry>,
    ) -> Result<Self> {
        Self::from_boxed(Box::new(def), registry)
    }

    pub fn from_boxed(def: Box<dyn CommandDef>, registry: Arc<dyn OptionRegistry>) -> Result<Self> {
        Self::build(def, None, registry)
    }
}

impl<'p> Command<'p> {
    /// Build a nested command that shares `parent`'s registry.
    pub fn with_parent(def: Box<dyn CommandDef>, parent: &'p Command<'p>) -> Result<Self> {
        let registry = Arc::clone(&parent.registry);
        Self::build(def, Some(parent), registry)
    }

    fn build(
        def: Box<dyn CommandDef>,
        parent: Option<&'p Command<'p>>,
        registry: Arc<dyn OptionRegistry>,
    ) -> Result<Self> {
        let mut options = def.options()?;
        for namespace in def.namespaces() {
            for factory in registry.load(&namespace)? {
                options.push(factory()?);
            }
        }
        options.sort_by_key(|opt| opt.index_for(def.as_ref()));
        tracing::debug!(
            command = def.name(),
            options = options.len(),
            "loaded command options"
        );

        Ok(Self {
            def,
            parent,
            registry,
            options,
            args: ArgMap::default(),
            remaining: Vec::new(),
            diagnostics: Vec::new(),
            passes: 0,
            state: CommandState::Unparsed,
        })
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn version(&self) -> &str {
        self.def.version()
    }

    pub fn summary(&self) -> &str {
        self.def.summary()
    }

    /// Space-separated names from the top-level command down to this one.
    pub fn path(&self) -> String {
        let mut names = vec![self.name()];
        let mut cur = self.parent;
        while let Some(cmd) = cur {
            names.push(cmd.name());
            cur = cmd.parent;
        }
        names.retain(|n| !n.is_empty());
        names.reverse();
        names.join(" ")
    }

    pub fn def(&self) -> &dyn CommandDef {
        self.def.as_ref()
    }

    pub fn parent(&self) -> Option<&Command<'p>> {
        self.parent
    }

    pub fn registry(&self) -> &Arc<dyn OptionRegistry> {
        &self.registry
    }

    /// Options in dispatch order.
    pub fn options(&self) -> &[Box<dyn CliOption>] {
        &self.options
    }

    pub fn args(&self) -> &ArgMap {
        &self.args
    }

    /// Leftover tokens kept under [`LeftoverPolicy::Keep`].
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    /// Malformed arguments reported and recovered from during the last parse.
    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    /// Number of passes the last parse took.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Parse `tokens`, populating the result mapping.
    ///
    /// Every destination is seeded with its default first. Passes repeat
    /// while they make progress; an empty token list still gets one pass.
    pub fn parse<I, S>(&mut self, tokens: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state = CommandState::Parsing;
        self.args.clear();
        self.remaining.clear();
        self.diagnostics.clear();
        self.passes = 0;
        for opt in &mut self.options {
            opt.reset();
        }

        let mut cursor = ArgCursor::new(tokens);
        let mut arity = Vec::with_capacity(self.options.len());
        for opt in &self.options {
            let spec = opt.spec();
            if let Some(dest) = spec.dest() {
                self.args.seed(dest, spec.initial_value());
            }
            arity.push(Remaining::from(spec.arity()));
        }

        if cursor.is_empty() {
            self.parse_pass(&mut cursor, &mut arity)?;
        }
        while !cursor.is_empty() {
            if !self.parse_pass(&mut cursor, &mut arity)? {
                break;
            }
        }

        if !cursor.is_empty() {
            let leftovers = cursor.take_rest();
            match self.def.leftover_policy() {
                LeftoverPolicy::Reject => return Err(Error::UnknownArguments(leftovers)),
                LeftoverPolicy::Keep => {
                    tracing::debug!(?leftovers, "keeping unclaimed arguments");
                    self.remaining = leftovers;
                }
            }
        }

        self.state = CommandState::Parsed;
        Ok(())
    }

    /// Let each open option, in order, try the front token. The pass ends at
    /// the first claim. Returns whether any token was consumed.
    fn parse_pass(&mut self, cursor: &mut ArgCursor, arity: &mut [Remaining]) -> Result<bool> {
        self.passes += 1;
        let before = cursor.remaining();

        for (opt, left) in self.options.iter_mut().zip(arity.iter_mut()) {
            if !left.is_open() {
                continue;
            }
            let mut consumer = Consumer::new(cursor, left);
            match opt.parse(&mut consumer, &mut self.args) {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) if err.is_malformed() => {
                    tracing::warn!(option = %opt.spec(), "{err}");
                    self.diagnostics.push(err);
                }
                Err(err) => return Err(err),
            }
        }

        let progressed = cursor.remaining() != before;
        tracing::debug!(
            pass = self.passes,
            left = cursor.remaining(),
            progressed,
            "parse pass finished"
        );
        Ok(progressed)
    }

    /// Parse `tokens`, then run option side effects and `execute`.
    ///
    /// When exactly one short-circuit option matched, only its side effect
    /// runs. More than one is an error raised before anything runs.
    pub fn run<I, S>(&mut self, tokens: I, out: &mut dyn Write) -> Result<RunOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parse(tokens)?;
        let selected = self.short_circuit_option()?;

        self.def.before_options(&self.args);

        if let Some(idx) = selected {
            let opt = &self.options[idx];
            let option = opt.spec().to_string();
            tracing::debug!(%option, "short-circuiting");
            opt.run(self, out)?;
            self.state = CommandState::ShortCircuited;
            return Ok(RunOutcome::ShortCircuited { option });
        }

        for opt in &self.options {
            if !opt.spec().short_circuit() {
                opt.run(self, out)?;
            }
        }

        self.args.strip_unset();
        let invocation = Invocation {
            args: &self.args,
            remaining: &self.remaining,
            parent: self.parent,
            out,
        };
        self.def.execute(invocation)?;
        self.state = CommandState::Executed;
        Ok(RunOutcome::Executed)
    }

    fn short_circuit_option(&self) -> Result<Option<usize>> {
        let mut selected: Option<usize> = None;
        for (idx, opt) in self.options.iter().enumerate() {
            let spec = opt.spec();
            if !spec.short_circuit() {
                continue;
            }
            let matched = spec
                .dest()
                .and_then(|dest| self.args.get(dest))
                .is_some_and(is_truthy);
            if !matched {
                continue;
            }
            match selected {
                None => selected = Some(idx),
                Some(first) => {
                    return Err(Error::ConflictingShortCircuit {
                        first: self.options[first].spec().to_string(),
                        second: spec.to_string(),
                    });
                }
            }
        }
        Ok(selected)
    }
}

impl fmt::Debug for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name())
            .field("parent", &self.parent.map(|p| p.name()))
            .field("options", &self.options)
            .field("args", &self.args)
            .field("remaining", &self.remaining)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{Action, OptionSpec};
    use crate::value;

    #[derive(Default)]
    struct Greet;

    impl CommandDef for Greet {
        fn name(&self) -> &str {
            "greet"
        }

        fn version(&self) -> &str {
            "1.2.3"
        }

        fn options(&self) -> Result<Vec<Box<dyn CliOption>>> {
            let options: Vec<Box<dyn CliOption>> = vec![
                Box::new(
                    OptionSpec::builder()
                        .short("-n")
                        .long("--times")
                        .coerce(value::integer())
                        .default_value(1)
                        .build()?,
                ),
                Box::new(
                    OptionSpec::builder()
                        .long("--loud")
                        .action(Action::StoreTrue)
                        .default_value(false)
                        .build()?,
                ),
                Box::new(
                    OptionSpec::positional("who")
                        .default_value("world")
                        .help("Who to greet")
                        .build()?,
                ),
            ];
            Ok(options)
        }

        fn execute(&mut self, invocation: Invocation<'_>) -> anyhow::Result<()> {
            writeln!(invocation.out, "hello {}", invocation.args.get_str("who").unwrap_or("?"))?;
            Ok(())
        }
    }

    /// Flags only, so nothing claims stray tokens.
    struct Flags;

    impl CommandDef for Flags {
        fn options(&self) -> Result<Vec<Box<dyn CliOption>>> {
            let count = OptionSpec::builder()
                .long("--count")
                .coerce(value::integer())
                .build()?;
            let options: Vec<Box<dyn CliOption>> = vec![Box::new(count)];
            Ok(options)
        }
    }

    #[test]
    fn parse_fills_values_in_any_order() {
        let mut cmd = Command::new(Greet::default()).unwrap();
        cmd.parse(["--loud", "-n", "3", "alice"]).unwrap();
        assert_eq!(cmd.args().get_str("who"), Some("alice"));
        assert_eq!(cmd.args().get_i64("times"), Some(3));
        assert_eq!(cmd.args().get_bool("loud"), Some(true));
        assert_eq!(cmd.state(), CommandState::Parsed);
    }

    #[test]
    fn empty_argv_runs_one_pass_and_seeds_defaults() {
        let mut cmd = Command::new(Greet::default()).unwrap();
        cmd.parse(Vec::<String>::new()).unwrap();
        assert_eq!(cmd.passes(), 1);
        assert_eq!(cmd.args().get_str("who"), Some("world"));
        assert_eq!(cmd.args().get_i64("times"), Some(1));
        assert_eq!(cmd.args().get_bool("help"), None);
    }

    #[test]
    fn run_executes_with_final_mapping() {
        let mut cmd = Command::new(Greet::default()).unwrap();
        let mut out = Vec::new();
        let outcome = cmd.run(["bob"], &mut out).unwrap();
        assert_eq!(outcome, RunOutcome::Executed);
        assert_eq!(String::from_utf8(out).unwrap(), "hello bob\n");
        assert_eq!(cmd.state(), CommandState::Executed);
        // help/version have no default and were not given
        assert!(!cmd.args().contains("help"));
        assert_eq!(cmd.args().len(), 3);
    }

    #[test]
    fn version_short_circuits_execute() {
        let mut cmd = Command::new(Greet::default()).unwrap();
        let mut out = Vec::new();
        let outcome = cmd.run(["--version"], &mut out).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::ShortCircuited {
                option: "--version".to_string()
            }
        );
        assert_eq!(String::from_utf8(out).unwrap(), "greet 1.2.3\n");
        assert_eq!(cmd.state(), CommandState::ShortCircuited);
    }

    #[test]
    fn help_and_version_conflict_before_output() {
        let mut cmd = Command::new(Greet::default()).unwrap();
        let mut out = Vec::new();
        let err = cmd.run(["--help", "--version"], &mut out).unwrap_err();
        match err {
            Error::ConflictingShortCircuit { first, second } => {
                assert_eq!(first, "--help");
                assert_eq!(second, "--version");
            }
            other => panic!("expected ConflictingShortCircuit, got: {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_arguments_are_rejected_verbatim() {
        let mut cmd = Command::new(Flags).unwrap();
        let err = cmd.parse(["--nope"]).unwrap_err();
        match err {
            Error::UnknownArguments(rest) => assert_eq!(rest, ["--nope"]),
            other => panic!("expected UnknownArguments, got: {other:?}"),
        }
    }

    #[test]
    fn malformed_flag_is_reported_and_parsing_continues() {
        let mut cmd = Command::new(Flags).unwrap();
        let err = cmd.parse(["--count=lots"]).unwrap_err();
        // the bad flag never claims its token, so it is left over
        match err {
            Error::UnknownArguments(rest) => assert_eq!(rest, ["--count=lots"]),
            other => panic!("expected UnknownArguments, got: {other:?}"),
        }
        assert_eq!(cmd.diagnostics().len(), 1);
        assert!(cmd.diagnostics()[0].is_malformed());
        assert!(!cmd.args().contains("count"));
    }

    #[test]
    fn path_walks_parents() {
        let parent = Command::new(Greet::default()).unwrap();
        let child = Command::with_parent(Box::new(Greet::default()), &parent).unwrap();
        assert_eq!(child.path(), "greet greet");
        assert_eq!(child.parent().map(|p| p.version()), Some("1.2.3"));
    }
}

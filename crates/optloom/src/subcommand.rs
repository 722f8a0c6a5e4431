//! Sub-command delegation: an option that hands the rest of argv to a
//! nested command.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::args::ArgMap;
use crate::command::{Command, CommandDef};
use crate::consumer::Consumer;
use crate::error::{Error, Result};
use crate::option::{CliOption, OptionSpec};

/// Builds a fresh command definition for each delegation.
pub type CommandFactory = Arc<dyn Fn() -> Box<dyn CommandDef> + Send + Sync>;

/// Matches a bare token equal to its name, seizes every token after it and,
/// during the run phase, runs a nested [`Command`] on that tail.
#[derive(Clone)]
pub struct SubCommand {
    name: String,
    factory: CommandFactory,
    spec: OptionSpec,
    tail: Option<Vec<String>>,
}

impl SubCommand {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Result<Self>
    where
        F: Fn() -> Box<dyn CommandDef> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Declaration(
                "sub-command name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            factory: Arc::new(factory),
            spec: OptionSpec::detached(String::new()),
            tail: None,
        })
    }

    /// Delegate to a default-constructed `D`.
    pub fn of<D>(name: impl Into<String>) -> Result<Self>
    where
        D: CommandDef + Default + 'static,
    {
        Self::new(name, || Box::new(D::default()))
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.spec.set_help(help);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tokens seized by the last parse, if the sub-command was selected.
    pub fn captured(&self) -> Option<&[String]> {
        self.tail.as_deref()
    }
}

impl CliOption for SubCommand {
    fn spec(&self) -> &OptionSpec {
        &self.spec
    }

    fn parse(&mut self, consumer: &mut Consumer<'_>, _args: &mut ArgMap) -> Result<bool> {
        if consumer.peek() != Some(self.name.as_str()) {
            return Ok(false);
        }
        let tail = consumer.seize_rest();
        tracing::debug!(command = %self.name, ?tail, "delegating to sub-command");
        self.tail = Some(tail);
        Ok(true)
    }

    fn run(&self, command: &Command<'_>, out: &mut dyn Write) -> Result<()> {
        let Some(tail) = &self.tail else {
            return Ok(());
        };
        let mut child = Command::with_parent((self.factory)(), command)?;
        child.run(tail.iter().cloned(), out)?;
        Ok(())
    }

    fn command_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn reset(&mut self) {
        self.tail = None;
    }
}

impl fmt::Debug for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubCommand")
            .field("name", &self.name)
            .field("tail", &self.tail)
            .finish_non_exhaustive()
    }
}

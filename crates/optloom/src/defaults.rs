//! Built-in options registered under [`DEFAULT_NAMESPACE`](crate::DEFAULT_NAMESPACE).

use std::io::Write;

use crate::command::{Command, CommandDef};
use crate::error::Result;
use crate::help;
use crate::option::{Action, CliOption, OptionSpec};

/// Prints the option table and short-circuits the command.
#[derive(Debug, Clone)]
pub struct HelpOption {
    spec: OptionSpec,
}

impl HelpOption {
    pub fn new() -> Result<Self> {
        let spec = OptionSpec::builder()
            .short("-h")
            .long("--help")
            .dest("help")
            .action(Action::StoreTrue)
            .short_circuit(true)
            .help("Print this help message.")
            .build()?;
        Ok(Self { spec })
    }
}

impl CliOption for HelpOption {
    fn spec(&self) -> &OptionSpec {
        &self.spec
    }

    // Tried before declared options so a positional cannot swallow it.
    fn index_for(&self, _command: &dyn CommandDef) -> u64 {
        0
    }

    fn run(&self, command: &Command<'_>, out: &mut dyn Write) -> Result<()> {
        out.write_all(help::render(command).as_bytes())?;
        Ok(())
    }
}

/// Prints the command's version and short-circuits the command.
#[derive(Debug, Clone)]
pub struct VersionOption {
    spec: OptionSpec,
}

impl VersionOption {
    pub fn new() -> Result<Self> {
        let spec = OptionSpec::builder()
            .long("--version")
            .dest("version")
            .action(Action::StoreTrue)
            .short_circuit(true)
            .help("Report the current version of a command or subcommand.")
            .build()?;
        Ok(Self { spec })
    }
}

impl CliOption for VersionOption {
    fn spec(&self) -> &OptionSpec {
        &self.spec
    }

    fn index_for(&self, _command: &dyn CommandDef) -> u64 {
        0
    }

    fn run(&self, command: &Command<'_>, out: &mut dyn Write) -> Result<()> {
        out.write_all(help::version(command).as_bytes())?;
        Ok(())
    }
}

//! Declarative option parsing and dispatch.
//!
//! A command type implements [`CommandDef`]: it declares its options, names
//! the registry namespaces it pulls extra options from, and provides its
//! task. [`Command`] parses argv against that option list with a fixed-point
//! loop (each pass gives the front token to the first option that claims it)
//! and then runs option side effects before the task.
//!
//! ```rust
//! use std::io::Write;
//!
//! use optloom::{CliOption, Command, CommandDef, Invocation, OptionSpec};
//!
//! struct Greet;
//!
//! impl CommandDef for Greet {
//!     fn name(&self) -> &str {
//!         "greet"
//!     }
//!
//!     fn options(&self) -> optloom::Result<Vec<Box<dyn CliOption>>> {
//!         let who = OptionSpec::positional("who").default_value("world").build()?;
//!         let options: Vec<Box<dyn CliOption>> = vec![Box::new(who)];
//!         Ok(options)
//!     }
//!
//!     fn execute(&mut self, inv: Invocation<'_>) -> anyhow::Result<()> {
//!         writeln!(inv.out, "hello {}", inv.args.get_str("who").unwrap_or("?"))?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> optloom::Result<()> {
//!     let mut cmd = Command::new(Greet)?;
//!     let mut out = Vec::new();
//!     cmd.run(["bob"], &mut out)?;
//!     assert_eq!(out, b"hello bob\n");
//!     Ok(())
//! }
//! ```

pub mod args;
pub mod command;
pub mod consumer;
pub mod defaults;
pub mod error;
pub mod help;
pub mod option;
pub mod registry;
pub mod subcommand;
pub mod value;

pub use args::ArgMap;
pub use command::{Command, CommandDef, CommandState, Invocation, LeftoverPolicy, RunOutcome};
pub use consumer::{ArgCursor, Consumer, Mode, Remaining};
pub use defaults::{HelpOption, VersionOption};
pub use error::{Error, Result};
pub use option::{Action, Arity, CliOption, DefaultValue, OptionSpec, OptionSpecBuilder};
pub use registry::{
    DEFAULT_NAMESPACE, LayeredRegistry, OptionFactory, OptionRegistry, StaticRegistry, factory,
};
pub use subcommand::{CommandFactory, SubCommand};
pub use value::{Coerce, Value};

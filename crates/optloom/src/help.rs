//! Help and version text for a [`Command`].

use crate::command::Command;
use crate::option::{Action, Arity, OptionSpec};
use crate::value::Value;

fn value_hint(spec: &OptionSpec) -> Option<String> {
    let takes_value = match spec.action() {
        Action::Store => spec.constant().is_none(),
        Action::Append => true,
        Action::StoreTrue | Action::StoreFalse => false,
    };
    takes_value.then(|| format!("<{}>", spec.dest().unwrap_or("value").to_uppercase()))
}

fn format_flag_left(spec: &OptionSpec) -> String {
    let hint = value_hint(spec);
    let mut parts = Vec::new();
    if let Some(short) = spec.short() {
        match &hint {
            Some(hint) => parts.push(format!("{short} {hint}")),
            None => parts.push(short.to_string()),
        }
    }
    if let Some(long) = spec.long() {
        match &hint {
            Some(hint) => parts.push(format!("{long}={hint}")),
            None => parts.push(long.to_string()),
        }
    }
    parts.join(", ")
}

fn format_positional_left(spec: &OptionSpec) -> String {
    let name = format!("<{}>", spec.dest().unwrap_or("arg"));
    match spec.arity() {
        Arity::Any => format!("[{name}...]"),
        Arity::Optional => format!("[{name}]"),
        Arity::Exactly(1) => name,
        Arity::Exactly(_) => format!("{name}..."),
    }
}

fn format_help(spec: &OptionSpec) -> String {
    let mut out = spec.help().trim().to_string();
    let default = match spec.default_value().resolve() {
        Some(Value::Null) | None => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    };
    if let Some(default) = default {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("(default: {default})"));
    }
    out
}

fn push_section(out: &mut String, title: &str, rows: Vec<(String, String)>) {
    if rows.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}:\n"));
    let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("  {left}\n"));
        } else {
            out.push_str(&format!("  {left:width$}  {help}\n"));
        }
    }
}

/// Render the option table of `command`.
pub fn render(command: &Command<'_>) -> String {
    let path = command.path();
    let mut positionals = Vec::new();
    let mut flags = Vec::new();
    let mut commands = Vec::new();
    for opt in command.options() {
        let spec = opt.spec();
        if let Some(name) = opt.command_name() {
            commands.push((name.to_string(), spec.help().trim().to_string()));
        } else if spec.is_positional() {
            positionals.push((format_positional_left(spec), format_help(spec)));
        } else {
            flags.push((format_flag_left(spec), format_help(spec)));
        }
    }

    let mut out = String::new();
    let mut usage = format!("Usage: {}", if path.is_empty() { "<command>" } else { path.as_str() });
    if !flags.is_empty() {
        usage.push_str(" [OPTIONS]");
    }
    for (left, _) in &positionals {
        usage.push(' ');
        usage.push_str(left);
    }
    if !commands.is_empty() {
        usage.push_str(" <COMMAND> [ARGS...]");
    }
    out.push_str(&usage);
    out.push('\n');

    if !command.summary().trim().is_empty() {
        out.push('\n');
        out.push_str(command.summary().trim_end());
        out.push('\n');
    }

    push_section(&mut out, "Arguments", positionals);
    push_section(&mut out, "Options", flags);
    push_section(&mut out, "Commands", commands);
    out
}

/// Render the version line of `command`.
pub fn version(command: &Command<'_>) -> String {
    let path = command.path();
    if path.is_empty() {
        format!("Version {}\n", command.version())
    } else {
        format!("{path} {}\n", command.version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandDef;
    use crate::error::Result;
    use crate::option::CliOption;
    use crate::subcommand::SubCommand;
    use crate::value;

    struct Tool;

    impl CommandDef for Tool {
        fn name(&self) -> &str {
            "tool"
        }

        fn version(&self) -> &str {
            "0.3.0"
        }

        fn summary(&self) -> &str {
            "Does tool things."
        }

        fn options(&self) -> Result<Vec<Box<dyn CliOption>>> {
            let jobs = OptionSpec::builder()
                .short("-j")
                .long("--jobs")
                .coerce(value::integer())
                .default_value(4)
                .help("Parallel jobs.")
                .build()?;
            let build = SubCommand::new("build", || Box::new(Anon))?.help("Build things.");
            let files = OptionSpec::positional("files")
                .arity(Arity::Any)
                .help("Input files.")
                .build()?;
            let options: Vec<Box<dyn CliOption>> =
                vec![Box::new(jobs), Box::new(build), Box::new(files)];
            Ok(options)
        }
    }

    struct Anon;

    impl CommandDef for Anon {}

    #[test]
    fn render_lists_every_section() {
        let cmd = Command::new(Tool).unwrap();
        let text = render(&cmd);
        assert!(text.starts_with("Usage: tool [OPTIONS] [<files>...] <COMMAND> [ARGS...]\n"));
        assert!(text.contains("\nDoes tool things.\n"));
        assert!(text.contains("\nArguments:\n  [<files>...]  Input files.\n"));
        assert!(text.contains("  -j <JOBS>, --jobs=<JOBS>  Parallel jobs. (default: 4)\n"));
        assert!(text.contains("  -h, --help                Print this help message.\n"));
        assert!(text.contains("\nCommands:\n  build  Build things.\n"));
    }

    #[test]
    fn version_uses_command_path() {
        let cmd = Command::new(Tool).unwrap();
        assert_eq!(version(&cmd), "tool 0.3.0\n");
    }

    #[test]
    fn version_without_name_falls_back() {
        let cmd = Command::new(Anon).unwrap();
        assert_eq!(version(&cmd), "Version unknown\n");
    }
}

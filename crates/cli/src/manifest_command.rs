use std::sync::Arc;

use optloom::{
    CliOption, CommandDef, DEFAULT_NAMESPACE, Invocation, LeftoverPolicy, SubCommand,
};
use optloom_metadata::CommandMeta;
use optloom_plugins::option_from_meta;
use serde::Serialize;
use serde_json::Value;

/// A command whose options and sub-commands come from a [`CommandMeta`].
///
/// Its task prints the parsed result as one JSON line.
#[derive(Debug, Clone)]
pub struct ManifestCommand {
    meta: Arc<CommandMeta>,
}

#[derive(Serialize)]
struct Report<'a> {
    command: String,
    args: Value,
    remaining: &'a [String],
}

impl ManifestCommand {
    pub fn new(meta: impl Into<Arc<CommandMeta>>) -> Self {
        Self { meta: meta.into() }
    }
}

impl CommandDef for ManifestCommand {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn version(&self) -> &str {
        if self.meta.version.trim().is_empty() {
            "unknown"
        } else {
            &self.meta.version
        }
    }

    fn summary(&self) -> &str {
        &self.meta.summary
    }

    fn options(&self) -> optloom::Result<Vec<Box<dyn CliOption>>> {
        let mut options: Vec<Box<dyn CliOption>> = Vec::new();
        for meta in &self.meta.options {
            options.push(Box::new(option_from_meta(meta)?));
        }
        for sub in &self.meta.subcommands {
            let sub = Arc::new(sub.clone());
            let summary = sub.summary.clone();
            let name = sub.name.clone();
            let delegate = SubCommand::new(name, move || {
                Box::new(ManifestCommand::new(Arc::clone(&sub)))
            })?
            .help(summary);
            options.push(Box::new(delegate));
        }
        Ok(options)
    }

    fn namespaces(&self) -> Vec<String> {
        self.meta
            .namespaces
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_NAMESPACE.to_string()])
    }

    fn leftover_policy(&self) -> LeftoverPolicy {
        if self.meta.lenient {
            LeftoverPolicy::Keep
        } else {
            LeftoverPolicy::Reject
        }
    }

    fn execute(&mut self, invocation: Invocation<'_>) -> anyhow::Result<()> {
        let command = match invocation.parent.map(|p| p.path()) {
            Some(parent) if !parent.is_empty() => format!("{parent} {}", self.meta.name),
            _ => self.meta.name.clone(),
        };
        let report = Report {
            command,
            args: invocation.args.to_json(),
            remaining: invocation.remaining,
        };
        serde_json::to_writer(&mut *invocation.out, &report)?;
        writeln!(invocation.out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optloom::{Command, Error, RunOutcome};
    use serde_json::json;

    fn tool() -> CommandMeta {
        serde_json::from_value(json!({
            "name": "tool",
            "version": "1.0.0",
            "options": [
                {"short": "-v", "long": "--verbose", "action": "store-true", "default": false},
                {"long": "--tag", "action": "append"},
            ],
            "subcommands": [
                {"name": "build", "summary": "Build.", "lenient": true,
                 "options": [{"long": "--jobs", "type": "int", "default": 1}]},
            ],
        }))
        .unwrap()
    }

    fn run(tokens: &[&str]) -> (optloom::Result<RunOutcome>, Vec<Value>) {
        let mut cmd = Command::new(ManifestCommand::new(tool())).unwrap();
        let mut out = Vec::new();
        let outcome = cmd.run(tokens.iter().copied(), &mut out);
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (outcome, lines)
    }

    #[test]
    fn reports_parsed_arguments() {
        let (outcome, lines) = run(&["-v", "--tag=a", "--tag=b"]);
        assert_eq!(outcome.unwrap(), RunOutcome::Executed);
        assert_eq!(
            lines,
            [json!({
                "command": "tool",
                "args": {"verbose": true, "tag": ["a", "b"]},
                "remaining": [],
            })]
        );
    }

    #[test]
    fn sub_command_reports_before_parent() {
        let (outcome, lines) = run(&["build", "--jobs=4", "x"]);
        outcome.unwrap();
        assert_eq!(
            lines,
            [
                json!({"command": "tool build", "args": {"jobs": 4}, "remaining": ["x"]}),
                json!({"command": "tool", "args": {"verbose": false, "tag": []}, "remaining": []}),
            ]
        );
    }

    #[test]
    fn strict_command_rejects_leftovers() {
        let (outcome, lines) = run(&["--nope"]);
        assert!(matches!(outcome, Err(Error::UnknownArguments(_))));
        assert!(lines.is_empty());
    }

    #[test]
    fn empty_namespaces_drop_builtin_options() {
        let mut meta = tool();
        meta.namespaces = Some(Vec::new());
        let cmd = Command::new(ManifestCommand::new(meta)).unwrap();
        assert!(cmd.options().iter().all(|o| o.spec().long() != Some("--help")));
    }
}

use anyhow::{Context, Result, bail};
use optloom_metadata::{
    CommandManifest, CommandMeta, OPTION_MANIFEST_FORMAT_VERSION, OptionMeta,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST_NAME: &str = "optloom.json";

#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub base_dir: PathBuf,
    pub manifest: CommandManifest,
}

pub fn load_manifest(manifest_path: &Path) -> Result<LoadedManifest> {
    let path = std::path::absolute(manifest_path)
        .with_context(|| format!("failed to resolve {}", manifest_path.display()))?;
    if !path.exists() {
        bail!("manifest not found: {}", path.display());
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let manifest: CommandManifest = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse manifest JSON: {}", path.display()))?;
    if manifest.format_version != OPTION_MANIFEST_FORMAT_VERSION {
        bail!(
            "unsupported manifest format-version {} in {} (expected {})",
            manifest.format_version,
            path.display(),
            OPTION_MANIFEST_FORMAT_VERSION
        );
    }

    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    tracing::debug!(path = %path.display(), command = %manifest.command.name, "loaded manifest");
    Ok(LoadedManifest { base_dir, manifest })
}

fn starter_command(name: String) -> CommandMeta {
    CommandMeta {
        name,
        version: "0.1.0".to_string(),
        summary: "Describe your command here.".to_string(),
        options: vec![
            OptionMeta {
                short: Some("-v".to_string()),
                long: Some("--verbose".to_string()),
                action: Some("store-true".to_string()),
                default: Some(Value::Bool(false)),
                help: "Print more output.".to_string(),
                ..OptionMeta::default()
            },
            OptionMeta {
                short: Some("-o".to_string()),
                long: Some("--output".to_string()),
                help: "Where to write results.".to_string(),
                ..OptionMeta::default()
            },
        ],
        subcommands: vec![CommandMeta {
            name: "build".to_string(),
            summary: "Build the given targets.".to_string(),
            lenient: true,
            options: vec![OptionMeta {
                short: Some("-j".to_string()),
                long: Some("--jobs".to_string()),
                value_type: Some("int".to_string()),
                default: Some(Value::from(1)),
                help: "Parallel jobs.".to_string(),
                ..OptionMeta::default()
            }],
            ..CommandMeta::default()
        }],
        ..CommandMeta::default()
    }
}

/// Write a starter manifest into `project_dir`. An existing manifest is kept
/// unless `overwrite` is set.
pub fn write_default_manifest(
    project_dir: &Path,
    name: Option<&str>,
    overwrite: bool,
) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_MANIFEST_NAME);
    if dest.exists() && !overwrite {
        return Ok(dest);
    }

    let command_name = match name {
        Some(name) => name.to_string(),
        None => dir_command_name(project_dir)?,
    };
    let mut bytes = CommandManifest::new(starter_command(command_name)).to_json_bytes();
    if bytes.is_empty() {
        bail!("failed to serialize starter manifest");
    }
    bytes.push(b'\n');

    // written beside the destination, then renamed over it
    let staged = project_dir.join(format!(".{DEFAULT_MANIFEST_NAME}.partial"));
    fs::write(&staged, &bytes)
        .with_context(|| format!("failed to write {}", staged.display()))?;
    fs::rename(&staged, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    tracing::debug!(path = %dest.display(), overwrite, "wrote starter manifest");
    Ok(dest)
}

/// Command name for a starter manifest: the project directory's own name,
/// after resolving `.` and `..`.
fn dir_command_name(project_dir: &Path) -> Result<String> {
    let resolved = fs::canonicalize(project_dir)
        .with_context(|| format!("failed to resolve {}", project_dir.display()))?;
    Ok(resolved
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("my-cli")
        .to_string())
}

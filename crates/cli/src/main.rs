mod manifest;
mod manifest_command;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use optloom::{Command, LayeredRegistry, OptionRegistry, StaticRegistry, help};
use optloom_plugins::DirectoryRegistry;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing_subscriber::{EnvFilter, fmt};

use crate::manifest::{DEFAULT_MANIFEST_NAME, LoadedManifest, load_manifest};
use crate::manifest_command::ManifestCommand;

#[derive(Parser)]
#[command(name = "optloom")]
#[command(version, about = "Run declaratively described commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter optloom.json manifest
    Init(InitArgs),

    /// Parse tokens against the manifest command and print the result
    Run(RunArgs),

    /// Print the help table of the manifest command
    Describe(DescribeArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Command name (default: directory name)
    #[arg(short, long)]
    name: Option<String>,

    /// Overwrite an existing manifest
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct RunArgs {
    /// Path to optloom.json manifest
    #[arg(short, long, default_value = DEFAULT_MANIFEST_NAME, value_name = "FILE")]
    manifest: PathBuf,

    /// Directory of plugin option manifests (default: `plugins/` next to the manifest)
    #[arg(long, value_name = "DIR")]
    plugins: Option<PathBuf>,

    /// Tokens handed to the command
    #[arg(value_name = "TOKENS", trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

#[derive(Parser)]
struct DescribeArgs {
    /// Path to optloom.json manifest
    #[arg(short, long, default_value = DEFAULT_MANIFEST_NAME, value_name = "FILE")]
    manifest: PathBuf,

    /// Directory of plugin option manifests (default: `plugins/` next to the manifest)
    #[arg(long, value_name = "DIR")]
    plugins: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init(args),
        Commands::Run(args) => run(args),
        Commands::Describe(args) => describe(args),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    if dir.join(DEFAULT_MANIFEST_NAME).exists() && !args.force {
        bail!(
            "{DEFAULT_MANIFEST_NAME} already exists in {} (use --force to overwrite)",
            dir.display()
        );
    }
    let path = manifest::write_default_manifest(&dir, args.name.as_deref(), args.force)?;

    eprintln!("Created: {}", path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {DEFAULT_MANIFEST_NAME} to declare your options");
    eprintln!("  2. Run: optloom describe");
    eprintln!("  3. Run: optloom run -- --help");

    Ok(())
}

fn build_command(
    manifest_path: &Path,
    plugins: Option<PathBuf>,
) -> Result<Command<'static>> {
    let LoadedManifest { base_dir, manifest } = load_manifest(manifest_path)?;
    let plugins = plugins.unwrap_or_else(|| base_dir.join("plugins"));
    tracing::debug!(plugins = %plugins.display(), "using plugin directory");

    let registry: Arc<dyn OptionRegistry> = Arc::new(
        LayeredRegistry::new()
            .layer(Arc::new(StaticRegistry::with_defaults()))
            .layer(Arc::new(DirectoryRegistry::new(plugins))),
    );
    let command = Command::with_registry(ManifestCommand::new(manifest.command), registry)
        .context("failed to build command from manifest")?;
    Ok(command)
}

fn run(args: RunArgs) -> Result<()> {
    let mut command = build_command(&args.manifest, args.plugins)?;
    tracing::debug!(tokens = ?args.tokens, "running manifest command");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    command.run(args.tokens, &mut out)?;
    out.flush()?;
    Ok(())
}

fn describe(args: DescribeArgs) -> Result<()> {
    let command = build_command(&args.manifest, args.plugins)?;
    print!("{}", help::render(&command));
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

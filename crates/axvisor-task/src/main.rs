use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use axvisor_task::Result;
use axvisor_task::config::CliOverrides;
use axvisor_task::executor::ExecCtx;
use axvisor_task::workspace::WorkspacePaths;

#[derive(Debug, Parser)]
#[command(author, version, about = "Axvisor build helper")]
struct Args {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Print the commands that would run without executing them
    #[arg(long, global = true)]
    dry_run: bool,
    /// Program to invoke instead of `make`
    #[arg(long, global = true, default_value = "make")]
    make: String,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clone the ArceOS subsystem into .arceos if it is missing
    Setup,
    /// Build the hypervisor
    Build(BuildArgs),
    /// Build, then run the hypervisor
    Run(BuildArgs),
    /// Run clippy over the subsystem build
    Clippy {
        /// Architecture (defaults to the resolved platform architecture)
        #[arg(long)]
        arch: Option<String>,
    },
    /// Remove build artifacts
    Clean,
    /// Create a disk image
    #[command(name = "disk_img")]
    DiskImg {
        /// Image path and file name
        #[arg(long)]
        image: Option<String>,
    },
    /// Print the resolved configuration and the build command
    Resolve(BuildArgs),
}

#[derive(Debug, clap::Args)]
struct BuildArgs {
    /// Platform (default: aarch64-generic)
    #[arg(long)]
    plat: Option<String>,
    /// Architecture override
    #[arg(long)]
    arch: Option<String>,
    /// Platform package override
    #[arg(long)]
    package: Option<String>,
    /// Hypervisor features (comma-separated)
    #[arg(long)]
    features: Option<String>,
    /// Subsystem features (comma-separated)
    #[arg(long, alias = "arceos-features")]
    subsystem_features: Option<String>,
    /// Subsystem arguments, `key=value` or bare flags (comma-separated)
    #[arg(long, alias = "arceos-args")]
    subsystem_args: Option<String>,
    /// VM configuration file paths (comma-separated)
    #[arg(long)]
    vmconfigs: Option<String>,
}

impl From<BuildArgs> for CliOverrides {
    fn from(a: BuildArgs) -> Self {
        Self {
            plat: a.plat,
            arch: a.arch,
            package: a.package,
            features: a.features.map(Into::into),
            subsystem_features: a.subsystem_features.map(Into::into),
            subsystem_args: a.subsystem_args.map(Into::into),
            vmconfigs: a.vmconfigs.map(Into::into),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    axvisor_task::logging::init(args.verbose);
    match dispatch(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(e.exit_status())
        }
    }
}

fn dispatch(args: Args) -> Result<()> {
    let ws = axvisor_task::workspace::load_paths(args.root.as_deref())?;
    let ctx = ExecCtx::new(args.dry_run).with_make(args.make);
    match args.cmd {
        Command::Setup => axvisor_task::commands::setup(&ws, &ctx),
        Command::Build(b) => axvisor_task::commands::build(&ws, &ctx, &b.into()),
        Command::Run(b) => axvisor_task::commands::run(&ws, &ctx, &b.into()),
        Command::Clippy { arch } => axvisor_task::commands::clippy(&ws, &ctx, arch),
        Command::Clean => axvisor_task::commands::clean(&ws, &ctx),
        Command::DiskImg { image } => {
            axvisor_task::commands::disk_img(&ws, &ctx, image.as_deref())
        }
        Command::Resolve(b) => cmd_resolve(&ws, b.into()),
    }
}

fn cmd_resolve(ws: &WorkspacePaths, cli: CliOverrides) -> Result<()> {
    print!("{}", axvisor_task::commands::describe(ws, &cli)?);
    Ok(())
}

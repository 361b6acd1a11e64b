use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config;
use crate::identifier::RandomIdentifiers;
use crate::pbxproj::{Anchors, Patcher, Region, ResourceEntry, DEFAULT_RESOURCE};
use crate::project::XcodeProject;

#[derive(Parser)]
#[command(version, about = "Register resource files in Xcode projects")]
pub(crate) struct Cli {
    /// Print debug logs. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a resource file to the app target's Copy Bundle Resources phase
    AddResource(AddResourceArgs),
}

#[derive(Parser)]
struct AddResourceArgs {
    /// A project.pbxproj file, an .xcodeproj bundle, or a directory with one .xcodeproj
    #[arg(long, default_value = "ios/App/App.xcodeproj")]
    project: PathBuf,
    #[arg(long, default_value = DEFAULT_RESOURCE)]
    resource: String,
    /// `path` of the file reference, relative to its group. Defaults to the resource name.
    #[arg(long)]
    path: Option<String>,
    /// `lastKnownFileType` of the file reference. Inferred from the extension by default.
    #[arg(long)]
    file_type: Option<String>,
    /// TOML file with an `[anchors]` table
    #[arg(long)]
    config: Option<PathBuf>,
    /// Existing entry in the resources build phase to insert after
    #[arg(long)]
    build_phase_anchor: Option<String>,
    /// Existing entry in the group children to insert after
    #[arg(long)]
    group_anchor: Option<String>,
    /// Add the entries even if the resource is already registered
    #[arg(long)]
    allow_duplicate: bool,
    /// Print the patched manifest instead of writing it
    #[arg(long)]
    dry_run: bool,
    /// Run `plutil -lint` on the written manifest
    #[arg(long)]
    lint: bool,
}

impl Cli {
    pub fn execute() -> Result<()> {
        let args = Cli::parse();
        init_logging(args.verbose);
        match args.command {
            Commands::AddResource(args) => add_resource(args),
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn add_resource(args: AddResourceArgs) -> Result<()> {
    let mut anchors = match &args.config {
        Some(path) => config::load_anchors(path)?,
        None => Anchors::default(),
    };
    if let Some(anchor) = args.build_phase_anchor {
        anchors.set(Region::ResourcesBuildPhase, anchor);
    }
    if let Some(anchor) = args.group_anchor {
        anchors.set(Region::GroupChildren, anchor);
    }
    debug!("Using anchors {:?}", anchors);

    let mut resource = ResourceEntry::new(&args.resource);
    if let Some(path) = args.path {
        resource = resource.with_path(path);
    }
    if let Some(file_type) = args.file_type {
        resource = resource.with_file_type(file_type);
    }

    let mut project = XcodeProject::open(&args.project)?;
    let patcher = Patcher::new(anchors).allow_duplicate(args.allow_duplicate);
    if args.allow_duplicate && project.count_references(&resource.name) > 0 {
        warn!("{} is already referenced, adding it again", resource.name);
    }

    let registration = project
        .register(&patcher, &resource, &mut RandomIdentifiers::new())
        .with_context(|| format!("Failed to register {}", resource.name))?;

    if args.dry_run {
        eprintln!("Generated IDs:");
        eprintln!("  FileRef: {}", registration.file_ref_id);
        eprintln!("  BuildFile: {}", registration.build_file_id);
        print!("{}", project.manifest);
        return Ok(());
    }

    println!("Generated IDs:");
    println!("  FileRef: {}", registration.file_ref_id);
    println!("  BuildFile: {}", registration.build_file_id);

    project.save()?;
    println!(
        "Added {} to {}",
        resource.name,
        project.manifest_path.display()
    );

    if args.lint {
        project
            .lint()
            .with_context(|| format!("{} failed plutil lint", project.manifest_path.display()))?;
        println!("plutil lint passed");
    }

    println!(
        "Total references added: {}",
        project.count_references(&resource.name)
    );

    Ok(())
}

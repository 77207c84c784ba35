//! Labelhub: the dataset annotation engine behind annotation-review instances.
//!
//! Each instance is bound to a dataset directory holding images and
//! YOLO-style label files. Labelhub detects whether those labels use the
//! axis-aligned rectangle encoding or the oriented four-corner encoding,
//! converts rectangle datasets in place, and maps an edited label back to
//! the owning instance so the edit can be synced downstream.
//!
//! # Modules
//!
//! - [`label`]: Line codec, box geometry and the images/labels path policy
//! - [`detect`]: Sampling format detector and its verdict
//! - [`convert`]: In-place rectangle to oriented conversion
//! - [`instance`]: Instance records, registries and the path locator
//! - [`sync`]: Label-saved trigger and sync actions
//! - [`engine`]: Workflows combining the above under per-dataset locks
//! - [`error`]: Error types for labelhub operations

pub mod cancel;
pub mod config;
pub mod convert;
pub mod detect;
pub mod engine;
pub mod error;
mod fsutil;
pub mod instance;
pub mod label;
pub mod lock;
pub mod sync;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

pub use error::LabelhubError;

use cancel::CancelToken;
use config::EngineConfig;
use convert::ConvertOptions;
use detect::{DetectOptions, SampleStrategy};
use engine::Engine;
use instance::{resolve_by_ancestry, InstanceRegistry, JsonFileRegistry};

/// The labelhub CLI application.
#[derive(Parser)]
#[command(name = "labelhub")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Detect the label encoding of a dataset directory.
    Detect(DetectArgs),
    /// Convert a dataset directory from rectangle to oriented labels in place.
    Convert(ConvertArgs),
    /// Find the registered instance owning a path (and an image's label file).
    Resolve(ResolveArgs),
    /// Handle a saved label file: resolve its instance and trigger sync.
    LabelSaved(LabelSavedArgs),
    /// Detect the label encoding of a registered instance's dataset.
    CheckFormat(InstanceArgs),
    /// Convert a registered instance's dataset if needed and mark it oriented.
    EnsureOriented(InstanceArgs),
}

/// Arguments for the detect subcommand.
#[derive(clap::Args)]
struct DetectArgs {
    /// Dataset root, its labels directory, or its images directory.
    dataset: PathBuf,

    /// Maximum number of label files to read.
    #[arg(long, env = "LABELHUB_SAMPLE_CAP")]
    sample_cap: Option<usize>,

    /// Sample label files at random instead of the first ones by path.
    #[arg(long)]
    random: bool,

    /// Seed for random sampling (implies --random).
    #[arg(long)]
    seed: Option<u64>,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Dataset root, its labels directory, or its images directory.
    dataset: PathBuf,

    /// Convert even if detection does not report a rectangle dataset.
    #[arg(long)]
    force: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the resolve subcommand.
#[derive(clap::Args)]
struct ResolveArgs {
    /// Any path under a dataset root.
    path: PathBuf,

    #[command(flatten)]
    registry: RegistryArgs,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the label-saved subcommand.
#[derive(clap::Args)]
struct LabelSavedArgs {
    /// The label file that was saved.
    label: PathBuf,

    /// Directory a relative label path was given against.
    #[arg(long)]
    base: Option<PathBuf>,

    #[command(flatten)]
    registry: RegistryArgs,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for subcommands addressing one registered instance.
#[derive(clap::Args)]
struct InstanceArgs {
    /// Instance name.
    name: String,

    #[command(flatten)]
    registry: RegistryArgs,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct RegistryArgs {
    /// Instance registry file (JSON array of instance records).
    #[arg(id = "registry", long = "registry", env = "LABELHUB_INSTANCES")]
    path: Option<PathBuf>,
}

impl RegistryArgs {
    fn open(&self, config: &EngineConfig) -> JsonFileRegistry {
        JsonFileRegistry::new(
            self.path
                .clone()
                .unwrap_or_else(|| config.registry_path.clone()),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(raw: &str) -> Result<Self, LabelhubError> {
        match raw.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(LabelhubError::UnsupportedOutput(format!(
                "'{other}' (supported: text, json)"
            ))),
        }
    }
}

/// Run the labelhub CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelhubError> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("labelhub {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Dataset annotation engine for annotation-review instances.");
        println!();
        println!("Run 'labelhub --help' for usage information.");
        return Ok(());
    };

    let config = EngineConfig::from_env()?;

    match command {
        Commands::Detect(args) => run_detect(args, &config),
        Commands::Convert(args) => run_convert(args, &config),
        Commands::Resolve(args) => run_resolve(args, &config),
        Commands::LabelSaved(args) => run_label_saved(args, config),
        Commands::CheckFormat(args) => run_check_format(args, config),
        Commands::EnsureOriented(args) => run_ensure_oriented(args, config),
    }
}

fn emit<T>(output: OutputFormat, value: &T) -> Result<(), LabelhubError>
where
    T: Serialize + std::fmt::Display,
{
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => print!("{value}"),
    }
    Ok(())
}

/// Execute the detect subcommand.
fn run_detect(args: DetectArgs, config: &EngineConfig) -> Result<(), LabelhubError> {
    let output = OutputFormat::parse(&args.output)?;

    let sample_cap = args.sample_cap.unwrap_or(config.sample_cap);
    if sample_cap == 0 {
        return Err(LabelhubError::InvalidConfig {
            key: "--sample-cap".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    let strategy = if args.random || args.seed.is_some() {
        SampleStrategy::Random { seed: args.seed }
    } else {
        SampleStrategy::Sorted
    };

    let opts = DetectOptions {
        sample_cap,
        strategy,
        ..Default::default()
    };
    let verdict = detect::detect_format(&args.dataset, &opts)?;
    emit(output, &verdict)
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs, config: &EngineConfig) -> Result<(), LabelhubError> {
    let output = OutputFormat::parse(&args.output)?;

    if !args.force {
        let opts = DetectOptions {
            sample_cap: config.sample_cap,
            ..Default::default()
        };
        let verdict = detect::detect_format(&args.dataset, &opts)?;
        if verdict.format == detect::DatasetFormat::Obb {
            // Conversion leaves oriented lines alone; report and stop early.
            emit(output, &verdict)?;
            return Ok(());
        }
        if verdict.format == detect::DatasetFormat::Unknown {
            return Err(LabelhubError::FormatUnknown {
                path: args.dataset,
                reason: verdict
                    .reason
                    .unwrap_or_else(|| "format could not be determined".to_string()),
            });
        }
    }

    let result = convert::convert_dataset(&args.dataset, &ConvertOptions::default())?;
    emit(output, &result)?;

    if result.is_clean() {
        Ok(())
    } else {
        Err(LabelhubError::ConversionIncomplete {
            failed: result.errors.len(),
        })
    }
}

#[derive(Serialize)]
struct Resolution<'a> {
    path: &'a Path,
    instance: Option<&'a str>,
    /// The label file an image path maps to.
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<PathBuf>,
}

impl std::fmt::Display for Resolution<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.instance {
            Some(name) => writeln!(f, "{name}")?,
            None => writeln!(f, "no instance owns {}", self.path.display())?,
        }
        if let Some(label) = &self.label {
            writeln!(f, "label: {}", label.display())?;
        }
        Ok(())
    }
}

/// Execute the resolve subcommand.
fn run_resolve(args: ResolveArgs, config: &EngineConfig) -> Result<(), LabelhubError> {
    let output = OutputFormat::parse(&args.output)?;
    let instances = args.registry.open(config).list()?;

    let policy = label::PathPolicy::default();
    let found = resolve_by_ancestry(&args.path, &instances, &policy);
    let label = policy
        .is_image_file(&args.path)
        .then(|| policy.label_for_image(&args.path));
    emit(
        output,
        &Resolution {
            path: &args.path,
            instance: found.map(|instance| instance.name.as_str()),
            label,
        },
    )
}

/// Execute the label-saved subcommand.
fn run_label_saved(args: LabelSavedArgs, config: EngineConfig) -> Result<(), LabelhubError> {
    let output = OutputFormat::parse(&args.output)?;
    let registry = args.registry.open(&config);
    let engine = Engine::new(config);

    let trigger = engine.label_sync_trigger();
    let outcome = engine.on_label_saved(&registry, &trigger, &args.label, args.base.as_deref())?;
    emit(output, &outcome)?;
    if output == OutputFormat::Text {
        println!();
    }
    Ok(())
}

/// Execute the check-format subcommand.
fn run_check_format(args: InstanceArgs, config: EngineConfig) -> Result<(), LabelhubError> {
    let output = OutputFormat::parse(&args.output)?;
    let registry = args.registry.open(&config);

    let verdict = Engine::new(config).check_format(&registry, &args.name)?;
    emit(output, &verdict)
}

/// Execute the ensure-oriented subcommand.
fn run_ensure_oriented(args: InstanceArgs, config: EngineConfig) -> Result<(), LabelhubError> {
    let output = OutputFormat::parse(&args.output)?;
    let registry = args.registry.open(&config);

    let outcome =
        Engine::new(config).ensure_oriented(&registry, &args.name, &CancelToken::new())?;
    emit(output, &outcome)?;

    match outcome {
        engine::EnsureOutcome::Converted { result, .. } if !result.is_clean() => {
            Err(LabelhubError::ConversionIncomplete {
                failed: result.errors.len(),
            })
        }
        _ => Ok(()),
    }
}

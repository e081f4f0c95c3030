use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use image_stitch::naming::{DEFAULT_PREFIX, DEFAULT_SUFFIX, DEFAULT_SUFFIX_EXTENSION};
use image_stitch::{
    build_archive, combine_folder, group_sources, sources_from_folder, sources_from_paths,
    ExtractedArchive, ImageSource, NamingPolicy, Settings, StitchOptions, ARCHIVE_MIME,
    DEFAULT_ARCHIVE_NAME,
};
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "image-stitch",
    version,
    about = "Stitch similarly named images side by side and package them as a zip"
)]
struct Cli {
    /// Log every group, not just the summary
    #[arg(long, short, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
    /// Settings file (default: $IMAGE_STITCH_SETTINGS or the user config dir)
    #[arg(long = "settings-file", global = true)]
    settings_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print supported commands in JSON
    Commands,
    /// Build a zip with one stitched (or passed-through) image per group
    Zip(ZipArgs),
    /// Stitch groups inside a folder and delete the originals
    Folder(FolderArgs),
    /// Print the grouping as JSON without stitching anything
    Groups(GroupsArgs),
    /// Show or change persisted settings
    Settings(SettingsArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Image files, grouped in the order given
    #[arg(conflicts_with_all = ["folder", "archive"])]
    files: Vec<PathBuf>,
    /// Use every image directly inside this folder (sorted by name)
    #[arg(long, conflicts_with = "archive")]
    folder: Option<PathBuf>,
    /// Extract this zip and use the images at its top level
    #[arg(long)]
    archive: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum NamingKind {
    /// combined_<name>
    Prefix,
    /// <stem>_combined.png
    Suffix,
    /// first member's name unchanged
    Keep,
}

#[derive(Args, Debug)]
struct StitchArgs {
    /// Minimum filename similarity to join a group (0..=1)
    #[arg(long, default_value_t = image_stitch::config::DEFAULT_THRESHOLD)]
    threshold: f64,
    /// Largest number of images stitched together
    #[arg(long, default_value_t = image_stitch::config::DEFAULT_MAX_GROUP_SIZE)]
    max_group_size: usize,
    /// Output naming policy
    #[arg(long, value_enum, default_value_t = NamingKind::Prefix)]
    naming: NamingKind,
    /// Prefix for --naming prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
    /// Suffix for --naming suffix
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    suffix: String,
    /// Extension for --naming suffix
    #[arg(long, default_value = DEFAULT_SUFFIX_EXTENSION)]
    extension: String,
}

#[derive(Args, Debug)]
struct ZipArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    stitch: StitchArgs,
    /// Output zip path
    #[arg(long, default_value = DEFAULT_ARCHIVE_NAME)]
    out: PathBuf,
    /// Print the run report JSON to stdout
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    /// Fail with non-zero status when any group was skipped
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,
}

#[derive(Args, Debug)]
struct FolderArgs {
    /// Folder to combine in place (default: last used folder)
    dir: Option<PathBuf>,
    #[command(flatten)]
    stitch: StitchArgs,
    /// Save the folder as the last used folder
    #[arg(long, action = ArgAction::SetTrue)]
    remember: bool,
    /// Report what would be combined without writing or deleting
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
    /// Print the run report JSON to stdout
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    /// Fail with non-zero status when any group was skipped
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,
}

#[derive(Args, Debug)]
struct GroupsArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    stitch: StitchArgs,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    #[command(subcommand)]
    action: SettingsAction,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the settings JSON and where it lives
    Show,
    /// Remember a folder for later `zip`/`folder` runs
    SetFolder { dir: PathBuf },
    /// Forget the last used folder
    Clear,
}

/// Sources for one run, plus the temp dir they may live in.
struct Inputs {
    sources: Vec<ImageSource>,
    _extracted: Option<ExtractedArchive>,
    origin: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings_path = cli.settings_file.clone().unwrap_or_else(Settings::default_path);

    match cli.command {
        Commands::Commands => print_commands(),
        Commands::Zip(args) => command_zip(args, &settings_path),
        Commands::Folder(args) => command_folder(args, &settings_path),
        Commands::Groups(args) => command_groups(args, &settings_path),
        Commands::Settings(args) => command_settings(args, &settings_path),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_commands() -> Result<()> {
    let rows = vec![
        json!({
            "name": "zip",
            "description": "Group images by filename, stitch each group, and write a zip archive."
        }),
        json!({
            "name": "folder",
            "description": "Stitch groups inside a folder and remove the originals."
        }),
        json!({
            "name": "groups",
            "description": "Print the filename grouping without stitching."
        }),
        json!({
            "name": "settings",
            "description": "Show or change the remembered folder."
        }),
    ];

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "commands": rows }))?
    );
    Ok(())
}

fn stitch_options(args: &StitchArgs) -> Result<StitchOptions> {
    let naming = match args.naming {
        NamingKind::Prefix => NamingPolicy::Prefix {
            prefix: args.prefix.clone(),
        },
        NamingKind::Suffix => NamingPolicy::Suffix {
            suffix: args.suffix.clone(),
            extension: args.extension.clone(),
        },
        NamingKind::Keep => NamingPolicy::KeepName,
    };
    let options = StitchOptions {
        threshold: args.threshold,
        max_group_size: args.max_group_size,
        naming,
    };
    options.validate()?;
    Ok(options)
}

fn last_folder(settings_path: &Path) -> Result<PathBuf> {
    let settings = Settings::load(settings_path)?;
    match settings.last_folder {
        Some(dir) => {
            info!("using last folder {}", dir.display());
            Ok(dir)
        }
        None => bail!("no input given and no last folder saved. Pass files, --folder, or --archive."),
    }
}

fn resolve_inputs(args: &InputArgs, settings_path: &Path) -> Result<Inputs> {
    if let Some(archive) = &args.archive {
        let extracted = ExtractedArchive::open(archive)
            .with_context(|| format!("failed to extract archive: {}", archive.display()))?;
        return Ok(Inputs {
            sources: extracted.sources().to_vec(),
            origin: abs_path(archive).display().to_string(),
            _extracted: Some(extracted),
        });
    }

    if !args.files.is_empty() {
        return Ok(Inputs {
            sources: sources_from_paths(&args.files)?,
            _extracted: None,
            origin: "files".to_string(),
        });
    }

    let dir = match &args.folder {
        Some(dir) => dir.clone(),
        None => last_folder(settings_path)?,
    };
    Ok(Inputs {
        sources: sources_from_folder(&dir)?,
        _extracted: None,
        origin: abs_path(&dir).display().to_string(),
    })
}

fn log_progress(fraction: f64) {
    info!("progress {:>3.0}%", fraction * 100.0);
}

fn command_zip(args: ZipArgs, settings_path: &Path) -> Result<()> {
    let options = stitch_options(&args.stitch)?;
    let inputs = resolve_inputs(&args.input, settings_path)?;
    if inputs.sources.is_empty() {
        warn!("no images found in {}", inputs.origin);
    }
    let source_count = inputs.sources.len();

    let output = build_archive(inputs.sources, &options, &mut log_progress)?;

    ensure_parent_dir(&args.out)?;
    fs::write(&args.out, &output.bytes)
        .with_context(|| format!("failed to write archive: {}", args.out.display()))?;

    for failure in &output.failures {
        eprintln!(
            "skipped group [{}]: {}",
            failure.members.join(", "),
            failure.error
        );
    }

    if args.json {
        let payload = json!({
            "archive_path": abs_path(&args.out).display().to_string(),
            "mime": ARCHIVE_MIME,
            "input": inputs.origin,
            "source_count": source_count,
            "generated_at": timestamp_iso(),
            "options": options,
            "entry_count": output.entries.len(),
            "entries": output.entries,
            "failures": output.failures,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", abs_path(&args.out).display());
    }

    if args.strict && !output.failures.is_empty() {
        bail!("{} group(s) were skipped", output.failures.len());
    }
    Ok(())
}

fn command_folder(args: FolderArgs, settings_path: &Path) -> Result<()> {
    let options = stitch_options(&args.stitch)?;
    let dir = match args.dir.clone() {
        Some(dir) => dir,
        None => last_folder(settings_path)?,
    };

    let report = combine_folder(&dir, &options, args.dry_run, &mut log_progress)?;

    if args.remember {
        let mut settings = Settings::load(settings_path)?;
        settings.last_folder = Some(abs_path(&dir));
        settings.save(settings_path)?;
        info!("saved last folder to {}", settings_path.display());
    }

    for failure in &report.failures {
        eprintln!(
            "skipped group [{}]: {}",
            failure.members.join(", "),
            failure.error
        );
    }

    if args.json {
        let mut payload = serde_json::to_value(&report)?;
        if let Value::Object(map) = &mut payload {
            map.insert("generated_at".to_string(), json!(timestamp_iso()));
        }
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for combined in &report.combined {
            println!("{}", combined.path.display());
        }
    }

    if args.strict && !report.failures.is_empty() {
        bail!("{} group(s) were skipped", report.failures.len());
    }
    Ok(())
}

fn command_groups(args: GroupsArgs, settings_path: &Path) -> Result<()> {
    let options = stitch_options(&args.stitch)?;
    let inputs = resolve_inputs(&args.input, settings_path)?;
    let groups = group_sources(inputs.sources, &options);

    let rows: Vec<Value> = groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            json!({
                "index": index,
                "output_name": options.naming.name_for(group.first().name()),
                "members": group.names(),
            })
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "input": inputs.origin,
            "threshold": options.threshold,
            "max_group_size": options.max_group_size,
            "groups": rows,
        }))?
    );
    Ok(())
}

fn command_settings(args: SettingsArgs, settings_path: &Path) -> Result<()> {
    let mut settings = Settings::load(settings_path)?;
    match args.action {
        SettingsAction::Show => {}
        SettingsAction::SetFolder { dir } => {
            if !dir.is_dir() {
                bail!("not a directory: {}", dir.display());
            }
            settings.last_folder = Some(abs_path(&dir));
            settings.save(settings_path)?;
        }
        SettingsAction::Clear => {
            settings.last_folder = None;
            settings.save(settings_path)?;
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "path": abs_path(settings_path).display().to_string(),
            "settings": settings,
        }))?
    );
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parent directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn abs_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

fn timestamp_iso() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn stitch_args(naming: NamingKind) -> StitchArgs {
        StitchArgs {
            threshold: 0.75,
            max_group_size: 4,
            naming,
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
            extension: DEFAULT_SUFFIX_EXTENSION.to_string(),
        }
    }

    #[test]
    fn cli_parses_zip_with_folder() {
        let cli = Cli::try_parse_from([
            "image-stitch",
            "zip",
            "--folder",
            "shots",
            "--naming",
            "suffix",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Zip(args) => {
                assert_eq!(args.input.folder, Some(PathBuf::from("shots")));
                assert_eq!(args.stitch.naming, NamingKind::Suffix);
                assert_eq!(args.out, PathBuf::from(DEFAULT_ARCHIVE_NAME));
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_files_with_folder() {
        let parsed = Cli::try_parse_from(["image-stitch", "zip", "a.png", "--folder", "shots"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn naming_flags_map_to_policies() {
        let options = stitch_options(&stitch_args(NamingKind::Suffix)).unwrap();
        assert_eq!(options.naming.name_for("a.jpg"), "a_combined.png");
        let options = stitch_options(&stitch_args(NamingKind::Keep)).unwrap();
        assert_eq!(options.naming, NamingPolicy::KeepName);

        let mut bad = stitch_args(NamingKind::Prefix);
        bad.threshold = 2.0;
        assert!(stitch_options(&bad).is_err());
    }

    #[test]
    fn missing_input_falls_back_to_last_folder() {
        let dir = tempdir().unwrap();
        let shots = dir.path().join("shots");
        fs::create_dir(&shots).unwrap();
        fs::write(shots.join("a.png"), b"x").unwrap();
        let settings_path = dir.path().join("settings.json");

        let empty = InputArgs {
            files: Vec::new(),
            folder: None,
            archive: None,
        };
        assert!(resolve_inputs(&empty, &settings_path).is_err());

        Settings {
            last_folder: Some(shots.clone()),
        }
        .save(&settings_path)
        .unwrap();
        let inputs = resolve_inputs(&empty, &settings_path).unwrap();
        assert_eq!(inputs.sources.len(), 1);
        assert_eq!(inputs.sources[0].name(), "a.png");
    }
}

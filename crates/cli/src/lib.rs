use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use stamper_core::{
    Background, Change, Compositor, DiscBadgeRenderer, Direction, Point, StampCollection, StampId,
    StampSession, StamperConfig,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stamper")]
#[command(about = "Numbered stamps over screenshots")]
pub struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct SettingsArgs {
    /// TOML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Device pixel ratio of the background image.
    #[arg(long, global = true)]
    pixel_ratio: Option<f64>,
    /// Badge diameter in logical pixels.
    #[arg(long, global = true)]
    badge_size: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable information about an image's stamps.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List stamps in id order.
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Add a stamp, numbered next unless `--id` is given.
    Add {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[arg(long)]
        id: Option<u32>,
    },
    /// Remove stamps and renumber the rest.
    Remove {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "ID", required = true)]
        ids: Vec<u32>,
        /// Leave the remaining ids untouched.
        #[arg(long)]
        keep_gaps: bool,
    },
    /// Close gaps in the id sequence.
    Renumber {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Swap a stamp's number with the next one up.
    Promote {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        id: u32,
    },
    /// Swap a stamp's number with the previous one.
    Demote {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        id: u32,
    },
    /// Line stamps up along one edge.
    Align {
        #[arg(value_enum)]
        edge: Edge,
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "ID", required = true)]
        ids: Vec<u32>,
    },
    /// Move stamps by a fixed offset.
    Nudge {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        dx: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        dy: f64,
        #[arg(value_name = "ID", required = true)]
        ids: Vec<u32>,
    },
    /// Write the tag file and the stamped image.
    Save {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Edge {
    /// Lowest stamp's y
    Bottom,
    /// Leftmost stamp's x
    Left,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    name: String,
    tags: String,
    background: Option<String>,
    stamped: String,
    stamp_count: usize,
    next_id: u32,
    background_size: Option<SizeOutput>,
    background_dpi: Option<DpiOutput>,
}

#[derive(Debug, Serialize)]
struct SizeOutput {
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
struct DpiOutput {
    x: f64,
    y: f64,
}

/// One stamp as stored in the tag file.
#[derive(Debug, Serialize)]
struct StampOutput {
    id: u32,
    label: u32,
    x: i64,
    y: i64,
}

/// Install the stderr log subscriber, filtered by `STAMPER_LOG` (default `warn`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("STAMPER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    if let Commands::Version = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(&cli.settings)?;
    tracing::debug!(?config, "configuration resolved");

    match cli.command {
        Commands::Info { file } => run_info(&file, &config),
        Commands::List { file, json } => run_list(&file, &config, json),
        Commands::Add { file, x, y, id } => run_add(&file, &config, Point::new(x, y), id),
        Commands::Remove { file, ids, keep_gaps } => {
            let ids = stamp_ids(&ids);
            mutate(&file, &config, |stamps| {
                let removed =
                    ids.iter().fold(Change::Unchanged, |change, &id| change.or(stamps.remove(id)));
                if removed.is_changed() && !keep_gaps {
                    removed.or(stamps.renumber())
                } else {
                    removed
                }
            })
        }
        Commands::Renumber { file } => mutate(&file, &config, |stamps| stamps.renumber()),
        Commands::Promote { file, id } => {
            mutate(&file, &config, |stamps| stamps.promote(StampId(id), Direction::Promote))
        }
        Commands::Demote { file, id } => {
            mutate(&file, &config, |stamps| stamps.promote(StampId(id), Direction::Demote))
        }
        Commands::Align { edge, file, ids } => {
            let ids = stamp_ids(&ids);
            mutate(&file, &config, |stamps| match edge {
                Edge::Bottom => stamps.align_bottom(&ids),
                Edge::Left => stamps.align_left(&ids),
            })
        }
        Commands::Nudge { file, dx, dy, ids } => {
            let ids = stamp_ids(&ids);
            mutate(&file, &config, |stamps| stamps.nudge(&ids, dx, dy))
        }
        Commands::Save { file } => run_save(&file, &config),
        Commands::Version => Ok(()),
    }
}

/// File settings, then `STAMPER_*` variables, then command-line flags.
///
/// Without `--config` the per-user file is read when it exists.
fn load_config(settings: &SettingsArgs) -> Result<StamperConfig> {
    let path = settings
        .config
        .clone()
        .or_else(|| StamperConfig::default_path().filter(|path| path.is_file()));

    let mut config = match path {
        Some(path) => StamperConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => StamperConfig::default(),
    }
    .merge_env()
    .context("invalid STAMPER_* environment setting")?;

    if let Some(size) = settings.badge_size {
        config = config.with_badge_size(size);
    }
    if let Some(ratio) = settings.pixel_ratio {
        config = config.with_pixel_ratio(ratio);
    }

    config.validate().context("invalid command-line setting")
}

fn open_session(file: &Path, config: &StamperConfig) -> Result<StampSession> {
    StampSession::open(file, config)
        .with_context(|| format!("failed to load stamps for {}", file.display()))
}

/// Apply one engine operation and persist the tag file only if it changed something.
fn mutate<F>(file: &Path, config: &StamperConfig, operation: F) -> Result<()>
where
    F: FnOnce(&mut StampCollection) -> Change,
{
    let mut session = open_session(file, config)?;
    let change = session.apply(operation);
    persist(&mut session, change)
}

fn persist(session: &mut StampSession, change: Change) -> Result<()> {
    if !change.is_changed() {
        println!("unchanged");
        return Ok(());
    }

    let path = session.save_tags().context("failed to write tag file")?;
    println!("{}", path.display());
    Ok(())
}

fn run_info(file: &Path, config: &StamperConfig) -> Result<()> {
    let session = open_session(file, config)?;
    let paths = session.paths();

    let background_path = paths.resolve_background().ok();
    let background = match &background_path {
        Some(path) => Some(
            Background::open(path)
                .with_context(|| format!("failed to read background {}", path.display()))?,
        ),
        None => None,
    };
    let background_size = background
        .as_ref()
        .map(|background| SizeOutput { width: background.width(), height: background.height() });
    let background_dpi = background
        .as_ref()
        .and_then(|background| background.resolution)
        .and_then(|resolution| resolution.dpi())
        .map(|(x, y)| DpiOutput { x, y });

    let payload = InfoOutput {
        name: paths.name().to_owned(),
        tags: paths.tags().display().to_string(),
        background: background_path.map(|path| path.display().to_string()),
        stamped: paths.stamped().display().to_string(),
        stamp_count: session.stamps().len(),
        next_id: session.stamps().next_id().raw(),
        background_size,
        background_dpi,
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_list(file: &Path, config: &StamperConfig, json: bool) -> Result<()> {
    let session = open_session(file, config)?;
    let stamps: Vec<StampOutput> = session
        .stamps()
        .iter()
        .map(|stamp| StampOutput {
            id: stamp.id.raw(),
            label: stamp.id.label(),
            x: stamp.x.trunc() as i64,
            y: stamp.y.trunc() as i64,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&stamps)?);
        return Ok(());
    }

    for stamp in &stamps {
        println!("#{}\tid {}\t({}, {})", stamp.label, stamp.id, stamp.x, stamp.y);
    }

    Ok(())
}

fn run_add(file: &Path, config: &StamperConfig, position: Point, id: Option<u32>) -> Result<()> {
    let mut session = open_session(file, config)?;
    let id = session
        .try_apply(|stamps| stamps.add(position, id.map(StampId)))
        .context("failed to add stamp")?;

    tracing::info!(%id, x = position.x, y = position.y, "stamp added");
    persist(&mut session, Change::Changed)
}

fn run_save(file: &Path, config: &StamperConfig) -> Result<()> {
    let mut session = open_session(file, config)?;
    let compositor = Compositor::from_config(DiscBadgeRenderer::default(), config);

    let saved = session.save(&compositor).context("failed to save stamped image")?;
    println!("{}", saved.tags.display());
    println!("{}", saved.image.display());

    Ok(())
}

fn stamp_ids(ids: &[u32]) -> Vec<StampId> {
    ids.iter().copied().map(StampId).collect()
}

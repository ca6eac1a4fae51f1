#![allow(dead_code)]
#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::cargo)]
#![warn(
    clippy::nursery,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::cargo_common_metadata
)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::box_score::game_info::NameMatch;
use crate::box_score::traits::GameId;
use crate::pipeline::{LoadConfig, Pipeline, PullWindow, Sources, UpdateOutcome};
use crate::providers::archive::BoxScoreArchive;
use crate::providers::chadwick::{ChadwickRegister, REGISTER_ROOT};
use crate::providers::statcast::{SavantClient, SAVANT_ROOT};
use crate::providers::stats_api::{StatsApiClient, STATS_API_ROOT};
use crate::providers::BoxScoreSource;
use crate::warehouse::csv_store::FileWarehouse;
use crate::warehouse::parquet_export::ParquetExporter;
use crate::warehouse::WriteMode;

mod box_score;
mod pipeline;
mod providers;
mod util;
mod warehouse;

const ABOUT: &str = "Loads Statcast pitches, game metadata and reconciled box scores into a file-backed warehouse.";

#[derive(Parser, Debug)]
#[command(name = "boxscore-loader", about = ABOUT)]
struct Opt {
    /// Warehouse root; tables are written to `<output-dir>/<schema>/<table>.csv`
    #[arg(short, long, global = true, default_value = "warehouse")]
    output_dir: PathBuf,

    #[arg(long, global = true, default_value = "bronze")]
    schema: String,

    /// How player names are matched against box score notes: `substring` or `token`
    #[arg(long, global = true, default_value_t = NameMatch::Substring)]
    name_match: NameMatch,

    /// Also write the box score tables as parquet
    #[arg(long, global = true)]
    parquet: bool,

    /// Read box scores from saved `<game id>.json` live feeds instead of the API
    #[arg(long, global = true)]
    box_score_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = STATS_API_ROOT)]
    stats_api_url: String,

    #[arg(long, global = true, default_value = SAVANT_ROOT)]
    savant_url: String,

    #[arg(long, global = true, default_value = REGISTER_ROOT)]
    register_url: String,

    #[arg(long, global = true, default_value_t = 60)]
    timeout_secs: u64,

    #[arg(long, global = true, default_value_t = Level::INFO)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pull a date range and replace every table with it
    InitialLoad {
        #[arg(long)]
        start_date: NaiveDate,
        #[arg(long)]
        end_date: NaiveDate,
    },
    /// Append everything since the latest loaded pitch date
    Update {
        /// Defaults to today
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    /// Reconcile box scores for specific games (all archived games if none given)
    Reconcile {
        #[arg(long = "game-id")]
        game_ids: Vec<GameId>,
        #[arg(long, default_value_t = WriteMode::Append)]
        mode: WriteMode,
    },
}

impl From<&Opt> for LoadConfig {
    fn from(opt: &Opt) -> Self {
        Self {
            output_dir: opt.output_dir.clone(),
            schema: opt.schema.clone(),
            name_match: opt.name_match,
            parquet: opt.parquet,
            stats_api_url: opt.stats_api_url.clone(),
            savant_url: opt.savant_url.clone(),
            register_url: opt.register_url.clone(),
            timeout: Duration::from_secs(opt.timeout_secs),
            box_score_dir: opt.box_score_dir.clone(),
        }
    }
}

fn run(config: &LoadConfig, command: Command) -> Result<()> {
    let stats_api = StatsApiClient::new(&config.stats_api_url, config.timeout)?;
    let savant = SavantClient::new(&config.savant_url, config.timeout)?;
    let register = ChadwickRegister::new(&config.register_url, config.timeout)?;
    let archive = config
        .box_score_dir
        .as_deref()
        .map(BoxScoreArchive::open)
        .transpose()?;
    let box_scores: &dyn BoxScoreSource = match &archive {
        Some(archive) => archive,
        None => &stats_api,
    };

    let sources = Sources {
        box_scores,
        schedule: &stats_api,
        teams: &stats_api,
        identities: &register,
        pitches: &savant,
    };
    let warehouse = FileWarehouse::new(&config.output_dir, &config.schema)?;
    info!("Writing to {}", warehouse.schema_dir().display());
    let exporter = config
        .parquet
        .then(|| ParquetExporter::new(warehouse.schema_dir()));
    let mut pipeline = Pipeline::new(sources, warehouse, config.name_match);
    if let Some(exporter) = exporter {
        pipeline = pipeline.with_parquet(exporter);
    }

    match command {
        Command::InitialLoad {
            start_date,
            end_date,
        } => {
            let summary = pipeline.initial_load(PullWindow::new(start_date, end_date)?)?;
            info!("{:?}", summary);
        }
        Command::Update { end_date } => {
            let end = end_date.unwrap_or_else(|| Local::now().date_naive());
            match pipeline.update(end)? {
                UpdateOutcome::UpToDate { watermark, end } => {
                    info!("Already up to date: latest pitch {} is not before {}", watermark, end);
                }
                UpdateOutcome::Loaded { window, summary } => {
                    info!("Loaded {}: {:?}", window, summary);
                }
            }
        }
        Command::Reconcile { game_ids, mode } => {
            let game_ids = match (&archive, game_ids.is_empty()) {
                (_, false) => game_ids,
                (Some(archive), true) => archive.game_ids(),
                (None, true) => bail!("Pass --game-id, or --box-score-dir to reconcile every archived game"),
            };
            let summary = pipeline.reconcile(&game_ids, mode)?;
            info!("{:?}", summary);
        }
    }
    pipeline.into_warehouse().log_summary();
    Ok(())
}

#[allow(clippy::expect_used)]
fn main() -> ExitCode {
    let opt: Opt = Opt::parse();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(opt.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to initialize trace");

    let start = Instant::now();
    let config = LoadConfig::from(&opt);
    let result = run(&config, opt.command);

    let end = start.elapsed();
    info!("Elapsed: {:?}", end);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

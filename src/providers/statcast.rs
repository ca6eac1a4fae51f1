use std::collections::BTreeSet;
use std::io::Read;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use const_format::concatcp;
use csv::StringRecord;
use num_traits::PrimInt;
use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::providers::{http_client, PitchSource};
use crate::util::parse_id;

pub const SAVANT_ROOT: &str = "https://baseballsavant.mlb.com";
const SEARCH_PATH: &str = concatcp!(
    "/statcast_search/csv?all=true&type=details&player_type=pitcher",
    "&min_pitches=0&min_results=0&group_by=name&sort_col=pitches&sort_order=desc"
);

/// Regular season, wild card, division series, LCS and World Series.
pub const KEPT_GAME_TYPES: [&str; 5] = ["R", "F", "D", "L", "W"];

pub const GAME_PK_COLUMN: &str = "game_pk";
pub const GAME_DATE_COLUMN: &str = "game_date";
pub const GAME_TYPE_COLUMN: &str = "game_type";
pub const BATTER_COLUMN: &str = "batter";
pub const PITCHER_COLUMN: &str = "pitcher";

const BOM: char = '\u{feff}';

/// Statcast pitch rows kept as raw strings under the export's own header.
#[derive(Debug, Clone, Default)]
pub struct PitchTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl PitchTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: StringRecord = csv_reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| if i == 0 { h.trim_start_matches(BOM) } else { h })
            .collect();
        let rows = csv_reader
            .records()
            .collect::<Result<Vec<StringRecord>, csv::Error>>()?;
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("Pitch table has no `{name}` column"))
    }

    pub fn retain_game_types(&mut self, kept: &[&str]) -> Result<()> {
        if self.rows.is_empty() {
            return Ok(());
        }
        let idx = self.column(GAME_TYPE_COLUMN)?;
        self.rows
            .retain(|row| row.get(idx).is_some_and(|t| kept.contains(&t)));
        Ok(())
    }

    pub fn distinct_ids<T: PrimInt + FromStr>(&self, name: &str) -> Result<BTreeSet<T>> {
        if self.rows.is_empty() {
            return Ok(BTreeSet::new());
        }
        let idx = self.column(name)?;
        let mut ids = BTreeSet::new();
        for row in &self.rows {
            let raw = row.get(idx).unwrap_or_default().trim();
            if raw.is_empty() {
                continue;
            }
            let id = parse_id::<T>(raw).with_context(|| format!("Invalid `{name}` value: {raw}"))?;
            ids.insert(id);
        }
        Ok(ids)
    }

    /// Appends another day's rows. Days with no games come back without a
    /// header and are skipped.
    pub fn extend(&mut self, other: Self) -> Result<()> {
        if other.headers.is_empty() {
            return Ok(());
        }
        if self.headers.is_empty() {
            self.headers = other.headers;
        } else if !self.headers.iter().eq(other.headers.iter()) {
            bail!("Statcast columns changed between requests");
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}

/// Pulls every day in `start..=end` and keeps only the tracked game types.
pub fn pull_pitches<P: PitchSource + ?Sized>(
    source: &P,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PitchTable> {
    let mut table = PitchTable::default();
    for date in start.iter_days().take_while(|d| *d <= end) {
        let day = source
            .pitches(date)
            .with_context(|| format!("Failed to pull pitches for {date}"))?;
        debug!("{}: {} pitches", date, day.len());
        table.extend(day)?;
    }
    let pulled = table.len();
    table.retain_game_types(&KEPT_GAME_TYPES)?;
    info!(
        "Pulled {} pitches from {} to {} ({} kept)",
        pulled,
        start,
        end,
        table.len()
    );
    Ok(table)
}

/// Baseball Savant's Statcast search export.
pub struct SavantClient {
    client: Client,
    base_url: String,
}

impl SavantClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl PitchSource for SavantClient {
    fn pitches(&self, date: NaiveDate) -> Result<PitchTable> {
        let url = format!(
            "{}{}&game_date_gt={date}&game_date_lt={date}",
            self.base_url, SEARCH_PATH
        );
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .with_context(|| format!("Request failed: {url}"))?;
        PitchTable::from_reader(response).with_context(|| format!("Unreadable Statcast CSV from {url}"))
    }
}

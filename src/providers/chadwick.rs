use std::collections::BTreeSet;
use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::box_score::traits::PersonId;
use crate::providers::{http_client, IdentitySource};

pub const REGISTER_ROOT: &str = "https://raw.githubusercontent.com/chadwickbureau/register/master/data";
const SHARD_COUNT: u8 = 16;

/// One row of `batters_data` / `pitchers_data`: the register columns that
/// cross-reference an MLBAM id to the other id systems.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub name_last: String,
    pub name_first: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub key_mlbam: Option<PersonId>,
    pub key_retro: String,
    pub key_bbref: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub key_fangraphs: Option<i64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub mlb_played_first: Option<u16>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub mlb_played_last: Option<u16>,
}

/// Streams one register shard, keeping the rows for the requested ids.
pub fn filter_identities<R: Read>(reader: R, ids: &BTreeSet<PersonId>) -> Result<Vec<PlayerIdentity>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut found = vec![];
    for row in csv_reader.deserialize::<PlayerIdentity>() {
        let identity = row?;
        if identity.key_mlbam.is_some_and(|id| ids.contains(&id)) {
            found.push(identity);
        }
    }
    Ok(found)
}

/// The Chadwick Bureau person register, split into `people-0.csv`..`people-f.csv`.
pub struct ChadwickRegister {
    client: Client,
    base_url: String,
}

impl ChadwickRegister {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn shard_url(&self, shard: u8) -> String {
        format!("{}/people-{:x}.csv", self.base_url, shard)
    }
}

impl IdentitySource for ChadwickRegister {
    fn reverse_lookup(&self, ids: &BTreeSet<PersonId>) -> Result<Vec<PlayerIdentity>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut identities = Vec::with_capacity(ids.len());
        for shard in 0..SHARD_COUNT {
            let url = self.shard_url(shard);
            debug!("GET {}", url);
            let response = self
                .client
                .get(&url)
                .send()
                .and_then(reqwest::blocking::Response::error_for_status)
                .with_context(|| format!("Request failed: {url}"))?;
            let found = filter_identities(response, ids)
                .with_context(|| format!("Failed to read register shard {url}"))?;
            identities.extend(found);
        }
        if identities.len() < ids.len() {
            warn!(
                "{} of {} player ids not found in the register",
                ids.len() - identities.len(),
                ids.len()
            );
        }
        info!("Resolved {} player identities", identities.len());
        Ok(identities)
    }
}

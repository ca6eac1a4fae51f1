//! Parsing for the free-text "game info" fields that accompany a box score,
//! e.g. `HBP: Perez, S (by Cole); Judge 2 (by Lugo 2).`

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::util::{first_int, has_digit};

pub const HBP_LABEL: &str = "HBP";
pub const SACRIFICE_FLY_LABEL: &str = "SF";
pub const BATTERS_FACED_LABEL: &str = "Batters faced";

const FRAGMENT_SEPARATOR: char = ';';
const PITCHER_MARKER: &str = "(by ";

/// How a player's display name is compared against game info text.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NameMatch {
    /// Plain containment. `Smith` also matches `Smithson`.
    #[default]
    Substring,
    /// The name's tokens must appear as a contiguous run of the text's tokens,
    /// ignoring case and punctuation.
    Token,
}

impl NameMatch {
    pub fn matches(self, name: &str, text: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self {
            Self::Substring => text.contains(name),
            Self::Token => {
                let needle = tokens(name);
                let haystack = tokens(text);
                !needle.is_empty()
                    && haystack
                        .windows(needle.len())
                        .any(|window| window == needle.as_slice())
            }
        }
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect_vec()
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct BoxInfoField {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: String,
}

impl BoxInfoField {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            value: value.to_string(),
        }
    }
}

/// A list of labelled info fields, either game-wide or for one team.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxInfo(pub Vec<BoxInfoField>);

impl BoxInfo {
    /// Value of the first field with this label; a missing label means the
    /// event didn't happen, so it reads as empty.
    pub fn value(&self, label: &str) -> &str {
        self.0
            .iter()
            .find(|f| f.label.as_deref() == Some(label))
            .map_or("", |f| f.value.as_str())
    }

    pub fn hbp_events(&self) -> Vec<HbpEvent> {
        HbpEvent::parse_all(self.value(HBP_LABEL))
    }

    pub fn batters_faced(&self) -> Vec<Fragment> {
        split_fragments(self.value(BATTERS_FACED_LABEL))
            .map(Fragment::parse)
            .collect_vec()
    }
}

impl From<Vec<BoxInfoField>> for BoxInfo {
    fn from(fields: Vec<BoxInfoField>) -> Self {
        Self(fields)
    }
}

pub fn split_fragments(text: &str) -> impl Iterator<Item = &str> {
    text.split(FRAGMENT_SEPARATOR)
        .map(|f| strip_terminator(f.trim()))
        .filter(|f| !f.is_empty())
}

/// Drops the period that closes a field, as in `Lugo 4.` or `(by Cole).`,
/// but keeps one that belongs to a name such as `Witt Jr.`.
fn strip_terminator(fragment: &str) -> &str {
    match fragment.strip_suffix('.') {
        Some(rest) if rest.ends_with(|c: char| c == ')' || c.is_ascii_digit()) => rest.trim_end(),
        _ => fragment,
    }
}

/// A player reference within a fragment, with the number that follows it.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Fragment {
    pub text: String,
    pub count: Option<u32>,
}

impl Fragment {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        // A digit run too long for a count saturates instead of reading as a bare name
        let count = has_digit(text).then(|| first_int(text).unwrap_or(u32::MAX));
        Self {
            text: text.to_string(),
            count,
        }
    }

    /// A bare name means the event happened once.
    pub fn events(&self) -> u32 {
        self.count.unwrap_or(1)
    }
}

/// One `;`-separated entry of the HBP field.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct HbpEvent {
    pub batter: Fragment,
    pub pitcher: Option<Fragment>,
}

impl HbpEvent {
    pub fn parse(fragment: &str) -> Self {
        match fragment.split_once(PITCHER_MARKER) {
            Some((batter, pitcher)) => Self {
                batter: Fragment::parse(batter),
                pitcher: Some(Fragment::parse(pitcher.trim_end_matches(')'))),
            },
            None => Self {
                batter: Fragment::parse(fragment),
                pitcher: None,
            },
        }
    }

    pub fn parse_all(text: &str) -> Vec<Self> {
        split_fragments(text).map(Self::parse).collect_vec()
    }
}

/// Hit-by-pitch count for a batter across the parsed events. Every matching
/// fragment adds to the total, so `Smith; Smith 2` counts three.
pub fn batter_hbp(events: &[HbpEvent], name: &str, name_match: NameMatch) -> u32 {
    events
        .iter()
        .filter(|e| name_match.matches(name, &e.batter.text))
        .map(|e| e.batter.events())
        .fold(0, u32::saturating_add)
}

/// Hit batsmen charged to a pitcher across the parsed events. Only `(by ...)`
/// clauses name pitchers: text without one, like `Smith 2; Jones`, charges
/// nobody.
pub fn pitcher_hbp(events: &[HbpEvent], name: &str, name_match: NameMatch) -> u32 {
    events
        .iter()
        .filter_map(|e| e.pitcher.as_ref())
        .filter(|p| name_match.matches(name, &p.text))
        .map(Fragment::events)
        .fold(0, u32::saturating_add)
}

/// Batters faced by a pitcher; when several fragments match, the last wins.
pub fn batters_faced(fragments: &[Fragment], name: &str, name_match: NameMatch) -> u32 {
    fragments
        .iter()
        .filter(|f| name_match.matches(name, &f.text))
        .filter_map(|f| f.count)
        .last()
        .unwrap_or_default()
}

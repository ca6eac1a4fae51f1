use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Error, Result};
use bounded_integer::BoundedU8;
use either::Either;
use serde::{Deserialize, Deserializer};

/// Outs recorded in an unfinished inning. `.3` never appears in a box score.
pub type PartialOuts = BoundedU8<0, 2>;

const OUTS_PER_INNING: u32 = 3;

/// Innings pitched in box score notation, where the digit after the point is
/// a count of outs rather than a decimal fraction.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct InningsPitched {
    whole: u16,
    partial: PartialOuts,
}

impl Default for InningsPitched {
    fn default() -> Self {
        Self {
            whole: 0,
            partial: PartialOuts::MIN,
        }
    }
}

impl InningsPitched {
    pub fn new(whole: u16, partial: u8) -> Result<Self> {
        let partial = PartialOuts::new(partial)
            .with_context(|| format!("Partial innings must be 0, 1 or 2 outs, got {partial}"))?;
        Ok(Self { whole, partial })
    }

    /// Scales to tenths before splitting so that `6.2` never becomes `6.19999`.
    pub fn from_decimal(ip: f64) -> Result<Self> {
        if !ip.is_finite() || ip < 0.0 {
            bail!("Invalid innings pitched value {ip}");
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tenths = (ip * 10.0).round() as u64;
        let whole = u16::try_from(tenths / 10).context("Innings pitched out of range")?;
        #[allow(clippy::cast_possible_truncation)]
        let partial = (tenths % 10) as u8;
        Self::new(whole, partial)
    }

    pub fn outs(self) -> u32 {
        OUTS_PER_INNING * u32::from(self.whole) + u32::from(self.partial.get())
    }

    /// The notation value as the warehouse stores it (`6.2` stays `6.2`).
    pub fn as_decimal(self) -> f64 {
        f64::from(self.whole) + f64::from(self.partial.get()) / 10.0
    }
}

impl FromStr for InningsPitched {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "-" {
            return Ok(Self::default());
        }
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        let whole = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u16>()
                .with_context(|| format!("Bad innings pitched value {s:?}"))?
        };
        let partial = match fraction.trim_end_matches('0') {
            "" => 0,
            f if f.len() == 1 => f
                .parse::<u8>()
                .with_context(|| format!("Bad innings pitched value {s:?}"))?,
            _ => return Err(anyhow!("Bad innings pitched value {s:?}")),
        };
        Self::new(whole, partial).with_context(|| format!("Bad innings pitched value {s:?}"))
    }
}

impl fmt::Display for InningsPitched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whole, self.partial.get())
    }
}

impl<'de> Deserialize<'de> for InningsPitched {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<Either<f64, String>> =
            either::serde_untagged_optional::deserialize(deserializer)?;
        match raw {
            None => Ok(Self::default()),
            Some(Either::Left(ip)) => Self::from_decimal(ip),
            Some(Either::Right(ip)) => Self::from_str(&ip),
        }
        .map_err(serde::de::Error::custom)
    }
}

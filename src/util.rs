use std::str::FromStr;

use either::Either;
use lazy_static::lazy_static;
use num_traits::{NumCast, PrimInt};
use regex::Regex;
use serde::Deserializer;

lazy_static! {
    static ref NUMERIC_REGEX: Regex = Regex::new(r"[0-9]+").unwrap();
}

pub(crate) fn parse_count<T: PrimInt + FromStr>(int_str: &str) -> Option<T> {
    int_str.trim().parse::<T>().ok()
}

/// An id column value, which pandas-style exports may write as `592450.0`.
pub(crate) fn parse_id<T: PrimInt + FromStr>(raw: &str) -> Option<T> {
    let raw = raw.trim();
    parse_count::<T>(raw).or_else(|| raw.strip_suffix(".0").and_then(parse_count::<T>))
}

/// First run of digits anywhere in the text, e.g. `2` in `"Smith 2 (by Jones)"`.
pub(crate) fn first_int<T: PrimInt + FromStr>(text: &str) -> Option<T> {
    NUMERIC_REGEX
        .find(text)
        .and_then(|m| parse_count::<T>(m.as_str()))
}

pub(crate) fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

fn float_to_count<T: PrimInt>(f: f64) -> Option<T> {
    if f.is_finite() && f >= 0.0 {
        NumCast::from(f.round())
    } else {
        None
    }
}

/// Provider stat fields show up as numbers, numeric strings, or placeholders
/// like `"-"`; anything that isn't a count becomes zero.
pub(crate) fn lenient_count<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: PrimInt + FromStr,
{
    let raw: Option<Either<f64, String>> =
        either::serde_untagged_optional::deserialize(deserializer)?;
    let count = match raw {
        Some(Either::Left(f)) => float_to_count(f),
        Some(Either::Right(s)) => parse_count(&s)
            .or_else(|| s.trim().parse::<f64>().ok().and_then(float_to_count)),
        None => None,
    };
    Ok(count.unwrap_or_else(T::zero))
}

/// Ids occasionally come through as `"592450"` or `592450.0`.
pub(crate) fn lenient_id<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: PrimInt + FromStr,
{
    let raw: Either<f64, String> = either::serde_untagged::deserialize(deserializer)?;
    match raw {
        Either::Left(f) => float_to_count(f),
        Either::Right(s) => parse_count(&s),
    }
    .ok_or_else(|| serde::de::Error::custom("Invalid id"))
}

#[cfg(test)]
pub(crate) fn scratch_dir(label: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("boxscore-loader-{label}-{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

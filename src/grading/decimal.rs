//! Exact decimal values used by the grading pipeline.
//!
//! [`Score`] holds a raw sub-score as an integer count of millionths, and
//! [`Grade`] holds a value quantized to hundredths. All averaging and
//! weighting is integer arithmetic with round-half-up, so results never
//! drift the way binary floats do on `.xx5` boundaries.

use crate::error::{GradeError, GradeResult};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Add;
use std::str::FromStr;

/// Fractional digits accepted on input.
const FRACTION_DIGITS: usize = 6;
/// Millionths per unit.
const SCALE: i64 = 1_000_000;
/// Millionths per hundredth.
const MICROS_PER_HUNDREDTH: i64 = SCALE / 100;
/// Integer digits accepted before conversion.
const MAX_WHOLE_DIGITS: usize = 24;
/// Exclusive bound on a [`Score`] in millionths: twelve integer digits.
const MAX_SCORE_MICROS: i128 = 1_000_000_000_000_000_000;

/// Divides `numerator` by a positive `denominator`, rounding ties away from zero.
pub fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if 2 * remainder.abs() >= denominator {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

/// A raw sub-score as entered, with up to six decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(i64);

impl Score {
    pub const ZERO: Score = Score(0);

    pub const fn from_hundredths(hundredths: i64) -> Self {
        Score(hundredths * MICROS_PER_HUNDREDTH)
    }

    pub const fn from_micros(micros: i64) -> Self {
        Score(micros)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Parses signed decimal text into exact millionths.
fn parse_micros(s: &str) -> Result<i128, &'static str> {
    let text = s.trim();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        Some(_) => (false, text),
        None => return Err("empty"),
    };

    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err("not a number");
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err("not a number");
    }
    if fraction.len() > FRACTION_DIGITS {
        return Err("more than six decimal places");
    }
    if whole.len() > MAX_WHOLE_DIGITS {
        return Err("out of range");
    }

    let whole: i128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| "out of range")?
    };
    let fraction: i128 = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<width$}", width = FRACTION_DIGITS)
            .parse()
            .map_err(|_| "not a number")?
    };

    let micros = whole * i128::from(SCALE) + fraction;
    Ok(if negative { -micros } else { micros })
}

fn invalid_score(input: &str) -> impl Fn(&'static str) -> GradeError + '_ {
    move |reason| GradeError::InvalidScore {
        input: input.to_string(),
        reason,
    }
}

impl FromStr for Score {
    type Err = GradeError;

    /// Accepts up to twelve integer digits and six decimal places.
    fn from_str(s: &str) -> GradeResult<Self> {
        let invalid = invalid_score(s);
        let micros = parse_micros(s).map_err(&invalid)?;
        if micros.abs() >= MAX_SCORE_MICROS {
            return Err(invalid("out of range"));
        }
        Ok(Score(micros as i64))
    }
}

impl fmt::Display for Score {
    /// Renders at least two decimal places, trimming trailing zeros beyond that.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE.unsigned_abs();

        let mut fraction = format!("{:06}", abs % scale);
        while fraction.len() > 2 && fraction.ends_with('0') {
            fraction.pop();
        }

        write!(f, "{sign}{}.{fraction}", abs / scale)
    }
}

/// A value quantized to two decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Grade(i64);

impl Grade {
    pub const ZERO: Grade = Grade(0);

    pub const fn from_hundredths(hundredths: i64) -> Self {
        Grade(hundredths)
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Quantizes a score to two decimals, round-half-up.
    pub fn quantize(score: Score) -> Self {
        Grade(div_round_half_up(score.0.into(), MICROS_PER_HUNDREDTH.into()) as i64)
    }

    /// Exact mean of `scores`, quantized round-half-up. Returns `0.00` for empty input.
    pub fn mean(scores: &[Score]) -> Self {
        if scores.is_empty() {
            return Grade::ZERO;
        }
        let sum: i128 = scores.iter().map(|s| i128::from(s.0)).sum();
        let denominator = scores.len() as i128 * i128::from(MICROS_PER_HUNDREDTH);
        Grade(div_round_half_up(sum, denominator) as i64)
    }

    /// Exact mean of already quantized grades, quantized round-half-up.
    /// Returns `0.00` for empty input.
    pub fn mean_of(grades: &[Grade]) -> Self {
        if grades.is_empty() {
            return Grade::ZERO;
        }
        let sum: i128 = grades.iter().map(|g| i128::from(g.0)).sum();
        Grade(div_round_half_up(sum, grades.len() as i128) as i64)
    }

    /// Multiplies by `percent / 100`, quantized round-half-up.
    pub fn weighted(self, percent: u32) -> Self {
        Grade(div_round_half_up(i128::from(self.0) * i128::from(percent), 100) as i64)
    }
}

impl Add for Grade {
    type Output = Grade;

    fn add(self, rhs: Grade) -> Grade {
        Grade(self.0 + rhs.0)
    }
}

impl FromStr for Grade {
    type Err = GradeError;

    /// Quantizes half-up. Accepts any value whose hundredths fit in `i64`,
    /// so sums and averages of the widest scores still parse back.
    fn from_str(s: &str) -> GradeResult<Self> {
        let invalid = invalid_score(s);
        let micros = parse_micros(s).map_err(&invalid)?;
        let hundredths = div_round_half_up(micros, MICROS_PER_HUNDREDTH.into());
        i64::try_from(hundredths)
            .map(Grade)
            .map_err(|_| invalid("out of range"))
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<Grade> for Score {
    fn from(grade: Grade) -> Score {
        Score::from_hundredths(grade.0)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor(PhantomData))
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor(PhantomData))
    }
}

/// Accepts decimal text or a JSON/CSV number and parses it through `FromStr`.
struct DecimalVisitor<T>(PhantomData<T>);

impl<T: FromStr<Err = GradeError>> DecimalVisitor<T> {
    fn parse<E: de::Error>(text: &str) -> Result<T, E> {
        text.parse().map_err(E::custom)
    }
}

impl<'de, T: FromStr<Err = GradeError>> Visitor<'de> for DecimalVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        Self::parse(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        Self::parse(&v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        Self::parse(&v.to_string())
    }

    // `f64` Display is the shortest round-tripping form and never uses an exponent.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<T, E> {
        Self::parse(&v.to_string())
    }
}

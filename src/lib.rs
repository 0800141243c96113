//! # candlewiz - candlestick pattern recognition over a sliding window
//!
//! Patterns are described with a compact constraint language: each clause is a
//! sequence of tuples, each tuple describes one candle (or a three-candle trend)
//! and each slot of a tuple holds a small condition such as `>80`, `$1` or
//! `>=max[$1;$2;$3]`. Patterns are compiled once into an immutable [`Catalog`]
//! and evaluated against a fixed-length [`HistoryWindow`] on every new bar.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlewiz::prelude::*;
//!
//! let history: Vec<Bar> = (0..5)
//!     .map(|i| Bar::new(1_600_000_000 + i * 3600, 100.0, 102.0, 98.0, 101.0, 1000.0))
//!     .collect();
//!
//! let mut matcher = MatcherBuilder::new()
//!     .with_default_catalog()
//!     .span(5)
//!     .build(&history)
//!     .unwrap();
//!
//! let next = Bar::new(1_600_018_000, 100.0, 102.0, 98.0, 101.0, 1000.0);
//! let report = matcher.on_new_bar(&next, true).unwrap();
//! assert_eq!(report.summary_index(), 0);
//! assert_eq!(report.to_string(), "No special candles or patterns found!");
//! ```

use std::fmt;
use std::sync::Arc;

pub mod catalog;
pub mod condition;
pub mod config;
mod grammar;
pub mod pattern;
pub mod window;

pub use catalog::Catalog;
pub use condition::{ConditionExpression, ResolvedCondition};
pub use config::{MatcherConfig, PatternSpec};
pub use pattern::{Clause, PatternDefinition, TupleShape};
pub use window::HistoryWindow;

pub mod prelude {
    pub use crate::{
        // Parsing & evaluation
        condition::{AtomError, Bindings, Bounds, EvalError, Multiplier},
        pattern::resolve::{Observation, ResolvedClause, ResolvedTuple},
        // Parallel
        scan_parallel,
        // Data
        Bar,
        BarReport,
        CandleMetrics,
        Catalog,
        Clause,
        ConditionExpression,
        Direction,
        HistoryWindow,
        MatchReport,
        // Matcher
        MatcherBuilder,
        MatcherConfig,
        OHLCVExt,
        Outcome,
        PatternDefinition,
        // Errors
        PatternError,
        PatternMatch,
        PatternMatcher,
        PatternSpec,
        Period,
        ResolvedCondition,
        Result,
        ScanError,
        ScanResult,
        Summary,
        Trend,
        TupleShape,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors raised while compiling patterns or building a matcher.
///
/// Evaluation of a compiled pattern never fails: constraints that cannot be
/// evaluated simply do not hold.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Pattern `{pattern}` has no clauses")]
    EmptyPattern { pattern: String },

    #[error("Pattern `{pattern}` contains an empty clause")]
    EmptyClause { pattern: String },

    #[error("Pattern `{pattern}`: malformed clause `{clause}`: {message}")]
    MalformedClause {
        pattern: String,
        clause: String,
        message: String,
    },

    #[error("Pattern `{pattern}`: invalid atom `{atom}`")]
    InvalidAtom {
        pattern: String,
        atom: String,
        #[source]
        source: condition::AtomError,
    },

    #[error("Pattern `{pattern}`: tuples of {arity} values are not supported")]
    InvalidArity { pattern: String, arity: usize },

    #[error("Pattern `{pattern}` must contain candles")]
    NoCandleTuple { pattern: String },

    #[error("Pattern `{pattern}`: unable to check for trends after candles")]
    TrendAfterCandle { pattern: String },

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Window span (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Unix timestamp in seconds
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    /// +1 when close >= open, -1 otherwise
    #[inline]
    fn sign(&self) -> i8 {
        if self.close() >= self.open() {
            1
        } else {
            -1
        }
    }

    /// Validate OHLCV data consistency.
    ///
    /// Zero-range bars are rejected: percentage slots divide by the range.
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        if self.range() <= 0.0 {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "zero range",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

fn validate_bars<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            PatternError::InvalidOHLCV { reason, .. } => {
                PatternError::InvalidOHLCV { index: i, reason }
            }
            other => other,
        })?;
    }
    Ok(())
}

/// Plain OHLCV bar as delivered by a feed
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// CANDLE METRICS
// ============================================================

/// Derived per-bar record, computed once when a bar enters the window.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandleMetrics {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub body: f64,
    pub upper_shadow: f64,
    pub lower_shadow: f64,
    /// Mean of the upper and lower shadow
    pub shadow: f64,
    /// +1 for a green candle (close >= open), -1 for a red one
    pub sign: i8,
    /// high - low
    pub range: f64,
}

impl CandleMetrics {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self::from_bar(&Bar::new(timestamp, open, high, low, close, volume))
    }

    /// Bars without a timestamp are stamped with the epoch.
    pub fn from_bar<T: OHLCV>(bar: &T) -> Self {
        let upper_shadow = bar.upper_shadow();
        let lower_shadow = bar.lower_shadow();
        Self {
            timestamp: bar.timestamp().unwrap_or(0),
            open: bar.open(),
            high: bar.high(),
            low: bar.low(),
            close: bar.close(),
            volume: bar.volume(),
            body: bar.body(),
            upper_shadow,
            lower_shadow,
            shadow: (upper_shadow + lower_shadow) / 2.0,
            sign: bar.sign(),
            range: bar.range(),
        }
    }

    /// Upper shadow as a percentage of the range (undefined for zero-range bars)
    #[inline]
    pub fn upper_shadow_pct(&self) -> f64 {
        self.upper_shadow / self.range * 100.0
    }

    #[inline]
    pub fn body_pct(&self) -> f64 {
        self.body / self.range * 100.0
    }

    #[inline]
    pub fn lower_shadow_pct(&self) -> f64 {
        self.lower_shadow / self.range * 100.0
    }

    /// UTC date/time label used in reports, e.g. `2020-09-13 12:26:40`.
    pub fn datetime(&self) -> String {
        chrono::DateTime::from_timestamp(self.timestamp, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

impl OHLCV for CandleMetrics {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// DIRECTION & TREND
// ============================================================

/// Declared bias of a pattern. Serialized as -1, 0 or +1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    pub fn from_sign(sign: i64) -> Result<Self> {
        match sign {
            1 => Ok(Direction::Bullish),
            0 => Ok(Direction::Neutral),
            -1 => Ok(Direction::Bearish),
            _ => Err(PatternError::InvalidValue("bias must be -1, 0 or +1")),
        }
    }

    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Direction::Bullish => 1,
            Direction::Neutral => 0,
            Direction::Bearish => -1,
        }
    }

    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

impl serde::Serialize for Direction {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.sign().serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Direction {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = i64::deserialize(d)?;
        Direction::from_sign(value).map_err(serde::de::Error::custom)
    }
}

/// Three-candle trend classification used by trend-descriptor tuples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Trend {
    Up,
    #[default]
    Sideways,
    Down,
}

impl Trend {
    /// Classify three consecutive bars, oldest first.
    ///
    /// The move from the first to the last close must exceed the average range
    /// of the three bars to count as a trend.
    pub fn classify(bars: [&CandleMetrics; 3]) -> Self {
        let [first, middle, last] = bars;
        let avg_range = (first.range + middle.range + last.range) / 3.0;
        if (last.close - first.close).abs() <= avg_range {
            Trend::Sideways
        } else if last.close > first.close {
            Trend::Up
        } else {
            Trend::Down
        }
    }

    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Trend::Up => 1,
            Trend::Sideways => 0,
            Trend::Down => -1,
        }
    }

    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Trend::Up)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Trend::Down)
    }
}

// ============================================================
// MATCH REPORT
// ============================================================

/// A pattern whose clauses all matched the current window
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub name: String,
    pub bias: Direction,
    /// Date labels of the last clause, one per tuple
    pub dates: Vec<String>,
}

impl fmt::Display for PatternMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, date) in self.dates.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{date}'")?;
        }
        if self.dates.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}

/// Comparison of the bullish and bearish tallies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No directional pattern matched
    NoPatterns,
    Rise,
    Fall,
    /// As many bullish as bearish patterns matched
    Tie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub outcome: Outcome,
    /// A neutral pattern matched and needs a manual look
    pub check: bool,
}

impl Summary {
    pub fn from_matches(matches: &[PatternMatch]) -> Self {
        let upward = matches.iter().filter(|m| m.bias.is_bullish()).count();
        let downward = matches.iter().filter(|m| m.bias.is_bearish()).count();
        let check = matches.iter().any(|m| m.bias == Direction::Neutral);

        let outcome = match (upward + downward, upward.cmp(&downward)) {
            (0, _) => Outcome::NoPatterns,
            (_, std::cmp::Ordering::Greater) => Outcome::Rise,
            (_, std::cmp::Ordering::Less) => Outcome::Fall,
            (_, std::cmp::Ordering::Equal) => Outcome::Tie,
        };

        Self { outcome, check }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = match self.outcome {
            Outcome::NoPatterns => None,
            Outcome::Rise => Some("RISE"),
            Outcome::Fall => Some("FALL"),
            Outcome::Tie => Some("NONE"),
        };
        match (self.check, verdict) {
            (true, Some(v)) => write!(f, "SUMMARY(CHECK/{v})"),
            (true, None) => f.write_str("SUMMARY(CHECK)"),
            (false, Some(v)) => write!(f, "SUMMARY({v})"),
            (false, None) => f.write_str("SUMMARY()"),
        }
    }
}

/// Result of one match attempt. `Display` renders the textual report.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub matches: Vec<PatternMatch>,
    pub summary: Summary,
}

impl MatchReport {
    pub const NOTHING_FOUND: &'static str = "No special candles or patterns found!";

    pub fn new(matches: Vec<PatternMatch>) -> Self {
        let summary = Summary::from_matches(&matches);
        Self { matches, summary }
    }

    /// Line index of the summary line; 0 when nothing matched.
    #[inline]
    pub fn summary_index(&self) -> usize {
        self.matches.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn into_parts(self) -> (usize, String) {
        (self.summary_index(), self.to_string())
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matches.is_empty() {
            return f.write_str(Self::NOTHING_FOUND);
        }
        for m in &self.matches {
            writeln!(f, "{m}")?;
        }
        write!(f, "{}", self.summary)
    }
}

// ============================================================
// PATTERN MATCHER
// ============================================================

/// Default window span
pub const DEFAULT_SPAN: usize = 5;

/// Owns the history window and runs the shared catalog on every new bar.
///
/// Calls must be serialized; the catalog itself can be shared freely.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    catalog: Arc<Catalog>,
    window: HistoryWindow,
    validate_data: bool,
}

impl PatternMatcher {
    /// Push `bar` into the window and evaluate every pattern.
    ///
    /// With `commit == false` the window is restored afterwards, so the call
    /// is a probe with no lasting effect.
    pub fn on_new_bar<T: OHLCV>(&mut self, bar: &T, commit: bool) -> Result<MatchReport> {
        if self.validate_data {
            bar.validate()?;
        }

        let evicted = self.window.push(CandleMetrics::from_bar(bar));
        let report = self.catalog.evaluate(&self.window);
        if !commit {
            self.window.rollback(evicted);
        }

        if !report.is_empty() {
            log::debug!("{} pattern(s) matched: {}", report.matches.len(), report.summary);
        }
        Ok(report)
    }

    /// Evaluate `bar` without keeping it in the window
    pub fn probe<T: OHLCV>(&mut self, bar: &T) -> Result<MatchReport> {
        self.on_new_bar(bar, false)
    }

    /// Evaluate the current window as-is
    pub fn scan(&self) -> MatchReport {
        self.catalog.evaluate(&self.window)
    }

    /// Commit every bar in order and collect one report per bar
    pub fn feed<T: OHLCV>(&mut self, bars: &[T]) -> Result<Vec<MatchReport>> {
        bars.iter().map(|bar| self.on_new_bar(bar, true)).collect()
    }

    #[inline]
    pub fn window(&self) -> &HistoryWindow {
        &self.window
    }

    #[inline]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`PatternMatcher`] instances
#[derive(Debug, Clone)]
pub struct MatcherBuilder {
    span: usize,
    validate_data: bool,
    default_catalog: bool,
    patterns: Vec<PatternSpec>,
    shared: Option<Arc<Catalog>>,
}

impl Default for MatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatcherBuilder {
    pub fn new() -> Self {
        Self {
            span: DEFAULT_SPAN,
            validate_data: false,
            default_catalog: false,
            patterns: Vec::new(),
            shared: None,
        }
    }

    pub fn from_config(config: MatcherConfig) -> Self {
        Self {
            span: config.span.get(),
            validate_data: config.validate_data,
            default_catalog: config.default_catalog,
            patterns: config.patterns,
            shared: None,
        }
    }

    /// Number of bars kept in the window
    pub fn span(mut self, span: usize) -> Self {
        self.span = span;
        self
    }

    /// Reject malformed and zero-range bars instead of matching them
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.validate_data = enable;
        self
    }

    /// Include the built-in pattern catalog
    pub fn with_default_catalog(mut self) -> Self {
        self.default_catalog = true;
        self
    }

    /// Add a pattern to be compiled at build time
    pub fn add_pattern(mut self, spec: PatternSpec) -> Self {
        self.patterns.push(spec);
        self
    }

    /// Use an already compiled catalog shared with other matchers
    pub fn catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.shared = Some(catalog);
        self
    }

    /// Build the matcher, seeding the window with the last `span` bars of `history`.
    pub fn build<T: OHLCV>(self, history: &[T]) -> Result<PatternMatcher> {
        let span = Period::new(self.span)?;

        let catalog = match self.shared {
            Some(shared) if self.patterns.is_empty() && !self.default_catalog => shared,
            Some(_) => {
                return Err(PatternError::InvalidConfig(
                    "a shared catalog cannot be extended with more patterns".to_string(),
                ))
            }
            None => {
                let mut specs = if self.default_catalog {
                    Catalog::builtin_specs()
                } else {
                    Vec::new()
                };
                specs.extend(self.patterns);
                Arc::new(Catalog::from_specs(&specs)?)
            }
        };

        let need = catalog.bars_required();
        if need > span.get() {
            return Err(PatternError::InsufficientData {
                need,
                got: span.get(),
            });
        }

        if self.validate_data {
            validate_bars(history)?;
        }
        let window = HistoryWindow::from_bars(span, history)?;

        log::debug!(
            "matcher ready: {} pattern(s), span {}",
            catalog.len(),
            span.get()
        );

        Ok(PatternMatcher {
            catalog,
            window,
            validate_data: self.validate_data,
        })
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Report produced at a given bar of an instrument's series
#[derive(Debug, Clone)]
pub struct BarReport {
    pub index: usize,
    pub report: MatchReport,
}

/// Result of replaying a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    /// Only bars where at least one pattern matched
    pub reports: Vec<BarReport>,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Replay several instruments in parallel over one shared catalog.
///
/// The first `config.span` bars of each series seed the window; every later
/// bar is committed in order.
pub fn scan_parallel<'a, T, I>(
    catalog: &Arc<Catalog>,
    config: &MatcherConfig,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            scan_instrument(catalog, config, bars)
                .map(|reports| ScanResult {
                    symbol: symbol.to_string(),
                    reports,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

fn scan_instrument<T: OHLCV>(
    catalog: &Arc<Catalog>,
    config: &MatcherConfig,
    bars: &[T],
) -> Result<Vec<BarReport>> {
    let span = config.span.get();
    if bars.len() < span {
        return Err(PatternError::InsufficientData {
            need: span,
            got: bars.len(),
        });
    }

    let (history, live) = bars.split_at(span);
    let mut matcher = MatcherBuilder::new()
        .span(span)
        .validate_data(config.validate_data)
        .catalog(Arc::clone(catalog))
        .build(history)?;

    let mut reports = Vec::new();
    let seed = matcher.scan();
    if !seed.is_empty() {
        reports.push(BarReport {
            index: span - 1,
            report: seed,
        });
    }
    for (offset, bar) in live.iter().enumerate() {
        let report = matcher.on_new_bar(bar, true)?;
        if !report.is_empty() {
            reports.push(BarReport {
                index: span + offset,
                report,
            });
        }
    }
    Ok(reports)
}

// ============================================================
// TESTS
// ============================================================

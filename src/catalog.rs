//! Compiled pattern catalogs and the built-in pattern set.

use crate::pattern::PatternDefinition;
use crate::window::HistoryWindow;
use crate::{Direction, MatchReport, PatternMatch, PatternSpec, Result};

use crate::Direction::{Bearish, Bullish, Neutral};

/// Built-in patterns, evaluated in this order.
///
/// The first Bearish Marubozu entry wants a long red body that also beats the
/// range of the three previous candles; the second accepts any strongly bodied
/// red candle.
const BUILTIN: &[(&str, Direction, &[&str])] = &[
    (
        "Bearish Marubozu",
        Bearish,
        &["(0, 0, 0, 0, $1), (0, 0, 0, 0, $2), (0, 0, 0, 0, $3), (-1, 0, >80, 0, >=max[$1;$2;$3])"],
    ),
    ("Bearish Marubozu", Bearish, &["(-1, 0, >=70, 0, 0)"]),
    (
        "Bullish Marubozu",
        Bullish,
        &["(0, 0, 0, 0, $1), (0, 0, 0, 0, $2), (0, 0, 0, 0, $3), (+1, 0, >80, 0, >=max[$1;$2;$3])"],
    ),
    (
        "Doji",
        Neutral,
        &["(0, 0, 0, 0, $1), (0, 0, 0, 0, $2), (0, 0, 0, 0, $3), (0, >20, <=5, >20, >=[[$1+$2+$3]/3])"],
    ),
    (
        "Evening Star",
        Bearish,
        &["($1, $3, $4, >$1), (0, >20, <=10, >20, 0), (>$2, 0, 0, $2|<[$3-[abs[$3-$4]/2]])"],
    ),
    (
        "Morning Star",
        Bullish,
        &["($1, $3, $4, <$1), (0, >20, <=10, >20, 0), (<$2, 0, 0, $2|>[$3-[abs[$3-$4]/2]])"],
    ),
    (
        "Hanging Man",
        Bearish,
        &[
            "(0,$2,$3,0), (0,>$2,0,0), (>$1,0,0,$1|<[$2-[abs[$2-$3]/2]])",
            "(+1), (-1, <=5, >5|x1, x3, 0), (0,0,0,0)",
        ],
    ),
    (
        "Hammer",
        Bullish,
        &[
            "(0,$2,$3,0), (0,0,<$3,0), (<$1,0,0,$1|>[$2-[abs[$2-$3]/2]])",
            "(-1), (0, <=5, >5|x1, x3, 0), (0,0,0,0)",
        ],
    ),
    (
        "Shooting Star",
        Bearish,
        &[
            "(0,$2,$3,0), (0,>$2,0,0), (>$1,0,0,$1|<[$2-[abs[$2-$3]/2]])",
            "(+1), (0, x3, >5|x1, <=5, 0), (0,0,0,0)",
        ],
    ),
    (
        "Inverted Hammer",
        Bullish,
        &[
            "(0,$2,$3,0), (0,0,<$3,0), (<$1,0,0,$1|>[$2-[abs[$2-$3]/2]])",
            "(-1), (+1, x3, >5|x1, <=5, 0), (0,0,0,0)",
        ],
    ),
    (
        "Bearish Engulfing",
        Bearish,
        &["(+1, 0, >=60, 0, xx1), (-1, 0, >80, 0, xx4)"],
    ),
    (
        "Bullish Engulfing",
        Bullish,
        &["(-1, 0, >=60, 0, xx1), (+1, 0, >80, 0, xx4)"],
    ),
    (
        "Tweezer Tops",
        Bearish,
        &[
            "(0,$1,$2,0), (0,>$1*0.9|<$1*1.1,>$2*0.9|<$2*1.1,0)",
            "(+1), (+1, $2|>=47.5, 0, <=5, $1), (-1, >$2*0.5|<$2*1.5|>=47.5, 0, <=5, >$1*0.5|<$1*1.5)",
        ],
    ),
    (
        "Tweezer Bottoms",
        Bullish,
        &[
            "(0,$1,$2,0), (0,>$1*0.9|<$1*1.1,>$2*0.9|<$2*1.1,0)",
            "(-1), (-1, <=5, 0, $2|>=47.5, $1), (+1, <=5, 0, >$2*0.5|<$2*1.5|>=47.5, >$1*0.5|<$1*1.5)",
        ],
    ),
    (
        "Three black crows",
        Bearish,
        &["(-1, 0, >=35, 0, xx1), (-1, 0, >60, 0, $1|xx2), (-1, 0, >80, 0, xx2|<$1*0.8)"],
    ),
    (
        "Three white soldiers",
        Bullish,
        &["(+1, 0, >=35, 0, xx1), (+1, 0, >60, 0, $1|xx2), (+1, 0, >80, 0, xx2|<$1*0.8)"],
    ),
];

/// Ordered, immutable set of compiled patterns.
///
/// Compile once and share behind an `Arc`; evaluation only reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    patterns: Vec<PatternDefinition>,
}

impl Catalog {
    pub fn new(patterns: Vec<PatternDefinition>) -> Self {
        Self { patterns }
    }

    /// Compile every spec, failing on the first invalid one.
    pub fn from_specs(specs: &[PatternSpec]) -> Result<Self> {
        let patterns = specs
            .iter()
            .map(PatternDefinition::from_spec)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(patterns))
    }

    /// The compiled built-in catalog
    pub fn builtin() -> Result<Self> {
        Self::from_specs(&Self::builtin_specs())
    }

    /// Source form of the built-in catalog, e.g. to extend it before compiling
    pub fn builtin_specs() -> Vec<PatternSpec> {
        BUILTIN
            .iter()
            .map(|&(name, bias, clauses)| PatternSpec {
                name: name.to_string(),
                bias,
                clauses: clauses.iter().map(|c| c.to_string()).collect(),
            })
            .collect()
    }

    #[inline]
    pub fn patterns(&self) -> &[PatternDefinition] {
        &self.patterns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatternDefinition> {
        self.patterns.iter()
    }

    /// Window length the longest clause needs
    pub fn bars_required(&self) -> usize {
        self.patterns
            .iter()
            .map(PatternDefinition::bars_required)
            .max()
            .unwrap_or(0)
    }

    /// Run every pattern against the window, in catalog order.
    pub fn evaluate(&self, window: &HistoryWindow) -> MatchReport {
        let matches = self
            .patterns
            .iter()
            .filter_map(|pattern| {
                pattern.matches(window).map(|dates| PatternMatch {
                    name: pattern.name().to_string(),
                    bias: pattern.bias(),
                    dates,
                })
            })
            .collect();
        MatchReport::new(matches)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a PatternDefinition;
    type IntoIter = std::slice::Iter<'a, PatternDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CandleMetrics, Outcome, PatternError, Period};

    fn window(bars: &[(f64, f64, f64, f64)]) -> HistoryWindow {
        let metrics = bars
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| CandleMetrics::new(i as i64 * 86_400, o, h, l, c, 1.0));
        HistoryWindow::new(Period::new(bars.len()).unwrap(), metrics).unwrap()
    }

    fn flat_then(last: (f64, f64, f64, f64)) -> HistoryWindow {
        let mut bars = vec![(100.0, 102.0, 98.0, 101.0); 4];
        bars.push(last);
        window(&bars)
    }

    #[test]
    fn test_builtin_compiles() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 16);
        assert_eq!(catalog.bars_required(), 5);
        assert_eq!(catalog.patterns()[0].name(), "Bearish Marubozu");
        assert_eq!(catalog.patterns()[1].name(), "Bearish Marubozu");
        assert_eq!(catalog.iter().last().unwrap().name(), "Three white soldiers");
    }

    #[test]
    fn test_flat_window_matches_nothing() {
        let catalog = Catalog::builtin().unwrap();
        let report = catalog.evaluate(&flat_then((100.0, 102.0, 98.0, 101.0)));
        assert!(report.is_empty());
        assert_eq!(report.summary.outcome, Outcome::NoPatterns);
    }

    #[test]
    fn test_bullish_marubozu() {
        let catalog = Catalog::builtin().unwrap();
        let report = catalog.evaluate(&flat_then((100.0, 105.5, 99.5, 105.0)));
        let names: Vec<&str> = report.matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Bullish Marubozu"]);
        assert_eq!(report.matches[0].dates.len(), 4);
        assert_eq!(report.matches[0].dates[3], "1970-01-05 00:00:00");
        assert_eq!(report.summary.outcome, Outcome::Rise);
    }

    #[test]
    fn test_doji_is_neutral() {
        let catalog = Catalog::builtin().unwrap();
        let report = catalog.evaluate(&flat_then((100.0, 103.0, 97.0, 100.2)));
        let names: Vec<&str> = report.matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Doji"]);
        assert_eq!(report.summary.to_string(), "SUMMARY(CHECK)");
    }

    #[test]
    fn test_bullish_engulfing() {
        let catalog = Catalog::builtin().unwrap();
        // Red candle with a two-thirds body, then a green one four times its range.
        let report = catalog.evaluate(&window(&[
            (100.0, 102.0, 98.0, 101.0),
            (100.0, 102.0, 98.0, 101.0),
            (100.0, 102.0, 98.0, 101.0),
            (101.0, 101.5, 98.5, 99.0),
            (98.5, 111.0, 98.0, 110.5),
        ]));
        assert!(report
            .matches
            .iter()
            .any(|m| m.name == "Bullish Engulfing" && m.bias == Direction::Bullish));
        assert!(report.matches.iter().all(|m| m.bias != Direction::Bearish));
    }

    #[test]
    fn test_invalid_spec_is_rejected() {
        let specs = vec![PatternSpec {
            name: "Broken".to_string(),
            bias: Direction::Neutral,
            clauses: vec!["(0,0)".to_string()],
        }];
        assert!(matches!(
            Catalog::from_specs(&specs),
            Err(PatternError::InvalidArity { arity: 2, .. })
        ));
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::default();
        assert!(catalog.is_empty());
        assert_eq!(catalog.bars_required(), 0);
        let report = catalog.evaluate(&flat_then((100.0, 105.5, 99.5, 105.0)));
        assert_eq!(report.summary_index(), 0);
    }
}

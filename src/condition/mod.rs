//! Condition atoms: the individual slots of a pattern tuple.
//!
//! An atom is one or more `|`-separated parts. Each part plays a single role,
//! picked from its first one or two characters in this order:
//!
//! | prefix | role |
//! |--------|------|
//! | `<=` `>=` `==` `!=` | relational bound, right-hand side kept as text |
//! | `xx` | inter-candle multiplier factor |
//! | `<` `>` | strict relational bound |
//! | `x` | intra-candle multiplier factor |
//! | `$` | pointer definition (`$1`, `$2`, ...) |
//! | none | literal value |
//!
//! Brackets are sugar: `[` and `]` stand for parentheses and `;` for the
//! argument separator, so `>=max[$1;$2;$3]` reads `>= max($1,$2,$3)`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub mod eval;

pub use eval::EvalError;

/// Pointer name -> observed value, for one match attempt
pub type Bindings = HashMap<String, f64>;

/// Problems found while parsing a single atom
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AtomError {
    #[error("empty atom")]
    Empty,

    #[error("`{0}` is not a number")]
    InvalidNumber(String),

    #[error("`{0}` is not a pointer name, expected `$` followed by digits")]
    InvalidPointer(String),
}

// ============================================================
// COMPILED FORM
// ============================================================

/// Relational right-hand sides, evaluated lazily at comparison time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    pub le: Option<String>,
    pub ge: Option<String>,
    pub eq: Option<String>,
    pub ne: Option<String>,
    pub lt: Option<String>,
    pub gt: Option<String>,
}

impl Bounds {
    fn iter_mut(&mut self) -> impl Iterator<Item = &mut String> {
        [
            &mut self.le,
            &mut self.ge,
            &mut self.eq,
            &mut self.ne,
            &mut self.lt,
            &mut self.gt,
        ]
        .into_iter()
        .flatten()
    }
}

/// One parsed constraint atom. Immutable once compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionExpression {
    raw: String,
    literal: Option<f64>,
    bounds: Bounds,
    pointer: Option<String>,
    intra: Option<f64>,
    inter: Option<f64>,
}

impl ConditionExpression {
    pub fn parse(text: &str) -> Result<Self, AtomError> {
        let raw = text.trim();
        if raw.is_empty() {
            return Err(AtomError::Empty);
        }

        let mut expr = Self {
            raw: raw.to_string(),
            literal: None,
            bounds: Bounds::default(),
            pointer: None,
            intra: None,
            inter: None,
        };

        for part in raw.split('|') {
            let part = part.trim();
            if !part.is_empty() {
                expr.parse_part(&normalize(part))?;
            }
        }

        Ok(expr)
    }

    fn parse_part(&mut self, part: &str) -> Result<(), AtomError> {
        let rhs = |s: &str| Some(s.trim().to_string());

        if let Some(s) = part.strip_prefix("<=") {
            self.bounds.le = rhs(s);
        } else if let Some(s) = part.strip_prefix(">=") {
            self.bounds.ge = rhs(s);
        } else if let Some(s) = part.strip_prefix("==") {
            self.bounds.eq = rhs(s);
        } else if let Some(s) = part.strip_prefix("!=") {
            self.bounds.ne = rhs(s);
        } else if let Some(s) = part.strip_prefix("xx") {
            self.inter = Some(parse_number(s)?);
        } else if let Some(s) = part.strip_prefix('<') {
            self.bounds.lt = rhs(s);
        } else if let Some(s) = part.strip_prefix('>') {
            self.bounds.gt = rhs(s);
        } else if let Some(s) = part.strip_prefix('x') {
            self.intra = Some(parse_number(s)?);
        } else if let Some(digits) = part.strip_prefix('$') {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AtomError::InvalidPointer(part.to_string()));
            }
            self.pointer = Some(part.to_string());
        } else {
            self.literal = Some(parse_number(part)?);
        }
        Ok(())
    }

    /// Atom text as written, trimmed
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn literal(&self) -> Option<f64> {
        self.literal
    }

    #[inline]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Name this atom binds its observed value to, e.g. `$2`
    #[inline]
    pub fn pointer(&self) -> Option<&str> {
        self.pointer.as_deref()
    }

    #[inline]
    pub fn intra_multiplier(&self) -> Option<f64> {
        self.intra
    }

    #[inline]
    pub fn inter_multiplier(&self) -> Option<f64> {
        self.inter
    }

    /// Compare without any resolution; placeholders stay unbound.
    pub fn compare(&self, observed: f64, checkzero: bool) -> bool {
        ResolvedCondition::from(self).compare(observed, checkzero)
    }
}

impl FromStr for ConditionExpression {
    type Err = AtomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConditionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn normalize(part: &str) -> String {
    part.replace('[', "(").replace(']', ")").replace(';', ",")
}

fn parse_number(s: &str) -> Result<f64, AtomError> {
    let s = s.trim();
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AtomError::InvalidNumber(s.to_string()))
}

// ============================================================
// WORKING COPY
// ============================================================

/// Multiplier state within one match attempt.
///
/// A factor is folded into a lower bound at most once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Multiplier {
    Pending(f64),
    Folded,
}

impl Multiplier {
    /// A pending factor of exactly 1 anchors the fold on its own slot.
    #[inline]
    pub fn is_root(self) -> bool {
        matches!(self, Multiplier::Pending(f) if f == 1.0)
    }

    /// Consume the factor, leaving the multiplier folded.
    #[inline]
    pub fn take(&mut self) -> Option<f64> {
        match std::mem::replace(self, Multiplier::Folded) {
            Multiplier::Pending(f) => Some(f),
            Multiplier::Folded => None,
        }
    }
}

/// Per-attempt copy of a [`ConditionExpression`] with pointers substituted
/// and multiplier floors applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCondition {
    pub bounds: Bounds,
    /// Lower bound raised by multiplier folds, checked together with `ge`
    pub ge_floor: Option<f64>,
    pub literal: Option<f64>,
    pub intra: Option<Multiplier>,
    pub inter: Option<Multiplier>,
}

impl From<&ConditionExpression> for ResolvedCondition {
    fn from(expr: &ConditionExpression) -> Self {
        Self {
            bounds: expr.bounds.clone(),
            ge_floor: None,
            literal: expr.literal,
            intra: expr.intra.map(Multiplier::Pending),
            inter: expr.inter.map(Multiplier::Pending),
        }
    }
}

impl ResolvedCondition {
    /// Replace bound placeholders in every relational right-hand side.
    pub fn substitute(&mut self, bindings: &Bindings) {
        if bindings.is_empty() {
            return;
        }
        for rhs in self.bounds.iter_mut() {
            if rhs.contains('$') {
                *rhs = eval::substitute(rhs, bindings);
            }
        }
    }

    /// Raise the lower bound to at least `floor`.
    pub fn raise_floor(&mut self, floor: f64) {
        self.ge_floor = Some(self.ge_floor.map_or(floor, |current| current.max(floor)));
    }

    /// Check `observed` against every constraint, stopping at the first miss.
    ///
    /// Order: `le`, `ge`, `eq`, `ne`, `lt`, `gt`, literal. A literal of 0 is a
    /// wildcard unless `checkzero` is set (trend tuples, where 0 means ranging).
    pub fn compare(&self, observed: f64, checkzero: bool) -> bool {
        let b = &self.bounds;
        holds(&b.le, |rhs| observed <= rhs)
            && holds(&b.ge, |rhs| observed >= rhs)
            && self.ge_floor.map_or(true, |floor| observed >= floor)
            && holds(&b.eq, |rhs| observed == rhs)
            && holds(&b.ne, |rhs| observed != rhs)
            && holds(&b.lt, |rhs| observed < rhs)
            && holds(&b.gt, |rhs| observed > rhs)
            && match self.literal {
                None => true,
                Some(v) if v == 0.0 && !checkzero => true,
                Some(v) => observed == v,
            }
    }
}

fn holds(rhs: &Option<String>, test: impl FnOnce(f64) -> bool) -> bool {
    let Some(expr) = rhs else {
        return true;
    };
    match eval::evaluate(expr) {
        Ok(value) => test(value),
        Err(err) => {
            log::trace!("constraint `{expr}` treated as unsatisfied: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roles() {
        let e = ConditionExpression::parse(">=max[$1;$2;$3]").unwrap();
        assert_eq!(e.bounds().ge.as_deref(), Some("max($1,$2,$3)"));
        assert!(e.literal().is_none());

        let e = ConditionExpression::parse("<=5").unwrap();
        assert_eq!(e.bounds().le.as_deref(), Some("5"));

        let e = ConditionExpression::parse(">80").unwrap();
        assert_eq!(e.bounds().gt.as_deref(), Some("80"));

        let e = ConditionExpression::parse("xx4").unwrap();
        assert_eq!(e.inter_multiplier(), Some(4.0));
        assert!(e.intra_multiplier().is_none());

        let e = ConditionExpression::parse("x3").unwrap();
        assert_eq!(e.intra_multiplier(), Some(3.0));

        let e = ConditionExpression::parse("$1").unwrap();
        assert_eq!(e.pointer(), Some("$1"));

        let e = ConditionExpression::parse("+1").unwrap();
        assert_eq!(e.literal(), Some(1.0));

        let e = ConditionExpression::parse("-1").unwrap();
        assert_eq!(e.literal(), Some(-1.0));
    }

    #[test]
    fn test_parse_compound_atom() {
        let e = ConditionExpression::parse("$2|<[$3-[abs[$3-$4]/2]]").unwrap();
        assert_eq!(e.pointer(), Some("$2"));
        assert_eq!(e.bounds().lt.as_deref(), Some("$3-(abs($3-$4)/2)"));

        let e = ConditionExpression::parse(">$2*0.5|<$2*1.5|>=47.5").unwrap();
        assert_eq!(e.bounds().gt.as_deref(), Some("$2*0.5"));
        assert_eq!(e.bounds().lt.as_deref(), Some("$2*1.5"));
        assert_eq!(e.bounds().ge.as_deref(), Some("47.5"));

        let e = ConditionExpression::parse(">5|x1").unwrap();
        assert_eq!(e.bounds().gt.as_deref(), Some("5"));
        assert_eq!(e.intra_multiplier(), Some(1.0));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ConditionExpression::parse("  "), Err(AtomError::Empty));
        assert!(matches!(
            ConditionExpression::parse("abc"),
            Err(AtomError::InvalidNumber(_))
        ));
        assert!(matches!(
            ConditionExpression::parse("x"),
            Err(AtomError::InvalidNumber(_))
        ));
        assert!(matches!(
            ConditionExpression::parse("$a"),
            Err(AtomError::InvalidPointer(_))
        ));
    }

    #[test]
    fn test_malformed_rhs_parses_but_never_holds() {
        let e = ConditionExpression::parse(">=foo(1)").unwrap();
        assert!(!e.compare(100.0, false));
    }

    #[test]
    fn test_raw_text_round_trip() {
        let e: ConditionExpression = "  $2|>=47.5 ".parse().unwrap();
        assert_eq!(e.raw(), "$2|>=47.5");
        assert_eq!(e.to_string(), "$2|>=47.5");
    }

    #[test]
    fn test_compare_bounds() {
        let e = ConditionExpression::parse(">20").unwrap();
        assert!(e.compare(20.5, false));
        assert!(!e.compare(20.0, false));

        let e = ConditionExpression::parse("<=5").unwrap();
        assert!(e.compare(5.0, false));
        assert!(!e.compare(5.1, false));

        let e = ConditionExpression::parse("!=3").unwrap();
        assert!(!e.compare(3.0, false));

        let e = ConditionExpression::parse("==[1+2]").unwrap();
        assert!(e.compare(3.0, false));
    }

    #[test]
    fn test_literal_zero_semantics() {
        let zero = ConditionExpression::parse("0").unwrap();
        assert!(zero.compare(37.2, false));
        assert!(zero.compare(-1.0, false));
        assert!(zero.compare(0.0, true));
        assert!(!zero.compare(1.0, true));
        assert!(!zero.compare(-1.0, true));

        let up = ConditionExpression::parse("+1").unwrap();
        assert!(up.compare(1.0, false));
        assert!(!up.compare(-1.0, false));
    }

    #[test]
    fn test_unbound_placeholder_fails_softly() {
        let e = ConditionExpression::parse(">=max[$1;$2;$3]").unwrap();
        assert!(!e.compare(100.0, false));
    }

    #[test]
    fn test_substitute_and_floor() {
        let e = ConditionExpression::parse(">$1*0.9|<$1*1.1").unwrap();
        let mut r = ResolvedCondition::from(&e);
        let mut bindings = Bindings::new();
        bindings.insert("$1".to_string(), 100.0);
        r.substitute(&bindings);
        assert_eq!(r.bounds.gt.as_deref(), Some("100*0.9"));
        assert!(r.compare(105.0, false));
        assert!(!r.compare(111.0, false));

        r.raise_floor(104.0);
        r.raise_floor(102.0);
        assert_eq!(r.ge_floor, Some(104.0));
        assert!(!r.compare(103.0, false));
        assert!(r.compare(104.0, false));
    }

    #[test]
    fn test_multiplier_take_once() {
        let mut m = Multiplier::Pending(1.0);
        assert!(m.is_root());
        assert_eq!(m.take(), Some(1.0));
        assert_eq!(m, Multiplier::Folded);
        assert_eq!(m.take(), None);
        assert!(!Multiplier::Pending(2.0).is_root());
    }
}

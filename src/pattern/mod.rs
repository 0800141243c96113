//! Pattern definitions and the clause compiler.
//!
//! A clause is written as comma-joined tuples, oldest candle first:
//!
//! ```text
//! (0, 0, 0, 0, $1), (0, 0, 0, 0, $2), (0, 0, 0, 0, $3), (+1, 0, >80, 0, >=max[$1;$2;$3])
//! ```
//!
//! The number of atoms in a tuple selects what its slots observe, see
//! [`TupleShape`].

use pest::Parser;

use crate::condition::ConditionExpression;
use crate::grammar::{PatternGrammar, Rule};
use crate::window::HistoryWindow;
use crate::{Direction, PatternError, PatternSpec, Result};

pub mod resolve;

/// What the slots of a tuple observe, selected by its arity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TupleShape {
    /// 1: trend of three consecutive bars (-1, 0, +1)
    Trend,
    /// 4: open, high, low, close
    Ohlc,
    /// 5: sign, upper shadow %, body %, lower shadow %, range
    Proportions,
    /// 8: open, high, low, close, upper shadow %, body %, lower shadow %, range
    OhlcProportions,
    /// 9: sign, open, high, low, close, upper shadow, body, lower shadow, range
    Full,
}

impl TupleShape {
    pub fn from_arity(arity: usize) -> Option<Self> {
        match arity {
            1 => Some(TupleShape::Trend),
            4 => Some(TupleShape::Ohlc),
            5 => Some(TupleShape::Proportions),
            8 => Some(TupleShape::OhlcProportions),
            9 => Some(TupleShape::Full),
            _ => None,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            TupleShape::Trend => 1,
            TupleShape::Ohlc => 4,
            TupleShape::Proportions => 5,
            TupleShape::OhlcProportions => 8,
            TupleShape::Full => 9,
        }
    }

    #[inline]
    pub fn is_trend(self) -> bool {
        matches!(self, TupleShape::Trend)
    }

    /// Bars consumed from the window
    #[inline]
    pub fn bars(self) -> usize {
        if self.is_trend() {
            3
        } else {
            1
        }
    }
}

/// One candle or trend descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    shape: TupleShape,
    atoms: Vec<ConditionExpression>,
}

impl Tuple {
    #[inline]
    pub fn shape(&self) -> TupleShape {
        self.shape
    }

    #[inline]
    pub fn atoms(&self) -> &[ConditionExpression] {
        &self.atoms
    }
}

/// AND-group of tuples, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    text: String,
    tuples: Vec<Tuple>,
}

impl Clause {
    /// Compile clause text. `pattern` only labels errors.
    pub fn compile(pattern: &str, text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PatternError::EmptyClause {
                pattern: pattern.to_string(),
            });
        }

        let malformed = |message: String| PatternError::MalformedClause {
            pattern: pattern.to_string(),
            clause: text.to_string(),
            message,
        };

        let clause = PatternGrammar::parse(Rule::clause, text)
            .map_err(|e| malformed(e.to_string()))?
            .next()
            .ok_or_else(|| malformed("no tuples".to_string()))?;

        let mut tuples = Vec::new();
        let mut seen_candle = false;

        for tuple in clause.into_inner().filter(|p| p.as_rule() == Rule::tuple) {
            let mut atoms = Vec::new();
            for atom in tuple.into_inner() {
                let raw = atom.as_str();
                let parsed = ConditionExpression::parse(raw).map_err(|source| {
                    PatternError::InvalidAtom {
                        pattern: pattern.to_string(),
                        atom: raw.trim().to_string(),
                        source,
                    }
                })?;
                atoms.push(parsed);
            }

            let shape =
                TupleShape::from_arity(atoms.len()).ok_or_else(|| PatternError::InvalidArity {
                    pattern: pattern.to_string(),
                    arity: atoms.len(),
                })?;

            if shape.is_trend() {
                if seen_candle {
                    return Err(PatternError::TrendAfterCandle {
                        pattern: pattern.to_string(),
                    });
                }
            } else {
                seen_candle = true;
            }

            tuples.push(Tuple { shape, atoms });
        }

        if !seen_candle {
            return Err(PatternError::NoCandleTuple {
                pattern: pattern.to_string(),
            });
        }

        Ok(Self {
            text: text.to_string(),
            tuples,
        })
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    /// Window length this clause needs
    pub fn bars_required(&self) -> usize {
        self.tuples.iter().map(|t| t.shape.bars()).sum()
    }
}

/// A named pattern: every clause must match for the pattern to register.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternDefinition {
    name: String,
    bias: Direction,
    clauses: Vec<Clause>,
}

impl PatternDefinition {
    pub fn compile<S: AsRef<str>>(
        name: impl Into<String>,
        bias: Direction,
        clauses: &[S],
    ) -> Result<Self> {
        let name = name.into();
        if clauses.is_empty() {
            return Err(PatternError::EmptyPattern { pattern: name });
        }

        let clauses = clauses
            .iter()
            .map(|text| Clause::compile(&name, text.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        log::debug!("compiled pattern `{}` ({} clause(s))", name, clauses.len());
        Ok(Self {
            name,
            bias,
            clauses,
        })
    }

    pub fn from_spec(spec: &PatternSpec) -> Result<Self> {
        Self::compile(spec.name.clone(), spec.bias, &spec.clauses)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn bias(&self) -> Direction {
        self.bias
    }

    #[inline]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn bars_required(&self) -> usize {
        self.clauses
            .iter()
            .map(Clause::bars_required)
            .max()
            .unwrap_or(0)
    }

    /// Match every clause in order, stopping at the first that fails.
    ///
    /// Returns the date labels of the last clause.
    pub fn matches(&self, window: &HistoryWindow) -> Option<Vec<String>> {
        let mut labels = None;
        for (i, clause) in self.clauses.iter().enumerate() {
            match resolve::match_clause(clause, window) {
                Some(found) => labels = Some(found),
                None => {
                    log::trace!("`{}`: clause {} did not match", self.name, i);
                    return None;
                }
            }
        }
        labels
    }
}

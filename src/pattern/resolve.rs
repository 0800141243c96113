//! Reference resolution for one match attempt.
//!
//! Given a compiled clause and the window, [`observe`] pulls the concrete value
//! behind every slot, then [`resolve`] builds a fresh working copy of the atoms:
//!
//! 1. every pointer (`$n`) is bound to its slot's observed value and substituted
//!    into all relational right-hand sides of the clause;
//! 2. the first inter-candle multiplier root (`xx1`) raises the lower bound of
//!    every other `xx` atom in the clause to `root value * factor`;
//! 3. likewise for intra-candle roots (`x1`), within their own tuple only.
//!
//! [`ResolvedClause::evaluate`] then compares tuple by tuple, slot by slot, and
//! stops at the first atom that does not hold. The compiled clause is never
//! touched.

use crate::condition::{Bindings, Multiplier, ResolvedCondition};
use crate::pattern::{Clause, TupleShape};
use crate::window::HistoryWindow;
use crate::{CandleMetrics, Trend};

/// Observed values for one tuple, one per slot, plus its date label
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub values: Vec<f64>,
    /// Bar date for candle tuples, `start--end` for trend tuples
    pub label: String,
}

impl Observation {
    fn candle(shape: TupleShape, bar: &CandleMetrics) -> Self {
        let sign = f64::from(bar.sign);
        let values = match shape {
            TupleShape::Ohlc => vec![bar.open, bar.high, bar.low, bar.close],
            TupleShape::Proportions => vec![
                sign,
                bar.upper_shadow_pct(),
                bar.body_pct(),
                bar.lower_shadow_pct(),
                bar.range,
            ],
            TupleShape::OhlcProportions => vec![
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.upper_shadow_pct(),
                bar.body_pct(),
                bar.lower_shadow_pct(),
                bar.range,
            ],
            TupleShape::Full => vec![
                sign,
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.upper_shadow,
                bar.body,
                bar.lower_shadow,
                bar.range,
            ],
            TupleShape::Trend => vec![f64::from(bar.sign)],
        };
        Self {
            values,
            label: bar.datetime(),
        }
    }

    fn trend(bars: [&CandleMetrics; 3]) -> Self {
        let trend = Trend::classify(bars);
        Self {
            values: vec![f64::from(trend.sign())],
            label: format!("{}--{}", bars[0].datetime(), bars[2].datetime()),
        }
    }
}

/// Assign window bars to the clause's tuples, newest tuple to newest bar.
///
/// Returns `None` when the window is too short for the clause.
pub fn observe(clause: &Clause, window: &HistoryWindow) -> Option<Vec<Observation>> {
    let mut offset = 0;
    let mut observations = Vec::with_capacity(clause.tuples().len());

    for tuple in clause.tuples().iter().rev() {
        let shape = tuple.shape();
        let observation = if shape.is_trend() {
            Observation::trend([
                window.back(offset + 2)?,
                window.back(offset + 1)?,
                window.back(offset)?,
            ])
        } else {
            Observation::candle(shape, window.back(offset)?)
        };
        offset += shape.bars();
        observations.push(observation);
    }

    observations.reverse();
    Some(observations)
}

/// Pointer bindings of a clause. The first definition of a name wins.
pub fn bindings(clause: &Clause, observations: &[Observation]) -> Bindings {
    let mut bindings = Bindings::new();
    for (tuple, observation) in clause.tuples().iter().zip(observations) {
        for (atom, value) in tuple.atoms().iter().zip(&observation.values) {
            if let Some(name) = atom.pointer() {
                bindings.entry(name.to_string()).or_insert(*value);
            }
        }
    }
    bindings
}

/// Working copy of one tuple
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTuple {
    pub shape: TupleShape,
    pub observation: Observation,
    pub atoms: Vec<ResolvedCondition>,
}

/// Working copy of one clause, ready for evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClause {
    pub tuples: Vec<ResolvedTuple>,
}

/// Build the resolved working copy of `clause` for the given observations.
pub fn resolve(clause: &Clause, observations: Vec<Observation>) -> ResolvedClause {
    let bindings = bindings(clause, &observations);

    let tuples = clause
        .tuples()
        .iter()
        .zip(observations)
        .map(|(tuple, observation)| {
            let atoms = tuple
                .atoms()
                .iter()
                .map(|atom| {
                    let mut resolved = ResolvedCondition::from(atom);
                    resolved.substitute(&bindings);
                    resolved
                })
                .collect();
            ResolvedTuple {
                shape: tuple.shape(),
                observation,
                atoms,
            }
        })
        .collect();

    let mut resolved = ResolvedClause { tuples };
    resolved.fold_inter();
    resolved.fold_intra();
    resolved
}

fn inter_of(atom: &mut ResolvedCondition) -> &mut Option<Multiplier> {
    &mut atom.inter
}

fn intra_of(atom: &mut ResolvedCondition) -> &mut Option<Multiplier> {
    &mut atom.intra
}

/// Fold pending factors of one kind against the first root among `slots`.
fn fold(
    mut slots: Vec<(&mut ResolvedCondition, f64)>,
    select: fn(&mut ResolvedCondition) -> &mut Option<Multiplier>,
) {
    let Some(root) = slots
        .iter_mut()
        .position(|(atom, _)| select(atom).is_some_and(Multiplier::is_root))
    else {
        return;
    };
    let basis = slots[root].1;

    for (i, (atom, _)) in slots.iter_mut().enumerate() {
        let factor = select(atom).as_mut().and_then(Multiplier::take);
        if let Some(factor) = factor {
            if i != root {
                atom.raise_floor(basis * factor);
            }
        }
    }
}

impl ResolvedClause {
    /// Apply the inter-candle root to every `xx` atom of the clause.
    pub fn fold_inter(&mut self) {
        let slots = self
            .tuples
            .iter_mut()
            .flat_map(|ResolvedTuple { atoms, observation, .. }| {
                atoms.iter_mut().zip(observation.values.iter().copied())
            })
            .collect();
        fold(slots, inter_of);
    }

    /// Apply each tuple's intra-candle root to the `x` atoms of that tuple.
    pub fn fold_intra(&mut self) {
        for ResolvedTuple {
            atoms, observation, ..
        } in &mut self.tuples
        {
            let slots = atoms
                .iter_mut()
                .zip(observation.values.iter().copied())
                .collect();
            fold(slots, intra_of);
        }
    }

    /// Position `(tuple, atom)` of the first atom that does not hold.
    pub fn first_failure(&self) -> Option<(usize, usize)> {
        for (t, tuple) in self.tuples.iter().enumerate() {
            let checkzero = tuple.shape.is_trend();
            let slots = tuple.atoms.iter().zip(&tuple.observation.values);
            for (a, (atom, value)) in slots.enumerate() {
                if !atom.compare(*value, checkzero) {
                    return Some((t, a));
                }
            }
        }
        None
    }

    /// Date labels of every tuple, oldest first
    pub fn labels(&self) -> Vec<String> {
        self.tuples
            .iter()
            .map(|t| t.observation.label.clone())
            .collect()
    }

    /// Labels on success, `None` at the first failing atom.
    pub fn evaluate(&self) -> Option<Vec<String>> {
        match self.first_failure() {
            Some((tuple, atom)) => {
                log::trace!("clause failed at tuple {tuple}, atom {atom}");
                None
            }
            None => Some(self.labels()),
        }
    }
}

/// Observe, resolve and evaluate one clause against the window.
pub fn match_clause(clause: &Clause, window: &HistoryWindow) -> Option<Vec<String>> {
    let Some(observations) = observe(clause, window) else {
        log::warn!(
            "window of {} bar(s) too short for clause `{}`",
            window.len(),
            clause.text()
        );
        return None;
    };
    resolve(clause, observations).evaluate()
}

//! Fixed-length history of derived candle records.

use std::collections::VecDeque;

use crate::{CandleMetrics, PatternError, Period, Result, OHLCV};

/// The most recent `span` bars, oldest first.
///
/// The length never changes after construction: every push evicts the oldest
/// entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    span: Period,
    bars: VecDeque<CandleMetrics>,
}

impl HistoryWindow {
    /// Keep the last `span` entries of `metrics`.
    pub fn new(span: Period, metrics: impl IntoIterator<Item = CandleMetrics>) -> Result<Self> {
        let mut bars: VecDeque<CandleMetrics> = metrics.into_iter().collect();
        let need = span.get();
        if bars.len() < need {
            return Err(PatternError::InsufficientData {
                need,
                got: bars.len(),
            });
        }
        let excess = bars.len() - need;
        bars.drain(..excess);
        Ok(Self { span, bars })
    }

    pub fn from_bars<T: OHLCV>(span: Period, bars: &[T]) -> Result<Self> {
        Self::new(span, bars.iter().map(CandleMetrics::from_bar))
    }

    #[inline]
    pub fn span(&self) -> Period {
        self.span
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bar at `index`, counted from the oldest
    #[inline]
    pub fn get(&self, index: usize) -> Option<&CandleMetrics> {
        self.bars.get(index)
    }

    /// Bar `offset` positions back from the newest (0 = newest)
    #[inline]
    pub fn back(&self, offset: usize) -> Option<&CandleMetrics> {
        let index = self.bars.len().checked_sub(offset + 1)?;
        self.bars.get(index)
    }

    #[inline]
    pub fn latest(&self) -> Option<&CandleMetrics> {
        self.bars.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CandleMetrics> + ExactSizeIterator {
        self.bars.iter()
    }

    /// Append `bar`, evicting and returning the oldest entry.
    pub fn push(&mut self, bar: CandleMetrics) -> Option<CandleMetrics> {
        let evicted = self.bars.pop_front();
        self.bars.push_back(bar);
        evicted
    }

    /// Undo the last [`push`](Self::push), given what it evicted.
    pub fn rollback(&mut self, evicted: Option<CandleMetrics>) {
        self.bars.pop_back();
        if let Some(bar) = evicted {
            self.bars.push_front(bar);
        }
    }
}

impl<'a> IntoIterator for &'a HistoryWindow {
    type Item = &'a CandleMetrics;
    type IntoIter = std::collections::vec_deque::Iter<'a, CandleMetrics>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

//! Daily count series shared by the imputers and the estimator.
//!
//! A series always covers a contiguous run of days, so time indices are
//! increasing and unique by construction, and gaps are stored as zeros.

use std::collections::BTreeMap;

use crate::error::{RtError, RtResult};

#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceSeries {
    name: String,
    start_day: usize,
    counts: Vec<f64>,
}

impl IncidenceSeries {
    /// Builds a series from consecutive daily counts. Missing (NaN) or
    /// negative entries are stored as zero.
    pub fn from_counts(name: &str, start_day: usize, mut counts: Vec<f64>) -> Self {
        let mut replaced = 0usize;
        for count in counts.iter_mut() {
            if !count.is_finite() || *count < 0.0 {
                *count = 0.0;
                replaced += 1;
            }
        }
        if replaced > 0 {
            tracing::debug!(
                series = name,
                replaced,
                "normalized missing or negative counts to zero"
            );
        }
        Self {
            name: name.to_string(),
            start_day,
            counts,
        }
    }

    /// Builds a series from `(day, count)` pairs in any order. `None` counts
    /// and days between the first and last pair become zero.
    pub fn from_pairs(name: &str, pairs: &[(usize, Option<f64>)]) -> RtResult<Self> {
        let mut by_day = BTreeMap::new();
        for &(day, count) in pairs {
            let count = count.filter(|c| !c.is_nan()).unwrap_or(0.0);
            if !count.is_finite() || count < 0.0 {
                return Err(RtError::InvalidSeries {
                    series: name.to_string(),
                    reason: format!("count {count} on day {day}"),
                });
            }
            if by_day.insert(day, count).is_some() {
                return Err(RtError::InvalidSeries {
                    series: name.to_string(),
                    reason: format!("day {day} appears twice"),
                });
            }
        }
        let (Some(&first), Some(&last)) = (by_day.keys().next(), by_day.keys().next_back()) else {
            return Ok(Self::zeros(name, 0, 0));
        };
        let mut counts = vec![0.0; last - first + 1];
        for (day, count) in by_day {
            counts[day - first] = count;
        }
        Ok(Self {
            name: name.to_string(),
            start_day: first,
            counts,
        })
    }

    pub fn zeros(name: &str, start_day: usize, len: usize) -> Self {
        Self {
            name: name.to_string(),
            start_day,
            counts: vec![0.0; len],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn start_day(&self) -> usize {
        self.start_day
    }

    /// Last day covered, `None` for an empty series.
    pub fn end_day(&self) -> Option<usize> {
        (!self.counts.is_empty()).then(|| self.start_day + self.counts.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Count on `day`, zero outside the covered range.
    pub fn get(&self, day: usize) -> f64 {
        day.checked_sub(self.start_day)
            .and_then(|i| self.counts.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn days(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| (self.start_day + i, count))
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    pub fn is_all_zero(&self) -> bool {
        self.counts.iter().all(|&c| c == 0.0)
    }

    /// Copy covering exactly `first..=last`, zero where this series has no data.
    pub fn restrict(&self, first: usize, last: usize) -> Self {
        let counts = if last < first {
            Vec::new()
        } else {
            (first..=last).map(|day| self.get(day)).collect()
        };
        Self {
            name: self.name.clone(),
            start_day: first,
            counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_fills_gaps_and_missing() {
        let s = IncidenceSeries::from_pairs(
            "cases",
            &[(5, Some(3.0)), (2, Some(1.0)), (4, None), (3, Some(f64::NAN))],
        )
        .unwrap();
        assert_eq!(s.start_day(), 2);
        assert_eq!(s.end_day(), Some(5));
        assert_eq!(s.counts(), &[1.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_from_pairs_rejects_duplicates() {
        let err = IncidenceSeries::from_pairs("cases", &[(1, Some(1.0)), (1, Some(2.0))]);
        assert!(matches!(err, Err(RtError::InvalidSeries { .. })));
    }

    #[test]
    fn test_from_pairs_rejects_negative() {
        assert!(IncidenceSeries::from_pairs("cases", &[(1, Some(-1.0))]).is_err());
    }

    #[test]
    fn test_from_counts_normalizes() {
        let s = IncidenceSeries::from_counts("x", 0, vec![1.0, f64::NAN, -2.0, 4.0]);
        assert_eq!(s.counts(), &[1.0, 0.0, 0.0, 4.0]);
        assert_eq!(s.total(), 5.0);
    }

    #[test]
    fn test_get_and_restrict() {
        let s = IncidenceSeries::from_counts("x", 3, vec![1.0, 2.0, 3.0]);
        assert_eq!(s.get(0), 0.0);
        assert_eq!(s.get(4), 2.0);
        assert_eq!(s.get(9), 0.0);
        let r = s.restrict(2, 4);
        assert_eq!(r.start_day(), 2);
        assert_eq!(r.counts(), &[0.0, 1.0, 2.0]);
        assert!(s.restrict(4, 3).is_empty());
    }

    #[test]
    fn test_empty() {
        let s = IncidenceSeries::from_pairs("x", &[]).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.end_day(), None);
        assert!(s.is_all_zero());
    }
}

//! Line ranges and coverage tracking.

use std::fmt;

/// A run of `count` lines starting at 1-based line `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    /// First line, 1-based.
    pub start: u32,
    /// Number of lines.
    pub count: u32,
}

impl LineRange {
    /// Create a range.
    #[must_use]
    pub const fn new(start: u32, count: u32) -> Self {
        Self { start, count }
    }

    /// One past the last line, saturating at `u32::MAX`.
    #[must_use]
    pub const fn end(self) -> u32 {
        self.start.saturating_add(self.count)
    }

    /// Last line in the range, if it is not empty.
    #[must_use]
    pub const fn last(self) -> Option<u32> {
        if self.count == 0 {
            None
        } else {
            self.start.checked_add(self.count - 1)
        }
    }

    /// Whether the range holds no lines.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.count == 0
    }

    /// Whether `line` falls inside the range.
    #[must_use]
    pub const fn contains(self, line: u32) -> bool {
        line >= self.start && line < self.end()
    }

    /// Iterate over the line numbers.
    pub fn lines(self) -> std::ops::Range<u32> {
        self.start..self.end()
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count {
            0 => write!(f, "{}+0", self.start),
            1 => write!(f, "{}", self.start),
            _ => write!(f, "{}-{}", self.start, self.end() - 1),
        }
    }
}

/// Why a set of ranges fails to partition `1..=N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoverageError {
    /// Lines `from..=to` belong to no range.
    #[error("lines {from}-{to} are not attributed")]
    Gap {
        /// First uncovered line.
        from: u32,
        /// Last uncovered line.
        to: u32,
    },

    /// A line belongs to more than one range.
    #[error("line {0} is attributed more than once")]
    Overlap(u32),
}

/// Final-file ranges and their matching original-file ranges, in the
/// order the parser discovered them.
#[derive(Debug, Clone, Default)]
pub struct RangeTracker {
    final_ranges: Vec<LineRange>,
    orig_ranges: Vec<LineRange>,
}

impl RangeTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` lines at `final_start` that came from `orig_start`.
    ///
    /// Extends the previous pair when both sides continue it.
    pub fn record(&mut self, final_start: u32, orig_start: u32, count: u32) {
        if count == 0 {
            return;
        }

        if let (Some(last_final), Some(last_orig)) =
            (self.final_ranges.last_mut(), self.orig_ranges.last_mut())
        {
            if last_final.end() == final_start && last_orig.end() == orig_start {
                last_final.count += count;
                last_orig.count += count;
                return;
            }
        }

        self.final_ranges.push(LineRange::new(final_start, count));
        self.orig_ranges.push(LineRange::new(orig_start, count));
    }

    /// Final-file ranges in discovery order.
    #[must_use]
    pub fn final_ranges(&self) -> &[LineRange] {
        &self.final_ranges
    }

    /// Original-file ranges, parallel to [`Self::final_ranges`].
    #[must_use]
    pub fn orig_ranges(&self) -> &[LineRange] {
        &self.orig_ranges
    }

    /// Total number of lines recorded, counting overlaps twice.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        self.final_ranges.iter().map(|r| r.count).sum()
    }

    /// Union of the final ranges, sorted and merged.
    #[must_use]
    pub fn coverage(&self) -> Vec<LineRange> {
        let mut sorted = self.final_ranges.clone();
        sorted.sort_by_key(|r| r.start);

        let mut merged: Vec<LineRange> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if range.start <= last.end() => {
                    let end = last.end().max(range.end());
                    last.count = end - last.start;
                }
                _ => merged.push(range),
            }
        }
        merged
    }

    /// Check that the final ranges cover `1..=N` exactly once and return N.
    ///
    /// # Errors
    /// Returns the first gap or overlap found, scanning by line number.
    pub fn validate(&self) -> Result<u32, CoverageError> {
        let mut sorted = self.final_ranges.clone();
        sorted.sort_by_key(|r| r.start);

        let mut next = 1;
        for range in sorted {
            if range.start > next {
                return Err(CoverageError::Gap {
                    from: next,
                    to: range.start - 1,
                });
            }
            if range.start < next {
                return Err(CoverageError::Overlap(range.start));
            }
            next = range.end();
        }
        Ok(next - 1)
    }
}

use similar::{DiffTag, TextDiff};
use std::ops::Range;
use std::time::Duration;

/// A contiguous run of differing lines, as 0-based line ranges per side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRange {
    pub old: Range<usize>,
    pub new: Range<usize>,
}

impl DiffRange {
    /// First line of the range on the new side, for scrolling a viewer
    pub fn anchor_line(&self) -> usize {
        self.new.start
    }
}

/// Line-level difference ranges between `old` and `new`, in order.
///
/// Adjacent delete/insert/replace operations are merged into one range.
/// With a deadline the diff may be coarser but always terminates.
pub fn compute_ranges(old: &str, new: &str, deadline: Option<Duration>) -> Vec<DiffRange> {
    let mut config = TextDiff::configure();
    if let Some(deadline) = deadline {
        config.timeout(deadline);
    }
    let diff = config.diff_lines(old, new);

    let mut ranges: Vec<DiffRange> = Vec::new();
    let mut open = false;
    for op in diff.ops() {
        if op.tag() == DiffTag::Equal {
            open = false;
            continue;
        }
        match ranges.last_mut() {
            Some(last) if open => {
                last.old.end = op.old_range().end;
                last.new.end = op.new_range().end;
            }
            _ => ranges.push(DiffRange {
                old: op.old_range(),
                new: op.new_range(),
            }),
        }
        open = true;
    }
    ranges
}

/// Unified diff text with the given headers
pub fn unified(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string()
}

/// Cursor over the difference ranges of a comparison.
///
/// `next` wraps from the last range to the first. `previous` stops at the
/// first range unless backward wrapping is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffNavigator {
    ranges: Vec<DiffRange>,
    current: usize,
    wrap_backward: bool,
}

impl DiffNavigator {
    pub fn new(ranges: Vec<DiffRange>, wrap_backward: bool) -> Self {
        Self {
            ranges,
            current: 0,
            wrap_backward,
        }
    }

    pub fn total(&self) -> usize {
        self.ranges.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_range(&self) -> Option<&DiffRange> {
        self.ranges.get(self.current)
    }

    pub fn ranges(&self) -> &[DiffRange] {
        &self.ranges
    }

    pub fn next(&mut self) -> Option<usize> {
        if self.ranges.is_empty() {
            return None;
        }
        self.current = if self.current + 1 >= self.ranges.len() {
            0
        } else {
            self.current + 1
        };
        Some(self.current)
    }

    pub fn previous(&mut self) -> Option<usize> {
        if self.ranges.is_empty() {
            return None;
        }
        self.current = match self.current {
            0 if self.wrap_backward => self.ranges.len() - 1,
            0 => 0,
            n => n - 1,
        };
        Some(self.current)
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }
}

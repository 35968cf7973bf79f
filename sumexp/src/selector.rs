//! Axis selectors and their resolution to label sequences.
//!
//! A [`Selector`] addresses part of one axis by label, position, boolean mask
//! or half-open range. [`Selector::resolve`] turns it into the ordered labels
//! it names, against the axis' current label sequence.
//!
//! ```
//! use sumexp::Selector;
//!
//! let axis: Vec<String> = ["g1", "g2", "g3"].iter().map(|s| s.to_string()).collect();
//! assert_eq!(Selector::from(-1isize).resolve(&axis).unwrap(), vec!["g3"]);
//! assert_eq!(Selector::from(1..).resolve(&axis).unwrap(), vec!["g2", "g3"]);
//! assert_eq!(Selector::from(vec!["g3", "g1"]).resolve(&axis).unwrap(), vec!["g3", "g1"]);
//! ```

use std::collections::HashMap;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use sumexp_core::{Result, SumExpError};

use crate::table::positions_of;

/// One element of a [`Selector::Items`] sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A literal label.
    Label(String),
    /// A position; negative values count from the end.
    Position(isize),
}

/// A closed set of ways to address an axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selector {
    /// The whole axis, in order.
    #[default]
    All,
    /// One literal label.
    Label(String),
    /// One position; negative values count from the end.
    Position(isize),
    /// A sequence of labels and positions, kept in the caller's order.
    /// Repeats are allowed.
    Items(Vec<Item>),
    /// A boolean mask the length of the axis.
    Mask(Vec<bool>),
    /// A half-open range with slice semantics: missing bounds default to the
    /// axis ends, negative bounds count from the end, and bounds clamp.
    Range {
        start: Option<isize>,
        stop: Option<isize>,
    },
}

impl Selector {
    /// Labels named by this selector, in selection order.
    pub fn resolve(&self, labels: &[String]) -> Result<Vec<String>> {
        Ok(self
            .resolve_positions(labels)?
            .into_iter()
            .map(|i| labels[i].clone())
            .collect())
    }

    /// Positions named by this selector, in selection order.
    pub fn resolve_positions(&self, labels: &[String]) -> Result<Vec<usize>> {
        let len = labels.len();
        match self {
            Selector::All => Ok((0..len).collect()),
            Selector::Label(label) => Ok(vec![label_position(&positions_of(labels), label)?]),
            Selector::Position(i) => Ok(vec![position(*i, len)?]),
            Selector::Items(items) => {
                let lookup = positions_of(labels);
                items
                    .iter()
                    .map(|item| match item {
                        Item::Label(label) => label_position(&lookup, label),
                        Item::Position(i) => position(*i, len),
                    })
                    .collect()
            }
            Selector::Mask(mask) => {
                if mask.len() != len {
                    return Err(SumExpError::DimensionMismatch {
                        expected: len,
                        found: mask.len(),
                    });
                }
                Ok(mask
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &keep)| keep.then_some(i))
                    .collect())
            }
            Selector::Range { start, stop } => {
                let lo = clamp_bound(start.unwrap_or(0), len);
                let hi = clamp_bound(stop.unwrap_or(len as isize), len);
                Ok((lo..hi.max(lo)).collect())
            }
        }
    }
}

fn label_position(lookup: &HashMap<&str, usize>, label: &str) -> Result<usize> {
    lookup
        .get(label)
        .copied()
        .ok_or_else(|| SumExpError::LabelNotFound(label.to_string()))
}

fn position(i: isize, len: usize) -> Result<usize> {
    let resolved = if i < 0 { i + len as isize } else { i };
    if resolved < 0 || resolved as usize >= len {
        return Err(SumExpError::IndexOutOfBounds { index: i, len });
    }
    Ok(resolved as usize)
}

/// Positions past `isize::MAX` stay out of range instead of wrapping into
/// from-the-end positions.
fn saturating_isize(i: usize) -> isize {
    isize::try_from(i).unwrap_or(isize::MAX)
}

fn clamp_bound(bound: isize, len: usize) -> usize {
    let len = len as isize;
    let b = if bound < 0 { bound + len } else { bound };
    b.clamp(0, len) as usize
}

impl From<&str> for Selector {
    fn from(label: &str) -> Self {
        Selector::Label(label.to_string())
    }
}

impl From<String> for Selector {
    fn from(label: String) -> Self {
        Selector::Label(label)
    }
}

impl From<usize> for Selector {
    fn from(i: usize) -> Self {
        Selector::Position(saturating_isize(i))
    }
}

impl From<isize> for Selector {
    fn from(i: isize) -> Self {
        Selector::Position(i)
    }
}

impl From<i32> for Selector {
    fn from(i: i32) -> Self {
        Selector::Position(i as isize)
    }
}

impl From<Vec<bool>> for Selector {
    fn from(mask: Vec<bool>) -> Self {
        Selector::Mask(mask)
    }
}

impl From<&[bool]> for Selector {
    fn from(mask: &[bool]) -> Self {
        Selector::Mask(mask.to_vec())
    }
}

impl From<Vec<&str>> for Selector {
    fn from(labels: Vec<&str>) -> Self {
        Selector::Items(labels.into_iter().map(|l| Item::Label(l.to_string())).collect())
    }
}

impl From<Vec<String>> for Selector {
    fn from(labels: Vec<String>) -> Self {
        Selector::Items(labels.into_iter().map(Item::Label).collect())
    }
}

impl From<&[String]> for Selector {
    fn from(labels: &[String]) -> Self {
        Selector::Items(labels.iter().cloned().map(Item::Label).collect())
    }
}

impl From<Vec<usize>> for Selector {
    fn from(positions: Vec<usize>) -> Self {
        Selector::Items(positions.into_iter().map(|i| Item::Position(saturating_isize(i))).collect())
    }
}

impl From<Vec<Item>> for Selector {
    fn from(items: Vec<Item>) -> Self {
        Selector::Items(items)
    }
}

impl From<Range<usize>> for Selector {
    fn from(r: Range<usize>) -> Self {
        Selector::Range {
            start: Some(saturating_isize(r.start)),
            stop: Some(saturating_isize(r.end)),
        }
    }
}

impl From<RangeFrom<usize>> for Selector {
    fn from(r: RangeFrom<usize>) -> Self {
        Selector::Range {
            start: Some(saturating_isize(r.start)),
            stop: None,
        }
    }
}

impl From<RangeTo<usize>> for Selector {
    fn from(r: RangeTo<usize>) -> Self {
        Selector::Range {
            start: None,
            stop: Some(saturating_isize(r.end)),
        }
    }
}

impl From<RangeFull> for Selector {
    fn from(_: RangeFull) -> Self {
        Selector::All
    }
}

impl From<&str> for Item {
    fn from(label: &str) -> Self {
        Item::Label(label.to_string())
    }
}

impl From<usize> for Item {
    fn from(i: usize) -> Self {
        Item::Position(saturating_isize(i))
    }
}

impl From<isize> for Item {
    fn from(i: isize) -> Self {
        Item::Position(i)
    }
}

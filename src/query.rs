//! Sorting and filtering of listing rows.

use std::cmp::Ordering;

use crate::{
    core::store::MacroRow,
    params::{self, ValidationError},
};

/// Column a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortField {
    /// Required progress.
    #[default]
    Progress,
    /// Maximum quality.
    MaxQuality,
    /// Starting quality.
    InitialQuality,
    /// Durability.
    Durability,
    /// Food text.
    Food,
    /// Memo text.
    Memo,
    /// Number of linked missions.
    MissionCount,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// The other direction.
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    /// Active column.
    pub field: SortField,
    /// Active direction.
    pub direction: SortDirection,
}

impl SortState {
    /// Ascending sort on `field`.
    pub fn new(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    /// Selecting the active column flips direction; any other column
    /// becomes active in ascending order.
    pub fn select(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            *self = Self::new(field);
        }
    }

    /// Row comparator for this state.
    pub fn compare(&self, a: &MacroRow, b: &MacroRow) -> Ordering {
        let ord = compare_field(self.field, a, b);
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }

    /// Stable in-place sort.
    pub fn sort(&self, rows: &mut [MacroRow]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}

/// Exact-match constraints; `None` imposes no restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowFilter {
    /// Required progress.
    pub progress: Option<u32>,
    /// Required maximum quality.
    pub max_quality: Option<u32>,
}

impl RowFilter {
    /// Builds a filter from search inputs; blank inputs impose nothing.
    pub fn parse(progress: &str, max_quality: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            progress: search_value("progress", progress)?,
            max_quality: search_value("max_quality", max_quality)?,
        })
    }

    /// True when no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.progress.is_none() && self.max_quality.is_none()
    }

    /// True when `row` satisfies every set constraint.
    pub fn matches(&self, row: &MacroRow) -> bool {
        self.progress.is_none_or(|p| row.progress == Some(p))
            && self.max_quality.is_none_or(|mq| row.max_quality == Some(mq))
    }
}

/// Filters `rows`, then sorts what remains.
pub fn arrange(rows: Vec<MacroRow>, filter: &RowFilter, sort: &SortState) -> Vec<MacroRow> {
    let mut out: Vec<MacroRow> = rows.into_iter().filter(|r| filter.matches(r)).collect();
    sort.sort(&mut out);
    out
}

fn compare_field(field: SortField, a: &MacroRow, b: &MacroRow) -> Ordering {
    match field {
        SortField::Progress => a.progress.cmp(&b.progress),
        SortField::MaxQuality => a.max_quality.cmp(&b.max_quality),
        SortField::InitialQuality => a.initial_quality.cmp(&b.initial_quality),
        SortField::Durability => a.durability.cmp(&b.durability),
        SortField::Food => compare_text(&a.food, &b.food),
        SortField::Memo => compare_text(&a.memo, &b.memo),
        SortField::MissionCount => a.mission_count.cmp(&b.mission_count),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn search_value(field: &'static str, raw: &str) -> Result<Option<u32>, ValidationError> {
    params::optional(field, raw)?
        .map(|v| {
            u32::try_from(v).map_err(|_| match v {
                ..0 => ValidationError::BelowMinimum { field, min: 0, value: v },
                _ => ValidationError::NotANumber {
                    field,
                    value: v.to_string(),
                },
            })
        })
        .transpose()
}

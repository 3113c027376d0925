//! Table view - an editable grid mirroring the region store.
//!
//! Numeric cells validate in two phases. While typing, the raw text is kept
//! and every successful parse updates the cell's live value, which is exposed
//! unclamped through [`TableView::preview_region`] so the surface can follow
//! along. On commit the value is clamped into the store and the text is
//! reformatted; text that does not parse reverts to the last valid value.

use crate::region::{Region, RegionDraft, RegionId};
use crate::store::RegionStore;
use crate::{CoupleError, CoupleResult};

/// Table columns in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Left bound.
    X1,
    /// Right bound.
    X2,
    /// Top bound.
    Y1,
    /// Bottom bound.
    Y2,
    /// Weight.
    Weight,
    /// Prompt (read-only; driven by the prompt source).
    Prompt,
}

impl Column {
    /// All columns in display order.
    pub const ALL: [Self; 6] = [
        Self::X1,
        Self::X2,
        Self::Y1,
        Self::Y2,
        Self::Weight,
        Self::Prompt,
    ];

    /// Numeric columns in display order.
    pub const NUMERIC: [Self; 5] = [Self::X1, Self::X2, Self::Y1, Self::Y2, Self::Weight];

    /// Header label.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X1 => "x1",
            Self::X2 => "x2",
            Self::Y1 => "y1",
            Self::Y2 => "y2",
            Self::Weight => "weight",
            Self::Prompt => "prompt",
        }
    }

    /// Decimal places shown after commit.
    #[must_use]
    pub const fn precision(self) -> usize {
        match self {
            Self::Weight => 1,
            _ => 2,
        }
    }

    fn numeric_index(self) -> Option<usize> {
        Self::NUMERIC.iter().position(|c| *c == self)
    }

    fn read(self, region: &Region) -> f64 {
        match self {
            Self::X1 => region.x1,
            Self::X2 => region.x2,
            Self::Y1 => region.y1,
            Self::Y2 => region.y2,
            Self::Weight | Self::Prompt => region.weight,
        }
    }

    fn write(self, region: &mut Region, value: f64) {
        match self {
            Self::X1 => region.x1 = value,
            Self::X2 => region.x2 = value,
            Self::Y1 => region.y1 = value,
            Self::Y2 => region.y2 = value,
            Self::Weight => region.weight = value,
            Self::Prompt => {}
        }
    }

    fn format(self, value: f64) -> String {
        format!("{value:.*}", self.precision())
    }
}

/// One numeric cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Text shown in the cell.
    pub text: String,
    /// Whether the user is typing in this cell.
    pub editing: bool,
    /// Last successfully parsed value while editing (unclamped).
    pub live: Option<f64>,
}

/// One table row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Region shown in this row.
    pub region_id: RegionId,
    /// Numeric cells in [`Column::NUMERIC`] order.
    pub cells: [Cell; 5],
    /// Read-only prompt text.
    pub prompt: String,
    /// Region color swatch.
    pub color: String,
    /// Whether this row's region is selected.
    pub selected: bool,
}

impl TableRow {
    fn from_region(region: &Region, selected: bool) -> Self {
        let mut row = Self {
            region_id: region.id,
            cells: Default::default(),
            prompt: region.prompt.clone(),
            color: region.color.clone(),
            selected,
        };
        row.sync_from(region, selected);
        row
    }

    /// Cell for a numeric column.
    #[must_use]
    pub fn cell(&self, column: Column) -> Option<&Cell> {
        column.numeric_index().map(|i| &self.cells[i])
    }

    fn sync_from(&mut self, region: &Region, selected: bool) {
        for (cell, column) in self.cells.iter_mut().zip(Column::NUMERIC) {
            if !cell.editing {
                cell.text = column.format(column.read(region));
                cell.live = None;
            }
        }
        self.prompt.clone_from(&region.prompt);
        self.selected = selected;
    }
}

/// Context menu actions on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    /// Insert a new region before this row.
    AddAbove,
    /// Insert a new region after this row.
    AddBelow,
    /// Delete this row's region.
    Delete,
}

/// Result of committing a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommitOutcome {
    /// The value was clamped into the store; a sync should follow.
    Committed(f64),
    /// The text did not parse and was reverted.
    Reverted,
}

/// Editable grid of regions.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    rows: Vec<TableRow>,
}

impl TableView {
    /// Create a table mirroring the store.
    #[must_use]
    pub fn new(store: &RegionStore) -> Self {
        let mut table = Self::default();
        table.rebuild(store);
        table
    }

    /// Rows in display order.
    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Rebuild every row from the store, dropping in-progress edits.
    pub fn rebuild(&mut self, store: &RegionStore) {
        let selected = store.selected();
        self.rows = store
            .list()
            .iter()
            .map(|r| TableRow::from_region(r, selected == Some(r.id)))
            .collect();
    }

    /// Refresh one row in place. Cells being edited keep their text.
    ///
    /// Returns `false` if the row or region no longer exists.
    pub fn refresh_row(&mut self, store: &RegionStore, id: RegionId) -> bool {
        let Some(region) = store.get(id) else {
            return false;
        };
        let selected = store.selected() == Some(id);
        match self.rows.iter_mut().find(|row| row.region_id == id) {
            Some(row) => {
                row.sync_from(region, selected);
                true
            }
            None => false,
        }
    }

    /// Refresh selection flags without touching cell text.
    pub fn refresh_selection(&mut self, store: &RegionStore) {
        let selected = store.selected();
        for row in &mut self.rows {
            row.selected = selected == Some(row.region_id);
        }
    }

    /// Record raw text typed into a cell.
    ///
    /// Returns the live value if the text parses.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row or the read-only prompt column.
    pub fn type_text(&mut self, row: usize, column: Column, raw: &str) -> CoupleResult<Option<f64>> {
        let index = column
            .numeric_index()
            .ok_or(CoupleError::ReadOnlyColumn(column.name()))?;
        let row = self.rows.get_mut(row).ok_or(CoupleError::RowOutOfRange(row))?;
        let cell = &mut row.cells[index];
        cell.text = raw.to_string();
        cell.editing = true;
        if let Some(value) = parse_number(raw) {
            cell.live = Some(value);
        }
        Ok(cell.live)
    }

    /// The row's region with live (uncommitted) values overlaid.
    #[must_use]
    pub fn preview_region(&self, store: &RegionStore, id: RegionId) -> Option<Region> {
        let mut region = store.get(id)?.clone();
        if let Some(row) = self.rows.iter().find(|row| row.region_id == id) {
            for (cell, column) in row.cells.iter().zip(Column::NUMERIC) {
                if let Some(value) = cell.live {
                    column.write(&mut region, value);
                }
            }
        }
        Some(region)
    }

    /// Commit a cell: validate, clamp into the store and reformat the row.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row, the read-only prompt column, or a
    /// row whose region has disappeared.
    pub fn commit(
        &mut self,
        store: &mut RegionStore,
        row: usize,
        column: Column,
    ) -> CoupleResult<CommitOutcome> {
        let index = column
            .numeric_index()
            .ok_or(CoupleError::ReadOnlyColumn(column.name()))?;
        let table_row = self.rows.get_mut(row).ok_or(CoupleError::RowOutOfRange(row))?;
        let id = table_row.region_id;
        let parsed = parse_number(&table_row.cells[index].text);
        table_row.cells[index].editing = false;
        table_row.cells[index].live = None;

        let outcome = match parsed {
            Some(value) => {
                store.update(id, |region| column.write(region, value))?;
                CommitOutcome::Committed(value)
            }
            None => {
                tracing::debug!(row, column = column.name(), "Reverting invalid cell input");
                CommitOutcome::Reverted
            }
        };

        let region = store
            .get(id)
            .ok_or(CoupleError::RegionNotFound(id.get()))?;
        let selected = store.selected() == Some(id);
        table_row.sync_from(region, selected);
        Ok(outcome)
    }

    /// Toggle selection of a row's region. Clicking the selected row deselects.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row or a stale region.
    pub fn click_row(&mut self, store: &mut RegionStore, row: usize) -> CoupleResult<Option<RegionId>> {
        let id = self.rows.get(row).ok_or(CoupleError::RowOutOfRange(row))?.region_id;
        let next = if store.selected() == Some(id) {
            None
        } else {
            Some(id)
        };
        store.select(next)?;
        self.refresh_selection(store);
        Ok(next)
    }

    /// Run a context menu action. Ids are renumbered and the table rebuilt.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown row or a stale region.
    pub fn apply_action(
        &mut self,
        store: &mut RegionStore,
        row: usize,
        action: RowAction,
    ) -> CoupleResult<()> {
        let id = self.rows.get(row).ok_or(CoupleError::RowOutOfRange(row))?.region_id;
        match action {
            RowAction::AddAbove => {
                store.insert_at(row, RegionDraft::default());
            }
            RowAction::AddBelow => {
                store.insert_at(row + 1, RegionDraft::default());
            }
            RowAction::Delete => {
                store.delete(id)?;
            }
        }
        store.renumber();
        self.rebuild(store);
        Ok(())
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

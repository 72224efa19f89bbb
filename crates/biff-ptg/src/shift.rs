//! Rewriting of reference tokens after structural sheet edits.
//!
//! A [`ShiftDescriptor`] describes one edit: moving or copying a block of rows (or columns), or
//! moving a sheet to a new position in the workbook. [`ShiftDescriptor::adjust`] then rewrites
//! every affected token of one formula in place.
//!
//! The area rules reproduce Excel's behaviour exactly, including cases where a move is silently
//! ignored (see [`ShiftDescriptor::for_row_shift`]).

use std::cmp::{max, min};

use thiserror::Error;

use crate::ptg::{AreaRef, Bound, CellRef, Ptg, SheetScope};
use crate::SpreadsheetVersion;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShiftError {
    #[error("shift amount must not be zero")]
    ZeroAmount,
    #[error("moved range out of order: first index {first} is after last index {last}")]
    OutOfOrder { first: u32, last: u32 },
    #[error("sheet move source and destination are both slot {slot}")]
    SameSheet { slot: u16 },
    #[error(
        "situation not covered: moving {first}..={last} by {amount} against area {area_first}..={area_last}"
    )]
    UncoveredCase {
        first: u32,
        last: u32,
        amount: i32,
        area_first: u32,
        area_last: u32,
    },
}

/// The edit a [`ShiftDescriptor`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftMode {
    RowMove,
    RowCopy,
    ColumnMove,
    ColumnCopy,
    SheetMove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Axis {
    Row,
    Column,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemShift {
    axis: Axis,
    copy: bool,
    sheet: u16,
    sheet_name: String,
    first: u32,
    last: u32,
    amount: i32,
    version: SpreadsheetVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operation {
    Items(ItemShift),
    Sheet { source: u16, dest: u16 },
}

/// Result of applying a rule to one coordinate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adjustment {
    Unchanged,
    Deleted,
    Moved { first: i64, last: i64 },
}

/// What happened to a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Unchanged,
    Deleted,
    Updated,
}

/// One structural edit, ready to be applied to formula tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftDescriptor {
    op: Operation,
}

impl ShiftDescriptor {
    /// Rows `first..=last` of sheet `sheet` (EXTERNSHEET slot, named `sheet_name`) move by
    /// `amount` rows, overwriting the rows at the destination.
    ///
    /// When the moved rows contain the top row of an area but not its bottom row and the rows
    /// travel downwards past the area's bottom, Excel leaves the area untouched; the mirrored
    /// case for the bottom edge behaves the same way.
    pub fn for_row_shift(
        sheet: u16,
        sheet_name: impl Into<String>,
        first: u32,
        last: u32,
        amount: i32,
        version: SpreadsheetVersion,
    ) -> Result<Self, ShiftError> {
        Self::items(Axis::Row, false, sheet, sheet_name.into(), first, last, amount, version)
    }

    /// Rows `first..=last` are copied `amount` rows away. Only relative coordinates move.
    pub fn for_row_copy(
        sheet: u16,
        sheet_name: impl Into<String>,
        first: u32,
        last: u32,
        amount: i32,
        version: SpreadsheetVersion,
    ) -> Result<Self, ShiftError> {
        Self::items(Axis::Row, true, sheet, sheet_name.into(), first, last, amount, version)
    }

    pub fn for_column_shift(
        sheet: u16,
        sheet_name: impl Into<String>,
        first: u32,
        last: u32,
        amount: i32,
        version: SpreadsheetVersion,
    ) -> Result<Self, ShiftError> {
        Self::items(Axis::Column, false, sheet, sheet_name.into(), first, last, amount, version)
    }

    pub fn for_column_copy(
        sheet: u16,
        sheet_name: impl Into<String>,
        first: u32,
        last: u32,
        amount: i32,
        version: SpreadsheetVersion,
    ) -> Result<Self, ShiftError> {
        Self::items(Axis::Column, true, sheet, sheet_name.into(), first, last, amount, version)
    }

    /// The sheet in slot `source` is moved to slot `dest`; the sheets in between close the gap.
    pub fn for_sheet_shift(source: u16, dest: u16) -> Result<Self, ShiftError> {
        if source == dest {
            return Err(ShiftError::SameSheet { slot: source });
        }
        Ok(Self {
            op: Operation::Sheet { source, dest },
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn items(
        axis: Axis,
        copy: bool,
        sheet: u16,
        sheet_name: String,
        first: u32,
        last: u32,
        amount: i32,
        version: SpreadsheetVersion,
    ) -> Result<Self, ShiftError> {
        if amount == 0 {
            return Err(ShiftError::ZeroAmount);
        }
        if first > last {
            return Err(ShiftError::OutOfOrder { first, last });
        }
        Ok(Self {
            op: Operation::Items(ItemShift {
                axis,
                copy,
                sheet,
                sheet_name,
                first,
                last,
                amount,
                version,
            }),
        })
    }

    pub fn mode(&self) -> ShiftMode {
        match &self.op {
            Operation::Items(shift) => match (shift.axis, shift.copy) {
                (Axis::Row, false) => ShiftMode::RowMove,
                (Axis::Row, true) => ShiftMode::RowCopy,
                (Axis::Column, false) => ShiftMode::ColumnMove,
                (Axis::Column, true) => ShiftMode::ColumnCopy,
            },
            Operation::Sheet { .. } => ShiftMode::SheetMove,
        }
    }

    /// Rewrites `ptgs` in place. `current_sheet` is the EXTERNSHEET slot of the sheet holding
    /// the formula; it decides whether sheet-local tokens are affected by a move.
    ///
    /// Returns `true` if any token now differs from what it was before the call.
    pub fn adjust(&self, ptgs: &mut [Ptg], current_sheet: u16) -> Result<bool, ShiftError> {
        let mut changed = false;
        for ptg in ptgs.iter_mut() {
            if let Some(updated) = self.adjust_ptg(ptg, current_sheet)? {
                *ptg = updated;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Computes the replacement for a single token, or `None` if it is unaffected.
    pub fn adjust_ptg(&self, ptg: &Ptg, current_sheet: u16) -> Result<Option<Ptg>, ShiftError> {
        match &self.op {
            Operation::Sheet { source, dest } => Ok(move_sheet_slot(ptg, *source, *dest)),
            Operation::Items(shift) => shift.adjust_ptg(ptg, current_sheet),
        }
    }
}

fn moved_slot(slot: u16, source: u16, dest: u16) -> Option<u16> {
    if (slot < source && slot < dest) || (slot > source && slot > dest) {
        return None;
    }
    if slot == source {
        return Some(dest);
    }
    if dest < source {
        Some(slot + 1)
    } else {
        Some(slot - 1)
    }
}

fn move_sheet_slot(ptg: &Ptg, source: u16, dest: u16) -> Option<Ptg> {
    let mut out = ptg.clone();
    let sheet = match &mut out {
        Ptg::Ref3d { sheet, .. }
        | Ptg::Area3d { sheet, .. }
        | Ptg::RefErr3d { sheet }
        | Ptg::AreaErr3d { sheet } => sheet,
        Ptg::Ref(_)
        | Ptg::Area(_)
        | Ptg::RefErr
        | Ptg::AreaErr
        | Ptg::BookRef { .. }
        | Ptg::BookArea { .. }
        | Ptg::BookRefErr { .. }
        | Ptg::BookAreaErr { .. } => return None,
    };
    *sheet = moved_slot(*sheet, source, dest)?;
    Some(out)
}

impl ItemShift {
    fn limit(&self) -> i64 {
        match self.axis {
            Axis::Row => i64::from(self.version.last_row_index()),
            Axis::Column => i64::from(self.version.last_column_index()),
        }
    }

    fn in_range(&self, index: i64) -> bool {
        (0..=self.limit()).contains(&index)
    }

    fn affects(&self, ptg: &Ptg, current_sheet: u16) -> bool {
        // Copied formulas carry their relative references along wherever they point.
        if self.copy {
            return true;
        }
        match ptg.scope() {
            SheetScope::Local => current_sheet == self.sheet,
            SheetScope::Slot(slot) => slot == self.sheet,
            SheetScope::Book(book) => {
                book.is_current_workbook() && book.sheet_name.eq_ignore_ascii_case(&self.sheet_name)
            }
        }
    }

    fn adjust_ptg(&self, ptg: &Ptg, current_sheet: u16) -> Result<Option<Ptg>, ShiftError> {
        if ptg.is_deleted() || !self.affects(ptg, current_sheet) {
            return Ok(None);
        }

        let mut out = ptg.clone();
        let outcome = match &mut out {
            Ptg::Ref(cell) | Ptg::Ref3d { cell, .. } | Ptg::BookRef { cell, .. } => {
                self.adjust_cell(cell)
            }
            Ptg::Area(area) | Ptg::Area3d { area, .. } | Ptg::BookArea { area, .. } => {
                self.adjust_area(area)?
            }
            Ptg::RefErr
            | Ptg::AreaErr
            | Ptg::RefErr3d { .. }
            | Ptg::AreaErr3d { .. }
            | Ptg::BookRefErr { .. }
            | Ptg::BookAreaErr { .. } => Outcome::Unchanged,
        };

        Ok(match outcome {
            Outcome::Unchanged => None,
            Outcome::Deleted => Some(ptg.deleted()),
            Outcome::Updated => (out != *ptg).then_some(out),
        })
    }

    fn bound_mut<'a>(&self, cell: &'a mut CellRef) -> &'a mut Bound {
        match self.axis {
            Axis::Row => &mut cell.row,
            Axis::Column => &mut cell.col,
        }
    }

    fn bounds_mut<'a>(&self, area: &'a mut AreaRef) -> (&'a mut Bound, &'a mut Bound) {
        match self.axis {
            Axis::Row => (&mut area.first_row, &mut area.last_row),
            Axis::Column => (&mut area.first_col, &mut area.last_col),
        }
    }

    fn adjust_cell(&self, cell: &mut CellRef) -> Outcome {
        let bound = self.bound_mut(cell);
        let adjustment = if self.copy {
            self.copy_cell(*bound)
        } else {
            self.move_cell(i64::from(bound.index))
        };
        match adjustment {
            Adjustment::Unchanged => Outcome::Unchanged,
            Adjustment::Deleted => Outcome::Deleted,
            Adjustment::Moved { first, .. } if self.in_range(first) => {
                bound.index = first as u32;
                Outcome::Updated
            }
            Adjustment::Moved { .. } => Outcome::Deleted,
        }
    }

    fn adjust_area(&self, area: &mut AreaRef) -> Result<Outcome, ShiftError> {
        let (first_bound, last_bound) = self.bounds_mut(area);
        let adjustment = if self.copy {
            self.copy_area(*first_bound, *last_bound)
        } else {
            self.move_area(i64::from(first_bound.index), i64::from(last_bound.index))?
        };
        Ok(match adjustment {
            Adjustment::Unchanged => Outcome::Unchanged,
            Adjustment::Deleted => Outcome::Deleted,
            Adjustment::Moved { first, last } if self.in_range(first) && self.in_range(last) => {
                first_bound.index = first as u32;
                last_bound.index = last as u32;
                if first_bound.index > last_bound.index {
                    std::mem::swap(first_bound, last_bound);
                }
                Outcome::Updated
            }
            Adjustment::Moved { .. } => Outcome::Deleted,
        })
    }

    fn moved_range(&self) -> (i64, i64, i64) {
        (
            i64::from(self.first),
            i64::from(self.last),
            i64::from(self.amount),
        )
    }

    fn move_cell(&self, index: i64) -> Adjustment {
        let (first_moved, last_moved, amount) = self.moved_range();
        if first_moved <= index && index <= last_moved {
            return Adjustment::Moved {
                first: index + amount,
                last: index + amount,
            };
        }
        let dest_first = first_moved + amount;
        let dest_last = last_moved + amount;
        if dest_first <= index && index <= dest_last {
            // The moved block lands on top of the referenced cell.
            return Adjustment::Deleted;
        }
        Adjustment::Unchanged
    }

    fn move_area(&self, a_first: i64, a_last: i64) -> Result<Adjustment, ShiftError> {
        let (first_moved, last_moved, amount) = self.moved_range();
        let moved = |first: i64, last: i64| Ok(Adjustment::Moved { first, last });

        if first_moved <= a_first && a_last <= last_moved {
            // The whole area travels with the moved block.
            return moved(a_first + amount, a_last + amount);
        }

        let dest_first = first_moved + amount;
        let dest_last = last_moved + amount;

        if a_first < first_moved && last_moved < a_last {
            // Moved block lies strictly inside the area; only the destination can clip an edge.
            if dest_first < a_first && a_first <= dest_last {
                return moved(dest_last + 1, a_last);
            }
            if dest_first <= a_last && a_last < dest_last {
                return moved(a_first, dest_first - 1);
            }
            return Ok(Adjustment::Unchanged);
        }

        if first_moved <= a_first && a_first <= last_moved {
            // Block contains the area's first index but not its last.
            if amount < 0 {
                return moved(a_first + amount, a_last);
            }
            if dest_first > a_last {
                // Excel ignores this move.
                return Ok(Adjustment::Unchanged);
            }
            let mut new_first = a_first + amount;
            if dest_last < a_last {
                return moved(new_first, a_last);
            }
            let remaining_first = last_moved + 1;
            if dest_first > remaining_first {
                new_first = remaining_first;
            }
            return moved(new_first, max(a_last, dest_last));
        }

        if first_moved <= a_last && a_last <= last_moved {
            // Block contains the area's last index but not its first.
            if amount > 0 {
                return moved(a_first, a_last + amount);
            }
            if dest_last < a_first {
                // Excel ignores this move.
                return Ok(Adjustment::Unchanged);
            }
            let mut new_last = a_last + amount;
            if dest_first > a_first {
                return moved(a_first, new_last);
            }
            let remaining_last = first_moved - 1;
            if dest_last < remaining_last {
                new_last = remaining_last;
            }
            return moved(min(a_first, dest_first), new_last);
        }

        // The block shares nothing with the area; check the destination.
        if dest_last < a_first || a_last < dest_first {
            return Ok(Adjustment::Unchanged);
        }
        if dest_first <= a_first && a_last <= dest_last {
            return Ok(Adjustment::Deleted);
        }
        if a_first <= dest_first && dest_last <= a_last {
            return Ok(Adjustment::Unchanged);
        }
        if dest_first < a_first && a_first <= dest_last {
            return moved(dest_last + 1, a_last);
        }
        if dest_first <= a_last && a_last < dest_last {
            return moved(a_first, dest_first - 1);
        }

        Err(ShiftError::UncoveredCase {
            first: self.first,
            last: self.last,
            amount: self.amount,
            area_first: a_first as u32,
            area_last: a_last as u32,
        })
    }

    fn copy_cell(&self, bound: Bound) -> Adjustment {
        if !bound.relative {
            return Adjustment::Unchanged;
        }
        let (first_moved, _, amount) = self.moved_range();
        // The formula itself must land inside the grid.
        if !self.in_range(first_moved + amount) {
            return Adjustment::Deleted;
        }
        let index = i64::from(bound.index) + amount;
        if !self.in_range(index) {
            return Adjustment::Deleted;
        }
        Adjustment::Moved {
            first: index,
            last: index,
        }
    }

    fn copy_area(&self, first: Bound, last: Bound) -> Adjustment {
        let amount = i64::from(self.amount);
        if !first.relative && !last.relative {
            return Adjustment::Unchanged;
        }

        let mut new_first = i64::from(first.index);
        let mut new_last = i64::from(last.index);
        if first.relative {
            new_first += amount;
            if !self.in_range(new_first) {
                return Adjustment::Deleted;
            }
        }
        if last.relative {
            new_last += amount;
            if !self.in_range(new_last) {
                return Adjustment::Deleted;
            }
        }
        Adjustment::Moved {
            first: new_first,
            last: new_last,
        }
    }
}

use std::collections::BTreeMap;
use std::ops::{RangeBounds, RangeInclusive};

use super::{tile_segments, OutlineSegment, RecordAggregate};
use crate::error::RecordFormatError;
use crate::record::{sid, Record, RowRecord, MAX_OUTLINE_LEVEL};
use crate::stream::RecordStream;

/// `ROW` records of a sheet keyed by row index.
///
/// Cell records are not part of this aggregate; it only carries row formatting and outline state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowRecordsAggregate {
    rows: BTreeMap<u16, RowRecord>,
}

impl RowRecordsAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a run of consecutive `ROW` records.
    pub fn build(stream: &mut RecordStream) -> Result<Self, RecordFormatError> {
        let mut agg = Self::default();
        agg.add_rows(stream)?;
        Ok(agg)
    }

    /// Adds a further run of `ROW` records (files write them in blocks between cell records).
    ///
    /// Returns the lowest and highest row index of the run, which need not be sorted.
    pub fn add_rows(
        &mut self,
        stream: &mut RecordStream,
    ) -> Result<Option<RangeInclusive<u16>>, RecordFormatError> {
        let mut span: Option<(u16, u16)> = None;
        while stream.peek_sid() == Some(sid::ROW) {
            if let Record::Row(row) = stream.next_record()? {
                let index = row.row;
                if self.rows.insert(index, row).is_some() {
                    return Err(RecordFormatError::Duplicate {
                        block: "RowRecordsAggregate",
                        sid: sid::ROW,
                    });
                }
                span = Some(match span {
                    None => (index, index),
                    Some((low, high)) => (low.min(index), high.max(index)),
                });
            }
        }
        Ok(span.map(|(low, high)| low..=high))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: u16) -> Option<&RowRecord> {
        self.rows.get(&index)
    }

    pub fn insert_row(&mut self, row: RowRecord) {
        self.rows.insert(row.row, row);
    }

    pub fn remove_row(&mut self, index: u16) -> Option<RowRecord> {
        self.rows.remove(&index)
    }

    pub fn rows_in(&self, range: impl RangeBounds<u16>) -> impl Iterator<Item = &RowRecord> {
        self.rows.range(range).map(|(_, row)| row)
    }

    pub fn first_row(&self) -> Option<u16> {
        self.rows.keys().next().copied()
    }

    pub fn last_row(&self) -> Option<u16> {
        self.rows.keys().next_back().copied()
    }

    pub fn max_outline_level(&self) -> u8 {
        self.rows
            .values()
            .map(RowRecord::outline_level)
            .max()
            .unwrap_or(0)
    }

    fn level(&self, index: u16) -> Option<u8> {
        self.rows.get(&index).map(RowRecord::outline_level)
    }

    fn row_or_create(&mut self, index: u16) -> &mut RowRecord {
        self.rows
            .entry(index)
            .or_insert_with(|| RowRecord::new(index))
    }

    /// Raises (or lowers) the outline level of `from..=to` by one, creating missing rows.
    pub fn group_row_range(&mut self, from: u16, to: u16, indent: bool) {
        for index in from..=to {
            let row = self.row_or_create(index);
            let level = if indent {
                row.outline_level().saturating_add(1).min(MAX_OUTLINE_LEVEL)
            } else {
                row.outline_level().saturating_sub(1)
            };
            row.set_outline_level(level);
        }
    }

    /// First row of the contiguous run at `index`'s level or deeper.
    fn find_start_of_group(&self, index: u16) -> u16 {
        let level = self.level(index).unwrap_or(0);
        let mut start = index;
        while let Some(prev) = start.checked_sub(1) {
            match self.level(prev) {
                Some(l) if l >= level => start = prev,
                _ => break,
            }
        }
        start
    }

    /// Last row of the contiguous run at `index`'s level or deeper.
    fn find_end_of_group(&self, index: u16) -> u16 {
        let level = self.level(index).unwrap_or(0);
        let mut end = index;
        while let Some(next) = end.checked_add(1) {
            match self.level(next) {
                Some(l) if l >= level => end = next,
                _ => break,
            }
        }
        end
    }

    /// Hides rows from `start` while they stay at `level` or deeper; returns the first row after.
    fn write_hidden(&mut self, start: u16, level: u8) -> Option<u16> {
        let mut index = start;
        loop {
            match self.rows.get_mut(&index) {
                Some(row) if row.outline_level() >= level => row.set_zero_height(true),
                _ => return Some(index),
            }
            index = index.checked_add(1)?;
        }
    }

    pub fn is_row_group_collapsed(&self, index: u16) -> bool {
        self.find_end_of_group(index)
            .checked_add(1)
            .and_then(|marker| self.rows.get(&marker))
            .is_some_and(RowRecord::collapsed)
    }

    fn is_row_group_hidden_by_parent(&self, index: u16) -> bool {
        let end = self.find_end_of_group(index);
        let (end_level, end_hidden) = end
            .checked_add(1)
            .and_then(|i| self.rows.get(&i))
            .map_or((0, false), |row| (row.outline_level(), row.zero_height()));

        let start = self.find_start_of_group(index);
        let (start_level, start_hidden) = start
            .checked_sub(1)
            .and_then(|i| self.rows.get(&i))
            .map_or((0, false), |row| (row.outline_level(), row.zero_height()));

        if end_level > start_level {
            end_hidden
        } else {
            start_hidden
        }
    }

    /// Hides the outline group containing `index` and marks the row after it as collapsed.
    pub fn collapse_row(&mut self, index: u16) {
        let Some(level) = self.level(index) else {
            return;
        };
        let start = self.find_start_of_group(index);
        let Some(marker) = self.write_hidden(start, level) else {
            return;
        };
        self.row_or_create(marker).set_collapsed(true);
    }

    /// Shows the collapsed outline group containing `index`.
    ///
    /// Nested groups that are themselves collapsed stay hidden, and so does the whole group when
    /// its parent is collapsed.
    pub fn expand_row(&mut self, index: u16) {
        if !self.rows.contains_key(&index) || !self.is_row_group_collapsed(index) {
            return;
        }
        let start = self.find_start_of_group(index);
        let end = self.find_end_of_group(index);
        let level = self.level(start).unwrap_or(0);

        if !self.is_row_group_hidden_by_parent(index) {
            for i in start..=end {
                let show = self.level(i) == Some(level) || !self.is_row_group_collapsed(i);
                if let Some(row) = self.rows.get_mut(&i).filter(|_| show) {
                    row.set_zero_height(false);
                }
            }
        }
        if let Some(row) = end.checked_add(1).and_then(|i| self.rows.get_mut(&i)) {
            row.set_collapsed(false);
        }
    }

    /// Outline state of every row in `0..=max_row`, one segment per run of equal state.
    pub fn partition(&self, max_row: u32) -> Vec<OutlineSegment> {
        tile_segments(
            self.rows.values().map(|row| OutlineSegment {
                first: u32::from(row.row),
                last: u32::from(row.row),
                level: row.outline_level(),
                hidden: row.zero_height(),
                collapsed: row.collapsed(),
            }),
            max_row,
        )
    }
}

impl RecordAggregate for RowRecordsAggregate {
    fn visit_records(&self, visitor: &mut dyn FnMut(&Record)) {
        for row in self.rows.values() {
            visitor(&Record::Row(*row));
        }
    }
}

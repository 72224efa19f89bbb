use super::{tile_segments, OutlineSegment, RecordAggregate};
use crate::error::RecordFormatError;
use crate::record::{sid, ColumnInfo, Record, MAX_OUTLINE_LEVEL};
use crate::stream::RecordStream;

const BLOCK: &str = "ColumnInfoRecordsAggregate";

/// Field updates for [`ColumnInfoRecordsAggregate::set_column`]. `None` leaves a field as it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnUpdate {
    pub xf_index: Option<u16>,
    pub width: Option<u16>,
    pub level: Option<u8>,
    pub hidden: Option<bool>,
    pub collapsed: Option<bool>,
}

impl ColumnUpdate {
    fn differs_from(&self, info: &ColumnInfo) -> bool {
        self.xf_index.is_some_and(|v| v != info.xf_index)
            || self.width.is_some_and(|v| v != info.width)
            || self.level.is_some_and(|v| v != info.outline_level())
            || self.hidden.is_some_and(|v| v != info.hidden())
            || self.collapsed.is_some_and(|v| v != info.collapsed())
    }

    fn apply(&self, info: &mut ColumnInfo) {
        if let Some(xf_index) = self.xf_index {
            info.xf_index = xf_index;
        }
        if let Some(width) = self.width {
            info.width = width;
        }
        if let Some(level) = self.level {
            info.set_outline_level(level);
        }
        if let Some(hidden) = self.hidden {
            info.set_hidden(hidden);
        }
        if let Some(collapsed) = self.collapsed {
            info.set_collapsed(collapsed);
        }
    }
}

/// The `COLINFO` records of a sheet, sorted by column and never overlapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnInfoRecordsAggregate {
    records: Vec<ColumnInfo>,
}

impl ColumnInfoRecordsAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(stream: &mut RecordStream) -> Result<Self, RecordFormatError> {
        let mut records = Vec::new();
        while stream.peek_sid() == Some(sid::COL_INFO) {
            if let Record::ColumnInfo(info) = stream.next_record()? {
                records.push(info);
            }
        }
        if records.is_empty() {
            return Err(RecordFormatError::InvalidState {
                block: BLOCK,
                reason: "no column info records found".to_string(),
            });
        }
        if !records
            .windows(2)
            .all(|w| (w[0].first_col, w[0].last_col) <= (w[1].first_col, w[1].last_col))
        {
            log::debug!("sorting out-of-order COLINFO records");
            records.sort_by_key(|info| (info.first_col, info.last_col));
        }
        if let Some(pair) = records.windows(2).find(|w| w[0].last_col >= w[1].first_col) {
            return Err(RecordFormatError::malformed(
                sid::COL_INFO,
                format!(
                    "column ranges {}..={} and {}..={} overlap",
                    pair[0].first_col, pair[0].last_col, pair[1].first_col, pair[1].last_col
                ),
            ));
        }
        Ok(Self { records })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn column_infos(&self) -> &[ColumnInfo] {
        &self.records
    }

    pub fn insert_column(&mut self, info: ColumnInfo) {
        self.records.push(info);
        self.records.sort_by_key(|info| (info.first_col, info.last_col));
    }

    /// The record covering `col`, if any.
    pub fn find_column_info(&self, col: u16) -> Option<&ColumnInfo> {
        self.records.iter().find(|info| info.contains(col))
    }

    pub fn max_outline_level(&self) -> u8 {
        self.records
            .iter()
            .map(ColumnInfo::outline_level)
            .max()
            .unwrap_or(0)
    }

    fn find_col_info_idx(&self, col: u16, from_idx: usize) -> Option<usize> {
        self.records
            .iter()
            .enumerate()
            .skip(from_idx)
            .find(|(_, info)| info.contains(col))
            .map(|(idx, _)| idx)
    }

    /// Updates the formatting of a single column, splitting the record that covers it and merging
    /// the result with neighbours of the same format.
    pub fn set_column(&mut self, col: u16, update: ColumnUpdate) {
        let mut k = 0;
        let mut found = None;
        while k < self.records.len() {
            let info = &self.records[k];
            if info.contains(col) {
                found = Some(k);
                break;
            }
            if info.first_col > col {
                break;
            }
            k += 1;
        }

        let Some(k) = found else {
            let mut info = ColumnInfo::new(col, col);
            update.apply(&mut info);
            self.records.insert(k, info);
            self.attempt_merge(k);
            return;
        };

        let existing = self.records[k];
        if !update.differs_from(&existing) {
            return;
        }

        if existing.first_col == col && existing.last_col == col {
            update.apply(&mut self.records[k]);
            self.attempt_merge(k);
            return;
        }

        let mut single = ColumnInfo {
            first_col: col,
            last_col: col,
            ..existing
        };
        update.apply(&mut single);

        if existing.first_col == col || existing.last_col == col {
            let insert_at = if existing.first_col == col {
                self.records[k].first_col = col + 1;
                k
            } else {
                self.records[k].last_col = col - 1;
                k + 1
            };
            self.records.insert(insert_at, single);
            self.attempt_merge(insert_at);
        } else {
            // The neighbours keep the old format, so nothing merges.
            self.records[k].last_col = col - 1;
            let tail = ColumnInfo {
                first_col: col + 1,
                ..existing
            };
            self.records.insert(k + 1, single);
            self.records.insert(k + 2, tail);
        }
    }

    fn attempt_merge(&mut self, idx: usize) {
        if idx + 1 < self.records.len() && merge_into(&mut self.records, idx, idx + 1) {
            self.records.remove(idx + 1);
        }
        if idx > 0 && merge_into(&mut self.records, idx - 1, idx) {
            self.records.remove(idx);
        }
    }

    /// Raises (or lowers) the outline level of `from..=to` by one.
    pub fn group_column_range(&mut self, from: u16, to: u16, indent: bool) {
        let mut search_from = 0;
        for col in from..=to {
            let current = match self.find_col_info_idx(col, search_from) {
                Some(idx) => {
                    // Step back one record in case the previous column gets merged.
                    search_from = idx.saturating_sub(1);
                    self.records[idx].outline_level()
                }
                None if indent => 0,
                None => continue,
            };
            let level = if indent {
                current.saturating_add(1).min(MAX_OUTLINE_LEVEL)
            } else {
                current.saturating_sub(1)
            };
            self.set_column(
                col,
                ColumnUpdate {
                    level: Some(level),
                    ..ColumnUpdate::default()
                },
            );
        }
    }

    fn find_start_of_group(&self, idx: usize) -> usize {
        let level = self.records[idx].outline_level();
        let mut idx = idx;
        while idx > 0 {
            let prev = &self.records[idx - 1];
            if !prev.is_adjacent_before(&self.records[idx]) || prev.outline_level() < level {
                break;
            }
            idx -= 1;
        }
        idx
    }

    fn find_end_of_group(&self, idx: usize) -> usize {
        let level = self.records[idx].outline_level();
        let mut idx = idx;
        while idx + 1 < self.records.len() {
            let next = &self.records[idx + 1];
            if !self.records[idx].is_adjacent_before(next) || next.outline_level() < level {
                break;
            }
            idx += 1;
        }
        idx
    }

    /// Sets `hidden` on the group starting at `idx`; returns the last column of the group.
    fn set_group_hidden(&mut self, idx: usize, level: u8, hidden: bool) -> u16 {
        let mut idx = idx;
        loop {
            self.records[idx].set_hidden(hidden);
            let Some(next) = self.records.get(idx + 1) else {
                break;
            };
            if !self.records[idx].is_adjacent_before(next) || next.outline_level() < level {
                break;
            }
            idx += 1;
        }
        self.records[idx].last_col
    }

    fn is_group_collapsed(&self, idx: usize) -> bool {
        let end = self.find_end_of_group(idx);
        match self.records.get(end + 1) {
            Some(next) => self.records[end].is_adjacent_before(next) && next.collapsed(),
            None => false,
        }
    }

    fn is_group_hidden_by_parent(&self, idx: usize) -> bool {
        let end = self.find_end_of_group(idx);
        let (end_level, end_hidden) = match self.records.get(end + 1) {
            Some(next) if self.records[end].is_adjacent_before(next) => {
                (next.outline_level(), next.hidden())
            }
            _ => (0, false),
        };

        let start = self.find_start_of_group(idx);
        let (start_level, start_hidden) = match start.checked_sub(1).map(|i| &self.records[i]) {
            Some(prev) if prev.is_adjacent_before(&self.records[start]) => {
                (prev.outline_level(), prev.hidden())
            }
            _ => (0, false),
        };

        if end_level > start_level {
            end_hidden
        } else {
            start_hidden
        }
    }

    /// Hides the outline group containing `col` and marks the column after it as collapsed.
    pub fn collapse_column(&mut self, col: u16) {
        let Some(idx) = self.find_col_info_idx(col, 0) else {
            return;
        };
        let start = self.find_start_of_group(idx);
        let level = self.records[start].outline_level();
        let last_col = self.set_group_hidden(start, level, true);
        let Some(marker) = last_col.checked_add(1) else {
            return;
        };
        self.set_column(
            marker,
            ColumnUpdate {
                collapsed: Some(true),
                ..ColumnUpdate::default()
            },
        );
    }

    /// Shows the collapsed outline group containing `col`.
    ///
    /// Columns of nested groups keep their hidden flag, and the group stays hidden if its parent
    /// group is collapsed.
    pub fn expand_column(&mut self, col: u16) {
        let Some(idx) = self.find_col_info_idx(col, 0) else {
            return;
        };
        if !self.is_group_collapsed(idx) {
            return;
        }
        let start = self.find_start_of_group(idx);
        let end = self.find_end_of_group(idx);
        let last = self.records[end];

        if !self.is_group_hidden_by_parent(idx) {
            let level = last.outline_level();
            for info in &mut self.records[start..=end] {
                if info.outline_level() == level {
                    info.set_hidden(false);
                }
            }
        }
        if let Some(marker) = last.last_col.checked_add(1) {
            self.set_column(
                marker,
                ColumnUpdate {
                    collapsed: Some(false),
                    ..ColumnUpdate::default()
                },
            );
        }
    }

    /// Outline state of every column in `0..=max_col`, one segment per run of equal state.
    pub fn partition(&self, max_col: u16) -> Vec<OutlineSegment> {
        tile_segments(
            self.records.iter().map(|info| OutlineSegment {
                first: u32::from(info.first_col),
                last: u32::from(info.last_col),
                level: info.outline_level(),
                hidden: info.hidden(),
                collapsed: info.collapsed(),
            }),
            u32::from(max_col),
        )
    }
}

fn merge_into(records: &mut [ColumnInfo], a: usize, b: usize) -> bool {
    let (left, right) = (records[a], records[b]);
    if left.is_adjacent_before(&right) && left.format_matches(&right) {
        records[a].last_col = right.last_col;
        true
    } else {
        false
    }
}

impl RecordAggregate for ColumnInfoRecordsAggregate {
    fn visit_records(&self, visitor: &mut dyn FnMut(&Record)) {
        for info in &self.records {
            visitor(&Record::ColumnInfo(*info));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(agg: &ColumnInfoRecordsAggregate) -> Vec<(u16, u16, u8)> {
        agg.column_infos()
            .iter()
            .map(|i| (i.first_col, i.last_col, i.outline_level()))
            .collect()
    }

    fn width(width: u16) -> ColumnUpdate {
        ColumnUpdate {
            width: Some(width),
            ..ColumnUpdate::default()
        }
    }

    #[test]
    fn set_column_splits_and_merges() {
        let mut agg = ColumnInfoRecordsAggregate::new();
        agg.insert_column(ColumnInfo::new(2, 8));

        agg.set_column(5, width(500));
        assert_eq!(ranges(&agg), vec![(2, 4, 0), (5, 5, 0), (6, 8, 0)]);

        agg.set_column(2, width(500));
        assert_eq!(ranges(&agg), vec![(2, 2, 0), (3, 4, 0), (5, 5, 0), (6, 8, 0)]);

        agg.set_column(5, width(2275));
        assert_eq!(ranges(&agg), vec![(2, 2, 0), (3, 8, 0)]);

        agg.set_column(10, width(500));
        assert_eq!(agg.len(), 3);
        assert_eq!(agg.find_column_info(10).map(|i| i.width), Some(500));
        assert!(agg.find_column_info(9).is_none());
    }

    #[test]
    fn unchanged_update_is_ignored() {
        let mut agg = ColumnInfoRecordsAggregate::new();
        agg.insert_column(ColumnInfo::new(0, 10));
        agg.set_column(4, width(2275));
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn group_and_ungroup() {
        let mut agg = ColumnInfoRecordsAggregate::new();
        agg.group_column_range(2, 5, true);
        agg.group_column_range(3, 4, true);
        assert_eq!(ranges(&agg), vec![(2, 2, 1), (3, 4, 2), (5, 5, 1)]);
        assert_eq!(agg.max_outline_level(), 2);

        agg.group_column_range(2, 5, false);
        assert_eq!(ranges(&agg), vec![(2, 2, 0), (3, 4, 1), (5, 5, 0)]);

        // Ungrouping columns without a record is a no-op.
        agg.group_column_range(20, 30, false);
        assert_eq!(agg.len(), 3);
    }

    #[test]
    fn collapse_and_expand_single_group() {
        let mut agg = ColumnInfoRecordsAggregate::new();
        agg.group_column_range(1, 4, true);
        agg.collapse_column(2);
        let infos = agg.column_infos();
        assert_eq!(infos.len(), 2);
        assert!(infos[0].hidden());
        assert_eq!((infos[1].first_col, infos[1].last_col), (5, 5));
        assert!(infos[1].collapsed());

        agg.expand_column(2);
        let infos = agg.column_infos();
        assert!(!infos[0].hidden());
        assert!(!infos[1].collapsed());
    }

    #[test]
    fn expanding_uncollapsed_group_does_nothing() {
        let mut agg = ColumnInfoRecordsAggregate::new();
        agg.group_column_range(1, 4, true);
        let before = agg.clone();
        agg.expand_column(3);
        agg.expand_column(100);
        assert_eq!(agg, before);
    }

    #[test]
    fn build_sorts_records() {
        let mut stream = RecordStream::new(vec![
            Record::ColumnInfo(ColumnInfo::new(5, 6)),
            Record::ColumnInfo(ColumnInfo::new(0, 1)),
            Record::HCenter(false),
        ]);
        let agg = ColumnInfoRecordsAggregate::build(&mut stream).unwrap();
        assert_eq!(ranges(&agg), vec![(0, 1, 0), (5, 6, 0)]);
        assert_eq!(stream.peek_sid(), Some(sid::HCENTER));

        assert!(ColumnInfoRecordsAggregate::build(&mut stream).is_err());
    }

    #[test]
    fn build_rejects_overlapping_ranges() {
        let mut stream = RecordStream::new(vec![
            Record::ColumnInfo(ColumnInfo::new(4, 9)),
            Record::ColumnInfo(ColumnInfo::new(0, 4)),
        ]);
        assert_eq!(
            ColumnInfoRecordsAggregate::build(&mut stream),
            Err(RecordFormatError::Malformed {
                sid: sid::COL_INFO,
                reason: "column ranges 0..=4 and 4..=9 overlap".to_string(),
            })
        );
    }
}

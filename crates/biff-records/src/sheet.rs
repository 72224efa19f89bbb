//! Worksheet substream walker.
//!
//! [`SheetRecords::build`] replaces each recognised block of the flat record list with a
//! placeholder and keeps the block itself as a typed aggregate. Writing walks the placeholders
//! and splices every aggregate back where it was found.

use crate::aggregates::{
    ColumnInfoRecordsAggregate, ConditionalFormattingTable, CustomViewSettingsRecordAggregate,
    PageSettingsBlock, RecordAggregate, RowRecordsAggregate, WorksheetProtectionBlock,
};
use crate::error::RecordFormatError;
use crate::reader::RecordStreamOptions;
use crate::record::{sid, Record};
use crate::stream::RecordStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Record(usize),
    PageSettings,
    Protection,
    ColumnInfo,
    ConditionalFormats,
    /// One run of `ROW` records; holds the lowest row index of the run as read.
    Rows(u16),
    CustomView(usize),
}

/// A worksheet record list with its aggregates rebuilt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetRecords {
    slots: Vec<Slot>,
    records: Vec<Record>,
    page_settings: Option<PageSettingsBlock>,
    protection: Option<WorksheetProtectionBlock>,
    columns: Option<ColumnInfoRecordsAggregate>,
    conditional_formats: Option<ConditionalFormattingTable>,
    rows: RowRecordsAggregate,
    custom_views: Vec<CustomViewSettingsRecordAggregate>,
}

impl SheetRecords {
    /// Decodes and walks a worksheet substream.
    pub fn from_bytes(bytes: &[u8], options: RecordStreamOptions) -> Result<Self, RecordFormatError> {
        Self::build(&mut RecordStream::from_bytes(bytes, options)?)
    }

    /// Consumes `stream` to the end.
    pub fn build(stream: &mut RecordStream) -> Result<Self, RecordFormatError> {
        let mut sheet = Self::default();
        while let Some(record_id) = stream.peek_sid() {
            if PageSettingsBlock::is_component_record(record_id) {
                match &mut sheet.page_settings {
                    Some(block) => {
                        log::debug!("late page settings record 0x{record_id:04X}");
                        block.add_late_records(stream)?;
                    }
                    None => {
                        sheet.page_settings = Some(PageSettingsBlock::build(stream)?);
                        sheet.slots.push(Slot::PageSettings);
                    }
                }
                continue;
            }
            if WorksheetProtectionBlock::is_component_record(record_id) {
                match &mut sheet.protection {
                    Some(block) => block.add_records(stream)?,
                    None => {
                        sheet.protection = Some(WorksheetProtectionBlock::build(stream)?);
                        sheet.slots.push(Slot::Protection);
                    }
                }
                continue;
            }

            match record_id {
                sid::USER_SVIEW_BEGIN => {
                    let view = CustomViewSettingsRecordAggregate::build(stream)?;
                    sheet.slots.push(Slot::CustomView(sheet.custom_views.len()));
                    sheet.custom_views.push(view);
                }
                sid::COL_INFO => {
                    if sheet.columns.is_some() {
                        return Err(RecordFormatError::Duplicate {
                            block: "ColumnInfoRecordsAggregate",
                            sid: record_id,
                        });
                    }
                    sheet.columns = Some(ColumnInfoRecordsAggregate::build(stream)?);
                    sheet.slots.push(Slot::ColumnInfo);
                }
                sid::CF_HEADER => {
                    if sheet.conditional_formats.is_some() {
                        return Err(RecordFormatError::Duplicate {
                            block: "ConditionalFormattingTable",
                            sid: record_id,
                        });
                    }
                    sheet.conditional_formats = Some(ConditionalFormattingTable::build(stream)?);
                    sheet.slots.push(Slot::ConditionalFormats);
                }
                sid::ROW => {
                    let lowest = sheet
                        .rows
                        .add_rows(stream)?
                        .map_or(0, |span| *span.start());
                    sheet.slots.push(Slot::Rows(lowest));
                }
                _ => {
                    sheet.slots.push(Slot::Record(sheet.records.len()));
                    sheet.records.push(stream.next_record()?);
                }
            }
        }

        if let Some(block) = &mut sheet.page_settings {
            block.position_records(&mut sheet.custom_views);
        }
        log::debug!(
            "walked {} records into {} slots",
            stream.count_read(),
            sheet.slots.len()
        );
        Ok(sheet)
    }

    pub fn page_settings(&self) -> Option<&PageSettingsBlock> {
        self.page_settings.as_ref()
    }

    /// The sheet's page settings, creating a default block if the sheet had none.
    pub fn page_settings_mut(&mut self) -> &mut PageSettingsBlock {
        if self.page_settings.is_none() {
            let at = self.insert_position(
                &[sid::COL_INFO, sid::DIMENSIONS],
                &[Slot::Protection, Slot::ColumnInfo],
            );
            self.slots.insert(at, Slot::PageSettings);
        }
        self.page_settings.get_or_insert_with(PageSettingsBlock::new)
    }

    pub fn protection(&self) -> Option<&WorksheetProtectionBlock> {
        self.protection.as_ref()
    }

    pub fn protection_mut(&mut self) -> &mut WorksheetProtectionBlock {
        if self.protection.is_none() {
            let at = match self.slots.iter().position(|s| *s == Slot::PageSettings) {
                Some(index) => index + 1,
                None => {
                    self.insert_position(&[sid::COL_INFO, sid::DIMENSIONS], &[Slot::ColumnInfo])
                }
            };
            self.slots.insert(at, Slot::Protection);
        }
        self.protection.get_or_insert_with(WorksheetProtectionBlock::new)
    }

    pub fn columns(&self) -> Option<&ColumnInfoRecordsAggregate> {
        self.columns.as_ref()
    }

    pub fn columns_mut(&mut self) -> &mut ColumnInfoRecordsAggregate {
        if self.columns.is_none() {
            let at = self.insert_position(&[sid::DIMENSIONS], &[]);
            self.slots.insert(at, Slot::ColumnInfo);
        }
        self.columns.get_or_insert_with(ColumnInfoRecordsAggregate::new)
    }

    pub fn rows(&self) -> &RowRecordsAggregate {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut RowRecordsAggregate {
        if !self.slots.iter().any(|s| matches!(s, Slot::Rows(_))) {
            let at = match self.record_position(sid::DIMENSIONS) {
                Some(index) => index + 1,
                None => self.insert_position(&[], &[]),
            };
            self.slots.insert(at, Slot::Rows(0));
        }
        &mut self.rows
    }

    pub fn conditional_formats(&self) -> Option<&ConditionalFormattingTable> {
        self.conditional_formats.as_ref()
    }

    pub fn conditional_formats_mut(&mut self) -> &mut ConditionalFormattingTable {
        if self.conditional_formats.is_none() {
            let at = self.insert_position(&[], &[]);
            self.slots.insert(at, Slot::ConditionalFormats);
        }
        self.conditional_formats
            .get_or_insert_with(ConditionalFormattingTable::new)
    }

    pub fn custom_views(&self) -> &[CustomViewSettingsRecordAggregate] {
        &self.custom_views
    }

    /// Records that are not part of any aggregate, in stream order.
    pub fn other_records(&self) -> &[Record] {
        &self.records
    }

    fn record_position(&self, record_id: u16) -> Option<usize> {
        self.slots.iter().position(|slot| match slot {
            Slot::Record(index) => self.records[*index].sid() == record_id,
            _ => false,
        })
    }

    /// Slot index in front of the first of `before_records` or `before_slots`, falling back to
    /// the position before `EOF` (or the end of the list).
    fn insert_position(&self, before_records: &[u16], before_slots: &[Slot]) -> usize {
        let found = self.slots.iter().position(|slot| match slot {
            Slot::Record(index) => before_records.contains(&self.records[*index].sid()),
            other => before_slots.contains(other),
        });
        found
            .or_else(|| self.record_position(sid::EOF))
            .unwrap_or(self.slots.len())
    }

    /// Row index range written by each `ROW` slot, in slot order.
    ///
    /// Bounds never decrease so that every row is written exactly once; the first run also takes
    /// rows before it and the last run everything after.
    fn row_bounds(&self) -> Vec<(u16, Option<u16>)> {
        let mut lowers = Vec::new();
        for slot in &self.slots {
            if let Slot::Rows(first) = *slot {
                let lower = match lowers.last() {
                    None => 0,
                    Some(&previous) => first.max(previous),
                };
                lowers.push(lower);
            }
        }
        lowers
            .iter()
            .enumerate()
            .map(|(i, &lower)| (lower, lowers.get(i + 1).copied()))
            .collect()
    }
}

impl RecordAggregate for SheetRecords {
    fn visit_records(&self, visitor: &mut dyn FnMut(&Record)) {
        let mut row_bounds = self.row_bounds().into_iter();
        for slot in &self.slots {
            match *slot {
                Slot::Record(index) => visitor(&self.records[index]),
                Slot::PageSettings => {
                    if let Some(block) = &self.page_settings {
                        block.visit_records(visitor);
                    }
                }
                Slot::Protection => {
                    if let Some(block) = &self.protection {
                        block.visit_records(visitor);
                    }
                }
                Slot::ColumnInfo => {
                    if let Some(columns) = &self.columns {
                        columns.visit_records(visitor);
                    }
                }
                Slot::ConditionalFormats => {
                    if let Some(table) = &self.conditional_formats {
                        table.visit_records(visitor);
                    }
                }
                Slot::Rows(_) => {
                    let Some((lower, upper)) = row_bounds.next() else {
                        continue;
                    };
                    let rows = match upper {
                        Some(upper) => self.rows.rows_in(lower..upper).collect::<Vec<_>>(),
                        None => self.rows.rows_in(lower..).collect(),
                    };
                    for row in rows {
                        visitor(&Record::Row(*row));
                    }
                }
                Slot::CustomView(index) => self.custom_views[index].visit_records(visitor),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ColumnInfo, HeaderFooterText, RowRecord};
    use pretty_assertions::assert_eq;

    fn unknown(record_id: u16) -> Record {
        Record::Unknown {
            sid: record_id,
            data: vec![0xAB, 0xCD],
        }
    }

    fn sids(records: &[Record]) -> Vec<u16> {
        records.iter().map(Record::sid).collect()
    }

    #[test]
    fn unchanged_sheet_is_written_back_in_order() {
        let records = vec![
            unknown(0x0809),
            Record::Header(HeaderFooterText::new("h")),
            Record::Footer(HeaderFooterText::new("f")),
            Record::HCenter(false),
            Record::Protect(true),
            Record::ColumnInfo(ColumnInfo::new(0, 3)),
            unknown(sid::DIMENSIONS),
            Record::Row(RowRecord::new(0)),
            Record::Row(RowRecord::new(1)),
            unknown(0x00FD),
            Record::Row(RowRecord::new(40)),
            unknown(0x00FD),
            unknown(sid::EOF),
        ];
        let sheet = SheetRecords::build(&mut RecordStream::new(records.clone())).unwrap();
        assert_eq!(sheet.rows().len(), 3);
        assert_eq!(
            sids(sheet.other_records()),
            vec![0x0809, sid::DIMENSIONS, 0x00FD, 0x00FD, sid::EOF]
        );
        assert_eq!(sheet.records(), records);
    }

    #[test]
    fn new_rows_are_written_by_the_run_covering_them() {
        let mut sheet = SheetRecords::build(&mut RecordStream::new(vec![
            Record::Row(RowRecord::new(0)),
            unknown(0x00FD),
            Record::Row(RowRecord::new(40)),
            unknown(0x00FD),
        ]))
        .unwrap();
        sheet.rows_mut().group_row_range(10, 11, true);
        sheet.rows_mut().group_row_range(50, 50, true);

        let rows: Vec<u16> = sheet
            .records()
            .iter()
            .filter_map(|r| match r {
                Record::Row(row) => Some(row.row),
                Record::Unknown { .. } => Some(u16::MAX),
                _ => None,
            })
            .collect();
        assert_eq!(rows, vec![0, 10, 11, u16::MAX, 40, 50, u16::MAX]);
    }

    #[test]
    fn unsorted_row_runs_keep_their_rows() {
        let records = vec![
            Record::Row(RowRecord::new(1)),
            Record::Row(RowRecord::new(0)),
            unknown(0x00FD),
            Record::Row(RowRecord::new(41)),
            Record::Row(RowRecord::new(40)),
            unknown(0x00FD),
        ];
        let sheet = SheetRecords::build(&mut RecordStream::new(records)).unwrap();

        let rows: Vec<u16> = sheet
            .records()
            .iter()
            .map(|r| match r {
                Record::Row(row) => row.row,
                _ => u16::MAX,
            })
            .collect();
        assert_eq!(rows, vec![0, 1, u16::MAX, 40, 41, u16::MAX]);
    }

    #[test]
    fn late_page_settings_records_join_the_block() {
        let records = vec![
            Record::Header(HeaderFooterText::default()),
            Record::Footer(HeaderFooterText::default()),
            unknown(0x0055),
            Record::VCenter(true),
        ];
        let sheet = SheetRecords::build(&mut RecordStream::new(records)).unwrap();
        assert!(sheet.page_settings().unwrap().vcenter());
        assert_eq!(
            sids(&sheet.records()),
            vec![sid::HEADER, sid::FOOTER, sid::VCENTER, 0x0055]
        );
    }

    #[test]
    fn second_column_info_run_is_rejected() {
        let mut stream = RecordStream::new(vec![
            Record::ColumnInfo(ColumnInfo::new(0, 0)),
            unknown(0x0055),
            Record::ColumnInfo(ColumnInfo::new(1, 1)),
        ]);
        assert_eq!(
            SheetRecords::build(&mut stream),
            Err(RecordFormatError::Duplicate {
                block: "ColumnInfoRecordsAggregate",
                sid: sid::COL_INFO
            })
        );
    }

    #[test]
    fn created_blocks_are_placed_before_dimensions_and_eof() {
        let mut sheet = SheetRecords::build(&mut RecordStream::new(vec![
            unknown(0x0809),
            unknown(sid::DIMENSIONS),
            unknown(sid::EOF),
        ]))
        .unwrap();
        sheet.protection_mut().protect_sheet(Some("abc"), false, false);
        sheet.page_settings_mut().set_header_text("&P");
        sheet.columns_mut().group_column_range(2, 3, true);
        sheet.rows_mut().group_row_range(0, 0, true);

        assert_eq!(
            sids(&sheet.records()),
            vec![
                0x0809,
                sid::HEADER,
                sid::FOOTER,
                sid::HCENTER,
                sid::VCENTER,
                sid::SETUP,
                sid::PROTECT,
                sid::OBJ_PROTECT,
                sid::SCEN_PROTECT,
                sid::PASSWORD,
                sid::COL_INFO,
                sid::DIMENSIONS,
                sid::ROW,
                sid::EOF,
            ]
        );
    }
}

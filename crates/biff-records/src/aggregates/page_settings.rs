use std::collections::HashMap;

use super::custom_view::CustomViewSettingsRecordAggregate;
use super::RecordAggregate;
use crate::error::RecordFormatError;
use crate::record::{
    sid, HeaderFooterExt, HeaderFooterText, MarginSide, PageBreaks, PrintSetup, Record,
};
use crate::stream::RecordStream;

const BLOCK: &str = "PageSettingsBlock";

/// Page setup records of a worksheet (or of a custom view).
///
/// Output order: row breaks, column breaks, header, footer, hcenter, vcenter, left/right/top/bottom
/// margins, PLS (each with its `CONTINUE` records), setup, print size, HeaderFooter, bitmap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageSettingsBlock {
    row_breaks: Option<PageBreaks>,
    column_breaks: Option<PageBreaks>,
    header: Option<HeaderFooterText>,
    footer: Option<HeaderFooterText>,
    hcenter: Option<bool>,
    vcenter: Option<bool>,
    margins: [Option<f64>; 4],
    pls: Vec<Vec<Record>>,
    setup: Option<PrintSetup>,
    print_size: Option<Record>,
    header_footer: Option<HeaderFooterExt>,
    bitmap: Option<Record>,
    /// HeaderFooter records that belong to custom views, until [`PageSettingsBlock::position_records`]
    /// hands them over.
    sview_header_footers: Vec<HeaderFooterExt>,
}

impl PageSettingsBlock {
    /// A block with the records Excel writes for a new sheet.
    pub fn new() -> Self {
        Self {
            row_breaks: Some(PageBreaks::default()),
            column_breaks: Some(PageBreaks::default()),
            header: Some(HeaderFooterText::default()),
            footer: Some(HeaderFooterText::default()),
            hcenter: Some(false),
            vcenter: Some(false),
            setup: Some(PrintSetup::default()),
            ..Self::default()
        }
    }

    /// Reads records while the next one belongs to this block.
    pub fn build(stream: &mut RecordStream) -> Result<Self, RecordFormatError> {
        let mut block = Self::default();
        while block.read_a_record(stream)? {}
        if block.header.is_none() || block.footer.is_none() {
            log::debug!("page settings block without header/footer, empty ones will be written");
        }
        Ok(block)
    }

    /// Whether `record_id` is one of the records this block owns.
    pub fn is_component_record(record_id: u16) -> bool {
        matches!(
            record_id,
            sid::HORIZONTAL_PAGE_BREAKS
                | sid::VERTICAL_PAGE_BREAKS
                | sid::HEADER
                | sid::FOOTER
                | sid::HCENTER
                | sid::VCENTER
                | sid::LEFT_MARGIN
                | sid::RIGHT_MARGIN
                | sid::TOP_MARGIN
                | sid::BOTTOM_MARGIN
                | sid::PLS
                | sid::SETUP
                | sid::PRINT_SIZE
                | sid::HEADER_FOOTER
                | sid::BITMAP
        )
    }

    fn read_a_record(&mut self, stream: &mut RecordStream) -> Result<bool, RecordFormatError> {
        let Some(record_id) = stream.peek_sid() else {
            return Ok(false);
        };
        if !Self::is_component_record(record_id) {
            return Ok(false);
        }
        if record_id == sid::PLS {
            let mut group = vec![stream.next_record()?];
            while stream.peek_sid() == Some(sid::CONTINUE) {
                group.push(stream.next_record()?);
            }
            self.pls.push(group);
            return Ok(true);
        }
        if record_id != sid::HEADER_FOOTER && self.has_record(record_id) {
            return Err(RecordFormatError::Duplicate {
                block: BLOCK,
                sid: record_id,
            });
        }

        match stream.next_record()? {
            Record::RowBreaks(breaks) => self.row_breaks = Some(breaks),
            Record::ColumnBreaks(breaks) => self.column_breaks = Some(breaks),
            Record::Header(text) => self.header = Some(text),
            Record::Footer(text) => self.footer = Some(text),
            Record::HCenter(flag) => self.hcenter = Some(flag),
            Record::VCenter(flag) => self.vcenter = Some(flag),
            Record::Margin { side, inches } => self.margins[side as usize] = Some(inches),
            Record::Setup(setup) => self.setup = Some(setup),
            Record::HeaderFooter(ext) => {
                // Several may exist, one per custom view.
                if !ext.is_current_sheet() {
                    self.sview_header_footers.push(ext);
                } else if self.header_footer.is_some() {
                    return Err(RecordFormatError::Duplicate {
                        block: BLOCK,
                        sid: record_id,
                    });
                } else {
                    self.header_footer = Some(ext);
                }
            }
            other @ Record::Unknown {
                sid: sid::PRINT_SIZE,
                ..
            } => self.print_size = Some(other),
            other @ Record::Unknown {
                sid: sid::BITMAP, ..
            } => self.bitmap = Some(other),
            other => {
                return Err(RecordFormatError::InvalidState {
                    block: BLOCK,
                    reason: format!("unexpected record 0x{:04X}", other.sid()),
                })
            }
        }
        Ok(true)
    }

    fn has_record(&self, record_id: u16) -> bool {
        match record_id {
            sid::HORIZONTAL_PAGE_BREAKS => self.row_breaks.is_some(),
            sid::VERTICAL_PAGE_BREAKS => self.column_breaks.is_some(),
            sid::HEADER => self.header.is_some(),
            sid::FOOTER => self.footer.is_some(),
            sid::HCENTER => self.hcenter.is_some(),
            sid::VCENTER => self.vcenter.is_some(),
            sid::SETUP => self.setup.is_some(),
            sid::PRINT_SIZE => self.print_size.is_some(),
            sid::HEADER_FOOTER => self.header_footer.is_some(),
            sid::BITMAP => self.bitmap.is_some(),
            other => MarginSide::from_sid(other)
                .is_some_and(|side| self.margins[side as usize].is_some()),
        }
    }

    /// Merges page settings records found after other sheet records.
    pub fn add_late_records(&mut self, stream: &mut RecordStream) -> Result<(), RecordFormatError> {
        while self.read_a_record(stream)? {}
        Ok(())
    }

    /// Adopts a HeaderFooter record found outside the block.
    pub fn add_late_header_footer(&mut self, ext: HeaderFooterExt) -> Result<(), RecordFormatError> {
        if self.header_footer.is_some() {
            return Err(RecordFormatError::InvalidState {
                block: BLOCK,
                reason: "block already has a HeaderFooter record".to_string(),
            });
        }
        log::debug!("merging late HeaderFooter record into page settings block");
        self.header_footer = Some(ext);
        Ok(())
    }

    /// Moves HeaderFooter records that name a custom view into that view.
    ///
    /// Records whose view does not exist are dropped from the output.
    pub fn position_records(&mut self, views: &mut [CustomViewSettingsRecordAggregate]) {
        if self.sview_header_footers.is_empty() {
            return;
        }
        let mut by_guid: HashMap<[u8; 16], HeaderFooterExt> = self
            .sview_header_footers
            .drain(..)
            .map(|ext| (ext.guid(), ext))
            .collect();

        for view in views.iter_mut() {
            if let Some(ext) = by_guid.remove(&view.guid()) {
                view.append(Record::HeaderFooter(ext));
            }
        }

        for (guid, ext) in by_guid {
            log::warn!("HeaderFooter record for unknown custom view {guid:02X?}");
            self.sview_header_footers.push(ext);
        }
    }

    /// HeaderFooter records still waiting for their custom view.
    pub fn unpositioned_header_footers(&self) -> &[HeaderFooterExt] {
        &self.sview_header_footers
    }

    pub fn header_text(&self) -> &str {
        self.header.as_ref().map_or("", HeaderFooterText::text)
    }

    pub fn set_header_text(&mut self, text: impl Into<String>) {
        self.header.get_or_insert_with(Default::default).set_text(text);
    }

    pub fn footer_text(&self) -> &str {
        self.footer.as_ref().map_or("", HeaderFooterText::text)
    }

    pub fn set_footer_text(&mut self, text: impl Into<String>) {
        self.footer.get_or_insert_with(Default::default).set_text(text);
    }

    pub fn hcenter(&self) -> bool {
        self.hcenter.unwrap_or(false)
    }

    pub fn set_hcenter(&mut self, value: bool) {
        self.hcenter = Some(value);
    }

    pub fn vcenter(&self) -> bool {
        self.vcenter.unwrap_or(false)
    }

    pub fn set_vcenter(&mut self, value: bool) {
        self.vcenter = Some(value);
    }

    /// Margin in inches, or Excel's default if the sheet does not store one.
    pub fn margin(&self, side: MarginSide) -> f64 {
        self.margins[side as usize].unwrap_or_else(|| side.default_inches())
    }

    pub fn set_margin(&mut self, side: MarginSide, inches: f64) {
        self.margins[side as usize] = Some(inches);
    }

    pub fn print_setup(&self) -> Option<&PrintSetup> {
        self.setup.as_ref()
    }

    pub fn print_setup_mut(&mut self) -> &mut PrintSetup {
        self.setup.get_or_insert_with(PrintSetup::default)
    }

    pub fn header_footer(&self) -> Option<&HeaderFooterExt> {
        self.header_footer.as_ref()
    }

    pub fn set_row_break(&mut self, row: u16, from_col: u16, to_col: u16) {
        self.row_breaks
            .get_or_insert_with(Default::default)
            .add(row, from_col, to_col);
    }

    pub fn remove_row_break(&mut self, row: u16) -> Result<(), RecordFormatError> {
        remove_break(&mut self.row_breaks, row, "row")
    }

    pub fn is_row_broken(&self, row: u16) -> bool {
        self.row_breaks.as_ref().is_some_and(|b| b.get(row).is_some())
    }

    pub fn row_breaks(&self) -> Vec<u16> {
        break_list(&self.row_breaks)
    }

    pub fn set_column_break(&mut self, col: u16, from_row: u16, to_row: u16) {
        self.column_breaks
            .get_or_insert_with(Default::default)
            .add(col, from_row, to_row);
    }

    pub fn remove_column_break(&mut self, col: u16) -> Result<(), RecordFormatError> {
        remove_break(&mut self.column_breaks, col, "column")
    }

    pub fn is_column_broken(&self, col: u16) -> bool {
        self.column_breaks
            .as_ref()
            .is_some_and(|b| b.get(col).is_some())
    }

    pub fn column_breaks(&self) -> Vec<u16> {
        break_list(&self.column_breaks)
    }

    /// Moves row breaks in `start..=end` by `count` rows.
    pub fn shift_row_breaks(&mut self, start: u16, end: u16, count: i32) {
        if let Some(breaks) = &mut self.row_breaks {
            shift_breaks(breaks, start, end, count);
        }
    }

    /// Moves column breaks in `start..=end` by `count` columns.
    pub fn shift_column_breaks(&mut self, start: u16, end: u16, count: i32) {
        if let Some(breaks) = &mut self.column_breaks {
            shift_breaks(breaks, start, end, count);
        }
    }
}

fn remove_break(
    breaks: &mut Option<PageBreaks>,
    main: u16,
    what: &str,
) -> Result<(), RecordFormatError> {
    match breaks {
        Some(breaks) if !breaks.is_empty() => {
            breaks.remove(main);
            Ok(())
        }
        _ => Err(RecordFormatError::InvalidState {
            block: BLOCK,
            reason: format!("sheet does not define any {what} breaks"),
        }),
    }
}

fn break_list(breaks: &Option<PageBreaks>) -> Vec<u16> {
    breaks
        .as_ref()
        .map(|b| b.iter().map(|b| b.main).collect())
        .unwrap_or_default()
}

fn shift_breaks(breaks: &mut PageBreaks, start: u16, end: u16, count: i32) {
    let moved: Vec<_> = breaks
        .iter()
        .filter(|b| start <= b.main && b.main <= end)
        .copied()
        .collect();
    for b in moved {
        breaks.remove(b.main);
        match u16::try_from(i32::from(b.main) + count) {
            Ok(main) => breaks.add(main, b.sub_from, b.sub_to),
            Err(_) => log::debug!("page break at {} shifted off the sheet", b.main),
        }
    }
}

impl RecordAggregate for PageSettingsBlock {
    fn visit_records(&self, visitor: &mut dyn FnMut(&Record)) {
        if let Some(breaks) = self.row_breaks.as_ref().filter(|b| !b.is_empty()) {
            visitor(&Record::RowBreaks(breaks.clone()));
        }
        if let Some(breaks) = self.column_breaks.as_ref().filter(|b| !b.is_empty()) {
            visitor(&Record::ColumnBreaks(breaks.clone()));
        }
        visitor(&Record::Header(self.header.clone().unwrap_or_default()));
        visitor(&Record::Footer(self.footer.clone().unwrap_or_default()));
        if let Some(flag) = self.hcenter {
            visitor(&Record::HCenter(flag));
        }
        if let Some(flag) = self.vcenter {
            visitor(&Record::VCenter(flag));
        }
        for side in MarginSide::ALL {
            if let Some(inches) = self.margins[side as usize] {
                visitor(&Record::Margin { side, inches });
            }
        }
        for record in self.pls.iter().flatten() {
            visitor(record);
        }
        if let Some(setup) = self.setup {
            visitor(&Record::Setup(setup));
        }
        if let Some(record) = &self.print_size {
            visitor(record);
        }
        if let Some(ext) = &self.header_footer {
            visitor(&Record::HeaderFooter(ext.clone()));
        }
        if let Some(record) = &self.bitmap {
            visitor(record);
        }
    }
}

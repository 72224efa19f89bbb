use super::page_settings::PageSettingsBlock;
use super::RecordAggregate;
use crate::error::RecordFormatError;
use crate::record::{sid, Record, UserSViewBegin};
use crate::stream::RecordStream;

const BLOCK: &str = "CustomViewSettingsRecordAggregate";

#[derive(Debug, Clone, PartialEq)]
pub enum CustomViewItem {
    Record(Record),
    PageSettings(PageSettingsBlock),
}

/// One custom view: `USERSVIEWBEGIN`, its settings, `USERSVIEWEND`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomViewSettingsRecordAggregate {
    begin: UserSViewBegin,
    items: Vec<CustomViewItem>,
    end: Record,
}

impl CustomViewSettingsRecordAggregate {
    pub fn build(stream: &mut RecordStream) -> Result<Self, RecordFormatError> {
        let begin = match stream.next_record()? {
            Record::UserSViewBegin(begin) => begin,
            other => {
                return Err(RecordFormatError::UnexpectedRecord {
                    block: BLOCK,
                    expected: sid::USER_SVIEW_BEGIN,
                    found: other.sid(),
                })
            }
        };

        let mut items = Vec::new();
        let mut page_settings: Option<usize> = None;
        loop {
            let record_id = stream
                .peek_sid()
                .ok_or(RecordFormatError::UnexpectedEnd { block: BLOCK })?;
            if record_id == sid::USER_SVIEW_END {
                break;
            }
            if !PageSettingsBlock::is_component_record(record_id) {
                items.push(CustomViewItem::Record(stream.next_record()?));
                continue;
            }

            let Some(index) = page_settings else {
                page_settings = Some(items.len());
                items.push(CustomViewItem::PageSettings(PageSettingsBlock::build(stream)?));
                continue;
            };
            // A second run of page settings records is only tolerated for a trailing HeaderFooter.
            let (Some(Record::HeaderFooter(ext)), Some(CustomViewItem::PageSettings(block))) =
                (stream.peek().cloned(), items.get_mut(index))
            else {
                return Err(RecordFormatError::InvalidState {
                    block: BLOCK,
                    reason: format!("more than one page settings block, had sid 0x{record_id:04X}"),
                });
            };
            stream.next_record()?;
            block.add_late_header_footer(ext)?;
        }
        let end = stream.next_record()?;

        Ok(Self { begin, items, end })
    }

    /// Identity shared with the view's HeaderFooter record.
    pub fn guid(&self) -> [u8; 16] {
        self.begin.guid()
    }

    pub fn items(&self) -> &[CustomViewItem] {
        &self.items
    }

    pub fn page_settings(&self) -> Option<&PageSettingsBlock> {
        self.items.iter().find_map(|item| match item {
            CustomViewItem::PageSettings(block) => Some(block),
            CustomViewItem::Record(_) => None,
        })
    }

    /// Adds a record at the end of the view, before `USERSVIEWEND`.
    pub fn append(&mut self, record: Record) {
        self.items.push(CustomViewItem::Record(record));
    }
}

impl RecordAggregate for CustomViewSettingsRecordAggregate {
    fn visit_records(&self, visitor: &mut dyn FnMut(&Record)) {
        if self.items.is_empty() {
            return;
        }
        visitor(&Record::UserSViewBegin(self.begin.clone()));
        for item in &self.items {
            match item {
                CustomViewItem::Record(record) => visitor(record),
                CustomViewItem::PageSettings(block) => block.visit_records(visitor),
            }
        }
        visitor(&self.end);
    }
}

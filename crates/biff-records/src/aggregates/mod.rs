//! Logical blocks rebuilt from the flat worksheet record stream.
//!
//! Each block is built from a [`RecordStream`](crate::RecordStream) by consuming the records it
//! owns and stopping at the first record it does not recognise. On write the block emits its
//! records in a fixed order, synthesizing any mandatory record that was absent.

mod column_info;
mod cond_formatting;
mod custom_view;
mod page_settings;
mod protection;
mod rows;

pub use column_info::{ColumnInfoRecordsAggregate, ColumnUpdate};
pub use cond_formatting::{CfRecordsAggregate, ConditionalFormattingTable, MAX_97_2003_RULES};
pub use custom_view::{CustomViewItem, CustomViewSettingsRecordAggregate};
pub use page_settings::PageSettingsBlock;
pub use protection::{hash_legacy_password, WorksheetProtectionBlock};
pub use rows::RowRecordsAggregate;

use crate::record::Record;

pub trait RecordAggregate {
    /// Calls `visitor` with every record of the block in output order.
    fn visit_records(&self, visitor: &mut dyn FnMut(&Record));

    fn records(&self) -> Vec<Record> {
        let mut out = Vec::new();
        self.visit_records(&mut |r| out.push(r.clone()));
        out
    }

    /// Number of bytes [`RecordAggregate::serialize`] writes.
    fn serialized_size(&self) -> usize {
        let mut size = 0;
        self.visit_records(&mut |r| size += r.record_size());
        size
    }

    fn serialize(&self, out: &mut Vec<u8>) -> usize {
        let mut written = 0;
        self.visit_records(&mut |r| written += r.serialize(out));
        written
    }
}

/// One run of an outline partition: indexes `first..=last` sharing the same outline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlineSegment {
    pub first: u32,
    pub last: u32,
    pub level: u8,
    pub hidden: bool,
    pub collapsed: bool,
}

impl OutlineSegment {
    fn plain(first: u32, last: u32) -> Self {
        Self {
            first,
            last,
            level: 0,
            hidden: false,
            collapsed: false,
        }
    }

    fn same_state(&self, other: &OutlineSegment) -> bool {
        self.level == other.level && self.hidden == other.hidden && self.collapsed == other.collapsed
    }
}

/// Tiles `0..=max_index` with `segments` (sorted, non-overlapping), filling gaps with level-0
/// segments and joining neighbours that share the same state.
///
/// Segments starting past `max_index` are dropped and the last one is clipped.
pub(crate) fn tile_segments(
    segments: impl IntoIterator<Item = OutlineSegment>,
    max_index: u32,
) -> Vec<OutlineSegment> {
    let mut out: Vec<OutlineSegment> = Vec::new();
    let mut push = |segment: OutlineSegment| match out.last_mut() {
        Some(prev) if prev.same_state(&segment) && prev.last + 1 == segment.first => {
            prev.last = segment.last;
        }
        _ => out.push(segment),
    };

    let mut next = 0u32;
    for mut segment in segments {
        if segment.first > max_index {
            break;
        }
        segment.last = segment.last.min(max_index);
        if segment.first > next {
            push(OutlineSegment::plain(next, segment.first - 1));
        }
        next = segment.last.saturating_add(1);
        push(segment);
    }
    if next <= max_index {
        push(OutlineSegment::plain(next, max_index));
    }
    out
}

/// Checks that `segments` cover `0..=max_index` exactly once, in order.
pub fn check_partition(segments: &[OutlineSegment], max_index: u32) -> Result<(), String> {
    let mut expected = 0u32;
    for (i, segment) in segments.iter().enumerate() {
        if segment.first != expected {
            return Err(format!(
                "segment {i} starts at {}, expected {expected}",
                segment.first
            ));
        }
        if segment.last < segment.first {
            return Err(format!(
                "segment {i} is reversed ({}..={})",
                segment.first, segment.last
            ));
        }
        if segment.last == max_index {
            return if i + 1 == segments.len() {
                Ok(())
            } else {
                Err(format!("segments continue past {max_index}"))
            };
        }
        expected = segment.last + 1;
    }
    Err(format!("segments stop before {max_index} (next index {expected})"))
}

use std::borrow::Cow;

use crate::error::RecordFormatError;
use crate::record::sid;

// Hard caps for coalescing BIFF `CONTINUE` records into a single logical record.
//
// A malformed stream can contain extremely long runs of `CONTINUE` records, which would otherwise
// result in unbounded allocations when fragments are concatenated.
#[cfg(not(test))]
const MAX_LOGICAL_RECORD_BYTES: usize = 16 * 1024 * 1024;
// Keep unit tests fast and memory-efficient by using a much smaller cap.
#[cfg(test)]
const MAX_LOGICAL_RECORD_BYTES: usize = 1024;

// Includes the initial record fragment and all subsequent `CONTINUE` fragments.
#[cfg(not(test))]
const MAX_LOGICAL_RECORD_FRAGMENTS: usize = 4096;
#[cfg(test)]
const MAX_LOGICAL_RECORD_FRAGMENTS: usize = 64;

/// Limits applied while decoding a record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordStreamOptions {
    /// Maximum payload size of a record after `CONTINUE` fragments are joined.
    pub max_logical_record_bytes: usize,
    /// Maximum number of physical fragments joined into one record.
    pub max_logical_record_fragments: usize,
}

impl Default for RecordStreamOptions {
    fn default() -> Self {
        Self {
            max_logical_record_bytes: MAX_LOGICAL_RECORD_BYTES,
            max_logical_record_fragments: MAX_LOGICAL_RECORD_FRAGMENTS,
        }
    }
}

/// Record ids whose payload may be split into trailing `CONTINUE` records.
///
/// PLS is absent: its `CONTINUE` records are kept as separate records and owned by
/// the page settings block.
pub(crate) fn allows_continuation(record_id: u16) -> bool {
    matches!(record_id, sid::CF_RULE | sid::HEADER_FOOTER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiffRecord<'a> {
    /// Offset of the record header in the parent stream.
    pub offset: usize,
    pub record_id: u16,
    pub data: &'a [u8],
}

/// Iterator over physical BIFF records.
///
/// A truncated header or payload yields an `Err` and terminates iteration.
pub struct BiffRecordIter<'a> {
    stream: &'a [u8],
    offset: usize,
}

impl<'a> BiffRecordIter<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self { stream, offset: 0 }
    }
}

impl<'a> Iterator for BiffRecordIter<'a> {
    type Item = Result<BiffRecord<'a>, RecordFormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.stream.len() {
            return None;
        }

        let offset = self.offset;
        let Some(header) = self.stream.get(offset..offset.saturating_add(4)) else {
            self.offset = self.stream.len();
            return Some(Err(RecordFormatError::TruncatedHeader { offset }));
        };
        let record_id = u16::from_le_bytes([header[0], header[1]]);
        let len = u16::from_le_bytes([header[2], header[3]]) as usize;

        let data_start = offset + 4;
        let data_end = data_start + len;
        let Some(data) = self.stream.get(data_start..data_end) else {
            self.offset = self.stream.len();
            return Some(Err(RecordFormatError::TruncatedRecord {
                sid: record_id,
                offset,
                len: self.stream.len(),
                end: data_end,
            }));
        };

        self.offset = data_end;
        Some(Ok(BiffRecord {
            offset,
            record_id,
            data,
        }))
    }
}

/// A logical BIFF record: one physical record plus any `CONTINUE` fragments joined onto it.
#[derive(Debug, Clone)]
pub struct LogicalBiffRecord<'a> {
    /// Byte offset of the physical record header in the parent stream.
    pub offset: usize,
    pub record_id: u16,
    pub data: Cow<'a, [u8]>,
    pub fragments: usize,
}

/// Iterates over BIFF records, combining `CONTINUE` fragments for record ids accepted by
/// [`allows_continuation`].
pub struct LogicalBiffRecordIter<'a> {
    iter: std::iter::Peekable<BiffRecordIter<'a>>,
    options: RecordStreamOptions,
    finished: bool,
}

impl<'a> LogicalBiffRecordIter<'a> {
    pub fn new(stream: &'a [u8], options: RecordStreamOptions) -> Self {
        Self {
            iter: BiffRecordIter::new(stream).peekable(),
            options,
            finished: false,
        }
    }
}

impl<'a> Iterator for LogicalBiffRecordIter<'a> {
    type Item = Result<LogicalBiffRecord<'a>, RecordFormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let first = match self.iter.next()? {
            Ok(record) => record,
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };

        let start_offset = first.offset;
        let record_id = first.record_id;
        let single = LogicalBiffRecord {
            offset: start_offset,
            record_id,
            data: Cow::Borrowed(first.data),
            fragments: 1,
        };

        if !allows_continuation(record_id) {
            return Some(Ok(single));
        }
        // Only allocate/copy when we actually see a CONTINUE record.
        match self.iter.peek() {
            Some(Ok(next)) if next.record_id == sid::CONTINUE => {}
            _ => return Some(Ok(single)),
        }

        let mut fragments = 1usize;
        let mut combined: Vec<u8> = first.data.to_vec();

        while let Some(Ok(next)) = self.iter.peek() {
            if next.record_id != sid::CONTINUE {
                break;
            }
            let next_len = next.data.len();

            let cap_bytes = self.options.max_logical_record_bytes;
            if combined.len().saturating_add(next_len) > cap_bytes {
                self.finished = true;
                return Some(Err(RecordFormatError::RecordTooLarge {
                    sid: record_id,
                    offset: start_offset,
                    max: cap_bytes,
                }));
            }
            let cap_fragments = self.options.max_logical_record_fragments;
            if fragments >= cap_fragments {
                self.finished = true;
                return Some(Err(RecordFormatError::TooManyFragments {
                    sid: record_id,
                    offset: start_offset,
                    max: cap_fragments,
                }));
            }

            if let Some(Ok(next)) = self.iter.next() {
                combined.extend_from_slice(next.data);
                fragments += 1;
            }
        }

        Some(Ok(LogicalBiffRecord {
            offset: start_offset,
            record_id,
            data: Cow::Owned(combined),
            fragments,
        }))
    }
}

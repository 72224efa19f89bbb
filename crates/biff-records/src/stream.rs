use std::collections::VecDeque;

use crate::error::RecordFormatError;
use crate::reader::{LogicalBiffRecordIter, RecordStreamOptions};
use crate::record::Record;

/// Lookahead cursor over an ordered record list.
///
/// Aggregates peek at the next record id and stop at the first id that does not belong to them,
/// leaving it for the caller.
#[derive(Debug, Clone)]
pub struct RecordStream {
    records: VecDeque<Record>,
    count_read: usize,
}

impl RecordStream {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
            count_read: 0,
        }
    }

    /// Decodes a worksheet substream into records, joining `CONTINUE` fragments where the record
    /// type allows it.
    pub fn from_bytes(stream: &[u8], options: RecordStreamOptions) -> Result<Self, RecordFormatError> {
        let mut records = Vec::new();
        for logical in LogicalBiffRecordIter::new(stream, options) {
            let logical = logical?;
            records.push(Record::decode(logical.record_id, &logical.data)?);
        }
        log::debug!("decoded {} records from {} bytes", records.len(), stream.len());
        Ok(Self::new(records))
    }

    pub fn has_next(&self) -> bool {
        !self.records.is_empty()
    }

    /// Id of the next record, or `None` at the end of the stream.
    pub fn peek_sid(&self) -> Option<u16> {
        self.records.front().map(Record::sid)
    }

    pub fn peek(&self) -> Option<&Record> {
        self.records.front()
    }

    pub fn next_record(&mut self) -> Result<Record, RecordFormatError> {
        let record = self
            .records
            .pop_front()
            .ok_or(RecordFormatError::EndOfStream)?;
        self.count_read += 1;
        Ok(record)
    }

    /// Number of records consumed so far.
    pub fn count_read(&self) -> usize {
        self.count_read
    }
}

impl From<Vec<Record>> for RecordStream {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sid;

    fn record(id: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn cursor_peeks_without_consuming() {
        let mut stream = RecordStream::new(vec![Record::HCenter(true), Record::VCenter(false)]);
        assert_eq!(stream.peek_sid(), Some(sid::HCENTER));
        assert_eq!(stream.peek_sid(), Some(sid::HCENTER));
        assert_eq!(stream.count_read(), 0);

        assert_eq!(stream.next_record().unwrap(), Record::HCenter(true));
        assert_eq!(stream.peek(), Some(&Record::VCenter(false)));
        assert_eq!(stream.next_record().unwrap(), Record::VCenter(false));

        assert!(!stream.has_next());
        assert_eq!(stream.peek_sid(), None);
        assert_eq!(stream.next_record(), Err(RecordFormatError::EndOfStream));
        assert_eq!(stream.count_read(), 2);
    }

    #[test]
    fn decodes_typed_records_from_bytes() {
        let bytes = [
            record(sid::PROTECT, &[1, 0]),
            record(0x0225, &[0xFF, 0x00, 0x2C, 0x01]),
        ]
        .concat();
        let mut stream = RecordStream::from_bytes(&bytes, RecordStreamOptions::default()).unwrap();
        assert_eq!(stream.next_record().unwrap(), Record::Protect(true));
        assert_eq!(
            stream.next_record().unwrap(),
            Record::Unknown {
                sid: 0x0225,
                data: vec![0xFF, 0x00, 0x2C, 0x01]
            }
        );
    }

    #[test]
    fn from_bytes_surfaces_truncation() {
        let mut bytes = record(sid::PROTECT, &[1, 0]);
        bytes.truncate(5);
        assert!(matches!(
            RecordStream::from_bytes(&bytes, RecordStreamOptions::default()),
            Err(RecordFormatError::TruncatedRecord { .. })
        ));
    }
}

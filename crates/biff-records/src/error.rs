use biff_ptg::RgceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordFormatError {
    #[error("truncated BIFF record header at offset {offset}")]
    TruncatedHeader { offset: usize },
    #[error(
        "BIFF record 0x{sid:04X} at offset {offset} extends past end of stream (len={len}, end={end})"
    )]
    TruncatedRecord {
        sid: u16,
        offset: usize,
        len: usize,
        end: usize,
    },
    #[error(
        "logical BIFF record 0x{sid:04X} at offset {offset} exceeds max continued size ({max} bytes)"
    )]
    RecordTooLarge { sid: u16, offset: usize, max: usize },
    #[error(
        "logical BIFF record 0x{sid:04X} at offset {offset} exceeds max continued fragments ({max} fragments)"
    )]
    TooManyFragments { sid: u16, offset: usize, max: usize },
    #[error("malformed record 0x{sid:04X}: {reason}")]
    Malformed { sid: u16, reason: String },
    #[error("Duplicate {block} record (sid=0x{sid:04X})")]
    Duplicate { block: &'static str, sid: u16 },
    #[error("{block}: expected record 0x{expected:04X}, found 0x{found:04X}")]
    UnexpectedRecord {
        block: &'static str,
        expected: u16,
        found: u16,
    },
    #[error("{block}: record stream ended before the block was complete")]
    UnexpectedEnd { block: &'static str },
    #[error("attempt to read past end of record stream")]
    EndOfStream,
    #[error("{block}: {reason}")]
    InvalidState { block: &'static str, reason: String },
    #[error(transparent)]
    Rgce(#[from] RgceError),
}

impl RecordFormatError {
    pub(crate) fn malformed(sid: u16, reason: impl Into<String>) -> Self {
        RecordFormatError::Malformed {
            sid,
            reason: reason.into(),
        }
    }
}

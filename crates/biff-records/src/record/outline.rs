use super::{parse_u16_at, sid};
use crate::error::RecordFormatError;

// COLINFO flags. See [MS-XLS] 2.4.53.
const COLINFO_HIDDEN: u16 = 0x0001;
const COLINFO_OUTLINE_LEVEL_MASK: u16 = 0x0700;
const COLINFO_OUTLINE_LEVEL_SHIFT: u16 = 8;
const COLINFO_COLLAPSED: u16 = 0x1000;

// ROW flags. See [MS-XLS] 2.4.221.
const ROW_OUTLINE_LEVEL_MASK: u16 = 0x0007;
const ROW_COLLAPSED: u16 = 0x0010;
const ROW_ZERO_HEIGHT: u16 = 0x0020;
const ROW_ALWAYS_SET: u16 = 0x0100;

/// Deepest outline level Excel supports.
pub const MAX_OUTLINE_LEVEL: u8 = 7;

/// COLINFO [MS-XLS 2.4.53]: formatting for columns `first_col..=last_col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnInfo {
    pub first_col: u16,
    pub last_col: u16,
    pub width: u16,
    pub xf_index: u16,
    pub options: u16,
    pub reserved: u16,
    /// Read from a 10-byte payload without the trailing reserved field; written back the same way.
    pub omitted_reserved: bool,
}

impl ColumnInfo {
    pub(crate) const SIZE: usize = 12;

    /// A column range with Excel's default formatting.
    pub fn new(first_col: u16, last_col: u16) -> Self {
        Self {
            first_col,
            last_col,
            width: 2275,
            xf_index: 0x0F,
            options: 2,
            reserved: 2,
            omitted_reserved: false,
        }
    }

    pub(crate) fn parse(data: &[u8]) -> Result<Self, RecordFormatError> {
        // Some writers omit the trailing reserved field.
        if data.len() != Self::SIZE && data.len() != Self::SIZE - 2 {
            return Err(RecordFormatError::malformed(
                sid::COL_INFO,
                format!("payload is {} bytes, expected {}", data.len(), Self::SIZE),
            ));
        }
        let u16_at = |offset| parse_u16_at(data, offset).unwrap_or_default();
        let info = Self {
            first_col: u16_at(0),
            last_col: u16_at(2),
            width: u16_at(4),
            xf_index: u16_at(6),
            options: u16_at(8),
            reserved: u16_at(10),
            omitted_reserved: data.len() == Self::SIZE - 2,
        };
        if info.first_col > info.last_col {
            return Err(RecordFormatError::malformed(
                sid::COL_INFO,
                format!("column range {}..={} out of order", info.first_col, info.last_col),
            ));
        }
        Ok(info)
    }

    pub(crate) fn data_size(&self) -> usize {
        if self.omitted_reserved {
            Self::SIZE - 2
        } else {
            Self::SIZE
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        for v in [
            self.first_col,
            self.last_col,
            self.width,
            self.xf_index,
            self.options,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        if !self.omitted_reserved {
            out.extend_from_slice(&self.reserved.to_le_bytes());
        }
    }

    pub fn contains(&self, col: u16) -> bool {
        self.first_col <= col && col <= self.last_col
    }

    pub fn is_adjacent_before(&self, other: &ColumnInfo) -> bool {
        u32::from(self.last_col) + 1 == u32::from(other.first_col)
    }

    /// Whether both records describe the same formatting, ignoring the column range.
    pub fn format_matches(&self, other: &ColumnInfo) -> bool {
        self.width == other.width
            && self.xf_index == other.xf_index
            && self.options == other.options
    }

    pub fn hidden(&self) -> bool {
        self.options & COLINFO_HIDDEN != 0
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        set_bit(&mut self.options, COLINFO_HIDDEN, hidden);
    }

    pub fn outline_level(&self) -> u8 {
        ((self.options & COLINFO_OUTLINE_LEVEL_MASK) >> COLINFO_OUTLINE_LEVEL_SHIFT) as u8
    }

    pub fn set_outline_level(&mut self, level: u8) {
        let level = u16::from(level.min(MAX_OUTLINE_LEVEL));
        self.options = (self.options & !COLINFO_OUTLINE_LEVEL_MASK)
            | (level << COLINFO_OUTLINE_LEVEL_SHIFT);
    }

    pub fn collapsed(&self) -> bool {
        self.options & COLINFO_COLLAPSED != 0
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        set_bit(&mut self.options, COLINFO_COLLAPSED, collapsed);
    }
}

/// ROW [MS-XLS 2.4.221].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRecord {
    pub row: u16,
    pub first_col: u16,
    pub last_col: u16,
    pub height: u16,
    pub optimize: u16,
    pub reserved: u16,
    pub options: u16,
    pub xf_options: u16,
}

impl RowRecord {
    pub(crate) const SIZE: usize = 16;

    /// An empty row with default height and formatting.
    pub fn new(row: u16) -> Self {
        Self {
            row,
            first_col: 0,
            last_col: 0,
            height: 0x00FF,
            optimize: 0,
            reserved: 0,
            options: ROW_ALWAYS_SET,
            xf_options: 0x0F,
        }
    }

    pub(crate) fn parse(data: &[u8]) -> Result<Self, RecordFormatError> {
        if data.len() != Self::SIZE {
            return Err(RecordFormatError::malformed(
                sid::ROW,
                format!("payload is {} bytes, expected {}", data.len(), Self::SIZE),
            ));
        }
        let u16_at = |offset| parse_u16_at(data, offset).unwrap_or_default();
        Ok(Self {
            row: u16_at(0),
            first_col: u16_at(2),
            last_col: u16_at(4),
            height: u16_at(6),
            optimize: u16_at(8),
            reserved: u16_at(10),
            options: u16_at(12),
            xf_options: u16_at(14),
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        for v in [
            self.row,
            self.first_col,
            self.last_col,
            self.height,
            self.optimize,
            self.reserved,
            self.options,
            self.xf_options,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    pub fn outline_level(&self) -> u8 {
        (self.options & ROW_OUTLINE_LEVEL_MASK) as u8
    }

    pub fn set_outline_level(&mut self, level: u8) {
        let level = u16::from(level.min(MAX_OUTLINE_LEVEL));
        self.options = (self.options & !ROW_OUTLINE_LEVEL_MASK) | level;
    }

    pub fn collapsed(&self) -> bool {
        self.options & ROW_COLLAPSED != 0
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        set_bit(&mut self.options, ROW_COLLAPSED, collapsed);
    }

    /// `fDyZero`: the row is hidden.
    pub fn zero_height(&self) -> bool {
        self.options & ROW_ZERO_HEIGHT != 0
    }

    pub fn set_zero_height(&mut self, hidden: bool) {
        set_bit(&mut self.options, ROW_ZERO_HEIGHT, hidden);
    }
}

fn set_bit(options: &mut u16, mask: u16, on: bool) {
    if on {
        *options |= mask;
    } else {
        *options &= !mask;
    }
}

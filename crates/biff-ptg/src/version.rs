/// Grid limits of the spreadsheet format a workbook is written in.
///
/// The limits are carried explicitly by every shift operation rather than being read from
/// process-wide state, so the same code can shift `.xls` (BIFF8) and larger grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpreadsheetVersion {
    /// BIFF8 (`.xls`): 65,536 rows by 256 columns.
    #[default]
    Excel97,
    /// OOXML-sized grid: 1,048,576 rows by 16,384 columns.
    Excel2007,
}

impl SpreadsheetVersion {
    /// Largest valid 0-based row index.
    pub const fn last_row_index(self) -> u32 {
        match self {
            SpreadsheetVersion::Excel97 => 0xFFFF,
            SpreadsheetVersion::Excel2007 => 0x000F_FFFF,
        }
    }

    /// Largest valid 0-based column index.
    pub const fn last_column_index(self) -> u32 {
        match self {
            SpreadsheetVersion::Excel97 => 0x00FF,
            SpreadsheetVersion::Excel2007 => 0x3FFF,
        }
    }

    pub const fn max_rows(self) -> u32 {
        self.last_row_index() + 1
    }

    pub const fn max_columns(self) -> u32 {
        self.last_column_index() + 1
    }
}

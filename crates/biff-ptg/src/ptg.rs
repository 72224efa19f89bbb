//! Reference tokens (`Ptg`s) that the shifter operates on.
//!
//! Only the operand tokens that point at cells are modelled here; every other token kind is
//! left as raw bytes by [`crate::shift_rgce`].

use crate::RgceError;

// Cell reference field encodings. See [MS-XLS] 2.5.198.x (PtgRef/PtgArea and friends).
pub(crate) const COL_INDEX_MASK: u16 = 0x3FFF;
pub(crate) const ROW_RELATIVE_BIT: u16 = 0x8000;
pub(crate) const COL_RELATIVE_BIT: u16 = 0x4000;

// Base token ids (reference operand class). The value/array classes add 0x20/0x40.
pub(crate) const PTG_REF: u8 = 0x24;
pub(crate) const PTG_AREA: u8 = 0x25;
pub(crate) const PTG_REF_ERR: u8 = 0x2A;
pub(crate) const PTG_AREA_ERR: u8 = 0x2B;
pub(crate) const PTG_REF_3D: u8 = 0x3A;
pub(crate) const PTG_AREA_3D: u8 = 0x3B;
pub(crate) const PTG_REF_ERR_3D: u8 = 0x3C;
pub(crate) const PTG_AREA_ERR_3D: u8 = 0x3D;

const BIFF8_MAX_COL_FIELD: u32 = COL_INDEX_MASK as u32;

/// Operand class carried in bits 5-6 of a token id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperandClass {
    #[default]
    Reference,
    Value,
    Array,
}

impl OperandClass {
    pub fn from_ptg_id(id: u8) -> Option<Self> {
        match id & 0x60 {
            0x20 => Some(OperandClass::Reference),
            0x40 => Some(OperandClass::Value),
            0x60 => Some(OperandClass::Array),
            _ => None,
        }
    }

    /// Applies this class to a reference-class token id (`0x2X`/`0x3X`).
    pub fn apply(self, base_id: u8) -> u8 {
        let low = base_id & 0x1F;
        match self {
            OperandClass::Reference => 0x20 | low,
            OperandClass::Value => 0x40 | low,
            OperandClass::Array => 0x60 | low,
        }
    }
}

/// One row or column coordinate of a reference plus its relative/absolute flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bound {
    pub index: u32,
    pub relative: bool,
}

impl Bound {
    pub const fn absolute(index: u32) -> Self {
        Self {
            index,
            relative: false,
        }
    }

    pub const fn relative(index: u32) -> Self {
        Self {
            index,
            relative: true,
        }
    }
}

/// A single-cell reference (`A1`, `$B$7`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: Bound,
    pub col: Bound,
}

impl CellRef {
    pub const fn new(row: Bound, col: Bound) -> Self {
        Self { row, col }
    }
}

/// A rectangular range (`A1:C7`). Each of the four bounds has its own relative flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaRef {
    pub first_row: Bound,
    pub last_row: Bound,
    pub first_col: Bound,
    pub last_col: Bound,
}

impl AreaRef {
    pub const fn new(first_row: Bound, last_row: Bound, first_col: Bound, last_col: Bound) -> Self {
        Self {
            first_row,
            last_row,
            first_col,
            last_col,
        }
    }

    /// Fully absolute area, as used for conditional formatting ranges.
    pub const fn absolute(first_row: u32, last_row: u32, first_col: u32, last_col: u32) -> Self {
        Self::new(
            Bound::absolute(first_row),
            Bound::absolute(last_row),
            Bound::absolute(first_col),
            Bound::absolute(last_col),
        )
    }

    /// Swaps bounds (including their relative flags) so that `first <= last` on both axes.
    pub fn normalize(&mut self) {
        if self.first_row.index > self.last_row.index {
            std::mem::swap(&mut self.first_row, &mut self.last_row);
        }
        if self.first_col.index > self.last_col.index {
            std::mem::swap(&mut self.first_col, &mut self.last_col);
        }
    }
}

/// Sheet scope of a workbook-qualified reference (`[1]Sheet2!A1` or `Sheet2!A1` in a format
/// that names sheets instead of using EXTERNSHEET slots).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookSheet {
    /// External workbook number. `None` (or `Some(0)`) is the current workbook.
    pub workbook: Option<u32>,
    pub sheet_name: String,
}

impl BookSheet {
    pub fn local(sheet_name: impl Into<String>) -> Self {
        Self {
            workbook: None,
            sheet_name: sheet_name.into(),
        }
    }

    pub fn is_current_workbook(&self) -> bool {
        matches!(self.workbook, None | Some(0))
    }
}

/// Where a token's cells live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetScope<'a> {
    /// The sheet that holds the formula.
    Local,
    /// An EXTERNSHEET slot (`ixti`).
    Slot(u16),
    /// A named sheet, possibly in another workbook.
    Book(&'a BookSheet),
}

/// Discriminant of [`Ptg`], useful for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PtgKind {
    Ref,
    Area,
    Ref3d,
    Area3d,
    BookRef,
    BookArea,
    RefErr,
    AreaErr,
    RefErr3d,
    AreaErr3d,
    BookRefErr,
    BookAreaErr,
}

/// A reference operand token.
///
/// Every live variant has a destroyed counterpart (`*Err`) that formulas evaluate to `#REF!`.
/// Destroyed tokens keep the sheet scope of the token they replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ptg {
    Ref(CellRef),
    Area(AreaRef),
    Ref3d { sheet: u16, cell: CellRef },
    Area3d { sheet: u16, area: AreaRef },
    BookRef { book: BookSheet, cell: CellRef },
    BookArea { book: BookSheet, area: AreaRef },
    RefErr,
    AreaErr,
    RefErr3d { sheet: u16 },
    AreaErr3d { sheet: u16 },
    BookRefErr { book: BookSheet },
    BookAreaErr { book: BookSheet },
}

impl Ptg {
    pub fn kind(&self) -> PtgKind {
        match self {
            Ptg::Ref(_) => PtgKind::Ref,
            Ptg::Area(_) => PtgKind::Area,
            Ptg::Ref3d { .. } => PtgKind::Ref3d,
            Ptg::Area3d { .. } => PtgKind::Area3d,
            Ptg::BookRef { .. } => PtgKind::BookRef,
            Ptg::BookArea { .. } => PtgKind::BookArea,
            Ptg::RefErr => PtgKind::RefErr,
            Ptg::AreaErr => PtgKind::AreaErr,
            Ptg::RefErr3d { .. } => PtgKind::RefErr3d,
            Ptg::AreaErr3d { .. } => PtgKind::AreaErr3d,
            Ptg::BookRefErr { .. } => PtgKind::BookRefErr,
            Ptg::BookAreaErr { .. } => PtgKind::BookAreaErr,
        }
    }

    pub fn scope(&self) -> SheetScope<'_> {
        match self {
            Ptg::Ref(_) | Ptg::Area(_) | Ptg::RefErr | Ptg::AreaErr => SheetScope::Local,
            Ptg::Ref3d { sheet, .. }
            | Ptg::Area3d { sheet, .. }
            | Ptg::RefErr3d { sheet }
            | Ptg::AreaErr3d { sheet } => SheetScope::Slot(*sheet),
            Ptg::BookRef { book, .. }
            | Ptg::BookArea { book, .. }
            | Ptg::BookRefErr { book }
            | Ptg::BookAreaErr { book } => SheetScope::Book(book),
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(
            self,
            Ptg::RefErr
                | Ptg::AreaErr
                | Ptg::RefErr3d { .. }
                | Ptg::AreaErr3d { .. }
                | Ptg::BookRefErr { .. }
                | Ptg::BookAreaErr { .. }
        )
    }

    pub fn is_area(&self) -> bool {
        matches!(
            self,
            Ptg::Area(_)
                | Ptg::Area3d { .. }
                | Ptg::BookArea { .. }
                | Ptg::AreaErr
                | Ptg::AreaErr3d { .. }
                | Ptg::BookAreaErr { .. }
        )
    }

    pub fn cell(&self) -> Option<&CellRef> {
        match self {
            Ptg::Ref(cell) | Ptg::Ref3d { cell, .. } | Ptg::BookRef { cell, .. } => Some(cell),
            _ => None,
        }
    }

    pub fn area(&self) -> Option<&AreaRef> {
        match self {
            Ptg::Area(area) | Ptg::Area3d { area, .. } | Ptg::BookArea { area, .. } => Some(area),
            _ => None,
        }
    }

    /// The destroyed counterpart of this token. Destroyed tokens map to themselves.
    pub fn deleted(&self) -> Ptg {
        match self {
            Ptg::Ref(_) | Ptg::RefErr => Ptg::RefErr,
            Ptg::Area(_) | Ptg::AreaErr => Ptg::AreaErr,
            Ptg::Ref3d { sheet, .. } | Ptg::RefErr3d { sheet } => Ptg::RefErr3d { sheet: *sheet },
            Ptg::Area3d { sheet, .. } | Ptg::AreaErr3d { sheet } => {
                Ptg::AreaErr3d { sheet: *sheet }
            }
            Ptg::BookRef { book, .. } | Ptg::BookRefErr { book } => {
                Ptg::BookRefErr { book: book.clone() }
            }
            Ptg::BookArea { book, .. } | Ptg::BookAreaErr { book } => {
                Ptg::BookAreaErr { book: book.clone() }
            }
        }
    }

    /// Encoded size in a BIFF8 rgce, including the token id byte.
    pub fn biff8_size(&self) -> Option<usize> {
        match self {
            Ptg::Ref(_) | Ptg::RefErr => Some(5),
            Ptg::Area(_) | Ptg::AreaErr => Some(9),
            Ptg::Ref3d { .. } | Ptg::RefErr3d { .. } => Some(7),
            Ptg::Area3d { .. } | Ptg::AreaErr3d { .. } => Some(11),
            Ptg::BookRef { .. }
            | Ptg::BookArea { .. }
            | Ptg::BookRefErr { .. }
            | Ptg::BookAreaErr { .. } => None,
        }
    }

    /// Decodes the reference token starting at `input[0]`.
    ///
    /// Returns `Ok(None)` for token ids that are not cell references. On success the second
    /// tuple element is the number of bytes consumed (token id included).
    pub fn read_biff8(input: &[u8]) -> Result<Option<(Ptg, OperandClass, usize)>, RgceError> {
        let Some(&id) = input.first() else {
            return Err(RgceError::UnexpectedEnd { offset: 0 });
        };
        let Some(class) = OperandClass::from_ptg_id(id) else {
            return Ok(None);
        };
        let base = OperandClass::Reference.apply(id);
        let len = match base {
            PTG_REF | PTG_REF_ERR => 4,
            PTG_AREA | PTG_AREA_ERR => 8,
            PTG_REF_3D | PTG_REF_ERR_3D => 6,
            PTG_AREA_3D | PTG_AREA_ERR_3D => 10,
            _ => return Ok(None),
        };
        let data = input
            .get(1..1 + len)
            .ok_or(RgceError::UnexpectedEnd { offset: input.len() })?;
        let u16_at = |offset: usize| u16::from_le_bytes([data[offset], data[offset + 1]]);

        let ptg = match base {
            PTG_REF => Ptg::Ref(decode_cell(u16_at(0), u16_at(2))),
            PTG_AREA => Ptg::Area(decode_area(u16_at(0), u16_at(2), u16_at(4), u16_at(6))),
            PTG_REF_ERR => Ptg::RefErr,
            PTG_AREA_ERR => Ptg::AreaErr,
            PTG_REF_3D => Ptg::Ref3d {
                sheet: u16_at(0),
                cell: decode_cell(u16_at(2), u16_at(4)),
            },
            PTG_AREA_3D => Ptg::Area3d {
                sheet: u16_at(0),
                area: decode_area(u16_at(2), u16_at(4), u16_at(6), u16_at(8)),
            },
            PTG_REF_ERR_3D => Ptg::RefErr3d { sheet: u16_at(0) },
            _ => Ptg::AreaErr3d { sheet: u16_at(0) },
        };
        Ok(Some((ptg, class, 1 + len)))
    }

    /// Appends the BIFF8 encoding of this token.
    ///
    /// Destroyed tokens are written with zeroed coordinates. Workbook-qualified tokens have no
    /// BIFF8 form and are rejected.
    pub fn write_biff8(&self, class: OperandClass, out: &mut Vec<u8>) -> Result<(), RgceError> {
        match self {
            Ptg::Ref(cell) => {
                out.push(class.apply(PTG_REF));
                write_cell(cell, out)?;
            }
            Ptg::Area(area) => {
                out.push(class.apply(PTG_AREA));
                write_area(area, out)?;
            }
            Ptg::Ref3d { sheet, cell } => {
                out.push(class.apply(PTG_REF_3D));
                out.extend_from_slice(&sheet.to_le_bytes());
                write_cell(cell, out)?;
            }
            Ptg::Area3d { sheet, area } => {
                out.push(class.apply(PTG_AREA_3D));
                out.extend_from_slice(&sheet.to_le_bytes());
                write_area(area, out)?;
            }
            Ptg::RefErr => {
                out.push(class.apply(PTG_REF_ERR));
                out.extend_from_slice(&[0; 4]);
            }
            Ptg::AreaErr => {
                out.push(class.apply(PTG_AREA_ERR));
                out.extend_from_slice(&[0; 8]);
            }
            Ptg::RefErr3d { sheet } => {
                out.push(class.apply(PTG_REF_ERR_3D));
                out.extend_from_slice(&sheet.to_le_bytes());
                out.extend_from_slice(&[0; 4]);
            }
            Ptg::AreaErr3d { sheet } => {
                out.push(class.apply(PTG_AREA_ERR_3D));
                out.extend_from_slice(&sheet.to_le_bytes());
                out.extend_from_slice(&[0; 8]);
            }
            Ptg::BookRef { .. }
            | Ptg::BookArea { .. }
            | Ptg::BookRefErr { .. }
            | Ptg::BookAreaErr { .. } => {
                return Err(RgceError::NotEncodable { kind: self.kind() });
            }
        }
        Ok(())
    }
}

fn decode_row_col(row: u16, col_field: u16) -> (Bound, Bound) {
    (
        Bound {
            index: u32::from(row),
            relative: col_field & ROW_RELATIVE_BIT != 0,
        },
        Bound {
            index: u32::from(col_field & COL_INDEX_MASK),
            relative: col_field & COL_RELATIVE_BIT != 0,
        },
    )
}

fn decode_cell(row: u16, col_field: u16) -> CellRef {
    let (row, col) = decode_row_col(row, col_field);
    CellRef { row, col }
}

fn decode_area(row1: u16, row2: u16, col1: u16, col2: u16) -> AreaRef {
    let (first_row, first_col) = decode_row_col(row1, col1);
    let (last_row, last_col) = decode_row_col(row2, col2);
    AreaRef {
        first_row,
        last_row,
        first_col,
        last_col,
    }
}

fn encode_row(row: Bound) -> Result<u16, RgceError> {
    u16::try_from(row.index).map_err(|_| RgceError::RowOutOfRange { row: row.index })
}

fn encode_col_field(row: Bound, col: Bound) -> Result<u16, RgceError> {
    if col.index > BIFF8_MAX_COL_FIELD {
        return Err(RgceError::ColumnOutOfRange { col: col.index });
    }
    let mut field = col.index as u16;
    if row.relative {
        field |= ROW_RELATIVE_BIT;
    }
    if col.relative {
        field |= COL_RELATIVE_BIT;
    }
    Ok(field)
}

fn write_cell(cell: &CellRef, out: &mut Vec<u8>) -> Result<(), RgceError> {
    out.extend_from_slice(&encode_row(cell.row)?.to_le_bytes());
    out.extend_from_slice(&encode_col_field(cell.row, cell.col)?.to_le_bytes());
    Ok(())
}

fn write_area(area: &AreaRef, out: &mut Vec<u8>) -> Result<(), RgceError> {
    out.extend_from_slice(&encode_row(area.first_row)?.to_le_bytes());
    out.extend_from_slice(&encode_row(area.last_row)?.to_le_bytes());
    out.extend_from_slice(&encode_col_field(area.first_row, area.first_col)?.to_le_bytes());
    out.extend_from_slice(&encode_col_field(area.last_row, area.last_col)?.to_le_bytes());
    Ok(())
}

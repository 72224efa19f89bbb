//! BIFF formula reference tokens and the rules for shifting them.
//!
//! This crate covers the part of Excel's formula token stream (`rgce`) that structural edits
//! have to touch:
//! - [`Ptg`]: cell and area reference tokens, sheet-local, 3D (EXTERNSHEET slot) and
//!   workbook-qualified (sheet name), each with its destroyed `#REF!` counterpart
//! - [`ShiftDescriptor`]: row/column move and copy, and sheet reordering
//! - [`shift_rgce`]: apply a shift to an encoded BIFF8 `rgce` without disturbing the other tokens
//!
//! Formula evaluation and formula text are out of scope.

mod ptg;
mod rgce;
mod shift;
mod version;

pub use ptg::{AreaRef, BookSheet, Bound, CellRef, OperandClass, Ptg, PtgKind, SheetScope};
pub use rgce::{rgce_references, shift_rgce, RgceError, RgceRef};
pub use shift::{ShiftDescriptor, ShiftError, ShiftMode};
pub use version::SpreadsheetVersion;

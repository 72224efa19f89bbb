//! BIFF8 `rgce` (formula token stream) walking.

use thiserror::Error;

use crate::ptg::{OperandClass, Ptg, PtgKind};
use crate::{ShiftDescriptor, ShiftError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RgceError {
    #[error("unexpected end of rgce at offset {offset}")]
    UnexpectedEnd { offset: usize },
    #[error("unsupported ptg 0x{ptg:02X} at offset {offset}")]
    UnsupportedToken { ptg: u8, offset: usize },
    #[error("row {row} does not fit a BIFF8 reference")]
    RowOutOfRange { row: u32 },
    #[error("column {col} does not fit a BIFF8 reference")]
    ColumnOutOfRange { col: u32 },
    #[error("{kind:?} token has no BIFF8 encoding")]
    NotEncodable { kind: PtgKind },
    #[error(transparent)]
    Shift(#[from] ShiftError),
}

/// A reference token found in an rgce, with its byte position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgceRef {
    pub offset: usize,
    pub len: usize,
    pub class: OperandClass,
    pub ptg: Ptg,
}

// PtgAttr bits. See [MS-XLS] 2.5.198.34.
const T_ATTR_CHOOSE: u8 = 0x04;

/// Returns every cell reference token in `rgce`, in stream order.
pub fn rgce_references(rgce: &[u8]) -> Result<Vec<RgceRef>, RgceError> {
    let mut refs = Vec::new();
    let mut i = 0usize;
    while i < rgce.len() {
        let ptg = rgce[i];
        if let Some((decoded, class, len)) = Ptg::read_biff8(&rgce[i..])? {
            refs.push(RgceRef {
                offset: i,
                len,
                class,
                ptg: decoded,
            });
            i += len;
            continue;
        }
        i += 1 + non_reference_payload_len(rgce, i, ptg)?;
    }
    Ok(refs)
}

/// Applies `shifter` to every reference token in `rgce`, rewriting changed tokens in place.
///
/// Tokens that did not change keep their original bytes. Returns `true` if anything changed.
pub fn shift_rgce(
    rgce: &mut Vec<u8>,
    shifter: &ShiftDescriptor,
    current_sheet: u16,
) -> Result<bool, RgceError> {
    let refs = rgce_references(rgce)?;

    let mut out = Vec::with_capacity(rgce.len());
    let mut copied_to = 0usize;
    let mut changed = 0usize;
    let mut destroyed = 0usize;
    for r in refs {
        let Some(updated) = shifter.adjust_ptg(&r.ptg, current_sheet)? else {
            continue;
        };
        out.extend_from_slice(&rgce[copied_to..r.offset]);
        updated.write_biff8(r.class, &mut out)?;
        copied_to = r.offset + r.len;
        changed += 1;
        if updated.is_deleted() {
            destroyed += 1;
        }
    }

    if changed == 0 {
        return Ok(false);
    }
    out.extend_from_slice(&rgce[copied_to..]);
    if destroyed > 0 {
        log::debug!("rgce shift invalidated {destroyed} of {changed} changed references");
    }
    *rgce = out;
    Ok(true)
}

/// Payload length (excluding the id byte) of the non-reference token at `rgce[offset]`.
fn non_reference_payload_len(rgce: &[u8], offset: usize, ptg: u8) -> Result<usize, RgceError> {
    let i = offset + 1;
    let end = |len: usize| -> Result<usize, RgceError> {
        if i + len > rgce.len() {
            Err(RgceError::UnexpectedEnd { offset: rgce.len() })
        } else {
            Ok(len)
        }
    };
    let u16_at = |at: usize| -> Result<u16, RgceError> {
        rgce.get(at..at + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or(RgceError::UnexpectedEnd { offset: rgce.len() })
    };

    match ptg {
        // PtgExp / PtgTbl: [rw: u16][col: u16]
        0x01 | 0x02 => end(4),

        // Operators, PtgParen, PtgMissArg.
        0x03..=0x16 => end(0),

        // PtgStr (ShortXLUnicodeString)
        0x17 => {
            let cch = *rgce
                .get(i)
                .ok_or(RgceError::UnexpectedEnd { offset: rgce.len() })? as usize;
            let flags = *rgce
                .get(i + 1)
                .ok_or(RgceError::UnexpectedEnd { offset: rgce.len() })?;
            let chars = if flags & 0x01 != 0 { cch * 2 } else { cch };
            end(2 + chars)
        }

        // PtgAttr: [grbit: u8][wAttr: u16] (+ jump table for tAttrChoose)
        0x19 => {
            let grbit = *rgce
                .get(i)
                .ok_or(RgceError::UnexpectedEnd { offset: rgce.len() })?;
            let w_attr = u16_at(i + 1)? as usize;
            if grbit & T_ATTR_CHOOSE != 0 {
                end(3 + (w_attr + 1) * 2)
            } else {
                end(3)
            }
        }

        // PtgErr / PtgBool
        0x1C | 0x1D => end(1),
        // PtgInt
        0x1E => end(2),
        // PtgNum
        0x1F => end(8),

        // PtgArray: reserved bytes, data lives in the trailing rgcb.
        0x20 | 0x40 | 0x60 => end(7),
        // PtgFunc: [iftab: u16]
        0x21 | 0x41 | 0x61 => end(2),
        // PtgFuncVar: [argc: u8][iftab: u16]
        0x22 | 0x42 | 0x62 => end(3),
        // PtgName: [nameIndex: u32]
        0x23 | 0x43 | 0x63 => end(4),

        // PtgMemArea / PtgMemErr / PtgMemNoMem: [6 bytes incl. cce]. The sub-expression tokens
        // follow inline and are walked like any other token.
        0x26 | 0x46 | 0x66 | 0x27 | 0x47 | 0x67 | 0x28 | 0x48 | 0x68 => end(6),
        // PtgMemFunc: [cce: u16]
        0x29 | 0x49 | 0x69 => end(2),

        // PtgRefN / PtgAreaN: relative to the formula cell, never shifted.
        0x2C | 0x4C | 0x6C => end(4),
        0x2D | 0x4D | 0x6D => end(8),

        // PtgNameX: [ixti: u16][nameIndex: u32]
        0x39 | 0x59 | 0x79 => end(6),

        _ => Err(RgceError::UnsupportedToken { ptg, offset }),
    }
}

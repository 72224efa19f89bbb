use super::{parse_u16_at, parse_u32_at, sid};
use crate::error::RecordFormatError;

/// `Ref8U` [MS-XLS 2.5.208]: an inclusive cell range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRangeAddress {
    pub first_row: u16,
    pub last_row: u16,
    pub first_col: u16,
    pub last_col: u16,
}

impl CellRangeAddress {
    pub(crate) const SIZE: usize = 8;

    pub const fn new(first_row: u16, last_row: u16, first_col: u16, last_col: u16) -> Self {
        Self {
            first_row,
            last_row,
            first_col,
            last_col,
        }
    }

    fn read(data: &[u8], offset: usize) -> Option<Self> {
        Some(Self {
            first_row: parse_u16_at(data, offset)?,
            last_row: parse_u16_at(data, offset + 2)?,
            first_col: parse_u16_at(data, offset + 4)?,
            last_col: parse_u16_at(data, offset + 6)?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        for v in [self.first_row, self.last_row, self.first_col, self.last_col] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    /// Smallest range containing every range in `ranges`.
    pub fn enclosing(ranges: &[CellRangeAddress]) -> Option<CellRangeAddress> {
        let (first, rest) = ranges.split_first()?;
        Some(rest.iter().fold(*first, |acc, r| CellRangeAddress {
            first_row: acc.first_row.min(r.first_row),
            last_row: acc.last_row.max(r.last_row),
            first_col: acc.first_col.min(r.first_col),
            last_col: acc.last_col.max(r.last_col),
        }))
    }
}

/// CFHEADER [MS-XLS 2.4.42].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfHeader {
    /// Number of CFRULE records that follow.
    pub rule_count: u16,
    /// `fToughRecalc` in bit 0, the format id in the remaining bits.
    pub toggle: u16,
    pub enclosing: CellRangeAddress,
    ranges: Vec<CellRangeAddress>,
}

impl CfHeader {
    pub fn new(ranges: Vec<CellRangeAddress>, rule_count: u16) -> Self {
        let mut header = Self {
            rule_count,
            toggle: 0,
            enclosing: CellRangeAddress::new(0, 0, 0, 0),
            ranges: Vec::new(),
        };
        header.set_ranges(ranges);
        header
    }

    pub(crate) fn parse(data: &[u8]) -> Result<Self, RecordFormatError> {
        let truncated = || RecordFormatError::malformed(sid::CF_HEADER, "truncated CFHEADER");
        let rule_count = parse_u16_at(data, 0).ok_or_else(truncated)?;
        let toggle = parse_u16_at(data, 2).ok_or_else(truncated)?;
        let enclosing = CellRangeAddress::read(data, 4).ok_or_else(truncated)?;
        let count = parse_u16_at(data, 12).ok_or_else(truncated)? as usize;

        let expected = 14 + count * CellRangeAddress::SIZE;
        if data.len() != expected {
            return Err(RecordFormatError::malformed(
                sid::CF_HEADER,
                format!("{count} ranges need {expected} bytes, payload has {}", data.len()),
            ));
        }
        let ranges = (0..count)
            .map(|i| CellRangeAddress::read(data, 14 + i * CellRangeAddress::SIZE))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(truncated)?;

        Ok(Self {
            rule_count,
            toggle,
            enclosing,
            ranges,
        })
    }

    pub fn ranges(&self) -> &[CellRangeAddress] {
        &self.ranges
    }

    /// Replaces the ranges and recomputes the enclosing range.
    pub fn set_ranges(&mut self, ranges: Vec<CellRangeAddress>) {
        if let Some(enclosing) = CellRangeAddress::enclosing(&ranges) {
            self.enclosing = enclosing;
        }
        self.ranges = ranges;
    }

    pub(crate) fn data_size(&self) -> usize {
        14 + self.ranges.len() * CellRangeAddress::SIZE
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.rule_count.to_le_bytes());
        out.extend_from_slice(&self.toggle.to_le_bytes());
        self.enclosing.write(out);
        out.extend_from_slice(&(self.ranges.len() as u16).to_le_bytes());
        for range in &self.ranges {
            range.write(out);
        }
    }
}

/// CFRULE [MS-XLS 2.4.42]. The formatting blocks are kept opaque; the two rule formulas are
/// exposed as raw rgce bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfRule {
    pub condition_type: u8,
    pub comparison_op: u8,
    pub options: u32,
    pub reserved: u16,
    pub formatting: Vec<u8>,
    pub formula1: Vec<u8>,
    pub formula2: Vec<u8>,
}

impl CfRule {
    const FIXED_SIZE: usize = 12;

    pub(crate) fn parse(data: &[u8]) -> Result<Self, RecordFormatError> {
        let truncated = || RecordFormatError::malformed(sid::CF_RULE, "truncated CFRULE");
        if data.len() < Self::FIXED_SIZE {
            return Err(truncated());
        }
        let cce1 = parse_u16_at(data, 2).ok_or_else(truncated)? as usize;
        let cce2 = parse_u16_at(data, 4).ok_or_else(truncated)? as usize;
        let options = parse_u32_at(data, 6).ok_or_else(truncated)?;
        let reserved = parse_u16_at(data, 10).ok_or_else(truncated)?;

        let formulas_start = data
            .len()
            .checked_sub(cce1 + cce2)
            .filter(|&start| start >= Self::FIXED_SIZE)
            .ok_or_else(|| {
                RecordFormatError::malformed(
                    sid::CF_RULE,
                    format!("formula sizes {cce1}+{cce2} exceed payload of {}", data.len()),
                )
            })?;
        let formula2_start = formulas_start + cce1;

        Ok(Self {
            condition_type: data[0],
            comparison_op: data[1],
            options,
            reserved,
            formatting: data[Self::FIXED_SIZE..formulas_start].to_vec(),
            formula1: data[formulas_start..formula2_start].to_vec(),
            formula2: data[formula2_start..].to_vec(),
        })
    }

    pub(crate) fn data_size(&self) -> usize {
        Self::FIXED_SIZE + self.formatting.len() + self.formula1.len() + self.formula2.len()
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.push(self.condition_type);
        out.push(self.comparison_op);
        out.extend_from_slice(&(self.formula1.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.formula2.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.options.to_le_bytes());
        out.extend_from_slice(&self.reserved.to_le_bytes());
        out.extend_from_slice(&self.formatting);
        out.extend_from_slice(&self.formula1);
        out.extend_from_slice(&self.formula2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_recomputes_enclosing_range() {
        let header = CfHeader::new(
            vec![
                CellRangeAddress::new(4, 8, 2, 2),
                CellRangeAddress::new(1, 3, 5, 9),
            ],
            1,
        );
        assert_eq!(header.enclosing, CellRangeAddress::new(1, 8, 2, 9));

        let mut out = Vec::new();
        header.write(&mut out);
        assert_eq!(out.len(), header.data_size());
        assert_eq!(CfHeader::parse(&out).unwrap(), header);
    }

    #[test]
    fn rule_splits_formatting_from_formulas() {
        // Cell-value rule "between", cce1 = 3 (PtgInt 1), cce2 = 3 (PtgInt 2), 4 formatting bytes.
        let mut data = vec![0x01, 0x01, 3, 0, 3, 0];
        data.extend_from_slice(&0x0000_0400u32.to_le_bytes());
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
        data.extend_from_slice(&[0x1E, 1, 0]);
        data.extend_from_slice(&[0x1E, 2, 0]);

        let rule = CfRule::parse(&data).unwrap();
        assert_eq!(rule.formatting, vec![0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(rule.formula1, vec![0x1E, 1, 0]);
        assert_eq!(rule.formula2, vec![0x1E, 2, 0]);

        let mut out = Vec::new();
        rule.write(&mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn rule_rejects_oversized_formula_lengths() {
        let mut data = vec![0x02, 0x00, 40, 0, 0, 0];
        data.extend_from_slice(&[0; 6]);
        assert!(matches!(
            CfRule::parse(&data),
            Err(RecordFormatError::Malformed {
                sid: sid::CF_RULE,
                ..
            })
        ));
    }
}

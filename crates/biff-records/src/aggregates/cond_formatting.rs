use biff_ptg::{shift_rgce, AreaRef, Ptg, ShiftDescriptor};

use super::RecordAggregate;
use crate::error::RecordFormatError;
use crate::record::{sid, CellRangeAddress, CfHeader, CfRule, Record};
use crate::stream::RecordStream;

const BLOCK: &str = "CfRecordsAggregate";

/// Excel 97-2003 accepts at most this many rules per conditional format.
pub const MAX_97_2003_RULES: usize = 3;

/// One conditional format: a `CFHEADER` followed by its `CFRULE` records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfRecordsAggregate {
    header: CfHeader,
    rules: Vec<CfRule>,
}

impl CfRecordsAggregate {
    pub fn new(ranges: Vec<CellRangeAddress>, rules: Vec<CfRule>) -> Result<Self, RecordFormatError> {
        let count = u16::try_from(rules.len()).map_err(|_| RecordFormatError::InvalidState {
            block: BLOCK,
            reason: format!("{} rules do not fit a CFHEADER", rules.len()),
        })?;
        Self::from_parts(CfHeader::new(ranges, count), rules)
    }

    fn from_parts(header: CfHeader, rules: Vec<CfRule>) -> Result<Self, RecordFormatError> {
        if rules.len() > MAX_97_2003_RULES {
            log::warn!(
                "conditional format has {} rules, Excel 97-2003 supports at most {MAX_97_2003_RULES}",
                rules.len()
            );
        }
        if rules.len() != usize::from(header.rule_count) {
            return Err(RecordFormatError::InvalidState {
                block: BLOCK,
                reason: format!(
                    "header declares {} rules, found {}",
                    header.rule_count,
                    rules.len()
                ),
            });
        }
        Ok(Self { header, rules })
    }

    pub fn build(stream: &mut RecordStream) -> Result<Self, RecordFormatError> {
        let header = match stream.next_record()? {
            Record::CfHeader(header) => header,
            other => {
                return Err(RecordFormatError::UnexpectedRecord {
                    block: BLOCK,
                    expected: sid::CF_HEADER,
                    found: other.sid(),
                })
            }
        };
        let mut rules = Vec::with_capacity(usize::from(header.rule_count));
        for _ in 0..header.rule_count {
            match stream.next_record() {
                Ok(Record::CfRule(rule)) => rules.push(rule),
                Ok(other) => {
                    return Err(RecordFormatError::UnexpectedRecord {
                        block: BLOCK,
                        expected: sid::CF_RULE,
                        found: other.sid(),
                    })
                }
                Err(RecordFormatError::EndOfStream) => {
                    return Err(RecordFormatError::UnexpectedEnd { block: BLOCK })
                }
                Err(err) => return Err(err),
            }
        }
        Self::from_parts(header, rules)
    }

    pub fn header(&self) -> &CfHeader {
        &self.header
    }

    pub fn ranges(&self) -> &[CellRangeAddress] {
        self.header.ranges()
    }

    pub fn rules(&self) -> &[CfRule] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: CfRule) -> Result<(), RecordFormatError> {
        if self.rules.len() >= MAX_97_2003_RULES {
            return Err(RecordFormatError::InvalidState {
                block: BLOCK,
                reason: format!("cannot have more than {MAX_97_2003_RULES} conditional format rules"),
            });
        }
        self.rules.push(rule);
        self.header.rule_count += 1;
        Ok(())
    }

    /// Moves the formatted ranges and rule formulas after cells were moved on `current_sheet`.
    ///
    /// Ranges overwritten by the move are dropped. Returns `false` when no range is left, in which
    /// case the whole conditional format should be removed.
    pub fn update_formulas_after_cell_shift(
        &mut self,
        shifter: &ShiftDescriptor,
        current_sheet: u16,
    ) -> Result<bool, RecordFormatError> {
        let mut changed = false;
        let mut kept = Vec::with_capacity(self.header.ranges().len());
        for range in self.header.ranges() {
            match shift_range(shifter, range, current_sheet)? {
                Some(shifted) => {
                    changed |= shifted != *range;
                    kept.push(shifted);
                }
                None => {
                    log::debug!("conditional format range {range:?} removed by shift");
                    changed = true;
                }
            }
        }
        if changed {
            if kept.is_empty() {
                return Ok(false);
            }
            self.header.set_ranges(kept);
        }

        for rule in &mut self.rules {
            shift_rgce(&mut rule.formula1, shifter, current_sheet)?;
            shift_rgce(&mut rule.formula2, shifter, current_sheet)?;
        }
        Ok(true)
    }
}

/// Shifts `range` as an absolute area reference. `None` means the range was overwritten.
fn shift_range(
    shifter: &ShiftDescriptor,
    range: &CellRangeAddress,
    current_sheet: u16,
) -> Result<Option<CellRangeAddress>, RecordFormatError> {
    let area = Ptg::Area(AreaRef::absolute(
        u32::from(range.first_row),
        u32::from(range.last_row),
        u32::from(range.first_col),
        u32::from(range.last_col),
    ));
    let Some(shifted) = shifter
        .adjust_ptg(&area, current_sheet)
        .map_err(biff_ptg::RgceError::from)?
    else {
        return Ok(Some(*range));
    };
    let Some(area) = shifted.area() else {
        return Ok(None);
    };
    Ok(area_to_range(area))
}

/// Converts an area back to a cell range; `None` when a bound no longer fits BIFF8 indexes.
fn area_to_range(area: &AreaRef) -> Option<CellRangeAddress> {
    let fit = |index: u32| u16::try_from(index).ok();
    Some(CellRangeAddress::new(
        fit(area.first_row.index)?,
        fit(area.last_row.index)?,
        fit(area.first_col.index)?,
        fit(area.last_col.index)?,
    ))
}

impl RecordAggregate for CfRecordsAggregate {
    fn visit_records(&self, visitor: &mut dyn FnMut(&Record)) {
        visitor(&Record::CfHeader(self.header.clone()));
        for rule in &self.rules {
            visitor(&Record::CfRule(rule.clone()));
        }
    }
}

/// All conditional formats of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConditionalFormattingTable {
    formats: Vec<CfRecordsAggregate>,
}

impl ConditionalFormattingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads conditional formats while the next record is a `CFHEADER`.
    pub fn build(stream: &mut RecordStream) -> Result<Self, RecordFormatError> {
        let mut formats = Vec::new();
        while stream.peek_sid() == Some(sid::CF_HEADER) {
            formats.push(CfRecordsAggregate::build(stream)?);
        }
        Ok(Self { formats })
    }

    /// Appends a conditional format and returns its index.
    pub fn add(&mut self, format: CfRecordsAggregate) -> usize {
        self.formats.push(format);
        self.formats.len() - 1
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CfRecordsAggregate> {
        self.formats.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CfRecordsAggregate> {
        self.formats.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<CfRecordsAggregate> {
        (index < self.formats.len()).then(|| self.formats.remove(index))
    }

    /// Applies [`CfRecordsAggregate::update_formulas_after_cell_shift`] to every format and drops
    /// the formats left without ranges.
    pub fn update_formulas_after_cell_shift(
        &mut self,
        shifter: &ShiftDescriptor,
        current_sheet: u16,
    ) -> Result<(), RecordFormatError> {
        let mut kept = Vec::with_capacity(self.formats.len());
        for mut format in std::mem::take(&mut self.formats) {
            if format.update_formulas_after_cell_shift(shifter, current_sheet)? {
                kept.push(format);
            } else {
                log::warn!("conditional format dropped: every range was removed by a shift");
            }
        }
        self.formats = kept;
        Ok(())
    }
}

impl RecordAggregate for ConditionalFormattingTable {
    fn visit_records(&self, visitor: &mut dyn FnMut(&Record)) {
        for format in &self.formats {
            format.visit_records(visitor);
        }
    }
}

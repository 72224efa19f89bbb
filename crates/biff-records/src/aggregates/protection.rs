use super::RecordAggregate;
use crate::error::RecordFormatError;
use crate::record::{sid, Record};
use crate::stream::RecordStream;

const BLOCK: &str = "WorksheetProtectionBlock";

/// Compute the legacy 16-bit password verifier stored in the `PASSWORD` record.
///
/// Only the first 15 UTF-16 code units take part in the hash, matching Excel.
#[must_use]
pub fn hash_legacy_password(password: &str) -> u16 {
    let mut hash: u16 = 0;
    let mut len: u16 = 0;

    for (i, unit) in password.encode_utf16().take(15).enumerate() {
        len += 1;
        let shift = (i + 1) as u32;
        let unit = u32::from(unit);
        // Rotate within 15 bits.
        let rotated = ((unit << shift) & 0x7FFF) | (unit >> (15 - shift));
        hash ^= rotated as u16;
    }

    hash ^ len ^ 0xCE4B
}

/// Sheet-level protection records: `PROTECT`, `OBJPROTECT`, `SCENPROTECT`, `PASSWORD`.
///
/// Each record is optional and appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorksheetProtectionBlock {
    protect: Option<bool>,
    object_protect: Option<bool>,
    scenario_protect: Option<bool>,
    password: Option<u16>,
}

impl WorksheetProtectionBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_component_record(record_id: u16) -> bool {
        matches!(
            record_id,
            sid::PROTECT | sid::OBJ_PROTECT | sid::SCEN_PROTECT | sid::PASSWORD
        )
    }

    /// Reads protection records while the next record belongs to this block.
    pub fn build(stream: &mut RecordStream) -> Result<Self, RecordFormatError> {
        let mut block = Self::default();
        block.add_records(stream)?;
        Ok(block)
    }

    /// Merges a further run of protection records, rejecting any repeated record kind.
    pub fn add_records(&mut self, stream: &mut RecordStream) -> Result<(), RecordFormatError> {
        while stream.peek_sid().is_some_and(Self::is_component_record) {
            let record = stream.next_record()?;
            let record_id = record.sid();
            let taken = match record {
                Record::Protect(on) => self.protect.replace(on).is_some(),
                Record::ObjProtect(on) => self.object_protect.replace(on).is_some(),
                Record::ScenProtect(on) => self.scenario_protect.replace(on).is_some(),
                Record::Password(hash) => self.password.replace(hash).is_some(),
                _ => false,
            };
            if taken {
                return Err(RecordFormatError::Duplicate {
                    block: BLOCK,
                    sid: record_id,
                });
            }
        }
        Ok(())
    }

    /// Protects the sheet with `password`; `None` or an empty password removes all protection.
    pub fn protect_sheet(&mut self, password: Option<&str>, objects: bool, scenarios: bool) {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            self.unprotect();
            return;
        };
        self.protect = Some(true);
        self.object_protect = Some(objects);
        self.scenario_protect = Some(scenarios);
        self.password = Some(hash_legacy_password(password));
    }

    pub fn unprotect(&mut self) {
        *self = Self::default();
    }

    pub fn is_sheet_protected(&self) -> bool {
        self.protect.unwrap_or(false)
    }

    pub fn is_object_protected(&self) -> bool {
        self.object_protect.unwrap_or(false)
    }

    pub fn is_scenario_protected(&self) -> bool {
        self.scenario_protect.unwrap_or(false)
    }

    pub fn password_hash(&self) -> Option<u16> {
        self.password
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.password == Some(hash_legacy_password(password))
    }
}

impl RecordAggregate for WorksheetProtectionBlock {
    fn visit_records(&self, visitor: &mut dyn FnMut(&Record)) {
        if let Some(on) = self.protect {
            visitor(&Record::Protect(on));
        }
        if let Some(on) = self.object_protect {
            visitor(&Record::ObjProtect(on));
        }
        if let Some(on) = self.scenario_protect {
            visitor(&Record::ScenProtect(on));
        }
        if let Some(hash) = self.password {
            visitor(&Record::Password(hash));
        }
    }
}

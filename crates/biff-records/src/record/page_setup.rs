use super::strings::UnicodeString;
use super::{parse_f64_at, parse_u16_at, sid};
use crate::error::RecordFormatError;

/// HEADER / FOOTER text [MS-XLS 2.4.136, 2.4.111].
///
/// Empty text is encoded as an empty payload. A stored empty payload is kept as-is so that the
/// record round-trips exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderFooterText {
    text: Option<UnicodeString>,
    empty_payload: Vec<u8>,
}

impl HeaderFooterText {
    pub fn new(text: impl Into<String>) -> Self {
        let mut value = Self::default();
        value.set_text(text);
        value
    }

    pub(crate) fn parse(record_id: u16, data: &[u8]) -> Result<Self, RecordFormatError> {
        // A zero-length string may be truncated after its character count.
        if data.is_empty() || parse_u16_at(data, 0) == Some(0) {
            return Ok(Self {
                text: None,
                empty_payload: data.to_vec(),
            });
        }
        let text = UnicodeString::parse(data)
            .map_err(|reason| RecordFormatError::malformed(record_id, reason))?;
        Ok(Self {
            text: Some(text),
            empty_payload: Vec::new(),
        })
    }

    pub fn text(&self) -> &str {
        self.text.as_ref().map_or("", |s| s.text.as_str())
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.empty_payload.clear();
        self.text = (!text.is_empty()).then(|| UnicodeString::new(text));
    }

    pub(crate) fn data_size(&self) -> usize {
        match &self.text {
            Some(text) => text.encoded_len(),
            None => self.empty_payload.len(),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        match &self.text {
            Some(text) => text.write(out),
            None => out.extend_from_slice(&self.empty_payload),
        }
    }
}

/// One manual page break: the row (or column) after which a new page starts, and the column (or
/// row) span it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBreak {
    pub main: u16,
    pub sub_from: u16,
    pub sub_to: u16,
}

/// HORIZONTALPAGEBREAKS / VERTICALPAGEBREAKS [MS-XLS 2.4.122, 2.4.350].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageBreaks {
    breaks: Vec<PageBreak>,
}

impl PageBreaks {
    const ENTRY_SIZE: usize = 6;

    pub(crate) fn parse(record_id: u16, data: &[u8]) -> Result<Self, RecordFormatError> {
        let count = parse_u16_at(data, 0)
            .ok_or_else(|| RecordFormatError::malformed(record_id, "missing break count"))?
            as usize;
        let expected = 2 + count * Self::ENTRY_SIZE;
        if data.len() != expected {
            return Err(RecordFormatError::malformed(
                record_id,
                format!("{count} breaks need {expected} bytes, payload has {}", data.len()),
            ));
        }
        let breaks = data[2..]
            .chunks_exact(Self::ENTRY_SIZE)
            .map(|e| PageBreak {
                main: u16::from_le_bytes([e[0], e[1]]),
                sub_from: u16::from_le_bytes([e[2], e[3]]),
                sub_to: u16::from_le_bytes([e[4], e[5]]),
            })
            .collect();
        Ok(Self { breaks })
    }

    pub fn is_empty(&self) -> bool {
        self.breaks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.breaks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageBreak> {
        self.breaks.iter()
    }

    pub fn get(&self, main: u16) -> Option<&PageBreak> {
        self.breaks.iter().find(|b| b.main == main)
    }

    /// Adds a break, or updates the span of an existing break at `main`.
    pub fn add(&mut self, main: u16, sub_from: u16, sub_to: u16) {
        match self.breaks.iter_mut().find(|b| b.main == main) {
            Some(existing) => {
                existing.sub_from = sub_from;
                existing.sub_to = sub_to;
            }
            None => self.breaks.push(PageBreak {
                main,
                sub_from,
                sub_to,
            }),
        }
    }

    /// Removes the break at `main`, returning whether one existed.
    pub fn remove(&mut self, main: u16) -> bool {
        let before = self.breaks.len();
        self.breaks.retain(|b| b.main != main);
        self.breaks.len() != before
    }

    pub(crate) fn data_size(&self) -> usize {
        2 + self.breaks.len() * Self::ENTRY_SIZE
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.breaks.len() as u16).to_le_bytes());
        for b in &self.breaks {
            out.extend_from_slice(&b.main.to_le_bytes());
            out.extend_from_slice(&b.sub_from.to_le_bytes());
            out.extend_from_slice(&b.sub_to.to_le_bytes());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarginSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl MarginSide {
    pub const ALL: [MarginSide; 4] = [
        MarginSide::Left,
        MarginSide::Right,
        MarginSide::Top,
        MarginSide::Bottom,
    ];

    pub fn sid(self) -> u16 {
        match self {
            MarginSide::Left => sid::LEFT_MARGIN,
            MarginSide::Right => sid::RIGHT_MARGIN,
            MarginSide::Top => sid::TOP_MARGIN,
            MarginSide::Bottom => sid::BOTTOM_MARGIN,
        }
    }

    pub fn from_sid(record_id: u16) -> Option<Self> {
        match record_id {
            sid::LEFT_MARGIN => Some(MarginSide::Left),
            sid::RIGHT_MARGIN => Some(MarginSide::Right),
            sid::TOP_MARGIN => Some(MarginSide::Top),
            sid::BOTTOM_MARGIN => Some(MarginSide::Bottom),
            _ => None,
        }
    }

    /// Margin Excel assumes when the record is absent.
    pub fn default_inches(self) -> f64 {
        match self {
            MarginSide::Left | MarginSide::Right => 0.75,
            MarginSide::Top | MarginSide::Bottom => 1.0,
        }
    }
}

/// SETUP [MS-XLS 2.4.257].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintSetup {
    pub paper_size: u16,
    pub scale: u16,
    pub page_start: u16,
    pub fit_width: u16,
    pub fit_height: u16,
    pub options: u16,
    pub h_resolution: u16,
    pub v_resolution: u16,
    pub header_margin: f64,
    pub footer_margin: f64,
    pub copies: u16,
}

impl Default for PrintSetup {
    fn default() -> Self {
        Self {
            paper_size: 1,
            scale: 100,
            page_start: 1,
            fit_width: 1,
            fit_height: 1,
            options: 2,
            h_resolution: 300,
            v_resolution: 300,
            header_margin: 0.5,
            footer_margin: 0.5,
            copies: 1,
        }
    }
}

impl PrintSetup {
    pub(crate) const SIZE: usize = 34;

    pub(crate) fn parse(data: &[u8]) -> Result<Self, RecordFormatError> {
        if data.len() != Self::SIZE {
            return Err(RecordFormatError::malformed(
                sid::SETUP,
                format!("payload is {} bytes, expected {}", data.len(), Self::SIZE),
            ));
        }
        let u16_at = |offset| parse_u16_at(data, offset).unwrap_or_default();
        let f64_at = |offset| parse_f64_at(data, offset).unwrap_or_default();
        Ok(Self {
            paper_size: u16_at(0),
            scale: u16_at(2),
            page_start: u16_at(4),
            fit_width: u16_at(6),
            fit_height: u16_at(8),
            options: u16_at(10),
            h_resolution: u16_at(12),
            v_resolution: u16_at(14),
            header_margin: f64_at(16),
            footer_margin: f64_at(24),
            copies: u16_at(32),
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        for v in [
            self.paper_size,
            self.scale,
            self.page_start,
            self.fit_width,
            self.fit_height,
            self.options,
            self.h_resolution,
            self.v_resolution,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.header_margin.to_le_bytes());
        out.extend_from_slice(&self.footer_margin.to_le_bytes());
        out.extend_from_slice(&self.copies.to_le_bytes());
    }
}

/// HEADERFOOTER [MS-XLS 2.4.137]. Only the view identity is interpreted; the rest is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFooterExt {
    data: Vec<u8>,
}

impl HeaderFooterExt {
    const GUID_OFFSET: usize = 12;

    pub(crate) fn parse(data: &[u8]) -> Result<Self, RecordFormatError> {
        if data.len() < Self::GUID_OFFSET + 16 {
            return Err(RecordFormatError::malformed(
                sid::HEADER_FOOTER,
                format!("payload is {} bytes, too short for the view id", data.len()),
            ));
        }
        Ok(Self {
            data: data.to_vec(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Identity of the custom view this record belongs to; all zero for the sheet itself.
    pub fn guid(&self) -> [u8; 16] {
        let mut guid = [0u8; 16];
        guid.copy_from_slice(&self.data[Self::GUID_OFFSET..Self::GUID_OFFSET + 16]);
        guid
    }

    pub fn is_current_sheet(&self) -> bool {
        self.guid() == [0u8; 16]
    }
}

/// USERSVIEWBEGIN [MS-XLS 2.4.344]. Only the view identity is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSViewBegin {
    data: Vec<u8>,
}

impl UserSViewBegin {
    pub(crate) fn parse(data: &[u8]) -> Result<Self, RecordFormatError> {
        if data.len() < 16 {
            return Err(RecordFormatError::malformed(
                sid::USER_SVIEW_BEGIN,
                format!("payload is {} bytes, too short for the view id", data.len()),
            ));
        }
        Ok(Self {
            data: data.to_vec(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn guid(&self) -> [u8; 16] {
        let mut guid = [0u8; 16];
        guid.copy_from_slice(&self.data[..16]);
        guid
    }
}

//! Typed BIFF8 worksheet records.
//!
//! Records that the aggregates inspect or mutate are parsed into typed payloads; every other record
//! is carried as [`Record::Unknown`] and written back byte-for-byte.

mod cf;
mod outline;
mod page_setup;
mod strings;

pub use cf::{CellRangeAddress, CfHeader, CfRule};
pub use outline::{ColumnInfo, RowRecord, MAX_OUTLINE_LEVEL};
pub use page_setup::{
    HeaderFooterExt, HeaderFooterText, MarginSide, PageBreak, PageBreaks, PrintSetup,
    UserSViewBegin,
};

use crate::error::RecordFormatError;

/// Record ids. See [MS-XLS] 2.3.
pub mod sid {
    pub const EOF: u16 = 0x000A;
    pub const PROTECT: u16 = 0x0012;
    pub const PASSWORD: u16 = 0x0013;
    pub const HEADER: u16 = 0x0014;
    pub const FOOTER: u16 = 0x0015;
    pub const VERTICAL_PAGE_BREAKS: u16 = 0x001A;
    pub const HORIZONTAL_PAGE_BREAKS: u16 = 0x001B;
    pub const LEFT_MARGIN: u16 = 0x0026;
    pub const RIGHT_MARGIN: u16 = 0x0027;
    pub const TOP_MARGIN: u16 = 0x0028;
    pub const BOTTOM_MARGIN: u16 = 0x0029;
    pub const PRINT_SIZE: u16 = 0x0033;
    pub const CONTINUE: u16 = 0x003C;
    pub const PLS: u16 = 0x004D;
    pub const OBJ_PROTECT: u16 = 0x0063;
    pub const COL_INFO: u16 = 0x007D;
    pub const HCENTER: u16 = 0x0083;
    pub const VCENTER: u16 = 0x0084;
    pub const SETUP: u16 = 0x00A1;
    pub const SCEN_PROTECT: u16 = 0x00DD;
    pub const BITMAP: u16 = 0x00E9;
    pub const USER_SVIEW_BEGIN: u16 = 0x01AA;
    pub const USER_SVIEW_END: u16 = 0x01AB;
    pub const CF_HEADER: u16 = 0x01B0;
    pub const CF_RULE: u16 = 0x01B1;
    pub const DIMENSIONS: u16 = 0x0200;
    pub const ROW: u16 = 0x0208;
    pub const HEADER_FOOTER: u16 = 0x089C;
}

/// Largest payload a single physical record may carry. Longer payloads are written as the record
/// followed by `CONTINUE` records.
pub const MAX_RECORD_DATA_SIZE: usize = 8224;

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(HeaderFooterText),
    Footer(HeaderFooterText),
    RowBreaks(PageBreaks),
    ColumnBreaks(PageBreaks),
    HCenter(bool),
    VCenter(bool),
    Margin { side: MarginSide, inches: f64 },
    Setup(PrintSetup),
    HeaderFooter(HeaderFooterExt),
    UserSViewBegin(UserSViewBegin),
    UserSViewEnd(Vec<u8>),
    ColumnInfo(ColumnInfo),
    Row(RowRecord),
    CfHeader(CfHeader),
    CfRule(CfRule),
    Protect(bool),
    ObjProtect(bool),
    ScenProtect(bool),
    Password(u16),
    Unknown { sid: u16, data: Vec<u8> },
}

impl Record {
    /// Parses the payload of a logical record.
    pub fn decode(record_id: u16, data: &[u8]) -> Result<Record, RecordFormatError> {
        Ok(match record_id {
            sid::HEADER => Record::Header(HeaderFooterText::parse(record_id, data)?),
            sid::FOOTER => Record::Footer(HeaderFooterText::parse(record_id, data)?),
            sid::HORIZONTAL_PAGE_BREAKS => Record::RowBreaks(PageBreaks::parse(record_id, data)?),
            sid::VERTICAL_PAGE_BREAKS => Record::ColumnBreaks(PageBreaks::parse(record_id, data)?),
            sid::HCENTER => Record::HCenter(parse_flag(record_id, data)?),
            sid::VCENTER => Record::VCenter(parse_flag(record_id, data)?),
            sid::LEFT_MARGIN | sid::RIGHT_MARGIN | sid::TOP_MARGIN | sid::BOTTOM_MARGIN => {
                if data.len() != 8 {
                    return Err(RecordFormatError::malformed(
                        record_id,
                        format!("margin payload is {} bytes, expected 8", data.len()),
                    ));
                }
                let side = MarginSide::from_sid(record_id).ok_or_else(|| {
                    RecordFormatError::malformed(record_id, "not a margin record")
                })?;
                let inches = parse_f64_at(data, 0)
                    .ok_or_else(|| RecordFormatError::malformed(record_id, "truncated margin"))?;
                Record::Margin { side, inches }
            }
            sid::SETUP => Record::Setup(PrintSetup::parse(data)?),
            sid::HEADER_FOOTER => Record::HeaderFooter(HeaderFooterExt::parse(data)?),
            sid::USER_SVIEW_BEGIN => Record::UserSViewBegin(UserSViewBegin::parse(data)?),
            sid::USER_SVIEW_END => Record::UserSViewEnd(data.to_vec()),
            sid::COL_INFO => Record::ColumnInfo(ColumnInfo::parse(data)?),
            sid::ROW => Record::Row(RowRecord::parse(data)?),
            sid::CF_HEADER => Record::CfHeader(CfHeader::parse(data)?),
            sid::CF_RULE => Record::CfRule(CfRule::parse(data)?),
            sid::PROTECT => Record::Protect(parse_flag(record_id, data)?),
            sid::OBJ_PROTECT => Record::ObjProtect(parse_flag(record_id, data)?),
            sid::SCEN_PROTECT => Record::ScenProtect(parse_flag(record_id, data)?),
            sid::PASSWORD => Record::Password(parse_u16_payload(record_id, data)?),
            _ => Record::Unknown {
                sid: record_id,
                data: data.to_vec(),
            },
        })
    }

    pub fn sid(&self) -> u16 {
        match self {
            Record::Header(_) => sid::HEADER,
            Record::Footer(_) => sid::FOOTER,
            Record::RowBreaks(_) => sid::HORIZONTAL_PAGE_BREAKS,
            Record::ColumnBreaks(_) => sid::VERTICAL_PAGE_BREAKS,
            Record::HCenter(_) => sid::HCENTER,
            Record::VCenter(_) => sid::VCENTER,
            Record::Margin { side, .. } => side.sid(),
            Record::Setup(_) => sid::SETUP,
            Record::HeaderFooter(_) => sid::HEADER_FOOTER,
            Record::UserSViewBegin(_) => sid::USER_SVIEW_BEGIN,
            Record::UserSViewEnd(_) => sid::USER_SVIEW_END,
            Record::ColumnInfo(_) => sid::COL_INFO,
            Record::Row(_) => sid::ROW,
            Record::CfHeader(_) => sid::CF_HEADER,
            Record::CfRule(_) => sid::CF_RULE,
            Record::Protect(_) => sid::PROTECT,
            Record::ObjProtect(_) => sid::OBJ_PROTECT,
            Record::ScenProtect(_) => sid::SCEN_PROTECT,
            Record::Password(_) => sid::PASSWORD,
            Record::Unknown { sid, .. } => *sid,
        }
    }

    /// Writes the logical payload (without any record header).
    pub fn write_data(&self, out: &mut Vec<u8>) {
        match self {
            Record::Header(text) | Record::Footer(text) => text.write(out),
            Record::RowBreaks(breaks) | Record::ColumnBreaks(breaks) => breaks.write(out),
            Record::HCenter(flag)
            | Record::VCenter(flag)
            | Record::Protect(flag)
            | Record::ObjProtect(flag)
            | Record::ScenProtect(flag) => out.extend_from_slice(&u16::from(*flag).to_le_bytes()),
            Record::Margin { inches, .. } => out.extend_from_slice(&inches.to_le_bytes()),
            Record::Setup(setup) => setup.write(out),
            Record::HeaderFooter(ext) => out.extend_from_slice(ext.data()),
            Record::UserSViewBegin(begin) => out.extend_from_slice(begin.data()),
            Record::UserSViewEnd(data) => out.extend_from_slice(data),
            Record::ColumnInfo(info) => info.write(out),
            Record::Row(row) => row.write(out),
            Record::CfHeader(header) => header.write(out),
            Record::CfRule(rule) => rule.write(out),
            Record::Password(hash) => out.extend_from_slice(&hash.to_le_bytes()),
            Record::Unknown { data, .. } => out.extend_from_slice(data),
        }
    }

    /// Size of the logical payload in bytes.
    pub fn data_size(&self) -> usize {
        match self {
            Record::Header(text) | Record::Footer(text) => text.data_size(),
            Record::RowBreaks(breaks) | Record::ColumnBreaks(breaks) => breaks.data_size(),
            Record::HCenter(_)
            | Record::VCenter(_)
            | Record::Protect(_)
            | Record::ObjProtect(_)
            | Record::ScenProtect(_)
            | Record::Password(_) => 2,
            Record::Margin { .. } => 8,
            Record::Setup(_) => PrintSetup::SIZE,
            Record::HeaderFooter(ext) => ext.data().len(),
            Record::UserSViewBegin(begin) => begin.data().len(),
            Record::UserSViewEnd(data) => data.len(),
            Record::ColumnInfo(info) => info.data_size(),
            Record::Row(_) => RowRecord::SIZE,
            Record::CfHeader(header) => header.data_size(),
            Record::CfRule(rule) => rule.data_size(),
            Record::Unknown { data, .. } => data.len(),
        }
    }

    /// Number of bytes [`Record::serialize`] writes, including every physical record header.
    pub fn record_size(&self) -> usize {
        let data = self.data_size();
        let fragments = data.div_ceil(MAX_RECORD_DATA_SIZE).max(1);
        data + 4 * fragments
    }

    /// Writes the record with its header, splitting payloads larger than
    /// [`MAX_RECORD_DATA_SIZE`] into trailing `CONTINUE` records.
    pub fn serialize(&self, out: &mut Vec<u8>) -> usize {
        let mut data = Vec::with_capacity(self.data_size());
        self.write_data(&mut data);

        let start = out.len();
        let mut chunks = data.chunks(MAX_RECORD_DATA_SIZE);
        let first = chunks.next().unwrap_or(&[]);
        write_physical(out, self.sid(), first);
        for chunk in chunks {
            write_physical(out, sid::CONTINUE, chunk);
        }
        out.len() - start
    }
}

fn write_physical(out: &mut Vec<u8>, record_id: u16, data: &[u8]) {
    out.extend_from_slice(&record_id.to_le_bytes());
    // Chunks never exceed MAX_RECORD_DATA_SIZE, so the length always fits.
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

pub(crate) fn parse_u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn parse_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn parse_f64_at(data: &[u8], offset: usize) -> Option<f64> {
    let bytes = data.get(offset..offset + 8)?;
    Some(f64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}

fn parse_u16_payload(record_id: u16, data: &[u8]) -> Result<u16, RecordFormatError> {
    if data.len() != 2 {
        return Err(RecordFormatError::malformed(
            record_id,
            format!("payload is {} bytes, expected 2", data.len()),
        ));
    }
    Ok(u16::from_le_bytes([data[0], data[1]]))
}

fn parse_flag(record_id: u16, data: &[u8]) -> Result<bool, RecordFormatError> {
    Ok(parse_u16_payload(record_id, data)? != 0)
}

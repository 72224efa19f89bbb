#![allow(dead_code)]

// Just enough BIFF8 worksheet bytes to exercise the record layer. Keep record ids named so the
// fixtures stay readable.
pub const RECORD_BOF: u16 = 0x0809;
pub const RECORD_EOF: u16 = 0x000A;
pub const RECORD_HEADER: u16 = 0x0014;
pub const RECORD_FOOTER: u16 = 0x0015;
pub const RECORD_HCENTER: u16 = 0x0083;
pub const RECORD_SETUP: u16 = 0x00A1;
pub const RECORD_PLS: u16 = 0x004D;
pub const RECORD_CONTINUE: u16 = 0x003C;
pub const RECORD_PROTECT: u16 = 0x0012;
pub const RECORD_PASSWORD: u16 = 0x0013;
pub const RECORD_COLINFO: u16 = 0x007D;
pub const RECORD_DIMENSIONS: u16 = 0x0200;
pub const RECORD_ROW: u16 = 0x0208;
pub const RECORD_NUMBER: u16 = 0x0203;
pub const RECORD_WINDOW2: u16 = 0x023E;
pub const RECORD_SELECTION: u16 = 0x001D;
pub const RECORD_USERSVIEWBEGIN: u16 = 0x01AA;
pub const RECORD_USERSVIEWEND: u16 = 0x01AB;
pub const RECORD_CFHEADER: u16 = 0x01B0;
pub const RECORD_CFRULE: u16 = 0x01B1;
pub const RECORD_HEADERFOOTER: u16 = 0x089C;

pub fn record(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn bof_worksheet() -> Vec<u8> {
    let mut payload = vec![0u8; 16];
    payload[0..2].copy_from_slice(&0x0600u16.to_le_bytes());
    payload[2..4].copy_from_slice(&0x0010u16.to_le_bytes());
    record(RECORD_BOF, &payload)
}

pub fn eof() -> Vec<u8> {
    record(RECORD_EOF, &[])
}

/// XLUnicodeString with compressed (8-bit) characters.
pub fn header_text(id: u16, text: &str) -> Vec<u8> {
    if text.is_empty() {
        return record(id, &[]);
    }
    let mut payload = Vec::new();
    payload.extend_from_slice(&(text.len() as u16).to_le_bytes());
    payload.push(0);
    payload.extend_from_slice(text.as_bytes());
    record(id, &payload)
}

pub fn flag(id: u16, on: bool) -> Vec<u8> {
    record(id, &u16::from(on).to_le_bytes())
}

pub fn setup() -> Vec<u8> {
    let mut payload = Vec::new();
    for v in [9u16, 100, 1, 1, 1, 0x0044, 600, 600] {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    payload.extend_from_slice(&0.3f64.to_le_bytes());
    payload.extend_from_slice(&0.3f64.to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes());
    record(RECORD_SETUP, &payload)
}

pub fn dimensions(rows: u32, cols: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload.extend_from_slice(&rows.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&cols.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    record(RECORD_DIMENSIONS, &payload)
}

pub fn window2() -> Vec<u8> {
    record(RECORD_WINDOW2, &[0xB6, 0x06, 0, 0, 0, 0, 0x40, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0])
}

pub fn colinfo(first: u16, last: u16, width: u16, options: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    for v in [first, last, width, 0x0F, options, 0] {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    record(RECORD_COLINFO, &payload)
}

pub fn row(index: u16, options: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    for v in [index, 0, 1, 0x00FF, 0, 0, options, 0x0F] {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    record(RECORD_ROW, &payload)
}

pub fn number(row: u16, col: u16, value: f64) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&row.to_le_bytes());
    payload.extend_from_slice(&col.to_le_bytes());
    payload.extend_from_slice(&0x0Fu16.to_le_bytes());
    payload.extend_from_slice(&value.to_le_bytes());
    record(RECORD_NUMBER, &payload)
}

pub fn user_sview_begin(guid_byte: u8) -> Vec<u8> {
    let mut payload = vec![0u8; 64];
    payload[0] = guid_byte;
    payload[15] = 0x42;
    record(RECORD_USERSVIEWBEGIN, &payload)
}

pub fn user_sview_end() -> Vec<u8> {
    record(RECORD_USERSVIEWEND, &[1, 0])
}

pub fn selection() -> Vec<u8> {
    record(RECORD_SELECTION, &[3, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0])
}

/// HeaderFooter record for the sheet (zero view id) or for the custom view starting with
/// `guid_byte`.
pub fn header_footer_ext(guid_byte: Option<u8>) -> Vec<u8> {
    let mut payload = vec![0u8; 38];
    payload[0..2].copy_from_slice(&RECORD_HEADERFOOTER.to_le_bytes());
    if let Some(byte) = guid_byte {
        payload[12] = byte;
        payload[27] = 0x42;
    }
    record(RECORD_HEADERFOOTER, &payload)
}

pub fn cf_header(rule_count: u16, ranges: &[(u16, u16, u16, u16)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&rule_count.to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes());
    let first_row = ranges.iter().map(|r| r.0).min().unwrap_or(0);
    let last_row = ranges.iter().map(|r| r.1).max().unwrap_or(0);
    let first_col = ranges.iter().map(|r| r.2).min().unwrap_or(0);
    let last_col = ranges.iter().map(|r| r.3).max().unwrap_or(0);
    for v in [first_row, last_row, first_col, last_col] {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    payload.extend_from_slice(&(ranges.len() as u16).to_le_bytes());
    for &(r1, r2, c1, c2) in ranges {
        for v in [r1, r2, c1, c2] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
    }
    record(RECORD_CFHEADER, &payload)
}

/// CFRULE payload (not framed) with an opaque formatting block.
pub fn cf_rule_payload(formatting: &[u8], formula1: &[u8]) -> Vec<u8> {
    let mut payload = vec![1u8, 5];
    payload.extend_from_slice(&(formula1.len() as u16).to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&0x003F_FFFFu32.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(formatting);
    payload.extend_from_slice(formula1);
    payload
}

/// `PtgRefV` to a fully relative cell.
pub fn ref_v(row: u16, col: u8) -> Vec<u8> {
    let mut rgce = vec![0x44];
    rgce.extend_from_slice(&row.to_le_bytes());
    rgce.extend_from_slice(&(u16::from(col) | 0xC000).to_le_bytes());
    rgce
}

/// Frames `payload` the way Excel does: the record, then `CONTINUE` records of at most 8224
/// bytes each.
pub fn continued(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut chunks = payload.chunks(8224);
    out.extend(record(id, chunks.next().unwrap_or(&[])));
    for chunk in chunks {
        out.extend(record(RECORD_CONTINUE, chunk));
    }
    out
}

pub fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.iter().flatten().copied().collect()
}

/// Record ids of a serialized stream, in order.
pub fn record_ids(bytes: &[u8]) -> Vec<u16> {
    let mut ids = Vec::new();
    let mut offset = 0;
    while offset + 4 <= bytes.len() {
        let id = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        let len = u16::from_le_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
        ids.push(id);
        offset += 4 + len;
    }
    ids
}

//! BIFF8 `XLUnicodeString` [MS-XLS 2.5.294] reading and writing.

const STR_FLAG_HIGH_BYTE: u8 = 0x01;

/// Decoded string plus whether it was stored as UTF-16 (`fHighByte`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnicodeString {
    pub(crate) text: String,
    pub(crate) high_byte: bool,
}

impl UnicodeString {
    /// Picks the compressed form when every character fits in one byte.
    pub(crate) fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let high_byte = text.chars().any(|c| u32::from(c) > 0xFF);
        Self { text, high_byte }
    }

    /// Parses a string occupying exactly `input`.
    pub(crate) fn parse(input: &[u8]) -> Result<Self, String> {
        if input.len() < 3 {
            return Err("unexpected end of string".to_string());
        }
        let cch = u16::from_le_bytes([input[0], input[1]]) as usize;
        let flags = input[2];
        if flags & !STR_FLAG_HIGH_BYTE != 0 {
            return Err(format!("unsupported string flags 0x{flags:02X}"));
        }

        let high_byte = flags & STR_FLAG_HIGH_BYTE != 0;
        let char_bytes = if high_byte { cch * 2 } else { cch };
        let chars = &input[3..];
        if chars.len() != char_bytes {
            return Err(format!(
                "string declares {char_bytes} character bytes, payload has {}",
                chars.len()
            ));
        }

        let text = if high_byte {
            let units: Vec<u16> = chars
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        } else {
            // Compressed strings are UTF-16 code units with the high byte dropped.
            chars.iter().map(|&b| char::from(b)).collect()
        };
        Ok(Self { text, high_byte })
    }

    pub(crate) fn encoded_len(&self) -> usize {
        let units = self.text.encode_utf16().count();
        3 + if self.high_byte { units * 2 } else { units }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        let units: Vec<u16> = self.text.encode_utf16().collect();
        out.extend_from_slice(&(units.len() as u16).to_le_bytes());
        if self.high_byte {
            out.push(STR_FLAG_HIGH_BYTE);
            for unit in units {
                out.extend_from_slice(&unit.to_le_bytes());
            }
        } else {
            out.push(0);
            out.extend(units.iter().map(|&unit| unit as u8));
        }
    }
}

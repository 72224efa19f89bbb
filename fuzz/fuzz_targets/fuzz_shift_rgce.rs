#![no_main]

use biff_ptg::{shift_rgce, ShiftDescriptor, SpreadsheetVersion};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 6 {
        return;
    }
    let first = u32::from(u16::from_le_bytes([data[0], data[1]]));
    let len = u32::from(data[2]);
    let amount = i32::from(i16::from_le_bytes([data[3], data[4]]));
    let selector = data[5];
    let rgce = &data[6..];

    let version = SpreadsheetVersion::Excel97;
    let col = first & 0xFF;
    let descriptor = match selector % 5 {
        0 => ShiftDescriptor::for_row_shift(0, "Sheet1", first, first + len, amount, version),
        1 => ShiftDescriptor::for_row_copy(0, "Sheet1", first, first + len, amount, version),
        2 => ShiftDescriptor::for_column_shift(0, "Sheet1", col, col + len, amount, version),
        3 => ShiftDescriptor::for_column_copy(0, "Sheet1", col, col + len, amount, version),
        _ => ShiftDescriptor::for_sheet_shift(u16::from(data[0] & 0x0F), u16::from(data[2] & 0x0F)),
    };
    let Ok(descriptor) = descriptor else {
        return;
    };

    let mut bytes = rgce.to_vec();
    if let Ok(false) = shift_rgce(&mut bytes, &descriptor, 0) {
        assert_eq!(bytes, rgce, "unchanged rgce must keep its bytes");
    }
});

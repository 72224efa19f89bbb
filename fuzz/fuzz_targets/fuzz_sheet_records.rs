#![no_main]

use biff_records::{RecordAggregate, RecordStreamOptions, SheetRecords};
use libfuzzer_sys::fuzz_target;

/// Keep joined records small so the harness spends its time in the aggregates.
const MAX_LOGICAL_RECORD_BYTES: usize = 64 * 1024;
const MAX_LOGICAL_RECORD_FRAGMENTS: usize = 64;

fuzz_target!(|data: &[u8]| {
    let options = RecordStreamOptions {
        max_logical_record_bytes: MAX_LOGICAL_RECORD_BYTES,
        max_logical_record_fragments: MAX_LOGICAL_RECORD_FRAGMENTS,
    };
    let Ok(sheet) = SheetRecords::from_bytes(data, options) else {
        return;
    };

    let mut out = Vec::new();
    let written = sheet.serialize(&mut out);
    assert_eq!(written, out.len());
    assert_eq!(sheet.serialized_size(), out.len());

    // Whatever we write must read back to the same aggregates.
    let reread = SheetRecords::from_bytes(&out, options).expect("re-read serialized sheet");
    let mut again = Vec::new();
    reread.serialize(&mut again);
    assert_eq!(out, again);
});

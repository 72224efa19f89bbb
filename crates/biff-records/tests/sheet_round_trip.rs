use biff_records::aggregates::{CustomViewItem, PageSettingsBlock, RecordAggregate};
use biff_records::record::{sid, HeaderFooterText};
use biff_records::{Record, RecordFormatError, RecordStream, RecordStreamOptions, SheetRecords};
use pretty_assertions::assert_eq;

mod common;

use common::*;

fn walk(bytes: &[u8]) -> SheetRecords {
    SheetRecords::from_bytes(bytes, RecordStreamOptions::default()).expect("walk sheet")
}

fn write(sheet: &SheetRecords) -> Vec<u8> {
    let mut out = Vec::new();
    let written = sheet.serialize(&mut out);
    assert_eq!(written, out.len());
    assert_eq!(sheet.serialized_size(), out.len());
    out
}

fn full_sheet() -> Vec<u8> {
    let mut pls = vec![0u8; 200];
    pls[0] = 0x11;
    concat(&[
        bof_worksheet(),
        header_text(RECORD_HEADER, "&CPage &P"),
        header_text(RECORD_FOOTER, ""),
        flag(RECORD_HCENTER, true),
        record(RECORD_PLS, &pls),
        record(RECORD_CONTINUE, &[0xAA; 40]),
        setup(),
        flag(RECORD_PROTECT, true),
        record(RECORD_PASSWORD, &0xCC1Au16.to_le_bytes()),
        colinfo(0, 0, 3000, 0),
        colinfo(1, 4, 2275, 0x0100),
        dimensions(41, 5),
        row(0, 0x0100),
        row(1, 0x0101),
        number(0, 0, 1.5),
        number(1, 0, 2.5),
        row(40, 0x0100),
        number(40, 1, -3.0),
        window2(),
        cf_header(1, &[(0, 9, 0, 0)]),
        record(RECORD_CFRULE, &cf_rule_payload(&[], &ref_v(0, 0))),
        user_sview_begin(7),
        selection(),
        header_text(RECORD_HEADER, ""),
        header_text(RECORD_FOOTER, ""),
        user_sview_end(),
        eof(),
    ])
}

#[test]
fn unedited_sheet_round_trips_byte_for_byte() {
    let bytes = full_sheet();
    let sheet = walk(&bytes);

    assert!(sheet.page_settings().unwrap().hcenter());
    assert!(sheet.protection().unwrap().verify_password("abc"));
    assert_eq!(sheet.columns().unwrap().len(), 2);
    assert_eq!(sheet.rows().len(), 3);
    assert_eq!(sheet.conditional_formats().unwrap().len(), 1);
    assert_eq!(sheet.custom_views().len(), 1);

    assert_eq!(write(&sheet), bytes);
}

#[test]
fn missing_header_and_footer_are_synthesized() {
    let mut stream = RecordStream::new(vec![
        Record::HCenter(false),
        Record::VCenter(false),
    ]);
    let block = PageSettingsBlock::build(&mut stream).unwrap();
    let records = block.records();
    assert_eq!(records.len(), 4);
    assert_eq!(
        records,
        vec![
            Record::Header(HeaderFooterText::default()),
            Record::Footer(HeaderFooterText::default()),
            Record::HCenter(false),
            Record::VCenter(false),
        ]
    );
}

#[test]
fn repeated_page_setting_names_block_and_record() {
    let bytes = concat(&[
        bof_worksheet(),
        header_text(RECORD_HEADER, "a"),
        header_text(RECORD_HEADER, "b"),
        eof(),
    ]);
    let err = SheetRecords::from_bytes(&bytes, RecordStreamOptions::default()).unwrap_err();
    assert_eq!(
        err,
        RecordFormatError::Duplicate {
            block: "PageSettingsBlock",
            sid: sid::HEADER
        }
    );
    assert_eq!(
        err.to_string(),
        "Duplicate PageSettingsBlock record (sid=0x0014)"
    );
}

#[test]
fn late_header_footer_moves_into_page_settings() {
    let bytes = concat(&[
        bof_worksheet(),
        header_text(RECORD_HEADER, ""),
        header_text(RECORD_FOOTER, ""),
        setup(),
        dimensions(0, 0),
        window2(),
        header_footer_ext(None),
        eof(),
    ]);
    let sheet = walk(&bytes);
    assert!(sheet.page_settings().unwrap().header_footer().is_some());

    assert_eq!(
        record_ids(&write(&sheet)),
        vec![
            RECORD_BOF,
            RECORD_HEADER,
            RECORD_FOOTER,
            RECORD_SETUP,
            RECORD_HEADERFOOTER,
            RECORD_DIMENSIONS,
            RECORD_WINDOW2,
            RECORD_EOF,
        ]
    );
}

#[test]
fn custom_view_header_footer_follows_its_view() {
    let bytes = concat(&[
        bof_worksheet(),
        header_text(RECORD_HEADER, ""),
        header_text(RECORD_FOOTER, ""),
        header_footer_ext(Some(9)),
        header_footer_ext(Some(3)),
        window2(),
        user_sview_begin(3),
        selection(),
        header_text(RECORD_HEADER, ""),
        header_text(RECORD_FOOTER, ""),
        user_sview_end(),
        user_sview_begin(9),
        selection(),
        user_sview_end(),
        eof(),
    ]);
    let sheet = walk(&bytes);
    assert!(sheet
        .page_settings()
        .unwrap()
        .unpositioned_header_footers()
        .is_empty());

    for view in sheet.custom_views() {
        let Some(CustomViewItem::Record(Record::HeaderFooter(ext))) = view.items().last() else {
            panic!("view {:?} did not receive its HeaderFooter", view.guid());
        };
        assert_eq!(ext.guid(), view.guid());
    }

    assert_eq!(
        record_ids(&write(&sheet)),
        vec![
            RECORD_BOF,
            RECORD_HEADER,
            RECORD_FOOTER,
            RECORD_WINDOW2,
            RECORD_USERSVIEWBEGIN,
            RECORD_SELECTION,
            RECORD_HEADER,
            RECORD_FOOTER,
            RECORD_HEADERFOOTER,
            RECORD_USERSVIEWEND,
            RECORD_USERSVIEWBEGIN,
            RECORD_SELECTION,
            RECORD_HEADERFOOTER,
            RECORD_USERSVIEWEND,
            RECORD_EOF,
        ]
    );
}

#[test]
fn header_footer_for_unknown_view_is_not_written() {
    let bytes = concat(&[
        bof_worksheet(),
        header_text(RECORD_HEADER, ""),
        header_text(RECORD_FOOTER, ""),
        header_footer_ext(Some(1)),
        eof(),
    ]);
    let sheet = walk(&bytes);
    assert_eq!(
        sheet
            .page_settings()
            .unwrap()
            .unpositioned_header_footers()
            .len(),
        1
    );
    assert_eq!(
        record_ids(&write(&sheet)),
        vec![RECORD_BOF, RECORD_HEADER, RECORD_FOOTER, RECORD_EOF]
    );
}

#[test]
fn continued_cf_rule_is_joined_and_split_again() {
    let formatting = vec![0x5A; 9000];
    let payload = cf_rule_payload(&formatting, &ref_v(3, 1));
    let bytes = concat(&[
        bof_worksheet(),
        cf_header(1, &[(3, 3, 1, 1)]),
        continued(RECORD_CFRULE, &payload),
        eof(),
    ]);
    let sheet = walk(&bytes);
    let format = sheet.conditional_formats().unwrap().get(0).unwrap();
    assert_eq!(format.rules()[0].formatting.len(), 9000);
    assert_eq!(format.rules()[0].formula1, ref_v(3, 1));

    let out = write(&sheet);
    assert_eq!(
        record_ids(&out),
        vec![
            RECORD_BOF,
            RECORD_CFHEADER,
            RECORD_CFRULE,
            RECORD_CONTINUE,
            RECORD_EOF
        ]
    );
    assert_eq!(out, bytes);
}

#[test]
fn edits_are_written_in_place() {
    let mut sheet = walk(&full_sheet());
    sheet.page_settings_mut().set_footer_text("&F");
    sheet.page_settings_mut().set_row_break(20, 0, 255);
    sheet.protection_mut().unprotect();
    sheet.rows_mut().group_row_range(1, 2, true);

    let ids = record_ids(&write(&sheet));
    let header = ids.iter().position(|&id| id == RECORD_HEADER).unwrap();
    assert_eq!(ids[header - 1], sid::HORIZONTAL_PAGE_BREAKS);
    assert!(!ids.contains(&RECORD_PROTECT));
    assert!(!ids.contains(&RECORD_PASSWORD));

    let rows: Vec<usize> = ids
        .iter()
        .enumerate()
        .filter(|(_, &id)| id == RECORD_ROW)
        .map(|(i, _)| i)
        .collect();
    // Rows 0, 1, 2 in the first run, row 40 after the first cells.
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1], rows[0] + 1);
    assert_eq!(rows[2], rows[1] + 1);
    assert_eq!(ids[rows[3] - 1], RECORD_NUMBER);

    let reread = walk(&write(&sheet));
    assert_eq!(reread.page_settings().unwrap().footer_text(), "&F");
    assert!(reread.page_settings().unwrap().is_row_broken(20));
    assert_eq!(reread.rows().row(2).unwrap().outline_level(), 1);
    assert!(reread.protection().is_none());
}

use biff_ptg::{
    AreaRef, BookSheet, Bound, CellRef, Ptg, ShiftDescriptor, SpreadsheetVersion,
};
use pretty_assertions::assert_eq;

const V97: SpreadsheetVersion = SpreadsheetVersion::Excel97;

fn area(first: u32, last: u32) -> Ptg {
    Ptg::Area(AreaRef::new(
        Bound::relative(first),
        Bound::relative(last),
        Bound::absolute(2),
        Bound::absolute(4),
    ))
}

fn area_with_flags(first: Bound, last: Bound) -> Ptg {
    Ptg::Area(AreaRef::new(first, last, Bound::absolute(2), Bound::absolute(4)))
}

fn rows(ptg: &Ptg) -> Option<(u32, u32)> {
    ptg.area().map(|a| (a.first_row.index, a.last_row.index))
}

/// Moves rows `first..=last` by `amount` against `A{a_first}:A{a_last}` and returns the
/// resulting rows, or `None` if the area was destroyed.
fn move_area(a_first: u32, a_last: u32, first: u32, last: u32, amount: i32) -> Option<(u32, u32)> {
    let shifter = ShiftDescriptor::for_row_shift(0, "Sheet1", first, last, amount, V97).unwrap();
    let mut ptgs = vec![area(a_first, a_last)];
    shifter.adjust(&mut ptgs, 0).unwrap();
    rows(&ptgs[0])
}

#[test]
fn area_moves_against_source_rows() {
    let cases: &[(u32, u32, i32, (u32, u32))] = &[
        // Moved rows enclose the area.
        (9, 21, 20, (30, 40)),
        (10, 21, 20, (30, 40)),
        (9, 20, 20, (30, 40)),
        // Moved rows include the top of the area.
        (8, 11, -3, (7, 20)),
        (8, 11, 3, (13, 20)),
        (8, 11, 7, (17, 20)),
        (8, 11, 8, (18, 20)),
        (8, 11, 9, (12, 20)),
        (8, 11, 10, (12, 21)),
        (8, 11, 12, (12, 23)),
        // Destination passes beyond the bottom edge: Excel ignores the move.
        (8, 11, 13, (10, 20)),
        // Moved rows strictly inside the area.
        (12, 16, 3, (10, 20)),
        (11, 19, 20, (10, 20)),
        (16, 17, -6, (10, 20)),
        (16, 17, -7, (11, 20)),
        (12, 16, 4, (10, 20)),
        (12, 16, 6, (10, 17)),
        (15, 19, -7, (13, 20)),
        // Moved rows include the bottom of the area.
        (18, 22, -1, (10, 19)),
        (18, 22, -7, (10, 13)),
        (18, 22, -8, (10, 17)),
        (18, 22, -9, (9, 17)),
        (18, 22, -15, (10, 20)),
        (19, 23, -12, (7, 18)),
        (18, 22, 5, (10, 25)),
    ];

    for &(first, last, amount, expected) in cases {
        assert_eq!(
            move_area(10, 20, first, last, amount),
            Some(expected),
            "moving {first}..={last} by {amount}"
        );
    }
}

#[test]
fn area_moves_against_destination_rows() {
    let cases: &[(u32, u32, i32, Option<(u32, u32)>)] = &[
        (5, 10, 9, Some((20, 25))),
        (5, 10, 21, Some((20, 25))),
        (11, 14, 10, Some((20, 25))),
        (7, 17, 10, None),
        (5, 15, 7, Some((23, 25))),
        (13, 16, 10, Some((20, 22))),
    ];

    for &(first, last, amount, expected) in cases {
        assert_eq!(
            move_area(20, 25, first, last, amount),
            expected,
            "moving {first}..={last} by {amount}"
        );
    }
}

#[test]
fn ignored_move_reports_no_change() {
    let shifter = ShiftDescriptor::for_row_shift(0, "Sheet1", 8, 11, 13, V97).unwrap();
    let mut ptgs = vec![area(10, 20)];
    assert!(!shifter.adjust(&mut ptgs, 0).unwrap());
    assert_eq!(ptgs, vec![area(10, 20)]);
}

#[test]
fn destroyed_area_keeps_its_sheet() {
    let shifter = ShiftDescriptor::for_row_shift(4, "Data", 7, 17, 10, V97).unwrap();
    let area3d = |sheet| Ptg::Area3d {
        sheet,
        area: AreaRef::absolute(20, 25, 0, 0),
    };
    let mut ptgs = vec![area3d(4), area3d(5)];
    assert!(shifter.adjust(&mut ptgs, 0).unwrap());
    assert_eq!(ptgs, vec![Ptg::AreaErr3d { sheet: 4 }, area3d(5)]);
}

fn copy_area(first: Bound, last: Bound, amount: i32, copied_first: u32, copied_last: u32) -> (bool, Ptg) {
    let shifter =
        ShiftDescriptor::for_row_copy(0, "Sheet1", copied_first, copied_last, amount, V97).unwrap();
    let mut ptgs = vec![area_with_flags(first, last)];
    let changed = shifter.adjust(&mut ptgs, 0).unwrap();
    (changed, ptgs.remove(0))
}

#[test]
fn row_copy_moves_relative_bounds_only() {
    let rel = Bound::relative;
    let abs = Bound::absolute;

    assert_eq!(
        copy_area(rel(10), rel(20), 20, 0, 30),
        (true, area_with_flags(rel(30), rel(40)))
    );
    assert_eq!(copy_area(rel(10), rel(20), -15, 15, 25), (true, Ptg::AreaErr));

    // First bound moves past the absolute last bound, so the bounds swap.
    assert_eq!(
        copy_area(rel(10), abs(20), 20, 0, 30),
        (true, area_with_flags(abs(20), rel(30)))
    );
    assert_eq!(copy_area(rel(10), abs(20), -15, 15, 25), (true, Ptg::AreaErr));

    assert_eq!(
        copy_area(abs(10), rel(20), 20, 0, 30),
        (true, area_with_flags(abs(10), rel(40)))
    );
    assert_eq!(
        copy_area(abs(10), rel(20), -15, 15, 25),
        (true, area_with_flags(rel(5), abs(10)))
    );

    assert_eq!(
        copy_area(abs(10), abs(20), 20, 0, 30),
        (false, area_with_flags(abs(10), abs(20)))
    );
}

#[test]
fn row_copy_of_single_cells() {
    let cell = |row: Bound| Ptg::Ref(CellRef::new(row, Bound::relative(0)));

    let shifter = ShiftDescriptor::for_row_copy(0, "Sheet1", 2, 2, 3, V97).unwrap();
    let mut ptgs = vec![cell(Bound::relative(5)), cell(Bound::absolute(5))];
    assert!(shifter.adjust(&mut ptgs, 0).unwrap());
    assert_eq!(ptgs, vec![cell(Bound::relative(8)), cell(Bound::absolute(5))]);

    // The copied formula would land above row 0.
    let shifter = ShiftDescriptor::for_row_copy(0, "Sheet1", 2, 2, -3, V97).unwrap();
    let mut ptgs = vec![cell(Bound::relative(9))];
    assert!(shifter.adjust(&mut ptgs, 0).unwrap());
    assert_eq!(ptgs, vec![Ptg::RefErr]);

    // The reference itself would fall off the bottom of the grid.
    let shifter = ShiftDescriptor::for_row_copy(0, "Sheet1", 0, 0, 10, V97).unwrap();
    let mut ptgs = vec![cell(Bound::relative(65_530))];
    assert!(shifter.adjust(&mut ptgs, 0).unwrap());
    assert_eq!(ptgs, vec![Ptg::RefErr]);
}

#[test]
fn row_copy_shifts_references_to_other_sheets() {
    let shifter = ShiftDescriptor::for_row_copy(0, "Sheet1", 0, 0, 1, V97).unwrap();
    let book = BookSheet::local("Other");
    let cell = |row| CellRef::new(Bound::relative(row), Bound::relative(0));
    let mut ptgs = vec![
        Ptg::Ref3d {
            sheet: 3,
            cell: cell(4),
        },
        Ptg::BookRef {
            book: book.clone(),
            cell: cell(4),
        },
    ];
    assert!(shifter.adjust(&mut ptgs, 7).unwrap());
    assert_eq!(
        ptgs,
        vec![
            Ptg::Ref3d {
                sheet: 3,
                cell: cell(5),
            },
            Ptg::BookRef { book, cell: cell(5) },
        ]
    );
}

#[test]
fn sheet_shift_moves_sheets_between_source_and_destination() {
    let ref3d = |sheet| Ptg::Ref3d {
        sheet,
        cell: CellRef::new(Bound::absolute(1), Bound::absolute(1)),
    };
    let shifter = ShiftDescriptor::for_sheet_shift(2, 0).unwrap();
    let mut ptgs = vec![ref3d(0), ref3d(1), ref3d(2), ref3d(3)];
    assert!(shifter.adjust(&mut ptgs, 0).unwrap());
    assert_eq!(ptgs, vec![ref3d(1), ref3d(2), ref3d(0), ref3d(3)]);

    let shifter = ShiftDescriptor::for_sheet_shift(0, 2).unwrap();
    assert!(shifter.adjust(&mut ptgs, 0).unwrap());
    assert_eq!(ptgs, vec![ref3d(0), ref3d(1), ref3d(2), ref3d(3)]);
}

#[test]
fn sheet_shift_ignores_local_and_named_tokens() {
    let shifter = ShiftDescriptor::for_sheet_shift(0, 1).unwrap();
    let mut ptgs = vec![
        area(1, 2),
        Ptg::BookRefErr {
            book: BookSheet::local("Sheet1"),
        },
    ];
    let before = ptgs.clone();
    assert!(!shifter.adjust(&mut ptgs, 0).unwrap());
    assert_eq!(ptgs, before);
}

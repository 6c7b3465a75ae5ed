//! Ledger-shaped workbooks for runtime tests.

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

/// One data row: add-date, cancel-date, grade code, teacher, course.
pub type LedgerRow<'a> = (&'a str, &'a str, u32, &'a str, &'a str);

/// Build a ledger export: three banner rows, header on row 4, data below.
/// Dates are written as text.
pub fn ledger_workbook(rows: &[LedgerRow<'_>]) -> Vec<u8> {
    build_ledger(rows, |sheet, r, c, date| {
        sheet.write_string(r, c, date).unwrap();
    })
}

/// Same layout as [`ledger_workbook`], with dates stored as native
/// `yyyy/mm/dd` date cells the way ledger exports carry them.
pub fn native_date_ledger_workbook(rows: &[LedgerRow<'_>]) -> Vec<u8> {
    let format = Format::new().set_num_format("yyyy/mm/dd");
    build_ledger(rows, |sheet, r, c, date| {
        let parts: Vec<u16> = date.split('-').map(|p| p.parse().unwrap()).collect();
        let d = ExcelDateTime::from_ymd(parts[0], parts[1] as u8, parts[2] as u8).unwrap();
        sheet.write_datetime_with_format(r, c, &d, &format).unwrap();
    })
}

fn build_ledger(rows: &[LedgerRow<'_>], write_date: impl Fn(&mut Worksheet, u32, u16, &str)) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "受講者一覧").unwrap();
    sheet.write_string(3, 2, "受講追加日付").unwrap();
    sheet.write_string(3, 26, "担当").unwrap();

    for (i, (add, cancel, grade, teacher, course)) in rows.iter().enumerate() {
        let r = (i + 4) as u32;
        write_date(sheet, r, 2, *add);
        if !cancel.is_empty() {
            write_date(sheet, r, 6, *cancel);
        }
        sheet.write_string(r, 9, *course).unwrap();
        sheet.write_string(r, 10, "【コア】").unwrap();
        sheet.write_string(r, 11, "本校").unwrap();
        sheet.write_number(r, 15, *grade).unwrap();
        sheet.write_string(r, 26, *teacher).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

/// A sheet with data but far fewer columns than the ledger needs.
pub fn narrow_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for r in 0..6u32 {
        sheet.write_string(r, 0, "2025-04-01").unwrap();
        sheet.write_string(r, 1, "x").unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

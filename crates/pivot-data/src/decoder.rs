//! Schema-aware row decoding: [`Sheet`] → [`EnrollmentRecord`].

use pivot_core::error::{PivotError, Result};
use pivot_core::models::EnrollmentRecord;
use pivot_core::schema::{ColumnLayout, Columns, InputSchema};

use crate::sheet::Sheet;

/// Decode every data row of `sheet` using `schema`.
///
/// An empty sheet decodes to no records. A non-empty sheet that lacks a
/// required column is a [`PivotError::Schema`] error.
pub fn decode(sheet: &Sheet, schema: &InputSchema) -> Result<Vec<EnrollmentRecord>> {
    if sheet.rows.is_empty() {
        return Ok(Vec::new());
    }
    let cols = resolve_columns(sheet, schema)?;

    let records = (0..sheet.rows.len())
        .map(|row| {
            let cell = |col: usize| sheet.cell(row, col);
            let optional = |col: Option<usize>| col.map(|c| cell(c).text());
            EnrollmentRecord {
                add_date: cell(cols.add_date).date(),
                cancel_date: cell(cols.cancel_date).date(),
                course: cell(cols.course).text(),
                class_type: cell(cols.class_type).text(),
                classroom: cell(cols.classroom).text(),
                grade_code: cell(cols.grade).integer(),
                teacher: cell(cols.teacher).text(),
                gender: optional(cols.gender),
                school: optional(cols.school),
                department: optional(cols.department),
            }
        })
        .collect();
    Ok(records)
}

/// Turn the schema's layout into concrete column positions for this sheet.
fn resolve_columns(sheet: &Sheet, schema: &InputSchema) -> Result<Columns<usize>> {
    match schema.layout {
        ColumnLayout::Positional(cols) => {
            let width = sheet.width();
            let needed = cols.required().into_iter().max().unwrap_or(0);
            if needed >= width {
                return Err(PivotError::Schema(format!(
                    "{} v{} needs at least {} columns, sheet has {}",
                    schema.name,
                    schema.version,
                    needed + 1,
                    width
                )));
            }
            let within = |c: Option<usize>| c.filter(|c| *c < width);
            Ok(Columns {
                gender: within(cols.gender),
                school: within(cols.school),
                department: within(cols.department),
                ..cols
            })
        }
        ColumnLayout::Named(names) => {
            let header = sheet.header_names();
            let find = |name: &str| header.iter().position(|h| h == name);
            let require = |name: &str| {
                find(name).ok_or_else(|| {
                    PivotError::Schema(format!(
                        "{} v{} header is missing column {name:?}",
                        schema.name, schema.version
                    ))
                })
            };
            Ok(Columns {
                add_date: require(names.add_date)?,
                cancel_date: require(names.cancel_date)?,
                course: require(names.course)?,
                class_type: require(names.class_type)?,
                classroom: require(names.classroom)?,
                grade: require(names.grade)?,
                teacher: require(names.teacher)?,
                gender: names.gender.and_then(find),
                school: names.school.and_then(find),
                department: names.department.and_then(find),
            })
        }
    }
}

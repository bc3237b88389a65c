//! Spreadsheet loader (.xlsx, .xls, .ods) via calamine.
//!
//! Each sheet becomes a `Sheet: <name>` line followed by its rows in
//! row-major order, cells separated by tabs. Trailing empty cells are
//! dropped and fully empty rows are skipped. Date cells are written as
//! `YYYY-MM-DD` (plus the time of day when it is not midnight) rather than
//! as Excel serial numbers.

use super::ooxml::{open_package, unreadable};
use crate::error::DynamoError;
use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use std::io::Cursor;

/// Extract delimited text from every sheet of a workbook.
pub fn extract(source_id: &str, bytes: &[u8]) -> Result<String, DynamoError> {
    // .xlsx and .ods are zip packages; bound their expanded size before
    // calamine inflates them. Legacy .xls is not compressed.
    if bytes.starts_with(b"PK") {
        open_package(source_id, bytes)?;
    }
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| unreadable(source_id, e))?;

    let mut out = String::new();
    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| unreadable(source_id, format!("sheet '{sheet}': {e}")))?;

        let rows: Vec<String> = range.rows().filter_map(row_text).collect();
        if rows.is_empty() {
            continue;
        }
        out.push_str(&format!("Sheet: {sheet}\n"));
        for row in rows {
            out.push_str(&row);
            out.push('\n');
        }
        out.push('\n');
    }
    Ok(out)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(dt) => date_text(dt),
        other => other.to_string().trim().to_string(),
    }
}

fn date_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        if let Some(d) = dt.as_duration() {
            let secs = d.num_seconds();
            return format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60);
        }
    } else if let Some(at) = dt.as_datetime() {
        return if dt.as_f64().fract() == 0.0 {
            at.format("%Y-%m-%d").to_string()
        } else {
            at.format("%Y-%m-%d %H:%M:%S").to_string()
        };
    }
    dt.as_f64().to_string()
}

/// Tab-joined row text, or `None` when every cell is empty.
fn row_text(row: &[Data]) -> Option<String> {
    let mut cells: Vec<String> = row.iter().map(cell_text).collect();
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    if cells.is_empty() {
        None
    } else {
        Some(cells.join("\t"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::ExcelDateTimeType;

    #[test]
    fn row_text_drops_trailing_empties() {
        let row = [
            Data::String("Mitosis".into()),
            Data::Empty,
            Data::Int(2),
            Data::Empty,
        ];
        assert_eq!(row_text(&row).as_deref(), Some("Mitosis\t\t2"));
    }

    #[test]
    fn dates_rendered_as_calendar_dates() {
        let row = [
            Data::String("Berlin Wall falls".into()),
            Data::DateTime(ExcelDateTime::new(32821.0, ExcelDateTimeType::DateTime, false)),
        ];
        assert_eq!(row_text(&row).as_deref(), Some("Berlin Wall falls\t1989-11-09"));
    }

    #[test]
    fn date_with_time_and_durations() {
        let noon = Data::DateTime(ExcelDateTime::new(32821.5, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_text(&noon), "1989-11-09 12:00:00");

        let lap = Data::DateTime(ExcelDateTime::new(1.5 / 24.0, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(cell_text(&lap), "1:30:00");

        let iso = Data::DateTimeIso("2024-03-01T09:30:00".into());
        assert_eq!(cell_text(&iso), "2024-03-01T09:30:00");
    }

    #[test]
    fn empty_row_skipped() {
        assert_eq!(row_text(&[Data::Empty, Data::Empty]), None);
        assert_eq!(row_text(&[Data::String("  ".into())]), None);
    }

    #[test]
    fn garbage_is_unreadable() {
        let err = extract("grades.xlsx", b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, DynamoError::UnreadableDocument { .. }));
    }
}

//! CSV rendering for the admin "Download Csv" actions.
//!
//! Each exportable entity declares an explicit accessor table mapping a
//! column header to a typed accessor function; the writer walks that table
//! rather than doing any runtime field reflection.

use std::io::Cursor;

use rocket::{
    http::{ContentType, Header},
    response::{self, Responder, Response},
    Request,
};

use crate::util::slugify;

/// One column of an export: a header plus the accessor that projects a row
/// into that column's value.
pub struct Column<T> {
    pub header: &'static str,
    pub accessor: fn(&T) -> String,
}

/// Renders one header record followed by one record per row. The standard
/// CSV quoting of the `csv` crate applies; every record has exactly
/// `columns.len()` fields.
pub fn render_csv<T>(columns: &[Column<T>], rows: &[T]) -> csv::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(columns.iter().map(|column| column.header))?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| (column.accessor)(row)))?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    // the writer only ever receives `String`s
    Ok(String::from_utf8(bytes).unwrap())
}

/// A complete, in-memory CSV document served as a browser download named
/// after the exported entity.
pub struct CsvDownload {
    pub entity: &'static str,
    pub body: String,
}

impl<'r> Responder<'r, 'static> for CsvDownload {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .header(ContentType::CSV)
            .header(Header::new(
                "Content-Disposition",
                format!("attachment; filename={}.csv", slugify(self.entity)),
            ))
            .sized_body(self.body.len(), Cursor::new(self.body))
            .ok()
    }
}

#[cfg(test)]
mod test_render_csv {
    use super::{render_csv, Column};

    struct Row {
        name: String,
        roll_no: String,
    }

    fn columns() -> Vec<Column<Row>> {
        vec![
            Column {
                header: "name",
                accessor: |row| row.name.clone(),
            },
            Column {
                header: "roll_no",
                accessor: |row| row.roll_no.clone(),
            },
        ]
    }

    #[test]
    fn test_one_record_per_row_plus_header() {
        let rows = vec![
            Row {
                name: "A".to_string(),
                roll_no: "101".to_string(),
            },
            Row {
                name: "B".to_string(),
                roll_no: "102".to_string(),
            },
        ];

        let rendered = render_csv(&columns(), &rows).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "name,roll_no");
        assert_eq!(lines[1], "A,101");
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let rows = vec![Row {
            name: "A, the first".to_string(),
            roll_no: "101".to_string(),
        }];

        let rendered = render_csv(&columns(), &rows).unwrap();
        let mut reader = csv::Reader::from_reader(rendered.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(&record[0], "A, the first");
    }
}

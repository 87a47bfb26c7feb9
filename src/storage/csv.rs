// src/storage/csv.rs

//! Minimal CSV writer (comma separated, CRLF-free, RFC 4180 quoting).

use crate::pipeline::Table;

/// Quote a field when it contains a separator, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_line(out: &mut String, cells: &[String]) {
    let line: Vec<String> = cells.iter().map(|c| escape(c)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Render a table, header first.
pub fn to_csv(table: &Table) -> String {
    let mut out = String::new();
    write_line(&mut out, &table.header);
    for row in &table.rows {
        write_line(&mut out, row);
    }
    out
}

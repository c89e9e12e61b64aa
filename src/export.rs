use crate::calc::StudentRow;
use anyhow::Context;
use std::path::Path;

pub const STUDENT_ROWS_HEADER: &str = "Roll No.,Name,Class,Attended,Total Days,Percentage";

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn student_rows_csv(rows: &[StudentRow]) -> String {
    let mut csv = String::from(STUDENT_ROWS_HEADER);
    csv.push('\n');
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{}%\n",
            csv_quote(&row.roll),
            csv_quote(&row.name),
            csv_quote(&row.class),
            row.attended,
            row.total_days,
            row.percentage_label(),
        ));
    }
    csv
}

/// Write the CSV to `out`, creating parent directories. Returns the row count.
pub fn write_student_rows_csv(rows: &[StudentRow], out: &Path) -> anyhow::Result<usize> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(out, student_rows_csv(rows))
        .with_context(|| format!("failed to write {}", out.to_string_lossy()))?;
    Ok(rows.len())
}

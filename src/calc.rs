use crate::db::{AttendanceRecord, Store, StoreError, Student};
use crate::periods::Period;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Half-up 1-decimal rounding: `floor(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// `part / whole` as a rounded percentage, or 0 when `whole` is not positive.
pub fn percent_of(part: usize, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round_off_1_decimal(part as f64 / whole as f64 * 100.0)
}

fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.1}", value))
}

/// Order roll numbers so that digit runs compare by value: "S2" < "S10".
pub fn compare_rolls(a: &str, b: &str) -> Ordering {
    let ta = tokenize(a);
    let tb = tokenize(b);
    for (x, y) in ta.iter().zip(tb.iter()) {
        let ord = match (x, y) {
            (Token::Digits(x), Token::Digits(y)) => {
                let xs = x.trim_start_matches('0');
                let ys = y.trim_start_matches('0');
                xs.len()
                    .cmp(&ys.len())
                    .then_with(|| xs.cmp(ys))
                    .then_with(|| x.len().cmp(&y.len()))
            }
            (Token::Text(x), Token::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
            // Digits sort ahead of letters, as in a plain ASCII compare.
            (Token::Digits(_), Token::Text(_)) => Ordering::Less,
            (Token::Text(_), Token::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ta.len().cmp(&tb.len()).then_with(|| a.cmp(b))
}

enum Token<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn tokenize(s: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut in_digits: Option<bool> = None;
    for (i, ch) in s.char_indices() {
        let is_digit = ch.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(token(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(prev) = in_digits {
        out.push(token(&s[start..], prev));
    }
    out
}

fn token(s: &str, digits: bool) -> Token<'_> {
    if digits {
        Token::Digits(s)
    } else {
        Token::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub roll: String,
    pub name: String,
    pub class: String,
    pub attended: usize,
    pub total_days: i64,
    #[serde(serialize_with = "one_decimal")]
    pub percentage: f64,
}

impl StudentRow {
    pub fn percentage_label(&self) -> String {
        format!("{:.1}", self.percentage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRow {
    pub class: String,
    pub total_students: usize,
    pub total_attendance: usize,
    pub working_days: i64,
    #[serde(serialize_with = "one_decimal")]
    pub class_percentage: f64,
}

impl ClassRow {
    fn from_rows<'a, I>(class: &str, rows: I, working_days: i64) -> ClassRow
    where
        I: IntoIterator<Item = &'a StudentRow>,
    {
        let mut total_students = 0usize;
        let mut total_attendance = 0usize;
        for row in rows {
            total_students += 1;
            total_attendance += row.attended;
        }
        let denom = (total_students as i64).saturating_mul(working_days);
        ClassRow {
            class: class.to_string(),
            total_students,
            total_attendance,
            working_days,
            class_percentage: percent_of(total_attendance, denom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub period: Period,
    pub working_days: i64,
    pub student_rows: Vec<StudentRow>,
    /// The aggregate over every student.
    pub class_rows: ClassRow,
    /// The same aggregate per distinct class name.
    pub by_class: Vec<ClassRow>,
}

/// Build the report from already-loaded rows. Every student gets a row, even
/// with no attendance; days are counted once per distinct date.
pub fn build_report(
    students: &[Student],
    records: &[AttendanceRecord],
    period: &Period,
    working_days: i64,
) -> Report {
    let mut dates_by_roll: HashMap<&str, HashSet<&str>> = HashMap::new();
    for r in records.iter().filter(|r| period.contains(&r.date)) {
        dates_by_roll
            .entry(r.roll.as_str())
            .or_default()
            .insert(r.date.as_str());
    }

    let mut student_rows: Vec<StudentRow> = students
        .iter()
        .map(|s| {
            let attended = dates_by_roll.get(s.roll.as_str()).map_or(0, HashSet::len);
            StudentRow {
                roll: s.roll.clone(),
                name: s.name.clone(),
                class: s.class.clone(),
                attended,
                total_days: working_days,
                percentage: percent_of(attended, working_days),
            }
        })
        .collect();
    student_rows.sort_by(|a, b| compare_rolls(&a.roll, &b.roll));

    let mut grouped: BTreeMap<&str, Vec<&StudentRow>> = BTreeMap::new();
    for row in &student_rows {
        grouped.entry(row.class.as_str()).or_default().push(row);
    }
    let mut by_class: Vec<ClassRow> = grouped
        .into_iter()
        .map(|(class, rows)| ClassRow::from_rows(class, rows, working_days))
        .collect();
    by_class.sort_by(|a, b| compare_rolls(&a.class, &b.class));

    let class_rows = ClassRow::from_rows(crate::periods::ALL, &student_rows, working_days);

    Report {
        period: period.clone(),
        working_days,
        student_rows,
        class_rows,
        by_class,
    }
}

/// Compute the report for `period`.
///
/// An explicit `working_days` becomes the stored setting before the report is
/// built; `None` uses whatever is stored.
pub async fn calculate(
    store: &Store,
    period: &Period,
    working_days: Option<i64>,
) -> Result<Report, StoreError> {
    let working_days = match working_days {
        Some(days) => {
            store.set_working_days(days).await?;
            days
        }
        None => store.working_days().await?,
    };
    let students: Vec<Student> = store.get_all().await?;
    let records: Vec<AttendanceRecord> = store.get_all().await?;
    let report = build_report(&students, &records, period, working_days);
    tracing::info!(
        period = %period,
        working_days,
        students = report.student_rows.len(),
        "report calculated"
    );
    Ok(report)
}

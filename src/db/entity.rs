use rusqlite::{named_params, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};

/// A row type owned by one collection of the store.
///
/// The store hands out copies; changing an entity means calling `put` again.
pub trait Entity: Sized + Send + 'static {
    type Key: ToSql + Send + 'static;

    const COLLECTION: &'static str;

    fn select_by_key(key: &Self::Key, conn: &Connection) -> rusqlite::Result<Option<Self>>;

    /// Every row, in insertion order.
    fn select_all(conn: &Connection) -> rusqlite::Result<Vec<Self>>;

    /// Insert or replace by primary key and return the key that was written.
    fn upsert(&self, conn: &Connection) -> rusqlite::Result<Self::Key>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub roll: String,
    pub name: String,
    pub class: String,
}

impl Entity for Student {
    type Key = String;

    const COLLECTION: &'static str = "students";

    fn select_by_key(roll: &String, conn: &Connection) -> rusqlite::Result<Option<Student>> {
        conn.query_row(
            "SELECT roll, name, class FROM students WHERE roll = :roll",
            named_params! { ":roll": roll },
            student_mapper(),
        )
        .optional()
    }

    fn select_all(conn: &Connection) -> rusqlite::Result<Vec<Student>> {
        let res = conn
            .prepare("SELECT roll, name, class FROM students ORDER BY rowid")?
            .query_map([], student_mapper())?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(res)
    }

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<String> {
        conn.execute(
            "INSERT INTO students(roll, name, class)
             VALUES(:roll, :name, :class)
             ON CONFLICT(roll) DO UPDATE SET
               name = excluded.name,
               class = excluded.class",
            named_params! {
                ":roll": self.roll,
                ":name": self.name,
                ":class": self.class,
            },
        )?;
        Ok(self.roll.clone())
    }
}

const fn student_mapper() -> fn(&Row) -> rusqlite::Result<Student> {
    |row: &Row| -> rusqlite::Result<Student> {
        Ok(Student {
            roll: row.get(0)?,
            name: row.get(1)?,
            class: row.get(2)?,
        })
    }
}

/// One attendance event. `name` and `class` are copied from the student when the
/// record is written and never follow later changes to the student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Assigned by the store on first write.
    pub id: Option<i64>,
    pub roll: String,
    pub name: String,
    pub class: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub time: String,
}

/// Result of [`insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inserted {
    New(AttendanceRecord),
    Existing(AttendanceRecord),
}

const ATTENDANCE_COLUMNS: &str = "id, roll, name, class, date, time";

impl AttendanceRecord {
    pub fn for_student(student: &Student, date: impl Into<String>, time: impl Into<String>) -> Self {
        AttendanceRecord {
            id: None,
            roll: student.roll.clone(),
            name: student.name.clone(),
            class: student.class.clone(),
            date: date.into(),
            time: time.into(),
        }
    }

    pub fn select_by_roll_and_date(
        roll: &str,
        date: &str,
        conn: &Connection,
    ) -> rusqlite::Result<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE roll = :roll AND date = :date"
        );
        conn.query_row(
            &sql,
            named_params! { ":roll": roll, ":date": date },
            attendance_mapper(),
        )
        .optional()
    }

    pub fn select_by_date(date: &str, conn: &Connection) -> rusqlite::Result<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE date = :date ORDER BY id"
        );
        let res = conn
            .prepare(&sql)?
            .query_map(named_params! { ":date": date }, attendance_mapper())?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(res)
    }

    pub fn select_by_roll(roll: &str, conn: &Connection) -> rusqlite::Result<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE roll = :roll ORDER BY date, id"
        );
        let res = conn
            .prepare(&sql)?
            .query_map(named_params! { ":roll": roll }, attendance_mapper())?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(res)
    }
}

/// Insert `record` unless a row for the same (roll, date) already exists.
///
/// The UNIQUE (roll, date) index makes this a single atomic statement; the
/// follow-up read only runs when nothing was inserted.
pub fn insert_if_absent(record: &AttendanceRecord, conn: &Connection) -> rusqlite::Result<Inserted> {
    let inserted = conn.execute(
        "INSERT INTO attendance(roll, name, class, date, time)
         VALUES(:roll, :name, :class, :date, :time)
         ON CONFLICT(roll, date) DO NOTHING",
        named_params! {
            ":roll": record.roll,
            ":name": record.name,
            ":class": record.class,
            ":date": record.date,
            ":time": record.time,
        },
    )?;
    if inserted > 0 {
        let mut written = record.clone();
        written.id = Some(conn.last_insert_rowid());
        return Ok(Inserted::New(written));
    }
    match AttendanceRecord::select_by_roll_and_date(&record.roll, &record.date, conn)? {
        Some(existing) => Ok(Inserted::Existing(existing)),
        None => Err(rusqlite::Error::QueryReturnedNoRows),
    }
}

impl Entity for AttendanceRecord {
    type Key = i64;

    const COLLECTION: &'static str = "attendance";

    fn select_by_key(id: &i64, conn: &Connection) -> rusqlite::Result<Option<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = :id");
        conn.query_row(&sql, named_params! { ":id": id }, attendance_mapper())
            .optional()
    }

    fn select_all(conn: &Connection) -> rusqlite::Result<Vec<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance ORDER BY id");
        let res = conn
            .prepare(&sql)?
            .query_map([], attendance_mapper())?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(res)
    }

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        let Some(id) = self.id else {
            conn.execute(
                "INSERT INTO attendance(roll, name, class, date, time)
                 VALUES(:roll, :name, :class, :date, :time)",
                named_params! {
                    ":roll": self.roll,
                    ":name": self.name,
                    ":class": self.class,
                    ":date": self.date,
                    ":time": self.time,
                },
            )?;
            return Ok(conn.last_insert_rowid());
        };
        conn.execute(
            "INSERT INTO attendance(id, roll, name, class, date, time)
             VALUES(:id, :roll, :name, :class, :date, :time)
             ON CONFLICT(id) DO UPDATE SET
               roll = excluded.roll,
               name = excluded.name,
               class = excluded.class,
               date = excluded.date,
               time = excluded.time",
            named_params! {
                ":id": id,
                ":roll": self.roll,
                ":name": self.name,
                ":class": self.class,
                ":date": self.date,
                ":time": self.time,
            },
        )?;
        Ok(id)
    }
}

const fn attendance_mapper() -> fn(&Row) -> rusqlite::Result<AttendanceRecord> {
    |row: &Row| -> rusqlite::Result<AttendanceRecord> {
        Ok(AttendanceRecord {
            id: row.get(0)?,
            roll: row.get(1)?,
            name: row.get(2)?,
            class: row.get(3)?,
            date: row.get(4)?,
            time: row.get(5)?,
        })
    }
}

use super::{GradeStore, StoreKind};
use crate::error::StoreError;
use crate::table::{Cell, GradeTable, Row};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DB_FILE_NAME: &str = "gradebook.sqlite3";

/// Grade table kept in a workspace SQLite database: one `students` row per
/// name, one `cells` row per (student, column).
pub struct SqliteStore {
    path: PathBuf,
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(workspace)?;
        let path = workspace.join(DB_FILE_NAME);
        let conn = Connection::open(&path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS students(
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cells(
                student_id TEXT NOT NULL,
                subject_key TEXT NOT NULL,
                raw_value REAL,
                raw_text TEXT,
                PRIMARY KEY(student_id, subject_key),
                FOREIGN KEY(student_id) REFERENCES students(id)
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cells_student ON cells(student_id)",
            [],
        )?;

        Ok(Self { path, conn })
    }
}

impl GradeStore for SqliteStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Sqlite
    }

    fn read(&self) -> Result<GradeTable, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.name, c.subject_key, c.raw_value, c.raw_text
             FROM students s
             LEFT JOIN cells c ON c.student_id = s.id
             ORDER BY s.name",
        )?;
        let rows = stmt.query_map([], |r| {
            let name: String = r.get(0)?;
            let key: Option<String> = r.get(1)?;
            let raw_value: Option<f64> = r.get(2)?;
            let raw_text: Option<String> = r.get(3)?;
            Ok((name, key, raw_value, raw_text))
        })?;

        let mut by_name: HashMap<String, Row> = HashMap::new();
        for row in rows {
            let (name, key, raw_value, raw_text) = row?;
            let entry = by_name.entry(name).or_default();
            let Some(key) = key else {
                continue;
            };
            let cell = match (raw_value, raw_text) {
                (Some(v), _) => Some(Cell::Number(v)),
                (None, Some(t)) => Some(Cell::Text(t)),
                (None, None) => None,
            };
            entry.insert(key, cell);
        }

        let mut table = GradeTable::new();
        for (name, row) in by_name {
            table.insert_row(name, row);
        }
        Ok(table)
    }

    fn write(&self, table: &GradeTable) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;

        let mut existing: HashMap<String, String> = HashMap::new();
        {
            let mut stmt = tx.prepare("SELECT name, id FROM students")?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?;
            for row in rows {
                let (name, id) = row?;
                existing.insert(name, id);
            }
        }

        // Whole-table replace: rows absent from `table` go away.
        for (name, id) in &existing {
            if !table.contains_student(name) {
                tx.execute("DELETE FROM cells WHERE student_id = ?", [id])?;
                tx.execute("DELETE FROM students WHERE id = ?", [id])?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        for (name, row) in table.rows() {
            let id = match existing.get(name) {
                Some(id) => id.clone(),
                None => {
                    let id = Uuid::new_v4().to_string();
                    tx.execute(
                        "INSERT INTO students(id, name, created_at) VALUES(?, ?, ?)",
                        (&id, name, &now),
                    )?;
                    id
                }
            };
            tx.execute("DELETE FROM cells WHERE student_id = ?", [&id])?;
            for (key, cell) in row {
                let (raw_value, raw_text) = match cell {
                    Some(Cell::Number(v)) => (Some(*v), None),
                    Some(Cell::Text(t)) => (None, Some(t.as_str())),
                    None => (None, None),
                };
                tx.execute(
                    "INSERT INTO cells(student_id, subject_key, raw_value, raw_text)
                     VALUES(?, ?, ?, ?)",
                    (&id, key, raw_value, raw_text),
                )?;
            }
        }

        tx.commit()?;
        tracing::debug!(rows = table.len(), "sqlite store written");
        Ok(())
    }

    fn files(&self) -> Vec<PathBuf> {
        // Fold any WAL content into the main file before it is copied.
        if let Err(e) = self
            .conn
            .query_row("PRAGMA wal_checkpoint(FULL)", [], |_| Ok(()))
        {
            tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "wal checkpoint failed; backup may miss recent writes"
            );
        }
        vec![self.path.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::Curriculum;
    use crate::gateway::{create_student, grade_at, record_grade};
    use crate::store::test_support::temp_dir;
    use rusqlite::OptionalExtension;

    fn created_at(store: &SqliteStore, name: &str) -> Option<String> {
        store
            .conn
            .query_row(
                "SELECT created_at FROM students WHERE name = ?",
                [name],
                |r| r.get(0),
            )
            .optional()
            .expect("query created_at")
    }

    fn sample(c: &Curriculum) -> GradeTable {
        let t = create_student(c, &GradeTable::new(), "Alice").expect("create");
        let t = create_student(c, &t, "Bob").expect("create");
        let mut t = record_grade(c, &t, "Alice", "ING05-ICY-Maths|Maths", &Cell::Number(14.0))
            .expect("grade");
        t.set_cell("Bob", "ING05-ICY-SAE|SAE", Some(Cell::Text("abs".to_string())));
        t.set_cell("Bob", "Legacy|Column", Some(Cell::Number(3.5)));
        t
    }

    #[test]
    fn uninitialized_store_reads_empty() {
        let dir = temp_dir("gradebook-sqlite-empty");
        let store = SqliteStore::open(&dir).expect("open");
        assert!(store.read().expect("read").is_empty());
    }

    #[test]
    fn write_then_read_round_trips_exactly() {
        let dir = temp_dir("gradebook-sqlite-roundtrip");
        let c = Curriculum::builtin();
        let table = sample(&c);

        let store = SqliteStore::open(&dir).expect("open");
        store.write(&table).expect("write");
        assert_eq!(store.read().expect("read"), table);

        // A fresh connection sees the same data.
        let reopened = SqliteStore::open(&dir).expect("reopen");
        assert_eq!(reopened.read().expect("read"), table);
        assert!(created_at(&reopened, "Alice").is_some());
        assert_eq!(created_at(&reopened, "Nobody"), None);
    }

    #[test]
    fn write_replaces_the_whole_table() {
        let dir = temp_dir("gradebook-sqlite-replace");
        let c = Curriculum::builtin();
        let store = SqliteStore::open(&dir).expect("open");
        store.write(&sample(&c)).expect("write");

        let only_carl = create_student(&c, &GradeTable::new(), "Carl").expect("create");
        store.write(&only_carl).expect("write");
        let read = store.read().expect("read");
        assert_eq!(read.students().collect::<Vec<_>>(), vec!["Carl"]);
    }

    #[test]
    fn student_ids_survive_rewrites() {
        let dir = temp_dir("gradebook-sqlite-ids");
        let c = Curriculum::builtin();
        let store = SqliteStore::open(&dir).expect("open");
        let t = sample(&c);
        store.write(&t).expect("write");
        let before = created_at(&store, "Alice");

        let t = record_grade(&c, &t, "Alice", "ING05-ICY-SAE|SAE", &Cell::Number(9.0)).expect("grade");
        store.write(&t).expect("write");
        assert_eq!(created_at(&store, "Alice"), before);
    }

    #[test]
    fn files_hold_every_write_in_wal_mode() {
        let dir = temp_dir("gradebook-sqlite-wal");
        let c = Curriculum::builtin();
        let store = SqliteStore::open(&dir).expect("open");
        store
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
            .expect("wal mode");
        let table = sample(&c);
        store.write(&table).expect("write");

        let files = store.files();
        assert_eq!(files, vec![dir.join(DB_FILE_NAME)]);

        let copy = temp_dir("gradebook-sqlite-wal-copy");
        std::fs::copy(&files[0], copy.join(DB_FILE_NAME)).expect("copy");
        let restored = SqliteStore::open(&copy).expect("open copy");
        assert_eq!(restored.read().expect("read"), table);
    }

    #[test]
    fn stale_read_modify_write_is_last_writer_wins() {
        // Two sessions on the same workspace read the same snapshot, record
        // different cells, and write back. The later write drops the earlier
        // one's cell: the accepted lost-update behavior.
        let dir = temp_dir("gradebook-sqlite-race");
        let c = Curriculum::builtin();
        let first_session = SqliteStore::open(&dir).expect("open");
        let second_session = SqliteStore::open(&dir).expect("open");
        first_session
            .write(&create_student(&c, &GradeTable::new(), "Alice").expect("create"))
            .expect("seed");

        let snap_a = first_session.read().expect("read");
        let snap_b = second_session.read().expect("read");

        let a = record_grade(&c, &snap_a, "Alice", "ING05-ICY-Maths|Maths", &Cell::Number(12.0))
            .expect("a");
        let b = record_grade(&c, &snap_b, "Alice", "ING05-ICY-DevApp|DevApp", &Cell::Number(8.0))
            .expect("b");
        first_session.write(&a).expect("write a");
        second_session.write(&b).expect("write b");

        let stored = first_session.read().expect("read");
        assert_eq!(grade_at(&c, &stored, "Alice", "ING05-ICY-Maths|Maths"), Ok(None));
        assert_eq!(
            grade_at(&c, &stored, "Alice", "ING05-ICY-DevApp|DevApp"),
            Ok(Some(8.0))
        );
    }
}

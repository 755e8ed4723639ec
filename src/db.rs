use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::document::{Document, Section};
use crate::error::{Error, Result};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sources (
            id          INTEGER PRIMARY KEY,
            url         TEXT NOT NULL,
            title       TEXT NOT NULL,
            subsections TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_sources_title ON sources(title);
        ",
    )?;
    Ok(())
}

/// Store `doc` and record the identifier it was given.
pub fn insert_source(conn: &Connection, doc: &mut Document) -> Result<i64> {
    let subsections = serde_json::to_string(&doc.sections)?;
    conn.execute(
        "INSERT INTO sources (url, title, subsections) VALUES (?1, ?2, ?3)",
        params![doc.url, doc.title, subsections],
    )?;
    let id = conn.last_insert_rowid();
    doc.id = Some(id);
    Ok(id)
}

/// The oldest source with this title.
pub fn fetch_source(conn: &Connection, title: &str) -> Result<Option<Document>> {
    let raw = conn
        .query_row(
            "SELECT id, url, title, subsections FROM sources WHERE title = ?1 ORDER BY id LIMIT 1",
            params![title],
            read_row,
        )
        .optional()?;
    raw.map(RawSource::into_document).transpose()
}

pub fn fetch_sources(conn: &Connection) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare("SELECT id, url, title, subsections FROM sources ORDER BY id")?;
    let rows = stmt
        .query_map([], read_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(RawSource::into_document).collect()
}

pub fn fetch_titles(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT title FROM sources ORDER BY id")?;
    let titles = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(titles)
}

/// Remove the oldest source with this title. Returns whether anything was removed.
pub fn delete_source(conn: &Connection, title: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM sources WHERE id = (SELECT id FROM sources WHERE title = ?1 ORDER BY id LIMIT 1)",
        params![title],
    )?;
    Ok(removed > 0)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub sources: usize,
    pub sections: usize,
    pub paragraphs: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let mut stats = Stats::default();
    for doc in fetch_sources(conn)? {
        stats.sources += 1;
        stats.sections += doc.sections.len();
        stats.paragraphs += doc.paragraph_count();
    }
    Ok(stats)
}

struct RawSource {
    id: i64,
    url: String,
    title: String,
    subsections: String,
}

impl RawSource {
    fn into_document(self) -> Result<Document> {
        let sections: Vec<Section> = serde_json::from_str(&self.subsections)?;
        Ok(Document {
            id: Some(self.id),
            url: self.url,
            title: self.title,
            sections,
        })
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawSource> {
    Ok(RawSource {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        subsections: row.get(3)?,
    })
}

/// Connection shared between request handlers and ingestion tasks.
///
/// Calls block on the mutex and on SQLite; async callers go through `spawn_blocking`.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::StorePoisoned)
    }

    pub fn create(&self, doc: &mut Document) -> Result<i64> {
        insert_source(&*self.lock()?, doc)
    }

    pub fn source(&self, title: &str) -> Result<Document> {
        fetch_source(&*self.lock()?, title)?.ok_or_else(|| Error::NotFound(title.to_string()))
    }

    pub fn sources(&self) -> Result<Vec<Document>> {
        fetch_sources(&*self.lock()?)
    }

    pub fn titles(&self) -> Result<Vec<String>> {
        fetch_titles(&*self.lock()?)
    }

    pub fn delete(&self, title: &str) -> Result<()> {
        if delete_source(&*self.lock()?, title)? {
            Ok(())
        } else {
            Err(Error::NotFound(title.to_string()))
        }
    }

    pub fn stats(&self) -> Result<Stats> {
        get_stats(&*self.lock()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn essay(title: &str) -> Document {
        Document {
            id: None,
            url: format!("https://example.com/{title}"),
            title: title.to_string(),
            sections: vec![
                Section {
                    heading: "Intro".into(),
                    paragraphs: vec!["Hello world".into()],
                },
                Section::titled("Part Two"),
            ],
        }
    }

    #[test]
    fn insert_then_fetch() {
        let store = Store::in_memory().unwrap();
        let mut doc = essay("Essay");
        let id = store.create(&mut doc).unwrap();
        assert_eq!(doc.id, Some(id));

        let fetched = store.source("Essay").unwrap();
        assert_eq!(fetched, doc);
    }

    #[test]
    fn unknown_title_is_not_found() {
        let store = Store::in_memory().unwrap();
        assert!(matches!(store.source("Nope"), Err(Error::NotFound(t)) if t == "Nope"));
        assert!(matches!(store.delete("Nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn titles_and_sources_in_insertion_order() {
        let store = Store::in_memory().unwrap();
        for title in ["B", "A", "C"] {
            store.create(&mut essay(title)).unwrap();
        }
        assert_eq!(store.titles().unwrap(), vec!["B", "A", "C"]);
        let urls: Vec<_> = store.sources().unwrap().into_iter().map(|d| d.url).collect();
        assert_eq!(urls, vec!["https://example.com/B", "https://example.com/A", "https://example.com/C"]);
    }

    #[test]
    fn delete_removes_first_match_only() {
        let store = Store::in_memory().unwrap();
        let mut first = essay("Dup");
        let mut second = essay("Dup");
        store.create(&mut first).unwrap();
        store.create(&mut second).unwrap();

        store.delete("Dup").unwrap();
        assert_eq!(store.source("Dup").unwrap().id, second.id);
        store.delete("Dup").unwrap();
        assert!(store.titles().unwrap().is_empty());
    }

    #[test]
    fn stats_count_everything() {
        let store = Store::in_memory().unwrap();
        store.create(&mut essay("One")).unwrap();
        store.create(&mut essay("Two")).unwrap();
        assert_eq!(
            store.stats().unwrap(),
            Stats {
                sources: 2,
                sections: 4,
                paragraphs: 2
            }
        );
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/montaigne.sqlite");
        Store::open(&path).unwrap().create(&mut essay("Kept")).unwrap();
        assert_eq!(Store::open(&path).unwrap().titles().unwrap(), vec!["Kept"]);
    }
}

// 🗄️ Store - generic table mapping
//
// Each entity declares its table once (`Record`); the functions below do the
// SQL for every entity the same way.

use rusqlite::{params_from_iter, Connection, OptionalExtension, Row, ToSql};
use uuid::Uuid;

/// Foreign key to a parent aggregate
#[derive(Debug, Clone, Copy)]
pub struct Parent {
    /// Column on the child table
    pub column: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    /// Name used in not-found errors
    pub kind: &'static str,
}

/// Declarative mapping of an entity type to its table.
pub trait Record: Sized {
    const TABLE: &'static str;
    const KIND: &'static str;
    /// Primary key first; `to_params` binds in this order.
    const COLUMNS: &'static [&'static str];
    const ORDER_BY: &'static str;
    const PARENT: Option<Parent> = None;
    const OWNER_COLUMN: Option<&'static str> = None;

    fn id(&self) -> Uuid;

    fn parent_id(&self) -> Option<Uuid> {
        None
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn to_params(&self) -> Vec<Box<dyn ToSql>>;
}

/// Narrows a list to one owner and/or one parent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ListFilter {
    pub user_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
}

fn id_column<R: Record>() -> &'static str {
    R::COLUMNS[0]
}

fn select_sql<R: Record>() -> String {
    format!("SELECT {} FROM {}", R::COLUMNS.join(", "), R::TABLE)
}

pub fn insert<R: Record>(conn: &Connection, record: &R) -> rusqlite::Result<()> {
    let placeholders = (1..=R::COLUMNS.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::TABLE,
        R::COLUMNS.join(", "),
        placeholders
    );
    let values = record.to_params();
    conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(())
}

pub fn find<R: Record>(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<R>> {
    let sql = format!("{} WHERE {} = ?1", select_sql::<R>(), id_column::<R>());
    conn.query_row(&sql, [id], R::from_row).optional()
}

pub fn list<R: Record>(conn: &Connection) -> rusqlite::Result<Vec<R>> {
    list_by(conn, &ListFilter::default())
}

/// List filtered on the record's declared owner/parent columns.
///
/// A filter on a column the record does not declare is rejected rather than
/// ignored.
pub fn list_by<R: Record>(conn: &Connection, filter: &ListFilter) -> rusqlite::Result<Vec<R>> {
    let mut clauses = Vec::new();
    let mut values: Vec<Uuid> = Vec::new();

    if let Some(user_id) = filter.user_id {
        let column = R::OWNER_COLUMN
            .ok_or_else(|| rusqlite::Error::InvalidParameterName("user_id".to_string()))?;
        values.push(user_id);
        clauses.push(format!("{} = ?{}", column, values.len()));
    }
    if let Some(parent_id) = filter.parent_id {
        let parent = R::PARENT
            .ok_or_else(|| rusqlite::Error::InvalidParameterName("parent_id".to_string()))?;
        values.push(parent_id);
        clauses.push(format!("{} = ?{}", parent.column, values.len()));
    }

    let mut sql = select_sql::<R>();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(R::ORDER_BY);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), R::from_row)?;
    rows.collect()
}

/// Overwrite every column except the key. `false` if no row has that id.
pub fn update<R: Record>(conn: &Connection, record: &R) -> rusqlite::Result<bool> {
    let assignments = R::COLUMNS
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, column)| format!("{} = ?{}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?1",
        R::TABLE,
        assignments,
        id_column::<R>()
    );
    let values = record.to_params();
    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(changed > 0)
}

/// Children go with it through `ON DELETE CASCADE`.
pub fn delete<R: Record>(conn: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", R::TABLE, id_column::<R>());
    let changed = conn.execute(&sql, [id])?;
    Ok(changed > 0)
}

pub fn exists<R: Record>(conn: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    row_exists(conn, R::TABLE, id_column::<R>(), id)
}

pub fn parent_exists(conn: &Connection, parent: &Parent, id: Uuid) -> rusqlite::Result<bool> {
    row_exists(conn, parent.table, parent.id_column, id)
}

fn row_exists(conn: &Connection, table: &str, column: &str, id: Uuid) -> rusqlite::Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)", table, column);
    conn.query_row(&sql, [id], |row| row.get(0))
}

pub fn count<R: Record>(conn: &Connection) -> rusqlite::Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
    conn.query_row(&sql, [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal parent/child pair, independent of the app schemas
    #[derive(Debug, Clone, PartialEq)]
    struct Shelf {
        id: Uuid,
        owner: Uuid,
        label: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Jar {
        id: Uuid,
        shelf_id: Uuid,
        contents: String,
    }

    impl Record for Shelf {
        const TABLE: &'static str = "shelves";
        const KIND: &'static str = "shelf";
        const COLUMNS: &'static [&'static str] = &["shelf_id", "owner", "label"];
        const ORDER_BY: &'static str = "label";
        const OWNER_COLUMN: Option<&'static str> = Some("owner");

        fn id(&self) -> Uuid {
            self.id
        }

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Shelf {
                id: row.get(0)?,
                owner: row.get(1)?,
                label: row.get(2)?,
            })
        }

        fn to_params(&self) -> Vec<Box<dyn ToSql>> {
            vec![Box::new(self.id), Box::new(self.owner), Box::new(self.label.clone())]
        }
    }

    impl Record for Jar {
        const TABLE: &'static str = "jars";
        const KIND: &'static str = "jar";
        const COLUMNS: &'static [&'static str] = &["jar_id", "shelf_id", "contents"];
        const ORDER_BY: &'static str = "contents";
        const PARENT: Option<Parent> = Some(Parent {
            column: "shelf_id",
            table: "shelves",
            id_column: "shelf_id",
            kind: "shelf",
        });

        fn id(&self) -> Uuid {
            self.id
        }

        fn parent_id(&self) -> Option<Uuid> {
            Some(self.shelf_id)
        }

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Jar {
                id: row.get(0)?,
                shelf_id: row.get(1)?,
                contents: row.get(2)?,
            })
        }

        fn to_params(&self) -> Vec<Box<dyn ToSql>> {
            vec![Box::new(self.id), Box::new(self.shelf_id), Box::new(self.contents.clone())]
        }
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE shelves (shelf_id BLOB PRIMARY KEY, owner BLOB NOT NULL, label TEXT NOT NULL);
             CREATE TABLE jars (
                jar_id BLOB PRIMARY KEY,
                shelf_id BLOB NOT NULL REFERENCES shelves(shelf_id) ON DELETE CASCADE,
                contents TEXT NOT NULL
             );",
        )
        .unwrap();
        conn
    }

    fn shelf(owner: Uuid, label: &str) -> Shelf {
        Shelf {
            id: Uuid::new_v4(),
            owner,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_insert_find_round_trip() {
        let conn = setup();
        let s = shelf(Uuid::new_v4(), "pantry");
        insert(&conn, &s).unwrap();

        assert_eq!(find::<Shelf>(&conn, s.id).unwrap(), Some(s.clone()));
        assert_eq!(find::<Shelf>(&conn, Uuid::new_v4()).unwrap(), None);
        assert!(exists::<Shelf>(&conn, s.id).unwrap());
        assert_eq!(count::<Shelf>(&conn).unwrap(), 1);
    }

    #[test]
    fn test_update_and_delete_report_missing_rows() {
        let conn = setup();
        let mut s = shelf(Uuid::new_v4(), "pantry");
        assert!(!update(&conn, &s).unwrap());
        insert(&conn, &s).unwrap();

        s.label = "cellar".to_string();
        assert!(update(&conn, &s).unwrap());
        assert_eq!(find::<Shelf>(&conn, s.id).unwrap().unwrap().label, "cellar");

        assert!(delete::<Shelf>(&conn, s.id).unwrap());
        assert!(!delete::<Shelf>(&conn, s.id).unwrap());
        assert_eq!(find::<Shelf>(&conn, s.id).unwrap(), None);
    }

    #[test]
    fn test_list_orders_and_filters() {
        let conn = setup();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        insert(&conn, &shelf(alice, "b")).unwrap();
        insert(&conn, &shelf(alice, "a")).unwrap();
        insert(&conn, &shelf(bob, "c")).unwrap();

        let labels: Vec<String> = list::<Shelf>(&conn).unwrap().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);

        let filter = ListFilter {
            user_id: Some(alice),
            parent_id: None,
        };
        assert_eq!(list_by::<Shelf>(&conn, &filter).unwrap().len(), 2);

        // Shelves have no parent column
        let bad = ListFilter {
            user_id: None,
            parent_id: Some(alice),
        };
        assert!(list_by::<Shelf>(&conn, &bad).is_err());
    }

    #[test]
    fn test_parent_delete_cascades() {
        let conn = setup();
        let s = shelf(Uuid::new_v4(), "pantry");
        insert(&conn, &s).unwrap();
        for contents in ["jam", "honey"] {
            insert(
                &conn,
                &Jar {
                    id: Uuid::new_v4(),
                    shelf_id: s.id,
                    contents: contents.to_string(),
                },
            )
            .unwrap();
        }

        let parent = Jar::PARENT.unwrap();
        assert!(parent_exists(&conn, &parent, s.id).unwrap());

        let by_parent = ListFilter {
            user_id: None,
            parent_id: Some(s.id),
        };
        assert_eq!(list_by::<Jar>(&conn, &by_parent).unwrap().len(), 2);

        delete::<Shelf>(&conn, s.id).unwrap();
        assert_eq!(count::<Jar>(&conn).unwrap(), 0);
        assert!(!parent_exists(&conn, &parent, s.id).unwrap());
    }
}

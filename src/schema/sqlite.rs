//! [`SchemaEngine`] backed by a rusqlite connection.

use rusqlite::Connection;
use tracing::debug;

use crate::schema::dialect::{Dialect, SqliteDialect};
use crate::schema::engine::{
    ColumnInfo, EngineError, EngineErrorKind, IndexInfo, SchemaChange, SchemaEngine,
};
use crate::schema::field::GeneratedColumnBinding;

/// Schema engine over a borrowed SQLite connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteEngine<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteEngine<'c> {
    #[must_use]
    pub const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &'c Connection {
        self.conn
    }
}

impl SchemaEngine for SqliteEngine<'_> {
    fn table_exists(&self, table: &str) -> Result<bool, EngineError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                [table],
                |row| row.get(0),
            )
            .map_err(|err| engine_error(&err, None))?;
        Ok(count > 0)
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, EngineError> {
        ensure_table(self, table)?;
        let create_sql: Option<String> = self
            .conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                [table],
                |row| row.get(0),
            )
            .map_err(|err| engine_error(&err, None))?;
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, hidden FROM pragma_table_xinfo(?1) ORDER BY cid")
            .map_err(|err| engine_error(&err, None))?;
        let rows = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let hidden: i64 = row.get(2)?;
                // 2 = virtual generated, 3 = stored generated
                let generated = matches!(hidden, 2 | 3);
                let expression = if generated {
                    create_sql
                        .as_deref()
                        .and_then(|sql| generation_expression(sql, &name))
                } else {
                    None
                };
                Ok(ColumnInfo {
                    name,
                    declared_type: row.get(1)?,
                    generated,
                    expression,
                })
            })
            .map_err(|err| engine_error(&err, None))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|err| engine_error(&err, None))
    }

    fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>, EngineError> {
        ensure_table(self, table)?;
        let mut stmt = self
            .conn
            .prepare(
                "SELECT il.name, il.\"unique\", ii.name \
                 FROM pragma_index_list(?1) AS il \
                 LEFT JOIN pragma_index_info(il.name) AS ii \
                 ORDER BY il.name, ii.seqno",
            )
            .map_err(|err| engine_error(&err, None))?;
        let rows = stmt
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(|err| engine_error(&err, None))?;

        let mut indexes: Vec<IndexInfo> = Vec::new();
        for row in rows {
            let (name, unique, column) = row.map_err(|err| engine_error(&err, None))?;
            match indexes.last_mut() {
                Some(last) if last.name == name => last.columns.extend(column),
                _ => indexes.push(IndexInfo {
                    name,
                    columns: column.into_iter().collect(),
                    unique: unique != 0,
                }),
            }
        }
        Ok(indexes)
    }

    fn apply(&self, change: &SchemaChange) -> Result<(), EngineError> {
        let sql = SqliteDialect.render(change);
        debug!(statement = %sql, "applying schema change");
        self.conn
            .execute(&sql, [])
            .map(|_| ())
            .map_err(|err| engine_error(&err, Some(sql)))
    }

    fn source_expression(&self, binding: &GeneratedColumnBinding) -> String {
        SqliteDialect.source_expression(binding)
    }
}

/// The text inside `AS (...)` of `column`'s definition in a `CREATE TABLE`
/// statement. SQLite keeps added column definitions verbatim, so this is the
/// expression as it was written. Only quoted column names are located.
fn generation_expression(create_sql: &str, column: &str) -> Option<String> {
    let lower = create_sql.to_ascii_lowercase();
    let quoted = SqliteDialect.quote_ident(column).to_ascii_lowercase();
    let definition = lower.find(&quoted)? + quoted.len();

    let after_name = &lower[definition..];
    let keyword = after_name
        .match_indices("as")
        .find(|(at, _)| {
            let before = after_name[..*at].chars().next_back();
            let after = after_name[at + 2..].chars().next();
            before.is_some_and(char::is_whitespace)
                && after.is_some_and(|c| c.is_whitespace() || c == '(')
        })
        .map(|(at, _)| at)?;
    let open = definition + keyword + 2 + after_name[keyword + 2..].find('(')?;

    let mut depth = 0_usize;
    let mut in_string = false;
    for (offset, c) in create_sql[open..].char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(create_sql[open + 1..open + offset].trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn ensure_table(engine: &SqliteEngine<'_>, table: &str) -> Result<(), EngineError> {
    if engine.table_exists(table)? {
        Ok(())
    } else {
        Err(EngineError::new(
            EngineErrorKind::TableNotFound,
            format!("no such table: {table}"),
            None,
        ))
    }
}

fn engine_error(err: &rusqlite::Error, statement: Option<String>) -> EngineError {
    let message = err.to_string();
    EngineError::new(classify(&message), message, statement)
}

/// Map SQLite's error text onto the synchronizer's taxonomy.
#[must_use]
pub fn classify(message: &str) -> EngineErrorKind {
    let lower = message.to_ascii_lowercase();
    // "error in index X after drop column: no such column: Y" must be checked
    // before the plain missing-column case.
    if lower.contains("after drop column") {
        EngineErrorKind::DependentObjectExists
    } else if lower.contains("duplicate column name") || lower.contains("already exists") {
        EngineErrorKind::DuplicateObject
    } else if lower.contains("no such table") {
        EngineErrorKind::TableNotFound
    } else if lower.contains("no such index") || lower.contains("no such column") {
        EngineErrorKind::MissingObject
    } else {
        EngineErrorKind::Other
    }
}

// ==========================================
// 通用数据导入引擎 - 持久化协作方 SQLite 实现
// ==========================================
// 职责: 用 rusqlite 实现参数化 CRUD 与结构探查
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::persistence_store::{PersistenceStore, SqlValue};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// SqliteStore
// ==========================================
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// 打开数据库文件并应用统一 PRAGMA
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// 复用既有连接（测试用内存库等）
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 标识符加引号；含双引号的标识符直接拒绝
    fn quote_ident(ident: &str) -> RepositoryResult<String> {
        if ident.is_empty() || ident.contains('"') || ident.contains('\0') {
            return Err(RepositoryError::InvalidIdentifier(ident.to_string()));
        }
        Ok(format!("\"{}\"", ident))
    }

    fn to_param(value: &SqlValue) -> Value {
        match value {
            SqlValue::Null => Value::Null,
            SqlValue::Text(s) => Value::Text(s.clone()),
            SqlValue::Int(i) => Value::Integer(*i),
        }
    }
}

impl PersistenceStore for SqliteStore {
    fn table_has_column(&self, table: &str, column: &str) -> RepositoryResult<bool> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2 LIMIT 1")?;
        let found = stmt.exists(rusqlite::params![table, column])?;
        Ok(found)
    }

    fn select_ids(
        &self,
        table: &str,
        filters: &[(String, SqlValue)],
    ) -> RepositoryResult<Vec<i64>> {
        let conn = self.lock()?;

        let mut sql = format!("SELECT rowid FROM {}", Self::quote_ident(table)?);
        let mut params: Vec<Value> = Vec::new();
        let mut where_parts: Vec<String> = Vec::new();
        for (column, value) in filters {
            let col = Self::quote_ident(column)?;
            match value {
                // NULL 过滤条件无法用 = 绑定
                SqlValue::Null => where_parts.push(format!("{} IS NULL", col)),
                other => {
                    params.push(Self::to_param(other));
                    where_parts.push(format!("{} = ?{}", col, params.len()));
                }
            }
        }
        if !where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }

        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(params), |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn insert(
        &self,
        table: &str,
        columns: &[String],
        values: &[SqlValue],
    ) -> RepositoryResult<i64> {
        let conn = self.lock()?;

        let cols = columns
            .iter()
            .map(|c| Self::quote_ident(c))
            .collect::<RepositoryResult<Vec<_>>>()?;
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            Self::quote_ident(table)?,
            cols.join(", "),
            placeholders.join(", ")
        );

        let params: Vec<Value> = values.iter().map(Self::to_param).collect();
        conn.execute(&sql, params_from_iter(params))?;
        Ok(conn.last_insert_rowid())
    }

    fn update(
        &self,
        table: &str,
        key_column: &str,
        key: i64,
        columns: &[String],
        values: &[SqlValue],
    ) -> RepositoryResult<usize> {
        let conn = self.lock()?;

        let mut params: Vec<Value> = values.iter().map(Self::to_param).collect();
        let sets = columns
            .iter()
            .enumerate()
            .map(|(i, c)| Ok(format!("{} = ?{}", Self::quote_ident(c)?, i + 1)))
            .collect::<RepositoryResult<Vec<_>>>()?;
        params.push(Value::Integer(key));
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            Self::quote_ident(table)?,
            sets.join(", "),
            Self::quote_ident(key_column)?,
            params.len()
        );

        let affected = conn.execute(&sql, params_from_iter(params))?;
        Ok(affected)
    }

    fn column_values(&self, table: &str, column: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.lock()?;
        let col = Self::quote_ident(column)?;
        let sql = format!(
            "SELECT DISTINCT CAST({} AS TEXT) FROM {} WHERE {} IS NOT NULL",
            col,
            Self::quote_ident(table)?,
            col
        );
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE societe (
                rowid INTEGER PRIMARY KEY AUTOINCREMENT,
                nom TEXT,
                code_client TEXT,
                entity INTEGER,
                import_key TEXT
            );",
        )
        .unwrap();
        SqliteStore::from_connection(conn)
    }

    #[test]
    fn test_insert_returns_generated_id() {
        let store = memory_store();
        let id = store
            .insert(
                "societe",
                &["nom".to_string(), "import_key".to_string()],
                &[
                    SqlValue::Text("Acme".to_string()),
                    SqlValue::Text("20250101".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(id, 1);

        let id2 = store
            .insert(
                "societe",
                &["nom".to_string()],
                &[SqlValue::Text("Beta".to_string())],
            )
            .unwrap();
        assert_eq!(id2, 2);
    }

    #[test]
    fn test_select_ids_with_filters() {
        let store = memory_store();
        store
            .insert(
                "societe",
                &["nom".to_string()],
                &[SqlValue::Text("Acme".to_string())],
            )
            .unwrap();
        store
            .insert(
                "societe",
                &["nom".to_string()],
                &[SqlValue::Text("Acme".to_string())],
            )
            .unwrap();

        let ids = store
            .select_ids(
                "societe",
                &[("nom".to_string(), SqlValue::Text("Acme".to_string()))],
            )
            .unwrap();
        assert_eq!(ids.len(), 2);

        let none = store
            .select_ids(
                "societe",
                &[("nom".to_string(), SqlValue::Text("不存在".to_string()))],
            )
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_update_affected_rows() {
        let store = memory_store();
        let id = store
            .insert(
                "societe",
                &["nom".to_string()],
                &[SqlValue::Text("Acme".to_string())],
            )
            .unwrap();
        let affected = store
            .update(
                "societe",
                "rowid",
                id,
                &["nom".to_string()],
                &[SqlValue::Text("Acme SA".to_string())],
            )
            .unwrap();
        assert_eq!(affected, 1);
    }

    #[test]
    fn test_table_has_column() {
        let store = memory_store();
        assert!(store.table_has_column("societe", "entity").unwrap());
        assert!(!store.table_has_column("societe", "no_such").unwrap());
    }

    #[test]
    fn test_rejects_quoted_identifier() {
        let store = memory_store();
        let result = store.column_values("societe\" --", "nom");
        assert!(matches!(
            result,
            Err(RepositoryError::InvalidIdentifier(_))
        ));
    }
}

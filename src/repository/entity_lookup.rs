// ==========================================
// 通用数据导入引擎 - 实体查询/编号协作方
// ==========================================
// 职责: 按代码/引用/标签解析实体 id；自动编号与序列引用生成
// 红线: 编号生成为纯函数式接口（返回值），不走共享对象的内部状态
// ==========================================

use crate::domain::profile::{CodeKind, LookupTarget};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 实体查询/编号协作方接口（转换规则的外部依赖）
pub trait EntityLookup {
    /// 依序尝试 target 的各代码/引用列，返回首个命中的 id
    fn fetch_id_by_code_or_ref(
        &self,
        target: &LookupTarget,
        value: &str,
    ) -> RepositoryResult<Option<i64>>;

    /// 按标签列查询 id（仅“代码或标签”规则的二次尝试使用）
    fn fetch_id_by_label(
        &self,
        target: &LookupTarget,
        label: &str,
    ) -> RepositoryResult<Option<i64>>;

    /// 为指定类别生成下一个编号；未配置编号序列时返回空串
    fn generate_code(&self, kind: CodeKind) -> RepositoryResult<String>;

    /// 经指定编号器生成下一个序列引用；编号器未配置时返回空串
    fn next_ref(&self, numbering: &str) -> RepositoryResult<String>;
}

/// 一条编号序列：prefix + 宽度固定的递增计数
#[derive(Debug, Clone)]
pub struct CodeSeries {
    pub table: String,
    pub column: String,
    pub prefix: String,
    pub width: usize,
}

// ==========================================
// SqliteEntityLookup
// ==========================================
pub struct SqliteEntityLookup {
    conn: Arc<Mutex<Connection>>,
    code_series: HashMap<CodeKindKey, CodeSeries>,
    ref_series: HashMap<String, CodeSeries>,
}

// CodeKind 作 HashMap 键的内部包装
type CodeKindKey = u8;

fn kind_key(kind: CodeKind) -> CodeKindKey {
    match kind {
        CodeKind::Customer => 0,
        CodeKind::Supplier => 1,
        CodeKind::CustomerAccountancy => 2,
        CodeKind::SupplierAccountancy => 3,
    }
}

impl SqliteEntityLookup {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            code_series: HashMap::new(),
            ref_series: HashMap::new(),
        }
    }

    /// 注册一个类别的编号序列
    pub fn with_code_series(mut self, kind: CodeKind, series: CodeSeries) -> Self {
        self.code_series.insert(kind_key(kind), series);
        self
    }

    /// 注册一个命名编号器
    pub fn with_ref_series(mut self, numbering: &str, series: CodeSeries) -> Self {
        self.ref_series.insert(numbering.to_string(), series);
        self
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn fetch_id_by_column(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> RepositoryResult<Option<i64>> {
        if table.contains('"') || column.contains('"') {
            return Err(RepositoryError::InvalidIdentifier(format!(
                "{}.{}",
                table, column
            )));
        }
        let conn = self.lock()?;
        let sql = format!(
            "SELECT rowid FROM \"{}\" WHERE \"{}\" = ?1 LIMIT 1",
            table, column
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params![value])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// 取序列的下一个值：扫描既有编号的最大数字后缀 + 1
    fn next_in_series(&self, series: &CodeSeries) -> RepositoryResult<String> {
        if series.table.contains('"') || series.column.contains('"') {
            return Err(RepositoryError::InvalidIdentifier(format!(
                "{}.{}",
                series.table, series.column
            )));
        }
        let conn = self.lock()?;
        let sql = format!(
            "SELECT \"{}\" FROM \"{}\" WHERE \"{}\" LIKE ?1",
            series.column, series.table, series.column
        );
        let mut stmt = conn.prepare(&sql)?;
        let pattern = format!("{}%", series.prefix);
        let existing = stmt
            .query_map(rusqlite::params![pattern], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        let max = existing
            .iter()
            .filter_map(|code| code[series.prefix.len()..].parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!(
            "{}{:0width$}",
            series.prefix,
            max + 1,
            width = series.width
        ))
    }
}

impl EntityLookup for SqliteEntityLookup {
    fn fetch_id_by_code_or_ref(
        &self,
        target: &LookupTarget,
        value: &str,
    ) -> RepositoryResult<Option<i64>> {
        for column in &target.key_columns {
            if let Some(id) = self.fetch_id_by_column(&target.table, column, value)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn fetch_id_by_label(
        &self,
        target: &LookupTarget,
        label: &str,
    ) -> RepositoryResult<Option<i64>> {
        match &target.label_column {
            Some(column) => self.fetch_id_by_column(&target.table, column, label),
            None => Ok(None),
        }
    }

    fn generate_code(&self, kind: CodeKind) -> RepositoryResult<String> {
        match self.code_series.get(&kind_key(kind)) {
            Some(series) => self.next_in_series(series),
            None => Ok(String::new()),
        }
    }

    fn next_ref(&self, numbering: &str) -> RepositoryResult<String> {
        match self.ref_series.get(numbering) {
            Some(series) => self.next_in_series(series),
            None => Ok(String::new()),
        }
    }
}

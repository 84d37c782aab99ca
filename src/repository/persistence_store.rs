// ==========================================
// 通用数据导入引擎 - 持久化协作方接口
// ==========================================
// 职责: 定义写入器依赖的参数化 SELECT / INSERT / UPDATE / 结构探查接口
// 红线: 只走参数绑定，禁止把用户数据拼进 SQL 字符串
// ==========================================

use crate::repository::error::RepositoryResult;
use serde::{Deserialize, Serialize};

/// 落库绑定值（三态单元格在存储口径下的最终形式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// SQL NULL（源单元格缺失）
    Null,
    /// 文本（含空字符串：源单元格存在但为空）
    Text(String),
    /// 整数（id / entity / 操作者等隐藏列）
    Int(i64),
}

impl SqlValue {
    /// 更新键比对和错误提示用的展示形式
    pub fn display(&self) -> String {
        match self {
            SqlValue::Null => "null".to_string(),
            SqlValue::Text(s) => format!("'{}'", s),
            SqlValue::Int(i) => i.to_string(),
        }
    }
}

/// 持久化协作方：全部同步阻塞，逐行顺序调用
pub trait PersistenceStore {
    /// 结构探查：表 table 是否有列 column
    fn table_has_column(&self, table: &str, column: &str) -> RepositoryResult<bool>;

    /// 参数化 SELECT：按过滤条件返回匹配行的 rowid 列表
    fn select_ids(&self, table: &str, filters: &[(String, SqlValue)]) -> RepositoryResult<Vec<i64>>;

    /// 参数化 INSERT：返回自增生成的 id
    fn insert(&self, table: &str, columns: &[String], values: &[SqlValue]) -> RepositoryResult<i64>;

    /// 参数化 UPDATE（按 key_column = key 定位）：返回受影响行数
    fn update(
        &self,
        table: &str,
        key_column: &str,
        key: i64,
        columns: &[String],
        values: &[SqlValue],
    ) -> RepositoryResult<usize>;

    /// 取 table 表 column 列的全部非空值（存在性缓存装载用）
    fn column_values(&self, table: &str, column: &str) -> RepositoryResult<Vec<String>>;
}

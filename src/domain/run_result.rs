// ==========================================
// 通用数据导入引擎 - 导入结果模型
// ==========================================
// 职责: 一次导入的计数器 + 有序错误/警告清单
// 红线: 结果贯穿整次导入累积，中途不清零
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 行级问题分类（与存储层写入口径对应）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// 空行
    Empty,
    /// 必填字段缺失
    NotNull,
    /// 外键/字典值不存在
    ForeignKey,
    /// 正则不匹配
    Regex,
    /// 存储层错误（消息原样保留）
    Sql,
}

/// 一条行级发现（错误或警告）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowIssue {
    /// 行号（1 基，按文件顺序）
    pub row: usize,
    pub message: String,
    pub kind: IssueKind,
}

/// 一次导入的唯一对外产物：计数 + 有序发现清单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub inserted_rows: usize,
    pub updated_rows: usize,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for RunResult {
    fn default() -> Self {
        Self::new()
    }
}

impl RunResult {
    pub fn new() -> Self {
        Self {
            inserted_rows: 0,
            updated_rows: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn push_error(&mut self, row: usize, kind: IssueKind, message: impl Into<String>) {
        self.errors.push(RowIssue {
            row,
            message: message.into(),
            kind,
        });
    }

    pub fn push_warning(&mut self, row: usize, kind: IssueKind, message: impl Into<String>) {
        self.warnings.push(RowIssue {
            row,
            message: message.into(),
            kind,
        });
    }
}

// ==========================================
// 通用数据导入引擎 - 导入模块错误类型
// ==========================================
// 依据: Rust 错误处理最佳实践
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
///
/// 仅「文件打开失败」与「模板配置错误」会中断整次导入；
/// 行级问题（必填缺失/外键未命中/正则不匹配/存储失败）以
/// `RowIssue` 数据形式累积到 `RunResult`，从不走 Err 通道。
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件打开失败: {0}")]
    FileOpen(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileRead(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParse(String),

    #[error("CSV 解析失败: {0}")]
    CsvParse(String),

    // ===== 配置错误（模板/规则，属部署问题而非数据问题） =====
    #[error("模板配置错误: {0}")]
    Configuration(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileRead(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParse(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParse(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Internal(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

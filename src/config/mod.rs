// ==========================================
// 通用数据导入引擎 - 运行配置
// ==========================================
// 职责: 一次导入的运行上下文与读取器/流程选项
// ==========================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 一次导入的运行上下文（由编排层提供）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// 导入批次标签：每条 INSERT 都打上，便于事后按批识别/回退
    pub import_key: String,
    /// 多租户范围 id（目标表有 entity 列时写入）
    pub entity: i64,
    /// 当前操作者 id（隐藏字段与创建者列写入）
    pub actor_id: i64,
}

impl RunContext {
    /// 编排层未指定批次标签时默认取 UUID
    pub fn new(entity: i64, actor_id: i64) -> Self {
        Self {
            import_key: Uuid::new_v4().to_string(),
            entity,
            actor_id,
        }
    }

    pub fn with_import_key(mut self, import_key: impl Into<String>) -> Self {
        self.import_key = import_key.into();
        self
    }
}

/// 读取器选项（分隔符/包裹符/转义符与强制字符集）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderOptions {
    /// 字段分隔符；默认逗号，可被系统级配置覆盖
    pub separator: u8,
    /// 包裹符
    pub enclosure: u8,
    /// 转义符（与包裹符相同时按双写包裹符处理）
    pub escape: u8,
    /// 强制字符集标签（空则逐格自动识别）
    pub forced_charset: Option<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            enclosure: b'"',
            escape: b'"',
            forced_charset: None,
        }
    }
}

impl ReaderOptions {
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_forced_charset(mut self, charset: impl Into<String>) -> Self {
        self.forced_charset = Some(charset.into());
        self
    }
}

/// 导入流程选项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    /// 跳过文件开头的行数（标题行等）
    pub offset_lines: usize,
}

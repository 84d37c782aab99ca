// ==========================================
// 通用数据导入引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 模板驱动的批量数据导入（读取/转换/校验/多表写入）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录/模板/结果模型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 读取/转换/校验/写入流水线
pub mod importer;

// 配置层 - 运行上下文与选项
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域模型
pub use domain::profile::{
    CodeKind, ColumnMapping, ConversionRule, FieldRef, FieldSpec, HiddenField, HiddenValue,
    ImportProfile, LookupTarget, RuleDescriptor, TableTarget, ValidationRule,
};
pub use domain::record::{Cell, CellKind, Record};
pub use domain::run_result::{IssueKind, RowIssue, RunResult};

// 导入流水线
pub use importer::{
    reader_for_path, ImportError, ImportResult, ImportRunner, RelationalWriter, TabularReader,
};

// 仓储
pub use repository::{
    CodeSeries, EntityLookup, PersistenceStore, RepositoryError, SqlValue, SqliteEntityLookup,
    SqliteStore,
};

// 配置
pub use config::{ImportOptions, ReaderOptions, RunContext};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "通用数据导入引擎";

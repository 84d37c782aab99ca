// ==========================================
// 通用数据导入引擎 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod entity_lookup;
pub mod error;
pub mod persistence_store;
pub mod sqlite_store;

pub use entity_lookup::{CodeSeries, EntityLookup, SqliteEntityLookup};
pub use error::{RepositoryError, RepositoryResult};
pub use persistence_store::{PersistenceStore, SqlValue};
pub use sqlite_store::SqliteStore;

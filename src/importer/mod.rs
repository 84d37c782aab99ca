// ==========================================
// 通用数据导入引擎 - 导入流水线
// ==========================================
// 职责: 文件读取 → 值转换 → 行校验 → 关系写入 → 结果汇总
// 约束: 全程单线程同步执行,按文件顺序逐行处理
// ==========================================

pub mod charset;
pub mod csv_reader;
pub mod error;
pub mod field_converter;
pub mod import_runner;
pub mod reader_trait;
pub mod relational_writer;
pub mod row_validator;
pub mod xlsx_reader;

pub use csv_reader::DelimitedReader;
pub use error::{ImportError, ImportResult};
pub use field_converter::{convert_value, Converted, ConversionCache};
pub use import_runner::ImportRunner;
pub use reader_trait::{reader_for_path, TabularReader};
pub use relational_writer::RelationalWriter;
pub use row_validator::{ExistenceCache, FormatCheck, RowValidator};
pub use xlsx_reader::WorkbookReader;

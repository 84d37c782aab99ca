// ==========================================
// 通用数据导入引擎 - 领域层
// ==========================================
// 职责: 输入记录 / 导入模板 / 导入结果 的纯数据模型
// ==========================================

pub mod profile;
pub mod record;
pub mod run_result;

pub use profile::{
    CodeKind, ColumnMapping, ConversionRule, FieldRef, FieldSpec, HiddenField, HiddenValue,
    ImportProfile, LookupTarget, RuleDescriptor, TableTarget, ValidationRule,
};
pub use record::{Cell, CellKind, Record};
pub use run_result::{IssueKind, RowIssue, RunResult};

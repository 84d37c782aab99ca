// ==========================================
// 通用数据导入引擎 - 行校验器
// ==========================================
// 职责: 必填检查 + 格式检查（正则 / field@table 存在性）
// 红线: 校验从不抛错中断批次；发现以结构化结果交给写入器归档
// ==========================================

use crate::domain::profile::{FieldSpec, ValidationRule};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::persistence_store::PersistenceStore;
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};

// ==========================================
// ExistenceCache
// ==========================================
/// 存在性缓存: (field, table) → 该列全部去重值
///
/// 每次运行每个 (field, table) 只装载一次，之后 O(1) 查存在性。
/// 生命周期限一次导入。
#[derive(Debug, Default)]
pub struct ExistenceCache {
    map: HashMap<(String, String), HashSet<String>>,
}

impl ExistenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查 value 是否存在于 table.field；首次访问时整列装载
    pub fn contains(
        &mut self,
        store: &dyn PersistenceStore,
        field: &str,
        table: &str,
        value: &str,
    ) -> Result<bool, crate::repository::error::RepositoryError> {
        let key = (field.to_string(), table.to_string());
        if !self.map.contains_key(&key) {
            let values = store.column_values(table, field)?;
            self.map.insert(key.clone(), values.into_iter().collect());
        }
        Ok(self.map[&key].contains(value))
    }
}

/// 格式检查结论（写入器据此归档行级发现）
#[derive(Debug, Clone, PartialEq)]
pub enum FormatCheck {
    Ok,
    /// 值不在 table.field 中
    ForeignKeyMiss { field: String, table: String },
    /// 正则不匹配
    PatternMismatch { pattern: String },
    /// 存储层故障（消息原样保留）
    StoreError(String),
}

// ==========================================
// RowValidator
// ==========================================
pub struct RowValidator {
    existence: ExistenceCache,
    compiled: HashMap<String, Regex>,
}

impl Default for RowValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RowValidator {
    pub fn new() -> Self {
        Self {
            existence: ExistenceCache::new(),
            compiled: HashMap::new(),
        }
    }

    /// 必填检查：字段标记必填且（转换后）值为空
    pub fn is_missing_mandatory(&self, spec: &FieldSpec, value: &str) -> bool {
        spec.mandatory && value.is_empty()
    }

    /// 格式检查；仅对非空值调用
    ///
    /// Err 只在正则本身非法时出现（模板配置错误，中断整次导入）。
    pub fn check_format(
        &mut self,
        rule: &ValidationRule,
        value: &str,
        store: &dyn PersistenceStore,
    ) -> ImportResult<FormatCheck> {
        match rule {
            ValidationRule::MustExistIn { field, table } => {
                match self.existence.contains(store, field, table, value) {
                    Ok(true) => Ok(FormatCheck::Ok),
                    Ok(false) => Ok(FormatCheck::ForeignKeyMiss {
                        field: field.clone(),
                        table: table.clone(),
                    }),
                    Err(e) => Ok(FormatCheck::StoreError(e.to_string())),
                }
            }
            ValidationRule::Pattern(pattern) => {
                if !self.compiled.contains_key(pattern) {
                    let regex = RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| {
                            ImportError::Configuration(format!("非法校验正则 {}: {}", pattern, e))
                        })?;
                    self.compiled.insert(pattern.clone(), regex);
                }
                if self.compiled[pattern].is_match(value) {
                    Ok(FormatCheck::Ok)
                } else {
                    Ok(FormatCheck::PatternMismatch {
                        pattern: pattern.clone(),
                    })
                }
            }
        }
    }
}

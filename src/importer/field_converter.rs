// ==========================================
// 通用数据导入引擎 - 字段值转换器
// ==========================================
// 职责: 按封闭规则枚举把单格原值转换为落库值（纯函数，逐次调用）
// 依赖: 转换缓存（运行级）+ 实体查询/编号协作方
// ==========================================

use crate::domain::profile::ConversionRule;
use crate::repository::entity_lookup::EntityLookup;
use crate::repository::error::RepositoryResult;
use std::collections::HashMap;

// ==========================================
// ConversionCache
// ==========================================
/// 运行级转换缓存: (查询目标, 原值) → 已解析 id
///
/// 仅缓存命中（未命中会重试），只是性能优化，正确性不依赖它。
/// 生命周期限一次导入，跨运行必须各自持有实例。
#[derive(Debug, Default)]
pub struct ConversionCache {
    map: HashMap<(String, String), i64>,
}

impl ConversionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, target_key: &str, raw: &str) -> Option<i64> {
        self.map.get(&(target_key.to_string(), raw.to_string())).copied()
    }

    pub fn put(&mut self, target_key: &str, raw: &str, id: i64) {
        self.map.insert((target_key.to_string(), raw.to_string()), id);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// 单格转换结果
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    /// 转换后的落库值
    Value(String),
    /// 值为空且规则要求按 SQL NULL 落库（单元格降级为 Null）
    NullValue,
    /// 外键解析未命中：原值与被搜索的字典/实体名
    ForeignKeyMiss { value: String, searched: String },
}

/// 应用一条转换规则
///
/// Err 仅表示协作方（存储层）故障；业务上的未命中以
/// `Converted::ForeignKeyMiss` 返回，由写入器记为行级发现。
pub fn convert_value(
    rule: &ConversionRule,
    raw: &str,
    cache: &mut ConversionCache,
    lookup: &dyn EntityLookup,
) -> RepositoryResult<Converted> {
    match rule {
        ConversionRule::FetchIdFromCode(target) | ConversionRule::FetchIdFromRef(target) => {
            resolve_id(target, raw, false, cache, lookup)
        }
        ConversionRule::FetchIdFromCodeOrLabel(target) => {
            resolve_id(target, raw, true, cache, lookup)
        }
        ConversionRule::ZeroIfNull => {
            if raw.is_empty() {
                Ok(Converted::Value("0".to_string()))
            } else {
                Ok(Converted::Value(raw.to_string()))
            }
        }
        ConversionRule::CodeIfAuto(kind) => {
            let value = if raw.eq_ignore_ascii_case("auto") {
                lookup.generate_code(*kind)?
            } else {
                raw.to_string()
            };
            // 生成结果为空时按 SQL NULL 落库，而非空字符串
            if value.is_empty() {
                Ok(Converted::NullValue)
            } else {
                Ok(Converted::Value(value))
            }
        }
        ConversionRule::RefIfAuto { numbering } => {
            let mut value = lookup.next_ref(numbering)?;
            // 非正数的编号结果视为「无默认可用」
            if value.parse::<f64>().map(|n| n <= 0.0).unwrap_or(false) {
                value.clear();
            }
            Ok(Converted::Value(value))
        }
        ConversionRule::Numeric => Ok(Converted::Value(normalize_numeric(raw))),
    }
}

/// id/ref 解析：`id:` / `ref:` 前缀强制解释；无前缀时数字视为已解析 id
fn resolve_id(
    target: &crate::domain::profile::LookupTarget,
    raw: &str,
    try_label: bool,
    cache: &mut ConversionCache,
    lookup: &dyn EntityLookup,
) -> RepositoryResult<Converted> {
    let lower = raw.to_lowercase();
    let forced_id = lower.starts_with("id:");
    let is_ref = !raw.is_empty() && !forced_id && (lower.starts_with("ref:") || raw.parse::<f64>().is_err());

    // 去掉用于强制解释的 id:/ref: 前缀
    let value = if forced_id {
        &raw[3..]
    } else if lower.starts_with("ref:") {
        &raw[4..]
    } else {
        raw
    };

    if !is_ref {
        return Ok(Converted::Value(value.to_string()));
    }

    let key = target.cache_key();
    if let Some(id) = cache.get(&key, value) {
        return Ok(Converted::Value(id.to_string()));
    }

    let mut found = lookup.fetch_id_by_code_or_ref(target, value)?;
    if found.is_none() && try_label {
        found = lookup.fetch_id_by_label(target, value)?;
    }

    match found {
        Some(id) => {
            cache.put(&key, value, id);
            Ok(Converted::Value(id.to_string()))
        }
        None => Ok(Converted::ForeignKeyMiss {
            value: value.to_string(),
            searched: target.display_name().to_string(),
        }),
    }
}

/// 数值字符串本地化归一（千分位空格/混用逗号点 → 规范小数表示）
pub fn normalize_numeric(raw: &str) -> String {
    let mut s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let has_comma = s.contains(',');
    let has_dot = s.contains('.');

    if has_comma && has_dot {
        // 后出现者为小数点，另一方为千分位
        if s.rfind(',') > s.rfind('.') {
            s = s.replace('.', "").replace(',', ".");
        } else {
            s = s.replace(',', "");
        }
    } else if has_comma {
        if s.matches(',').count() == 1 {
            s = s.replace(',', ".");
        } else {
            s = s.replace(',', "");
        }
    }

    if s.parse::<f64>().is_ok() {
        s
    } else {
        raw.trim().to_string()
    }
}

// ==========================================
// 通用数据导入引擎 - 导入模板模型
// ==========================================
// 职责: 导入模板（目标表/字段/规则）的只读声明结构
// 红线: 规则为封闭枚举 + 静态分发，禁止按字符串运行时构造类
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ==========================================
// 字段引用与列映射
// ==========================================

/// 目标字段引用：`别名.字段名`（别名标识模板中的一张目标表）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub alias: String,
    pub field: String,
}

impl FieldRef {
    /// 解析 `alias.fieldname` 形式的引用
    pub fn parse(raw: &str) -> ImportResult<Self> {
        match raw.split_once('.') {
            Some((alias, field)) if !alias.is_empty() && !field.is_empty() => Ok(Self {
                alias: alias.to_string(),
                field: field.to_string(),
            }),
            _ => Err(ImportError::Configuration(format!(
                "字段引用格式错误（期望 alias.fieldname）: {}",
                raw
            ))),
        }
    }

    /// 模板字段表的键（`alias.fieldname`）
    pub fn key(&self) -> String {
        format!("{}.{}", self.alias, self.field)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.field)
    }
}

/// 源列号（1 基）→ 目标字段引用 的有序映射
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMapping {
    targets: BTreeMap<usize, FieldRef>,
}

impl ColumnMapping {
    /// 从 `(列号, "alias.field")` 对构建；列号 0 保留不用
    pub fn from_pairs<I>(pairs: I) -> ImportResult<Self>
    where
        I: IntoIterator<Item = (usize, String)>,
    {
        let mut targets = BTreeMap::new();
        for (column, raw) in pairs {
            if column == 0 {
                return Err(ImportError::Configuration(
                    "列映射的列号从 1 开始（0 号保留）".to_string(),
                ));
            }
            targets.insert(column, FieldRef::parse(&raw)?);
        }
        Ok(Self { targets })
    }

    /// 按列号升序遍历（写入器依赖此顺序）
    pub fn iter(&self) -> impl Iterator<Item = (usize, &FieldRef)> {
        self.targets.iter().map(|(k, v)| (*k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

// ==========================================
// 转换规则（封闭枚举）
// ==========================================

/// 按代码/引用/标签解析实体 id 时的查询目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTarget {
    /// 目标表名
    pub table: String,
    /// 依序尝试的代码/引用列
    pub key_columns: Vec<String>,
    /// 标签列（仅 FetchIdFromCodeOrLabel 使用）
    #[serde(default)]
    pub label_column: Option<String>,
    /// 实体名称（外键错误提示用）
    #[serde(default)]
    pub element: Option<String>,
    /// 字典名称（外键错误提示用，优先于 element）
    #[serde(default)]
    pub dict: Option<String>,
}

impl LookupTarget {
    /// 转换缓存的键前缀（同一查询目标共享缓存）
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.table, self.key_columns.join(","))
    }

    /// 错误提示中展示的搜索对象名称
    pub fn display_name(&self) -> &str {
        self.dict
            .as_deref()
            .or(self.element.as_deref())
            .unwrap_or(&self.table)
    }
}

/// 自动编号的实体类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeKind {
    Customer,
    Supplier,
    CustomerAccountancy,
    SupplierAccountancy,
}

/// 单字段转换规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConversionRule {
    /// 输入为代码（或已是 id），解析为实体 id
    FetchIdFromCode(LookupTarget),
    /// 输入为业务引用（或已是 id），解析为实体 id
    FetchIdFromRef(LookupTarget),
    /// 先按代码/引用解析，未命中再按标签解析
    FetchIdFromCodeOrLabel(LookupTarget),
    /// 空值替换为字面量 "0"
    ZeroIfNull,
    /// 字面量 "auto"（忽略大小写）触发对应类别的编号生成
    CodeIfAuto(CodeKind),
    /// 经配置的编号器生成下一个序列引用
    RefIfAuto { numbering: String },
    /// 数值字符串本地化归一（千分位/逗号小数点 → 规范小数）
    Numeric,
}

/// 模板目录中的规则描述符（规则名 + 参数）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub rule: String,
    #[serde(default)]
    pub target: Option<LookupTarget>,
    #[serde(default)]
    pub numbering: Option<String>,
}

impl ConversionRule {
    /// 按规则名构造；未注册的规则名是模板配置错误，立即失败
    pub fn from_descriptor(desc: &RuleDescriptor) -> ImportResult<Self> {
        let target = || {
            desc.target.clone().ok_or_else(|| {
                ImportError::Configuration(format!("规则 {} 缺少查询目标参数", desc.rule))
            })
        };
        match desc.rule.as_str() {
            "fetchidfromcodeid" => Ok(Self::FetchIdFromCode(target()?)),
            "fetchidfromref" => Ok(Self::FetchIdFromRef(target()?)),
            "fetchidfromcodeorlabel" => Ok(Self::FetchIdFromCodeOrLabel(target()?)),
            "zeroifnull" => Ok(Self::ZeroIfNull),
            "getcustomercodeifauto" => Ok(Self::CodeIfAuto(CodeKind::Customer)),
            "getsuppliercodeifauto" => Ok(Self::CodeIfAuto(CodeKind::Supplier)),
            "getcustomeraccountancycodeifauto" => {
                Ok(Self::CodeIfAuto(CodeKind::CustomerAccountancy))
            }
            "getsupplieraccountancycodeifauto" => {
                Ok(Self::CodeIfAuto(CodeKind::SupplierAccountancy))
            }
            "getrefifauto" => Ok(Self::RefIfAuto {
                numbering: desc.numbering.clone().unwrap_or_default(),
            }),
            "numeric" => Ok(Self::Numeric),
            other => Err(ImportError::Configuration(format!(
                "未注册的转换规则: {}",
                other
            ))),
        }
    }
}

// ==========================================
// 校验规则
// ==========================================

/// 单字段校验规则：`field@table` 存在性检查，或普通正则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationRule {
    /// 值必须存在于 table 表的 field 列中
    MustExistIn { field: String, table: String },
    /// 值必须匹配正则（忽略大小写）
    Pattern(String),
}

impl ValidationRule {
    /// 解析模板目录中的校验描述符
    pub fn parse(pattern: &str) -> Self {
        // `field@table` 形式优先；@ 取最后一次出现，与原始描述符一致
        if let Some((field, table)) = pattern.rsplit_once('@') {
            if !field.is_empty() && !table.is_empty() {
                return Self::MustExistIn {
                    field: field.to_string(),
                    table: table.to_string(),
                };
            }
        }
        Self::Pattern(pattern.to_string())
    }
}

// ==========================================
// 隐藏字段与模板主体
// ==========================================

/// 隐藏/计算字段的取值来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HiddenValue {
    /// 当前操作者 id
    ActorId,
    /// 本行内指定表最近一次 INSERT 产生的 id（回引）
    LastRowIdOf(String),
}

/// 隐藏/计算字段：目标字段 + 取值来源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiddenField {
    pub target: FieldRef,
    pub source: HiddenValue,
}

/// 模板中的一张目标表
///
/// 表按声明顺序写入：父表必须先于依赖表声明（模板作者的责任）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableTarget {
    pub alias: String,
    pub name: String,
    /// 记录创建者 id 的列（可选）
    #[serde(default)]
    pub creator_column: Option<String>,
}

/// 单字段声明
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSpec {
    /// 必填标记
    #[serde(default)]
    pub mandatory: bool,
    /// 转换规则（可选）
    #[serde(default)]
    pub convert: Option<ConversionRule>,
    /// 校验规则（可选）
    #[serde(default)]
    pub validate: Option<ValidationRule>,
}

/// 导入模板：一次导入用例的目标表/字段/规则声明（本引擎只读消费）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportProfile {
    /// 目标表（声明顺序即写入顺序）
    pub tables: Vec<TableTarget>,
    /// `alias.fieldname` → 字段声明
    pub fields: HashMap<String, FieldSpec>,
    /// 隐藏/计算字段
    #[serde(default)]
    pub hidden_fields: Vec<HiddenField>,
    /// 更新键：非空时按键查找既有行，命中则 UPDATE 而非 INSERT
    #[serde(default)]
    pub update_keys: Vec<FieldRef>,
}

impl ImportProfile {
    /// 取字段声明；未声明的映射字段按默认（非必填、无规则）处理
    pub fn field(&self, field_ref: &FieldRef) -> FieldSpec {
        self.fields.get(&field_ref.key()).cloned().unwrap_or_default()
    }

    /// 从 JSON 文档装载模板（模板以 JSON 形式随用例存放）
    pub fn from_json(json: &str) -> ImportResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ImportError::Configuration(format!("模板 JSON 解析失败: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ref_parse() {
        let r = FieldRef::parse("s.nom").unwrap();
        assert_eq!(r.alias, "s");
        assert_eq!(r.field, "nom");
        assert!(FieldRef::parse("nom").is_err());
        assert!(FieldRef::parse(".nom").is_err());
    }

    #[test]
    fn test_unknown_rule_is_configuration_error() {
        let desc = RuleDescriptor {
            rule: "frobnicate".to_string(),
            target: None,
            numbering: None,
        };
        let err = ConversionRule::from_descriptor(&desc).unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }

    #[test]
    fn test_rule_missing_target_is_configuration_error() {
        let desc = RuleDescriptor {
            rule: "fetchidfromref".to_string(),
            target: None,
            numbering: None,
        };
        assert!(ConversionRule::from_descriptor(&desc).is_err());
    }

    #[test]
    fn test_validation_rule_parse() {
        assert_eq!(
            ValidationRule::parse("code@c_paiement"),
            ValidationRule::MustExistIn {
                field: "code".to_string(),
                table: "c_paiement".to_string()
            }
        );
        assert_eq!(
            ValidationRule::parse("^[A-Z]{2}[0-9]+$"),
            ValidationRule::Pattern("^[A-Z]{2}[0-9]+$".to_string())
        );
    }

    #[test]
    fn test_profile_from_json() {
        let json = r#"{
            "tables": [
                { "alias": "s", "name": "societe", "creator_column": "fk_user_creat" }
            ],
            "fields": {
                "s.nom": { "mandatory": true },
                "s.fk_typent": {
                    "convert": {
                        "FetchIdFromCodeOrLabel": {
                            "table": "c_typent",
                            "key_columns": ["code"],
                            "label_column": "libelle",
                            "dict": "DictionaryCompanyType"
                        }
                    }
                }
            },
            "hidden_fields": [],
            "update_keys": []
        }"#;
        let profile = ImportProfile::from_json(json).unwrap();
        assert_eq!(profile.tables.len(), 1);
        assert!(profile.field(&FieldRef::parse("s.nom").unwrap()).mandatory);
        assert!(ImportProfile::from_json("{ broken").is_err());
    }

    #[test]
    fn test_mapping_rejects_column_zero() {
        let result = ColumnMapping::from_pairs(vec![(0, "s.nom".to_string())]);
        assert!(result.is_err());
    }
}

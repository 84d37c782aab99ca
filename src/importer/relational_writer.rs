// ==========================================
// 通用数据导入引擎 - 关系写入器
// ==========================================
// 职责: 单行记录 → 按模板声明顺序的多表 INSERT/UPDATE 状态机
// 要点: 新生成 id 必须在 INSERT 成功后立即捕获（后续语句会覆盖
//       「最近生成 id」上下文），供同一行后续表组的回引字段使用
// 容错: 表组失败只放弃本行剩余表组；行失败不中断整次导入
// ==========================================

use crate::config::RunContext;
use crate::domain::profile::{ColumnMapping, HiddenValue, ImportProfile};
use crate::domain::record::{CellKind, Record};
use crate::domain::run_result::{IssueKind, RunResult};
use crate::importer::field_converter::{convert_value, Converted, ConversionCache};
use crate::importer::error::ImportResult;
use crate::importer::row_validator::{FormatCheck, RowValidator};
use crate::repository::entity_lookup::EntityLookup;
use crate::repository::persistence_store::{PersistenceStore, SqlValue};
use std::collections::HashMap;
use tracing::debug;

/// 批次标签列：每条 INSERT 都打上运行级导入键
const IMPORT_KEY_COLUMN: &str = "import_key";
/// 多租户范围列（目标表有此列时写入）
const ENTITY_COLUMN: &str = "entity";

// ==========================================
// RelationalWriter
// ==========================================
pub struct RelationalWriter<'a> {
    store: &'a dyn PersistenceStore,
    lookup: &'a dyn EntityLookup,
    ctx: &'a RunContext,
    /// 运行级缓存：随写入器创建于运行开始、弃于运行结束
    conversion_cache: ConversionCache,
    validator: RowValidator,
    /// 表名 → 是否有 entity 列（结构探查开销大，按运行记忆化）
    entity_columns: HashMap<String, bool>,
}

impl<'a> RelationalWriter<'a> {
    pub fn new(
        store: &'a dyn PersistenceStore,
        lookup: &'a dyn EntityLookup,
        ctx: &'a RunContext,
    ) -> Self {
        Self {
            store,
            lookup,
            ctx,
            conversion_cache: ConversionCache::new(),
            validator: RowValidator::new(),
            entity_columns: HashMap::new(),
        }
    }

    /// 处理一行记录：转换、校验、按声明顺序逐表写入
    ///
    /// Err 仅出现在模板配置错误（非法正则等）；数据/存储问题一律
    /// 记入 result 后继续。
    pub fn insert_row(
        &mut self,
        row_number: usize,
        record: &Record,
        mapping: &ColumnMapping,
        profile: &ImportProfile,
        result: &mut RunResult,
    ) -> ImportResult<()> {
        // 空行短路：零格，或仅一格且为空
        if record.is_empty_line() {
            result.push_warning(row_number, IssueKind::Empty, "空行");
            return Ok(());
        }

        // 本行各表新生成的 id（回引字段的数据来源；不跨行存活）
        let mut last_insert_ids: HashMap<String, i64> = HashMap::new();
        // 更新键命中的行 id；跨表组存活，依赖表按回引列更新
        let mut row_update_id: Option<i64> = None;
        let mut inserted = false;
        let mut updated = false;

        'tables: for table in &profile.tables {
            // entity 列探查（按表记忆化）
            let has_entity = match self.entity_columns.get(&table.name) {
                Some(v) => *v,
                None => {
                    debug!(table = %table.name, "探查表是否有 entity 列");
                    match self.store.table_has_column(&table.name, ENTITY_COLUMN) {
                        Ok(v) => {
                            self.entity_columns.insert(table.name.clone(), v);
                            v
                        }
                        Err(e) => {
                            result.push_error(row_number, IssueKind::Sql, e.to_string());
                            break 'tables;
                        }
                    }
                }
            };

            let mut columns: Vec<String> = Vec::new();
            let mut values: Vec<SqlValue> = Vec::new();
            let mut errors_for_table = 0usize;
            // 本表组 UPDATE 的定位列（出现回引隐藏字段时取其列名）
            let mut group_key_column: Option<String> = None;

            // 按列号升序扫描映射中归属本表组的字段
            for (column_index, field_ref) in mapping.iter() {
                if field_ref.alias != table.alias {
                    continue;
                }

                let cell = record.get_mapped(column_index);
                let mut kind = cell.kind;
                let mut newval = if kind == CellKind::NonEmpty {
                    cell.value
                } else {
                    String::new()
                };
                let spec = profile.field(field_ref);
                let mut field_failed = false;

                // 必填检查
                if self.validator.is_missing_mandatory(&spec, &newval) {
                    result.push_error(
                        row_number,
                        IssueKind::NotNull,
                        format!("第 {} 列缺少必填值", column_index),
                    );
                    errors_for_table += 1;
                    field_failed = true;
                } else {
                    // 值转换
                    if let Some(rule) = &spec.convert {
                        match convert_value(rule, &newval, &mut self.conversion_cache, self.lookup)
                        {
                            Ok(Converted::Value(v)) => newval = v,
                            Ok(Converted::NullValue) => {
                                newval.clear();
                                kind = CellKind::Null;
                            }
                            Ok(Converted::ForeignKeyMiss { value, searched }) => {
                                result.push_error(
                                    row_number,
                                    IssueKind::ForeignKey,
                                    format!(
                                        "第 {} 列的值 {} 不存在于 {}",
                                        column_index, value, searched
                                    ),
                                );
                                errors_for_table += 1;
                                field_failed = true;
                            }
                            Err(e) => {
                                result.push_error(row_number, IssueKind::Sql, e.to_string());
                                errors_for_table += 1;
                                field_failed = true;
                            }
                        }
                    }

                    // 格式检查（必填已失败或值为空则不做）
                    if !field_failed && !newval.is_empty() {
                        if let Some(vrule) = &spec.validate {
                            match self.validator.check_format(vrule, &newval, self.store)? {
                                FormatCheck::Ok => {}
                                FormatCheck::ForeignKeyMiss { field, table } => {
                                    result.push_error(
                                        row_number,
                                        IssueKind::ForeignKey,
                                        format!(
                                            "第 {} 列的值 {} 不存在于 {}.{}",
                                            column_index, newval, table, field
                                        ),
                                    );
                                    errors_for_table += 1;
                                }
                                FormatCheck::PatternMismatch { pattern } => {
                                    result.push_error(
                                        row_number,
                                        IssueKind::Regex,
                                        format!(
                                            "第 {} 列的值 {} 不匹配 {}",
                                            column_index, newval, pattern
                                        ),
                                    );
                                    errors_for_table += 1;
                                }
                                FormatCheck::StoreError(msg) => {
                                    result.push_error(row_number, IssueKind::Sql, msg);
                                    errors_for_table += 1;
                                }
                            }
                        }
                    }
                }

                // 绑定值：三态在此定型（Null → SQL NULL，Blank → 空串）
                let bound = if newval.is_empty() {
                    match kind {
                        CellKind::Null => SqlValue::Null,
                        _ => SqlValue::Text(String::new()),
                    }
                } else {
                    SqlValue::Text(newval)
                };
                columns.push(field_ref.field.clone());
                values.push(bound);
            }

            // 隐藏/计算字段：仅当本表组已有至少一个映射字段
            if !columns.is_empty() {
                for hidden in &profile.hidden_fields {
                    if hidden.target.alias != table.alias {
                        continue;
                    }
                    match &hidden.source {
                        HiddenValue::ActorId => {
                            columns.push(hidden.target.field.clone());
                            values.push(SqlValue::Int(self.ctx.actor_id));
                        }
                        HiddenValue::LastRowIdOf(parent_table) => {
                            let id = last_insert_ids.get(parent_table).copied().unwrap_or(0);
                            group_key_column = Some(hidden.target.field.clone());
                            columns.push(hidden.target.field.clone());
                            values.push(SqlValue::Int(id));
                        }
                    }
                }
            }

            if errors_for_table > 0 {
                // 本表组失败：放弃本行剩余表组，继续下一行
                break 'tables;
            }
            if columns.is_empty() {
                // 本表组无映射字段（含「只有隐藏字段」的情形）：不写入
                continue;
            }

            let mut group_failed = false;
            let mut group_updated = false;

            // 配置了更新键：先查既有行
            if !profile.update_keys.is_empty() {
                if row_update_id.is_none() {
                    let mut filters: Vec<(String, SqlValue)> = Vec::new();
                    let mut filter_desc: Vec<String> = Vec::new();
                    for key in &profile.update_keys {
                        if key.alias != table.alias {
                            continue;
                        }
                        if let Some(pos) = columns.iter().position(|c| *c == key.field) {
                            filters.push((key.field.clone(), values[pos].clone()));
                            filter_desc.push(format!("{} = {}", key.key(), values[pos].display()));
                        }
                    }
                    if !filters.is_empty() {
                        match self.store.select_ids(&table.name, &filters) {
                            Ok(ids) => match ids.len() {
                                0 => {} // 无既有行，落到下方 INSERT
                                1 => {
                                    row_update_id = Some(ids[0]);
                                    last_insert_ids.insert(table.name.clone(), ids[0]);
                                }
                                _ => {
                                    result.push_error(
                                        row_number,
                                        IssueKind::Sql,
                                        format!(
                                            "按条件 {} 匹配到多条记录",
                                            filter_desc.join(", ")
                                        ),
                                    );
                                    group_failed = true;
                                }
                            },
                            Err(e) => {
                                result.push_error(row_number, IssueKind::Sql, e.to_string());
                                group_failed = true;
                            }
                        }
                    }
                }

                if !group_failed {
                    if let Some(id) = row_update_id {
                        let key_column = group_key_column.as_deref().unwrap_or("rowid");
                        match self
                            .store
                            .update(&table.name, key_column, id, &columns, &values)
                        {
                            // 受影响 0 行也算更新成功（数据本就相同）
                            Ok(_affected) => {
                                updated = true;
                                group_updated = true;
                            }
                            Err(e) => {
                                result.push_error(row_number, IssueKind::Sql, e.to_string());
                                group_failed = true;
                            }
                        }
                    }
                }
            }

            // 未走更新 → INSERT，附加批次标签 / entity / 创建者列
            if !group_failed && !group_updated {
                columns.push(IMPORT_KEY_COLUMN.to_string());
                values.push(SqlValue::Text(self.ctx.import_key.clone()));
                if has_entity {
                    columns.push(ENTITY_COLUMN.to_string());
                    values.push(SqlValue::Int(self.ctx.entity));
                }
                if let Some(creator) = &table.creator_column {
                    columns.push(creator.clone());
                    values.push(SqlValue::Int(self.ctx.actor_id));
                }

                match self.store.insert(&table.name, &columns, &values) {
                    Ok(id) => {
                        // 必须立即捕获，供本行后续表组的回引字段使用
                        last_insert_ids.insert(table.name.clone(), id);
                        inserted = true;
                    }
                    Err(e) => {
                        result.push_error(row_number, IssueKind::Sql, e.to_string());
                        group_failed = true;
                    }
                }
            }

            if group_failed {
                break 'tables;
            }
        }

        // 行级计数：一行至多各计一次
        if updated {
            result.updated_rows += 1;
        }
        if inserted {
            result.inserted_rows += 1;
        }
        Ok(())
    }
}

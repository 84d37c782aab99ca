// ==========================================
// 通用数据导入引擎 - 导入编排器
// ==========================================
// 职责: 打开文件 → 跳过头部行 → 逐行交给关系写入器 → 汇总结果
// 红线: 单行失败不中断批次；整体失败仅限文件/配置级错误
// ==========================================

use crate::config::{ImportOptions, ReaderOptions, RunContext};
use crate::domain::profile::{ColumnMapping, ImportProfile};
use crate::domain::run_result::RunResult;
use crate::importer::error::ImportResult;
use crate::importer::reader_trait::reader_for_path;
use crate::importer::relational_writer::RelationalWriter;
use crate::repository::entity_lookup::EntityLookup;
use crate::repository::persistence_store::PersistenceStore;
use chrono::Utc;
use std::path::Path;
use tracing::info;

// ==========================================
// ImportRunner
// ==========================================
pub struct ImportRunner<'a> {
    store: &'a dyn PersistenceStore,
    lookup: &'a dyn EntityLookup,
}

impl<'a> ImportRunner<'a> {
    pub fn new(store: &'a dyn PersistenceStore, lookup: &'a dyn EntityLookup) -> Self {
        Self { store, lookup }
    }

    /// 执行一次导入
    ///
    /// 行号按文件物理顺序从 1 起计（含被跳过的头部行），错误清单
    /// 中的行号可直接对照源文件。运行级缓存随本次调用创建与丢弃。
    pub fn run(
        &self,
        path: &Path,
        profile: &ImportProfile,
        mapping: &ColumnMapping,
        ctx: &RunContext,
        reader_options: &ReaderOptions,
        options: &ImportOptions,
    ) -> ImportResult<RunResult> {
        info!(
            import_key = %ctx.import_key,
            file = %path.display(),
            offset = options.offset_lines,
            "开始导入"
        );

        let mut reader = reader_for_path(path, reader_options)?;
        reader.open(path)?;
        reader.read_header()?;

        let mut writer = RelationalWriter::new(self.store, self.lookup, ctx);
        let mut result = RunResult::new();
        let mut row_number = 0usize;

        while let Some(record) = reader.read_record()? {
            row_number += 1;
            if row_number <= options.offset_lines {
                continue;
            }
            writer.insert_row(row_number, &record, mapping, profile, &mut result)?;
        }
        reader.close();

        result.finished_at = Some(Utc::now());
        info!(
            import_key = %ctx.import_key,
            inserted = result.inserted_rows,
            updated = result.updated_rows,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "导入结束"
        );
        Ok(result)
    }
}

// ==========================================
// 通用数据导入引擎 - 表格读取器接口
// ==========================================
// 职责: 定义按行读取表格文件的统一接口（每种格式一个驱动）
// 红线: 驱动按扩展名静态分发，禁止按字符串运行时构造类
// ==========================================

use crate::config::ReaderOptions;
use crate::domain::record::Record;
use crate::importer::csv_reader::DelimitedReader;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::xlsx_reader::WorkbookReader;
use std::path::Path;

// ==========================================
// TabularReader Trait
// ==========================================
// 用途: 格式驱动的统一「读下一行为类型化单元格」接口
// 实现者: DelimitedReader, WorkbookReader
pub trait TabularReader {
    // ===== 驱动身份元数据（诊断用） =====
    fn driver_id(&self) -> &'static str;
    fn driver_label(&self) -> &'static str;
    fn driver_extension(&self) -> &'static str;
    fn driver_version(&self) -> &'static str;
    /// 底层第三方库名称（无外部库时为自身）
    fn lib_label(&self) -> &'static str;
    fn lib_version(&self) -> &'static str;

    // ===== 读取流程 =====
    /// 打开输入文件；不可读时返回 FileOpen
    fn open(&mut self, path: &Path) -> ImportResult<()>;

    /// 估算记录数（供进度展示）；不得不可逆地改变读取状态
    fn count_records(&self, path: &Path) -> ImportResult<usize>;

    /// 读标题行（格式相关；分隔文本格式为空操作）
    fn read_header(&mut self) -> ImportResult<()>;

    /// 读下一行；单元格已做三态分类与编码归一；文件读尽返回 None
    fn read_record(&mut self) -> ImportResult<Option<Record>>;

    /// 释放句柄；可重复调用
    fn close(&mut self);
}

/// 按文件扩展名选择格式驱动
pub fn reader_for_path(path: &Path, options: &ReaderOptions) -> ImportResult<Box<dyn TabularReader>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => Ok(Box::new(DelimitedReader::new(options.clone())?)),
        "xlsx" | "xls" => Ok(Box::new(WorkbookReader::new())),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}

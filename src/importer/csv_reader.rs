// ==========================================
// 通用数据导入引擎 - 分隔文本驱动
// ==========================================
// 职责: 按行流式读取字符分隔文本（分隔符/包裹符/转义符可配置）
// 支持: 平台换行符差异；逐格编码归一；示例文件标题/记录行输出
// ==========================================

use crate::config::ReaderOptions;
use crate::domain::record::{Cell, Record};
use crate::importer::charset;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::reader_trait::TabularReader;
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// ==========================================
// DelimitedReader
// ==========================================
pub struct DelimitedReader {
    options: ReaderOptions,
    forced: Option<&'static Encoding>,
    reader: Option<csv::Reader<File>>,
    buffer: csv::ByteRecord,
}

impl DelimitedReader {
    /// 构造驱动；强制字符集标签在此解析（未知标签立即失败）
    pub fn new(options: ReaderOptions) -> ImportResult<Self> {
        let forced = charset::resolve_charset(options.forced_charset.as_deref())?;
        Ok(Self {
            options,
            forced,
            reader: None,
            buffer: csv::ByteRecord::new(),
        })
    }

    /// 示例文件的标题行（字段名中的分隔符替换为 /）
    pub fn write_title_example(&self, fields: &[&str]) -> String {
        self.join_line(fields)
    }

    /// 示例文件的记录行（值中的分隔符替换为 /）
    pub fn write_record_example(&self, values: &[&str]) -> String {
        self.join_line(values)
    }

    fn join_line(&self, values: &[&str]) -> String {
        let sep = self.options.separator as char;
        let cleaned: Vec<String> = values.iter().map(|v| clean_sep(v)).collect();
        format!("{}\n", cleaned.join(&sep.to_string()))
    }
}

/// 值内的标准分隔符（, ;）统一替换为 /，保证行可被重新读回
fn clean_sep(value: &str) -> String {
    value.replace([',', ';'], "/")
}

impl TabularReader for DelimitedReader {
    fn driver_id(&self) -> &'static str {
        "csv"
    }
    fn driver_label(&self) -> &'static str {
        "Csv"
    }
    fn driver_extension(&self) -> &'static str {
        "csv"
    }
    fn driver_version(&self) -> &'static str {
        "1.34"
    }
    fn lib_label(&self) -> &'static str {
        "csv"
    }
    fn lib_version(&self) -> &'static str {
        "1.3"
    }

    fn open(&mut self, path: &Path) -> ImportResult<()> {
        let file = File::open(path)
            .map_err(|e| ImportError::FileOpen(format!("{}: {}", path.display(), e)))?;

        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.options.separator)
            .quote(self.options.enclosure)
            .has_headers(false)
            .flexible(true); // 允许行长度不一致
        if self.options.escape == self.options.enclosure {
            builder.double_quote(true);
        } else {
            builder.double_quote(false).escape(Some(self.options.escape));
        }

        self.reader = Some(builder.from_reader(file));
        Ok(())
    }

    /// 行数统计走独立句柄，不触碰读取游标
    fn count_records(&self, path: &Path) -> ImportResult<usize> {
        let file = File::open(path)
            .map_err(|e| ImportError::FileOpen(format!("{}: {}", path.display(), e)))?;
        let reader = BufReader::new(file);
        let mut count = 0usize;
        for line in reader.split(b'\n') {
            line?;
            count += 1;
        }
        Ok(count)
    }

    /// 分隔文本无独立标题语义，标题跳过在行迭代层处理
    fn read_header(&mut self) -> ImportResult<()> {
        Ok(())
    }

    fn read_record(&mut self) -> ImportResult<Option<Record>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ImportError::FileRead("文件未打开".to_string()))?;

        if !reader.read_byte_record(&mut self.buffer)? {
            return Ok(None);
        }

        let cells: Vec<Cell> = self
            .buffer
            .iter()
            .map(|raw| Cell::from_value(charset::normalize_cell(raw, self.forced)))
            .collect();
        Ok(Some(Record::new(cells)))
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

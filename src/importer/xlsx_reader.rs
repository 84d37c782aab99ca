// ==========================================
// 通用数据导入引擎 - 电子表格工作簿驱动
// ==========================================
// 职责: 读取压缩电子表格（.xlsx/.xls）第一张工作表为行记录
// 说明: 整表载入内存（格式自身限制了文件规模），用毕显式释放
// ==========================================

use crate::domain::record::{Cell, Record};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::reader_trait::TabularReader;
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::path::Path;

// ==========================================
// WorkbookReader
// ==========================================
#[derive(Default)]
pub struct WorkbookReader {
    /// 整表数据（open 后填充，close 释放）
    rows: Option<Vec<Vec<Data>>>,
    cursor: usize,
    width: usize,
    headers: Vec<String>,
}

impl WorkbookReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// read_header 预读的列标题
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn load_sheet(path: &Path) -> ImportResult<Vec<Vec<Data>>> {
        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e: calamine::XlsxError| ImportError::FileOpen(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParse("工作簿无工作表".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParse(e.to_string()))?;

        Ok(range.rows().map(|row| row.to_vec()).collect())
    }

    fn cell_from_data(data: &Data) -> Cell {
        match data {
            Data::Empty => Cell::null(),
            other => Cell::from_value(other.to_string()),
        }
    }
}

impl TabularReader for WorkbookReader {
    fn driver_id(&self) -> &'static str {
        "xlsx"
    }
    fn driver_label(&self) -> &'static str {
        "Excel 2007"
    }
    fn driver_extension(&self) -> &'static str {
        "xlsx"
    }
    fn driver_version(&self) -> &'static str {
        "1.0"
    }
    fn lib_label(&self) -> &'static str {
        "calamine"
    }
    fn lib_version(&self) -> &'static str {
        "0.25"
    }

    fn open(&mut self, path: &Path) -> ImportResult<()> {
        let rows = Self::load_sheet(path)?;
        self.width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        self.rows = Some(rows);
        self.cursor = 0;
        Ok(())
    }

    /// 记录数取工作表已用高度；走独立句柄，读取游标不受影响
    fn count_records(&self, path: &Path) -> ImportResult<usize> {
        Ok(Self::load_sheet(path)?.len())
    }

    /// 预读标题行（首行），游标不前移
    fn read_header(&mut self) -> ImportResult<()> {
        let rows = self
            .rows
            .as_ref()
            .ok_or_else(|| ImportError::FileRead("工作簿未打开".to_string()))?;
        self.headers = rows
            .first()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();
        Ok(())
    }

    fn read_record(&mut self) -> ImportResult<Option<Record>> {
        let rows = self
            .rows
            .as_ref()
            .ok_or_else(|| ImportError::FileRead("工作簿未打开".to_string()))?;

        let Some(row) = rows.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;

        // 补齐到已用宽度：缺格视为 Null
        let mut cells: Vec<Cell> = row.iter().map(Self::cell_from_data).collect();
        cells.resize(self.width, Cell::null());
        Ok(Some(Record::new(cells)))
    }

    /// 释放整表对象图；可重复调用
    fn close(&mut self) {
        self.rows = None;
        self.cursor = 0;
        self.headers.clear();
    }
}

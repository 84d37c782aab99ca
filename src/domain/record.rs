// ==========================================
// 通用数据导入引擎 - 输入记录模型
// ==========================================
// 职责: 单元格三态模型（Null / Blank / NonEmpty）与行记录
// 红线: 三态区分贯穿全程，禁止坍缩为布尔值
// ==========================================

use serde::{Deserialize, Serialize};

/// 单元格三态分类
///
/// - Null: 源文件中缺失，落库时写 SQL NULL
/// - Blank: 源文件中存在但为空串，落库时写空字符串
/// - NonEmpty: 有内容，需经过转换与校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Null,
    Blank,
    NonEmpty,
}

/// 输入文件中的一个单元格
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub value: String,
    pub kind: CellKind,
}

impl Cell {
    /// 空值单元格（源文件缺失）
    pub fn null() -> Self {
        Self {
            value: String::new(),
            kind: CellKind::Null,
        }
    }

    /// 空串单元格（源文件存在但无内容）
    pub fn blank() -> Self {
        Self {
            value: String::new(),
            kind: CellKind::Blank,
        }
    }

    /// 按内容自动分类：空串视为 Null（与读取器口径一致）
    pub fn from_value(value: String) -> Self {
        let kind = if value.is_empty() {
            CellKind::Null
        } else {
            CellKind::NonEmpty
        };
        Self { value, kind }
    }

    /// 是否无内容（Null 或 Blank）
    pub fn is_empty(&self) -> bool {
        self.kind != CellKind::NonEmpty
    }
}

/// 一行输入记录：有序单元格序列
///
/// 映射中的列号为 1 基（0 号保留），`get_mapped(1)` 取首格。
/// 列号超出记录长度时按 Null 处理。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub cells: Vec<Cell>,
}

impl Record {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// 按映射列号（1 基）取单元格；越界视为 Null
    pub fn get_mapped(&self, column: usize) -> Cell {
        if column == 0 {
            return Cell::null();
        }
        self.cells.get(column - 1).cloned().unwrap_or_else(Cell::null)
    }

    /// 空行判定：零格，或仅一格且无内容
    pub fn is_empty_line(&self) -> bool {
        self.cells.is_empty() || (self.cells.len() == 1 && self.cells[0].value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_value_classifies() {
        assert_eq!(Cell::from_value("abc".to_string()).kind, CellKind::NonEmpty);
        assert_eq!(Cell::from_value(String::new()).kind, CellKind::Null);
    }

    #[test]
    fn test_record_out_of_range_is_null() {
        let record = Record::new(vec![Cell::from_value("A".to_string())]);
        assert_eq!(record.get_mapped(1).value, "A");
        assert_eq!(record.get_mapped(5).kind, CellKind::Null);
    }

    #[test]
    fn test_empty_line_detection() {
        assert!(Record::new(vec![]).is_empty_line());
        assert!(Record::new(vec![Cell::null()]).is_empty_line());
        assert!(!Record::new(vec![Cell::from_value("x".to_string())]).is_empty_line());
        assert!(!Record::new(vec![Cell::null(), Cell::null()]).is_empty_line());
    }
}

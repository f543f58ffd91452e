// ==========================================
// 商品目录导入 - 单元格清洗
// ==========================================
// 职责: 每行每个单元格 去首尾空白 + 按配置转码
// 兼容: LegacyLatin1 把单元格的每个字节当作 Latin-1 字符重新编码为 UTF-8
//       源文件本身是 UTF-8 时非 ASCII 字符会被破坏（如 "é" → "Ã©"）
// ==========================================

use crate::domain::types::CellEncoding;

#[derive(Debug, Clone, Copy, Default)]
pub struct DataCleaner {
    encoding: CellEncoding,
}

impl DataCleaner {
    pub fn new(encoding: CellEncoding) -> Self {
        Self { encoding }
    }

    pub fn clean_cell(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self.encoding {
            CellEncoding::LegacyLatin1 => reencode_latin1(trimmed),
            CellEncoding::Passthrough => trimmed.to_string(),
        }
    }

    pub fn clean_row(&self, cells: Vec<String>) -> Vec<String> {
        cells.iter().map(|c| self.clean_cell(c)).collect()
    }

    /// 全部单元格为空（清洗后）
    pub fn is_blank_row(cells: &[String]) -> bool {
        cells.iter().all(|c| c.is_empty())
    }
}

/// 字节按 Latin-1 解释后转为 UTF-8 文本
fn reencode_latin1(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }
    value.bytes().map(|b| b as char).collect()
}

// ==========================================
// 商品目录导入 - 字段映射器
// ==========================================
// 职责: 列位置 ↔ 语义字段
// 模式: 表头模式（解析首行）/ 静态模式（配置给定 字段 → 列号）
// 约定: 映射器本身不报错；配置问题在构建阶段表现为缺字段
// ==========================================

use crate::domain::import::{ColumnMapping, RowRecord};
use std::collections::BTreeMap;
use tracing::debug;

/// 表头内部空白的替换字符
pub const HEADING_SEPARATOR: char = '_';

pub struct FieldMapper;

impl FieldMapper {
    /// 规范化单个表头
    ///
    /// # 规则
    /// - 去掉行尾换行
    /// - 去左侧空白（右侧保留）
    /// - 转小写
    /// - 连续空白折叠为一个 '_'
    ///
    /// # 返回
    /// - None: 空表头（跳过该列）
    pub fn normalize_heading(raw: &str) -> Option<String> {
        let chomped = raw
            .strip_suffix("\r\n")
            .or_else(|| raw.strip_suffix('\n'))
            .or_else(|| raw.strip_suffix('\r'))
            .unwrap_or(raw);

        let trimmed = chomped.trim_start();
        if trimmed.trim_end().is_empty() {
            return None;
        }

        let mut key = String::with_capacity(trimmed.len());
        let mut in_whitespace = false;
        for ch in trimmed.chars().flat_map(char::to_lowercase) {
            if ch.is_whitespace() {
                if !in_whitespace {
                    key.push(HEADING_SEPARATOR);
                }
                in_whitespace = true;
            } else {
                key.push(ch);
                in_whitespace = false;
            }
        }

        Some(key)
    }

    /// 由表头行构建映射（重复键后者覆盖前者）
    pub fn mapping_from_headers(headers: &[String]) -> ColumnMapping {
        let mut mapping = ColumnMapping::new();
        for (index, heading) in headers.iter().enumerate() {
            match Self::normalize_heading(heading) {
                Some(key) => {
                    if let Some(previous) = mapping.get(&key) {
                        debug!(key = %key, previous, index, "表头重复，后出现的列覆盖");
                    }
                    mapping.insert(key, index);
                }
                None => debug!(index, "空表头，跳过该列"),
            }
        }
        mapping
    }

    /// 静态映射原样使用（不校验列号范围）
    pub fn mapping_from_static(columns: &BTreeMap<String, usize>) -> ColumnMapping {
        ColumnMapping::from(columns.clone())
    }

    /// 单行 → 语义字段集（越界列与空单元格视为缺省）
    pub fn map_row(mapping: &ColumnMapping, cells: &[String], row_number: usize) -> RowRecord {
        let mut record = RowRecord::new(row_number);
        for (field, index) in mapping.iter() {
            record.set(field, cells.get(index).cloned());
        }
        record
    }
}

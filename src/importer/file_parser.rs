// ==========================================
// 商品目录导入 - 数据源读取与文件解析
// ==========================================
// 读取: 本地路径（tokio::fs）/ HTTP(S) 地址（reqwest，一次性下载）
// 解析: CSV（分隔符可配，行长可不一致）/ XLSX（第一个工作表）
// 输出: 按位置排列的单元格行，不做表头识别（交给 FieldMapper）
// ==========================================

use crate::domain::import::ImportSource;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::product_importer_trait::FileParser;
use calamine::{Reader, Xlsx};
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser {
    delimiter: u8,
    encoding: Option<&'static Encoding>, // None = UTF-8（非法字节替换）
}

impl CsvParser {
    pub fn new(delimiter: u8, encoding: Option<&'static Encoding>) -> Self {
        Self {
            delimiter,
            encoding,
        }
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self.encoding {
            Some(encoding) => {
                let (text, actual, had_errors) = encoding.decode(bytes);
                if had_errors {
                    warn!(encoding = actual.name(), "源文件含无法解码的字节，已替换");
                }
                text
            }
            None => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                match std::str::from_utf8(bytes) {
                    Ok(text) => Cow::Borrowed(text),
                    Err(_) => {
                        warn!("源文件不是合法 UTF-8，非法字节已替换");
                        String::from_utf8_lossy(bytes)
                    }
                }
            }
        }
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new(b',', None)
    }
}

impl FileParser for CsvParser {
    fn parse_rows(&self, bytes: &[u8]) -> ImportResult<Vec<Vec<String>>> {
        let text = self.decode(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!(rows = rows.len(), "CSV 解析完成");
        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_rows(&self, bytes: &[u8]) -> ImportResult<Vec<Vec<String>>> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        debug!(sheet = %sheet_name, rows = rows.len(), "Excel 解析完成");
        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser {
    csv: CsvParser,
    excel: ExcelParser,
}

impl UniversalFileParser {
    pub fn new(csv: CsvParser) -> Self {
        Self {
            csv,
            excel: ExcelParser,
        }
    }

    /// 按扩展名选择解析器：xlsx → Excel；xls 不支持；其余按分隔符文本处理
    pub fn parse(&self, extension: Option<&str>, bytes: &[u8]) -> ImportResult<Vec<Vec<String>>> {
        match extension {
            Some("xlsx") => self.excel.parse_rows(bytes),
            Some("xls") => Err(ImportError::UnsupportedFormat("xls".to_string())),
            _ => self.csv.parse_rows(bytes),
        }
    }
}

/// 读取数据源全部字节
///
/// # 参数
/// - timeout: 远程下载超时（None = 不设超时）
pub async fn read_source(source: &ImportSource, timeout: Option<Duration>) -> ImportResult<Vec<u8>> {
    match source {
        ImportSource::Path(path) => {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(ImportError::FileNotFound(path.display().to_string()));
            }
            Ok(tokio::fs::read(path).await?)
        }
        ImportSource::Url(url) => {
            let mut builder = reqwest::Client::builder();
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            let client = builder.build()?;

            let response = client.get(url).send().await?.error_for_status()?;
            let bytes = response.bytes().await?;
            debug!(url = %url, size = bytes.len(), "远程数据源下载完成");
            Ok(bytes.to_vec())
        }
    }
}

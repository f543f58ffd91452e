// ==========================================
// 日志系统
// ==========================================
// 进程日志: tracing + tracing-subscriber（RUST_LOG 控制级别）
// 导入日志: ImportLog，单次导入运行的结果日志
//   行格式 "[YYYY-MM-DD HH:MM:SS] [Severity] message"
//   同时镜像到 tracing，并保存在内存供 ImportReport 使用
// ==========================================

use crate::domain::import::LogLine;
use crate::domain::types::LogSeverity;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=catalog_import=trace
///
/// # 示例
/// ```no_run
/// use catalog_import::logging;
/// logging::init();
/// ```
pub fn init() {
    // 从环境变量读取日志级别，默认为 info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// 测试用初始化（debug 级别，输出到测试捕获；可重复调用）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

// ==========================================
// ImportLog - 导入结果日志
// ==========================================
// 约束: 只追加；单次运行内顺序写入
pub struct ImportLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
    lines: Mutex<Vec<LogLine>>,
}

impl ImportLog {
    /// 打开日志
    ///
    /// # 参数
    /// - path: 日志文件（追加写入，自动创建父目录）；None = 仅内存 + tracing
    pub fn open(path: Option<&Path>) -> std::io::Result<Self> {
        let file = match path {
            Some(p) => {
                if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Some(OpenOptions::new().create(true).append(true).open(p)?)
            }
            None => None,
        };

        Ok(Self {
            path: path.map(Path::to_path_buf),
            file: Mutex::new(file),
            lines: Mutex::new(Vec::new()),
        })
    }

    /// 仅内存 + tracing
    pub fn memory() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.write(LogSeverity::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.write(LogSeverity::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.write(LogSeverity::Error, message.into());
    }

    /// 已写入的全部行（按写入顺序）
    pub fn lines(&self) -> Vec<LogLine> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write(&self, severity: LogSeverity, message: String) {
        match severity {
            LogSeverity::Info => tracing::info!(target: "import_log", "{}", message),
            LogSeverity::Warn => tracing::warn!(target: "import_log", "{}", message),
            LogSeverity::Error => tracing::error!(target: "import_log", "{}", message),
        }

        let line = LogLine {
            at: Local::now(),
            severity,
            message,
        };

        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
                    tracing::warn!(error = %e, "导入日志文件写入失败");
                }
            }
        }

        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

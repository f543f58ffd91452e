// ==========================================
// 商品目录导入 - 图片获取
// ==========================================
// 规则:
// - 定位符以 http:// 或 https:// 开头 → 远程下载（一次尝试，不重试）
// - 否则视为图片根目录下的相对路径
// - 任何失败都以 AssetFetch 的非 Fetched 分支返回，由调用方记日志并跳过该图片
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::product_importer_trait::{AssetFetch, AssetFetcher};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

fn remote_locator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https*://").expect("valid regex"))
}

pub fn is_remote_locator(locator: &str) -> bool {
    remote_locator().is_match(locator)
}

fn guess_content_type(name: &str) -> Option<String> {
    mime_guess::from_path(name).first().map(|m| m.to_string())
}

pub struct DefaultAssetFetcher {
    image_root: PathBuf,
    client: reqwest::Client,
}

impl DefaultAssetFetcher {
    /// # 参数
    /// - image_root: 本地图片根目录
    /// - timeout: 远程下载超时（None = 不设超时）
    pub fn new(image_root: impl Into<PathBuf>, timeout: Option<Duration>) -> ImportResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            image_root: image_root.into(),
            client: builder.build()?,
        })
    }

    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    /// 根目录与定位符直接拼接（定位符开头的 '/' 不视为绝对路径）
    fn resolve_local(&self, locator: &str) -> PathBuf {
        self.image_root.join(locator.trim_start_matches(['/', '\\']))
    }

    async fn fetch_local(&self, locator: &str) -> AssetFetch {
        let path = self.resolve_local(locator);
        let shown = path.display().to_string();

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return AssetFetch::Missing {
                    path: shown,
                    reason: "不是普通文件".to_string(),
                }
            }
            Err(e) => {
                return AssetFetch::Missing {
                    path: shown,
                    reason: e.to_string(),
                }
            }
        }

        match tokio::fs::read(&path).await {
            Ok(data) => {
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(locator)
                    .to_string();
                debug!(path = %shown, size = data.len(), "本地图片读取完成");
                AssetFetch::Fetched {
                    content_type: guess_content_type(&file_name),
                    file_name,
                    data,
                }
            }
            Err(e) => AssetFetch::Missing {
                path: shown,
                reason: e.to_string(),
            },
        }
    }

    async fn fetch_remote(&self, url: &str) -> AssetFetch {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                return AssetFetch::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return AssetFetch::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }

        let header_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let file_name = response
            .url()
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("image")
            .to_string();

        match response.bytes().await {
            Ok(bytes) => {
                debug!(url = %url, size = bytes.len(), "远程图片下载完成");
                AssetFetch::Fetched {
                    content_type: header_type.or_else(|| guess_content_type(&file_name)),
                    file_name,
                    data: bytes.to_vec(),
                }
            }
            Err(e) => AssetFetch::Transport {
                url: url.to_string(),
                message: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl AssetFetcher for DefaultAssetFetcher {
    async fn fetch(&self, locator: &str) -> AssetFetch {
        let locator = locator.trim();
        if is_remote_locator(locator) {
            self.fetch_remote(locator).await
        } else {
            self.fetch_local(locator).await
        }
    }
}

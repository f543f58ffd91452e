// ==========================================
// 商品目录导入 - 分类树解析
// ==========================================
// 输入: 分类树名（语义字段名）+ 层级串，如 "A > B & C > D"
// 规则:
// - '&' 切分为互相独立的路径，'>' 切分为有序节点名
// - 从分类树根节点逐级查找或创建子节点（按名称精确匹配）
// - 商品只关联每条路径的末级节点，已关联则跳过
// - 分类树按名称忽略大小写查找；不存在且允许创建时以首字母大写名创建
// ==========================================

use crate::i18n::t_with_args;
use crate::importer::error::ImportResult;
use crate::logging::ImportLog;
use crate::repository::CatalogRepository;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

fn path_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*&\s*").expect("valid regex"))
}

fn node_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*>\s*").expect("valid regex"))
}

/// 层级串 → 路径列表（空路径、空节点名丢弃）
pub fn parse_hierarchy(spec: &str) -> Vec<Vec<String>> {
    path_separator()
        .split(spec.trim())
        .map(|path| {
            node_separator()
                .split(path.trim())
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|nodes| !nodes.is_empty())
        .collect()
}

/// 首字母大写，其余小写
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub struct TaxonomyResolver {
    repo: Arc<dyn CatalogRepository>,
    create_missing: bool,
}

impl TaxonomyResolver {
    pub fn new(repo: Arc<dyn CatalogRepository>, create_missing: bool) -> Self {
        Self {
            repo,
            create_missing,
        }
    }

    /// 关联商品与层级串中每条路径的末级节点
    ///
    /// # 返回
    /// - 本次新关联的末级节点 id（已关联的不计入）
    pub async fn associate(
        &self,
        product_id: i64,
        taxonomy_name: Option<&str>,
        hierarchy: Option<&str>,
        log: &ImportLog,
    ) -> ImportResult<Vec<i64>> {
        let (Some(taxonomy_name), Some(hierarchy)) = (
            taxonomy_name.filter(|s| !s.trim().is_empty()),
            hierarchy.filter(|s| !s.trim().is_empty()),
        ) else {
            return Ok(Vec::new());
        };

        let taxonomy = match self.repo.find_taxonomy_by_name(taxonomy_name).await? {
            Some(t) => t,
            None if self.create_missing => {
                let created = self.repo.create_taxonomy(&capitalize(taxonomy_name)).await?;
                debug!(taxonomy = %created.name, taxonomy_id = created.id, "创建分类树");
                created
            }
            None => {
                log.warn(t_with_args(
                    "taxonomy.missing",
                    &[("name", taxonomy_name), ("spec", hierarchy)],
                ));
                return Ok(Vec::new());
            }
        };

        let mut linked = Vec::new();
        for path in parse_hierarchy(hierarchy) {
            let mut parent_id = taxonomy.root_taxon_id;
            for name in &path {
                let taxon = self
                    .repo
                    .find_or_create_child_taxon(taxonomy.id, parent_id, name)
                    .await?;
                parent_id = taxon.id;
            }

            if self.repo.link_product_taxon(product_id, parent_id).await? {
                linked.push(parent_id);
            } else {
                debug!(product_id, taxon_id = parent_id, "商品已关联该分类节点，跳过");
            }
        }

        Ok(linked)
    }
}

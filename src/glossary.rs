//! 域名级术语表
//!
//! 术语表按网站域名组织，由分类和术语条目两级构成。
//! 翻译过程中发现的新术语统一归入 `General` 分类，
//! 外部维护的分类仅作为上下文参考，引擎不会自动写入。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::constants::GENERAL_CATEGORY;

/// 单个术语条目
///
/// `original` 在同一分类内唯一；`translated` 为空表示译文待定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    /// 原文术语
    pub original: String,
    /// 术语译文，空串表示尚未翻译
    #[serde(default)]
    pub translated: String,
    /// 术语说明
    #[serde(default)]
    pub description: String,
    /// 占位符名称，由翻译服务指定，渲染时作为标识符使用
    #[serde(default)]
    pub placeholder_name: String,
}

impl TermEntry {
    /// 创建待翻译的术语条目
    pub fn pending(original: &str, description: &str, placeholder_name: &str) -> Self {
        Self {
            original: original.to_string(),
            translated: String::new(),
            description: description.to_string(),
            placeholder_name: placeholder_name.to_string(),
        }
    }

    /// 译文是否待定
    pub fn is_pending(&self) -> bool {
        self.translated.is_empty()
    }

    /// 译文是否与原文相同（恒等译文不参与替换）
    pub fn is_identity(&self) -> bool {
        self.translated == self.original
    }
}

/// 术语分类：保持插入顺序，`original` 唯一
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Category {
    /// 分类名称
    pub name: String,
    /// 术语条目，按插入顺序排列
    pub terms: Vec<TermEntry>,
}

impl Category {
    /// 创建空分类
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            terms: Vec::new(),
        }
    }

    /// 插入条目，已存在同名 `original`（区分大小写）时忽略
    ///
    /// 返回是否发生了插入
    pub fn insert(&mut self, entry: TermEntry) -> bool {
        if self.terms.iter().any(|t| t.original == entry.original) {
            return false;
        }
        self.terms.push(entry);
        true
    }

    /// 译文待定的条目子集
    pub fn pending_terms(&self) -> Vec<TermEntry> {
        self.terms
            .iter()
            .filter(|t| t.is_pending())
            .cloned()
            .collect()
    }

    /// 按 `original` 合并译文，只更新翻译服务实际返回的条目
    ///
    /// 空译文不会覆盖已有译文，返回更新的条目数
    pub fn merge_translations(&mut self, translated: &[TermEntry]) -> usize {
        let mut updated = 0;

        for incoming in translated {
            if incoming.translated.is_empty() {
                continue;
            }
            if let Some(existing) = self
                .terms
                .iter_mut()
                .find(|t| t.original == incoming.original)
            {
                if existing.translated != incoming.translated {
                    existing.translated = incoming.translated.clone();
                    updated += 1;
                }
            }
        }

        updated
    }
}

/// 一个域名下的完整术语表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Glossary {
    /// 分类列表，保持插入顺序
    pub categories: Vec<Category>,
}

impl Glossary {
    /// 创建空术语表
    pub fn new() -> Self {
        Self::default()
    }

    /// 按名称查找分类
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// 按名称查找分类（可变引用），不存在时自动创建
    pub fn category_mut_or_create(&mut self, name: &str) -> &mut Category {
        if let Some(pos) = self.categories.iter().position(|c| c.name == name) {
            &mut self.categories[pos]
        } else {
            self.categories.push(Category::new(name));
            let last = self.categories.len() - 1;
            &mut self.categories[last]
        }
    }

    /// 向指定分类批量插入术语，返回实际插入的条目数
    ///
    /// 重复的 `original` 不计入返回值
    pub fn add_terms(&mut self, category_name: &str, entries: Vec<TermEntry>) -> usize {
        if entries.is_empty() {
            return 0;
        }

        let category = self.category_mut_or_create(category_name);
        let mut inserted = 0;
        for entry in entries {
            if category.insert(entry) {
                inserted += 1;
            }
        }
        inserted
    }

    /// 向 `General` 分类插入引擎发现的术语，返回实际插入的条目数
    pub fn add_general_terms(&mut self, entries: Vec<TermEntry>) -> usize {
        self.add_terms(GENERAL_CATEGORY, entries)
    }

    /// 术语总数
    pub fn total_terms(&self) -> usize {
        self.categories.iter().map(|c| c.terms.len()).sum()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.total_terms() == 0
    }

    /// 构建占位符替换上下文
    ///
    /// 只收录已有译文且译文不等于原文的条目，键为占位符名称。
    /// 同名占位符后出现的条目不覆盖先出现的。
    pub fn substitution_context(&self) -> HashMap<String, String> {
        let mut context = HashMap::new();

        for category in &self.categories {
            for term in &category.terms {
                if term.is_pending() || term.is_identity() || term.placeholder_name.is_empty() {
                    continue;
                }
                context
                    .entry(term.placeholder_name.clone())
                    .or_insert_with(|| term.translated.clone());
            }
        }

        context
    }
}

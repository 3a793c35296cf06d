//! 翻译服务能力接口
//!
//! 引擎只依赖翻译服务的输入输出契约，提示词构造、模型选择
//! 和网络协议均由实现方负责

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::EngineResult;
use crate::glossary::{Category, Glossary, TermEntry};

/// 翻译用量统计，在一个会话内单调累加
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUsage {
    /// 输入用量
    pub prompt_units: u64,
    /// 输出用量
    pub completion_units: u64,
    /// 总用量
    pub total_units: u64,
}

impl TranslationUsage {
    /// 创建用量记录
    pub fn new(prompt_units: u64, completion_units: u64) -> Self {
        Self {
            prompt_units,
            completion_units,
            total_units: prompt_units + completion_units,
        }
    }

    /// 累加另一份用量
    pub fn add(&mut self, other: &TranslationUsage) {
        self.prompt_units += other.prompt_units;
        self.completion_units += other.completion_units;
        self.total_units += other.total_units;
    }
}

/// 单个文本节点的翻译请求
#[derive(Clone)]
pub struct TextRequest {
    /// 当前节点文本
    pub current_text: String,
    /// 同级上下文文本（同父元素下的其他文本节点，文档序，最多取前几条）
    pub sibling_texts: Vec<String>,
    /// 整页文本列表，所有节点共享同一份
    pub page_texts: Arc<Vec<String>>,
    /// 术语表快照，供翻译服务作为上下文参考
    pub glossary: Glossary,
    /// 会话取消信号，实现方可借此提前中止请求
    pub cancel: CancellationToken,
}

/// 文本翻译结果
#[derive(Debug, Clone)]
pub struct TextResponse {
    /// 译文（可能包含术语占位符）
    pub translated_text: String,
    /// 本次翻译中发现的新术语
    pub new_terms: Vec<TermEntry>,
    /// 本次调用的用量
    pub usage: TranslationUsage,
}

/// 术语翻译结果
#[derive(Debug, Clone)]
pub struct TermsResponse {
    /// 翻译服务成功翻译的条目（可能是输入的子集）
    pub terms: Vec<TermEntry>,
    /// 本次调用的用量
    pub usage: TranslationUsage,
}

/// 翻译服务能力
///
/// 两个操作都可能失败（网络错误、中止等），引擎将失败视为
/// 节点级或分类级的局部错误，不会中止整个会话
#[async_trait(?Send)]
pub trait Translator {
    /// 翻译单个文本单元
    async fn translate_text(&self, request: TextRequest) -> EngineResult<TextResponse>;

    /// 批量翻译一个分类中的术语
    ///
    /// 入参只包含译文待定的条目；返回实现方实际完成翻译的条目
    async fn translate_terms(&self, category: &Category) -> EngineResult<TermsResponse>;
}

//! 翻译引擎配置管理模块
//!
//! 提供引擎运行参数和常量定义

use std::time::Duration;

/// 引擎配置常量
pub mod constants {
    /// 每批并发翻译的节点数上限
    pub const DEFAULT_BATCH_SIZE: usize = 5;

    /// 低于该长度（去除首尾空白后的字符数）的文本直接跳过
    pub const MIN_TEXT_LENGTH: usize = 2;

    /// 每个节点附带的同级上下文文本数量上限
    pub const SIBLING_CONTEXT_LIMIT: usize = 5;

    /// 单次翻译调用的默认超时
    pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

    /// 引擎自动维护的术语分类名称
    pub const GENERAL_CATEGORY: &str = "General";

    /// 不参与文本收集的元素标签
    pub const SKIP_ELEMENTS: &[&str] = &[
        "script", "style", "noscript", "textarea", "code", "pre", "button", "input", "select",
        "option",
    ];
}

/// 翻译引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 批次大小（批内节点并发翻译）
    pub batch_size: usize,
    /// 最小可翻译文本长度
    pub min_text_length: usize,
    /// 同级上下文文本数量上限
    pub sibling_context_limit: usize,
    /// 单次翻译调用超时
    pub call_timeout: Duration,
    /// 跳过收集的元素标签
    pub skip_elements: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: constants::DEFAULT_BATCH_SIZE,
            min_text_length: constants::MIN_TEXT_LENGTH,
            sibling_context_limit: constants::SIBLING_CONTEXT_LIMIT,
            call_timeout: Duration::from_secs(constants::DEFAULT_CALL_TIMEOUT_SECS),
            skip_elements: constants::SKIP_ELEMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    /// 创建指定批次大小的配置
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            ..Default::default()
        }
    }

    /// 设置单次调用超时
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// 检查标签是否在跳过列表中
    pub fn should_skip_element(&self, tag_name: &str) -> bool {
        self.skip_elements
            .iter()
            .any(|skip| skip == &tag_name.to_lowercase())
    }
}

//! 翻译引擎统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use thiserror::Error;

/// 翻译引擎错误类型
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// 翻译服务错误（网络、模型拒绝等）
    #[error("翻译服务错误: {0}")]
    Translator(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 会话已被取消
    #[error("翻译会话已取消")]
    Cancelled,

    /// 持久化存储错误
    #[error("存储错误: {0}")]
    Storage(String),

    /// 文本收集错误
    #[error("文本收集错误: {0}")]
    Collection(String),

    /// 占位符渲染错误（严格模式下缺失的标识符）
    #[error("占位符缺失: {missing:?}")]
    MissingPlaceholders { missing: Vec<String> },

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl EngineError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Translator(_) | EngineError::Timeout(_) | EngineError::Storage(_)
        )
    }

    /// 检查错误是否为节点级错误（不应中止整个会话）
    pub fn is_node_local(&self) -> bool {
        matches!(self, EngineError::Translator(_) | EngineError::Timeout(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::Serialization(format!("JSON序列化错误: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for EngineError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        EngineError::Timeout(format!("异步操作超时: {}", error))
    }
}

/// 错误结果类型别名
pub type EngineResult<T> = Result<T, EngineError>;

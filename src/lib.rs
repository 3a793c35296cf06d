//! # Weblingo
//!
//! 增量式网页翻译引擎：收集页面中可翻译的文本节点，分批驱动外部
//! 翻译服务完成翻译，维护按域名组织的术语表，并支持随时无损还原
//! 原始页面内容。
//!
//! ## 模块组织
//!
//! - `engine` - 翻译引擎（节点收集、DOM 标记、会话编排）
//! - `glossary` - 域名级术语表
//! - `template` - 术语占位符替换渲染器
//! - `translator` - 翻译服务能力接口
//! - `storage` - 术语表持久化存储能力
//! - `html` - HTML DOM 基础操作
//! - `config` - 引擎配置
//! - `error` - 错误处理
//!
//! ## 基本用法
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weblingo::{EngineConfig, Glossary, PageTranslator};
//! # use weblingo::Translator;
//!
//! # async fn example(translator: Arc<dyn Translator>) -> Result<(), Box<dyn std::error::Error>> {
//! let dom = weblingo::html::html_to_dom(b"<p>Hello</p>", "utf-8");
//!
//! let engine = PageTranslator::new(
//!     translator,
//!     Glossary::new(),
//!     "example.com",
//!     EngineConfig::default(),
//! );
//!
//! let outcome = engine.start_session(&dom.document, None).await?;
//! println!("翻译完成，累计用量 {}", outcome.usage.total_units);
//!
//! // 随时可以还原原始内容
//! engine.restore(&dom.document);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod glossary;
pub mod html;
pub mod storage;
pub mod template;
pub mod translator;
pub mod utils;

pub use config::{constants, EngineConfig};
pub use engine::{
    NoShadowRoots, PageTranslator, ProgressSnapshot, SessionOutcome, SessionState, ShadowRoots,
    TextCollector, TranslatableNode,
};
pub use error::{EngineError, EngineResult};
pub use glossary::{Category, Glossary, TermEntry};
pub use storage::{GlossaryEvent, GlossaryStore, MemoryGlossaryStore};
pub use translator::{TermsResponse, TextRequest, TextResponse, TranslationUsage, Translator};
pub use utils::registrable_domain;

/// 检查文本是否值得翻译（便利函数）
///
/// 去除空白后非空且至少包含一个字母时返回 `true`
///
/// # Examples
///
/// ```rust
/// assert!(weblingo::should_translate("Hello World"));
/// assert!(!weblingo::should_translate("123"));
/// assert!(!weblingo::should_translate("   "));
/// ```
pub fn should_translate(text: &str) -> bool {
    engine::collector::is_translatable_text(text)
}

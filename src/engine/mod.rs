//! 页面翻译引擎
//!
//! 三层结构：
//! - **collector**: 从 DOM 中收集可翻译文本节点
//! - **marking**: DOM 写入、翻译标记与还原
//! - **session**: 会话编排（分批翻译、术语收敛、进度上报、取消）

pub mod collector;
pub mod marking;
pub mod session;

pub use collector::{NoShadowRoots, ShadowRoots, TextCollector, TranslatableNode};
pub use session::{
    PageTranslator, ProgressSnapshot, SessionOutcome, SessionState, SessionStats,
    SessionStatsSnapshot,
};

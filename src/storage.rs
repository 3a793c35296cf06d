//! 术语表持久化存储能力
//!
//! 存储按域名保存术语表，并在每次成功写入后广播变更事件，
//! 供同域名的其他活动会话刷新

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{EngineError, EngineResult};
use crate::glossary::Glossary;

/// 术语表变更事件
#[derive(Debug, Clone)]
pub struct GlossaryEvent {
    /// 发生变更的域名
    pub domain: String,
}

/// 术语表持久化存储能力
///
/// 引擎将持久化视为尽力而为：写入失败只记录日志，不影响
/// 内存中术语表的继续使用
#[async_trait(?Send)]
pub trait GlossaryStore {
    /// 读取指定域名的术语表
    async fn get_glossary(&self, domain: &str) -> EngineResult<Option<Glossary>>;

    /// 写入指定域名的术语表，成功后广播变更事件
    async fn set_glossary(&self, domain: &str, glossary: &Glossary) -> EngineResult<()>;

    /// 订阅术语表变更事件
    fn subscribe(&self) -> broadcast::Receiver<GlossaryEvent>;
}

/// 内存实现，用于测试和嵌入场景
///
/// 术语表以 JSON 形式存储，验证持久化路径的可序列化性
pub struct MemoryGlossaryStore {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<GlossaryEvent>,
}

impl MemoryGlossaryStore {
    /// 创建空存储
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// 存储的域名数量
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryGlossaryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl GlossaryStore for MemoryGlossaryStore {
    async fn get_glossary(&self, domain: &str) -> EngineResult<Option<Glossary>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| EngineError::Storage(format!("存储锁异常: {}", e)))?;

        match entries.get(domain) {
            Some(json) => {
                let glossary: Glossary = serde_json::from_str(json)?;
                Ok(Some(glossary))
            }
            None => Ok(None),
        }
    }

    async fn set_glossary(&self, domain: &str, glossary: &Glossary) -> EngineResult<()> {
        let json = serde_json::to_string(glossary)?;

        {
            let mut entries = self
                .entries
                .lock()
                .map_err(|e| EngineError::Storage(format!("存储锁异常: {}", e)))?;
            entries.insert(domain.to_string(), json);
        }

        // 没有订阅者时发送失败是正常情况
        let _ = self.events.send(GlossaryEvent {
            domain: domain.to_string(),
        });

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<GlossaryEvent> {
        self.events.subscribe()
    }
}

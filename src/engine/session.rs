//! 翻译会话编排器
//!
//! 整页翻译的有状态引擎：分批驱动节点翻译、吸收翻译中途发现的
//! 术语、触发术语翻译、在术语表变化后向已翻译内容回写替换结果，
//! 并在会话结束时返回完整术语表和累计用量。
//!
//! 并发模型：批次之间串行，批内节点并发发起、共同等待（fan-out /
//! fan-in），峰值并发请求数等于批次大小。取消是协作式的：在批次
//! 边界和节点调用发起前检查；已发出的调用不被强制中断，其结果在
//! 消费端被丢弃。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use markup5ever_rcdom::{Handle, NodeData};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::config::{constants::GENERAL_CATEGORY, EngineConfig};
use crate::engine::collector::{NoShadowRoots, ShadowRoots, TextCollector, TranslatableNode};
use crate::engine::marking;
use crate::error::{EngineError, EngineResult};
use crate::glossary::{Category, Glossary};
use crate::html::{serialize_inner, text_content};
use crate::storage::GlossaryStore;
use crate::translator::{TextRequest, TranslationUsage, Translator};

/// 会话状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 空闲，未开始或已还原
    Idle,
    /// 收集可翻译节点
    Collecting,
    /// 分批翻译节点
    BatchTranslating,
    /// 末尾术语对账
    TermReconciliation,
    /// 全局回写替换
    Finalizing,
    /// 会话正常结束
    Done,
    /// 会话被取消
    Cancelled,
}

/// 进度快照，每处理完一个节点发出一条
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// 已处理节点数
    pub completed: usize,
    /// 节点总数，同一会话内恒定
    pub total: usize,
    /// 当前节点原文
    pub current_text: Option<String>,
    /// 当前节点译文
    pub translated_text: Option<String>,
    /// 节点级错误信息
    pub error: Option<String>,
    /// 截至当前的累计用量
    pub usage: TranslationUsage,
}

/// 会话最终结果
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// 会话结束时的完整术语表
    pub glossary: Glossary,
    /// 会话累计用量
    pub usage: TranslationUsage,
    /// 已处理节点数
    pub completed: usize,
    /// 节点总数
    pub total: usize,
    /// 会话是否因取消提前结束
    pub cancelled: bool,
}

/// 单个节点的处理结果
enum NodeOutcome {
    /// 文本过短，原样跳过
    Skipped,
    /// 翻译成功并已写入 DOM，槽位供术语表更新后重渲染
    Translated {
        translated_text: String,
        usage: TranslationUsage,
        slot: marking::RenderedSlot,
    },
    /// 节点级失败，节点保持未翻译
    Failed { error: String },
    /// 取消后丢弃的结果，节点未被触碰
    Cancelled,
}

/// 会话统计信息（线程安全）
#[derive(Debug, Default)]
pub struct SessionStats {
    /// 收集到的节点总数
    pub nodes_collected: AtomicUsize,
    /// 翻译成功的节点数
    pub nodes_translated: AtomicUsize,
    /// 因过短跳过的节点数
    pub nodes_skipped: AtomicUsize,
    /// 翻译失败的节点数
    pub nodes_failed: AtomicUsize,
    /// 会话中发现的新术语数
    pub terms_discovered: AtomicUsize,
    /// 持久化失败次数
    pub persistence_failures: AtomicUsize,
}

impl SessionStats {
    /// 重置所有计数器
    pub fn reset(&self) {
        self.nodes_collected.store(0, Ordering::Relaxed);
        self.nodes_translated.store(0, Ordering::Relaxed);
        self.nodes_skipped.store(0, Ordering::Relaxed);
        self.nodes_failed.store(0, Ordering::Relaxed);
        self.terms_discovered.store(0, Ordering::Relaxed);
        self.persistence_failures.store(0, Ordering::Relaxed);
    }

    /// 获取一致性快照
    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            nodes_collected: self.nodes_collected.load(Ordering::Relaxed),
            nodes_translated: self.nodes_translated.load(Ordering::Relaxed),
            nodes_skipped: self.nodes_skipped.load(Ordering::Relaxed),
            nodes_failed: self.nodes_failed.load(Ordering::Relaxed),
            terms_discovered: self.terms_discovered.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

/// 会话统计快照
#[derive(Debug, Clone, Copy)]
pub struct SessionStatsSnapshot {
    pub nodes_collected: usize,
    pub nodes_translated: usize,
    pub nodes_skipped: usize,
    pub nodes_failed: usize,
    pub terms_discovered: usize,
    pub persistence_failures: usize,
}

/// 整页翻译引擎
///
/// 一个实例绑定一个域名及其术语表；每次 [`start_session`] 调用
/// 构成一个独立会话。公开操作只有三个：`start_session`、
/// `cancel_session` 和 `restore`。
///
/// [`start_session`]: PageTranslator::start_session
pub struct PageTranslator {
    translator: Arc<dyn Translator>,
    store: Option<Arc<dyn GlossaryStore>>,
    config: EngineConfig,
    domain: String,
    glossary: Arc<Mutex<Glossary>>,
    cancel: Mutex<CancellationToken>,
    state: Mutex<SessionState>,
    stats: SessionStats,
}

impl PageTranslator {
    /// 创建引擎实例
    ///
    /// `seed` 为该域名此前持久化的术语表（没有则传空表）
    pub fn new(
        translator: Arc<dyn Translator>,
        seed: Glossary,
        domain: &str,
        config: EngineConfig,
    ) -> Self {
        Self {
            translator,
            store: None,
            config,
            domain: domain.to_string(),
            glossary: Arc::new(Mutex::new(seed)),
            cancel: Mutex::new(CancellationToken::new()),
            state: Mutex::new(SessionState::Idle),
            stats: SessionStats::default(),
        }
    }

    /// 附加持久化存储，新术语入表和译文更新时回写
    pub fn with_store(mut self, store: Arc<dyn GlossaryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 从存储加载种子术语表并创建引擎
    pub async fn for_domain(
        translator: Arc<dyn Translator>,
        store: Arc<dyn GlossaryStore>,
        domain: &str,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let seed = store.get_glossary(domain).await?.unwrap_or_default();
        Ok(Self::new(translator, seed, domain, config).with_store(store))
    }

    /// 当前会话状态
    pub fn state(&self) -> SessionState {
        self.state.lock().map(|s| *s).unwrap_or(SessionState::Idle)
    }

    /// 会话统计信息
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// 当前术语表快照
    pub fn glossary(&self) -> Glossary {
        self.glossary.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// 取消当前会话
    ///
    /// 协作式取消：进行中的批次允许结束（结果被丢弃），后续批次
    /// 不再开始；未处理的节点保持原样，下次会话可继续
    pub fn cancel_session(&self) {
        if let Ok(token) = self.cancel.lock() {
            tracing::info!("翻译会话收到取消请求");
            token.cancel();
        }
    }

    /// 还原根元素下所有已翻译内容，返回还原的元素数
    pub fn restore(&self, root: &Handle) -> usize {
        let restored = marking::restore(root);
        marking::set_session_complete(root, false);
        self.set_state(SessionState::Idle);
        if restored > 0 {
            tracing::info!("已还原 {} 个已翻译元素", restored);
        }
        restored
    }

    /// 启动一次翻译会话（不含影子子树）
    pub async fn start_session(
        &self,
        root: &Handle,
        progress: Option<UnboundedSender<ProgressSnapshot>>,
    ) -> EngineResult<SessionOutcome> {
        self.start_session_with_shadow(root, &NoShadowRoots, progress)
            .await
    }

    /// 启动一次翻译会话，影子子树由提供者给出
    pub async fn start_session_with_shadow(
        &self,
        root: &Handle,
        shadow: &dyn ShadowRoots,
        progress: Option<UnboundedSender<ProgressSnapshot>>,
    ) -> EngineResult<SessionOutcome> {
        self.stats.reset();
        let cancel = self.fresh_cancellation();

        // 上一个会话中断留下的标记先行还原，保证幂等重入
        if !marking::is_session_complete(root) {
            let stale = marking::restore(root);
            if stale > 0 {
                tracing::info!("还原上次中断会话遗留的 {} 个已翻译元素", stale);
            }
        }
        marking::set_session_complete(root, false);

        self.set_state(SessionState::Collecting);
        let collector = TextCollector::new(&self.config);
        let nodes = collector.collect(root, shadow);
        let total = nodes.len();
        self.stats.nodes_collected.store(total, Ordering::Relaxed);
        tracing::info!("本次会话收集到 {} 个可翻译节点", total);

        // 整页文本列表只计算一次，所有节点调用共享
        let page_texts: Arc<Vec<String>> =
            Arc::new(nodes.iter().map(|n| n.text.trim().to_string()).collect());

        let mut usage = TranslationUsage::default();
        let mut completed = 0usize;

        self.emit(&progress, ProgressSnapshot {
            completed: 0,
            total,
            current_text: None,
            translated_text: None,
            error: None,
            usage,
        });

        if total == 0 {
            marking::set_session_complete(root, true);
            self.set_state(SessionState::Done);
            return Ok(SessionOutcome {
                glossary: self.glossary(),
                usage,
                completed: 0,
                total: 0,
                cancelled: false,
            });
        }

        self.set_state(SessionState::BatchTranslating);
        let mut cancelled = false;
        let mut slots: Vec<marking::RenderedSlot> = Vec::new();

        for (batch_index, batch) in nodes.chunks(self.config.batch_size).enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            tracing::debug!("开始处理批次 {}（{} 个节点）", batch_index + 1, batch.len());

            let futures = batch
                .iter()
                .map(|node| self.translate_node(node, Arc::clone(&page_texts), cancel.clone()));
            let outcomes = join_all(futures).await;

            // 快照按节点原始顺序发出，与并发完成顺序无关
            for (node, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    NodeOutcome::Skipped => {
                        completed += 1;
                        self.stats.nodes_skipped.fetch_add(1, Ordering::Relaxed);
                        self.emit(&progress, ProgressSnapshot {
                            completed,
                            total,
                            current_text: Some(node.text.clone()),
                            translated_text: None,
                            error: None,
                            usage,
                        });
                    }
                    NodeOutcome::Translated {
                        translated_text,
                        usage: delta,
                        slot,
                    } => {
                        completed += 1;
                        usage.add(&delta);
                        slots.push(slot);
                        self.stats.nodes_translated.fetch_add(1, Ordering::Relaxed);
                        self.emit(&progress, ProgressSnapshot {
                            completed,
                            total,
                            current_text: Some(node.text.clone()),
                            translated_text: Some(translated_text),
                            error: None,
                            usage,
                        });
                    }
                    NodeOutcome::Failed { error } => {
                        completed += 1;
                        self.stats.nodes_failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("节点翻译失败: {}", error);
                        self.emit(&progress, ProgressSnapshot {
                            completed,
                            total,
                            current_text: Some(node.text.clone()),
                            translated_text: None,
                            error: Some(error),
                            usage,
                        });
                    }
                    NodeOutcome::Cancelled => {}
                }
            }

            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
        }

        if cancelled {
            self.set_state(SessionState::Cancelled);
            tracing::info!("翻译会话已取消：处理 {}/{} 个节点", completed, total);
            return Ok(SessionOutcome {
                glossary: self.glossary(),
                usage,
                completed,
                total,
                cancelled: true,
            });
        }

        // 末尾对账：补翻所有分类中仍然待定的术语（含种子术语表中
        // 从未翻译过的条目），分类级失败只记录不中止
        self.set_state(SessionState::TermReconciliation);
        let category_names: Vec<String> = {
            let glossary = self.lock_glossary()?;
            glossary.categories.iter().map(|c| c.name.clone()).collect()
        };
        for name in category_names {
            if cancel.is_cancelled() {
                self.set_state(SessionState::Cancelled);
                return Ok(SessionOutcome {
                    glossary: self.glossary(),
                    usage,
                    completed,
                    total,
                    cancelled: true,
                });
            }
            if let Some(delta) = self.reconcile_category(&name).await {
                usage.add(&delta);
            }
        }

        // 全局回写：晚发现的术语也要更新此前已翻译的文本位置
        self.set_state(SessionState::Finalizing);
        let final_glossary = self.glossary();
        for slot in slots.iter_mut() {
            slot.rerender(&final_glossary);
        }

        marking::set_session_complete(root, true);
        self.set_state(SessionState::Done);
        tracing::info!(
            "翻译会话完成：{}/{} 个节点，累计用量 {}",
            completed,
            total,
            usage.total_units
        );

        Ok(SessionOutcome {
            glossary: final_glossary,
            usage,
            completed,
            total,
            cancelled: false,
        })
    }

    /// 处理单个节点：翻译、吸收新术语、写入 DOM 并标记
    async fn translate_node(
        &self,
        node: &TranslatableNode,
        page_texts: Arc<Vec<String>>,
        cancel: CancellationToken,
    ) -> NodeOutcome {
        let trimmed = node.text.trim();
        if trimmed.chars().count() < self.config.min_text_length {
            return NodeOutcome::Skipped;
        }

        if cancel.is_cancelled() {
            return NodeOutcome::Cancelled;
        }

        let glossary_snapshot = match self.lock_glossary() {
            Ok(glossary) => glossary.clone(),
            Err(e) => return NodeOutcome::Failed { error: e.to_string() },
        };

        let request = TextRequest {
            current_text: trimmed.to_string(),
            sibling_texts: node.sibling_texts(self.config.sibling_context_limit),
            page_texts,
            glossary: glossary_snapshot,
            cancel: cancel.clone(),
        };

        let call = self.translator.translate_text(request);
        let response = tokio::select! {
            () = cancel.cancelled() => return NodeOutcome::Cancelled,
            result = tokio::time::timeout(self.config.call_timeout, call) => match result {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return NodeOutcome::Failed { error: e.to_string() },
                Err(elapsed) => {
                    return NodeOutcome::Failed {
                        error: EngineError::from(elapsed).to_string(),
                    }
                }
            },
        };

        let mut usage = response.usage;

        // 新术语立即入表并尽早翻译，让术语表在会话中途就收敛
        if !response.new_terms.is_empty() {
            let inserted = match self.lock_glossary() {
                Ok(mut glossary) => glossary.add_general_terms(response.new_terms.clone()),
                Err(e) => {
                    tracing::warn!("术语入表失败: {}", e);
                    0
                }
            };

            if inserted > 0 {
                self.stats
                    .terms_discovered
                    .fetch_add(inserted, Ordering::Relaxed);
                self.persist_glossary().await;
                if let Some(delta) = self.reconcile_category(GENERAL_CATEGORY).await {
                    usage.add(&delta);
                }
            }
        }

        // 原始内容必须在首次改写前捕获
        let (original, original_rich) = capture_element_content(&node.element);

        // 槽位持有含占位符的译文模板，只改写自己的文本位置
        let mut slot =
            marking::RenderedSlot::new(&node.element, &node.text_node, &response.translated_text);
        slot.rerender(&self.glossary());
        marking::mark_translated(&node.element, &original, original_rich);

        NodeOutcome::Translated {
            translated_text: response.translated_text,
            usage,
            slot,
        }
    }

    /// 补翻一个分类中译文待定的术语
    ///
    /// 返回本次调用的用量；无待定条目或失败时返回 `None`
    async fn reconcile_category(&self, name: &str) -> Option<TranslationUsage> {
        let pending = {
            let glossary = self.lock_glossary().ok()?;
            glossary
                .category(name)
                .map(|c| c.pending_terms())
                .unwrap_or_default()
        };

        if pending.is_empty() {
            return None;
        }

        let request_category = Category {
            name: name.to_string(),
            terms: pending,
        };

        match self.translator.translate_terms(&request_category).await {
            Ok(response) => {
                let updated = match self.lock_glossary() {
                    Ok(mut glossary) => glossary
                        .category_mut_or_create(name)
                        .merge_translations(&response.terms),
                    Err(e) => {
                        tracing::warn!("术语译文合并失败: {}", e);
                        0
                    }
                };

                if updated > 0 {
                    tracing::debug!("分类 {} 更新了 {} 条术语译文", name, updated);
                    self.persist_glossary().await;
                }
                Some(response.usage)
            }
            Err(e) => {
                tracing::warn!("分类 {} 术语翻译失败: {}", name, e);
                None
            }
        }
    }

    /// 持久化术语表，失败只记录日志
    async fn persist_glossary(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let glossary = self.glossary();
        if let Err(e) = store.set_glossary(&self.domain, &glossary).await {
            self.stats
                .persistence_failures
                .fetch_add(1, Ordering::Relaxed);
            tracing::warn!("术语表持久化失败（继续使用内存副本）: {}", e);
        }
    }

    fn lock_glossary(&self) -> EngineResult<std::sync::MutexGuard<'_, Glossary>> {
        self.glossary
            .lock()
            .map_err(|e| EngineError::Internal(format!("术语表锁异常: {}", e)))
    }

    fn fresh_cancellation(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut current) = self.cancel.lock() {
            *current = token.clone();
        }
        token
    }

    fn set_state(&self, state: SessionState) {
        if let Ok(mut current) = self.state.lock() {
            tracing::debug!("会话状态: {:?} -> {:?}", *current, state);
            *current = state;
        }
    }

    fn emit(&self, progress: &Option<UnboundedSender<ProgressSnapshot>>, snapshot: ProgressSnapshot) {
        if let Some(sender) = progress {
            // 接收端关闭不影响会话
            let _ = sender.send(snapshot);
        }
    }
}

/// 捕获元素当前内容及其粒度
///
/// 含子元素时取序列化的内部标记（富文本粒度），否则取纯文本
fn capture_element_content(element: &Handle) -> (String, bool) {
    let has_element_children = element
        .children
        .borrow()
        .iter()
        .any(|child| matches!(child.data, NodeData::Element { .. }));

    if has_element_children {
        match serialize_inner(element) {
            Ok(html) => (html, true),
            Err(e) => {
                tracing::warn!("元素内容序列化失败，退回纯文本粒度: {}", e);
                (text_content(element), false)
            }
        }
    } else {
        (text_content(element), false)
    }
}

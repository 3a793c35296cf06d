// 集成测试公共模块
//
// 提供脚本化的模拟翻译服务和 DOM 测试辅助工具

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use markup5ever_rcdom::{Handle, RcDom};

use weblingo::error::{EngineError, EngineResult};
use weblingo::glossary::{Category, TermEntry};
use weblingo::html::{get_child_node_by_name, html_to_dom, text_content};
use weblingo::translator::{
    TermsResponse, TextRequest, TextResponse, TranslationUsage, Translator,
};

/// 初始化测试日志输出，重复调用安全
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// 每次文本翻译调用上报的用量
pub const TEXT_USAGE: (u64, u64) = (10, 5);
/// 每次术语翻译调用上报的用量
pub const TERM_USAGE: (u64, u64) = (3, 2);

/// 针对单个原文的脚本化应答
#[derive(Clone, Default)]
pub struct TextRule {
    pub translated: String,
    pub new_terms: Vec<TermEntry>,
}

/// 脚本化的模拟翻译服务
///
/// 未配置规则的文本返回 `[T] <原文>`；术语翻译按译文表回填，
/// 表中没有的术语回显 `<原文>-译`
#[derive(Default)]
pub struct MockTranslator {
    pub text_calls: AtomicUsize,
    pub term_calls: AtomicUsize,
    rules: Mutex<HashMap<String, TextRule>>,
    term_translations: Mutex<HashMap<String, String>>,
    fail_texts: Mutex<HashSet<String>>,
    /// 从第 N 次文本调用（1起）开始永不返回
    hang_from_call: Option<usize>,
    /// 术语翻译始终失败
    fail_terms: bool,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为指定原文配置应答
    pub fn with_rule(self, text: &str, translated: &str, new_terms: Vec<TermEntry>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.insert(
                text.to_string(),
                TextRule {
                    translated: translated.to_string(),
                    new_terms,
                },
            );
        }
        self
    }

    /// 配置术语译文
    pub fn with_term_translation(self, original: &str, translated: &str) -> Self {
        if let Ok(mut table) = self.term_translations.lock() {
            table.insert(original.to_string(), translated.to_string());
        }
        self
    }

    /// 指定原文的翻译调用直接失败
    pub fn with_failing_text(self, text: &str) -> Self {
        if let Ok(mut fails) = self.fail_texts.lock() {
            fails.insert(text.to_string());
        }
        self
    }

    /// 从第 N 次文本调用开始挂起不返回
    pub fn hang_from(mut self, call: usize) -> Self {
        self.hang_from_call = Some(call);
        self
    }

    /// 术语翻译始终失败
    pub fn failing_terms(mut self) -> Self {
        self.fail_terms = true;
        self
    }
}

#[async_trait(?Send)]
impl Translator for MockTranslator {
    async fn translate_text(&self, request: TextRequest) -> EngineResult<TextResponse> {
        let call = self.text_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(hang) = self.hang_from_call {
            if call >= hang {
                futures::future::pending::<()>().await;
            }
        }

        if let Ok(fails) = self.fail_texts.lock() {
            if fails.contains(&request.current_text) {
                return Err(EngineError::Translator("模拟网络错误".to_string()));
            }
        }

        let rule = self
            .rules
            .lock()
            .ok()
            .and_then(|rules| rules.get(&request.current_text).cloned());

        let (translated_text, new_terms) = match rule {
            Some(rule) => (rule.translated, rule.new_terms),
            None => (format!("[T] {}", request.current_text), Vec::new()),
        };

        Ok(TextResponse {
            translated_text,
            new_terms,
            usage: TranslationUsage::new(TEXT_USAGE.0, TEXT_USAGE.1),
        })
    }

    async fn translate_terms(&self, category: &Category) -> EngineResult<TermsResponse> {
        self.term_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_terms {
            return Err(EngineError::Translator("模拟术语翻译失败".to_string()));
        }

        let table = self
            .term_translations
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default();

        let terms = category
            .terms
            .iter()
            .map(|term| {
                let mut term = term.clone();
                term.translated = table
                    .get(&term.original)
                    .cloned()
                    .unwrap_or_else(|| format!("{}-译", term.original));
                term
            })
            .collect();

        Ok(TermsResponse {
            terms,
            usage: TranslationUsage::new(TERM_USAGE.0, TERM_USAGE.1),
        })
    }
}

/// 构建待定状态的术语条目
pub fn pending_term(original: &str, placeholder: &str) -> TermEntry {
    TermEntry::pending(original, "测试术语", placeholder)
}

/// 解析测试页面
pub fn parse_page(html: &str) -> RcDom {
    html_to_dom(html.as_bytes(), "utf-8")
}

/// 获取文档的 body 元素
pub fn body(dom: &RcDom) -> Handle {
    let html = get_child_node_by_name(&dom.document, "html").expect("document should have <html>");
    get_child_node_by_name(&html, "body").expect("document should have <body>")
}

/// 文档全文文本
pub fn page_text(dom: &RcDom) -> String {
    text_content(&dom.document)
}

/// 生成含 N 个段落的页面
pub fn page_with_paragraphs(count: usize) -> String {
    let mut html = String::from("<html><body>");
    for i in 0..count {
        html.push_str(&format!("<p>paragraph number {}</p>", i));
    }
    html.push_str("</body></html>");
    html
}

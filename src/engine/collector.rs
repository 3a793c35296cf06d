//! DOM 文本节点收集器
//!
//! 遍历根元素（含宿主元素挂载的影子子树），按文档序产出
//! 符合条件的可翻译文本节点。每次调用都重新计算，不保留游标。

use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::config::EngineConfig;
use crate::engine::marking;

/// 一个可翻译的文本位置
#[derive(Clone)]
pub struct TranslatableNode {
    /// 文本节点本身
    pub text_node: Handle,
    /// 所属元素，用于标记和还原
    pub element: Handle,
    /// 收集时的原始文本
    pub text: String,
}

impl TranslatableNode {
    /// 同父元素下的其他文本节点内容，文档序，最多 `limit` 条
    pub fn sibling_texts(&self, limit: usize) -> Vec<String> {
        self.element
            .children
            .borrow()
            .iter()
            .filter(|child| !Rc::ptr_eq(child, &self.text_node))
            .filter_map(|child| match child.data {
                NodeData::Text { ref contents } => {
                    let text = contents.borrow().to_string();
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed.to_string())
                    }
                }
                _ => None,
            })
            .take(limit)
            .collect()
    }
}

/// 影子子树提供者
///
/// 浏览器环境下返回元素挂载的影子根；纯 DOM 场景使用
/// [`NoShadowRoots`] 即可
pub trait ShadowRoots {
    /// 返回元素额外挂载的子树根
    fn roots(&self, element: &Handle) -> Vec<Handle>;
}

/// 无影子子树的默认提供者
pub struct NoShadowRoots;

impl ShadowRoots for NoShadowRoots {
    fn roots(&self, _element: &Handle) -> Vec<Handle> {
        Vec::new()
    }
}

/// DOM 文本收集器
pub struct TextCollector<'a> {
    config: &'a EngineConfig,
}

impl<'a> TextCollector<'a> {
    /// 创建收集器
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// 收集根元素下全部可翻译文本节点
    ///
    /// 顺序为深度优先文档序；宿主元素的影子子树在其光明 DOM
    /// 子节点遍历完毕后追加
    pub fn collect(&self, root: &Handle, shadow: &dyn ShadowRoots) -> Vec<TranslatableNode> {
        let mut nodes = Vec::new();
        self.walk(root, None, shadow, &mut nodes);
        nodes
    }

    fn walk(
        &self,
        node: &Handle,
        parent_element: Option<&Handle>,
        shadow: &dyn ShadowRoots,
        out: &mut Vec<TranslatableNode>,
    ) {
        match node.data {
            NodeData::Text { ref contents } => {
                let Some(element) = parent_element else {
                    return;
                };
                if marking::is_marked_translated(element) {
                    return;
                }

                let text = contents.borrow().to_string();
                if is_translatable_text(&text) {
                    out.push(TranslatableNode {
                        text_node: node.clone(),
                        element: element.clone(),
                        text,
                    });
                }
            }
            NodeData::Element { ref name, .. } => {
                if self.config.should_skip_element(name.local.as_ref()) {
                    return;
                }

                for child in node.children.borrow().iter() {
                    self.walk(child, Some(node), shadow, out);
                }

                for shadow_root in shadow.roots(node) {
                    self.walk(&shadow_root, Some(node), shadow, out);
                }
            }
            _ => {
                for child in node.children.borrow().iter() {
                    self.walk(child, parent_element, shadow, out);
                }
            }
        }
    }
}

/// 文本是否值得收集：去除空白后非空且至少包含一个字母
pub fn is_translatable_text(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.chars().any(|c| c.is_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{get_child_node_by_name, html_to_dom, set_node_attr};

    fn collect_texts(html: &str) -> Vec<String> {
        let dom = html_to_dom(html.as_bytes(), "utf-8");
        let config = EngineConfig::default();
        let collector = TextCollector::new(&config);
        collector
            .collect(&dom.document, &NoShadowRoots)
            .iter()
            .map(|n| n.text.trim().to_string())
            .collect()
    }

    #[test]
    fn document_order_is_preserved() {
        let texts = collect_texts("<html><body><div>A<p>B</p></div></body></html>");
        assert_eq!(texts, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn skip_tags_are_excluded() {
        let texts = collect_texts(
            "<html><body><p>keep</p><script>var x = 1;</script>\
             <pre>formatted</pre><button>Click</button></body></html>",
        );
        assert_eq!(texts, vec!["keep".to_string()]);
    }

    #[test]
    fn non_alphabetic_text_is_excluded() {
        let texts =
            collect_texts("<html><body><p>123</p><p>...</p><p>  </p><p>ok</p></body></html>");
        assert_eq!(texts, vec!["ok".to_string()]);
    }

    #[test]
    fn marked_elements_are_not_recollected() {
        let dom = html_to_dom(
            b"<html><body><p>first</p><p>second</p></body></html>",
            "utf-8",
        );
        let html = get_child_node_by_name(&dom.document, "html").unwrap();
        let body = get_child_node_by_name(&html, "body").unwrap();
        let first = get_child_node_by_name(&body, "p").unwrap();
        set_node_attr(&first, "data-translated", Some("true".to_string()));

        let config = EngineConfig::default();
        let collector = TextCollector::new(&config);
        let nodes = collector.collect(&dom.document, &NoShadowRoots);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text, "second");
    }

    #[test]
    fn explicit_false_mark_is_eligible_again() {
        let dom = html_to_dom(b"<html><body><p>text</p></body></html>", "utf-8");
        let html = get_child_node_by_name(&dom.document, "html").unwrap();
        let body = get_child_node_by_name(&html, "body").unwrap();
        let p = get_child_node_by_name(&body, "p").unwrap();
        set_node_attr(&p, "data-translated", Some("false".to_string()));

        let config = EngineConfig::default();
        let collector = TextCollector::new(&config);
        assert_eq!(collector.collect(&dom.document, &NoShadowRoots).len(), 1);
    }

    #[test]
    fn sibling_texts_exclude_self_and_cap() {
        let dom = html_to_dom(
            b"<html><body><p>a<b>x</b>b<b>y</b>c</p></body></html>",
            "utf-8",
        );
        let config = EngineConfig::default();
        let collector = TextCollector::new(&config);
        let nodes = collector.collect(&dom.document, &NoShadowRoots);

        let first = nodes
            .iter()
            .find(|n| n.text == "a")
            .expect("node 'a' should be collected");
        assert_eq!(
            first.sibling_texts(5),
            vec!["b".to_string(), "c".to_string()]
        );
        assert_eq!(first.sibling_texts(1), vec!["b".to_string()]);
    }

    #[test]
    fn shadow_roots_are_appended_after_light_dom() {
        let dom = html_to_dom(b"<html><body><div>light</div></body></html>", "utf-8");
        let shadow_dom = html_to_dom(b"<html><body><p>shadow</p></body></html>", "utf-8");
        let shadow_html = get_child_node_by_name(&shadow_dom.document, "html").unwrap();
        let shadow_body = get_child_node_by_name(&shadow_html, "body").unwrap();

        struct DivShadow {
            body: Handle,
        }
        impl ShadowRoots for DivShadow {
            fn roots(&self, element: &Handle) -> Vec<Handle> {
                if crate::html::get_node_name(element) == Some("div") {
                    vec![self.body.clone()]
                } else {
                    Vec::new()
                }
            }
        }

        let config = EngineConfig::default();
        let collector = TextCollector::new(&config);
        let texts: Vec<String> = collector
            .collect(&dom.document, &DivShadow { body: shadow_body })
            .iter()
            .map(|n| n.text.trim().to_string())
            .collect();

        assert_eq!(texts, vec!["light".to_string(), "shadow".to_string()]);
    }
}

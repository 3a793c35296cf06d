//! DOM 写入与标记层
//!
//! 还原所需的状态直接记录在 DOM 属性上（而非引擎内存中），
//! 因此可以跨引擎实例存活：布尔翻译标记、原始内容副本，以及
//! 根元素上的会话完成标记。译文的占位符模板只在会话内有意义，
//! 由 [`RenderedSlot`] 按文本位置持有并原位重渲染。

use markup5ever_rcdom::{Handle, NodeData};
use regex::Regex;

use crate::glossary::Glossary;
use crate::html::{
    get_node_attr, new_text_node, parse_fragment, replace_children, replace_node_span,
    set_node_attr,
};
use crate::template;

/// 元素已翻译标记
pub const TRANSLATED_ATTR: &str = "data-translated";
/// 原始纯文本内容
pub const ORIGINAL_TEXT_ATTR: &str = "data-original-text";
/// 原始富文本内容（序列化的内部标记）
pub const ORIGINAL_HTML_ATTR: &str = "data-original-html";
/// 根元素上的会话完成标记，用于区分完整会话和中断会话
pub const SESSION_COMPLETE_ATTR: &str = "data-translation-complete";

/// 富文本检测：译文中出现任意元素标签即按富文本处理
const RICH_MARKUP_PATTERN: &str = r"<[A-Za-z][^>]*>";

/// 判断译文是否为富文本标记
pub fn is_rich_markup(content: &str) -> bool {
    match Regex::new(RICH_MARKUP_PATTERN) {
        Ok(re) => re.is_match(content),
        Err(_) => false,
    }
}

/// 元素是否处于已翻译状态
pub fn is_marked_translated(element: &Handle) -> bool {
    get_node_attr(element, TRANSLATED_ATTR).as_deref() == Some("true")
}

/// 一个已翻译的文本位置
///
/// 记录含占位符的译文模板和当前写入的节点。术语表变化后可以
/// 原位重渲染：只替换自己写入的那段节点，同一元素下的其他
/// 子节点（包括各自独立翻译的子元素）不受影响。
pub struct RenderedSlot {
    parent: Handle,
    nodes: Vec<Handle>,
    template: String,
}

impl RenderedSlot {
    /// 在文本节点位置创建槽位，首次渲染前该节点仍是原文
    pub fn new(parent: &Handle, text_node: &Handle, template: &str) -> Self {
        Self {
            parent: parent.clone(),
            nodes: vec![text_node.clone()],
            template: template.to_string(),
        }
    }

    /// 译文模板，占位符保持字面形态
    pub fn template(&self) -> &str {
        &self.template
    }

    /// 用当前术语表渲染模板并写回文本位置
    pub fn rerender(&mut self, glossary: &Glossary) {
        let rendered = template::render(&self.template, &glossary.substitution_context());
        self.write(&rendered);
    }

    fn write(&mut self, content: &str) {
        if is_rich_markup(content) {
            let fragment = parse_fragment(content);
            if !fragment.is_empty() {
                replace_node_span(&self.parent, &self.nodes, fragment.clone());
                self.nodes = fragment;
                return;
            }
        }

        // 纯文本：单个文本节点原位改写，否则收拢为一个新文本节点
        if let [node] = self.nodes.as_slice() {
            if let NodeData::Text { ref contents } = node.data {
                let mut current = contents.borrow_mut();
                if &**current != content {
                    current.clear();
                    current.push_slice(content);
                }
                return;
            }
        }

        let text = new_text_node(content);
        replace_node_span(&self.parent, &self.nodes, vec![text.clone()]);
        self.nodes = vec![text];
    }
}

/// 标记元素为已翻译，并保存原始内容
///
/// 原始内容标记只在 false -> true 转换时写入；标记为 true 期间
/// 绝不覆盖，确保还原数据不被翻译结果污染
pub fn mark_translated(element: &Handle, original_content: &str, rich: bool) {
    let was_translated = is_marked_translated(element);
    set_node_attr(element, TRANSLATED_ATTR, Some("true".to_string()));

    if was_translated {
        return;
    }

    let attr = if rich {
        ORIGINAL_HTML_ATTR
    } else {
        ORIGINAL_TEXT_ATTR
    };
    set_node_attr(element, attr, Some(original_content.to_string()));
}

/// 还原根元素下所有已翻译元素的原始内容
///
/// 标记翻转为 false，但原始内容标记保留，重复还原是安全的空操作。
/// 返回实际还原的元素数。
pub fn restore(root: &Handle) -> usize {
    let mut restored = 0;
    restore_recursive(root, &mut restored);
    restored
}

fn restore_recursive(node: &Handle, restored: &mut usize) {
    if is_marked_translated(node) {
        if let Some(html) = get_node_attr(node, ORIGINAL_HTML_ATTR) {
            replace_children(node, parse_fragment(&html));
        } else if let Some(text) = get_node_attr(node, ORIGINAL_TEXT_ATTR) {
            replace_children(node, vec![new_text_node(&text)]);
        }

        set_node_attr(node, TRANSLATED_ATTR, Some("false".to_string()));
        *restored += 1;
    }

    let children: Vec<Handle> = node.children.borrow().clone();
    for child in children {
        restore_recursive(&child, restored);
    }
}

/// 读取根元素上的会话完成标记
pub fn is_session_complete(root: &Handle) -> bool {
    get_node_attr(root, SESSION_COMPLETE_ATTR).as_deref() == Some("true")
}

/// 设置或清除根元素上的会话完成标记
pub fn set_session_complete(root: &Handle, complete: bool) {
    let value = if complete {
        Some("true".to_string())
    } else {
        None
    };
    set_node_attr(root, SESSION_COMPLETE_ATTR, value);
}

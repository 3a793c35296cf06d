//! HTML DOM 基础操作
//!
//! 提供DOM解析、节点属性读写和序列化等底层工具

use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{format_tendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use crate::error::{EngineError, EngineResult};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> RcDom {
    let s: String;

    if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        s = string.to_string();
    } else {
        s = String::from_utf8_lossy(data).to_string();
    }

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .unwrap_or_else(|_| RcDom::default())
}

/// 将 HTML 片段解析为节点列表
///
/// 解析为完整文档后取 body 的子节点，用于拼接富文本译文
pub fn parse_fragment(html: &str) -> Vec<Handle> {
    let dom = html_to_dom(html.as_bytes(), "utf-8");

    if let Some(html_node) = get_child_node_by_name(&dom.document, "html") {
        if let Some(body) = get_child_node_by_name(&html_node, "body") {
            // 子树必须先从文档中摘出来：RcDom 释放时会逐层清空
            // 子节点列表，留在树上的节点返回后就是空壳
            let children = body.children.take();
            for child in &children {
                child.parent.set(None);
            }
            return children;
        }
    }

    Vec::new()
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let parent = child.parent.take();
    child.parent.set(parent.clone());
    parent.and_then(|node| node.upgrade())
}

/// 设置节点属性，`None` 表示删除该属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.clone() {
                    let _ = &attrs_mut[i].value.clear();
                    let _ = &attrs_mut[i].value.push_slice(attr_value.as_str());
                } else {
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                let name = LocalName::from(attr_name);

                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), name),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 创建文本节点
pub fn new_text_node(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(format_tendril!("{}", text)),
    })
}

/// 收集节点下的全部文本内容（深度优先拼接）
pub fn text_content(node: &Handle) -> String {
    let mut result = String::new();
    collect_text(node, &mut result);
    result
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { ref contents } = node.data {
        out.push_str(&contents.borrow());
    }

    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// 用给定节点列表替换元素的全部子节点
pub fn replace_children(element: &Handle, new_children: Vec<Handle>) {
    let mut children = element.children.borrow_mut();

    for child in children.iter() {
        child.parent.set(None);
    }
    children.clear();

    for child in new_children {
        child.parent.set(Some(Rc::downgrade(element)));
        children.push(child);
    }
}

/// 在父元素中用节点列表替换一段子节点
///
/// 以第一个命中的目标节点位置作为插入点，其余子节点保持原位；
/// 找不到任何目标时不做修改
pub fn replace_node_span(parent: &Handle, targets: &[Handle], replacements: Vec<Handle>) {
    let mut children = parent.children.borrow_mut();

    let Some(pos) = children
        .iter()
        .position(|c| targets.iter().any(|t| Rc::ptr_eq(c, t)))
    else {
        return;
    };

    children.retain(|c| {
        let is_target = targets.iter().any(|t| Rc::ptr_eq(c, t));
        if is_target {
            c.parent.set(None);
        }
        !is_target
    });

    for (offset, node) in replacements.into_iter().enumerate() {
        node.parent.set(Some(Rc::downgrade(parent)));
        children.insert(pos + offset, node);
    }
}

/// 序列化节点的内部内容（不含节点自身标签）
pub fn serialize_inner(node: &Handle) -> EngineResult<String> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };

    serialize(&mut buf, &serializable, opts)
        .map_err(|e| EngineError::Serialization(format!("DOM序列化失败: {}", e)))?;

    Ok(String::from_utf8_lossy(&buf).to_string())
}

/// 序列化整棵 DOM 树
pub fn serialize_document(dom: &RcDom) -> EngineResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = dom.document.clone().into();

    serialize(&mut buf, &serializable, SerializeOpts::default())
        .map_err(|e| EngineError::Serialization(format!("DOM序列化失败: {}", e)))?;

    Ok(buf)
}

//! 术语占位符替换渲染器
//!
//! 译文中以双花括号占位符（如 `{{ API }}`）标记术语位置，
//! 在术语译文确定后由本模块完成替换

use std::collections::HashMap;

use regex::Regex;

use crate::error::{EngineError, EngineResult};

/// 占位符语法：`{{ 标识符 }}`，标识符前后允许空白
const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_\-\.]*)\s*\}\}";

/// 渲染模板，替换所有在上下文中存在的占位符
///
/// 上下文中不存在的标识符保留原样，渲染本身不会失败；
/// 同一标识符可在模板中出现多次，逐处替换。
pub fn render(template: &str, context: &HashMap<String, String>) -> String {
    let re = match Regex::new(PLACEHOLDER_PATTERN) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!("占位符正则编译失败，返回原文: {}", e);
            return template.to_string();
        }
    };

    re.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        match context.get(name) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

/// 严格渲染：任何缺失的标识符都会聚合为一个错误返回
pub fn render_strict(template: &str, context: &HashMap<String, String>) -> EngineResult<String> {
    let re = Regex::new(PLACEHOLDER_PATTERN)
        .map_err(|e| EngineError::Internal(format!("占位符正则编译失败: {}", e)))?;

    let mut missing: Vec<String> = Vec::new();
    for caps in re.captures_iter(template) {
        let name = caps[1].to_string();
        if !context.contains_key(&name) && !missing.contains(&name) {
            missing.push(name);
        }
    }

    if missing.is_empty() {
        Ok(render(template, context))
    } else {
        Err(EngineError::MissingPlaceholders { missing })
    }
}

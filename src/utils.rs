//! 通用工具函数

use url::Url;

/// 常见的二级公共后缀，用于近似判定可注册域名
const SECOND_LEVEL_SUFFIXES: &[&str] = &["co", "com", "net", "org", "gov", "edu", "ac"];

/// 从 URL 中提取可注册域名
///
/// 子域名归一到其可注册域名（`docs.example.com` -> `example.com`，
/// `a.example.co.uk` -> `example.co.uk`）。IP地址和无主机的URL返回 `None`。
/// 这里使用常见后缀的近似规则，不依赖完整的公共后缀列表。
pub fn registrable_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    if host.parse::<std::net::IpAddr>().is_ok() {
        return None;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return Some(host.to_lowercase());
    }

    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];

    // 形如 example.co.uk 的三段式可注册域名
    let take = if labels.len() >= 3 && tld.len() == 2 && SECOND_LEVEL_SUFFIXES.contains(&second) {
        3
    } else {
        2
    };

    Some(labels[labels.len() - take..].join(".").to_lowercase())
}

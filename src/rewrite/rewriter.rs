//! # 路径改写
//!
//! 客户端不知道 ECR 的仓库前缀。请求路径如果还没有指向任何已知前缀，
//! 就补上默认镜像（Docker Hub）的前缀。两种客户端约定：
//!
//! - containerd 风格：`/v2/<repo>/...`，前缀插在 `/v2/` 之后
//! - CRI-O 风格：`/<repo>/...`，前缀插在整个路径之前

use super::table::PrefixTable;

const V2_ROOT: &str = "/v2/";

/// 客户端路径约定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientConvention {
    /// `/v2/` 之后插入前缀
    PathPrefixedAfterV2,
    /// 路径之前插入前缀
    PrefixedBeforePath,
}

/// 单个请求的改写决策
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDecision {
    /// 发往上游的路径
    pub target_path: String,
    /// 是否发生了改写
    pub should_rewrite: bool,
    /// 改写时采用的约定
    pub convention: Option<ClientConvention>,
}

impl ProxyDecision {
    fn pass_through(path: &str) -> Self {
        Self {
            target_path: path.to_string(),
            should_rewrite: false,
            convention: None,
        }
    }
}

/// 计算改写决策
///
/// 已经指向已知前缀的路径永远不会被再次加前缀；多个前缀互为字符串前缀时
/// 按前缀表的迭代顺序取第一个命中。没有默认镜像规则时原样透传。
#[must_use]
pub fn decide(inbound_path: &str, table: &PrefixTable) -> ProxyDecision {
    if table
        .prefixes()
        .any(|prefix| addresses_prefix(inbound_path, prefix))
    {
        return ProxyDecision::pass_through(inbound_path);
    }

    let Some(default_prefix) = table
        .default_prefix()
        .map(|p| p.trim_end_matches('/'))
        .filter(|p| !p.is_empty())
    else {
        return ProxyDecision::pass_through(inbound_path);
    };

    if let Some(rest) = inbound_path.strip_prefix(V2_ROOT) {
        ProxyDecision {
            target_path: format!("{V2_ROOT}{default_prefix}/{rest}"),
            should_rewrite: true,
            convention: Some(ClientConvention::PathPrefixedAfterV2),
        }
    } else {
        let target_path = if inbound_path.starts_with('/') {
            format!("/{default_prefix}{inbound_path}")
        } else {
            format!("/{default_prefix}/{inbound_path}")
        };
        ProxyDecision {
            target_path,
            should_rewrite: true,
            convention: Some(ClientConvention::PrefixedBeforePath),
        }
    }
}

/// 改写请求路径
#[must_use]
pub fn rewrite(inbound_path: &str, table: &PrefixTable) -> String {
    decide(inbound_path, table).target_path
}

/// 路径是否以 `/<prefix>` 或 `/v2/<prefix>` 开头（按路径段边界）
fn addresses_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return false;
    }

    ["/", V2_ROOT].into_iter().any(|root| {
        path.strip_prefix(root)
            .and_then(|rest| rest.strip_prefix(prefix))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

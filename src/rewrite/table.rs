//! # 前缀表

use indexmap::IndexMap;

use crate::registry::CacheRule;

/// 上游仓库 → ECR 仓库前缀
///
/// 启动时构建一次，之后只读。迭代顺序与控制面返回顺序一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixTable {
    prefixes: IndexMap<String, String>,
    default_upstream: String,
}

impl PrefixTable {
    /// 从规则集合构建；同一上游出现多次时保留第一条
    pub fn from_rules<I>(rules: I, default_upstream: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = CacheRule>,
    {
        let mut prefixes = IndexMap::new();
        for rule in rules {
            prefixes
                .entry(rule.upstream_host)
                .or_insert(rule.repository_prefix);
        }
        Self {
            prefixes,
            default_upstream: default_upstream.into(),
        }
    }

    /// 空表，所有请求原样透传
    pub fn empty(default_upstream: impl Into<String>) -> Self {
        Self::from_rules(Vec::new(), default_upstream)
    }

    /// 默认上游主机
    #[must_use]
    pub fn default_upstream(&self) -> &str {
        &self.default_upstream
    }

    /// 默认镜像（Docker Hub）的前缀
    #[must_use]
    pub fn default_prefix(&self) -> Option<&str> {
        self.prefixes.get(&self.default_upstream).map(String::as_str)
    }

    /// 按插入顺序遍历所有前缀
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.values().map(String::as_str)
    }

    /// 按插入顺序遍历 (上游, 前缀)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 规则数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// 是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_rule_wins_for_duplicate_upstream() {
        let table = PrefixTable::from_rules(
            vec![
                CacheRule::new("registry-1.docker.io", "dockerhub"),
                CacheRule::new("registry-1.docker.io", "dockerhub-old"),
            ],
            "registry-1.docker.io",
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.default_prefix(), Some("dockerhub"));
    }

    #[test]
    fn test_iteration_keeps_control_plane_order() {
        let table = PrefixTable::from_rules(
            vec![
                CacheRule::new("quay.io", "quay"),
                CacheRule::new("ghcr.io", "github"),
                CacheRule::new("registry-1.docker.io", "dockerhub"),
            ],
            "registry-1.docker.io",
        );
        let prefixes: Vec<_> = table.prefixes().collect();
        assert_eq!(prefixes, vec!["quay", "github", "dockerhub"]);
        assert_eq!(table.default_prefix(), Some("dockerhub"));
    }

    #[test]
    fn test_empty_table_has_no_default() {
        let table = PrefixTable::empty("registry-1.docker.io");
        assert!(table.is_empty());
        assert_eq!(table.default_prefix(), None);
        assert_eq!(table.default_upstream(), "registry-1.docker.io");
    }
}

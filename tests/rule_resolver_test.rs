//! # 规则解析测试

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_image_proxy::registry::{
    AuthorizationEntry, CacheRule, CacheRulePage, CacheRuleResolver, RegistryControlPlane,
};
use aws_image_proxy::{ProxyError, Result};
use pretty_assertions::assert_eq;

/// 按 `next_token` 分页返回规则
struct PagedControlPlane {
    pages: HashMap<Option<String>, CacheRulePage>,
}

impl PagedControlPlane {
    fn three_pages() -> Self {
        let page = |rules: &[(&str, &str)], next: Option<&str>| CacheRulePage {
            rules: rules.iter().map(|(u, p)| CacheRule::new(*u, *p)).collect(),
            next_token: next.map(ToString::to_string),
        };
        let pages = HashMap::from([
            (
                None,
                page(&[("registry-1.docker.io", "team-a/dockerhub")], Some("p2")),
            ),
            (
                Some("p2".to_string()),
                page(&[("ghcr.io", "team-a/github"), ("quay.io", "team-b/quay")], Some("p3")),
            ),
            (
                Some("p3".to_string()),
                page(&[("registry.k8s.io", "team-a/k8s")], None),
            ),
        ]);
        Self { pages }
    }
}

#[async_trait]
impl RegistryControlPlane for PagedControlPlane {
    async fn describe_cache_rules(&self, next_token: Option<String>) -> Result<CacheRulePage> {
        self.pages
            .get(&next_token)
            .cloned()
            .ok_or_else(|| ProxyError::upstream_query(format!("unknown token {next_token:?}")))
    }

    async fn authorization_data(&self) -> Result<Vec<AuthorizationEntry>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn collects_rules_across_pages_in_order() {
    let resolver = CacheRuleResolver::new(Arc::new(PagedControlPlane::three_pages()));

    let table = resolver
        .prefix_table("team-a/", "registry-1.docker.io")
        .await
        .unwrap();

    let entries: Vec<(&str, &str)> = table.iter().collect();
    assert_eq!(
        entries,
        vec![
            ("registry-1.docker.io", "team-a/dockerhub"),
            ("ghcr.io", "team-a/github"),
            ("registry.k8s.io", "team-a/k8s"),
        ]
    );
    assert_eq!(table.default_prefix(), Some("team-a/dockerhub"));
}

#[tokio::test]
async fn filter_matching_nothing_reports_no_rules() {
    let resolver = CacheRuleResolver::new(Arc::new(PagedControlPlane::three_pages()));

    let err = resolver.list_rules("team-z/").await.unwrap_err();
    assert!(matches!(err, ProxyError::NoRulesFound { ref prefix_filter } if prefix_filter == "team-z/"));
    assert_eq!(err.status_code().as_u16(), 502);
}

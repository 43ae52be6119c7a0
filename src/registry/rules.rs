//! # 缓存规则解析
//!
//! 读取账号下的全部 pull-through cache 规则，按前缀过滤后生成前缀表

use std::sync::Arc;

use super::control_plane::RegistryControlPlane;
use super::types::CacheRule;
use crate::error::{ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::rewrite::PrefixTable;
use crate::{ldebug, linfo};

/// pull-through cache 规则解析器
#[derive(Clone)]
pub struct CacheRuleResolver {
    control_plane: Arc<dyn RegistryControlPlane>,
}

impl CacheRuleResolver {
    /// 创建解析器
    #[must_use]
    pub fn new(control_plane: Arc<dyn RegistryControlPlane>) -> Self {
        Self { control_plane }
    }

    /// 列出 `repository_prefix` 以 `prefix_filter` 开头的规则
    ///
    /// 会翻完所有分页；过滤后为空时返回 [`ProxyError::NoRulesFound`]。
    pub async fn list_rules(&self, prefix_filter: &str) -> Result<Vec<CacheRule>> {
        let mut rules = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.control_plane.describe_cache_rules(next_token.take()).await?;
            pages += 1;

            rules.extend(
                page.rules
                    .into_iter()
                    .filter(|rule| rule.repository_prefix.starts_with(prefix_filter)),
            );

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        ldebug!(
            "system",
            LogStage::Configuration,
            LogComponent::RuleResolver,
            "rules_listed",
            "规则列表读取完成",
            pages = pages,
            matched = rules.len(),
            prefix_filter = %prefix_filter
        );

        if rules.is_empty() {
            return Err(ProxyError::no_rules_found(prefix_filter));
        }
        Ok(rules)
    }

    /// 读取规则并构建前缀表
    pub async fn prefix_table(&self, prefix_filter: &str, default_upstream: &str) -> Result<PrefixTable> {
        let rules = self.list_rules(prefix_filter).await?;
        let table = PrefixTable::from_rules(rules, default_upstream);

        for (upstream, prefix) in table.iter() {
            linfo!(
                "system",
                LogStage::Configuration,
                LogComponent::RuleResolver,
                "cache_rule",
                "已加载 pull-through cache 规则",
                upstream = %upstream,
                prefix = %prefix
            );
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::control_plane::MockRegistryControlPlane;
    use crate::registry::types::CacheRulePage;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn page(rules: &[(&str, &str)], next: Option<&str>) -> CacheRulePage {
        CacheRulePage {
            rules: rules.iter().map(|(u, p)| CacheRule::new(*u, *p)).collect(),
            next_token: next.map(ToString::to_string),
        }
    }

    #[tokio::test]
    async fn test_list_rules_follows_pagination() {
        let mut mock = MockRegistryControlPlane::new();
        let mut seq = Sequence::new();
        mock.expect_describe_cache_rules()
            .with(eq(None))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&[("registry-1.docker.io", "dockerhub")], Some("page-2"))));
        mock.expect_describe_cache_rules()
            .with(eq(Some("page-2".to_string())))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&[("ghcr.io", "github")], None)));

        let resolver = CacheRuleResolver::new(Arc::new(mock));
        let rules = resolver.list_rules("").await.unwrap();

        assert_eq!(
            rules,
            vec![
                CacheRule::new("registry-1.docker.io", "dockerhub"),
                CacheRule::new("ghcr.io", "github"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_rules_applies_prefix_filter() {
        let mut mock = MockRegistryControlPlane::new();
        mock.expect_describe_cache_rules().returning(|_| {
            Ok(page(
                &[
                    ("registry-1.docker.io", "team-a/dockerhub"),
                    ("quay.io", "team-b/quay"),
                ],
                None,
            ))
        });

        let resolver = CacheRuleResolver::new(Arc::new(mock));
        let rules = resolver.list_rules("team-b").await.unwrap();
        assert_eq!(rules, vec![CacheRule::new("quay.io", "team-b/quay")]);
    }

    #[tokio::test]
    async fn test_list_rules_empty_after_filter() {
        let mut mock = MockRegistryControlPlane::new();
        mock.expect_describe_cache_rules()
            .returning(|_| Ok(page(&[("registry-1.docker.io", "dockerhub")], None)));

        let resolver = CacheRuleResolver::new(Arc::new(mock));
        let err = resolver.list_rules("nothing-matches").await.unwrap_err();
        assert!(matches!(err, ProxyError::NoRulesFound { ref prefix_filter } if prefix_filter == "nothing-matches"));
    }

    #[tokio::test]
    async fn test_list_rules_propagates_control_plane_error() {
        let mut mock = MockRegistryControlPlane::new();
        mock.expect_describe_cache_rules()
            .returning(|_| Err(ProxyError::upstream_query("AccessDeniedException")));

        let resolver = CacheRuleResolver::new(Arc::new(mock));
        let err = resolver.list_rules("").await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamQuery { .. }));
    }

    #[tokio::test]
    async fn test_prefix_table_uses_default_upstream() {
        let mut mock = MockRegistryControlPlane::new();
        mock.expect_describe_cache_rules().returning(|_| {
            Ok(page(
                &[("registry-1.docker.io", "dockerhub"), ("ghcr.io", "github")],
                None,
            ))
        });

        let resolver = CacheRuleResolver::new(Arc::new(mock));
        let table = resolver
            .prefix_table("", "registry-1.docker.io")
            .await
            .unwrap();
        assert_eq!(table.default_prefix(), Some("dockerhub"));
        assert_eq!(table.len(), 2);
    }
}

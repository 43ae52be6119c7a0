//! # ECR 控制面访问
//!
//! 规则解析与授权令牌获取，供代理服务和启动流程共享

pub mod control_plane;
pub mod credentials;
pub mod rules;
pub mod types;

pub use control_plane::{EcrControlPlane, RegistryControlPlane};
pub use credentials::CredentialProvider;
pub use rules::CacheRuleResolver;
pub use types::{AuthorizationEntry, CacheRule, CacheRulePage, Credential};

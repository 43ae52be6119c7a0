//! The unified error handling system for the application.

// 1. Core Types
pub use types::ProxyError;

/// A unified `Result` type for the entire application.
///
/// All functions that can fail should return this type.
pub type Result<T> = std::result::Result<T, ProxyError>;

// 2. Module declarations
pub mod types;

// 3. Context Trait for adding context to errors.
pub trait Context<T> {
    /// 为错误附加上下文信息
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T>;
}

impl<T, E> Context<T> for std::result::Result<T, E>
where
    E: Into<ProxyError>,
{
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T> {
        self.map_err(|error| ProxyError::Context {
            context: context.to_string(),
            source: Box::new(error.into()),
        })
    }
}

// 4. Error Category for monitoring and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Errors that only affect the request being served.
    /// Surfaced to the local caller as a 5xx response.
    Request,
    /// Errors that prevent the process from serving at all.
    /// Fatal before the listener is bound.
    Startup,
}

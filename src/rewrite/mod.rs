//! # 请求路径改写
//!
//! 前缀表与无状态的改写函数

mod rewriter;
mod table;

pub use rewriter::{ClientConvention, ProxyDecision, decide, rewrite};
pub use table::PrefixTable;

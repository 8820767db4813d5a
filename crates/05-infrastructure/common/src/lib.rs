//! # Infrastructure Common
//!
//! 这个 crate 提供了依赖注入引擎各层共享的基础类型。
//!
//! ## 核心类型
//!
//! - [`Capability`] - 服务契约标识
//! - [`ContextType`] - 上下文类型及其线性化的祖先链
//! - [`Context`] - 可观察释放的上下文句柄
//! - [`DependencyError`] - 解析和注册错误
//!
//! ## 设计原则
//!
//! - 能力和上下文类型都按类型标识比较
//! - 所有失败都在解析时以 `Result` 返回

pub mod context;
pub mod errors;
pub mod metadata;

pub use context::*;
pub use errors::*;
pub use metadata::*;

//! # 依赖注入具体实现
//!
//! 提供注册表、解析容器、按上下文划分的缓存和延迟绑定。
//!
//! ## 解析流程
//!
//! `Container::get` → 上下文缓存（快速路径）→ 沿上下文类型链查找本地工厂
//! → 父容器 → `NotFound`
//!
//! ## 示例
//!
//! ```ignore
//! let scopes = ScopeSet::new();
//! let application = scopes.create("application", false)?;
//! application.register_type::<Counter, _>("", |_| Counter::default())?;
//!
//! let container = Container::new(application);
//! let counter = container.resolve::<Counter>()?;
//! ```

pub mod autowired;
pub mod cache;
pub mod container;
pub mod factory;
pub mod registry;
pub mod scope_set;

pub use autowired::{Autowired, Resolvable};
pub use cache::ContextCache;
pub use container::{Container, ContainerAware};
pub use factory::Factory;
pub use registry::{Registry, ServiceKey};
pub use scope_set::ScopeSet;

pub use di_abstractions::{
    ServiceInstance, ServiceRegistration, ServiceResolver, ServiceScanner, StaticScanner,
};

/// 本 crate 的扫描器使用的注册信息类型
pub type Registration = ServiceRegistration<Factory>;

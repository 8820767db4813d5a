//! 服务扫描器抽象接口
//!
//! 扫描器是外部协作者：以任意方式（源码标注、配置文件、手写代码）发现工厂，
//! 再通过注册接口逐条登记。核心不依赖任何具体的发现机制。

use infrastructure_common::{Capability, ContextType, DependencyResult};

/// 一条发现的注册信息：(能力, 名称, 上下文类型, 作用域, 工厂)
#[derive(Clone)]
pub struct ServiceRegistration<F> {
    /// 能力
    pub capability: Capability,
    /// 名称，默认为空
    pub name: String,
    /// 上下文类型，`None` 表示与上下文无关
    pub context_type: Option<ContextType>,
    /// 目标作用域
    pub scope: String,
    /// 工厂
    pub factory: F,
}

impl<F> ServiceRegistration<F> {
    /// 创建新的注册信息
    pub fn new(scope: impl Into<String>, capability: Capability, factory: F) -> Self {
        Self {
            capability,
            name: String::new(),
            context_type: None,
            scope: scope.into(),
            factory,
        }
    }

    /// 设置名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 设置上下文类型
    pub fn with_context_type(mut self, context_type: ContextType) -> Self {
        self.context_type = Some(context_type);
        self
    }
}

impl<F> std::fmt::Debug for ServiceRegistration<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("capability", &self.capability)
            .field("name", &self.name)
            .field("context_type", &self.context_type)
            .field("scope", &self.scope)
            .field("factory", &"<function>")
            .finish()
    }
}

/// 服务扫描器 trait
pub trait ServiceScanner<F>: Send + Sync {
    /// 获取扫描器名称
    fn name(&self) -> &str;

    /// 发现注册信息
    fn scan(&self) -> DependencyResult<Vec<ServiceRegistration<F>>>;
}

/// 手写注册列表的扫描器
#[derive(Debug, Clone)]
pub struct StaticScanner<F> {
    name: String,
    registrations: Vec<ServiceRegistration<F>>,
}

impl<F> StaticScanner<F> {
    /// 创建新的扫描器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registrations: Vec::new(),
        }
    }

    /// 添加注册信息
    pub fn with(mut self, registration: ServiceRegistration<F>) -> Self {
        self.registrations.push(registration);
        self
    }

    pub fn push(&mut self, registration: ServiceRegistration<F>) {
        self.registrations.push(registration);
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl<F> ServiceScanner<F> for StaticScanner<F>
where
    F: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self) -> DependencyResult<Vec<ServiceRegistration<F>>> {
        Ok(self.registrations.clone())
    }
}

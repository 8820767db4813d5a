//! 解析容器
//!
//! 容器绑定一个注册表和可选的父容器，按以下顺序解析服务：
//!
//! 1. 注册表不支持上下文时忽略传入的上下文
//! 2. 取得该上下文标识的缓存，命中则直接返回
//! 3. 沿上下文类型链查找本地工厂，第一个匹配的工厂被调用并写入缓存
//! 4. 本地没有匹配时把整个请求交给父容器，父容器独立缓存
//! 5. 没有父容器时返回 `NotFound`
//!
//! 工厂在注册表锁之外调用。两个并发的解析可能同时未命中同一个缓存槽，
//! 于是工厂被调用两次，后写入的实例胜出；有副作用的工厂需要调用方
//! 自行串行化首次访问。

use crate::cache::ContextCaches;
use crate::factory::Factory;
use crate::registry::{Registry, ServiceKey};
use di_abstractions::{ServiceInstance, ServiceResolver};
use infrastructure_common::{
    Capability, ContextType, ContextValue, DependencyError, DependencyResult,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

struct ContainerInner {
    id: Uuid,
    registry: Arc<Registry>,
    parent: Option<Container>,
    caches: ContextCaches,
}

/// 依赖注入容器
///
/// 克隆得到的是同一个容器的句柄，共享缓存。父容器链在构造时固定，
/// 调用方负责保证链上没有环。
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// 创建根容器
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::build(registry, None)
    }

    /// 创建子容器，本地未注册的服务交给父容器解析
    pub fn with_parent(registry: Arc<Registry>, parent: &Container) -> Self {
        Self::build(registry, Some(parent.clone()))
    }

    fn build(registry: Arc<Registry>, parent: Option<Container>) -> Self {
        let id = Uuid::new_v4();
        debug!(
            container = %id,
            scope = registry.scope(),
            parent = ?parent.as_ref().map(Container::id),
            "创建容器"
        );
        Self {
            inner: Arc::new(ContainerInner {
                id,
                registry,
                parent,
                caches: ContextCaches::default(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// 注册表绑定的作用域名称
    pub fn scope(&self) -> &str {
        self.inner.registry.scope()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// 仍被缓存的上下文对象数量（不含空上下文）
    pub fn cached_context_count(&self) -> usize {
        self.inner.caches.tracked_contexts()
    }

    /// 在上下文中解析服务
    pub fn get_in<C: ContextValue>(
        &self,
        capability: &Capability,
        name: &str,
        context: &C,
    ) -> DependencyResult<ServiceInstance> {
        self.get_in_context(capability, name, Some(context as &dyn ContextValue))
    }

    /// 以通用能力解析具名服务
    pub fn get_any(&self, name: &str) -> DependencyResult<ServiceInstance> {
        self.get(&Capability::any(), name)
    }

    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 沿上下文类型链查找第一个本地工厂
    fn find_local(
        &self,
        capability: &Capability,
        name: &str,
        context: Option<&dyn ContextValue>,
    ) -> DependencyResult<Option<(Factory, Option<ContextType>)>> {
        let registry = &self.inner.registry;
        let Some(context) = context else {
            return Ok(registry
                .find(capability, name, None)?
                .map(|factory| (factory, None)));
        };

        for context_type in context.context_type().linearize().iter() {
            if let Some(factory) = registry.find(capability, name, Some(context_type))? {
                return Ok(Some((factory, Some(*context_type))));
            }
        }

        Ok(None)
    }
}

impl ServiceResolver for Container {
    fn get_in_context(
        &self,
        capability: &Capability,
        name: &str,
        context: Option<&dyn ContextValue>,
    ) -> DependencyResult<ServiceInstance> {
        let context = if self.inner.registry.supports_contexts() {
            context
        } else {
            None
        };

        let cache = self.inner.caches.for_context(context)?;
        let key = ServiceKey::new(*capability, name);
        if let Some(service) = cache.get(&key) {
            trace!(container = %self.inner.id, service = %key, "缓存命中");
            return Ok(service);
        }

        if let Some((factory, context_type)) = self.find_local(capability, name, context)? {
            debug!(
                container = %self.inner.id,
                scope = self.scope(),
                service = %key,
                context_type = ?context_type,
                factory = %factory,
                "调用工厂"
            );
            let service = factory.invoke(self)?;
            cache.insert(key, Arc::clone(&service));
            return Ok(service);
        }

        if let Some(parent) = &self.inner.parent {
            trace!(container = %self.inner.id, service = %key, "交给父容器解析");
            return parent.get_in_context(capability, name, context);
        }

        debug!(container = %self.inner.id, service = %key, "找不到工厂");
        Err(DependencyError::NotFound {
            capability: capability.to_string(),
            name: name.to_string(),
            context: context.map(|context| context.describe()),
        })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("scope", &self.scope())
            .field("parent", &self.inner.parent.as_ref().map(Container::id))
            .finish()
    }
}

/// 暴露容器引用的对象，延迟绑定通过它解析服务
pub trait ContainerAware {
    fn container(&self) -> &Container;
}

impl ContainerAware for Container {
    fn container(&self) -> &Container {
        self
    }
}

//! 延迟绑定
//!
//! [`Autowired`] 作为宿主对象的字段，第一次通过宿主读取时向宿主的容器解析服务，
//! 之后一直返回同一个实例。
//!
//! 首次访问是串行化的：并发的首次读取只有一个会调用容器，其余等待结果。
//! 解析失败不会被记住，下一次读取重新解析。工厂内部不能再读取正在初始化的
//! 同一个绑定，否则会死锁。

use crate::container::{Container, ContainerAware};
use di_abstractions::{downcast_service, ServiceInstance, ServiceResolver};
use infrastructure_common::{
    Capability, Context, ContextValue, DependencyError, DependencyResult,
};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// 可以由延迟绑定解析的类型
pub trait Resolvable: Send + Sync + 'static {
    /// 从声明类型推断的能力，无法推断时为 `None`
    fn inferred_capability() -> Option<Capability>;

    /// 把解析出的服务实例转换为声明类型
    fn from_service(capability: &Capability, service: ServiceInstance) -> DependencyResult<Arc<Self>>;
}

impl<T: Send + Sync + 'static> Resolvable for T {
    fn inferred_capability() -> Option<Capability> {
        Some(Capability::of::<T>())
    }

    fn from_service(capability: &Capability, service: ServiceInstance) -> DependencyResult<Arc<Self>> {
        downcast_service(capability, service)
    }
}

/// 未声明具体类型的绑定，必须显式给出能力
impl Resolvable for dyn Any + Send + Sync {
    fn inferred_capability() -> Option<Capability> {
        None
    }

    fn from_service(_: &Capability, service: ServiceInstance) -> DependencyResult<Arc<Self>> {
        Ok(service)
    }
}

/// 延迟解析的服务字段
///
/// 解析结果属于绑定本身，与读取时的宿主无关。克隆得到的是尚未解析的新绑定，
/// 因此克隆宿主并换用另一个容器后会重新解析；需要共享结果时使用 [`Autowired::alias`]。
///
/// ```ignore
/// struct Handler {
///     container: Container,
///     database: Autowired<Database>,
/// }
///
/// impl ContainerAware for Handler {
///     fn container(&self) -> &Container {
///         &self.container
///     }
/// }
///
/// let database = handler.database.get(&handler)?;
/// ```
pub struct Autowired<T: ?Sized + Resolvable> {
    capability: Option<Capability>,
    name: String,
    context: Option<Context>,
    slot: Arc<OnceCell<Arc<T>>>,
}

impl<T: ?Sized + Resolvable> Autowired<T> {
    /// 从声明类型推断能力的无名绑定
    pub fn new() -> Self {
        Self {
            capability: T::inferred_capability(),
            name: String::new(),
            context: None,
            slot: Arc::new(OnceCell::new()),
        }
    }

    /// 显式指定能力
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 固定解析时使用的上下文
    pub fn in_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn capability(&self) -> Option<&Capability> {
        self.capability.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// 与当前绑定共享解析结果的别名
    pub fn alias(&self) -> Self {
        Self {
            capability: self.capability,
            name: self.name.clone(),
            context: self.context.clone(),
            slot: Arc::clone(&self.slot),
        }
    }

    /// 是否已经解析过
    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    /// 通过宿主对象的容器读取服务
    pub fn get<O>(&self, owner: &O) -> DependencyResult<Arc<T>>
    where
        O: ContainerAware + ?Sized,
    {
        self.resolve_with(owner.container())
    }

    /// 通过给定容器读取服务
    pub fn resolve_with(&self, container: &Container) -> DependencyResult<Arc<T>> {
        self.slot
            .get_or_try_init(|| {
                let capability = self.capability.ok_or_else(|| {
                    DependencyError::configuration(format!(
                        "延迟绑定 {} 无法确定能力，请使用 with_capability 指定",
                        std::any::type_name::<T>()
                    ))
                })?;

                trace!(
                    capability = %capability,
                    name = %self.name,
                    scope = container.scope(),
                    "解析延迟绑定"
                );
                let service = container.get_in_context(
                    &capability,
                    &self.name,
                    self.context.as_ref().map(|context| context as &dyn ContextValue),
                )?;
                T::from_service(&capability, service)
            })
            .map(Arc::clone)
    }
}

impl<T: ?Sized + Resolvable> Default for Autowired<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Resolvable> Clone for Autowired<T> {
    fn clone(&self) -> Self {
        Self {
            capability: self.capability,
            name: self.name.clone(),
            context: self.context.clone(),
            slot: Arc::new(OnceCell::new()),
        }
    }
}

impl<T: ?Sized + Resolvable> fmt::Debug for Autowired<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autowired")
            .field("capability", &self.capability)
            .field("name", &self.name)
            .field("context", &self.context)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

//! 服务解析抽象接口
//!
//! 应用代码和延迟绑定通过这个接口解析服务

use infrastructure_common::{Capability, ContextValue, DependencyError, DependencyResult};
use std::any::Any;
use std::sync::Arc;

/// 解析出的服务实例
///
/// 对引擎不透明，引擎只负责缓存槽的持有和释放
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// 服务解析器 trait
pub trait ServiceResolver: Send + Sync {
    /// 按能力、名称和可选上下文解析服务
    fn get_in_context(
        &self,
        capability: &Capability,
        name: &str,
        context: Option<&dyn ContextValue>,
    ) -> DependencyResult<ServiceInstance>;

    /// 不带上下文解析服务
    fn get(&self, capability: &Capability, name: &str) -> DependencyResult<ServiceInstance> {
        self.get_in_context(capability, name, None)
    }

    /// 解析 `T` 类型的无名服务
    fn resolve<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        Self: Sized,
    {
        self.resolve_named::<T>("")
    }

    /// 解析 `T` 类型的具名服务
    fn resolve_named<T>(&self, name: &str) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        Self: Sized,
    {
        let capability = Capability::of::<T>();
        downcast_service(&capability, self.get(&capability, name)?)
    }

    /// 在上下文中解析 `T` 类型的服务
    fn resolve_in<T, C>(&self, name: &str, context: &C) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        C: ContextValue,
        Self: Sized,
    {
        let capability = Capability::of::<T>();
        downcast_service(
            &capability,
            self.get_in_context(&capability, name, Some(context as &dyn ContextValue))?,
        )
    }
}

/// 把服务实例转换为具体类型
pub fn downcast_service<T>(capability: &Capability, instance: ServiceInstance) -> DependencyResult<Arc<T>>
where
    T: Send + Sync + 'static,
{
    instance
        .downcast::<T>()
        .map_err(|_| DependencyError::TypeMismatch {
            capability: capability.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}

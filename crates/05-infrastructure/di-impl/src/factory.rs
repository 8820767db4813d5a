//! 服务工厂

use crate::container::Container;
use di_abstractions::ServiceInstance;
use infrastructure_common::DependencyResult;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type CreateFn = dyn Fn(&Container) -> DependencyResult<ServiceInstance> + Send + Sync;

/// 服务工厂
///
/// 接收解析它的容器并构建服务实例，每个缓存槽只调用一次。
/// 工厂可以通过容器解析自身的依赖，错误原样向上传播。
#[derive(Clone)]
pub struct Factory {
    create: Arc<CreateFn>,
    description: Cow<'static, str>,
}

impl Factory {
    /// 从返回服务实例的函数创建工厂
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(&Container) -> DependencyResult<ServiceInstance> + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
            description: Cow::Borrowed(std::any::type_name::<F>()),
        }
    }

    /// 从构造具体类型的函数创建工厂
    pub fn of<T, F>(create: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        Self {
            description: Cow::Borrowed(std::any::type_name::<F>()),
            create: Arc::new(move |container: &Container| {
                Ok(Arc::new(create(container)) as ServiceInstance)
            }),
        }
    }

    /// 从可能失败的构造函数创建工厂
    pub fn try_of<T, F>(create: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> DependencyResult<T> + Send + Sync + 'static,
    {
        Self {
            description: Cow::Borrowed(std::any::type_name::<F>()),
            create: Arc::new(move |container: &Container| {
                Ok(Arc::new(create(container)?) as ServiceInstance)
            }),
        }
    }

    /// 总是返回同一个预先构建实例的工厂，忽略容器参数
    pub fn singleton(instance: ServiceInstance) -> Self {
        Self {
            create: Arc::new(move |_: &Container| Ok(Arc::clone(&instance))),
            description: Cow::Borrowed("<singleton>"),
        }
    }

    /// 设置诊断输出中显示的描述
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn invoke(&self, container: &Container) -> DependencyResult<ServiceInstance> {
        (self.create)(container)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("description", &self.description)
            .finish()
    }
}

impl fmt::Display for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

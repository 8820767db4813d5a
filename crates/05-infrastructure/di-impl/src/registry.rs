//! 工厂注册表
//!
//! 按 (能力, 名称, 上下文类型) 存放工厂，本身不持有任何服务

use crate::factory::Factory;
use di_abstractions::ServiceInstance;
use infrastructure_common::{Capability, ContextType, DependencyError, DependencyResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use tracing::{debug, warn};

/// 服务键：(能力, 名称)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    pub capability: Capability,
    pub name: String,
}

impl ServiceKey {
    pub fn new(capability: Capability, name: impl Into<String>) -> Self {
        Self {
            capability,
            name: name.into(),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} named '{}'", self.capability, self.name)
    }
}

/// 同一服务键下按上下文类型区分的工厂，保持注册顺序
#[derive(Debug, Clone, Default)]
struct ContextDiscriminator {
    entries: Vec<(Option<ContextType>, Factory)>,
}

impl ContextDiscriminator {
    fn get(&self, context_type: Option<&ContextType>) -> Option<&Factory> {
        self.entries
            .iter()
            .find(|(registered, _)| registered.as_ref() == context_type)
            .map(|(_, factory)| factory)
    }

    /// 插入工厂，返回是否覆盖了已有的工厂
    fn set(&mut self, context_type: Option<ContextType>, factory: Factory) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|(registered, _)| *registered == context_type)
        {
            Some(entry) => {
                entry.1 = factory;
                true
            }
            None => {
                self.entries.push((context_type, factory));
                false
            }
        }
    }
}

/// 工厂注册表
///
/// 绑定到一个作用域名称（仅作为元数据）。只有支持上下文的注册表
/// 才接受非空的上下文类型。
pub struct Registry {
    scope: String,
    supports_contexts: bool,
    factories: RwLock<HashMap<ServiceKey, ContextDiscriminator>>,
}

impl Registry {
    /// 创建新的注册表
    pub fn new(scope: impl Into<String>, supports_contexts: bool) -> Self {
        Self {
            scope: scope.into(),
            supports_contexts,
            factories: RwLock::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn supports_contexts(&self) -> bool {
        self.supports_contexts
    }

    fn check_context_type(&self, context_type: Option<&ContextType>) -> DependencyResult<()> {
        match context_type {
            Some(context_type) if !self.supports_contexts => {
                Err(DependencyError::configuration(format!(
                    "注册表 {} 不支持上下文 (上下文类型 {})",
                    self.scope, context_type
                )))
            }
            _ => Ok(()),
        }
    }

    /// 注册工厂
    ///
    /// 同一个 (能力, 名称, 上下文类型) 的后一次注册覆盖前一次
    pub fn register(
        &self,
        capability: Capability,
        name: impl Into<String>,
        context_type: Option<ContextType>,
        factory: Factory,
    ) -> DependencyResult<()> {
        self.check_context_type(context_type.as_ref())?;

        let key = ServiceKey::new(capability, name);
        debug!(
            scope = %self.scope,
            capability = %key.capability,
            name = %key.name,
            context_type = ?context_type,
            factory = %factory,
            "注册工厂"
        );

        let mut factories = self.factories.write();
        let replaced = factories
            .entry(key.clone())
            .or_default()
            .set(context_type, factory);
        if replaced {
            warn!(
                scope = %self.scope,
                capability = %key.capability,
                name = %key.name,
                context_type = ?context_type,
                "覆盖已注册的工厂"
            );
        }

        Ok(())
    }

    /// 注册单例：工厂总是返回给定的实例
    pub fn register_singleton(
        &self,
        capability: Capability,
        name: impl Into<String>,
        context_type: Option<ContextType>,
        instance: ServiceInstance,
    ) -> DependencyResult<()> {
        self.register(capability, name, context_type, Factory::singleton(instance))
    }

    /// 以 `T` 的类型标识为能力注册构造函数
    pub fn register_type<T, F>(&self, name: impl Into<String>, create: F) -> DependencyResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&crate::Container) -> T + Send + Sync + 'static,
    {
        self.register(Capability::of::<T>(), name, None, Factory::of(create))
    }

    /// 精确查找 (能力, 名称, 上下文类型) 的工厂，不沿类型层次查找
    pub fn resolve(
        &self,
        capability: &Capability,
        name: &str,
        context_type: Option<&ContextType>,
    ) -> DependencyResult<Factory> {
        self.find(capability, name, context_type)?
            .ok_or_else(|| DependencyError::NotFound {
                capability: capability.to_string(),
                name: name.to_string(),
                context: context_type.map(ToString::to_string),
            })
    }

    pub(crate) fn find(
        &self,
        capability: &Capability,
        name: &str,
        context_type: Option<&ContextType>,
    ) -> DependencyResult<Option<Factory>> {
        self.check_context_type(context_type)?;

        let key = ServiceKey::new(*capability, name);
        let factories = self.factories.read();
        Ok(factories
            .get(&key)
            .and_then(|discriminator| discriminator.get(context_type))
            .cloned())
    }

    /// 检查是否注册了精确匹配的工厂
    pub fn contains(
        &self,
        capability: &Capability,
        name: &str,
        context_type: Option<&ContextType>,
    ) -> bool {
        matches!(self.find(capability, name, context_type), Ok(Some(_)))
    }

    /// 注册的 (能力, 名称, 上下文类型) 条目数
    pub fn len(&self) -> usize {
        self.factories
            .read()
            .values()
            .map(|discriminator| discriminator.entries.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// 把所有注册条目写入输出
    pub fn write_dump(&self, out: &mut dyn Write, indent: usize) -> io::Result<()> {
        let factories = self.factories.read();
        let mut keys: Vec<&ServiceKey> = factories.keys().collect();
        keys.sort_by(|a, b| {
            (a.capability.name(), a.name.as_str()).cmp(&(b.capability.name(), b.name.as_str()))
        });

        for key in keys {
            writeln!(
                out,
                "{:indent$}Factory for {} named '{}':",
                "",
                key.capability,
                key.name,
                indent = indent
            )?;
            for (context_type, factory) in &factories[key].entries {
                let context = context_type
                    .as_ref()
                    .map_or_else(|| "None".to_string(), ToString::to_string);
                writeln!(
                    out,
                    "{:indent$}Context {}: {}",
                    "",
                    context,
                    factory,
                    indent = indent + 4
                )?;
            }
        }

        Ok(())
    }

    /// 把所有注册条目写到标准错误
    pub fn dump(&self) -> io::Result<()> {
        self.write_dump(&mut io::stderr().lock(), 0)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("scope", &self.scope)
            .field("supports_contexts", &self.supports_contexts)
            .field("entries", &self.len())
            .finish()
    }
}

//! 作用域集合
//!
//! 按名称管理各作用域的注册表。外部扫描器通过 `create`/`get`/`register`
//! 把发现的工厂登记到对应的注册表中。

use crate::factory::Factory;
use crate::registry::Registry;
use crate::Registration;
use di_abstractions::ServiceScanner;
use infrastructure_common::{DependencyError, DependencyResult};
use parking_lot::RwLock;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// 具名注册表集合，保持创建顺序
#[derive(Debug, Default)]
pub struct ScopeSet {
    registries: RwLock<Vec<Arc<Registry>>>,
}

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建空的注册表，同名作用域已存在时返回配置错误
    pub fn create(
        &self,
        scope: impl Into<String>,
        supports_contexts: bool,
    ) -> DependencyResult<Arc<Registry>> {
        let scope = scope.into();
        let mut registries = self.registries.write();
        if registries.iter().any(|registry| registry.scope() == scope) {
            return Err(DependencyError::configuration(format!(
                "作用域 '{scope}' 已经存在"
            )));
        }

        debug!(scope = %scope, supports_contexts, "创建作用域注册表");
        let registry = Arc::new(Registry::new(scope, supports_contexts));
        registries.push(Arc::clone(&registry));
        Ok(registry)
    }

    /// 查找作用域的注册表
    pub fn get(&self, scope: &str) -> DependencyResult<Arc<Registry>> {
        self.registries
            .read()
            .iter()
            .find(|registry| registry.scope() == scope)
            .cloned()
            .ok_or_else(|| DependencyError::ScopeNotFound {
                scope: scope.to_string(),
            })
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.registries
            .read()
            .iter()
            .any(|registry| registry.scope() == scope)
    }

    /// 按创建顺序列出作用域名称
    pub fn scopes(&self) -> Vec<String> {
        self.registries
            .read()
            .iter()
            .map(|registry| registry.scope().to_string())
            .collect()
    }

    /// 把一条注册信息登记到其作用域的注册表
    pub fn register(&self, registration: Registration) -> DependencyResult<()> {
        let registry = self.get(&registration.scope)?;
        registry.register(
            registration.capability,
            registration.name,
            registration.context_type,
            registration.factory,
        )
    }

    /// 逐条登记，遇到第一个错误即停止；返回登记的条数
    pub fn register_all<I>(&self, registrations: I) -> DependencyResult<usize>
    where
        I: IntoIterator<Item = Registration>,
    {
        let mut count = 0;
        for registration in registrations {
            self.register(registration)?;
            count += 1;
        }
        Ok(count)
    }

    /// 运行扫描器并登记其发现的全部工厂
    pub fn scan(&self, scanner: &dyn ServiceScanner<Factory>) -> DependencyResult<usize> {
        let registrations = scanner.scan()?;
        let count = self.register_all(registrations)?;
        info!(scanner = scanner.name(), registrations = count, "扫描完成");
        Ok(count)
    }

    /// 依次写出每个作用域的注册表
    pub fn write_dump(&self, out: &mut dyn Write) -> io::Result<()> {
        for registry in self.registries.read().iter() {
            writeln!(out, "Registry for scope '{}':", registry.scope())?;
            registry.write_dump(out, 4)?;
        }
        Ok(())
    }

    /// 写到标准错误
    pub fn dump(&self) -> io::Result<()> {
        self.write_dump(&mut io::stderr().lock())
    }
}

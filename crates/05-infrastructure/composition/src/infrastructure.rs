//! 基础设施主入口

use crate::builder::InfrastructureBuilder;
use crate::settings::{IocSettings, ScopeSettings};
use di_impl::{Container, Registry, ScopeSet};
use infrastructure_common::{DependencyError, DependencyResult, InfrastructureResult};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// 容器基础设施
///
/// 持有所有作用域的注册表，并为每个没有父作用域的作用域持有一个长期存在的容器。
/// 嵌套作用域（例如每个请求一个）的容器通过 [`IocInfrastructure::enter_scope`] 创建。
pub struct IocInfrastructure {
    /// 作用域配置
    settings: IocSettings,
    /// 作用域注册表
    scopes: Arc<ScopeSet>,
    /// 顶层作用域的容器
    containers: HashMap<String, Container>,
}

impl IocInfrastructure {
    /// 创建基础设施构建器
    pub fn builder() -> InfrastructureBuilder {
        InfrastructureBuilder::new()
    }

    /// 内部构造函数
    pub(crate) fn new(settings: IocSettings, scopes: ScopeSet) -> InfrastructureResult<Self> {
        let mut containers = HashMap::new();
        for scope in settings.scopes.iter().filter(|scope| scope.parent.is_none()) {
            let container = Container::new(scopes.get(&scope.name)?);
            info!(scope = %scope.name, container = %container.id(), "创建顶层容器");
            containers.insert(scope.name.clone(), container);
        }

        Ok(Self {
            settings,
            scopes: Arc::new(scopes),
            containers,
        })
    }

    pub fn settings(&self) -> &IocSettings {
        &self.settings
    }

    pub fn scope_set(&self) -> &Arc<ScopeSet> {
        &self.scopes
    }

    /// 作用域的注册表
    pub fn registry(&self, scope: &str) -> DependencyResult<Arc<Registry>> {
        self.scopes.get(scope)
    }

    /// 按声明顺序列出作用域名称
    pub fn scopes(&self) -> Vec<String> {
        self.scopes.scopes()
    }

    /// 根作用域的容器
    pub fn root(&self) -> DependencyResult<&Container> {
        self.container(&self.settings.root_scope)
    }

    /// 顶层作用域的长期容器
    pub fn container(&self, scope: &str) -> DependencyResult<&Container> {
        if let Some(container) = self.containers.get(scope) {
            return Ok(container);
        }

        match self.declared(scope)? {
            ScopeSettings {
                parent: Some(parent),
                ..
            } => Err(DependencyError::configuration(format!(
                "作用域 '{scope}' 嵌套在 '{parent}' 中，请使用 enter_scope 创建容器"
            ))),
            _ => Err(DependencyError::ScopeNotFound {
                scope: scope.to_string(),
            }),
        }
    }

    /// 为嵌套作用域创建新的容器
    ///
    /// 未给出父容器时使用父作用域的长期容器；给出的父容器必须属于声明的父作用域。
    /// 没有父作用域的作用域得到一个全新的独立容器。
    pub fn enter_scope(&self, scope: &str, parent: Option<&Container>) -> DependencyResult<Container> {
        let declared = self.declared(scope)?;
        let registry = self.scopes.get(scope)?;

        let Some(parent_scope) = declared.parent.as_deref() else {
            if parent.is_some() {
                return Err(DependencyError::configuration(format!(
                    "作用域 '{scope}' 没有父作用域"
                )));
            }
            debug!(scope, "创建独立容器");
            return Ok(Container::new(registry));
        };

        let parent = match parent {
            Some(parent) if parent.scope() == parent_scope => parent,
            Some(parent) => {
                return Err(DependencyError::configuration(format!(
                    "作用域 '{scope}' 的父作用域是 '{parent_scope}'，但给出的容器属于 '{}'",
                    parent.scope()
                )))
            }
            None => self.containers.get(parent_scope).ok_or_else(|| {
                DependencyError::configuration(format!(
                    "作用域 '{scope}' 的父作用域 '{parent_scope}' 不是顶层作用域，请显式传入父容器"
                ))
            })?,
        };

        debug!(scope, parent = %parent.id(), "进入嵌套作用域");
        Ok(Container::with_parent(registry, parent))
    }

    fn declared(&self, scope: &str) -> DependencyResult<&ScopeSettings> {
        self.settings
            .scope(scope)
            .ok_or_else(|| DependencyError::ScopeNotFound {
                scope: scope.to_string(),
            })
    }

    /// 写出所有作用域的注册表
    pub fn write_dump(&self, out: &mut dyn Write) -> io::Result<()> {
        self.scopes.write_dump(out)
    }

    /// 写到标准错误
    pub fn dump(&self) -> io::Result<()> {
        self.scopes.dump()
    }
}

impl std::fmt::Debug for IocInfrastructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IocInfrastructure")
            .field("root_scope", &self.settings.root_scope)
            .field("scopes", &self.scopes())
            .finish()
    }
}

//! 作用域与请求上下文解析的简化示例
//!
//! 演示如何声明作用域布局、通过扫描器登记工厂，并为每个请求进入嵌套作用域

use anyhow::Context as _;
use di_impl::{
    Autowired, Container, ContainerAware, Factory, ServiceRegistration, ServiceResolver,
    StaticScanner,
};
use infrastructure_common::{Capability, Context, ContextKind, ContextType, DependencyError};
use infrastructure_composition::{
    InfrastructureBuilder, InfrastructureResult, IocInfrastructure, LoggingConfig,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

// 示例：用户实体
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub name: String,
}

// 示例：应用级的用户仓储
#[derive(Debug)]
pub struct UserRepository {
    users: HashMap<u64, User>,
}

/// 仓储最多加载的用户数，未设置时加载全部
const MAX_USERS_VAR: &str = "DEMO_MAX_USERS";

impl UserRepository {
    pub fn new(max_users: usize) -> Self {
        let users = [(1, "alice"), (2, "bob")]
            .into_iter()
            .take(max_users)
            .map(|(id, name)| {
                (
                    id,
                    User {
                        id,
                        name: name.to_string(),
                    },
                )
            })
            .collect();
        Self { users }
    }

    pub fn find_by_id(&self, id: u64) -> Option<User> {
        self.users.get(&id).cloned()
    }
}

// 示例：请求上下文
#[derive(Debug)]
pub struct HttpRequest {
    pub path: String,
    pub user_id: u64,
}

impl ContextKind for HttpRequest {}

// 示例：每个请求一个的审计日志
#[derive(Debug)]
pub struct AuditTrail {
    pub request_number: u64,
}

// 示例：持有容器的请求处理器
pub struct UserHandler {
    container: Container,
    repository: Autowired<UserRepository>,
}

impl ContainerAware for UserHandler {
    fn container(&self) -> &Container {
        &self.container
    }
}

impl UserHandler {
    pub fn handle(&self, request: &Context) -> anyhow::Result<String> {
        let http = request
            .downcast_ref::<HttpRequest>()
            .context("请求上下文类型不正确")?;
        let audit = self
            .container
            .resolve_in::<AuditTrail, _>("", request)?;
        let repository = self.repository.get(self)?;

        let user = repository
            .find_by_id(http.user_id)
            .map_or_else(|| "<unknown>".to_string(), |user| format!("{}#{}", user.name, user.id));
        Ok(format!(
            "[{}] {} -> {}",
            audit.request_number, http.path, user
        ))
    }
}

fn scanner() -> StaticScanner<Factory> {
    let requests = Arc::new(AtomicU64::new(0));
    StaticScanner::new("manual")
        .with(ServiceRegistration::new(
            "application",
            Capability::of::<UserRepository>(),
            Factory::try_of(|_| {
                let max_users = match std::env::var(MAX_USERS_VAR) {
                    Ok(value) => value.parse::<usize>().map_err(|e| {
                        DependencyError::creation_failed(
                            Capability::of::<UserRepository>().to_string(),
                            "",
                            e,
                        )
                    })?,
                    Err(_) => usize::MAX,
                };
                Ok(UserRepository::new(max_users))
            })
            .with_description("UserRepository::new"),
        ))
        .with(
            ServiceRegistration::new(
                "request",
                Capability::of::<AuditTrail>(),
                Factory::of(move |_| AuditTrail {
                    request_number: requests.fetch_add(1, Ordering::SeqCst) + 1,
                })
                .with_description("AuditTrail"),
            )
            .with_context_type(ContextType::of::<HttpRequest>()),
        )
}

fn build_infrastructure() -> InfrastructureResult<IocInfrastructure> {
    let config_path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/ioc.toml");
    InfrastructureBuilder::new()
        .add_config_toml(config_path)?
        .add_config_env("LORN_IOC")
        .add_scanner(scanner())
        .with_logging(LoggingConfig::development())
        .build()
}

fn main() -> anyhow::Result<()> {
    let infrastructure = build_infrastructure()?;

    infrastructure.dump()?;

    for (path, user_id) in [("/users/1", 1), ("/users/2", 2), ("/users/3", 3)] {
        let handler = UserHandler {
            container: infrastructure.enter_scope("request", None)?,
            repository: Autowired::new(),
        };
        let request = Context::new(HttpRequest {
            path: path.to_string(),
            user_id,
        });

        info!("{}", handler.handle(&request)?);
    }

    Ok(())
}

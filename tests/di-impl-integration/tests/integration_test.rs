//! 解析引擎与组合层的端到端集成测试

use di_abstractions::ServiceResolver;
use di_impl::{Autowired, Container, ContainerAware, Factory, Registry, ScopeSet};
use infrastructure_common::{Capability, Context, ContextKind, ContextType, DependencyError};
use infrastructure_composition::{InfrastructureBuilder, IocSettings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const LAYOUT: &str = r#"
root_scope = "application"

[[scopes]]
name = "application"

[[scopes]]
name = "request"
supports_contexts = true
parent = "application"
"#;

/// 应用级的连接池
#[derive(Debug)]
struct ConnectionPool {
    id: usize,
}

/// 请求级的工作单元，依赖连接池
#[derive(Debug)]
struct UnitOfWork {
    pool: Arc<ConnectionPool>,
    path: String,
}

#[derive(Debug)]
struct HttpRequest {
    path: String,
}

#[derive(Debug)]
struct AdminRequest;

impl ContextKind for HttpRequest {}

impl ContextKind for AdminRequest {
    fn bases() -> Vec<ContextType> {
        vec![ContextType::of::<HttpRequest>()]
    }
}

/// 持有容器并延迟解析依赖的处理器
struct Handler {
    container: Container,
    pool: Autowired<ConnectionPool>,
}

impl ContainerAware for Handler {
    fn container(&self) -> &Container {
        &self.container
    }
}

fn build_scopes(pools: &Arc<AtomicUsize>) -> anyhow::Result<ScopeSet> {
    let scopes = ScopeSet::new();
    let application = scopes.create("application", false)?;
    let request = scopes.create("request", true)?;

    let counter = Arc::clone(pools);
    application.register_type::<ConnectionPool, _>("", move |_| ConnectionPool {
        id: counter.fetch_add(1, Ordering::SeqCst),
    })?;

    request.register(
        Capability::of::<UnitOfWork>(),
        "",
        Some(ContextType::of::<HttpRequest>()),
        Factory::try_of(|container: &Container| {
            Ok(UnitOfWork {
                pool: container.resolve::<ConnectionPool>()?,
                path: "http".to_string(),
            })
        }),
    )?;
    request.register(
        Capability::of::<UnitOfWork>(),
        "",
        Some(ContextType::of::<AdminRequest>()),
        Factory::try_of(|container: &Container| {
            Ok(UnitOfWork {
                pool: container.resolve::<ConnectionPool>()?,
                path: "admin".to_string(),
            })
        }),
    )?;

    Ok(scopes)
}

#[test]
fn test_request_lifecycle() -> anyhow::Result<()> {
    let pools = Arc::new(AtomicUsize::new(0));
    let scopes = build_scopes(&pools)?;
    let app = Container::new(scopes.get("application")?);

    for path in ["/a", "/b", "/c"] {
        let req = Container::with_parent(scopes.get("request")?, &app);
        let context = Context::new(HttpRequest {
            path: path.to_string(),
        });

        let first = req.resolve_in::<UnitOfWork, _>("", &context)?;
        let again = req.resolve_in::<UnitOfWork, _>("", &context)?;
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(first.path, "http");
        assert_eq!(first.pool.id, 0);
        assert_eq!(
            context.downcast_ref::<HttpRequest>().map(|r| r.path.as_str()),
            Some(path)
        );
    }

    assert_eq!(pools.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_specialized_request_type() -> anyhow::Result<()> {
    let pools = Arc::new(AtomicUsize::new(0));
    let scopes = build_scopes(&pools)?;
    let app = Container::new(scopes.get("application")?);
    let req = Container::with_parent(scopes.get("request")?, &app);

    let admin = Context::new(AdminRequest);
    let plain = Context::new(HttpRequest {
        path: "/".to_string(),
    });

    assert_eq!(req.resolve_in::<UnitOfWork, _>("", &admin)?.path, "admin");
    assert_eq!(req.resolve_in::<UnitOfWork, _>("", &plain)?.path, "http");
    assert!(req.resolve::<UnitOfWork>().unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn test_autowired_handler() -> anyhow::Result<()> {
    let pools = Arc::new(AtomicUsize::new(0));
    let scopes = build_scopes(&pools)?;
    let app = Container::new(scopes.get("application")?);

    let handler = Handler {
        container: Container::with_parent(scopes.get("request")?, &app),
        pool: Autowired::new(),
    };

    let pool = handler.pool.get(&handler)?;
    assert!(handler.pool.is_resolved());
    assert!(Arc::ptr_eq(&pool, &app.resolve::<ConnectionPool>()?));
    assert_eq!(handler.pool.capability(), Some(&Capability::of::<ConnectionPool>()));
    Ok(())
}

#[test]
fn test_diamond_context_hierarchy() -> anyhow::Result<()> {
    #[derive(Debug)]
    struct Base;
    #[derive(Debug)]
    struct Left;
    #[derive(Debug)]
    struct Right;
    #[derive(Debug)]
    struct Bottom;

    impl ContextKind for Base {}
    impl ContextKind for Left {
        fn bases() -> Vec<ContextType> {
            vec![ContextType::of::<Base>()]
        }
    }
    impl ContextKind for Right {
        fn bases() -> Vec<ContextType> {
            vec![ContextType::of::<Base>()]
        }
    }
    impl ContextKind for Bottom {
        fn bases() -> Vec<ContextType> {
            vec![ContextType::of::<Left>(), ContextType::of::<Right>()]
        }
    }

    let registry = Arc::new(Registry::new("request", true));
    let capability = Capability::of::<String>();
    registry.register(
        capability,
        "",
        Some(ContextType::of::<Base>()),
        Factory::of(|_| "base".to_string()),
    )?;
    registry.register(
        capability,
        "",
        Some(ContextType::of::<Right>()),
        Factory::of(|_| "right".to_string()),
    )?;

    let container = Container::new(Arc::clone(&registry));
    // Right 在线性化中排在 Base 之前
    assert_eq!(
        container.resolve_in::<String, _>("", &Context::new(Bottom))?.as_str(),
        "right"
    );

    registry.register(
        capability,
        "",
        Some(ContextType::of::<Left>()),
        Factory::of(|_| "left".to_string()),
    )?;
    assert_eq!(
        container.resolve_in::<String, _>("", &Context::new(Bottom))?.as_str(),
        "left"
    );
    Ok(())
}

#[test]
fn test_composed_infrastructure() -> anyhow::Result<()> {
    let infrastructure = InfrastructureBuilder::new()
        .with_settings(IocSettings::from_toml_str(LAYOUT)?)
        .build()?;

    infrastructure
        .registry("application")?
        .register_type::<ConnectionPool, _>("", |_| ConnectionPool { id: 9 })?;
    infrastructure
        .registry("request")?
        .register_type::<String, _>("", |_| "per-request".to_string())?;

    let request = infrastructure.enter_scope("request", None)?;
    assert_eq!(request.resolve::<ConnectionPool>()?.id, 9);
    assert_eq!(request.resolve::<String>()?.as_str(), "per-request");
    assert!(infrastructure.root()?.resolve::<String>().is_err());
    Ok(())
}

#[test]
fn test_threads_resolving_uncached_slot() {
    let registry = Arc::new(Registry::new("application", false));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    registry
        .register_type::<ConnectionPool, _>("", move |_| ConnectionPool {
            id: counter.fetch_add(1, Ordering::SeqCst),
        })
        .unwrap();
    let container = Container::new(registry);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| container.resolve::<ConnectionPool>().unwrap());
        }
    });

    // 并发的首次解析可能各自调用工厂，之后的解析只看到最终写入的实例
    let invoked = calls.load(Ordering::SeqCst);
    assert!((1..=8).contains(&invoked));
    let settled = container.resolve::<ConnectionPool>().unwrap();
    assert!(Arc::ptr_eq(&settled, &container.resolve::<ConnectionPool>().unwrap()));
    assert_eq!(calls.load(Ordering::SeqCst), invoked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_request_contexts_released_across_tasks() {
    let pools = Arc::new(AtomicUsize::new(0));
    let scopes = Arc::new(build_scopes(&pools).unwrap());
    let app = Container::new(scopes.get("application").unwrap());
    let req = Container::with_parent(scopes.get("request").unwrap(), &app);
    app.resolve::<ConnectionPool>().unwrap();

    let mut handles = Vec::new();
    for i in 0..32 {
        let req = req.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let context = Context::new(HttpRequest {
                path: format!("/ads/{i}"),
            });
            req.resolve_in::<UnitOfWork, _>("", &context).unwrap().pool.id
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 0);
    }
    assert_eq!(req.cached_context_count(), 0);
    assert_eq!(pools.load(Ordering::SeqCst), 1);
}

#[test]
fn test_long_lived_context_across_request_containers() -> anyhow::Result<()> {
    let pools = Arc::new(AtomicUsize::new(0));
    let scopes = build_scopes(&pools)?;
    let app = Container::new(scopes.get("application")?);
    let tenant = Context::new(HttpRequest {
        path: "/tenant".to_string(),
    });

    for _ in 0..1000 {
        let req = Container::with_parent(scopes.get("request")?, &app);
        req.resolve_in::<UnitOfWork, _>("", &tenant)?;
        assert_eq!(req.cached_context_count(), 1);
    }

    // 已丢弃容器的释放钩子不会在上下文上累积
    assert!(tenant.release_hook_count() <= 1);
    assert_eq!(pools.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_factory_wraps_foreign_error() -> anyhow::Result<()> {
    let registry = Arc::new(Registry::new("application", false));
    let port = Arc::new(parking_lot::Mutex::new("not-a-port".to_string()));
    let source = Arc::clone(&port);
    registry.register(
        Capability::of::<u16>(),
        "port",
        None,
        Factory::try_of(move |_| {
            source.lock().parse::<u16>().map_err(|e| {
                DependencyError::creation_failed(Capability::of::<u16>().to_string(), "port", e)
            })
        }),
    )?;
    let container = Container::new(registry);

    let error = container.resolve_named::<u16>("port").unwrap_err();
    assert!(error.is_creation());
    assert!(error.to_string().contains("'port'"));
    assert!(std::error::Error::source(&error).is_some());

    *port.lock() = "8080".to_string();
    assert_eq!(*container.resolve_named::<u16>("port")?, 8080);
    Ok(())
}

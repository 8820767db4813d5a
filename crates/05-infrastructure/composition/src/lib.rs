//! # 基础设施组合层
//!
//! 这个 crate 负责把解析引擎组装成可运行的基础设施：读取作用域布局配置，
//! 为每个作用域创建注册表，运行服务扫描器，并创建顶层容器。
//!
//! ## 主要功能
//!
//! - **基础设施构建器**: 使用构建者模式收集配置源、扫描器和日志配置
//! - **作用域布局配置**: TOML 文件与环境变量叠加，构建前校验
//! - **嵌套作用域**: 为每个请求等嵌套作用域创建子容器
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::{InfrastructureBuilder, LoggingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let infrastructure = InfrastructureBuilder::new()
//!         .add_config_toml("config/ioc.toml")?
//!         .add_config_env("LORN_IOC")
//!         .with_logging(LoggingConfig::development())
//!         .build()?;
//!
//!     let request = infrastructure.enter_scope("request", None)?;
//!     println!("进入作用域: {}", request.scope());
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod infrastructure;
pub mod settings;


// 重新导出主要类型
pub use builder::{InfrastructureBuilder, LoggingConfig};
pub use infrastructure::IocInfrastructure;
pub use settings::{IocSettings, LoggingSettings, ScopeSettings, SettingsSource};

// 重新导出错误类型
pub use infrastructure_common::{InfrastructureError, InfrastructureResult};

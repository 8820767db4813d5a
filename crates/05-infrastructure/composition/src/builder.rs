//! 基础设施构建器

use crate::infrastructure::IocInfrastructure;
use crate::settings::{IocSettings, LoggingSettings, SettingsSource};
use di_impl::{Factory, ScopeSet, ServiceScanner};
use infrastructure_common::{ConfigError, ConfigResult, InfrastructureError, InfrastructureResult};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// 基础设施构建器
///
/// 使用建造者模式收集配置源、扫描器和日志配置，`build` 时按作用域声明
/// 创建注册表并运行扫描器
pub struct InfrastructureBuilder {
    /// 配置源列表
    config_sources: Vec<SettingsSource>,
    /// 直接给出的配置，优先于配置源
    settings: Option<IocSettings>,
    /// 服务扫描器列表
    scanners: Vec<Box<dyn ServiceScanner<Factory>>>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 显式的日志配置，未设置时使用配置中的日志段
    logging_config: Option<LoggingConfig>,
}

impl InfrastructureBuilder {
    /// 创建新的基础设施构建器
    pub fn new() -> Self {
        Self {
            config_sources: Vec::new(),
            settings: None,
            scanners: Vec::new(),
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: None,
        }
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(mut self, path: P) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        info!("添加 TOML 配置文件: {}", path.display());
        self.config_sources
            .push(SettingsSource::TomlFile(path.to_path_buf()));
        Ok(self)
    }

    /// 添加环境变量配置源
    pub fn add_config_env<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);
        self.config_sources
            .push(SettingsSource::Environment { prefix });
        self
    }

    /// 直接使用给定的配置，忽略配置源
    pub fn with_settings(mut self, settings: IocSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// 添加服务扫描器
    pub fn add_scanner<T: ServiceScanner<Factory> + 'static>(mut self, scanner: T) -> Self {
        debug!("添加服务扫描器: {}", scanner.name());
        self.scanners.push(Box::new(scanner));
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 按配置中的日志段初始化日志
    pub fn enable_logging(mut self) -> Self {
        self.logging_enabled = true;
        self
    }

    /// 构建基础设施实例
    pub fn build(self) -> InfrastructureResult<IocInfrastructure> {
        let settings = match self.settings {
            Some(settings) => settings,
            None if self.config_sources.is_empty() => IocSettings::default(),
            None => IocSettings::load(&self.config_sources)?,
        };

        // 只有在明确要求时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            let config = match self.logging_config {
                Some(config) => config,
                None => LoggingConfig::from_settings(&settings.logging)?,
            };
            initialize_logging(&config)?;
        }

        info!("开始构建基础设施");
        settings.validate()?;

        let scopes = ScopeSet::new();
        for scope in &settings.scopes {
            scopes.create(scope.name.clone(), scope.supports_contexts)?;
        }

        for scanner in &self.scanners {
            scopes.scan(scanner.as_ref())?;
        }

        let infrastructure = IocInfrastructure::new(settings, scopes)?;
        info!("基础设施构建完成");
        Ok(infrastructure)
    }
}

impl Default for InfrastructureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 初始化日志系统
fn initialize_logging(config: &LoggingConfig) -> InfrastructureResult<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(config.level)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| InfrastructureError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 从配置文件的日志段创建
    pub fn from_settings(settings: &LoggingSettings) -> ConfigResult<Self> {
        let level = tracing::Level::from_str(&settings.level).map_err(|_| {
            ConfigError::validation(format!("无效的日志级别: {}", settings.level))
        })?;

        Ok(Self {
            level,
            show_target: settings.show_target,
            show_thread_ids: settings.show_thread_ids,
            json_format: settings.json,
            ..Self::default()
        })
    }
}

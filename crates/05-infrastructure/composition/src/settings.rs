//! 作用域布局配置
//!
//! 描述有哪些作用域、哪些支持上下文以及它们之间的父子关系：
//!
//! ```toml
//! root_scope = "application"
//!
//! [[scopes]]
//! name = "application"
//!
//! [[scopes]]
//! name = "request"
//! supports_contexts = true
//! parent = "application"
//!
//! [logging]
//! level = "debug"
//! ```

use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// 默认的根作用域名称
pub const DEFAULT_ROOT_SCOPE: &str = "application";

/// 单个作用域的声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSettings {
    /// 作用域名称
    pub name: String,
    /// 注册表是否接受上下文类型
    #[serde(default)]
    pub supports_contexts: bool,
    /// 父作用域名称
    #[serde(default)]
    pub parent: Option<String>,
}

impl ScopeSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supports_contexts: false,
            parent: None,
        }
    }

    pub fn with_contexts(mut self) -> Self {
        self.supports_contexts = true;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// 日志配置段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 日志级别：trace / debug / info / warn / error
    pub level: String,
    /// 是否输出 JSON
    pub json: bool,
    pub show_target: bool,
    pub show_thread_ids: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            show_target: true,
            show_thread_ids: false,
        }
    }
}

/// 容器基础设施配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IocSettings {
    /// 根作用域名称
    #[serde(default = "default_root_scope")]
    pub root_scope: String,
    /// 作用域声明，按声明顺序创建注册表
    #[serde(default)]
    pub scopes: Vec<ScopeSettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

fn default_root_scope() -> String {
    DEFAULT_ROOT_SCOPE.to_string()
}

impl Default for IocSettings {
    fn default() -> Self {
        Self {
            root_scope: default_root_scope(),
            scopes: vec![ScopeSettings::new(DEFAULT_ROOT_SCOPE)],
            logging: LoggingSettings::default(),
        }
    }
}

/// 配置源，后添加的覆盖先添加的
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// TOML 文件
    TomlFile(PathBuf),
    /// 带前缀的环境变量，层级以 `__` 分隔，例如 `LORN_IOC_LOGGING__LEVEL`
    Environment { prefix: String },
}

impl IocSettings {
    /// 从 TOML 文本解析
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })
    }

    /// 依次叠加配置源并反序列化
    pub fn load(sources: &[SettingsSource]) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();
        for source in sources {
            builder = match source {
                SettingsSource::TomlFile(path) => {
                    if !path.exists() {
                        return Err(ConfigError::FileNotFound {
                            path: path.display().to_string(),
                        });
                    }
                    debug!("加载配置文件: {}", path.display());
                    builder.add_source(
                        config::File::from(path.as_path()).format(config::FileFormat::Toml),
                    )
                }
                SettingsSource::Environment { prefix } => {
                    debug!("加载环境变量配置，前缀: {}", prefix);
                    builder.add_source(
                        config::Environment::with_prefix(prefix)
                            .prefix_separator("_")
                            .separator("__")
                            .try_parsing(true),
                    )
                }
            };
        }

        let settings = builder.build().map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })?;

        let mut loaded: IocSettings =
            settings
                .try_deserialize()
                .map_err(|e| ConfigError::ParseError {
                    source: Box::new(e),
                })?;
        if loaded.scopes.is_empty() {
            loaded.scopes = IocSettings::default().scopes;
        }
        Ok(loaded)
    }

    /// 查找作用域声明
    pub fn scope(&self, name: &str) -> Option<&ScopeSettings> {
        self.scopes.iter().find(|scope| scope.name == name)
    }

    /// 检查作用域布局
    ///
    /// 至少一个作用域，名称唯一，根作用域已声明且没有父作用域，
    /// 每个父作用域都已声明，父子关系中没有环。
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scopes.is_empty() {
            return Err(ConfigError::validation("至少需要声明一个作用域"));
        }

        let mut names = HashSet::new();
        for scope in &self.scopes {
            if scope.name.is_empty() {
                return Err(ConfigError::validation("作用域名称不能为空"));
            }
            if !names.insert(scope.name.as_str()) {
                return Err(ConfigError::validation(format!(
                    "作用域 '{}' 重复声明",
                    scope.name
                )));
            }
        }

        match self.scope(&self.root_scope) {
            None => {
                return Err(ConfigError::validation(format!(
                    "根作用域 '{}' 没有声明",
                    self.root_scope
                )))
            }
            Some(root) if root.parent.is_some() => {
                return Err(ConfigError::validation(format!(
                    "根作用域 '{}' 不能有父作用域",
                    self.root_scope
                )))
            }
            Some(_) => {}
        }

        for scope in &self.scopes {
            let Some(parent) = &scope.parent else {
                continue;
            };
            if !names.contains(parent.as_str()) {
                return Err(ConfigError::validation(format!(
                    "作用域 '{}' 的父作用域 '{}' 没有声明",
                    scope.name, parent
                )));
            }

            // 向上走的步数超过作用域总数即说明有环
            let mut current = scope;
            let mut steps = 0;
            while let Some(parent) = current.parent.as_deref().and_then(|p| self.scope(p)) {
                steps += 1;
                if steps > self.scopes.len() {
                    return Err(ConfigError::validation(format!(
                        "作用域 '{}' 的父作用域链存在环",
                        scope.name
                    )));
                }
                current = parent;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"
root_scope = "application"

[[scopes]]
name = "application"

[[scopes]]
name = "request"
supports_contexts = true
parent = "application"

[logging]
level = "debug"
"#;

    #[test]
    fn test_parse_layout() {
        let settings = IocSettings::from_toml_str(LAYOUT).unwrap();

        assert_eq!(settings.root_scope, "application");
        assert_eq!(settings.scopes.len(), 2);
        assert_eq!(
            settings.scope("request"),
            Some(
                &ScopeSettings::new("request")
                    .with_contexts()
                    .with_parent("application")
            )
        );
        assert_eq!(settings.logging.level, "debug");
        assert!(!settings.logging.json);
        settings.validate().unwrap();
    }

    #[test]
    fn test_default_is_valid() {
        let settings = IocSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.scopes, vec![ScopeSettings::new("application")]);
    }

    #[test]
    fn test_rejects_duplicate_scope() {
        let mut settings = IocSettings::default();
        settings.scopes.push(ScopeSettings::new("application"));
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::ValidationError { .. }
        ));
    }

    #[test]
    fn test_rejects_undeclared_root_and_parent() {
        let mut settings = IocSettings::default();
        settings.root_scope = "missing".to_string();
        assert!(settings.validate().is_err());

        let mut settings = IocSettings::default();
        settings
            .scopes
            .push(ScopeSettings::new("request").with_parent("session"));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_root_with_parent() {
        let settings = IocSettings {
            root_scope: "request".to_string(),
            scopes: vec![
                ScopeSettings::new("application"),
                ScopeSettings::new("request").with_parent("application"),
            ],
            logging: LoggingSettings::default(),
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_parent_cycle() {
        let settings = IocSettings {
            root_scope: "application".to_string(),
            scopes: vec![
                ScopeSettings::new("application"),
                ScopeSettings::new("a").with_parent("b"),
                ScopeSettings::new("b").with_parent("a"),
            ],
            logging: LoggingSettings::default(),
        };
        let message = settings.validate().unwrap_err().to_string();
        assert!(message.contains("环"));
    }

    #[test]
    fn test_load_missing_file() {
        let error = IocSettings::load(&[SettingsSource::TomlFile(PathBuf::from(
            "/definitely/not/here.toml",
        ))])
        .unwrap_err();
        assert!(matches!(error, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            IocSettings::from_toml_str("scopes = 3").unwrap_err(),
            ConfigError::ParseError { .. }
        ));
    }
}

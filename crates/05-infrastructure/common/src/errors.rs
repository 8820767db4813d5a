//! 错误类型定义

use thiserror::Error;

/// 错误类别
///
/// 调用方通常只关心错误属于哪一类，而不关心具体的变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 在整个父容器链上都找不到工厂，或作用域不存在
    NotFound,
    /// 结构性误用，在出错的调用处立即抛出
    Configuration,
    /// 上下文对象无法被弱观察
    Usage,
    /// 工厂自身构建服务失败
    Creation,
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("无法解析 {capability}{} 的工厂{}", named(.name), in_context(.context))]
    NotFound {
        capability: String,
        name: String,
        context: Option<String>,
    },

    #[error("作用域 '{scope}' 没有注册表")]
    ScopeNotFound { scope: String },

    #[error("配置错误: {message}")]
    Configuration { message: String },

    #[error("使用错误: {message}")]
    Usage { message: String },

    #[error("服务创建失败: {capability}{}, 原因: {source}", named(.name))]
    CreationFailed {
        capability: String,
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("类型不匹配: {capability} 解析出的服务不是 {expected}")]
    TypeMismatch { capability: String, expected: String },
}

fn named(name: &str) -> String {
    if name.is_empty() {
        String::new()
    } else {
        format!(" (名称 '{name}')")
    }
}

fn in_context(context: &Option<String>) -> String {
    match context {
        Some(context) => format!(" (上下文 {context})"),
        None => String::new(),
    }
}

impl DependencyError {
    /// 创建配置错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// 创建使用错误
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// 包装工厂内部的外部错误
    pub fn creation_failed(
        capability: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::CreationFailed {
            capability: capability.into(),
            name: name.into(),
            source: source.into(),
        }
    }

    /// 错误类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::ScopeNotFound { .. } => ErrorKind::NotFound,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Usage { .. } => ErrorKind::Usage,
            Self::CreationFailed { .. } | Self::TypeMismatch { .. } => ErrorKind::Creation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_usage(&self) -> bool {
        self.kind() == ErrorKind::Usage
    }

    pub fn is_creation(&self) -> bool {
        self.kind() == ErrorKind::Creation
    }
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_mentions_name_and_context() {
        let error = DependencyError::NotFound {
            capability: "Widget".to_string(),
            name: "primary".to_string(),
            context: Some("RequestContext { id: 7 }".to_string()),
        };

        let message = error.to_string();
        assert!(message.contains("Widget"));
        assert!(message.contains("'primary'"));
        assert!(message.contains("RequestContext { id: 7 }"));
        assert!(error.is_not_found());
    }

    #[test]
    fn test_unnamed_not_found_has_no_name_part() {
        let error = DependencyError::NotFound {
            capability: "Widget".to_string(),
            name: String::new(),
            context: None,
        };

        assert!(!error.to_string().contains("名称"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            DependencyError::configuration("x").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(DependencyError::usage("x").kind(), ErrorKind::Usage);
        assert_eq!(
            DependencyError::ScopeNotFound {
                scope: "request".to_string()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DependencyError::creation_failed("Db", "", "connection refused").kind(),
            ErrorKind::Creation
        );
    }
}

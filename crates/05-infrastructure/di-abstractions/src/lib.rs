//! # Dependency Injection Abstractions
//! 
//! 依赖注入抽象层，定义服务解析和外部扫描协作者的接口。
//! 
//! ## 核心接口
//! 
//! - [`ServiceResolver`] - 服务解析接口
//! - [`ServiceScanner`] - 外部扫描器接口
//! - [`ServiceRegistration`] - 扫描器发现的注册信息

pub mod resolver;
pub mod scanner;

pub use resolver::*;
pub use scanner::*;

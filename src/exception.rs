// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器在启动阶段与连接处理生命周期中可能出现的各类异常情况。
//!
//! ## 分类
//! - **启动失败**：端口非法、配置无法读取、端口绑定失败、缓存服务不可达、后端列表非法。
//!   这类异常是致命的，记录日志后进程以非零状态码退出。
//! - **协议违规**：非 GET 方法、无法解析的请求行。对应的连接被静默丢弃，不写回任何字节。
//! - **资源不存在**：路径无法解析，在本地恢复为 404 页面。
//! - **工作池饱和**：新连接被直接丢弃，接收循环继续运行。
//!
//! 连接处理过程中的 I/O 错误直接使用 `std::io::Error` 传播，不在此处建模。

use std::fmt;

/// 服务器运行过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 端口不在 [1024, 65535] 范围内，或者根本不是整数。
    InvalidPort,
    /// 配置文件不存在或无法读取。
    ConfigUnreadable,
    /// 配置文件内容不是合法的 TOML，或字段取值非法。
    ConfigInvalid,
    /// 无法在指定地址上绑定监听套接字。
    BindFailed,
    /// 启动时无法连接到缓存服务（memcached）。
    CacheUnreachable,
    /// 后端地址无法解析为 `host:port`。
    InvalidBackend,
    /// 调度模式下后端列表为空。
    NoBackends,
    /// 无法创建异步运行时。
    RuntimeUnavailable,
    /// 请求行无法被解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了 GET 以外的方法。
    UnSupportedRequestMethod,
    /// 请求行缺少方法或目标。
    MalformedRequestLine,
    /// 在文档根目录下未找到所请求的文件。对应 `404 Not Found`。
    FileNotFound,
    /// 工作池已满，无法接收新的连接。
    PoolSaturated,
}

use Exception::*;

impl Exception {
    /// 是否属于启动阶段的致命错误。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InvalidPort
                | ConfigUnreadable
                | ConfigInvalid
                | BindFailed
                | CacheUnreachable
                | InvalidBackend
                | NoBackends
                | RuntimeUnavailable
        )
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidPort => write!(f, "Port must be an integer in [1024, 65535]"),
            ConfigUnreadable => write!(f, "Configuration file can't be read"),
            ConfigInvalid => write!(f, "Configuration file is invalid"),
            BindFailed => write!(f, "Couldn't bind the listening socket"),
            CacheUnreachable => write!(f, "Cache server is unreachable"),
            InvalidBackend => write!(f, "Backend address must be host:port"),
            NoBackends => write!(f, "Backend list is empty"),
            RuntimeUnavailable => write!(f, "Couldn't start the async runtime"),
            RequestIsNotUtf8 => write!(f, "Request line can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            FileNotFound => write!(f, "File not found (404)"),
            PoolSaturated => write!(f, "Worker pool is saturated"),
        }
    }
}

impl std::error::Error for Exception {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_failures_are_fatal() {
        for e in [
            InvalidPort,
            ConfigUnreadable,
            ConfigInvalid,
            BindFailed,
            CacheUnreachable,
            InvalidBackend,
            NoBackends,
            RuntimeUnavailable,
        ] {
            assert!(e.is_fatal(), "{} 应该是致命错误", e);
        }
    }

    #[test]
    fn test_connection_failures_are_not_fatal() {
        for e in [
            RequestIsNotUtf8,
            UnSupportedRequestMethod,
            MalformedRequestLine,
            FileNotFound,
            PoolSaturated,
        ] {
            assert!(!e.is_fatal(), "{} 不应该是致命错误", e);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(FileNotFound.to_string(), "File not found (404)");
        assert_eq!(PoolSaturated.to_string(), "Worker pool is saturated");
    }
}

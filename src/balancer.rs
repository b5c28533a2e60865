// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 轮询调度模块
//!
//! 调度器持有一个固定顺序、进程生命周期内不可变的后端列表，以及一个共享的下标。
//! 每次调用 `next()` 返回当前下标处的后端，并将下标推进到 `(index + 1) % N`。
//! 下标的读取与推进在一次原子操作中完成，并发调用时每次调用都观察到唯一的下标。

use crate::exception::Exception;

use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicUsize, Ordering},
};

/// 一个可供跳转的后端地址
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Backend {
    host: String,
    port: u16,
}

impl Backend {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for Backend {
    type Err = Exception;

    /// 解析 `host:port`，端口必须是合法的 u16 且主机名非空
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s.trim().rsplit_once(':').ok_or(Exception::InvalidBackend)?;
        if host.is_empty() || host.chars().any(|c| c.is_whitespace()) {
            return Err(Exception::InvalidBackend);
        }
        let port = port.parse::<u16>().map_err(|_| Exception::InvalidBackend)?;
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

pub struct RoundRobin {
    backends: Vec<Backend>,
    index: AtomicUsize,
}

impl RoundRobin {
    pub fn new(backends: Vec<Backend>) -> Result<Self, Exception> {
        if backends.is_empty() {
            return Err(Exception::NoBackends);
        }
        Ok(Self {
            backends,
            index: AtomicUsize::new(0),
        })
    }

    // 从配置中的字符串列表构造，任何一项非法都视为启动失败
    pub fn from_strings(list: &[String]) -> Result<Self, Exception> {
        let backends = list
            .iter()
            .map(|s| s.parse::<Backend>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(backends)
    }

    /// 返回当前下标处的后端并推进下标
    pub fn next(&self) -> &Backend {
        let len = self.backends.len();
        let previous = match self
            .index
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1) % len))
        {
            Ok(i) | Err(i) => i,
        };
        &self.backends[previous]
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::{exception::Exception, resolver::ResolveMode};

use log::{error, warn};
use serde_derive::{Deserialize, Serialize};

use std::{fs, path::Path};

pub const DEFAULT_POOL_SIZE: usize = 64;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memcached,
    Memory,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CacheConfig {
    backend: CacheBackend,
    address: String,
    expiry: u32,
    capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memcached,
            address: "127.0.0.1:11211".to_string(),
            expiry: 0,
            capacity: 0,
        }
    }
}

impl CacheConfig {
    pub fn backend(&self) -> CacheBackend {
        self.backend
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// 写入缓存时的过期秒数，0 表示永不过期
    pub fn expiry(&self) -> u32 {
        self.expiry
    }

    /// 仅对内存缓存有效，0 表示不限制条目数
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// 两个程序共用的配置。文件中缺失的字段取默认值，调度器只关心 `backends` 及通用字段。
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    www_root: String,
    worker_threads: usize,
    pool_size: usize,
    local: bool,
    resolve_mode: ResolveMode,
    search_dir: String,
    backends: Vec<String>,
    cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: ".".to_string(),
            worker_threads: 0,
            pool_size: DEFAULT_POOL_SIZE,
            local: false,
            resolve_mode: ResolveMode::Heuristic,
            search_dir: "Pictures".to_string(),
            backends: Vec::new(),
            cache: CacheConfig::default(),
        }
    }

    pub fn from_toml(filename: &Path) -> Result<Self, Exception> {
        let text = match fs::read_to_string(filename) {
            Ok(text) => text,
            Err(e) => {
                error!("无法读取配置文件{}：{}", filename.display(), e);
                return Err(Exception::ConfigUnreadable);
            }
        };
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, Exception> {
        let mut raw_config: Config = match toml::from_str(text) {
            Ok(c) => c,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象：{}", e);
                return Err(Exception::ConfigInvalid);
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.pool_size == 0 {
            warn!(
                "pool_size被设置为0，但工作池不能为空，因此该值将被改为{}。",
                DEFAULT_POOL_SIZE
            );
            raw_config.pool_size = DEFAULT_POOL_SIZE;
        }
        Ok(raw_config)
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn resolve_mode(&self) -> ResolveMode {
        self.resolve_mode
    }

    pub fn search_dir(&self) -> &str {
        &self.search_dir
    }

    pub fn backends(&self) -> &[String] {
        &self.backends
    }

    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }
}

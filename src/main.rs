// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # memserve
//!
//! 带缓存的静态文件服务器：`memserve <port> [--config <file>]`。
//!
//! 文件内容以解析后的路径为键保存在 memcached（或进程内缓存）中，
//! 命中时不再读取磁盘。每个连接只处理一个 GET 请求。

use memserve::{
    logger, listen_address, Acceptor, CacheBackend, CacheStore, Cli, Config, Exception,
    FileServer, MemcachedStore, MemoryStore, PathResolver, ReadThroughCache, WorkerPool,
};

use log::{error, info, warn};
use tokio::runtime::Builder;

use std::{path::Path, process, sync::Arc};

const DEFAULT_CONFIG: &str = "config/memserve.toml";

fn main() {
    let cli = Cli::parse_or_exit("memserve");
    logger::init();

    if let Err(e) = run(&cli) {
        error!("{}，服务器无法启动", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Exception> {
    let config = Config::from_toml(&cli.config_or(DEFAULT_CONFIG))?;
    info!("配置文件已载入");
    info!("www root: {}", config.www_root());
    if !Path::new(config.www_root()).is_dir() {
        warn!("www root {}不是一个目录，所有请求都将得到404", config.www_root());
    }

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建运行时：{}", e);
            return Err(Exception::RuntimeUnavailable);
        }
    };
    info!("工作线程数：{}", config.worker_threads());

    runtime.block_on(async {
        let store = open_store(&config).await?;
        let cache = ReadThroughCache::new(store, config.cache().expiry());
        let resolver = PathResolver::new(config.www_root(), config.resolve_mode());
        info!("路径解析模式：{:?}", resolver.mode());
        let handler = Arc::new(FileServer::new(resolver, cache, config.search_dir()));

        let address = listen_address(config.local(), cli.port());
        let acceptor = Acceptor::bind(address).await?;
        info!(
            "服务端将在{}上监听Socket连接，工作池容量{}",
            address,
            config.pool_size()
        );
        acceptor
            .run(handler, WorkerPool::new(config.pool_size()))
            .await;
        Ok(())
    })
}

async fn open_store(config: &Config) -> Result<Arc<dyn CacheStore>, Exception> {
    let cache = config.cache();
    match cache.backend() {
        CacheBackend::Memcached => match MemcachedStore::connect(cache.address()).await {
            Ok(store) => {
                info!("使用memcached缓存：{}", store.address());
                Ok(Arc::new(store))
            }
            Err(e) => {
                error!("无法连接到memcached {}：{}", cache.address(), e);
                Err(Exception::CacheUnreachable)
            }
        },
        CacheBackend::Memory => {
            info!("使用进程内缓存，容量：{}", cache.capacity());
            Ok(Arc::new(MemoryStore::new(cache.capacity())))
        }
    }
}

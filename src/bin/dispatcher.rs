// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # dispatcher
//!
//! 轮询跳转的前端：`dispatcher <port> [--config <file>]`。
//! 每个 GET 请求得到一个指向下一个后端的 meta refresh 页面。

use memserve::{
    logger, listen_address, Acceptor, Cli, Config, Exception, Redirector, RoundRobin, WorkerPool,
};

use log::{error, info};
use tokio::runtime::Builder;

use std::{process, sync::Arc};

const DEFAULT_CONFIG: &str = "config/dispatcher.toml";

fn main() {
    let cli = Cli::parse_or_exit("dispatcher");
    logger::init();

    if let Err(e) = run(&cli) {
        error!("{}，调度器无法启动", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Exception> {
    let config = Config::from_toml(&cli.config_or(DEFAULT_CONFIG))?;
    info!("配置文件已载入");

    let selector = RoundRobin::from_strings(config.backends())?;
    info!("共{}个后端", selector.len());
    for (i, backend) in selector.backends().iter().enumerate() {
        info!("后端{}：{}", i, backend);
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

    runtime.block_on(async {
        let address = listen_address(config.local(), cli.port());
        let acceptor = Acceptor::bind(address).await?;
        info!("调度器将在{}上监听Socket连接", address);
        acceptor
            .run(
                Arc::new(Redirector::new(selector)),
                WorkerPool::new(config.pool_size()),
            )
            .await;
        Ok(())
    })
}

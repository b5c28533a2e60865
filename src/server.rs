// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 监听与工作池
//!
//! `Acceptor` 不断接受新连接，为每个连接分配递增的 ID，并交给 `WorkerPool` 执行。
//! 工作池的容量在启动时确定；池满时新连接被直接丢弃，不会排队等待。

use crate::{exception::Exception, handler::ConnectionHandler};

use log::{debug, error, info, warn};
use tokio::{
    net::TcpListener,
    sync::Semaphore,
    task::JoinHandle,
    time::{sleep, Duration},
};

use std::{
    future::Future,
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
};

// accept() 失败后（例如文件描述符耗尽）的等待时间
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// `local` 为真时只监听回环地址，否则监听全部地址
pub fn listen_address(local: bool, port: u16) -> SocketAddr {
    let address = match local {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    SocketAddr::V4(SocketAddrV4::new(address, port))
}

/// 固定容量的工作池。每个任务持有一个许可，任务结束（包括 panic）时许可被归还。
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// 提交一个任务。没有空闲许可时立即返回 `PoolSaturated`，任务不会被执行。
    pub fn try_submit<F>(&self, task: F) -> Result<JoinHandle<F::Output>, Exception>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| Exception::PoolSaturated)?;
        Ok(tokio::spawn(async move {
            let _permit = permit;
            task.await
        }))
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

pub struct Acceptor {
    listener: TcpListener,
}

impl Acceptor {
    pub async fn bind(addr: SocketAddr) -> Result<Self, Exception> {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("端口{}绑定完成", addr.port());
                Ok(Self { listener })
            }
            Err(e) => {
                error!("无法绑定地址：{}，错误：{}", addr, e);
                Err(Exception::BindFailed)
            }
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 接受连接的主循环，不会返回。
    pub async fn run<H>(self, handler: Arc<H>, pool: WorkerPool)
    where
        H: ConnectionHandler,
    {
        let mut id: u128 = 0;
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("接受连接失败：{}", e);
                    sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            id += 1;
            debug!("[ID{}]接受来自{}的连接", id, peer);

            let handler = Arc::clone(&handler);
            let task = async move { handler.handle(stream, id).await };
            match pool.try_submit(task) {
                Ok(_) => debug!("[ID{}]剩余工作槽位：{}", id, pool.available()),
                Err(e) => warn!("[ID{}]{}，丢弃来自{}的连接", id, e, peer),
            }
        }
    }
}

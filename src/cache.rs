// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 缓存模块
//!
//! - `CacheStore`：外部键值存储需要提供的 `get` / `set` 能力。
//! - `MemcachedStore`：通过 memcached 文本协议访问远端缓存，所有工作任务共用一条连接。
//! - `MemoryStore`：进程内的 LRU 存储，适合单机运行与测试。
//! - `ReadThroughCache`：读穿透语义。未命中时加载、写入、返回；命中时只返回缓存的字节。

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info, warn};
use lru::LruCache;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream},
    net::TcpStream,
    sync::Mutex as AsyncMutex,
    time::timeout,
};

use std::{
    future::Future,
    io,
    num::NonZeroUsize,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// memcached 对键长度的上限
const MAX_KEY_LENGTH: usize = 250;

/// 记录已告警过的无效键的数量上限
const BYPASSED_KEYS: usize = 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// 外部键值存储的能力。实现必须能被多个工作任务同时使用。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 查询键，不存在时返回 `Ok(None)`
    async fn get(&self, key: &str) -> io::Result<Option<Bytes>>;

    /// 写入键，`expiry` 为过期秒数，0 表示永不过期。
    /// 存储拒绝保存该值（例如超过大小上限）时返回 `Ok(false)`。
    async fn set(&self, key: &str, expiry: u32, value: Bytes) -> io::Result<bool>;
}

/// 缓存查询的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    expiry: u32,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>, expiry: u32) -> Self {
        Self { store, expiry }
    }

    /// 命中时直接返回缓存的字节，不调用 `load`；未命中时调用 `load`，写入缓存后返回。
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> io::Result<(Bytes, CacheOutcome)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = io::Result<Bytes>>,
    {
        if let Some(bytes) = self.store.get(key).await? {
            debug!("缓存命中：{}", key);
            return Ok((bytes, CacheOutcome::Hit));
        }
        let bytes = load().await?;
        self.store_value(key, bytes.clone()).await?;
        Ok((bytes, CacheOutcome::Miss))
    }

    /// 无条件覆盖缓存中的值并返回它。用于每次请求都要重新生成的内容。
    pub async fn refresh(&self, key: &str, value: Bytes) -> io::Result<Bytes> {
        self.store_value(key, value.clone()).await?;
        Ok(value)
    }

    async fn store_value(&self, key: &str, value: Bytes) -> io::Result<()> {
        let len = value.len();
        if self.store.set(key, self.expiry, value).await? {
            debug!("已写入缓存：{}（{} bytes）", key, len);
        } else {
            warn!("缓存拒绝保存{}（{} bytes），本次直接返回", key, len);
        }
        Ok(())
    }
}

struct MemoryEntry {
    content: Bytes,
    expires_at: Option<Instant>,
}

/// 进程内 LRU 存储。容量为 0 时不做淘汰。
pub struct MemoryStore {
    entries: Mutex<LruCache<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        let cache = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(cache),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, MemoryEntry>> {
        match self.entries.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("缓存锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> io::Result<Option<Bytes>> {
        let mut cache = self.lock();
        let expired = match cache.get(key) {
            Some(entry) => match entry.expires_at {
                Some(deadline) if Instant::now() >= deadline => true,
                _ => return Ok(Some(entry.content.clone())),
            },
            None => return Ok(None),
        };
        if expired {
            cache.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, expiry: u32, value: Bytes) -> io::Result<bool> {
        let expires_at = match expiry {
            0 => None,
            secs => Some(Instant::now() + Duration::from_secs(u64::from(secs))),
        };
        let entry = MemoryEntry {
            content: value,
            expires_at,
        };
        self.lock().put(key.to_string(), entry);
        Ok(true)
    }
}

/// memcached 文本协议客户端。
///
/// 一条 TCP 连接由异步互斥锁串行化；连接出错后被丢弃，下一次调用时重新建立。
pub struct MemcachedStore {
    address: String,
    connection: AsyncMutex<Option<BufStream<TcpStream>>>,
    bypassed: Mutex<LruCache<String, ()>>,
}

impl MemcachedStore {
    /// 建立连接并发送 `version` 确认服务可用。
    pub async fn connect(address: &str) -> io::Result<Self> {
        let mut conn = open(address).await?;
        let version = command_version(&mut conn).await?;
        info!("已连接到memcached {}，{}", address, version);
        Ok(Self {
            address: address.to_string(),
            connection: AsyncMutex::new(Some(conn)),
            bypassed: Mutex::new(LruCache::new(
                NonZeroUsize::new(BYPASSED_KEYS).unwrap_or(NonZeroUsize::MIN),
            )),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn ensure_open(&self, slot: &mut Option<BufStream<TcpStream>>) -> io::Result<()> {
        if slot.is_none() {
            info!("重新连接到memcached {}", self.address());
            *slot = Some(open(self.address()).await?);
        }
        Ok(())
    }

    /// 无效键不会发往 memcached，该文件每次都从磁盘读取。
    /// 同一个键只在第一次出现时告警，首次出现返回 `true`。
    fn note_invalid_key(&self, key: &str) -> bool {
        let first = match self.bypassed.lock() {
            Ok(mut seen) => seen.put(key.to_string(), ()).is_none(),
            Err(poisoned) => poisoned.into_inner().put(key.to_string(), ()).is_none(),
        };
        if first {
            warn!("键不符合memcached规则，该文件将不被缓存：{}", key);
        } else {
            debug!("跳过无效键：{}", key);
        }
        first
    }
}

#[async_trait]
impl CacheStore for MemcachedStore {
    async fn get(&self, key: &str) -> io::Result<Option<Bytes>> {
        if !valid_key(key) {
            self.note_invalid_key(key);
            return Ok(None);
        }
        let mut guard = self.connection.lock().await;
        self.ensure_open(&mut guard).await?;
        let conn = guard.as_mut().ok_or_else(not_connected)?;
        let result = command_get(conn, key).await;
        if result.is_err() {
            *guard = None;
        }
        result
    }

    async fn set(&self, key: &str, expiry: u32, value: Bytes) -> io::Result<bool> {
        if !valid_key(key) {
            self.note_invalid_key(key);
            return Ok(false);
        }
        let mut guard = self.connection.lock().await;
        self.ensure_open(&mut guard).await?;
        let conn = guard.as_mut().ok_or_else(not_connected)?;
        let result = command_set(conn, key, expiry, &value).await;
        if result.is_err() {
            *guard = None;
        }
        result
    }
}

async fn open(address: &str) -> io::Result<BufStream<TcpStream>> {
    let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(address))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "memcached connect timed out"))??;
    stream.set_nodelay(true)?;
    Ok(BufStream::new(stream))
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "memcached connection unavailable")
}

fn protocol_error(reply: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("unexpected memcached reply: {}", reply),
    )
}

// 键不能为空、不能超过 250 字节、不能含空白与控制字符
fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && !key.bytes().any(|b| b <= b' ' || b == 0x7f)
}

async fn read_reply<S>(conn: &mut S) -> io::Result<String>
where
    S: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if conn.read_line(&mut line).await? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "memcached closed the connection",
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn command_version<S>(conn: &mut S) -> io::Result<String>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    conn.write_all(b"version\r\n").await?;
    conn.flush().await?;
    let reply = read_reply(conn).await?;
    if reply.starts_with("VERSION") {
        Ok(reply)
    } else {
        Err(protocol_error(&reply))
    }
}

async fn command_get<S>(conn: &mut S, key: &str) -> io::Result<Option<Bytes>>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    conn.write_all(format!("get {}\r\n", key).as_bytes()).await?;
    conn.flush().await?;

    let header = read_reply(conn).await?;
    if header == "END" {
        return Ok(None);
    }
    let parts: Vec<&str> = header.split(' ').collect();
    let len = match parts.as_slice() {
        ["VALUE", k, _flags, len, ..] if *k == key => {
            len.parse::<usize>().map_err(|_| protocol_error(&header))?
        }
        _ => return Err(protocol_error(&header)),
    };

    let mut data = vec![0u8; len + 2];
    conn.read_exact(&mut data).await?;
    if &data[len..] != b"\r\n" {
        return Err(protocol_error("data block is not terminated by CRLF"));
    }
    data.truncate(len);

    let end = read_reply(conn).await?;
    if end != "END" {
        return Err(protocol_error(&end));
    }
    Ok(Some(Bytes::from(data)))
}

async fn command_set<S>(conn: &mut S, key: &str, expiry: u32, value: &[u8]) -> io::Result<bool>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    conn.write_all(format!("set {} 0 {} {}\r\n", key, expiry, value.len()).as_bytes())
        .await?;
    conn.write_all(value).await?;
    conn.write_all(b"\r\n").await?;
    conn.flush().await?;

    let reply = read_reply(conn).await?;
    match reply.as_str() {
        "STORED" => Ok(true),
        "NOT_STORED" => Ok(false),
        r if r.starts_with("SERVER_ERROR") => {
            warn!("memcached拒绝写入{}：{}", key, r);
            Ok(false)
        }
        _ => Err(protocol_error(&reply)),
    }
}

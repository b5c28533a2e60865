// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理模块
//!
//! 每个连接只处理一个请求，处理完毕后关闭：
//! - `FileServer`：读取请求 → 解析 → 路径解析 → 查询缓存 → 构造响应 → 写出 → 关闭。
//! - `Redirector`：读取请求 → 解析 → 轮询选出一个后端 → 写出跳转页面 → 关闭。
//!
//! 非 GET 请求不写出任何字节；I/O 错误被记录后直接关闭连接，不影响其他连接。

use crate::{
    balancer::RoundRobin,
    cache::{CacheOutcome, ReadThroughCache},
    exception::Exception,
    param::{HttpRequestMethod, RESULTS_PAGE},
    request::{read_head, Request},
    resolver::PathResolver,
    response::{content_type, Response},
    util::{find_images, search_term, HtmlBuilder},
};

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error, info, warn};
use tokio::io::{
    split, AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, WriteHalf,
};

use std::{io, path::Path};

/// 处理一个已建立的连接。实现者在所有退出路径上都要释放该连接。
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn handle<S>(&self, stream: S, id: u128)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static;
}

/// 读取并解析请求。连接在发送任何数据前关闭，或者请求行不合法时返回 `Ok(None)`。
async fn read_request<R>(reader: &mut R, id: u128) -> io::Result<Option<Request>>
where
    R: AsyncBufRead + Unpin,
{
    let head = match read_head(reader).await? {
        Some(head) => head,
        None => {
            debug!("[ID{}]客户端未发送任何数据即关闭了连接", id);
            return Ok(None);
        }
    };
    debug!("[ID{}]\n{}", id, head.dump());
    match Request::try_from(&head, id) {
        Ok(request) => Ok(Some(request)),
        Err(e) => {
            warn!("[ID{}]{}：{}", id, e, head.line_lossy());
            Ok(None)
        }
    }
}

// 只处理 GET，其余方法记录后不作任何响应
fn accept_method(request: &Request, id: u128) -> bool {
    if request.method() == HttpRequestMethod::Get {
        return true;
    }
    warn!(
        "[ID{}]不支持的请求方法{}，连接将被直接关闭",
        id,
        request.method()
    );
    false
}

async fn close<S>(mut writer: WriteHalf<S>, id: u128)
where
    S: AsyncWrite,
{
    if let Err(e) = writer.shutdown().await {
        debug!("[ID{}]关闭连接时出错：{}", id, e);
    }
    debug!("[ID{}]连接已关闭", id);
}

/// 带缓存的静态文件服务
pub struct FileServer {
    resolver: PathResolver,
    cache: ReadThroughCache,
    search_dir: String,
}

impl FileServer {
    pub fn new(resolver: PathResolver, cache: ReadThroughCache, search_dir: &str) -> Self {
        Self {
            resolver,
            cache,
            search_dir: search_dir.to_string(),
        }
    }

    async fn serve<R, W>(&self, reader: &mut R, writer: &mut W, id: u128) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let request = match read_request(reader, id).await? {
            Some(request) => request,
            None => return Ok(()),
        };
        if !accept_method(&request, id) {
            return Ok(());
        }

        let response = match search_term(request.target()) {
            Some(term) => self.search_response(&term, id).await?,
            None => self.file_response(request.target(), id).await?,
        };
        info!(
            "[ID{}]{} {} {} {} ({} bytes), {}",
            id,
            request.method(),
            request.target(),
            response.status_code(),
            response.information(),
            response.content().len(),
            request.user_agent(),
        );
        response.write_to(writer).await
    }

    async fn file_response(&self, target: &str, id: u128) -> io::Result<Response> {
        let path = match self.resolver.resolve(target) {
            Some(path) => path,
            None => {
                debug!("[ID{}]{}：{}", id, Exception::FileNotFound, target);
                return Ok(Response::response_404());
            }
        };

        let key = path.to_string_lossy().into_owned();
        let file = &path;
        let (content, outcome) = self
            .cache
            .get_or_load(&key, move || async move {
                tokio::fs::read(file).await.map(Bytes::from)
            })
            .await?;
        match outcome {
            CacheOutcome::Hit => debug!("[ID{}]缓存命中：{}", id, key),
            CacheOutcome::Miss => debug!("[ID{}]缓存未命中，已从磁盘读取：{}", id, key),
        }
        Ok(Response::from_file(content, content_type(&path)))
    }

    // 搜索结果页每次都重新生成并覆盖同一个键，不会返回过期的内容
    async fn search_response(&self, term: &str, id: u128) -> io::Result<Response> {
        let dir = self.resolver.root().join(&self.search_dir);
        let names = find_images(&dir, term).await?;
        debug!("[ID{}]搜索“{}”，匹配到{}个文件", id, term, names.len());

        let page = HtmlBuilder::search_results(term, &self.search_dir, &names).build();
        let key = self
            .resolver
            .root()
            .join(RESULTS_PAGE)
            .to_string_lossy()
            .into_owned();
        let content = self.cache.refresh(&key, Bytes::from(page)).await?;
        Ok(Response::from_file(
            content,
            content_type(Path::new(RESULTS_PAGE)),
        ))
    }
}

#[async_trait]
impl ConnectionHandler for FileServer {
    async fn handle<S>(&self, stream: S, id: u128)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, mut writer) = split(stream);
        let mut reader = BufReader::new(reader);
        if let Err(e) = self.serve(&mut reader, &mut writer, id).await {
            error!("[ID{}]处理连接时发生I/O错误：{}", id, e);
        }
        close(writer, id).await;
    }
}

/// 轮询跳转的调度器
pub struct Redirector {
    selector: RoundRobin,
}

impl Redirector {
    pub fn new(selector: RoundRobin) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &RoundRobin {
        &self.selector
    }

    async fn serve<R, W>(&self, reader: &mut R, writer: &mut W, id: u128) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let request = match read_request(reader, id).await? {
            Some(request) => request,
            None => return Ok(()),
        };
        if !accept_method(&request, id) {
            return Ok(());
        }

        // 方法检查通过之后才推进轮询下标
        let backend = self.selector.next();
        info!(
            "[ID{}]{} {} -> {}",
            id,
            request.method(),
            request.target(),
            backend
        );
        Response::redirect(backend).write_to(writer).await
    }
}

#[async_trait]
impl ConnectionHandler for Redirector {
    async fn handle<S>(&self, stream: S, id: u128)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, mut writer) = split(stream);
        let mut reader = BufReader::new(reader);
        if let Err(e) = self.serve(&mut reader, &mut writer, id).await {
            error!("[ID{}]处理连接时发生I/O错误：{}", id, e);
        }
        close(writer, id).await;
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 该模块负责从连接中读取请求报文的头部，并将请求行解析为强类型的 `Request` 结构体：
//! 1. `read_head` 逐行读取请求行与全部请求头，直到空行或连接关闭。
//! 2. `Request::try_from` 解析请求行中的方法、目标与协议版本。
//!
//! 请求体（Body）从不读取：服务器只处理 GET 请求。

use crate::{exception::Exception, param::*};

use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use std::io;

/// 从连接中读到的原始请求头部：请求行原样保留，请求头只用于日志。
#[derive(Debug, Clone, Default)]
pub struct RequestHead {
    line: Vec<u8>,
    headers: Vec<String>,
}

impl RequestHead {
    /// 请求行的文本形式（非法 UTF-8 以替换字符显示），用于日志输出
    pub fn line_lossy(&self) -> String {
        String::from_utf8_lossy(&self.line).into_owned()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 将请求行与全部请求头拼成一条多行日志，保证同一连接的请求头在日志中不会被其他连接打断
    pub fn dump(&self) -> String {
        let mut out = String::from("---------- Begin client request header -----\n");
        out.push_str(&self.line_lossy());
        out.push('\n');
        for header in &self.headers {
            out.push_str(header);
            out.push('\n');
        }
        out.push_str("----------- End client header------------");
        out
    }
}

/// 读取请求行与请求头。
///
/// 客户端在发送任何数据之前关闭连接时返回 `Ok(None)`。请求头读到空行或连接关闭为止，
/// 超过 `MAX_HEADER_LINES` 的行仍然被读出，只是不再保留。
pub async fn read_head<R>(reader: &mut R) -> io::Result<Option<RequestHead>>
where
    R: AsyncBufRead + Unpin,
{
    let line = match read_line(reader).await? {
        Some(line) => line,
        None => return Ok(None),
    };

    let mut headers = Vec::new();
    let mut dropped = 0usize;
    // 请求头必须读到空行为止，否则关闭连接时未读的数据会使内核发送 RST
    while let Some(raw) = read_line(reader).await? {
        if raw.is_empty() {
            break;
        }
        if headers.len() < MAX_HEADER_LINES {
            headers.push(String::from_utf8_lossy(&raw).into_owned());
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        debug!("请求头超过{}行，丢弃了其余{}行", MAX_HEADER_LINES, dropped);
    }

    Ok(Some(RequestHead { line, headers }))
}

// 读取一行并去掉行尾的 CRLF（或单独的 LF）
async fn read_line<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(MAX_LINE_LENGTH)
        .read_until(b'\n', &mut buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') && n as u64 == MAX_LINE_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request line exceeds length limit",
        ));
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(buf))
}

/// 解析后的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法
    method: HttpRequestMethod,
    /// 请求目标（路径加上可选的查询字符串）
    target: String,
    /// 协议版本，请求行中缺失时为 `None`
    version: Option<String>,
    /// 客户端标识字符串
    user_agent: String,
}

impl Request {
    /// 从请求头部构建 `Request`。
    ///
    /// 方法名区分大小写，只识别标准的大写形式；无法识别的方法与缺失目标的请求行都被视为协议违规。
    pub fn try_from(head: &RequestHead, id: u128) -> Result<Self, Exception> {
        let line = match std::str::from_utf8(&head.line) {
            Ok(line) => line,
            Err(_) => {
                debug!("[ID{}]请求行不是合法的UTF-8", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut tokens = line.split_whitespace();
        let method = match tokens.next() {
            Some("GET") => HttpRequestMethod::Get,
            Some("HEAD") => HttpRequestMethod::Head,
            Some("OPTIONS") => HttpRequestMethod::Options,
            Some("POST") => HttpRequestMethod::Post,
            Some("PUT") => HttpRequestMethod::Put,
            Some("DELETE") => HttpRequestMethod::Delete,
            Some(other) => {
                debug!("[ID{}]不支持的HTTP请求方法：{}", id, other);
                return Err(Exception::UnSupportedRequestMethod);
            }
            None => {
                debug!("[ID{}]请求行为空", id);
                return Err(Exception::MalformedRequestLine);
            }
        };

        let target = match tokens.next() {
            Some(target) => target.to_string(),
            None => {
                debug!("[ID{}]HTTP请求行缺少请求目标：{}", id, line);
                return Err(Exception::MalformedRequestLine);
            }
        };
        let version = tokens.next().map(|v| v.to_string());

        let user_agent = head
            .headers
            .iter()
            .find_map(|h| {
                let (name, value) = h.split_once(':')?;
                name.trim()
                    .eq_ignore_ascii_case("user-agent")
                    .then(|| value.trim().to_string())
            })
            .unwrap_or_default();

        Ok(Self {
            method,
            target,
            version,
            user_agent,
        })
    }
}

impl Request {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::{balancer::Backend, param::*, util::HtmlBuilder};

use bytes::Bytes;
use log::error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use std::{io, path::Path};

/// 一个完整组帧的 HTTP 响应。
///
/// 头部在构造时就已确定，写出时先一次性写出头部，再写出正文，不会出现只写了一半头部的响应。
#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    information: String,
    header_lines: Vec<String>,
    content: Bytes,
}

impl Response {
    fn new(code: u16) -> Self {
        let mut response = Self {
            status_code: 200,
            information: "OK".to_string(),
            header_lines: Vec::new(),
            content: Bytes::new(),
        };
        response.set_code(code);
        response
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&info) => info.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown".to_string()
            }
        };
        self
    }

    /// 文件内容响应。无法识别的类型不携带 Content-type 头。
    pub fn from_file(content: Bytes, mime: Option<&str>) -> Self {
        let mut response = Self::new(200);
        if let Some(mime) = mime {
            response.header_lines.push(format!("Content-type: {}", mime));
        }
        response.content = content;
        response
    }

    /// 固定的 404 页面，3 秒后跳转回首页。
    ///
    /// 这里的类型行是裸的 `text/html`，与既有客户端看到的报文保持一致。
    pub fn response_404() -> Self {
        let mut response = Self::new(404);
        response.header_lines.push("text/html".to_string());
        response.content = Bytes::from(HtmlBuilder::not_found().build());
        response
    }

    /// 调度器的跳转页面，没有任何响应头。
    pub fn redirect(backend: &Backend) -> Self {
        let mut response = Self::new(200);
        response.content = Bytes::from(HtmlBuilder::redirect(backend).build());
        response
    }

    /// 状态行、响应头与结尾空行
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}{}", self.status_code, self.information, CRLF);
        for line in &self.header_lines {
            head.push_str(line);
            head.push_str(CRLF);
        }
        head.push_str(CRLF);
        head.into_bytes()
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        [self.head_bytes().as_slice(), &self.content[..]].concat()
    }

    /// 写出头部与正文并刷新。
    pub async fn write_to<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.head_bytes()).await?;
        writer.write_all(&self.content).await?;
        writer.flush().await
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_lines
            .iter()
            .find_map(|line| line.strip_prefix("Content-type: "))
    }
}

/// 根据文件后缀名确定 MIME 类型，未知类型返回 `None`。
///
/// 与后缀名做区分大小写的匹配，`INDEX.HTML` 不会被识别。
pub fn content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?;
    MIME_TYPES.get(extension).copied()
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了 `memserve` 与 `dispatcher` 共用的 HTTP 协议常量和数据结构，包括：
//! - 状态码及其原因短语（Reason Phrase）。
//! - 文件后缀名到 MIME 类型的映射表。
//! - HTTP 方法的强类型枚举。

use lazy_static::lazy_static;
use std::collections::HashMap;

/// 请求目标为 `/` 时使用的默认文档
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// 搜索结果页面的固定名称，决定了它的 Content-Type
pub const RESULTS_PAGE: &str = "viewResults.html";

/// 404 页面在客户端倒计时结束后跳转的目标
pub const NOT_FOUND_REDIRECT: &str = "/index.html";

/// 404 页面跳转前的等待时间（毫秒）
pub const NOT_FOUND_DELAY_MS: u64 = 3000;

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 单行（请求行或请求头）允许的最大字节数
pub const MAX_LINE_LENGTH: u64 = 8192;

/// 请求头的最大行数，超出部分不再读取
pub const MAX_HEADER_LINES: usize = 100;

lazy_static! {
    /// 服务器会产生的状态码及其原因短语。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(404, "Not Found");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型的映射表。
    ///
    /// 表外的后缀一律视为未知类型，响应中不携带 Content-type 头，而不是猜测一个值。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("html", "text/html; charset=UTF-8");
        map.insert("htm", "text/html; charset=UTF-8");
        map.insert("css", "text/css; charset=UTF-8");
        map.insert("js", "text/javascript; charset=UTF-8");
        map.insert("gif", "image/gif");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map.insert("png", "image/png");
        map.insert("pdf", "application/pdf");
        map
    };
}

/// 标准 HTTP 请求方法。服务器只处理 `Get`，其余方法会被识别后丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Options,
    Post,
    Put,
    Delete,
}

use std::fmt;

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
            HttpRequestMethod::Options => write!(f, "OPTIONS"),
            HttpRequestMethod::Post => write!(f, "POST"),
            HttpRequestMethod::Put => write!(f, "PUT"),
            HttpRequestMethod::Delete => write!(f, "DELETE"),
        }
    }
}

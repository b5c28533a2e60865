// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径解析模块
//!
//! 将客户端提交的任意请求目标映射为文档根目录下一个已存在的文件，或者“不存在”。
//!
//! 提供两种模式：
//! - `Heuristic`：基于字符串替换的两轮尝试。第一轮折叠分隔符、消除 `..`、去掉结尾的 `/`；
//!   第一轮找不到文件时补上 `./` 前缀，再做一轮清理与截断后重试。该算法可以被特殊输入欺骗，
//!   但所有候选路径都挂在文档根目录之下，且永远不会出现 `..` 分量。
//! - `Strict`：规范化为绝对路径（解析符号链接），并验证其位于规范化后的根目录之内。
//!
//! 两种模式都不会返回错误：任何异常情况都归结为 `None`。

use crate::param::DEFAULT_DOCUMENT;

use log::debug;
use serde_derive::{Deserialize, Serialize};

use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    #[default]
    Heuristic,
    Strict,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    mode: ResolveMode,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, mode: ResolveMode) -> Self {
        Self {
            root: root.into(),
            mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    pub fn resolve(&self, target: &str) -> Option<PathBuf> {
        let resolved = match self.mode {
            ResolveMode::Heuristic => self.resolve_heuristic(target),
            ResolveMode::Strict => self.resolve_strict(target),
        };
        debug!("路径解析：{:?} -> {:?}", target, resolved);
        resolved
    }

    fn resolve_heuristic(&self, target: &str) -> Option<PathBuf> {
        let mut name = if target == "/" {
            format!("/{}", DEFAULT_DOCUMENT)
        } else {
            target.to_string()
        };

        // 第一轮
        name = collapse_separators(name);
        name = collapse_dots(name);
        strip_trailing_separator(&mut name);
        if let Some(found) = self.lookup(&name) {
            return Some(found);
        }

        // 第二轮
        if !name.starts_with("./") {
            name.insert_str(0, "./");
        }
        name = collapse_dots(name);
        name = collapse_separators(name);
        strip_trailing_separator(&mut name);
        name = name.replace("/.", "/");
        // 开头的 "./" 之后还剩两个以上的 '.' 时，截掉最后一个 '.' 及其之后的内容
        if name[1..].matches('.').count() >= 2 {
            if let Some(pos) = name.rfind('.') {
                name.truncate(pos);
            }
        }
        self.lookup(&name)
    }

    // 候选路径总是挂在根目录之下；第一轮/第二轮产生的 "./" 分量在拼接后被消去
    fn lookup(&self, candidate: &str) -> Option<PathBuf> {
        if candidate.contains('\0') {
            return None;
        }
        let relative = candidate.trim_start_matches('/');
        let path: PathBuf = self.root.join(relative).components().collect();
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    fn resolve_strict(&self, target: &str) -> Option<PathBuf> {
        let path = target
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or("");
        let relative = match path.trim_start_matches('/') {
            "" => DEFAULT_DOCUMENT,
            p => p,
        };
        if relative.contains('\0') {
            return None;
        }

        let root = self.root.canonicalize().ok()?;
        let candidate = root.join(relative).canonicalize().ok()?;
        if !candidate.starts_with(&root) {
            debug!("拒绝越出根目录的路径：{}", candidate.display());
            return None;
        }
        match fs::metadata(&candidate) {
            Ok(meta) if meta.is_file() => Some(candidate),
            _ => None,
        }
    }
}

// 反复把 "//" 替换为 "/"，直到不再出现
fn collapse_separators(mut name: String) -> String {
    while name.contains("//") {
        name = name.replace("//", "/");
    }
    name
}

// 反复把 ".." 替换为 "."，直到不再出现
fn collapse_dots(mut name: String) -> String {
    while name.contains("..") {
        name = name.replace("..", ".");
    }
    name
}

fn strip_trailing_separator(name: &mut String) {
    if name.ends_with('/') {
        name.pop();
    }
}

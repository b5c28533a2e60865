// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::exception::Exception;

use clap::{error::ErrorKind, CommandFactory, FromArgMatches, Parser};

use std::{ffi::OsString, path::PathBuf, process};

/// 两个程序共用的命令行参数：`<port> [--config <file>]`
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Cli {
    /// 监听端口，取值范围 [1024, 65535]
    #[arg(value_parser = clap::value_parser!(u16).range(1024..=65535))]
    port: u16,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    pub fn try_parse_args<I, T>(bin: &'static str, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().name(bin).try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    /// 解析进程参数。`--help` 与 `--version` 正常退出，其余错误打印用法后以状态码 1 退出。
    pub fn parse_or_exit(bin: &'static str) -> Self {
        match Self::try_parse_args(bin, std::env::args_os()) {
            Ok(cli) => cli,
            Err(e) => match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
                kind => {
                    if matches!(kind, ErrorKind::ValueValidation | ErrorKind::InvalidValue) {
                        eprintln!("{}", Exception::InvalidPort);
                    }
                    let _ = e.print();
                    process::exit(1)
                }
            },
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 命令行给出的配置文件，否则使用 `default`
    pub fn config_or(&self, default: &str) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(default))
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use log::{info, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use std::path::Path;

pub const LOG_CONFIG: &str = "config/log4rs.yaml";

const FALLBACK_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}";

/// 初始化日志系统。优先读取 `config/log4rs.yaml`，文件不存在或无法解析时退回到 info 级别的控制台输出。
pub fn init() {
    init_from(Path::new(LOG_CONFIG));
}

pub fn init_from(path: &Path) {
    if path.exists() {
        match log4rs::init_file(path, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("无法从{}初始化日志：{}，改用控制台输出", path.display(), e),
        }
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FALLBACK_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("日志系统已经初始化：{}", e);
                return;
            }
            info!("未找到日志配置文件，使用默认的控制台输出");
        }
        Err(e) => eprintln!("无法构建默认日志配置：{}", e),
    }
}

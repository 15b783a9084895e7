// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Snippetbox
//!
//! 启动流程：日志 → 配置 → 运行时 → 数据库 → 模板缓存 → 监听端口 → 控制台与主循环。
//! 任一必需资源初始化失败都会记录错误并以非零状态退出。

use snippetbox::{
    server::{self, ServerState},
    App, Config, SnippetModel, TemplateCache,
};

use log::{error, info};
use tokio::{io::BufReader, runtime::Builder};

use std::{env, process, sync::Arc, time::Duration};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const DEFAULT_CONFIG: &str = "config/development.toml";

fn main() {
    if let Err(e) = log4rs::init_file(LOG_CONFIG, Default::default()) {
        eprintln!("无法从{}初始化日志系统：{}", LOG_CONFIG, e);
        process::exit(1);
    }

    // 第一个命令行参数可以指定配置文件路径
    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::from_toml(&config_path);
    info!("配置文件{}已载入", config_path);

    let worker_threads = config.worker_threads();
    let runtime = match Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("snippetbox-worker")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            process::exit(1);
        }
    };
    info!("异步运行时已创建，工作线程数：{}", worker_threads);

    runtime.block_on(run(config));
    // 控制台可能仍阻塞在标准输入上
    runtime.shutdown_timeout(Duration::from_secs(1));
}

async fn run(config: Config) {
    let snippets = match SnippetModel::open(config.database()) {
        Ok(model) => model,
        Err(e) => {
            error!("无法打开数据库{}：{}", config.database(), e);
            process::exit(1);
        }
    };
    info!("数据库{}已就绪", config.database());

    let templates = match TemplateCache::new(config.html_dir()) {
        Ok(templates) => templates,
        Err(e) => {
            error!("无法构建模板缓存：{}", e);
            process::exit(1);
        }
    };

    let listener = match server::bind(&config).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", config.port(), e);
            process::exit(1);
        }
    };
    info!("端口{}绑定完成", config.port());

    let app = Arc::new(App::new(&config, templates, Arc::new(snippets)));
    let state = Arc::new(ServerState::new());

    tokio::spawn(server::run_console(
        BufReader::new(tokio::io::stdin()),
        Arc::clone(&state),
    ));

    server::serve(listener, app, state, config.max_request_size()).await;
}

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    port: u16,
    local: bool,
    worker_threads: usize,
    cache_size: usize,
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_html_dir")]
    html_dir: String,
    #[serde(default = "default_static_dir")]
    static_dir: String,
    #[serde(default = "default_max_request_size")]
    max_request_size: usize,
}

fn default_database() -> String {
    "snippetbox.db".to_string()
}

fn default_html_dir() -> String {
    "ui/html".to_string()
}

fn default_static_dir() -> String {
    "ui/static".to_string()
}

fn default_max_request_size() -> usize {
    1048576 // 1MB
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: 4000,
            local: true,
            worker_threads: 0,
            cache_size: 5,
            database: default_database(),
            html_dir: default_html_dir(),
            static_dir: default_static_dir(),
            max_request_size: default_max_request_size(),
        }
    }

    /// 从 TOML 文件读取配置。文件缺失或格式错误时退回默认配置，不会中断启动。
    pub fn from_toml(filename: &str) -> Self {
        let mut str_val = String::new();
        let read = File::open(filename).and_then(|mut file| file.read_to_string(&mut str_val));
        if let Err(e) = read {
            error!("无法读取配置文件{}：{}，使用默认配置", filename, e);
            return Self::new().normalized();
        }
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(str_val: &str) -> Self {
        let raw_config = match toml::from_str::<Config>(str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象：{}，使用默认配置", e);
                Config::new()
            }
        };
        raw_config.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.cache_size == 0 {
            warn!("cache_size被设置为0，但目前尚不支持禁用缓存，因此该值将被改为5。");
            self.cache_size = 5;
        }
        self
    }

    /// 覆盖数据库路径
    pub fn with_database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn with_static_dir(mut self, static_dir: &str) -> Self {
        self.static_dir = static_dir.to_string();
        self
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn html_dir(&self) -> &str {
        &self.html_dir
    }

    pub fn static_dir(&self) -> &str {
        &self.static_dir
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }
}

use crate::{cache::AssetCache, exception::Exception, param::*, util::HtmlBuilder};

use bytes::Bytes;
use chrono::prelude::*;
use flate2::{
    write::{GzEncoder, ZlibEncoder},
    Compression,
};
use log::{debug, error, warn};

use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{self, Read, Write},
    path::Path,
    sync::Mutex,
};

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    content_length: u64,
    date: DateTime<Utc>,
    content_encoding: Option<HttpEncoding>,
    server_name: String,
    allow: Option<Vec<HttpRequestMethod>>,
    location: Option<String>,
    headers: Vec<(String, String)>,
    content: Option<Bytes>,
    head_only: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            content_length: 0,
            date: Utc::now(),
            content_encoding: None,
            server_name: SERVER_NAME.to_string(),
            allow: None,
            location: None,
            headers: Vec::new(),
            content: None,
            head_only: false,
        }
    }

    /// 以给定状态码返回一段已经完整渲染好的 HTML。
    pub fn from_html(code: u16, html: &str, accept_encoding: &[HttpEncoding], id: u128) -> Self {
        let mut response = Self::new();
        response.set_code(code);
        response.content_encoding = decide_encoding(accept_encoding);
        debug!("[ID{}]开始压缩HTML，原始大小: {} bytes", id, html.len());
        let content = match compress(Vec::from(html), response.content_encoding) {
            Ok(c) => c,
            Err(e) => {
                error!("[ID{}]压缩HTML失败: {}，返回未压缩内容", id, e);
                response.content_encoding = None;
                Vec::from(html)
            }
        };
        if response.content_encoding.is_some() {
            response.set_header("Vary", "Accept-Encoding");
        }
        response.content_type = Some("text/html;charset=utf-8".to_string());
        response.set_content(Bytes::from(content));
        response
    }

    /// 通用的错误或状态页面，只包含状态码与原因短语，不泄露任何内部细节。
    pub fn from_status_code(code: u16, accept_encoding: &[HttpEncoding], id: u128) -> Self {
        let html = HtmlBuilder::from_status_code(code).build();
        Self::from_html(code, &html, accept_encoding, id)
    }

    /// `303 See Other` 重定向
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new();
        response.set_code(303);
        response.location = Some(location.to_string());
        response
    }

    /// `204 No Content`，用于 OPTIONS 请求
    pub fn no_content(allow: Vec<HttpRequestMethod>) -> Self {
        let mut response = Self::new();
        response.set_code(204);
        response.allow = Some(allow);
        response
    }

    /// 读取一个静态资源文件，命中缓存时不再访问磁盘内容。
    ///
    /// 路径不存在或是目录时返回 [`Exception::FileNotFound`]。
    pub fn from_file(
        path: &Path,
        accept_encoding: &[HttpEncoding],
        cache: &Mutex<AssetCache>,
        id: u128,
    ) -> Result<Self, Exception> {
        let metadata = fs::metadata(path).map_err(|_| Exception::FileNotFound)?;
        if !metadata.is_file() {
            debug!("[ID{}]{}不是普通文件", id, path.display());
            return Err(Exception::FileNotFound);
        }
        let modified_time = metadata.modified().map_err(|e| {
            error!("[ID{}]无法获取文件{}的修改时间: {}", id, path.display(), e);
            Exception::FileNotFound
        })?;
        let key = path.to_string_lossy().into_owned();
        let mime = get_mime(path.extension().unwrap_or_default());

        let cached = {
            let mut cache_lock = match cache.lock() {
                Ok(lock) => lock,
                Err(poisoned) => {
                    warn!("[ID{}]缓存锁被污染，恢复并继续", id);
                    poisoned.into_inner()
                }
            };
            cache_lock.find(&key, modified_time)
        };

        let original = match cached {
            Some(bytes) => {
                debug!("[ID{}]缓存命中: {}", id, key);
                bytes
            }
            None => {
                debug!("[ID{}]缓存未命中或文件已修改，读取文件: {}", id, key);
                let mut contents = Vec::new();
                File::open(path)
                    .and_then(|mut file| file.read_to_end(&mut contents))
                    .map_err(|e| {
                        error!("[ID{}]无法读取文件{}。错误：{}", id, key, e);
                        Exception::FileNotFound
                    })?;
                let bytes = Bytes::from(contents);
                if AssetCache::should_cache(metadata.len()) {
                    let mut cache_lock = match cache.lock() {
                        Ok(lock) => lock,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    cache_lock.push(&key, bytes.clone(), modified_time);
                    debug!("[ID{}]文件已加入缓存", id);
                }
                bytes
            }
        };

        let mut response = Self::new();
        response.content_type = Some(mime.to_string());
        if !should_skip_compression(mime) {
            response.content_encoding = decide_encoding(accept_encoding);
        }
        let content = match response.content_encoding {
            None => original,
            Some(_) => match compress(original.to_vec(), response.content_encoding) {
                Ok(c) => {
                    response.set_header("Vary", "Accept-Encoding");
                    Bytes::from(c)
                }
                Err(e) => {
                    error!("[ID{}]压缩文件{}失败: {}，返回未压缩内容", id, key, e);
                    response.content_encoding = None;
                    original
                }
            },
        };
        response.set_content(content);
        Ok(response)
    }

    fn set_content(&mut self, content: Bytes) -> &mut Self {
        self.content_length = content.len() as u64;
        self.content = Some(content);
        self
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match status_text(code) {
            Some(text) => text.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown Status".to_string()
            }
        };
        self
    }

    /// 设置（或覆盖）一个附加标头
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(header) => header.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn set_allow(&mut self, allow: Vec<HttpRequestMethod>) -> &mut Self {
        self.allow = Some(allow);
        self
    }

    /// HEAD 请求：保留 `Content-Length` 等标头，但不发送响应体
    pub fn set_head_only(&mut self) -> &mut Self {
        self.head_only = true;
        self
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut header = format!("{} {} {}{}", self.version, self.status_code, self.information, CRLF);
        if let Some(t) = &self.content_type {
            header.push_str(&format!("Content-Type: {}{}", t, CRLF));
        }
        if let Some(e) = self.content_encoding {
            header.push_str(&format!("Content-Encoding: {}{}", e, CRLF));
        }
        header.push_str(&format!("Content-Length: {}{}", self.content_length, CRLF));
        header.push_str(&format!("Date: {}{}", format_date(&self.date), CRLF));
        header.push_str(&format!("Server: {}{}", self.server_name, CRLF));
        if let Some(a) = &self.allow {
            let allow_str = a
                .iter()
                .map(|method| method.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            header.push_str(&format!("Allow: {}{}", allow_str, CRLF));
        }
        if let Some(location) = &self.location {
            header.push_str(&format!("Location: {}{}", location, CRLF));
        }
        for (name, value) in &self.headers {
            header.push_str(&format!("{}: {}{}", name, value, CRLF));
        }
        // 每个连接只处理一个请求
        header.push_str("Connection: close");
        header.push_str(CRLF);
        header.push_str(CRLF);

        let mut bytes = header.into_bytes();
        if let (Some(c), false) = (&self.content, self.head_only) {
            bytes.extend_from_slice(c);
        }
        bytes
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_encoding(&self) -> Option<HttpEncoding> {
        self.content_encoding
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn allow(&self) -> Option<&[HttpRequestMethod]> {
        self.allow.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 响应体原文（可能已压缩）
    pub fn body(&self) -> &[u8] {
        self.content.as_deref().unwrap_or_default()
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn compress(data: Vec<u8>, mode: Option<HttpEncoding>) -> io::Result<Vec<u8>> {
    match mode {
        Some(HttpEncoding::Gzip) => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Deflate) => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        None => Ok(data),
    }
}

fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/x-icon",
        "application/pdf",
        "font/woff",
        "font/woff2",
    ];

    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type))
}

fn decide_encoding(accept_encoding: &[HttpEncoding]) -> Option<HttpEncoding> {
    if accept_encoding.contains(&HttpEncoding::Gzip) {
        Some(HttpEncoding::Gzip)
    } else if accept_encoding.contains(&HttpEncoding::Deflate) {
        Some(HttpEncoding::Deflate)
    } else {
        None
    }
}

fn get_mime(extension: &OsStr) -> &'static str {
    let fallback = "application/octet-stream";
    let extension = match extension.to_str() {
        Some(e) => e.to_lowercase(),
        None => {
            error!("无法将&OsStr转换为&str类型");
            return fallback;
        }
    };
    MIME_TYPES
        .get(extension.as_str())
        .or_else(|| MIME_TYPES.get("_"))
        .copied()
        .unwrap_or(fallback)
}

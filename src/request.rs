// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责两件事：
//! 1. 从 TCP 流中按 `Content-Length` 读出一份完整的请求报文（[`Request::read_from`]）。
//! 2. 将原始字节解析为强类型的 `Request` 结构体（[`Request::try_from`]），
//!    包括请求行、常用标头以及表单提交所需的请求体。

use crate::{exception::Exception, param::*};
use log::{debug, error};
use tokio::io::{AsyncRead, AsyncReadExt};

/// 表示一个完整的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法（GET, POST 等）
    method: HttpRequestMethod,
    /// 请求目标原文（包含查询字符串）
    target: String,
    /// 去掉查询字符串后的路径
    path: String,
    version: HttpVersion,
    /// 所有标头，名称统一为小写
    headers: Vec<(String, String)>,
    /// 客户端支持的压缩编码列表（按解析顺序排列）
    accept_encoding: Vec<HttpEncoding>,
    body: Vec<u8>,
    /// 对端地址，仅用于日志
    remote_addr: Option<String>,
}

impl Request {
    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 以 `\r\n\r\n` 切分请求头与请求体，请求头必须是合法的 UTF-8。
    /// 2. 解析请求行：提取方法、路径和协议版本。
    /// 3. 解析标头，并按 `Content-Length` 截取请求体。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 连接 ID，用于在多线程环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let (head_bytes, body_bytes) = match find_subsequence(buffer, HEADER_TERMINATOR) {
            Some(pos) => (&buffer[..pos], &buffer[pos + HEADER_TERMINATOR.len()..]),
            None => (buffer, &buffer[buffer.len()..]),
        };

        let head = match std::str::from_utf8(head_bytes) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut request_lines = head.split(CRLF);
        let request_line = request_lines.next().unwrap_or_default();

        // 请求行 (e.g., "GET /index.html HTTP/1.1")
        let first_line_parts: Vec<&str> = request_line.split(' ').collect();
        if first_line_parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequest);
        }

        let method_str = first_line_parts[0].to_uppercase();
        let method = match method_str.as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "OPTIONS" => HttpRequestMethod::Options,
            "POST" => HttpRequestMethod::Post,
            _ => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, &method_str);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let version_str = first_line_parts[first_line_parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能包含空格，虽然不规范但通过 join 尝试恢复
        let target = if first_line_parts.len() == 3 {
            first_line_parts[1].to_string()
        } else {
            first_line_parts[1..first_line_parts.len() - 1].join(" ")
        };
        let path = match target.split_once('?') {
            Some((path, _)) => path.to_string(),
            None => target.clone(),
        };

        let mut headers = Vec::new();
        for line in request_lines {
            if line.is_empty() {
                continue;
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    headers.push((name.trim().to_lowercase(), value.trim().to_string()))
                }
                None => {
                    error!("[ID{}]无法解析的请求头：{}", id, line);
                    return Err(Exception::MalformedRequest);
                }
            }
        }

        let mut accept_encoding = vec![];
        if let Some((_, encoding)) = headers.iter().find(|(name, _)| name == "accept-encoding") {
            if encoding.contains("gzip") {
                accept_encoding.push(HttpEncoding::Gzip);
            }
            if encoding.contains("deflate") {
                accept_encoding.push(HttpEncoding::Deflate);
            }
        }

        let content_length = content_length_of(head, id)?;
        if body_bytes.len() < content_length {
            error!(
                "[ID{}]请求体不完整：声明{}字节，实际{}字节",
                id,
                content_length,
                body_bytes.len()
            );
            return Err(Exception::MalformedRequest);
        }
        let body = body_bytes[..content_length].to_vec();

        Ok(Self {
            method,
            target,
            path,
            version,
            headers,
            accept_encoding,
            body,
            remote_addr: None,
        })
    }

    /// 从异步字节流中读取一份完整的请求报文。
    ///
    /// 先读到请求头结束符，再根据 `Content-Length` 继续读取请求体。
    /// 报文总长度超过 `limit` 时返回 [`Exception::PayloadTooLarge`]。
    /// 对端在发送任何数据之前关闭连接时返回空缓冲区。
    pub async fn read_from<R>(reader: &mut R, limit: usize, id: u128) -> Result<Vec<u8>, Exception>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];
        let mut expected: Option<usize> = None;

        loop {
            if let Some(total) = expected {
                if buffer.len() >= total {
                    buffer.truncate(total);
                    debug!("[ID{}]HTTP请求接收完毕，共{}字节", id, total);
                    return Ok(buffer);
                }
            }

            let n = match reader.read(&mut chunk).await {
                Ok(n) => n,
                Err(e) => {
                    error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
                    return Err(Exception::MalformedRequest);
                }
            };
            if n == 0 {
                return match expected {
                    Some(total) => {
                        error!("[ID{}]连接提前关闭，期望{}字节，收到{}字节", id, total, buffer.len());
                        Err(Exception::MalformedRequest)
                    }
                    None => Ok(buffer),
                };
            }

            // 结束符可能跨越上一次读取的边界
            let scan_from = buffer.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
            buffer.extend_from_slice(&chunk[..n]);
            if buffer.len() > limit && expected.map_or(true, |total| total > limit) {
                error!("[ID{}]请求超过大小限制{}字节", id, limit);
                return Err(Exception::PayloadTooLarge);
            }

            if expected.is_none() {
                if let Some(pos) = find_subsequence(&buffer[scan_from..], HEADER_TERMINATOR)
                    .map(|offset| scan_from + offset)
                {
                    let head = std::str::from_utf8(&buffer[..pos])
                        .map_err(|_| Exception::RequestIsNotUtf8)?;
                    let total = content_length_of(head, id)?
                        .checked_add(pos + HEADER_TERMINATOR.len())
                        .ok_or_else(|| {
                            error!("[ID{}]请求声明的长度溢出", id);
                            Exception::PayloadTooLarge
                        })?;
                    if total > limit {
                        error!("[ID{}]请求声明的长度{}超过限制{}字节", id, total, limit);
                        return Err(Exception::PayloadTooLarge);
                    }
                    expected = Some(total);
                }
            }
        }
    }

    pub fn with_remote_addr(mut self, addr: &str) -> Self {
        self.remote_addr = Some(addr.to_string());
        self
    }
}

/// 从请求头原文中提取 `Content-Length`，缺失时视为 0。
fn content_length_of(head: &str, id: u128) -> Result<usize, Exception> {
    for line in head.split(CRLF).skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse::<usize>().map_err(|_| {
                    error!("[ID{}]非法的Content-Length：{}", id, value.trim());
                    Exception::MalformedRequest
                });
            }
        }
    }
    Ok(0)
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl Request {
    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 获取请求路径（不含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取请求目标原文（含查询参数），即日志中的 URI
    pub fn uri(&self) -> &str {
        &self.target
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 按名称（大小写不敏感）查找标头
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }

    pub fn host(&self) -> &str {
        self.header("host").unwrap_or("")
    }

    /// 获取客户端支持的压缩算法列表
    pub fn accept_encoding(&self) -> &[HttpEncoding] {
        &self.accept_encoding
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn remote_addr(&self) -> &str {
        self.remote_addr.as_deref().unwrap_or("-")
    }

    /// 请求体是否为 `application/x-www-form-urlencoded` 编码
    pub fn is_form(&self) -> bool {
        self.header("content-type").map_or(false, |ct| {
            ct.split(';')
                .next()
                .map_or(false, |mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED))
        })
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了 Snippetbox 在读取、解析 HTTP 请求以及定位静态资源时可能出现的协议层异常。
//!
//! 业务层（数据库、模板）的错误分别由 [`crate::models::ModelError`] 与
//! [`crate::templates::TemplateError`] 表达，这里只保留与客户端报文直接相关的部分，
//! 每个变体都能被直接映射为一个 4xx 状态码。

use std::fmt;

/// 服务器处理请求过程中发生的协议层异常。
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Exception {
    /// 请求头无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了服务器不认识的 HTTP 方法。对应 `501 Not Implemented`。
    UnSupportedRequestMethod,
    /// 客户端使用了 HTTP/1.1 以外的协议版本。对应 `505 HTTP Version Not Supported`。
    UnsupportedHttpVersion,
    /// 请求行或标头结构残缺，例如 `Content-Length` 不是数字。
    MalformedRequest,
    /// 请求报文超过了配置的 `max_request_size`。对应 `413 Content Too Large`。
    PayloadTooLarge,
    /// 静态资源不存在。对应 `404 Not Found`。
    FileNotFound,
    /// 路径中包含 `..` 等越权片段。对应 `400 Bad Request`。
    InvalidPath,
    /// 表单正文的百分号编码非法，或字段无法转换为目标类型。对应 `400 Bad Request`。
    MalformedForm,
}

use Exception::*;

impl Exception {
    /// 该异常应当返回给客户端的状态码。
    pub fn status_code(&self) -> u16 {
        match self {
            PayloadTooLarge => 413,
            FileNotFound => 404,
            UnSupportedRequestMethod => 501,
            UnsupportedHttpVersion => 505,
            RequestIsNotUtf8 | MalformedRequest | InvalidPath | MalformedForm => 400,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            MalformedRequest => write!(f, "Malformed HTTP request"),
            PayloadTooLarge => write!(f, "Request exceeds the configured size limit (413)"),
            FileNotFound => write!(f, "File not found (404)"),
            InvalidPath => write!(f, "Invalid path (400)"),
            MalformedForm => write!(f, "Malformed form body (400)"),
        }
    }
}

impl std::error::Error for Exception {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(FileNotFound.status_code(), 404);
        assert_eq!(PayloadTooLarge.status_code(), 413);
        assert_eq!(MalformedForm.status_code(), 400);
        assert_eq!(InvalidPath.status_code(), 400);
        assert_eq!(UnSupportedRequestMethod.status_code(), 501);
        assert_eq!(UnsupportedHttpVersion.status_code(), 505);
    }

    #[test]
    fn test_display() {
        assert_eq!(InvalidPath.to_string(), "Invalid path (400)");
        assert_eq!(UnsupportedHttpVersion.to_string(), "Unsupported HTTP version");
    }
}

//! # 中间件
//!
//! 处理器外层依次包裹：请求日志 → 异常恢复 → 公共标头。
//! 协议层错误产生的响应同样经过 [`common_headers`]。

use crate::{handlers::App, param::SECURITY_HEADERS, request::Request, response::Response};

use log::{error, info};
use std::{
    any::Any,
    backtrace::Backtrace,
    panic::{self, AssertUnwindSafe},
};

/// 完整的处理链
pub fn serve_request(app: &App, request: &Request, id: u128) -> Response {
    log_request(request, id);
    let mut response = recover_panic(request, id, || app.handle(request, id));
    common_headers(&mut response);
    response
}

pub fn log_request(request: &Request, id: u128) {
    info!(
        "[ID{}]received request ip={} proto={} method={} uri={} host={} user_agent={}",
        id,
        request.remote_addr(),
        request.version(),
        request.method(),
        request.uri(),
        request.host(),
        request.user_agent(),
    );
}

/// 捕获处理器中的 panic，转换为通用的 500 响应，连接随后关闭。
pub fn recover_panic<F>(request: &Request, id: u128, handler: F) -> Response
where
    F: FnOnce() -> Response,
{
    match panic::catch_unwind(AssertUnwindSafe(handler)) {
        Ok(response) => response,
        Err(payload) => {
            error!(
                "[ID{}]处理器panic: {}, method={}, uri={}\n{}",
                id,
                panic_message(payload.as_ref()),
                request.method(),
                request.uri(),
                Backtrace::force_capture()
            );
            Response::from_status_code(500, request.accept_encoding(), id)
        }
    }
}

pub fn common_headers(response: &mut Response) {
    for (name, value) in SECURITY_HEADERS {
        response.set_header(name, value);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

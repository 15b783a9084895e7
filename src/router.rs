//! # 路由表
//!
//! 把 (方法, 路径) 映射为 [`Route`]。路由只做匹配，不访问数据库或文件系统。
//!
//! | 路径                  | 方法        |
//! |-----------------------|-------------|
//! | `/`（精确匹配）       | GET         |
//! | `/snippet/view/{id}`  | GET         |
//! | `/snippet/create`     | GET, POST   |
//! | `/static/...`         | GET         |
//!
//! 凡是允许 GET 的路径同样允许 HEAD；OPTIONS 对所有已知路径都可用。

use crate::param::HttpRequestMethod::{self, *};

use lazy_static::lazy_static;
use regex::Regex;

pub const STATIC_PREFIX: &str = "/static/";

lazy_static! {
    static ref SNIPPET_VIEW: Regex = Regex::new(r"^/snippet/view/([^/]+)$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Home,
    /// 原样保留 id 片段，由处理器判断是否为正整数
    SnippetView(String),
    SnippetCreate,
    SnippetCreatePost,
    /// `/static/` 之后的相对路径
    Static(String),
    Options(Vec<HttpRequestMethod>),
    MethodNotAllowed(Vec<HttpRequestMethod>),
    NotFound,
}

/// 路径匹配的结果，尚未考虑请求方法
enum Resource {
    Home,
    SnippetView(String),
    SnippetCreate,
    Static(String),
}

impl Resource {
    fn resolve(path: &str) -> Option<Self> {
        if path == "/" {
            return Some(Resource::Home);
        }
        if path == "/snippet/create" {
            return Some(Resource::SnippetCreate);
        }
        if let Some(captures) = SNIPPET_VIEW.captures(path) {
            return Some(Resource::SnippetView(captures[1].to_string()));
        }
        path.strip_prefix(STATIC_PREFIX)
            .map(|rest| Resource::Static(rest.to_string()))
    }

    fn allowed(&self) -> Vec<HttpRequestMethod> {
        match self {
            Resource::SnippetCreate => vec![Get, Head, Post],
            _ => vec![Get, Head],
        }
    }
}

pub fn route(method: HttpRequestMethod, path: &str) -> Route {
    let resource = match Resource::resolve(path) {
        Some(resource) => resource,
        None => return Route::NotFound,
    };

    match (method, resource) {
        (Options, resource) => {
            let mut allow = resource.allowed();
            allow.push(Options);
            Route::Options(allow)
        }
        (Get | Head, Resource::Home) => Route::Home,
        (Get | Head, Resource::SnippetView(id)) => Route::SnippetView(id),
        (Get | Head, Resource::SnippetCreate) => Route::SnippetCreate,
        (Post, Resource::SnippetCreate) => Route::SnippetCreatePost,
        (Get | Head, Resource::Static(rest)) => Route::Static(rest),
        (_, resource) => Route::MethodNotAllowed(resource.allowed()),
    }
}

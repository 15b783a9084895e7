// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求处理器
//!
//! [`App`] 是启动时构建好的只读上下文：模板缓存、Snippet 存储、静态资源目录及其缓存。
//! 所有连接通过 `Arc<App>` 共享它，处理器本身不持有任何可变的全局状态。

use crate::{
    cache::AssetCache,
    config::Config,
    exception::Exception,
    form::{FormData, SnippetCreateForm},
    models::{ModelError, SnippetStore},
    param::HttpRequestMethod,
    request::Request,
    response::Response,
    router::{self, Route},
    templates::{TemplateCache, TemplateData},
};

use log::{debug, error, warn};
use std::{
    backtrace::Backtrace,
    fmt::Display,
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex},
};

pub struct App {
    templates: TemplateCache,
    snippets: Arc<dyn SnippetStore>,
    static_dir: PathBuf,
    assets: Mutex<AssetCache>,
}

impl App {
    pub fn new(config: &Config, templates: TemplateCache, snippets: Arc<dyn SnippetStore>) -> Self {
        Self {
            templates,
            snippets,
            static_dir: PathBuf::from(config.static_dir()),
            assets: Mutex::new(AssetCache::from_capacity(config.cache_size())),
        }
    }

    /// 路由分发。HEAD 请求与 GET 走同一条路径，最后去掉响应体。
    pub fn handle(&self, request: &Request, id: u128) -> Response {
        let route = router::route(request.method(), request.path());
        debug!("[ID{}]路由匹配结果: {:?}", id, route);

        let mut response = match route {
            Route::Home => self.home(request, id),
            Route::SnippetView(raw_id) => self.snippet_view(request, &raw_id, id),
            Route::SnippetCreate => self.snippet_create(request, id),
            Route::SnippetCreatePost => self.snippet_create_post(request, id),
            Route::Static(rest) => self.static_file(request, &rest, id),
            Route::Options(allow) => Response::no_content(allow),
            Route::MethodNotAllowed(allow) => {
                let mut response = self.client_error(request, 405, id);
                response.set_allow(allow);
                response
            }
            Route::NotFound => self.not_found(request, id),
        };

        if request.method() == HttpRequestMethod::Head {
            response.set_head_only();
        }
        response
    }

    fn home(&self, request: &Request, id: u128) -> Response {
        let snippets = match self.snippets.latest() {
            Ok(snippets) => snippets,
            Err(e) => return self.server_error(request, e, id),
        };
        let data = TemplateData {
            snippets,
            ..TemplateData::new()
        };
        self.render(request, 200, "home.tmpl", &data, id)
    }

    fn snippet_view(&self, request: &Request, raw_id: &str, id: u128) -> Response {
        let snippet_id = match raw_id.parse::<i64>() {
            Ok(n) if n >= 1 => n,
            _ => {
                debug!("[ID{}]非法的snippet id：{}", id, raw_id);
                return self.not_found(request, id);
            }
        };

        let snippet = match self.snippets.get(snippet_id) {
            Ok(snippet) => snippet,
            Err(ModelError::NoRecord) => return self.not_found(request, id),
            Err(e) => return self.server_error(request, e, id),
        };
        let data = TemplateData {
            snippet: Some(snippet),
            ..TemplateData::new()
        };
        self.render(request, 200, "view.tmpl", &data, id)
    }

    fn snippet_create(&self, request: &Request, id: u128) -> Response {
        let data = TemplateData {
            form: Some(SnippetCreateForm::default()),
            ..TemplateData::new()
        };
        self.render(request, 200, "create.tmpl", &data, id)
    }

    fn snippet_create_post(&self, request: &Request, id: u128) -> Response {
        if !request.is_form() {
            warn!("[ID{}]提交的请求体不是urlencoded表单", id);
            return self.client_error(request, 400, id);
        }
        let mut form = match FormData::parse(request.body())
            .and_then(|data| SnippetCreateForm::from_form(&data))
        {
            Ok(form) => form,
            Err(e) => {
                warn!("[ID{}]表单解码失败: {}", id, e);
                return self.client_error(request, e.status_code(), id);
            }
        };

        if !form.validate() {
            debug!(
                "[ID{}]表单校验未通过: {:?}",
                id,
                form.validator().field_errors()
            );
            let data = TemplateData {
                form: Some(form),
                ..TemplateData::new()
            };
            return self.render(request, 422, "create.tmpl", &data, id);
        }

        match self.snippets.insert(&form.title, &form.content, form.expires) {
            Ok(new_id) => Response::redirect(&format!("/snippet/view/{}", new_id)),
            Err(e) => self.server_error(request, e, id),
        }
    }

    fn static_file(&self, request: &Request, rest: &str, id: u128) -> Response {
        let relative = Path::new(rest);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            warn!("[ID{}]请求的路径：{} 包含非法片段，返回400", id, request.path());
            return self.client_error(request, Exception::InvalidPath.status_code(), id);
        }
        // 空路径或以 / 结尾的路径指向目录
        if rest.is_empty() || rest.ends_with('/') {
            return self.not_found(request, id);
        }

        let path = self.static_dir.join(relative);
        match Response::from_file(&path, request.accept_encoding(), &self.assets, id) {
            Ok(response) => response,
            Err(e) => {
                debug!("[ID{}]静态资源{}不可用: {}", id, path.display(), e);
                self.client_error(request, e.status_code(), id)
            }
        }
    }

    /// 先渲染到内存，成功后才确定状态码；渲染失败一律返回 500。
    fn render(
        &self,
        request: &Request,
        status: u16,
        page: &str,
        data: &TemplateData,
        id: u128,
    ) -> Response {
        match self.templates.render(page, data) {
            Ok(html) => Response::from_html(status, &html, request.accept_encoding(), id),
            Err(e) => self.server_error(request, e, id),
        }
    }

    fn server_error<E: Display>(&self, request: &Request, err: E, id: u128) -> Response {
        let trace = Backtrace::force_capture();
        error!(
            "[ID{}]{}, method={}, uri={}\n{}",
            id,
            err,
            request.method(),
            request.uri(),
            trace
        );
        Response::from_status_code(500, request.accept_encoding(), id)
    }

    fn client_error(&self, request: &Request, status: u16, id: u128) -> Response {
        Response::from_status_code(status, request.accept_encoding(), id)
    }

    fn not_found(&self, request: &Request, id: u128) -> Response {
        self.client_error(request, 404, id)
    }
}

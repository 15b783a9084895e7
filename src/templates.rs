// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 模板缓存模块
//!
//! 启动时扫描 `pages/*.tmpl`，为每个页面单独组装一套模板：
//! 公共布局 `base.tmpl` + 全部 `partials/*.tmpl` + 页面本身。
//! 组装完成后缓存只读，处理器按页面文件名（如 `home.tmpl`）取用。

use crate::{form::SnippetCreateForm, models::Snippet};

use chrono::{DateTime, Datelike, Utc};
use log::{debug, info};
use serde_derive::Serialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tera::{Context, Tera, Value};
use thiserror::Error;

/// 公共布局文件名
pub const BASE_TEMPLATE: &str = "base.tmpl";

#[derive(Debug, Error)]
pub enum TemplateError {
    /// 请求的页面不在缓存中，说明代码或部署存在问题，而不是用户输入错误
    #[error("the template {0} does not exist")]
    NotFound(String),
    #[error("cannot read template directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("template: {0}")]
    Tera(#[from] tera::Error),
}

/// 传给所有模板的数据
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    pub current_year: i32,
    pub snippet: Option<Snippet>,
    pub snippets: Vec<Snippet>,
    pub form: Option<SnippetCreateForm>,
}

impl TemplateData {
    pub fn new() -> Self {
        Self {
            current_year: Utc::now().year(),
            ..Default::default()
        }
    }
}

/// 页面名到组装好的模板集合的映射，启动后不再修改。
pub struct TemplateCache {
    pages: HashMap<String, Tera>,
}

impl TemplateCache {
    pub fn new<P: AsRef<Path>>(html_dir: P) -> Result<Self, TemplateError> {
        let html_dir = html_dir.as_ref();
        let base = html_dir.join(BASE_TEMPLATE);
        let partials = list_templates(&html_dir.join("partials"), true)?;
        let pages = list_templates(&html_dir.join("pages"), false)?;

        let mut cache = HashMap::new();
        for page in pages {
            let name = file_name(&page);

            // 先注册自定义过滤器，再解析模板
            let mut tera = Tera::default();
            tera.autoescape_on(vec![".tmpl"]);
            tera.register_filter("human_date", human_date_filter);

            let mut files = vec![(base.clone(), Some(BASE_TEMPLATE.to_string()))];
            for partial in &partials {
                files.push((partial.clone(), Some(format!("partials/{}", file_name(partial)))));
            }
            files.push((page.clone(), Some(name.clone())));
            tera.add_template_files(files)?;

            debug!("页面模板{}组装完成", name);
            cache.insert(name, tera);
        }
        info!("模板缓存构建完成，共{}个页面", cache.len());
        Ok(Self { pages: cache })
    }

    /// 渲染页面到字符串。
    ///
    /// 渲染结果先完整写入内存，调用方确认成功后才写状态码与响应体，
    /// 渲染中途失败不会有半截页面到达客户端。
    pub fn render<T: serde::Serialize>(&self, page: &str, data: &T) -> Result<String, TemplateError> {
        let tera = self
            .pages
            .get(page)
            .ok_or_else(|| TemplateError::NotFound(page.to_string()))?;
        let context = Context::from_serialize(data)?;
        Ok(tera.render(page, &context)?)
    }

    pub fn contains(&self, page: &str) -> bool {
        self.pages.contains_key(page)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn list_templates(dir: &Path, optional: bool) -> Result<Vec<PathBuf>, TemplateError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if optional && e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(source) => {
            return Err(TemplateError::Io {
                path: dir.display().to_string(),
                source,
            })
        }
    };
    let mut templates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "tmpl"))
        .collect();
    templates.sort();
    Ok(templates)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// 以 `02 Jan 2006 at 15:04` 的形式显示 UTC 时间
pub fn human_date(t: &DateTime<Utc>) -> String {
    t.format("%d %b %Y at %H:%M").to_string()
}

fn human_date_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("human_date expects a timestamp string"))?;
    let t = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| tera::Error::msg(format!("human_date cannot parse {}: {}", raw, e)))?;
    Ok(Value::String(human_date(&t.with_timezone(&Utc))))
}

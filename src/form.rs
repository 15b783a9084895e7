// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 表单解码模块
//!
//! 将 `application/x-www-form-urlencoded` 请求体解码为键值对，
//! 再由各个表单结构体手工映射为强类型字段。字段映射是显式的，不依赖任何反射或标签。

use crate::{
    exception::Exception,
    validator::{max_chars, not_blank, permitted_value, Validator},
};
use log::debug;
use serde_derive::Serialize;

/// 创建表单中允许的过期天数
pub const EXPIRY_OPTIONS: [i64; 3] = [1, 7, 365];

/// 打开创建页面时默认选中的过期天数
pub const DEFAULT_EXPIRY: i64 = 365;

/// 标题允许的最大字符数
pub const TITLE_MAX_CHARS: usize = 100;

/// 解码后的表单键值对，保留提交顺序。
#[derive(Debug, Default, Clone)]
pub struct FormData {
    values: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Result<Self, Exception> {
        let body = std::str::from_utf8(body).map_err(|_| Exception::MalformedForm)?;
        let mut values = Vec::new();
        for pair in body.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            values.push((percent_decode(key)?, percent_decode(value)?));
        }
        Ok(Self { values })
    }

    /// 同名字段出现多次时取第一个
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// 解码一个 urlencoded 片段：`+` 视为空格，`%XX` 视为一个字节。
pub fn percent_decode(input: &str) -> Result<String, Exception> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).ok_or(Exception::MalformedForm)?;
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    return Err(Exception::MalformedForm);
                }
                let hex = std::str::from_utf8(hex).map_err(|_| Exception::MalformedForm)?;
                let byte = u8::from_str_radix(hex, 16).map_err(|_| Exception::MalformedForm)?;
                decoded.push(byte);
                i += 2;
            }
            b => decoded.push(b),
        }
        i += 1;
    }
    String::from_utf8(decoded).map_err(|_| Exception::MalformedForm)
}

/// 创建 Snippet 的表单。校验器以普通字段的形式组合在表单中，
/// 序列化时字段错误会展开为 `form.field_errors`，供模板回显。
#[derive(Debug, Clone, Serialize)]
pub struct SnippetCreateForm {
    pub title: String,
    pub content: String,
    pub expires: i64,
    #[serde(flatten)]
    validator: Validator,
}

impl Default for SnippetCreateForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: DEFAULT_EXPIRY,
            validator: Validator::new(),
        }
    }
}

impl SnippetCreateForm {
    /// 从解码后的表单映射字段。
    ///
    /// 缺失或为空的字段取零值；`expires` 不是整数时视为非法表单。
    pub fn from_form(form: &FormData) -> Result<Self, Exception> {
        let expires = match form.get("expires").map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                debug!("expires字段无法解析为整数：{}", raw);
                Exception::MalformedForm
            })?,
        };
        Ok(Self {
            title: form.get("title").unwrap_or_default().to_string(),
            content: form.get("content").unwrap_or_default().to_string(),
            expires,
            validator: Validator::new(),
        })
    }

    /// 执行全部字段检查，返回表单是否有效
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.title), "title", "This field cannot be blank");
        v.check_field(
            max_chars(&self.title, TITLE_MAX_CHARS),
            "title",
            "This field cannot be more than 100 characters long",
        );
        v.check_field(not_blank(&self.content), "content", "This field cannot be blank");
        v.check_field(
            permitted_value(self.expires, &EXPIRY_OPTIONS),
            "expires",
            "This field must equal 1, 7 or 365",
        );
        v.valid()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("O+snail").unwrap(), "O snail");
        assert_eq!(percent_decode("a%2Bb%3Dc").unwrap(), "a+b=c");
        assert_eq!(percent_decode("%E8%9C%97%E7%89%9B").unwrap(), "蜗牛");
        assert_eq!(percent_decode("line%0D%0Abreak").unwrap(), "line\r\nbreak");
    }

    #[test]
    fn test_percent_decode_rejects_bad_escape() {
        assert_eq!(percent_decode("%zz").unwrap_err(), Exception::MalformedForm);
        assert_eq!(percent_decode("abc%4").unwrap_err(), Exception::MalformedForm);
        assert_eq!(percent_decode("%FF").unwrap_err(), Exception::MalformedForm);
        assert_eq!(percent_decode("%+1").unwrap_err(), Exception::MalformedForm);
        assert_eq!(percent_decode("%-1").unwrap_err(), Exception::MalformedForm);
    }

    #[test]
    fn test_form_data_parse() {
        let form = FormData::parse(b"title=O+snail&content=Climb%0AMount+Fuji&expires=7&title=again")
            .unwrap();
        assert_eq!(form.get("title"), Some("O snail"));
        assert_eq!(form.get("content"), Some("Climb\nMount Fuji"));
        assert_eq!(form.get("expires"), Some("7"));
        assert_eq!(form.get("missing"), None);
    }

    #[test]
    fn test_form_data_key_without_value() {
        let form = FormData::parse(b"title&content=").unwrap();
        assert_eq!(form.get("title"), Some(""));
        assert_eq!(form.get("content"), Some(""));
    }

    #[test]
    fn test_create_form_mapping() {
        let form = FormData::parse(b"title=Hi&content=There&expires=365").unwrap();
        let create = SnippetCreateForm::from_form(&form).unwrap();
        assert_eq!(create.title, "Hi");
        assert_eq!(create.content, "There");
        assert_eq!(create.expires, 365);
    }

    #[test]
    fn test_create_form_missing_expires_is_zero() {
        let form = FormData::parse(b"title=Hi&content=There").unwrap();
        let mut create = SnippetCreateForm::from_form(&form).unwrap();
        assert_eq!(create.expires, 0);
        assert!(!create.validate());
        assert_eq!(
            create.validator().field_error("expires"),
            Some("This field must equal 1, 7 or 365")
        );
    }

    #[test]
    fn test_create_form_non_numeric_expires_is_malformed() {
        let form = FormData::parse(b"title=Hi&content=There&expires=soon").unwrap();
        assert_eq!(
            SnippetCreateForm::from_form(&form).unwrap_err(),
            Exception::MalformedForm
        );
    }

    #[test]
    fn test_validate_accepts_good_input() {
        let form = FormData::parse(b"title=Hi&content=There&expires=1").unwrap();
        let mut create = SnippetCreateForm::from_form(&form).unwrap();
        assert!(create.validate());
        assert!(create.validator().field_errors().is_empty());
    }

    #[test]
    fn test_validate_long_title_only() {
        let body = format!("title={}&content=body&expires=7", "a".repeat(101));
        let form = FormData::parse(body.as_bytes()).unwrap();
        let mut create = SnippetCreateForm::from_form(&form).unwrap();

        assert!(!create.validate());
        let errors = create.validator().field_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get("title").map(String::as_str),
            Some("This field cannot be more than 100 characters long")
        );
    }

    #[test]
    fn test_validate_blank_title_reports_blank_first() {
        let form = FormData::parse(b"title=+++&content=&expires=8").unwrap();
        let mut create = SnippetCreateForm::from_form(&form).unwrap();

        assert!(!create.validate());
        let v = create.validator();
        assert_eq!(v.field_error("title"), Some("This field cannot be blank"));
        assert_eq!(v.field_error("content"), Some("This field cannot be blank"));
        assert_eq!(v.field_error("expires"), Some("This field must equal 1, 7 or 365"));
    }

    #[test]
    fn test_default_form_uses_default_expiry() {
        let create = SnippetCreateForm::default();
        assert_eq!(create.expires, DEFAULT_EXPIRY);
        assert!(create.title.is_empty());
    }
}

//! # 表单校验器
//!
//! `Validator` 只负责累积字段错误，具体的检查函数都是无副作用的纯函数，
//! 由调用方组合成 `check_field(条件, 字段, 消息)` 的形式。

use serde_derive::Serialize;
use std::collections::BTreeMap;

/// 按字段名记录的校验错误。每个字段只保留第一条错误信息。
#[derive(Debug, Default, Clone, Serialize)]
pub struct Validator {
    field_errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 没有任何字段错误时返回 `true`
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty()
    }

    /// 记录一条字段错误；该字段已有错误时保持原值不变。
    pub fn add_field_error(&mut self, key: &str, message: &str) {
        self.field_errors
            .entry(key.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// 仅在 `ok` 为 `false` 时记录错误
    pub fn check_field(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_field_error(key, message);
        }
    }

    pub fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    pub fn field_error(&self, key: &str) -> Option<&str> {
        self.field_errors.get(key).map(String::as_str)
    }
}

/// 去掉首尾空白后不为空
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// 字符数（Unicode 码点，而非字节）不超过 `n`
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// `value` 属于 `permitted_values` 之一
pub fn permitted_value<T: PartialEq>(value: T, permitted_values: &[T]) -> bool {
    permitted_values.contains(&value)
}

//! 函数字面量解析
//!
//! 解析时把 `now()` 这类函数字面量替换为上下文中提供的具体值。

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::ast::{AqlValue, AqlValueKind};

/// 以 `"name()"` 为键的解析上下文
pub type AqlContext = HashMap<String, Value>;

/// 没有上下文或上下文中没有对应的键时，保留为 FUNCTION 值，
/// 交给求值器在之后处理
pub fn resolve_function(call: &str, context: Option<&AqlContext>) -> AqlValue {
    match context.and_then(|ctx| ctx.get(call)) {
        Some(resolved) => {
            let value = value_from_json(resolved);
            debug!(function = call, kind = ?value.kind, "resolved function literal");
            value
        }
        None => AqlValue::function(call),
    }
}

/// `empty` 与上下文无关，总是得到 NULL
pub fn empty_value() -> AqlValue {
    AqlValue::null()
}

fn value_from_json(value: &Value) -> AqlValue {
    match value {
        Value::Null => AqlValue::null(),
        Value::Bool(b) => AqlValue::boolean(*b),
        Value::Number(n) => AqlValue::new(number_text(n), AqlValueKind::Number),
        Value::String(s) => AqlValue::string(s.as_str()),
        // 数组和对象没有对应的值类型，按其 JSON 文本作为字符串
        other => AqlValue::string(other.to_string()),
    }
}

/// 整数保持原样；浮点数用 `f64` 的 `Display`，不会出现 `1e+20` 这种指数写法
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => format!("{}", f),
        _ => n.to_string(),
    }
}

//! 解析器配置模块，限制调用方允许使用的语法结构
//!
//! 未设置的限制字段表示“全部允许”。配置可以从 JSON 文件加载，
//! 也可以通过 builder 方法构造。

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::ast::{AqlOperation, AqlValueKind, LogicalOperator};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    NotFound(String),
    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("无法解析JSON配置文件 {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 标识符白名单，可以是列表也可以是判定函数
#[derive(Clone, Deserialize)]
#[serde(from = "Vec<String>")]
pub enum IdentifierRule {
    /// 精确匹配
    List(Vec<String>),
    /// 每遇到一个标识符调用一次
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl IdentifierRule {
    pub fn allows(&self, identifier: &str) -> bool {
        match self {
            IdentifierRule::List(names) => names.iter().any(|n| n == identifier),
            IdentifierRule::Predicate(predicate) => predicate(identifier),
        }
    }
}

impl From<Vec<String>> for IdentifierRule {
    fn from(names: Vec<String>) -> Self {
        IdentifierRule::List(names)
    }
}

impl fmt::Debug for IdentifierRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierRule::List(names) => f.debug_tuple("List").field(names).finish(),
            IdentifierRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// 语法能力描述，由嵌入方构造一次，在每次解析时以引用传入
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AqlParserConfig {
    #[serde(default)]
    pub logical_operators: Option<Vec<LogicalOperator>>,
    #[serde(default)]
    pub operations: Option<Vec<AqlOperation>>,
    #[serde(default)]
    pub identifiers: Option<IdentifierRule>,
    #[serde(default)]
    pub value_types: Option<Vec<AqlValueKind>>,
    #[serde(default = "default_true")]
    pub parentheses: bool,
    #[serde(default = "default_true")]
    pub index_access: bool,
}

impl Default for AqlParserConfig {
    fn default() -> Self {
        Self {
            logical_operators: None,
            operations: None,
            identifiers: None,
            value_types: None,
            parentheses: true,
            index_access: true,
        }
    }
}

impl AqlParserConfig {
    /// 从JSON文件加载解析器配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let display = path_ref.display().to_string();

        if !path_ref.exists() {
            return Err(ConfigError::NotFound(display));
        }

        let content = fs::read_to_string(path_ref)
            .map_err(|source| ConfigError::Read { path: display.clone(), source })?;

        Self::from_json_str(&content).map_err(|source| ConfigError::Json { path: display, source })
    }

    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn with_logical_operators(mut self, ops: impl IntoIterator<Item = LogicalOperator>) -> Self {
        self.logical_operators = Some(ops.into_iter().collect());
        self
    }

    pub fn with_operations(mut self, ops: impl IntoIterator<Item = AqlOperation>) -> Self {
        self.operations = Some(ops.into_iter().collect());
        self
    }

    pub fn with_identifiers<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.identifiers = Some(IdentifierRule::List(names.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_identifier_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.identifiers = Some(IdentifierRule::Predicate(Arc::new(predicate)));
        self
    }

    pub fn with_value_types(mut self, kinds: impl IntoIterator<Item = AqlValueKind>) -> Self {
        self.value_types = Some(kinds.into_iter().collect());
        self
    }

    pub fn with_parentheses(mut self, allowed: bool) -> Self {
        self.parentheses = allowed;
        self
    }

    pub fn with_index_access(mut self, allowed: bool) -> Self {
        self.index_access = allowed;
        self
    }

    pub fn is_logical_operator_allowed(&self, op: LogicalOperator) -> bool {
        self.logical_operators.as_ref().map_or(true, |ops| ops.contains(&op))
    }

    pub fn is_operation_allowed(&self, op: AqlOperation) -> bool {
        self.operations.as_ref().map_or(true, |ops| ops.contains(&op))
    }

    pub fn is_identifier_allowed(&self, identifier: &str) -> bool {
        self.identifiers.as_ref().map_or(true, |rule| rule.allows(identifier))
    }

    pub fn is_value_type_allowed(&self, kind: AqlValueKind) -> bool {
        self.value_types.as_ref().map_or(true, |kinds| kinds.contains(&kind))
    }

    pub fn parentheses_allowed(&self) -> bool {
        self.parentheses
    }

    pub fn index_access_allowed(&self) -> bool {
        self.index_access
    }
}

//! AQL 的抽象语法树
//!
//! 所有节点都是不可变的值对象，构造后不再修改，可以在线程间自由共享。

use serde::{Deserialize, Serialize};

/// 值的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AqlValueKind {
    Null,
    Boolean,
    Number,
    String,
    /// 未能通过上下文解析的函数字面量，例如 `now()`
    Function,
}

impl AqlValueKind {
    pub fn name(self) -> &'static str {
        match self {
            AqlValueKind::Null => "NULL",
            AqlValueKind::Boolean => "BOOLEAN",
            AqlValueKind::Number => "NUMBER",
            AqlValueKind::String => "STRING",
            AqlValueKind::Function => "FUNCTION",
        }
    }
}

/// 字面量值，`kind` 决定如何解释 `value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AqlValue {
    /// STRING 为反转义后的文本；NULL 固定为 "null"
    pub value: String,
    #[serde(rename = "type")]
    pub kind: AqlValueKind,
}

impl AqlValue {
    pub fn new(value: impl Into<String>, kind: AqlValueKind) -> Self {
        Self { value: value.into(), kind }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(value, AqlValueKind::String)
    }

    pub fn number(value: impl Into<String>) -> Self {
        Self::new(value, AqlValueKind::Number)
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(value.to_string(), AqlValueKind::Boolean)
    }

    pub fn null() -> Self {
        Self::new("null", AqlValueKind::Null)
    }

    pub fn function(call: impl Into<String>) -> Self {
        Self::new(call, AqlValueKind::Function)
    }

    pub fn is_null(&self) -> bool {
        self.kind == AqlValueKind::Null
    }
}

/// 方括号中的索引参数：`field["key"]` 或 `field[0]`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum AccessorParam {
    #[serde(rename = "string")]
    Key(String),
    #[serde(rename = "number")]
    Index(f64),
}

/// 字段引用，可带一个索引参数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqlAccessor {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<AccessorParam>,
}

impl AqlAccessor {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), param: None }
    }

    pub fn with_key(identifier: impl Into<String>, key: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), param: Some(AccessorParam::Key(key.into())) }
    }

    pub fn with_index(identifier: impl Into<String>, index: f64) -> Self {
        Self { identifier: identifier.into(), param: Some(AccessorParam::Index(index)) }
    }
}

/// 单值比较运算符（不包括 IN）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComparisonOperator {
    Gt,       // >
    Ge,       // >=
    Lt,       // <
    Le,       // <=
    Eq,       // =
    Neq,      // !=
    Contains, // ~=
}

impl ComparisonOperator {
    /// 可再次解析的 AQL 符号
    pub fn symbol(self) -> &'static str {
        AqlOperation::from(self).symbol()
    }
}

/// 全部比较运算，用于配置中的运算符白名单
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AqlOperation {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Neq,
    Contains,
    In,
}

impl AqlOperation {
    pub fn symbol(self) -> &'static str {
        match self {
            AqlOperation::Gt => ">",
            AqlOperation::Ge => ">=",
            AqlOperation::Lt => "<",
            AqlOperation::Le => "<=",
            AqlOperation::Eq => "=",
            AqlOperation::Neq => "!=",
            AqlOperation::Contains => "~=",
            AqlOperation::In => "IN",
        }
    }

    /// 枚举名，用于错误信息
    pub fn name(self) -> &'static str {
        match self {
            AqlOperation::Gt => "GT",
            AqlOperation::Ge => "GE",
            AqlOperation::Lt => "LT",
            AqlOperation::Le => "LE",
            AqlOperation::Eq => "EQ",
            AqlOperation::Neq => "NEQ",
            AqlOperation::Contains => "CONTAINS",
            AqlOperation::In => "IN",
        }
    }
}

impl From<ComparisonOperator> for AqlOperation {
    fn from(op: ComparisonOperator) -> Self {
        match op {
            ComparisonOperator::Gt => AqlOperation::Gt,
            ComparisonOperator::Ge => AqlOperation::Ge,
            ComparisonOperator::Lt => AqlOperation::Lt,
            ComparisonOperator::Le => AqlOperation::Le,
            ComparisonOperator::Eq => AqlOperation::Eq,
            ComparisonOperator::Neq => AqlOperation::Neq,
            ComparisonOperator::Contains => AqlOperation::Contains,
        }
    }
}

/// 二元逻辑运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BinaryOperator {
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

/// 逻辑运算，用于配置中的白名单（包括一元的 NOT）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub fn name(self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Not => "NOT",
        }
    }
}

impl From<BinaryOperator> for LogicalOperator {
    fn from(op: BinaryOperator) -> Self {
        match op {
            BinaryOperator::And => LogicalOperator::And,
            BinaryOperator::Or => LogicalOperator::Or,
        }
    }
}

/// AQL 表达式树
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AqlExpression {
    /// 单值比较：`age > 25`
    Condition {
        left: AqlAccessor,
        operator: ComparisonOperator,
        right: AqlValue,
    },
    /// 列表包含：`tag IN ["smoke", "slow"]`，运算符固定为 IN
    ArrayCondition {
        left: AqlAccessor,
        right: Vec<AqlValue>,
    },
    /// AND / OR
    Binary {
        left: Box<AqlExpression>,
        operator: BinaryOperator,
        right: Box<AqlExpression>,
    },
    Not {
        expression: Box<AqlExpression>,
    },
    /// 用户书写的括号，保留下来以便原样输出
    Paren {
        expression: Box<AqlExpression>,
    },
    /// 单独作为完整表达式的布尔字面量
    Boolean {
        value: bool,
    },
}

/// 解析结果；`expression` 为 `None` 表示空查询
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqlParseResult {
    pub expression: Option<AqlExpression>,
}

pub fn aql_condition_expression(
    left: AqlAccessor,
    operator: ComparisonOperator,
    right: AqlValue,
) -> AqlExpression {
    AqlExpression::Condition { left, operator, right }
}

pub fn aql_array_condition_expression(left: AqlAccessor, right: Vec<AqlValue>) -> AqlExpression {
    AqlExpression::ArrayCondition { left, right }
}

pub fn aql_binary_expression(
    left: AqlExpression,
    operator: BinaryOperator,
    right: AqlExpression,
) -> AqlExpression {
    AqlExpression::Binary { left: Box::new(left), operator, right: Box::new(right) }
}

pub fn aql_not_expression(expression: AqlExpression) -> AqlExpression {
    AqlExpression::Not { expression: Box::new(expression) }
}

pub fn aql_paren_expression(expression: AqlExpression) -> AqlExpression {
    AqlExpression::Paren { expression: Box::new(expression) }
}

pub fn aql_boolean_expression(value: bool) -> AqlExpression {
    AqlExpression::Boolean { value }
}

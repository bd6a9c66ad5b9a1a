//! AQL：测试报告的过滤查询语言
//!
//! ```text
//! status = "passed" AND (age > 25 OR tag IN ["smoke", "slow"])
//! ```
//!
//! - `lexer` - 词法分析，文本 → token
//! - `parser` - 递归下降语法分析，token → AST
//! - `config` - 限制允许的语法结构
//! - `resolver` - 函数字面量 `name()` 的上下文替换
//! - `serializer` - AST → 规范化的 AQL 文本
//! - `sql_compiler` - 可选的适配器，AST → PostgreSQL WHERE 条件

pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod serializer;
pub mod sql_compiler;
pub mod token;

pub use ast::{
    aql_array_condition_expression, aql_binary_expression, aql_boolean_expression,
    aql_condition_expression, aql_not_expression, aql_paren_expression, AccessorParam,
    AqlAccessor, AqlExpression, AqlOperation, AqlParseResult, AqlValue, AqlValueKind,
    BinaryOperator, ComparisonOperator, LogicalOperator,
};
pub use config::{AqlParserConfig, ConfigError, IdentifierRule};
pub use error::{ParseError, ParseErrorKind};
pub use lexer::{tokenize, Lexer};
pub use parser::Parser;
pub use resolver::AqlContext;
pub use serializer::expression_to_string;
pub use sql_compiler::{CompileError, SqlCompiler};

use tracing::{debug, instrument};

/// 解析 AQL 文本，唯一的解析入口
///
/// 空文本或只有空白时返回 `expression: None`。
#[instrument(level = "debug", skip(context, config), fields(len = text.len()))]
pub fn parse_aql(
    text: &str,
    context: Option<&AqlContext>,
    config: Option<&AqlParserConfig>,
) -> Result<AqlParseResult, ParseError> {
    let tokens = tokenize(text)?;
    let result = Parser::new(&tokens)
        .with_context(context)
        .with_config(config)
        .parse();

    match &result {
        Ok(_) => debug!("aql parsed"),
        Err(e) => debug!(kind = ?e.kind, position = e.position(), error = %e.message, "aql rejected"),
    }
    result
}

/// 判断过滤条件是否等价于“不过滤”，调用方可以据此跳过解析和求值
pub fn includes_all(aql: Option<&str>) -> bool {
    match aql {
        None => true,
        Some(text) => {
            let trimmed = text.trim();
            trimmed.is_empty() || trimmed.eq_ignore_ascii_case("true")
        }
    }
}

//! AQL 的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   └─ parse_expression()
//!        └─ parse_or_expression()
//!             ├─ parse_and_expression()
//!             │    ├─ parse_not_expression()
//!             │    │    ├─ "NOT" → parse_not_expression() (右递归)
//!             │    │    └─ parse_primary_expression()
//!             │    │         ├─ "(" → 分组表达式 (递归调用parse_expression)
//!             │    │         ├─ true / false → 布尔字面量
//!             │    │         └─ 标识符 → parse_condition()
//!             │    │              ├─ parse_accessor()  field / field["key"] / field[0]
//!             │    │              ├─ "IN" → [ value, ... ]
//!             │    │              └─ 比较运算符 → parse_value()
//!             │    │
//!             │    └─ 遇到AND时，继续解析右侧NOT表达式
//!             │
//!             └─ 遇到OR时，继续解析右侧AND表达式
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)` 与比较 `field op value`
//! 2. **NOT操作** `NOT expression`
//! 3. **AND操作** `expr1 AND expr2`
//! 4. **OR操作** `expr1 OR expr2`
//!
//! 每个决策点都会咨询 `AqlParserConfig`，第一个被禁止的结构会在它自己的
//! 位置上报错，而不会被静默丢弃。
//!
//! ## 解析示例
//!
//! ```text
//! status = "passed"
//! status = "passed" AND (age > 25 OR tag IN ["smoke", "slow"])
//! NOT NOT cf["team"] ~= "core"
//! createdAt >= now()
//! ```

use tracing::{debug, trace};

use crate::ast::{
    AccessorParam, AqlAccessor, AqlExpression, AqlOperation, AqlParseResult, AqlValue,
    BinaryOperator, ComparisonOperator, LogicalOperator,
};
use crate::config::AqlParserConfig;
use crate::error::ParseError;
use crate::lexer::unescape_string;
use crate::resolver::{empty_value, resolve_function, AqlContext};
use crate::token::{Span, Token, TokenKind};

/// `NOT` 与括号的最大嵌套层数，超过后报错而不是耗尽栈
pub const MAX_NESTING_DEPTH: usize = 256;

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    /// 当前 `NOT` / `(` 的嵌套层数
    depth: usize,
    context: Option<&'a AqlContext>,
    config: Option<&'a AqlParserConfig>,
    /// token 流没有以 `Eol` 结尾时使用
    eol: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        let end = tokens.last().map_or(0, |t| t.span.end);
        Self {
            tokens,
            position: 0,
            depth: 0,
            context: None,
            config: None,
            eol: Token::new(TokenKind::Eol, Span::new(end, end)),
        }
    }

    pub fn with_context(mut self, context: Option<&'a AqlContext>) -> Self {
        self.context = context;
        self
    }

    pub fn with_config(mut self, config: Option<&'a AqlParserConfig>) -> Self {
        self.config = config;
        self
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Token<'a> {
        self.tokens.get(self.position).copied().unwrap_or(self.eol)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Token<'a> {
        let token = self.peek();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    /// 检查当前 token 是否匹配给定类型
    fn match_token(&self, kind: TokenKind<'_>) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(&kind)
    }

    fn unexpected(&self, token: Token<'_>, expected: &str) -> ParseError {
        if token.kind == TokenKind::Eol {
            ParseError::syntax(format!("Unexpected end of input, expected {}", expected), token.span)
        } else {
            ParseError::syntax(
                format!("Expected {}, found {}", expected, token.kind.describe()),
                token.span,
            )
        }
    }

    fn enter_nested(&mut self, token: Token<'_>) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::syntax(
                format!("Expression nested too deeply (limit {})", MAX_NESTING_DEPTH),
                token.span,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn violation(&self, message: String, span: Span) -> ParseError {
        debug!(position = span.start, %message, "aql construct rejected by parser configuration");
        ParseError::config(message, span)
    }

    fn check_logical_operator(&self, op: LogicalOperator, token: Token<'_>) -> Result<(), ParseError> {
        if self.config.map_or(true, |c| c.is_logical_operator_allowed(op)) {
            Ok(())
        } else {
            Err(self.violation(
                format!("Logical operator {} is not permitted by parser configuration", op.name()),
                token.span,
            ))
        }
    }

    fn check_operation(&self, op: AqlOperation, token: Token<'_>) -> Result<(), ParseError> {
        if self.config.map_or(true, |c| c.is_operation_allowed(op)) {
            Ok(())
        } else {
            Err(self.violation(
                format!("Operator {} is not permitted by parser configuration", op.name()),
                token.span,
            ))
        }
    }

    pub fn parse(&mut self) -> Result<AqlParseResult, ParseError> {
        trace!(tokens = self.tokens.len(), "parsing aql token stream");

        if self.match_token(TokenKind::Eol) {
            return Ok(AqlParseResult { expression: None });
        }

        let expression = self.parse_expression()?;

        let token = self.peek();
        if token.kind != TokenKind::Eol {
            return Err(self.unexpected(token, "AND, OR or end of input"));
        }

        Ok(AqlParseResult { expression: Some(expression) })
    }

    /// 解析表达式的入口点
    ///
    /// 按照优先级从低到高依次处理：OR → AND → NOT → PRIMARY
    fn parse_expression(&mut self) -> Result<AqlExpression, ParseError> {
        self.parse_or_expression()
    }

    /// 解析OR表达式 (最低优先级，左结合)
    ///
    /// 语法: `and_expr (OR and_expr)*`
    fn parse_or_expression(&mut self) -> Result<AqlExpression, ParseError> {
        let mut left = self.parse_and_expression()?;

        while self.match_token(TokenKind::Or) {
            let token = self.advance(); // 消费 OR
            self.check_logical_operator(LogicalOperator::Or, token)?;
            let right = self.parse_and_expression()?;
            left = AqlExpression::Binary {
                left: Box::new(left),
                operator: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// 解析AND表达式 (左结合)
    ///
    /// 语法: `not_expr (AND not_expr)*`
    fn parse_and_expression(&mut self) -> Result<AqlExpression, ParseError> {
        let mut left = self.parse_not_expression()?;

        while self.match_token(TokenKind::And) {
            let token = self.advance(); // 消费 AND
            self.check_logical_operator(LogicalOperator::And, token)?;
            let right = self.parse_not_expression()?;
            left = AqlExpression::Binary {
                left: Box::new(left),
                operator: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// 解析NOT表达式
    ///
    /// 语法: `NOT not_expr | primary`
    fn parse_not_expression(&mut self) -> Result<AqlExpression, ParseError> {
        if self.match_token(TokenKind::Not) {
            let token = self.advance(); // 消费 NOT
            self.check_logical_operator(LogicalOperator::Not, token)?;
            self.enter_nested(token)?;
            let expression = self.parse_not_expression()?; // 允许 NOT 链式调用
            self.depth -= 1;
            Ok(AqlExpression::Not { expression: Box::new(expression) })
        } else {
            self.parse_primary_expression()
        }
    }

    /// 解析基础表达式
    ///
    /// - `(expression)` - 分组表达式
    /// - `true` / `false` - 布尔字面量
    /// - `accessor op value` / `accessor IN [...]` - 比较
    fn parse_primary_expression(&mut self) -> Result<AqlExpression, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::LParen => {
                self.advance(); // 消费 (
                if !self.config.map_or(true, |c| c.parentheses_allowed()) {
                    return Err(self.violation(
                        "Parentheses are not permitted by parser configuration".to_string(),
                        token.span,
                    ));
                }
                self.enter_nested(token)?;
                let expression = self.parse_expression()?;
                self.depth -= 1;
                if !self.match_token(TokenKind::RParen) {
                    let found = self.peek();
                    return Err(self.unexpected(
                        found,
                        &format!("')' to close '(' at position {}", token.span.start),
                    ));
                }
                self.advance(); // 消费 )
                Ok(AqlExpression::Paren { expression: Box::new(expression) })
            }
            TokenKind::Boolean(value) => {
                self.advance();
                Ok(AqlExpression::Boolean { value })
            }
            TokenKind::Identifier(_) => self.parse_condition(),
            _ => Err(self.unexpected(token, "expression")),
        }
    }

    fn parse_condition(&mut self) -> Result<AqlExpression, ParseError> {
        let left = self.parse_accessor()?;

        let token = self.advance();
        let operator = match token.kind {
            TokenKind::In => {
                self.check_operation(AqlOperation::In, token)?;
                let right = self.parse_value_list()?;
                return Ok(AqlExpression::ArrayCondition { left, right });
            }
            TokenKind::Gt => ComparisonOperator::Gt,
            TokenKind::Ge => ComparisonOperator::Ge,
            TokenKind::Lt => ComparisonOperator::Lt,
            TokenKind::Le => ComparisonOperator::Le,
            TokenKind::Eq => ComparisonOperator::Eq,
            TokenKind::Neq => ComparisonOperator::Neq,
            TokenKind::Contains => ComparisonOperator::Contains,
            _ => return Err(self.unexpected(token, "comparison operator")),
        };
        self.check_operation(operator.into(), token)?;

        let right = self.parse_value()?;
        Ok(AqlExpression::Condition { left, operator, right })
    }

    /// 语法: `IDENTIFIER ( "[" (STRING | NUMBER) "]" )?`
    fn parse_accessor(&mut self) -> Result<AqlAccessor, ParseError> {
        let token = self.advance();
        let TokenKind::Identifier(identifier) = token.kind else {
            return Err(self.unexpected(token, "field identifier"));
        };

        if !self.config.map_or(true, |c| c.is_identifier_allowed(identifier)) {
            return Err(self.violation(
                format!("Identifier '{}' is not permitted by parser configuration", identifier),
                token.span,
            ));
        }

        if !self.match_token(TokenKind::LBracket) {
            return Ok(AqlAccessor::new(identifier));
        }

        let bracket = self.advance(); // 消费 [
        if !self.config.map_or(true, |c| c.index_access_allowed()) {
            return Err(self.violation(
                "Index access is not permitted by parser configuration".to_string(),
                bracket.span,
            ));
        }

        let param_token = self.advance();
        let param = match param_token.kind {
            TokenKind::String(raw) => AccessorParam::Key(unescape_string(raw)),
            TokenKind::Number(n) => {
                let index = n
                    .parse::<f64>()
                    .ok()
                    .filter(|i| i.is_finite())
                    .ok_or_else(|| {
                        ParseError::syntax(format!("Invalid numeric index '{}'", n), param_token.span)
                    })?;
                AccessorParam::Index(index)
            }
            _ => return Err(self.unexpected(param_token, "string or number index")),
        };

        if !self.match_token(TokenKind::RBracket) {
            let found = self.peek();
            return Err(self.unexpected(
                found,
                &format!("']' to close '[' at position {}", bracket.span.start),
            ));
        }
        self.advance(); // 消费 ]

        Ok(AqlAccessor { identifier: identifier.to_string(), param: Some(param) })
    }

    /// 语法: `"[" ( value ( "," value )* )? "]"`
    fn parse_value_list(&mut self) -> Result<Vec<AqlValue>, ParseError> {
        let open = self.peek();
        if open.kind != TokenKind::LBracket {
            return Err(self.unexpected(open, "'[' after IN"));
        }
        self.advance(); // 消费 [

        let mut values = Vec::new();
        if self.match_token(TokenKind::RBracket) {
            self.advance();
            return Ok(values);
        }

        loop {
            values.push(self.parse_value()?);
            let token = self.advance();
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RBracket => break,
                _ => {
                    return Err(self.unexpected(
                        token,
                        &format!("',' or ']' to close '[' at position {}", open.span.start),
                    ));
                }
            }
        }

        Ok(values)
    }

    fn parse_value(&mut self) -> Result<AqlValue, ParseError> {
        let token = self.advance();
        let value = match token.kind {
            TokenKind::String(raw) => AqlValue::string(unescape_string(raw)),
            TokenKind::Number(n) => AqlValue::number(n),
            TokenKind::Boolean(b) => AqlValue::boolean(b),
            TokenKind::Null => AqlValue::null(),
            // `empty` 是 null 的别名，输出时总是写作 null
            TokenKind::Identifier("empty") => empty_value(),
            TokenKind::Function(call) => resolve_function(call, self.context),
            _ => return Err(self.unexpected(token, "value")),
        };

        if !self.config.map_or(true, |c| c.is_value_type_allowed(value.kind)) {
            return Err(self.violation(
                format!("Value type {} is not permitted by parser configuration", value.kind.name()),
                token.span,
            ));
        }

        Ok(value)
    }
}

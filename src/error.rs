//! 解析错误定义

use thiserror::Error;

use crate::token::Span;

/// 错误的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// 无法识别的字符、未闭合的字符串等
    Lexical,
    /// token 出现在语法不允许的位置
    Syntax,
    /// 语法合法，但被 `AqlParserConfig` 禁止
    Config,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {}", .span.start)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Self { kind: ParseErrorKind::Lexical, message: message.into(), span }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self { kind: ParseErrorKind::Syntax, message: message.into(), span }
    }

    pub fn config(message: impl Into<String>, span: Span) -> Self {
        Self { kind: ParseErrorKind::Config, message: message.into(), span }
    }

    pub fn position(&self) -> usize {
        self.span.start
    }
}

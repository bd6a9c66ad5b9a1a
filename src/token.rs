//! AQL 的 token 定义

/// token 是语言中的最小单元，带有类型和位置信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }

    /// token 第一个字符的偏移量（从 0 开始）
    pub fn position(&self) -> usize {
        self.span.start
    }

    /// 携带数据的 token 的原始文本
    pub fn value(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::String(raw)
            | TokenKind::Number(raw)
            | TokenKind::Identifier(raw)
            | TokenKind::Function(raw) => Some(raw),
            TokenKind::Boolean(true) => Some("true"),
            TokenKind::Boolean(false) => Some("false"),
            TokenKind::Null => Some("null"),
            _ => None,
        }
    }
}

/// token 的类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    // Comparison operators
    Gt,       // >
    Ge,       // >=
    Lt,       // <
    Le,       // <=
    Eq,       // = or "is"
    Neq,      // !=
    Contains, // ~=
    In,       // IN

    // Logical keywords
    And, // AND
    Or,  // OR
    Not, // NOT

    // Values
    Null,          // null
    Boolean(bool), // true / false
    Number(&'a str),
    String(&'a str), // 原始字符串，包括两侧引号，尚未反转义
    Function(&'a str), // 例如 "now()"

    Identifier(&'a str),

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,

    Eol, // 输入结束
}

impl TokenKind<'_> {
    /// 用于错误信息的简短描述
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::Ge => "'>='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::Le => "'<='".to_string(),
            TokenKind::Eq => "'='".to_string(),
            TokenKind::Neq => "'!='".to_string(),
            TokenKind::Contains => "'~='".to_string(),
            TokenKind::In => "IN".to_string(),
            TokenKind::And => "AND".to_string(),
            TokenKind::Or => "OR".to_string(),
            TokenKind::Not => "NOT".to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::Boolean(b) => b.to_string(),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::String(s) => format!("string {}", s),
            TokenKind::Function(f) => format!("function {}", f),
            TokenKind::Identifier(id) => format!("identifier '{}'", id),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Eol => "end of input".to_string(),
        }
    }
}

/// 源文本中的一个区间（字节偏移）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// 起始字节偏移
    pub start: usize,
    /// 结束字节偏移（不包含）
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_value_only_for_data_tokens() {
        let ident = Token::new(TokenKind::Identifier("status"), Span::new(0, 6));
        assert_eq!(ident.value(), Some("status"));
        assert_eq!(ident.position(), 0);

        let string = Token::new(TokenKind::String("\"a\""), Span::new(4, 7));
        assert_eq!(string.value(), Some("\"a\""));

        let paren = Token::new(TokenKind::LParen, Span::new(2, 3));
        assert_eq!(paren.value(), None);
        assert_eq!(paren.position(), 2);
    }
}

//! AQL 的词法分析器
//!
//! 将输入文本切分为带位置的 token 流，空白字符在这里直接跳过，
//! 不会出现在结果中。流的最后一个 token 总是 `Eol`。

use crate::error::ParseError;
use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
    /// 已经产出 `Eol` 或错误
    finished: bool,
}

/// 对整个输入进行分词，遇到第一个词法错误即返回
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, ParseError> {
    Lexer::new(input).collect()
}

/// 把 STRING token 的原始文本（带引号）还原为字符串内容
pub fn unescape_string(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0, finished: false }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 返回下一个位置的字符，不推进位置
    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\n' || c == '\r' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token::new(kind, Span::new(start, self.position))
    }

    /// 读取数字字面量，可选的负号已经被调用者消费
    fn read_number(&mut self, start: usize) -> Token<'a> {
        self.consume_digits();
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump(); // 消费 '.'
            self.consume_digits();
        }
        let literal = &self.input[start..self.position];
        self.token(TokenKind::Number(literal), start)
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 读取双引号包围的字符串字面量
    /// 注意：开始的引号已经被调用者消费
    fn read_string(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        loop {
            let escape_start = self.position;
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('"' | '\\' | 'n' | 't' | 'r') => {}
                    Some(other) => {
                        return Err(ParseError::lexical(
                            format!("Invalid escape sequence '\\{}'", other),
                            Span::new(escape_start, self.position),
                        ));
                    }
                    None => {
                        return Err(ParseError::lexical(
                            "Unterminated string",
                            Span::new(start, self.position),
                        ));
                    }
                },
                Some(_) => {}
                None => {
                    return Err(ParseError::lexical(
                        "Unterminated string",
                        Span::new(start, self.position),
                    ));
                }
            }
        }

        let raw = &self.input[start..self.position];
        Ok(self.token(TokenKind::String(raw), start))
    }

    /// 读取标识符、关键字或函数字面量
    fn read_word(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];

        if let Some(kind) = match_keyword(literal) {
            return self.token(kind, start);
        }

        // `name()` 紧挨着书写时是函数字面量
        if self.input[self.position..].starts_with("()") {
            self.position += 2;
            let literal = &self.input[start..self.position];
            return self.token(TokenKind::Function(literal), start);
        }

        self.token(TokenKind::Identifier(literal), start)
    }

    fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.bump() else {
            return Ok(self.token(TokenKind::Eol, start));
        };

        let token = match c {
            '=' => self.token(TokenKind::Eq, start),
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            '[' => self.token(TokenKind::LBracket, start),
            ']' => self.token(TokenKind::RBracket, start),
            ',' => self.token(TokenKind::Comma, start),
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Le, start)
                } else {
                    self.token(TokenKind::Lt, start)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Ge, start)
                } else {
                    self.token(TokenKind::Gt, start)
                }
            }
            '!' | '~' => {
                if self.peek() == Some('=') {
                    self.bump();
                    let kind = if c == '!' { TokenKind::Neq } else { TokenKind::Contains };
                    self.token(kind, start)
                } else {
                    return Err(ParseError::lexical(
                        format!("Unexpected character '{}', expected '{}='", c, c),
                        Span::new(start, self.position),
                    ));
                }
            }
            '-' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number(start)
                } else {
                    return Err(ParseError::lexical(
                        "Expected digit after '-'",
                        Span::new(start, self.position),
                    ));
                }
            }
            '"' => self.read_string(start)?,
            c if c.is_ascii_digit() => self.read_number(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_word(start),
            c => {
                return Err(ParseError::lexical(
                    format!("Unexpected character '{}'", c),
                    Span::new(start, self.position),
                ));
            }
        };
        Ok(token)
    }
}

/// 关键字区分大小写
fn match_keyword(s: &str) -> Option<TokenKind<'static>> {
    let kind = match s {
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        "IN" => TokenKind::In,
        "is" => TokenKind::Eq,
        "true" => TokenKind::Boolean(true),
        "false" => TokenKind::Boolean(false),
        "null" => TokenKind::Null,
        _ => return None,
    };
    Some(kind)
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.kind != TokenKind::Eol => {}
            _ => self.finished = true,
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_condition() {
        let input = r#"status = "passed""#;
        let tokens = tokenize(input).unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Identifier("status"));
        assert_eq!(tokens[0].position(), 0);
        assert_eq!(tokens[1].kind, TokenKind::Eq);
        assert_eq!(tokens[1].position(), 7);
        assert_eq!(tokens[2].kind, TokenKind::String(r#""passed""#));
        assert_eq!(tokens[2].position(), 9);
        assert_eq!(tokens[3].kind, TokenKind::Eol);
        assert_eq!(tokens[3].span, Span::new(17, 17));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_all_operators_and_punctuation() {
        let input = "!= = > < >= <= ~= ( ) [ ] ,";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Neq, TokenKind::Eq, TokenKind::Gt, TokenKind::Lt,
                TokenKind::Ge, TokenKind::Le, TokenKind::Contains,
                TokenKind::LParen, TokenKind::RParen,
                TokenKind::LBracket, TokenKind::RBracket, TokenKind::Comma,
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        let input = "AND OR NOT IN is true false null and Or TRUE Null IS";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::And, TokenKind::Or, TokenKind::Not, TokenKind::In,
                TokenKind::Eq, TokenKind::Boolean(true), TokenKind::Boolean(false),
                TokenKind::Null,
                TokenKind::Identifier("and"), TokenKind::Identifier("Or"),
                TokenKind::Identifier("TRUE"), TokenKind::Identifier("Null"),
                TokenKind::Identifier("IS"),
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_empty_is_identifier() {
        assert_eq!(kinds("empty"), vec![TokenKind::Identifier("empty"), TokenKind::Eol]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("25 -10 3.14 -0.5"),
            vec![
                TokenKind::Number("25"),
                TokenKind::Number("-10"),
                TokenKind::Number("3.14"),
                TokenKind::Number("-0.5"),
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_number_without_fraction_digits_is_error() {
        let err = tokenize("3.").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Lexical);
        assert_eq!(err.position(), 1);
    }

    #[test]
    fn test_lone_dash_is_error() {
        let err = tokenize("a = - 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Lexical);
        assert_eq!(err.position(), 4);
    }

    #[test]
    fn test_function_literal() {
        assert_eq!(
            kinds("createdAt > now()"),
            vec![
                TokenKind::Identifier("createdAt"),
                TokenKind::Gt,
                TokenKind::Function("now()"),
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_function_requires_adjacent_parens() {
        assert_eq!(
            kinds("now ()"),
            vec![
                TokenKind::Identifier("now"),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let input = r#""a\"b\\c""#;
        let tokens = tokenize(input).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String(input));
        assert_eq!(unescape_string(input), r#"a"b\c"#);
    }

    // \n \t \r 属于尽力支持的转义，不是必须的行为
    #[test]
    fn test_string_best_effort_escapes() {
        let input = r#""line\nnext\ttab""#;
        assert!(tokenize(input).is_ok());
        assert_eq!(unescape_string(input), "line\nnext\ttab");
    }

    #[test]
    fn test_invalid_escape_is_error() {
        let err = tokenize(r#"name = "a\qb""#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Lexical);
        assert_eq!(err.position(), 9);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize(r#"name = "abc"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Lexical);
        assert_eq!(err.position(), 7);
        assert!(err.message.contains("Unterminated"));
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("a = 1 & b = 2").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Lexical);
        assert_eq!(err.position(), 6);

        let err = tokenize("a ! 1").unwrap_err();
        assert_eq!(err.position(), 2);
    }

    #[test]
    fn test_whitespace_is_skipped() {
        let tokens = tokenize("  a\t=\n1  ").unwrap();
        let positions: Vec<_> = tokens.iter().map(|t| t.position()).collect();
        assert_eq!(positions, vec![2, 4, 6, 9]);
    }

    #[test]
    fn test_index_access_tokens() {
        assert_eq!(
            kinds(r#"cf["key"] = 1 AND arr[0] != 2"#),
            vec![
                TokenKind::Identifier("cf"),
                TokenKind::LBracket,
                TokenKind::String(r#""key""#),
                TokenKind::RBracket,
                TokenKind::Eq,
                TokenKind::Number("1"),
                TokenKind::And,
                TokenKind::Identifier("arr"),
                TokenKind::LBracket,
                TokenKind::Number("0"),
                TokenKind::RBracket,
                TokenKind::Neq,
                TokenKind::Number("2"),
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_empty_input_yields_only_eol() {
        assert_eq!(kinds(""), vec![TokenKind::Eol]);
        assert_eq!(kinds("   "), vec![TokenKind::Eol]);
    }
}

//! AST 到 AQL 文本的规范化输出
//!
//! 输出格式是稳定的，可以被外部工具保存后再次解析。对解析器能产生的任何
//! AST，`parse(expression_to_string(e)) == e`，唯一的例外是 `empty` 会输出为 `null`。

use std::fmt;

use crate::ast::{AccessorParam, AqlAccessor, AqlExpression, AqlValue, AqlValueKind};

pub fn expression_to_string(expression: &AqlExpression) -> String {
    expression.to_string()
}

/// 先转义反斜杠，再转义引号
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for AqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AqlValueKind::String => write!(f, "\"{}\"", escape(&self.value)),
            AqlValueKind::Null => f.write_str("null"),
            AqlValueKind::Boolean | AqlValueKind::Number | AqlValueKind::Function => {
                f.write_str(&self.value)
            }
        }
    }
}

impl fmt::Display for AqlAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)?;
        match &self.param {
            Some(AccessorParam::Key(key)) => write!(f, "[\"{}\"]", escape(key)),
            Some(AccessorParam::Index(index)) => write!(f, "[{}]", index),
            None => Ok(()),
        }
    }
}

impl fmt::Display for AqlExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AqlExpression::Condition { left, operator, right } => {
                write!(f, "{} {} {}", left, operator.symbol(), right)
            }
            AqlExpression::ArrayCondition { left, right } => {
                write!(f, "{} IN [", left)?;
                for (i, value) in right.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
            AqlExpression::Binary { left, operator, right } => {
                write!(f, "{} {} {}", left, operator.symbol(), right)
            }
            AqlExpression::Not { expression } => write!(f, "NOT {}", expression),
            AqlExpression::Paren { expression } => write!(f, "({})", expression),
            AqlExpression::Boolean { value } => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use crate::resolver::AqlContext;
    use serde_json::json;

    fn parse(input: &str) -> AqlExpression {
        parse_in(input, None)
    }

    fn parse_in(input: &str, context: Option<&AqlContext>) -> AqlExpression {
        let tokens = tokenize(input).unwrap();
        Parser::new(&tokens).with_context(context).parse().unwrap().expression.unwrap()
    }

    fn round_trip(input: &str) -> String {
        expression_to_string(&parse(input))
    }

    #[test]
    fn test_canonical_formatting() {
        assert_eq!(round_trip(r#"status="passed""#), r#"status = "passed""#);
        assert_eq!(round_trip("age is 25"), "age = 25");
        assert_eq!(round_trip("a~=1"), "a ~= 1");
        assert_eq!(round_trip("tag IN [ \"a\" ,\"b\" ]"), r#"tag IN ["a", "b"]"#);
        assert_eq!(round_trip("( a = 1 )"), "(a = 1)");
        assert_eq!(round_trip("NOT   a != 1"), "NOT a != 1");
        assert_eq!(round_trip("a>=1 AND b<=2 OR c<3"), "a >= 1 AND b <= 2 OR c < 3");
        assert_eq!(round_trip("true"), "true");
    }

    #[test]
    fn test_empty_array() {
        let expr = parse("status IN []");
        assert_eq!(expression_to_string(&expr), "status IN []");
    }

    #[test]
    fn test_empty_serializes_as_null() {
        assert_eq!(round_trip("a = empty"), "a = null");
        assert_eq!(round_trip("a IN [empty, 1]"), "a IN [null, 1]");
    }

    #[test]
    fn test_accessor_escaping_round_trip() {
        let input = r#"cf["test\\backslash\"quote"] = "v""#;
        assert_eq!(round_trip(input), input);
    }

    #[test]
    fn test_string_value_escaping() {
        let expr = aql_condition_expression(
            AqlAccessor::new("name"),
            ComparisonOperator::Eq,
            AqlValue::string(r#"say "hi" \o/"#),
        );
        assert_eq!(expression_to_string(&expr), r#"name = "say \"hi\" \\o/""#);
        assert_eq!(parse(&expression_to_string(&expr)), expr);
    }

    #[test]
    fn test_numeric_index() {
        assert_eq!(round_trip("arr[0] = 1"), "arr[0] = 1");
        assert_eq!(round_trip("arr[2.5] = 1"), "arr[2.5] = 1");
    }

    #[test]
    fn test_function_value_kept_raw() {
        assert_eq!(round_trip("createdAt > now()"), "createdAt > now()");
    }

    #[test]
    fn test_programmatic_ast() {
        let expr = aql_binary_expression(
            aql_not_expression(aql_condition_expression(
                AqlAccessor::new("status"),
                ComparisonOperator::Eq,
                AqlValue::string("failed"),
            )),
            BinaryOperator::And,
            aql_paren_expression(aql_array_condition_expression(
                AqlAccessor::with_index("tags", 1.0),
                vec![AqlValue::null(), AqlValue::boolean(false)],
            )),
        );
        assert_eq!(
            expression_to_string(&expr),
            r#"NOT status = "failed" AND (tags[1] IN [null, false])"#
        );
    }

    #[test]
    fn test_round_trip_is_structural() {
        let inputs = [
            r#"status = "passed" AND (age > 25 OR tag IN ["smoke", "slow"])"#,
            "NOT NOT status = \"passed\"",
            "a = 1 AND b = 2 OR c = 3",
            "((a = -1.5))",
            r#"cf["k"] ~= "v" OR arr[3] != null"#,
            "flag = true AND NOT (x IN [] OR false)",
            "d < today()",
            "name = \"multi\nline\"",
            "big = 123456789012345678901234567890.5",
        ];
        for input in inputs {
            let first = parse(input);
            let text = expression_to_string(&first);
            let second = parse(&text);
            assert_eq!(first, second, "round trip changed AST for {}", input);
            // 一次输出后即为不动点
            assert_eq!(expression_to_string(&second), text);
        }

        let index = format!("arr[{}] = 1", "9".repeat(300));
        let first = parse(&index);
        assert_eq!(parse(&expression_to_string(&first)), first);
    }

    #[test]
    fn test_resolved_values_round_trip() {
        let mut ctx = AqlContext::new();
        ctx.insert("big()".to_string(), json!(1e20));
        ctx.insert("tiny()".to_string(), json!(1.5e-7));
        ctx.insert("neg()".to_string(), json!(-42));
        ctx.insert("ratio()".to_string(), json!(-0.25));
        ctx.insert("user()".to_string(), json!("a \"quoted\" \\ name"));
        ctx.insert("tags()".to_string(), json!(["x", "y"]));

        let inputs = [
            "a > big()",
            "a < tiny()",
            "a >= neg() AND b <= ratio()",
            "owner = user() OR labels ~= tags()",
            "n IN [big(), tiny(), neg(), user(), unknown()]",
        ];
        for input in inputs {
            let resolved = parse_in(input, Some(&ctx));
            let text = expression_to_string(&resolved);
            // 已解析的值不依赖上下文，未解析的 unknown() 原样保留
            assert_eq!(parse(&text), resolved, "round trip changed AST for {}", input);
        }

        assert_eq!(
            expression_to_string(&parse_in("a > big() AND b < tiny()", Some(&ctx))),
            "a > 100000000000000000000 AND b < 0.00000015"
        );
    }
}

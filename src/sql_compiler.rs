//! Optional SQL adapter that lowers a parsed AQL expression to a sea-query
//! WHERE predicate.
//!
//! This sits outside the parsing front end: nothing in `parse_aql` depends on
//! it. Storage code can use it to push report filters down into PostgreSQL
//! instead of evaluating them row by row.

use sea_query::{Alias, Asterisk, Expr, LikeExpr, PostgresQueryBuilder, SelectStatement, SimpleExpr, Value};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::ast::{AqlAccessor, AqlExpression, AqlParseResult, AqlValue, AqlValueKind, BinaryOperator, ComparisonOperator};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

/// Result of SQL compilation
#[derive(Debug)]
pub struct CompileResult {
    pub sql: String,
}

/// SQL Compiler that converts AQL expressions to SQL queries
pub struct SqlCompiler {
    table: String,
    /// Maps AQL identifiers to column names; unmapped identifiers are used as is
    column_mapping: HashMap<String, String>,
}

impl SqlCompiler {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column_mapping: HashMap::new(),
        }
    }

    /// Set column mapping for identifiers
    pub fn set_column_mapping(&mut self, mapping: HashMap<String, String>) {
        self.column_mapping = mapping;
    }

    fn column_name(&self, accessor: &AqlAccessor) -> Result<String, CompileError> {
        if accessor.param.is_some() {
            return Err(CompileError::new(format!(
                "Index access on '{}' cannot be compiled to SQL",
                accessor
            )));
        }
        Ok(self
            .column_mapping
            .get(&accessor.identifier)
            .cloned()
            .unwrap_or_else(|| accessor.identifier.clone()))
    }

    /// Compile a parse result into a SELECT statement; an empty query selects every row
    pub fn compile(&self, result: &AqlParseResult) -> Result<CompileResult, CompileError> {
        let mut select = SelectStatement::new();
        select.column(Asterisk);
        select.from(Alias::new(self.table.as_str()));

        if let Some(expression) = &result.expression {
            select.and_where(self.compile_expression(expression)?);
        }

        let sql = select.to_string(PostgresQueryBuilder);
        debug!(%sql, "compiled aql to sql");
        Ok(CompileResult { sql })
    }

    /// Compile a single expression into a WHERE predicate
    pub fn compile_expression(&self, expression: &AqlExpression) -> Result<SimpleExpr, CompileError> {
        let expr = match expression {
            AqlExpression::Condition { left, operator, right } => {
                self.compile_comparison(left, *operator, right)?
            }
            AqlExpression::ArrayCondition { left, right } => self.compile_in(left, right)?,
            AqlExpression::Binary { left, operator, right } => {
                let left_expr = self.compile_expression(left)?;
                let right_expr = self.compile_expression(right)?;
                match operator {
                    BinaryOperator::And => left_expr.and(right_expr),
                    BinaryOperator::Or => left_expr.or(right_expr),
                }
            }
            AqlExpression::Not { expression } => self.compile_expression(expression)?.not(),
            // sea-query adds parentheses where precedence requires them
            AqlExpression::Paren { expression } => self.compile_expression(expression)?,
            AqlExpression::Boolean { value } => Expr::val(*value).into(),
        };
        Ok(expr)
    }

    fn compile_comparison(
        &self,
        left: &AqlAccessor,
        op: ComparisonOperator,
        value: &AqlValue,
    ) -> Result<SimpleExpr, CompileError> {
        let col = Expr::col(Alias::new(self.column_name(left)?));

        if value.is_null() {
            return match op {
                ComparisonOperator::Eq => Ok(col.is_null()),
                ComparisonOperator::Neq => Ok(col.is_not_null()),
                _ => Err(CompileError::new(format!(
                    "Operator '{}' cannot be applied to null",
                    op.symbol()
                ))),
            };
        }

        let expr = match op {
            ComparisonOperator::Contains => {
                if value.kind == AqlValueKind::Function {
                    return Err(unresolved_function(value));
                }
                let pattern = format!("%{}%", escape_like(&value.value));
                col.like(LikeExpr::new(pattern).escape('\\'))
            }
            ComparisonOperator::Eq => col.eq(literal_to_value(value)?),
            ComparisonOperator::Neq => col.ne(literal_to_value(value)?),
            ComparisonOperator::Gt => col.gt(literal_to_value(value)?),
            ComparisonOperator::Ge => col.gte(literal_to_value(value)?),
            ComparisonOperator::Lt => col.lt(literal_to_value(value)?),
            ComparisonOperator::Le => col.lte(literal_to_value(value)?),
        };
        Ok(expr)
    }

    fn compile_in(&self, left: &AqlAccessor, values: &[AqlValue]) -> Result<SimpleExpr, CompileError> {
        let column = self.column_name(left)?;

        let in_values: Vec<Value> = values
            .iter()
            .filter(|v| !v.is_null())
            .map(literal_to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let has_null = values.iter().any(AqlValue::is_null);

        let mut expr: Option<SimpleExpr> = None;
        if !in_values.is_empty() {
            expr = Some(Expr::col(Alias::new(column.as_str())).is_in(in_values));
        }
        if has_null {
            let is_null = Expr::col(Alias::new(column.as_str())).is_null();
            expr = Some(match expr {
                Some(e) => e.or(is_null),
                None => is_null,
            });
        }

        // IN [] never matches
        Ok(expr.unwrap_or_else(|| Expr::val(false).into()))
    }
}

fn unresolved_function(value: &AqlValue) -> CompileError {
    CompileError::new(format!(
        "Function '{}' must be resolved through the parse context before compiling to SQL",
        value.value
    ))
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Convert an AQL value to a sea-query Value
fn literal_to_value(value: &AqlValue) -> Result<Value, CompileError> {
    match value.kind {
        AqlValueKind::String => Ok(Value::from(value.value.clone())),
        AqlValueKind::Boolean => Ok(Value::from(value.value == "true")),
        AqlValueKind::Number => {
            if let Ok(n) = value.value.parse::<i64>() {
                Ok(Value::from(n))
            } else {
                value
                    .value
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| CompileError::new(format!("Invalid number '{}'", value.value)))
            }
        }
        AqlValueKind::Null => Err(CompileError::new("Null has no SQL value".to_string())),
        AqlValueKind::Function => Err(unresolved_function(value)),
    }
}

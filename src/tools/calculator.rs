//! Safe arithmetic evaluation for the `calculator` tool
//!
//! Grammar (lowest to highest precedence):
//!   expr    := term (('+' | '-') term)*
//!   term    := unary (('*' | '/' | '%') unary)*
//!   unary   := ('-' | '+') unary | power
//!   power   := primary (('^' | '**') unary)?
//!   primary := number | '(' expr ')'
//!
//! `$` signs and thousands separators are ignored. No identifiers, no calls.

use serde_json::{json, Value};

use crate::error::AssistantError;
use crate::models::{ToolInput, ToolOutput};
use crate::tools::Tool;
use crate::Result;

const MAX_EXPRESSION_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

fn invalid(msg: impl Into<String>) -> AssistantError {
    AssistantError::InvalidToolInput(msg.into())
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    let cleaned: Vec<char> = expression
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();

    let mut tokens = Vec::new();
    let mut i = 0;

    while i < cleaned.len() {
        let c = cleaned[i];
        match c {
            ' ' | '\t' | '\n' => {}
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' if cleaned.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '*' | '×' => tokens.push(Token::Star),
            '/' | '÷' => tokens.push(Token::Slash),
            '%' => tokens.push(Token::Percent),
            '^' => tokens.push(Token::Caret),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            d if d.is_ascii_digit() || d == '.' => {
                let start = i;
                while i + 1 < cleaned.len()
                    && (cleaned[i + 1].is_ascii_digit() || cleaned[i + 1] == '.')
                {
                    i += 1;
                }
                let literal: String = cleaned[start..=i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("Invalid number '{}'", literal)))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(invalid(format!("Unsupported character '{}'", other))),
        }
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => return Err(invalid("Division by zero")),
                Token::Slash => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(invalid("Missing closing parenthesis")),
                }
            }
            Some(other) => Err(invalid(format!("Unexpected token {:?}", other))),
            None => Err(invalid("Unexpected end of expression")),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<f64> {
    if expression.trim().is_empty() {
        return Err(invalid("Expression is empty"));
    }
    if expression.len() > MAX_EXPRESSION_LEN {
        return Err(invalid(format!(
            "Expression exceeds {} characters",
            MAX_EXPRESSION_LEN
        )));
    }

    let tokens = tokenize(expression)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;

    if let Some(token) = parser.peek() {
        return Err(invalid(format!("Unexpected token {:?}", token)));
    }
    if !value.is_finite() {
        return Err(invalid("Result is not a finite number"));
    }

    Ok(value)
}

/// Aggregates applied to a list of values
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Average,
}

/// Sum or average a list of values. The list has no length cap.
pub fn aggregate(operation: Aggregate, values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(invalid("No values to aggregate"));
    }

    let sum: f64 = values.iter().sum();
    let value = match operation {
        Aggregate::Sum => sum,
        Aggregate::Average => sum / values.len() as f64,
    };

    if !value.is_finite() {
        return Err(invalid("Result is not a finite number"));
    }
    Ok(value)
}

pub struct CalculatorTool;

#[async_trait::async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &'static str {
        "calculator"
    }

    fn description(&self) -> &'static str {
        "Evaluate an arithmetic expression (+ - * / % ^, parentheses), \
or sum/average a list of values"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        if let Some(operation) = input.parameters.get("operation") {
            return execute_aggregate(operation, input.parameters.get("values"));
        }

        let expression = input
            .parameters
            .get("expression")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("Expected 'expression' or 'operation' in tool_input"))?;

        let result = evaluate(expression)?;

        Ok(ToolOutput {
            success: true,
            data: json!({
                "expression": expression,
                "result": result,
                "formatted": format!("{} = {}", expression.trim(), result),
            }),
            error: None,
        })
    }
}

fn execute_aggregate(operation: &Value, values: Option<&Value>) -> Result<ToolOutput> {
    let operation: Aggregate = serde_json::from_value(operation.clone())
        .map_err(|_| invalid("'operation' must be \"sum\" or \"average\""))?;
    let values: Vec<f64> = values
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|_| invalid("'values' must be a list of numbers"))?
        .unwrap_or_default();

    let result = aggregate(operation, &values)?;
    let label = match operation {
        Aggregate::Sum => "Sum",
        Aggregate::Average => "Average",
    };

    Ok(ToolOutput {
        success: true,
        data: json!({
            "operation": operation,
            "count": values.len(),
            "result": result,
            "formatted": format!("{} of {} values = {}", label, values.len(), result),
        }),
        error: None,
    })
}

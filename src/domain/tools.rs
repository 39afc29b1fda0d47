//! Actions exposed as MCP tools
//!
//! Small text and arithmetic utilities. `format_json` reports malformed input as a soft
//! failure; every other action surfaces its faults to the caller.

use chrono::Utc;
use chrono_tz::Tz;
use serde_json::{json, Value};

use crate::domain::utils::{local_timestamp, number_value};
use crate::errors::RegistrationError;
use crate::registry::{
    signature::{Arguments, ParamSpec, ParamType},
    Action, CapabilityFault, RegistryBuilder,
};

pub fn register_tools(builder: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    builder.register(
        Action::new("add", "Add two numbers together.", add)
            .param(ParamSpec::required("a", ParamType::Number))
            .param(ParamSpec::required("b", ParamType::Number)),
    )?;
    builder.register(
        Action::new("multiply", "Multiply two numbers together.", multiply)
            .param(ParamSpec::required("a", ParamType::Number))
            .param(ParamSpec::required("b", ParamType::Number)),
    )?;
    builder.register(
        Action::new(
            "reverse_string",
            "Reverse the given text string.",
            reverse_string,
        )
        .param(ParamSpec::required("text", ParamType::Text)),
    )?;
    builder.register(
        Action::new(
            "word_count",
            "Count words, characters, and lines in the given text.",
            word_count,
        )
        .param(ParamSpec::required("text", ParamType::Text)),
    )?;
    builder.register(
        Action::new(
            "get_current_time",
            "Get the current date and time.",
            get_current_time,
        )
        .param(
            ParamSpec::optional("timezone", ParamType::Text, "")
                .describe("Optional IANA timezone (e.g., 'America/New_York'). Defaults to server local time."),
        ),
    )?;
    builder.register(
        Action::new(
            "format_json",
            "Format a JSON string with proper indentation.",
            format_json,
        )
        .param(ParamSpec::required("data", ParamType::Text))
        .soft_fail(),
    )?;
    builder.register(
        Action::new(
            "calculate",
            "Perform basic mathematical calculations. Supports +, -, *, /, and parentheses.",
            calculate,
        )
        .param(
            ParamSpec::required("expression", ParamType::Text)
                .describe("Mathematical expression to evaluate (e.g., '2 + 2', '10 * (5 + 3)')"),
        ),
    )?;

    Ok(())
}

fn add(arguments: &Arguments) -> Result<Value, CapabilityFault> {
    number_value(arguments.number("a") + arguments.number("b"))
}

fn multiply(arguments: &Arguments) -> Result<Value, CapabilityFault> {
    number_value(arguments.number("a") * arguments.number("b"))
}

fn reverse_string(arguments: &Arguments) -> Result<Value, CapabilityFault> {
    Ok(json!(arguments.text("text").chars().rev().collect::<String>()))
}

fn word_count(arguments: &Arguments) -> Result<Value, CapabilityFault> {
    let text = arguments.text("text");
    let words = text
        .split([' ', '\t'])
        .filter(|word| !word.is_empty())
        .count();

    Ok(json!({
        "characters": text.chars().count(),
        "words": words,
        "lines": text.split('\n').count(),
    }))
}

fn get_current_time(arguments: &Arguments) -> Result<Value, CapabilityFault> {
    let timezone = arguments.text("timezone").trim();
    if timezone.is_empty() {
        return Ok(json!(local_timestamp()));
    }

    let zone = timezone
        .parse::<Tz>()
        .map_err(|_| CapabilityFault::new(format!("Unknown timezone `{timezone}`")))?;
    Ok(json!(Utc::now()
        .with_timezone(&zone)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()))
}

fn format_json(arguments: &Arguments) -> Result<Value, CapabilityFault> {
    let parsed: Value = serde_json::from_str(arguments.text("data"))
        .map_err(|err| CapabilityFault::new(format!("Invalid JSON - {err}")))?;
    let formatted = serde_json::to_string_pretty(&parsed)
        .map_err(|err| CapabilityFault::new(format!("Invalid JSON - {err}")))?;

    Ok(Value::String(formatted))
}

fn calculate(arguments: &Arguments) -> Result<Value, CapabilityFault> {
    let result = evaluate_expression(arguments.text("expression"))?;
    number_value(result)
}

const MAX_NESTING: usize = 256;

/// Evaluates `+ - * /` over decimal numbers with parentheses and unary minus.
pub fn evaluate_expression(expression: &str) -> Result<f64, CapabilityFault> {
    if !expression
        .chars()
        .all(|character| character.is_ascii_digit() || "+-*/(). ".contains(character))
    {
        return Err(CapabilityFault::new(
            "Invalid expression: only numbers and basic operators (+, -, *, /, parentheses) are allowed",
        ));
    }

    let tokens = tokenize(expression)?;
    let mut parser = ExpressionParser {
        tokens,
        position: 0,
        depth: 0,
    };
    let value = parser.expression()?;

    if parser.position != parser.tokens.len() {
        return Err(CapabilityFault::new("Invalid expression: unexpected trailing input"));
    }

    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Operator(char),
    Open,
    Close,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, CapabilityFault> {
    let mut tokens = Vec::new();
    let mut characters = expression.chars().peekable();

    while let Some(&character) = characters.peek() {
        match character {
            ' ' => {
                characters.next();
            }
            '(' => {
                characters.next();
                tokens.push(Token::Open);
            }
            ')' => {
                characters.next();
                tokens.push(Token::Close);
            }
            '+' | '-' | '*' | '/' => {
                characters.next();
                tokens.push(Token::Operator(character));
            }
            _ => {
                let mut literal = String::new();
                while let Some(&digit) = characters.peek() {
                    if !(digit.is_ascii_digit() || digit == '.') {
                        break;
                    }
                    literal.push(digit);
                    characters.next();
                }
                let number = literal.parse::<f64>().map_err(|_| {
                    CapabilityFault::new(format!("Invalid expression: bad number `{literal}`"))
                })?;
                tokens.push(Token::Number(number));
            }
        }
    }

    Ok(tokens)
}

struct ExpressionParser {
    tokens: Vec<Token>,
    position: usize,
    /// Open parentheses and unary signs currently being parsed.
    depth: usize,
}

impl ExpressionParser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.position += 1;
        token
    }

    fn expression(&mut self) -> Result<f64, CapabilityFault> {
        let mut value = self.term()?;
        while let Some(Token::Operator(operator @ ('+' | '-'))) = self.peek() {
            self.position += 1;
            let right = self.term()?;
            value = if operator == '+' { value + right } else { value - right };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CapabilityFault> {
        let mut value = self.factor()?;
        while let Some(Token::Operator(operator @ ('*' | '/'))) = self.peek() {
            self.position += 1;
            let right = self.factor()?;
            if operator == '*' {
                value *= right;
            } else if right == 0.0 {
                return Err(CapabilityFault::new("Invalid expression: division by zero"));
            } else {
                value /= right;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, CapabilityFault> {
        match self.advance() {
            Some(Token::Number(number)) => Ok(number),
            Some(Token::Operator('-')) => Ok(-self.nested(Self::factor)?),
            Some(Token::Operator('+')) => self.nested(Self::factor),
            Some(Token::Open) => {
                let value = self.nested(Self::expression)?;
                match self.advance() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(CapabilityFault::new("Invalid expression: missing `)`")),
                }
            }
            _ => Err(CapabilityFault::new("Invalid expression: expected a number")),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<f64, CapabilityFault>,
    ) -> Result<f64, CapabilityFault> {
        if self.depth >= MAX_NESTING {
            return Err(CapabilityFault::new("Invalid expression: nesting too deep"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }
}

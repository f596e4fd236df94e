//! Literal parameter values
//!
//! Parameters are numbers, booleans, bare identifiers or (possibly nested)
//! lists written with `[...]` or `(...)`. Nothing is evaluated.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Ident(String),
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Ident(_) => "identifier",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Ident(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Parse exactly one literal from `input`; trailing characters are an error.
pub fn parse_value(input: &str) -> std::result::Result<Value, String> {
    let mut cursor = Cursor { chars: input.chars().collect(), pos: 0 };
    let value = cursor.value()?;
    cursor.skip_ws();
    if cursor.pos != cursor.chars.len() {
        return Err(format!("unexpected `{}` after value", cursor.rest()));
    }
    Ok(value)
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn rest(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> std::result::Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("missing value".to_string()),
            Some('[') => self.list(']'),
            Some('(') => self.list(')'),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => Ok(self.word()),
            Some(c) => Err(format!("unexpected character `{}`", c)),
        }
    }

    fn list(&mut self, close: char) -> std::result::Result<Value, String> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::List(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                Some(c) => return Err(format!("expected `,` or `{}`, found `{}`", close, c)),
                None => return Err(format!("unterminated list, expected `{}`", close)),
            }
        }
    }

    fn number(&mut self) -> std::result::Result<Value, String> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '-' || c == '+')
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e') | Some('E'));
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '_' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().filter(|&&c| c != '_').collect();
        text.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Number)
            .ok_or_else(|| format!("invalid number `{}`", text))
    }

    fn word(&mut self) -> Value {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Value::Bool(true),
            "False" | "false" => Value::Bool(false),
            _ => Value::Ident(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(parse_value("5").unwrap(), Value::Number(5.0));
        assert_eq!(parse_value("-0.25").unwrap(), Value::Number(-0.25));
        assert_eq!(parse_value("1e-3").unwrap(), Value::Number(0.001));
        assert_eq!(parse_value("2.5E+2").unwrap(), Value::Number(250.0));
        assert_eq!(parse_value("True").unwrap(), Value::Bool(true));
        assert_eq!(parse_value("false").unwrap(), Value::Bool(false));
        assert_eq!(parse_value("kaiser_best").unwrap(), Value::Ident("kaiser_best".into()));
    }

    #[test]
    fn test_nested_lists() {
        let value = parse_value("[1, (2, 3), []]").unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Number(1.0),
                Value::List(vec![Value::Number(2.0), Value::Number(3.0)]),
                Value::List(vec![]),
            ])
        );
        assert_eq!(value.to_string(), "[1,[2,3],[]]");
    }

    #[test]
    fn test_rejects_expressions() {
        assert!(parse_value("1+2").is_err());
        assert!(parse_value("__import__('os')").is_err());
        assert!(parse_value("[1, 2").is_err());
        assert!(parse_value("[1 2]").is_err());
        assert!(parse_value("").is_err());
        assert!(parse_value("--1").is_err());
    }
}

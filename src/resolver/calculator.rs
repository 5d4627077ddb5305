//! Restricted arithmetic evaluator
//!
//! Grammar: numbers, `+ - * / %`, unary sign and parentheses. Nothing else is
//! accepted, so an input can never name or call anything.

use crate::core::CalcError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => return Err(CalcError::UnexpectedChar(other)),
        };
        tokens.push(token);
        chars.next();
    }

    Ok(tokens)
}

/// Deepest parenthesis nesting accepted
const MAX_DEPTH: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut left = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    left += self.term()?;
                }
                Token::Minus => {
                    self.pos += 1;
                    left -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.pos += 1;
                    left *= self.unary()?;
                }
                Token::Slash => {
                    self.pos += 1;
                    left /= self.unary()?;
                }
                Token::Percent => {
                    self.pos += 1;
                    left %= self.unary()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    /// Sign runs are folded in a loop, so `---1` does not recurse
    fn unary(&mut self) -> Result<f64, CalcError> {
        let mut negate = false;
        while let Some(sign) = self.peek() {
            match sign {
                Token::Minus => negate = !negate,
                Token::Plus => {}
                _ => break,
            }
            self.pos += 1;
        }
        let value = self.primary()?;
        Ok(if negate { -value } else { value })
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            None => Err(CalcError::UnexpectedEnd),
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Token::LParen) => {
                if self.depth >= MAX_DEPTH {
                    return Err(CalcError::TooDeep);
                }
                self.pos += 1;
                self.depth += 1;
                let value = self.expr()?;
                self.depth -= 1;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    None => Err(CalcError::UnexpectedEnd),
                    Some(_) => Err(CalcError::UnexpectedToken(self.pos)),
                }
            }
            Some(_) => Err(CalcError::UnexpectedToken(self.pos)),
        }
    }
}

/// Evaluate an arithmetic expression
///
/// Division or remainder by zero is not an error by itself; it yields a
/// non-finite value, which is reported as [`CalcError::NotFinite`].
pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::UnexpectedToken(parser.pos));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("10 % 4").unwrap(), 2.0);
        assert_eq!(evaluate("7 / 2").unwrap(), 3.5);
    }

    #[test]
    fn test_unary_sign() {
        assert_eq!(evaluate("-3 + 5").unwrap(), 2.0);
        assert_eq!(evaluate("-(2 * 3)").unwrap(), -6.0);
        assert_eq!(evaluate("2 - -1").unwrap(), 3.0);
        assert_eq!(evaluate("+4").unwrap(), 4.0);
    }

    #[test]
    fn test_division_by_zero_is_not_finite() {
        assert_eq!(evaluate("1 / 0"), Err(CalcError::NotFinite));
        assert_eq!(evaluate("5 % 0"), Err(CalcError::NotFinite));
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert_eq!(evaluate(""), Err(CalcError::Empty));
        assert_eq!(evaluate("   "), Err(CalcError::Empty));
        assert_eq!(evaluate("2 +"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("1 2"), Err(CalcError::UnexpectedToken(1)));
        assert_eq!(evaluate("1..2"), Err(CalcError::InvalidNumber("1..2".into())));
        assert_eq!(evaluate("2 ^ 3"), Err(CalcError::UnexpectedChar('^')));
    }

    #[test]
    fn test_identifiers_never_evaluate() {
        assert!(evaluate("abs(1)").is_err());
        assert!(evaluate("process").is_err());
    }

    #[test]
    fn test_long_sign_runs_and_deep_nesting() {
        let signs = format!("{}1", "-".repeat(50_000));
        assert_eq!(evaluate(&signs).unwrap(), 1.0);
        assert_eq!(evaluate("--+-2").unwrap(), -2.0);

        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(evaluate(&nested(MAX_DEPTH)).unwrap(), 1.0);
        assert_eq!(evaluate(&nested(MAX_DEPTH + 1)), Err(CalcError::TooDeep));
        assert_eq!(evaluate(&nested(100_000)), Err(CalcError::TooDeep));
    }

    proptest! {
        #[test]
        fn prop_integer_sum_matches(a in -10_000i64..10_000, b in -10_000i64..10_000) {
            let expr = format!("{a} + ({b})");
            prop_assert_eq!(evaluate(&expr).unwrap(), (a + b) as f64);
        }

        #[test]
        fn prop_never_panics(input in "[0-9+\\-*/%(). ]{0,24}") {
            let _ = evaluate(&input);
        }

        #[test]
        fn prop_long_inputs_never_overflow(input in "[-+(]{0,2000}1[)]{0,2000}") {
            let _ = evaluate(&input);
        }
    }
}

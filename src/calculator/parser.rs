//! Tokenizer and recursive-descent parser for arithmetic expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr   := term (("+" | "-") term)*
//! term   := factor (("*" | "/" | "//" | "%") factor)*
//! factor := ("+" | "-") factor | power
//! power  := atom ("**" factor)?
//! atom   := NUMBER | NAME "(" args? ")" | NAME | "(" expr ")"
//! ```

use super::number::Number;
use super::CalcError;

/// Deepest recursion the parser allows (parentheses, unary signs, exponents).
pub const MAX_NESTING: usize = 200;

/// Deepest syntax tree the parser builds; evaluation recurses this far.
pub const MAX_TREE_DEPTH: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Name(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Number),
    Name(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call { name: String, args: Vec<Expr> },
}

/// Parse an expression into its syntax tree.
pub fn parse(source: &str) -> Result<Expr, CalcError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    let (expr, _) = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, CalcError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let (number, end) = lex_number(&chars, i)?;
                i = end;
                number
            }
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push((start, Token::Name(chars[start..i].iter().collect())));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::DoubleStar
            }
            '*' => Token::Star,
            '/' if chars.get(i + 1) == Some(&'/') => {
                i += 1;
                Token::DoubleSlash
            }
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => {
                return Err(CalcError::Syntax(format!(
                    "invalid character '{}' at position {}",
                    other,
                    start + 1
                )))
            }
        };
        if !matches!(token, Token::Number(_)) {
            i += 1;
        }
        tokens.push((start, token));
    }

    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> Result<(Token, usize), CalcError> {
    let mut i = start;
    let mut is_float = false;

    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            is_float = true;
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let lexeme: String = chars[start..i].iter().collect();
    let invalid = || CalcError::Syntax(format!("invalid number '{}' at position {}", lexeme, start + 1));

    if lexeme == "." {
        return Err(invalid());
    }

    let number = if is_float {
        Number::Float(lexeme.parse::<f64>().map_err(|_| invalid())?)
    } else {
        if lexeme.len() > 1 && lexeme.starts_with('0') && lexeme.chars().any(|c| c != '0') {
            return Err(CalcError::Syntax(
                "leading zeros in decimal integer literals are not permitted".to_string(),
            ));
        }
        match lexeme.parse::<i64>() {
            Ok(v) => Number::Int(v),
            Err(_) => Number::Float(lexeme.parse::<f64>().map_err(|_| invalid())?),
        }
    };

    Ok((Token::Number(number), i))
}

/// A subtree together with its height.
type Parsed = (Expr, usize);

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self) -> CalcError {
        match self.tokens.get(self.pos) {
            Some((offset, _)) => CalcError::Syntax(format!("unexpected token at position {}", offset + 1)),
            None => CalcError::Syntax("unexpected end of expression".to_string()),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), CalcError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CalcError>,
    ) -> Result<T, CalcError> {
        if self.nesting >= MAX_NESTING {
            return Err(CalcError::Syntax("too many nested parentheses".to_string()));
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    fn node(expr: Expr, depth: usize) -> Result<Parsed, CalcError> {
        if depth > MAX_TREE_DEPTH {
            return Err(CalcError::Syntax("expression is too deeply nested".to_string()));
        }
        Ok((expr, depth))
    }

    fn binary(op: BinaryOp, lhs: Parsed, rhs: Parsed) -> Result<Parsed, CalcError> {
        let depth = lhs.1.max(rhs.1) + 1;
        Self::node(Expr::Binary(op, Box::new(lhs.0), Box::new(rhs.0)), depth)
    }

    fn expr(&mut self) -> Result<Parsed, CalcError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Self::binary(op, lhs, rhs)?;
        }
    }

    fn term(&mut self) -> Result<Parsed, CalcError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::DoubleSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Self::binary(op, lhs, rhs)?;
        }
    }

    fn factor(&mut self) -> Result<Parsed, CalcError> {
        let op = match self.peek() {
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.power(),
        };
        self.pos += 1;
        let (operand, depth) = self.nested(Self::factor)?;
        Self::node(Expr::Unary(op, Box::new(operand)), depth + 1)
    }

    fn power(&mut self) -> Result<Parsed, CalcError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.pos += 1;
            // Right-associative: the exponent is a full factor.
            let exponent = self.nested(Self::factor)?;
            return Self::binary(BinaryOp::Pow, base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Parsed, CalcError> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok((Expr::Number(n), 1))
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.nested(Self::arguments)?;
                    let depth = args.iter().map(|(_, d)| *d).max().unwrap_or(0) + 1;
                    let args = args.into_iter().map(|(arg, _)| arg).collect();
                    Self::node(Expr::Call { name, args }, depth)
                } else {
                    Ok((Expr::Name(name), 1))
                }
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.nested(Self::expr)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Comma-separated call arguments; the opening paren is consumed.
    fn arguments(&mut self) -> Result<Vec<Parsed>, CalcError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.next() {
                Some(Token::Comma) if self.peek() == Some(&Token::RParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.unexpected());
                }
                None => return Err(self.unexpected()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(i: i64) -> Box<Expr> {
        Box::new(Expr::Number(Number::Int(i)))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                num(1),
                Box::new(Expr::Binary(BinaryOp::Mul, num(2), num(3)))
            )
        );
    }

    #[test]
    fn test_power_binds_tighter_than_unary_minus() {
        let expr = parse("-2**2").unwrap();
        assert_eq!(
            expr,
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Binary(BinaryOp::Pow, num(2), num(2)))
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse("2 ** 3 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Pow,
                num(2),
                Box::new(Expr::Binary(BinaryOp::Pow, num(3), num(2)))
            )
        );
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(parse(".5").unwrap(), Expr::Number(Number::Float(0.5)));
        assert_eq!(parse("5.").unwrap(), Expr::Number(Number::Float(5.0)));
        assert_eq!(parse("2.5E-2").unwrap(), Expr::Number(Number::Float(0.025)));
        assert_eq!(parse("1e3").unwrap(), Expr::Number(Number::Float(1000.0)));
        assert_eq!(parse("0").unwrap(), Expr::Number(Number::Int(0)));
    }

    #[test]
    fn test_call_arguments() {
        let expr = parse("log(8, 2)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                name: "log".to_string(),
                args: vec![Expr::Number(Number::Int(8)), Expr::Number(Number::Int(2))],
            }
        );
        assert!(matches!(parse("sqrt()").unwrap(), Expr::Call { args, .. } if args.is_empty()));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse(""), Err(CalcError::Empty)));
        assert!(matches!(parse("   "), Err(CalcError::Empty)));
        assert!(matches!(parse("1 +"), Err(CalcError::Syntax(_))));
        assert!(matches!(parse("(1 + 2"), Err(CalcError::Syntax(_))));
        assert!(matches!(parse("1 2"), Err(CalcError::Syntax(_))));
        assert!(matches!(parse("2 ^ 3"), Err(CalcError::Syntax(_))));
        assert!(matches!(parse("007"), Err(CalcError::Syntax(_))));
        assert!(matches!(parse("."), Err(CalcError::Syntax(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(parse(&deep), Err(CalcError::Syntax(msg)) if msg == "too many nested parentheses"));

        let signs = format!("{}1", "-".repeat(10_000));
        assert!(matches!(parse(&signs), Err(CalcError::Syntax(_))));

        let powers = vec!["2"; 10_000].join(" ** ");
        assert!(matches!(parse(&powers), Err(CalcError::Syntax(_))));

        let ok = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse(&ok).unwrap(), Expr::Number(Number::Int(1)));
    }

    #[test]
    fn test_long_operator_chain_limit() {
        let chain = vec!["1"; 100_000].join(" + ");
        assert!(matches!(parse(&chain), Err(CalcError::Syntax(msg)) if msg == "expression is too deeply nested"));

        let short = vec!["1"; 500].join(" + ");
        assert!(parse(&short).is_ok());
    }
}

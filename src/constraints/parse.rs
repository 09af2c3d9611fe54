//! Parser for textual constraints.
//!
//! ```text
//! expr   := or
//! or     := xor  (("or"  | "||") xor)*
//! xor    := and  (("xor" | "^")  and)*
//! and    := not  (("and" | "&&") not)*
//! not    := ("not" | "!") not | atom
//! atom   := "true" | "false" | "(" expr ")" | chain
//! chain  := arith (cmp arith)+ | arith "in" "[" range "]"
//! arith  := term (("+" | "-") term)*
//! term   := unary ("*" unary)*
//! unary  := "-" unary | INT | VAR | "(" arith ")"
//! ```
//!
//! Chained comparisons (`0 <= w <= 3`) expand to a conjunction.

use super::expr::{Arith, CmpOp, Expr};
use super::var::Var;
use crate::error::ConstraintError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Int(i64),
    Ident(String),
    Range(String),
    Op(&'static str),
}

const OPS: &[&str] = &["<=", ">=", "==", "!=", "&&", "||", "<", ">", "=", "!", "+", "-", "*", "(", ")", "^"];

fn tokenize(input: &str) -> Result<Vec<Tok>, ConstraintError> {
    let re = crate::regex!(r"^\s*(?:(?P<int>\d+)|(?P<ident>[A-Za-z_][A-Za-z0-9_]*)|\[(?P<range>[^\]]*)\]|(?P<op>\S))");
    let mut tokens = Vec::new();
    let mut rest = input;
    while !rest.trim_start().is_empty() {
        let caps = re.captures(rest).ok_or_else(|| parse_error(input, "unexpected input"))?;
        let whole = caps.get(0).map_or(0, |m| m.end());
        if let Some(m) = caps.name("int") {
            let value = m.as_str().parse().map_err(|_| parse_error(input, "integer overflow"))?;
            tokens.push(Tok::Int(value));
            rest = &rest[whole..];
        } else if let Some(m) = caps.name("ident") {
            tokens.push(Tok::Ident(m.as_str().to_string()));
            rest = &rest[whole..];
        } else if let Some(m) = caps.name("range") {
            tokens.push(Tok::Range(m.as_str().to_string()));
            rest = &rest[whole..];
        } else {
            let tail = &rest[caps.name("op").map_or(whole, |m| m.start())..];
            let op = OPS
                .iter()
                .find(|op| tail.starts_with(**op))
                .ok_or_else(|| parse_error(input, &format!("unexpected character in '{tail}'")))?;
            tokens.push(Tok::Op(op));
            rest = &tail[op.len()..];
        }
    }
    Ok(tokens)
}

fn parse_error(input: &str, reason: &str) -> ConstraintError {
    ConstraintError::Parse { input: input.to_string(), reason: reason.to_string() }
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Tok>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn peek_is_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Tok::Op(o)) if *o == op)
    }

    fn peek_is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(w)) if w == word)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let hit = self.peek_is_op(op);
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn eat_word(&mut self, word: &str) -> bool {
        let hit = self.peek_is_word(word);
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn error(&self, reason: &str) -> ConstraintError {
        parse_error(self.input, reason)
    }

    fn expr(&mut self) -> Result<Expr, ConstraintError> {
        let mut items = vec![self.xor()?];
        while self.eat_word("or") || self.eat_op("||") {
            items.push(self.xor()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Expr::Or(items) })
    }

    fn xor(&mut self) -> Result<Expr, ConstraintError> {
        let mut lhs = self.and()?;
        while self.eat_word("xor") || self.eat_op("^") {
            let rhs = self.and()?;
            lhs = Expr::Xor(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ConstraintError> {
        let mut items = vec![self.not()?];
        while self.eat_word("and") || self.eat_op("&&") {
            items.push(self.not()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Expr::And(items) })
    }

    fn not(&mut self) -> Result<Expr, ConstraintError> {
        if self.eat_word("not") || self.eat_op("!") {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, ConstraintError> {
        if self.eat_word("true") {
            return Ok(Expr::Const(true));
        }
        if self.eat_word("false") {
            return Ok(Expr::Const(false));
        }
        if self.peek_is_op("(") {
            // Either a parenthesised boolean or the start of an arithmetic operand.
            let save = self.pos;
            self.pos += 1;
            if let Ok(inner) = self.expr() {
                if self.eat_op(")") && !self.at_arith_continuation() {
                    return Ok(inner);
                }
            }
            self.pos = save;
        }
        self.chain()
    }

    fn at_arith_continuation(&self) -> bool {
        matches!(
            self.peek(),
            Some(Tok::Op("<" | "<=" | "==" | "=" | "!=" | ">=" | ">" | "+" | "-" | "*"))
        ) || self.peek_is_word("in")
    }

    fn chain(&mut self) -> Result<Expr, ConstraintError> {
        let first = self.arith()?;
        if self.eat_word("in") {
            let Some(Tok::Range(text)) = self.peek().cloned() else {
                return Err(self.error("expected [range] after 'in'"));
            };
            self.pos += 1;
            let range = text.parse().map_err(ConstraintError::Range)?;
            return Ok(Expr::within(first, range));
        }

        let mut comparisons = Vec::new();
        let mut lhs = first;
        while let Some(op) = self.cmp_op() {
            let rhs = self.arith()?;
            comparisons.push(Expr::cmp(lhs, op, rhs.clone()));
            lhs = rhs;
        }
        match comparisons.len() {
            0 => Err(self.error("expected a comparison")),
            1 => Ok(comparisons.remove(0)),
            _ => Ok(Expr::And(comparisons)),
        }
    }

    fn cmp_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek() {
            Some(Tok::Op("<")) => CmpOp::Lt,
            Some(Tok::Op("<=")) => CmpOp::Le,
            Some(Tok::Op("==" | "=")) => CmpOp::Eq,
            Some(Tok::Op("!=")) => CmpOp::Ne,
            Some(Tok::Op(">=")) => CmpOp::Ge,
            Some(Tok::Op(">")) => CmpOp::Gt,
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn arith(&mut self) -> Result<Arith, ConstraintError> {
        let mut lhs = self.term()?;
        loop {
            if self.eat_op("+") {
                lhs = Arith::Add(Box::new(lhs), Box::new(self.term()?));
            } else if self.eat_op("-") {
                lhs = Arith::Sub(Box::new(lhs), Box::new(self.term()?));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> Result<Arith, ConstraintError> {
        let mut lhs = self.unary()?;
        while self.eat_op("*") {
            lhs = Arith::Mul(Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Arith, ConstraintError> {
        if self.eat_op("-") {
            return Ok(Arith::Neg(Box::new(self.unary()?)));
        }
        if self.eat_op("(") {
            let inner = self.arith()?;
            if !self.eat_op(")") {
                return Err(self.error("expected ')'"));
            }
            return Ok(inner);
        }
        match self.peek().cloned() {
            Some(Tok::Int(v)) => {
                self.pos += 1;
                Ok(Arith::Const(v))
            }
            Some(Tok::Ident(name)) => {
                self.pos += 1;
                Ok(Arith::Var(name.parse::<Var>()?))
            }
            _ => Err(self.error("expected a number or a variable")),
        }
    }
}

/// Parse a textual constraint into an [`Expr`].
pub fn parse_expr(input: &str) -> Result<Expr, ConstraintError> {
    let mut parser = Parser { input, tokens: tokenize(input)?, pos: 0 };
    let expr = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("trailing input"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::expr::ExprEvaluator;
    use crate::constraints::var::VarValues;

    fn values(pairs: &[(&str, i64)]) -> VarValues {
        pairs.iter().map(|(name, v)| (name.parse::<Var>().unwrap(), *v)).collect()
    }

    #[test]
    fn parses_comparisons_and_logic() {
        let e = parse_expr("letters_bottom <= field_top and (w >= 2 or h == 1)").unwrap();
        let v = values(&[("letters_bottom", 1), ("field_top", 1), ("w", 1), ("h", 1)]);
        assert_eq!(e.eval(&v), Ok(true));
        let v = values(&[("letters_bottom", 2), ("field_top", 1), ("w", 1), ("h", 1)]);
        assert_eq!(e.eval(&v), Ok(false));
    }

    #[test]
    fn parenthesised_arithmetic_is_not_mistaken_for_logic() {
        let e = parse_expr("(right - left) * 2 = 4").unwrap();
        assert_eq!(e.eval(&values(&[("right", 5), ("left", 3)])), Ok(true));
    }

    #[test]
    fn chained_comparison_and_ranges() {
        let e = parse_expr("0 <= _left - left <= 2").unwrap();
        assert_eq!(e.eval(&values(&[("_left", 3), ("left", 1)])), Ok(true));
        assert_eq!(e.eval(&values(&[("_left", 4), ("left", 1)])), Ok(false));

        let e = parse_expr("not w in [2..4] xor false").unwrap();
        assert_eq!(e.eval(&values(&[("w", 5)])), Ok(true));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_expr("left <=").is_err());
        assert!(parse_expr("left < 3 3").is_err());
        assert!(parse_expr("depth > 1").is_err());
        assert!(parse_expr("w in [5..1]").is_err());
    }
}

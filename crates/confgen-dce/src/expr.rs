//! Guard-expression algebra.
//!
//! Guard expressions are parsed into a small syntax tree, partially
//! evaluated against the resolved option store, constant-folded with the
//! standard boolean identities, and re-printed with minimal parentheses.
//! Precedence, tightest first: `!`, `==`/`!=`, `&&`, `||`.

use confgen_common::is_name_char;

/// A parsed guard expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Lit(bool),
    Atom(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom(String),
    Not,
    And,
    Or,
    Eq,
    Ne,
    Open,
    Close,
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            b')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            // Guards sourced from partially simplified text may carry the
            // collapsed single-character operator forms.
            b'&' => {
                tokens.push(Token::And);
                i += if bytes.get(i + 1) == Some(&b'&') { 2 } else { 1 };
            }
            b'|' => {
                tokens.push(Token::Or);
                i += if bytes.get(i + 1) == Some(&b'|') { 2 } else { 1 };
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    return None;
                }
            }
            b if is_name_char(b) => {
                let start = i;
                while i < bytes.len() && is_name_char(bytes[i]) {
                    i += 1;
                }
                tokens.push(Token::Atom(text[start..i].to_string()));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    at: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.at)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.at).cloned();
        self.at += 1;
        token
    }

    fn or_expr(&mut self) -> Option<Expr> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Some(left)
    }

    fn and_expr(&mut self) -> Option<Expr> {
        let mut left = self.cmp_expr()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            let right = self.cmp_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Some(left)
    }

    fn cmp_expr(&mut self) -> Option<Expr> {
        let mut left = self.unary_expr()?;
        loop {
            match self.peek() {
                Some(Token::Eq) => {
                    self.bump();
                    let right = self.unary_expr()?;
                    left = Expr::Eq(Box::new(left), Box::new(right));
                }
                Some(Token::Ne) => {
                    self.bump();
                    let right = self.unary_expr()?;
                    left = Expr::Ne(Box::new(left), Box::new(right));
                }
                _ => return Some(left),
            }
        }
    }

    fn unary_expr(&mut self) -> Option<Expr> {
        match self.peek() {
            Some(Token::Not) => {
                self.bump();
                Some(Expr::Not(Box::new(self.unary_expr()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Option<Expr> {
        match self.bump()? {
            Token::Open => {
                let inner = self.or_expr()?;
                if self.bump()? != Token::Close {
                    return None;
                }
                Some(inner)
            }
            Token::Atom(name) => Some(match name.as_str() {
                "0" => Expr::Lit(false),
                "1" => Expr::Lit(true),
                _ => Expr::Atom(name),
            }),
            _ => None,
        }
    }
}

/// Parse guard text. Returns `None` for malformed expressions so callers
/// can keep the original text untouched.
pub fn parse_expr(text: &str) -> Option<Expr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return None;
    }
    let mut parser = Parser { tokens, at: 0 };
    let expr = parser.or_expr()?;
    if parser.at != parser.tokens.len() {
        return None;
    }
    Some(expr)
}

impl Expr {
    /// Substitute every atom the lookup can decide with its literal value.
    fn substitute(self, lookup: &dyn Fn(&str) -> Option<bool>) -> Expr {
        match self {
            Expr::Atom(name) => match lookup(&name) {
                Some(value) => Expr::Lit(value),
                None => Expr::Atom(name),
            },
            Expr::Not(inner) => Expr::Not(Box::new(inner.substitute(lookup))),
            Expr::And(l, r) => {
                Expr::And(Box::new(l.substitute(lookup)), Box::new(r.substitute(lookup)))
            }
            Expr::Or(l, r) => {
                Expr::Or(Box::new(l.substitute(lookup)), Box::new(r.substitute(lookup)))
            }
            Expr::Eq(l, r) => {
                Expr::Eq(Box::new(l.substitute(lookup)), Box::new(r.substitute(lookup)))
            }
            Expr::Ne(l, r) => {
                Expr::Ne(Box::new(l.substitute(lookup)), Box::new(r.substitute(lookup)))
            }
            other => other,
        }
    }

    /// Bottom-up constant folding with the standard identities.
    fn fold(self) -> Expr {
        match self {
            Expr::Not(inner) => match inner.fold() {
                Expr::Lit(value) => Expr::Lit(!value),
                folded => Expr::Not(Box::new(folded)),
            },
            Expr::And(l, r) => match (l.fold(), r.fold()) {
                (Expr::Lit(false), _) | (_, Expr::Lit(false)) => Expr::Lit(false),
                (Expr::Lit(true), x) | (x, Expr::Lit(true)) => x,
                (l, r) => Expr::And(Box::new(l), Box::new(r)),
            },
            Expr::Or(l, r) => match (l.fold(), r.fold()) {
                (Expr::Lit(true), _) | (_, Expr::Lit(true)) => Expr::Lit(true),
                (Expr::Lit(false), x) | (x, Expr::Lit(false)) => x,
                (l, r) => Expr::Or(Box::new(l), Box::new(r)),
            },
            Expr::Eq(l, r) => match (l.fold(), r.fold()) {
                (Expr::Lit(a), Expr::Lit(b)) => Expr::Lit(a == b),
                (l, r) => Expr::Eq(Box::new(l), Box::new(r)),
            },
            Expr::Ne(l, r) => match (l.fold(), r.fold()) {
                (Expr::Lit(a), Expr::Lit(b)) => Expr::Lit(a != b),
                (l, r) => Expr::Ne(Box::new(l), Box::new(r)),
            },
            other => other,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Or(..) => 1,
            Expr::And(..) => 2,
            Expr::Eq(..) | Expr::Ne(..) => 3,
            Expr::Not(..) => 4,
            Expr::Lit(_) | Expr::Atom(_) => 5,
        }
    }

    fn print_into(&self, parent: u8, out: &mut String) {
        let prec = self.precedence();
        let wrap = prec < parent;
        if wrap {
            out.push('(');
        }
        match self {
            Expr::Lit(value) => out.push(if *value { '1' } else { '0' }),
            Expr::Atom(name) => out.push_str(name),
            Expr::Not(inner) => {
                out.push('!');
                inner.print_into(4, out);
            }
            Expr::And(l, r) => {
                l.print_into(prec, out);
                out.push_str(" && ");
                r.print_into(prec + 1, out);
            }
            Expr::Or(l, r) => {
                l.print_into(prec, out);
                out.push_str(" || ");
                r.print_into(prec + 1, out);
            }
            Expr::Eq(l, r) => {
                l.print_into(prec, out);
                out.push_str("==");
                r.print_into(prec + 1, out);
            }
            Expr::Ne(l, r) => {
                l.print_into(prec, out);
                out.push_str("!=");
                r.print_into(prec + 1, out);
            }
        }
        if wrap {
            out.push(')');
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        self.print_into(0, &mut out);
        f.write_str(&out)
    }
}

/// Partially evaluate guard text against the option lookup, fold, and
/// re-print. Malformed guards are returned unchanged.
pub fn resolve_define(guard: &str, lookup: impl Fn(&str) -> Option<bool>) -> String {
    match parse_expr(guard) {
        Some(expr) => expr.substitute(&lookup).fold().to_string(),
        None => guard.to_string(),
    }
}

/// OR-combine two guards governing the same symbol. Equal guards collapse;
/// a guard textually contained in the other is the looser condition and
/// wins; anything else is joined with `||`.
pub fn combine_defines(existing: &str, new: &str) -> String {
    if existing == new {
        return existing.to_string();
    }
    // An empty guard means unguarded, which subsumes everything.
    if existing.is_empty() || new.is_empty() {
        return String::new();
    }
    if new.contains(existing) {
        return existing.to_string();
    }
    if existing.contains(new) {
        return new.to_string();
    }
    let wrap = |guard: &str| {
        if guard.contains('&') {
            format!("({})", guard)
        } else {
            guard.to_string()
        }
    };
    format!("{}||{}", wrap(existing), wrap(new))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_: &str) -> Option<bool> {
        None
    }

    #[test]
    fn literal_folding() {
        assert_eq!(resolve_define("!1", none), "0");
        assert_eq!(resolve_define("!0", none), "1");
        assert_eq!(resolve_define("1 && 0", none), "0");
        assert_eq!(resolve_define("1==1", none), "1");
        assert_eq!(resolve_define("1!=1", none), "0");
        assert_eq!(resolve_define("0==1", none), "0");
    }

    #[test]
    fn identities_leave_residuals() {
        assert_eq!(resolve_define("HAVE_X && 1", none), "HAVE_X");
        assert_eq!(resolve_define("1 && HAVE_X", none), "HAVE_X");
        assert_eq!(resolve_define("0 || HAVE_Y", none), "HAVE_Y");
        assert_eq!(resolve_define("HAVE_Y || 0", none), "HAVE_Y");
        assert_eq!(resolve_define("0 && HAVE_X", none), "0");
        assert_eq!(resolve_define("1 || HAVE_X", none), "1");
    }

    #[test]
    fn atoms_substitute_through_lookup() {
        let lookup = |name: &str| match name {
            "CONFIG_A" => Some(true),
            "CONFIG_B" => Some(false),
            _ => None,
        };
        assert_eq!(resolve_define("CONFIG_A && CONFIG_B", lookup), "0");
        assert_eq!(resolve_define("CONFIG_A && HAVE_X", lookup), "HAVE_X");
        assert_eq!(resolve_define("CONFIG_B || !CONFIG_B", lookup), "1");
    }

    #[test]
    fn redundant_parens_are_stripped() {
        assert_eq!(resolve_define("(HAVE_X)", none), "HAVE_X");
        assert_eq!(resolve_define("((HAVE_X))", none), "HAVE_X");
        assert_eq!(resolve_define("(HAVE_X && HAVE_Y)", none), "HAVE_X && HAVE_Y");
    }

    #[test]
    fn printing_preserves_precedence() {
        assert_eq!(
            resolve_define("(HAVE_X || HAVE_Y) && HAVE_Z", none),
            "(HAVE_X || HAVE_Y) && HAVE_Z"
        );
        assert_eq!(
            resolve_define("HAVE_X || HAVE_Y && HAVE_Z", none),
            "HAVE_X || HAVE_Y && HAVE_Z"
        );
        assert_eq!(resolve_define("!(HAVE_X && HAVE_Y)", none), "!(HAVE_X && HAVE_Y)");
    }

    #[test]
    fn collapsed_operator_forms_parse() {
        assert_eq!(resolve_define("HAVE_X&1", none), "HAVE_X");
        assert_eq!(resolve_define("0|HAVE_Y", none), "HAVE_Y");
    }

    #[test]
    fn malformed_guards_pass_through() {
        assert_eq!(resolve_define("HAVE_X &&", none), "HAVE_X &&");
        assert_eq!(resolve_define("", none), "");
    }

    #[test]
    fn combine_keeps_the_weaker_guard() {
        assert_eq!(combine_defines("A", "A&&B"), "A");
        assert_eq!(combine_defines("A&&B", "A"), "A");
        assert_eq!(combine_defines("A", "A"), "A");
        assert_eq!(combine_defines("A", ""), "");
        assert_eq!(combine_defines("A", "B"), "A||B");
        assert_eq!(combine_defines("A&&B", "C"), "(A&&B)||C");
    }
}

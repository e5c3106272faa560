//! Pratt parser.
//!
//! A program is a sequence of expressions separated by `;`, wrapped in a
//! block that does not introduce a scope. Expression parsing is driven by a
//! precedence table plus prefix/infix dispatch; structural errors are
//! recorded in the diagnostic collector and unwind the parse with a
//! `"parse error"` exception completion.

use crate::ast::{
    AddExpr, AndExpr, ArgExpr, AsExpr, AssertExpr, BlockExpr, BreakExpr, CallExpr, ContinueExpr,
    DeclExpr, DivExpr, EqExpr, FuncExpr, GetExpr, GtEqExpr, GtExpr, IfExpr, IsExpr, ListExpr,
    LtEqExpr, LtExpr, ModExpr, MulExpr, NEqExpr, NegExpr, NotExpr, OrExpr, ParamExpr, QuoteExpr,
    ReturnExpr, SetEnvExpr, SetExpr, SubExpr, TableExpr, ThrowExpr, TryExpr, TypeOfExpr,
    WhileExpr,
};
use crate::diag::{DiagCollector, Diagnostic, Span};
use crate::interner::Symbol;
use crate::scanner;
use crate::token::{Token, TokenKind};
use crate::value::{Eval, Value};

/// Operator precedence, lowest binds loosest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,
    Assign,
    Or,
    And,
    Equality,
    Type,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
}

/// Parses `code` into an expression tree rooted in an unscoped block.
pub fn parse(code: &str, diag: &mut DiagCollector) -> Eval<Value> {
    let tokens = scanner::lex(code, diag)?;
    Parser {
        tokens,
        pos: 0,
        diag,
    }
    .parse_top_level()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    diag: &'a mut DiagCollector,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Consumes and returns the current token. The end-of-file token is
    /// sticky.
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn skip(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_top_level(mut self) -> Eval<Value> {
        let mut exprs = Vec::new();
        loop {
            if self.skip(TokenKind::Eof) {
                break;
            }
            exprs.push(self.parse_expr(Prec::Lowest)?);
            if !self.skip(TokenKind::Semicolon) && self.check(&TokenKind::Eof) {
                break;
            }
        }
        Ok(BlockExpr::unscoped(exprs))
    }

    fn parse_expr(&mut self, min_prec: Prec) -> Eval<Value> {
        let mut lhs_span = self.peek().span;
        let mut lhs = self.parse_prefix()?;

        // Stretch the span over the whole prefix expression.
        lhs_span.end = self.peek().span.start;

        while self.peek_prec() > min_prec {
            lhs = self.parse_infix(lhs, lhs_span)?;
        }
        Ok(lhs)
    }

    // MARK: Prefix forms

    fn parse_prefix(&mut self) -> Eval<Value> {
        match self.peek().kind.clone() {
            TokenKind::LeftParen => self.parse_paren(),

            TokenKind::LeftCurly => {
                if self.is_table_head() {
                    self.parse_table()
                } else {
                    self.parse_block()
                }
            }

            TokenKind::LeftBracket => self.parse_list(),

            TokenKind::Not => {
                self.advance();
                Ok(NotExpr::new(self.parse_expr(Prec::Unary)?))
            }
            TokenKind::Minus => {
                self.advance();
                Ok(NegExpr::new(self.parse_expr(Prec::Unary)?))
            }
            TokenKind::Hash => {
                self.advance();
                Ok(QuoteExpr::new(self.parse_expr(Prec::Unary)?))
            }

            TokenKind::Identifier(_) => Ok(Value::Symbol(self.parse_ident()?)),

            TokenKind::Var => self.parse_var(),

            TokenKind::Return => {
                self.advance();
                if self.check(&TokenKind::Semicolon) {
                    return Ok(ReturnExpr::new(Value::None));
                }
                Ok(ReturnExpr::new(self.parse_expr(Prec::Lowest)?))
            }
            TokenKind::Continue => {
                self.advance();
                if self.check(&TokenKind::Semicolon) {
                    return Ok(ContinueExpr::new(Value::None));
                }
                Ok(ContinueExpr::new(self.parse_expr(Prec::Lowest)?))
            }
            TokenKind::Break => {
                self.advance();
                if self.check(&TokenKind::Semicolon) {
                    return Ok(BreakExpr::new(Value::None));
                }
                Ok(BreakExpr::new(self.parse_expr(Prec::Lowest)?))
            }
            TokenKind::Throw => {
                self.advance();
                if self.check(&TokenKind::Semicolon) {
                    return Ok(ThrowExpr::new(Value::None));
                }
                Ok(ThrowExpr::new(self.parse_expr(Prec::Lowest)?))
            }

            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Assert => self.parse_assert(),
            TokenKind::Fn => self.parse_func(),

            TokenKind::Typeof => {
                self.advance();
                Ok(TypeOfExpr::new(self.parse_expr(Prec::Unary)?))
            }

            _ => self.parse_value(),
        }
    }

    fn parse_ident(&mut self) -> Eval<Symbol> {
        let kind = self.peek().kind.clone();
        if let TokenKind::Identifier(sym) = kind {
            self.advance();
            return Ok(sym);
        }
        let got = self.peek().clone();
        Err(self.diag.expected("identifier", &got))
    }

    fn parse_value(&mut self) -> Eval<Value> {
        match self.peek().kind.clone() {
            TokenKind::None => {
                self.advance();
                Ok(Value::None)
            }
            TokenKind::True => {
                self.advance();
                Ok(Value::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Value::Boolean(false))
            }
            TokenKind::Integer(i) => {
                self.advance();
                Ok(Value::Integer(i))
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(Value::Number(n))
            }
            TokenKind::StrOpen => {
                self.advance();
                let text = match self.peek().kind.clone() {
                    TokenKind::StrSpan(text) => {
                        self.advance();
                        text
                    }
                    _ => {
                        let got = self.peek().clone();
                        return Err(self.diag.expected("string content", &got));
                    }
                };

                // The scanner either closes the string or fails with E0001,
                // so this arm guards against a changed token stream only.
                if !self.skip(TokenKind::StrClose) {
                    let span = self.peek().span;
                    return Err(self.diag.fatal(
                        Diagnostic::error("E0102", "unterminated string literal")
                            .with_primary_label(span, "expected closing '\"'")
                            .with_help("add a closing '\"' to terminate the string"),
                    ));
                }

                Ok(Value::String(text))
            }
            _ => {
                let got = self.peek().clone();
                Err(self.diag.expected("value", &got))
            }
        }
    }

    fn parse_ident_or_value(&mut self) -> Eval<Value> {
        if matches!(self.peek().kind, TokenKind::Identifier(_)) {
            return Ok(Value::Symbol(self.parse_ident()?));
        }
        self.parse_value()
    }

    fn parse_var(&mut self) -> Eval<Value> {
        let var_token = self.advance();

        let ident = self.parse_ident()?;

        if !self.skip(TokenKind::Equal) {
            let span = self.peek().span;
            return Err(self.diag.fatal(
                Diagnostic::error("E0103", "expected '=' in variable declaration")
                    .with_primary_label(span, "expected '=' here")
                    .with_secondary_label(var_token.span, "variable declared here")
                    .with_help("add '=' followed by an initial value"),
            ));
        }
        let expr = self.parse_expr(Prec::Lowest)?;

        Ok(DeclExpr::new(Value::Symbol(ident), expr))
    }

    fn parse_if(&mut self) -> Eval<Value> {
        self.advance();

        let cond = self.parse_expr(Prec::Lowest)?;

        let then = self.parse_expr(Prec::Lowest)?;
        if self.skip(TokenKind::Else) {
            let els = self.parse_expr(Prec::Lowest)?;
            return Ok(IfExpr::new(cond, then, els));
        }

        Ok(IfExpr::new(cond, then, Value::None))
    }

    fn parse_while(&mut self) -> Eval<Value> {
        self.advance();

        let cond = self.parse_expr(Prec::Lowest)?;
        let body = self.parse_expr(Prec::Lowest)?;

        Ok(WhileExpr::new(cond, body))
    }

    fn parse_try(&mut self) -> Eval<Value> {
        let try_token = self.advance();

        let try_arm = self.parse_expr(Prec::Lowest)?;

        if !self.skip(TokenKind::Catch) {
            let span = self.peek().span;
            return Err(self.diag.fatal(
                Diagnostic::error("E0104", "expected 'catch' after try block")
                    .with_primary_label(span, "expected 'catch' here")
                    .with_secondary_label(try_token.span, "try block started here")
                    .with_help("add a catch block: catch(e) { ... }"),
            ));
        }
        if !self.skip(TokenKind::LeftParen) {
            let got = self.peek().clone();
            return Err(self.diag.expected("'('", &got));
        }
        let ident = self.parse_ident()?;

        if !self.skip(TokenKind::RightParen) {
            let got = self.peek().clone();
            return Err(self.diag.expected("')'", &got));
        }
        let catch_arm = self.parse_expr(Prec::Lowest)?;

        Ok(TryExpr::new(try_arm, Value::Symbol(ident), catch_arm))
    }

    fn parse_assert(&mut self) -> Eval<Value> {
        self.advance();
        let expr = self.parse_expr(Prec::Lowest)?;
        Ok(AssertExpr::new(expr))
    }

    fn parse_func(&mut self) -> Eval<Value> {
        let fn_token = self.advance();

        if !self.skip(TokenKind::LeftParen) {
            let span = self.peek().span;
            return Err(self.diag.fatal(
                Diagnostic::error("E0105", "expected '(' after 'fn'")
                    .with_primary_label(span, "expected '(' here")
                    .with_secondary_label(fn_token.span, "function keyword here")
                    .with_help("function syntax: fn(param1, param2) { body }"),
            ));
        }

        let mut sig = Vec::new();
        if !self.skip(TokenKind::RightParen) {
            loop {
                let key = self.parse_ident()?;

                let mut value = None;
                if self.skip(TokenKind::Colon) {
                    value = Some(self.parse_expr(Prec::Lowest)?);
                }

                sig.push(ParamExpr { key, value });

                if !self.skip(TokenKind::Comma) {
                    break;
                }
            }

            if !self.skip(TokenKind::RightParen) {
                let got = self.peek().clone();
                return Err(self.diag.expected("')'", &got));
            }
        }
        let code = self.parse_expr(Prec::Lowest)?;

        Ok(FuncExpr::new(sig, code))
    }

    fn parse_paren(&mut self) -> Eval<Value> {
        let open_paren = self.advance();
        let expr = self.parse_expr(Prec::Lowest)?;
        if !self.skip(TokenKind::RightParen) {
            let span = self.peek().span;
            return Err(self.diag.fatal(
                Diagnostic::error("E0106", "unclosed parenthesis")
                    .with_primary_label(span, "expected ')' here")
                    .with_secondary_label(open_paren.span, "opening '(' here"),
            ));
        }
        Ok(expr)
    }

    /// A `{` opens a table literal when the look-ahead matches
    /// `}` or `<ident-or-literal> :`.
    fn is_table_head(&self) -> bool {
        let kind_at = |i: usize| self.tokens.get(i).map(|t| &t.kind);

        let mut pos = self.pos + 1;
        match kind_at(pos) {
            Some(TokenKind::RightCurly) => return true,
            Some(TokenKind::Identifier(_) | TokenKind::Integer(_) | TokenKind::Number(_)) => {
                pos += 1;
            }
            Some(TokenKind::StrOpen) => {
                pos += 1;
                if matches!(kind_at(pos), Some(TokenKind::StrSpan(_))) {
                    pos += 1;
                }
                if matches!(kind_at(pos), Some(TokenKind::StrClose)) {
                    pos += 1;
                }
            }
            _ => return false,
        }
        matches!(kind_at(pos), Some(TokenKind::Colon))
    }

    fn parse_table(&mut self) -> Eval<Value> {
        let open_brace = self.advance();

        if self.skip(TokenKind::RightCurly) {
            return Ok(TableExpr::new(Vec::new()));
        }

        let mut entries = Vec::new();
        loop {
            let key = self.parse_ident_or_value()?;
            if !self.skip(TokenKind::Colon) {
                let span = self.peek().span;
                return Err(self.diag.fatal(
                    Diagnostic::error("E0107", "expected ':' in table entry")
                        .with_primary_label(span, "expected ':' here")
                        .with_help("table syntax: { key: value, ... }"),
                ));
            }
            let value = self.parse_expr(Prec::Lowest)?;
            entries.push((key, value));

            if !self.skip(TokenKind::Comma) {
                break;
            }
        }

        if self.skip(TokenKind::RightCurly) {
            return Ok(TableExpr::new(entries));
        }

        let span = self.peek().span;
        Err(self.diag.fatal(
            Diagnostic::error("E0108", "unclosed table")
                .with_primary_label(span, "expected '}' here")
                .with_secondary_label(open_brace.span, "table started here"),
        ))
    }

    fn parse_block(&mut self) -> Eval<Value> {
        let open_brace = self.advance();

        if self.skip(TokenKind::RightCurly) {
            return Ok(BlockExpr::new(Vec::new()));
        }

        let mut exprs = Vec::new();
        loop {
            if self.check(&TokenKind::RightCurly) {
                break;
            }
            exprs.push(self.parse_expr(Prec::Lowest)?);
            if !self.skip(TokenKind::Semicolon) {
                break;
            }
        }

        if self.skip(TokenKind::RightCurly) {
            return Ok(BlockExpr::new(exprs));
        }

        let span = self.peek().span;
        Err(self.diag.fatal(
            Diagnostic::error("E0109", "unclosed block")
                .with_primary_label(span, "expected '}' or ';' here")
                .with_secondary_label(open_brace.span, "block started here")
                .with_help("separate statements with ';' and close blocks with '}'"),
        ))
    }

    fn parse_list(&mut self) -> Eval<Value> {
        let open_bracket = self.advance();

        if self.skip(TokenKind::RightBracket) {
            return Ok(ListExpr::new(Vec::new()));
        }

        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_expr(Prec::Lowest)?);
            if !self.skip(TokenKind::Comma) {
                break;
            }
        }

        if self.skip(TokenKind::RightBracket) {
            return Ok(ListExpr::new(exprs));
        }

        let span = self.peek().span;
        Err(self.diag.fatal(
            Diagnostic::error("E0110", "unclosed list")
                .with_primary_label(span, "expected ']' or ',' here")
                .with_secondary_label(open_bracket.span, "list started here"),
        ))
    }

    // MARK: Infix forms

    fn peek_prec(&self) -> Prec {
        match self.peek().kind {
            TokenKind::Equal => Prec::Assign,
            TokenKind::Or => Prec::Or,
            TokenKind::And => Prec::And,
            TokenKind::EqualEqual | TokenKind::BangEqual => Prec::Equality,
            TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => Prec::Comparison,
            TokenKind::Plus | TokenKind::Minus => Prec::Term,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Prec::Factor,
            TokenKind::LeftParen
            | TokenKind::Dot
            | TokenKind::LeftBracket
            | TokenKind::Is
            | TokenKind::As => Prec::Call,
            _ => Prec::Lowest,
        }
    }

    fn parse_infix(&mut self, lhs: Value, lhs_span: Span) -> Eval<Value> {
        let op = self.advance();
        match op.kind {
            // Assignment is right-associative: the right operand parses one
            // level below the operator's own precedence.
            TokenKind::Equal => {
                let rhs = self.parse_expr(Prec::Lowest)?;
                self.into_assign(lhs, rhs, lhs_span)
            }

            TokenKind::Or => Ok(OrExpr::new(lhs, self.parse_expr(Prec::Or)?)),
            TokenKind::And => Ok(AndExpr::new(lhs, self.parse_expr(Prec::And)?)),

            TokenKind::EqualEqual => Ok(EqExpr::new(lhs, self.parse_expr(Prec::Equality)?)),
            TokenKind::BangEqual => Ok(NEqExpr::new(lhs, self.parse_expr(Prec::Equality)?)),

            TokenKind::Less => Ok(LtExpr::new(lhs, self.parse_expr(Prec::Comparison)?)),
            TokenKind::LessEqual => Ok(LtEqExpr::new(lhs, self.parse_expr(Prec::Comparison)?)),
            TokenKind::Greater => Ok(GtExpr::new(lhs, self.parse_expr(Prec::Comparison)?)),
            TokenKind::GreaterEqual => Ok(GtEqExpr::new(lhs, self.parse_expr(Prec::Comparison)?)),

            TokenKind::Plus => Ok(AddExpr::new(lhs, self.parse_expr(Prec::Term)?)),
            TokenKind::Minus => Ok(SubExpr::new(lhs, self.parse_expr(Prec::Term)?)),
            TokenKind::Star => Ok(MulExpr::new(lhs, self.parse_expr(Prec::Factor)?)),
            TokenKind::Slash => Ok(DivExpr::new(lhs, self.parse_expr(Prec::Factor)?)),
            TokenKind::Percent => Ok(ModExpr::new(lhs, self.parse_expr(Prec::Factor)?)),

            TokenKind::Dot => Ok(GetExpr::new(
                lhs,
                QuoteExpr::new(self.parse_ident_or_value()?),
            )),
            TokenKind::LeftParen => self.parse_call(lhs, op),
            TokenKind::LeftBracket => self.parse_index(lhs, op),
            TokenKind::Is => Ok(IsExpr::new(lhs, self.parse_expr(Prec::Type)?)),
            TokenKind::As => Ok(AsExpr::new(lhs, self.parse_expr(Prec::Type)?)),

            _ => Err(self.diag.unexpected(&op, "infix position")),
        }
    }

    fn at_named_arg(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Identifier(_))
            && matches!(
                self.tokens.get(self.pos + 1).map(|t| &t.kind),
                Some(TokenKind::Colon)
            )
    }

    fn parse_call(&mut self, func: Value, open_paren: Token) -> Eval<Value> {
        let mut args = Vec::new();
        if !self.skip(TokenKind::RightParen) {
            loop {
                let mut key = None;
                if self.at_named_arg() {
                    key = Some(self.parse_ident()?);
                    self.advance(); // skip colon
                }

                let expr = self.parse_expr(Prec::Lowest)?;
                args.push(ArgExpr { key, expr });

                if !self.skip(TokenKind::Comma) {
                    break;
                }
            }

            if !self.skip(TokenKind::RightParen) {
                let span = self.peek().span;
                return Err(self.diag.fatal(
                    Diagnostic::error("E0111", "unclosed function call")
                        .with_primary_label(span, "expected ')' here")
                        .with_secondary_label(open_paren.span, "opening '(' here"),
                ));
            }
        }

        Ok(CallExpr::new(func, args))
    }

    fn parse_index(&mut self, lhs: Value, open_bracket: Token) -> Eval<Value> {
        let rhs = self.parse_expr(Prec::Lowest)?;
        if !self.skip(TokenKind::RightBracket) {
            let span = self.peek().span;
            return Err(self.diag.fatal(
                Diagnostic::error("E0112", "unclosed index expression")
                    .with_primary_label(span, "expected ']' here")
                    .with_secondary_label(open_bracket.span, "opening '[' here"),
            ));
        }
        Ok(GetExpr::new(lhs, rhs))
    }

    /// Desugars `lhs = rhs`: an identifier becomes an environment store, a
    /// member access becomes a keyed store, anything else is not assignable.
    fn into_assign(&mut self, lhs: Value, rhs: Value, lhs_span: Span) -> Eval<Value> {
        if matches!(lhs, Value::Symbol(_)) {
            return Ok(SetEnvExpr::new(QuoteExpr::new(lhs), rhs));
        }

        if let Value::Object(obj) = &lhs {
            if let Some(get) = obj.as_any().downcast_ref::<GetExpr>() {
                return Ok(SetExpr::new(get.target.clone(), get.key.clone(), rhs));
            }
        }

        Err(self.diag.fatal(
            Diagnostic::error("E0200", "expression is not assignable")
                .with_primary_label(lhs_span, "cannot assign to this expression")
                .with_note("only variables and object properties can be assigned to"),
        ))
    }
}

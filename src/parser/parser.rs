//! Recursive descent parser for Kypher
//!
//! Consumes the token stream produced by the lexer and builds the typed
//! AST directly. Errors are raised at the first syntax violation with a
//! pointer to the offending position.

use smol_str::SmolStr;

use super::lexer::{Token, TokenKind, tokenize};
use crate::base::Span;
use crate::syntax::{
    BinaryOp, Direction, Expr, MatchClause, NodeHandle, NodePattern, OrderItem, PathChain,
    PathStep, ParseError, Query, RelHandle, RelPattern, ReturnItem, ReturnList, UnaryOp,
};

/// Parse a complete Kypher query:
/// `MATCH … [WHERE …] [RETURN …] [ORDER BY …] [SKIP …] [LIMIT …]`
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    let tokens = tokenize(input);
    let mut parser = Parser::new(&tokens, input);
    let query = parser.parse_query()?;
    parser.expect_eof()?;
    Ok(query)
}

struct Parser<'a, 't> {
    tokens: &'t [Token<'a>],
    pos: usize,
    input: &'a str,
    nodes: Vec<NodePattern>,
    rels: Vec<RelPattern>,
}

impl<'a, 't> Parser<'a, 't> {
    fn new(tokens: &'t [Token<'a>], input: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            input,
            nodes: Vec::new(),
            rels: Vec::new(),
        }
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn nth(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + n)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn current_span(&self) -> Span {
        self.peek()
            .map(|t| t.span)
            .unwrap_or_else(|| Span::empty(self.input.len() as u32))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current_span())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = self
            .peek()
            .map(|t| format!("unexpected {}", t.kind.name()))
            .unwrap_or_else(|| "unexpected end of query".to_string());
        self.error(found).with_expected(expected.to_string())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'a>, ParseError> {
        if self.at(kind) {
            Ok(self.bump().unwrap_or_else(|| unreachable!()))
        } else {
            Err(self.unexpected(kind.name()))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", keyword.to_uppercase())))
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if self.pos < self.tokens.len() {
            Err(self.unexpected("end of query"))
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Query structure
    // =========================================================================

    fn parse_query(&mut self) -> Result<Query, ParseError> {
        self.expect_keyword("match")?;
        let matches = self.parse_match_clauses()?;

        let where_clause = if self.eat_keyword("where") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let (distinct, ret) = if self.eat_keyword("return") {
            let distinct = self.eat_keyword("distinct");
            (distinct, self.parse_return_list()?)
        } else {
            (false, ReturnList::Star)
        };

        let order_by = if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            self.parse_order_items()?
        } else {
            Vec::new()
        };

        let skip = if self.eat_keyword("skip") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let limit = if self.eat_keyword("limit") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Query {
            nodes: std::mem::take(&mut self.nodes),
            rels: std::mem::take(&mut self.rels),
            matches,
            where_clause,
            distinct,
            ret,
            order_by,
            skip,
            limit,
        })
    }

    fn parse_match_clauses(&mut self) -> Result<Vec<MatchClause>, ParseError> {
        let mut clauses = vec![self.parse_match_clause()?];
        while self.eat(TokenKind::Comma) {
            clauses.push(self.parse_match_clause()?);
        }
        Ok(clauses)
    }

    /// `(graph ':')? chain`
    fn parse_match_clause(&mut self) -> Result<MatchClause, ParseError> {
        let graph = if self.at(TokenKind::Ident)
            && self.nth(1).is_some_and(|t| t.kind == TokenKind::Colon)
        {
            let name = SmolStr::from(self.bump().map(|t| t.text).unwrap_or_default());
            self.expect(TokenKind::Colon)?;
            Some(name)
        } else {
            None
        };
        let chain = self.parse_chain()?;
        Ok(MatchClause { graph, chain })
    }

    /// `node ( rel node )*`
    fn parse_chain(&mut self) -> Result<PathChain, ParseError> {
        let start = self.parse_node_pattern()?;
        let mut steps = Vec::new();
        while self.at(TokenKind::Minus) || self.at(TokenKind::ArrowLeft) {
            let rel = self.parse_rel_pattern()?;
            let node = self.parse_node_pattern()?;
            steps.push(PathStep { rel, node });
        }
        Ok(PathChain { start, steps })
    }

    /// `'(' var? (':' label)* props? ')'`
    fn parse_node_pattern(&mut self) -> Result<NodeHandle, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut pattern = NodePattern::default();
        if self.at(TokenKind::Ident) || self.at(TokenKind::QuotedIdent) {
            pattern.variable = Some(self.parse_name()?);
        }
        while self.eat(TokenKind::Colon) {
            pattern.labels.push(self.parse_label()?);
        }
        if self.at(TokenKind::LBrace) {
            pattern.properties = self.parse_property_map()?;
        }
        self.expect(TokenKind::RParen)?;
        let handle = NodeHandle(self.nodes.len() as u32);
        self.nodes.push(pattern);
        Ok(handle)
    }

    /// `-[…]->`, `<-[…]-`, or `-[…]-`
    fn parse_rel_pattern(&mut self) -> Result<RelHandle, ParseError> {
        let backward = self.eat(TokenKind::ArrowLeft);
        if !backward {
            self.expect(TokenKind::Minus)?;
        }
        self.expect(TokenKind::LBracket)?;
        let mut pattern = RelPattern::default();
        if self.at(TokenKind::Ident) || self.at(TokenKind::QuotedIdent) {
            pattern.variable = Some(self.parse_name()?);
        }
        if self.eat(TokenKind::Colon) {
            pattern.labels.push(self.parse_label()?);
            while self.eat(TokenKind::Pipe) {
                pattern.labels.push(self.parse_label()?);
            }
        }
        if self.at(TokenKind::LBrace) {
            pattern.properties = self.parse_property_map()?;
        }
        self.expect(TokenKind::RBracket)?;
        pattern.direction = if backward {
            self.expect(TokenKind::Minus)?;
            Direction::Backward
        } else if self.eat(TokenKind::ArrowRight) {
            Direction::Forward
        } else {
            self.expect(TokenKind::Minus)?;
            Direction::Undirected
        };
        let handle = RelHandle(self.rels.len() as u32);
        self.rels.push(pattern);
        Ok(handle)
    }

    /// Identifier or backquoted identifier
    fn parse_name(&mut self) -> Result<SmolStr, ParseError> {
        match self.peek().map(|t| (t.kind, t.text)) {
            Some((TokenKind::Ident, text)) => {
                self.pos += 1;
                Ok(SmolStr::from(text))
            }
            Some((TokenKind::QuotedIdent, text)) => {
                self.pos += 1;
                Ok(SmolStr::from(&text[1..text.len() - 1]))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Label: symbol, backquoted identifier, or quoted string
    fn parse_label(&mut self) -> Result<SmolStr, ParseError> {
        match self.peek().map(|t| (t.kind, t.text)) {
            Some((TokenKind::Ident, text)) => {
                self.pos += 1;
                Ok(SmolStr::from(text))
            }
            Some((TokenKind::QuotedIdent, text)) => {
                self.pos += 1;
                Ok(SmolStr::from(&text[1..text.len() - 1]))
            }
            Some((TokenKind::SingleQuotedString | TokenKind::DoubleQuotedString, text)) => {
                self.pos += 1;
                Ok(SmolStr::from(unescape_string(text)))
            }
            _ => Err(self.unexpected("label")),
        }
    }

    /// `'{' key ':' expr (',' key ':' expr)* '}'`
    fn parse_property_map(&mut self) -> Result<Vec<(SmolStr, Expr)>, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut props = Vec::new();
        loop {
            let key = self.parse_name()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expr()?;
            props.push((key, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(props)
    }

    fn parse_return_list(&mut self) -> Result<ReturnList, ParseError> {
        if self.eat(TokenKind::Star) {
            return Ok(ReturnList::Star);
        }
        let mut items = vec![self.parse_return_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_return_item()?);
        }
        Ok(ReturnList::Items(items))
    }

    fn parse_return_item(&mut self) -> Result<ReturnItem, ParseError> {
        let expr = self.parse_expr()?;
        let alias = if self.eat_keyword("as") {
            Some(self.parse_name()?)
        } else {
            None
        };
        Ok(ReturnItem { expr, alias })
    }

    fn parse_order_items(&mut self) -> Result<Vec<OrderItem>, ParseError> {
        let mut items = vec![self.parse_order_item()?];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_order_item()?);
        }
        Ok(items)
    }

    fn parse_order_item(&mut self) -> Result<OrderItem, ParseError> {
        let expr = self.parse_expr()?;
        let ascending = if self.eat_keyword("desc") || self.eat_keyword("descending") {
            false
        } else {
            self.eat_keyword("asc");
            self.eat_keyword("ascending");
            true
        };
        Ok(OrderItem { expr, ascending })
    }

    // =========================================================================
    // Expressions (loosest to tightest precedence)
    // =========================================================================

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_xor_expr()?;
        while self.eat_keyword("or") {
            let right = self.parse_xor_expr()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_xor_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;
        while self.eat_keyword("xor") {
            let right = self.parse_and_expr()?;
            left = Expr::Binary {
                op: BinaryOp::Xor,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not_expr()?;
        while self.eat_keyword("and") {
            let right = self.parse_not_expr()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.eat_keyword("not") {
            let operand = self.parse_not_expr()?;
            Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            })
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Eq) => Some(BinaryOp::Eq),
                Some(TokenKind::LtGt) | Some(TokenKind::BangEq) => Some(BinaryOp::Ne),
                Some(TokenKind::Lt) => Some(BinaryOp::Lt),
                Some(TokenKind::LtEq) => Some(BinaryOp::Le),
                Some(TokenKind::Gt) => Some(BinaryOp::Gt),
                Some(TokenKind::GtEq) => Some(BinaryOp::Ge),
                _ => None,
            };
            if let Some(op) = op {
                self.pos += 1;
                let right = self.parse_additive()?;
                left = Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            } else if self.eat(TokenKind::EqTilde) {
                let pattern = self.parse_additive()?;
                left = Expr::Regex {
                    value: Box::new(left),
                    pattern: Box::new(pattern),
                };
            } else if self.at_keyword("in") {
                self.pos += 1;
                let list = self.parse_additive()?;
                left = Expr::In {
                    value: Box::new(left),
                    list: Box::new(list),
                };
            } else if self.at_keyword("is") {
                self.pos += 1;
                let negated = self.eat_keyword("not");
                self.expect_keyword("null")?;
                left = Expr::IsNull {
                    value: Box::new(left),
                    negated,
                };
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(TokenKind::Minus) {
            let operand = self.parse_unary()?;
            Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            })
        } else if self.eat(TokenKind::Plus) {
            self.parse_unary()
        } else {
            self.parse_postfix()
        }
    }

    /// Property access chains off a primary: `var.prop`
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        while self.eat(TokenKind::Dot) {
            let prop = self.parse_name()?;
            expr = match expr {
                Expr::Variable(var) => Expr::Property { var, prop },
                _ => return Err(self.error("property access requires a variable")),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(tok) = self.peek().copied() else {
            return Err(self.unexpected("expression"));
        };
        match tok.kind {
            TokenKind::Integer => {
                self.pos += 1;
                let value: i64 = tok
                    .text
                    .parse()
                    .map_err(|_| ParseError::new("integer out of range", tok.span))?;
                Ok(Expr::Integer(value))
            }
            TokenKind::Float => {
                self.pos += 1;
                let value: f64 = tok
                    .text
                    .parse()
                    .map_err(|_| ParseError::new("malformed number", tok.span))?;
                Ok(Expr::Float(value))
            }
            TokenKind::DoubleQuotedString | TokenKind::SingleQuotedString => {
                self.pos += 1;
                Ok(Expr::String(unescape_string(tok.text)))
            }
            TokenKind::Parameter => {
                self.pos += 1;
                Ok(Expr::Parameter(SmolStr::from(&tok.text[1..])))
            }
            TokenKind::LBracket => {
                self.pos += 1;
                let mut items = Vec::new();
                if !self.at(TokenKind::RBracket) {
                    items.push(self.parse_expr()?);
                    while self.eat(TokenKind::Comma) {
                        items.push(self.parse_expr()?);
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::List(items))
            }
            TokenKind::LParen => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::QuotedIdent => {
                self.pos += 1;
                Ok(Expr::Variable(SmolStr::from(
                    &tok.text[1..tok.text.len() - 1],
                )))
            }
            TokenKind::Ident => {
                if tok.is_keyword("null") {
                    self.pos += 1;
                    Ok(Expr::Null)
                } else if tok.is_keyword("true") {
                    self.pos += 1;
                    Ok(Expr::Bool(true))
                } else if tok.is_keyword("false") {
                    self.pos += 1;
                    Ok(Expr::Bool(false))
                } else if tok.is_keyword("case") {
                    self.parse_case()
                } else if self.nth(1).is_some_and(|t| t.kind == TokenKind::LParen) {
                    self.parse_call()
                } else {
                    self.pos += 1;
                    Ok(Expr::Variable(SmolStr::from(tok.text)))
                }
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `name '(' (DISTINCT)? (args | '*') ')'`
    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let function = self.parse_name()?;
        self.expect(TokenKind::LParen)?;
        let distinct = self.eat_keyword("distinct");
        let mut args = Vec::new();
        if self.eat(TokenKind::Star) {
            args.push(Expr::Variable(SmolStr::from("*")));
        } else if !self.at(TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.eat(TokenKind::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Call {
            function,
            distinct,
            args,
        })
    }

    /// `CASE (operand)? (WHEN expr THEN expr)+ (ELSE expr)? END`
    fn parse_case(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword("case")?;
        let operand = if self.at_keyword("when") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let mut branches = Vec::new();
        while self.eat_keyword("when") {
            let when = self.parse_expr()?;
            self.expect_keyword("then")?;
            let then = self.parse_expr()?;
            branches.push((when, then));
        }
        if branches.is_empty() {
            return Err(self.unexpected("'WHEN'"));
        }
        let otherwise = if self.eat_keyword("else") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect_keyword("end")?;
        Ok(Expr::Case {
            operand,
            branches,
            otherwise,
        })
    }
}

/// Strip quotes and process backslash escapes in a string token.
///
/// Escapes other than `\\ \" \' \t \n \r` are kept verbatim so regex
/// back-references like `\1` survive a single level of quoting.
fn unescape_string(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// Token stream helpers shared by the export and import scanners

use shimlink_lexer::{tokenize_lossy, Token, TokenSpan};
use std::mem::discriminant;
use std::ops::Range;

pub(crate) struct TokenStream {
    tokens: Vec<TokenSpan>,
    /// Brace depth in front of each token
    depths: Vec<usize>,
}

impl TokenStream {
    pub(crate) fn new(source: &str) -> Self {
        let tokens = tokenize_lossy(source);
        let mut depths = Vec::with_capacity(tokens.len());
        let mut depth = 0usize;

        for ts in &tokens {
            if ts.token == Token::RBrace {
                depth = depth.saturating_sub(1);
            }
            depths.push(depth);
            if ts.token == Token::LBrace {
                depth += 1;
            }
        }

        Self { tokens, depths }
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn token_at(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index).map(|ts| &ts.token)
    }

    pub(crate) fn span_at(&self, index: usize) -> Range<usize> {
        self.tokens
            .get(index)
            .map(|ts| ts.span.clone())
            .unwrap_or(0..0)
    }

    pub(crate) fn depth_at(&self, index: usize) -> usize {
        self.depths.get(index).copied().unwrap_or(0)
    }

    pub(crate) fn check_at(&self, index: usize, kind: &Token) -> bool {
        self.token_at(index)
            .is_some_and(|tok| discriminant(tok) == discriminant(kind))
    }

    pub(crate) fn name_at(&self, index: usize) -> Option<&str> {
        self.token_at(index).and_then(Token::as_name)
    }

    pub(crate) fn ident_at(&self, index: usize) -> Option<&str> {
        match self.token_at(index) {
            Some(Token::Ident(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    pub(crate) fn string_at(&self, index: usize) -> Option<&str> {
        match self.token_at(index) {
            Some(Token::StringLiteral(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// The token before `index` is a `.` (member access, not a binding)
    pub(crate) fn is_member_access(&self, index: usize) -> bool {
        index > 0 && (self.check_at(index - 1, &Token::Dot) || self.check_at(index - 1, &Token::Question))
    }

    /// First index at or after `from` holding `kind`
    pub(crate) fn find_from(&self, from: usize, kind: &Token) -> Option<usize> {
        (from..self.len()).find(|&i| self.check_at(i, kind))
    }

    /// Index of the delimiter closing the one opened at `open`
    pub(crate) fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in open..self.len() {
            match self.token_at(i)? {
                Token::LParen | Token::LBrace | Token::LBracket => depth += 1,
                Token::RParen | Token::RBrace | Token::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Index of the token ending the expression that starts at `start`:
    /// a `,` or `;` at the same nesting level, a closer of the enclosing
    /// group, or the next declaration keyword.
    pub(crate) fn skip_expression(&self, start: usize) -> usize {
        let mut depth = 0usize;
        let mut i = start;

        while let Some(tok) = self.token_at(i) {
            if depth == 0 && i > start {
                match tok {
                    Token::Comma
                    | Token::Semicolon
                    | Token::Export
                    | Token::Import
                    | Token::Const
                    | Token::Let
                    | Token::Var => return i,
                    _ => {}
                }
            }
            match tok {
                Token::LParen | Token::LBrace | Token::LBracket => depth += 1,
                Token::RParen | Token::RBrace | Token::RBracket => {
                    if depth == 0 {
                        return i;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            i += 1;
        }

        i
    }

    /// Skip a TS type annotation starting at `start`, stopping before the
    /// first `=`, `,` or `;` outside nested groups and generics
    pub(crate) fn skip_type_annotation(&self, start: usize) -> usize {
        let mut depth = 0usize;
        let mut angle = 0usize;
        let mut i = start;

        while let Some(tok) = self.token_at(i) {
            match tok {
                Token::LParen | Token::LBrace | Token::LBracket => depth += 1,
                Token::RParen | Token::RBrace | Token::RBracket => {
                    if depth == 0 {
                        return i;
                    }
                    depth -= 1;
                }
                Token::Lt => angle += 1,
                Token::Gt => angle = angle.saturating_sub(1),
                Token::Eq | Token::Comma | Token::Semicolon if depth == 0 && angle == 0 => {
                    return i;
                }
                _ => {}
            }
            i += 1;
        }

        i
    }

    /// Number of declared parameters in the list opened at `open`.
    ///
    /// Destructured and defaulted parameters count as one; a rest
    /// parameter makes the arity unknown. A leading TS `this` parameter
    /// is not counted.
    pub(crate) fn count_params(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut angle = 0usize;
        let mut count = 0usize;
        let mut in_param = false;
        let mut param_start = true;
        let mut i = open + 1;

        while let Some(tok) = self.token_at(i) {
            let top = depth == 0 && angle == 0;
            match tok {
                Token::RParen if top => break,
                Token::Comma if top => {
                    if in_param {
                        count += 1;
                    }
                    in_param = false;
                    param_start = true;
                    i += 1;
                    continue;
                }
                Token::Ellipsis if top && param_start => return None,
                Token::Ident(name) if top && param_start && name == "this" => {
                    // `this: Type` is a TS annotation, not a parameter
                    if self.check_at(i + 1, &Token::Colon) {
                        param_start = false;
                        i += 1;
                        continue;
                    }
                }
                _ => {}
            }

            if top && param_start {
                in_param = true;
            }
            param_start = false;

            match tok {
                Token::LParen | Token::LBrace | Token::LBracket => depth += 1,
                Token::RParen | Token::RBrace | Token::RBracket => depth = depth.saturating_sub(1),
                Token::Lt => angle += 1,
                Token::Gt => angle = angle.saturating_sub(1),
                _ => {}
            }
            i += 1;
        }

        if in_param {
            count += 1;
        }
        Some(count)
    }

    /// Whether the parenthesized group closing at `close` is an arrow
    /// function's parameter list, return type annotations included
    pub(crate) fn is_arrow_after(&self, close: usize) -> bool {
        match self.token_at(close + 1) {
            Some(Token::FatArrow) => true,
            Some(Token::Colon) => {
                let mut depth = 0usize;
                let mut i = close + 2;
                while let Some(tok) = self.token_at(i) {
                    match tok {
                        Token::FatArrow if depth == 0 => return true,
                        Token::LParen | Token::LBrace | Token::LBracket => depth += 1,
                        Token::RParen | Token::RBrace | Token::RBracket => {
                            if depth == 0 {
                                return false;
                            }
                            depth -= 1;
                        }
                        Token::Semicolon | Token::Comma | Token::Eq if depth == 0 => return false,
                        _ => {}
                    }
                    i += 1;
                }
                false
            }
            _ => false,
        }
    }
}

use logos::Logos;

/// Strip the surrounding quotes of a string literal and resolve escapes
fn unescape_string(s: &str) -> String {
    let inner = s
        .get(1..s.len().saturating_sub(1))
        .unwrap_or_default();
    let mut result = String::new();
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('b') => result.push('\x08'),
                Some('f') => result.push('\x0C'),
                Some('0') => result.push('\0'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some('\\') => result.push('\\'),
                Some('u') => {
                    // Unicode escape: \uXXXX
                    let hex: String = chars.by_ref().take(4).collect();
                    if let Ok(code) = u32::from_str_radix(&hex, 16) {
                        if let Some(unicode_char) = char::from_u32(code) {
                            result.push(unicode_char);
                        }
                    }
                }
                Some(c) => result.push(c),
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Token types for JavaScript / TypeScript module sources.
///
/// Only the parts of the grammar that shape a module's import/export surface
/// get dedicated variants. Everything else collapses into `Punct`, `Number`,
/// `Template` or `Ident` so a scanner can walk past it.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // Module keywords
    #[token("export")]
    Export,
    #[token("import")]
    Import,
    #[token("default")]
    Default,
    #[token("from")]
    From,
    #[token("as")]
    As,
    #[token("require")]
    Require,
    #[token("module")]
    Module,
    #[token("exports")]
    Exports,

    // Declarations
    #[token("function")]
    Function,
    #[token("class")]
    Class,
    #[token("const")]
    Const,
    #[token("let")]
    Let,
    #[token("var")]
    Var,
    #[token("async")]
    Async,
    #[token("new")]
    New,

    // TypeScript declarations
    #[token("interface")]
    Interface,
    #[token("type")]
    Type,
    #[token("enum")]
    Enum,
    #[token("declare")]
    Declare,
    #[token("abstract")]
    Abstract,
    #[token("namespace")]
    Namespace,

    // Literal keywords
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("undefined")]
    Undefined,

    // Identifiers and literals
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape_string(lex.slice()))]
    #[regex(r"'([^'\\\n]|\\.)*'", |lex| unescape_string(lex.slice()))]
    StringLiteral(String),

    #[regex(r"`([^`\\]|\\.)*`")]
    Template,

    /// `/pattern/flags`; produced by `Lexer` from a `Slash` in expression position
    Regex,

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?n?")]
    #[regex(r"0[xX][0-9a-fA-F_]+n?")]
    Number,

    // Delimiters
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("=")]
    Eq,
    #[token("=>")]
    FatArrow,
    #[token("*")]
    Star,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("?")]
    Question,
    #[token("/")]
    #[token("/=")]
    Slash,

    // Remaining operators carry no meaning for the export scanner
    #[token("+")]
    #[token("-")]
    #[token("%")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("!")]
    #[token("~")]
    #[token("@")]
    #[token("#")]
    #[token("==")]
    #[token("===")]
    #[token("!=")]
    #[token("!==")]
    #[token("<=")]
    #[token(">=")]
    #[token("&&")]
    #[token("||")]
    #[token("??")]
    #[token("?.")]
    #[token("++")]
    #[token("--")]
    #[token("**")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("&&=")]
    #[token("||=")]
    #[token("??=")]
    #[token("<<")]
    Punct,
}

impl Token {
    /// Identifier text, including contextual keywords usable as names
    /// (`export { default as MapView }`, `props.type`).
    pub fn as_name(&self) -> Option<&str> {
        let name = match self {
            Token::Ident(name) => name.as_str(),
            Token::Export => "export",
            Token::Import => "import",
            Token::Default => "default",
            Token::From => "from",
            Token::As => "as",
            Token::Require => "require",
            Token::Module => "module",
            Token::Exports => "exports",
            Token::Function => "function",
            Token::Class => "class",
            Token::Const => "const",
            Token::Let => "let",
            Token::Var => "var",
            Token::Async => "async",
            Token::New => "new",
            Token::Interface => "interface",
            Token::Type => "type",
            Token::Enum => "enum",
            Token::Declare => "declare",
            Token::Abstract => "abstract",
            Token::Namespace => "namespace",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Undefined => "undefined",
            _ => return None,
        };
        Some(name)
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Token::StringLiteral(_)
                | Token::Template
                | Token::Regex
                | Token::Number
                | Token::True
                | Token::False
                | Token::Null
                | Token::Undefined
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}

/// Wraps the logos lexer to tell a regex literal from a division.
///
/// A `/` starts a regex only where an expression may begin, which depends
/// on the previous token.
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    regex_allowed: bool,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
            regex_allowed: true,
        }
    }

    /// Consume `/pattern/flags` when the `Slash` just lexed opens one
    fn lex_regex(&mut self) -> Token {
        let start = self.inner.span().start;
        match regex_literal_end(self.inner.source(), start) {
            Some(end) => {
                self.inner.bump(end - self.inner.span().end);
                Token::Regex
            }
            None => Token::Slash,
        }
    }
}

/// Whether a `/` right after `token` begins a regex literal
fn starts_expression(token: &Token, slice: &str) -> bool {
    match token {
        Token::Eq
        | Token::LParen
        | Token::LBracket
        | Token::LBrace
        | Token::Comma
        | Token::Colon
        | Token::Semicolon
        | Token::FatArrow
        | Token::Question
        | Token::Default => true,
        Token::Punct => !matches!(slice, "++" | "--"),
        Token::Ident(name) => matches!(
            name.as_str(),
            "return" | "typeof" | "case" | "void" | "delete" | "throw" | "yield" | "await" | "in" | "of"
        ),
        _ => false,
    }
}

/// End of the regex literal whose opening `/` is at `start`, flags included.
/// `None` if the line ends first.
fn regex_literal_end(source: &str, start: usize) -> Option<usize> {
    let body = source.get(start + 1..)?;
    let mut in_class = false;
    let mut escaped = false;

    for (offset, ch) in body.char_indices() {
        match ch {
            '\n' | '\r' => return None,
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => {
                let close = start + 1 + offset + 1;
                let flags = source
                    .get(close..)?
                    .bytes()
                    .take_while(u8::is_ascii_alphabetic)
                    .count();
                return Some(close + flags);
            }
            _ => {}
        }
    }
    None
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<TokenSpan, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = match self.inner.next()? {
            Ok(Token::Slash) if self.regex_allowed => Ok(self.lex_regex()),
            other => other,
        };
        let span = self.inner.span();

        match token {
            Ok(tok) => {
                self.regex_allowed = starts_expression(&tok, self.inner.slice());
                Some(Ok(TokenSpan { token: tok, span }))
            }
            Err(_) => Some(Err(LexError::InvalidToken { span })),
        }
    }
}

/// Tokenize a whole source, skipping characters the lexer does not know.
///
/// JSX text and stray quotes in markup produce invalid tokens; none of
/// them can start an export, so dropping them keeps the stream usable.
pub fn tokenize_lossy(source: &str) -> Vec<TokenSpan> {
    Lexer::new(source).filter_map(Result::ok).collect()
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Invalid token at {span:?}")]
    InvalidToken { span: std::ops::Range<usize> },
}

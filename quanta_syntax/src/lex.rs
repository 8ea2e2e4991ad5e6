use crate::{
    error::Error,
    token::{Position, Span, Token, TokenKind},
};
use log::trace;
use regex::Regex;

/// Characters that may not directly follow a match for the rule to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Boundary {
    Free,
    Word,
    Integer,
}

impl Boundary {
    fn rejects(self, next: char) -> bool {
        match self {
            Self::Free => false,
            Self::Word => next.is_alphanumeric() || next == '_',
            Self::Integer => next.is_alphanumeric() || next == '_' || next == '.',
        }
    }
}

/// Ordered lexical rules. The first rule that matches wins, so keywords
/// sit above identifiers and longer operators above their prefixes.
const RULES: &[(&str, TokenKind, Boundary)] = &[
    (r"[ \t\r\n]+", TokenKind::IGNORE, Boundary::Free),
    (r"//.*", TokenKind::IGNORE, Boundary::Free),
    // Types
    ("double", TokenKind::DOUBLE, Boundary::Word),
    ("int", TokenKind::INT, Boundary::Word),
    ("char", TokenKind::CHAR, Boundary::Word),
    ("bool", TokenKind::BOOL, Boundary::Word),
    ("string", TokenKind::STRING, Boundary::Word),
    ("phys", TokenKind::PHYS, Boundary::Word),
    ("unit", TokenKind::UNIT, Boundary::Word),
    ("void", TokenKind::VOID, Boundary::Word),
    // Keywords
    ("if", TokenKind::IF, Boundary::Word),
    ("elseif", TokenKind::ELSEIF, Boundary::Word),
    ("else", TokenKind::ELSE, Boundary::Word),
    ("true", TokenKind::TRUE, Boundary::Word),
    ("false", TokenKind::FALSE, Boundary::Word),
    ("function", TokenKind::FUNCTION, Boundary::Word),
    ("return", TokenKind::RETURN, Boundary::Word),
    ("while", TokenKind::WHILE, Boundary::Word),
    ("break", TokenKind::BREAK, Boundary::Word),
    ("continue", TokenKind::CONTINUE, Boundary::Word),
    ("or", TokenKind::OR, Boundary::Word),
    ("and", TokenKind::AND, Boundary::Word),
    ("not", TokenKind::NOT, Boundary::Word),
    // Symbols
    ("->", TokenKind::ARROW, Boundary::Free),
    (",", TokenKind::COMMA, Boundary::Free),
    (r"\{", TokenKind::LBRACE, Boundary::Free),
    (r"\}", TokenKind::RBRACE, Boundary::Free),
    (r"\.", TokenKind::DOT, Boundary::Free),
    ("==", TokenKind::EQUAL_EQUAL, Boundary::Free),
    ("=", TokenKind::EQUAL, Boundary::Free),
    (r"\(", TokenKind::LPAREN, Boundary::Free),
    (r"\)", TokenKind::RPAREN, Boundary::Free),
    (";", TokenKind::SEMICOLON, Boundary::Free),
    (":", TokenKind::COLON, Boundary::Free),
    (r"\+", TokenKind::PLUS, Boundary::Free),
    ("-", TokenKind::MINUS, Boundary::Free),
    (r"\*", TokenKind::STAR, Boundary::Free),
    ("/", TokenKind::SLASH, Boundary::Free),
    ("<=", TokenKind::LESS_EQUAL, Boundary::Free),
    (">=", TokenKind::GREATER_EQUAL, Boundary::Free),
    ("<", TokenKind::LESS, Boundary::Free),
    (">", TokenKind::GREATER, Boundary::Free),
    ("!=", TokenKind::BANG_EQUAL, Boundary::Free),
    (r"\|", TokenKind::PIPE, Boundary::Free),
    ("&", TokenKind::AMPERSAND, Boundary::Free),
    // Literals
    (r"[0-9]+\.[0-9]+", TokenKind::DOUBLE_LIT, Boundary::Word),
    ("0|[1-9][0-9]*", TokenKind::INT_LIT, Boundary::Integer),
    ("'.'", TokenKind::CHAR_LIT, Boundary::Free),
    (r#""[^"]*""#, TokenKind::STRING_LIT, Boundary::Free),
    ("[A-Za-z_][A-Za-z0-9_]*", TokenKind::IDENT, Boundary::Free),
];

#[derive(Debug)]
struct Rule {
    pattern: Regex,
    kind: TokenKind,
    boundary: Boundary,
}

#[derive(Debug)]
pub struct Lexer<'a> {
    source: &'a str,
    rules: Vec<Rule>,
    row: usize,
    column: usize,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let rules = RULES
            .iter()
            .map(|&(pattern, kind, boundary)| Rule {
                // Infallible as the rule table is fixed at compile time
                pattern: Regex::new(&format!("^(?:{pattern})"))
                    .expect("lexical rules must be valid regular expressions"),
                kind,
                boundary,
            })
            .collect();
        Self {
            source,
            rules,
            row: 0,
            column: 0,
            offset: 0,
        }
    }

    /// Lexes the whole source, failing on the first illegal character.
    /// The returned stream always ends with a single `EOF` token.
    pub fn lex_all(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens: Vec<Token> = Vec::default();
        let source = self.source;
        for line in source.lines() {
            self.lex_line(line, &mut tokens)?;
            self.row += 1;
        }
        let end = Position::new(self.row, 0);
        tokens.push(Token::new(TokenKind::EOF, None, Span::new(end, end)));
        trace!("Lexed {} tokens", tokens.len());
        Ok(tokens)
    }

    fn lex_line(&mut self, line: &str, tokens: &mut Vec<Token>) -> Result<(), Error> {
        self.column = 0;
        self.offset = 0;
        while self.offset < line.len() {
            let token = self.lex(line)?;
            if token.kind != TokenKind::IGNORE {
                tokens.push(token);
            }
        }
        Ok(())
    }

    /// Matches a single token at the current position of `line`.
    fn lex(&mut self, line: &str) -> Result<Token, Error> {
        let rest = &line[self.offset..];
        let matched = self.rules.iter().find_map(|rule| {
            let m = rule.pattern.find(rest)?;
            let next = rest[m.end()..].chars().next();
            if m.as_str().is_empty() || next.is_some_and(|c| rule.boundary.rejects(c)) {
                None
            } else {
                Some((rule.kind, m.as_str()))
            }
        });
        match matched {
            Some((kind, text)) => Ok(self.make_token(kind, text)),
            None => Err(self.error(rest)),
        }
    }

    fn make_token(&mut self, kind: TokenKind, text: &str) -> Token {
        let start = self.position();
        self.offset += text.len();
        self.column += text.chars().count();
        let value = kind.has_value().then(|| text.to_string());
        Token::new(kind, value, Span::new(start, self.position()))
    }

    fn position(&self) -> Position {
        Position::new(self.row, self.column)
    }

    fn error(&self, rest: &str) -> Error {
        Error::Lex {
            // The caller guarantees there is input left on the line
            illegal_char: rest.chars().next().unwrap_or_default(),
            pos: self.position(),
        }
    }
}

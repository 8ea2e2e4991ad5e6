use std::fmt::Display;

/// A zero-based location in the source text.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.row + 1, self.column + 1)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }
}

/// The enum variants are in SCREAMING_SNAKE_CASE as they technically
/// represent constants, but Rust does not allow const enum variants.
#[allow(nonstandard_style)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    // Symbols
    LPAREN,
    RPAREN,
    LBRACE,
    RBRACE,
    COMMA,
    DOT,
    COLON,
    SEMICOLON,
    ARROW,
    PIPE,
    AMPERSAND,
    // Arithmetic
    MINUS,
    PLUS,
    SLASH,
    STAR,
    // Comparisons
    BANG_EQUAL,
    EQUAL_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,
    // Types
    INT,
    DOUBLE,
    CHAR,
    BOOL,
    STRING,
    PHYS,
    UNIT,
    VOID,
    // Keywords
    AND,
    BREAK,
    CONTINUE,
    ELSE,
    ELSEIF,
    FALSE,
    FUNCTION,
    IF,
    NOT,
    OR,
    RETURN,
    TRUE,
    WHILE,
    // Literals
    IDENT,
    INT_LIT,
    DOUBLE_LIT,
    CHAR_LIT,
    STRING_LIT,
    // Miscellaneous tokens
    EQUAL,
    IGNORE,
    EOF,
}

impl TokenKind {
    /// Value-bearing kinds keep their literal text, and
    /// compare it when tokens are checked for equality.
    pub fn has_value(self) -> bool {
        matches!(
            self,
            Self::IDENT
                | Self::INT_LIT
                | Self::DOUBLE_LIT
                | Self::CHAR_LIT
                | Self::STRING_LIT
                | Self::EOF
        )
    }

    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::INT | Self::DOUBLE | Self::BOOL | Self::STRING | Self::PHYS | Self::UNIT
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::LPAREN => "(",
            Self::RPAREN => ")",
            Self::LBRACE => "{",
            Self::RBRACE => "}",
            Self::COMMA => ",",
            Self::DOT => ".",
            Self::COLON => ":",
            Self::SEMICOLON => ";",
            Self::ARROW => "->",
            Self::PIPE => "|",
            Self::AMPERSAND => "&",
            Self::MINUS => "-",
            Self::PLUS => "+",
            Self::SLASH => "/",
            Self::STAR => "*",
            Self::BANG_EQUAL => "!=",
            Self::EQUAL_EQUAL => "==",
            Self::GREATER => ">",
            Self::GREATER_EQUAL => ">=",
            Self::LESS => "<",
            Self::LESS_EQUAL => "<=",
            Self::INT => "int",
            Self::DOUBLE => "double",
            Self::CHAR => "char",
            Self::BOOL => "bool",
            Self::STRING => "string",
            Self::PHYS => "phys",
            Self::UNIT => "unit",
            Self::VOID => "void",
            Self::AND => "and",
            Self::BREAK => "break",
            Self::CONTINUE => "continue",
            Self::ELSE => "else",
            Self::ELSEIF => "elseif",
            Self::FALSE => "false",
            Self::FUNCTION => "function",
            Self::IF => "if",
            Self::NOT => "not",
            Self::OR => "or",
            Self::RETURN => "return",
            Self::TRUE => "true",
            Self::WHILE => "while",
            Self::IDENT => "identifier",
            Self::INT_LIT => "int value",
            Self::DOUBLE_LIT => "double value",
            Self::CHAR_LIT => "char value",
            Self::STRING_LIT => "string value",
            Self::EQUAL => "=",
            Self::IGNORE => "whitespace",
            Self::EOF => "end of text",
        })
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub value: Option<String>,
    pub span: Span,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && (!self.kind.has_value() || self.value == other.value)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(v) if self.kind != TokenKind::EOF => f.write_str(v),
            _ => write!(f, "{}", self.kind),
        }
    }
}

impl Token {
    pub fn new(kind: TokenKind, value: Option<String>, span: Span) -> Self {
        Self { kind, value, span }
    }

    /// Builds a token without a position, mostly useful for comparisons.
    pub fn bare(kind: TokenKind, value: Option<&str>) -> Self {
        Self::new(kind, value.map(str::to_string), Span::default())
    }

    pub fn lexeme(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

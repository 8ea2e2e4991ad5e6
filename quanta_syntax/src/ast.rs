use std::{fmt::Display, rc::Rc};

use crate::token::{Span, TokenKind};

#[derive(Clone, Debug)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

/// Nodes compare structurally, ignoring where they came from.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { span, kind }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Block {
    pub span: Span,
    pub items: Vec<Node>,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Block {
    pub fn new(items: Vec<Node>, span: Span) -> Self {
        Self { span, items }
    }
}

#[derive(Clone, Debug)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Ident {
    pub fn new(name: &str, span: Span) -> Self {
        Self {
            name: name.to_string(),
            span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "not",
        })
    }
}

impl UnaryOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::PLUS => Self::Plus,
            TokenKind::MINUS => Self::Minus,
            TokenKind::NOT => Self::Not,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Slash,
    Star,
    Plus,
    Minus,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    BangEqual,
    EqualEqual,
    And,
    Or,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Slash => "/",
            Self::Star => "*",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::BangEqual => "!=",
            Self::EqualEqual => "==",
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

impl BinOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::SLASH => Self::Slash,
            TokenKind::STAR => Self::Star,
            TokenKind::PLUS => Self::Plus,
            TokenKind::MINUS => Self::Minus,
            TokenKind::GREATER => Self::Greater,
            TokenKind::GREATER_EQUAL => Self::GreaterEqual,
            TokenKind::LESS => Self::Less,
            TokenKind::LESS_EQUAL => Self::LessEqual,
            TokenKind::BANG_EQUAL => Self::BangEqual,
            TokenKind::EQUAL_EQUAL => Self::EqualEqual,
            TokenKind::AND => Self::And,
            TokenKind::OR => Self::Or,
            _ => return None,
        };
        Some(op)
    }
}

/// Declarable types, plus `void` which is only valid as a return type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Double,
    Bool,
    Str,
    Phys,
    Unit,
    Void,
}

impl Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Str => "string",
            Self::Phys => "phys",
            Self::Unit => "unit",
            Self::Void => "void",
        })
    }
}

impl TypeName {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let ty = match t {
            TokenKind::INT => Self::Int,
            TokenKind::DOUBLE => Self::Double,
            TokenKind::BOOL => Self::Bool,
            TokenKind::STRING => Self::Str,
            TokenKind::PHYS => Self::Phys,
            TokenKind::UNIT => Self::Unit,
            TokenKind::VOID => Self::Void,
            _ => return None,
        };
        Some(ty)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub ident: Ident,
    pub ty: TypeName,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub ident: Ident,
    pub params: Vec<Param>,
    pub return_type: TypeName,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Int(i64),
    Double(f64),
    Str(String),
    Bool(bool),
    Unit {
        nominator: Vec<Ident>,
        denominator: Vec<Ident>,
    },
    Phys {
        magnitude: Box<Node>,
        unit: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Node>,
    },
    Binary {
        lhs: Box<Node>,
        op: BinOp,
        rhs: Box<Node>,
    },
    Var(Ident),
    Assignment {
        ty: Option<TypeName>,
        ident: Ident,
        value: Box<Node>,
    },
    If {
        cases: Vec<(Node, Block)>,
        else_block: Option<Block>,
    },
    While {
        condition: Box<Node>,
        body: Block,
    },
    Function(Rc<FuncDecl>),
    Call {
        ident: Ident,
        args: Vec<Node>,
    },
    Return(Option<Box<Node>>),
    Break,
    Continue,
    Block(Block),
}

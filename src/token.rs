use log::info;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::rc::Rc;

/// The different kinds of tokens recognized by the scanner.
///
/// Variants without data represent single‑character, two‑character, or
/// keyword tokens. `STRING(String)` and `NUMBER(f64)` carry their literal
/// values. `IDENTIFIER` is used for user‑defined names. `EOF` marks the end
/// of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// ';'
    SEMICOLON,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '&' — symbolic alias for 'and'
    AMPERSAND,

    /// '|' — symbolic alias for 'or'; also opens a lambda parameter list
    PIPE,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// A user‑defined identifier
    IDENTIFIER,

    /// A string literal (contents without quotes)
    STRING(String),

    /// A numeric literal
    #[serde(rename = "NUMBER")]
    NUMBER(f64),

    /// 'and'
    AND,

    /// 'catch'
    CATCH,

    /// 'class'
    CLASS,

    /// 'else'
    ELSE,

    /// 'exit'
    EXIT,

    /// 'false'
    FALSE,

    /// 'finally'
    FINALLY,

    /// 'fn'
    FUN,

    /// 'for'
    FOR,

    /// 'if'
    IF,

    /// 'import'
    IMPORT,

    /// 'include'
    INCLUDE,

    /// 'nil'
    NIL,

    /// 'or'
    OR,

    /// 'print'
    PRINT,

    /// 'return'
    RETURN,

    /// 'super'
    SUPER,

    /// 'this'
    THIS,

    /// 'throw'
    THROW,

    /// 'true'
    TRUE,

    /// 'try'
    TRY,

    /// 'var'
    VAR,

    /// 'while'
    WHILE,

    /// End‑of‑file marker
    EOF,
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl Eq for TokenType {}

/// A scanned token: its type, the original lexeme, the line it was found
/// on, and the source file (plus its directory, which `include`/`import`
/// resolution joins relative paths against).
///
/// Equality and hashing consider only `(type, lexeme)` — location is not
/// part of a token's identity, so tokens naming the same variable from
/// different lines key the same scope-map slot.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    /// Directory of the source file, for relative `include`/`import` paths.
    pub directory: Rc<str>,

    /// Source file the token came from (empty for the prompt and for
    /// synthesized tokens).
    pub file: Rc<str>,

    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: String,

    /// 1‑based line number in the source.
    pub line: usize,
}

impl Token {
    /// Create a new Token with the given type, lexeme, origin, and line.
    pub fn new(
        token_type: TokenType,
        lexeme: &str,
        directory: Rc<str>,
        file: Rc<str>,
        line: usize,
    ) -> Self {
        info!(
            "Creating new token: type={:?}, lexeme={}, line={}",
            token_type, lexeme, line
        );

        Self {
            directory,
            file,
            token_type,
            lexeme: lexeme.to_owned(),
            line,
        }
    }

    /// A location-less token, used when the runtime manufactures AST on the
    /// fly (builtin error classes, reflection lookups).
    pub fn synthetic(token_type: TokenType, lexeme: &str) -> Self {
        Self {
            directory: Rc::from(""),
            file: Rc::from(""),
            token_type,
            lexeme: lexeme.to_owned(),
            line: 0,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.token_type == other.token_type && self.lexeme == other.lexeme
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(&self.token_type).hash(state);
        self.lexeme.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ── 1. decide literal string ────────────────────────────────────
        let literal: String = match &self.token_type {
            TokenType::STRING(s) => s.clone(),
            TokenType::NUMBER(n) => {
                // 3 → "3.0", 3.14 → "3.14"
                if n.fract() == 0.0 && n.is_finite() {
                    let mut buf: itoa::Buffer = itoa::Buffer::new();
                    format!("{}.0", buf.format(*n as i64))
                } else {
                    n.to_string()
                }
            }
            _ => "null".to_owned(),
        };

        // ── 2. variant name without payloads ────────────────────────────
        let variant: &'static str = match self.token_type {
            TokenType::STRING(_) => "STRING",
            TokenType::NUMBER(_) => "NUMBER",
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::COMMA => "COMMA",
            TokenType::DOT => "DOT",
            TokenType::MINUS => "MINUS",
            TokenType::PLUS => "PLUS",
            TokenType::SEMICOLON => "SEMICOLON",
            TokenType::SLASH => "SLASH",
            TokenType::STAR => "STAR",
            TokenType::AMPERSAND => "AMPERSAND",
            TokenType::PIPE => "PIPE",
            TokenType::BANG => "BANG",
            TokenType::BANG_EQUAL => "BANG_EQUAL",
            TokenType::EQUAL => "EQUAL",
            TokenType::EQUAL_EQUAL => "EQUAL_EQUAL",
            TokenType::GREATER => "GREATER",
            TokenType::GREATER_EQUAL => "GREATER_EQUAL",
            TokenType::LESS => "LESS",
            TokenType::LESS_EQUAL => "LESS_EQUAL",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::AND => "AND",
            TokenType::CATCH => "CATCH",
            TokenType::CLASS => "CLASS",
            TokenType::ELSE => "ELSE",
            TokenType::EXIT => "EXIT",
            TokenType::FALSE => "FALSE",
            TokenType::FINALLY => "FINALLY",
            TokenType::FUN => "FUN",
            TokenType::FOR => "FOR",
            TokenType::IF => "IF",
            TokenType::IMPORT => "IMPORT",
            TokenType::INCLUDE => "INCLUDE",
            TokenType::NIL => "NIL",
            TokenType::OR => "OR",
            TokenType::PRINT => "PRINT",
            TokenType::RETURN => "RETURN",
            TokenType::SUPER => "SUPER",
            TokenType::THIS => "THIS",
            TokenType::THROW => "THROW",
            TokenType::TRUE => "TRUE",
            TokenType::TRY => "TRY",
            TokenType::VAR => "VAR",
            TokenType::WHILE => "WHILE",
            TokenType::EOF => "EOF",
        };

        write!(f, "{} {} {}", variant, self.lexeme, literal)
    }
}

//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings through a [`DialectProfile`].

use super::dialect::{ConcatStyle, DialectProfile};

/// SQL Token - every element a compiled SELECT statement can contain.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Clause keywords ===
    Select,
    Distinct,
    Top,
    From,
    Inner,
    Left,
    Outer,
    Join,
    On,
    As,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    Over,
    Limit,
    Offset,
    Rows,
    Fetch,
    Next,
    Only,
    Union,
    All,
    Intersect,
    Except,
    Insert,
    Into,
    Update,
    Set,
    Delete,

    // === Predicate and expression keywords ===
    And,
    Or,
    Not,
    In,
    Exists,
    Like,
    Escape,
    IsNull,
    IsNotNull,
    Case,
    When,
    Then,
    Else,
    End,
    Null,

    // === Punctuation and operators ===
    Comma,
    Dot,
    Star,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    /// String concatenation operator; `+` or `||` depending on the profile.
    Concat,

    // === Whitespace / Formatting ===
    Space,
    Newline,
    Indent(usize),

    // === Dynamic Content ===
    /// Simple identifier (table, column, alias)
    Ident(String),
    /// Qualified identifier: schema.table or just table
    QualifiedIdent {
        schema: Option<String>,
        name: String,
    },
    /// Integer literal
    LitInt(i64),
    /// Float literal
    LitFloat(f64),
    /// String literal
    LitString(String),
    /// Boolean literal
    LitBool(bool),
    /// NULL literal
    LitNull,
    /// Bound parameter, by slot index. Placeholder text is assigned by
    /// [`SqlWriter`](super::writer::SqlWriter).
    Param(usize),

    // === Function Names ===
    /// Function name, remapped through the profile's function overrides.
    FunctionName(String),

    // === Escape Hatch ===
    /// Raw SQL passed directly to output without escaping.
    ///
    /// # Security Warning
    ///
    /// **Never pass user input to this variant.** Only trusted, static
    /// fragments (such as a dialect's unbounded LIMIT value) belong here.
    Raw(String),
}

impl Token {
    /// Text of a token whose spelling never depends on the dialect.
    ///
    /// Returns `None` for identifiers, literals, parameters, function names,
    /// raw fragments and `Concat`, which the profile decides.
    pub fn text(&self) -> Option<&'static str> {
        let text = match self {
            Token::Select => "SELECT",
            Token::Distinct => "DISTINCT",
            Token::Top => "TOP",
            Token::From => "FROM",
            Token::Inner => "INNER",
            Token::Left => "LEFT",
            Token::Outer => "OUTER",
            Token::Join => "JOIN",
            Token::On => "ON",
            Token::As => "AS",
            Token::Where => "WHERE",
            Token::GroupBy => "GROUP BY",
            Token::Having => "HAVING",
            Token::OrderBy => "ORDER BY",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::Over => "OVER",
            Token::Limit => "LIMIT",
            Token::Offset => "OFFSET",
            Token::Rows => "ROWS",
            Token::Fetch => "FETCH",
            Token::Next => "NEXT",
            Token::Only => "ONLY",
            Token::Union => "UNION",
            Token::All => "ALL",
            Token::Intersect => "INTERSECT",
            Token::Except => "EXCEPT",
            Token::Insert => "INSERT",
            Token::Into => "INTO",
            Token::Update => "UPDATE",
            Token::Set => "SET",
            Token::Delete => "DELETE",

            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::In => "IN",
            Token::Exists => "EXISTS",
            Token::Like => "LIKE",
            Token::Escape => "ESCAPE",
            Token::IsNull => "IS NULL",
            Token::IsNotNull => "IS NOT NULL",
            Token::Case => "CASE",
            Token::When => "WHEN",
            Token::Then => "THEN",
            Token::Else => "ELSE",
            Token::End => "END",
            Token::Null | Token::LitNull => "NULL",

            Token::Comma => ",",
            Token::Dot => ".",
            Token::Star | Token::Mul => "*",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Eq => "=",
            Token::Ne => "<>",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Lte => "<=",
            Token::Gte => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Div => "/",
            Token::Mod => "%",
            Token::Space => " ",
            Token::Newline => "\n",

            Token::Concat
            | Token::Indent(_)
            | Token::Ident(_)
            | Token::QualifiedIdent { .. }
            | Token::LitInt(_)
            | Token::LitFloat(_)
            | Token::LitString(_)
            | Token::LitBool(_)
            | Token::Param(_)
            | Token::FunctionName(_)
            | Token::Raw(_) => return None,
        };
        Some(text)
    }

    /// Serialize this token to a string for the given dialect.
    ///
    /// `Param` tokens serialize to a bare `?`; statement text goes through
    /// the writer, which numbers and names placeholders.
    pub fn serialize(&self, dialect: &DialectProfile) -> String {
        if let Some(text) = self.text() {
            return text.to_string();
        }
        match self {
            Token::Concat => match dialect.concat_style {
                ConcatStyle::Operator(op) => op.into(),
                // Writers never emit the token for function-style concat
                ConcatStyle::Function => "||".into(),
            },
            Token::Indent(n) => "  ".repeat(*n),
            Token::Ident(name) => dialect.quote_identifier(name),
            Token::QualifiedIdent { schema, name } => match schema {
                Some(s) => format!(
                    "{}.{}",
                    dialect.quote_identifier(s),
                    dialect.quote_identifier(name)
                ),
                None => dialect.quote_identifier(name),
            },
            Token::LitInt(n) => n.to_string(),
            // Non-finite floats are always bound as parameters upstream
            Token::LitFloat(f) => ryu::Buffer::new().format(*f).to_string(),
            Token::LitString(s) => dialect.quote_string(s),
            Token::LitBool(b) => dialect.format_bool(*b).into(),
            Token::Param(_) => "?".into(),
            Token::FunctionName(name) => dialect
                .remap_function(name)
                .unwrap_or(name.as_str())
                .to_uppercase(),
            Token::Raw(s) => s.clone(),
            fixed => fixed.text().unwrap_or_default().to_string(),
        }
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// Tokens in emission order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Serialize all tokens to a SQL string, rendering parameters as `?`.
    pub fn serialize(&self, dialect: &DialectProfile) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn newline(&mut self) -> &mut Self {
        self.push(Token::Newline)
    }
    pub fn indent(&mut self, n: usize) -> &mut Self {
        self.push(Token::Indent(n))
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}

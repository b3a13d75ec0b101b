//! Tokenizer for routine source.

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),

    // Keywords
    Let,
    Const,
    Var,
    If,
    Else,
    For,
    While,
    Break,
    Continue,
    Return,
    True,
    False,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    StarStar,   // **
    Slash,      // /
    Percent,    // %
    PlusPlus,   // ++
    MinusMinus, // --
    Assign,     // =
    PlusEq,     // +=
    MinusEq,    // -=
    StarEq,     // *=
    SlashEq,    // /=
    PercentEq,  // %=
    EqEq,       // == and ===
    NotEq,      // != and !==
    Lt,         // <
    Gt,         // >
    LtEq,       // <=
    GtEq,       // >=
    AndAnd,     // &&
    OrOr,       // ||
    Not,        // !
    Question,   // ?
    Colon,      // :

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Dot,

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

fn keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "let" => TokenKind::Let,
        "const" => TokenKind::Const,
        "var" => TokenKind::Var,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => return None,
    })
}

/// Tokenize routine source. The result always ends with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut col = 1;

    let lex_error = |line: usize, col: usize, message: String| CompileError::Lex { line, col, message };

    while pos < chars.len() {
        let ch = chars[pos];
        let next = chars.get(pos + 1).copied();

        if ch == '\n' {
            pos += 1;
            line += 1;
            col = 1;
            continue;
        }
        if ch.is_whitespace() {
            pos += 1;
            col += 1;
            continue;
        }

        // Comments
        if ch == '/' && next == Some('/') {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }
        if ch == '/' && next == Some('*') {
            let (start_line, start_col) = (line, col);
            pos += 2;
            col += 2;
            loop {
                match chars.get(pos) {
                    None => return Err(lex_error(start_line, start_col, "unterminated block comment".into())),
                    Some('*') if chars.get(pos + 1) == Some(&'/') => {
                        pos += 2;
                        col += 2;
                        break;
                    }
                    Some('\n') => {
                        line += 1;
                        col = 1;
                        pos += 1;
                    }
                    Some(_) => {
                        col += 1;
                        pos += 1;
                    }
                }
            }
            continue;
        }

        let start_col = col;

        // Numbers: 12, 1.5, .5, 1e-3
        if ch.is_ascii_digit() || (ch == '.' && next.is_some_and(|c| c.is_ascii_digit())) {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                pos += 1;
            }
            if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
                let mut look = pos + 1;
                if look < chars.len() && (chars[look] == '+' || chars[look] == '-') {
                    look += 1;
                }
                if look < chars.len() && chars[look].is_ascii_digit() {
                    pos = look;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
            }
            let text: String = chars[start..pos].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| lex_error(line, start_col, format!("invalid number `{}`", text)))?;
            col += pos - start;
            tokens.push(Token { kind: TokenKind::Number(value), line, col: start_col });
            continue;
        }

        if ch.is_alphabetic() || ch == '_' || ch == '$' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_' || chars[pos] == '$') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            col += pos - start;
            let kind = keyword(&word).unwrap_or(TokenKind::Ident(word));
            tokens.push(Token { kind, line, col: start_col });
            continue;
        }

        let third = chars.get(pos + 2).copied();
        let (kind, width) = match (ch, next, third) {
            ('=', Some('='), Some('=')) => (TokenKind::EqEq, 3),
            ('!', Some('='), Some('=')) => (TokenKind::NotEq, 3),
            ('*', Some('*'), _) => (TokenKind::StarStar, 2),
            ('+', Some('+'), _) => (TokenKind::PlusPlus, 2),
            ('-', Some('-'), _) => (TokenKind::MinusMinus, 2),
            ('+', Some('='), _) => (TokenKind::PlusEq, 2),
            ('-', Some('='), _) => (TokenKind::MinusEq, 2),
            ('*', Some('='), _) => (TokenKind::StarEq, 2),
            ('/', Some('='), _) => (TokenKind::SlashEq, 2),
            ('%', Some('='), _) => (TokenKind::PercentEq, 2),
            ('=', Some('='), _) => (TokenKind::EqEq, 2),
            ('!', Some('='), _) => (TokenKind::NotEq, 2),
            ('<', Some('='), _) => (TokenKind::LtEq, 2),
            ('>', Some('='), _) => (TokenKind::GtEq, 2),
            ('&', Some('&'), _) => (TokenKind::AndAnd, 2),
            ('|', Some('|'), _) => (TokenKind::OrOr, 2),
            ('+', _, _) => (TokenKind::Plus, 1),
            ('-', _, _) => (TokenKind::Minus, 1),
            ('*', _, _) => (TokenKind::Star, 1),
            ('/', _, _) => (TokenKind::Slash, 1),
            ('%', _, _) => (TokenKind::Percent, 1),
            ('=', _, _) => (TokenKind::Assign, 1),
            ('<', _, _) => (TokenKind::Lt, 1),
            ('>', _, _) => (TokenKind::Gt, 1),
            ('!', _, _) => (TokenKind::Not, 1),
            ('?', _, _) => (TokenKind::Question, 1),
            (':', _, _) => (TokenKind::Colon, 1),
            ('(', _, _) => (TokenKind::LParen, 1),
            (')', _, _) => (TokenKind::RParen, 1),
            ('{', _, _) => (TokenKind::LBrace, 1),
            ('}', _, _) => (TokenKind::RBrace, 1),
            ('[', _, _) => (TokenKind::LBracket, 1),
            (']', _, _) => (TokenKind::RBracket, 1),
            (',', _, _) => (TokenKind::Comma, 1),
            (';', _, _) => (TokenKind::Semicolon, 1),
            ('.', _, _) => (TokenKind::Dot, 1),
            _ => return Err(lex_error(line, col, format!("unexpected character '{}'", ch))),
        };
        pos += width;
        col += width;
        tokens.push(Token { kind, line, col: start_col });
    }

    tokens.push(Token { kind: TokenKind::Eof, line, col });
    Ok(tokens)
}

//! Tokenizer for feature expressions and filter conditions.

use super::ExpressionError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    /// Bare identifier or keyword.
    Ident(String),
    /// Backtick-quoted column name.
    Quoted(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
}

/// A token with the byte offset it started at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Split `input` into tokens.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && peek_is_digit(&chars, i + 1)) {
            let (token, next) = lex_number(input, &chars, i)?;
            tokens.push(Spanned { token, offset });
            i = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let end = chars.get(i).map(|(o, _)| *o).unwrap_or(input.len());
            tokens.push(Spanned {
                token: Token::Ident(input[chars[start].0..end].to_string()),
                offset,
            });
            continue;
        }

        if c == '\'' || c == '"' {
            let (text, next) = lex_string(&chars, i, c)?;
            tokens.push(Spanned {
                token: Token::Str(text),
                offset,
            });
            i = next;
            continue;
        }

        if c == '`' {
            let (text, next) = lex_string(&chars, i, '`')?;
            if text.is_empty() {
                return Err(ExpressionError::UnexpectedChar { ch: '`', offset });
            }
            tokens.push(Spanned {
                token: Token::Quoted(text),
                offset,
            });
            i = next;
            continue;
        }

        let next = chars.get(i + 1).map(|(_, c)| *c);
        let (token, width) = match (c, next) {
            ('*', Some('*')) => (Token::Power, 2),
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('<', Some('>')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::LtEq, 2),
            ('>', Some('=')) => (Token::GtEq, 2),
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('^', _) => (Token::Power, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('=', _) => (Token::Eq, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('&', _) => (Token::AndAnd, 1),
            ('|', _) => (Token::OrOr, 1),
            ('!', _) => (Token::Bang, 1),
            _ => return Err(ExpressionError::UnexpectedChar { ch: c, offset }),
        };
        tokens.push(Spanned { token, offset });
        i += width;
    }

    Ok(tokens)
}

fn peek_is_digit(chars: &[(usize, char)], i: usize) -> bool {
    chars.get(i).is_some_and(|(_, c)| c.is_ascii_digit())
}

fn lex_number(
    input: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(Token, usize), ExpressionError> {
    let mut i = start;
    let mut is_float = false;

    while i < chars.len() && chars[i].1.is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i].1 == '.' {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].1.is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i].1 == 'e' || chars[i].1 == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j].1 == '+' || chars[j].1 == '-') {
            j += 1;
        }
        if peek_is_digit(chars, j) {
            is_float = true;
            i = j;
            while i < chars.len() && chars[i].1.is_ascii_digit() {
                i += 1;
            }
        }
    }

    let offset = chars[start].0;
    let end = chars.get(i).map(|(o, _)| *o).unwrap_or(input.len());
    let text = &input[offset..end];

    let token = if is_float {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| ExpressionError::InvalidNumber(text.to_string()))?
    } else {
        match text.parse::<i64>() {
            Ok(v) => Token::Int(v),
            Err(_) => text
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| ExpressionError::InvalidNumber(text.to_string()))?,
        }
    };

    Ok((token, i))
}

fn lex_string(
    chars: &[(usize, char)],
    start: usize,
    quote: char,
) -> Result<(String, usize), ExpressionError> {
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i].1;
        if c == '\\' {
            match chars.get(i + 1).map(|(_, c)| *c) {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some(other) => text.push(other),
                None => break,
            }
            i += 2;
            continue;
        }
        if c == quote {
            return Ok((text, i + 1));
        }
        text.push(c);
        i += 1;
    }

    Err(ExpressionError::UnterminatedString {
        offset: chars[start].0,
    })
}

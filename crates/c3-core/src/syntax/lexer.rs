//! The lexer.
//!
//! Lexes one source file into the three parallel token arenas and returns
//! the token handles in order, ending with an `EOF` token. Lexical errors
//! are reported through the global diagnostics and the offending input is
//! skipped.

use crate::context::GlobalContext;
use crate::ids::TokenId;
use crate::source::SourceId;
use crate::syntax::token::{SourceLoc, TokenData, TokenType};

/// Lex an entire source file into the token arenas.
pub fn lex_file(ctx: &mut GlobalContext, source_id: SourceId) -> Vec<TokenId> {
    let content = ctx
        .sources
        .get(source_id)
        .expect("lexing an unloaded source")
        .content
        .clone();
    let mut lexer = Lexer {
        source_id,
        bytes: content.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    loop {
        match lexer.next_token(ctx) {
            Some(tok) => {
                let ty = ctx.token_type(tok);
                tokens.push(tok);
                if ty == TokenType::Eof {
                    break;
                }
            }
            None => continue,
        }
    }
    tokens
}

struct Lexer<'a> {
    source_id: SourceId,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> u8 {
        *self.bytes.get(self.pos).unwrap_or(&0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        *self.bytes.get(self.pos + offset).unwrap_or(&0)
    }

    fn bump(&mut self) -> u8 {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.pos += 1;
                }
                b'/' if self.peek_at(1) == b'/' => {
                    while !self.at_end() && self.peek() != b'\n' {
                        self.pos += 1;
                    }
                }
                b'/' if self.peek_at(1) == b'*' => {
                    self.pos += 2;
                    while !self.at_end() && !(self.peek() == b'*' && self.peek_at(1) == b'/') {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.bytes.len());
                }
                _ => return,
            }
        }
    }

    fn loc(&self, start: usize) -> SourceLoc {
        SourceLoc {
            source: self.source_id,
            start: start as u32,
            len: (self.pos - start) as u32,
        }
    }

    fn text(&self, start: usize) -> &str {
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("")
    }

    /// Lex the next token. Returns `None` when an invalid character was
    /// skipped; the caller retries.
    fn next_token(&mut self, ctx: &mut GlobalContext) -> Option<TokenId> {
        self.skip_trivia();
        let start = self.pos;

        if self.at_end() {
            return Some(ctx.alloc_token(TokenType::Eof, TokenData::None, self.loc(start)));
        }

        let c = self.bump();
        let ty = match c {
            b'(' => TokenType::LParen,
            b')' => TokenType::RParen,
            b'{' => TokenType::LBrace,
            b'}' => TokenType::RBrace,
            b'[' => TokenType::LBracket,
            b']' => TokenType::RBracket,
            b',' => TokenType::Comma,
            b';' => TokenType::Semi,
            b':' => TokenType::Colon,
            b'.' => TokenType::Dot,
            b'@' => TokenType::At,
            b'+' => TokenType::Plus,
            b'*' => TokenType::Star,
            b'/' => TokenType::Slash,
            b'%' => TokenType::Percent,
            b'^' => TokenType::Caret,
            b'?' => TokenType::Question,
            b'-' => {
                if self.peek() == b'>' {
                    self.bump();
                    TokenType::Arrow
                } else {
                    TokenType::Minus
                }
            }
            b'=' => {
                if self.peek() == b'=' {
                    self.bump();
                    TokenType::EqEq
                } else {
                    TokenType::Eq
                }
            }
            b'!' => {
                if self.peek() == b'=' {
                    self.bump();
                    TokenType::NotEq
                } else {
                    TokenType::Bang
                }
            }
            b'<' => {
                if self.peek() == b'=' {
                    self.bump();
                    TokenType::LtEq
                } else {
                    TokenType::Lt
                }
            }
            b'>' => {
                if self.peek() == b'=' {
                    self.bump();
                    TokenType::GtEq
                } else {
                    TokenType::Gt
                }
            }
            b'&' => {
                if self.peek() == b'&' {
                    self.bump();
                    TokenType::AmpAmp
                } else {
                    TokenType::Amp
                }
            }
            b'|' => {
                if self.peek() == b'|' {
                    self.bump();
                    TokenType::PipePipe
                } else {
                    TokenType::Pipe
                }
            }
            b'$' => return Some(self.lex_ct_directive(ctx, start)),
            b'"' => return Some(self.lex_string(ctx, start)),
            b'\'' => return Some(self.lex_char(ctx, start)),
            b'0'..=b'9' => return Some(self.lex_number(ctx, start)),
            c if c == b'_' || c.is_ascii_alphabetic() => {
                return Some(self.lex_ident(ctx, start));
            }
            other => {
                let loc = self.loc(start);
                ctx.diagnostics.error(
                    loc.span(),
                    format!("unexpected character '{}'", other as char),
                );
                return None;
            }
        };
        Some(ctx.alloc_token(ty, TokenData::None, self.loc(start)))
    }

    fn lex_ident(&mut self, ctx: &mut GlobalContext, start: usize) -> TokenId {
        while self.peek() == b'_' || self.peek().is_ascii_alphanumeric() {
            self.bump();
        }
        let text = self.text(start);
        if let Some(keyword) = TokenType::keyword(text) {
            return ctx.alloc_token(keyword, TokenData::None, self.loc(start));
        }
        // All-caps identifiers (ignoring digits and underscores) are
        // compile-time constant identifiers.
        let ty = if text
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        {
            TokenType::ConstIdent
        } else {
            TokenType::Ident
        };
        let name = ctx.intern(text);
        ctx.alloc_token(ty, TokenData::Name(name), self.loc(start))
    }

    fn lex_number(&mut self, ctx: &mut GlobalContext, start: usize) -> TokenId {
        while self.peek().is_ascii_digit() || self.peek() == b'_' {
            self.bump();
        }
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.bump();
            while self.peek().is_ascii_digit() {
                self.bump();
            }
            let value: f64 = self.text(start).replace('_', "").parse().unwrap_or(0.0);
            return ctx.alloc_token(TokenType::Real, TokenData::Real(value), self.loc(start));
        }
        let text = self.text(start).replace('_', "");
        match text.parse::<u64>() {
            Ok(value) => ctx.alloc_token(TokenType::Integer, TokenData::Int(value), self.loc(start)),
            Err(_) => {
                let loc = self.loc(start);
                ctx.diagnostics
                    .error(loc.span(), format!("integer literal '{}' out of range", text));
                ctx.alloc_token(TokenType::Integer, TokenData::Int(0), loc)
            }
        }
    }

    fn lex_string(&mut self, ctx: &mut GlobalContext, start: usize) -> TokenId {
        let mut value = String::new();
        loop {
            if self.at_end() || self.peek() == b'\n' {
                let loc = self.loc(start);
                ctx.diagnostics.error(loc.span(), "unterminated string literal");
                return ctx.alloc_token(TokenType::String, TokenData::Str(value), loc);
            }
            match self.bump() {
                b'"' => break,
                b'\\' => {
                    let escaped = self.bump();
                    value.push(match escaped {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        b'0' => '\0',
                        other => other as char,
                    });
                }
                other => value.push(other as char),
            }
        }
        ctx.alloc_token(TokenType::String, TokenData::Str(value), self.loc(start))
    }

    fn lex_char(&mut self, ctx: &mut GlobalContext, start: usize) -> TokenId {
        let c = match self.bump() {
            b'\\' => match self.bump() {
                b'n' => b'\n',
                b't' => b'\t',
                b'0' => 0,
                other => other,
            },
            other => other,
        };
        if self.peek() == b'\'' {
            self.bump();
        } else {
            let loc = self.loc(start);
            ctx.diagnostics.error(loc.span(), "unterminated character literal");
        }
        ctx.alloc_token(TokenType::CharLit, TokenData::Int(c as u64), self.loc(start))
    }

    fn lex_ct_directive(&mut self, ctx: &mut GlobalContext, start: usize) -> TokenId {
        while self.peek() == b'_' || self.peek().is_ascii_alphanumeric() {
            self.bump();
        }
        let text = self.text(start);
        match text {
            "$assert" => ctx.alloc_token(TokenType::CtAssert, TokenData::None, self.loc(start)),
            _ => {
                let loc = self.loc(start);
                ctx.diagnostics.error(
                    loc.span(),
                    format!("unknown compile-time directive '{}'", text),
                );
                ctx.alloc_token(TokenType::Invalid, TokenData::None, loc)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (GlobalContext, Vec<TokenId>) {
        let mut ctx = GlobalContext::new(None, 1024);
        let id = ctx.sources.add_inline(source);
        let tokens = lex_file(&mut ctx, id);
        (ctx, tokens)
    }

    fn names(ctx: &GlobalContext, tokens: &[TokenId]) -> Vec<&'static str> {
        tokens.iter().map(|&t| ctx.token_type(t).name()).collect()
    }

    #[test]
    fn test_lex_main_function() {
        let (ctx, tokens) = lex("fn int main() { return 0; }");
        assert_eq!(
            names(&ctx, &tokens),
            vec![
                "FN", "INT", "IDENT", "LPAREN", "RPAREN", "LBRACE", "RETURN", "INTEGER", "SEMI",
                "RBRACE", "EOF"
            ]
        );
    }

    #[test]
    fn test_lex_module_decl() {
        let (ctx, tokens) = lex("module mod.a;");
        assert_eq!(
            names(&ctx, &tokens),
            vec!["MODULE", "IDENT", "DOT", "IDENT", "SEMI", "EOF"]
        );
    }

    #[test]
    fn test_lex_const_ident() {
        let (ctx, tokens) = lex("MAX_SIZE max_size");
        assert_eq!(ctx.token_type(tokens[0]), TokenType::ConstIdent);
        assert_eq!(ctx.token_type(tokens[1]), TokenType::Ident);
    }

    #[test]
    fn test_lex_literals_and_data() {
        let (ctx, tokens) = lex("42 3.5 \"hi\\n\"");
        assert_eq!(ctx.token_type(tokens[0]), TokenType::Integer);
        assert_eq!(ctx.token_data(tokens[0]).as_int(), Some(42));
        assert_eq!(ctx.token_type(tokens[1]), TokenType::Real);
        assert_eq!(ctx.token_type(tokens[2]), TokenType::String);
        match ctx.token_data(tokens[2]) {
            TokenData::Str(s) => assert_eq!(s, "hi\n"),
            other => panic!("expected string data, got {:?}", other),
        }
    }

    #[test]
    fn test_lex_skips_comments() {
        let (ctx, tokens) = lex("// comment\nfn /* block */ main");
        assert_eq!(names(&ctx, &tokens), vec!["FN", "IDENT", "EOF"]);
    }

    #[test]
    fn test_lex_ct_assert() {
        let (ctx, tokens) = lex("$assert(1 == 1);");
        assert_eq!(ctx.token_type(tokens[0]), TokenType::CtAssert);
    }

    #[test]
    fn test_invalid_char_reports_error() {
        let (ctx, tokens) = lex("fn # main");
        assert!(ctx.diagnostics.has_errors());
        assert_eq!(names(&ctx, &tokens), vec!["FN", "IDENT", "EOF"]);
    }

    #[test]
    fn test_interned_idents_share_names() {
        let (ctx, tokens) = lex("foo foo");
        let a = ctx.token_data(tokens[0]).as_name().unwrap();
        let b = ctx.token_data(tokens[1]).as_name().unwrap();
        assert_eq!(a, b);
    }
}

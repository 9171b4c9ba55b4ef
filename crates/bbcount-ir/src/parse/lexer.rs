//! Tokenizer for textual IR, built with logos.

use std::ops::Range;

use logos::Logos;

/// Token of the textual IR.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r";[^\n]*")]
pub enum Token {
    #[regex(r"@[-a-zA-Z$._0-9]+", |lex| lex.slice()[1..].to_owned())]
    #[regex(r#"@"[^"]*""#, |lex| unquote(&lex.slice()[1..]))]
    GlobalIdent(String),

    #[regex(r"%[-a-zA-Z$._0-9]+", |lex| lex.slice()[1..].to_owned())]
    #[regex(r#"%"[^"]*""#, |lex| unquote(&lex.slice()[1..]))]
    LocalIdent(String),

    #[regex(r"[-a-zA-Z$._0-9]+:", |lex| strip_colon(lex.slice()).to_owned())]
    #[regex(r#""[^"]*":"#, |lex| unquote(strip_colon(lex.slice())))]
    Label(String),

    #[regex(r"![0-9]+", |lex| lex.slice()[1..].parse::<u32>().ok())]
    MetadataRef(u32),

    #[regex(r"![-a-zA-Z$._][-a-zA-Z$._0-9]*", |lex| lex.slice()[1..].to_owned())]
    MetadataName(String),

    #[regex(r"#[0-9]+")]
    AttrRef,

    #[regex(r"\$[-a-zA-Z$._0-9]+")]
    ComdatRef,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.]*", |lex| lex.slice().to_owned())]
    Ident(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""[^"]*""#, |lex| unquote(lex.slice()))]
    Str(String),

    #[token("=")]
    Equals,

    #[token(",")]
    Comma,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("<")]
    LAngle,

    #[token(">")]
    RAngle,

    #[token("*")]
    Star,

    #[token("...")]
    Ellipsis,

    #[token("!")]
    Bang,

    #[token("|")]
    Pipe,
}

fn unquote(quoted: &str) -> String {
    quoted[1..quoted.len() - 1].to_owned()
}

fn strip_colon(label: &str) -> &str {
    &label[..label.len() - 1]
}

/// Token with its byte range in the source.
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// Tokenize `source`. On failure, returns the byte offset of the bad input.
pub fn lex(source: &str) -> Result<Vec<Spanned>, usize> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(Spanned { token, span }),
            Err(()) => return Err(span.start),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_lex_instruction() {
        assert_eq!(
            kinds("%x = alloca i64, align 8 ; trailing comment"),
            vec![
                Token::LocalIdent("x".into()),
                Token::Equals,
                Token::Ident("alloca".into()),
                Token::Ident("i64".into()),
                Token::Comma,
                Token::Ident("align".into()),
                Token::Int(8),
            ]
        );
    }

    #[test]
    fn test_lex_labels_and_metadata() {
        assert_eq!(
            kinds("entry:\n  br label %exit, !dbg !12\n"),
            vec![
                Token::Label("entry".into()),
                Token::Ident("br".into()),
                Token::Ident("label".into()),
                Token::LocalIdent("exit".into()),
                Token::Comma,
                Token::MetadataName("dbg".into()),
                Token::MetadataRef(12),
            ]
        );
    }

    #[test]
    fn test_lex_quoted_names() {
        assert_eq!(
            kinds(r#"@"odd name" %"v 1" "bb 2":"#),
            vec![
                Token::GlobalIdent("odd name".into()),
                Token::LocalIdent("v 1".into()),
                Token::Label("bb 2".into()),
            ]
        );
    }

    #[test]
    fn test_lex_numbers() {
        assert_eq!(
            kinds("-5 42 %0 1:"),
            vec![
                Token::Int(-5),
                Token::Int(42),
                Token::LocalIdent("0".into()),
                Token::Label("1".into()),
            ]
        );
    }

    #[test]
    fn test_lex_debug_info_flags() {
        assert_eq!(
            kinds("spFlags: DISPFlagDefinition | DISPFlagOptimized"),
            vec![
                Token::Label("spFlags".into()),
                Token::Ident("DISPFlagDefinition".into()),
                Token::Pipe,
                Token::Ident("DISPFlagOptimized".into()),
            ]
        );
    }

    #[test]
    fn test_lex_error_offset() {
        assert_eq!(lex("ret void ^").unwrap_err(), 9);
    }
}

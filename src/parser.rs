//! Input line parser.
//!
//! Turns one raw line into an [`Ast`]. Grammar of [`LineParser`]:
//!
//! ```text
//! line     := command (';' command)* ';'?
//! command  := '/'? name word*
//! word     := '--' name ('=' value)?  | value
//! value    := bare | 'single quoted' | "double \"quoted\""
//! ```
//!
//! `--flag` without a value is a named argument with value `"true"`.

use thiserror::Error;

use crate::core::message::{Arg, Ast, CommandNode};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),

    #[error("trailing escape character")]
    TrailingEscape,

    #[error("empty command at position {0}")]
    EmptyCommand(usize),

    #[error("missing argument name in '{0}'")]
    EmptyArgName(String),
}

/// Converts a raw input line into commands.
pub trait Parser {
    fn parse(&self, raw: &str) -> Result<Ast, ParseError>;
}

/// Default whitespace/quote/semicolon parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineParser;

#[derive(Debug, PartialEq)]
enum Token {
    /// Word and whether any part of it was quoted
    Word(String, bool),
    Separator(usize),
}

impl LineParser {
    fn tokenize(raw: &str) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut quoted = false;
        let mut in_word = false;
        let mut chars = raw.char_indices().peekable();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                ';' => {
                    if in_word {
                        tokens.push(Token::Word(std::mem::take(&mut current), quoted));
                        in_word = false;
                        quoted = false;
                    }
                    tokens.push(Token::Separator(pos));
                }
                c if c.is_whitespace() => {
                    if in_word {
                        tokens.push(Token::Word(std::mem::take(&mut current), quoted));
                        in_word = false;
                        quoted = false;
                    }
                }
                '\'' => {
                    in_word = true;
                    quoted = true;
                    loop {
                        match chars.next() {
                            Some((_, '\'')) => break,
                            Some((_, c)) => current.push(c),
                            None => return Err(ParseError::UnterminatedQuote('\'')),
                        }
                    }
                }
                '"' => {
                    in_word = true;
                    quoted = true;
                    loop {
                        match chars.next() {
                            Some((_, '"')) => break,
                            Some((_, '\\')) => match chars.next() {
                                Some((_, c)) => current.push(c),
                                None => return Err(ParseError::UnterminatedQuote('"')),
                            },
                            Some((_, c)) => current.push(c),
                            None => return Err(ParseError::UnterminatedQuote('"')),
                        }
                    }
                }
                '\\' => {
                    in_word = true;
                    match chars.next() {
                        Some((_, c)) => current.push(c),
                        None => return Err(ParseError::TrailingEscape),
                    }
                }
                c => {
                    in_word = true;
                    current.push(c);
                }
            }
        }
        if in_word {
            tokens.push(Token::Word(current, quoted));
        }
        Ok(tokens)
    }

    fn build_command(words: Vec<(String, bool)>, at: usize) -> Result<CommandNode, ParseError> {
        let mut words = words.into_iter();
        let (name, _) = words.next().ok_or(ParseError::EmptyCommand(at))?;
        let name = name.strip_prefix('/').unwrap_or(&name).to_string();
        if name.is_empty() {
            return Err(ParseError::EmptyCommand(at));
        }

        let mut argv = Vec::new();
        for (word, quoted) in words {
            match word.strip_prefix("--") {
                Some(rest) if !quoted => {
                    let (arg_name, value) = match rest.split_once('=') {
                        Some((n, v)) => (n, v),
                        None => (rest, "true"),
                    };
                    if arg_name.is_empty() {
                        return Err(ParseError::EmptyArgName(word.clone()));
                    }
                    argv.push(Arg::Named {
                        name: arg_name.to_string(),
                        value: value.to_string(),
                    });
                }
                _ => argv.push(Arg::Positional(word)),
            }
        }
        Ok(CommandNode::new(name, argv))
    }
}

impl Parser for LineParser {
    fn parse(&self, raw: &str) -> Result<Ast, ParseError> {
        let mut commands = Vec::new();
        let mut words = Vec::new();
        let mut start = 0;

        for token in Self::tokenize(raw)? {
            match token {
                Token::Word(word, quoted) => words.push((word, quoted)),
                Token::Separator(pos) => {
                    commands.push(Self::build_command(std::mem::take(&mut words), start)?);
                    start = pos + 1;
                }
            }
        }
        // A trailing separator is allowed; an empty line is not.
        if !words.is_empty() || commands.is_empty() {
            commands.push(Self::build_command(words, start)?);
        }

        if commands.len() == 1 {
            Ok(Ast::Command(commands.remove(0)))
        } else {
            Ok(Ast::Sequence(commands.into_iter().map(Ast::Command).collect()))
        }
    }
}

//! Maximal-munch lexical analysis.
//!
//! The lexer is driven by a deterministic automaton obtained by unioning the
//! per-class automata (comment, identifier, string, ...) and running subset
//! construction over the result. It always extends the current lexeme as far
//! as the automaton allows and falls back to the longest accepted prefix
//! when it hits a dead end.

use crate::token::{Token, TokenKind};
use magpie_automata::{
    automaton::{Automaton, AutomatonError},
    types::Map,
};
use std::borrow::Cow;

/// Maps an accepting DFA state to the token kind it produces.
pub trait Classify {
    fn classify(&self, state: &str) -> Option<TokenKind>;
}

impl<F> Classify for F
where
    F: Fn(&str) -> Option<TokenKind>,
{
    fn classify(&self, state: &str) -> Option<TokenKind> {
        (self)(state)
    }
}

/// Classification by token-class membership.
///
/// Register each class automaton before it goes into the union: the names of
/// its accepting states are remembered under the class's kind. Combined DFA
/// state names are concatenations of constituent names, so splitting them
/// recovers which classes contributed an accepting state; when several did,
/// the highest-priority kind wins.
#[derive(Debug, Default)]
pub struct TokenClasses {
    finals: Map<String, TokenKind>,
}

impl TokenClasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: &Automaton<()>, kind: TokenKind) {
        for name in class.finals() {
            self.finals.insert(name.to_owned(), kind);
        }
    }
}

impl Classify for TokenClasses {
    fn classify(&self, state: &str) -> Option<TokenKind> {
        state
            .split('+')
            .filter_map(|part| self.finals.get(part).copied())
            .min_by_key(|kind| kind.priority())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LexicalError {
    #[error("no token matches the input at offset {offset}")]
    NoToken { offset: usize },

    #[error("input ends in the middle of a token starting at offset {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("accepting state `{state}' belongs to no token class")]
    Unclassified { state: String },

    #[error(transparent)]
    Automaton(#[from] AutomatonError),
}

/// The maximal-munch tokenizer.
#[derive(Debug)]
pub struct Lexer<'d, C> {
    dfa: &'d Automaton<()>,
    classes: C,
}

impl<'d, C> Lexer<'d, C>
where
    C: Classify,
{
    pub fn new(dfa: &'d Automaton<()>, classes: C) -> Self {
        Self { dfa, classes }
    }

    /// Tokenize the whole input. Any dead end without an accepting state
    /// since the current lexeme start is fatal; there are no partial
    /// results.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexicalError> {
        let chars: Vec<char> = input.chars().collect();
        let mut tokens = Vec::new();

        let mut state = self.dfa.start();
        let mut lexeme_start = 0;
        // the most recent accepting state seen since `lexeme_start`
        let mut last_final: Option<(&str, usize)> = None;

        let mut index = 0;
        while index < chars.len() {
            let symbol = transition_symbol(chars[index]);
            match self.dfa.successor(state, &symbol)? {
                Some(next) => {
                    state = next;
                    if self.dfa.is_final(next) {
                        last_final = Some((next, index));
                    }
                    index += 1;
                }
                None => {
                    // dead end: fall back to the longest accepted prefix and
                    // re-process everything after it, current character
                    // included
                    let (accepted, end) = last_final
                        .take()
                        .ok_or(LexicalError::NoToken { offset: index })?;
                    tokens.push(self.emit(&chars[lexeme_start..=end], accepted)?);
                    state = self.dfa.start();
                    lexeme_start = end + 1;
                    index = lexeme_start;
                }
            }
        }

        if lexeme_start < chars.len() {
            if !self.dfa.is_final(state) {
                return Err(LexicalError::UnexpectedEnd {
                    offset: lexeme_start,
                });
            }
            tokens.push(self.emit(&chars[lexeme_start..], state)?);
        }

        Ok(tokens)
    }

    fn emit(&self, lexeme: &[char], state: &str) -> Result<Token, LexicalError> {
        let kind = self
            .classes
            .classify(state)
            .ok_or_else(|| LexicalError::Unclassified {
                state: state.to_owned(),
            })?;
        let token = Token::new(kind, lexeme.iter().collect::<String>()).reclassify();
        tracing::trace!("emit {}", token);
        Ok(token)
    }
}

/// The symbol fed to the transition function for one input character.
/// Control characters are remapped to their two-character escapes because
/// the alphabet is defined over printable symbols.
fn transition_symbol(ch: char) -> Cow<'static, str> {
    match ch {
        '\u{0008}' => Cow::Borrowed("\\b"),
        '\t' => Cow::Borrowed("\\t"),
        '\n' => Cow::Borrowed("\\n"),
        '\r' => Cow::Borrowed("\\r"),
        _ => Cow::Owned(ch.to_string()),
    }
}

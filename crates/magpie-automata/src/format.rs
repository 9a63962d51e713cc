//! The line-oriented automaton description format.
//!
//! In order: a state count; one `<id> <payload>` line per state (the payload
//! encoding is chosen by the [`Payload`] impl and may be empty); a line
//! naming the start state; a line listing the final state ids; then one
//! `<from> <to> <symbol>` line per transition. Transition fields are
//! separated by single spaces and the symbol is taken verbatim (a lone space
//! is a valid symbol); a missing symbol field denotes an epsilon edge.
//!
//! Loading from a file prepends the file's base name to every state id, so
//! automata produced by different description files can be unioned without
//! name collisions.

use crate::{
    automaton::{Automaton, EPSILON},
    types::{Map, Set},
};
use std::{fmt, fs, path::Path};

/// Encoding of one state's annotation payload within its state line.
pub trait Payload: Sized {
    fn decode(payload: &str) -> Result<Self, PayloadError>;

    /// Render the payload; an empty string stands for "no payload".
    fn encode(&self) -> String;
}

impl Payload for () {
    fn decode(payload: &str) -> Result<Self, PayloadError> {
        if !payload.is_empty() {
            return Err(PayloadError(format!(
                "unexpected payload `{}' on an annotation-free state",
                payload
            )));
        }
        Ok(())
    }

    fn encode(&self) -> String {
        String::new()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PayloadError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("IO error: {}", _0)]
    Io(#[from] std::io::Error),

    #[error("line {line}: {msg}")]
    Malformed { line: usize, msg: String },

    #[error("line {line}: reference to unknown state `{name}'")]
    DanglingState { line: usize, name: String },

    #[error("line {line}: bad annotation payload: {source}")]
    Payload { line: usize, source: PayloadError },

    #[error("unexpected end of description, missing {0}")]
    UnexpectedEnd(&'static str),
}

impl<A> Automaton<A>
where
    A: Payload,
{
    /// Load a description file, namespacing state ids with the file's base
    /// name.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let namespace = path.file_stem().and_then(|stem| stem.to_str());
        Self::deserialize(&source, namespace)
    }

    pub fn deserialize(source: &str, namespace: Option<&str>) -> Result<Self, FormatError> {
        let qualify = |id: &str| match namespace {
            Some(ns) => format!("{}.{}", ns, id),
            None => id.to_owned(),
        };
        let mut lines = source.lines().enumerate().map(|(i, line)| (i + 1, line));

        let (line, count) = lines.next().ok_or(FormatError::UnexpectedEnd("state count"))?;
        let count: usize = count.trim().parse().map_err(|_| FormatError::Malformed {
            line,
            msg: format!("expected a state count, found `{}'", count),
        })?;

        let mut states: Map<String, A> = Map::default();
        for _ in 0..count {
            let (line, text) = lines.next().ok_or(FormatError::UnexpectedEnd("state line"))?;
            let (id, payload) = match text.split_once(char::is_whitespace) {
                Some((id, payload)) => (id, payload.trim()),
                None => (text.trim(), ""),
            };
            if id.is_empty() {
                return Err(FormatError::Malformed {
                    line,
                    msg: "empty state id".to_owned(),
                });
            }
            let annotation =
                A::decode(payload).map_err(|source| FormatError::Payload { line, source })?;
            if states.insert(qualify(id), annotation).is_some() {
                return Err(FormatError::Malformed {
                    line,
                    msg: format!("duplicate state `{}'", id),
                });
            }
        }

        let (line, text) = lines.next().ok_or(FormatError::UnexpectedEnd("start state"))?;
        let start = qualify(text.trim());
        if !states.contains_key(&start) {
            return Err(FormatError::DanglingState { line, name: start });
        }

        let (line, text) = lines
            .next()
            .ok_or(FormatError::UnexpectedEnd("final states"))?;
        let mut finals = Set::default();
        for id in text.split_whitespace() {
            let name = qualify(id);
            if !states.contains_key(&name) {
                return Err(FormatError::DanglingState { line, name });
            }
            finals.insert(name);
        }

        let mut edges: Map<String, Map<String, Set<String>>> = Map::default();
        let mut alphabet = Set::default();
        for (line, text) in lines {
            if text.trim().is_empty() {
                continue;
            }
            // single-space field separators; the third field is the symbol,
            // taken verbatim, so that a literal space can label a transition
            let mut fields = text.splitn(3, ' ');
            let from = fields.next().unwrap_or_default();
            let to = fields.next().unwrap_or_default();
            if from.is_empty() || to.is_empty() {
                return Err(FormatError::Malformed {
                    line,
                    msg: "transition needs at least a source and a target".to_owned(),
                });
            }
            let (from, to) = (qualify(from), qualify(to));
            let symbol = fields.next().unwrap_or(EPSILON);
            for name in [&from, &to] {
                if !states.contains_key(name) {
                    return Err(FormatError::DanglingState {
                        line,
                        name: name.clone(),
                    });
                }
            }
            if symbol != EPSILON {
                alphabet.insert(symbol.to_owned());
            }
            edges
                .entry(from)
                .or_default()
                .entry(symbol.to_owned())
                .or_default()
                .insert(to);
        }

        Ok(Automaton {
            states,
            start,
            finals,
            edges,
            alphabet,
        })
    }

    /// Render this automaton back into the description format. Re-reading the
    /// result reconstructs a structurally equivalent automaton.
    pub fn description(&self) -> Description<'_, A> {
        Description { automaton: self }
    }

    pub fn serialize(&self) -> String {
        self.description().to_string()
    }
}

/// Displays an automaton in the description format.
pub struct Description<'a, A> {
    automaton: &'a Automaton<A>,
}

impl<A> fmt::Display for Description<'_, A>
where
    A: Payload,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.automaton;
        writeln!(f, "{}", a.states.len())?;
        for (name, annotation) in &a.states {
            let payload = annotation.encode();
            if payload.is_empty() {
                writeln!(f, "{}", name)?;
            } else {
                writeln!(f, "{} {}", name, payload)?;
            }
        }
        writeln!(f, "{}", a.start)?;
        for (i, name) in a.finals.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", name)?;
        }
        writeln!(f)?;
        for (from, by_symbol) in &a.edges {
            for (symbol, targets) in by_symbol {
                for to in targets {
                    if symbol == EPSILON {
                        writeln!(f, "{} {}", from, to)?;
                    } else {
                        writeln!(f, "{} {} {}", from, to, symbol)?;
                    }
                }
            }
        }
        Ok(())
    }
}

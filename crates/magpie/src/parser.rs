//! The table-driven shift-reduce parser.

use crate::{cst::CstNode, table::ReduceMap, token::Token};
use magpie_automata::automaton::{Automaton, AutomatonError};

/// Sentinel symbols bracketing the parser input.
pub const BOF: &str = "BOF";
pub const EOF: &str = "EOF";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input is rejected: the current state has neither a reduce action
    /// nor a shift edge for the lookahead.
    #[error("syntax error: unexpected `{symbol}' in state `{state}'")]
    Syntax { state: String, symbol: String },

    /// A reduce succeeded but the exposed state has no goto edge for the
    /// rule's left-hand side. A defect in the table build, not in the input.
    #[error("inconsistent parse table: no goto on `{symbol}' from state `{state}'")]
    MissingGoto { state: String, symbol: String },

    /// An edge the table promises to be unique is not.
    #[error("inconsistent parse table: {0}")]
    Table(#[from] AutomatonError),

    /// A reduce wants more entries than the stacks hold; again a table
    /// defect.
    #[error("parse stack exhausted while reducing `{rule}'")]
    StackUnderflow { rule: String },

    #[error("parsing finished with an unexpected stack shape: {detail}")]
    UnexpectedStackShape { detail: String },

    #[error("parsed a `{found}' where the start symbol `{expected}' was expected")]
    WrongStartSymbol { found: String, expected: String },
}

/// The shift-reduce engine: two parallel stacks (table states and CST
/// nodes) driven by the parse-table automaton, building the tree bottom-up.
#[derive(Debug)]
pub struct Parser<'t> {
    table: &'t Automaton<ReduceMap>,
    start_symbol: String,
}

impl<'t> Parser<'t> {
    pub fn new(table: &'t Automaton<ReduceMap>, start_symbol: impl Into<String>) -> Self {
        Self {
            table,
            start_symbol: start_symbol.into(),
        }
    }

    /// Parse a token stream into its concrete syntax tree.
    ///
    /// Ignorable tokens are dropped, the rest are reduced to their parsing
    /// symbol and bracketed with the BOF/EOF sentinels. Every decision is
    /// made from the current state and one lookahead symbol; nothing is
    /// ever re-read or undone, which is sound because the table was built
    /// conflict-free.
    pub fn parse(&self, tokens: &[Token]) -> Result<CstNode, ParseError> {
        let mut input: Vec<(&str, &str)> = Vec::with_capacity(tokens.len() + 2);
        input.push((BOF, ""));
        input.extend(
            tokens
                .iter()
                .filter(|token| !token.kind().is_ignorable())
                .map(|token| (token.parse_symbol(), token.lexeme())),
        );
        input.push((EOF, ""));

        let mut states: Vec<&str> = vec![self.table.start()];
        let mut nodes: Vec<CstNode> = Vec::new();

        let mut cursor = 0;
        while cursor < input.len() {
            let (symbol, lexeme) = input[cursor];
            let current = *states.last().expect("the state stack never drains");

            let reduce = self
                .table
                .annotation(current)
                .and_then(|actions| actions.get(symbol));

            if let Some(rule) = reduce {
                tracing::trace!("reduce by `{}' on lookahead `{}'", rule, symbol);
                let arity = rule.right().len();
                if states.len() <= arity || nodes.len() < arity {
                    return Err(ParseError::StackUnderflow {
                        rule: rule.to_string(),
                    });
                }
                states.truncate(states.len() - arity);
                let children = nodes.split_off(nodes.len() - arity);

                let exposed = *states.last().expect("the start state stays put");
                let next = self.table.successor(exposed, rule.left())?.ok_or_else(|| {
                    ParseError::MissingGoto {
                        state: exposed.to_owned(),
                        symbol: rule.left().to_owned(),
                    }
                })?;

                nodes.push(CstNode::interior(rule.left(), children));
                states.push(next);
                // the cursor does not advance on a reduce
            } else {
                match self.table.successor(current, symbol)? {
                    Some(next) => {
                        tracing::trace!("shift `{}' -> {}", symbol, next);
                        states.push(next);
                        nodes.push(CstNode::leaf(symbol, lexeme));
                        cursor += 1;
                    }
                    None => {
                        return Err(ParseError::Syntax {
                            state: current.to_owned(),
                            symbol: symbol.to_owned(),
                        });
                    }
                }
            }
        }

        // exactly the BOF leaf, the completed root, and the EOF leaf remain
        if nodes.len() != 3 {
            return Err(ParseError::UnexpectedStackShape {
                detail: format!("{} entries instead of 3", nodes.len()),
            });
        }
        let eof = nodes.pop().expect("length checked");
        let root = nodes.pop().expect("length checked");
        let bof = nodes.pop().expect("length checked");
        if bof.symbol() != BOF || eof.symbol() != EOF {
            return Err(ParseError::UnexpectedStackShape {
                detail: "sentinels out of place".to_owned(),
            });
        }
        if root.symbol() != self.start_symbol {
            return Err(ParseError::WrongStartSymbol {
                found: root.symbol().to_owned(),
                expected: self.start_symbol.clone(),
            });
        }
        Ok(root)
    }
}

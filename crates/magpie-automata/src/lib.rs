//! Annotated finite automata and the algorithms the compiler front end
//! builds on them: epsilon closure, union, subset construction, and the
//! line-oriented description format automata are exchanged in.

pub mod automaton;
pub mod format;
pub mod types;

mod subset;

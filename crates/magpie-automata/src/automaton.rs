//! The annotated automaton model.
//!
//! States are identified by name and carry an opaque annotation; the engine
//! never looks inside an annotation except through the [`Annotation`] merge
//! hook. The same model backs both the lexical DFA (annotation-free) and the
//! LR parse table (lookahead-to-rule maps).

use crate::types::{Map, Queue, Set};
use std::fmt;

/// The label of epsilon edges, in memory and in description files.
pub const EPSILON: &str = "";

/// Per-state data combined when constituent states are unioned into one
/// during subset construction.
pub trait Annotation: Sized {
    fn merge<'a, I>(parts: I) -> Result<Self, MergeError>
    where
        Self: 'a,
        I: IntoIterator<Item = &'a Self>;
}

impl Annotation for () {
    fn merge<'a, I>(_parts: I) -> Result<Self, MergeError>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        Ok(())
    }
}

/// Two constituent states disagree about the data attached to the same key.
///
/// For parse tables this is a grammar conflict: the same lookahead is mapped
/// to two different rules.
#[derive(Debug, thiserror::Error)]
#[error("conflicting annotations for `{key}': {left} vs {right}")]
pub struct MergeError {
    pub key: String,
    pub left: String,
    pub right: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AutomatonError {
    #[error("state `{state}' has {count} successors on `{symbol}', expected at most one")]
    NotDeterministic {
        state: String,
        symbol: String,
        count: usize,
    },
}

/// A finite automaton over string-named states and string symbols.
///
/// Instances are built once, by [`Automaton::define`], by deserialization, or
/// by `or`/`to_dfa` combination, and are read-only afterwards.
#[derive(Debug, Clone)]
pub struct Automaton<A> {
    pub(crate) states: Map<String, A>,
    pub(crate) start: String,
    pub(crate) finals: Set<String>,
    // from -> symbol -> targets
    pub(crate) edges: Map<String, Map<String, Set<String>>>,
    pub(crate) alphabet: Set<String>,
}

impl<A> Automaton<A> {
    /// Define an automaton using the specified function.
    pub fn define<F>(f: F) -> Result<Self, DefError>
    where
        F: FnOnce(&mut AutomatonDef<A>) -> Result<(), DefError>,
    {
        let mut def = AutomatonDef {
            states: Map::default(),
            start: None,
            finals: Set::default(),
            edges: Map::default(),
            alphabet: Set::default(),
        };
        f(&mut def)?;
        def.end()
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.states.keys().map(String::as_str)
    }

    pub fn annotation(&self, name: &str) -> Option<&A> {
        self.states.get(name)
    }

    pub fn is_final(&self, name: &str) -> bool {
        self.finals.contains(name)
    }

    pub fn finals(&self) -> impl Iterator<Item = &str> + '_ {
        self.finals.iter().map(String::as_str)
    }

    pub fn alphabet(&self) -> impl Iterator<Item = &str> + '_ {
        self.alphabet.iter().map(String::as_str)
    }

    /// All states reachable from `from` along an edge labeled `symbol`.
    pub fn targets(&self, from: &str, symbol: &str) -> impl Iterator<Item = &str> + '_ {
        self.edges
            .get(from)
            .and_then(|by_symbol| by_symbol.get(symbol))
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }

    /// The unique successor of `from` on `symbol` in a deterministic
    /// automaton. More than one successor means the automaton does not hold
    /// to the determinism contract the caller relied on.
    pub fn successor(&self, from: &str, symbol: &str) -> Result<Option<&str>, AutomatonError> {
        let mut targets = self.targets(from, symbol);
        let first = targets.next();
        let extra = targets.count();
        if extra > 0 {
            return Err(AutomatonError::NotDeterministic {
                state: from.to_owned(),
                symbol: symbol.to_owned(),
                count: extra + 1,
            });
        }
        Ok(first)
    }

    /// The set of states reachable from `seed` via zero or more epsilon
    /// edges.
    pub fn epsilon_closure<'s, I>(&'s self, seed: I) -> Set<&'s str>
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut queue = Queue::default();
        for name in seed {
            queue.push(name);
        }

        let mut closure = Set::default();
        while let Some(name) = queue.pop() {
            closure.insert(name);
            for target in self.targets(name, EPSILON) {
                queue.push(target);
            }
        }
        closure
    }

    /// Whether this automaton accepts the given symbol sequence, decided by
    /// closure-based simulation. Works on deterministic and
    /// non-deterministic automata alike.
    pub fn accepts(&self, input: &[&str]) -> bool {
        let mut current = self.epsilon_closure(Some(self.start.as_str()));
        for symbol in input {
            let mut moved: Set<&str> = Set::default();
            for state in &current {
                moved.extend(self.targets(state, symbol));
            }
            current = self.epsilon_closure(moved);
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|name| self.finals.contains(*name))
    }

    /// Produce the combined state standing for a set of constituent states:
    /// the canonical (sorted) concatenation of their names plus the merged
    /// annotation.
    pub fn combine(&self, constituents: &Set<&str>) -> Result<(String, A), MergeError>
    where
        A: Annotation,
    {
        let mut names: Vec<&str> = constituents.iter().copied().collect();
        names.sort_unstable();
        let annotation = A::merge(names.iter().map(|name| &self.states[*name]))?;
        Ok((names.join("+"), annotation))
    }
}

impl<A> Automaton<A>
where
    A: Clone + Default,
{
    /// The union of two automata: a fresh start state epsilon-transitions to
    /// both operands' starts; everything else is carried over unchanged.
    /// Operand state names must be disjoint, which holds for automata loaded
    /// from distinct description files (their names are namespaced).
    pub fn or(&self, other: &Self) -> Self {
        debug_assert!(
            other.states.keys().all(|name| !self.contains(name)),
            "operand state names must be disjoint"
        );

        let start = format!("({}|{})", self.start, other.start);

        let mut states = self.states.clone();
        states.extend(other.states.iter().map(|(k, v)| (k.clone(), v.clone())));
        states.insert(start.clone(), A::default());

        let mut finals = self.finals.clone();
        finals.extend(other.finals.iter().cloned());

        let mut edges = self.edges.clone();
        edges.extend(other.edges.iter().map(|(k, v)| (k.clone(), v.clone())));
        let eps = edges.entry(start.clone()).or_default();
        eps.entry(EPSILON.to_owned())
            .or_default()
            .extend([self.start.clone(), other.start.clone()]);

        let mut alphabet = self.alphabet.clone();
        alphabet.extend(other.alphabet.iter().cloned());

        Self {
            states,
            start,
            finals,
            edges,
            alphabet,
        }
    }
}

// The alphabet is derived from the transition function and deliberately left
// out of structural equivalence.
impl<A: PartialEq> PartialEq for Automaton<A> {
    fn eq(&self, other: &Self) -> bool {
        self.states == other.states
            && self.start == other.start
            && self.finals == other.finals
            && self.edges == other.edges
    }
}

impl<A> fmt::Display for Automaton<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in self.states.keys() {
            write!(f, "- {}", name)?;
            if *name == self.start {
                write!(f, " (start)")?;
            }
            if self.finals.contains(name) {
                write!(f, " (final)")?;
            }
            writeln!(f)?;
            if let Some(by_symbol) = self.edges.get(name) {
                for (symbol, targets) in by_symbol {
                    for target in targets {
                        if symbol == EPSILON {
                            writeln!(f, "  - (epsilon) -> {}", target)?;
                        } else {
                            writeln!(f, "  - {} -> {}", symbol, target)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// The contextural values for building an `Automaton`.
#[derive(Debug)]
pub struct AutomatonDef<A> {
    states: Map<String, A>,
    start: Option<String>,
    finals: Set<String>,
    edges: Map<String, Map<String, Set<String>>>,
    alphabet: Set<String>,
}

impl<A> AutomatonDef<A> {
    /// Declare a state with its annotation.
    pub fn state(&mut self, name: &str, annotation: A) -> Result<(), DefError> {
        if self.states.contains_key(name) {
            return Err(DefError::DuplicateState(name.to_owned()));
        }
        self.states.insert(name.to_owned(), annotation);
        Ok(())
    }

    /// Designate the start state.
    pub fn start(&mut self, name: &str) -> Result<(), DefError> {
        if !self.states.contains_key(name) {
            return Err(DefError::UnknownState(name.to_owned()));
        }
        self.start.replace(name.to_owned());
        Ok(())
    }

    /// Mark a state as accepting.
    pub fn accept(&mut self, name: &str) -> Result<(), DefError> {
        if !self.states.contains_key(name) {
            return Err(DefError::UnknownState(name.to_owned()));
        }
        self.finals.insert(name.to_owned());
        Ok(())
    }

    /// Add a transition. The empty symbol denotes an epsilon edge.
    pub fn edge(&mut self, from: &str, to: &str, symbol: &str) -> Result<(), DefError> {
        if !self.states.contains_key(from) {
            return Err(DefError::UnknownState(from.to_owned()));
        }
        if !self.states.contains_key(to) {
            return Err(DefError::UnknownState(to.to_owned()));
        }
        if symbol != EPSILON {
            self.alphabet.insert(symbol.to_owned());
        }
        self.edges
            .entry(from.to_owned())
            .or_default()
            .entry(symbol.to_owned())
            .or_default()
            .insert(to.to_owned());
        Ok(())
    }

    fn end(self) -> Result<Automaton<A>, DefError> {
        let start = self.start.ok_or(DefError::MissingStart)?;
        Ok(Automaton {
            states: self.states,
            start,
            finals: self.finals,
            edges: self.edges,
            alphabet: self.alphabet,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DefError {
    #[error("the state `{0}' has already been defined")]
    DuplicateState(String),

    #[error("unknown state `{0}'")]
    UnknownState(String),

    #[error("no start state was designated")]
    MissingStart,
}

#[cfg(test)]
mod tests {
    use super::*;

    // start --a--> a1 --b--> ab2(final), plus an epsilon shortcut to a1
    fn sample() -> Automaton<()> {
        Automaton::define(|g| {
            g.state("s0", ())?;
            g.state("s1", ())?;
            g.state("s2", ())?;
            g.edge("s0", "s1", "a")?;
            g.edge("s0", "s1", "")?;
            g.edge("s1", "s2", "b")?;
            g.start("s0")?;
            g.accept("s2")
        })
        .unwrap()
    }

    #[test]
    fn epsilon_closure_follows_chains() {
        let a = Automaton::<()>::define(|g| {
            g.state("p", ())?;
            g.state("q", ())?;
            g.state("r", ())?;
            g.state("s", ())?;
            g.edge("p", "q", "")?;
            g.edge("q", "r", "")?;
            g.edge("r", "s", "x")?;
            g.start("p")?;
            g.accept("s")
        })
        .unwrap();

        let closure = a.epsilon_closure(Some("p"));
        assert_eq!(closure.len(), 3);
        assert!(closure.contains("p"));
        assert!(closure.contains("q"));
        assert!(closure.contains("r"));
        assert!(!closure.contains("s"));
    }

    #[test]
    fn acceptance_by_simulation() {
        let a = sample();
        assert!(a.accepts(&["a", "b"]));
        assert!(a.accepts(&["b"])); // via the epsilon shortcut
        assert!(!a.accepts(&["a"]));
        assert!(!a.accepts(&["a", "b", "b"]));
        assert!(!a.accepts(&["c"]));
    }

    #[test]
    fn union_accepts_both_languages() {
        let a = Automaton::<()>::define(|g| {
            g.state("a.s0", ())?;
            g.state("a.s1", ())?;
            g.edge("a.s0", "a.s1", "a")?;
            g.start("a.s0")?;
            g.accept("a.s1")
        })
        .unwrap();
        let b = Automaton::<()>::define(|g| {
            g.state("b.s0", ())?;
            g.state("b.s1", ())?;
            g.edge("b.s0", "b.s1", "b")?;
            g.start("b.s0")?;
            g.accept("b.s1")
        })
        .unwrap();

        let both = a.or(&b);
        assert!(both.accepts(&["a"]));
        assert!(both.accepts(&["b"]));
        assert!(!both.accepts(&["c"]));
        assert!(!both.accepts(&["a", "b"]));

        // operands are carried over unchanged
        assert_eq!(both.len(), a.len() + b.len() + 1);
    }

    #[test]
    fn successor_asserts_determinism() {
        let a = Automaton::<()>::define(|g| {
            g.state("s0", ())?;
            g.state("s1", ())?;
            g.state("s2", ())?;
            g.edge("s0", "s1", "a")?;
            g.edge("s0", "s2", "a")?;
            g.start("s0")?;
            g.accept("s1")
        })
        .unwrap();

        assert!(matches!(
            a.successor("s0", "a"),
            Err(AutomatonError::NotDeterministic { count: 2, .. })
        ));
        assert!(matches!(a.successor("s1", "a"), Ok(None)));
        assert!(matches!(a.successor("s0", "b"), Ok(None)));
    }

    #[test]
    fn combined_names_are_canonical() {
        let a = sample();
        let forward: Set<&str> = ["s0", "s2", "s1"].into_iter().collect();
        let backward: Set<&str> = ["s2", "s1", "s0"].into_iter().collect();
        let (n1, ()) = a.combine(&forward).unwrap();
        let (n2, ()) = a.combine(&backward).unwrap();
        assert_eq!(n1, "s0+s1+s2");
        assert_eq!(n1, n2);
    }

    #[test]
    fn define_rejects_bogus_references() {
        let err = Automaton::<()>::define(|g| {
            g.state("s0", ())?;
            g.edge("s0", "nowhere", "a")
        })
        .unwrap_err();
        assert!(matches!(err, DefError::UnknownState(name) if name == "nowhere"));

        let err = Automaton::<()>::define(|g| {
            g.state("s0", ())?;
            g.state("s0", ())
        })
        .unwrap_err();
        assert!(matches!(err, DefError::DuplicateState(..)));

        let err = Automaton::<()>::define(|g| g.state("s0", ())).unwrap_err();
        assert!(matches!(err, DefError::MissingStart));
    }
}

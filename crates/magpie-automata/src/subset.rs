//! Subset construction (NFA to DFA).

use crate::{
    automaton::{Annotation, Automaton, MergeError},
    types::{Map, Set},
};
use std::collections::VecDeque;

impl<A> Automaton<A>
where
    A: Annotation,
{
    /// Convert this automaton into an equivalent deterministic one.
    ///
    /// Every reachable set of constituent states becomes one combined state
    /// whose annotation is the merge of the constituents' annotations; a
    /// merge conflict (for parse tables, a grammar conflict) aborts the
    /// conversion. The result has no epsilon edges and at most one successor
    /// per state and symbol, which callers may rely on without re-checking.
    pub fn to_dfa(&self) -> Result<Automaton<A>, MergeError> {
        let mut builder = SubsetBuilder {
            nfa: self,
            states: Map::default(),
            finals: Set::default(),
            edges: Map::default(),
            pending: VecDeque::new(),
        };
        builder.run()
    }
}

struct SubsetBuilder<'n, A> {
    nfa: &'n Automaton<A>,
    states: Map<String, A>,
    finals: Set<String>,
    edges: Map<String, Map<String, Set<String>>>,
    // combined states whose outgoing edges have not been expanded yet
    pending: VecDeque<(String, Set<&'n str>)>,
}

impl<'n, A> SubsetBuilder<'n, A>
where
    A: Annotation,
{
    fn run(&mut self) -> Result<Automaton<A>, MergeError> {
        let nfa = self.nfa;

        let start_set = nfa.epsilon_closure(Some(nfa.start()));
        let start = self.intern(start_set)?;

        while let Some((name, constituents)) = self.pending.pop_front() {
            for symbol in nfa.alphabet() {
                let mut moved: Set<&str> = Set::default();
                for state in &constituents {
                    moved.extend(nfa.targets(state, symbol));
                }
                if moved.is_empty() {
                    continue;
                }

                let target = self.intern(nfa.epsilon_closure(moved))?;
                self.edges
                    .entry(name.clone())
                    .or_default()
                    .entry(symbol.to_owned())
                    .or_default()
                    .insert(target);
            }
        }

        tracing::debug!(
            nfa_states = nfa.len(),
            dfa_states = self.states.len(),
            "subset construction finished"
        );

        Ok(Automaton {
            states: std::mem::take(&mut self.states),
            start,
            finals: std::mem::take(&mut self.finals),
            edges: std::mem::take(&mut self.edges),
            alphabet: self.nfa.alphabet.clone(),
        })
    }

    /// Materialize the combined state for a constituent set, enqueueing it
    /// for expansion the first time the set is seen.
    fn intern(&mut self, constituents: Set<&'n str>) -> Result<String, MergeError> {
        let (name, annotation) = self.nfa.combine(&constituents)?;
        if self.states.contains_key(&name) {
            return Ok(name);
        }

        if constituents.iter().any(|state| self.nfa.is_final(state)) {
            self.finals.insert(name.clone());
        }
        tracing::trace!(state = %name, "materialize combined state");
        self.states.insert(name.clone(), annotation);
        self.pending.push_back((name.clone(), constituents));
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::EPSILON;

    // The classic (a|b)*abb, written down as an NFA with epsilon edges.
    fn abb_nfa() -> Automaton<()> {
        Automaton::define(|g| {
            for i in 0..=10 {
                g.state(&format!("n{}", i), ())?;
            }
            g.edge("n0", "n1", "")?;
            g.edge("n0", "n7", "")?;
            g.edge("n1", "n2", "")?;
            g.edge("n1", "n4", "")?;
            g.edge("n2", "n3", "a")?;
            g.edge("n4", "n5", "b")?;
            g.edge("n3", "n6", "")?;
            g.edge("n5", "n6", "")?;
            g.edge("n6", "n1", "")?;
            g.edge("n6", "n7", "")?;
            g.edge("n7", "n8", "a")?;
            g.edge("n8", "n9", "b")?;
            g.edge("n9", "n10", "b")?;
            g.start("n0")?;
            g.accept("n10")
        })
        .unwrap()
    }

    #[test]
    fn dfa_is_deterministic() {
        let dfa = abb_nfa().to_dfa().unwrap();
        for state in dfa.state_names() {
            assert_eq!(dfa.targets(state, EPSILON).count(), 0);
            for symbol in dfa.alphabet() {
                assert!(dfa.targets(state, symbol).count() <= 1);
            }
        }
    }

    #[test]
    fn dfa_accepts_the_same_language() {
        let nfa = abb_nfa();
        let dfa = nfa.to_dfa().unwrap();

        let samples: &[&[&str]] = &[
            &["a", "b", "b"],
            &["a", "a", "b", "b"],
            &["b", "a", "b", "a", "b", "b"],
            &["a", "b", "b", "a", "b", "b"],
            &[],
            &["a"],
            &["a", "b"],
            &["b", "b", "a"],
            &["a", "b", "b", "a"],
        ];
        for input in samples {
            assert_eq!(
                nfa.accepts(input),
                dfa.accepts(input),
                "disagreement on {:?}",
                input
            );
        }
    }

    #[test]
    fn final_states_are_those_containing_an_nfa_final() {
        let nfa = abb_nfa();
        let dfa = nfa.to_dfa().unwrap();
        for state in dfa.state_names() {
            let expected = state.split('+').any(|part| nfa.is_final(part));
            assert_eq!(dfa.is_final(state), expected, "state {}", state);
        }
        assert!(dfa.finals().count() > 0);
    }

    #[test]
    fn merge_conflicts_abort_the_construction() {
        // An annotation that refuses to merge differing tags.
        #[derive(Debug, Clone, PartialEq)]
        struct Tag(&'static str);
        impl Annotation for Tag {
            fn merge<'a, I>(parts: I) -> Result<Self, MergeError>
            where
                I: IntoIterator<Item = &'a Self>,
            {
                let mut parts = parts.into_iter();
                let first = parts.next().expect("empty constituent set").clone();
                for part in parts {
                    if *part != first {
                        return Err(MergeError {
                            key: "tag".to_owned(),
                            left: first.0.to_owned(),
                            right: part.0.to_owned(),
                        });
                    }
                }
                Ok(first)
            }
        }

        // Both states are reached through the same symbol but carry
        // different tags, so combining them must fail.
        let nfa = Automaton::define(|g| {
            g.state("s0", Tag("root"))?;
            g.state("s1", Tag("one"))?;
            g.state("s2", Tag("two"))?;
            g.edge("s0", "s1", "x")?;
            g.edge("s0", "s2", "x")?;
            g.start("s0")?;
            g.accept("s1")
        })
        .unwrap();

        let err = nfa.to_dfa().unwrap_err();
        assert_eq!(err.key, "tag");

        // With agreeing tags the same shape goes through.
        let nfa = Automaton::define(|g| {
            g.state("s0", Tag("root"))?;
            g.state("s1", Tag("same"))?;
            g.state("s2", Tag("same"))?;
            g.edge("s0", "s1", "x")?;
            g.edge("s0", "s2", "x")?;
            g.start("s0")?;
            g.accept("s1")
        })
        .unwrap();
        let dfa = nfa.to_dfa().unwrap();
        assert_eq!(dfa.annotation("s1+s2"), Some(&Tag("same")));
    }
}

//! The parse-table annotation.
//!
//! A parse table is an ordinary deterministic automaton over grammar
//! symbols whose states carry a [`ReduceMap`]: the reduce actions, keyed by
//! lookahead. Shift and goto actions are the automaton's own edges, so the
//! table needs nothing beyond the annotated-automaton model.

use magpie_automata::{
    automaton::{Annotation, MergeError},
    format::{Payload, PayloadError},
    types::Map,
};
use std::fmt;

/// A production rule, `left := right...`; an empty right-hand side denotes
/// an epsilon production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    left: String,
    right: Vec<String>,
}

impl Rule {
    pub fn new<I, S>(left: impl Into<String>, right: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            left: left.into(),
            right: right.into_iter().map(Into::into).collect(),
        }
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &[String] {
        &self.right
    }
}

// `"LHS := R1 R2 R3"`
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :=", self.left)?;
        for symbol in &self.right {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// The reduce actions of one parse-table state, keyed by lookahead symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReduceMap {
    map: Map<String, Rule>,
}

impl ReduceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lookahead: impl Into<String>, rule: Rule) {
        self.map.insert(lookahead.into(), rule);
    }

    pub fn get(&self, lookahead: &str) -> Option<&Rule> {
        self.map.get(lookahead)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> + '_ {
        self.map.iter().map(|(lookahead, rule)| (lookahead.as_str(), rule))
    }
}

impl<S> FromIterator<(S, Rule)> for ReduceMap
where
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (S, Rule)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (lookahead, rule) in iter {
            map.insert(lookahead, rule);
        }
        map
    }
}

impl Annotation for ReduceMap {
    /// Combining states that register *different* rules for the same
    /// lookahead is a grammar conflict and is rejected rather than letting
    /// either rule win.
    fn merge<'a, I>(parts: I) -> Result<Self, MergeError>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut merged = Self::default();
        for part in parts {
            for (lookahead, rule) in &part.map {
                match merged.map.get(lookahead) {
                    Some(existing) if existing != rule => {
                        return Err(MergeError {
                            key: lookahead.clone(),
                            left: existing.to_string(),
                            right: rule.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        merged.map.insert(lookahead.clone(), rule.clone());
                    }
                }
            }
        }
        Ok(merged)
    }
}

impl Payload for ReduceMap {
    /// `<n>` followed by n space-separated groups
    /// `<lookahead> <left> <rhs-len> <rhs...>`. An empty payload is an empty
    /// map.
    fn decode(payload: &str) -> Result<Self, PayloadError> {
        let mut fields = payload.split_whitespace();
        let count: usize = match fields.next() {
            None => return Ok(Self::default()),
            Some(count) => count
                .parse()
                .map_err(|_| PayloadError(format!("expected an action count, found `{}'", count)))?,
        };

        let mut next = |what: &str| {
            fields
                .next()
                .ok_or_else(|| PayloadError(format!("missing {}", what)))
        };

        let mut map = Map::default();
        for _ in 0..count {
            let lookahead = next("lookahead symbol")?.to_owned();
            let left = next("rule left-hand side")?.to_owned();
            let len: usize = {
                let len = next("rule length")?;
                len.parse()
                    .map_err(|_| PayloadError(format!("expected a rule length, found `{}'", len)))?
            };
            let mut right = Vec::with_capacity(len);
            for _ in 0..len {
                right.push(next("rule symbol")?.to_owned());
            }
            map.insert(lookahead, Rule { left, right });
        }
        if fields.next().is_some() {
            return Err(PayloadError("trailing fields after the last action".to_owned()));
        }
        Ok(Self { map })
    }

    fn encode(&self) -> String {
        if self.map.is_empty() {
            return String::new();
        }
        let mut out = self.map.len().to_string();
        for (lookahead, rule) in &self.map {
            out.push(' ');
            out.push_str(lookahead);
            out.push(' ');
            out.push_str(&rule.left);
            out.push(' ');
            out.push_str(&rule.right.len().to_string());
            for symbol in &rule.right {
                out.push(' ');
                out.push_str(symbol);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_rejects_conflicting_actions() {
        let a = ReduceMap::from_iter([("x", Rule::new("E", ["INTEGER"]))]);
        let b = ReduceMap::from_iter([("x", Rule::new("E", ["E", "+", "E"]))]);
        let err = ReduceMap::merge([&a, &b]).unwrap_err();
        assert_eq!(err.key, "x");

        // identical actions merge fine
        let c = ReduceMap::from_iter([("x", Rule::new("E", ["INTEGER"]))]);
        let merged = ReduceMap::merge([&a, &c]).unwrap();
        assert_eq!(merged.get("x"), Some(&Rule::new("E", ["INTEGER"])));
    }

    #[test]
    fn merge_unions_disjoint_actions() {
        let a = ReduceMap::from_iter([("x", Rule::new("E", ["INTEGER"]))]);
        let b = ReduceMap::from_iter([("y", Rule::new("T", Vec::<String>::new()))]);
        let merged = ReduceMap::merge([&a, &b]).unwrap();
        assert!(merged.get("x").is_some());
        assert_eq!(merged.get("y").unwrap().right(), &[] as &[String]);
    }

    #[test]
    fn payload_round_trips() {
        let map = ReduceMap::from_iter([
            ("+", Rule::new("E", ["E", "+", "E"])),
            ("EOF", Rule::new("S", ["E"])),
            ("]", Rule::new("Dims", Vec::<String>::new())),
        ]);
        let encoded = map.encode();
        let decoded = ReduceMap::decode(&encoded).unwrap();
        assert_eq!(map, decoded);

        assert_eq!(ReduceMap::decode("").unwrap(), ReduceMap::default());
        assert_eq!(ReduceMap::default().encode(), "");
    }

    #[test]
    fn bad_payloads_are_rejected() {
        assert!(ReduceMap::decode("one").is_err());
        assert!(ReduceMap::decode("1 x E").is_err()); // missing rule length
        assert!(ReduceMap::decode("1 x E 2 a").is_err()); // truncated rhs
        assert!(ReduceMap::decode("1 x E 0 junk").is_err()); // trailing fields
    }
}

use criterion::{criterion_group, criterion_main, Criterion};
use magpie_automata::automaton::Automaton;

criterion_main!(benches);
criterion_group!(benches, bench_subset_construction);

fn bench_subset_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_dfa");
    for width in [4usize, 8, 12] {
        let nfa = wide_union(width);
        group.bench_function(format!("union_of_{}", width), |b| {
            b.iter(|| nfa.to_dfa().unwrap());
        });
    }
    group.finish();
}

// A union of `width` chain automata sharing a two-symbol alphabet, so the
// subset construction has overlapping constituent sets to combine.
fn wide_union(width: usize) -> Automaton<()> {
    let mut branches = Vec::with_capacity(width);
    for i in 0..width {
        let ns = format!("m{}", i);
        let branch = Automaton::define(|g| {
            let len = 3 + i % 4;
            for j in 0..=len {
                g.state(&format!("{}.s{}", ns, j), ())?;
            }
            for j in 0..len {
                let symbol = if (i + j) % 2 == 0 { "a" } else { "b" };
                g.edge(
                    &format!("{}.s{}", ns, j),
                    &format!("{}.s{}", ns, j + 1),
                    symbol,
                )?;
                // self loop on the first state keeps the branches entangled
                if j == 0 {
                    g.edge(&format!("{}.s0", ns), &format!("{}.s0", ns), "a")?;
                }
            }
            g.start(&format!("{}.s0", ns))?;
            g.accept(&format!("{}.s{}", ns, len))
        })
        .unwrap();
        branches.push(branch);
    }
    let mut union = branches.pop().unwrap();
    for branch in branches {
        union = union.or(&branch);
    }
    union
}

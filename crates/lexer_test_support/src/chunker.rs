//! Chunk plans for streaming tests.
//!
//! Deterministic plans cover fixed sizes and splits around bytes where the
//! grammars change state; seeded fuzz plans add random boundaries that are
//! reproducible from the printed seed.

use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChunkPlan {
    Fixed { size: usize },
    Sizes { sizes: Vec<usize> },
    /// Split before each index.
    Boundaries { indices: Vec<usize> },
}

impl fmt::Display for ChunkPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkPlan::Fixed { size } => write!(f, "fixed size={size}"),
            ChunkPlan::Sizes { sizes } => {
                write!(f, "sizes count={} sizes={sizes:?}", sizes.len())
            }
            ChunkPlan::Boundaries { indices } => {
                write!(f, "boundaries count={} indices={indices:?}", indices.len())
            }
        }
    }
}

impl ChunkPlan {
    pub fn fixed(size: usize) -> Self {
        Self::Fixed { size }
    }

    pub fn sizes(sizes: impl Into<Vec<usize>>) -> Self {
        Self::Sizes {
            sizes: sizes.into(),
        }
    }

    pub fn boundaries(indices: impl Into<Vec<usize>>) -> Self {
        Self::Boundaries {
            indices: indices.into(),
        }
    }

    /// The chunks this plan cuts `input` into, in order. Empty input yields
    /// no chunks.
    pub fn chunks<'a>(&self, input: &'a [u8]) -> Vec<&'a [u8]> {
        let mut out = Vec::new();
        let mut offset = 0usize;
        match self {
            ChunkPlan::Fixed { size } => {
                assert!(*size > 0, "chunk size must be > 0");
                while offset < input.len() {
                    let end = (offset + size).min(input.len());
                    out.push(&input[offset..end]);
                    offset = end;
                }
            }
            ChunkPlan::Sizes { sizes } => {
                for size in sizes {
                    assert!(*size > 0, "chunk size must be > 0");
                    if offset >= input.len() {
                        break;
                    }
                    let end = (offset + size).min(input.len());
                    out.push(&input[offset..end]);
                    offset = end;
                }
            }
            ChunkPlan::Boundaries { indices } => {
                for &idx in indices {
                    if idx <= offset || idx >= input.len() {
                        continue;
                    }
                    out.push(&input[offset..idx]);
                    offset = idx;
                }
            }
        }
        if offset < input.len() {
            out.push(&input[offset..]);
        }
        out
    }

    pub fn for_each_chunk(&self, input: &[u8], mut f: impl FnMut(&[u8])) {
        for chunk in self.chunks(input) {
            f(chunk);
        }
    }

    /// Interior split points of this plan over an input of `len` bytes.
    pub fn split_points(&self, len: usize) -> Vec<usize> {
        let mut points = Vec::new();
        let mut offset = 0usize;
        match self {
            ChunkPlan::Fixed { size } => {
                while offset + size < len {
                    offset += size;
                    points.push(offset);
                }
            }
            ChunkPlan::Sizes { sizes } => {
                for size in sizes {
                    offset += size;
                    if offset >= len {
                        break;
                    }
                    points.push(offset);
                }
            }
            ChunkPlan::Boundaries { indices } => {
                points.extend(indices.iter().copied().filter(|&idx| idx > 0 && idx < len));
                points.sort_unstable();
                points.dedup();
            }
        }
        points
    }
}

#[derive(Clone, Debug)]
pub struct ChunkPlanCase {
    pub label: String,
    pub plan: ChunkPlan,
}

/// Build deterministic and seeded fuzz chunk plans for `input`.
pub fn build_chunk_plans(input: &[u8], fuzz_runs: usize, fuzz_seed: u64) -> Vec<ChunkPlanCase> {
    let mut plans = Vec::new();

    for size in [1usize, 2, 3, 4, 7, 8, 16, 64] {
        plans.push(ChunkPlanCase {
            label: format!("fixed size={size}"),
            plan: ChunkPlan::fixed(size),
        });
    }

    let syntax = syntax_boundaries(input);
    if !syntax.is_empty() {
        plans.push(ChunkPlanCase {
            label: format!("syntax-boundaries count={}", syntax.len()),
            plan: ChunkPlan::boundaries(syntax.clone()),
        });
    }

    if fuzz_runs > 0 && input.len() > 1 {
        let candidates: Vec<usize> = (1..input.len()).collect();
        for i in 0..fuzz_runs {
            let seed = fuzz_seed.wrapping_add(i as u64);
            let mut rng = Lcg::new(seed);
            let mut picks = candidates.clone();
            rng.shuffle(&mut picks);
            let count = 1 + rng.gen_range(picks.len().min(32));
            picks.truncate(count);
            picks.sort_unstable();
            plans.push(ChunkPlanCase {
                label: format!("fuzz boundaries seed=0x{seed:016x}"),
                plan: ChunkPlan::boundaries(picks),
            });
        }
    }

    plans
}

/// Indices on either side of bytes that open or close tokens in one of the
/// grammars.
fn syntax_boundaries(input: &[u8]) -> Vec<usize> {
    let len = input.len();
    let mut out = Vec::new();
    for (i, &b) in input.iter().enumerate() {
        if matches!(
            b,
            b'<' | b'>' | b'"' | b'\'' | b'`' | b'/' | b'*' | b'\\' | b'\n' | b'-' | b'{' | b'}'
        ) {
            if i > 0 {
                out.push(i);
            }
            if i + 1 < len {
                out.push(i + 1);
            }
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Remove split points one at a time while `fails` keeps failing, giving the
/// smallest plan that still reproduces a mismatch.
pub fn shrink_chunk_plan(
    len: usize,
    plan: &ChunkPlan,
    mut fails: impl FnMut(&ChunkPlan) -> bool,
) -> ChunkPlan {
    let mut points = plan.split_points(len);
    let mut changed = true;
    let mut checks = 0usize;
    while changed && checks < SHRINK_BUDGET {
        changed = false;
        let mut i = 0usize;
        while i < points.len() && checks < SHRINK_BUDGET {
            let mut candidate = points.clone();
            candidate.remove(i);
            checks += 1;
            if fails(&ChunkPlan::boundaries(candidate.clone())) {
                points = candidate;
                changed = true;
            } else {
                i += 1;
            }
        }
    }
    ChunkPlan::boundaries(points)
}

const SHRINK_BUDGET: usize = 4096;

pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    pub fn gen_range(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        (self.next_u64() >> 32) as usize % upper
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        if items.len() < 2 {
            return;
        }
        for i in (1..items.len()).rev() {
            let j = self.gen_range(i + 1);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkPlan, build_chunk_plans, shrink_chunk_plan};

    #[test]
    fn chunks_cover_the_input_in_order() {
        let input = b"abcdefg";
        for plan in [
            ChunkPlan::fixed(3),
            ChunkPlan::sizes(vec![1, 2]),
            ChunkPlan::boundaries(vec![0, 2, 2, 5, 9]),
        ] {
            let joined: Vec<u8> = plan.chunks(input).concat();
            assert_eq!(joined, input, "{plan}");
        }
        assert_eq!(
            ChunkPlan::boundaries(vec![2, 5]).chunks(input),
            vec![&b"ab"[..], &b"cde"[..], &b"fg"[..]]
        );
    }

    #[test]
    fn split_points_match_chunks() {
        assert_eq!(ChunkPlan::fixed(3).split_points(7), vec![3, 6]);
        assert_eq!(ChunkPlan::sizes(vec![1, 2]).split_points(7), vec![1, 3]);
    }

    #[test]
    fn fuzz_plans_are_reproducible() {
        let input = b"<p class=\"x\">a b</p>";
        let first = build_chunk_plans(input, 3, 7);
        let second = build_chunk_plans(input, 3, 7);
        let labels: Vec<_> = first.iter().map(|case| &case.plan).collect();
        let again: Vec<_> = second.iter().map(|case| &case.plan).collect();
        assert_eq!(labels, again);
    }

    #[test]
    fn shrinking_keeps_only_the_needed_split() {
        let plan = ChunkPlan::fixed(1);
        let shrunk = shrink_chunk_plan(6, &plan, |candidate| {
            candidate.split_points(6).contains(&3)
        });
        assert_eq!(shrunk, ChunkPlan::boundaries(vec![3]));
    }
}

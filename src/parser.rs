//! Turns raw bytes into a token stream: greedy/lazy matching for levels
//! 0-9, a full dynamic-programming optimal parse for level 10.

use crate::bitstream::BitWriter;
use crate::matcher::{Acceptance, MatchCandidate, Matcher};
use crate::token::{self, MIN_LIT_RUN};

/// Compression level, clamped to `[0, 10]` at construction so no caller
/// further down the stack needs to re-validate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Level(u8);

impl Level {
    pub const FASTEST: Level = Level(0);
    pub const MEDIUM: Level = Level(5);
    pub const MAX: Level = Level(10);

    pub fn new(level: u8) -> Self {
        Level(level.min(10))
    }

    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }

    #[inline]
    fn is_optimal(self) -> bool {
        self.0 == 10
    }

    #[inline]
    fn loop_budget(self) -> usize {
        if self.0 >= 9 {
            usize::MAX
        } else {
            1usize << self.0
        }
    }

    #[inline]
    fn lazy_steps(self) -> usize {
        if self.0 > 5 {
            30
        } else {
            0
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::MEDIUM
    }
}

/// Parses `src` into a token stream and returns the encoded bytes.
pub fn compress(src: &[u8], level: Level) -> Vec<u8> {
    if level.is_optimal() {
        compress_optimal(src, 0)
    } else {
        compress_greedy_lazy(src, 0, level)
    }
}

/// Parses `src` into a token stream, allowed to reference back into
/// `context` (the tail of a preceding block, for dependent-block framing)
/// but emitting tokens only for `src` itself. `context.len()` must not
/// exceed [`crate::matcher::MAX_DIST`] + 1.
pub fn compress_with_context(context: &[u8], src: &[u8], level: Level) -> Vec<u8> {
    if context.is_empty() {
        return compress(src, level);
    }
    let mut full = Vec::with_capacity(context.len() + src.len());
    full.extend_from_slice(context);
    full.extend_from_slice(src);
    if level.is_optimal() {
        compress_optimal(&full, context.len())
    } else {
        compress_greedy_lazy(&full, context.len(), level)
    }
}

/// Largest run a single literal-run token can carry (the `full` shape's
/// escaped length field tops out at `u16::MAX`).
const MAX_LIT_RUN: u32 = MIN_LIT_RUN + u16::MAX as u32;

fn flush_literals(writer: &mut BitWriter, out: &mut Vec<u8>, src: &[u8], start: usize, end: usize) {
    let mut i = start;
    while i < end {
        let remaining = (end - i) as u32;
        if remaining >= MIN_LIT_RUN {
            let run = remaining.min(MAX_LIT_RUN);
            let run_end = i + run as usize;
            token::encode_literal_run(writer, out, run);
            writer.put_bytes(out, &src[i..run_end]);
            i = run_end;
        } else {
            token::encode_literal(writer, out, src[i]);
            i += 1;
        }
    }
}

/// A match of length `MIN_MATCH` can't be encoded as a match token (the
/// wire format reserves that length for literal re-emission), so the
/// parser treats such candidates as if no match had been found.
#[inline]
fn accept_candidate(cand: Option<MatchCandidate>) -> Option<MatchCandidate> {
    cand.filter(|c| c.len > crate::matcher::MIN_MATCH as u32)
}

fn compress_greedy_lazy(src: &[u8], start: usize, level: Level) -> Vec<u8> {
    let n = src.len();
    let mut out = Vec::with_capacity(n - start);
    let mut writer = BitWriter::new(&mut out);
    let mut matcher = Matcher::new();
    let loop_budget = level.loop_budget();
    let lazy_steps = level.lazy_steps();

    for i in 0..start {
        matcher.insert(src, i);
    }

    let mut pos = start;
    let mut lit_start = start;

    while pos < n {
        if pos + crate::matcher::MIN_MATCH > n {
            pos += 1;
            continue;
        }

        let cand = accept_candidate(matcher.find(src, pos, loop_budget, Acceptance::LengthBest));
        matcher.insert(src, pos);

        let Some(mut chosen) = cand else {
            pos += 1;
            continue;
        };
        let mut chosen_pos = pos;

        // Lazy matching: keep walking forward while a strictly longer match
        // turns up, emitting the skipped position as an ordinary literal.
        let mut look = pos + 1;
        let mut steps = 0;
        while steps < lazy_steps && look + crate::matcher::MIN_MATCH <= n {
            let next_cand = accept_candidate(matcher.find(src, look, loop_budget, Acceptance::LengthBest));
            matcher.insert(src, look);
            match next_cand {
                Some(next_m) if next_m.len > chosen.len => {
                    chosen = next_m;
                    chosen_pos = look;
                    look += 1;
                    steps += 1;
                }
                _ => break,
            }
        }

        flush_literals(&mut writer, &mut out, src, lit_start, chosen_pos);
        token::encode_match(&mut writer, &mut out, chosen.dist, chosen.len)
            .expect("matcher only returns in-range candidates");

        let match_end = chosen_pos + chosen.len as usize;
        let mut ip = chosen_pos + 1;
        while ip < match_end && ip + crate::matcher::MIN_MATCH <= n {
            matcher.insert(src, ip);
            ip += 1;
        }

        pos = match_end;
        lit_start = pos;
    }

    flush_literals(&mut writer, &mut out, src, lit_start, n);
    writer.finish(&mut out);
    out
}

#[derive(Clone, Copy)]
enum Choice {
    Literal,
    Match(MatchCandidate),
}

fn compress_optimal(src: &[u8], start: usize) -> Vec<u8> {
    let n = src.len();
    let mut matcher = Matcher::new_optimal();

    // Forward pass: causally build the hash table and record, for each
    // position, the best savings-ranked candidate visible from it. Context
    // positions are inserted but never considered for emission.
    let mut candidates: Vec<Option<MatchCandidate>> = Vec::with_capacity(n - start);
    for i in 0..start {
        matcher.insert(src, i);
    }
    for i in start..n {
        let cand = if i + crate::matcher::MIN_MATCH <= n {
            accept_candidate(matcher.find(src, i, usize::MAX, Acceptance::SavingsBest))
        } else {
            None
        };
        candidates.push(cand);
        matcher.insert(src, i);
    }

    // Backward pass: minimal bit cost to encode src[start+i..n] for each
    // relative index `i`, with `cost[relative_len] == 0` as the base case.
    let relative_len = n - start;
    let mut cost = vec![0u32; relative_len + 1];
    let mut choice = vec![Choice::Literal; relative_len];
    for i in (0..relative_len).rev() {
        let lit_cost = 9 + cost[i + 1];
        let mut best_cost = lit_cost;
        let mut best_choice = Choice::Literal;
        if let Some(cand) = candidates[i] {
            let rel_end = i + cand.len as usize;
            if rel_end <= relative_len {
                let mcost = token::estimate_bits(cand.dist, cand.len) + cost[rel_end];
                if mcost < best_cost {
                    best_cost = mcost;
                    best_choice = Choice::Match(cand);
                }
            }
        }
        cost[i] = best_cost;
        choice[i] = best_choice;
    }

    // Forward emit pass, following the choices just computed. `pos`/
    // `lit_start` are absolute positions into `src`.
    let mut out = Vec::with_capacity(relative_len);
    let mut writer = BitWriter::new(&mut out);
    let mut pos = start;
    let mut lit_start = start;
    while pos < n {
        match choice[pos - start] {
            Choice::Literal => pos += 1,
            Choice::Match(m) => {
                flush_literals(&mut writer, &mut out, src, lit_start, pos);
                token::encode_match(&mut writer, &mut out, m.dist, m.len)
                    .expect("matcher only returns in-range candidates");
                pos += m.len as usize;
                lit_start = pos;
            }
        }
    }
    flush_literals(&mut writer, &mut out, src, lit_start, n);
    writer.finish(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::BitReader;
    use crate::token::DecodedToken;

    fn decode_all(encoded: &[u8], expected_len: usize) -> Vec<u8> {
        let mut r = BitReader::new(encoded);
        let mut out = Vec::with_capacity(expected_len);
        while out.len() < expected_len {
            match token::decode_next(&mut r).unwrap() {
                DecodedToken::Literal(b) => out.push(b),
                DecodedToken::Match { dist, len } => {
                    let start = out.len() - dist as usize;
                    for k in 0..len as usize {
                        out.push(out[start + k]);
                    }
                }
                DecodedToken::LiteralRun { len } => {
                    let bytes = r.get_bytes(len as usize).unwrap();
                    out.extend_from_slice(bytes);
                }
            }
        }
        out
    }

    #[test]
    fn greedy_round_trips_repetitive_input() {
        let src = b"the quick brown fox the quick brown fox the quick brown fox".to_vec();
        let encoded = compress(&src, Level::new(0));
        assert_eq!(decode_all(&encoded, src.len()), src);
    }

    #[test]
    fn lazy_round_trips_at_medium_level() {
        let src = b"ababababXababababYababababZabababab".to_vec();
        let encoded = compress(&src, Level::MEDIUM);
        assert_eq!(decode_all(&encoded, src.len()), src);
    }

    #[test]
    fn optimal_round_trips() {
        let src = b"mississippi river, mississippi delta, mississippi mud".to_vec();
        let encoded = compress(&src, Level::MAX);
        assert_eq!(decode_all(&encoded, src.len()), src);
    }

    #[test]
    fn handles_empty_input() {
        let encoded = compress(&[], Level::MEDIUM);
        assert_eq!(decode_all(&encoded, 0), Vec::<u8>::new());
    }

    #[test]
    fn handles_input_shorter_than_min_match() {
        let src = b"ab".to_vec();
        let encoded = compress(&src, Level::MEDIUM);
        assert_eq!(decode_all(&encoded, src.len()), src);
    }

    #[test]
    fn long_literal_run_round_trips() {
        // No three-byte window repeats, so this exercises the literal-run
        // path rather than the matcher.
        let unique: Vec<u8> = (0..200u32).map(|i| (i % 251) as u8).collect();
        let encoded = compress(&unique, Level::FASTEST);
        assert_eq!(decode_all(&encoded, unique.len()), unique);
    }

    #[test]
    fn context_lets_a_later_block_reference_an_earlier_one() {
        let context = b"the quick brown fox jumps over the lazy dog".to_vec();
        let src = b"the quick brown fox jumps over the lazy dog again".to_vec();
        let encoded = compress_with_context(&context, &src, Level::MEDIUM);
        let independent = compress(&src, Level::MEDIUM);
        assert!(encoded.len() < independent.len());

        // Decoding needs the same context prefix available as history.
        let mut full = context.clone();
        full.extend_from_slice(&src);
        let mut r = BitReader::new(&encoded);
        let mut out = context.clone();
        while out.len() < full.len() {
            match token::decode_next(&mut r).unwrap() {
                DecodedToken::Literal(b) => out.push(b),
                DecodedToken::Match { dist, len } => {
                    let start = out.len() - dist as usize;
                    for k in 0..len as usize {
                        out.push(out[start + k]);
                    }
                }
                DecodedToken::LiteralRun { len } => {
                    let bytes = r.get_bytes(len as usize).unwrap();
                    out.extend_from_slice(bytes);
                }
            }
        }
        assert_eq!(&out[context.len()..], src.as_slice());
    }

    #[test]
    fn level_is_clamped() {
        assert_eq!(Level::new(255).value(), 10);
        assert_eq!(Level::new(3).value(), 3);
    }
}

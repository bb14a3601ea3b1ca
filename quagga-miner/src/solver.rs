//! Pluggable Equihash solver strategies.
//!
//! Two strategies are supported, selected by the `equihash_solver`
//! config option:
//!
//! - `default`: an in-crate basic Wagner solver, usable with any `(n, k)`
//!   parameters (including the regtest `(48, 5)` instance);
//! - `tromp`: the external Tromp solver from the `equihash` crate, which
//!   only supports the production `(200, 9)` instance. It yields raw
//!   index solutions, which are converted with a minimal-encoding step.
//!
//! Both strategies run one attempt per header nonce; the mining driver
//! increments the nonce between attempts and handles cancellation at the
//! attempt boundary. Every candidate is checked with the verifier before
//! it is returned, so an unsound solver run can never produce an invalid
//! block.

use serde::{Deserialize, Serialize};
use tracing::debug;

use quagga_chain::{
    block::Header,
    serialization::ZcashSerialize,
    work::equihash::{Solution, SolverCancelled, REGTEST_SOLUTION_SIZE, SOLUTION_SIZE},
};

/// The configured Equihash solver implementation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverStrategy {
    /// The in-crate basic Wagner solver.
    #[default]
    Default,
    /// The external Tromp solver, `(200, 9)` only.
    Tromp,
}

/// Run one solver attempt for the header's current nonce, returning every
/// verified candidate solution.
///
/// `cancel_fn` is consulted at the solver's internal checkpoints; if it
/// returns an error the attempt stops early with `SolverCancelled`.
pub fn solve_header<F>(
    header: &Header,
    params: (u32, u32),
    strategy: SolverStrategy,
    mut cancel_fn: F,
) -> Result<Vec<Solution>, SolverCancelled>
where
    F: FnMut() -> Result<(), SolverCancelled>,
{
    let (n, k) = params;

    // I = the block header minus nonce and solution.
    let mut input = Vec::new();
    header
        .zcash_serialize(&mut input)
        .expect("serialization into a vec never fails");
    let input = &input[0..Solution::INPUT_LENGTH];

    let candidates = match strategy {
        SolverStrategy::Tromp => {
            assert_eq!(
                (n, k),
                (200, 9),
                "the tromp solver only supports the production parameters",
            );

            // The callback supplies the nonce for the single attempt, then
            // ends the solver run; cancellation surfaces as an early end.
            let mut nonce = Some(*header.nonce);
            let solutions = equihash::tromp::solve_200_9_compressed(input, || {
                cancel_fn().ok()?;
                nonce.take()
            });

            if solutions.is_empty() {
                // An empty result is either a real miss or a cancellation;
                // tell them apart so the driver can rebuild promptly.
                cancel_fn()?;
            }

            solutions
        }
        SolverStrategy::Default => {
            let indices = basic::solve(n, k, input, &header.nonce[..], &mut cancel_fn)?;
            indices
                .into_iter()
                .map(|solution| minimal_from_indices(&solution, (n / (k + 1)) as usize))
                .collect()
        }
    };

    metrics::counter!("quagga.miner.solver.runs").increment(1);

    // Filter through the verifier, so a defective solver cannot emit an
    // invalid solution.
    let solutions = candidates
        .into_iter()
        .filter_map(|bytes| to_solution(&bytes))
        .filter(|solution| {
            let mut candidate_header = *header;
            candidate_header.solution = *solution;
            solution.check(&candidate_header).is_ok()
        })
        .collect();

    Ok(solutions)
}

/// Wrap raw solution bytes in the [`Solution`] variant of matching size.
fn to_solution(bytes: &[u8]) -> Option<Solution> {
    match bytes.len() {
        SOLUTION_SIZE => Some(Solution::Common(
            bytes.try_into().expect("length checked"),
        )),
        REGTEST_SOLUTION_SIZE => Some(Solution::Regtest(
            bytes.try_into().expect("length checked"),
        )),
        unexpected => {
            debug!(unexpected, "discarding solver output of unexpected length");
            None
        }
    }
}

/// Convert a solution's index vector into the compressed wire encoding:
/// each index written as a big-endian `collision_bit_length + 1` bit
/// string, concatenated.
///
/// `GetMinimalFromIndices` in zcashd.
pub(crate) fn minimal_from_indices(indices: &[u32], collision_bit_length: usize) -> Vec<u8> {
    let index_bits = collision_bit_length + 1;
    let mut out = Vec::with_capacity((indices.len() * index_bits).div_ceil(8));

    let mut acc: u64 = 0;
    let mut acc_bits = 0;
    for &index in indices {
        acc = (acc << index_bits) | index as u64;
        acc_bits += index_bits;
        while acc_bits >= 8 {
            out.push((acc >> (acc_bits - 8)) as u8);
            acc_bits -= 8;
        }
    }
    debug_assert_eq!(acc_bits, 0, "solution bits always pack into whole bytes");

    out
}

mod basic {
    //! A basic Wagner solver for Equihash, parameterized over `(n, k)`.
    //!
    //! Memory-heavy and slow compared to dedicated solvers, but correct
    //! for any parameter set, which makes it the only strategy usable on
    //! regtest's `(48, 5)` instance.

    use quagga_chain::work::equihash::SolverCancelled;

    /// A partial solution row: the remaining collision digits, and the
    /// leaf indices combined so far.
    #[derive(Clone)]
    struct Row {
        digits: Vec<u32>,
        indices: Vec<u32>,
    }

    /// Generate the initial hash rows for the given input and nonce.
    fn generate_rows(n: u32, k: u32, input: &[u8], nonce: &[u8]) -> Vec<Row> {
        let collision_bit_length = n / (k + 1);
        let indices_per_hash_output = 512 / n;
        let hash_output_len = (indices_per_hash_output * n / 8) as usize;
        let row_count: u32 = 1 << (collision_bit_length + 1);

        let mut personal = [0u8; 16];
        personal[..8].copy_from_slice(b"ZcashPoW");
        personal[8..12].copy_from_slice(&n.to_le_bytes());
        personal[12..16].copy_from_slice(&k.to_le_bytes());

        let base_state = {
            let mut state = blake2b_simd::Params::new()
                .hash_length(hash_output_len)
                .personal(&personal)
                .to_state();
            state.update(input);
            state.update(nonce);
            state
        };

        let mut rows = Vec::with_capacity(row_count as usize);
        for index in 0..row_count {
            let block = index / indices_per_hash_output;
            let offset = ((index % indices_per_hash_output) * (n / 8)) as usize;

            let mut state = base_state.clone();
            state.update(&block.to_le_bytes());
            let hash = state.finalize();
            let hash = &hash.as_bytes()[offset..offset + (n / 8) as usize];

            rows.push(Row {
                digits: expand_digits(hash, collision_bit_length as usize, (k + 1) as usize),
                indices: vec![index],
            });
        }

        rows
    }

    /// Split `hash` into `digit_count` big-endian digits of
    /// `collision_bit_length` bits each.
    fn expand_digits(hash: &[u8], collision_bit_length: usize, digit_count: usize) -> Vec<u32> {
        let mut digits = Vec::with_capacity(digit_count);

        let mut acc: u64 = 0;
        let mut acc_bits = 0;
        let mut bytes = hash.iter();
        for _ in 0..digit_count {
            while acc_bits < collision_bit_length {
                acc = (acc << 8) | u64::from(*bytes.next().expect("hash covers all digits"));
                acc_bits += 8;
            }
            digits.push((acc >> (acc_bits - collision_bit_length)) as u32);
            acc_bits -= collision_bit_length;
            acc &= (1 << acc_bits) - 1;
        }

        digits
    }

    /// Combine two colliding rows.
    ///
    /// Digits are XORed pairwise, so every digit collided on so far
    /// becomes zero. Returns `None` if the rows share a leaf index:
    /// solutions must have distinct indices.
    fn combine(a: &Row, b: &Row) -> Option<Row> {
        if a.indices.iter().any(|index| b.indices.contains(index)) {
            return None;
        }

        let digits = a
            .digits
            .iter()
            .zip(&b.digits)
            .map(|(x, y)| x ^ y)
            .collect();

        // The ordering constraint: the half with the smaller first index
        // comes first.
        let (first, second) = if a.indices[0] < b.indices[0] {
            (a, b)
        } else {
            (b, a)
        };
        let mut indices = Vec::with_capacity(first.indices.len() * 2);
        indices.extend_from_slice(&first.indices);
        indices.extend_from_slice(&second.indices);

        Some(Row { digits, indices })
    }

    /// Run the basic Wagner algorithm: `k` rounds of collision on
    /// successive digits, then a final full collision.
    ///
    /// `cancel_fn` is consulted between rounds, which bounds cancellation
    /// latency to one sort-and-collide pass.
    pub(super) fn solve<F>(
        n: u32,
        k: u32,
        input: &[u8],
        nonce: &[u8],
        cancel_fn: &mut F,
    ) -> Result<Vec<Vec<u32>>, SolverCancelled>
    where
        F: FnMut() -> Result<(), SolverCancelled>,
    {
        let mut rows = generate_rows(n, k, input, nonce);

        for round in 0..(k as usize - 1) {
            cancel_fn()?;

            rows.sort_unstable_by_key(|row| row.digits[round]);

            let mut next: Vec<Row> = Vec::new();
            let mut group_start = 0;
            for i in 0..=rows.len() {
                let group_ended = i == rows.len()
                    || rows[i].digits[round] != rows[group_start].digits[round];
                if !group_ended {
                    continue;
                }

                let group = &rows[group_start..i];
                for (left, a) in group.iter().enumerate() {
                    for b in &group[left + 1..] {
                        if let Some(row) = combine(a, b) {
                            next.push(row);
                        }
                    }
                }
                group_start = i;
            }

            rows = next;
        }

        cancel_fn()?;

        // Final round: the two remaining digits must both collide, which
        // the digit-wise XOR reduces to equality of the digit pairs.
        let final_round = k as usize - 1;
        rows.sort_unstable_by_key(|row| {
            ((row.digits[final_round] as u64) << 32) | row.digits[final_round + 1] as u64
        });

        let mut solutions = Vec::new();
        let mut group_start = 0;
        for i in 0..=rows.len() {
            let group_ended = i == rows.len()
                || rows[i].digits[final_round..] != rows[group_start].digits[final_round..];
            if !group_ended {
                continue;
            }

            let group = &rows[group_start..i];
            for (left, a) in group.iter().enumerate() {
                for b in &group[left + 1..] {
                    if let Some(row) = combine(a, b) {
                        debug_assert!(row.digits.iter().all(|&digit| digit == 0));
                        solutions.push(row.indices);
                    }
                }
            }
            group_start = i;
        }

        Ok(solutions)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn regtest_solutions_verify() {
            // (48, 5) is small enough to solve inline: 512 initial rows.
            let input = b"quagga equihash basic solver test input....";
            let nonce = [7u8; 32];

            let mut cancel = || Ok(());
            let solutions = solve(48, 5, input, &nonce, &mut cancel).expect("not cancelled");

            // Equihash finds about two solutions per nonce on average,
            // so this may legitimately be empty; every solution that is
            // found must verify.
            for indices in &solutions {
                assert_eq!(indices.len(), 32);
                let minimal = crate::solver::minimal_from_indices(indices, 8);
                equihash::is_valid_solution(48, 5, input, &nonce, &minimal)
                    .expect("basic solver produces valid solutions");
            }
        }

        #[test]
        fn cancellation_stops_the_solver() {
            let mut calls = 0;
            let mut cancel = || {
                calls += 1;
                if calls > 1 {
                    Err(SolverCancelled)
                } else {
                    Ok(())
                }
            };

            let result = solve(48, 5, b"input", &[0u8; 32], &mut cancel);
            assert_eq!(result.unwrap_err(), SolverCancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_encoding_packs_big_endian() {
        // Four 16-bit indices at collision bit length 15.
        let encoded = minimal_from_indices(&[1, 2, 3, 4], 15);
        assert_eq!(encoded, vec![0, 1, 0, 2, 0, 3, 0, 4]);

        // Eight 9-bit indices pack into nine bytes.
        let encoded = minimal_from_indices(&[0x101; 8], 8);
        assert_eq!(encoded.len(), 9);
    }

    #[test]
    fn strategy_parses_from_config_names() {
        let strategy: SolverStrategy = serde_json::from_str(r#""default""#).unwrap();
        assert_eq!(strategy, SolverStrategy::Default);
        let strategy: SolverStrategy = serde_json::from_str(r#""tromp""#).unwrap();
        assert_eq!(strategy, SolverStrategy::Tromp);
        assert!(serde_json::from_str::<SolverStrategy>(r#""wagner""#).is_err());
    }
}

//! The internal mining driver.
//!
//! Each mining thread repeatedly builds a fresh block template, searches
//! the Equihash space for it, and submits any block whose header hash
//! meets the difficulty target. A thread abandons its current template
//! when the chain tip moves, when its nonce space is exhausted, or when
//! the mempool changes and the template has gone stale.

use std::{
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use thread_priority::{ThreadBuilder, ThreadPriority};
use tracing::{debug, info, warn};

use quagga_chain::{block::Height, work::equihash::SolverCancelled};

use crate::{
    address::MinerAddress,
    chain::ChainBackend,
    config::Config,
    error::{MinerError, SubmitError},
    prover::{OrchardProver, SaplingProver},
    script::ScriptVerifier,
    solver,
    template::{self, TemplateParams},
};

/// How long to wait between peer-availability and chain-tip polls.
const PEER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Rebuild the template when the mempool has changed and the template is
/// older than this.
const TEMPLATE_STALENESS_TIMEOUT: Duration = Duration::from_secs(60);

/// Cooperative cancellation for the solver loops.
///
/// One boolean, guarded by one mutex, distinct from any chain-state lock.
/// The node's new-best-tip signal calls [`CancelSignal::notify`]; solvers
/// observe the flag at their internal checkpoints and return early; the
/// driver clears the flag and rebuilds.
#[derive(Clone, Default)]
pub struct CancelSignal {
    cancel_solver: Arc<Mutex<bool>>,
}

impl CancelSignal {
    /// Creates a new, unsignalled cancellation flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Called from the chain-tip listener.
    pub fn notify(&self) {
        *self.cancel_solver.lock().expect("cancel lock is never poisoned") = true;
    }

    /// Returns `true` if the flag is raised.
    fn is_cancelled(&self) -> bool {
        *self.cancel_solver.lock().expect("cancel lock is never poisoned")
    }

    /// Returns the flag's value and lowers it.
    fn check_and_clear(&self) -> bool {
        let mut flag = self.cancel_solver.lock().expect("cancel lock is never poisoned");
        std::mem::take(&mut *flag)
    }

    /// Lower the flag without reading it.
    fn clear(&self) {
        *self.cancel_solver.lock().expect("cancel lock is never poisoned") = false;
    }
}

/// Start or stop the internal miner, spawning `config.mining_threads()`
/// mining threads.
///
/// Returns the thread handles; an empty vector when mining is disabled.
/// The returned [`CancelSignal`] is shared by all threads and should be
/// connected to the node's new-best-tip notification.
///
/// `GenerateBitcoins` in zcashd.
pub fn spawn_miners<B: ChainBackend>(
    config: &Config,
    backend: Arc<B>,
    sapling_prover: Arc<dyn SaplingProver>,
    orchard_prover: Arc<dyn OrchardProver>,
    script_verifier: Arc<dyn ScriptVerifier>,
) -> (CancelSignal, Vec<JoinHandle<Result<(), MinerError>>>) {
    let cancel = CancelSignal::new();

    if !config.gen {
        return (cancel, Vec::new());
    }

    let threads = config.mining_threads();
    info!(threads, "starting internal miner");

    let handles = (0..threads)
        .map(|thread_id| {
            let worker = MinerThread {
                thread_id: thread_id as u8,
                config: config.clone(),
                backend: backend.clone(),
                sapling_prover: sapling_prover.clone(),
                orchard_prover: orchard_prover.clone(),
                script_verifier: script_verifier.clone(),
                cancel: cancel.clone(),
            };

            ThreadBuilder::default()
                .name(format!("quagga-miner-{thread_id}"))
                .priority(ThreadPriority::Min)
                .spawn(move |priority_result| {
                    if let Err(error) = priority_result {
                        info!(
                            ?error,
                            "could not set miner thread to run at a low priority: \
                             running at default priority",
                        );
                    }
                    worker.run()
                })
                .expect("unable to spawn miner thread")
        })
        .collect();

    (cancel, handles)
}

/// The per-thread mining state.
struct MinerThread<B> {
    thread_id: u8,
    config: Config,
    backend: Arc<B>,
    sapling_prover: Arc<dyn SaplingProver>,
    orchard_prover: Arc<dyn OrchardProver>,
    script_verifier: Arc<dyn ScriptVerifier>,
    cancel: CancelSignal,
}

impl<B: ChainBackend> MinerThread<B> {
    /// The outer mining loop: build a template, drive the solver, submit
    /// found blocks, rebuild on staleness.
    fn run(self) -> Result<(), MinerError> {
        info!(thread_id = self.thread_id, "miner started");
        let network = self.backend.network();

        // Acquire a miner address once at startup; without one, the
        // thread terminates.
        let startup_height = self
            .backend
            .chain_info()
            .map(|info| info.next_block_height())
            .unwrap_or(Height(0));
        let miner_address = match &self.config.miner_address {
            Some(encoded) => MinerAddress::decode(encoded, network, startup_height)?,
            None => return Err(MinerError::NoMinerAddress),
        };

        let params = TemplateParams {
            limits: self.config.block_size_limits(),
            block_version: self.config.block_version,
            print_priority: self.config.print_priority,
            precomputed_coinbase: None,
        };

        // Each thread has its own extra-nonce counter.
        let mut extra_nonce: u32 = 0;
        let mut last_prev_block = None;

        loop {
            if self.config.mining_requires_peers && network.mining_requires_peers() {
                // Busy-wait for the network to come online so we don't
                // waste time mining on an obsolete chain.
                loop {
                    if self.backend.peer_count() > 0 && !self.backend.is_initial_block_download()
                    {
                        break;
                    }
                    std::thread::sleep(PEER_POLL_INTERVAL);
                }
            }

            // If we don't have a valid chain tip to work from, wait and
            // try again.
            let Some(chain_info) = self.backend.chain_info() else {
                std::thread::sleep(PEER_POLL_INTERVAL);
                continue;
            };

            let transactions_updated_last = self.backend.mempool_updates();

            let view = self.backend.coin_view(&chain_info);
            let mempool = self.backend.mempool();

            let mut template = template::build_template(
                &chain_info,
                view,
                &mempool,
                &miner_address,
                self.sapling_prover.as_ref(),
                self.orchard_prover.as_ref(),
                self.script_verifier.as_ref(),
                &params,
            )?;
            template::increment_extra_nonce(
                &mut template,
                &mut extra_nonce,
                &mut last_prev_block,
            );

            // Stamp the thread id into the high bits the template left
            // clear, so each thread searches a disjoint nonce space.
            template.block.header.nonce[30] = self.thread_id;

            debug!(
                height = ?template.height,
                transactions = template.block.transactions.len(),
                "running miner on fresh template",
            );

            let template_birth = Instant::now();
            let target = template
                .block
                .header
                .difficulty_threshold
                .to_expanded()
                .expect("templates always have a valid difficulty threshold");

            // The search loop for this template.
            loop {
                let cancel = self.cancel.clone();
                let cancel_fn = move || {
                    if cancel.is_cancelled() {
                        Err(SolverCancelled)
                    } else {
                        Ok(())
                    }
                };

                let solutions = solver::solve_header(
                    &template.block.header,
                    network.equihash_params(),
                    self.config.equihash_solver,
                    cancel_fn,
                );

                if let Ok(solutions) = solutions {
                    let mut found = false;
                    for solution in solutions {
                        metrics::counter!("quagga.miner.solution.checks").increment(1);

                        let mut block = template.block.clone();
                        block.header.solution = solution;

                        if block.hash() > target {
                            continue;
                        }

                        // Found a solution below the target.
                        info!(
                            hash = %block.hash(),
                            height = ?template.height,
                            "proof-of-work found",
                        );

                        match self.backend.submit_block(block) {
                            Ok(()) => {
                                // Ignore the chain update caused by us.
                                self.cancel.clear();
                                found = true;

                                // In regression test mode, stop mining
                                // after a block is found.
                                if network.mine_blocks_on_demand() {
                                    info!("mined a block on demand, stopping miner thread");
                                    return Ok(());
                                }

                                // Solutions after a found block extend an
                                // old tip; skip them.
                                break;
                            }
                            Err(SubmitError::StaleBlock) => {
                                warn!("mined block is stale, discarding and rebuilding");
                                found = true;
                                break;
                            }
                            Err(SubmitError::Rejected(reason)) => {
                                // Remaining solutions in this batch are for
                                // the same rejected block contents, so stop
                                // probing them and rebuild.
                                warn!(%reason, "mined block was rejected, rebuilding");
                                found = true;
                                break;
                            }
                        }
                    }

                    if found {
                        break;
                    }
                }

                // Check for cancellation or whether the block needs to be
                // rebuilt.
                if self.cancel.check_and_clear() {
                    debug!("solver cancelled by tip change, rebuilding template");
                    break;
                }
                if self.config.mining_requires_peers
                    && network.mining_requires_peers()
                    && self.backend.peer_count() == 0
                {
                    break;
                }
                if template.block.header.nonce[0] == 0xff && template.block.header.nonce[1] == 0xff
                {
                    // Local nonce space exhausted.
                    break;
                }
                if self.backend.mempool_updates() != transactions_updated_last
                    && template_birth.elapsed() > TEMPLATE_STALENESS_TIMEOUT
                {
                    break;
                }
                if self.backend.tip_hash() != Some(chain_info.tip_hash) {
                    break;
                }

                // Update the nonce and time, and try again.
                increment_nonce(&mut template.block.header.nonce);
                template::update_time(&mut template.block.header, &chain_info);
            }
        }
    }
}

/// Increment a 256-bit little-endian nonce in place.
fn increment_nonce(nonce: &mut [u8; 32]) {
    for byte in nonce.iter_mut() {
        let (incremented, overflowed) = byte.overflowing_add(1);
        *byte = incremented;
        if !overflowed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_increments_little_endian() {
        let mut nonce = [0u8; 32];
        increment_nonce(&mut nonce);
        assert_eq!(nonce[0], 1);

        let mut nonce = [0u8; 32];
        nonce[0] = 0xff;
        increment_nonce(&mut nonce);
        assert_eq!(nonce[0], 0);
        assert_eq!(nonce[1], 1);
    }

    #[test]
    fn cancel_signal_clears_on_check() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());

        signal.notify();
        assert!(signal.is_cancelled());
        assert!(signal.check_and_clear());
        assert!(!signal.is_cancelled());
        assert!(!signal.check_and_clear());
    }
}

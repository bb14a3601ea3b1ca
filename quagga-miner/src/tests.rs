//! End-to-end template assembly and mining tests, on a mocked chain
//! backend.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{Duration, TimeZone, Utc};

use quagga_chain::{
    amount::{Amount, COIN},
    block::{self, Height},
    parameters::{Network, NetworkUpgrade},
    sapling,
    transaction::{self, LockTime, Transaction},
    transparent::{self, OutPoint, Script, Utxo},
    value_balance::ValueBalance,
    work::difficulty::ExpandedDifficulty,
};

use crate::{
    address::MinerAddress,
    chain::{ChainBackend, ChainInfo},
    coin_view::CoinView,
    coinbase,
    config::{BlockSizeLimits, Config},
    error::SubmitError,
    mempool::MempoolView,
    prover::mock::{MockOrchardProver, MockSaplingProver},
    script::{self, StandardVerifier},
    template::{self, TemplateParams},
    worker,
};

/// The regtest tip height used by most tests: Canopy and NU5 are active,
/// funding streams are active, and spendable outputs at height 1 have
/// plenty of confirmations.
const TIP_HEIGHT: u32 = 101;

fn regtest_chain_info(utxos: &HashMap<OutPoint, Utxo>) -> MockChain {
    let network = Network::Regtest;
    let limit = ExpandedDifficulty::target_difficulty_limit(network).to_compact();
    let tip_time = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();

    let history_roots = NetworkUpgrade::Nu5
        .branch_id()
        .into_iter()
        .chain(NetworkUpgrade::Canopy.branch_id())
        .chain(NetworkUpgrade::Heartwood.branch_id())
        .map(|branch_id| (u32::from(branch_id), [9; 32].into()))
        .collect();

    let info = ChainInfo {
        network,
        tip_hash: block::Hash([1; 32]),
        tip_height: Height(TIP_HEIGHT),
        relevant_difficulty_thresholds: vec![limit; 28],
        relevant_times: (0..28)
            .map(|i| tip_time - Duration::seconds(75 * i))
            .collect(),
        sapling_tree: sapling::tree::NoteCommitmentTree::default(),
        history_roots,
        chain_value_pools: Some(ValueBalance::zero()),
    };

    MockChain {
        info: Mutex::new(info),
        utxos: utxos.clone(),
        mempool: Mutex::new(MempoolView::new()),
        submitted: Mutex::new(Vec::new()),
        submit_stale: Mutex::new(false),
    }
}

/// A chain backend over fixed test state.
struct MockChain {
    info: Mutex<ChainInfo>,
    utxos: HashMap<OutPoint, Utxo>,
    mempool: Mutex<MempoolView>,
    submitted: Mutex<Vec<block::Block>>,
    submit_stale: Mutex<bool>,
}

impl ChainBackend for MockChain {
    fn network(&self) -> Network {
        self.info.lock().unwrap().network
    }

    fn chain_info(&self) -> Option<ChainInfo> {
        Some(self.info.lock().unwrap().clone())
    }

    fn tip_hash(&self) -> Option<block::Hash> {
        Some(self.info.lock().unwrap().tip_hash)
    }

    fn coin_view(&self, info: &ChainInfo) -> CoinView {
        CoinView::new(
            self.utxos.clone(),
            info.sapling_tree.root(),
            info.history_roots.clone(),
        )
    }

    fn mempool(&self) -> MempoolView {
        self.mempool.lock().unwrap().clone()
    }

    fn mempool_updates(&self) -> u64 {
        self.mempool.lock().unwrap().transactions_updated()
    }

    fn peer_count(&self) -> usize {
        1
    }

    fn is_initial_block_download(&self) -> bool {
        false
    }

    fn submit_block(&self, block: block::Block) -> Result<(), SubmitError> {
        if *self.submit_stale.lock().unwrap() {
            return Err(SubmitError::StaleBlock);
        }
        self.submitted.lock().unwrap().push(block);
        Ok(())
    }
}

/// A parent transaction hash for seeding the UTXO set.
fn funding_txid(n: u8) -> transaction::Hash {
    transaction::Hash([n; 32])
}

/// The deterministic "public key" locking a seeded output.
fn test_pub_key(key: u8) -> [u8; 33] {
    [key; 33]
}

/// An unlock script pushing a placeholder signature and the public key
/// for `key`, satisfying the standard verifier's P2PKH hash binding.
fn unlock_script_for(key: u8) -> Script {
    let mut raw = vec![71];
    raw.extend([0x30; 71]);
    raw.push(33);
    raw.extend(test_pub_key(key));
    Script::new(&raw)
}

/// Seed a UTXO with `value` zatoshis at height 1, locked to the key for
/// `txid`.
fn seed_utxo(utxos: &mut HashMap<OutPoint, Utxo>, txid: u8, value: i64) -> OutPoint {
    let outpoint = OutPoint {
        hash: funding_txid(txid),
        index: 0,
    };
    utxos.insert(
        outpoint,
        Utxo::new(
            transparent::Output {
                value: value.try_into().unwrap(),
                lock_script: Script::pay_to_public_key_hash(&script::hash160(&test_pub_key(
                    txid,
                ))),
            },
            Height(1),
            false,
        ),
    );
    outpoint
}

/// A v4 transaction spending `outpoint` with the unlock script for `key`,
/// paying `fee`, padded with a `padding`-byte output script.
fn spend(outpoint: OutPoint, key: u8, value_in: i64, fee: i64, padding: usize) -> Transaction {
    Transaction::V4 {
        inputs: vec![transparent::Input::PrevOut {
            outpoint,
            unlock_script: unlock_script_for(key),
            sequence: u32::MAX,
        }],
        outputs: vec![transparent::Output {
            value: (value_in - fee).try_into().unwrap(),
            lock_script: Script::new(&vec![0x00; padding.max(1)]),
        }],
        lock_time: LockTime::unlocked(),
        expiry_height: Height(0),
        joinsplit_data: None,
        sapling_shielded_data: None,
    }
}

fn miner_script() -> Script {
    Script::pay_to_public_key_hash(&[0x42; 20])
}

fn build_template_with(
    chain: &MockChain,
    params: &TemplateParams,
) -> crate::template::BlockTemplate {
    let info = chain.chain_info().unwrap();
    let view = chain.coin_view(&info);
    let mempool = chain.mempool();
    let sapling_prover = MockSaplingProver::default();

    let template = template::build_template(
        &info,
        view,
        &mempool,
        &MinerAddress::Transparent(miner_script()),
        &sapling_prover,
        &MockOrchardProver,
        &StandardVerifier,
        params,
    )
    .expect("template assembly succeeds");

    assert_eq!(sapling_prover.open_contexts(), 0);
    template
}

#[test]
fn empty_mempool_produces_a_coinbase_only_template() {
    let chain = regtest_chain_info(&HashMap::new());
    let template = build_template_with(&chain, &TemplateParams::default());

    assert_eq!(template.block.transactions.len(), 1);
    assert_eq!(template.height, Height(TIP_HEIGHT + 1));
    assert_eq!(template.total_fees, 0);
    assert_eq!(template.tx_fees.len(), 1);
    assert_eq!(template.tx_fees[0], 0);
    assert_eq!(
        template.block.coinbase_height(),
        Some(Height(TIP_HEIGHT + 1)),
    );
}

#[test]
fn dependency_chains_select_parents_first() {
    let mut utxos = HashMap::new();
    let outpoint = seed_utxo(&mut utxos, 1, 1_000 * COIN);
    let chain = regtest_chain_info(&utxos);

    let tx_a = spend(outpoint, 1, 1_000 * COIN, 20_000, 1);
    // the chained spends consume nonstandard outputs, so any key works
    let tx_b = spend(
        OutPoint {
            hash: tx_a.hash(),
            index: 0,
        },
        0,
        1_000 * COIN - 20_000,
        20_000,
        1,
    );
    let tx_c = spend(
        OutPoint {
            hash: tx_b.hash(),
            index: 0,
        },
        0,
        1_000 * COIN - 40_000,
        20_000,
        1,
    );

    {
        // insert out of order, so both B and C start as orphans
        let mut mempool = chain.mempool.lock().unwrap();
        mempool.insert(tx_c.clone());
        mempool.insert(tx_b.clone());
        mempool.insert(tx_a.clone());
    }

    let template = build_template_with(&chain, &TemplateParams::default());

    let ids: Vec<transaction::Hash> = template.block.transactions[1..]
        .iter()
        .map(|tx| tx.hash())
        .collect();
    assert_eq!(ids, vec![tx_a.hash(), tx_b.hash(), tx_c.hash()]);

    // fees are summed, and the coinbase entry is their negation
    assert_eq!(template.total_fees, 60_000);
    assert_eq!(template.tx_fees[0], -60_000);
    assert_eq!(template.tx_fees.len(), 4);
}

#[test]
fn priority_phase_runs_before_fee_phase() {
    let mut utxos = HashMap::new();
    let mut priority_outpoints = Vec::new();
    for n in 1..=10 {
        priority_outpoints.push(seed_utxo(&mut utxos, n, 1_000 * COIN));
    }
    let fee_outpoint = seed_utxo(&mut utxos, 42, COIN);
    let chain = regtest_chain_info(&utxos);

    // ten high-priority free transactions of about 10 kB each
    let priority_txs: Vec<Transaction> = priority_outpoints
        .into_iter()
        .zip(1u8..)
        .map(|(outpoint, key)| spend(outpoint, key, 1_000 * COIN, 0, 9_900))
        .collect();
    // one well-paying transaction of about 1 kB
    let fee_tx = spend(fee_outpoint, 42, COIN, 50_000, 900);

    {
        let mut mempool = chain.mempool.lock().unwrap();
        mempool.insert(fee_tx.clone());
        for tx in &priority_txs {
            mempool.insert(tx.clone());
        }
    }

    let params = TemplateParams {
        limits: BlockSizeLimits {
            max_size: 1_900_000,
            priority_size: 100_000,
            min_size: 0,
        },
        ..TemplateParams::default()
    };
    let template = build_template_with(&chain, &params);

    // all ten priority transactions appear first, then the fee-paying one
    assert_eq!(template.block.transactions.len(), 12);
    let selected: Vec<transaction::Hash> = template.block.transactions[1..]
        .iter()
        .map(|tx| tx.hash())
        .collect();
    let priority_ids: std::collections::HashSet<transaction::Hash> =
        priority_txs.iter().map(Transaction::hash).collect();
    assert!(selected[..10]
        .iter()
        .all(|txid| priority_ids.contains(txid)));
    assert_eq!(selected[10], fee_tx.hash());
}

#[test]
fn free_transactions_are_skipped_in_the_fee_phase() {
    let mut utxos = HashMap::new();
    // low value and low age: priority is below the free threshold
    let free_outpoint = seed_utxo(&mut utxos, 1, 10_000);
    let paying_outpoint = seed_utxo(&mut utxos, 2, COIN);
    let chain = regtest_chain_info(&utxos);

    let free_tx = spend(free_outpoint, 1, 10_000, 0, 1);
    let paying_tx = spend(paying_outpoint, 2, COIN, 50_000, 1);

    {
        let mut mempool = chain.mempool.lock().unwrap();
        mempool.insert(free_tx.clone());
        mempool.insert(paying_tx.clone());
    }

    // a zero priority budget starts selection directly in the fee phase
    let params = TemplateParams {
        limits: BlockSizeLimits {
            priority_size: 0,
            ..Config::default().block_size_limits()
        },
        ..TemplateParams::default()
    };
    let template = build_template_with(&chain, &params);

    let selected: Vec<transaction::Hash> = template.block.transactions[1..]
        .iter()
        .map(|tx| tx.hash())
        .collect();
    assert_eq!(selected, vec![paying_tx.hash()]);
}

#[test]
fn prioritised_free_transactions_are_kept() {
    let mut utxos = HashMap::new();
    let free_outpoint = seed_utxo(&mut utxos, 1, 10_000);
    let chain = regtest_chain_info(&utxos);

    let free_tx = spend(free_outpoint, 1, 10_000, 0, 1);

    {
        let mut mempool = chain.mempool.lock().unwrap();
        mempool.insert(free_tx.clone());
        // an administrator fee delta overrides the free-transaction gate
        mempool.prioritise_transaction(
            free_tx.hash(),
            0.0,
            Amount::try_from(100_000).unwrap(),
        );
    }

    let params = TemplateParams {
        limits: BlockSizeLimits {
            priority_size: 0,
            ..Config::default().block_size_limits()
        },
        ..TemplateParams::default()
    };
    let template = build_template_with(&chain, &params);
    assert_eq!(template.block.transactions.len(), 2);
    // the delta affects ordering, not the real fee collected
    assert_eq!(template.total_fees, 0);
}

#[test]
fn sigop_heavy_transactions_hit_the_ceiling() {
    let mut utxos = HashMap::new();
    let heavy_outpoint = seed_utxo(&mut utxos, 1, 1_000 * COIN);
    let tiny_outpoint = seed_utxo(&mut utxos, 2, COIN);
    let chain = regtest_chain_info(&utxos);

    // 19_899 sigops: the most that fits under the ceiling after the
    // 100-sigop coinbase reserve
    let heavy_tx = Transaction::V4 {
        inputs: vec![transparent::Input::PrevOut {
            outpoint: heavy_outpoint,
            unlock_script: unlock_script_for(1),
            sequence: u32::MAX,
        }],
        outputs: vec![transparent::Output {
            value: (1_000 * COIN - 10_000_000).try_into().unwrap(),
            lock_script: Script::new(&vec![0xac; 19_899]),
        }],
        lock_time: LockTime::unlocked(),
        expiry_height: Height(0),
        joinsplit_data: None,
        sapling_shielded_data: None,
    };
    // pays a worse fee rate than the heavy transaction
    let tiny_tx = spend(tiny_outpoint, 2, COIN, 10_000, 1);

    {
        let mut mempool = chain.mempool.lock().unwrap();
        mempool.insert(heavy_tx.clone());
        mempool.insert(tiny_tx.clone());
    }

    let template = build_template_with(&chain, &TemplateParams::default());

    let selected: Vec<transaction::Hash> = template.block.transactions[1..]
        .iter()
        .map(|tx| tx.hash())
        .collect();
    // the heavy transaction is selected; the tiny one no longer fits
    // under the sigop ceiling
    assert_eq!(selected, vec![heavy_tx.hash()]);
}

#[test]
fn turnstile_violations_are_skipped() {
    let mut utxos = HashMap::new();
    let violating_outpoint = seed_utxo(&mut utxos, 1, COIN);
    let sane_outpoint = seed_utxo(&mut utxos, 2, COIN);
    let chain = regtest_chain_info(&utxos);

    // a transaction claiming to withdraw 1 zatoshi from an empty Sapling
    // pool
    let violating_tx = Transaction::V4 {
        inputs: vec![transparent::Input::PrevOut {
            outpoint: violating_outpoint,
            unlock_script: unlock_script_for(1),
            sequence: u32::MAX,
        }],
        outputs: vec![transparent::Output {
            value: (COIN - 50_000).try_into().unwrap(),
            lock_script: Script::pay_to_public_key_hash(&[3; 20]),
        }],
        lock_time: LockTime::unlocked(),
        expiry_height: Height(0),
        joinsplit_data: None,
        sapling_shielded_data: Some(sapling::ShieldedData {
            value_balance: 1.try_into().unwrap(),
            shared_anchor: None,
            spends: vec![],
            outputs: vec![],
            binding_sig: [0; 64].into(),
        }),
    };
    let sane_tx = spend(sane_outpoint, 2, COIN, 50_000, 1);

    {
        let mut mempool = chain.mempool.lock().unwrap();
        mempool.insert(violating_tx.clone());
        mempool.insert(sane_tx.clone());
    }

    let template = build_template_with(&chain, &TemplateParams::default());

    let selected: Vec<transaction::Hash> = template.block.transactions[1..]
        .iter()
        .map(|tx| tx.hash())
        .collect();
    assert_eq!(selected, vec![sane_tx.hash()]);
}

#[test]
fn precomputed_coinbase_skips_the_mempool() {
    let mut utxos = HashMap::new();
    let outpoint = seed_utxo(&mut utxos, 1, COIN);
    let chain = regtest_chain_info(&utxos);

    {
        let mut mempool = chain.mempool.lock().unwrap();
        mempool.insert(spend(outpoint, 1, COIN, 50_000, 1));
    }

    let sapling_prover = MockSaplingProver::default();
    let precomputed = coinbase::create_coinbase_transaction(
        Network::Regtest,
        Height(TIP_HEIGHT + 1),
        Amount::zero(),
        &MinerAddress::Transparent(miner_script()),
        &sapling_prover,
        &MockOrchardProver,
    )
    .unwrap();

    let params = TemplateParams {
        precomputed_coinbase: Some(precomputed.clone()),
        ..TemplateParams::default()
    };
    let template = build_template_with(&chain, &params);

    // the mempool transaction is ignored, and fees are zero
    assert_eq!(template.block.transactions.len(), 1);
    assert_eq!(template.block.transactions[0].as_ref(), &precomputed);
    assert_eq!(template.total_fees, 0);
}

#[test]
fn extra_nonce_rewrites_the_coinbase_and_roots() {
    let chain = regtest_chain_info(&HashMap::new());
    let mut template = build_template_with(&chain, &TemplateParams::default());

    let mut extra_nonce = 0;
    let mut last_prev_block = None;
    template::increment_extra_nonce(&mut template, &mut extra_nonce, &mut last_prev_block);
    assert_eq!(extra_nonce, 1);

    let first_merkle_root = template.block.header.merkle_root;
    let first_commitments = template.block.header.commitment_bytes;

    // the coinbase script now carries the extra nonce and the flags
    match &template.block.transactions[0].inputs()[0] {
        transparent::Input::Coinbase { data, .. } => {
            assert!(data.as_ref().ends_with(template::COINBASE_FLAGS));
        }
        _ => panic!("template coinbase is always at index 0"),
    }

    // incrementing again changes the coinbase, so the roots change too
    template::increment_extra_nonce(&mut template, &mut extra_nonce, &mut last_prev_block);
    assert_eq!(extra_nonce, 2);
    assert_ne!(template.block.header.merkle_root, first_merkle_root);
    assert_ne!(template.block.header.commitment_bytes, first_commitments);

    // a new previous block resets the counter
    template.block.header.previous_block_hash = block::Hash([7; 32]);
    template::increment_extra_nonce(&mut template, &mut extra_nonce, &mut last_prev_block);
    assert_eq!(extra_nonce, 1);
}

#[test]
fn template_selection_is_deterministic() {
    let mut utxos = HashMap::new();
    for n in 1..=5 {
        seed_utxo(&mut utxos, n, 1_000 * COIN);
    }
    let chain = regtest_chain_info(&utxos);

    {
        let mut mempool = chain.mempool.lock().unwrap();
        for n in 1..=5 {
            mempool.insert(spend(
                OutPoint {
                    hash: funding_txid(n),
                    index: 0,
                },
                n,
                1_000 * COIN,
                20_000 * n as i64,
                100 * n as usize,
            ));
        }
    }

    let first = build_template_with(&chain, &TemplateParams::default());
    let second = build_template_with(&chain, &TemplateParams::default());

    // for a fixed mempool and tip, selection is deterministic; only the
    // random nonce differs
    let first_ids: Vec<transaction::Hash> =
        first.block.transactions.iter().map(|tx| tx.hash()).collect();
    let second_ids: Vec<transaction::Hash> =
        second.block.transactions.iter().map(|tx| tx.hash()).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(first.tx_fees, second.tx_fees);
    assert_ne!(first.block.header.nonce, second.block.header.nonce);
}

#[test]
fn stale_submissions_are_reported() {
    let chain = regtest_chain_info(&HashMap::new());
    *chain.submit_stale.lock().unwrap() = true;

    let template = build_template_with(&chain, &TemplateParams::default());
    assert_eq!(
        chain.submit_block(template.block),
        Err(SubmitError::StaleBlock),
    );
}

#[test]
fn regtest_miner_mines_and_submits_a_block() {
    let chain = Arc::new(regtest_chain_info(&HashMap::new()));

    let miner_address = transparent::Address::PayToPublicKeyHash {
        network: Network::Testnet,
        pub_key_hash: [0x42; 20],
    };

    let config = Config {
        miner_address: Some(miner_address.to_string()),
        gen: true,
        gen_proc_limit: 1,
        ..Config::default()
    };

    let (_cancel, handles) = worker::spawn_miners(
        &config,
        chain.clone(),
        Arc::new(MockSaplingProver::default()),
        Arc::new(MockOrchardProver),
        Arc::new(StandardVerifier),
    );
    assert_eq!(handles.len(), 1);

    // In regtest mode the miner stops after its first block.
    for handle in handles {
        handle
            .join()
            .expect("miner thread does not panic")
            .expect("miner thread finds a block");
    }

    let submitted = chain.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);

    let block = &submitted[0];
    assert_eq!(block.coinbase_height(), Some(Height(TIP_HEIGHT + 1)));

    // the proof of work is genuine: the solution verifies, and the header
    // hash meets the difficulty target
    block
        .header
        .solution
        .check(&block.header)
        .expect("mined block has a valid equihash solution");
    let target = block
        .header
        .difficulty_threshold
        .to_expanded()
        .expect("mined block has a valid difficulty threshold");
    assert!(block.hash() <= target);
}

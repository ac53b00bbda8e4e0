use bitcoin::absolute::LockTime;
use bitcoin::block::{Header, Version as BlockVersion};
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, Block, BlockHash, CompactTarget, Network, OutPoint, ScriptBuf, Sequence, Transaction,
    TxIn, TxMerkleNode, TxOut, Txid, Witness,
};
use ordinals::{Edict, Etching, RuneId, Runestone, RunestoneEtching};
use pretty_assertions::assert_eq;
use runes_indexer::{IndexedBlock, IndexerConfig, RunesIndexer};
use runes_support::host::RuneHost;
use runes_support::store::MemStore;
use runes_sync::test_utils::MemoryChain;
use runes_sync::{RunesSync, SyncConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn script(n: u8) -> ScriptBuf {
    let mut bytes = vec![0x00, 0x14];
    bytes.extend([n; 20]);
    ScriptBuf::from_bytes(bytes)
}

fn transaction(inputs: &[OutPoint], outputs: Vec<ScriptBuf>) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs
            .iter()
            .map(|previous_output| TxIn {
                previous_output: *previous_output,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
            .collect(),
        output: outputs
            .into_iter()
            .map(|script_pubkey| TxOut {
                value: Amount::from_sat(546),
                script_pubkey,
            })
            .collect(),
    }
}

fn block(height: u64, prev_blockhash: BlockHash, nonce: u32, txdata: Vec<Transaction>) -> IndexedBlock {
    IndexedBlock::new(
        height,
        Block {
            header: Header {
                version: BlockVersion::ONE,
                prev_blockhash,
                merkle_root: TxMerkleNode::all_zeros(),
                time: 1_700_000_000 + height as u32,
                bits: CompactTarget::from_consensus(0x207fffff),
                nonce,
            },
            txdata,
        },
    )
}

/// Appends empty blocks until `chain` reaches `height`.
fn extend(chain: &mut Vec<IndexedBlock>, height: u64, nonce: u32) {
    while chain.len() as u64 <= height {
        let prev = chain
            .last()
            .map_or(BlockHash::all_zeros(), |block| block.header.hash);
        chain.push(block(chain.len() as u64, prev, nonce, vec![]));
    }
}

async fn sync_to(
    source: Arc<MemoryChain<IndexedBlock>>,
    indexer: RunesIndexer<MemStore>,
    exit_at: u64,
) -> RunesIndexer<MemStore> {
    let config = SyncConfig::new()
        .with_poll_interval(Duration::from_millis(10))
        .with_batch_size(4)
        .with_exit_at(Some(exit_at));
    indexer.config().validate_with(&config).unwrap();

    let mut sync = RunesSync::new(source, indexer, config).unwrap();
    let (_shutdown, receiver) = watch::channel(false);
    sync.run(receiver).await.unwrap();
    sync.into_processor()
}

#[tokio::test]
async fn reorg_reverts_only_the_forked_blocks() {
    runes_indexer::logging::init_logger();

    let etch = transaction(
        &[OutPoint {
            txid: Txid::from_byte_array([1; 32]),
            vout: 0,
        }],
        vec![
            script(1),
            Runestone {
                etching: Some(RunestoneEtching::Full(Etching {
                    premine: Some(1000),
                    ..Default::default()
                })),
                ..Default::default()
            }
            .encipher(),
        ],
    );
    let premined = OutPoint {
        txid: etch.compute_txid(),
        vout: 0,
    };
    let id = RuneId::new(1, 0).unwrap();

    let mut original = Vec::new();
    extend(&mut original, 0, 0);
    original.push(block(1, original[0].header.hash, 0, vec![etch]));
    extend(&mut original, 9, 0);

    let transfer = transaction(
        &[premined],
        vec![
            script(2),
            script(3),
            Runestone {
                edicts: vec![Edict {
                    id,
                    amount: 400,
                    output: 1,
                }],
                ..Default::default()
            }
            .encipher(),
        ],
    );
    let moved = OutPoint {
        txid: transfer.compute_txid(),
        vout: 1,
    };
    original.push(block(10, original[9].header.hash, 0, vec![transfer]));

    let source = Arc::new(MemoryChain::new(original.clone(), 4));
    let indexer = RunesIndexer::new(
        Arc::new(MemStore::new()),
        IndexerConfig::new(Network::Regtest).with_label("reorg-test"),
    )
    .unwrap();
    let indexer = sync_to(source.clone(), indexer, 10).await;

    let ledger = indexer.ledger();
    assert_eq!(ledger.balances_at(&moved).unwrap().get(&id), 400);
    assert_eq!(ledger.balances_by_script(&script(1)).unwrap().get(&id), 0);
    let before: Vec<_> = (0..10)
        .map(|height| ledger.header_at(height).unwrap().unwrap())
        .collect();

    // same parent at 9, different block at 10 and two more on top
    let mut forked = original[..10].to_vec();
    extend(&mut forked, 12, 7);
    source.replace_from(10, forked[10..].to_vec());

    let indexer = sync_to(source.clone(), indexer, 12).await;
    let ledger = indexer.ledger();

    let after: Vec<_> = (0..10)
        .map(|height| ledger.header_at(height).unwrap().unwrap())
        .collect();
    assert_eq!(before, after);
    for height in 10..=12 {
        assert_eq!(
            ledger.header_at(height).unwrap().map(|header| header.hash),
            Some(forked[height as usize].header.hash)
        );
    }

    assert!(ledger.balances_at(&moved).unwrap().is_empty());
    assert_eq!(ledger.balances_at(&premined).unwrap().get(&id), 1000);
    assert_eq!(ledger.balances_by_script(&script(1)).unwrap().get(&id), 1000);
    assert!(ledger.balances_by_script(&script(3)).unwrap().is_empty());
    assert_eq!(ledger.transaction(&moved.txid).unwrap(), None);
    indexer.check_consistency().unwrap();
}

#[tokio::test]
async fn restart_resumes_from_tip() {
    let mut chain = Vec::new();
    extend(&mut chain, 5, 0);
    let source = Arc::new(MemoryChain::new(chain.clone(), 2));
    let store = Arc::new(MemStore::new());

    let indexer = RunesIndexer::new(store.clone(), IndexerConfig::new(Network::Regtest)).unwrap();
    sync_to(source.clone(), indexer, 3).await;

    extend(&mut chain, 8, 0);
    for block in &chain[6..] {
        source.push(block.clone());
    }

    let indexer = RunesIndexer::new(store, IndexerConfig::new(Network::Regtest)).unwrap();
    let indexer = sync_to(source, indexer, 8).await;
    assert_eq!(
        indexer.ledger().tip().unwrap().map(|tip| tip.height),
        Some(8)
    );
    indexer.check_consistency().unwrap();
}

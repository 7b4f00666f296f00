//! Full flow: genesis, transfer, batch, mining, chain validation

use powchain::blockchain::{Block, Chain, TransactionBatch};
use powchain::config::ChainConfig;
use powchain::crypto::KeyPair;
use powchain::error::ChainError;
use powchain::mempool::{Mempool, SelectionPolicy};
use powchain::miner::{build_block, select_payload, MiningJob, MiningOutcome};
use powchain::transaction::{Transaction, TransactionKind};

#[test]
fn test_genesis_transfer_mine_append() -> Result<(), Box<dyn std::error::Error>> {
    let config = ChainConfig::default();
    let signer = KeyPair::generate();
    let bob = KeyPair::generate().address();

    let genesis = Block::create_genesis(&signer, &config)?;
    let transfer = Transaction::transfer(&signer, bob.clone(), 10, 2, None, &config)?;
    let batch = TransactionBatch::create(&signer, None, vec![transfer], &config)?;

    let mut block = Block::construct(1, genesis.hash(), batch)?;
    block.mine(&config)?;
    assert!(block.hash().starts_with("000"));
    block.validate(&config)?;

    let mut chain = Chain::initialize(genesis, config)?;
    assert!(chain.append(block));
    assert!(chain.validate_all());

    // Signer: genesis reward, minus the transfer, plus reward and fee of block 1.
    assert_eq!(chain.balance_of(&signer.address()), 100 - 10 + 100 + 2);
    assert_eq!(chain.balance_of(&bob), 10);

    Ok(())
}

#[test]
fn test_round_trip_through_datastrings() -> Result<(), Box<dyn std::error::Error>> {
    let config = ChainConfig::default();
    let signer = KeyPair::generate();
    let genesis = Block::create_genesis(&signer, &config)?;

    let tx = Transaction::transfer(
        &signer,
        KeyPair::generate().address(),
        7,
        1,
        Some("invoice 42".to_string()),
        &config,
    )?;
    let rebuilt_tx = Transaction::reconstruct(tx.datastring(), tx.signature(), &config)?;
    assert_eq!(rebuilt_tx.data().encode()?, tx.datastring());

    let batch = TransactionBatch::create(&signer, None, vec![tx], &config)?;
    let mut block = Block::construct(1, genesis.hash(), batch)?;
    block.mine(&config)?;

    let rebuilt = Block::from_datastring(block.datastring(), block.hash(), &config)?;
    assert_eq!(rebuilt.datastring(), block.datastring());
    assert_eq!(rebuilt.hash(), block.hash());
    assert_eq!(rebuilt, block);

    Ok(())
}

#[test]
fn test_mempool_to_chain_with_background_miner() -> Result<(), Box<dyn std::error::Error>> {
    let config = ChainConfig {
        difficulty: 2,
        block_size: 2,
        selection_policy: SelectionPolicy::HighestFeeFirst,
        ..ChainConfig::default()
    };
    let miner = KeyPair::generate();
    let genesis = Block::create_genesis(&miner, &config)?;
    let mut chain = Chain::initialize(genesis, config.clone())?;

    let mut mempool = Mempool::new();
    let mut fees = Vec::new();
    for fee in [1, 8, 3] {
        let alice = KeyPair::generate();
        let tx =
            Transaction::transfer(&alice, KeyPair::generate().address(), 5, fee, None, &config)?;
        fees.push((fee, tx.id()));
        mempool.add_transaction(tx)?;
    }

    let payload = select_payload(&mempool, &config)?;
    assert_eq!(payload.iter().map(|tx| tx.fee()).collect::<Vec<_>>(), vec![8, 3]);

    let block = build_block(&chain, &miner, None, payload)?;
    let block = match MiningJob::spawn(block, config.clone()).wait()? {
        MiningOutcome::Mined(block) => block,
        MiningOutcome::Cancelled => return Err("mining was cancelled".into()),
    };

    let fee_entry = block
        .transactions()
        .last()
        .ok_or("empty batch")?;
    assert_eq!(fee_entry.kind(), TransactionKind::Fee);
    assert_eq!(fee_entry.value(), 11);

    assert!(chain.append(block.clone()));
    assert!(chain.validate_all());
    assert_eq!(mempool.remove_included(&block), 2);
    assert_eq!(mempool.len(), 1);
    assert!(mempool.contains(&fees[0].1));

    Ok(())
}

#[test]
fn test_unmined_block_breaks_chain() -> Result<(), Box<dyn std::error::Error>> {
    let config = ChainConfig::default();
    let miner = KeyPair::generate();
    let genesis = Block::create_genesis(&miner, &config)?;
    let mut chain = Chain::initialize(genesis, config.clone())?;

    let payload = vec![Transaction::transfer(
        &miner,
        KeyPair::generate().address(),
        1,
        0,
        None,
        &config,
    )?];
    let block = build_block(&chain, &miner, None, payload)?;

    // `append` only checks the id; the missing proof-of-work shows up in verification
    // unless the unmined hash happens to start with "000".
    let lucky = block.is_mined(&config);
    assert!(chain.append(block));
    if !lucky {
        assert_eq!(chain.verify(), Err(ChainError::NotMined(1)));
        assert!(!chain.validate_all());
    }

    Ok(())
}

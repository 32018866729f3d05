// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use std::time::Duration;

use platform_kernel::identity::Identity;
use platform_kernel::transition::StateTransition;
use platform_node::chain::{ReadEndpoint, TransitionBroadcaster};
use platform_node::config::PollOptions;
use platform_node::{NodeConfig, NodeError};

use common::{key, setup, setup_with, WALLET};

#[tokio::test(start_paused = true)]
async fn test_wallet_balance_reaches_funded_amount() {
    let (network, client) = setup();
    let start = tokio::time::Instant::now();

    network.chain.fund_address(WALLET, 40_000);
    let balance = client.wait_for_balance(40_000).await.unwrap();

    assert!(balance >= 40_000);
    // Not visible until the faucet transaction is instant-locked.
    assert!(start.elapsed() >= client.config().instant_lock_delay);
}

#[tokio::test(start_paused = true)]
async fn test_wallet_balance_times_out_when_underfunded() {
    let mut cfg = NodeConfig::default();
    cfg.poll = PollOptions::new(Duration::from_millis(100), 5);
    let (network, client) = setup_with(cfg);

    network.chain.fund_address(WALLET, 40_000);
    let err = client.wait_for_balance(50_000).await.unwrap_err();
    assert!(matches!(err, NodeError::Timeout { attempts: 5 }));
}

#[tokio::test(start_paused = true)]
async fn test_other_addresses_do_not_count() {
    let (network, client) = setup();
    network.chain.fund_address("ySomeoneElse", 40_000);
    network.chain.fund_address(WALLET, 15_000);
    network.chain.mine_block();

    assert_eq!(client.wait_for_balance(15_000).await.unwrap(), 15_000);
}

#[tokio::test(start_paused = true)]
async fn test_accepted_transition_is_not_immediately_readable() {
    let (network, client) = setup();
    let proof = client.build_asset_lock_proof(10_000).await.unwrap();
    let id = Identity::id_from_out_point(&proof.out_point());

    let transition = StateTransition::IdentityCreate {
        asset_lock_proof: proof,
        public_keys: vec![key(0, 1)],
        signature: Vec::new(),
    };
    network.platform.broadcast_state_transition(transition.to_bytes().unwrap()).await.unwrap();

    assert!(network.platform.fetch_identity(id).await.unwrap().is_none());

    tokio::time::sleep(client.config().propagation_delay * 2).await;
    let identity = network.platform.fetch_identity(id).await.unwrap().unwrap();
    assert_eq!(identity.balance, 10_000_000);
}

#[tokio::test(start_paused = true)]
async fn test_zero_propagation_delay_reads_immediately() {
    let mut cfg = NodeConfig::default();
    cfg.propagation_delay = Duration::ZERO;
    let (network, client) = setup_with(cfg);

    let before = network.platform.published_version();
    let identity = client.register_identity(vec![key(0, 2)]).await.unwrap();

    assert_eq!(network.platform.published_version(), before + 1);
    assert_eq!(client.get_identity(&identity.id).await.unwrap(), Some(identity));
}

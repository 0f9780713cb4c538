//! # Integration Test Flows
//!
//! Full ingestion runs over ledgers mixing contract deployments, escrow
//! constructors, trustline changes and plain payments.
//!
//! ## Flows Tested:
//!
//! 1. **Deployment → ContractChange**: every derived contract id reaches the sink
//! 2. **Escrow constructor → Escrow/Initialize**: single and multi release
//! 3. **Participant filtering**: only registered accounts survive
//! 4. **Re-ingestion**: persisting a range twice leaves one copy per ledger

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    use ledger_indexer::domain::{MULTI_RELEASE_ESCROW_FN, SINGLE_RELEASE_ESCROW_FN};
    use ledger_indexer::fixtures;
    use ledger_indexer::{
        derive_contract_id, EscrowKind, InMemoryLedgerSink, InMemoryLedgerSource, IngestApi,
        IngestConfig, IngestService, LedgerRecord, NetworkId, StateChangeCategory,
        StateChangeReason,
    };
    use stellar_xdr::curr::{HostFunction, SorobanAuthorizedFunction};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Ledger `sequence` with a deployment, an escrow, a trustline and a payment.
    fn mixed_ledger(sequence: u32) -> LedgerRecord {
        let nested_deploy = fixtures::invoke_host_function_op(
            HostFunction::InvokeContract(fixtures::invoke_contract_args(40, "deploy")),
            vec![fixtures::auth_entry(fixtures::invocation(
                SorobanAuthorizedFunction::ContractFn(fixtures::invoke_contract_args(40, "deploy")),
                vec![fixtures::invocation(
                    SorobanAuthorizedFunction::CreateContractV2HostFn(
                        fixtures::create_contract_args_v2(12, sequence as u8),
                    ),
                    vec![],
                )],
            ))],
        );

        fixtures::ledger(
            sequence,
            vec![
                fixtures::transaction(
                    sequence,
                    1,
                    11,
                    vec![fixtures::deploy_contract_op(11, sequence as u8)],
                ),
                fixtures::transaction(
                    sequence,
                    2,
                    12,
                    vec![fixtures::invoke_contract_op(50, SINGLE_RELEASE_ESCROW_FN)],
                ),
                fixtures::transaction(
                    sequence,
                    3,
                    13,
                    vec![fixtures::change_trust_op("USDC", 30, 1_000_000)],
                ),
                fixtures::transaction(sequence, 4, 14, vec![fixtures::payment_op(15, 25)]),
                fixtures::transaction(
                    sequence,
                    5,
                    12,
                    vec![
                        fixtures::invoke_contract_op(51, MULTI_RELEASE_ESCROW_FN),
                        nested_deploy,
                    ],
                ),
            ],
        )
    }

    struct Pipeline {
        service: Arc<IngestService<InMemoryLedgerSource, InMemoryLedgerSink>>,
        sink: Arc<InMemoryLedgerSink>,
        _shutdown: watch::Sender<bool>,
    }

    fn pipeline(config: IngestConfig, ledgers: Vec<LedgerRecord>) -> Pipeline {
        let source = Arc::new(InMemoryLedgerSource::with_ledgers(ledgers));
        let sink = Arc::new(InMemoryLedgerSink::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let service = IngestService::from_config(&config, source, Arc::clone(&sink), shutdown_rx)
            .expect("valid config");
        Pipeline {
            service: Arc::new(service),
            sink,
            _shutdown: shutdown_tx,
        }
    }

    // =============================================================================
    // INTEGRATION TESTS: DEPLOYMENTS AND ESCROWS
    // =============================================================================

    /// Every deployment in the range becomes a contract change with the
    /// contract id derived from the testnet network id.
    #[tokio::test]
    async fn test_deployments_reach_sink_as_contract_changes() {
        let p = pipeline(
            IngestConfig::for_testing(),
            (100..103).map(mixed_ledger).collect(),
        );

        p.service.run(100, 103).await.unwrap();

        let network = NetworkId::testnet();
        for sequence in 100..103u32 {
            let buffer = p.sink.ledger(sequence).expect("ledger persisted");
            let contract_ids: Vec<&str> = buffer
                .contract_changes()
                .iter()
                .map(|c| c.contract_id.as_str())
                .collect();

            let top_level =
                derive_contract_id(&network, &fixtures::address_preimage(11, sequence as u8))
                    .unwrap();
            let nested =
                derive_contract_id(&network, &fixtures::address_preimage(12, sequence as u8))
                    .unwrap();
            assert_eq!(contract_ids, vec![top_level.as_str(), nested.as_str()]);
            assert!(buffer
                .contract_changes()
                .iter()
                .all(|c| c.ledger_number == sequence));
        }
    }

    /// Escrow constructors produce Escrow/Initialize changes in
    /// transaction order, attributed to the calling account.
    #[tokio::test]
    async fn test_escrow_initializations() {
        let p = pipeline(IngestConfig::for_testing(), vec![mixed_ledger(200)]);

        p.service.run(200, 201).await.unwrap();

        let buffer = p.sink.ledger(200).unwrap();
        let escrows: Vec<_> = buffer
            .state_changes()
            .iter()
            .filter(|c| c.category == StateChangeCategory::Escrow)
            .collect();

        assert_eq!(escrows.len(), 2);
        assert_eq!(escrows[0].escrow_kind, Some(EscrowKind::SingleRelease));
        assert_eq!(escrows[1].escrow_kind, Some(EscrowKind::MultiRelease));
        assert!(escrows
            .iter()
            .all(|c| c.reason == StateChangeReason::Initialize));
        assert!(escrows
            .iter()
            .all(|c| c.deployer_account_id == Some(fixtures::account_strkey(12))));
        assert!(escrows[0].tx_id < escrows[1].tx_id);
    }

    /// State changes keep ledger order: transaction index, then operation.
    #[tokio::test]
    async fn test_state_changes_follow_transaction_order() {
        let mut config = IngestConfig::for_testing();
        config.worker_count = 8;
        let p = pipeline(config, vec![mixed_ledger(300)]);

        p.service.run(300, 301).await.unwrap();

        let buffer = p.sink.ledger(300).unwrap();
        let operation_ids: Vec<i64> = buffer
            .state_changes()
            .iter()
            .filter_map(|c| c.operation_id)
            .collect();
        let mut sorted = operation_ids.clone();
        sorted.sort();
        assert_eq!(operation_ids, sorted);
        assert_eq!(buffer.transaction_count(), 5);
        assert_eq!(buffer.trustline_changes().len(), 1);
    }

    /// State changes serialize with upper-case category and reason.
    #[tokio::test]
    async fn test_state_changes_serialize() {
        let p = pipeline(IngestConfig::for_testing(), vec![mixed_ledger(400)]);
        p.service.run(400, 401).await.unwrap();

        let buffer = p.sink.ledger(400).unwrap();
        let json = serde_json::to_value(buffer.state_changes()).unwrap();
        let first = &json[0];
        assert_eq!(first["category"], "ACCOUNT");
        assert_eq!(first["reason"], "CREATE");
        assert_eq!(first["ledger_number"], 400);
    }

    // =============================================================================
    // INTEGRATION TESTS: FILTERING AND RE-INGESTION
    // =============================================================================

    /// With participant filtering, only transactions touching a registered
    /// account are kept.
    #[tokio::test]
    async fn test_participant_filtering() {
        let mut config = IngestConfig::for_testing();
        config.enable_participant_filtering = true;
        config.registered_accounts = vec![fixtures::account_strkey(13)];
        let p = pipeline(config, vec![mixed_ledger(500)]);

        p.service.run(500, 501).await.unwrap();

        let buffer = p.sink.ledger(500).unwrap();
        assert_eq!(buffer.transaction_count(), 1);
        assert_eq!(buffer.transactions()[0].index, 3);
        assert!(buffer.state_changes().is_empty());
        assert_eq!(buffer.trustline_changes().len(), 1);
    }

    /// Running the same range twice leaves one identical copy per ledger.
    #[tokio::test]
    async fn test_reingesting_range_is_idempotent() {
        let p = pipeline(
            IngestConfig::for_testing(),
            (600..603).map(mixed_ledger).collect(),
        );

        p.service.run(600, 603).await.unwrap();
        let first = p.sink.ledger(601).unwrap();
        p.service.run(600, 603).await.unwrap();

        assert_eq!(p.sink.sequences(), vec![600, 601, 602]);
        assert_eq!(p.sink.persist_calls(), 6);
        assert_eq!(p.sink.ledger(601).unwrap(), first);
    }

    /// Unbounded runs keep tailing until shutdown.
    #[tokio::test]
    async fn test_live_tail_until_shutdown() {
        let source = Arc::new(InMemoryLedgerSource::with_ledgers(vec![mixed_ledger(700)]));
        let sink = Arc::new(InMemoryLedgerSink::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let service = Arc::new(
            IngestService::from_config(
                &IngestConfig::for_testing(),
                Arc::clone(&source),
                Arc::clone(&sink),
                shutdown_rx,
            )
            .unwrap(),
        );

        let run = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.run(700, 0).await }
        });

        while sink.persist_calls() < 1 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        source.insert_ledger(mixed_ledger(701));
        while sink.persist_calls() < 2 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        shutdown_tx.send(true).unwrap();

        let err = run.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(sink.persist_order(), vec![700, 701]);
        assert_eq!(service.stats().last_ledger, Some(701));
    }
}

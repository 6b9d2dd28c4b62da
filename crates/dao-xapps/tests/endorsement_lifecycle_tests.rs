// XApp Endorsement Engine
// Lifecycle tests through the public API
//
// Test Coverage:
// 1. Engine built from a YAML configuration
// 2. Submission, endorsement and round inclusion
// 3. Journal contents and their JSON encoding
// 4. Housekeeping of never-counted submissions

#[cfg(test)]
mod endorsement_lifecycle_tests {
    use dao_xapps::{
        Address, EndorsementError, EndorsementEvent, EngineConfig, InMemoryNodeLedger,
        InMemorySecurityNotifier, ManualRoundClock, Role, StatusKind, XAppsEngine,
    };
    use std::sync::Arc;

    const CONFIG: &str = r#"
score_table:
  points:
    0: 0
    1: 10
    2: 25
    3: 60
  threshold: 60
grace_period: 30
cooldown_period: 2
"#;

    fn gov() -> Address {
        Address::repeat_byte(0x01)
    }

    fn setup() -> (XAppsEngine, Arc<InMemoryNodeLedger>, Arc<ManualRoundClock>) {
        let _ = env_logger::builder().is_test(true).try_init();

        let config = EngineConfig::from_yaml_str(CONFIG).unwrap();
        let nodes = Arc::new(InMemoryNodeLedger::new());
        let clock = Arc::new(ManualRoundClock::at_height(1_000));
        clock.start_round();

        let engine = XAppsEngine::new(
            config,
            gov(),
            nodes.clone(),
            clock.clone(),
            Arc::new(InMemorySecurityNotifier::new()),
        );
        (engine, nodes, clock)
    }

    #[test]
    fn test_full_lifecycle() {
        let (engine, nodes, clock) = setup();
        let team = Address::repeat_byte(0x10);
        let app = engine.submit_app(&team, team, team, "Vyvo", "ipfs://vyvo").unwrap();
        assert_eq!(engine.app(&app).unwrap().submitted_round, 1);

        let alice = Address::repeat_byte(0x20);
        let bob = Address::repeat_byte(0x21);
        let a1 = nodes.mint(alice, 2);
        let b1 = nodes.mint(bob, 2);
        let b2 = nodes.mint(bob, 1);

        assert_eq!(engine.endorse(&app, a1, &alice), Ok(25));
        assert_eq!(engine.endorse(&app, b1, &bob), Ok(50));
        assert_eq!(engine.endorse(&app, b2, &bob), Ok(60));
        assert_eq!(engine.get_endorsers(&app).unwrap(), vec![alice, bob, bob]);
        assert!(engine.is_eligible_now(&app));

        assert_eq!(engine.start_round(1).unwrap(), vec![app]);

        // Two-round cooldown holds through round 2
        clock.start_round_after(10);
        assert_eq!(engine.unendorse(&app, a1, &alice), Err(EndorsementError::NodeCooldownActive(a1)));
        clock.start_round_after(10);
        assert_eq!(engine.unendorse(&app, a1, &alice), Ok(35));

        let summary = engine.app_summary(&app).unwrap();
        assert_eq!(summary.status, StatusKind::GracePeriod);
        assert!(summary.eligible_now);
        assert_eq!(summary.grace_window.unwrap().start_height, 1_020);

        // Included rounds protect the submission from removal
        assert_eq!(
            engine.remove_xapp_submission(&app, &team),
            Err(EndorsementError::AlreadyIncluded(app))
        );
    }

    #[test]
    fn test_journal_is_json_encodable() {
        let (engine, nodes, _clock) = setup();
        let team = Address::repeat_byte(0x10);
        let app = engine.submit_app(&team, team, team, "Vyvo", "").unwrap();
        let node = nodes.mint(team, 3);
        engine.endorse(&app, node, &team).unwrap();

        let events = engine.drain_events();
        let kinds: Vec<String> = events
            .iter()
            .map(|e| serde_json::to_value(e).unwrap()["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "app_submitted",
                "app_endorsed",
                "endorsement_status_changed",
                "security_level_changed",
            ]
        );
        assert!(events.iter().all(|e| e.app_id() == Some(&app)));

        let decoded: EndorsementEvent = serde_json::from_str(&serde_json::to_string(&events[1]).unwrap()).unwrap();
        assert_eq!(decoded, events[1]);
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_withdrawn_submission_frees_nodes() {
        let (engine, nodes, clock) = setup();
        let team = Address::repeat_byte(0x10);
        let first = engine.submit_app(&team, team, team, "First", "").unwrap();
        let second = engine.submit_app(&team, team, team, "Second", "").unwrap();

        let holder = Address::repeat_byte(0x30);
        let node = nodes.mint(holder, 2);
        engine.endorse(&first, node, &holder).unwrap();

        assert_eq!(engine.remove_xapp_submission(&first, &team), Ok(vec![node]));
        assert_eq!(engine.unendorsed_app_ids(), vec![second]);

        // Freed, but the cooldown from the endorsement still applies
        assert_eq!(engine.endorse(&second, node, &holder), Err(EndorsementError::NodeCooldownActive(node)));
        clock.start_round();
        clock.start_round();
        assert_eq!(engine.endorse(&second, node, &holder), Ok(25));
    }

    #[test]
    fn test_governance_handover() {
        let (engine, _nodes, _clock) = setup();
        let council = Address::repeat_byte(0x40);

        engine.grant_role(Role::Governance, council, &gov()).unwrap();
        engine.revoke_role(Role::Governance, &gov(), &gov()).unwrap();

        assert_eq!(
            engine.update_grace_period(10, &gov()),
            Err(EndorsementError::Unauthorized { caller: gov(), role: Role::Governance })
        );
        engine.update_grace_period(10, &council).unwrap();
        assert_eq!(engine.config().grace_period, 10);
    }
}

use super::*;
use sw_core::{InMemoryCatalogSource, Scope};

fn catalog() -> MigrationCatalog {
    let source = InMemoryCatalogSource::new()
        .with(Scope::Core, "V1__accounts.sql", "CREATE TABLE accounts (id INT);")
        .with(Scope::Core, "V2__add_email.sql", "ALTER TABLE accounts ADD COLUMN email VARCHAR;")
        .with(Scope::Shard, "V1__orders.sql", "CREATE TABLE orders (id INT);")
        .with(Scope::Shard, "V2__order_total.sql", "ALTER TABLE orders ADD COLUMN total INT;");
    MigrationCatalog::load(&source).unwrap()
}

fn shard() -> ShardId {
    ShardId::new("s1")
}

fn applied(catalog: &MigrationCatalog, scope: Scope, version: &str) -> LedgerEntry {
    let id = MigrationId::new(scope, Version::parse(version).unwrap());
    LedgerEntry::for_script(&shard(), catalog.get(&id).unwrap())
}

fn labels(plan: &ApplyPlan) -> Vec<String> {
    plan.pending().iter().map(|s| s.id().to_string()).collect()
}

#[test]
fn test_fresh_shard_gets_interleaved_sequence() {
    let catalog = catalog();
    let plan = ApplyPlan::compute(&shard(), &catalog, &[], None).unwrap();
    assert_eq!(
        labels(&plan),
        vec!["core:V1", "shard:V1", "core:V2", "shard:V2"]
    );
}

#[test]
fn test_fully_migrated_shard_has_empty_plan() {
    let catalog = catalog();
    let recorded: Vec<LedgerEntry> = catalog
        .apply_sequence()
        .iter()
        .map(|s| LedgerEntry::for_script(&shard(), s))
        .collect();
    let plan = ApplyPlan::compute(&shard(), &catalog, &recorded, None).unwrap();
    assert!(plan.is_empty());
}

#[test]
fn test_partially_migrated_shard_resumes() {
    let catalog = catalog();
    let recorded = vec![
        applied(&catalog, Scope::Core, "1"),
        applied(&catalog, Scope::Shard, "1"),
    ];
    let plan = ApplyPlan::compute(&shard(), &catalog, &recorded, None).unwrap();
    assert_eq!(labels(&plan), vec!["core:V2", "shard:V2"]);
}

#[test]
fn test_gap_below_highest_applied_is_still_pending() {
    let catalog = catalog();
    let recorded = vec![
        applied(&catalog, Scope::Core, "1"),
        applied(&catalog, Scope::Core, "2"),
    ];
    let plan = ApplyPlan::compute(&shard(), &catalog, &recorded, None).unwrap();
    assert_eq!(labels(&plan), vec!["shard:V1", "shard:V2"]);
}

#[test]
fn test_checksum_mismatch_is_drift() {
    let catalog = catalog();
    let mut tampered = applied(&catalog, Scope::Core, "1");
    tampered.checksum = "0".repeat(64);
    let recorded = vec![tampered, applied(&catalog, Scope::Shard, "1")];

    let err = ApplyPlan::compute(&shard(), &catalog, &recorded, None).unwrap_err();
    match err {
        ShardError::DriftDetected {
            migration,
            recorded,
            current,
            ..
        } => {
            assert_eq!(migration.to_string(), "core:V1");
            assert_eq!(recorded, "0".repeat(64));
            assert_eq!(current.len(), 64);
        }
        other => panic!("expected drift, got {other}"),
    }
}

#[test]
fn test_drift_above_target_is_still_detected() {
    let catalog = catalog();
    let mut tampered = applied(&catalog, Scope::Shard, "2");
    tampered.checksum = "x".into();
    let target = Version::parse("1").unwrap();
    let result = ApplyPlan::compute(&shard(), &catalog, &[tampered], Some(&target));
    assert!(matches!(result, Err(ShardError::DriftDetected { .. })));
}

#[test]
fn test_target_bounds_plan() {
    let catalog = catalog();
    let target = Version::parse("1").unwrap();
    let plan = ApplyPlan::compute(&shard(), &catalog, &[], Some(&target)).unwrap();
    assert_eq!(labels(&plan), vec!["core:V1", "shard:V1"]);

    // Trailing zeros are insignificant
    let target = Version::parse("1.0").unwrap();
    let plan = ApplyPlan::compute(&shard(), &catalog, &[], Some(&target)).unwrap();
    assert_eq!(plan.len(), 2);
}

#[test]
fn test_unknown_ledger_entries_are_ignored() {
    let catalog = catalog();
    let orphan_script =
        MigrationScript::from_file(Scope::Core, "V9__removed.sql", "SELECT 1;".into()).unwrap();
    let recorded = vec![LedgerEntry::for_script(&shard(), &orphan_script)];

    let plan = ApplyPlan::compute(&shard(), &catalog, &recorded, None).unwrap();
    assert_eq!(plan.len(), 4);
    assert_eq!(plan.unknown().len(), 1);
    assert_eq!(plan.unknown()[0].to_string(), "core:V9");
}

#[test]
fn test_shard_info_reports_every_state() {
    let catalog = catalog();
    let mut drifted = applied(&catalog, Scope::Shard, "1");
    drifted.checksum = "changed".into();
    let orphan =
        MigrationScript::from_file(Scope::Shard, "V1.5__dropped.sql", "SELECT 1;".into()).unwrap();
    let recorded = vec![
        applied(&catalog, Scope::Core, "1"),
        drifted,
        LedgerEntry::for_script(&shard(), &orphan),
    ];
    let target = Version::parse("1.5").unwrap();

    let info = ShardInfo::build(&shard(), &catalog, &recorded, Some(&target));
    let states: Vec<(String, MigrationState)> = info
        .migrations
        .iter()
        .map(|m| (m.id.to_string(), m.state))
        .collect();
    assert_eq!(
        states,
        vec![
            ("core:V1".to_string(), MigrationState::Applied),
            ("shard:V1".to_string(), MigrationState::Drifted),
            ("shard:V1.5".to_string(), MigrationState::Missing),
            ("core:V2".to_string(), MigrationState::AboveTarget),
            ("shard:V2".to_string(), MigrationState::AboveTarget),
        ]
    );
    assert_eq!(info.first_drift().unwrap().id.to_string(), "shard:V1");
    assert_eq!(info.count(MigrationState::AboveTarget), 2);
    assert!(info.migrations[0].applied_at.is_some());
    assert!(info.migrations[3].applied_at.is_none());
}

#[test]
fn test_shard_info_serializes_states_in_snake_case() {
    let catalog = catalog();
    let target = Version::parse("1").unwrap();
    let info = ShardInfo::build(&shard(), &catalog, &[], Some(&target));
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["shard"], "s1");
    assert_eq!(json["migrations"][0]["state"], "pending");
    assert_eq!(json["migrations"][2]["state"], "above_target");
    assert!(json["migrations"][0].get("applied_at").is_none());
}

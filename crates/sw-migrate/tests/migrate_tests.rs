//! End-to-end runs against DuckDB files and migration folders on disk

use std::fs;
use std::path::Path;
use std::sync::Arc;
use sw_core::{Config, MigrationCatalog, MigrationPaths, ShardId};
use sw_db::{DuckDbConnector, DuckDbShard, ShardExecutor, VersionLedger};
use sw_migrate::{
    CancelFlag, MigrateOptions, MigrationState, Orchestrator, ShardError, ShardRegistry,
    ShardStatus,
};

fn write(dir: &Path, name: &str, sql: &str) {
    fs::write(dir.join(name), sql).unwrap();
}

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let core = dir.path().join("migrations/core");
        let shard = dir.path().join("migrations/shard");
        fs::create_dir_all(&core).unwrap();
        fs::create_dir_all(&shard).unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();

        write(&core, "V1__create_accounts.sql", "CREATE TABLE accounts (id INT PRIMARY KEY, name VARCHAR);");
        write(&core, "V2__seed_accounts.sql", "INSERT INTO accounts VALUES (1, 'root');");
        write(&shard, "V1__create_events.sql", "CREATE TABLE events (id INT, account_id INT);");
        write(&shard, "V2__add_payload.sql", "ALTER TABLE events ADD COLUMN payload VARCHAR;");
        // Ignored by the catalog
        write(&core, ".keep", "");
        fs::create_dir_all(core.join("archive")).unwrap();

        fs::write(
            dir.path().join("shardway.yml"),
            r#"
core_path: migrations/core
shard_path: migrations/shard
threads: 2
lock_timeout_ms: 200
lock_poll_interval_ms: 10
shards:
  - id: eu
    path: data/eu.duckdb
  - id: us
    path: data/us.duckdb
"#,
        )
        .unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn orchestrator(&self) -> Orchestrator {
        let config = Config::load_from_dir(self.root()).unwrap();
        let paths = config.migration_paths(self.root()).unwrap();
        let catalog = MigrationCatalog::from_paths(&paths).unwrap();
        let registry = ShardRegistry::from_descriptors(
            config.shard_descriptors(self.root()),
            Arc::new(DuckDbConnector::new()),
        )
        .unwrap();
        Orchestrator::new(Arc::new(catalog), registry, MigrateOptions::from_config(&config))
    }

    fn open(&self, shard: &str) -> DuckDbShard {
        DuckDbShard::from_path(&self.root().join(format!("data/{shard}.duckdb"))).unwrap()
    }
}

#[tokio::test]
async fn test_migrates_every_shard_from_config() {
    let project = Project::new();
    let report = project.orchestrator().run(&CancelFlag::new()).await;

    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.total_applied(), 8);

    for shard in ["eu", "us"] {
        let db = project.open(shard);
        let recorded = db.recorded_versions(&ShardId::new(shard)).await.unwrap();
        assert_eq!(recorded.len(), 4);
        assert!(db.relation_exists("events").await.unwrap());
    }
}

#[tokio::test]
async fn test_edited_script_is_detected_as_drift() {
    let project = Project::new();
    assert!(project.orchestrator().run(&CancelFlag::new()).await.is_success());

    write(
        &project.root().join("migrations/shard"),
        "V1__create_events.sql",
        "CREATE TABLE events (id BIGINT, account_id INT);",
    );
    let orchestrator = project.orchestrator();

    let report = orchestrator.run(&CancelFlag::new()).await;
    assert_eq!(report.count(ShardStatus::Failed), 2);
    for shard in &report.shards {
        assert!(matches!(
            shard.error,
            Some(ShardError::DriftDetected { .. })
        ));
    }

    let info = orchestrator.inspect().await;
    let eu = info[0].result.as_ref().unwrap();
    assert_eq!(eu.first_drift().unwrap().id.to_string(), "shard:V1");
    assert_eq!(eu.count(MigrationState::Applied), 3);
}

#[tokio::test]
async fn test_new_migration_is_picked_up_on_next_run() {
    let project = Project::new();
    assert!(project.orchestrator().run(&CancelFlag::new()).await.is_success());

    write(
        &project.root().join("migrations/core"),
        "V2.1__index_accounts.sql",
        "CREATE INDEX accounts_name ON accounts (name);",
    );
    let orchestrator = project.orchestrator();
    let plans = orchestrator.plan().await;
    for plan in &plans {
        let pending: Vec<String> = plan
            .result
            .as_ref()
            .unwrap()
            .pending()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(pending, vec!["core:V2.1"]);
    }

    let report = orchestrator.run(&CancelFlag::new()).await;
    assert!(report.is_success());
    assert_eq!(report.total_applied(), 2);
}

#[test]
fn test_missing_shard_folder_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("core")).unwrap();
    let err = MigrationPaths::new(dir.path().join("core"), dir.path().join("shard")).unwrap_err();
    assert!(err.to_string().contains("must exist"));
}

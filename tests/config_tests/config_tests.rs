//! Config Tests
//!
//! Tests verify:
//! - Builders and defaults
//! - Properties parsing
//! - Database list loading and appending
//! - Cluster definitions

use std::fs;
use std::path::PathBuf;

use kvdb::config::{
    parse_properties, ClientConfig, ClusterConfig, DbInfo, DbList, FileDbList, MemoryDbList,
    ServerConfig, WalSyncStrategy, MAX_PARTITIONS,
};
use kvdb::KvdbError;
use tempfile::TempDir;

// =============================================================================
// Builder Tests
// =============================================================================

#[test]
fn test_server_config_defaults() {
    let config = ServerConfig::default();

    assert_eq!(config.dbs_partitions, 4);
    assert_eq!(config.listen_addr, "127.0.0.1:7060");
    assert_eq!(
        config.wal_sync_strategy,
        WalSyncStrategy::EveryNEntries { count: 100 }
    );
}

#[test]
fn test_server_config_builder() {
    let config = ServerConfig::builder()
        .dbs_root_dir("/data")
        .dbs_partitions(16)
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .dblist_path("/etc/kvdb/dblist")
        .cluster_path("/etc/kvdb/cluster")
        .listen_addr("0.0.0.0:9000")
        .max_connections(8)
        .read_timeout_ms(100)
        .write_timeout_ms(200)
        .build();

    assert_eq!(config.dbs_root_dir, PathBuf::from("/data"));
    assert_eq!(config.dbs_partitions, 16);
    assert_eq!(config.wal_sync_strategy, WalSyncStrategy::EveryWrite);
    assert_eq!(config.dblist_path, PathBuf::from("/etc/kvdb/dblist"));
    assert_eq!(config.cluster_path, PathBuf::from("/etc/kvdb/cluster"));
    assert_eq!(config.listen_addr, "0.0.0.0:9000");
    assert_eq!(config.max_connections, 8);
    assert_eq!(config.read_timeout_ms, 100);
    assert_eq!(config.write_timeout_ms, 200);
}

#[test]
fn test_client_config_builder() {
    let config = ClientConfig::builder()
        .addr("10.1.1.1:7060")
        .timeout_ms(250)
        .database("orders")
        .build();

    assert_eq!(config.addr, "10.1.1.1:7060");
    assert_eq!(config.timeout_ms, 250);
    assert_eq!(config.database.as_deref(), Some("orders"));
    assert_eq!(ClientConfig::default().timeout_ms, 60_000);
    assert!(ClientConfig::default().database.is_none());
}

// =============================================================================
// Properties Tests
// =============================================================================

#[test]
fn test_parse_properties_skips_comments_and_blanks() {
    let text = "# comment\n\n! also a comment\n  a.b = 1 \nc=\n";
    let entries = parse_properties(text).unwrap();

    assert_eq!(
        entries,
        vec![
            ("a.b".to_string(), "1".to_string()),
            ("c".to_string(), String::new()),
        ]
    );
}

#[test]
fn test_parse_properties_rejects_malformed_lines() {
    assert!(matches!(parse_properties("novalue"), Err(KvdbError::Config(_))));
    assert!(matches!(parse_properties("=x"), Err(KvdbError::Config(_))));
}

// =============================================================================
// Database List Tests
// =============================================================================

fn file_list(dir: &TempDir, contents: Option<&str>) -> FileDbList {
    let path = dir.path().join("conf").join("dblist");
    if let Some(text) = contents {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
    }
    FileDbList::new(path, dir.path().join("data"), 4)
}

#[test]
fn test_missing_dblist_is_empty() {
    let dir = TempDir::new().unwrap();
    assert!(file_list(&dir, None).load().unwrap().is_empty());
}

#[test]
fn test_dblist_load_applies_defaults_and_skips_disabled() {
    let dir = TempDir::new().unwrap();
    let list = file_list(
        &dir,
        Some(
            "db.orders.enable=true\n\
             db.orders.rootdir=/srv/kvdb\n\
             db.orders.partitions=8\n\
             db.users.enable=true\n\
             db.old.enable=false\n\
             other.setting=1\n",
        ),
    );

    let dbs = list.load().unwrap();
    assert_eq!(dbs.len(), 2);

    assert_eq!(dbs[0].name, "orders");
    assert_eq!(dbs[0].root_dir, PathBuf::from("/srv/kvdb"));
    assert_eq!(dbs[0].partitions, 8);
    assert_eq!(dbs[0].path(), PathBuf::from("/srv/kvdb/orders"));

    assert_eq!(dbs[1].name, "users");
    assert_eq!(dbs[1].root_dir, dir.path().join("data"));
    assert_eq!(dbs[1].partitions, 4);
}

#[test]
fn test_dblist_later_keys_override_earlier_ones() {
    let dir = TempDir::new().unwrap();
    let list = file_list(
        &dir,
        Some("db.a.enable=true\ndb.a.partitions=3\ndb.a.enable=false\ndb.b.enable=false\ndb.b.enable=true\ndb.b.partitions=3\ndb.b.partitions=6\n"),
    );

    let dbs = list.load().unwrap();
    assert_eq!(dbs.len(), 1);
    assert_eq!(dbs[0].name, "b");
    assert_eq!(dbs[0].partitions, 6);
}

#[test]
fn test_dblist_create_re_enables_disabled_database() {
    let dir = TempDir::new().unwrap();
    let list = file_list(&dir, Some("db.old.enable=false\ndb.old.partitions=9\n"));
    assert!(list.load().unwrap().is_empty());

    let info = DbInfo::new("old", dir.path().join("data"), 2);
    list.create_database(&info).unwrap();

    assert_eq!(list.load().unwrap(), vec![info]);
}

#[test]
fn test_dblist_partitions_out_of_range_are_errors() {
    let dir = TempDir::new().unwrap();

    let list = file_list(&dir, Some("db.a.enable=true\ndb.a.partitions=0\n"));
    assert!(matches!(list.load(), Err(KvdbError::Config(_))));

    let text = format!("db.a.enable=true\ndb.a.partitions={}\n", MAX_PARTITIONS + 1);
    let list = file_list(&dir, Some(&text));
    assert!(matches!(list.load(), Err(KvdbError::Config(_))));

    let text = format!("db.a.enable=true\ndb.a.partitions={}\n", MAX_PARTITIONS);
    let list = file_list(&dir, Some(&text));
    assert_eq!(list.load().unwrap()[0].partitions, MAX_PARTITIONS);
}

#[test]
fn test_validate_partitions_bounds() {
    assert!(DbInfo::validate_partitions(1).is_ok());
    assert!(DbInfo::validate_partitions(MAX_PARTITIONS).is_ok());
    assert!(matches!(
        DbInfo::validate_partitions(0),
        Err(KvdbError::InvalidArgument(_))
    ));
    assert!(matches!(
        DbInfo::validate_partitions(4_000_000_000),
        Err(KvdbError::InvalidArgument(_))
    ));
}

#[test]
fn test_dblist_bad_values_are_errors() {
    let dir = TempDir::new().unwrap();

    let list = file_list(&dir, Some("db.a.enable=yes\n"));
    assert!(matches!(list.load(), Err(KvdbError::Config(_))));

    let list = file_list(&dir, Some("db.a.enable=true\ndb.a.partitions=many\n"));
    assert!(matches!(list.load(), Err(KvdbError::Config(_))));

    let list = file_list(&dir, Some("db.a.enable=true\ndb.a.colour=blue\n"));
    assert!(matches!(list.load(), Err(KvdbError::Config(_))));
}

#[test]
fn test_dblist_create_then_load() {
    let dir = TempDir::new().unwrap();
    let list = file_list(&dir, Some("db.first.enable=true\n"));

    let info = DbInfo::new("second", dir.path().join("elsewhere"), 2);
    list.create_database(&info).unwrap();

    // A fresh reader sees both, as after a restart
    let reloaded = FileDbList::new(list.path(), dir.path().join("data"), 4);
    let dbs = reloaded.load().unwrap();
    let names: Vec<&str> = dbs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(dbs[1], info);
}

#[test]
fn test_dblist_create_makes_parent_directory() {
    let dir = TempDir::new().unwrap();
    let list = file_list(&dir, None);

    list.create_database(&DbInfo::new("fresh", dir.path(), 1))
        .unwrap();

    assert!(list.path().exists());
    assert_eq!(list.load().unwrap().len(), 1);
}

#[test]
fn test_validate_name() {
    assert!(DbInfo::validate_name("orders_2024-q1").is_ok());
    for bad in ["", "a.b", "a/b", "a b", ".."] {
        assert!(matches!(
            DbInfo::validate_name(bad),
            Err(KvdbError::InvalidArgument(_))
        ));
    }
}

#[test]
fn test_memory_dblist() {
    let mut disabled = DbInfo::new("off", "/tmp", 1);
    disabled.enabled = false;
    let list = MemoryDbList::new(vec![DbInfo::new("on", "/tmp", 1), disabled]);

    assert_eq!(list.load().unwrap().len(), 1);
    list.create_database(&DbInfo::new("new", "/tmp", 1)).unwrap();
    assert_eq!(list.load().unwrap().len(), 2);
    assert_eq!(list.databases().len(), 3);
}

// =============================================================================
// Cluster Tests
// =============================================================================

#[test]
fn test_cluster_parse_orders_by_name_and_index() {
    let clusters = ClusterConfig::parse(
        "cluster.users.1=kvdb://b:1/users\n\
         cluster.orders.0=kvdb://a:1/orders\n\
         cluster.users.0=kvdb://a:1/users\n\
         cluster.users.10=kvdb://c:1/users\n",
    )
    .unwrap();

    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].name, "orders");
    assert_eq!(clusters[1].name, "users");
    assert_eq!(
        clusters[1].urls,
        vec!["kvdb://a:1/users", "kvdb://b:1/users", "kvdb://c:1/users"]
    );
}

#[test]
fn test_cluster_parse_errors() {
    assert!(matches!(
        ClusterConfig::parse("cluster.a.x=kvdb://h:1/d\n"),
        Err(KvdbError::Config(_))
    ));
    assert!(matches!(
        ClusterConfig::parse("cluster.a=kvdb://h:1/d\n"),
        Err(KvdbError::Config(_))
    ));
    assert!(matches!(
        ClusterConfig::parse("cluster.a.0=kvdb://h:1/d\ncluster.a.0=kvdb://h:2/d\n"),
        Err(KvdbError::Config(_))
    ));
}

#[test]
fn test_cluster_load_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(ClusterConfig::load(&dir.path().join("cluster"))
        .unwrap()
        .is_empty());
}

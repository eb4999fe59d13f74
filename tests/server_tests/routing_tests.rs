//! Routing Tests
//!
//! Tests for the database -> cluster index.

use kvdb::protocol::ClusterItem;
use kvdb::server::{ClusterRouting, DatabaseInfo};
use kvdb::KvdbError;

fn item(name: &str, urls: &[&str]) -> ClusterItem {
    ClusterItem::new(name, urls.iter().map(|u| u.to_string()).collect())
}

#[test]
fn test_empty_routing_is_standalone() {
    let routing = ClusterRouting::new(Vec::new()).unwrap();

    assert_eq!(routing.database_info("anything"), DatabaseInfo::standalone());
    assert!(routing.cluster_info().clusters.is_empty());
}

#[test]
fn test_database_maps_to_its_cluster() {
    let shard = item(
        "shard-a",
        &["kvdb://10.0.0.1:7060/orders", "kvdb://10.0.0.2:7060/orders"],
    );
    let routing = ClusterRouting::new(vec![shard.clone()]).unwrap();

    assert_eq!(routing.cluster_of("orders"), Some("shard-a"));
    assert_eq!(routing.cluster("shard-a"), Some(&shard));

    let info = routing.database_info("orders");
    assert!(info.cluster_mode);
    assert_eq!(info.cluster_item, Some(shard));

    assert!(!routing.database_info("users").cluster_mode);
}

#[test]
fn test_cluster_may_host_several_databases() {
    let routing = ClusterRouting::new(vec![item(
        "main",
        &["kvdb://h:1/orders", "kvdb://h:1/users"],
    )])
    .unwrap();

    assert_eq!(routing.cluster_of("orders"), Some("main"));
    assert_eq!(routing.cluster_of("users"), Some("main"));
}

#[test]
fn test_database_in_two_clusters_is_rejected() {
    let result = ClusterRouting::new(vec![
        item("a", &["kvdb://h1:1/orders"]),
        item("b", &["kvdb://h2:1/orders"]),
    ]);
    assert!(matches!(result, Err(KvdbError::Config(_))));
}

#[test]
fn test_duplicate_cluster_name_is_rejected() {
    let result = ClusterRouting::new(vec![
        item("a", &["kvdb://h1:1/x"]),
        item("a", &["kvdb://h1:1/y"]),
    ]);
    assert!(matches!(result, Err(KvdbError::Config(_))));
}

#[test]
fn test_malformed_url_is_rejected() {
    let result = ClusterRouting::new(vec![item("a", &["http://h1:1/x"])]);
    assert!(matches!(result, Err(KvdbError::Config(_))));
}

#[test]
fn test_cluster_info_sorted_by_name() {
    let routing = ClusterRouting::new(vec![
        item("zeta", &["kvdb://h:1/z"]),
        item("alpha", &["kvdb://h:1/a"]),
        item("mid", &[]),
    ])
    .unwrap();

    let names: Vec<String> = routing
        .cluster_info()
        .clusters
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
}

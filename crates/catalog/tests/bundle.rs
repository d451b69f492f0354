//! Import/export of JSON bundles.

use std::fs;
use std::path::PathBuf;

use catalog::{
    AuthKind, BUNDLE_VERSION, Bundle, Catalog, CatalogError, Group, Host, ImportMode,
    ImportSummary,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn temp_bundle() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bundle.json");
    (dir, path)
}

fn sample() -> Catalog {
    let mut c = Catalog::new();
    c.add_host(Host::new("web", "web.example.org")).unwrap();
    c.add_host(Host::new("db", "db.example.org")).unwrap();
    c.add_host(Host::new("cache", "cache.example.org")).unwrap();
    let mut prod = Group::new("prod");
    prod.hosts = vec!["web".into(), "db".into()];
    c.add_group(prod).unwrap();
    c
}

#[test]
fn group_export_contains_only_members() {
    let bundle = Bundle::for_group(&sample(), "prod").unwrap();
    let names: Vec<_> = bundle.hosts.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["web", "db"]);
    assert_eq!(bundle.groups.len(), 1);
    assert_eq!(bundle.version, BUNDLE_VERSION);

    assert!(matches!(
        Bundle::for_group(&sample(), "nope"),
        Err(CatalogError::UnknownGroup(_))
    ));
}

#[test]
fn written_bundle_reads_back() {
    let (_dir, path) = temp_bundle();
    let bundle = Bundle::from_catalog(&sample());
    bundle.write(&path).unwrap();

    let read = Bundle::read(&path).unwrap();
    assert_eq!(read.hosts, bundle.hosts);
    assert_eq!(read.groups, bundle.groups);
}

#[test]
fn merge_overwrites_same_named_and_keeps_the_rest() {
    let mut catalog = sample();

    let mut web = Host::new("web", "new-web.example.org");
    web.auth = AuthKind::Agent;
    let mut staging = Group::new("staging");
    staging.hosts = vec!["web".into(), "cache".into()];
    let bundle = Bundle {
        version: BUNDLE_VERSION,
        exported_at: chrono::Utc::now(),
        hosts: vec![web, Host::new("queue", "mq.example.org")],
        groups: vec![staging],
    };

    let summary = catalog.import(bundle, ImportMode::Merge).unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            hosts_added: 1,
            hosts_updated: 1,
            groups_added: 1,
            groups_updated: 0,
        }
    );
    assert_eq!(catalog.host("web").unwrap().hostname, "new-web.example.org");
    assert_eq!(catalog.host("db").unwrap().hostname, "db.example.org");
    assert_eq!(catalog.host_names(), vec!["web", "db", "cache", "queue"]);
    assert_eq!(catalog.group_names(), vec!["prod", "staging"]);
}

#[test]
fn replace_discards_existing_entries() {
    let mut catalog = sample();
    let bundle = Bundle {
        version: BUNDLE_VERSION,
        exported_at: chrono::Utc::now(),
        hosts: vec![Host::new("solo", "solo.example.org")],
        groups: vec![],
    };
    catalog.import(bundle, ImportMode::Replace).unwrap();
    assert_eq!(catalog.host_names(), vec!["solo"]);
    assert!(catalog.groups().is_empty());
}

#[test]
fn inconsistent_bundle_leaves_catalog_untouched() {
    let mut catalog = sample();
    let before = catalog.clone();
    let mut broken = Group::new("broken");
    broken.hosts = vec!["ghost".into()];
    let bundle = Bundle {
        version: BUNDLE_VERSION,
        exported_at: chrono::Utc::now(),
        hosts: vec![Host::new("new", "n")],
        groups: vec![broken],
    };

    for mode in [ImportMode::Merge, ImportMode::Replace] {
        let err = catalog.import(bundle.clone(), mode).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownHost(ref name) if name == "ghost"));
        assert_eq!(catalog, before);
    }
}

#[test]
fn future_version_is_rejected() {
    let (_dir, path) = temp_bundle();
    fs::write(
        &path,
        r#"{"version": 99, "exported_at": "2024-01-01T00:00:00Z", "hosts": [], "groups": []}"#,
    )
    .unwrap();
    assert!(matches!(
        Bundle::read(&path),
        Err(CatalogError::UnsupportedVersion(99))
    ));
}

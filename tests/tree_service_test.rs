//! Tests for TreeService and the built-in decision tree

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;

use postwiz::application::services::{TreeService, BUILTIN_TREE_NAME};
use postwiz::application::ApplicationError;
use postwiz::config::Settings;
use postwiz::domain::{
    Checklist, ChecklistStore, DomainError, EntryPoint, LoadOutcome, NodeKind, TraversalEngine,
    CATALOG,
};
use postwiz::infrastructure::traits::RealFileSystem;
use postwiz::util::testing::init_test_setup;

const SMALL_TREE: &str = r#"{"nodes":[
    {"id":"start","question":"Does it turn on?","options":{"yes":{"next":"done"}}},
    {"id":"done","result":"All good"}
]}"#;

fn service(settings: Settings) -> TreeService {
    TreeService::new(Arc::new(RealFileSystem), Arc::new(settings))
}

fn write_tree(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================
// Built-in tree
// ============================================================

#[rstest]
fn given_builtin_tree_when_loading_then_every_entry_point_exists() {
    let nodes = service(Settings::default()).load(None).unwrap();

    for entry in EntryPoint::ALL {
        let node = nodes.get(entry.node_id()).unwrap();
        assert!(node.kind().is_ok(), "entry {} is invalid", entry);
    }
}

#[rstest]
fn given_builtin_tree_when_loading_then_mentions_only_catalog_ids() {
    let nodes = service(Settings::default()).load(None).unwrap();
    for node in nodes.iter() {
        for id in node.checklist_ids() {
            assert!(
                CATALOG.iter().any(|s| s.id == id),
                "{} mentions unknown checklist id {}",
                node.id,
                id
            );
        }
    }
}

#[rstest]
#[case::nothing_done(&[])]
#[case::everything_done(&["ac_outlet_swap", "psu_switch_on", "psu_test", "psu_known_good", "mobo_24pin_seated", "pwr_sw_short", "bench_test", "standoffs_ok"])]
fn given_builtin_tree_when_entering_every_entry_then_gating_resolves(
    #[case] done: &[&str],
) {
    init_test_setup();
    let mut engine = TraversalEngine::default();
    let mut checklist = ChecklistStore::new();
    checklist.mark_all(done.iter().copied());
    service(Settings::default())
        .load_into(&mut engine, None, None, &checklist)
        .unwrap();

    for entry in EntryPoint::ALL {
        engine.start(entry.node_id(), &checklist).unwrap();
        let node = engine.current_node().unwrap();
        assert!(matches!(
            node.kind().unwrap(),
            NodeKind::Decision { .. } | NodeKind::Result(_)
        ));
    }
}

#[rstest]
fn given_no_power_with_outlet_tested_when_starting_then_outlet_step_skipped() {
    let mut engine = TraversalEngine::default();
    let mut checklist = ChecklistStore::new();
    checklist.mark_done("ac_outlet_swap");
    service(Settings::default())
        .load_into(&mut engine, None, Some("no_power_root"), &checklist)
        .unwrap();

    engine.choose("Not tested yet", &mut checklist).unwrap();

    assert_eq!(engine.current_id(), Some("psu_switch_check"));
}

// ============================================================
// Tree files
// ============================================================

#[rstest]
fn given_explicit_path_when_loading_then_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = write_tree(&dir, "tree.json", SMALL_TREE);

    let nodes = service(Settings::default()).load(Some(&path)).unwrap();

    assert_eq!(nodes.len(), 2);
    assert!(nodes.contains("start"));
}

#[rstest]
fn given_configured_path_when_no_explicit_path_then_configured_file_used() {
    let dir = TempDir::new().unwrap();
    let path = write_tree(&dir, "configured.json", SMALL_TREE);
    let settings = Settings {
        tree_path: Some(path.clone()),
        ..Settings::default()
    };
    let service = service(settings);

    assert_eq!(service.source(None), Some(path.clone()));
    assert_eq!(service.source_name(None), path.display().to_string());
    assert!(service.load(None).unwrap().contains("done"));
}

#[rstest]
fn given_no_path_when_naming_source_then_builtin() {
    assert_eq!(service(Settings::default()).source_name(None), BUILTIN_TREE_NAME);
}

#[rstest]
#[case::not_json("{ nodes: ")]
#[case::wrong_shape(r#"{"nodes": {"id": "x"}}"#)]
#[case::duplicate_id(r#"{"nodes":[{"id":"a","result":"r"},{"id":"a","result":"s"}]}"#)]
fn given_malformed_file_when_loading_then_load_error(#[case] content: &str) {
    let dir = TempDir::new().unwrap();
    let path = write_tree(&dir, "bad.json", content);

    let err = service(Settings::default()).load(Some(&path)).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::Load { .. })
    ));
}

#[rstest]
fn given_running_engine_when_new_tree_fails_then_old_tree_and_position_kept() {
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let service = service(Settings::default());
    let mut engine = TraversalEngine::default();
    let checklist = ChecklistStore::new();
    service
        .load_into(&mut engine, None, Some("power_cycles_root"), &checklist)
        .unwrap();

    let broken = write_tree(&dir, "broken.json", "[]");
    let result = service.load_into(&mut engine, Some(&broken), None, &checklist);

    assert!(result.is_err());
    assert!(!engine.is_loading());
    assert_eq!(engine.current_id(), Some("power_cycles_root"));
    assert!(engine.nodes().contains("no_power_root"));
}

#[rstest]
fn given_missing_file_when_loading_into_engine_then_load_error() {
    let mut engine = TraversalEngine::default();
    let err = service(Settings::default())
        .load_into(
            &mut engine,
            Some(Path::new("/nonexistent/tree.json")),
            None,
            &ChecklistStore::new(),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::Load { .. })
    ));
    assert!(engine.nodes().is_empty());
}

#[rstest]
fn given_file_tree_when_loading_into_engine_then_applied_and_bootstrapped() {
    let dir = TempDir::new().unwrap();
    let path = write_tree(&dir, "tree.json", SMALL_TREE);
    let mut engine = TraversalEngine::default();

    let outcome = service(Settings::default())
        .load_into(&mut engine, Some(&path), Some("start"), &ChecklistStore::new())
        .unwrap();

    assert_eq!(outcome, LoadOutcome::Applied);
    assert_eq!(engine.current_id(), Some("start"));
    assert_eq!(engine.entry(), Some("start"));
}

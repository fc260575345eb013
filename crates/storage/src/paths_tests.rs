use super::*;

#[test]
fn layout_is_rooted_at_project_id() {
    let paths = ProjectPaths::new("/base", "proj-1");
    assert_eq!(paths.root(), std::path::Path::new("/base/proj-1"));
    assert_eq!(paths.state_dir(), std::path::Path::new("/base/proj-1/.orchestrator/state"));
    assert_eq!(paths.wal_path(), std::path::Path::new("/base/proj-1/.orchestrator/state/orchestrator.wal"));
}

#[test]
fn task_and_run_paths_are_namespaced_by_id() {
    let paths = ProjectPaths::new("/base", "proj-1");
    assert!(paths.task_path("tsk_ABC").ends_with("tsk_ABC.json"));
    assert!(paths.run_report_path("run_20260101T000000Z").ends_with("report_run_20260101T000000Z.json"));
}

#[test]
fn ensure_dirs_creates_full_tree() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(tmp.path(), "proj-1");
    paths.ensure_dirs().unwrap();
    assert!(paths.state_dir().is_dir());
    assert!(paths.tasks_dir().is_dir());
    assert!(paths.runs_dir().is_dir());
    assert!(paths.logs_dir().is_dir());
    assert!(paths.artifacts_dir().is_dir());
}

#[test]
fn resolve_base_path_falls_back_when_unset() {
    let resolved = resolve_base_path(None);
    assert_eq!(resolved, std::path::PathBuf::from("./workspace"));
}

//! Tests for the kernel module reconciliation backend.

use super::*;
use crate::snippets::{MockSnippetProvider, SnippetMap};
use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};
use tempfile::TempDir;

fn backend(temp: &TempDir) -> Backend {
    Backend::new(
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("temp path is UTF-8"),
    )
}

fn apps(tags: &[&str]) -> Vec<AppIdentity> {
    tags.iter()
        .map(|tag| AppIdentity::new(format!("app-{tag}"), *tag))
        .collect()
}

fn snippet_map(entries: &[(&str, &[&str])]) -> SnippetMap {
    entries
        .iter()
        .map(|(tag, snippets)| {
            let blobs = snippets.iter().map(|s| s.as_bytes().to_vec()).collect();
            ((*tag).to_owned(), blobs)
        })
        .collect()
}

fn provider_returning(package: &str, map: SnippetMap) -> MockSnippetProvider {
    let expected_package = package.to_owned();
    let mut provider = MockSnippetProvider::new();
    provider
        .expect_snippets_for_package()
        .withf(move |package, category| package == expected_package && category == SECURITY_KMOD)
        .returning(move |_, _| Ok(map.clone()));
    provider
}

fn modprobe_ok(module: &str) -> ExpectedCall {
    ExpectedCall::new("modprobe", &[module], Ok(success_output()))
}

#[test]
fn setup_writes_deduplicated_artifact_and_loads_modules_in_order() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);
    let provider = provider_returning(
        "camera-app",
        snippet_map(&[
            ("tag.app1", &["foo\n#comment\nbar"]),
            ("tag.app2", &["bar\n\nbaz"]),
        ]),
    );
    let executor = StubExecutor::new(vec![
        modprobe_ok("foo"),
        modprobe_ok("bar"),
        modprobe_ok("baz"),
    ]);

    let outcome = backend
        .setup(
            "camera-app",
            &apps(&["tag.app1", "tag.app2"]),
            &provider,
            &executor,
        )
        .expect("setup");

    executor.assert_finished();
    let modules: Vec<ModuleName> = ["foo", "bar", "baz"].map(ModuleName::from).into();
    assert_eq!(outcome, SetupOutcome::Applied { modules });
    let content =
        std::fs::read_to_string(backend.conf_path("camera-app")).expect("read artifact");
    assert_eq!(content, "foo\nbar\nbaz\n");
}

#[test]
fn second_setup_with_same_snippets_touches_nothing() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);
    let app_list = apps(&["tag.app"]);
    let map = snippet_map(&[("tag.app", &["uvcvideo\ni2c-dev"])]);

    let first_provider = provider_returning("camera-app", map.clone());
    let first_executor =
        StubExecutor::new(vec![modprobe_ok("uvcvideo"), modprobe_ok("i2c-dev")]);
    backend
        .setup("camera-app", &app_list, &first_provider, &first_executor)
        .expect("first setup");
    first_executor.assert_finished();

    // An executor with no expected calls panics on any invocation, so
    // this asserts the second pass issues zero modprobe calls.
    let second_provider = provider_returning("camera-app", map);
    let second_executor = StubExecutor::new(Vec::new());
    let outcome = backend
        .setup("camera-app", &app_list, &second_provider, &second_executor)
        .expect("second setup");

    assert_eq!(outcome, SetupOutcome::Unchanged);
}

#[test]
fn changed_snippets_rewrite_the_artifact() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);
    let app_list = apps(&["tag.app"]);

    let provider = provider_returning("pkg", snippet_map(&[("tag.app", &["foo"])]));
    let executor = StubExecutor::new(vec![modprobe_ok("foo")]);
    backend
        .setup("pkg", &app_list, &provider, &executor)
        .expect("first setup");

    let provider = provider_returning("pkg", snippet_map(&[("tag.app", &["foo\nbar"])]));
    let executor = StubExecutor::new(vec![modprobe_ok("foo"), modprobe_ok("bar")]);
    let outcome = backend
        .setup("pkg", &app_list, &provider, &executor)
        .expect("second setup");

    executor.assert_finished();
    assert!(matches!(outcome, SetupOutcome::Applied { .. }));
    let content = std::fs::read_to_string(backend.conf_path("pkg")).expect("read artifact");
    assert_eq!(content, "foo\nbar\n");
}

#[test]
fn empty_snippet_collection_removes_existing_artifact() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);
    let app_list = apps(&["tag.app"]);

    let provider = provider_returning("pkg", snippet_map(&[("tag.app", &["foo"])]));
    let executor = StubExecutor::new(vec![modprobe_ok("foo")]);
    backend
        .setup("pkg", &app_list, &provider, &executor)
        .expect("first setup");
    assert!(backend.conf_path("pkg").exists());

    let provider = provider_returning("pkg", SnippetMap::new());
    let executor = StubExecutor::new(Vec::new());
    let outcome = backend
        .setup("pkg", &app_list, &provider, &executor)
        .expect("cleanup setup");

    assert_eq!(outcome, SetupOutcome::Removed);
    assert!(!backend.conf_path("pkg").exists());
}

#[test]
fn empty_snippet_collection_without_artifact_still_succeeds() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);

    let provider = provider_returning("pkg", SnippetMap::new());
    let executor = StubExecutor::new(Vec::new());
    let outcome = backend
        .setup("pkg", &apps(&["tag.app"]), &provider, &executor)
        .expect("setup");

    assert_eq!(outcome, SetupOutcome::Removed);
}

#[test]
fn snippets_with_only_comments_remove_the_artifact() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);
    let app_list = apps(&["tag.app"]);

    let provider = provider_returning("pkg", snippet_map(&[("tag.app", &["foo"])]));
    let executor = StubExecutor::new(vec![modprobe_ok("foo")]);
    backend
        .setup("pkg", &app_list, &provider, &executor)
        .expect("first setup");

    let provider = provider_returning("pkg", snippet_map(&[("tag.app", &["# nothing\n\n"])]));
    let executor = StubExecutor::new(Vec::new());
    let outcome = backend
        .setup("pkg", &app_list, &provider, &executor)
        .expect("comment-only setup");

    assert_eq!(outcome, SetupOutcome::Removed);
    assert!(!backend.conf_path("pkg").exists());
}

#[test]
fn provider_failure_propagates_without_side_effects() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);
    let mut provider = MockSnippetProvider::new();
    provider
        .expect_snippets_for_package()
        .returning(|_, _| Err(std::io::Error::other("repository unavailable").into()));
    let executor = StubExecutor::new(Vec::new());

    let err = match backend.setup("pkg", &apps(&["tag.app"]), &provider, &executor) {
        Ok(outcome) => panic!("expected provider failure, got {outcome:?}"),
        Err(err) => err,
    };

    match err {
        KmodError::SnippetLookup { package, .. } => assert_eq!(package, "pkg"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!backend.conf_path("pkg").exists());
}

#[test]
fn load_failure_leaves_the_artifact_in_place() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);
    let app_list = apps(&["tag.app"]);
    let map = snippet_map(&[("tag.app", &["flaky\nsolid"])]);

    let provider = provider_returning("pkg", map.clone());
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("modprobe", &["flaky"], Ok(failure_output("flaky not found"))),
        modprobe_ok("solid"),
    ]);
    let err = match backend.setup("pkg", &app_list, &provider, &executor) {
        Ok(outcome) => panic!("expected load failure, got {outcome:?}"),
        Err(err) => err,
    };
    executor.assert_finished();

    assert!(matches!(err, KmodError::ModuleLoad { .. }));
    // The declaration survives the failed load, so the artifact and the
    // live kernel state may diverge until the caller retries.
    let content = std::fs::read_to_string(backend.conf_path("pkg")).expect("read artifact");
    assert_eq!(content, "flaky\nsolid\n");

    // A retry with identical snippets trusts the artifact and skips the
    // loader entirely.
    let provider = provider_returning("pkg", map);
    let executor = StubExecutor::new(Vec::new());
    let outcome = backend
        .setup("pkg", &app_list, &provider, &executor)
        .expect("retry setup");
    assert_eq!(outcome, SetupOutcome::Unchanged);
}

#[test]
fn empty_package_name_is_rejected_before_any_lookup() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);
    // The mock has no expectations; a lookup would panic the test.
    let provider = MockSnippetProvider::new();
    let executor = StubExecutor::new(Vec::new());

    let err = match backend.setup("", &[], &provider, &executor) {
        Ok(outcome) => panic!("expected rejection, got {outcome:?}"),
        Err(err) => err,
    };

    assert!(matches!(err, KmodError::EmptyPackageName));
    assert!(matches!(backend.remove(""), Err(KmodError::EmptyPackageName)));
}

#[test]
fn remove_deletes_the_artifact_and_is_idempotent() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);

    let provider = provider_returning("pkg", snippet_map(&[("tag.app", &["foo"])]));
    let executor = StubExecutor::new(vec![modprobe_ok("foo")]);
    backend
        .setup("pkg", &apps(&["tag.app"]), &provider, &executor)
        .expect("setup");
    assert!(backend.conf_path("pkg").exists());

    backend.remove("pkg").expect("remove");
    assert!(!backend.conf_path("pkg").exists());
    backend.remove("pkg").expect("remove again");
}

#[test]
fn backend_reports_its_name_and_conf_dir() {
    let temp = TempDir::new().expect("create tempdir");
    let backend = backend(&temp);

    assert_eq!(backend.name(), "kmod");
    assert_eq!(
        backend.conf_path("camera-app"),
        backend.conf_dir().join("camera-app.conf")
    );
}

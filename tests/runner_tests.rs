//! End-to-end tests of the runner over temporary projects.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use ember_data_codemod::project::Project;
use ember_data_codemod::runner::{load_mappings, run, RunOptions};
use ember_data_codemod::{CliOverrides, CodemodConfig, CodemodError};
use ember_data_codemod_core::output::FileStatus;

// ============================================================================
// Test Infrastructure
// ============================================================================

const PACKAGE_JSON: &str = r#"{"name": "shoes", "devDependencies": {"ember-cli": "~3.12.0"}}"#;

const MODEL: &str = "import DS from 'ember-data';\nconst { attr } = DS;\nexport default DS.Model.extend({ shoe: attr('number') });\n";
const MODEL_OUT: &str = "import Model, { attr } from '@ember-data/model';\nexport default Model.extend({ shoe: attr('number') });\n";

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("package.json"), PACKAGE_JSON).unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn config(root: &Path, overrides: CliOverrides) -> CodemodConfig {
    let project = Project::load(root, true).unwrap();
    CodemodConfig::resolve_with_env(project.config(), &overrides, |_| None).unwrap()
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn rewrites_default_paths_and_reports_nothing() {
    let dir = project(&[
        ("app/models/shoe.js", MODEL),
        ("app/app.js", "export default class App {}\n"),
        ("node_modules/dep/index.js", MODEL),
    ]);
    let config = config(dir.path(), CliOverrides::default());
    let table = load_mappings(dir.path(), &config).unwrap();

    let response = run(dir.path(), &config, &table, &RunOptions::default()).unwrap();

    assert_eq!(response.status, "ok");
    assert_eq!(response.summary.files_scanned, 2);
    assert_eq!(response.summary.files_changed, 1);
    assert!(response.report.is_none());
    assert_eq!(read(dir.path(), "app/models/shoe.js"), MODEL_OUT);
    assert_eq!(read(dir.path(), "node_modules/dep/index.js"), MODEL);
    assert!(!dir.path().join("MODULE_REPORT.md").exists());
}

#[test]
fn dry_run_writes_nothing() {
    let dir = project(&[("app/models/shoe.js", MODEL)]);
    let config = config(dir.path(), CliOverrides::default());
    let table = load_mappings(dir.path(), &config).unwrap();
    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };

    let response = run(dir.path(), &config, &table, &options).unwrap();

    assert!(response.dry_run);
    assert_eq!(response.files[0].status, FileStatus::Changed);
    assert_eq!(read(dir.path(), "app/models/shoe.js"), MODEL);
}

#[test]
fn diagnostics_go_to_the_report() {
    let dir = project(&[
        (
            "app/models/b.js",
            "import DS from 'ember-data';\n\nexport default DS.Model.extend({\n  thing: DS.unknownThing\n});\n",
        ),
        ("app/models/a.js", "import DS from 'ember-data';\nexport default DS.Model.extend({\n"),
    ]);
    let config = config(dir.path(), CliOverrides::default());
    let table = load_mappings(dir.path(), &config).unwrap();

    let response = run(dir.path(), &config, &table, &RunOptions::default()).unwrap();

    assert_eq!(response.report.as_deref(), Some("MODULE_REPORT.md"));
    assert_eq!(response.summary.files_failed, 1);
    assert_eq!(response.summary.diagnostics, 2);
    // Sorted by file.
    assert_eq!(response.diagnostics[0].file(), "app/models/a.js");
    assert_eq!(response.diagnostics[1].file(), "app/models/b.js");

    let report = read(dir.path(), "MODULE_REPORT.md");
    assert!(report.starts_with("## Module Report"));
    assert!(report.contains("### Runtime Error"));
    assert!(report.contains("### Unknown Global"));
    assert!(report.contains("**Global**: `DS.unknownThing`"));

    // The failed file is untouched; the other is rewritten around the unknown global.
    assert_eq!(
        read(dir.path(), "app/models/a.js"),
        "import DS from 'ember-data';\nexport default DS.Model.extend({\n"
    );
    assert!(read(dir.path(), "app/models/b.js").starts_with("import Model from '@ember-data/model';\n"));
}

#[test]
fn explicit_missing_path_is_an_error() {
    let dir = project(&[]);
    let overrides = CliOverrides {
        paths: vec![PathBuf::from("app/models")],
        ..CliOverrides::default()
    };
    let config = config(dir.path(), overrides);
    let table = load_mappings(dir.path(), &config).unwrap();
    let options = RunOptions {
        explicit_paths: true,
        ..RunOptions::default()
    };

    let err = run(dir.path(), &config, &table, &options).unwrap_err();
    assert!(matches!(err, CodemodError::PathNotFound { .. }));
}

#[test]
fn project_config_sets_quote_and_report() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{
            "dependencies": {"ember-cli": "*"},
            "ember-data-codemod": {"quote": "double", "report": "upgrade.md"}
        }"#,
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("app")).unwrap();
    fs::write(
        dir.path().join("app/shoe.js"),
        "export default DS.Model.extend({ x: DS.nope });\n",
    )
    .unwrap();

    let config = config(dir.path(), CliOverrides::default());
    let table = load_mappings(dir.path(), &config).unwrap();
    let response = run(dir.path(), &config, &table, &RunOptions::default()).unwrap();

    assert_eq!(response.report.as_deref(), Some("upgrade.md"));
    assert!(dir.path().join("upgrade.md").exists());
    assert_eq!(
        read(dir.path(), "app/shoe.js"),
        "import Model from \"@ember-data/model\";\nexport default Model.extend({ x: DS.nope });\n"
    );
}

#[test]
fn custom_mapping_file() {
    let dir = project(&[
        ("app/a.js", "export default DS.Thing.create();\n"),
        (
            "mappings.json",
            r#"[{"global": "DS.Thing", "module": "things", "export": "default"}]"#,
        ),
    ]);
    let overrides = CliOverrides {
        mappings: Some(PathBuf::from("mappings.json")),
        ..CliOverrides::default()
    };
    let config = config(dir.path(), overrides);
    let table = load_mappings(dir.path(), &config).unwrap();
    assert_eq!(table.len(), 1);

    run(dir.path(), &config, &table, &RunOptions::default()).unwrap();
    assert_eq!(
        read(dir.path(), "app/a.js"),
        "import Thing from 'things';\nexport default Thing.create();\n"
    );
}

#[test]
fn unreadable_mapping_file_is_an_error() {
    let dir = project(&[]);
    let overrides = CliOverrides {
        mappings: Some(PathBuf::from("missing.json")),
        ..CliOverrides::default()
    };
    let config = config(dir.path(), overrides);
    let err = load_mappings(dir.path(), &config).unwrap_err();
    assert!(matches!(err, CodemodError::Mapping(_)));
}

#[test]
fn response_diagnostics_serialize_with_kind_tags() {
    let dir = project(&[(
        "app/a.js",
        "import DS from 'ember-data';\nDS.nope();\n",
    )]);
    let config = config(dir.path(), CliOverrides::default());
    let table = load_mappings(dir.path(), &config).unwrap();
    let response = run(dir.path(), &config, &table, &RunOptions::default()).unwrap();

    let json = serde_json::to_value(&response).unwrap();
    let diagnostics = json["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["kind"], "unmapped_global");
    assert_eq!(diagnostics[0]["dotted_path"], "nope");
    assert_eq!(diagnostics[0]["file"], "app/a.js");
}

//! Project detection and the `package.json` configuration block.
//!
//! The codemod refuses to run outside an Ember project: the working
//! directory must hold a `package.json` that lists `ember-cli` among its
//! dependencies or dev dependencies.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use ember_data_codemod_core::config::ProjectConfig;
use ember_data_codemod_core::error::CodemodError;

/// The parts of `package.json` the codemod reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub dev_dependencies: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, rename = "ember-data-codemod")]
    pub codemod: Option<ProjectConfig>,
}

impl PackageJson {
    pub fn depends_on(&self, name: &str) -> bool {
        [&self.dependencies, &self.dev_dependencies]
            .into_iter()
            .flatten()
            .any(|deps| deps.contains_key(name))
    }
}

/// A loaded project root.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub package: PackageJson,
}

impl Project {
    /// Read `package.json` at `root`.
    ///
    /// With `require_ember` the project must depend on `ember-cli`. Without
    /// it a missing `package.json` is not an error either; the project then
    /// carries no configuration.
    pub fn load(root: &Path, require_ember: bool) -> Result<Project, CodemodError> {
        let path = root.join("package.json");
        let package = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<PackageJson>(&text).map_err(|e| {
                CodemodError::not_ember_project(format!(
                    "I couldn't parse the package.json at {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(_) => Err(CodemodError::not_ember_project(format!(
                "I couldn't find a package.json at {}",
                path.display()
            ))),
        };

        let package = match package {
            Ok(package) => package,
            Err(err) if require_ember => return Err(err),
            Err(err) => {
                debug!(error = %err, "continuing without package.json");
                PackageJson::default()
            }
        };

        if require_ember && !package.depends_on("ember-cli") {
            return Err(CodemodError::not_ember_project(format!(
                "I couldn't find ember-cli in the dependencies of {}",
                path.display()
            )));
        }

        Ok(Project {
            root: root.to_path_buf(),
            package,
        })
    }

    /// The `"ember-data-codemod"` block, if present.
    pub fn config(&self) -> Option<&ProjectConfig> {
        self.package.codemod.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_data_codemod_core::config::QuoteStyle;
    use tempfile::TempDir;

    fn write_package(dir: &TempDir, json: &str) {
        fs::write(dir.path().join("package.json"), json).unwrap();
    }

    #[test]
    fn ember_cli_dev_dependency_is_accepted() {
        let dir = TempDir::new().unwrap();
        write_package(&dir, r#"{"devDependencies": {"ember-cli": "~3.12.0"}}"#);
        let project = Project::load(dir.path(), true).unwrap();
        assert!(project.package.depends_on("ember-cli"));
        assert!(project.config().is_none());
    }

    #[test]
    fn missing_package_json_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = Project::load(dir.path(), true).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("It doesn't look like you're inside an Ember app."));
        assert!(message.contains("I couldn't find a package.json at"));
    }

    #[test]
    fn non_ember_package_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_package(&dir, r#"{"dependencies": {"react": "16"}}"#);
        let err = Project::load(dir.path(), true).unwrap_err();
        assert!(err
            .to_string()
            .contains("I couldn't find ember-cli in the dependencies of"));
    }

    #[test]
    fn check_can_be_skipped() {
        let dir = TempDir::new().unwrap();
        let project = Project::load(dir.path(), false).unwrap();
        assert!(project.config().is_none());
    }

    #[test]
    fn config_block_is_read() {
        let dir = TempDir::new().unwrap();
        write_package(
            &dir,
            r#"{
                "dependencies": {"ember-cli": "*"},
                "ember-data-codemod": {"quote": "double", "paths": ["app"]}
            }"#,
        );
        let project = Project::load(dir.path(), true).unwrap();
        let config = project.config().unwrap();
        assert_eq!(config.quote, Some(QuoteStyle::Double));
        assert_eq!(config.paths, Some(vec![PathBuf::from("app")]));
    }
}

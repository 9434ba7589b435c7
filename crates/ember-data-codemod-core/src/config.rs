//! Configuration for a codemod run, with precedence tracking.
//!
//! Values are layered from four sources; the highest precedence wins:
//!
//! 1. CLI flags
//! 2. Environment variables (`EMBER_DATA_CODEMOD_*`)
//! 3. Project config (the `"ember-data-codemod"` key of `package.json`)
//! 4. Defaults

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Module the legacy namespace is imported from.
pub const DEFAULT_NAMESPACE_MODULE: &str = "ember-data";

/// Namespace identifier assumed when the file does not import it.
pub const DEFAULT_GLOBAL: &str = "DS";

/// Report written when diagnostics were produced.
pub const DEFAULT_REPORT_PATH: &str = "MODULE_REPORT.md";

/// Directories processed when no paths are given.
pub const DEFAULT_PATHS: &[&str] = &[
    "app",
    "addon",
    "addon-test-support",
    "tests",
    "test-support",
    "lib",
];

/// Key of the project config object inside `package.json`.
pub const PROJECT_CONFIG_KEY: &str = "ember-data-codemod";

pub const ENV_MAPPINGS: &str = "EMBER_DATA_CODEMOD_MAPPINGS";
pub const ENV_GLOBAL: &str = "EMBER_DATA_CODEMOD_GLOBAL";
pub const ENV_QUOTE: &str = "EMBER_DATA_CODEMOD_QUOTE";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid quote style '{value}', expected 'single' or 'double'")]
    InvalidQuote { value: String },
}

// ============================================================================
// Value Types
// ============================================================================

/// Quote character used for module literals the codemod prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Single,
    Double,
}

impl QuoteStyle {
    /// Quote `value` as a JS string literal.
    pub fn quote(self, value: &str) -> String {
        let q = match self {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        };
        let mut out = String::with_capacity(value.len() + 2);
        out.push(q);
        for ch in value.chars() {
            if ch == q || ch == '\\' {
                out.push('\\');
            }
            out.push(ch);
        }
        out.push(q);
        out
    }
}

impl FromStr for QuoteStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(QuoteStyle::Single),
            "double" => Ok(QuoteStyle::Double),
            _ => Err(ConfigError::InvalidQuote {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for QuoteStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteStyle::Single => write!(f, "single"),
            QuoteStyle::Double => write!(f, "double"),
        }
    }
}

/// Options consumed by the per-file transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Module whose default export is the legacy namespace.
    pub namespace_module: String,
    /// Namespace identifier when the file does not import it.
    pub default_global: String,
    /// Quote style for printed module literals.
    pub quote: QuoteStyle,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            namespace_module: DEFAULT_NAMESPACE_MODULE.to_string(),
            default_global: DEFAULT_GLOBAL.to_string(),
            quote: QuoteStyle::Single,
        }
    }
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From package.json.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }
}

/// The `"ember-data-codemod"` object of `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub mappings: Option<PathBuf>,
    #[serde(default)]
    pub global: Option<String>,
    #[serde(default)]
    pub namespace_module: Option<String>,
    #[serde(default)]
    pub quote: Option<QuoteStyle>,
    #[serde(default)]
    pub paths: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub report: Option<PathBuf>,
}

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub mappings: Option<PathBuf>,
    pub global: Option<String>,
    pub namespace_module: Option<String>,
    pub quote: Option<QuoteStyle>,
    pub paths: Vec<PathBuf>,
    pub report: Option<PathBuf>,
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// Resolved configuration with precedence information.
#[derive(Debug, Clone)]
pub struct CodemodConfig {
    /// Mapping data file; `None` means the bundled data.
    pub mappings: Option<ConfigValue<PathBuf>>,
    pub global: ConfigValue<String>,
    pub namespace_module: ConfigValue<String>,
    pub quote: ConfigValue<QuoteStyle>,
    pub paths: ConfigValue<Vec<PathBuf>>,
    pub report: ConfigValue<PathBuf>,
}

impl Default for CodemodConfig {
    fn default() -> Self {
        CodemodConfig {
            mappings: None,
            global: ConfigValue::new(DEFAULT_GLOBAL.to_string(), ConfigSource::Default),
            namespace_module: ConfigValue::new(
                DEFAULT_NAMESPACE_MODULE.to_string(),
                ConfigSource::Default,
            ),
            quote: ConfigValue::new(QuoteStyle::Single, ConfigSource::Default),
            paths: ConfigValue::new(
                DEFAULT_PATHS.iter().map(PathBuf::from).collect(),
                ConfigSource::Default,
            ),
            report: ConfigValue::new(PathBuf::from(DEFAULT_REPORT_PATH), ConfigSource::Default),
        }
    }
}

impl CodemodConfig {
    /// Resolve configuration from all sources, reading the process environment.
    pub fn resolve(
        project: Option<&ProjectConfig>,
        cli: &CliOverrides,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with_env(project, cli, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve_with_env(
        project: Option<&ProjectConfig>,
        cli: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = CodemodConfig::default();
        if let Some(project) = project {
            config.apply_project_config(project);
        }
        config.apply_env_vars(env)?;
        config.apply_cli_overrides(cli);
        Ok(config)
    }

    /// Options for the per-file transform.
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            namespace_module: self.namespace_module.value.clone(),
            default_global: self.global.value.clone(),
            quote: self.quote.value,
        }
    }

    fn apply_project_config(&mut self, project: &ProjectConfig) {
        let source = ConfigSource::ProjectConfig;
        if let Some(mappings) = &project.mappings {
            self.mappings = Some(ConfigValue::new(mappings.clone(), source));
        }
        if let Some(global) = &project.global {
            self.global = ConfigValue::new(global.clone(), source);
        }
        if let Some(module) = &project.namespace_module {
            self.namespace_module = ConfigValue::new(module.clone(), source);
        }
        if let Some(quote) = project.quote {
            self.quote = ConfigValue::new(quote, source);
        }
        if let Some(paths) = &project.paths {
            self.paths = ConfigValue::new(paths.clone(), source);
        }
        if let Some(report) = &project.report {
            self.report = ConfigValue::new(report.clone(), source);
        }
    }

    fn apply_env_vars(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(mappings) = env(ENV_MAPPINGS).filter(|v| !v.is_empty()) {
            self.mappings = Some(ConfigValue::new(PathBuf::from(mappings), ConfigSource::EnvVar));
        }
        if let Some(global) = env(ENV_GLOBAL).filter(|v| !v.is_empty()) {
            self.global = ConfigValue::new(global, ConfigSource::EnvVar);
        }
        if let Some(quote) = env(ENV_QUOTE).filter(|v| !v.is_empty()) {
            self.quote = ConfigValue::new(quote.parse()?, ConfigSource::EnvVar);
        }
        Ok(())
    }

    fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        let source = ConfigSource::CliFlag;
        if let Some(mappings) = &cli.mappings {
            self.mappings = Some(ConfigValue::new(mappings.clone(), source));
        }
        if let Some(global) = &cli.global {
            self.global = ConfigValue::new(global.clone(), source);
        }
        if let Some(module) = &cli.namespace_module {
            self.namespace_module = ConfigValue::new(module.clone(), source);
        }
        if let Some(quote) = cli.quote {
            self.quote = ConfigValue::new(quote, source);
        }
        if !cli.paths.is_empty() {
            self.paths = ConfigValue::new(cli.paths.clone(), source);
        }
        if let Some(report) = &cli.report {
            self.report = ConfigValue::new(report.clone(), source);
        }
    }
}

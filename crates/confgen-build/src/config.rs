//! Project configuration types (`confgen.toml` format).

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Project locations.
    #[serde(default)]
    pub project: ProjectConfig,

    /// Trial-preprocess compiler settings.
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Project locations. All paths use `/` separators; directories carry a
/// trailing `/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Source root holding the `configure` descriptor (default: searched).
    #[serde(default)]
    pub root: Option<String>,

    /// Output directory for generated files (default: `<root>/SMP/`).
    #[serde(default)]
    pub out: Option<String>,

    /// Install prefix probed for auto-detected library headers.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Scratch directory for the DCE preprocess fallback.
    #[serde(default)]
    pub temp: Option<String>,
}

/// Compiler used for the trial-preprocess pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Compiler executable (default: `cc`).
    #[serde(default)]
    pub path: Option<String>,

    /// Extra arguments passed on every invocation.
    #[serde(default)]
    pub args: Vec<String>,

    /// Path to a compile_commands.json supplying include directories.
    #[serde(default)]
    pub compile_commands: Option<String>,
}

impl BuildConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BuildConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_empty() {
        let config: BuildConfig = toml::from_str("").expect("empty config parses");
        assert!(config.project.root.is_none());
        assert!(config.compiler.args.is_empty());
    }
}

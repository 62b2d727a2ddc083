//! Build system integration for confgen.
//!
//! This crate provides:
//! - The on-disk [`FileLoader`](confgen_core::FileLoader) implementation
//! - Project configuration format (`confgen.toml`)
//! - compile_commands.json include extraction
//! - The trial-preprocess compiler wrapper used by the DCE fallback

mod compile_commands;
mod compiler;
mod config;
mod error;
mod fs;

pub use compile_commands::{CompileCommand, CompileCommands};
pub use compiler::{CCompiler, PreprocessConfig};
pub use config::{BuildConfig, CompilerConfig, ProjectConfig};
pub use error::{BuildError, Result};
pub use fs::DiskLoader;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_config() {
        let toml = r#"
[project]
root = "../ffmpeg/"

[compiler]
path = "clang"
args = ["-w"]
        "#;

        let config: BuildConfig = toml::from_str(toml).expect("Failed to parse config");
        assert_eq!(config.project.root.as_deref(), Some("../ffmpeg/"));
        assert_eq!(config.compiler.path.as_deref(), Some("clang"));
        assert_eq!(config.compiler.args, vec!["-w"]);
    }
}

//! Trial-preprocess compiler wrapper.
//!
//! The DCE fallback needs one thing from a toolchain: run the
//! preprocessor over a handful of sources and leave the expanded text in
//! a `.i` file next to each one. Which compiler backs this is a
//! configuration detail.

use std::path::Path;
use std::process::Command;

use confgen_dce::{DceError, Preprocessor};
use indexmap::IndexMap;

/// Configuration for the preprocess pass.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Compiler executable (defaults to `cc`).
    pub compiler: String,
    /// Extra arguments passed on every invocation.
    pub extra_args: Vec<String>,
    /// Preprocessor defines (-D flags).
    pub defines: Vec<String>,
    /// Suppress all warnings (-w).
    pub suppress_warnings: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            compiler: "cc".to_string(),
            extra_args: Vec::new(),
            defines: Vec::new(),
            suppress_warnings: true,
        }
    }
}

impl PreprocessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compiler executable.
    pub fn compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Add a preprocessor define.
    pub fn define(mut self, define: impl Into<String>) -> Self {
        self.defines.push(define.into());
        self
    }

    /// Add an extra argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }
}

/// Preprocess collaborator backed by an external C compiler.
#[derive(Debug, Default)]
pub struct CCompiler {
    config: PreprocessConfig,
}

impl CCompiler {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }
}

impl Preprocessor for CCompiler {
    fn preprocess(
        &self,
        include_dirs: &[String],
        objects: &IndexMap<String, Vec<String>>,
    ) -> confgen_dce::Result<()> {
        for files in objects.values() {
            for file in files {
                let output = Path::new(file).with_extension("i");
                let mut cmd = Command::new(&self.config.compiler);
                cmd.arg("-E").arg("-P");
                if self.config.suppress_warnings {
                    cmd.arg("-w");
                }
                for dir in include_dirs {
                    cmd.arg("-I").arg(dir);
                }
                for define in &self.config.defines {
                    cmd.arg("-D").arg(define);
                }
                for arg in &self.config.extra_args {
                    cmd.arg(arg);
                }
                cmd.arg("-o").arg(&output).arg(file);

                let status = cmd
                    .status()
                    .map_err(|e| DceError::Preprocess(format!("{}: {}", file, e)))?;
                if !status.success() {
                    return Err(DceError::Preprocess(file.clone()));
                }
            }
        }
        Ok(())
    }
}

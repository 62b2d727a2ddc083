//! compile_commands.json parsing.
//!
//! A compilation database generated by another build system carries the
//! exact include paths each source was compiled with; the DCE fallback
//! reuses them for its trial-preprocess pass.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single compile command from compile_commands.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileCommand {
    /// The working directory for compilation.
    pub directory: String,

    /// The source file path.
    pub file: String,

    /// The full compilation command (space-separated).
    #[serde(default)]
    pub command: Option<String>,

    /// The compilation arguments (array form).
    #[serde(default)]
    pub arguments: Option<Vec<String>>,
}

impl CompileCommand {
    /// Get the compilation arguments as a vector.
    pub fn get_args(&self) -> Vec<String> {
        if let Some(args) = &self.arguments {
            args.clone()
        } else if let Some(cmd) = &self.command {
            cmd.split_whitespace().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        }
    }

    /// Extract include directories from the arguments.
    pub fn get_includes(&self) -> Vec<String> {
        let args = self.get_args();
        let mut includes = Vec::new();
        let mut i = 0;
        while i < args.len() {
            if (args[i] == "-I" || args[i] == "-isystem") && i + 1 < args.len() {
                includes.push(args[i + 1].clone());
                i += 2;
            } else if let Some(path) = args[i].strip_prefix("-I") {
                includes.push(path.to_string());
                i += 1;
            } else {
                i += 1;
            }
        }
        includes
    }
}

/// The full compilation database.
#[derive(Debug, Clone, Default)]
pub struct CompileCommands {
    pub commands: Vec<CompileCommand>,
}

impl CompileCommands {
    /// Load compile_commands.json.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let commands: Vec<CompileCommand> = serde_json::from_str(&content)?;
        Ok(Self { commands })
    }

    /// All include directories across the database, deduplicated in first
    /// appearance order.
    pub fn include_dirs(&self) -> Vec<String> {
        let mut dirs = Vec::new();
        for command in &self.commands {
            for dir in command.get_includes() {
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_from_command_string() {
        let json = r#"[
            {"directory": "/src", "file": "a.c", "command": "cc -I include -Ilibavutil -c a.c"},
            {"directory": "/src", "file": "b.c", "command": "cc -Iinclude -c b.c"}
        ]"#;
        let commands: Vec<CompileCommand> = serde_json::from_str(json).unwrap();
        let db = CompileCommands { commands };
        assert_eq!(db.include_dirs(), vec!["include", "libavutil"]);
    }
}

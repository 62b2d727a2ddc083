//! The two-phase DCE pass over a project's source tree.

use confgen_common::Reporter;
use confgen_core::{Descriptor, FileLoader, OptionState, OptionStore};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::error::{DceError, Result};
use crate::expr::resolve_define;
use crate::stubs::{find_declaration, render_stub_file, StubEntry};
use crate::usage::{find_usages, DceUsage, UsageScan, DCE_TAGS};

/// Operator/keyword contexts a guard tag can appear behind; these are
/// masked before the trial preprocess so the tags survive it.
const MASK_CONTEXTS: &[&str] = &["if (", "if(", "& ", "&", "| ", "|"];

/// Trial-compile collaborator: preprocess the given sources (grouped by
/// sub-directory) with the given include directories, leaving a `.i` file
/// next to each source.
pub trait Preprocessor {
    fn preprocess(
        &self,
        include_dirs: &[String],
        objects: &IndexMap<String, Vec<String>>,
    ) -> Result<()>;
}

/// Symbol prefixes whose references are tracked for a given project.
pub fn project_idents(project: &str) -> Vec<String> {
    let extra: &[&str] = match project {
        "ffmpeg" | "ffplay" | "ffprobe" | "avconv" | "avplay" | "avprobe" => &[
            "avcodec_",
            "avdevice_",
            "avfilter_",
            "avformat_",
            "avutil_",
            "av_",
            "avresample_",
            "postproc_",
            "swri_",
            "swresample_",
            "swscale_",
        ],
        "libavcodec" => &["avcodec_"],
        "libavdevice" => &["avdevice_"],
        "libavfilter" => &["avfilter_"],
        "libavformat" => &["avformat_"],
        "libavutil" => &["avutil_", "av_"],
        "libavresample" => &["avresample_"],
        "libpostproc" => &["postproc_"],
        "libswresample" => &["swri_", "swresample_"],
        "libswscale" => &["swscale_"],
        _ => &[],
    };
    let mut idents = vec!["ff_".to_string()];
    idents.extend(extra.iter().map(|s| s.to_string()));
    idents
}

/// One DCE analysis run over a single project directory.
pub struct DceAnalysis<'a> {
    pub store: &'a OptionStore,
    pub desc: &'a Descriptor<'a>,
    pub loader: &'a dyn FileLoader,
    pub preprocessor: &'a dyn Preprocessor,
    /// Forced-replacement symbols; these stay symbolic during resolution.
    pub replace: &'a FxHashMap<String, String>,
    pub reporter: Reporter,
    /// Project (library) name, e.g. `libavcodec`.
    pub project: String,
    /// Project directory with trailing `/`.
    pub project_dir: String,
    /// Scratch directory for the preprocess fallback.
    pub temp_dir: String,
}

impl DceAnalysis<'_> {
    /// Run the analysis and return the rendered stub translation unit, or
    /// `None` when the configuration leaves nothing to stub.
    pub fn run(&self, include_dirs: &[String]) -> Result<Option<String>> {
        self.reporter.status(format!(
            "  Generating missing DCE symbols ({})...",
            self.project
        ));
        let recursive = self.project_dir != self.desc.root();
        let mut queue = Vec::new();
        for ext in [".h", ".c", ".cpp"] {
            queue.extend(self.loader.find_files(&self.project_dir, ext, recursive));
        }

        // Phase 1: usage extraction, following `.c` template includes.
        let idents = project_idents(&self.project);
        let mut scan = UsageScan::default();
        let mut preproc_files = Vec::new();
        let mut at = 0;
        while at < queue.len() {
            let file = queue[at].clone();
            at += 1;
            let text = self.loader.load(&file)?;
            if find_usages(&text, &file, &idents, &mut scan, &self.reporter) {
                preproc_files.push(file.clone());
            }
            for include in template_includes(&text) {
                let resolved = self.resolve_include(&include, &file)?;
                if !queue.contains(&resolved) {
                    queue.push(resolved);
                }
            }
        }

        // Phase 2: resolve each guard against the store up front so live
        // code drops out before any declaration lookups.
        self.resolve_pending(&mut scan);

        // Phase 3: declaration search, headers before sources.
        let mut functions: IndexMap<String, StubEntry> = IndexMap::new();
        let mut variables: IndexMap<String, StubEntry> = IndexMap::new();
        if !scan.usages.is_empty() {
            let mut declaration_files = self.loader.find_files(&self.project_dir, ".h", recursive);
            declaration_files.extend(self.loader.find_files(&self.project_dir, ".c", recursive));
            declaration_files.extend(self.loader.find_files(&self.project_dir, ".cpp", recursive));
            for file in declaration_files {
                if scan.usages.is_empty() {
                    break;
                }
                let text = self.loader.load(&file)?;
                let mut located = Vec::new();
                for (symbol, usage) in &scan.usages {
                    if let Some((declaration, is_function)) = find_declaration(&text, symbol) {
                        let entry = StubEntry {
                            guard: usage.guard.clone(),
                            file: self.strip_root(&file),
                        };
                        if is_function {
                            functions.insert(declaration, entry);
                        } else {
                            variables.insert(declaration, entry);
                        }
                        located.push(symbol.clone());
                    }
                }
                for symbol in located {
                    scan.usages.shift_remove(&symbol);
                }
            }
        }

        // Phase 4: compiler-assisted fallback for macro-pasted guards and
        // still-undeclared symbols.
        if !scan.usages.is_empty() || !preproc_files.is_empty() {
            for file in &preproc_files {
                scan.usages.insert(
                    file.clone(),
                    DceUsage {
                        guard: "#".to_string(),
                        file: file.clone(),
                    },
                );
            }
            self.preprocess_fallback(&mut scan, &mut functions, &mut variables, include_dirs)?;
        }

        // Whatever is still unresolved gets a blank best-effort stub.
        for (symbol, usage) in &scan.usages {
            self.reporter.info(format!(
                "Failed to find function definition for {}, {}",
                symbol, usage.file
            ));
            functions.insert(
                format!("void {}()", symbol),
                StubEntry {
                    guard: usage.guard.clone(),
                    file: usage.file.clone(),
                },
            );
        }

        if functions.is_empty() && variables.is_empty() {
            return Ok(None);
        }
        Ok(Some(render_stub_file(
            &self.project,
            &functions,
            &variables,
            self.store,
            self.replace,
        )))
    }

    /// Resolve every pending guard; guards reducing to `1` are
    /// unconditionally live and leave the DCE set.
    fn resolve_pending(&self, scan: &mut UsageScan) {
        let mut live = Vec::new();
        for (symbol, usage) in scan.usages.iter_mut() {
            let resolved = resolve_define(&usage.guard, |tag| self.lookup(tag));
            if resolved == "1" {
                live.push(symbol.clone());
            } else {
                usage.guard = resolved;
            }
        }
        for symbol in live {
            scan.non_dce.insert(symbol.clone());
            scan.usages.shift_remove(&symbol);
        }
    }

    /// Option lookup for guard resolution. Replaced symbols and unknown
    /// tags stay symbolic.
    fn lookup(&self, tag: &str) -> Option<bool> {
        let index = self.store.get_prefixed(tag)?;
        let option = self.store.option(index);
        if self.replace.contains_key(&option.tag()) {
            return None;
        }
        match option.state {
            OptionState::Enabled => Some(true),
            OptionState::Disabled => Some(false),
            OptionState::Unset => None,
        }
    }

    /// Copy ambiguous files into a scratch tree with guard tags masked,
    /// preprocess them, and re-run extraction on the expanded output.
    fn preprocess_fallback(
        &self,
        scan: &mut UsageScan,
        functions: &mut IndexMap<String, StubEntry>,
        variables: &mut IndexMap<String, StubEntry>,
        include_dirs: &[String],
    ) -> Result<()> {
        let temp_root = self.temp_dir.trim_end_matches('/').to_string();
        self.loader.make_dir(&temp_root)?;

        // Group pending work by its (copied) source file.
        let mut work: IndexMap<String, Vec<(String, String)>> = IndexMap::new();
        let mut origins: FxHashMap<String, String> = FxHashMap::default();
        for (symbol, usage) in &scan.usages {
            let local = usage
                .file
                .strip_prefix(&self.project_dir)
                .unwrap_or(&usage.file)
                .trim_start_matches('/');
            let temp = format!("{}/{}", temp_root, local);
            if let Some(slash) = temp.rfind('/') {
                self.loader.make_dir(&temp[..slash])?;
            }
            if !work.contains_key(&temp) {
                self.loader.copy(&usage.file, &temp)?;
                origins.insert(temp.clone(), usage.file.clone());
            }
            work.entry(temp)
                .or_default()
                .push((usage.guard.clone(), symbol.clone()));
        }

        // Mask the option tags so preprocessing does not expand them away,
        // and widen the include path with any sub-directories involved.
        let mut dirs = include_dirs.to_vec();
        let mut objects: IndexMap<String, Vec<String>> = IndexMap::new();
        for temp in work.keys() {
            let mut text = self.loader.load(temp)?;
            for tag in DCE_TAGS {
                for context in MASK_CONTEXTS {
                    text = text.replace(
                        &format!("{}{}", context, tag),
                        &format!("{}XXX{}", context, tag),
                    );
                }
            }
            self.loader.save(temp, &text)?;

            let local = &temp[temp_root.len() + 1..];
            let sub = match local.rfind('/') {
                Some(slash) => {
                    let sub_dir = format!("{}{}", self.project_dir, &local[..slash]);
                    if !dirs.contains(&sub_dir) {
                        dirs.push(sub_dir);
                    }
                    local[..slash].to_string()
                }
                None => String::new(),
            };
            objects.entry(sub).or_default().push(temp.clone());
        }
        if !dirs.contains(&self.project_dir) {
            dirs.push(self.project_dir.clone());
        }
        self.preprocessor.preprocess(&dirs, &objects)?;

        for (temp, mut pending) in work {
            let preprocessed = format!("{}i", &temp[..temp.len() - 1]);
            let Ok(mut text) = self.loader.load(&preprocessed) else {
                return Err(DceError::Preprocess(temp));
            };
            for tag in DCE_TAGS {
                for context in MASK_CONTEXTS {
                    text = text.replace(
                        &format!("{}XXX{}", context, tag),
                        &format!("{}{}", context, tag),
                    );
                }
            }

            // Re-scan the expanded text; macro-built references are plain
            // text now.
            let idents = project_idents(&self.project);
            let mut sub_scan = UsageScan {
                usages: IndexMap::new(),
                non_dce: std::mem::take(&mut scan.non_dce),
            };
            find_usages(&text, &temp, &idents, &mut sub_scan, &self.reporter);
            self.resolve_pending(&mut sub_scan);
            scan.non_dce = sub_scan.non_dce;
            for (symbol, usage) in sub_scan.usages {
                if !pending.iter().any(|(_, s)| s == &symbol) {
                    pending.push((usage.guard.clone(), symbol.clone()));
                    scan.usages.insert(symbol, usage);
                }
            }

            let origin = origins
                .get(&temp)
                .map(|o| self.strip_root(o))
                .unwrap_or_else(|| self.strip_root(&temp));
            for (guard, symbol) in &pending {
                if guard == "#" {
                    // Just a preprocess request, not a symbol.
                    scan.usages.shift_remove(symbol);
                    continue;
                }
                if let Some((declaration, is_function)) = find_declaration(&text, symbol) {
                    let entry = StubEntry {
                        guard: guard.clone(),
                        file: origin.clone(),
                    };
                    if is_function {
                        functions.entry(declaration).or_insert(entry);
                    } else {
                        variables.entry(declaration).or_insert(entry);
                    }
                    scan.usages.shift_remove(symbol);
                }
            }
        }

        self.loader.remove(&temp_root);
        Ok(())
    }

    /// Resolve a `#include "x.c"` template reference against the project
    /// directory, the source root, and the including file's directory.
    fn resolve_include(&self, include: &str, from_file: &str) -> Result<String> {
        let name = match include.find(&self.project) {
            Some(at) => &include[at + self.project.len() + 1..],
            None => include,
        };
        let candidates = [
            format!("{}{}", self.project_dir, name),
            format!("{}{}", self.desc.root(), name),
            match from_file.rfind('/') {
                Some(slash) => format!("{}/{}", &from_file[..slash], name),
                None => name.to_string(),
            },
        ];
        for candidate in &candidates {
            if let Some(found) = self.loader.find_file(candidate) {
                return Ok(found);
            }
        }
        Err(DceError::MissingInclude(include.to_string()))
    }

    fn strip_root(&self, path: &str) -> String {
        path.strip_prefix(self.desc.root())
            .unwrap_or(path)
            .trim_start_matches("./")
            .to_string()
    }
}

/// `#include "….c"` template references within 50 characters of the
/// include keyword.
fn template_includes(text: &str) -> Vec<String> {
    let mut includes = Vec::new();
    let mut find_pos = text.find(".c\"");
    while let Some(at) = find_pos {
        if let Some(open) = text[..at].rfind("#include \"") {
            if at - open < 50 {
                includes.push(text[open + 10..at + 2].to_string());
            }
        }
        find_pos = text[at + 1..].find(".c\"").map(|x| x + at + 1);
    }
    includes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idents_depend_on_project() {
        assert_eq!(project_idents("libswscale"), vec!["ff_", "swscale_"]);
        assert_eq!(project_idents("other"), vec!["ff_"]);
        assert!(project_idents("ffmpeg").contains(&"av_".to_string()));
    }

    #[test]
    fn template_includes_require_adjacent_include() {
        let text = "#include \"aacdec_template.c\"\n/* a long stretch of commentary keeps the next mention well away */\n// mentions a.c\" here\n";
        let includes = template_includes(text);
        assert_eq!(includes, vec!["aacdec_template.c"]);
    }
}

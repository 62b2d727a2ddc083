//! Generation driver: orchestrates descriptor parsing, resolution, output
//! writing, and the DCE pass.

use confgen_common::Reporter;
use confgen_core::{
    apply_defaults, apply_directive, apply_forced_values, apply_license_rules, asm_replace_values,
    check_license, component_directives, parse_existing_config, render_components,
    render_config_asm, render_config_h, render_public_header, render_version_header,
    replace_values, update_license, DefaultSettings, Descriptor, FileLoader, OptionStore,
};
use confgen_dce::{DceAnalysis, Preprocessor};
use miette::{IntoDiagnostic, Result};
use rustc_hash::FxHashMap;

/// Directories probed for the configure descriptor when no root is given,
/// nearest first.
const ROOT_SEARCH_PATHS: &[&str] = &[
    "./",
    "../",
    "./ffmpeg/",
    "../ffmpeg/",
    "../../ffmpeg/",
    "../../../",
    "../../",
    "./libav/",
    "../libav/",
    "../../libav/",
];

/// Run settings, normally assembled by the CLI from flags and
/// `confgen.toml`.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Source root holding `configure`; searched when absent.
    pub root_dir: Option<String>,
    /// Directory generated files are written to (default `<root>/SMP/`).
    pub out_dir: Option<String>,
    /// Install prefix probed for auto-detected libraries.
    pub prefix: Option<String>,
    /// Only generate missing DCE stubs, no configuration headers.
    pub dce_only: bool,
    /// Assemble with nasm rather than yasm.
    pub use_nasm: bool,
    /// Re-use an existing config.h instead of resolving a new one.
    pub use_existing_config: bool,
    /// Include directories for the trial-preprocess pass.
    pub include_dirs: Vec<String>,
    /// Scratch directory for the DCE fallback.
    pub temp_dir: String,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            root_dir: None,
            out_dir: None,
            prefix: None,
            dce_only: false,
            use_nasm: true,
            use_existing_config: false,
            include_dirs: Vec::new(),
            temp_dir: "./.confgen-tmp/".to_string(),
        }
    }
}

/// Drives one full generation run.
pub struct Driver<'a> {
    loader: &'a dyn FileLoader,
    preprocessor: &'a dyn Preprocessor,
    reporter: Reporter,
    settings: DriverSettings,
}

impl<'a> Driver<'a> {
    pub fn new(
        loader: &'a dyn FileLoader,
        preprocessor: &'a dyn Preprocessor,
        reporter: Reporter,
        settings: DriverSettings,
    ) -> Self {
        Self {
            loader,
            preprocessor,
            reporter,
            settings,
        }
    }

    /// Apply the directives and produce every output the descriptor asks
    /// for. Directives are the raw `--enable-*` / `--disable-*` strings in
    /// command-line order.
    pub fn run(&self, directives: &[String]) -> Result<()> {
        let (root, text) = self.locate_descriptor()?;
        let desc = Descriptor::from_text(self.loader, self.reporter, root.clone(), text)
            .into_diagnostic()?;

        let mut store = OptionStore::new();
        desc.parse(&mut store).into_diagnostic()?;

        let out_dir = self.settings.out_dir.clone().unwrap_or_else(|| {
            if self.settings.dce_only {
                root.clone()
            } else {
                format!("{}SMP/", root)
            }
        });
        let defaults = DefaultSettings {
            use_nasm: self.settings.use_nasm,
            out_dir: self
                .settings
                .prefix
                .clone()
                .unwrap_or_else(|| DefaultSettings::default().out_dir),
        };

        if self.settings.use_existing_config {
            apply_defaults(&mut store, &desc, self.loader, &defaults, &self.reporter)
                .into_diagnostic()?;
            parse_existing_config(
                &mut store,
                self.loader,
                &self.reporter,
                &format!("{}config.h", root),
            )
            .into_diagnostic()?;
        } else {
            apply_defaults(&mut store, &desc, self.loader, &defaults, &self.reporter)
                .into_diagnostic()?;
            for directive in directives {
                apply_directive(&mut store, &desc, directive, &self.reporter).into_diagnostic()?;
            }
            apply_forced_values(&mut store);

            apply_license_rules(&mut store);
            confgen_core::validate_all(&mut store, &desc, &self.reporter).into_diagnostic()?;
            check_license(&store, &desc).into_diagnostic()?;
        }

        let replace = replace_values(&store, &desc).into_diagnostic()?;
        if !self.settings.dce_only && !self.settings.use_existing_config {
            self.write_outputs(&mut store, &desc, &out_dir, &root, &replace)?;
        }
        self.run_dce(&store, &desc, &out_dir, &replace)?;
        Ok(())
    }

    /// Resolve a `--list-<kind>` request: the members of `<KIND>_LIST`,
    /// with the type suffix cut and lower-cased for display.
    pub fn list(&self, kind: &str) -> Result<Vec<String>> {
        let (root, text) = self.locate_descriptor()?;
        let desc = Descriptor::from_text(self.loader, self.reporter, root, text)
            .into_diagnostic()?;
        let singular = kind.strip_suffix('s').unwrap_or(kind);
        let list_name = format!("{}_LIST", singular.to_uppercase());
        let members = desc
            .config_list(&list_name)
            .map_err(|_| miette::miette!("Unknown list option ({})", kind))?;
        Ok(members
            .into_iter()
            .map(|member| {
                let cut = member.rfind('_').map(|at| &member[..at]).unwrap_or(&member);
                cut.to_lowercase()
            })
            .collect())
    }

    fn locate_descriptor(&self) -> Result<(String, String)> {
        if let Some(root) = &self.settings.root_dir {
            let path = format!("{}configure", root);
            return match self.loader.load(&path) {
                Ok(text) => Ok((root.clone(), text)),
                Err(_) => Err(miette::miette!(
                    "Failed to find a 'configure' file in specified root directory"
                )),
            };
        }
        for root in ROOT_SEARCH_PATHS {
            if let Ok(text) = self.loader.load(&format!("{}configure", root)) {
                return Ok((root.to_string(), text));
            }
        }
        Err(miette::miette!("Failed to find a 'configure' file"))
    }

    fn write_outputs(
        &self,
        store: &mut OptionStore,
        desc: &Descriptor,
        out_dir: &str,
        root: &str,
        replace: &FxHashMap<String, String>,
    ) -> Result<()> {
        // Stale outputs from a previous run would shadow the new ones.
        for stale in ["config.h", "config.asm", "libavutil/avconfig.h", "libavutil/ffversion.h"] {
            self.loader.remove(&format!("{}{}", out_dir, stale));
        }

        self.reporter.status("  Outputting config.h...");
        update_license(store, desc.project());
        self.loader
            .save(&format!("{}config.h", out_dir), &render_config_h(store, replace))
            .into_diagnostic()?;
        let asm_replace = asm_replace_values(self.settings.use_nasm);
        self.loader
            .save(
                &format!("{}config.asm", out_dir),
                &render_config_asm(store, &asm_replace),
            )
            .into_diagnostic()?;

        self.reporter.status("  Outputting avconfig.h...");
        self.loader
            .make_dir(&format!("{}libavutil", out_dir))
            .into_diagnostic()?;
        let public = render_public_header(store, desc).into_diagnostic()?;
        self.loader
            .save(&format!("{}libavutil/avconfig.h", out_dir), &public)
            .into_diagnostic()?;

        self.reporter.status("  Outputting ffversion.h...");
        let release = self
            .loader
            .load(&format!("{}RELEASE", root))
            .into_diagnostic()?;
        let version = release.lines().next().unwrap_or("").trim();
        self.loader
            .save(
                &format!("{}libavutil/ffversion.h", out_dir),
                &render_version_header(desc.project(), version),
            )
            .into_diagnostic()?;

        for directive in component_directives(desc) {
            self.reporter.status(format!(
                "  Outputting enabled components file {}...",
                directive.file
            ));
            let rendered =
                render_components(store, desc, &directive, replace).into_diagnostic()?;
            self.loader
                .save(&format!("{}{}", out_dir, directive.file), &rendered)
                .into_diagnostic()?;
        }
        Ok(())
    }

    /// Run the DCE pass over every enabled library with sources present.
    fn run_dce(
        &self,
        store: &OptionStore,
        desc: &Descriptor,
        out_dir: &str,
        replace: &FxHashMap<String, String>,
    ) -> Result<()> {
        let Some(libraries) = desc.try_config_list("LIBRARY_LIST").into_diagnostic()? else {
            return Ok(());
        };
        for library in libraries {
            if !store.is_enabled(&library) {
                continue;
            }
            let project = format!("lib{}", library);
            let project_dir = format!("{}{}/", desc.root(), project);
            let mut sources = self.loader.find_files(&project_dir, ".c", true);
            if sources.is_empty() {
                sources = self.loader.find_files(&project_dir, ".h", true);
            }
            if sources.is_empty() {
                continue;
            }
            let analysis = DceAnalysis {
                store,
                desc,
                loader: self.loader,
                preprocessor: self.preprocessor,
                replace,
                reporter: self.reporter,
                project: project.clone(),
                project_dir,
                temp_dir: self.settings.temp_dir.clone(),
            };
            let mut include_dirs = self.settings.include_dirs.clone();
            if !include_dirs.contains(&desc.root().to_string()) {
                include_dirs.push(desc.root().to_string());
            }
            if let Some(stub) = analysis.run(&include_dirs).into_diagnostic()? {
                self.loader
                    .save(&format!("{}{}/dce_defs.c", out_dir, project), &stub)
                    .into_diagnostic()?;
            }
        }
        Ok(())
    }
}

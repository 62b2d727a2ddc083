//! Integration tests for the DCE analyzer over in-memory source trees.

use confgen_common::{Reporter, Verbosity};
use confgen_core::{Descriptor, MemoryLoader, OptionState, OptionStore};
use confgen_dce::{find_usages, DceAnalysis, Preprocessor, UsageScan};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Preprocess collaborator that must never be reached.
struct NoPreprocess;

impl Preprocessor for NoPreprocess {
    fn preprocess(
        &self,
        _include_dirs: &[String],
        _objects: &IndexMap<String, Vec<String>>,
    ) -> confgen_dce::Result<()> {
        panic!("preprocess fallback should not run in this test");
    }
}

/// Preprocess collaborator that drops a canned `.i` file next to every
/// requested source.
struct CannedPreprocess<'a> {
    loader: &'a MemoryLoader,
    output: String,
}

impl Preprocessor for CannedPreprocess<'_> {
    fn preprocess(
        &self,
        _include_dirs: &[String],
        objects: &IndexMap<String, Vec<String>>,
    ) -> confgen_dce::Result<()> {
        for files in objects.values() {
            for file in files {
                let target = format!("{}i", &file[..file.len() - 1]);
                self.loader.insert(target, self.output.clone());
            }
        }
        Ok(())
    }
}

fn reporter() -> Reporter {
    Reporter::new(Verbosity::Error)
}

fn descriptor(loader: &MemoryLoader) -> Descriptor<'_> {
    loader.insert("src/configure", "#define FFMPEG_CONFIG_H\n");
    Descriptor::load(loader, reporter(), "src/").expect("descriptor loads")
}

#[test]
fn unconditional_reference_elsewhere_excludes_symbol() {
    // file1 calls av_foo only under CONFIG_FOO; file2 calls it
    // unconditionally. The symbol is non-DCE even with CONFIG_FOO off.
    let file1 = "void a(void) {\n    if (CONFIG_FOO)\n        av_foo();\n}\n";
    let file2 = "void b(void) {\n    av_foo();\n}\n";
    let idents = vec!["av_".to_string()];

    let mut scan = UsageScan::default();
    find_usages(file1, "file1.c", &idents, &mut scan, &reporter());
    find_usages(file2, "file2.c", &idents, &mut scan, &reporter());

    assert!(scan.non_dce.contains("av_foo"));
    assert!(scan.usages.is_empty());
}

#[test]
fn disabled_guard_produces_unguarded_stub() {
    let loader = MemoryLoader::new();
    let desc = descriptor(&loader);
    loader.insert(
        "src/libavcodec/allcodecs.c",
        "void init(void) {\n    if (CONFIG_DEAD_DECODER)\n        avcodec_dead_init();\n}\n",
    );
    loader.insert("src/libavcodec/dead.h", "int avcodec_dead_init(AVCtx *ctx);\n");

    let mut store = OptionStore::new();
    store.push("dead_decoder", "CONFIG_", OptionState::Disabled);

    let analysis = DceAnalysis {
        store: &store,
        desc: &desc,
        loader: &loader,
        preprocessor: &NoPreprocess,
        replace: &FxHashMap::default(),
        reporter: reporter(),
        project: "libavcodec".to_string(),
        project_dir: "src/libavcodec/".to_string(),
        temp_dir: "tmp/".to_string(),
    };
    let stub = analysis
        .run(&[])
        .expect("analysis succeeds")
        .expect("a stub file is produced");

    // The guard resolved to 0, so the stub is unconditional.
    assert!(stub.contains("#include \"config.h\""));
    assert!(stub.contains("#include \"libavcodec/dead.h\""));
    assert!(stub.contains("int avcodec_dead_init(AVCtx *ctx) {return 0;}"));
    assert!(!stub.contains("#if !(CONFIG_DEAD_DECODER)"));
}

#[test]
fn unresolvable_guard_stays_symbolic_and_wraps_the_stub() {
    let loader = MemoryLoader::new();
    let desc = descriptor(&loader);
    loader.insert(
        "src/libavutil/util.c",
        "void init(void) {\n    if (HAVE_MYSTERY)\n        av_mystery_setup();\n}\n",
    );
    loader.insert(
        "src/libavutil/mystery.h",
        "void av_mystery_setup(void);\n",
    );

    // The store knows nothing about HAVE_MYSTERY.
    let store = OptionStore::new();
    let analysis = DceAnalysis {
        store: &store,
        desc: &desc,
        loader: &loader,
        preprocessor: &NoPreprocess,
        replace: &FxHashMap::default(),
        reporter: reporter(),
        project: "libavutil".to_string(),
        project_dir: "src/libavutil/".to_string(),
        temp_dir: "tmp/".to_string(),
    };
    let stub = analysis.run(&[]).unwrap().unwrap();
    assert!(stub.contains("#if !(HAVE_MYSTERY)\nvoid av_mystery_setup(void) {return;}\n#endif"));
    assert!(stub.contains("#if !(HAVE_MYSTERY)\n#include \"libavutil/mystery.h\"\n#endif"));
}

#[test]
fn enabled_guard_drops_the_usage() {
    let loader = MemoryLoader::new();
    let desc = descriptor(&loader);
    loader.insert(
        "src/libavcodec/live.c",
        "void init(void) {\n    if (CONFIG_LIVE_DECODER)\n        avcodec_live_init();\n}\n",
    );

    let mut store = OptionStore::new();
    store.push("live_decoder", "CONFIG_", OptionState::Enabled);
    let analysis = DceAnalysis {
        store: &store,
        desc: &desc,
        loader: &loader,
        preprocessor: &NoPreprocess,
        replace: &FxHashMap::default(),
        reporter: reporter(),
        project: "libavcodec".to_string(),
        project_dir: "src/libavcodec/".to_string(),
        temp_dir: "tmp/".to_string(),
    };
    assert!(analysis.run(&[]).unwrap().is_none());
}

#[test]
fn undeclared_symbol_gets_blank_stub() {
    let loader = MemoryLoader::new();
    let desc = descriptor(&loader);
    loader.insert(
        "src/libavcodec/missing.c",
        "void init(void) {\n    if (CONFIG_GONE_DECODER)\n        avcodec_gone_init();\n}\n",
    );

    let mut store = OptionStore::new();
    store.push("gone_decoder", "CONFIG_", OptionState::Disabled);
    // The preprocessed output carries no declaration either, so only the
    // blank best-effort stub remains.
    let preprocessor = CannedPreprocess {
        loader: &loader,
        output: String::new(),
    };
    let analysis = DceAnalysis {
        store: &store,
        desc: &desc,
        loader: &loader,
        preprocessor: &preprocessor,
        replace: &FxHashMap::default(),
        reporter: reporter(),
        project: "libavcodec".to_string(),
        project_dir: "src/libavcodec/".to_string(),
        temp_dir: "tmp/".to_string(),
    };
    let stub = analysis.run(&[]).unwrap().unwrap();
    assert!(stub.contains("void avcodec_gone_init() {return;}"));
}

//! Integration tests for descriptor parsing, directive processing, and
//! dependency resolution over a small but complete descriptor.

use confgen_common::{Reporter, Verbosity};
use confgen_core::{
    apply_defaults, apply_directive, toggle, validate_all, ConfigError, DefaultSettings,
    Descriptor, MemoryLoader, OptionState, OptionStore,
};

const DESCRIPTOR: &str = r#"cat > $TMPH <<EOF
#define FFMPEG_CONFIG_H
#define FFMPEG_CONFIGURATION "$(c_escape $FFMPEG_CONFIGURATION)"
#define FFMPEG_LICENSE "$(c_escape $license)"
EOF
print_config CONFIG_ "$config_mak" $CONFIG_LIST
#endif

ARCH_EXT_LIST_X86="mmx sse"

MATH_FUNCS="sqrtf"

PROGRAM_LIST="ff1 ff2"

LIBRARY_LIST="avutil avcodec"

COMPONENT_LIST="decoders"

DECODER_LIST="aac_decoder codeca_decoder"

EXTERNAL_LIBRARY_LIST="lib_x"

CONFIG_LIST="
    $PROGRAM_LIST
    $LIBRARY_LIST
    $COMPONENT_LIST
    $DECODER_LIST
    $EXTERNAL_LIBRARY_LIST
    gpl
    opta
    optb
    optc
    optd
"

codeca_decoder_deps="lib_x"

opta_conflict="optb"

optc_select="optd"

optd_select="optc"
"#;

fn reporter() -> Reporter {
    Reporter::new(Verbosity::Error)
}

fn resolved_store<'a>(
    loader: &'a MemoryLoader,
    directives: &[&str],
) -> (Descriptor<'a>, OptionStore) {
    let desc = Descriptor::from_text(loader, reporter(), "", DESCRIPTOR.to_string())
        .expect("descriptor parses");
    let mut store = OptionStore::new();
    desc.parse(&mut store).expect("config block parses");
    let settings = DefaultSettings {
        use_nasm: true,
        out_dir: "out/".to_string(),
    };
    apply_defaults(&mut store, &desc, loader, &settings, &reporter()).expect("defaults apply");
    for directive in directives {
        apply_directive(&mut store, &desc, directive, &reporter()).expect("directive applies");
    }
    validate_all(&mut store, &desc, &reporter()).expect("validation passes");
    (desc, store)
}

#[test]
fn disable_programs_turns_off_every_program() {
    let loader = MemoryLoader::new();
    let (_, store) = resolved_store(&loader, &["--disable-programs"]);
    assert_eq!(store.state(store.get("FF1").unwrap()), OptionState::Disabled);
    assert_eq!(store.state(store.get("FF2").unwrap()), OptionState::Disabled);
    // The directive is recorded for provenance.
    assert!(store
        .fixed("FFMPEG_CONFIGURATION")
        .unwrap()
        .value
        .contains("--disable-programs"));
}

#[test]
fn unmet_hard_dependency_disables_the_option() {
    let loader = MemoryLoader::new();
    let (_, store) = resolved_store(&loader, &["--enable-codeca-decoder"]);
    // lib_x is never enabled, so the decoder's _deps check fails.
    assert_eq!(
        store.state(store.get("CODECA_DECODER").unwrap()),
        OptionState::Disabled
    );
}

#[test]
fn no_option_is_left_uninitialized() {
    let loader = MemoryLoader::new();
    let (_, store) = resolved_store(&loader, &[]);
    for option in store.iter() {
        assert_ne!(
            option.state,
            OptionState::Unset,
            "option {} left unset",
            option.name
        );
    }
}

#[test]
fn validation_is_idempotent() {
    let loader = MemoryLoader::new();
    let (desc, mut store) = resolved_store(&loader, &["--enable-codeca-decoder"]);
    let before: Vec<OptionState> = store.iter().map(|o| o.state).collect();
    validate_all(&mut store, &desc, &reporter()).expect("second pass");
    let after: Vec<OptionState> = store.iter().map(|o| o.state).collect();
    assert_eq!(before, after);
}

#[test]
fn conflicts_leave_at_most_one_enabled() {
    let loader = MemoryLoader::new();
    let (_, store) = resolved_store(&loader, &["--enable-opta", "--enable-optb"]);
    // opta is validated first and loses to the enabled optb.
    assert_eq!(store.state(store.get("OPTA").unwrap()), OptionState::Disabled);
    assert_eq!(store.state(store.get("OPTB").unwrap()), OptionState::Enabled);
}

#[test]
fn mutual_selects_terminate_and_settle() {
    let loader = MemoryLoader::new();
    let (_, store) = resolved_store(&loader, &["--enable-optc"]);
    let optc = store.state(store.get("OPTC").unwrap());
    let optd = store.state(store.get("OPTD").unwrap());
    assert_ne!(optc, OptionState::Unset);
    assert_ne!(optd, OptionState::Unset);
    assert_eq!(optc, OptionState::Enabled);
    assert_eq!(optd, OptionState::Enabled);
}

#[test]
fn toggle_roundtrip_restores_disabled_state() {
    let loader = MemoryLoader::new();
    let desc = Descriptor::from_text(&loader, reporter(), "", DESCRIPTOR.to_string()).unwrap();
    let mut store = OptionStore::new();
    desc.parse(&mut store).unwrap();
    // optb has no relation edges.
    store.fast_toggle("optb", false);
    toggle(&mut store, &desc, "optb", true, &reporter()).unwrap();
    assert_eq!(store.state(store.get("OPTB").unwrap()), OptionState::Enabled);
    toggle(&mut store, &desc, "optb", false, &reporter()).unwrap();
    assert_eq!(store.state(store.get("OPTB").unwrap()), OptionState::Disabled);
}

#[test]
fn unknown_direct_option_is_fatal() {
    let loader = MemoryLoader::new();
    let desc = Descriptor::from_text(&loader, reporter(), "", DESCRIPTOR.to_string()).unwrap();
    let mut store = OptionStore::new();
    desc.parse(&mut store).unwrap();
    let err = apply_directive(&mut store, &desc, "--enable-nonsense", &reporter());
    assert!(matches!(err, Err(ConfigError::UnknownOption(_))));
}

#[test]
fn reserved_options_warn_and_noop() {
    let loader = MemoryLoader::new();
    let desc = Descriptor::from_text(&loader, reporter(), "", DESCRIPTOR.to_string()).unwrap();
    let mut store = OptionStore::new();
    desc.parse(&mut store).unwrap();
    // `static` is reserved; the directive is accepted but ignored.
    apply_directive(&mut store, &desc, "--disable-static", &reporter())
        .expect("reserved directive is not an error");
    assert!(!store
        .fixed("FFMPEG_CONFIGURATION")
        .unwrap()
        .value
        .contains("--disable-static"));
}

#[test]
fn component_class_directive_toggles_members() {
    let loader = MemoryLoader::new();
    let (_, store) = resolved_store(&loader, &["--disable-decoders"]);
    assert_eq!(
        store.state(store.get("AAC_DECODER").unwrap()),
        OptionState::Disabled
    );
    assert_eq!(
        store.state(store.get("CODECA_DECODER").unwrap()),
        OptionState::Disabled
    );
}

//! Built-in tables: dependency leaves, forced cross-option pairs, reserved
//! options, fixed substitutions, and forced textual replacements.
//!
//! These cover knowledge the descriptor cannot express for this target:
//! platform capability probes, compiler-conditional values, and option
//! pairs that must track each other regardless of declared relations.

use rustc_hash::FxHashMap;

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::options::{OptionState, OptionStore};
use crate::relations::RelationKind;

/// Capability leaves referenced by dependency lists but absent from the
/// descriptor's own option lists. A handful derive from current option
/// state.
pub fn additional_dependencies(store: &OptionStore) -> FxHashMap<String, bool> {
    let mut deps = FxHashMap::default();
    let mut set = |name: &str, value: bool| {
        deps.insert(name.to_string(), value);
    };
    set("capCreateCaptureWindow", true);
    set("const_nan", true);
    set("CreateDIBSection", true);
    set("dv1394", false);
    set("DXVA_PicParams_HEVC", true);
    set("DXVA_PicParams_VP9", true);
    set("dxva2api_h", true);
    set("fork", false);
    set("jack_jack_h", false);
    set("IBaseFilter", true);
    set("ID3D11VideoDecoder", true);
    set("ID3D11VideoContext", true);
    set("libcrystalhd_libcrystalhd_if_h", false);
    set("linux_fb_h", false);
    set("linux_videodev_h", false);
    set("linux_videodev2_h", false);
    set("LoadLibrary", true);
    set("parisc64", false);
    set("DXVA2_ConfigPictureDecode", true);
    set("snd_pcm_htimestamp", false);
    set("va_va_h", false);
    set("vdpau_vdpau_h", false);
    set("vdpau_vdpau_x11_h", false);
    set("vfw32", true);
    set("vfwcap_defines", true);
    set("VideoDecodeAcceleration_VDADecoder_h", false);
    set("X11_extensions_Xvlib_h", false);
    set("X11_extensions_XvMClib_h", false);
    set("VAEncPictureParameterBufferH264", false);
    set("VAEncPictureParameterBufferHEVC", false);
    set("VAEncPictureParameterBufferJPEG", false);
    set("VAEncPictureParameterBufferMPEG2", false);
    set("VAEncPictureParameterBufferVP8", false);
    set("VAEncPictureParameterBufferVP9", false);
    set("videotoolbox_encoder", false);
    set("ole32", true);
    set("shell32", true);
    set("wincrypt", true);
    set("psapi", true);
    set("user32", true);
    set("qtkit", false);
    set("coreservices", false);
    set("corefoundation", false);
    set("corevideo", false);
    set("coremedia", false);
    set("coregraphics", false);
    set("applicationservices", false);
    set("libdl", false);
    set("libm", false);

    set("x264_csp_bgr", store.is_enabled("libx264"));
    set("libvorbisenc", store.is_enabled("libvorbis"));
    let cuvid = store.is_enabled("cuvid");
    set("CUVIDH264PICPARAMS", cuvid);
    set("CUVIDHEVCPICPARAMS", cuvid);
    set("CUVIDVC1PICPARAMS", cuvid);
    set("CUVIDVP9PICPARAMS", cuvid);
    if store.get("atomics_native").is_none() {
        set("atomics_native", true);
    }
    deps
}

/// Options the resolver force-enables alongside `option`, regardless of
/// descriptor-declared relations. Only names present in the store are
/// returned; the sdl pair is fast-toggled directly to break its cycle.
pub fn forced_enables(store: &mut OptionStore, option: &str) -> Vec<String> {
    forced_pairs(store, option, true)
}

/// Mirror of [`forced_enables`] applied on disable.
pub fn forced_disables(store: &mut OptionStore, option: &str) -> Vec<String> {
    forced_pairs(store, option, false)
}

fn forced_pairs(store: &mut OptionStore, option: &str, enable: bool) -> Vec<String> {
    let mut forced = Vec::new();
    let mut push = |store: &OptionStore, name: &str, out: &mut Vec<String>| {
        if store.is_valid(name) {
            out.push(name.to_string());
        }
    };
    match option.to_lowercase().as_str() {
        "fontconfig" => push(store, "libfontconfig", &mut forced),
        "dxva2" => push(store, "dxva2_lib", &mut forced),
        "libcdio" => push(store, "cdio_paranoia_paranoia_h", &mut forced),
        "libmfx" => push(store, "qsv", &mut forced),
        "dcadec" => push(store, "struct_dcadec_exss_info_matrix_encoding", &mut forced),
        // sdl and sdl2 track each other; a full toggle would recurse
        // forever, so the pair is updated without propagation.
        "sdl" => {
            store.fast_toggle("sdl2", enable);
        }
        "sdl2" => {
            store.fast_toggle("sdl", enable);
        }
        "libvorbis" => push(store, "libvorbisenc", &mut forced),
        "opencl" => {
            push(store, "opencl_d3d11", &mut forced);
            push(store, "opencl_dxva2", &mut forced);
        }
        "ffnvcodec" => push(store, "cuda", &mut forced),
        "cuda" => push(store, "ffnvcodec", &mut forced),
        _ => {}
    }
    forced
}

/// Options that are managed internally and rejected when set directly.
pub fn reserved_options() -> &'static [&'static str] {
    &[
        "x86_32",
        "x86_64",
        "xmm_clobbers",
        "shared",
        "static",
        "aligned_stack",
        "fast_64bit",
        "mm_empty",
        "ebp_available",
        "ebx_available",
        "debug",
        "hardcoded_tables",
        "small",
        "lto",
        "pic",
    ]
}

/// Literal substitutions for `$var` / `$(func ...)` values in the fixed
/// `#define` block.
pub fn builtin_substitutions() -> FxHashMap<&'static str, &'static str> {
    let mut subs = FxHashMap::default();
    subs.insert("$(c_escape $FFMPEG_CONFIGURATION)", "");
    subs.insert("$(c_escape $LIBAV_CONFIGURATION)", "");
    subs.insert("$(c_escape $license)", "lgpl");
    subs.insert("$(eval c_escape $datadir)", ".");
    subs.insert("$(c_escape ${cc_ident:-Unknown compiler})", "msvc");
    subs.insert("$_restrict", "__restrict");
    subs.insert("$restrict_keyword", "__restrict");
    subs.insert("${extern_prefix}", "");
    subs.insert("$build_suffix", "");
    subs.insert("$SLIBSUF", "");
    subs.insert("$sws_max_filter_size", "256");
    subs
}

/// Per-symbol forced replacements for the C header. These values must be
/// computed by target-environment preprocessor conditionals rather than
/// baked in at generation time.
pub fn replace_values(store: &OptionStore, desc: &Descriptor) -> Result<FxHashMap<String, String>> {
    let mut repl = FxHashMap::default();
    let mut set = |name: &str, value: &str| {
        repl.insert(name.to_string(), value.to_string());
    };
    set(
        "CC_IDENT",
        "#if defined(__INTEL_COMPILER)\n#   define CC_IDENT \"icl\"\n#else\n#   define CC_IDENT \"msvc\"\n#endif",
    );
    set(
        "EXTERN_PREFIX",
        "#if defined(__x86_64) || defined(_M_X64)\n#   define EXTERN_PREFIX \"\"\n#else\n#   define EXTERN_PREFIX \"_\"\n#endif",
    );
    set(
        "EXTERN_ASM",
        "#if defined(__x86_64) || defined(_M_X64)\n#   define EXTERN_ASM\n#else\n#   define EXTERN_ASM _\n#endif",
    );
    set(
        "SLIBSUF",
        "#if defined(_USRDLL) || defined(_WINDLL)\n#   define SLIBSUF \".dll\"\n#else\n#   define SLIBSUF \".lib\"\n#endif",
    );
    set(
        "ARCH_X86_32",
        "#if defined(__x86_64) || defined(_M_X64)\n#   define ARCH_X86_32 0\n#else\n#   define ARCH_X86_32 1\n#endif",
    );
    set(
        "ARCH_X86_64",
        "#if defined(__x86_64) || defined(_M_X64)\n#   define ARCH_X86_64 1\n#else\n#   define ARCH_X86_64 0\n#endif",
    );
    set(
        "CONFIG_SHARED",
        "#if defined(_USRDLL) || defined(_WINDLL)\n#   define CONFIG_SHARED 1\n#else\n#   define CONFIG_SHARED 0\n#endif",
    );
    set(
        "CONFIG_STATIC",
        "#if defined(_USRDLL) || defined(_WINDLL)\n#   define CONFIG_STATIC 0\n#else\n#   define CONFIG_STATIC 1\n#endif",
    );
    set(
        "HAVE_ALIGNED_STACK",
        "#if defined(__x86_64) || defined(_M_X64)\n#   define HAVE_ALIGNED_STACK 1\n#else\n#   define HAVE_ALIGNED_STACK 0\n#endif",
    );
    set(
        "HAVE_FAST_64BIT",
        "#if defined(__x86_64) || defined(_M_X64)\n#   define HAVE_FAST_64BIT 1\n#else\n#   define HAVE_FAST_64BIT 0\n#endif",
    );
    set(
        "HAVE_INLINE_ASM",
        "#if defined(__INTEL_COMPILER)\n#   define HAVE_INLINE_ASM 1\n#else\n#   define HAVE_INLINE_ASM 0\n#endif",
    );
    set(
        "HAVE_MM_EMPTY",
        "#if defined(__INTEL_COMPILER) || ARCH_X86_32\n#   define HAVE_MM_EMPTY 1\n#else\n#   define HAVE_MM_EMPTY 0\n#endif",
    );
    set(
        "HAVE_STRUCT_POLLFD",
        "#if !defined(_WIN32_WINNT) || _WIN32_WINNT >= 0x0600\n#   define HAVE_STRUCT_POLLFD 1\n#else\n#   define HAVE_STRUCT_POLLFD 0\n#endif",
    );
    set(
        "CONFIG_D3D11VA",
        "#ifdef _WIN32\n#include <sdkddkver.h>\n#endif\n#if defined(NTDDI_WIN8)\n#   define CONFIG_D3D11VA 1\n#else\n#   define CONFIG_D3D11VA 0\n#endif",
    );
    set(
        "HAVE_EBP_AVAILABLE",
        "#if HAVE_INLINE_ASM && !defined(_DEBUG)\n#   define HAVE_EBP_AVAILABLE 1\n#else\n#   define HAVE_EBP_AVAILABLE 0\n#endif",
    );
    set(
        "HAVE_EBX_AVAILABLE",
        "#if HAVE_INLINE_ASM && !defined(_DEBUG)\n#   define HAVE_EBX_AVAILABLE 1\n#else\n#   define HAVE_EBX_AVAILABLE 0\n#endif",
    );

    // Every x86 inline-asm extension resolves at compile time from the
    // architecture and inline-asm availability.
    if let Some(exts) = desc.try_config_list("ARCH_EXT_LIST_X86")? {
        for ext in exts {
            let name = format!("HAVE_{}_INLINE", ext.to_uppercase());
            let value = format!("#define {} ARCH_X86 && HAVE_INLINE_ASM", name);
            repl.insert(name, value);
        }
    }

    // Enabled options whose hard requirements are themselves replaced
    // symbols must stay conditional on those symbols.
    let mut derived = Vec::new();
    for option in store.exported() {
        let tag = option.tag();
        if option.state != OptionState::Enabled || repl.contains_key(&tag) {
            continue;
        }
        let mut guards = Vec::new();
        for kind in [RelationKind::Requires, RelationKind::Select] {
            let Some(members) = desc.try_config_list(&kind.list_name(&option.name))? else {
                continue;
            };
            for member in members {
                let (name, negated) = match member.strip_prefix('!') {
                    Some(rest) => (rest, true),
                    None => (member.as_str(), false),
                };
                let Some(index) = store.get(name) else { continue };
                let member_tag = store.option(index).tag();
                if repl.contains_key(&member_tag) && !guards.contains(&(member_tag.clone(), negated))
                {
                    guards.push((member_tag, negated));
                }
            }
        }
        if !guards.is_empty() {
            let expr = guards
                .into_iter()
                .map(|(tag, negated)| if negated { format!("!{}", tag) } else { tag })
                .collect::<Vec<_>>()
                .join(" && ");
            derived.push((tag.clone(), format!("#define {} {}", tag, expr)));
        }
    }
    repl.extend(derived);
    Ok(repl)
}

/// Forced replacements for the assembler twin of the header. The nasm and
/// yasm dialects spell the bitness probe differently.
pub fn asm_replace_values(use_nasm: bool) -> FxHashMap<String, String> {
    let mut repl = FxHashMap::default();
    let mut set = |name: &str, value: &str| {
        repl.insert(name.to_string(), value.to_string());
    };
    if use_nasm {
        set(
            "ARCH_X86_32",
            "%if __BITS__ = 64\n%define ARCH_X86_32 0\n%elif __BITS__ = 32\n%define ARCH_X86_32 1\n%define PREFIX\n%endif",
        );
        set(
            "ARCH_X86_64",
            "%if __BITS__ = 64\n%define ARCH_X86_64 1\n%elif __BITS__ = 32\n%define ARCH_X86_64 0\n%endif",
        );
        set(
            "HAVE_ALIGNED_STACK",
            "%if __BITS__ = 64\n%define HAVE_ALIGNED_STACK 1\n%elif __BITS__ = 32\n%define HAVE_ALIGNED_STACK 0\n%endif",
        );
        set(
            "HAVE_FAST_64BIT",
            "%if __BITS__ = 64\n%define HAVE_FAST_64BIT 1\n%elif __BITS__ = 32\n%define HAVE_FAST_64BIT 0\n%endif",
        );
    } else {
        set(
            "ARCH_X86_32",
            "%ifidn __OUTPUT_FORMAT__,x64\n%define ARCH_X86_32 0\n%elifidn __OUTPUT_FORMAT__,win64\n%define ARCH_X86_32 0\n%elifidn __OUTPUT_FORMAT__,win32\n%define ARCH_X86_32 1\n%define PREFIX\n%endif",
        );
        set(
            "ARCH_X86_64",
            "%ifidn __OUTPUT_FORMAT__,x64\n%define ARCH_X86_64 1\n%elifidn __OUTPUT_FORMAT__,win64\n%define ARCH_X86_64 1\n%elifidn __OUTPUT_FORMAT__,win32\n%define ARCH_X86_64 0\n%endif",
        );
        set(
            "HAVE_ALIGNED_STACK",
            "%ifidn __OUTPUT_FORMAT__,x64\n%define HAVE_ALIGNED_STACK 1\n%elifidn __OUTPUT_FORMAT__,win64\n%define HAVE_ALIGNED_STACK 1\n%elifidn __OUTPUT_FORMAT__,win32\n%define HAVE_ALIGNED_STACK 0\n%endif",
        );
        set(
            "HAVE_FAST_64BIT",
            "%ifidn __OUTPUT_FORMAT__,x64\n%define HAVE_FAST_64BIT 1\n%elifidn __OUTPUT_FORMAT__,win64\n%define HAVE_FAST_64BIT 1\n%elifidn __OUTPUT_FORMAT__,win32\n%define HAVE_FAST_64BIT 0\n%endif",
        );
    }
    repl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_additional_dependencies_track_store() {
        let mut store = OptionStore::new();
        store.push("libx264", "CONFIG_", OptionState::Enabled);
        store.push("cuvid", "CONFIG_", OptionState::Disabled);
        let deps = additional_dependencies(&store);
        assert_eq!(deps.get("x264_csp_bgr"), Some(&true));
        assert_eq!(deps.get("CUVIDH264PICPARAMS"), Some(&false));
        assert_eq!(deps.get("atomics_native"), Some(&true));
    }

    #[test]
    fn sdl_pair_fast_toggles_without_recursion() {
        let mut store = OptionStore::new();
        store.push("sdl", "CONFIG_", OptionState::Unset);
        store.push("sdl2", "CONFIG_", OptionState::Unset);
        let forced = forced_enables(&mut store, "sdl");
        assert!(forced.is_empty());
        assert!(store.is_enabled("sdl2"));
    }

    #[test]
    fn forced_pairs_skip_unknown_targets() {
        let mut store = OptionStore::new();
        store.push("cuda", "CONFIG_", OptionState::Unset);
        assert!(forced_enables(&mut store, "cuda").is_empty());
        store.push("ffnvcodec", "CONFIG_", OptionState::Unset);
        assert_eq!(forced_enables(&mut store, "cuda"), vec!["ffnvcodec"]);
    }
}

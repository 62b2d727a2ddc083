//! Baseline option values applied before user directives.
//!
//! The descriptor declares options but not their values for this target;
//! the platform baseline, assembler choice, and library auto-detection
//! probes are applied here.

use confgen_common::Reporter;

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::loader::FileLoader;
use crate::options::{OptionState, OptionStore};
use crate::resolver::toggle;

/// Capability probes and always-present features on the msvc target.
const PLATFORM_BASELINE: &[&str] = &[
    "access",
    "aligned_malloc",
    "closesocket",
    "CommandLineToArgvW",
    "CoTaskMemFree",
    "CryptGenRandom",
    "direct_h",
    "d3d11_h",
    "dxgidebug_h",
    "dxva_h",
    "ebp_available",
    "ebx_available",
    "fast_clz",
    "flt_lim",
    "getaddrinfo",
    "GetProcessAffinityMask",
    "GetProcessMemoryInfo",
    "GetProcessTimes",
    "GetSystemTimeAsFileTime",
    "io_h",
    "inline_asm_labels",
    "isatty",
    "kbhit",
    "LoadLibrary",
    "libc_msvcrt",
    "local_aligned_32",
    "local_aligned_16",
    "local_aligned_8",
    "local_aligned",
    "malloc_h",
    "MapViewOfFile",
    "MemoryBarrier",
    "mm_empty",
    "PeekNamedPipe",
    "rdtsc",
    "rsync_contimeout",
    "SetConsoleTextAttribute",
    "SetConsoleCtrlHandler",
    "setmode",
    "Sleep",
    "CONDITION_VARIABLE_Ptr",
    "socklen_t",
    "struct_addrinfo",
    "struct_group_source_req",
    "struct_ip_mreq_source",
    "struct_ipv6_mreq",
    "struct_pollfd",
    "struct_sockaddr_in6",
    "struct_sockaddr_storage",
    "unistd_h",
    "VirtualAlloc",
    "Audioclient_h",
    "windows_h",
    "winsock2_h",
    "wglgetprocaddress",
    "dos_paths",
    "dxva2api_cobj",
    "dxva2_lib",
    "aligned_stack",
    "pragma_deprecated",
    "inline_asm",
    "frame_thread_encoder",
    "xmm_clobbers",
    // Features that must be explicitly disabled to drop.
    "dct",
    "dwt",
    "error_resilience",
    "faan",
    "faandct",
    "faanidct",
    "fast_unaligned",
    "lsp",
    "lzo",
    "mdct",
    "network",
    "rdft",
    "fft",
    "pixelutils",
];

/// Knobs that affect the default pass.
#[derive(Debug, Clone)]
pub struct DefaultSettings {
    /// nasm (default) or yasm; they support different instruction sets.
    pub use_nasm: bool,
    /// Directory probed for auto-detected library headers.
    pub out_dir: String,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            use_nasm: true,
            out_dir: "../../../msvc/".to_string(),
        }
    }
}

/// Enable the configurable surface and the platform baseline.
pub fn apply_defaults(
    store: &mut OptionStore,
    desc: &Descriptor,
    loader: &dyn FileLoader,
    settings: &DefaultSettings,
    reporter: &Reporter,
) -> Result<()> {
    // All programs are built by default.
    for program in desc.config_list("PROGRAM_LIST")? {
        toggle(store, desc, &program, true, reporter)?;
    }
    // All libraries, except the compatibility resampler outside libav.
    for library in desc.config_list("LIBRARY_LIST")? {
        if desc.project() == "LIBAV" || library != "avresample" {
            toggle(store, desc, &library, true, reporter)?;
        }
    }
    // All component classes, and every member of each class list.
    for component in desc.config_list("COMPONENT_LIST")? {
        toggle(store, desc, &component, true, reporter)?;
        let class = component[..component.len() - 1].to_uppercase();
        if let Some(members) = desc.try_config_list(&format!("{}_LIST", class))? {
            for member in members {
                toggle(store, desc, &member, true, reporter)?;
            }
        } else {
            reporter.warning(format!("Failed finding config list ({}_LIST)", class));
        }
    }

    for option in ["runtime_cpudetect", "safe_bitstream_reader", "static", "shared", "swscale_alpha"] {
        store.fast_toggle(option, true);
    }

    // x86 baseline and instruction-set extensions.
    for option in ["x86", "i686", "fast_cmov", "x86_32", "x86_64"] {
        store.fast_toggle(option, true);
    }
    for ext in desc.config_list("ARCH_EXT_LIST_X86")? {
        store.fast_toggle(&ext, true);
        store.fast_toggle(&format!("{}_EXTERNAL", ext), true);
        store.fast_toggle(&format!("{}_INLINE", ext), true);
    }

    store.fast_toggle("yasm", true);
    store.fast_toggle("x86asm", true);
    if settings.use_nasm {
        // nasm has no cpunop support.
        store.fast_toggle("cpunop", false);
        store.fast_toggle("cpunop_external", false);
    } else {
        // yasm has no avx512 support.
        store.fast_toggle("avx512", false);
        store.fast_toggle("avx512_external", false);
        store.fast_toggle("cpunop", true);
    }

    store.fast_toggle("w32threads", true);
    store.fast_toggle("atomics_win32", true);

    for func in desc.config_list("MATH_FUNCS")? {
        store.fast_toggle(&func, true);
    }

    for option in PLATFORM_BASELINE {
        store.fast_toggle(option, true);
    }
    store.fast_toggle("clock_gettime", false);
    store.fast_toggle("getopt", false);

    // External libraries and hardware accelerators stay off until
    // explicitly enabled.
    for list in ["EXTERNAL_LIBRARY_LIST", "HWACCEL_LIBRARY_LIST"] {
        if let Some(members) = desc.try_config_list(list)? {
            for member in members {
                toggle(store, desc, &member, false, reporter)?;
            }
        }
    }

    // Auto-detect available libraries unless the user disabled detection.
    let autodetect_off = store
        .get("autodetect")
        .map(|i| store.state(i) == OptionState::Disabled)
        .unwrap_or(false);
    if !autodetect_off {
        if let Some(libs) = desc.try_config_list("AUTODETECT_LIBS")? {
            for lib in libs {
                let enable = probe_library(&lib, desc, loader, settings, reporter);
                toggle(store, desc, &lib, enable, reporter)?;
            }
            store.fast_toggle("autodetect", true);
        } else {
            // No detection list in this descriptor; fall back to the fixed
            // set known to be present on the target.
            for option in ["bzlib", "iconv", "lzma", "schannel", "sdl", "sdl2", "zlib", "d3d11va", "dxva2"] {
                store.fast_toggle(option, true);
            }
            if loader
                .find_file(&format!("{}compat/cuda/dynlink_cuda.h", desc.root()))
                .is_some()
            {
                store.fast_toggle("cuda", true);
                store.fast_toggle("cuvid", true);
            }
            if loader
                .find_file(&format!("{}compat/nvenc/nvEncodeAPI.h", desc.root()))
                .is_some()
            {
                store.fast_toggle("nvenc", true);
            }
        }
    }

    apply_forced_values(store);
    Ok(())
}

/// Values forced after every default or directive pass: options the
/// descriptor enables but the target cannot provide.
pub fn apply_forced_values(store: &mut OptionStore) {
    store.fast_toggle("inline_asm_nonlocal_labels", false);
    store.fast_toggle("inline_asm_direct_symbol_refs", false);
    store.fast_toggle("inline_asm_non_intel_mnemonic", false);

    store.fast_toggle("xlib", false);
    store.fast_toggle("qtkit", false);
    store.fast_toggle("avfoundation", false);
    store.fast_toggle("mmal", false);
    store.fast_toggle("libdrm", false);
    store.fast_toggle("libv4l2", false);

    store.fast_toggle("coreimage_filter", false);
    store.fast_toggle("coreimagesrc_filter", false);
}

/// Whether a library from AUTODETECT_LIBS is usable on the target. Header
/// probes run through the file finder; libraries tied to other platforms
/// are rejected outright.
fn probe_library(
    lib: &str,
    desc: &Descriptor,
    loader: &dyn FileLoader,
    settings: &DefaultSettings,
    reporter: &Reporter,
) -> bool {
    let include = |path: &str| -> bool {
        loader
            .find_file(&format!("{}include/{}", settings.out_dir, path))
            .is_some()
    };
    let compat = |path: &str| -> bool {
        loader
            .find_file(&format!("{}{}", desc.root(), path))
            .is_some()
    };
    match lib {
        "amf" => include("AMF/core/Factory.h"),
        "bzlib" => include("bzlib.h"),
        "iconv" => include("iconv.h"),
        "lzma" => include("lzma.h"),
        "sdl2" => include("SDL/SDL.h"),
        "zlib" => include("zlib.h"),
        "opencl" => include("cl/cl.h"),
        "ffnvcodec" => include("ffnvcodec/dynlink_cuda.h"),
        "cuda" | "cuvid" => {
            compat("compat/cuda/dynlink_cuda.h") || include("ffnvcodec/dynlink_cuda.h")
        }
        "nvdec" => {
            (compat("compat/cuda/dynlink_loader.h") && compat("compat/cuda/dynlink_cuda.h"))
                || include("ffnvcodec/dynlink_loader.h")
        }
        "nvenc" => compat("compat/nvenc/nvEncodeAPI.h") || include("ffnvcodec/nvEncodeAPI.h"),
        // Always available on the target.
        "schannel" | "d3d11va" | "dxva2" | "w32threads" => true,
        // Other-platform libraries.
        "alsa" | "appkit" | "jack" | "libxcb" | "libxcb_shm" | "libxcb_shape"
        | "libxcb_xfixes" | "securetransport" | "sndio" | "xlib" | "audiotoolbox"
        | "crystalhd" | "vaapi" | "vda" | "vdpau" | "videotoolbox_hwaccel" | "v4l2_m2m"
        | "xvmc" | "pthreads" | "os2threads" | "avfoundation" | "coreimage"
        | "videotoolbox" => false,
        other => {
            reporter.info(format!("Found unknown auto detected option {}", other));
            false
        }
    }
}

//! Rendering of the resolved configuration as preprocessor-compatible text.
//!
//! Renderers are pure; persistence goes through the file collaborator in
//! the caller.

use rustc_hash::FxHashMap;

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::options::{OptionState, OptionStore};

/// Banner placed at the top of every generated file.
pub fn render_header_comment(description: &str) -> String {
    format!(
        "/** {}\n *\n * This file is automatically generated; edits will be lost on the next\n * generation run.\n */\n",
        description
    )
}

fn render_asm_header_comment(description: &str) -> String {
    render_header_comment(description)
        .lines()
        .map(|line| {
            let line = line
                .trim_start_matches("/**")
                .trim_start_matches(" */")
                .trim_start_matches(" *");
            format!(";*{}\n", line)
        })
        .collect()
}

/// Resolve the license fixed value from the current license option states.
pub fn update_license(store: &mut OptionStore, project: &str) {
    let license = if store.is_enabled("nonfree") {
        "\"nonfree and unredistributable\""
    } else if store.is_enabled("gplv3") {
        "\"GPL version 3 or later\""
    } else if store.is_enabled("lgplv3") {
        "\"LGPL version 3 or later\""
    } else if store.is_enabled("gpl") {
        "\"GPL version 2 or later\""
    } else {
        "\"LGPL version 2.1 or later\""
    };
    store.set_fixed(&format!("{}_LICENSE", project), license);
}

/// The main configuration header: the fixed block followed by the derived
/// block. Non-disabled symbols with a forced replacement emit the
/// replacement text verbatim.
pub fn render_config_h(store: &OptionStore, replace: &FxHashMap<String, String>) -> String {
    let mut out = render_header_comment("Automatically generated configuration values");
    out.push('\n');
    out.push_str("#ifndef CONFGEN_CONFIG_H\n#define CONFGEN_CONFIG_H\n");

    for fixed in store.fixed_values() {
        match replace.get(&fixed.name) {
            Some(replacement) if fixed.value != "0" => {
                out.push_str(replacement);
                out.push('\n');
            }
            _ => {
                out.push_str(&format!("#define {} {}\n", fixed.name, fixed.value));
            }
        }
    }
    for option in store.exported() {
        let tag = option.tag();
        match replace.get(&tag) {
            Some(replacement) if option.state != OptionState::Disabled => {
                out.push_str(replacement);
                out.push('\n');
            }
            _ => {
                out.push_str(&format!("#define {} {}\n", tag, option.state.as_define()));
            }
        }
    }
    out.push_str("#endif /* CONFGEN_CONFIG_H */\n");
    out
}

/// The assembler twin of the configuration header.
pub fn render_config_asm(store: &OptionStore, asm_replace: &FxHashMap<String, String>) -> String {
    let mut out = render_asm_header_comment("Automatically generated configuration values");
    out.push('\n');
    for option in store.exported() {
        let tag = option.tag();
        match asm_replace.get(&tag) {
            Some(replacement) if option.state != OptionState::Disabled => {
                out.push_str(replacement);
                out.push('\n');
            }
            _ => {
                out.push_str(&format!("%define {} {}\n", tag, option.state.as_define()));
            }
        }
    }
    out
}

/// The public/installed-headers subset, driven by `HAVE_LIST_PUB`.
pub fn render_public_header(store: &OptionStore, desc: &Descriptor) -> Result<String> {
    let mut out = render_header_comment("Automatically generated public configuration values");
    out.push('\n');
    out.push_str("#ifndef CONFGEN_AVCONFIG_H\n#define CONFGEN_AVCONFIG_H\n");
    for member in desc.config_list("HAVE_LIST_PUB")? {
        if let Some(index) = store.get(&member) {
            let option = store.option(index);
            out.push_str(&format!(
                "#define AV_HAVE_{} {}\n",
                option.name,
                option.state.as_define()
            ));
        }
    }
    out.push_str("#endif /* CONFGEN_AVCONFIG_H */\n");
    Ok(out)
}

/// Version constant header, from the first line of the release file.
pub fn render_version_header(project: &str, version: &str) -> String {
    let mut out = render_header_comment("Automatically generated version values");
    out.push('\n');
    out.push_str("#ifndef CONFGEN_VERSION_H\n#define CONFGEN_VERSION_H\n");
    out.push_str(&format!("#define {}_VERSION \"{}\"\n", project, version));
    out.push_str("#endif /* CONFGEN_VERSION_H */\n");
    out
}

/// One `print_enabled_components` request found in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDirective {
    pub file: String,
    pub struct_name: String,
    pub array_name: String,
    pub list: String,
}

/// All enabled-component array requests in the descriptor.
pub fn component_directives(desc: &Descriptor) -> Vec<ComponentDirective> {
    let text = desc.text();
    let mut out = Vec::new();
    let mut search = text.find("print_enabled_components ");
    while let Some(at) = search {
        let mut fields = Vec::new();
        let mut cursor = at + "print_enabled_components ".len();
        for _ in 0..4 {
            let Some(start) = confgen_common::find_first_not_of(text, cursor, confgen_common::WHITESPACE)
            else {
                break;
            };
            let end = confgen_common::find_first_of(text, start + 1, confgen_common::WHITESPACE)
                .unwrap_or(text.len());
            fields.push(text[start..end].trim_start_matches('$').to_string());
            cursor = end;
        }
        if fields.len() == 4 {
            out.push(ComponentDirective {
                file: fields[0].clone(),
                struct_name: fields[1].clone(),
                array_name: fields[2].clone(),
                list: fields[3].clone(),
            });
        }
        search = text[cursor..]
            .find("print_enabled_components ")
            .map(|p| p + cursor);
    }
    out
}

/// Static pointer array of enabled list members, lower-cased and
/// `ff_`-prefixed. Replaced symbols are wrapped in their own guard so the
/// target preprocessor decides their presence.
pub fn render_components(
    store: &OptionStore,
    desc: &Descriptor,
    directive: &ComponentDirective,
    replace: &FxHashMap<String, String>,
) -> Result<String> {
    let nice = directive.array_name.replace('_', " ");
    let mut out = render_header_comment(&format!("Available items from {}", nice));
    out.push('\n');
    out.push_str(&format!(
        "static const {} *{}[] = {{\n",
        directive.struct_name, directive.array_name
    ));

    // Newer descriptors register filters under their full kind-prefixed
    // symbol names.
    let static_filter_list = directive.array_name == "filter_list"
        && (desc.text().contains("full_filter_name()")
            || desc.text().contains("$full_filter_name_$"));

    for member in desc.config_list(&directive.list)? {
        let Some(index) = store.get(&member) else {
            continue;
        };
        let option = store.option(index);
        if option.state != OptionState::Enabled {
            continue;
        }
        let mut symbol = option.name.to_lowercase();
        if directive.array_name == "indev_list" {
            // Input devices are registered through their demuxer symbol.
            if let Some(at) = symbol.find("_indev") {
                symbol.truncate(at);
                symbol.push_str("_demuxer");
            }
        } else if directive.array_name == "outdev_list" {
            if let Some(at) = symbol.find("_outdev") {
                symbol.truncate(at);
                symbol.push_str("_muxer");
            }
        } else if static_filter_list {
            if let Some(at) = symbol.find("_filter") {
                symbol.truncate(at);
            }
            match desc.full_filter_name(&symbol)? {
                Some(full) => symbol = full,
                None => continue,
            }
        }
        if replace.contains_key(&option.tag()) {
            out.push_str(&format!(
                "#if {}\n    &ff_{},\n#endif\n",
                option.tag(),
                symbol
            ));
        } else {
            out.push_str(&format!("    &ff_{},\n", symbol));
        }
    }
    if static_filter_list {
        out.push_str("    &ff_asrc_abuffer,\n");
        out.push_str("    &ff_vsrc_buffer,\n");
        out.push_str("    &ff_asink_abuffer,\n");
        out.push_str("    &ff_vsink_buffer,\n");
    }
    out.push_str("    NULL };");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use confgen_common::Reporter;

    #[test]
    fn config_h_partitions_fixed_and_derived() {
        let mut store = OptionStore::new();
        store.push_fixed("FFMPEG_LICENSE", "\"lgpl\"");
        store.push("aac_decoder", "CONFIG_", OptionState::Enabled);
        store.push("h264_decoder", "CONFIG_", OptionState::Disabled);
        store.mark_config_end();
        let out = render_config_h(&store, &FxHashMap::default());
        assert!(out.contains("#define FFMPEG_LICENSE \"lgpl\""));
        assert!(out.contains("#define CONFIG_AAC_DECODER 1"));
        assert!(out.contains("#define CONFIG_H264_DECODER 0"));
        let fixed_at = out.find("FFMPEG_LICENSE").unwrap();
        assert!(fixed_at < out.find("CONFIG_AAC_DECODER").unwrap());
    }

    #[test]
    fn replaced_symbols_emit_replacement_unless_disabled() {
        let mut store = OptionStore::new();
        store.push("aligned_stack", "HAVE_", OptionState::Enabled);
        store.push("shared", "CONFIG_", OptionState::Disabled);
        store.mark_config_end();
        let mut replace = FxHashMap::default();
        replace.insert("HAVE_ALIGNED_STACK".to_string(), "#define HAVE_ALIGNED_STACK X".to_string());
        replace.insert("CONFIG_SHARED".to_string(), "#define CONFIG_SHARED Y".to_string());
        let out = render_config_h(&store, &replace);
        assert!(out.contains("#define HAVE_ALIGNED_STACK X"));
        // Disabled symbols keep their literal zero.
        assert!(out.contains("#define CONFIG_SHARED 0"));
        let asm = render_config_asm(&store, &FxHashMap::default());
        assert!(asm.contains("%define HAVE_ALIGNED_STACK 1"));
    }

    #[test]
    fn component_array_lists_enabled_members() {
        let loader = MemoryLoader::new();
        let text = "#define FFMPEG_CONFIG_H\nMUXER_LIST=\"mp4_muxer mov_muxer\"\n\
                    print_enabled_components muxer_list.c AVOutputFormat muxer_list $MUXER_LIST\n";
        let desc =
            Descriptor::from_text(&loader, Reporter::default(), "", text.to_string()).unwrap();
        let mut store = OptionStore::new();
        store.push("mp4_muxer", "CONFIG_", OptionState::Enabled);
        store.push("mov_muxer", "CONFIG_", OptionState::Disabled);

        let directives = component_directives(&desc);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].file, "muxer_list.c");
        let out =
            render_components(&store, &desc, &directives[0], &FxHashMap::default()).unwrap();
        assert!(out.contains("    &ff_mp4_muxer,\n"));
        assert!(!out.contains("ff_mov_muxer"));
        assert!(out.ends_with("    NULL };"));
    }

    #[test]
    fn indev_members_map_to_demuxer_symbols() {
        let loader = MemoryLoader::new();
        let text = "#define FFMPEG_CONFIG_H\nINDEV_LIST=\"alsa_indev\"\n\
                    print_enabled_components indev_list.c AVInputFormat indev_list $INDEV_LIST\n";
        let desc =
            Descriptor::from_text(&loader, Reporter::default(), "", text.to_string()).unwrap();
        let mut store = OptionStore::new();
        store.push("alsa_indev", "CONFIG_", OptionState::Enabled);
        let directive = &component_directives(&desc)[0];
        let out = render_components(&store, &desc, directive, &FxHashMap::default()).unwrap();
        assert!(out.contains("&ff_alsa_demuxer,"));
    }

    #[test]
    fn license_resolution_order() {
        let mut store = OptionStore::new();
        store.push_fixed("FFMPEG_LICENSE", "\"\"");
        store.push("nonfree", "CONFIG_", OptionState::Disabled);
        store.push("gplv3", "CONFIG_", OptionState::Disabled);
        store.push("lgplv3", "CONFIG_", OptionState::Disabled);
        store.push("gpl", "CONFIG_", OptionState::Enabled);
        update_license(&mut store, "FFMPEG");
        assert_eq!(
            store.fixed("FFMPEG_LICENSE").unwrap().value,
            "\"GPL version 2 or later\""
        );
    }
}

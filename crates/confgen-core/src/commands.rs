//! Command directive processing.
//!
//! Applies `--enable-*` / `--disable-*` directives against the store via
//! the resolver, expanding group and component-class directives, and
//! records every accepted directive in the provenance string.

use confgen_common::Reporter;

use crate::descriptor::Descriptor;
use crate::error::{ConfigError, Result};
use crate::options::OptionStore;
use crate::resolver::toggle;
use crate::tables::reserved_options;

/// Apply one enable/disable directive. Unknown options named directly by
/// the user are fatal; reserved options warn and are ignored.
pub fn apply_directive(
    store: &mut OptionStore,
    desc: &Descriptor,
    directive: &str,
    reporter: &Reporter,
) -> Result<()> {
    let (enable, rest) = if let Some(rest) = directive.strip_prefix("--enable-") {
        (true, rest)
    } else if let Some(rest) = directive.strip_prefix("--disable-") {
        (false, rest)
    } else {
        return Err(ConfigError::UnknownDirective(directive.to_string()));
    };
    let option = rest.replace('-', "_");

    if reserved_options().contains(&option.as_str()) {
        reporter.warning(format!(
            "Reserved option ({}) was passed in command line option ({})",
            option, directive
        ));
        reporter.note("This option is reserved and will be ignored");
        return Ok(());
    }

    if let Some((list, value)) = option.split_once('=') {
        // Choice-group selection: the element is named value_list.
        let member = format!("{}_{}", value, list);
        if !store.is_valid(&member) {
            return Err(ConfigError::UnknownOption(member));
        }
        toggle(store, desc, &member, enable, reporter)?;
    } else {
        match option.as_str() {
            "devices" => {
                for list in ["INDEV_LIST", "OUTDEV_LIST"] {
                    toggle_list(store, desc, list, enable, reporter)?;
                }
            }
            "programs" => toggle_list(store, desc, "PROGRAM_LIST", enable, reporter)?,
            "everything" => toggle_list(store, desc, "ALL_COMPONENTS", enable, reporter)?,
            "all" => {
                for list in ["ALL_COMPONENTS", "LIBRARY_LIST", "PROGRAM_LIST"] {
                    toggle_list(store, desc, list, enable, reporter)?;
                }
            }
            "autodetect" => toggle_list(store, desc, "AUTODETECT_LIBS", enable, reporter)?,
            _ => {
                let components = desc.try_config_list("COMPONENT_LIST")?.unwrap_or_default();
                if components.iter().any(|c| c == &option) {
                    // A component class toggles every member of its list.
                    let class = option[..option.len() - 1].to_uppercase();
                    if let Some(members) = desc.try_config_list(&format!("{}_LIST", class))? {
                        for member in members {
                            toggle(store, desc, &member, enable, reporter)?;
                        }
                    }
                } else {
                    if !store.is_valid(&option) {
                        return Err(ConfigError::UnknownOption(option));
                    }
                    // A standalone option may carry its own component
                    // classes (e.g. a library bringing decoders along).
                    let own = format!("{}_COMPONENTS", option.to_uppercase());
                    if let Some(classes) = desc.try_config_list(&own)? {
                        for class in classes {
                            let singular = class[..class.len() - 1].to_uppercase();
                            if let Some(members) =
                                desc.try_config_list(&format!("{}_LIST", singular))?
                            {
                                for member in members {
                                    toggle(store, desc, &member, enable, reporter)?;
                                }
                            }
                        }
                    }
                }
                toggle(store, desc, &option, enable, reporter)?;
            }
        }
    }

    store.append_configuration(desc.project(), directive);
    Ok(())
}

fn toggle_list(
    store: &mut OptionStore,
    desc: &Descriptor,
    list: &str,
    enable: bool,
    reporter: &Reporter,
) -> Result<()> {
    for member in desc.config_list(list)? {
        toggle(store, desc, &member, enable, reporter)?;
    }
    Ok(())
}

//! Enable/disable propagation and the per-option consistency pass.

use confgen_common::Reporter;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::descriptor::Descriptor;
use crate::error::{ConfigError, Result};
use crate::options::{OptionState, OptionStore};
use crate::relations::RelationKind;
use crate::tables;

/// Toggle an option, propagating `select`/`suggest` lists and the forced
/// cross-option pairs. A directly requested unknown option is fatal.
pub fn toggle(
    store: &mut OptionStore,
    desc: &Descriptor,
    name: &str,
    enable: bool,
    reporter: &Reporter,
) -> Result<()> {
    let mut visiting = FxHashSet::default();
    toggle_inner(store, desc, name, enable, false, &mut visiting, reporter)
}

/// The visiting set holds the indices whose side effects are currently
/// being computed; re-entering one of them is a dependency cycle and the
/// entry is skipped for the remainder of this call stack.
fn toggle_inner(
    store: &mut OptionStore,
    desc: &Descriptor,
    name: &str,
    enable: bool,
    recursive: bool,
    visiting: &mut FxHashSet<usize>,
    reporter: &Reporter,
) -> Result<()> {
    let indices = store.indices_of(name);
    if indices.is_empty() {
        let additional = tables::additional_dependencies(store);
        if additional.contains_key(name) {
            return Ok(());
        }
        if recursive {
            // Cross-referenced names may legitimately not be pre-declared.
            store.push(name, "", OptionState::Unset);
            reporter.info(format!("Unlisted config dependency found ({})", name));
            return Ok(());
        }
        return Err(ConfigError::UnknownOption(name.to_string()));
    }

    for index in indices {
        if !visiting.insert(index) {
            continue;
        }
        let state = store.state(index);
        if enable && state != OptionState::Enabled {
            for kind in [RelationKind::Select, RelationKind::Suggest] {
                if let Some(members) = desc.try_config_list(&kind.list_name(name))? {
                    for member in members {
                        toggle_inner(store, desc, &member, true, true, visiting, reporter)?;
                    }
                }
            }
            for forced in tables::forced_enables(store, name) {
                toggle_inner(store, desc, &forced, true, true, visiting, reporter)?;
            }
        } else if !enable && state != OptionState::Disabled {
            for forced in tables::forced_disables(store, name) {
                toggle_inner(store, desc, &forced, false, true, visiting, reporter)?;
            }
        }
        store.set_state(index, OptionState::from_enable(enable));
        visiting.remove(&index);
    }
    Ok(())
}

/// Run the consistency pass over every option in strict declaration order.
/// Options appended during the pass (unlisted cross references) are
/// validated as they appear.
pub fn validate_all(store: &mut OptionStore, desc: &Descriptor, reporter: &Reporter) -> Result<()> {
    let mut validated = FxHashSet::default();
    let mut index = 0;
    while index < store.len() {
        validate(store, desc, index, &mut validated, reporter)?;
        index += 1;
    }
    Ok(())
}

/// The per-option pass. Dependencies declared later than `index` are
/// validated on demand, and only once per top-level pass; restricting
/// recursion to later entries breaks mutual-recursion loops.
fn validate(
    store: &mut OptionStore,
    desc: &Descriptor,
    index: usize,
    validated: &mut FxHashSet<usize>,
    reporter: &Reporter,
) -> Result<()> {
    if !validated.insert(index) {
        return Ok(());
    }
    let additional = tables::additional_dependencies(store);
    let name = store.option(index).name.clone();

    // (a) Enable if any of `_if_any` holds.
    if store.state(index) != OptionState::Enabled {
        if let Some(members) = desc.try_config_list(&RelationKind::EnableIfAny.list_name(&name))? {
            for member in &members {
                if check_ref(store, desc, &additional, member, index, "ifa", &name, validated, reporter)? {
                    toggle(store, desc, &name, true, reporter)?;
                    break;
                }
            }
        }
    }

    // (b) Enable if all of `_if` hold.
    if store.state(index) != OptionState::Enabled {
        if let Some(members) = desc.try_config_list(&RelationKind::EnableIfAll.list_name(&name))? {
            let mut all_enabled = true;
            for member in &members {
                if !check_ref(store, desc, &additional, member, index, "if", &name, validated, reporter)? {
                    all_enabled = false;
                    break;
                }
            }
            if all_enabled {
                toggle(store, desc, &name, true, reporter)?;
            }
        }
    }

    // (c) Disable when any hard `_deps` requirement is unmet.
    if store.state(index) == OptionState::Enabled {
        if let Some(members) = desc.try_config_list(&RelationKind::Requires.list_name(&name))? {
            for member in &members {
                if !check_ref(store, desc, &additional, member, index, "deps", &name, validated, reporter)? {
                    toggle(store, desc, &name, false, reporter)?;
                    break;
                }
            }
        }
    }

    // (d) Disable unless at least one `_deps_any` member holds.
    if store.state(index) == OptionState::Enabled {
        if let Some(members) = desc.try_config_list(&RelationKind::RequiresAny.list_name(&name))? {
            let mut any_enabled = false;
            for member in &members {
                if check_ref(store, desc, &additional, member, index, "any", &name, validated, reporter)? {
                    any_enabled = true;
                    break;
                }
            }
            if !any_enabled {
                toggle(store, desc, &name, false, reporter)?;
            }
        }
    }

    // (e) Disable when any `_conflict` member is enabled.
    if store.state(index) == OptionState::Enabled {
        if let Some(members) = desc.try_config_list(&RelationKind::Conflict.list_name(&name))? {
            for member in &members {
                if check_ref(store, desc, &additional, member, index, "conflict", &name, validated, reporter)? {
                    toggle(store, desc, &name, false, reporter)?;
                    break;
                }
            }
        }
    }

    // (f) A disabled `_select` target disables this option too. Targets
    // validated on demand are first enabled when still untouched, since
    // enabling this option would have selected them.
    if store.state(index) == OptionState::Enabled {
        if let Some(members) = desc.try_config_list(&RelationKind::Select.list_name(&name))? {
            for member in &members {
                let Some(ref_index) = store.get(member) else {
                    match additional.get(member.as_str()).copied() {
                        Some(true) => {}
                        Some(false) => {
                            toggle(store, desc, &name, false, reporter)?;
                        }
                        None => {
                            reporter.info(format!(
                                "Unknown option in select dependency ({}) for option ({})",
                                member,
                                name.to_lowercase()
                            ));
                            toggle(store, desc, &name, false, reporter)?;
                        }
                    }
                    continue;
                };
                if ref_index > index && !validated.contains(&ref_index) {
                    if store.state(ref_index) == OptionState::Unset {
                        toggle(store, desc, member, true, reporter)?;
                    }
                    validate(store, desc, ref_index, validated, reporter)?;
                }
                if store.state(ref_index) == OptionState::Disabled {
                    toggle(store, desc, &name, false, reporter)?;
                    break;
                }
            }
        }
    }

    if store.state(index) == OptionState::Enabled {
        // (g) Force-enable the select list and soft-enable suggestions
        // that were not explicitly disabled.
        if let Some(members) = desc.try_config_list(&RelationKind::Select.list_name(&name))? {
            for member in members {
                toggle(store, desc, &member, true, reporter)?;
            }
        }
        if let Some(members) = desc.try_config_list(&RelationKind::Suggest.list_name(&name))? {
            for member in members {
                if let Some(ref_index) = store.get(&member) {
                    if store.state(ref_index) != OptionState::Disabled {
                        toggle(store, desc, &member, true, reporter)?;
                    }
                }
            }
        }
    } else {
        // (h) Nothing may leave the pass uninitialized.
        toggle(store, desc, &name, false, reporter)?;
    }
    Ok(())
}

/// Evaluate one relation member, honoring `!` negation and falling back to
/// the additional-dependency leaves. An unresolvable reference is logged
/// and treated as false.
#[allow(clippy::too_many_arguments)]
fn check_ref(
    store: &mut OptionStore,
    desc: &Descriptor,
    additional: &FxHashMap<String, bool>,
    member: &str,
    current: usize,
    kind: &str,
    owner: &str,
    validated: &mut FxHashSet<usize>,
    reporter: &Reporter,
) -> Result<bool> {
    let (name, negated) = match member.strip_prefix('!') {
        Some(rest) => (rest, true),
        None => (member, false),
    };
    let Some(ref_index) = store.get(name) else {
        return Ok(match additional.get(name) {
            Some(&value) => value ^ negated,
            None => {
                reporter.info(format!(
                    "Unknown option in {} dependency ({}) for option ({})",
                    kind,
                    name,
                    owner.to_lowercase()
                ));
                false
            }
        });
    };
    if ref_index > current && !validated.contains(&ref_index) {
        validate(store, desc, ref_index, validated, reporter)?;
    }
    Ok((store.state(ref_index) == OptionState::Enabled) ^ negated)
}

/// Pre-pass license coherence: `version3` widens `gpl`/`lgpl` to their
/// v3 variants.
pub fn apply_license_rules(store: &mut OptionStore) {
    if store.is_enabled("version3") {
        if store.is_enabled("gpl") {
            store.fast_toggle("gplv3", true);
        } else {
            store.fast_toggle("lgplv3", true);
        }
    }
}

/// Post-pass license enforcement: an enabled option from a library tier
/// the selected license does not permit is fatal.
pub fn check_license(store: &OptionStore, desc: &Descriptor) -> Result<()> {
    if store.is_enabled("nonfree") {
        return Ok(());
    }
    let Some(nonfree) = desc.try_config_list("EXTERNAL_LIBRARY_NONFREE_LIST")? else {
        return Ok(());
    };
    check_tier(store, &nonfree)?;
    if !store.is_enabled("gplv3") {
        if let Some(members) = desc.try_config_list("EXTERNAL_LIBRARY_GPLV3_LIST")? {
            check_tier(store, &members)?;
        }
    }
    if !store.is_enabled("lgplv3") && !store.is_enabled("gplv3") {
        if let Some(members) = desc.try_config_list("EXTERNAL_LIBRARY_VERSION3_LIST")? {
            check_tier(store, &members)?;
        }
    }
    if !store.is_enabled("gpl") {
        if let Some(members) = desc.try_config_list("EXTERNAL_LIBRARY_GPL_LIST")? {
            check_tier(store, &members)?;
        }
    }
    Ok(())
}

fn check_tier(store: &OptionStore, members: &[String]) -> Result<()> {
    for member in members {
        if store.is_enabled(member) {
            return Err(ConfigError::LicenseConflict(member.clone()));
        }
    }
    Ok(())
}

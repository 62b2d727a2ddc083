//! Configuration-derivation engine.
//!
//! Parses an autotools-style `configure` descriptor into an option store,
//! applies user directives through the dependency resolver, and renders the
//! resolved option set as preprocessor definitions.

mod commands;
mod defaults;
mod descriptor;
mod error;
mod loader;
mod options;
mod output;
mod relations;
mod resolver;
mod tables;

pub use commands::apply_directive;
pub use defaults::{apply_defaults, apply_forced_values, DefaultSettings};
pub use descriptor::{parse_existing_config, Descriptor};
pub use error::{ConfigError, Result};
pub use loader::{FileLoader, MemoryLoader};
pub use options::{ConfigOption, FixedValue, OptionState, OptionStore};
pub use output::{
    component_directives, render_components, render_config_asm, render_config_h,
    render_header_comment, render_public_header, render_version_header, update_license,
    ComponentDirective,
};
pub use relations::RelationKind;
pub use resolver::{apply_license_rules, check_license, toggle, validate_all};
pub use tables::{
    additional_dependencies, asm_replace_values, builtin_substitutions, forced_disables,
    forced_enables, replace_values, reserved_options,
};

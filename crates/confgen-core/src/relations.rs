//! Dependency relation kinds and their descriptor naming convention.
//!
//! Relations are never stored; the resolver re-derives the list name per
//! option per pass and materializes it from descriptor text on demand.

/// The six dependency relations plus the soft `suggest` hint, keyed off an
/// option's lower-case name in the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `<option>_if_any`: enable when any member holds.
    EnableIfAny,
    /// `<option>_if`: enable when all members hold.
    EnableIfAll,
    /// `<option>_deps`: every member must hold or the option is disabled.
    Requires,
    /// `<option>_deps_any`: at least one member must hold.
    RequiresAny,
    /// `<option>_conflict`: any enabled member disables the option.
    Conflict,
    /// `<option>_select`: hard-enabled alongside the option.
    Select,
    /// `<option>_suggest`: enabled alongside unless explicitly disabled.
    Suggest,
}

impl RelationKind {
    pub fn suffix(self) -> &'static str {
        match self {
            RelationKind::EnableIfAny => "_if_any",
            RelationKind::EnableIfAll => "_if",
            RelationKind::Requires => "_deps",
            RelationKind::RequiresAny => "_deps_any",
            RelationKind::Conflict => "_conflict",
            RelationKind::Select => "_select",
            RelationKind::Suggest => "_suggest",
        }
    }

    /// Descriptor list name holding this relation for `option`.
    pub fn list_name(self, option: &str) -> String {
        format!("{}{}", option.to_lowercase(), self.suffix())
    }
}

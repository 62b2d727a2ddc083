//! Conditional-usage extraction.
//!
//! Finds references to project-prefixed symbols inside option-guarded
//! `if (...)` regions, accumulating a guard expression per symbol. A
//! reference seen anywhere without a guard is unconditionally live and
//! permanently excluded from the DCE set.

use confgen_common::{
    close_delim, find_first_not_of, find_first_of, find_last_not_of, find_last_of, Reporter,
    NON_NAME, PREPROC_OPS, WHITESPACE,
};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::expr::combine_defines;

/// The option-tag family recognized inside guard expressions.
pub const DCE_TAGS: &[&str] = &["ARCH_", "HAVE_", "CONFIG_", "EXTERNAL_", "INTERNAL_", "INLINE_"];

/// Guard forms, including the doubled-parenthesis variants. The doubled
/// forms keep their inner parenthesis as part of the guard text.
const IF_FORMS: &[&str] = &["if (", "if(", "if ((", "if(("];

const END_LINE: &str = "\n\r\x0b\x0c";

/// One discovered reference to a project-prefixed symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DceUsage {
    /// Guard expression text; `"1"` means unconditional.
    pub guard: String,
    /// File the reference (or its declaration) was found in.
    pub file: String,
}

/// Accumulated scan state shared across all files of a project.
#[derive(Debug, Default)]
pub struct UsageScan {
    /// Symbol → guard/file, insertion-ordered for stable output.
    pub usages: IndexMap<String, DceUsage>,
    /// Symbols seen unguarded somewhere; never DCE candidates.
    pub non_dce: FxHashSet<String>,
}

struct InternalUsage {
    guard: String,
    locations: Vec<usize>,
}

/// Scan one file. Returns true when the file uses macro-paste token
/// construction and needs the compiler-assisted fallback instead of
/// fine-grained analysis.
pub fn find_usages(
    text: &str,
    file_name: &str,
    idents: &[String],
    scan: &mut UsageScan,
    reporter: &Reporter,
) -> bool {
    let mut internal: IndexMap<String, InternalUsage> = IndexMap::new();

    // Guarded references.
    for tag in DCE_TAGS {
        for (form_index, form) in IF_FORMS.iter().enumerate() {
            let search = format!("{}{}", form, tag);
            let mut find_pos = text.find(&search);
            while let Some(at) = find_pos {
                let Some((mut guard, close)) = extract_guard(text, at, form_index) else {
                    break;
                };
                if guard.contains("##") {
                    return true;
                }
                clean_define(&mut guard, reporter);

                let Some((code_start, code_end)) = extract_block(text, close, true) else {
                    break;
                };
                let code = &text[code_start..code_end];

                for ident in idents {
                    let mut upos = code.find(ident.as_str());
                    while let Some(p) = upos {
                        match reference_kind(code, p) {
                            RefKind::MacroPaste => return true,
                            RefKind::Reference(symbol_end) => {
                                let symbol = &code[p..symbol_end];
                                let func_guard =
                                    inner_guards(code, p, symbol, &guard, reporter);
                                record_internal(
                                    &mut internal,
                                    &scan.non_dce,
                                    symbol,
                                    func_guard,
                                    code_start + p,
                                );
                            }
                            RefKind::None => {}
                        }
                        upos = code[p + 1..].find(ident.as_str()).map(|x| x + p + 1);
                    }
                }

                find_pos = text[code_end..].find(&search).map(|x| x + code_end);
            }
        }
    }

    // Unguarded references exclude their symbol permanently.
    for ident in idents {
        let mut find_pos = text.find(ident.as_str());
        while let Some(p) = find_pos {
            if let Some(symbol_end) = unguarded_reference(text, p) {
                let symbol = &text[p..symbol_end];
                match internal.get(symbol) {
                    None => {
                        scan.non_dce.insert(symbol.to_string());
                        scan.usages.shift_remove(symbol);
                    }
                    Some(entry) => {
                        if !entry.locations.contains(&p) {
                            scan.non_dce.insert(symbol.to_string());
                            scan.usages.shift_remove(symbol);
                            internal.shift_remove(symbol);
                        }
                    }
                }
            }
            find_pos = text[p + 1..].find(ident.as_str()).map(|x| x + p + 1);
        }
    }

    // Merge this file's guarded findings into the project-wide set.
    for (symbol, entry) in internal {
        match scan.usages.get_mut(&symbol) {
            None => {
                scan.usages.insert(
                    symbol,
                    DceUsage {
                        guard: entry.guard,
                        file: file_name.to_string(),
                    },
                );
            }
            Some(existing) => {
                existing.guard = combine_defines(&existing.guard, &entry.guard);
            }
        }
    }
    false
}

enum RefKind {
    None,
    /// End offset of a valid symbol reference.
    Reference(usize),
    /// The reference is built by macro expansion; fall back to the
    /// preprocessor.
    MacroPaste,
}

/// Classify an identifier occurrence inside a guarded block: a call, an
/// address-of assignment, or nothing of interest.
fn reference_kind(code: &str, at: usize) -> RefKind {
    let Some(symbol_end) = find_first_of(code, at + 1, NON_NAME) else {
        return RefKind::None;
    };
    let symbol_start = find_last_of(code, symbol_end - 1, NON_NAME)
        .map(|x| x + 1)
        .unwrap_or(0);
    if symbol_start != at {
        // The prefix was an infix of a longer identifier.
        return RefKind::None;
    }
    let Some(after) = find_first_not_of(code, symbol_end, WHITESPACE) else {
        return RefKind::None;
    };
    match code.as_bytes()[after] {
        b'(' => RefKind::Reference(symbol_end),
        b';' => {
            if at > 0 {
                if let Some(before) = find_last_not_of(code, at - 1, WHITESPACE) {
                    if code.as_bytes()[before] == b'=' {
                        return RefKind::Reference(symbol_end);
                    }
                }
            }
            RefKind::None
        }
        b'#' => RefKind::MacroPaste,
        _ => RefKind::None,
    }
}

/// Whether an identifier occurrence anywhere in the file is a live
/// reference: a call inside a function body, a function definition, an
/// assignment, or a table declaration with an initializer.
fn unguarded_reference(text: &str, at: usize) -> Option<usize> {
    let symbol_end = find_first_of(text, at + 1, NON_NAME)?;
    let symbol_start = find_last_of(text, symbol_end - 1, NON_NAME)
        .map(|x| x + 1)
        .unwrap_or(0);
    if symbol_start != at {
        return None;
    }
    let after = find_first_not_of(text, symbol_end, WHITESPACE)?;
    // A following #endif/#else means the occurrence sits inside a
    // preprocessor block and is handled by the guarded scan.
    if let Some(hash) = text[after + 1..].find('#').map(|x| x + after + 1) {
        if text.as_bytes().get(hash + 1) == Some(&b'e') {
            return None;
        }
    }
    let valid = match text.as_bytes()[after] {
        b'(' => {
            // Call site: inside some function body.
            let mut valid = match (text[..at].rfind('{'), text[..at].rfind('}')) {
                (Some(open), Some(close)) => open > close,
                (Some(_), None) => true,
                _ => false,
            };
            // Function definition: balanced parameter list then a body.
            if !valid {
                if let Some(close) = close_delim(text, after + 1, b'(', b')') {
                    if let Some(next) = find_first_not_of(text, close + 1, WHITESPACE) {
                        valid = text.as_bytes()[next] == b'{';
                    }
                }
            }
            valid
        }
        b';' => at > 0
            && find_last_not_of(text, at - 1, WHITESPACE)
                .map(|before| text.as_bytes()[before] == b'=')
                .unwrap_or(false),
        b'[' => {
            let mut close = text[after + 1..].find(']').map(|x| x + after + 1)?;
            while text.as_bytes().get(close + 1) == Some(&b'[') {
                close = text[close + 1..].find(']').map(|x| x + close + 1)?;
            }
            let next = find_first_not_of(text, close + 1, WHITESPACE)?;
            text.as_bytes()[next] == b'='
        }
        b'=' => true,
        _ => false,
    };
    valid.then_some(symbol_end)
}

/// Extract the guard text of the `if` form at `at`. Returns the guard and
/// the offset of its closing parenthesis.
fn extract_guard(text: &str, at: usize, form_index: usize) -> Option<(String, usize)> {
    let form = IF_FORMS[form_index];
    let content = at + form.len();
    let guard_start = if form_index >= 2 { content - 1 } else { content };
    let close = close_delim(text, guard_start, b'(', b')')?;
    Some((text[guard_start..close].to_string(), close))
}

/// Extract the span of code governed by a guard closing at `close`:
/// either a brace-delimited block or a single statement, following a
/// chain of cascaded `if` continuations when requested.
fn extract_block(text: &str, close: usize, cascade: bool) -> Option<(usize, usize)> {
    let start = find_first_not_of(text, close + 1, WHITESPACE)?;
    if text.as_bytes()[start] == b'{' {
        let end = close_delim(text, start + 1, b'{', b'}')?;
        return Some((start, end));
    }
    let statement_class = format!("{};", END_LINE);
    let mut end = find_first_of(text, start + 1, &statement_class)?;
    if text.as_bytes()[end] == b';' {
        return Some((start, end + 1));
    }
    if !cascade {
        return Some((start, end));
    }
    // The guarded statement may itself be an if chain.
    let mut cursor = start;
    while text[cursor..].starts_with("if") {
        let open = text[cursor + 2..].find('(').map(|x| x + cursor + 2)?;
        let inner_close = close_delim(text, open + 1, b'(', b')')?;
        let after = find_first_not_of(text, inner_close + 1, WHITESPACE)?;
        if text.as_bytes()[after] == b'{' {
            end = close_delim(text, after + 1, b'{', b'}')?;
            break;
        }
        end = find_first_of(text, after + 1, &statement_class)?;
        if text.as_bytes()[end] == b';' {
            end += 1;
            break;
        }
        cursor = after;
    }
    Some((start, end))
}

/// Conjoin the guards of any nested option-`if` regions that also cover
/// this reference.
fn inner_guards(
    code: &str,
    reference_at: usize,
    symbol: &str,
    outer_guard: &str,
    reporter: &Reporter,
) -> String {
    let mut func_guard = outer_guard.to_string();
    for tag in DCE_TAGS {
        for (form_index, form) in IF_FORMS.iter().enumerate() {
            let search = format!("{}{}", form, tag);
            let mut at = code[..reference_at].rfind(&search);
            while let Some(q) = at {
                if let Some((mut guard, close)) = extract_guard(code, q, form_index) {
                    clean_define(&mut guard, reporter);
                    if let Some((bstart, bend)) = extract_block(code, close, false) {
                        if code[bstart..bend].contains(symbol) {
                            func_guard = conjoin(&guard, &func_guard);
                        }
                    }
                }
                at = if q == 0 { None } else { code[..q].rfind(&search) };
            }
        }
    }
    func_guard
}

fn conjoin(first: &str, second: &str) -> String {
    let wrap = |guard: &str| {
        if guard.contains(['&', '|']) {
            format!("({})", guard)
        } else {
            guard.to_string()
        }
    };
    format!("{}&&{}", wrap(first), wrap(second))
}

fn record_internal(
    internal: &mut IndexMap<String, InternalUsage>,
    non_dce: &FxHashSet<String>,
    symbol: &str,
    guard: String,
    location: usize,
) {
    match internal.get_mut(symbol) {
        None => {
            // A previously seen unguarded use keeps the symbol out.
            if !non_dce.contains(symbol) {
                internal.insert(
                    symbol.to_string(),
                    InternalUsage {
                        guard,
                        locations: vec![location],
                    },
                );
            }
        }
        Some(entry) => {
            entry.guard = combine_defines(&entry.guard, &guard);
            entry.locations.push(location);
        }
    }
}

/// Normalize a raw guard expression: convert the `EXTERNAL_`/`INTERNAL_`/
/// `INLINE_` macro forms into their `HAVE_*_<KIND>` option tags, strip
/// whitespace, and remove conditional atoms that are not option tags.
pub fn clean_define(define: &mut String, reporter: &Reporter) {
    // EXTERNAL_MMX(flags) and friends test the corresponding HAVE_ option.
    for kind in ["EXTERNAL", "INTERNAL", "INLINE"] {
        let search = format!("{}_", kind);
        let mut from = 0;
        while let Some(at) = define[from..].find(&search).map(|x| x + from) {
            let name_start = at + search.len();
            let Some(open) = find_first_of(define, name_start, "(") else {
                break;
            };
            let mut part = define[name_start..open].to_string();
            for removal in ["_FAST", "_SLOW"] {
                while let Some(rem) = part.find(removal) {
                    part.replace_range(rem..rem + removal.len(), "");
                }
            }
            let replacement = format!("HAVE_{}_{}", part, kind);
            let Some(close) = close_delim(define, open + 1, b'(', b')') else {
                break;
            };
            define.replace_range(at..close + 1, &replacement);
            from = at + replacement.len();
        }
    }

    define.retain(|c| !c.is_whitespace());

    // Drop conditions that are not derived from configuration options
    // (local variables, function calls, numeric flags).
    let mut start = find_first_not_of(define, 0, PREPROC_OPS);
    while let Some(s) = start {
        let valid = DCE_TAGS.iter().any(|tag| define[s..].starts_with(tag));
        if valid {
            start = find_first_of(define, s + 1, PREPROC_OPS)
                .and_then(|p| find_first_not_of(define, p + 1, PREPROC_OPS));
            continue;
        }
        // Right edge of the atom, absorbing a call's argument list.
        let mut right = match find_first_of(define, s, PREPROC_OPS) {
            Some(r) if define.as_bytes()[r] == b'(' => close_delim(define, r + 1, b'(', b')')
                .map(|c| c + 1)
                .unwrap_or(define.len()),
            Some(r) => r,
            None => define.len(),
        };
        if define.as_bytes()[s].is_ascii_uppercase() {
            let atom = &define[s..right];
            if !atom.starts_with("AV_") && !atom.starts_with("FF_") {
                reporter.info(format!("Found unknown macro in DCE condition {}", atom));
            }
        }
        let mut left = s;
        // Absorb parentheses that wrap exactly this atom.
        while left > 0
            && define.as_bytes()[left - 1] == b'('
            && define.as_bytes().get(right) == Some(&b')')
        {
            left -= 1;
            right += 1;
        }
        if left == 0
            || (define.as_bytes()[left - 1] == b'(' && define.as_bytes().get(right) != Some(&b')'))
        {
            // Trim the operators that joined this atom on the right.
            right = find_first_not_of(define, right, "|&!=").unwrap_or(define.len());
        } else {
            // Trim the joining operators on the left.
            left = find_last_not_of(define, left - 1, "|&!=")
                .map(|x| x + 1)
                .unwrap_or(0);
        }
        define.replace_range(left..right.min(define.len()), "");
        start = find_first_not_of(define, left.min(define.len()), PREPROC_OPS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter() -> Reporter {
        Reporter::new(confgen_common::Verbosity::Error)
    }

    fn idents() -> Vec<String> {
        vec!["ff_".to_string(), "av_".to_string()]
    }

    #[test]
    fn guarded_call_is_recorded() {
        let text = "void setup(void) {\n    if (CONFIG_FOO_DECODER)\n        ff_foo_init();\n}\n";
        let mut scan = UsageScan::default();
        assert!(!find_usages(text, "a.c", &idents(), &mut scan, &reporter()));
        let usage = scan.usages.get("ff_foo_init").expect("usage recorded");
        assert_eq!(usage.guard, "CONFIG_FOO_DECODER");
        assert_eq!(usage.file, "a.c");
    }

    #[test]
    fn brace_blocks_and_nested_parens() {
        let text = "static void f(void) {\n    if (CONFIG_A && (HAVE_B || HAVE_C)) {\n        av_bar(x, g(y));\n    }\n}\n";
        let mut scan = UsageScan::default();
        find_usages(text, "b.c", &idents(), &mut scan, &reporter());
        assert_eq!(
            scan.usages.get("av_bar").unwrap().guard,
            "CONFIG_A&&(HAVE_B||HAVE_C)"
        );
    }

    #[test]
    fn unguarded_use_excludes_symbol() {
        let text = "void f(void) {\n    if (CONFIG_FOO)\n        av_foo();\n}\nvoid g(void) {\n    av_foo();\n}\n";
        let mut scan = UsageScan::default();
        find_usages(text, "c.c", &idents(), &mut scan, &reporter());
        assert!(scan.non_dce.contains("av_foo"));
        assert!(scan.usages.get("av_foo").is_none());
    }

    #[test]
    fn unguarded_use_in_other_file_excludes_retroactively() {
        let guarded = "void f(void) {\n    if (CONFIG_FOO)\n        av_foo();\n}\n";
        let unguarded = "void g(void) {\n    av_foo();\n}\n";
        let mut scan = UsageScan::default();
        find_usages(guarded, "one.c", &idents(), &mut scan, &reporter());
        assert!(scan.usages.contains_key("av_foo"));
        find_usages(unguarded, "two.c", &idents(), &mut scan, &reporter());
        assert!(!scan.usages.contains_key("av_foo"));
        assert!(scan.non_dce.contains("av_foo"));
        // And it never comes back.
        find_usages(guarded, "three.c", &idents(), &mut scan, &reporter());
        assert!(!scan.usages.contains_key("av_foo"));
    }

    #[test]
    fn repeated_guards_combine() {
        let text = "void f(void) {\n    if (CONFIG_A)\n        av_baz();\n    if (CONFIG_A && CONFIG_B)\n        av_baz();\n}\n";
        let mut scan = UsageScan::default();
        find_usages(text, "d.c", &idents(), &mut scan, &reporter());
        // The weaker guard wins on merge.
        assert_eq!(scan.usages.get("av_baz").unwrap().guard, "CONFIG_A");
    }

    #[test]
    fn macro_paste_requests_preprocess() {
        let text = "void f(void) {\n    if (CONFIG_##NAME##_DECODER)\n        av_thing();\n}\n";
        let mut scan = UsageScan::default();
        assert!(find_usages(text, "e.c", &idents(), &mut scan, &reporter()));
    }

    #[test]
    fn address_of_assignment_is_a_reference() {
        let text = "void f(void) {\n    if (CONFIG_X)\n        cb = av_handler;\n}\n";
        let mut scan = UsageScan::default();
        find_usages(text, "f.c", &idents(), &mut scan, &reporter());
        assert!(scan.usages.contains_key("av_handler"));
    }

    #[test]
    fn clean_define_normalizes_macro_tags() {
        let rep = reporter();
        let mut guard = "EXTERNAL_MMX(cpu_flags)".to_string();
        clean_define(&mut guard, &rep);
        assert_eq!(guard, "HAVE_MMX_EXTERNAL");

        let mut guard = "INLINE_SSE2_SLOW(flags)".to_string();
        clean_define(&mut guard, &rep);
        assert_eq!(guard, "HAVE_SSE2_INLINE");
    }

    #[test]
    fn clean_define_drops_non_option_atoms() {
        let rep = reporter();
        let mut guard = "CONFIG_A && ctx->enabled".to_string();
        clean_define(&mut guard, &rep);
        assert_eq!(guard, "CONFIG_A");

        let mut guard = "check(x) && HAVE_B".to_string();
        clean_define(&mut guard, &rep);
        assert_eq!(guard, "HAVE_B");
    }
}

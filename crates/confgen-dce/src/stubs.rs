//! Declaration lookup and stub synthesis.

use confgen_common::{
    close_delim, find_first_not_of, find_last_not_of, find_last_of, is_name_char, WHITESPACE,
};
use confgen_core::{render_header_comment, OptionState, OptionStore};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::expr::combine_defines;
use crate::usage::DceUsage;

/// A resolved declaration: its exact text is the map key; this carries the
/// guard and the file it came from.
pub type StubEntry = DceUsage;

/// Search `text` for a true declaration of `symbol`, as opposed to a call
/// site: a balanced parameter list followed by `;` or `{`, or an array
/// form followed by `=`. Returns the declaration text and whether it is a
/// function.
pub fn find_declaration(text: &str, symbol: &str) -> Option<(String, bool)> {
    let mut find_pos = text.find(symbol);
    while let Some(at) = find_pos {
        let after = match find_first_not_of(text, at + symbol.len(), WHITESPACE) {
            Some(p) => p,
            None => return None,
        };
        if text.as_bytes()[after] == b'(' {
            if let Some(close) = close_delim(text, after + 1, b'(', b')') {
                if let Some(next) = find_first_not_of(text, close + 1, WHITESPACE) {
                    // A following `{` in a source file means no declaration
                    // was found in any header; the definition still serves.
                    if text.as_bytes()[next] == b';' || text.as_bytes()[next] == b'{' {
                        if let Some(start) = declaration_start(text, at) {
                            return Some((text[start..=close].to_string(), true));
                        }
                    }
                }
            }
        } else if text.as_bytes()[after] == b'[' {
            let mut close = text[after + 1..].find(']').map(|x| x + after + 1)?;
            while text.as_bytes().get(close + 1) == Some(&b'[') {
                close = text[close + 1..].find(']').map(|x| x + close + 1)?;
            }
            if let Some(next) = find_first_not_of(text, close + 1, WHITESPACE) {
                if text.as_bytes()[next] == b'=' {
                    if let Some(start) = declaration_start(text, at) {
                        return Some((text[start..=close].to_string(), false));
                    }
                }
            }
        }
        let from = at + symbol.len() + 1;
        find_pos = text.get(from..).and_then(|t| t.find(symbol)).map(|x| x + from);
    }
    None
}

/// Offset of the type token preceding a symbol at `at`, tolerating one
/// pointer star. Returns `None` when the preceding token is not a type
/// name (e.g. an operator, making this a call site).
fn declaration_start(text: &str, at: usize) -> Option<usize> {
    if at == 0 {
        return None;
    }
    let mut before = find_last_not_of(text, at - 1, WHITESPACE)?;
    if !is_name_char(text.as_bytes()[before]) {
        if text.as_bytes()[before] != b'*' || before == 0 {
            return None;
        }
        before = find_last_not_of(text, before - 1, WHITESPACE)?;
        if !is_name_char(text.as_bytes()[before]) {
            return None;
        }
    }
    Some(
        find_last_of(text, before.saturating_sub(1), WHITESPACE)
            .map(|x| x + 1)
            .unwrap_or(0),
    )
}

/// Insert synthetic names for parameters that the declaration leaves
/// unnamed, so the stub body is a valid definition.
fn name_parameters(declaration: &str) -> String {
    let mut function = declaration.to_string();
    let mut count = 0u32;
    let Some(mut cursor) = function.find('(') else {
        return function;
    };
    loop {
        let comma = function[cursor + 1..].find(',').map(|x| x + cursor + 1);
        let close = comma.or_else(|| function.rfind(')'));
        let Some(close) = close else { break };
        let Some(end) = find_last_not_of(&function, close.saturating_sub(1), WHITESPACE) else {
            break;
        };
        if end <= cursor {
            break;
        }
        let param = function[cursor + 1..=end].trim().to_string();
        let needs_name = if param.ends_with('*') {
            true
        } else {
            let mut tokens: Vec<&str> = param.split_whitespace().collect();
            if tokens.first() == Some(&"const") {
                tokens.remove(0);
            }
            if tokens.len() >= 2 && (tokens[1] == "int" || tokens[1] == "long") {
                tokens.remove(0);
            }
            tokens.len() < 2
        };
        let mut resume = comma;
        if needs_name && !param.starts_with("void") {
            count += 1;
            let insert = format!(" param{}", count);
            function.insert_str(end + 1, &insert);
            resume = comma.map(|c| c + insert.len());
        }
        match resume {
            Some(next) => cursor = next,
            None => break,
        }
    }
    function
}

/// Body returning a zero of the declared return type.
fn zero_return(declaration: &str) -> String {
    let return_type = declaration
        .split_whitespace()
        .next()
        .unwrap_or("void")
        .to_string();
    match return_type.as_str() {
        "void" => "return;".to_string(),
        "int" | "unsigned" | "long" | "short" => "return 0;".to_string(),
        "float" => "return 0.0f;".to_string(),
        "double" => "return 0.0;".to_string(),
        _ if return_type.contains('*') => "return 0;".to_string(),
        _ => format!("return *({}*)(0);", return_type),
    }
}

/// Render the stub translation unit: guarded header includes followed by
/// guarded stub definitions.
pub fn render_stub_file(
    project: &str,
    functions: &IndexMap<String, StubEntry>,
    variables: &IndexMap<String, StubEntry>,
    store: &OptionStore,
    replace: &FxHashMap<String, String>,
) -> String {
    let mut body = String::new();
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut add_header = |headers: &mut Vec<(String, String)>, guard: &str, file: &str| {
        match headers.iter_mut().find(|(_, f)| f == file) {
            None => headers.push((guard.to_string(), file.to_string())),
            Some((existing, _)) => *existing = combine_defines(existing, guard),
        }
    };

    for (declaration, entry) in functions {
        let use_guard = entry.guard.len() > 1 && entry.guard != "0";
        if use_guard {
            body.push_str(&format!("#if !({})\n", entry.guard));
        }
        if entry.file.contains(".h") {
            let guard = if use_guard { entry.guard.as_str() } else { "" };
            add_header(&mut headers, guard, &entry.file);
        }
        let function = name_parameters(declaration);
        body.push_str(&function);
        body.push_str(" {");
        body.push_str(&zero_return(&function));
        body.push_str("}\n");
        if use_guard {
            body.push_str("#endif\n");
        }
    }

    for (declaration, entry) in variables {
        let mut use_guard = entry.guard.len() > 1 && entry.guard != "0";
        let mut enabled = false;
        // A residual single-tag guard names an option: if it resolved to
        // enabled the variable is present; reserved (replaced) symbols
        // stay behind their guard for the target preprocessor to decide.
        if let Some(index) = store.get_prefixed(&entry.guard) {
            let option = store.option(index);
            let reserved = replace.contains_key(&option.tag());
            if !reserved {
                enabled = option.state == OptionState::Enabled;
            }
            use_guard = use_guard || reserved;
        }
        if enabled {
            continue;
        }
        let guard = if use_guard { entry.guard.as_str() } else { "" };
        if use_guard {
            body.push_str(&format!("#if !({})\n", entry.guard));
        }
        add_header(&mut headers, guard, &entry.file);
        body.push_str(&format!("const {} = {{0}};\n", declaration));
        if use_guard {
            body.push_str("#endif\n");
        }
    }

    let mut out = render_header_comment(&format!("{} DCE definitions", project));
    out.push_str("\n#include \"config.h\"\n#include \"stdint.h\"\n\n");
    // Reverse discovery order keeps deeper dependencies last.
    for (guard, file) in headers.iter().rev() {
        if !guard.is_empty() {
            out.push_str(&format!("#if !({})\n", guard));
        }
        out.push_str(&format!("#include \"{}\"\n", file));
        if !guard.is_empty() {
            out.push_str("#endif\n");
        }
    }
    out.push('\n');
    out.push_str(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_vs_call_site() {
        let header = "int av_foo(AVCtx *ctx, int flags);\n";
        let (decl, is_func) = find_declaration(header, "av_foo").unwrap();
        assert!(is_func);
        assert_eq!(decl, "int av_foo(AVCtx *ctx, int flags)");

        let source = "static void g(void) {\n    x = av_foo(ctx, 0);\n}\n";
        assert!(find_declaration(source, "av_foo").is_none());
    }

    #[test]
    fn pointer_returns_are_captured() {
        let header = "const char *av_name(int id);\n";
        let (decl, is_func) = find_declaration(header, "av_name").unwrap();
        assert!(is_func);
        assert_eq!(decl, "char *av_name(int id)");
    }

    #[test]
    fn array_declarations_are_variables() {
        let source = "const FooTab ff_tab[4][2] = {\n    {0},\n};\n";
        let (decl, is_func) = find_declaration(source, "ff_tab").unwrap();
        assert!(!is_func);
        assert_eq!(decl, "FooTab ff_tab[4][2]");
    }

    #[test]
    fn unnamed_parameters_get_synthetic_names() {
        assert_eq!(
            name_parameters("int av_init(AVCtx *, int flags, const uint8_t *)"),
            "int av_init(AVCtx * param1, int flags, const uint8_t * param2)"
        );
        assert_eq!(name_parameters("void av_simple(void)"), "void av_simple(void)");
        assert_eq!(name_parameters("int av_one(int)"), "int av_one(int param1)");
    }

    #[test]
    fn zero_returns_match_types() {
        assert_eq!(zero_return("void av_f(void)"), "return;");
        assert_eq!(zero_return("int av_f(void)"), "return 0;");
        assert_eq!(zero_return("float av_f(void)"), "return 0.0f;");
        assert_eq!(zero_return("double av_f(void)"), "return 0.0;");
        assert_eq!(zero_return("AVRational av_f(void)"), "return *(AVRational*)(0);");
    }

    #[test]
    fn stub_file_wraps_guards_and_includes() {
        let mut functions = IndexMap::new();
        functions.insert(
            "int av_dead(int flags)".to_string(),
            StubEntry {
                guard: "CONFIG_DEAD".to_string(),
                file: "libav/dead.h".to_string(),
            },
        );
        let store = OptionStore::new();
        let out = render_stub_file(
            "libav",
            &functions,
            &IndexMap::new(),
            &store,
            &FxHashMap::default(),
        );
        assert!(out.contains("#include \"config.h\""));
        assert!(out.contains("#if !(CONFIG_DEAD)\n#include \"libav/dead.h\"\n#endif"));
        assert!(out.contains("#if !(CONFIG_DEAD)\nint av_dead(int flags) {return 0;}\n#endif"));
    }
}

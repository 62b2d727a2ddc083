//! Descriptor parsing and named-list materialization.
//!
//! The descriptor is a shell-configure-style script kept verbatim in
//! memory. Lists are re-derived from the text on every request; nothing is
//! cached, and list evaluation never mutates the option store.

use confgen_common::{find_first_not_of, find_first_of, Reporter, WHITESPACE};

use crate::error::{ConfigError, Result};
use crate::loader::FileLoader;
use crate::options::{OptionState, OptionStore};
use crate::tables::builtin_substitutions;

/// Alphabet of filter-kind prefixes accepted by `find_filters_extern`
/// (`af`, `vf`, `asrc`, `vsink`, ...).
const FILTER_KIND_CHARS: &str = "avfsinkrc";

/// A loaded configure descriptor plus the collaborators needed to resolve
/// the file-scanning list helpers.
pub struct Descriptor<'a> {
    text: String,
    root: String,
    project: String,
    loader: &'a dyn FileLoader,
    reporter: Reporter,
}

impl<'a> Descriptor<'a> {
    /// Wrap descriptor text. The project name is captured from the
    /// `#define <PROJECT>_CONFIG_H` start marker; its absence is fatal.
    pub fn from_text(
        loader: &'a dyn FileLoader,
        reporter: Reporter,
        root: impl Into<String>,
        text: String,
    ) -> Result<Self> {
        let project = detect_project(&text).ok_or(ConfigError::MissingConfigMarker)?;
        Ok(Self {
            text,
            root: root.into(),
            project,
            loader,
            reporter,
        })
    }

    /// Load `<root>/configure` and wrap it.
    pub fn load(loader: &'a dyn FileLoader, reporter: Reporter, root: &str) -> Result<Self> {
        let path = format!("{}configure", root);
        let text = loader.load(&path)?;
        Self::from_text(loader, reporter, root, text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Upper-case project name from the config-block marker (`FFMPEG`,
    /// `LIBAV`, ...).
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Parse the fixed `#define` block and the `print_config` list
    /// declarations into `store`.
    pub fn parse(&self, store: &mut OptionStore) -> Result<()> {
        self.reporter.status("  Passing configure file...");
        let text = &self.text;
        let marker = format!("#define {}_CONFIG_H", self.project);
        let mut pos = text.find(&marker).ok_or(ConfigError::MissingConfigMarker)? + marker.len();

        let substitutions = builtin_substitutions();

        // Fixed values run from the first #define after the marker to EOF.
        let Some(mut define_pos) = text[pos..].find("#define").map(|p| p + pos) else {
            return Err(ConfigError::MissingConfigEnd);
        };
        let block_end = text[define_pos..]
            .find("EOF")
            .map(|p| p + define_pos)
            .ok_or(ConfigError::MissingConfigEnd)?;
        while define_pos < block_end {
            let start = skip_ws(text, define_pos + 7)?;
            let mut end = next_ws(text, start + 1);
            let name = &text[start..end];

            let value_start = skip_ws(text, end + 1)?;
            end = next_ws(text, value_start + 1);
            let mut value = text[value_start..end].to_string();

            // A `$` marks a variable or `$(func ...)` substitution that must
            // resolve against the built-in fixed table.
            if let Some(dollar) = value.find('$') {
                if value.as_bytes().get(dollar + 1) == Some(&b'(') {
                    let close = text[value_start..]
                        .find(')')
                        .map(|p| p + value_start)
                        .ok_or_else(|| ConfigError::UnknownSubstitution(value.clone()))?;
                    end = close + 1;
                    value = text[value_start..end].to_string();
                }
                let key_end = if value.ends_with('"') {
                    value.len() - 1
                } else {
                    value.len()
                };
                let key = &value[dollar..key_end];
                let replacement = substitutions
                    .get(key)
                    .ok_or_else(|| ConfigError::UnknownSubstitution(key.to_string()))?;
                value = if value.starts_with('"') {
                    format!("\"{}\"", replacement)
                } else {
                    replacement.to_string()
                };
            }
            store.push_fixed(name, value);

            match text[end + 1..].find("#define").map(|p| p + end + 1) {
                Some(next) if next < block_end => define_pos = next,
                _ => break,
            }
        }

        // The option lists live between the fixed block and the closing
        // #endif of the config.h here-doc.
        let section_end = text[block_end..]
            .find("#endif")
            .map(|p| p + block_end)
            .ok_or(ConfigError::MissingConfigEnd)?;
        let mut print_pos = text[block_end..].find("print_config").map(|p| p + block_end);
        while let Some(at) = print_pos {
            if at >= section_end {
                break;
            }
            let start = skip_ws(text, at + 12)?;
            let mut end = next_ws(text, start + 1);
            let prefix = text[start..end].to_string();
            // Skip the output-file variable.
            let start = skip_ws(text, end + 1)?;
            end = next_ws(text, start + 1);

            let start = skip_ws(text, end + 1)?;
            end = next_ws(text, start + 1);
            self.add_list_members(store, &prefix, text[start..end].trim_start_matches('$'))?;

            // Backslash continuation lines name further lists.
            loop {
                let Some(cont) = find_first_not_of(text, end + 1, WHITESPACE) else {
                    break;
                };
                if text.as_bytes()[cont] != b'\\' {
                    break;
                }
                let Some(start) = find_first_not_of(text, cont + 2, " \t") else {
                    break;
                };
                if text.as_bytes()[start] == b'\n' {
                    break;
                }
                end = next_ws(text, start + 1);
                self.add_list_members(store, &prefix, text[start..end].trim_start_matches('$'))?;
            }

            print_pos = text[at + 1..].find("print_config").map(|p| p + at + 1);
        }
        store.mark_config_end();
        Ok(())
    }

    fn add_list_members(&self, store: &mut OptionStore, prefix: &str, list: &str) -> Result<()> {
        for member in self.config_list(list)? {
            store.push(&member, prefix, OptionState::Unset);
        }
        Ok(())
    }

    /// Materialize a named list; its absence is fatal.
    pub fn config_list(&self, list: &str) -> Result<Vec<String>> {
        self.materialize(list, self.text.len(), true)?
            .ok_or_else(|| ConfigError::MissingList(list.to_string()))
    }

    /// Materialize a named list, tolerating absence (of the list itself or
    /// of anything it references).
    pub fn try_config_list(&self, list: &str) -> Result<Option<Vec<String>>> {
        self.materialize(list, self.text.len(), false)
    }

    /// Locate and evaluate the closest declaration of `list` preceding
    /// `upto` (redefinition shadows earlier declarations).
    fn materialize(&self, list: &str, upto: usize, force: bool) -> Result<Option<Vec<String>>> {
        let text = &self.text;
        let Some(decl) = self.find_list_decl(list, upto) else {
            return Ok(None);
        };
        let mut pos = decl + list.len() + 1;

        let mut end_char = b'\n';
        match text.as_bytes().get(pos) {
            Some(b'"') => {
                end_char = b'"';
                pos += 1;
            }
            Some(b'\'') => {
                end_char = b'\'';
                pos += 1;
            }
            Some(_) => {}
            None => return Ok(Some(Vec::new())),
        }
        let terminator = format!("{}{}", WHITESPACE, end_char as char);

        let mut out = Vec::new();
        pos = skip_ws(text, pos)?;
        loop {
            if text.as_bytes()[pos] == end_char {
                break;
            }
            let end;
            if text.as_bytes()[pos] == b'$' && text.as_bytes().get(pos + 1) == Some(&b'(') {
                end = self.eval_helper(list, pos + 2, decl, &mut out)?;
            } else {
                end = find_first_of(text, pos + 1, &terminator).unwrap_or(text.len());
                let tag = &text[pos..end];
                if let Some(referenced) = tag.strip_prefix('$') {
                    match self.materialize(referenced, end, force)? {
                        Some(members) => out.extend(members),
                        None if force => {
                            return Err(ConfigError::MissingList(referenced.to_string()))
                        }
                        None => return Ok(None),
                    }
                } else {
                    out.push(tag.to_string());
                }
            }
            let Some(next) = find_first_not_of(text, end, WHITESPACE) else {
                break;
            };
            pos = next;
            if end_char == b'\n' {
                // Unquoted lists span lines only via backslash continuation.
                if text.as_bytes()[pos] != b'\\' {
                    break;
                }
                pos = match find_first_not_of(text, pos + 1, WHITESPACE) {
                    Some(p) => p,
                    None => break,
                };
            }
        }
        Ok(Some(out))
    }

    /// Evaluate a `$(func ...)` helper invocation starting at the function
    /// name. Returns the offset just past the closing parenthesis.
    fn eval_helper(
        &self,
        list: &str,
        name_start: usize,
        decl: usize,
        out: &mut Vec<String>,
    ) -> Result<usize> {
        let text = &self.text;
        let name_end = next_ws(text, name_start + 1);
        let function = &text[name_start..name_end];
        let param = |cursor: usize, last: bool| -> Result<(String, usize)> {
            let start = skip_ws(text, cursor + 1)?;
            let class = if last {
                format!("{})", WHITESPACE)
            } else {
                WHITESPACE.to_string()
            };
            let end = find_first_of(text, start + 1, &class).unwrap_or(text.len());
            Ok((text[start..end].to_string(), end))
        };

        let end = match function {
            "find_things" => {
                let (p1, e) = param(name_end, false)?;
                let (p2, e) = param(e, false)?;
                let (p3, e) = param(e, true)?;
                self.find_things(&p1, &p2, &p3, out)?;
                e
            }
            "find_things_extern" => {
                let (p1, e) = param(name_end, false)?;
                let (p2, e) = param(e, false)?;
                let (p3, mut e) = param(e, true)?;
                // Optional replacement-suffix argument.
                let mut p4 = None;
                if text.as_bytes().get(e) != Some(&b')') {
                    let next = find_first_not_of(text, e, WHITESPACE);
                    if next.map(|p| text.as_bytes()[p]) != Some(b')') {
                        let (arg, e2) = param(e, true)?;
                        p4 = Some(arg);
                        e = e2;
                    }
                }
                self.find_things_extern(&p1, &p2, &p3, p4.as_deref(), out)?;
                e
            }
            "add_suffix" => {
                let (p1, e) = param(name_end, false)?;
                let (p2, e) = param(e, true)?;
                self.add_suffix(&p1, &p2, e, out)?;
                e
            }
            "filter_out" => {
                let (p1, e) = param(name_end, false)?;
                let (p2, e) = param(e, true)?;
                self.filter_out(&p1, &p2, decl, out)?;
                e
            }
            "find_filters_extern" => {
                let (p1, e) = param(name_end, true)?;
                self.find_filters_extern(&p1, out)?;
                e
            }
            _ => {
                return Err(ConfigError::UnknownListFunction {
                    function: function.to_string(),
                    list: list.to_string(),
                })
            }
        };
        Ok(if text.as_bytes().get(end) == Some(&b')') {
            end + 1
        } else {
            end
        })
    }

    /// Start offset of the closest line-anchored `list=` declaration
    /// preceding `upto`.
    fn find_list_decl(&self, list: &str, upto: usize) -> Option<usize> {
        let needle = format!("{}=", list);
        let mut bound = upto.min(self.text.len());
        while let Some(at) = self.text[..bound].rfind(&needle) {
            if at == 0 || self.text.as_bytes()[at - 1] == b'\n' {
                return Some(at);
            }
            bound = at;
        }
        None
    }

    /// Scan a component registry file for `PATTERN(FIRST, second)` macro
    /// rows, yielding `second_<thing>` entries.
    fn find_things(
        &self,
        thing: &str,
        pattern: &str,
        file: &str,
        out: &mut Vec<String>,
    ) -> Result<()> {
        let contents = self.loader.load(&format!("{}{}", self.root, file))?;
        let open_class = format!("{}(", WHITESPACE);
        let sep_class = format!("{},);", WHITESPACE);

        let mut search = contents.find(pattern);
        while let Some(at) = search {
            // The pattern may be an infix of a longer macro name (ENCDEC
            // matches both DEC and ENC rows); advance to the open paren.
            let Some(mut pos) = find_first_of(&contents, at + 1, &open_class) else {
                break;
            };
            pos = match find_first_not_of(&contents, pos, " \t") {
                Some(p) => p,
                None => break,
            };
            if contents.as_bytes()[pos] != b'(' {
                search = contents[pos + 1..].find(pattern).map(|p| p + pos + 1);
                continue;
            }
            pos += 1;
            let Some(end) = find_first_of(&contents, pos, &sep_class) else {
                break;
            };
            if contents.as_bytes()[end] != b',' {
                search = contents[end + 1..].find(pattern).map(|p| p + end + 1);
                continue;
            }
            let mut tag = contents[pos..end].to_string();
            // `X` rows are the macro template itself, not a component.
            if tag == "X" {
                search = contents[end + 1..].find(pattern).map(|p| p + end + 1);
                continue;
            }
            let Some(pos2) = find_first_not_of(&contents, end + 1, " \t") else {
                break;
            };
            let Some(end2) = find_first_of(&contents, pos2, &sep_class) else {
                break;
            };
            if contents.as_bytes()[end2] != b')' && contents.as_bytes()[end2] != b',' {
                search = contents[end2 + 1..].find(pattern).map(|p| p + end2 + 1);
                continue;
            }
            let tag2 = contents[pos2..end2].to_uppercase();
            // The registry macro lists the option tag first and the symbol
            // name second; rows that disagree carry the tag in the second
            // slot.
            if tag2 != tag {
                tag = tag2;
            }
            out.push(format!("{}_{}", tag.to_lowercase(), thing));
            search = contents[end2 + 1..].find(pattern).map(|p| p + end2 + 1);
        }
        Ok(())
    }

    /// Scan `extern <type> ff_<name>_<thing>` declarations.
    fn find_things_extern(
        &self,
        thing: &str,
        type_name: &str,
        file: &str,
        replace_suffix: Option<&str>,
        out: &mut Vec<String>,
    ) -> Result<()> {
        let contents = self.loader.load(&format!("{}{}", self.root, file))?;
        let end_class = format!("{},();[]", WHITESPACE);
        let suffix = format!("_{}", thing);

        let mut search = contents.find("extern ");
        while let Some(at) = search {
            let mut pos = at + 7;
            if contents[pos..].starts_with("const ") {
                pos += 6;
            }
            pos = match find_first_not_of(&contents, pos, WHITESPACE) {
                Some(p) => p,
                None => break,
            };
            if !contents[pos..].starts_with(type_name) {
                search = contents[pos + 1..].find("extern ").map(|p| p + pos + 1);
                continue;
            }
            pos += type_name.len() + 1;
            pos = match find_first_not_of(&contents, pos, WHITESPACE) {
                Some(p) => p,
                None => break,
            };
            if !contents[pos..].starts_with("ff_") {
                search = contents[pos + 1..].find("extern ").map(|p| p + pos + 1);
                continue;
            }
            pos += 3;
            let mut end = find_first_of(&contents, pos, &end_class).unwrap_or(contents.len());
            let suffix_at = contents[pos..].find(&suffix).map(|p| p + pos);
            if let Some(at) = suffix_at {
                if at < end {
                    end = at;
                }
            }
            if contents.as_bytes().get(end) != Some(&b'_') || Some(end) != suffix_at {
                search = find_from(&contents, end + 1, "extern ");
                continue;
            }
            end += suffix.len();
            let mut tag = contents[pos..end].to_string();
            if let Some(replacement) = replace_suffix {
                tag = format!("{}_{}", &tag[..tag.len() - suffix.len()], replacement);
            }
            out.push(tag.to_lowercase());
            search = find_from(&contents, end + 1, "extern ");
        }
        Ok(())
    }

    /// Scan `extern AVFilter ff_<kind>_<name>;` rows, yielding
    /// `<name>_filter` entries.
    fn find_filters_extern(&self, file: &str, out: &mut Vec<String>) -> Result<()> {
        let contents = self.loader.load(&format!("{}{}", self.root, file))?;
        let end_class = format!("{},();", WHITESPACE);

        let mut search = contents.find("extern AVFilter ff_");
        while let Some(at) = search {
            let pos = at + "extern AVFilter ff_".len();
            let end = find_first_of(&contents, pos, &end_class).unwrap_or(contents.len());
            let tag = &contents[pos..end];
            if let Some((kind, name)) = tag.split_once('_') {
                if !kind.is_empty() && kind.chars().all(|c| FILTER_KIND_CHARS.contains(c)) {
                    out.push(format!("{}_filter", name.to_lowercase()));
                }
            }
            search = contents[end..].find("extern AVFilter ff_").map(|p| p + end);
        }
        Ok(())
    }

    /// Full `<kind>_<name>` filter symbol for a bare filter name, looked up
    /// in the filter registry.
    pub fn full_filter_name(&self, name: &str) -> Result<Option<String>> {
        let contents = self
            .loader
            .load(&format!("{}libavfilter/allfilters.c", self.root))?;
        let end_class = format!("{},();", WHITESPACE);

        let mut search = contents.find("extern AVFilter ff_");
        while let Some(at) = search {
            let pos = at + "extern AVFilter ff_".len();
            let end = find_first_of(&contents, pos, &end_class).unwrap_or(contents.len());
            let tag = &contents[pos..end];
            if let Some((kind, bare)) = tag.split_once('_') {
                if kind.chars().all(|c| FILTER_KIND_CHARS.contains(c))
                    && bare.to_lowercase() == name
                {
                    return Ok(Some(tag.to_lowercase()));
                }
            }
            search = contents[end..].find("extern AVFilter ff_").map(|p| p + end);
        }
        Ok(None)
    }

    /// Append an upper-cased suffix to every member of another list.
    fn add_suffix(
        &self,
        suffix: &str,
        var: &str,
        upto: usize,
        out: &mut Vec<String>,
    ) -> Result<()> {
        let referenced = var.trim_start_matches('$');
        let members = self
            .materialize(referenced, upto, true)?
            .ok_or_else(|| ConfigError::MissingList(referenced.to_string()))?;
        let suffix = suffix.to_uppercase();
        out.extend(members.into_iter().map(|m| format!("{}{}", m, suffix)));
        Ok(())
    }

    /// Remove the first occurrence of a quoted literal from another list.
    /// The referenced list is resolved *before* the current declaration so
    /// a list can filter its own previous definition.
    fn filter_out(&self, literal: &str, var: &str, decl: usize, out: &mut Vec<String>) -> Result<()> {
        let literal = literal.trim_matches('\'').trim_matches('"');
        let referenced = var.trim_start_matches('$');
        let mut members = self
            .materialize(referenced, decl, true)?
            .ok_or_else(|| ConfigError::MissingList(referenced.to_string()))?;
        if let Some(at) = members.iter().position(|m| m == literal) {
            members.remove(at);
        }
        out.extend(members);
        Ok(())
    }
}

/// Re-read a previously generated configuration header back into the
/// store, bypassing the resolver.
pub fn parse_existing_config(
    store: &mut OptionStore,
    loader: &dyn FileLoader,
    reporter: &Reporter,
    path: &str,
) -> Result<()> {
    reporter.status("  Passing in existing config.h file...");
    let text = loader.load(path)?;

    let mut define_pos = ["#define ARCH_", "#define HAVE_", "#define CONFIG_"]
        .iter()
        .filter_map(|tag| text.find(tag))
        .min();
    while let Some(at) = define_pos {
        let Some(start) = find_first_not_of(&text, at + 7, WHITESPACE) else {
            break;
        };
        let end = next_ws(&text, start + 1);
        let option = &text[start..end];

        let Some(value_start) = find_first_not_of(&text, end + 1, WHITESPACE) else {
            break;
        };
        let value_end = next_ws(&text, value_start + 1);
        let value = &text[value_start..value_end];

        if let Some(index) = store.get_prefixed(option) {
            let enable = match value {
                "1" => true,
                "0" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        option: option.to_string(),
                        value: value.to_string(),
                    })
                }
            };
            let bare = store.option(index).name.clone();
            store.fast_toggle(&bare, enable);
        } else if store.fixed(option).is_none() {
            return Err(ConfigError::UnknownOption(option.to_string()));
        }
        define_pos = text[value_end..].find("#define ").map(|p| p + value_end);
    }
    Ok(())
}

/// `haystack.find` from a byte offset, tolerating offsets past the end.
fn find_from(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    haystack.get(from..)?.find(needle).map(|p| p + from)
}

/// Project name from the first `#define <NAME>_CONFIG_H` marker.
fn detect_project(text: &str) -> Option<String> {
    let mut search = text.find("#define ");
    while let Some(at) = search {
        let start = at + 8;
        let end = next_ws(text, start);
        let token = &text[start..end];
        if let Some(project) = token.strip_suffix("_CONFIG_H") {
            if !project.is_empty() {
                return Some(project.to_string());
            }
        }
        search = text[end..].find("#define ").map(|p| p + end);
    }
    None
}

fn skip_ws(text: &str, from: usize) -> Result<usize> {
    find_first_not_of(text, from, WHITESPACE).ok_or(ConfigError::MissingConfigEnd)
}

fn next_ws(text: &str, from: usize) -> usize {
    find_first_of(text, from, WHITESPACE).unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;

    fn descriptor<'a>(loader: &'a MemoryLoader, text: &str) -> Descriptor<'a> {
        Descriptor::from_text(loader, Reporter::default(), "", text.to_string()).unwrap()
    }

    const HEADER: &str = "#define FFMPEG_CONFIG_H\n";

    #[test]
    fn detects_project_from_marker() {
        let loader = MemoryLoader::new();
        let desc = descriptor(&loader, "cat > config.h <<EOF\n#define LIBAV_CONFIG_H\nEOF\n");
        assert_eq!(desc.project(), "LIBAV");
    }

    #[test]
    fn missing_marker_is_fatal() {
        let loader = MemoryLoader::new();
        let err =
            Descriptor::from_text(&loader, Reporter::default(), "", "nothing here".to_string());
        assert!(matches!(err, Err(ConfigError::MissingConfigMarker)));
    }

    #[test]
    fn literal_list_materializes() {
        let loader = MemoryLoader::new();
        let text = format!("{}PROGRAM_LIST=\"ffplay ffprobe ffmpeg\"\n", HEADER);
        let desc = descriptor(&loader, &text);
        assert_eq!(
            desc.config_list("PROGRAM_LIST").unwrap(),
            vec!["ffplay", "ffprobe", "ffmpeg"]
        );
    }

    #[test]
    fn shadowing_picks_closest_declaration() {
        let loader = MemoryLoader::new();
        let text = format!("{}A_LIST=\"one\"\nA_LIST=\"two\"\nB_LIST=\"$A_LIST\"\n", HEADER);
        let desc = descriptor(&loader, &text);
        assert_eq!(desc.config_list("B_LIST").unwrap(), vec!["two"]);
    }

    #[test]
    fn list_references_recurse() {
        let loader = MemoryLoader::new();
        let text = format!(
            "{}DEC_LIST=\"aac h264\"\nENC_LIST=\"png\"\nALL_LIST=\"$DEC_LIST $ENC_LIST extra\"\n",
            HEADER
        );
        let desc = descriptor(&loader, &text);
        assert_eq!(
            desc.config_list("ALL_LIST").unwrap(),
            vec!["aac", "h264", "png", "extra"]
        );
    }

    #[test]
    fn missing_list_is_tolerated_when_not_forced() {
        let loader = MemoryLoader::new();
        let text = format!("{}", HEADER);
        let desc = descriptor(&loader, &text);
        assert!(desc.try_config_list("NO_SUCH_LIST").unwrap().is_none());
        assert!(matches!(
            desc.config_list("NO_SUCH_LIST"),
            Err(ConfigError::MissingList(_))
        ));
    }

    #[test]
    fn add_suffix_and_filter_out() {
        let loader = MemoryLoader::new();
        let text = format!(
            "{}BASE_LIST=\"mmx sse\"\nEXT_LIST=\"$(add_suffix _external $BASE_LIST)\"\n\
             CUT_LIST=\"$(filter_out 'sse' $BASE_LIST)\"\n",
            HEADER
        );
        let desc = descriptor(&loader, &text);
        assert_eq!(
            desc.config_list("EXT_LIST").unwrap(),
            vec!["mmx_EXTERNAL", "sse_EXTERNAL"]
        );
        assert_eq!(desc.config_list("CUT_LIST").unwrap(), vec!["mmx"]);
    }

    #[test]
    fn find_things_scans_registry_rows() {
        let loader = MemoryLoader::new();
        loader.insert(
            "libavcodec/allcodecs.c",
            "#define DEC(X, x) ...\nDEC(AAC, aac)\nDEC (H264, h264)\nDEC(VP9, vp9)\n",
        );
        let text = format!(
            "{}DECODER_LIST=\"$(find_things decoder DEC libavcodec/allcodecs.c)\"\n",
            HEADER
        );
        let desc = descriptor(&loader, &text);
        assert_eq!(
            desc.config_list("DECODER_LIST").unwrap(),
            vec!["aac_decoder", "h264_decoder", "vp9_decoder"]
        );
    }

    #[test]
    fn find_things_extern_scans_declarations() {
        let loader = MemoryLoader::new();
        loader.insert(
            "libavformat/allformats.c",
            "extern const AVOutputFormat ff_mp4_muxer;\n\
             extern AVInputFormat ff_mov_demuxer;\n\
             extern const AVOutputFormat other_muxer;\n",
        );
        let text = format!(
            "{}MUXER_LIST=\"$(find_things_extern muxer AVOutputFormat libavformat/allformats.c)\"\n",
            HEADER
        );
        let desc = descriptor(&loader, &text);
        assert_eq!(desc.config_list("MUXER_LIST").unwrap(), vec!["mp4_muxer"]);
    }

    #[test]
    fn find_filters_extern_maps_to_filter_names() {
        let loader = MemoryLoader::new();
        loader.insert(
            "libavfilter/allfilters.c",
            "extern AVFilter ff_af_aecho;\nextern AVFilter ff_vsrc_buffer;\n\
             extern AVFilter ff_zz_skipped;\n",
        );
        let text = format!(
            "{}FILTER_LIST=\"$(find_filters_extern libavfilter/allfilters.c)\"\n",
            HEADER
        );
        let desc = descriptor(&loader, &text);
        assert_eq!(
            desc.config_list("FILTER_LIST").unwrap(),
            vec!["aecho_filter", "buffer_filter"]
        );
        assert_eq!(
            desc.full_filter_name("aecho").unwrap(),
            Some("af_aecho".to_string())
        );
    }

    #[test]
    fn parse_populates_fixed_and_lists() {
        let loader = MemoryLoader::new();
        let text = "\
cat > $TMPH <<EOF
#define FFMPEG_CONFIG_H
#define FFMPEG_CONFIGURATION \"$(c_escape $FFMPEG_CONFIGURATION)\"
#define FFMPEG_LICENSE \"$(c_escape $license)\"
#define SWS_MAX_FILTER_SIZE $sws_max_filter_size
EOF
print_config ARCH_   \"$config_mak\" $ARCH_LIST
print_config CONFIG_ \"$config_mak\" $CONFIG_LIST \\
                                     $PROGRAM_LIST
#endif
ARCH_LIST=\"x86\"
CONFIG_LIST=\"gpl $PROGRAM_LIST\"
PROGRAM_LIST=\"ffmpeg ffprobe\"
";
        let desc = descriptor(&loader, text);
        let mut store = OptionStore::new();
        desc.parse(&mut store).unwrap();

        assert_eq!(
            store.fixed("FFMPEG_LICENSE").unwrap().value,
            "\"lgpl\""
        );
        assert_eq!(store.fixed("SWS_MAX_FILTER_SIZE").unwrap().value, "256");
        assert!(store.is_valid_prefixed("ARCH_X86"));
        assert!(store.is_valid_prefixed("CONFIG_GPL"));
        assert!(store.is_valid_prefixed("CONFIG_FFMPEG"));
        // PROGRAM_LIST members appear both via CONFIG_LIST and the
        // continuation line.
        assert_eq!(store.indices_of("FFMPEG").len(), 2);
        assert_eq!(store.exported().len(), store.len());
    }

    #[test]
    fn existing_config_feeds_back_into_store() {
        let loader = MemoryLoader::new();
        loader.insert(
            "config.h",
            "#define CONFIG_AAC_DECODER 1\n#define CONFIG_H264_DECODER 0\n",
        );
        let mut store = OptionStore::new();
        store.push("aac_decoder", "CONFIG_", OptionState::Unset);
        store.push("h264_decoder", "CONFIG_", OptionState::Unset);
        parse_existing_config(&mut store, &loader, &Reporter::new(confgen_common::Verbosity::Error), "config.h")
            .unwrap();
        assert!(store.is_enabled("aac_decoder"));
        assert_eq!(store.state(1), OptionState::Disabled);
    }
}

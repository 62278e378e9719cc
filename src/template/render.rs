//! Template rendering.
//!
//! A placeholder is `{params}`, optionally preceded by the start of the
//! template or a newline plus a run of tabs. The tabs become the indent for
//! every line of the substituted value; an empty value removes the whole
//! span, newline and tabs included, so optional blocks leave no blank line.

use super::params::{parse_parameters, ParamKind, Parameter, FALLBACK};
use crate::i18n::DefinitionMap;
use regex::{Captures, Regex};
use std::sync::OnceLock;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static REFERENCE_REGEX: OnceLock<Regex> = OnceLock::new();
static WRAP_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"(?s)(?:(^|\n)(\t*))?\{(.*?)\}").expect("placeholder pattern is valid")
    })
}

fn reference_regex() -> &'static Regex {
    REFERENCE_REGEX.get_or_init(|| Regex::new(r"\$([0-9]+)").expect("reference pattern is valid"))
}

fn wrap_regex() -> &'static Regex {
    WRAP_REGEX
        .get_or_init(|| Regex::new(r"\$([0-9]+)\{(.*?)\}").expect("wrap pattern is valid"))
}

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"^(\S+)(.*)$").expect("tag pattern is valid"))
}

/// A resolved span of the template.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slice {
    start: usize,
    end: usize,
    value: String,
}

/// Fill every placeholder in `template` from `defs`.
///
/// Never fails: anything unresolvable renders as [`FALLBACK`].
pub fn render(template: &str, defs: &DefinitionMap) -> String {
    let slices: Vec<Slice> = placeholder_regex()
        .captures_iter(template)
        .filter_map(|caps| {
            let span = caps.get(0)?;
            let newline = caps.get(1).map_or("", |m| m.as_str());
            let tabs = caps.get(2).map_or("", |m| m.as_str());
            let inner = caps.get(3).map_or("", |m| m.as_str());

            Some(Slice {
                start: span.start(),
                end: span.end(),
                value: format_value(&expand(inner, defs), newline, tabs),
            })
        })
        .collect();

    replace_slices(template, slices)
}

/// Resolve one placeholder body (the text between the braces).
pub fn expand(raw: &str, defs: &DefinitionMap) -> String {
    let Some(params) = parse_parameters(raw, defs) else {
        return FALLBACK.to_string();
    };
    let Some(base) = params.first().and_then(|p| defs.text(&p.value)) else {
        return FALLBACK.to_string();
    };
    let base = base.into_owned();

    if params.len() == 1 {
        return base;
    }

    // Plain references first, so wrapped content can contain their output
    let plain = substitute_references(&base, &params, defs);
    substitute_wraps(&plain, &params, defs)
}

fn format_value(value: &str, newline: &str, tabs: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let mut formatted = String::with_capacity(newline.len() + value.len() + tabs.len());
    formatted.push_str(newline);
    formatted.push_str(tabs);
    if tabs.is_empty() {
        formatted.push_str(value);
    } else {
        formatted.push_str(&value.replace('\n', &format!("\n{tabs}")));
    }
    formatted
}

/// Replace `$N` references that are not directly followed by `{`.
fn substitute_references(text: &str, params: &[Parameter], defs: &DefinitionMap) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_end = 0;

    for found in reference_regex().find_iter(text) {
        let mut end = found.end();
        if text[end..].starts_with('{') {
            // `$12{` still yields `$1` followed by the literal `2{`
            if found.len() <= 2 {
                continue;
            }
            end -= 1;
        }

        result.push_str(&text[last_end..found.start()]);
        result.push_str(&apply_parameter(&text[found.start() + 1..end], None, params, defs));
        last_end = end;
    }

    result.push_str(&text[last_end..]);
    result
}

/// Replace `$N{inner}` references.
fn substitute_wraps(text: &str, params: &[Parameter], defs: &DefinitionMap) -> String {
    wrap_regex()
        .replace_all(text, |caps: &Captures| {
            let index = caps.get(1).map_or("", |m| m.as_str());
            let inner = caps.get(2).map_or("", |m| m.as_str());
            apply_parameter(index, Some(inner), params, defs)
        })
        .into_owned()
}

fn apply_parameter(
    index: &str,
    inner: Option<&str>,
    params: &[Parameter],
    defs: &DefinitionMap,
) -> String {
    let Some(param) = index.parse::<usize>().ok().and_then(|i| params.get(i)) else {
        return FALLBACK.to_string();
    };

    let applied = match param.kind {
        ParamKind::String => Some(param.value.clone()),
        ParamKind::Definition => defs.text(&param.value).map(|text| text.into_owned()),
        ParamKind::Element => match inner {
            Some(inner) => wrap_element(&param.value, inner),
            None => opening_tag(&param.value),
        },
        ParamKind::Invalid => None,
    };

    applied.unwrap_or_else(|| FALLBACK.to_string())
}

fn opening_tag(tag: &str) -> Option<String> {
    let caps = tag_regex().captures(tag)?;
    let name = caps.get(1)?.as_str();
    let attrs = caps.get(2).map_or("", |m| m.as_str());
    Some(format!("<{name}{attrs}>"))
}

/// Wrap `inner` in the tags of an element value. `b><i` wraps as
/// `<b><i>inner</i></b>`.
fn wrap_element(value: &str, inner: &str) -> Option<String> {
    let mut wrapped = inner.to_string();

    for tag in value.split("><").collect::<Vec<_>>().into_iter().rev() {
        if let Some(caps) = tag_regex().captures(tag) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            wrapped = format!("<{name}{attrs}>{wrapped}</{name}>");
        }
    }

    (wrapped != inner).then_some(wrapped)
}

/// Stitch resolved slices back into `text` in ascending position order.
fn replace_slices(text: &str, mut slices: Vec<Slice>) -> String {
    slices.sort_by_key(|slice| slice.start);

    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;

    for slice in slices {
        if slice.start < cursor {
            continue;
        }
        result.push_str(&text[cursor..slice.start]);
        result.push_str(&slice.value);
        cursor = slice.end;
    }

    result.push_str(&text[cursor..]);
    result
}

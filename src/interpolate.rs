//! Placeholder substitution for resolved translations.

use crate::types::Params;

/// Substitutes `{name}` placeholder tokens in a resolved string.
///
/// Each token whose name is present in `params` is replaced with the
/// parameter's string value. A token naming an absent parameter stays in the
/// output verbatim, which keeps missing-parameter bugs visible instead of
/// blanking them. Substituted values are never rescanned, so a value that
/// itself contains `{...}` cannot trigger further expansion.
///
/// # Examples
/// ```
/// use dom_i18n::{interpolate, Params};
///
/// let params = Params::new().set("name", "John");
/// assert_eq!(interpolate("Hello {name}", &params), "Hello John");
/// assert_eq!(interpolate("Hi {missing}", &params), "Hi {missing}");
/// ```
#[must_use]
pub fn interpolate(text: &str, params: &Params) -> String {
    if params.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let (before, tail) = rest.split_at(open);
        out.push_str(before);

        // Token body runs to the next `}`. Another `{` before it means the
        // brace we are on was literal text, not a token start.
        let body = tail.get(1..).unwrap_or_default();
        match body.find(['{', '}']) {
            Some(end) if body.get(end..).is_some_and(|s| s.starts_with('}')) => {
                let name = body.get(..end).unwrap_or_default();
                match params.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = body.get(end + 1..).unwrap_or_default();
            }
            _ => {
                out.push('{');
                rest = body;
            }
        }
    }
    out.push_str(rest);
    out
}

//! Small helpers shared by configuration loading.

/// Expand `${VAR}` and `${VAR:-fallback}` references in `input` using
/// `lookup`.
///
/// Unset variables without a fallback expand to nothing. An unterminated
/// `${` is kept verbatim.
pub fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let reference = &after[..end];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };
        match lookup(name.trim()).filter(|v| !v.is_empty()) {
            Some(value) => out.push_str(&value),
            None => out.push_str(fallback.unwrap_or_default()),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// [`expand_vars`] against the process environment.
pub fn expand_env_vars(input: &str) -> String {
    expand_vars(input, |name| std::env::var(name).ok())
}

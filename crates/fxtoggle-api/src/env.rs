//! Environment-variable toggles shared by the config layers of the fxtoggle crates.

/// `1`, `true`, `yes` and `on` (case-insensitive, surrounding whitespace ignored) are truthy.
/// Anything else, including an unset or non-UTF-8 variable, is not.
pub fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };

    is_truthy(&raw)
}

fn is_truthy(raw: &str) -> bool {
    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

use std::borrow::Cow;

/// Expand environment references in a configured path.
///
/// Handles Windows-style `%VAR%` first, then `$VAR`, `${VAR}` and a leading
/// `~` via `shellexpand`. Unknown variables are left as written.
pub fn expand_env(input: &str) -> String {
    expand_env_with(input, |name| std::env::var(name).ok())
}

pub fn expand_env_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let percent = expand_percent(input, &lookup);
    let expanded = shellexpand::full_with_context(
        &percent,
        || std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).ok(),
        |name: &str| -> Result<Option<String>, std::convert::Infallible> { Ok(lookup(name)) },
    );
    match expanded.map(Cow::into_owned) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(input, error = %e, "path expansion failed, using it verbatim");
            percent
        }
    }
}

fn expand_percent<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 && is_var_name(&after[..end]) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_var_name(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '(' || c == ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "USERPROFILE" => Some("C:\\Users\\admin".to_string()),
            "GAMES" => Some("/srv/games".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_percent_vars() {
        assert_eq!(
            expand_env_with("%USERPROFILE%\\Zomboid\\Server", lookup),
            "C:\\Users\\admin\\Zomboid\\Server"
        );
    }

    #[test]
    fn test_dollar_vars() {
        assert_eq!(expand_env_with("$GAMES/pz", lookup), "/srv/games/pz");
        assert_eq!(expand_env_with("${GAMES}/pal", lookup), "/srv/games/pal");
    }

    #[test]
    fn test_unknown_percent_var_kept() {
        assert_eq!(expand_env_with("%NOPE%/x", lookup), "%NOPE%/x");
        assert_eq!(expand_env_with("100% done", lookup), "100% done");
    }

    #[test]
    fn test_unknown_dollar_var_kept() {
        assert_eq!(expand_env_with("$NOPE/x", lookup), "$NOPE/x");
    }
}

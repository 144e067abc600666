//! Canonical storage paths for user home directories.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const HOME_PREFIX: &str = "a:";

// `~user` only at the start of a term, so fuzzy (`word~2`) and proximity
// (`"a b"~3`) operators are left alone.
static HOME_SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[\s:(/])~([A-Za-z0-9_.@-]+)").expect("home shorthand pattern is valid")
});

/// Storage path of a user's home, e.g. `a:alice`.
pub fn home_path(user_id: &str) -> String {
    format!("{HOME_PREFIX}{user_id}")
}

/// Storage path of a user's private area, e.g. `a:alice/private`.
pub fn private_path(user_id: &str) -> String {
    format!("{}/private", home_path(user_id))
}

/// Rewrite every `~user` shorthand into the user's home path with the colon
/// escaped for the index syntax. Runs as a single pass: a rewritten path is
/// never rewritten again.
pub fn expand_home_directory(query: &str) -> Cow<'_, str> {
    HOME_SHORTHAND.replace_all(query, |caps: &Captures<'_>| {
        format!("{}{}", &caps[1], home_path(&caps[2]).replacen(':', "\\:", 1))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_for_user() {
        assert_eq!(home_path("alice"), "a:alice");
        assert_eq!(private_path("alice"), "a:alice/private");
    }

    #[test]
    fn rewrites_every_shorthand_once() {
        assert_eq!(
            expand_home_directory("path:~alice/files OR path:~bob"),
            "path:a\\:alice/files OR path:a\\:bob"
        );
        assert_eq!(expand_home_directory("~carol"), "a\\:carol");
    }

    #[test]
    fn fuzzy_operators_untouched() {
        let query = "title:roam~2 AND \"jakarta apache\"~10";
        assert!(matches!(expand_home_directory(query), Cow::Borrowed(_)));
    }
}

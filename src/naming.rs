//! Identifier case conversion.

use regex::Regex;
use std::sync::OnceLock;

fn capitalized_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("(.)([A-Z][a-z0-9]+)").expect("static pattern"))
}

fn lower_upper_pair() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("([a-z])([A-Z])").expect("static pattern"))
}

/// Convert a camel or Pascal case identifier to lower snake case.
///
/// Two substitutions run in order: a separator goes before every capitalized
/// word that follows some character, then between every lowercase letter and
/// an uppercase letter right after it. The result is lowercased.
///
/// ```
/// use autokit::naming::to_snake_case;
///
/// assert_eq!(to_snake_case("CamelCase"), "camel_case");
/// assert_eq!(to_snake_case("ABCWord"), "abc_word");
/// assert_eq!(to_snake_case("Conv2D"), "conv2d");
/// ```
pub fn to_snake_case(name: &str) -> String {
    let intermediate = capitalized_word().replace_all(name, "${1}_${2}");
    lower_upper_pair()
        .replace_all(&intermediate, "${1}_${2}")
        .to_lowercase()
}

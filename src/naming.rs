//! # Naming Module
//!
//! Deterministic identifier derivation shared by every other part of the pipeline:
//! case conversion, initialism handling, pluralization and the canonical property
//! ordering.
//!
//! All functions are total. Empty input is returned unchanged and odd input never
//! panics.
//!
//! ## Word splitting
//!
//! Words are split on `_`, `-` and spaces, and on camel-case boundaries. An
//! uppercase letter preceded by a non-uppercase letter starts a new word, and so
//! does the last capital of an uppercase run that is followed by a lowercase letter
//! (`HTTPServer` splits into `HTTP` + `Server`).
//!
//! ## Initialisms
//!
//! `ID`, `UUID`, `API`, `URL`, `HTTP`, `JSON`, `SQL`, `XML`, `HTML`, `CSS`, `JWT`
//! and `JS` are kept fully uppercase at word boundaries:
//!
//! ```rust
//! use specgen::naming::{pascal_case, constant_case, title};
//!
//! assert_eq!(pascal_case("user_id"), "UserID");
//! assert_eq!(title("IdToken"), "IDToken");
//! assert_eq!(constant_case("IdToken"), "ID_TOKEN");
//! ```

use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Initialisms as `(lowercase, canonical)` pairs, longest first so prefix and
/// suffix matching in [`title`] prefers `Uuid` over `Id`.
const INITIALISMS: [(&str, &str); 12] = [
    ("uuid", "UUID"),
    ("http", "HTTP"),
    ("json", "JSON"),
    ("html", "HTML"),
    ("api", "API"),
    ("url", "URL"),
    ("sql", "SQL"),
    ("xml", "XML"),
    ("css", "CSS"),
    ("jwt", "JWT"),
    ("id", "ID"),
    ("js", "JS"),
];

const GO_KEYWORDS: [&str; 25] = [
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

static PLURAL_IRREGULARS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("person", "people"),
        ("child", "children"),
        ("mouse", "mice"),
        ("tooth", "teeth"),
        ("foot", "feet"),
        ("goose", "geese"),
        ("man", "men"),
        ("woman", "women"),
        ("health", "health"),
        ("config", "config"),
        ("apikey", "APIKeys"),
    ])
});

static SINGULAR_IRREGULARS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("people", "person"),
        ("children", "child"),
        ("mice", "mouse"),
        ("teeth", "tooth"),
        ("feet", "foot"),
        ("geese", "goose"),
        ("men", "man"),
        ("women", "woman"),
        ("health", "health"),
        ("config", "config"),
        ("apikeys", "APIKey"),
    ])
});

fn initialism(word: &str) -> Option<&'static str> {
    let lower = word.to_ascii_lowercase();
    INITIALISMS
        .iter()
        .find(|(l, _)| *l == lower)
        .map(|(_, canonical)| *canonical)
}

fn is_separator(c: char) -> bool {
    c == '_' || c == '-' || c == ' '
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Split an identifier into its words.
///
/// ```rust
/// use specgen::naming::split_words;
///
/// assert_eq!(split_words("createdAt"), vec!["created", "At"]);
/// assert_eq!(split_words("APIKey"), vec!["API", "Key"]);
/// assert_eq!(split_words("user-profile_id"), vec!["user", "profile", "id"]);
/// ```
pub fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.trim().chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if is_separator(c) {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && i > 0 && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if !prev.is_uppercase() || next_is_lower {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize_word(word: &str) -> String {
    if let Some(canonical) = initialism(word) {
        return canonical.to_string();
    }
    // SCREAMING words lose their tail capitals, mixed words keep them
    if word.chars().count() > 1 && !word.chars().any(|c| c.is_lowercase()) {
        return upper_first(&word.to_lowercase());
    }
    upper_first(word)
}

/// Convert to `PascalCase` with initialisms preserved (`api_key` → `APIKey`).
pub fn pascal_case(s: &str) -> String {
    if s.trim().is_empty() {
        return s.to_string();
    }
    split_words(s).iter().map(|w| capitalize_word(w)).collect()
}

/// Convert to `camelCase`. The first word is lowercased entirely, so a leading
/// initialism becomes lowercase (`APIKey` → `apiKey`). Go keywords gain a
/// trailing underscore.
pub fn camel_case(s: &str) -> String {
    if s.trim().is_empty() {
        return s.to_string();
    }
    let words = split_words(s);
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize_word(word));
        }
    }
    sanitize_identifier(&out)
}

/// Convert to `snake_case` (`GetUserByID` → `get_user_by_id`).
pub fn snake_case(s: &str) -> String {
    if s.trim().is_empty() {
        return s.to_string();
    }
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Convert to `kebab-case`.
pub fn kebab_case(s: &str) -> String {
    if s.trim().is_empty() {
        return s.to_string();
    }
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Convert to `CONSTANT_CASE`.
pub fn constant_case(s: &str) -> String {
    if s.trim().is_empty() {
        return s.to_string();
    }
    split_words(s)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Capitalize the first letter and repair initialisms at either end.
///
/// A leading initialism is only rewritten when the next character starts a new
/// word, so `Identity` is untouched while `IdToken` becomes `IDToken`.
pub fn title(s: &str) -> String {
    if s.is_empty() {
        return s.to_string();
    }
    let mut result = upper_first(s);

    for (lower, canonical) in INITIALISMS {
        let prefix = upper_first(lower);
        if let Some(rest) = result.strip_prefix(prefix.as_str()) {
            if rest.chars().next().is_some_and(|c| c.is_uppercase()) {
                result = format!("{canonical}{rest}");
                break;
            }
        }
    }

    for (lower, canonical) in INITIALISMS {
        let suffix = upper_first(lower);
        if let Some(head) = result.strip_suffix(suffix.as_str()) {
            result = format!("{head}{canonical}");
            break;
        }
    }

    result
}

/// Append `_` to Go reserved words (`type` → `type_`).
pub fn sanitize_identifier(name: &str) -> String {
    if GO_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

fn preserve_case(original: &str, replacement: &str) -> String {
    if original.chars().next().is_some_and(|c| c.is_uppercase()) {
        upper_first(replacement)
    } else {
        replacement.to_string()
    }
}

/// Pluralize a singular noun.
///
/// The irregular table wins over the suffix rules, and keeps the input's leading
/// capital.
///
/// ```rust
/// use specgen::naming::pluralize;
///
/// assert_eq!(pluralize("person"), "people");
/// assert_eq!(pluralize("Box"), "Boxes");
/// assert_eq!(pluralize("category"), "categories");
/// assert_eq!(pluralize("APIKey"), "APIKeys");
/// ```
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return word.to_string();
    }
    if let Some(plural) = PLURAL_IRREGULARS.get(word.to_lowercase().as_str()) {
        return preserve_case(word, plural);
    }

    if let Some(stem) = word.strip_suffix('y') {
        return match stem.chars().last() {
            Some(c) if !is_vowel(c) => format!("{stem}ies"),
            _ => format!("{word}s"),
        };
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('f') {
        return format!("{stem}ves");
    }
    if let Some(stem) = word.strip_suffix("fe") {
        return format!("{stem}ves");
    }
    format!("{word}s")
}

/// Singularize a plural noun. Approximate inverse of [`pluralize`] for regular
/// nouns.
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return word.to_string();
    }
    if let Some(singular) = SINGULAR_IRREGULARS.get(word.to_lowercase().as_str()) {
        return preserve_case(word, singular);
    }

    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = word.strip_suffix("ves") {
        return format!("{stem}f");
    }
    if let Some(stem) = word.strip_suffix("es") {
        let sibilant = word.len() > 3 && stem.ends_with(['s', 'x', 'z']);
        if sibilant || word.ends_with("ches") || word.ends_with("shes") {
            return stem.to_string();
        }
        return word[..word.len() - 1].to_string();
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn property_rank(name: &str) -> u8 {
    if name == "id" {
        return 0;
    }
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "createdat" | "created_at" => 1,
        "updatedat" | "updated_at" => 2,
        _ => 3,
    }
}

/// The one property ordering every generator uses: `id`, then `createdAt`, then
/// `updatedAt` (either spelling, case-insensitive), then the rest alphabetically.
///
/// ```rust
/// use specgen::naming::sorted_properties;
///
/// let order = sorted_properties(["name", "updatedAt", "email", "id", "createdAt"]);
/// assert_eq!(order, vec!["id", "createdAt", "updatedAt", "email", "name"]);
/// ```
pub fn sorted_properties<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();
    out.sort_by(|a, b| match property_rank(a).cmp(&property_rank(b)) {
        Ordering::Equal => a.cmp(b),
        other => other,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversions() {
        assert_eq!(pascal_case("user_profile"), "UserProfile");
        assert_eq!(pascal_case("api_key"), "APIKey");
        assert_eq!(pascal_case("APIKey"), "APIKey");
        assert_eq!(pascal_case("CREATED_AT"), "CreatedAt");
        assert_eq!(camel_case("GetUser"), "getUser");
        assert_eq!(camel_case("user_id"), "userID");
        assert_eq!(camel_case("APIKey"), "apiKey");
        assert_eq!(camel_case("type"), "type_");
        assert_eq!(snake_case("GetUserByID"), "get_user_by_id");
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(snake_case("Login"), "login");
        assert_eq!(kebab_case("listUserPosts"), "list-user-posts");
        assert_eq!(constant_case("createdAt"), "CREATED_AT");
    }

    #[test]
    fn test_empty_input_is_unchanged() {
        assert_eq!(pascal_case(""), "");
        assert_eq!(camel_case(""), "");
        assert_eq!(snake_case(""), "");
        assert_eq!(kebab_case(""), "");
        assert_eq!(constant_case(""), "");
        assert_eq!(title(""), "");
        assert_eq!(pluralize(""), "");
        assert_eq!(singularize(""), "");
        assert!(split_words("___").is_empty());
    }

    #[test]
    fn test_title_initialisms() {
        assert_eq!(title("idToken"), "IDToken");
        assert_eq!(title("userId"), "UserID");
        assert_eq!(title("apiUrl"), "APIURL");
        assert_eq!(title("identity"), "Identity");
        assert_eq!(title("name"), "Name");
    }

    #[test]
    fn test_pluralize_rules() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("city"), "cities");
        assert_eq!(pluralize("bus"), "buses");
        assert_eq!(pluralize("church"), "churches");
        assert_eq!(pluralize("dish"), "dishes");
        assert_eq!(pluralize("leaf"), "leaves");
        assert_eq!(pluralize("knife"), "knives");
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("apikey"), "APIKeys");
        assert_eq!(pluralize("health"), "health");
    }

    #[test]
    fn test_singularize_rules() {
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("People"), "Person");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("classes"), "class");
        assert_eq!(singularize("shoes"), "shoe");
        assert_eq!(singularize("class"), "class");
        assert_eq!(singularize("APIKeys"), "APIKey");
    }

    #[test]
    fn test_regular_nouns_round_trip() {
        for word in [
            "box", "city", "day", "leaf", "church", "shoe", "bus", "class", "user", "tag",
            "Order", "quiz", "brush",
        ] {
            assert_eq!(singularize(&pluralize(word)), word, "round trip of {word}");
        }
    }

    #[test]
    fn test_sorted_properties_ignores_insertion_order() {
        let expected = vec!["id", "createdAt", "updatedAt", "email", "name"];
        assert_eq!(
            sorted_properties(["email", "name", "id", "updatedAt", "createdAt"]),
            expected
        );
        assert_eq!(
            sorted_properties(["updatedAt", "createdAt", "name", "email", "id"]),
            expected
        );
        assert_eq!(
            sorted_properties(["title", "updated_at", "created_at"]),
            vec!["created_at", "updated_at", "title"]
        );
    }
}

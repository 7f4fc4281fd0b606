//! Naming conventions - pluralization and key naming used at registration time
//!
//! English-centric and deliberately small. Every name derived here is
//! computed once when a schema is built, never per call.

use heck::{ToKebabCase, ToLowerCamelCase};

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
];

const UNCOUNTABLE: &[&str] = &["equipment", "information", "news", "series", "species", "sheep"];

/// Split a camelCase or dashed word into (prefix, last word)
fn split_last_word(word: &str) -> (&str, &str) {
    let boundary = word
        .char_indices()
        .filter(|(i, c)| *i > 0 && (c.is_uppercase() || *c == '-' || *c == '_'))
        .map(|(i, c)| if c.is_uppercase() { i } else { i + 1 })
        .last()
        .unwrap_or(0);
    word.split_at(boundary)
}

fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

/// Simple pluralization (English-centric)
pub fn pluralize(word: &str) -> String {
    let (prefix, last) = split_last_word(word);
    let lower = last.to_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return format!("{}{}", prefix, match_case(last, plural));
    }

    let plural = if lower.ends_with('y')
        && !lower.ends_with("ay")
        && !lower.ends_with("ey")
        && !lower.ends_with("iy")
        && !lower.ends_with("oy")
        && !lower.ends_with("uy")
    {
        format!("{}ies", &last[..last.len() - 1])
    } else if lower.ends_with('s')
        || lower.ends_with("sh")
        || lower.ends_with("ch")
        || lower.ends_with('x')
        || lower.ends_with('z')
    {
        format!("{}es", last)
    } else {
        format!("{}s", last)
    };

    format!("{}{}", prefix, plural)
}

/// Simple singularization (English-centric)
pub fn singularize(word: &str) -> String {
    let (prefix, last) = split_last_word(word);
    let lower = last.to_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == lower) {
        return format!("{}{}", prefix, match_case(last, singular));
    }

    let singular = if lower.ends_with("ies") && last.len() > 3 {
        format!("{}y", &last[..last.len() - 3])
    } else if lower.ends_with("sses")
        || lower.ends_with("ches")
        || lower.ends_with("shes")
        || lower.ends_with("xes")
        || lower.ends_with("zes")
    {
        last[..last.len() - 2].to_string()
    } else if lower.ends_with('s') && !lower.ends_with("ss") && last.len() > 1 {
        last[..last.len() - 1].to_string()
    } else {
        last.to_string()
    };

    format!("{}{}", prefix, singular)
}

/// Model names are dasherized: `blogPost` -> `blog-post`
pub fn dasherize(word: &str) -> String {
    word.to_kebab_case()
}

/// Keys and collection names are camelized: `blog-post` -> `blogPost`
pub fn camelize(word: &str) -> String {
    word.to_lower_camel_case()
}

/// Default target model for an association key: `blogPosts` -> `blog-post`
pub fn model_name_for_key(key: &str) -> String {
    dasherize(&singularize(key))
}

/// Record store collection for a model: `blog-post` -> `blogPosts`
pub fn collection_name_for(model_name: &str) -> String {
    camelize(&pluralize(&camelize(model_name)))
}

/// Foreign key of a belongs-to association: `author` -> `authorId`
pub fn belongs_to_foreign_key(key: &str) -> String {
    format!("{}Id", camelize(key))
}

/// Foreign key of a has-many association: `blogPosts` -> `blogPostIds`
pub fn has_many_foreign_key(key: &str) -> String {
    format!("{}Ids", camelize(&singularize(key)))
}

//! Turns concrete request paths into low-cardinality label templates.

/// Replaces each bound route parameter value with `:name`.
///
/// Only the first textual occurrence of each value is replaced, wherever it sits in
/// the path, so a value that also appears in an earlier segment substitutes there.
pub fn substitute_params<'a, I>(path: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut templated = path.to_string();
    for (name, value) in params {
        templated = templated.replacen(value, &format!(":{name}"), 1);
    }
    templated
}

/// Keeps the first three `/`-separated pieces of paths of four or more bytes.
///
/// The leading empty piece counts, so `/api/v1/users/123` becomes `/api/v1`.
pub fn truncate_path(path: &str) -> String {
    if path.len() >= 4 {
        path.split('/').take(3).collect::<Vec<_>>().join("/")
    } else {
        path.to_string()
    }
}

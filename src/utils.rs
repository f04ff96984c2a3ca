//! Helpers for the `/`-separated, root-relative paths used across the
//! filesystem abstraction. `"."` names the root itself.

/// Collapses `.` segments, resolves `..` by popping, and drops empty
/// segments. An input that reduces to nothing becomes `"."`.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Joins a parent path and a child name. The root (`""` or `"."`) joins to
/// the child alone.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() || parent == "." {
        normalize(name)
    } else {
        normalize(&format!("{}/{}", parent, name))
    }
}

/// The path up to the last separator, or `"."` for top-level entries.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => ".",
    }
}

/// The final path segment.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

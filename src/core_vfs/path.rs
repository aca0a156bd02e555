/// Resolves `arg` against the virtual working directory `cwd`.
///
/// Absolute arguments start from `/`, relative ones from `cwd`. Empty and `.`
/// segments are dropped and `..` pops one level. Returns `None` when the path
/// would climb above `/`; the result is always absolute and normalized.
pub fn resolve_virtual(cwd: &str, arg: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    if !arg.starts_with('/') {
        segments.extend(cwd.split('/').filter(|s| !s.is_empty() && *s != "."));
    }

    for segment in arg.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            name => segments.push(name),
        }
    }

    Some(format!("/{}", segments.join("/")))
}

/// Quotes a path for a 257 reply, doubling embedded quotes (RFC 959, appendix II).
pub fn quote_path(path: &str) -> String {
    format!("\"{}\"", path.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_paths_ignore_cwd() {
        assert_eq!(resolve_virtual("/pub", "/").as_deref(), Some("/"));
        assert_eq!(resolve_virtual("/pub", "/incoming").as_deref(), Some("/incoming"));
    }

    #[test]
    fn test_relative_paths_join_cwd() {
        assert_eq!(resolve_virtual("/", "pub").as_deref(), Some("/pub"));
        assert_eq!(resolve_virtual("/pub", "docs/rfc").as_deref(), Some("/pub/docs/rfc"));
        assert_eq!(resolve_virtual("/pub/docs", "..").as_deref(), Some("/pub"));
    }

    #[test]
    fn test_dots_and_slashes_are_normalized() {
        assert_eq!(resolve_virtual("/", "./pub//docs/./").as_deref(), Some("/pub/docs"));
        assert_eq!(resolve_virtual("/a/b", "../../c").as_deref(), Some("/c"));
        assert_eq!(resolve_virtual("/a", "b/../..").as_deref(), Some("/"));
    }

    #[test]
    fn test_climbing_above_root_is_rejected() {
        assert_eq!(resolve_virtual("/", ".."), None);
        assert_eq!(resolve_virtual("/pub", "../.."), None);
        assert_eq!(resolve_virtual("/pub", "/../etc"), None);
        assert_eq!(resolve_virtual("/", "pub/../../etc"), None);
    }

    #[test]
    fn test_quote_path_doubles_quotes() {
        assert_eq!(quote_path("/"), "\"/\"");
        assert_eq!(quote_path("/say \"hi\""), "\"/say \"\"hi\"\"\"");
    }
}

//! Path helpers for command-line arguments

use std::path::PathBuf;

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables leave the input unchanged.
///
/// # Examples
///
/// ```ignore
/// let root = paths::expand("~/vault-config");
/// let params = paths::expand("$CONFIG_DIR/_vaultwright.json");
/// ```
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_relative() {
        assert_eq!(expand("./config"), PathBuf::from("./config"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAULTWRIGHT_VAR_12345/file");
        assert_eq!(
            result,
            PathBuf::from("/path/$NONEXISTENT_VAULTWRIGHT_VAR_12345/file")
        );
    }
}

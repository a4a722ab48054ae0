//! Noise-path filter shared by the crawler and the count reconciler.
//!
//! Entries matching these patterns never appear in the tree or in any
//! count, regardless of nesting depth.

/// Directories that are never descended into.
const SKIP_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "bower_components",
    "vendor",
    "target",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    "__pycache__",
    ".venv",
    "venv",
    ".idea",
    ".vscode",
    "coverage",
    ".cache",
];

/// Files excluded by exact name (lockfiles and editor droppings).
const SKIP_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "poetry.lock",
    "Pipfile.lock",
    "Gemfile.lock",
    "composer.lock",
    ".DS_Store",
    "Thumbs.db",
];

/// Files excluded by suffix (minified and source-map artifacts).
const SKIP_SUFFIXES: &[&str] = &[".min.js", ".min.css", ".map"];

/// Whether a directory with this base name is noise.
pub fn is_noise_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name)
}

/// Whether a file with this base name is noise.
pub fn is_noise_file(name: &str) -> bool {
    SKIP_FILES.contains(&name) || SKIP_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Whether a slash-separated path touches noise at any level. Used by the
/// flattened listing, where intermediate directories arrive as path
/// segments rather than discrete entries.
pub fn is_noise_path(path: &str, is_dir: bool) -> bool {
    let mut segments = path.split('/').peekable();
    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        if !last || is_dir {
            if is_noise_dir(segment) {
                return true;
            }
        }
        if last && !is_dir && is_noise_file(segment) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_matched_by_name() {
        assert!(is_noise_dir("node_modules"));
        assert!(is_noise_dir(".git"));
        assert!(!is_noise_dir("src"));
    }

    #[test]
    fn files_are_matched_by_name_and_suffix() {
        assert!(is_noise_file("package-lock.json"));
        assert!(is_noise_file("app.min.js"));
        assert!(is_noise_file("bundle.js.map"));
        assert!(!is_noise_file("main.js"));
    }

    #[test]
    fn nested_noise_is_caught_at_any_depth() {
        assert!(is_noise_path("src/node_modules/lodash/index.js", false));
        assert!(is_noise_path("a/b/c/.git", true));
        assert!(is_noise_path("deep/path/vendor.min.js", false));
        assert!(!is_noise_path("src/lib/parser.rs", false));
    }

    #[test]
    fn file_named_like_a_skip_dir_is_kept() {
        // A *file* named "build" is not build output.
        assert!(!is_noise_path("scripts/build", false));
        assert!(is_noise_path("scripts/build", true));
    }
}

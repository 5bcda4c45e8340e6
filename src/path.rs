//! Path model: name rules, single-segment resolution and display paths.
//!
//! Shell-level navigation is one segment per command. Full paths only appear
//! in rendered form (`vfs:/USERS/guest/Documents`), which the snapshot format
//! and the trash ledger store and [`parse_rendered`] turns back into segments.

use crate::config::Limits;
use crate::errors::CoreError;
use crate::tree::{DirId, Tree};

/// Prefix of every rendered path.
pub const VOLUME_LABEL: &str = "vfs:";

/// Separator between rendered path segments.
pub const SEPARATOR: char = '/';

const FORBIDDEN_CHARS: [char; 4] = ['/', '\\', '|', ':'];

/// Case-insensitive name comparison used for every sibling lookup.
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Checks that `name` can be used for a file or directory.
pub fn validate_name(name: &str, limits: &Limits) -> crate::Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.len() > limits.max_name_len {
        Some("name is too long")
    } else if matches!(name, "." | ".." | "~") {
        Some("name is reserved")
    } else if name.chars().any(|c| FORBIDDEN_CHARS.contains(&c) || c.is_control()) {
        Some("name contains a forbidden character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CoreError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Resolves one navigation token against `cwd`.
///
/// `""` and `"~"` go home, `".."` goes up (staying put at the root), `"."`
/// stays, anything else must be an immediate child directory of `cwd`.
pub fn resolve(tree: &Tree, cwd: DirId, home: DirId, token: &str) -> crate::Result<DirId> {
    match token.trim() {
        "" | "~" => Ok(home),
        "." => Ok(cwd),
        ".." => Ok(tree.parent(cwd).unwrap_or(cwd)),
        name => tree
            .find_child(cwd, name)
            .ok_or_else(|| CoreError::not_found(name)),
    }
}

/// Segment names from the root down to `dir`, root excluded.
pub fn segments(tree: &Tree, dir: DirId) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = Some(dir);
    while let Some(id) = current {
        let parent = tree.parent(id);
        if parent.is_some() {
            names.push(tree.name(id).to_string());
        }
        current = parent;
    }
    names.reverse();
    names
}

/// Full display path of `dir`, e.g. `vfs:/USERS/guest`.
pub fn render(tree: &Tree, dir: DirId) -> String {
    let mut rendered = String::from(VOLUME_LABEL);
    rendered.push(SEPARATOR);
    rendered.push_str(&segments(tree, dir).join(&SEPARATOR.to_string()));
    rendered
}

/// Display path of an entry named `name` inside `dir`.
pub fn render_child(tree: &Tree, dir: DirId, name: &str) -> String {
    let mut rendered = render(tree, dir);
    if !rendered.ends_with(SEPARATOR) {
        rendered.push(SEPARATOR);
    }
    rendered.push_str(name);
    rendered
}

/// Splits a rendered path back into its segments.
pub fn parse_rendered(path: &str) -> crate::Result<Vec<&str>> {
    let rest = path
        .strip_prefix(VOLUME_LABEL)
        .ok_or_else(|| CoreError::invalid_input(format!("path {path:?} does not start with {VOLUME_LABEL}")))?;
    Ok(rest.split(SEPARATOR).filter(|segment| !segment.is_empty()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, DirId, DirId) {
        let mut tree = Tree::new(Limits::default());
        let users = tree.add_directory(tree.root(), "USERS").unwrap();
        let guest = tree.add_directory(users, "guest").unwrap();
        (tree, users, guest)
    }

    #[test]
    fn render_walks_to_root() {
        let (tree, users, guest) = sample();
        assert_eq!(render(&tree, tree.root()), "vfs:/");
        assert_eq!(render(&tree, users), "vfs:/USERS");
        assert_eq!(render(&tree, guest), "vfs:/USERS/guest");
        assert_eq!(render_child(&tree, tree.root(), "a.txt"), "vfs:/a.txt");
        assert_eq!(render_child(&tree, guest, "a.txt"), "vfs:/USERS/guest/a.txt");
    }

    #[test]
    fn parse_inverts_render() {
        let (tree, _, guest) = sample();
        let rendered = render(&tree, guest);
        let segments = parse_rendered(&rendered).unwrap();
        assert_eq!(segments, vec!["USERS", "guest"]);
        assert!(parse_rendered("C:/USERS").is_err());
    }

    #[test]
    fn resolve_handles_special_tokens() {
        let (tree, users, guest) = sample();
        assert_eq!(resolve(&tree, users, guest, "").unwrap(), guest);
        assert_eq!(resolve(&tree, users, guest, "~").unwrap(), guest);
        assert_eq!(resolve(&tree, guest, guest, "..").unwrap(), users);
        assert_eq!(resolve(&tree, tree.root(), guest, "..").unwrap(), tree.root());
        assert_eq!(resolve(&tree, tree.root(), guest, "users").unwrap(), users);
        assert!(matches!(
            resolve(&tree, tree.root(), guest, "missing"),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn names_are_validated() {
        let limits = Limits::default();
        assert!(validate_name("notes.txt", &limits).is_ok());
        for bad in ["", "..", "~", "a/b", "a|b", "a\\b", "c:", "tab\there"] {
            assert!(validate_name(bad, &limits).is_err(), "{bad:?} should be rejected");
        }
        assert!(validate_name(&"x".repeat(limits.max_name_len + 1), &limits).is_err());
    }

    #[test]
    fn names_match_ignores_case() {
        assert!(names_match("Foo", "foo"));
        assert!(names_match("ÄRGER", "ärger"));
        assert!(!names_match("foo", "food"));
    }
}

// src/watch/path_utils.rs

use std::path::Path;

/// Root-relative form of a watcher event path, with forward slashes, as the
/// unit patterns expect it (`src/styles/a.scss`).
///
/// Event paths normally start with the root we watch. Some platforms report
/// a different absolute prefix for the same directory (`/private/var` on
/// macOS, symlinked checkouts), so on a mismatch both sides are
/// canonicalized and compared again. A path that has been removed cannot be
/// canonicalized; its parent is used instead.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slashed(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };

    path_canon.strip_prefix(&root_canon).ok().map(slashed)
}

fn slashed(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

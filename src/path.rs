use std::path::{Path, PathBuf};

/// Strips repeated leading `./` and `../` fragments from a sample path, the
/// way the source strips a file's own relative-path noise before joining it
/// to the load path.
pub fn strip_leading_relative(path: &str) -> &str {
    let mut rest = path;
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        } else {
            break;
        }
    }
    rest
}

/// Resolves a `load wav <filename>` argument against the compiler's load
/// path, defaulting the load path to the current working directory the
/// first time it is needed.
pub fn resolve_sample_path(load_path: &Option<PathBuf>, filename: &str) -> std::io::Result<PathBuf> {
    let base = match load_path {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    Ok(base.join(strip_leading_relative(filename)))
}

pub fn default_load_path() -> std::io::Result<PathBuf> {
    std::env::current_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_repeated_relative_prefixes() {
        assert_eq!(strip_leading_relative("./sample.wav"), "sample.wav");
        assert_eq!(strip_leading_relative("../../sample.wav"), "sample.wav");
        assert_eq!(strip_leading_relative("./../sample.wav"), "sample.wav");
        assert_eq!(strip_leading_relative("plain.wav"), "plain.wav");
    }

    #[test]
    fn joins_to_explicit_load_path() {
        let base = Some(Path::new("/sounds").to_path_buf());
        let resolved = resolve_sample_path(&base, "./kick.wav").unwrap();
        assert_eq!(resolved, Path::new("/sounds/kick.wav"));
    }
}

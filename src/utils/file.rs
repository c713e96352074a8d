use anyhow::Result;
use std::path::Path;

/// Last `/`-separated component of `path`; empty when `path` ends in a slash.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Joins `name` onto the directory `dir` using `/` separators, the way remote
/// SCP paths are written.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", trimmed, name)
    }
}

/// Where `source` lands inside `destination`: only the file name is kept.
pub fn destination_for(source: &str, destination: &str) -> String {
    join(destination, file_name(source))
}

pub fn ensure_parent_dir<P: AsRef<Path>>(file_path: P) -> Result<()> {
    if let Some(parent) = file_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_sources_into_destination() {
        assert_eq!(destination_for("/a/b/x.txt", "/out"), "/out/x.txt");
        assert_eq!(destination_for("/c/y.txt", "/out/"), "/out/y.txt");
        assert_eq!(destination_for("z.txt", "/"), "/z.txt");
        assert_eq!(destination_for("dir/z.txt", "rel"), "rel/z.txt");
        assert_eq!(destination_for("dir/z.txt", ""), "z.txt");
    }

    #[test]
    fn file_name_of_directory_path_is_empty() {
        assert_eq!(file_name("/a/b/"), "");
        assert_eq!(file_name("plain"), "plain");
    }

    #[test]
    fn creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested/deeper/file.bin");
        ensure_parent_dir(&file).unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
        ensure_parent_dir("bare-name").unwrap();
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `bytes` beside `path` first and renames into place, so readers never see a torn file.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, bytes)?;
    replace_file(&tmp_path, path)
}

pub fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    write_bytes_atomic(path, text.as_bytes())
}

fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("output");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn write_creates_parent_dirs_and_replaces_existing() {
        let temp = TempDir::new().expect("temp");
        let target = temp.path().join("out").join("snapshot.json");

        write_text_atomic(&target, "first").expect("first write");
        write_text_atomic(&target, "second").expect("second write");

        assert_eq!(fs::read_to_string(&target).expect("read"), "second");
        assert!(!temp_path_for(&target).exists());
    }

    #[test]
    fn temp_path_sits_beside_target() {
        let tmp = temp_path_for(Path::new("dir/snapshot.json"));
        assert_eq!(tmp, Path::new("dir").join("snapshot.json.tmp"));
    }
}

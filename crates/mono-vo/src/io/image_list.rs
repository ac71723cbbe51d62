use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ImageListError {
    #[error("cannot read image list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Frame paths from a text file, one per non-blank line.
///
/// Lines are trimmed; entries are not checked for existence.
pub fn read_image_list(path: impl AsRef<Path>) -> Result<Vec<PathBuf>, ImageListError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ImageListError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_image_list(&raw))
}

pub fn parse_image_list(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_lines_and_trims() {
        let list = parse_image_list("a.png\n\n  b.png  \r\n\t\nc d.jpg\n");
        assert_eq!(
            list,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b.png"),
                PathBuf::from("c d.jpg")
            ]
        );
    }

    #[test]
    fn empty_file_has_no_frames() {
        assert!(parse_image_list("").is_empty());
        assert!(parse_image_list("\n  \n").is_empty());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_image_list("/definitely/not/here.txt").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }
}

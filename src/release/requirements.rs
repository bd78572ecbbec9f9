//! Requirement pin rewriting in the main repo.
//!
//! The main repo pins `zulip` and `zulip_bots` to a git ref of the API
//! repository. `prod.txt` and `dev.txt` carry plain pins, `common.in` carries
//! editable ones.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::VersionFileError;
use crate::version::{GitRef, ReleaseVersion};

use super::version_files::{read_file, rewrite_lines, write_file};

const API_REPO_URL: &str = "git+https://github.com/zulip/python-zulip-api.git";
const API_REPO_MARKER: &str = "python-zulip-api";

/// Requirement files rewritten in the main repo, relative to its root.
pub const REQUIREMENT_FILES: [&str; 3] = [
    "requirements/common.in",
    "requirements/prod.txt",
    "requirements/dev.txt",
];

/// How a requirement file spells its pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinStyle {
    Plain,
    Editable,
}

impl PinStyle {
    fn for_file(path: &Path) -> Self {
        if path.extension().is_some_and(|ext| ext == "in") {
            PinStyle::Editable
        } else {
            PinStyle::Plain
        }
    }
}

/// Pin line for one package, newline-terminated.
pub fn pin_line(name: &str, version: &ReleaseVersion, git_ref: &GitRef, style: PinStyle) -> String {
    let url = format!(
        "{}@{}#egg={}=={}+git&subdirectory={}",
        API_REPO_URL, git_ref, name, version, name
    );
    match style {
        PinStyle::Plain => format!("{}\n", url),
        PinStyle::Editable => format!("-e \"{}\"\n", url),
    }
}

/// Absolute paths of the requirement files under `main_repo`.
pub fn requirement_paths(main_repo: &Path) -> Vec<PathBuf> {
    REQUIREMENT_FILES.iter().map(|f| main_repo.join(f)).collect()
}

/// Rewrite the `zulip` and `zulip_bots` pins in one requirement file.
///
/// Both pins must be present; otherwise the file is left untouched and
/// [`VersionFileError::MarkerNotFound`] names the missing one.
pub fn update_requirements_file(
    path: &Path,
    version: &ReleaseVersion,
    git_ref: &GitRef,
) -> Result<(), VersionFileError> {
    let content = read_file(path)?;
    let new_content = rewrite_pins(path, &content, version, git_ref)?;
    write_file(path, &new_content)?;
    info!("Updated API package pins in {} to {}.", path.display(), git_ref);
    Ok(())
}

/// Rewrite every requirement file of the main repo.
///
/// All files are checked before any is written, so a missing pin leaves the
/// main repo untouched.
pub fn update_requirements_in_main_repo(
    main_repo: &Path,
    version: &ReleaseVersion,
    git_ref: &GitRef,
) -> Result<Vec<PathBuf>, VersionFileError> {
    let paths = requirement_paths(main_repo);

    let mut rewritten = Vec::with_capacity(paths.len());
    for path in &paths {
        let content = read_file(path)?;
        rewritten.push(rewrite_pins(path, &content, version, git_ref)?);
    }

    for (path, content) in paths.iter().zip(&rewritten) {
        write_file(path, content)?;
        info!("Updated API package pins in {} to {}.", path.display(), git_ref);
    }

    Ok(paths)
}

fn rewrite_pins(
    path: &Path,
    content: &str,
    version: &ReleaseVersion,
    git_ref: &GitRef,
) -> Result<String, VersionFileError> {
    let style = PinStyle::for_file(path);
    let zulip_line = pin_line("zulip", version, git_ref, style);
    let bots_line = pin_line("zulip_bots", version, git_ref, style);

    let mut saw_zulip = false;
    let mut saw_bots = false;

    let rewritten = rewrite_lines(content, |line| {
        if !line.contains(API_REPO_MARKER) {
            return None;
        }
        if line.contains("zulip==") {
            saw_zulip = true;
            Some(zulip_line.clone())
        } else if line.contains("zulip_bots") {
            saw_bots = true;
            Some(bots_line.clone())
        } else {
            None
        }
    });

    let missing = match (saw_zulip, saw_bots) {
        (false, _) => Some("zulip"),
        (true, false) => Some("zulip_bots"),
        (true, true) => None,
    };
    if let Some(marker) = missing {
        return Err(VersionFileError::MarkerNotFound {
            path: path.to_path_buf(),
            marker: marker.to_string(),
        });
    }

    Ok(rewritten.unwrap_or_else(|| content.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::CommitHash;
    use std::fs;

    fn version() -> ReleaseVersion {
        "0.4.0".parse().unwrap()
    }

    #[test]
    fn test_plain_pin_for_tag() {
        let v = version();
        let line = pin_line("zulip", &v, &GitRef::new(&v, None), PinStyle::Plain);
        assert_eq!(
            line,
            "git+https://github.com/zulip/python-zulip-api.git@0.4.0#egg=zulip==0.4.0+git&subdirectory=zulip\n"
        );
    }

    #[test]
    fn test_editable_pin_for_commit() {
        let v = version();
        let hash: CommitHash = "804501610b6a205334e71b4e441fca60acf650da".parse().unwrap();
        let line = pin_line(
            "zulip_bots",
            &v,
            &GitRef::new(&v, Some(&hash)),
            PinStyle::Editable,
        );
        assert_eq!(
            line,
            "-e \"git+https://github.com/zulip/python-zulip-api.git@804501610b6a205334e71b4e441fca60acf650da#egg=zulip_bots==0.4.0+git&subdirectory=zulip_bots\"\n"
        );
    }

    #[test]
    fn test_pin_style_from_extension() {
        assert_eq!(PinStyle::for_file(Path::new("requirements/common.in")), PinStyle::Editable);
        assert_eq!(PinStyle::for_file(Path::new("requirements/prod.txt")), PinStyle::Plain);
    }

    #[test]
    fn test_update_file_rewrites_only_api_pins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prod.txt");
        fs::write(
            &path,
            "\
Django==1.11.6 \\
    --hash=sha256:abc
git+https://github.com/zulip/python-zulip-api.git@0.3.9#egg=zulip==0.3.9+git&subdirectory=zulip
git+https://github.com/zulip/python-zulip-api.git@0.3.9#egg=zulip_bots==0.3.9+git&subdirectory=zulip_bots
zulip-helper==1.0
",
        )
        .unwrap();

        let v = version();
        update_requirements_file(&path, &v, &GitRef::new(&v, None)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Django==1.11.6 \\\n    --hash=sha256:abc\n"));
        assert!(content.contains("@0.4.0#egg=zulip==0.4.0+git&subdirectory=zulip\n"));
        assert!(content.contains("@0.4.0#egg=zulip_bots==0.4.0+git&subdirectory=zulip_bots\n"));
        assert!(content.ends_with("zulip-helper==1.0\n"));
        assert!(!content.contains("0.3.9"));
    }

    #[test]
    fn test_update_file_missing_bots_pin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.txt");
        let original =
            "git+https://github.com/zulip/python-zulip-api.git@0.3.9#egg=zulip==0.3.9+git&subdirectory=zulip\n";
        fs::write(&path, original).unwrap();

        let v = version();
        let err = update_requirements_file(&path, &v, &GitRef::new(&v, None)).unwrap_err();

        assert!(matches!(
            err,
            VersionFileError::MarkerNotFound { ref marker, .. } if marker == "zulip_bots"
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }
}

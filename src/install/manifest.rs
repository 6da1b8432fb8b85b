//! Package manifest parsing and filtering.
//!
//! The manifest is a line-oriented requirements file of unknown provenance:
//! editors on Windows save it as UTF-16 or with a BOM often enough that
//! decoding runs through a fallback chain of encodings, first one that
//! decodes cleanly wins.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use std::path::{Path, PathBuf};

use crate::error::{FlightdeckError, Result};

/// Default manifest file name under the project root.
pub const MANIFEST_FILE: &str = "requirements.txt";

/// File name of the derived (filtered) manifest in the scratch directory.
pub const DERIVED_FILE: &str = "requirements-derived.txt";

/// Packages only applicable on Windows, elided elsewhere.
const WINDOWS_ONLY: &[&str] = &["pywin32", "wmi"];

/// Packages stripped from the bulk manifest because they are installed
/// through their own pipelines: the CUDA-variant PyTorch pair, and the
/// OpenCV builds handled by the native compilation step.
const SEPARATELY_HANDLED: &[&str] = &[
    "torch",
    "torchvision",
    "opencv-python",
    "opencv-contrib-python",
];

/// Decoding attempts, in priority order. Windows-1252 accepts any byte
/// sequence, which mirrors the permissive tail of the original chain.
const ENCODINGS: &[&'static Encoding] = &[UTF_8, UTF_16LE, UTF_16BE, WINDOWS_1252];

/// One package declaration from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Distribution name.
    pub name: String,

    /// Pinned version, when the line used `name==version` syntax.
    pub version: Option<String>,
}

impl PackageSpec {
    /// Parse a single manifest line. Returns `None` for blanks and comments.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            return None;
        }

        match line.split_once("==") {
            Some((name, version)) => Some(Self {
                name: name.trim().to_string(),
                version: Some(version.trim().to_string()),
            }),
            None => Some(Self {
                name: line.to_string(),
                version: None,
            }),
        }
    }

    /// Requirement string as the installer expects it.
    pub fn requirement(&self) -> String {
        match &self.version {
            Some(version) => format!("{}=={}", self.name, version),
            None => self.name.clone(),
        }
    }

    fn is_windows_only(&self) -> bool {
        WINDOWS_ONLY
            .iter()
            .any(|w| w.eq_ignore_ascii_case(&self.name))
    }

    fn is_separately_handled(&self) -> bool {
        SEPARATELY_HANDLED
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&self.name))
    }
}

/// An ordered package manifest.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub packages: Vec<PackageSpec>,
}

/// Result of filtering a manifest for the bulk installer.
#[derive(Debug, Clone, Default)]
pub struct FilteredManifest {
    /// Entries the bulk installer should process.
    pub install: Vec<PackageSpec>,

    /// Entries elided because they target another platform family.
    pub platform_skipped: Vec<PackageSpec>,
}

impl Manifest {
    /// Read and decode a manifest file.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FlightdeckError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path)?;
        let text = decode_with_fallback(&bytes).ok_or(FlightdeckError::ManifestUndecodable {
            path: path.to_path_buf(),
        })?;

        Ok(Self::parse(&text))
    }

    /// Parse manifest text into package declarations.
    pub fn parse(text: &str) -> Self {
        Self {
            packages: text.lines().filter_map(PackageSpec::parse).collect(),
        }
    }

    /// Strip separately-handled packages, and platform-inapplicable
    /// packages when not targeting Windows.
    pub fn filter_for_install(&self, targeting_windows: bool) -> FilteredManifest {
        let mut filtered = FilteredManifest::default();
        for package in &self.packages {
            if package.is_separately_handled() {
                continue;
            }
            if !targeting_windows && package.is_windows_only() {
                filtered.platform_skipped.push(package.clone());
                continue;
            }
            filtered.install.push(package.clone());
        }
        filtered
    }
}

impl FilteredManifest {
    /// Materialize the derived manifest into the scratch directory.
    pub fn write_derived(&self, scratch_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(scratch_dir)?;
        let path = scratch_dir.join(DERIVED_FILE);
        let mut contents = String::new();
        for package in &self.install {
            contents.push_str(&package.requirement());
            contents.push('\n');
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

/// Decode bytes with the first encoding that produces no errors.
pub fn decode_with_fallback(bytes: &[u8]) -> Option<String> {
    for encoding in ENCODINGS {
        let (text, used, had_errors) = encoding.decode(bytes);
        if !had_errors {
            tracing::debug!("manifest decoded as {}", used.name());
            return Some(text.into_owned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pinned_and_bare_lines() {
        let manifest = Manifest::parse("numpy==1.24.3\ntqdm\n");
        assert_eq!(manifest.packages.len(), 2);
        assert_eq!(manifest.packages[0].name, "numpy");
        assert_eq!(manifest.packages[0].version.as_deref(), Some("1.24.3"));
        assert_eq!(manifest.packages[0].requirement(), "numpy==1.24.3");
        assert_eq!(manifest.packages[1].requirement(), "tqdm");
    }

    #[test]
    fn comments_and_blanks_are_ignored() {
        let manifest = Manifest::parse("# deps\n\n// legacy comment\nnumpy\n");
        assert_eq!(manifest.packages.len(), 1);
        assert_eq!(manifest.packages[0].name, "numpy");
    }

    #[test]
    fn order_is_preserved() {
        let manifest = Manifest::parse("b\na\nc\n");
        let names: Vec<_> = manifest.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn filter_strips_separately_handled_packages() {
        let manifest = Manifest::parse("numpy\ntorch\ntorchvision\nopencv-python\neasyocr\n");
        let filtered = manifest.filter_for_install(false);
        let names: Vec<_> = filtered.install.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["numpy", "easyocr"]);
    }

    #[test]
    fn filter_elides_windows_only_packages_off_windows() {
        let manifest = Manifest::parse("numpy\npywin32\nWMI\n");
        let filtered = manifest.filter_for_install(false);
        let names: Vec<_> = filtered.install.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["numpy"]);
        assert_eq!(filtered.platform_skipped.len(), 2);
    }

    #[test]
    fn filter_keeps_windows_only_packages_on_windows() {
        let manifest = Manifest::parse("numpy\npywin32\n");
        let filtered = manifest.filter_for_install(true);
        assert_eq!(filtered.install.len(), 2);
        assert!(filtered.platform_skipped.is_empty());
    }

    #[test]
    fn decode_utf8() {
        assert_eq!(
            decode_with_fallback("numpy==1.24.3\n".as_bytes()).unwrap(),
            "numpy==1.24.3\n"
        );
    }

    #[test]
    fn decode_utf8_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"numpy\n");
        assert_eq!(decode_with_fallback(&bytes).unwrap(), "numpy\n");
    }

    #[test]
    fn decode_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "numpy\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_with_fallback(&bytes).unwrap(), "numpy\n");
    }

    #[test]
    fn decode_falls_back_to_windows_1252() {
        // 0xE9 is é in Windows-1252 but invalid UTF-8.
        let bytes = b"caf\xe9\n";
        assert_eq!(decode_with_fallback(bytes).unwrap(), "café\n");
    }

    #[test]
    fn read_missing_manifest_is_fatal() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = Manifest::read(&temp.path().join("requirements.txt")).unwrap_err();
        assert!(matches!(err, FlightdeckError::ManifestNotFound { .. }));
    }

    #[test]
    fn read_decodes_file_from_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("requirements.txt");
        std::fs::write(&path, "numpy==1.24.3\n# comment\ntqdm\n").unwrap();

        let manifest = Manifest::read(&path).unwrap();
        assert_eq!(manifest.packages.len(), 2);
    }

    #[test]
    fn derived_manifest_lands_in_scratch() {
        let temp = tempfile::TempDir::new().unwrap();
        let manifest = Manifest::parse("numpy==1.24.3\ntorch\npywin32\n");
        let filtered = manifest.filter_for_install(false);

        let path = filtered.write_derived(&temp.path().join(".tmp")).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "numpy==1.24.3\n");
        assert!(path.ends_with(".tmp/requirements-derived.txt"));
    }
}

//! Windows-to-POSIX path normalization.
//!
//! Paths typed on Windows (`C:\data\query.sql`) are rewritten to the WSL
//! mount convention (`/mnt/c/data/query.sql`). Relative paths and paths that
//! are already POSIX-absolute pass through untouched.

use thiserror::Error;
use tracing::{debug, warn};

/// Default directory under which Windows drives are mounted.
pub const DEFAULT_MOUNT_ROOT: &str = "/mnt";

/// Drive directory used by [`DriveMapping::Fixed`] by default.
pub const DEFAULT_DRIVE: char = 'c';

/// How a Windows drive is mapped to a directory under the mount root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMapping {
    /// Every drive maps to the same directory, whatever letter was given.
    ///
    /// `D:\x` and `C:\x` both land under `/mnt/c`. This is wrong on machines
    /// with more than one drive, but it is what existing callers rely on.
    Fixed(char),

    /// The drive letter is lowercased and used as the directory (`D:\x` -> `/mnt/d/x`).
    PerDrive,
}

impl Default for DriveMapping {
    fn default() -> Self {
        Self::Fixed(DEFAULT_DRIVE)
    }
}

/// Errors raised while parsing a path under Windows rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathSyntaxError {
    #[error("path contains a NUL byte")]
    NulByte,

    #[error("drive '{0}:' has no letter to mount")]
    InvalidDrive(char),

    #[error("incomplete UNC prefix, expected \\\\server\\share")]
    IncompleteUnc,

    #[error("UNC path \\\\{server}\\{share} has no drive letter to mount")]
    UncWithoutDrive { server: String, share: String },
}

/// The prefix component of a Windows path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowsPrefix<'a> {
    /// `C:`
    Drive(char),
    /// `\\server\share`
    Unc { server: &'a str, share: &'a str },
}

/// A path decomposed under Windows rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowsPath<'a> {
    pub prefix: Option<WindowsPrefix<'a>>,
    pub has_root: bool,
    pub segments: Vec<&'a str>,
}

impl WindowsPath<'_> {
    /// Absolute means a prefix and a root: `C:\x` and `\\srv\share\x` are, `C:x` and `\x` are not.
    pub fn is_absolute(&self) -> bool {
        match self.prefix {
            Some(WindowsPrefix::Drive(_)) => self.has_root,
            Some(WindowsPrefix::Unc { .. }) => true,
            None => false,
        }
    }
}

fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

/// Parses `path` under Windows path-syntax rules.
///
/// Both `\` and `/` are separators after the prefix. Empty and `.` segments
/// are dropped, `..` is kept as-is.
pub fn parse_windows_path(path: &str) -> Result<WindowsPath<'_>, PathSyntaxError> {
    if path.contains('\0') {
        return Err(PathSyntaxError::NulByte);
    }

    // Verbatim paths (`\\?\C:\x`) behave like their plain drive form.
    let path = path.strip_prefix(r"\\?\").unwrap_or(path);

    // Only `\\` opens a UNC prefix; `//x` stays a POSIX path.
    let (prefix, rest) = if path.starts_with(r"\\") {
        let mut parts = path[2..].splitn(3, is_separator);
        let server = parts.next().unwrap_or_default();
        let share = parts.next().unwrap_or_default();
        if server.is_empty() || share.is_empty() {
            return Err(PathSyntaxError::IncompleteUnc);
        }
        let rest = parts.next().unwrap_or_default();
        (Some(WindowsPrefix::Unc { server, share }), rest)
    } else {
        let mut chars = path.chars();
        match (chars.next(), chars.next()) {
            // Any character before the colon is a drive designator (`1:\x` included).
            (Some(letter), Some(':')) => {
                (Some(WindowsPrefix::Drive(letter)), &path[letter.len_utf8() + 1..])
            }
            _ => (None, path),
        }
    };

    let has_root = match prefix {
        Some(WindowsPrefix::Unc { .. }) => true,
        _ => rest.starts_with(is_separator),
    };

    let segments = rest
        .split(is_separator)
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    Ok(WindowsPath {
        prefix,
        has_root,
        segments,
    })
}

/// Rewrites Windows-absolute paths into host (POSIX) syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNormalizer {
    mount_root: String,
    mapping: DriveMapping,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self {
            mount_root: DEFAULT_MOUNT_ROOT.to_string(),
            mapping: DriveMapping::default(),
        }
    }
}

impl PathNormalizer {
    /// Creates a normalizer with the `/mnt/c` mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory under which drives are mounted.
    pub fn with_mount_root(mut self, root: impl Into<String>) -> Self {
        let root = root.into();
        let trimmed = root.trim_end_matches('/');
        self.mount_root = if trimmed.is_empty() {
            String::new()
        } else {
            trimmed.to_string()
        };
        self
    }

    /// Sets how drive letters map to mount directories.
    pub fn with_mapping(mut self, mapping: DriveMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn mount_root(&self) -> &str {
        &self.mount_root
    }

    pub fn mapping(&self) -> DriveMapping {
        self.mapping
    }

    /// Normalizes `path`, reporting parse failures as errors.
    pub fn try_normalize(&self, path: &str) -> Result<String, PathSyntaxError> {
        let parsed = parse_windows_path(path)?;
        if !parsed.is_absolute() {
            return Ok(path.to_string());
        }

        let drive_dir = match self.mapping {
            DriveMapping::Fixed(letter) => letter.to_ascii_lowercase(),
            DriveMapping::PerDrive => match &parsed.prefix {
                Some(WindowsPrefix::Drive(letter)) if letter.is_ascii_alphabetic() => {
                    letter.to_ascii_lowercase()
                }
                Some(WindowsPrefix::Drive(other)) => {
                    return Err(PathSyntaxError::InvalidDrive(*other));
                }
                Some(WindowsPrefix::Unc { server, share }) => {
                    return Err(PathSyntaxError::UncWithoutDrive {
                        server: server.to_string(),
                        share: share.to_string(),
                    });
                }
                None => return Ok(path.to_string()),
            },
        };

        let mut normalized = format!("{}/{}", self.mount_root, drive_dir);
        for segment in &parsed.segments {
            normalized.push('/');
            normalized.push_str(segment);
        }

        debug!("Normalized path {} -> {}", path, normalized);
        Ok(normalized)
    }

    /// Normalizes `path`, falling back to the input unchanged if it cannot be parsed.
    pub fn normalize(&self, path: &str) -> String {
        match self.try_normalize(path) {
            Ok(normalized) => normalized,
            Err(e) => {
                warn!("Could not normalize path {:?}: {}; using it unchanged", path, e);
                path.to_string()
            }
        }
    }
}

/// Normalizes `path` with the default `/mnt/c` mapping.
pub fn normalize(path: &str) -> String {
    PathNormalizer::default().normalize(path)
}

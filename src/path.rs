//! Win32 path facade.
//!
//! [`PathInfo`] wraps a [`ParsedPath`] and exposes its parts (root, directory, file
//! name, extension) as slices of the normalized text, computed from the component
//! boundary table on each call.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use crate::{
    PATH_SEPARATOR, WinFsResult,
    errors::WinFsError,
    parser::{self, ParsedPath, RootForm},
};

const CURRENT_DIR: &str = ".";
const PARENT_DIR: &str = "..";

/// A parsed and normalized Win32 path.
///
/// Two `PathInfo` values are equal when their [`PathInfo::path`] texts are equal under
/// case-insensitive ordinal comparison, matching how NTFS compares names.
#[derive(Debug, Clone)]
pub struct PathInfo {
    parsed: ParsedPath,
}

impl PathInfo {
    /// Parses `path`, rejecting wildcards anywhere in it.
    pub fn new(path: &str) -> WinFsResult<Self> {
        Ok(PathInfo {
            parsed: parser::parse(path, false)?,
        })
    }

    /// Parses `path`, allowing `*` and `?` in the file name.
    pub fn with_wildcards(path: &str) -> WinFsResult<Self> {
        Ok(PathInfo {
            parsed: parser::parse(path, true)?,
        })
    }

    pub fn parsed(&self) -> &ParsedPath {
        &self.parsed
    }

    pub fn root_form(&self) -> RootForm {
        self.parsed.root_form
    }

    /// The normalized text, including a trailing separator for directory paths.
    pub fn full_path(&self) -> &str {
        &self.parsed.normalized
    }

    /// The normalized text without a trailing separator. A root keeps its separator.
    pub fn path(&self) -> &str {
        let text = self.full_path();
        if text.len() > self.parsed.root_end() && text.ends_with(PATH_SEPARATOR) {
            &text[..text.len() - 1]
        } else {
            text
        }
    }

    /// The root: `C:\`, `\\server\share\`, `\\?\C:\`, `\`, `C:` or empty.
    pub fn root(&self) -> &str {
        &self.parsed.normalized[..self.parsed.root_end()]
    }

    pub fn is_rooted(&self) -> bool {
        self.parsed.root_end() > 0
    }

    pub fn has_file_name(&self) -> bool {
        self.parsed.file_name_start() < self.parsed.normalized.len()
    }

    /// The last component when it is not followed by a separator, otherwise empty.
    pub fn file_name(&self) -> &str {
        &self.parsed.normalized[self.parsed.file_name_start()..]
    }

    pub fn has_extension(&self) -> bool {
        self.parsed.extension_boundary() < self.parsed.normalized.len()
    }

    /// The extension of the file name, without the leading dot.
    pub fn extension(&self) -> &str {
        &self.parsed.normalized[self.parsed.extension_boundary()..]
    }

    pub fn file_name_without_extension(&self) -> &str {
        if self.has_extension() {
            let start = self.parsed.file_name_start();
            let dot = self.parsed.extension_boundary() - 1;
            &self.parsed.normalized[start..dot]
        } else {
            self.file_name()
        }
    }

    /// Everything before the file name, without a trailing separator unless the
    /// directory is the root itself.
    pub fn directory_name(&self) -> &str {
        let directory = &self.parsed.normalized[..self.parsed.file_name_start()];
        if directory.len() > self.parsed.root_end() {
            directory.strip_suffix(PATH_SEPARATOR).unwrap_or(directory)
        } else {
            directory
        }
    }

    /// [`PathInfo::directory_name`] with the root removed.
    pub fn directory_name_without_root(&self) -> &str {
        let directory =
            &self.parsed.normalized[self.parsed.root_end()..self.parsed.file_name_start()];
        directory.strip_suffix(PATH_SEPARATOR).unwrap_or(directory)
    }

    /// Directory names after the root, followed by the file name if there is one.
    pub fn components(&self) -> impl Iterator<Item = &str> + '_ {
        let text = &self.parsed.normalized;
        self.parsed
            .component_boundaries
            .windows(2)
            .map(move |pair| text[pair[0]..pair[1]].trim_end_matches(PATH_SEPARATOR))
            .chain(self.has_file_name().then(|| self.file_name()))
    }

    /// The containing directory.
    ///
    /// A file path loses its file name; a directory path loses its last directory;
    /// a root is its own parent. A relative path made only of `..` climbs one more level,
    /// and an emptied relative path is written `.\`, the way the parser writes it.
    pub fn parent(&self) -> PathInfo {
        let boundaries = &self.parsed.component_boundaries;
        let count = boundaries.len();

        if self.has_file_name() {
            return self.truncated(self.parsed.file_name_start(), count);
        }

        if count < 2 {
            return self.clone();
        }

        let last_directory = &self.parsed.normalized[boundaries[count - 2]..boundaries[count - 1]];
        let last_directory = last_directory.trim_end_matches(PATH_SEPARATOR);
        if last_directory == CURRENT_DIR {
            return self.relative_directory(PARENT_DIR);
        }
        if last_directory == PARENT_DIR {
            let mut normalized = self.parsed.normalized.clone();
            normalized.push_str(PARENT_DIR);
            normalized.push(PATH_SEPARATOR);
            let mut component_boundaries = boundaries.clone();
            component_boundaries.push(normalized.len());
            return PathInfo {
                parsed: ParsedPath {
                    normalized,
                    component_boundaries,
                    extension_boundary: None,
                    root_form: self.parsed.root_form,
                },
            };
        }

        self.truncated(boundaries[count - 2], count - 1)
    }

    fn truncated(&self, end: usize, boundary_count: usize) -> PathInfo {
        if end == 0 {
            return self.relative_directory(CURRENT_DIR);
        }
        PathInfo {
            parsed: ParsedPath {
                normalized: self.parsed.normalized[..end].to_string(),
                component_boundaries: self.parsed.component_boundaries[..boundary_count].to_vec(),
                extension_boundary: None,
                root_form: self.parsed.root_form,
            },
        }
    }

    /// A relative path made of the single directory `name`.
    fn relative_directory(&self, name: &str) -> PathInfo {
        let mut normalized = String::with_capacity(name.len() + 1);
        normalized.push_str(name);
        normalized.push(PATH_SEPARATOR);
        let component_boundaries = vec![0, normalized.len()];
        PathInfo {
            parsed: ParsedPath {
                normalized,
                component_boundaries,
                extension_boundary: None,
                root_form: self.parsed.root_form,
            },
        }
    }

    /// Combines two paths.
    ///
    /// If `b` is rooted, or `a` is empty, the result is `b`. Otherwise the texts are
    /// joined with a separator and the result is parsed again, with wildcards allowed
    /// in the file name.
    pub fn combine(a: &PathInfo, b: &PathInfo) -> WinFsResult<PathInfo> {
        if b.is_rooted() || a.full_path().is_empty() {
            return Ok(b.clone());
        }

        let mut text = String::with_capacity(a.full_path().len() + 1 + b.full_path().len());
        text.push_str(a.full_path());
        // `C:` + `x` names `C:x` on the current directory of drive C.
        if !text.ends_with(PATH_SEPARATOR) && !text.ends_with(':') {
            text.push(PATH_SEPARATOR);
        }
        text.push_str(b.full_path());

        PathInfo::with_wildcards(&text)
    }

    /// Parses `other` and combines it with this path.
    pub fn join(&self, other: &str) -> WinFsResult<PathInfo> {
        let other = PathInfo::with_wildcards(other)?;
        PathInfo::combine(self, &other)
    }
}

fn uppercase_chars(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().flat_map(char::to_uppercase)
}

impl PartialEq for PathInfo {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathInfo {}

impl PartialOrd for PathInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        uppercase_chars(self.path()).cmp(uppercase_chars(other.path()))
    }
}

impl Hash for PathInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in uppercase_chars(self.path()) {
            c.hash(state);
        }
    }
}

impl fmt::Display for PathInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for PathInfo {
    type Err = WinFsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathInfo::new(s)
    }
}

impl From<ParsedPath> for PathInfo {
    fn from(parsed: ParsedPath) -> Self {
        PathInfo { parsed }
    }
}

impl AsRef<str> for PathInfo {
    fn as_ref(&self) -> &str {
        self.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn accessors_test() -> WinFsResult<()> {
        let path = PathInfo::new(r"C:\Users\Public\report.final.docx")?;
        assert_eq!(path.root(), r"C:\");
        assert!(path.is_rooted());
        assert!(path.has_file_name());
        assert_eq!(path.file_name(), "report.final.docx");
        assert_eq!(path.file_name_without_extension(), "report.final");
        assert!(path.has_extension());
        assert_eq!(path.extension(), "docx");
        assert_eq!(path.directory_name(), r"C:\Users\Public");
        assert_eq!(path.directory_name_without_root(), r"Users\Public");
        assert_eq!(
            path.components().collect::<Vec<_>>(),
            vec!["Users", "Public", "report.final.docx"]
        );
        Ok(())
    }

    #[test]
    fn directory_path_accessors_test() -> WinFsResult<()> {
        let path = PathInfo::new(r"C:\Users\Public\")?;
        assert_eq!(path.full_path(), r"C:\Users\Public\");
        assert_eq!(path.path(), r"C:\Users\Public");
        assert!(!path.has_file_name());
        assert_eq!(path.file_name(), "");
        assert_eq!(path.extension(), "");
        assert_eq!(path.directory_name(), r"C:\Users\Public");

        let root = PathInfo::new(r"C:\")?;
        assert_eq!(root.path(), r"C:\");
        assert_eq!(root.directory_name(), r"C:\");
        assert_eq!(root.directory_name_without_root(), "");
        assert_eq!(root.components().count(), 0);
        Ok(())
    }

    #[test]
    fn relative_path_accessors_test() -> WinFsResult<()> {
        let path = PathInfo::new("notes.txt")?;
        assert!(!path.is_rooted());
        assert_eq!(path.root(), "");
        assert_eq!(path.directory_name(), "");
        assert_eq!(path.file_name_without_extension(), "notes");
        Ok(())
    }

    #[test]
    fn normalization_examples_test() -> WinFsResult<()> {
        assert_eq!(PathInfo::new(r"C:\a\b\..\c")?.path(), r"C:\a\c");
        assert_eq!(PathInfo::new(r"..\..\foo")?.path(), r"..\..\foo");
        assert_eq!(PathInfo::new(r"C:\..")?.path(), r"C:\");
        assert_eq!(
            PathInfo::new(r"\\Server\Share\dir\file.txt")?.root(),
            r"\\Server\Share\"
        );
        assert_eq!(PathInfo::new(r"\\?\C:\Windows")?.root(), r"\\?\C:\");

        let trailing_dot = PathInfo::new(r"C:\file.")?;
        assert_eq!(trailing_dot.extension(), "");
        assert_eq!(trailing_dot.file_name(), "file");
        assert!(!trailing_dot.has_extension());
        Ok(())
    }

    #[test]
    fn parent_test() -> WinFsResult<()> {
        let file = PathInfo::new(r"C:\a\b\file.txt")?;
        let parent = file.parent();
        assert_eq!(parent.full_path(), r"C:\a\b\");
        assert!(!parent.has_file_name());

        let grandparent = parent.parent();
        assert_eq!(grandparent.full_path(), r"C:\a\");
        assert_eq!(grandparent.parent().full_path(), r"C:\");
        assert_eq!(grandparent.parent().parent().full_path(), r"C:\");

        let unc = PathInfo::new(r"\\server\share\dir")?;
        assert_eq!(unc.parent().full_path(), r"\\server\share\");
        assert_eq!(unc.parent().parent().full_path(), r"\\server\share\");
        Ok(())
    }

    #[test]
    fn parent_of_relative_test() -> WinFsResult<()> {
        let up = PathInfo::new(r"..\")?;
        assert_eq!(up.parent().full_path(), r"..\..\");

        let file = PathInfo::new("file.txt")?;
        assert_eq!(file.parent().full_path(), r".\");
        assert_eq!(file.parent().components().collect::<Vec<_>>(), vec!["."]);

        let current = PathInfo::new(".")?;
        assert_eq!(current.parent().full_path(), r"..\");
        assert_eq!(current.parent().parent().full_path(), r"..\..\");
        Ok(())
    }

    #[test]
    fn emptied_relative_parent_matches_parser_test() -> WinFsResult<()> {
        let parent = PathInfo::new(r"a\")?.parent();
        assert_eq!(parent, PathInfo::new(r"a\..")?);
        assert_eq!(parent.full_path(), r".\");
        assert_eq!(parent.parsed().component_boundaries(), &[0, 2]);

        for text in [r"a\", "file.txt", ".", r"a\b.txt", r"..\x"] {
            let parent = PathInfo::new(text)?.parent();
            let reparsed = parser::parse(parent.full_path(), false)?;
            assert_eq!(reparsed.normalized(), parent.full_path(), "{text}");
        }
        Ok(())
    }

    #[test]
    fn parent_recomputes_extension_test() -> WinFsResult<()> {
        let path = PathInfo::new(r"C:\dir.v2\file")?;
        let parent = path.parent();
        assert!(!parent.has_extension());
        assert_eq!(parent.extension(), "");
        Ok(())
    }

    #[test]
    fn combine_test() -> WinFsResult<()> {
        let base = PathInfo::new(r"C:\data")?;
        let rel = PathInfo::new(r"logs\..\out\result.csv")?;
        assert_eq!(PathInfo::combine(&base, &rel)?.path(), r"C:\data\out\result.csv");

        let dir = PathInfo::new(r"C:\data\")?;
        assert_eq!(PathInfo::combine(&dir, &rel)?.path(), r"C:\data\out\result.csv");

        let rooted = PathInfo::new(r"D:\other")?;
        assert_eq!(PathInfo::combine(&base, &rooted)?, rooted);

        let drive_relative = PathInfo::new("C:")?;
        let name = PathInfo::new("x.txt")?;
        assert_eq!(PathInfo::combine(&drive_relative, &name)?.path(), "C:x.txt");

        let pattern = base.join("*.log")?;
        assert_eq!(pattern.file_name(), "*.log");
        Ok(())
    }

    #[test]
    fn combine_with_current_directory_test() -> WinFsResult<()> {
        let current = PathInfo::new("file.txt")?.parent();
        let name = PathInfo::new("other.txt")?;
        let combined = PathInfo::combine(&current, &name)?;
        assert_eq!(combined.path(), "other.txt");
        assert_eq!(combined, name);
        Ok(())
    }

    #[test]
    fn dot_file_has_no_stem_test() -> WinFsResult<()> {
        let path = PathInfo::new(r"C:\repo\.gitignore")?;
        assert_eq!(path.file_name(), ".gitignore");
        assert!(path.has_extension());
        assert_eq!(path.extension(), "gitignore");
        assert_eq!(path.file_name_without_extension(), "");
        Ok(())
    }

    #[test]
    fn combine_parent_inverse_test() -> WinFsResult<()> {
        for text in [
            r"C:\a\b\c.txt",
            r"\\server\share\dir\file",
            r"\\?\C:\Windows\notepad.exe",
            r"\\?\Volume{5d1a2f3e-0b4c-11ee-9a7b-806e6f6e6963}\x.bin",
            "file.txt",
            r"..\up.txt",
        ] {
            let path = PathInfo::new(text)?;
            let name = PathInfo::new(path.file_name())?;
            let combined = PathInfo::combine(&path.parent(), &name)?;
            assert_eq!(combined.path(), path.path(), "{text}");
        }
        Ok(())
    }

    #[test]
    fn combine_rejects_invalid_result_test() -> WinFsResult<()> {
        let base = PathInfo::new(r"C:\data")?;
        assert!(matches!(
            base.join(r"*\file"),
            Err(WinFsError::InvalidPathError(_))
        ));
        Ok(())
    }

    #[test]
    fn case_insensitive_equality_test() -> WinFsResult<()> {
        let lower = PathInfo::new(r"c:\windows\system32\")?;
        let upper = PathInfo::new(r"C:\WINDOWS\System32")?;
        assert_eq!(lower, upper);

        let mut set = HashSet::new();
        set.insert(lower);
        assert!(set.contains(&upper));

        let a = PathInfo::new(r"C:\alpha")?;
        let b = PathInfo::new(r"c:\BETA")?;
        assert!(a < b);
        Ok(())
    }

    #[test]
    fn display_and_from_str_test() -> WinFsResult<()> {
        let path: PathInfo = r"C:/temp/./x/".parse()?;
        assert_eq!(path.to_string(), r"C:\temp\x");
        Ok(())
    }
}

//! Win32 path tokenizer.
//!
//! Splits a path string into its root and components in a single left-to-right scan,
//! resolving `.` and `..` on the way and validating every component against the
//! reserved file name character table.
//!
//! The result is a [`ParsedPath`]: the normalized text plus a table of component
//! boundaries, which [`crate::path::PathInfo`] uses to slice out roots, directories,
//! file names and extensions without re-scanning.

use crate::{
    ALT_PATH_SEPARATOR, LONG_PATH_PREFIX, PATH_SEPARATOR, UNC_PREFIX, WinFsResult,
    errors::WinFsError,
};

/// Wildcard characters, accepted only in the file name and only on request.
pub const WILDCARD_CHARS: [char; 2] = ['*', '?'];

/// Characters that can never appear in a file or directory name.
///
/// Control characters U+0000 through U+001F are rejected in addition to this table.
pub const INVALID_FILE_NAME_CHARS: [char; 9] = ['"', '<', '>', '|', ':', '*', '?', '\\', '/'];

const CURRENT_DIR: &str = ".";
const PARENT_DIR: &str = "..";
const GLOBALROOT: &str = "GLOBALROOT";
const UNC_KEYWORD: &str = "UNC";
const VOLUME_PREFIX: &str = "Volume{";
const GUID_GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// Returns true for both the canonical and the alternate directory separator.
pub fn is_separator(c: char) -> bool {
    c == PATH_SEPARATOR || c == ALT_PATH_SEPARATOR
}

/// Returns true if `c` may not appear in a file name.
///
/// Wildcards count as invalid here; callers that accept wildcards check them first.
pub fn is_invalid_file_name_char(c: char) -> bool {
    (c as u32) < 0x20 || INVALID_FILE_NAME_CHARS.contains(&c)
}

/// The form of the root that prefixes a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootForm {
    /// No root: `dir\file.txt`, `..\file.txt`.
    Relative,
    /// A single separator, rooted on the current drive: `\dir`.
    CurrentDrive,
    /// A drive letter, with or without a trailing separator: `C:\dir`, `C:dir`.
    Drive,
    /// `\\server\share\`.
    Unc,
    /// The bare long path prefix: `\\?\`.
    LongPath,
    /// `\\?\C:\`.
    LongPathDrive,
    /// `\\?\UNC\server\share\`.
    LongPathUnc,
    /// `\\?\Volume{xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx}\`.
    VolumeGuid,
    /// `\\?\GLOBALROOT\Device\Name\`.
    GlobalRoot,
}

/// The output of [`parse`].
///
/// `component_boundaries[0]` is the end of the root. Every further entry is the
/// offset just after an emitted separator, so the last entry is either the start
/// of the file name or `normalized.len()` when there is no file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub(crate) normalized: String,
    pub(crate) component_boundaries: Vec<usize>,
    pub(crate) extension_boundary: Option<usize>,
    pub(crate) root_form: RootForm,
}

impl ParsedPath {
    /// The normalized path text.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn component_boundaries(&self) -> &[usize] {
        &self.component_boundaries
    }

    pub fn root_form(&self) -> RootForm {
        self.root_form
    }

    /// Offset of the end of the root, 0 for relative paths.
    pub fn root_end(&self) -> usize {
        self.component_boundaries.first().copied().unwrap_or(0)
    }

    /// Offset of the start of the file name, equal to the text length if there is none.
    pub fn file_name_start(&self) -> usize {
        self.component_boundaries.last().copied().unwrap_or(0)
    }

    /// Offset of the character following the last `.` of the file name, or the text
    /// length when the file name has no extension.
    ///
    /// Paths derived from another path (see [`crate::path::PathInfo::parent`]) do not
    /// carry a precomputed boundary; it is derived here from the file name.
    pub fn extension_boundary(&self) -> usize {
        self.extension_boundary
            .unwrap_or_else(|| find_extension_boundary(&self.normalized, self.file_name_start()))
    }
}

fn find_extension_boundary(normalized: &str, file_name_start: usize) -> usize {
    normalized
        .get(file_name_start..)
        .and_then(|file_name| file_name.rfind('.'))
        .map_or(normalized.len(), |dot| file_name_start + dot + 1)
}

/// Parses and normalizes a Win32 path.
///
/// # Arguments
/// * `path` - The path text. Both `\` and `/` are accepted as separators.
/// * `allow_wildcards_in_file_name` - Whether `*` and `?` may appear in the final component.
///
/// # Errors
/// Returns [`WinFsError::InvalidPathError`] if the path is empty, has a malformed root,
/// contains an empty component, or contains a character that is not valid where it appears.
pub fn parse(path: &str, allow_wildcards_in_file_name: bool) -> WinFsResult<ParsedPath> {
    if path.is_empty() {
        return Err(WinFsError::invalid_path("path is empty", path));
    }

    let mut scanner = Scanner::new(path);
    let mut builder = PathBuilder::default();

    let root_form = scanner.match_root(&mut builder.normalized)?;
    builder.component_boundaries.push(builder.normalized.len());

    scanner.scan_components(&mut builder, allow_wildcards_in_file_name)?;

    Ok(builder.finish(root_form))
}

/// A name being accumulated between two separators.
#[derive(Default)]
struct Component {
    text: String,
    has_wildcard: bool,
    has_invalid_char: bool,
}

impl Component {
    fn push(&mut self, c: char) {
        if WILDCARD_CHARS.contains(&c) {
            self.has_wildcard = true;
        } else if is_invalid_file_name_char(c) {
            self.has_invalid_char = true;
        }
        self.text.push(c);
    }

    fn clear(&mut self) {
        self.text.clear();
        self.has_wildcard = false;
        self.has_invalid_char = false;
    }
}

#[derive(Default)]
struct PathBuilder {
    normalized: String,
    component_boundaries: Vec<usize>,
}

impl PathBuilder {
    fn is_rooted(&self) -> bool {
        self.component_boundaries.first().is_some_and(|&end| end > 0)
    }

    /// Returns whether the last emitted directory is itself `..`, or `None` if no
    /// directory follows the root.
    fn last_directory_is_parent_ref(&self) -> Option<bool> {
        let count = self.component_boundaries.len();
        if count < 2 {
            return None;
        }
        let start = self.component_boundaries[count - 2];
        let end = self.component_boundaries[count - 1];
        let directory = &self.normalized[start..end];
        Some(directory.trim_end_matches(PATH_SEPARATOR) == PARENT_DIR)
    }

    fn push_directory(&mut self, name: &str) {
        self.normalized.push_str(name);
        self.normalized.push(PATH_SEPARATOR);
        self.component_boundaries.push(self.normalized.len());
    }

    fn pop_directory(&mut self) {
        self.component_boundaries.pop();
        let end = self.component_boundaries.last().copied().unwrap_or(0);
        self.normalized.truncate(end);
    }

    /// Applies a `..` component.
    fn resolve_parent(&mut self) {
        match self.last_directory_is_parent_ref() {
            Some(false) => self.pop_directory(),
            // Nothing left to collapse into: keep `..` literally.
            Some(true) => self.push_directory(PARENT_DIR),
            // The root is its own parent.
            None if self.is_rooted() => {}
            None => self.push_directory(PARENT_DIR),
        }
    }

    fn finish(mut self, root_form: RootForm) -> ParsedPath {
        if !self.is_rooted() && self.normalized.is_empty() {
            self.push_directory(CURRENT_DIR);
        }

        let file_name_start = self.component_boundaries.last().copied().unwrap_or(0);
        let extension_boundary = find_extension_boundary(&self.normalized, file_name_start);

        ParsedPath {
            normalized: self.normalized,
            component_boundaries: self.component_boundaries,
            extension_boundary: Some(extension_boundary),
            root_form,
        }
    }
}

struct Scanner<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn is_separator_at(&self, offset: usize) -> bool {
        self.peek(offset).is_some_and(is_separator)
    }

    fn error(&self, reason: &str) -> WinFsError {
        WinFsError::invalid_path(reason, self.input)
    }

    fn match_root(&mut self, out: &mut String) -> WinFsResult<RootForm> {
        if self.is_separator_at(0) && self.is_separator_at(1) {
            if self.peek(2) == Some('?') {
                if !self.is_separator_at(3) {
                    return Err(self.error("incomplete long path prefix"));
                }
                self.pos += 4;
                out.push_str(LONG_PATH_PREFIX);
                return self.match_long_path_root(out);
            }

            self.pos += 2;
            out.push_str(UNC_PREFIX);
            self.match_server_share(out)?;
            return Ok(RootForm::Unc);
        }

        if self.is_separator_at(0) {
            self.pos += 1;
            out.push(PATH_SEPARATOR);
            return Ok(RootForm::CurrentDrive);
        }

        if self.match_drive(out) {
            return Ok(RootForm::Drive);
        }

        Ok(RootForm::Relative)
    }

    /// Dispatches on what follows `\\?\`.
    fn match_long_path_root(&mut self, out: &mut String) -> WinFsResult<RootForm> {
        if self.match_drive(out) {
            return Ok(RootForm::LongPathDrive);
        }

        if self.match_volume_guid(out) {
            return Ok(RootForm::VolumeGuid);
        }

        if self.match_keyword(GLOBALROOT) {
            out.push_str(GLOBALROOT);
            out.push(PATH_SEPARATOR);
            self.match_server_share(out)?;
            return Ok(RootForm::GlobalRoot);
        }

        if self.match_keyword(UNC_KEYWORD) {
            out.push_str(UNC_KEYWORD);
            out.push(PATH_SEPARATOR);
            self.match_server_share(out)?;
            return Ok(RootForm::LongPathUnc);
        }

        Ok(RootForm::LongPath)
    }

    /// Matches `X:` and an optional separator.
    fn match_drive(&mut self, out: &mut String) -> bool {
        match (self.peek(0), self.peek(1)) {
            (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => {
                out.push(letter);
                out.push(':');
                self.pos += 2;
                if self.is_separator_at(0) {
                    out.push(PATH_SEPARATOR);
                    self.pos += 1;
                }
                true
            }
            _ => false,
        }
    }

    /// Matches `keyword` (case-insensitive) followed by a separator, consuming both.
    fn match_keyword(&mut self, keyword: &str) -> bool {
        let len = keyword.chars().count();
        let matches = keyword
            .chars()
            .enumerate()
            .all(|(i, expected)| self.peek(i).is_some_and(|c| c.eq_ignore_ascii_case(&expected)));

        if matches && self.is_separator_at(len) {
            self.pos += len + 1;
            return true;
        }
        false
    }

    /// Matches `Volume{8-4-4-4-12}` followed by a separator or the end of the input.
    fn match_volume_guid(&mut self, out: &mut String) -> bool {
        let mut offset = 0;
        for expected in VOLUME_PREFIX.chars() {
            match self.peek(offset) {
                Some(c) if c.eq_ignore_ascii_case(&expected) => offset += 1,
                _ => return false,
            }
        }

        let guid_start = offset;
        for (group, len) in GUID_GROUPS.iter().enumerate() {
            if group > 0 {
                if self.peek(offset) != Some('-') {
                    return false;
                }
                offset += 1;
            }
            for _ in 0..*len {
                if !self.peek(offset).is_some_and(|c| c.is_ascii_hexdigit()) {
                    return false;
                }
                offset += 1;
            }
        }
        let guid_end = offset;

        if self.peek(offset) != Some('}') {
            return false;
        }
        offset += 1;

        match self.peek(offset) {
            None => {}
            Some(c) if is_separator(c) => offset += 1,
            Some(_) => return false,
        }

        out.push_str(VOLUME_PREFIX);
        out.extend(&self.chars[self.pos + guid_start..self.pos + guid_end]);
        out.push('}');
        out.push(PATH_SEPARATOR);
        self.pos += offset;
        true
    }

    /// Consumes characters up to the next separator or the end of the input.
    fn take_segment(&mut self) -> Component {
        let mut segment = Component::default();
        while let Some(c) = self.peek(0) {
            if is_separator(c) {
                break;
            }
            segment.push(c);
            self.pos += 1;
        }
        segment
    }

    /// Matches `server\share` with an optional trailing separator. The emitted root
    /// always ends with a separator.
    fn match_server_share(&mut self, out: &mut String) -> WinFsResult<()> {
        let server = self.take_segment();
        if server.text.is_empty() {
            return Err(self.error("UNC path is missing the server name"));
        }
        if server.has_wildcard || server.has_invalid_char {
            return Err(self.error("illegal character in server name"));
        }
        if !self.is_separator_at(0) {
            return Err(self.error("UNC path is missing the share name"));
        }
        self.pos += 1;

        let share = self.take_segment();
        if share.text.is_empty() {
            return Err(self.error("UNC path is missing the share name"));
        }
        if share.has_wildcard || share.has_invalid_char {
            return Err(self.error("illegal character in share name"));
        }
        if self.is_separator_at(0) {
            self.pos += 1;
        }

        out.push_str(&server.text);
        out.push(PATH_SEPARATOR);
        out.push_str(&share.text);
        out.push(PATH_SEPARATOR);
        Ok(())
    }

    fn scan_components(
        &mut self,
        builder: &mut PathBuilder,
        allow_wildcards_in_file_name: bool,
    ) -> WinFsResult<()> {
        let mut component = Component::default();

        while let Some(c) = self.peek(0) {
            self.pos += 1;

            if !is_separator(c) {
                component.push(c);
                continue;
            }

            match component.text.as_str() {
                "" => return Err(self.error("empty path component")),
                CURRENT_DIR => {}
                PARENT_DIR => builder.resolve_parent(),
                name => {
                    if component.has_wildcard {
                        return Err(self.error("wildcards are only allowed in the file name"));
                    }
                    if component.has_invalid_char {
                        return Err(self.error("illegal character in directory name"));
                    }
                    builder.push_directory(name);
                }
            }
            component.clear();
        }

        match component.text.as_str() {
            "" | CURRENT_DIR => {}
            PARENT_DIR => builder.resolve_parent(),
            name => {
                if component.has_invalid_char {
                    return Err(self.error("illegal character in file name"));
                }
                if component.has_wildcard && !allow_wildcards_in_file_name {
                    return Err(self.error("wildcards are not allowed"));
                }
                // Windows ignores trailing dots, so `file.` names `file`.
                builder.normalized.push_str(name.trim_end_matches('.'));
            }
        }

        Ok(())
    }
}

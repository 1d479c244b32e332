/*
MIT License

Copyright (c) 2023 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Normalization of entry names.

/// Conventions of the platform a name was produced on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PathStyle {
    /// `/` separated, no drive prefix.
    Unix,
    /// `\` separated, optionally starting with a drive letter like `C:`.
    Windows,
    /// `\` separated, starting with a volume name like `SYS:`.
    NetWare,
}

impl PathStyle {
    /// The style of the platform this crate was built for.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// The platform's path separator.
    #[must_use]
    pub const fn separator(self) -> char {
        match self {
            Self::Unix => '/',
            Self::Windows | Self::NetWare => '\\',
        }
    }
}

/// Turns a platform file name into a Tar entry name: drive or volume
/// prefixes are removed, separators become `/` and, unless
/// `preserve_leading_slashes` is set, leading slashes are stripped.
#[must_use]
pub fn normalize_file_name(name: &str, preserve_leading_slashes: bool, style: PathStyle) -> String {
    let mut name = name;
    match style {
        PathStyle::Windows => {
            let bytes = name.as_bytes();
            if bytes.len() > 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
                name = &name[2..];
            }
        }
        PathStyle::NetWare => {
            if let Some(colon) = name.find(':') {
                name = &name[colon + 1..];
            }
        }
        PathStyle::Unix => {}
    }

    let mut name = name.replace(style.separator(), "/");
    if !preserve_leading_slashes {
        let leading = name.len() - name.trim_start_matches('/').len();
        name.replace_range(..leading, "");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_separators() {
        assert_eq!(normalize_file_name("a\\b\\c", false, PathStyle::Windows), "a/b/c");
        assert_eq!(normalize_file_name("C:\\dir\\f.txt", false, PathStyle::Windows), "dir/f.txt");
        // too short to carry a drive prefix
        assert_eq!(normalize_file_name("C:", false, PathStyle::Windows), "C:");
        assert_eq!(normalize_file_name("1:\\x", false, PathStyle::Windows), "1:/x");
    }

    #[test]
    fn test_unix_keeps_backslashes() {
        assert_eq!(normalize_file_name("a\\b", false, PathStyle::Unix), "a\\b");
    }

    #[test]
    fn test_netware_volume() {
        assert_eq!(normalize_file_name("SYS:\\public\\x", false, PathStyle::NetWare), "public/x");
    }

    #[test]
    fn test_leading_slashes() {
        assert_eq!(normalize_file_name("//foo", false, PathStyle::Unix), "foo");
        assert_eq!(normalize_file_name("//foo", true, PathStyle::Unix), "//foo");
        assert_eq!(normalize_file_name("\\\\foo\\bar", false, PathStyle::Windows), "foo/bar");
        assert_eq!(normalize_file_name("/", false, PathStyle::Unix), "");
    }
}

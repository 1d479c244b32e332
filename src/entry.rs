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
//! Module for [`TarEntry`], the in-memory form of one archive entry's
//! metadata.

use crate::encoding::{format_name_bytes, parse_name, FallbackEncoding, TextEncoding};
use crate::error::{Result, TarError};
use crate::header::{
    Field, InvalidTypeFlagError, ModeFlags, TarFormat, TypeFlag, CHKSUM, DEVMAJOR, DEVMINOR,
    GID, GNAME, GNU_ISEXTENDED, GNU_REALSIZE, LINKNAME, MAGIC, MODE, MTIME, NAME, PREFIX, SIZE,
    TYPEFLAG, UID, UNAME, VERSION, XSTAR_PREFIX,
};
use crate::path::{normalize_file_name, PathStyle};
use crate::tar_format_types::{
    compute_checksum, format_checksum, format_numeric_field, parse_octal_or_binary,
    verify_checksum,
};
use crate::BLOCKSIZE;
use core::hash::{Hash, Hasher};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Mode of directories created from a name: `drwxr-xr-x`.
pub const DEFAULT_DIR_MODE: u32 = 0o40755;
/// Mode of files created from a name: `-rw-r--r--`.
pub const DEFAULT_FILE_MODE: u32 = 0o100644;

/// Magic and version written by default (POSIX ustar).
const DEFAULT_MAGIC: &str = "ustar";
const DEFAULT_VERSION: &str = "00";
/// Magic and version of GNU meta entries.
const GNU_MAGIC: &str = "ustar ";
const GNU_VERSION: &str = " ";

/// Metadata of a single Tar archive entry.
///
/// An entry is built from a name ([`TarEntry::new`]), from a file on disk
/// ([`TarEntry::from_file`]) or from a header record
/// ([`TarEntry::from_header`]). Only the second kind is bound to a file,
/// see [`TarEntry::file`].
///
/// Two entries are equal if their names are equal.
#[derive(Debug, Clone)]
pub struct TarEntry {
    pub(crate) name: String,
    preserve_leading_slashes: bool,
    path_style: PathStyle,
    mode: u32,
    user_id: u64,
    group_id: u64,
    size: u64,
    /// Seconds since the epoch.
    mod_time: i64,
    checksum_ok: bool,
    type_flag: u8,
    link_name: String,
    magic: String,
    version: String,
    user_name: String,
    group_name: String,
    dev_major: u32,
    dev_minor: u32,
    is_extended: bool,
    pub(crate) real_size: u64,
    pub(crate) pax_gnu_sparse: bool,
    pub(crate) star_sparse: bool,
    file: Option<PathBuf>,
}

impl TarEntry {
    fn blank() -> Self {
        Self {
            name: String::new(),
            preserve_leading_slashes: false,
            path_style: PathStyle::native(),
            mode: 0,
            user_id: 0,
            group_id: 0,
            size: 0,
            mod_time: 0,
            checksum_ok: false,
            type_flag: TypeFlag::AREGTYPE.into(),
            link_name: String::new(),
            magic: DEFAULT_MAGIC.to_owned(),
            version: DEFAULT_VERSION.to_owned(),
            user_name: String::new(),
            group_name: String::new(),
            dev_major: 0,
            dev_minor: 0,
            is_extended: false,
            real_size: 0,
            pax_gnu_sparse: false,
            star_sparse: false,
            file: None,
        }
    }

    /// Creates an entry for `name` with leading slashes stripped. A name
    /// ending in `/` makes a directory, anything else a regular file. The
    /// modification time is the current time.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_leading_slashes(name, false)
    }

    /// Like [`Self::new`], but keeps leading slashes of `name` (and of all
    /// names set later) if `preserve_leading_slashes` is set.
    #[must_use]
    pub fn with_leading_slashes(name: &str, preserve_leading_slashes: bool) -> Self {
        Self::with_path_style(name, preserve_leading_slashes, PathStyle::native())
    }

    /// Like [`Self::with_leading_slashes`], but normalizes `name` (and all
    /// names set later) as a name of `path_style` instead of the platform's
    /// own style.
    #[must_use]
    pub fn with_path_style(
        name: &str,
        preserve_leading_slashes: bool,
        path_style: PathStyle,
    ) -> Self {
        let name = normalize_file_name(name, preserve_leading_slashes, path_style);
        let is_dir = name.ends_with('/');
        Self {
            name,
            preserve_leading_slashes,
            path_style,
            mode: if is_dir { DEFAULT_DIR_MODE } else { DEFAULT_FILE_MODE },
            type_flag: u8::from(if is_dir {
                TypeFlag::DIRTYPE
            } else {
                TypeFlag::REGTYPE
            }),
            mod_time: secs_since_epoch(SystemTime::now()),
            ..Self::blank()
        }
    }

    /// Creates an entry for `name` with an explicit typeflag byte. GNU long
    /// name entries get the GNU magic.
    #[must_use]
    pub fn with_type_flag(name: &str, type_flag: u8, preserve_leading_slashes: bool) -> Self {
        let mut entry = Self::with_leading_slashes(name, preserve_leading_slashes);
        entry.type_flag = type_flag;
        if type_flag == u8::from(TypeFlag::GNU_LONGNAME) {
            entry.magic = GNU_MAGIC.to_owned();
            entry.version = GNU_VERSION.to_owned();
        }
        entry
    }

    /// Creates an entry for a file on disk, named after its path.
    ///
    /// # Errors
    /// Returns [`TarError::Io`] if the file's metadata can't be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::from_file_with_name(path, &path.to_string_lossy())
    }

    /// Creates an entry for a file on disk under the given entry name.
    /// Attributes are copied now and not re-read later; only the
    /// [`Self::is_directory`] and [`Self::is_file`] checks consult the file
    /// again.
    ///
    /// # Errors
    /// Returns [`TarError::Io`] if the file's metadata can't be read.
    pub fn from_file_with_name(path: impl AsRef<Path>, name: &str) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        let mut name = normalize_file_name(name, false, PathStyle::native());

        let mut entry = Self {
            mod_time: secs_since_epoch(metadata.modified()?),
            file: Some(path.to_path_buf()),
            ..Self::blank()
        };
        if metadata.is_dir() {
            entry.mode = DEFAULT_DIR_MODE;
            entry.type_flag = TypeFlag::DIRTYPE.into();
            if !name.ends_with('/') {
                name.push('/');
            }
        } else {
            entry.mode = DEFAULT_FILE_MODE;
            entry.type_flag = TypeFlag::REGTYPE.into();
            entry.size = metadata.len();
        }
        entry.name = name;
        Ok(entry)
    }

    /// Creates an entry from a header record, see [`Self::parse_header`].
    ///
    /// # Errors
    /// Returns [`TarError::InvalidHeaderField`] for malformed numeric fields.
    pub fn from_header(header: &[u8; BLOCKSIZE], encoding: &dyn TextEncoding) -> Result<Self> {
        let mut entry = Self::blank();
        entry.parse_header(header, encoding)?;
        Ok(entry)
    }

    /// Reads all fields from a header record.
    ///
    /// Text fields are decoded with `encoding`. If that fails, the header
    /// is read again with [`FallbackEncoding`], which accepts any bytes.
    /// A checksum mismatch does not fail the parse, see
    /// [`Self::is_checksum_ok`]. On error the entry is left unchanged.
    ///
    /// # Errors
    /// Returns [`TarError::InvalidHeaderField`] for malformed numeric fields.
    pub fn parse_header(
        &mut self,
        header: &[u8; BLOCKSIZE],
        encoding: &dyn TextEncoding,
    ) -> Result<()> {
        match self.parse_header_strict(header, encoding) {
            Err(e) if e.is_encoding_error() => {
                log::debug!("{e}; reading header again with fallback encoding");
                self.parse_header_strict(header, &FallbackEncoding)
                    .map_err(escalate_encoding_error)
            }
            result => result,
        }
    }

    /// Like [`Self::parse_header`], but without the fallback encoding.
    ///
    /// # Errors
    /// Also returns [`TarError::UnsupportedEncoding`] if a text field is
    /// malformed in `encoding`.
    pub fn parse_header_strict(
        &mut self,
        header: &[u8; BLOCKSIZE],
        encoding: &dyn TextEncoding,
    ) -> Result<()> {
        let mut parsed = self.clone();
        parsed.read_fields(header, encoding)?;
        if !parsed.checksum_ok {
            log::warn!("checksum mismatch in header of {:?}", parsed.name);
        }
        *self = parsed;
        Ok(())
    }

    fn read_fields(&mut self, header: &[u8; BLOCKSIZE], encoding: &dyn TextEncoding) -> Result<()> {
        self.name = parse_name(NAME.slice(header), encoding)?;
        self.mode = read_numeric(header, MODE)?;
        self.user_id = read_numeric(header, UID)?;
        self.group_id = read_numeric(header, GID)?;
        self.size = read_numeric(header, SIZE)?;
        self.mod_time = read_numeric(header, MTIME)?;
        self.checksum_ok = verify_checksum(header);
        self.type_flag = header[TYPEFLAG.offset];
        self.link_name = parse_name(LINKNAME.slice(header), encoding)?;
        self.magic = parse_name(MAGIC.slice(header), &FallbackEncoding)?;
        self.version = parse_name(VERSION.slice(header), &FallbackEncoding)?;
        self.user_name = parse_name(UNAME.slice(header), encoding)?;
        self.group_name = parse_name(GNAME.slice(header), encoding)?;
        self.dev_major = read_numeric(header, DEVMAJOR)?;
        self.dev_minor = read_numeric(header, DEVMINOR)?;

        match TarFormat::detect(header) {
            TarFormat::OldGnu => {
                // atime, ctime and the sparse map are left to the sparse
                // stream reader
                self.is_extended = header[GNU_ISEXTENDED.offset] == 1;
                self.real_size = read_numeric(header, GNU_REALSIZE)?;
            }
            TarFormat::Xstar => {
                self.is_extended = false;
                self.real_size = 0;
                let prefix = parse_name(XSTAR_PREFIX.slice(header), encoding)?;
                if !prefix.is_empty() {
                    self.name = format!("{prefix}/{}", self.name);
                }
            }
            TarFormat::Posix | TarFormat::Legacy => {
                self.is_extended = false;
                self.real_size = 0;
                let prefix = parse_name(PREFIX.slice(header), encoding)?;
                if self.is_directory() && !self.name.ends_with('/') {
                    self.name.push('/');
                }
                if !prefix.is_empty() {
                    self.name = format!("{prefix}/{}", self.name);
                }
            }
        }
        Ok(())
    }

    /// Writes this entry into a header record.
    ///
    /// Text fields are encoded with `encoding`. If a field can't be
    /// represented in it, the whole header is written again with
    /// [`FallbackEncoding`].
    ///
    /// With `extended_numbers` set, numbers too large for octal text are
    /// written in binary (GNU/star) form. Without it they are written as
    /// zero; the caller is then expected to put the real values into a PAX
    /// extended header.
    ///
    /// # Errors
    /// Returns [`TarError::ValueOutOfRange`] in extended mode if a number
    /// does not even fit the binary form of its field.
    pub fn write_header(
        &self,
        buf: &mut [u8; BLOCKSIZE],
        encoding: &dyn TextEncoding,
        extended_numbers: bool,
    ) -> Result<()> {
        match self.write_header_strict(buf, encoding, extended_numbers) {
            Err(e) if e.is_encoding_error() => {
                log::debug!("{e}; writing header again with fallback encoding");
                self.write_header_strict(buf, &FallbackEncoding, extended_numbers)
                    .map_err(escalate_encoding_error)
            }
            result => result,
        }
    }

    /// Like [`Self::write_header`], but without the fallback encoding.
    /// `buf` is left untouched on error.
    ///
    /// # Errors
    /// Also returns [`TarError::UnsupportedEncoding`] if a text field can't
    /// be represented in `encoding`.
    pub fn write_header_strict(
        &self,
        buf: &mut [u8; BLOCKSIZE],
        encoding: &dyn TextEncoding,
        extended_numbers: bool,
    ) -> Result<()> {
        let mut block = [0; BLOCKSIZE];
        self.fill_header(&mut block, encoding, extended_numbers)?;
        *buf = block;
        Ok(())
    }

    fn fill_header(
        &self,
        buf: &mut [u8; BLOCKSIZE],
        encoding: &dyn TextEncoding,
        extended_numbers: bool,
    ) -> Result<()> {
        format_name_bytes(&self.name, NAME.slice_mut(buf), encoding)?;
        write_numeric(buf, MODE, self.mode, extended_numbers)?;
        write_numeric(buf, UID, self.user_id, extended_numbers)?;
        write_numeric(buf, GID, self.group_id, extended_numbers)?;
        write_numeric(buf, SIZE, self.size, extended_numbers)?;
        write_numeric(buf, MTIME, self.mod_time, extended_numbers)?;
        CHKSUM.slice_mut(buf).fill(b' ');
        buf[TYPEFLAG.offset] = self.type_flag;
        format_name_bytes(&self.link_name, LINKNAME.slice_mut(buf), encoding)?;
        format_name_bytes(&self.magic, MAGIC.slice_mut(buf), &FallbackEncoding)?;
        format_name_bytes(&self.version, VERSION.slice_mut(buf), &FallbackEncoding)?;
        format_name_bytes(&self.user_name, UNAME.slice_mut(buf), encoding)?;
        format_name_bytes(&self.group_name, GNAME.slice_mut(buf), encoding)?;
        write_numeric(buf, DEVMAJOR, self.dev_major, extended_numbers)?;
        write_numeric(buf, DEVMINOR, self.dev_minor, extended_numbers)?;

        match TarFormat::from_magic(&self.magic, &self.version) {
            TarFormat::Posix => {
                if let Some((prefix, name)) = split_ustar_name(&self.name, encoding)? {
                    format_name_bytes(name, NAME.slice_mut(buf), encoding)?;
                    format_name_bytes(prefix, PREFIX.slice_mut(buf), encoding)?;
                }
            }
            TarFormat::OldGnu => {
                buf[GNU_ISEXTENDED.offset] = u8::from(self.is_extended);
                write_numeric(buf, GNU_REALSIZE, self.real_size, extended_numbers)?;
            }
            TarFormat::Xstar | TarFormat::Legacy => {}
        }

        let checksum = compute_checksum(buf);
        format_checksum(checksum, CHKSUM.slice_mut(buf))
    }

    /// The entry's name, `/` separated.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the name, normalized the same way as on construction.
    pub fn set_name(&mut self, name: &str) {
        self.name = normalize_file_name(name, self.preserve_leading_slashes, self.path_style);
    }

    /// Style names given to this entry are normalized as.
    #[must_use]
    pub const fn path_style(&self) -> PathStyle {
        self.path_style
    }

    /// Whether leading slashes of names are kept.
    #[must_use]
    pub const fn preserves_leading_slashes(&self) -> bool {
        self.preserve_leading_slashes
    }

    /// Whether `other` lives below this entry, i.e. its name starts with
    /// this entry's name.
    #[must_use]
    pub fn is_descendent(&self, other: &Self) -> bool {
        other.name.starts_with(&self.name)
    }

    /// File type and permission bits.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    pub fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    /// The permission bits of [`Self::mode`].
    #[must_use]
    pub const fn mode_flags(&self) -> ModeFlags {
        ModeFlags::from_bits_truncate(self.mode)
    }

    /// Target of a hard or symbolic link.
    #[must_use]
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    pub fn set_link_name(&mut self, link_name: &str) {
        self.link_name = link_name.to_owned();
    }

    #[must_use]
    pub const fn user_id(&self) -> u64 {
        self.user_id
    }

    /// The user id truncated to 32 bits, for callers that predate 64 bit
    /// ids.
    #[must_use]
    pub const fn user_id_u32(&self) -> u32 {
        self.user_id as u32
    }

    pub fn set_user_id(&mut self, user_id: u64) {
        self.user_id = user_id;
    }

    #[must_use]
    pub const fn group_id(&self) -> u64 {
        self.group_id
    }

    /// The group id truncated to 32 bits, see [`Self::user_id_u32`].
    #[must_use]
    pub const fn group_id_u32(&self) -> u32 {
        self.group_id as u32
    }

    pub fn set_group_id(&mut self, group_id: u64) {
        self.group_id = group_id;
    }

    pub fn set_ids(&mut self, user_id: u64, group_id: u64) {
        self.user_id = user_id;
        self.group_id = group_id;
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn set_user_name(&mut self, user_name: &str) {
        self.user_name = user_name.to_owned();
    }

    #[must_use]
    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn set_group_name(&mut self, group_name: &str) {
        self.group_name = group_name.to_owned();
    }

    pub fn set_names(&mut self, user_name: &str, group_name: &str) {
        self.set_user_name(user_name);
        self.set_group_name(group_name);
    }

    /// Modification time in seconds since the epoch.
    #[must_use]
    pub const fn mod_time(&self) -> i64 {
        self.mod_time
    }

    pub fn set_mod_time(&mut self, secs: i64) {
        self.mod_time = secs;
    }

    /// Modification time, `None` if not representable as [`SystemTime`].
    #[must_use]
    pub fn last_modified(&self) -> Option<SystemTime> {
        let offset = Duration::from_secs(self.mod_time.unsigned_abs());
        if self.mod_time >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        }
    }

    /// Sets the modification time. Sub-second precision is dropped.
    pub fn set_last_modified(&mut self, time: SystemTime) {
        self.mod_time = secs_since_epoch(time);
    }

    /// Whether the checksum of the parsed header matched. Always `false`
    /// for entries that were not parsed.
    #[must_use]
    pub const fn is_checksum_ok(&self) -> bool {
        self.checksum_ok
    }

    /// The file this entry was built from, if any.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Size of the entry's data in the archive.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// # Errors
    /// Returns [`TarError::InvalidArgument`] for negative sizes.
    pub fn set_size(&mut self, size: i64) -> Result<()> {
        self.size = u64::try_from(size).map_err(|_| TarError::InvalidArgument {
            what: "size",
            value: size,
        })?;
        Ok(())
    }

    /// Raw typeflag byte, kept verbatim even if unknown.
    #[must_use]
    pub const fn type_flag(&self) -> u8 {
        self.type_flag
    }

    pub fn set_type_flag(&mut self, type_flag: u8) {
        self.type_flag = type_flag;
    }

    /// The typeflag as [`TypeFlag`].
    ///
    /// # Errors
    /// Returns an [`InvalidTypeFlagError`] for unknown typeflags.
    pub fn entry_type(&self) -> core::result::Result<TypeFlag, InvalidTypeFlagError> {
        TypeFlag::try_from(self.type_flag)
    }

    /// Format magic without trailing NUL bytes, e.g. `"ustar"`.
    #[must_use]
    pub fn magic(&self) -> &str {
        &self.magic
    }

    pub fn set_magic(&mut self, magic: &str) {
        self.magic = magic.to_owned();
    }

    /// Format version without trailing NUL bytes, e.g. `"00"`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_owned();
    }

    #[must_use]
    pub const fn dev_major(&self) -> u32 {
        self.dev_major
    }

    /// # Errors
    /// Returns [`TarError::InvalidArgument`] for negative device numbers.
    pub fn set_dev_major(&mut self, dev: i64) -> Result<()> {
        self.dev_major = device_number("major device number", dev)?;
        Ok(())
    }

    #[must_use]
    pub const fn dev_minor(&self) -> u32 {
        self.dev_minor
    }

    /// # Errors
    /// Returns [`TarError::InvalidArgument`] for negative device numbers.
    pub fn set_dev_minor(&mut self, dev: i64) -> Result<()> {
        self.dev_minor = device_number("minor device number", dev)?;
        Ok(())
    }

    /// Whether an old GNU sparse header is followed by extension blocks
    /// with more sparse map entries.
    #[must_use]
    pub const fn is_extended(&self) -> bool {
        self.is_extended
    }

    pub fn set_extended(&mut self, is_extended: bool) {
        self.is_extended = is_extended;
    }

    /// Logical size of a sparse file.
    #[must_use]
    pub const fn real_size(&self) -> u64 {
        self.real_size
    }

    pub fn set_real_size(&mut self, real_size: u64) {
        self.real_size = real_size;
    }

    #[must_use]
    pub fn is_gnu_sparse(&self) -> bool {
        self.is_old_gnu_sparse() || self.is_pax_gnu_sparse()
    }

    /// Old GNU sparse file, marked by its typeflag.
    #[must_use]
    pub fn is_old_gnu_sparse(&self) -> bool {
        self.type_flag == u8::from(TypeFlag::GNU_SPARSE)
    }

    /// GNU sparse file described by PAX headers.
    #[must_use]
    pub const fn is_pax_gnu_sparse(&self) -> bool {
        self.pax_gnu_sparse
    }

    /// Sparse file as written by star.
    #[must_use]
    pub const fn is_star_sparse(&self) -> bool {
        self.star_sparse
    }

    #[must_use]
    pub fn is_sparse(&self) -> bool {
        self.is_gnu_sparse() || self.is_star_sparse()
    }

    #[must_use]
    pub fn is_gnu_long_link_entry(&self) -> bool {
        self.type_flag == u8::from(TypeFlag::GNU_LONGLINK)
    }

    #[must_use]
    pub fn is_gnu_long_name_entry(&self) -> bool {
        self.type_flag == u8::from(TypeFlag::GNU_LONGNAME)
    }

    /// PAX extended header for the next entry (`x`, or `X` from Solaris).
    #[must_use]
    pub fn is_pax_header(&self) -> bool {
        self.entry_type().is_ok_and(TypeFlag::is_pax_header)
    }

    #[must_use]
    pub fn is_global_pax_header(&self) -> bool {
        self.type_flag == u8::from(TypeFlag::XGLTYPE)
    }

    /// For a bound file, whether it is a directory. Otherwise whether the
    /// typeflag says so or, for compatibility with old archivers, the name
    /// ends with a slash.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        if let Some(file) = &self.file {
            return file.is_dir();
        }
        self.type_flag == u8::from(TypeFlag::DIRTYPE) || self.name.ends_with('/')
    }

    /// For a bound file, whether it is a regular file. Otherwise whether the
    /// typeflag says so or the name does not end with a slash.
    #[must_use]
    pub fn is_file(&self) -> bool {
        if let Some(file) = &self.file {
            return file.is_file();
        }
        if self.entry_type().is_ok_and(TypeFlag::is_regular_file) {
            return true;
        }
        !self.name.ends_with('/')
    }

    #[must_use]
    pub fn is_symbolic_link(&self) -> bool {
        self.type_flag == u8::from(TypeFlag::SYMTYPE)
    }

    /// Hard link.
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.type_flag == u8::from(TypeFlag::LNKTYPE)
    }

    #[must_use]
    pub fn is_character_device(&self) -> bool {
        self.type_flag == u8::from(TypeFlag::CHRTYPE)
    }

    #[must_use]
    pub fn is_block_device(&self) -> bool {
        self.type_flag == u8::from(TypeFlag::BLKTYPE)
    }

    #[must_use]
    pub fn is_fifo(&self) -> bool {
        self.type_flag == u8::from(TypeFlag::FIFOTYPE)
    }

    /// Entries for the children of a bound directory, sorted by name. Empty
    /// for all other entries.
    ///
    /// # Errors
    /// Returns [`TarError::Io`] if the directory can't be listed.
    pub fn directory_entries(&self) -> Result<Vec<Self>> {
        let Some(dir) = self.file.as_deref().filter(|file| file.is_dir()) else {
            return Ok(Vec::new());
        };
        let mut entries = fs::read_dir(dir)?
            .map(|child| Self::from_file(child?.path()))
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

impl PartialEq for TarEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TarEntry {}

impl Hash for TarEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

fn read_numeric<T: TryFrom<i64>>(header: &[u8; BLOCKSIZE], field: Field) -> Result<T> {
    let value = parse_octal_or_binary(field.name, field.slice(header))?;
    T::try_from(value)
        .map_err(|_| TarError::invalid_field(field.name, format!("{value} is out of range")))
}

fn write_numeric(
    buf: &mut [u8; BLOCKSIZE],
    field: Field,
    value: impl Into<i128>,
    extended: bool,
) -> Result<()> {
    format_numeric_field(field.name, value.into(), field.slice_mut(buf), extended)
}

/// Splits a name too long for the ustar `name` field at a slash into
/// `prefix` and `name`. `None` if the name fits or can't be split.
fn split_ustar_name<'a>(
    name: &'a str,
    encoding: &dyn TextEncoding,
) -> Result<Option<(&'a str, &'a str)>> {
    if encoding.encode(name)?.len() <= NAME.len {
        return Ok(None);
    }
    for (i, _) in name.match_indices('/').filter(|&(i, _)| i > 0) {
        let (prefix, rest) = (&name[..i], &name[i + 1..]);
        if rest.is_empty() {
            break;
        }
        if encoding.encode(prefix)?.len() <= PREFIX.len && encoding.encode(rest)?.len() <= NAME.len
        {
            return Ok(Some((prefix, rest)));
        }
    }
    Ok(None)
}

fn escalate_encoding_error(e: TarError) -> TarError {
    if e.is_encoding_error() {
        TarError::Internal(format!("fallback encoding failed: {e}"))
    } else {
        e
    }
}

fn device_number(what: &'static str, dev: i64) -> Result<u32> {
    u32::try_from(dev).map_err(|_| TarError::InvalidArgument { what, value: dev })
}

/// Whole seconds since the epoch, truncated towards zero.
fn secs_since_epoch(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_secs()).map_or(i64::MIN, |s| -s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::default_encoding;
    use crate::header::{MAGIC_GNU, MAGIC_POSIX, MAGIC_XSTAR, XSTAR_MAGIC};
    use crate::tar_format_types::parse_octal;
    use encoding_rs::{ISO_8859_2, UTF_16LE, UTF_8};
    use std::collections::HashSet;

    /// Builds a header the way an archiver would, with a valid checksum.
    fn header(name: &[u8], size: &[u8; 12], type_flag: u8, magic: &[u8; 6]) -> [u8; BLOCKSIZE] {
        let mut header = [0; BLOCKSIZE];
        header[..name.len()].copy_from_slice(name);
        header[MODE.offset..MODE.end()].copy_from_slice(b"0000644\0");
        header[UID.offset..UID.end()].copy_from_slice(b"0001750\0");
        header[GID.offset..GID.end()].copy_from_slice(b"0001750\0");
        header[SIZE.offset..SIZE.end()].copy_from_slice(size);
        header[MTIME.offset..MTIME.end()].copy_from_slice(b"14707114023\0");
        header[TYPEFLAG.offset] = type_flag;
        header[MAGIC.offset..MAGIC.end()].copy_from_slice(magic);
        if magic == MAGIC_POSIX {
            header[VERSION.offset..VERSION.end()].copy_from_slice(b"00");
        }
        fix_checksum(&mut header);
        header
    }

    fn fix_checksum(header: &mut [u8; BLOCKSIZE]) {
        CHKSUM.slice_mut(header).fill(b' ');
        let sum = compute_checksum(header);
        format_checksum(sum, CHKSUM.slice_mut(header)).unwrap();
    }

    #[test]
    fn test_parse_posix_header() {
        let header = header(b"hello.txt", b"000000000014", b'0', MAGIC_POSIX);
        let entry = TarEntry::from_header(&header, &UTF_8).unwrap();
        assert_eq!(entry.name(), "hello.txt");
        assert_eq!(entry.size(), 12);
        assert_eq!(entry.mode(), 0o644);
        assert_eq!(entry.user_id(), 1000);
        assert_eq!(entry.group_id(), 1000);
        assert_eq!(entry.mod_time(), 0o14707114023);
        assert_eq!(entry.magic(), "ustar");
        assert_eq!(entry.version(), "00");
        assert!(entry.is_file());
        assert!(!entry.is_directory());
        assert!(entry.is_checksum_ok());
        assert_eq!(entry.file(), None);
    }

    #[test]
    fn test_parse_appends_slash_to_directories() {
        let header = header(b"docs", b"00000000000\0", b'5', MAGIC_POSIX);
        let entry = TarEntry::from_header(&header, &UTF_8).unwrap();
        assert_eq!(entry.name(), "docs/");
        assert!(entry.is_directory());
    }

    #[test]
    fn test_parse_posix_prefix() {
        let mut header = header(b"file.txt", b"00000000000\0", b'0', MAGIC_POSIX);
        header[PREFIX.offset..PREFIX.offset + 8].copy_from_slice(b"some/dir");
        fix_checksum(&mut header);
        let entry = TarEntry::from_header(&header, &UTF_8).unwrap();
        assert_eq!(entry.name(), "some/dir/file.txt");
    }

    #[test]
    fn test_parse_xstar_prefix() {
        let mut header = header(b"file.txt", b"00000000000\0", b'0', MAGIC_POSIX);
        XSTAR_PREFIX.slice_mut(&mut header).fill(b'p');
        // would continue the ustar prefix, but is the xstar atime
        header[XSTAR_PREFIX.end()..XSTAR_PREFIX.end() + 4].copy_from_slice(b"1234");
        header[XSTAR_MAGIC.offset..].copy_from_slice(MAGIC_XSTAR);
        fix_checksum(&mut header);
        let entry = TarEntry::from_header(&header, &UTF_8).unwrap();
        assert_eq!(entry.name(), format!("{}/file.txt", "p".repeat(131)));
    }

    #[test]
    fn test_parse_old_gnu_tail() {
        let mut header = header(b"sparse.img", b"00000001000\0", b'S', MAGIC_GNU);
        header[VERSION.offset] = b' ';
        header[GNU_ISEXTENDED.offset] = 1;
        header[GNU_REALSIZE.offset..GNU_REALSIZE.end()].copy_from_slice(b"00000100000\0");
        fix_checksum(&mut header);
        let entry = TarEntry::from_header(&header, &UTF_8).unwrap();
        assert_eq!(entry.magic(), "ustar ");
        assert_eq!(entry.version(), " ");
        assert!(entry.is_extended());
        assert_eq!(entry.real_size(), 0o100000);
        assert!(entry.is_old_gnu_sparse());
        assert!(entry.is_gnu_sparse());
        assert!(entry.is_sparse());
    }

    #[test]
    fn test_parse_legacy_header() {
        let header = header(b"old.txt", b"00000000005\0", b'\0', &[0; 6]);
        let entry = TarEntry::from_header(&header, &UTF_8).unwrap();
        assert_eq!(entry.name(), "old.txt");
        assert_eq!(entry.magic(), "");
        assert_eq!(entry.entry_type(), Ok(TypeFlag::AREGTYPE));
        assert!(entry.is_file());
        assert!(entry.is_checksum_ok());
    }

    #[test]
    fn test_checksum_mismatch_is_recorded() {
        let mut header = header(b"hello.txt", b"000000000014", b'0', MAGIC_POSIX);
        header[0] = b'j';
        let entry = TarEntry::from_header(&header, &UTF_8).unwrap();
        assert_eq!(entry.name(), "jello.txt");
        assert!(!entry.is_checksum_ok());
    }

    #[test]
    fn test_invalid_numeric_field_leaves_entry_unchanged() {
        let header = header(b"bad.txt", b"00000000009\0", b'0', MAGIC_POSIX);
        let mut entry = TarEntry::new("before");
        let err = entry.parse_header(&header, &UTF_8).unwrap_err();
        assert!(matches!(err, TarError::InvalidHeaderField { field: "size", .. }));
        assert_eq!(entry.name(), "before");
    }

    #[test]
    fn test_parse_falls_back_on_malformed_text() {
        let header = header(b"caf\xe9", b"00000000000\0", b'0', MAGIC_POSIX);
        let mut entry = TarEntry::new("x");
        let err = entry.parse_header_strict(&header, &UTF_8).unwrap_err();
        assert!(err.is_encoding_error());
        assert_eq!(entry.name(), "x");

        entry.parse_header(&header, &UTF_8).unwrap();
        assert_eq!(entry.name(), "café");
    }

    #[test]
    fn test_roundtrip() {
        let mut entry = TarEntry::new("dir/sub/data.bin");
        entry.set_mode(0o100755);
        entry.set_ids(1000, 100);
        entry.set_names("alice", "users");
        entry.set_size(123_456).unwrap();
        entry.set_mod_time(1_700_000_000);
        entry.set_link_name("target");
        entry.set_dev_major(8).unwrap();
        entry.set_dev_minor(1).unwrap();

        let mut block = [0; BLOCKSIZE];
        entry.write_header(&mut block, &UTF_8, false).unwrap();
        let parsed = TarEntry::from_header(&block, &UTF_8).unwrap();

        assert!(parsed.is_checksum_ok());
        assert_eq!(parsed.name(), entry.name());
        assert_eq!(parsed.mode(), entry.mode());
        assert_eq!(parsed.user_id(), 1000);
        assert_eq!(parsed.group_id(), 100);
        assert_eq!(parsed.user_name(), "alice");
        assert_eq!(parsed.group_name(), "users");
        assert_eq!(parsed.size(), 123_456);
        assert_eq!(parsed.mod_time(), 1_700_000_000);
        assert_eq!(parsed.type_flag(), b'0');
        assert_eq!(parsed.link_name(), "target");
        assert_eq!(parsed.magic(), entry.magic());
        assert_eq!(parsed.version(), entry.version());
        assert_eq!(parsed.dev_major(), 8);
        assert_eq!(parsed.dev_minor(), 1);
        assert_eq!(parsed.real_size(), 0);
        assert!(!parsed.is_extended());
    }

    #[test]
    fn test_roundtrip_old_gnu() {
        let mut entry = TarEntry::with_type_flag("sparse.img", b'S', false);
        entry.set_magic("ustar ");
        entry.set_version(" ");
        entry.set_extended(true);
        entry.set_real_size(1 << 20);

        let mut block = [0; BLOCKSIZE];
        entry.write_header(&mut block, &UTF_8, false).unwrap();
        assert_eq!(MAGIC.slice(&block), MAGIC_GNU);
        assert_eq!(TarFormat::detect(&block), TarFormat::OldGnu);

        let parsed = TarEntry::from_header(&block, &UTF_8).unwrap();
        assert!(parsed.is_extended());
        assert_eq!(parsed.real_size(), 1 << 20);
        assert!(parsed.is_old_gnu_sparse());
    }

    #[test]
    fn test_written_checksum_matches_content() {
        let entry = TarEntry::new("a/b/c.txt");
        let mut block = [0; BLOCKSIZE];
        entry.write_header(&mut block, &UTF_8, false).unwrap();

        let stored = parse_octal("chksum", CHKSUM.slice(&block)).unwrap();
        let mut blanked = block;
        CHKSUM.slice_mut(&mut blanked).fill(b' ');
        assert_eq!(stored as u64, compute_checksum(&blanked));
        assert_eq!(&CHKSUM.slice(&block)[6..], b"\0 ");
    }

    #[test]
    fn test_long_name_uses_ustar_prefix() {
        let dir = "d".repeat(60);
        let name = format!("{dir}/{dir}/file.txt");
        let entry = TarEntry::new(&name);
        let mut block = [0; BLOCKSIZE];
        entry.write_header(&mut block, &UTF_8, false).unwrap();

        assert_eq!(parse_name(NAME.slice(&block), &UTF_8).unwrap(), format!("{dir}/file.txt"));
        assert_eq!(parse_name(PREFIX.slice(&block), &UTF_8).unwrap(), dir);
        assert_eq!(TarEntry::from_header(&block, &UTF_8).unwrap().name(), name);
    }

    #[test]
    fn test_unsplittable_name_is_truncated() {
        let name = "x".repeat(120);
        let entry = TarEntry::new(&name);
        let mut block = [0; BLOCKSIZE];
        entry.write_header(&mut block, &UTF_8, false).unwrap();
        assert_eq!(TarEntry::from_header(&block, &UTF_8).unwrap().name(), &name[..100]);
    }

    #[test]
    fn test_extended_numbers() {
        let big: i64 = 8 * 1024 * 1024 * 1024;
        let mut entry = TarEntry::new("huge.iso");
        entry.set_size(big).unwrap();
        let mut block = [0; BLOCKSIZE];

        entry.write_header(&mut block, &UTF_8, false).unwrap();
        assert_eq!(SIZE.slice(&block), b"00000000000\0");
        assert_eq!(TarEntry::from_header(&block, &UTF_8).unwrap().size(), 0);

        entry.write_header(&mut block, &UTF_8, true).unwrap();
        assert_eq!(SIZE.slice(&block)[0], 0x80);
        let parsed = TarEntry::from_header(&block, &UTF_8).unwrap();
        assert_eq!(parsed.size(), big as u64);
        assert!(parsed.is_checksum_ok());
    }

    #[test]
    fn test_uid_beyond_binary_range() {
        let mut entry = TarEntry::new("f");
        entry.set_user_id(u64::MAX);
        let mut block = [0; BLOCKSIZE];
        let err = entry.write_header(&mut block, &UTF_8, true).unwrap_err();
        assert!(matches!(err, TarError::ValueOutOfRange { width: 8, .. }));
        entry.write_header(&mut block, &UTF_8, false).unwrap();
        assert_eq!(UID.slice(&block), b"0000000\0");
    }

    #[test]
    fn test_failed_write_leaves_buffer_untouched() {
        let mut entry = TarEntry::new("f");
        entry.set_user_id(u64::MAX);
        let mut block = [0xAA; BLOCKSIZE];
        assert!(entry.write_header_strict(&mut block, &UTF_8, true).is_err());
        assert_eq!(block, [0xAA; BLOCKSIZE]);
    }

    #[test]
    fn test_utf16_names_survive_roundtrip() {
        let entry = TarEntry::new("ab");
        let mut block = [0; BLOCKSIZE];
        entry.write_header(&mut block, &UTF_16LE, false).unwrap();
        assert_eq!(&NAME.slice(&block)[..4], b"ab\0\0");
        let parsed = TarEntry::from_header(&block, &UTF_16LE).unwrap();
        assert_eq!(parsed.name(), "ab");
    }

    #[test]
    fn test_write_falls_back_on_unrepresentable_text() {
        let mut entry = TarEntry::new("price-€.txt");
        entry.set_user_name("żółw");
        let mut block = [0; BLOCKSIZE];
        let err = entry.write_header_strict(&mut block, &ISO_8859_2, false).unwrap_err();
        assert!(err.is_encoding_error());

        entry.write_header(&mut block, &ISO_8859_2, false).unwrap();
        assert_eq!(parse_name(NAME.slice(&block), &UTF_8).unwrap(), "price-?.txt");
        assert_eq!(&UNAME.slice(&block)[..5], b"?\xf3?w\0");
    }

    #[test]
    fn test_new_infers_directory() {
        let dir = TarEntry::new("dir/");
        assert!(dir.is_directory());
        assert!(!dir.is_file());
        assert_eq!(dir.mode(), DEFAULT_DIR_MODE);
        assert_eq!(dir.entry_type(), Ok(TypeFlag::DIRTYPE));

        let file = TarEntry::new("file.txt");
        assert!(!file.is_directory());
        assert!(file.is_file());
        assert_eq!(file.mode(), DEFAULT_FILE_MODE);
        assert_eq!(file.entry_type(), Ok(TypeFlag::REGTYPE));
        assert!(file.mode_flags().contains(ModeFlags::OwnerRead | ModeFlags::OwnerWrite));
        assert!(!file.is_checksum_ok());
        assert!(file.last_modified().is_some());
    }

    #[test]
    fn test_leading_slashes() {
        assert_eq!(TarEntry::new("//foo").name(), "foo");

        let mut entry = TarEntry::with_leading_slashes("//foo", true);
        assert_eq!(entry.name(), "//foo");
        assert!(entry.preserves_leading_slashes());
        entry.set_name("/bar");
        assert_eq!(entry.name(), "/bar");
    }

    #[test]
    fn test_foreign_path_style() {
        let mut entry = TarEntry::with_path_style("SYS:\\public\\x", false, PathStyle::NetWare);
        assert_eq!(entry.name(), "public/x");
        assert_eq!(entry.path_style(), PathStyle::NetWare);
        entry.set_name("VOL:\\a\\b");
        assert_eq!(entry.name(), "a/b");

        let entry = TarEntry::with_path_style("C:\\dir\\", false, PathStyle::Windows);
        assert_eq!(entry.name(), "dir/");
        assert!(entry.is_directory());
    }

    #[test]
    fn test_gnu_long_name_entry() {
        let entry = TarEntry::with_type_flag("././@LongLink", b'L', false);
        assert!(entry.is_gnu_long_name_entry());
        assert_eq!(entry.magic(), "ustar ");
        assert_eq!(entry.version(), " ");

        let entry = TarEntry::with_type_flag("././@LongLink", b'K', false);
        assert!(entry.is_gnu_long_link_entry());
        assert_eq!(entry.magic(), "ustar");
    }

    #[test]
    fn test_type_predicates() {
        let cases: [(u8, fn(&TarEntry) -> bool); 8] = [
            (b'1', TarEntry::is_link),
            (b'2', TarEntry::is_symbolic_link),
            (b'3', TarEntry::is_character_device),
            (b'4', TarEntry::is_block_device),
            (b'6', TarEntry::is_fifo),
            (b'x', TarEntry::is_pax_header),
            (b'X', TarEntry::is_pax_header),
            (b'g', TarEntry::is_global_pax_header),
        ];
        for (flag, predicate) in cases {
            let entry = TarEntry::with_type_flag("e", flag, false);
            assert!(predicate(&entry), "typeflag {}", flag as char);
            assert!(!predicate(&TarEntry::new("e")), "typeflag {}", flag as char);
        }
    }

    #[test]
    fn test_unknown_type_flag_is_kept() {
        let mut block = header(b"odd", b"00000000000\0", b'Z', MAGIC_POSIX);
        let entry = TarEntry::from_header(&block, &UTF_8).unwrap();
        assert_eq!(entry.type_flag(), b'Z');
        assert!(entry.entry_type().is_err());
        assert!(entry.is_file());
        assert!(!entry.is_directory());
        assert!(!entry.is_symbolic_link());

        entry.write_header(&mut block, &UTF_8, false).unwrap();
        assert_eq!(block[TYPEFLAG.offset], b'Z');
    }

    #[test]
    fn test_setters_reject_negative_values() {
        let mut entry = TarEntry::new("f");
        entry.set_size(10).unwrap();
        assert!(matches!(
            entry.set_size(-1),
            Err(TarError::InvalidArgument { what: "size", value: -1 })
        ));
        assert_eq!(entry.size(), 10);
        assert!(entry.set_dev_major(-1).is_err());
        assert!(entry.set_dev_minor(-5).is_err());
        assert_eq!(entry.dev_major(), 0);
        assert_eq!(entry.dev_minor(), 0);
    }

    #[test]
    fn test_legacy_id_accessors_truncate() {
        let mut entry = TarEntry::new("f");
        entry.set_user_id(0x1_0000_0005);
        entry.set_group_id(0x2_0000_0007);
        assert_eq!(entry.user_id(), 0x1_0000_0005);
        assert_eq!(entry.user_id_u32(), 5);
        assert_eq!(entry.group_id_u32(), 7);
    }

    #[test]
    fn test_equality_by_name() {
        let mut a = TarEntry::new("same");
        a.set_size(1).unwrap();
        let b = TarEntry::new("same");
        assert_eq!(a, b);
        assert_ne!(a, TarEntry::new("other"));

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_is_descendent() {
        let dir = TarEntry::new("dir/");
        assert!(dir.is_descendent(&TarEntry::new("dir/file")));
        assert!(!dir.is_descendent(&TarEntry::new("other/file")));
    }

    #[test]
    fn test_last_modified() {
        let mut entry = TarEntry::new("f");
        entry.set_last_modified(UNIX_EPOCH + Duration::from_millis(5_999));
        assert_eq!(entry.mod_time(), 5);
        entry.set_last_modified(UNIX_EPOCH - Duration::from_millis(1_500));
        assert_eq!(entry.mod_time(), -1);
        assert_eq!(entry.last_modified(), Some(UNIX_EPOCH - Duration::from_secs(1)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"hello").unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();

        let entry = TarEntry::from_file(dir.path()).unwrap();
        assert!(entry.is_directory());
        assert!(!entry.is_file());
        assert!(entry.name().ends_with('/'));
        assert!(!entry.name().starts_with('/'));
        assert_eq!(entry.mode(), DEFAULT_DIR_MODE);
        assert_eq!(entry.file(), Some(dir.path()));

        let children = entry.directory_entries().unwrap();
        assert_eq!(children.len(), 2);
        assert!(children[0].name().ends_with("a/"));
        assert!(children[0].is_directory());
        assert!(children[1].name().ends_with("b.txt"));
        assert!(children[1].is_file());
        assert_eq!(children[1].size(), 5);
        assert_eq!(children[1].mode(), DEFAULT_FILE_MODE);
        assert!(children[1].directory_entries().unwrap().is_empty());
    }

    #[test]
    fn test_from_file_with_name() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let entry = TarEntry::from_file_with_name(file.path(), "/archived/name.bin").unwrap();
        assert_eq!(entry.name(), "archived/name.bin");
        assert_eq!(entry.size(), 0);
        assert!(entry.is_file());
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TarEntry::from_file(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, TarError::Io(_)));
    }

    #[test]
    fn test_default_encoding_is_utf8() {
        let entry = TarEntry::new("ünïcödé");
        let mut block = [0; BLOCKSIZE];
        entry.write_header(&mut block, default_encoding(), false).unwrap();
        assert_eq!(&block[..2], "ü".as_bytes());
    }
}

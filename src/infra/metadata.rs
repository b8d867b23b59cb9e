//! Managed binary metadata
//!
//! Reads the names of the assemblies a built `.dll`/`.exe` references, straight from the
//! ECMA-335 `AssemblyRef` table of the PE image. Only the pieces needed to locate that
//! table are decoded: PE headers, the CLI header, the metadata root, the `#~` table
//! stream and the `#Strings` heap.

use std::path::Path;

use crate::error::MetadataError;

/// Reads the reference table of a built binary
pub trait ReferenceReader {
    /// Short names of every assembly `binary` references
    fn referenced_assembly_names(&self, binary: &Path) -> Result<Vec<String>, MetadataError>;
}

/// Whether `path` names a binary whose references can be read
pub fn is_binary(path: &Path) -> bool {
    let name = path.to_string_lossy();
    let name = name.trim().to_lowercase();
    name.ends_with(".dll") || name.ends_with(".exe")
}

/// [`ReferenceReader`] over ECMA-335 metadata in PE32/PE32+ images
#[derive(Debug, Default, Clone, Copy)]
pub struct ClrMetadataReader;

impl ReferenceReader for ClrMetadataReader {
    fn referenced_assembly_names(&self, binary: &Path) -> Result<Vec<String>, MetadataError> {
        let data = std::fs::read(binary).map_err(|e| MetadataError::Io {
            path: binary.to_path_buf(),
            error: e.to_string(),
        })?;
        assembly_ref_names(&data).map_err(|e| e.at(binary))
    }
}

const CLI_HEADER_DIRECTORY: usize = 14;
const METADATA_SIGNATURE: u32 = 0x424A_5342;
const ASSEMBLY_REF: usize = 0x23;

#[derive(Debug)]
enum ImageError {
    NotPe,
    NotManaged,
    Truncated(&'static str),
    Bad(String),
}

impl ImageError {
    fn at(self, path: &Path) -> MetadataError {
        let path = path.to_path_buf();
        match self {
            Self::NotPe => MetadataError::NotPortableExecutable { path },
            Self::NotManaged => MetadataError::NotManaged { path },
            Self::Truncated(what) => MetadataError::Truncated { path, what },
            Self::Bad(error) => MetadataError::BadMetadata { path, error },
        }
    }
}

struct Image<'a> {
    data: &'a [u8],
}

impl<'a> Image<'a> {
    fn bytes(&self, at: usize, len: usize, what: &'static str) -> Result<&'a [u8], ImageError> {
        at.checked_add(len)
            .and_then(|end| self.data.get(at..end))
            .ok_or(ImageError::Truncated(what))
    }

    fn u8(&self, at: usize, what: &'static str) -> Result<u8, ImageError> {
        Ok(self.bytes(at, 1, what)?[0])
    }

    fn u16(&self, at: usize, what: &'static str) -> Result<u16, ImageError> {
        let b = self.bytes(at, 2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&self, at: usize, what: &'static str) -> Result<u32, ImageError> {
        let b = self.bytes(at, 4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&self, at: usize, what: &'static str) -> Result<u64, ImageError> {
        let b = self.bytes(at, 8, what)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    /// NUL-terminated string starting at `at`, not reading past `limit`
    fn c_string(&self, at: usize, limit: usize, what: &'static str) -> Result<String, ImageError> {
        let end = limit.min(self.data.len());
        let tail = self.data.get(at..end).ok_or(ImageError::Truncated(what))?;
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(ImageError::Truncated(what))?;
        Ok(String::from_utf8_lossy(&tail[..len]).into_owned())
    }
}

struct Section {
    virtual_address: u32,
    virtual_size: u32,
    raw_size: u32,
    raw_pointer: u32,
}

fn rva_to_offset(sections: &[Section], rva: u32) -> Result<usize, ImageError> {
    sections
        .iter()
        .find(|s| {
            let span = s.virtual_size.max(s.raw_size);
            rva >= s.virtual_address && rva - s.virtual_address < span
        })
        .ok_or_else(|| ImageError::Bad(format!("RVA {rva:#x} is not inside any section")))
        .and_then(|s| {
            ((rva - s.virtual_address) as usize)
                .checked_add(s.raw_pointer as usize)
                .ok_or_else(|| ImageError::Bad(format!("RVA {rva:#x} maps past the end of the address space")))
        })
}

fn assembly_ref_names(data: &[u8]) -> Result<Vec<String>, ImageError> {
    let image = Image { data };
    if data.len() < 0x40 || &data[0..2] != b"MZ" {
        return Err(ImageError::NotPe);
    }
    let pe = image.u32(0x3C, "PE header offset")? as usize;
    if image.bytes(pe, 4, "PE signature").map_err(|_| ImageError::NotPe)? != b"PE\0\0" {
        return Err(ImageError::NotPe);
    }

    let coff = pe + 4;
    let section_count = image.u16(coff + 2, "COFF header")? as usize;
    let optional_size = image.u16(coff + 16, "COFF header")? as usize;
    let optional = coff + 20;
    let (rva_count_at, directories_at) = match image.u16(optional, "optional header")? {
        0x10b => (92, 96),
        0x20b => (108, 112),
        _ => return Err(ImageError::NotPe),
    };
    let rva_count = image.u32(optional + rva_count_at, "optional header")? as usize;
    if rva_count <= CLI_HEADER_DIRECTORY {
        return Err(ImageError::NotManaged);
    }
    let cli_rva = image.u32(optional + directories_at + CLI_HEADER_DIRECTORY * 8, "data directories")?;
    if cli_rva == 0 {
        return Err(ImageError::NotManaged);
    }

    let section_table = optional + optional_size;
    let mut sections = Vec::with_capacity(section_count);
    for i in 0..section_count {
        let at = section_table + i * 40;
        sections.push(Section {
            virtual_size: image.u32(at + 8, "section table")?,
            virtual_address: image.u32(at + 12, "section table")?,
            raw_size: image.u32(at + 16, "section table")?,
            raw_pointer: image.u32(at + 20, "section table")?,
        });
    }

    let cli = rva_to_offset(&sections, cli_rva)?;
    let metadata_rva = image.u32(cli + 8, "CLI header")?;
    let root = rva_to_offset(&sections, metadata_rva)?;
    if image.u32(root, "metadata root")? != METADATA_SIGNATURE {
        return Err(ImageError::Bad("bad metadata signature".to_string()));
    }

    let version_len = image.u32(root + 12, "metadata root")? as usize;
    let mut cursor = root + 16 + version_len;
    let stream_count = image.u16(cursor + 2, "metadata root")?;
    cursor += 4;

    let mut tables = None;
    let mut strings = None;
    for _ in 0..stream_count {
        let offset = image.u32(cursor, "stream header")? as usize;
        let size = image.u32(cursor + 4, "stream header")? as usize;
        let name = image.c_string(cursor + 8, cursor + 8 + 32, "stream name")?;
        cursor += 8 + (name.len() + 1).next_multiple_of(4);
        match name.as_str() {
            "#~" | "#-" => tables = Some(root + offset),
            "#Strings" => strings = Some((root + offset, size)),
            _ => {}
        }
    }
    let tables = tables.ok_or_else(|| ImageError::Bad("missing #~ stream".to_string()))?;
    let (strings_at, strings_size) =
        strings.ok_or_else(|| ImageError::Bad("missing #Strings stream".to_string()))?;

    let heap_sizes = image.u8(tables + 6, "table stream header")?;
    let valid = image.u64(tables + 8, "table stream header")?;
    let mut rows = [0u32; 64];
    let mut cursor = tables + 24;
    for (table, count) in rows.iter_mut().enumerate() {
        if valid & (1u64 << table) != 0 {
            *count = image.u32(cursor, "table row counts")?;
            cursor += 4;
        }
    }
    if heap_sizes & 0x40 != 0 {
        cursor += 4;
    }

    let sizes = IndexSizes { rows: &rows, heap_sizes };
    for (table, &count) in rows.iter().enumerate().take(ASSEMBLY_REF) {
        cursor += count as usize * sizes.row_size(table);
    }

    let row_size = sizes.row_size(ASSEMBLY_REF);
    let name_column = 12 + sizes.blob();
    let mut names = Vec::with_capacity(rows[ASSEMBLY_REF] as usize);
    for row in 0..rows[ASSEMBLY_REF] as usize {
        let at = cursor + row * row_size + name_column;
        let index = if sizes.string() == 4 {
            image.u32(at, "AssemblyRef row")? as usize
        } else {
            image.u16(at, "AssemblyRef row")? as usize
        };
        if index >= strings_size {
            return Err(ImageError::Bad(format!("string index {index} outside #Strings heap")));
        }
        names.push(image.c_string(strings_at + index, strings_at + strings_size, "#Strings heap")?);
    }
    Ok(names)
}

#[derive(Clone, Copy)]
enum Col {
    U16,
    U32,
    Str,
    Guid,
    Blob,
    Table(usize),
    Coded(&'static [usize], u32),
}

const TYPE_DEF_OR_REF: Col = Col::Coded(&[0x02, 0x01, 0x1B], 2);
const HAS_CONSTANT: Col = Col::Coded(&[0x04, 0x08, 0x17], 2);
const HAS_CUSTOM_ATTRIBUTE: Col = Col::Coded(
    &[
        0x06, 0x04, 0x01, 0x02, 0x08, 0x09, 0x0A, 0x00, 0x0E, 0x17, 0x14, 0x11, 0x1A, 0x1B, 0x20,
        0x23, 0x26, 0x27, 0x28, 0x2A, 0x2C, 0x2B,
    ],
    5,
);
const HAS_FIELD_MARSHAL: Col = Col::Coded(&[0x04, 0x08], 1);
const HAS_DECL_SECURITY: Col = Col::Coded(&[0x02, 0x06, 0x20], 2);
const MEMBER_REF_PARENT: Col = Col::Coded(&[0x02, 0x01, 0x1A, 0x06, 0x1B], 3);
const HAS_SEMANTICS: Col = Col::Coded(&[0x14, 0x17], 1);
const METHOD_DEF_OR_REF: Col = Col::Coded(&[0x06, 0x0A], 1);
const MEMBER_FORWARDED: Col = Col::Coded(&[0x04, 0x06], 1);
const CUSTOM_ATTRIBUTE_TYPE: Col = Col::Coded(&[0x06, 0x0A], 3);
const RESOLUTION_SCOPE: Col = Col::Coded(&[0x00, 0x1A, 0x23, 0x01], 2);

/// Column layout of tables `0x00..=0x23`
fn columns(table: usize) -> &'static [Col] {
    use Col::{Blob, Guid, Str, Table, U16, U32};
    match table {
        0x00 => &[U16, Str, Guid, Guid, Guid],
        0x01 => &[RESOLUTION_SCOPE, Str, Str],
        0x02 => &[U32, Str, Str, TYPE_DEF_OR_REF, Table(0x04), Table(0x06)],
        0x03 => &[Table(0x04)],
        0x04 => &[U16, Str, Blob],
        0x05 => &[Table(0x06)],
        0x06 => &[U32, U16, U16, Str, Blob, Table(0x08)],
        0x07 => &[Table(0x08)],
        0x08 => &[U16, U16, Str],
        0x09 => &[Table(0x02), TYPE_DEF_OR_REF],
        0x0A => &[MEMBER_REF_PARENT, Str, Blob],
        0x0B => &[U16, HAS_CONSTANT, Blob],
        0x0C => &[HAS_CUSTOM_ATTRIBUTE, CUSTOM_ATTRIBUTE_TYPE, Blob],
        0x0D => &[HAS_FIELD_MARSHAL, Blob],
        0x0E => &[U16, HAS_DECL_SECURITY, Blob],
        0x0F => &[U16, U32, Table(0x02)],
        0x10 => &[U32, Table(0x04)],
        0x11 => &[Blob],
        0x12 => &[Table(0x02), Table(0x14)],
        0x13 => &[Table(0x14)],
        0x14 => &[U16, Str, TYPE_DEF_OR_REF],
        0x15 => &[Table(0x02), Table(0x17)],
        0x16 => &[Table(0x17)],
        0x17 => &[U16, Str, Blob],
        0x18 => &[U16, Table(0x06), HAS_SEMANTICS],
        0x19 => &[Table(0x02), METHOD_DEF_OR_REF, METHOD_DEF_OR_REF],
        0x1A => &[Str],
        0x1B => &[Blob],
        0x1C => &[U16, MEMBER_FORWARDED, Str, Table(0x1A)],
        0x1D => &[U32, Table(0x04)],
        0x1E => &[U32, U32],
        0x1F => &[U32],
        0x20 => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
        0x21 => &[U32],
        0x22 => &[U32, U32, U32],
        0x23 => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
        _ => &[],
    }
}

struct IndexSizes<'a> {
    rows: &'a [u32; 64],
    heap_sizes: u8,
}

impl IndexSizes<'_> {
    fn string(&self) -> usize {
        if self.heap_sizes & 0x01 != 0 { 4 } else { 2 }
    }

    fn guid(&self) -> usize {
        if self.heap_sizes & 0x02 != 0 { 4 } else { 2 }
    }

    fn blob(&self) -> usize {
        if self.heap_sizes & 0x04 != 0 { 4 } else { 2 }
    }

    fn column(&self, col: Col) -> usize {
        match col {
            Col::U16 => 2,
            Col::U32 => 4,
            Col::Str => self.string(),
            Col::Guid => self.guid(),
            Col::Blob => self.blob(),
            Col::Table(t) => {
                if self.rows[t] < 1 << 16 { 2 } else { 4 }
            }
            Col::Coded(tables, bits) => {
                let max = tables.iter().map(|&t| self.rows[t]).max().unwrap_or(0);
                if max < 1 << (16 - bits) { 2 } else { 4 }
            }
        }
    }

    fn row_size(&self, table: usize) -> usize {
        columns(table).iter().map(|&c| self.column(c)).sum()
    }
}

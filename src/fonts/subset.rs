//! TrueType subsetting.
//!
//! The embedded program keeps `.notdef`, the glyphs a document draws and the
//! components of any composite among them. Glyph ids are renumbered
//! contiguously in ascending order of the original ids, so everything that
//! refers to glyphs in the PDF (content streams, `/W`, `ToUnicode`) has to go
//! through [`FontSubset::glyph`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

/// Tables carried over byte for byte.
const COPIED_TABLES: [&[u8; 4]; 5] = [b"OS/2", b"cvt ", b"fpgm", b"name", b"prep"];

const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

#[derive(Error, Debug)]
pub enum SubsetError {
    #[error("unsupported font program: {0}")]
    Unsupported(&'static str),

    #[error("missing '{0}' table")]
    MissingTable(String),

    #[error("malformed '{0}' table")]
    Malformed(&'static str),
}

/// A font program ready for embedding, plus the glyph renumbering that
/// produced it.
#[derive(Debug, Clone)]
pub struct FontSubset {
    pub data: Vec<u8>,
    remap: Option<HashMap<u16, u16>>,
}

impl FontSubset {
    /// The complete font, glyph ids unchanged.
    pub fn full(data: Vec<u8>) -> Self {
        Self { data, remap: None }
    }

    pub fn is_subset(&self) -> bool {
        self.remap.is_some()
    }

    /// Id in this program of glyph `original` of the source face. Glyphs that
    /// were left out map to `.notdef`.
    pub fn glyph(&self, original: u16) -> u16 {
        match &self.remap {
            Some(remap) => remap.get(&original).copied().unwrap_or(0),
            None => original,
        }
    }
}

/// Builds a TrueType program holding only the glyphs in `used` (keyed by
/// glyph id of the source face, valued by the character drawn with it).
pub fn subset_font(data: &[u8], used: &BTreeMap<u16, char>) -> Result<FontSubset, SubsetError> {
    let tables = read_tables(data)?;
    let head = require(&tables, b"head")?;
    let hhea = require(&tables, b"hhea")?;
    let hmtx = require(&tables, b"hmtx")?;
    let maxp = require(&tables, b"maxp")?;
    let loca = require(&tables, b"loca")?;
    let glyf = require(&tables, b"glyf")?;

    let num_glyphs = u16_at(maxp, 4).ok_or(SubsetError::Malformed("maxp"))?;
    let long_loca = i16_at(head, 50).ok_or(SubsetError::Malformed("head"))? != 0;
    let offsets = glyph_offsets(loca, long_loca, num_glyphs)?;

    let mut keep: BTreeSet<u16> = std::iter::once(0)
        .chain(used.keys().copied())
        .filter(|gid| *gid < num_glyphs)
        .collect();
    let mut pending: Vec<u16> = keep.iter().copied().collect();
    while let Some(gid) = pending.pop() {
        let glyph = glyph_data(glyf, &offsets, gid);
        for at in component_refs(glyph) {
            if let Some(component) = u16_at(glyph, at)
                && component < num_glyphs
                && keep.insert(component)
            {
                pending.push(component);
            }
        }
    }

    let remap: HashMap<u16, u16> = keep
        .iter()
        .enumerate()
        .map(|(new_gid, &old_gid)| (old_gid, new_gid as u16))
        .collect();
    let kept = keep.len() as u16;

    let mut new_glyf = Vec::new();
    let mut new_offsets = Vec::with_capacity(keep.len() + 1);
    for &gid in &keep {
        new_offsets.push(new_glyf.len());
        let mut glyph = glyph_data(glyf, &offsets, gid).to_vec();
        for at in component_refs(&glyph) {
            if let Some(old) = u16_at(&glyph, at) {
                put_u16(&mut glyph, at, remap.get(&old).copied().unwrap_or(0));
            }
        }
        new_glyf.extend_from_slice(&glyph);
        pad4(&mut new_glyf);
    }
    new_offsets.push(new_glyf.len());

    let long_loca = new_glyf.len() > 0x1FFFE;
    let new_loca = loca_table(&new_offsets, long_loca);
    let new_hmtx = hmtx_table(hmtx, hhea, &keep)?;

    let mut new_head = sized_copy(head, 54, "head")?;
    put_u32(&mut new_head, 8, 0);
    put_u16(&mut new_head, 50, u16::from(long_loca));

    let mut new_hhea = sized_copy(hhea, 36, "hhea")?;
    put_u16(&mut new_hhea, 34, kept);

    let mut new_maxp = sized_copy(maxp, 6, "maxp")?;
    put_u16(&mut new_maxp, 4, kept);

    let cmap_entries: Vec<(u16, u16)> = used
        .iter()
        .filter_map(|(gid, ch)| {
            let code = u16::try_from(u32::from(*ch)).ok()?;
            Some((code, *remap.get(gid)?))
        })
        .collect();

    let mut out_tables: Vec<([u8; 4], Vec<u8>)> = vec![
        (*b"cmap", cmap_table(&cmap_entries)),
        (*b"glyf", new_glyf),
        (*b"head", new_head),
        (*b"hhea", new_hhea),
        (*b"hmtx", new_hmtx),
        (*b"loca", new_loca),
        (*b"maxp", new_maxp),
        (*b"post", post_table(tables.get(b"post").copied())),
    ];
    for tag in COPIED_TABLES {
        if let Some(table) = tables.get(tag) {
            out_tables.push((*tag, table.to_vec()));
        }
    }

    Ok(FontSubset {
        data: write_sfnt(out_tables),
        remap: Some(remap),
    })
}

fn read_tables(data: &[u8]) -> Result<BTreeMap<[u8; 4], &[u8]>, SubsetError> {
    match u32_at(data, 0) {
        Some(0x0001_0000) | Some(0x7472_7565) => {}
        Some(0x4F54_544F) => return Err(SubsetError::Unsupported("CFF outlines")),
        Some(0x7474_6366) => return Err(SubsetError::Unsupported("font collection")),
        _ => return Err(SubsetError::Unsupported("unknown sfnt version")),
    }
    let count = u16_at(data, 4).ok_or(SubsetError::Malformed("sfnt"))?;

    let mut tables = BTreeMap::new();
    for i in 0..usize::from(count) {
        let record = 12 + i * 16;
        let tag: [u8; 4] = data
            .get(record..record + 4)
            .and_then(|t| t.try_into().ok())
            .ok_or(SubsetError::Malformed("sfnt"))?;
        let offset = u32_at(data, record + 8).ok_or(SubsetError::Malformed("sfnt"))? as usize;
        let length = u32_at(data, record + 12).ok_or(SubsetError::Malformed("sfnt"))? as usize;
        let table = data
            .get(offset..offset.saturating_add(length))
            .ok_or(SubsetError::Malformed("sfnt"))?;
        tables.insert(tag, table);
    }
    Ok(tables)
}

fn require<'a>(
    tables: &BTreeMap<[u8; 4], &'a [u8]>,
    tag: &[u8; 4],
) -> Result<&'a [u8], SubsetError> {
    tables
        .get(tag)
        .copied()
        .ok_or_else(|| SubsetError::MissingTable(String::from_utf8_lossy(tag).into_owned()))
}

/// Byte offsets into `glyf`, one per glyph plus the end marker.
fn glyph_offsets(loca: &[u8], long: bool, num_glyphs: u16) -> Result<Vec<usize>, SubsetError> {
    (0..=usize::from(num_glyphs))
        .map(|i| {
            let offset = if long {
                u32_at(loca, i * 4).map(|o| o as usize)
            } else {
                u16_at(loca, i * 2).map(|o| usize::from(o) * 2)
            };
            offset.ok_or(SubsetError::Malformed("loca"))
        })
        .collect()
}

fn glyph_data<'a>(glyf: &'a [u8], offsets: &[usize], gid: u16) -> &'a [u8] {
    let index = usize::from(gid);
    match (offsets.get(index), offsets.get(index + 1)) {
        (Some(&start), Some(&end)) if start < end => glyf.get(start..end).unwrap_or(&[]),
        _ => &[],
    }
}

/// Positions of the component glyph ids inside a composite glyph record.
/// Simple and empty glyphs have none.
fn component_refs(glyph: &[u8]) -> Vec<usize> {
    let mut refs = Vec::new();
    if !i16_at(glyph, 0).is_some_and(|contours| contours < 0) {
        return refs;
    }

    let mut pos = 10;
    while let Some(flags) = u16_at(glyph, pos) {
        if u16_at(glyph, pos + 2).is_none() {
            break;
        }
        refs.push(pos + 2);
        pos += 4;
        pos += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            pos += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            pos += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            pos += 8;
        }
        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }
    refs
}

fn loca_table(offsets: &[usize], long: bool) -> Vec<u8> {
    let mut loca = Vec::with_capacity(offsets.len() * if long { 4 } else { 2 });
    for &offset in offsets {
        if long {
            loca.extend_from_slice(&(offset as u32).to_be_bytes());
        } else {
            loca.extend_from_slice(&((offset / 2) as u16).to_be_bytes());
        }
    }
    loca
}

/// Full metrics for every kept glyph, in new glyph order.
fn hmtx_table(hmtx: &[u8], hhea: &[u8], keep: &BTreeSet<u16>) -> Result<Vec<u8>, SubsetError> {
    let long_metrics = usize::from(u16_at(hhea, 34).ok_or(SubsetError::Malformed("hhea"))?);
    if long_metrics == 0 {
        return Err(SubsetError::Malformed("hhea"));
    }

    let mut table = Vec::with_capacity(keep.len() * 4);
    for &gid in keep {
        let gid = usize::from(gid);
        let (advance, lsb) = if gid < long_metrics {
            (u16_at(hmtx, gid * 4), u16_at(hmtx, gid * 4 + 2))
        } else {
            // glyphs past the long metrics share the last advance
            (
                u16_at(hmtx, (long_metrics - 1) * 4),
                u16_at(hmtx, long_metrics * 4 + (gid - long_metrics) * 2),
            )
        };
        table.extend_from_slice(&advance.unwrap_or(0).to_be_bytes());
        table.extend_from_slice(&lsb.unwrap_or(0).to_be_bytes());
    }
    Ok(table)
}

/// A Windows Unicode BMP (format 4) cmap with one segment per character.
fn cmap_table(entries: &[(u16, u16)]) -> Vec<u8> {
    let mut entries: Vec<(u16, u16)> = entries
        .iter()
        .copied()
        .filter(|(code, _)| *code != 0xFFFF)
        .collect();
    entries.sort_unstable();
    entries.dedup_by_key(|(code, _)| *code);
    entries.push((0xFFFF, 0));

    let seg_count = entries.len() as u16;
    let entry_selector = (u16::BITS - 1 - seg_count.leading_zeros()) as u16;
    let search_range = 2u16 << entry_selector;
    let length = 16 + 8 * seg_count;

    let mut subtable = Vec::with_capacity(usize::from(length));
    for value in [4, length, 0, seg_count * 2, search_range, entry_selector] {
        subtable.extend_from_slice(&value.to_be_bytes());
    }
    subtable.extend_from_slice(&(seg_count * 2 - search_range).to_be_bytes());
    for (code, _) in &entries {
        subtable.extend_from_slice(&code.to_be_bytes());
    }
    subtable.extend_from_slice(&0u16.to_be_bytes());
    for (code, _) in &entries {
        subtable.extend_from_slice(&code.to_be_bytes());
    }
    for &(code, gid) in &entries {
        let delta = if code == 0xFFFF { 1 } else { gid.wrapping_sub(code) };
        subtable.extend_from_slice(&delta.to_be_bytes());
    }
    subtable.extend(std::iter::repeat_n(0u8, entries.len() * 2));

    let mut cmap = Vec::with_capacity(12 + subtable.len());
    for value in [0u16, 1, 3, 1] {
        cmap.extend_from_slice(&value.to_be_bytes());
    }
    cmap.extend_from_slice(&12u32.to_be_bytes());
    cmap.extend_from_slice(&subtable);
    cmap
}

/// Format 3 `post` (no glyph names), keeping the original's metrics fields.
fn post_table(original: Option<&[u8]>) -> Vec<u8> {
    let mut post = vec![0u8; 32];
    if let Some(head) = original.and_then(|p| p.get(..16)) {
        post[..16].copy_from_slice(head);
    }
    put_u32(&mut post, 0, 0x0003_0000);
    post
}

fn sized_copy(table: &[u8], min_len: usize, name: &'static str) -> Result<Vec<u8>, SubsetError> {
    if table.len() < min_len {
        return Err(SubsetError::Malformed(name));
    }
    Ok(table.to_vec())
}

fn write_sfnt(mut tables: Vec<([u8; 4], Vec<u8>)>) -> Vec<u8> {
    tables.sort_by(|a, b| a.0.cmp(&b.0));
    let count = tables.len() as u16;
    let entry_selector = (u16::BITS - 1 - count.max(1).leading_zeros()) as u16;
    let search_range = 16u16 << entry_selector;

    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    for value in [count, search_range, entry_selector, count * 16 - search_range] {
        out.extend_from_slice(&value.to_be_bytes());
    }

    let mut offset = 12 + 16 * tables.len();
    let mut head_offset = None;
    for (tag, table) in &tables {
        if tag == b"head" {
            head_offset = Some(offset);
        }
        out.extend_from_slice(tag);
        out.extend_from_slice(&checksum(table).to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(table.len() as u32).to_be_bytes());
        offset += table.len().next_multiple_of(4);
    }
    for (_, table) in &tables {
        out.extend_from_slice(table);
        pad4(&mut out);
    }

    if let Some(head) = head_offset {
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(&out));
        put_u32(&mut out, head + 8, adjustment);
    }
    out
}

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

fn pad4(data: &mut Vec<u8>) {
    data.resize(data.len().next_multiple_of(4), 0);
}

fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn i16_at(data: &[u8], offset: usize) -> Option<i16> {
    u16_at(data, offset).map(|v| v as i16)
}

fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn put_u16(data: &mut [u8], offset: usize, value: u16) {
    if let Some(slot) = data.get_mut(offset..offset + 2) {
        slot.copy_from_slice(&value.to_be_bytes());
    }
}

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    if let Some(slot) = data.get_mut(offset..offset + 4) {
        slot.copy_from_slice(&value.to_be_bytes());
    }
}

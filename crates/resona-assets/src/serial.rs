//! Persisted binary layouts for media and platform asset data.
//!
//! All integers are little-endian. Bank blobs stay opaque byte strings.
//! Media payloads serialize as `{isStreamed, useDeviceMemory, chunkCount,
//! [isPrefetch, len, bytes]*}`; platform-keyed containers serialize either
//! the full per-platform map (editor) or the single entry selected by the
//! cook filter (runtime). Build-time bookkeeping such as last-write times
//! is not part of the layout.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use resona_core::path::AssetPath;

use crate::bank::{AssetData, BankData, BankDataWithMedia};
use crate::event::EventData;
use crate::media::{ChunkData, MediaAsset, MediaAssetData, MediaChunk};
use crate::platform::{AssetPlatformData, PlatformKeyed};
use crate::switch::{SwitchContainerData, SwitchContainerNode};

/// Selects what a platform-keyed container serializes.
#[derive(Debug, Clone)]
pub enum CookFilter {
    /// Keep the full per-platform map (editor archives).
    Editor,
    /// Collapse to the single entry for this platform (cooked archives).
    Cooked {
        /// The cook target platform.
        platform: String,
    },
}

const MODE_EDITOR: u8 = 0;
const MODE_COOKED: u8 = 1;

const KIND_BANK: u8 = 0;
const KIND_WITH_MEDIA: u8 = 1;
const KIND_SWITCH_CONTAINER: u8 = 2;
const KIND_EVENT: u8 = 3;

/// Upper bound on any single serialized buffer, as a corruption guard.
const MAX_BUFFER_LEN: u64 = 1 << 33;

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

fn write_string<W: Write>(w: &mut W, value: &str) -> io::Result<()> {
    w.write_u32::<LittleEndian>(value.len() as u32)?;
    w.write_all(value.as_bytes())
}

fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buffer = vec![0u8; len];
    r.read_exact(&mut buffer)?;
    String::from_utf8(buffer).map_err(|err| invalid(format!("invalid UTF-8 string: {err}")))
}

fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    w.write_u64::<LittleEndian>(bytes.len() as u64)?;
    w.write_all(bytes)
}

fn read_bytes<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = r.read_u64::<LittleEndian>()?;
    if len > MAX_BUFFER_LEN {
        return Err(invalid(format!("buffer length {len} exceeds limit")));
    }
    let mut buffer = vec![0u8; len as usize];
    r.read_exact(&mut buffer)?;
    Ok(buffer)
}

fn write_path<W: Write>(w: &mut W, path: &AssetPath) -> io::Result<()> {
    write_string(w, path.as_str())
}

fn read_path<R: Read>(r: &mut R) -> io::Result<AssetPath> {
    Ok(AssetPath::new(read_string(r)?))
}

fn write_paths<W: Write>(w: &mut W, paths: &[AssetPath]) -> io::Result<()> {
    w.write_u32::<LittleEndian>(paths.len() as u32)?;
    for path in paths {
        write_path(w, path)?;
    }
    Ok(())
}

fn read_paths<R: Read>(r: &mut R) -> io::Result<Vec<AssetPath>> {
    let count = r.read_u32::<LittleEndian>()?;
    (0..count).map(|_| read_path(r)).collect()
}

/// Serialize one media payload.
///
/// File-backed chunks cannot be written; build-time data is resident.
pub fn write_media_data<W: Write>(w: &mut W, data: &MediaAssetData) -> io::Result<()> {
    w.write_u8(data.is_streamed as u8)?;
    w.write_u8(data.use_device_memory as u8)?;
    w.write_u32::<LittleEndian>(data.chunks.len() as u32)?;
    for chunk in &data.chunks {
        w.write_u8(chunk.is_prefetch as u8)?;
        let bytes = chunk
            .data
            .resident()
            .ok_or_else(|| invalid("file-backed chunk cannot be serialized"))?;
        write_bytes(w, bytes)?;
    }
    Ok(())
}

/// Deserialize one media payload with every chunk resident.
pub fn read_media_data<R: Read>(r: &mut R) -> io::Result<MediaAssetData> {
    let is_streamed = r.read_u8()? != 0;
    let use_device_memory = r.read_u8()? != 0;
    let chunk_count = r.read_u32::<LittleEndian>()?;
    let mut chunks = Vec::with_capacity(chunk_count as usize);
    for _ in 0..chunk_count {
        let is_prefetch = r.read_u8()? != 0;
        let bytes = read_bytes(r)?;
        chunks.push(MediaChunk::resident(is_prefetch, bytes));
    }
    Ok(MediaAssetData {
        is_streamed,
        use_device_memory,
        last_write_time: None,
        chunks,
    })
}

/// Deserialize one media payload, leaving the full chunk of streamed media
/// as a lazily served range inside `pack_path` instead of reading it in.
/// The prefetch chunk is always resident.
pub fn read_media_data_lazy<R: Read + Seek>(
    r: &mut R,
    pack_path: &Path,
) -> io::Result<MediaAssetData> {
    let is_streamed = r.read_u8()? != 0;
    let use_device_memory = r.read_u8()? != 0;
    let chunk_count = r.read_u32::<LittleEndian>()?;
    let mut chunks = Vec::with_capacity(chunk_count as usize);
    for _ in 0..chunk_count {
        let is_prefetch = r.read_u8()? != 0;
        if is_streamed && !is_prefetch {
            let len = r.read_u64::<LittleEndian>()?;
            if len > MAX_BUFFER_LEN {
                return Err(invalid(format!("buffer length {len} exceeds limit")));
            }
            let offset = r.stream_position()?;
            r.seek(SeekFrom::Current(len as i64))?;
            chunks.push(MediaChunk {
                is_prefetch,
                data: ChunkData::FileBacked {
                    path: pack_path.to_path_buf(),
                    offset,
                    len,
                },
            });
        } else {
            let bytes = read_bytes(r)?;
            chunks.push(MediaChunk::resident(is_prefetch, bytes));
        }
    }
    Ok(MediaAssetData {
        is_streamed,
        use_device_memory,
        last_write_time: None,
        chunks,
    })
}

/// Serialize a media asset, collapsing per-platform data per the filter.
pub fn write_media_asset<W: Write>(
    w: &mut W,
    asset: &MediaAsset,
    filter: &CookFilter,
) -> io::Result<()> {
    w.write_u32::<LittleEndian>(asset.id)?;
    let data = asset.platform_entries();
    match filter {
        CookFilter::Editor => {
            w.write_u8(MODE_EDITOR)?;
            write_string(w, asset.name.as_deref().unwrap_or(""))?;
            let platforms = data.platforms();
            w.write_u32::<LittleEndian>(platforms.len() as u32)?;
            for platform in platforms {
                let payload = data
                    .current(&platform)
                    .ok_or_else(|| invalid("platform entry disappeared during write"))?;
                write_string(w, &platform)?;
                write_media_data(w, &payload)?;
            }
        }
        CookFilter::Cooked { platform } => {
            w.write_u8(MODE_COOKED)?;
            match data.current(platform) {
                Some(payload) => {
                    w.write_u8(1)?;
                    write_media_data(w, &payload)?;
                }
                None => w.write_u8(0)?,
            }
        }
    }
    Ok(())
}

/// Deserialize a media asset written by [`write_media_asset`].
pub fn read_media_asset<R: Read>(r: &mut R) -> io::Result<MediaAsset> {
    let id = r.read_u32::<LittleEndian>()?;
    match r.read_u8()? {
        MODE_EDITOR => {
            let name = read_string(r)?;
            let count = r.read_u32::<LittleEndian>()?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let platform = read_string(r)?;
                entries.push((platform, read_media_data(r)?));
            }
            let mut asset = MediaAsset::new(id, PlatformKeyed::editor_with(entries));
            if !name.is_empty() {
                asset = asset.with_name(name);
            }
            Ok(asset)
        }
        MODE_COOKED => {
            let data = if r.read_u8()? != 0 {
                read_media_data(r)?
            } else {
                MediaAssetData::default()
            };
            Ok(MediaAsset::new(id, PlatformKeyed::runtime(data)))
        }
        mode => Err(invalid(format!("unknown platform mode {mode}"))),
    }
}

fn write_bank<W: Write>(w: &mut W, data: &BankData) -> io::Result<()> {
    write_string(w, &data.name)?;
    write_bytes(w, data.blob())
}

fn read_bank<R: Read>(r: &mut R) -> io::Result<BankData> {
    let name = read_string(r)?;
    let blob = read_bytes(r)?;
    Ok(BankData::new(name, blob))
}

fn write_with_media<W: Write>(w: &mut W, data: &BankDataWithMedia) -> io::Result<()> {
    write_bank(w, &data.bank)?;
    write_paths(w, &data.media)
}

fn read_with_media<R: Read>(r: &mut R) -> io::Result<BankDataWithMedia> {
    let bank = read_bank(r)?;
    let media = read_paths(r)?;
    Ok(BankDataWithMedia::new(bank, media))
}

fn write_node<W: Write>(w: &mut W, node: &SwitchContainerNode) -> io::Result<()> {
    match &node.group_value {
        Some(path) => {
            w.write_u8(1)?;
            write_path(w, path)?;
        }
        None => w.write_u8(0)?,
    }
    write_paths(w, &node.media)?;
    w.write_u32::<LittleEndian>(node.children.len() as u32)?;
    for child in &node.children {
        write_node(w, child)?;
    }
    Ok(())
}

fn read_node<R: Read>(r: &mut R) -> io::Result<SwitchContainerNode> {
    let group_value = if r.read_u8()? != 0 {
        Some(read_path(r)?)
    } else {
        None
    };
    let media = read_paths(r)?;
    let child_count = r.read_u32::<LittleEndian>()?;
    let children = (0..child_count)
        .map(|_| read_node(r))
        .collect::<io::Result<Vec<_>>>()?;
    Ok(SwitchContainerNode::new(group_value, media, children))
}

fn write_switch_container<W: Write>(w: &mut W, data: &SwitchContainerData) -> io::Result<()> {
    write_with_media(w, &data.base)?;
    w.write_u32::<LittleEndian>(data.containers.len() as u32)?;
    for node in &data.containers {
        write_node(w, node)?;
    }
    Ok(())
}

fn read_switch_container<R: Read>(r: &mut R) -> io::Result<SwitchContainerData> {
    let base = read_with_media(r)?;
    let node_count = r.read_u32::<LittleEndian>()?;
    let containers = (0..node_count)
        .map(|_| read_node(r))
        .collect::<io::Result<Vec<_>>>()?;
    Ok(SwitchContainerData::new(base, containers))
}

fn write_event<W: Write>(w: &mut W, data: &EventData) -> io::Result<()> {
    write_switch_container(w, &data.base)?;
    w.write_f32::<LittleEndian>(data.max_attenuation_radius)?;
    w.write_u8(data.is_infinite as u8)?;
    w.write_f32::<LittleEndian>(data.min_duration)?;
    w.write_f32::<LittleEndian>(data.max_duration)?;

    let mut variants: Vec<(&String, &EventData)> = data.localized_media.iter().collect();
    variants.sort_by(|a, b| a.0.cmp(b.0));
    w.write_u32::<LittleEndian>(variants.len() as u32)?;
    for (language, variant) in variants {
        write_string(w, language)?;
        write_event(w, variant)?;
    }
    Ok(())
}

fn read_event<R: Read>(r: &mut R) -> io::Result<EventData> {
    let base = read_switch_container(r)?;
    let mut event = EventData::new(base);
    event.max_attenuation_radius = r.read_f32::<LittleEndian>()?;
    event.is_infinite = r.read_u8()? != 0;
    event.min_duration = r.read_f32::<LittleEndian>()?;
    event.max_duration = r.read_f32::<LittleEndian>()?;

    let language_count = r.read_u32::<LittleEndian>()?;
    for _ in 0..language_count {
        let language = read_string(r)?;
        event.localized_media.insert(language, read_event(r)?);
    }
    Ok(event)
}

/// Serialize one asset payload with its kind tag.
pub fn write_asset_data<W: Write>(w: &mut W, data: &AssetData) -> io::Result<()> {
    match data {
        AssetData::Bank(bank) => {
            w.write_u8(KIND_BANK)?;
            write_bank(w, bank)
        }
        AssetData::WithMedia(with_media) => {
            w.write_u8(KIND_WITH_MEDIA)?;
            write_with_media(w, with_media)
        }
        AssetData::SwitchContainer(container) => {
            w.write_u8(KIND_SWITCH_CONTAINER)?;
            write_switch_container(w, container)
        }
        AssetData::Event(event) => {
            w.write_u8(KIND_EVENT)?;
            write_event(w, event)
        }
    }
}

/// Deserialize one asset payload written by [`write_asset_data`].
pub fn read_asset_data<R: Read>(r: &mut R) -> io::Result<AssetData> {
    match r.read_u8()? {
        KIND_BANK => Ok(AssetData::Bank(read_bank(r)?)),
        KIND_WITH_MEDIA => Ok(AssetData::WithMedia(read_with_media(r)?)),
        KIND_SWITCH_CONTAINER => Ok(AssetData::SwitchContainer(read_switch_container(r)?)),
        KIND_EVENT => Ok(AssetData::Event(read_event(r)?)),
        kind => Err(invalid(format!("unknown asset data kind {kind}"))),
    }
}

/// Serialize platform asset data, collapsing the map per the filter.
pub fn write_platform_data<W: Write>(
    w: &mut W,
    data: &AssetPlatformData,
    filter: &CookFilter,
) -> io::Result<()> {
    match filter {
        CookFilter::Editor => {
            w.write_u8(MODE_EDITOR)?;
            let platforms = data.data.platforms();
            w.write_u32::<LittleEndian>(platforms.len() as u32)?;
            for platform in platforms {
                let payload = data
                    .current(&platform)
                    .ok_or_else(|| invalid("platform entry disappeared during write"))?;
                write_string(w, &platform)?;
                write_asset_data(w, &payload)?;
            }
        }
        CookFilter::Cooked { platform } => {
            w.write_u8(MODE_COOKED)?;
            match data.current(platform) {
                Some(payload) => {
                    w.write_u8(1)?;
                    write_asset_data(w, &payload)?;
                }
                None => w.write_u8(0)?,
            }
        }
    }
    Ok(())
}

/// Deserialize platform asset data written by [`write_platform_data`].
pub fn read_platform_data<R: Read>(r: &mut R) -> io::Result<AssetPlatformData> {
    match r.read_u8()? {
        MODE_EDITOR => {
            let count = r.read_u32::<LittleEndian>()?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let platform = read_string(r)?;
                entries.push((platform, read_asset_data(r)?));
            }
            Ok(AssetPlatformData {
                data: PlatformKeyed::editor_with(entries),
            })
        }
        MODE_COOKED => {
            if r.read_u8()? != 0 {
                Ok(AssetPlatformData::runtime(read_asset_data(r)?))
            } else {
                // Cooked without a payload for this platform: selection
                // yields nothing at runtime.
                Ok(AssetPlatformData::editor())
            }
        }
        mode => Err(invalid(format!("unknown platform mode {mode}"))),
    }
}

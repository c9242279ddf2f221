pub mod dds;
pub mod error;
pub mod ktx;

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    str::FromStr,
};

use bytemuck::{Pod, Zeroable};

pub use error::SaveError;
pub use ktx::KtxPadding;

pub const fn align_up<const ALIGN: u64>(v: u64) -> u64 {
    ((v + (ALIGN - 1)) / ALIGN) * ALIGN
}

/// One compressed 4x4 BC7 tile. Contents are opaque to the writers.
///
/// The words are written in host byte order, so the on-disk layout
/// matches [`Bc7Block::from_le_bytes`] only on little-endian targets.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Bc7Block {
    pub vals: [u64; 2],
}

impl Bc7Block {
    pub const SIZE: usize = 16;

    pub fn from_le_bytes(bytes: [u8; Self::SIZE]) -> Self {
        let [lo, hi] = [&bytes[..8], &bytes[8..]].map(|half| {
            let mut word = [0; 8];
            word.copy_from_slice(half);
            u64::from_le_bytes(word)
        });
        Self { vals: [lo, hi] }
    }
}

/// Splits raw block data, as stored on disk, into blocks. Returns `None`
/// when `data` is not a whole number of blocks.
pub fn blocks_from_bytes(data: &[u8]) -> Option<Vec<Bc7Block>> {
    if data.len() % Bc7Block::SIZE != 0 {
        return None;
    }
    let blocks = data
        .chunks_exact(Bc7Block::SIZE)
        .map(|chunk| {
            let mut bytes = [0; Bc7Block::SIZE];
            bytes.copy_from_slice(chunk);
            Bc7Block::from_le_bytes(bytes)
        })
        .collect();
    Some(blocks)
}

/// Level 0 of a BC7 texture, checked to hold exactly one block per 4x4 tile.
#[derive(Clone, Copy, Debug)]
pub struct Surface<'a> {
    width: u32,
    height: u32,
    blocks: &'a [Bc7Block],
    srgb: bool,
    data_size: u32,
}

impl<'a> Surface<'a> {
    pub fn new(
        width: u32,
        height: u32,
        blocks: &'a [Bc7Block],
        srgb: bool,
    ) -> Result<Self, SaveError> {
        let expected =
            u64::from(width.div_ceil(4)) * u64::from(height.div_ceil(4));
        let data_size = u32::try_from(expected * Bc7Block::SIZE as u64)
            .map_err(|_| SaveError::ImageTooLarge { width, height })?;
        if blocks.len() as u64 != expected {
            return Err(SaveError::BlockCountMismatch {
                width,
                height,
                expected,
                actual: blocks.len() as u64,
            });
        }
        Ok(Self {
            width,
            height,
            blocks,
            srgb,
            data_size,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn srgb(&self) -> bool {
        self.srgb
    }

    /// Size of the block data in bytes.
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Block data in host byte order.
    pub fn as_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.blocks)
    }
}

/// Suffix after the last `.`, or `""` if there is none or the only dot
/// starts the path.
pub fn file_extension(path: &str) -> &str {
    match path.rfind('.') {
        None | Some(0) => "",
        Some(dot) => &path[dot + 1..],
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    Ktx,
    Dds,
}

impl Container {
    /// Case-sensitive: `KTX` is not `ktx`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ktx" => Some(Self::Ktx),
            "dds" => Some(Self::Dds),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Ktx => "ktx",
            Self::Dds => "dds",
        }
    }

    pub fn write<W: Write>(
        self,
        w: W,
        surface: &Surface,
        options: &SaveOptions,
    ) -> io::Result<()> {
        match self {
            Self::Ktx => ktx::write_ktx(w, surface, options.ktx_padding),
            Self::Dds => dds::write_dds(w, surface),
        }
    }
}

impl FromStr for Container {
    type Err = SaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
            .ok_or_else(|| SaveError::UnsupportedFormat(s.to_string()))
    }
}

#[derive(Clone, Debug, Default)]
pub struct SaveOptions {
    pub ktx_padding: KtxPadding,
}

/// Saves `blocks` as a KTX or DDS file, picked by the extension of `path`.
pub fn save_bc7<P: AsRef<Path>>(
    path: P,
    width: u32,
    height: u32,
    blocks: &[Bc7Block],
    srgb: bool,
) -> Result<(), SaveError> {
    save_bc7_with(path, width, height, blocks, srgb, &SaveOptions::default())
}

/// Like [`save_bc7`]. Nothing is created on disk unless the extension and
/// the block count are valid.
pub fn save_bc7_with<P: AsRef<Path>>(
    path: P,
    width: u32,
    height: u32,
    blocks: &[Bc7Block],
    srgb: bool,
    options: &SaveOptions,
) -> Result<(), SaveError> {
    let path = path.as_ref();
    let name = path.to_string_lossy();
    let container: Container = file_extension(&name).parse().map_err(report)?;
    let surface = Surface::new(width, height, blocks, srgb).map_err(report)?;

    let file = File::create(path).map_err(|source| {
        report(SaveError::CreateFailed {
            path: path.to_path_buf(),
            source,
        })
    })?;
    log::debug!(
        "writing {}x{} {} ({} bytes of blocks) to {}",
        width,
        height,
        container.extension(),
        surface.data_size(),
        path.display()
    );

    let mut w = BufWriter::new(file);
    container
        .write(&mut w, &surface, options)
        // the file closes when dropped, flushing is the last fallible step
        .and_then(|()| {
            w.into_inner().map(drop).map_err(|err| err.into_error())
        })
        .map_err(|source| {
            report(SaveError::CloseFailed {
                path: path.to_path_buf(),
                source,
            })
        })
}

fn report(err: SaveError) -> SaveError {
    log::error!("{err}");
    err
}

#[cfg(test)]
mod tests {
    use std::fs;

    use byteorder::{ReadBytesExt, LE};

    use super::*;

    fn blocks(width: u32, height: u32) -> Vec<Bc7Block> {
        let count = width.div_ceil(4) * height.div_ceil(4);
        (0..u64::from(count))
            .map(|i| Bc7Block { vals: [i, 0xdead_beef] })
            .collect()
    }

    #[test]
    fn resolves_extension() {
        assert_eq!(file_extension("a.b.ktx"), "ktx");
        assert_eq!(file_extension(".hidden"), "");
        assert_eq!(file_extension("noext"), "");
        assert_eq!(file_extension("a."), "");
        assert_eq!(file_extension("dir/tex.DDS"), "DDS");
    }

    #[test]
    fn container_match_is_case_sensitive() {
        assert_eq!("ktx".parse::<Container>().unwrap(), Container::Ktx);
        assert_eq!("dds".parse::<Container>().unwrap(), Container::Dds);
        assert!(matches!(
            "KTX".parse::<Container>(),
            Err(SaveError::UnsupportedFormat(ext)) if ext == "KTX"
        ));
        assert!("".parse::<Container>().is_err());
    }

    #[test]
    fn container_from_extension() {
        assert_eq!(Container::from_extension("ktx"), Some(Container::Ktx));
        assert_eq!(Container::from_extension("dds"), Some(Container::Dds));
        assert_eq!(Container::from_extension("Dds"), None);
        assert_eq!(Container::from_extension("png"), None);
    }

    #[test]
    fn block_from_le_bytes() {
        let mut bytes = [0; 16];
        bytes[0] = 1;
        bytes[15] = 0x80;
        let block = Bc7Block::from_le_bytes(bytes);
        assert_eq!(block.vals, [1, 0x80 << 56]);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn raw_blocks_are_written_back_unchanged() {
        let data: Vec<u8> = (0..32).map(|i| i * 7).collect();
        let blocks = blocks_from_bytes(&data).unwrap();
        let surface = Surface::new(8, 4, &blocks, false).unwrap();
        assert_eq!(surface.as_bytes(), &data[..]);
    }

    #[test]
    fn splits_raw_blocks() {
        let data: Vec<u8> = (0..48).collect();
        let blocks = blocks_from_bytes(&data).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks[2].vals[0],
            u64::from_le_bytes([32, 33, 34, 35, 36, 37, 38, 39])
        );
        assert!(blocks_from_bytes(&data[..47]).is_none());
    }

    #[test]
    fn surface_checks_block_count() {
        let blocks = blocks(5, 5);
        assert_eq!(blocks.len(), 4);
        let surface = Surface::new(5, 5, &blocks, false).unwrap();
        assert_eq!(surface.data_size(), 64);
        assert_eq!(surface.as_bytes().len(), 64);

        assert!(matches!(
            Surface::new(5, 5, &blocks[..3], false),
            Err(SaveError::BlockCountMismatch {
                expected: 4,
                actual: 3,
                ..
            })
        ));
        assert!(Surface::new(0, 0, &[], false).is_ok());
    }

    #[test]
    fn surface_rejects_oversized_image() {
        assert!(matches!(
            Surface::new(u32::MAX, u32::MAX, &[], false),
            Err(SaveError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn saves_ktx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.ktx");
        let blocks = blocks(13, 6);
        save_bc7(&path, 13, 6, &blocks, true).unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(&data[..12], &ktx::IDENTIFIER);
        let mut r = &data[28..];
        assert_eq!(
            r.read_u32::<LE>().unwrap(),
            ktx::GL_COMPRESSED_SRGB_ALPHA_BPTC_UNORM
        );
        let mut r = &data[36..];
        assert_eq!(r.read_u32::<LE>().unwrap(), 13);
        assert_eq!(r.read_u32::<LE>().unwrap(), 6);
        let mut r = &data[ktx::HEADER_SIZE..];
        let image_size = r.read_u32::<LE>().unwrap();
        assert_eq!(image_size, 4 * 2 * 16);
        assert_eq!(r, bytemuck::cast_slice::<_, u8>(&blocks));
    }

    #[test]
    fn saves_dds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.dds");
        let blocks = blocks(7, 9);
        save_bc7(&path, 7, 9, &blocks, false).unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(&data[..4], dds::MAGIC);
        let mut r = &data[20..];
        assert_eq!(r.read_u32::<LE>().unwrap(), 8 * 12);
        let mut r = &data[0x80..];
        assert_eq!(r.read_u32::<LE>().unwrap(), dds::DXGI_FORMAT_BC7_UNORM);
        assert_eq!(
            &data[0x80 + dds::DX10_HEADER_SIZE..],
            bytemuck::cast_slice::<_, u8>(&blocks)
        );
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.dds");
        fs::write(&path, vec![0xff; 4096]).unwrap();
        save_bc7(&path, 4, 4, &blocks(4, 4), false).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 128 + 20 + 16);
    }

    #[test]
    fn aligned_padding_option_reaches_ktx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.ktx");
        let options = SaveOptions {
            ktx_padding: KtxPadding::Aligned,
        };
        save_bc7_with(&path, 4, 4, &blocks(4, 4), false, &options).unwrap();
        let len = fs::metadata(&path).unwrap().len();
        assert_eq!(len, ktx::HEADER_SIZE as u64 + 4 + 16);
    }

    #[test]
    fn rejects_unknown_extension_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.png");
        let err = save_bc7(&path, 4, 4, &blocks(4, 4), false).unwrap_err();
        assert!(
            matches!(err, SaveError::UnsupportedFormat(ext) if ext == "png")
        );
        assert!(!path.exists());

        fs::write(&path, b"keep").unwrap();
        assert!(save_bc7(&path, 4, 4, &blocks(4, 4), false).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"keep");
    }

    #[test]
    fn rejects_bad_block_count_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.ktx");
        let err = save_bc7(&path, 8, 8, &blocks(4, 4), false).unwrap_err();
        assert!(matches!(err, SaveError::BlockCountMismatch { .. }));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn saves_to_character_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.ktx");
        std::os::unix::fs::symlink("/dev/null", &path).unwrap();
        save_bc7(&path, 4, 4, &blocks(4, 4), false).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn reports_failed_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.dds");
        std::os::unix::fs::symlink("/dev/full", &path).unwrap();
        let err = save_bc7(&path, 4, 4, &blocks(4, 4), false).unwrap_err();
        assert!(
            matches!(err, SaveError::CloseFailed { path: p, .. } if p == path)
        );
    }

    #[test]
    fn reports_create_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("tex.ktx");
        let err = save_bc7(&path, 4, 4, &blocks(4, 4), false).unwrap_err();
        assert!(
            matches!(err, SaveError::CreateFailed { path: p, .. } if p == path)
        );
    }
}

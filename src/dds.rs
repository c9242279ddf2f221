use std::{
    io::{self, Write},
    mem::size_of,
};

use byteorder::{WriteBytesExt, LE};

use crate::{align_up, Surface};

pub const MAGIC: &[u8; 4] = b"DDS ";
pub const FOURCC_DX10: &[u8; 4] = b"DX10";

pub const DDSD_CAPS: u32 = 0x1;
pub const DDSD_HEIGHT: u32 = 0x2;
pub const DDSD_WIDTH: u32 = 0x4;
pub const DDSD_PIXELFORMAT: u32 = 0x1000;
pub const DDSD_LINEARSIZE: u32 = 0x80000;

pub const DDPF_FOURCC: u32 = 0x4;

pub const DDSCAPS_TEXTURE: u32 = 0x1000;

pub const DXGI_FORMAT_BC7_UNORM: u32 = 98;
pub const DXGI_FORMAT_BC7_UNORM_SRGB: u32 = 99;

/// Size of the surface descriptor, excluding the magic.
pub const HEADER_SIZE: u32 = 124;
pub const PIXEL_FORMAT_SIZE: u32 = 8 * size_of::<u32>() as u32;
pub const DX10_HEADER_SIZE: usize = 20;

/// `pitch_or_linear_size` as legacy loaders expect it: one byte per texel
/// of the 4-aligned surface.
pub fn linear_size(width: u32, height: u32) -> u64 {
    const PIXEL_FORMAT_BPP: u64 = 8;
    let width = align_up::<4>(width.into());
    let height = align_up::<4>(height.into());
    (width * height * PIXEL_FORMAT_BPP) >> 3
}

/// https://learn.microsoft.com/en-us/windows/win32/direct3ddds/dds-header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DdsHeader {
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub caps: u32,
    pub pixel_format: PixelFormat,
}

impl DdsHeader {
    pub fn bc7(width: u32, height: u32, linear_size: u32) -> Self {
        Self {
            flags: DDSD_WIDTH
                | DDSD_HEIGHT
                | DDSD_PIXELFORMAT
                | DDSD_CAPS
                | DDSD_LINEARSIZE,
            height,
            width,
            pitch_or_linear_size: linear_size,
            caps: DDSCAPS_TEXTURE,
            pixel_format: PixelFormat::dx10(),
        }
    }

    /// Writes the descriptor without the leading magic.
    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_u32::<LE>(HEADER_SIZE)?;
        w.write_u32::<LE>(self.flags)?;
        w.write_u32::<LE>(self.height)?;
        w.write_u32::<LE>(self.width)?;
        w.write_u32::<LE>(self.pitch_or_linear_size)?;
        // depth, mipmap count
        w.write_u32::<LE>(0)?;
        w.write_u32::<LE>(0)?;
        // reserved1
        for _ in 0..11 {
            w.write_u32::<LE>(0)?;
        }
        self.pixel_format.write(&mut w)?;
        w.write_u32::<LE>(self.caps)?;
        // caps2..caps4
        w.write_u32::<LE>(0)?;
        w.write_u32::<LE>(0)?;
        w.write_u32::<LE>(0)?;
        // reserved2
        w.write_u32::<LE>(0)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelFormat {
    pub flags: u32,
    pub four_cc: [u8; 4],
    pub rgb_bit_count: u32,
}

impl PixelFormat {
    /// FourCC `DX10`: format lives in the extended header.
    pub fn dx10() -> Self {
        Self {
            flags: DDPF_FOURCC,
            four_cc: *FOURCC_DX10,
            rgb_bit_count: 0,
        }
    }

    fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_u32::<LE>(PIXEL_FORMAT_SIZE)?;
        w.write_u32::<LE>(self.flags)?;
        w.write_all(&self.four_cc)?;
        w.write_u32::<LE>(self.rgb_bit_count)?;
        // channel masks
        for _ in 0..4 {
            w.write_u32::<LE>(0)?;
        }
        Ok(())
    }
}

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResDim {
    Texture2D = 3,
}

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphaMode {
    Unknown = 0,
}

/// https://learn.microsoft.com/en-us/windows/win32/direct3ddds/dds-header-dxt10
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dx10Header {
    pub dxgi_format: u32,
    pub resource_dimension: ResDim,
    pub misc_flag: u32,
    pub array_size: u32,
    pub alpha_mode: AlphaMode,
}

impl Dx10Header {
    pub fn bc7(srgb: bool) -> Self {
        Self {
            dxgi_format: if srgb {
                DXGI_FORMAT_BC7_UNORM_SRGB
            } else {
                DXGI_FORMAT_BC7_UNORM
            },
            resource_dimension: ResDim::Texture2D,
            misc_flag: 0,
            array_size: 1,
            alpha_mode: AlphaMode::Unknown,
        }
    }

    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_u32::<LE>(self.dxgi_format)?;
        w.write_u32::<LE>(self.resource_dimension as u32)?;
        w.write_u32::<LE>(self.misc_flag)?;
        w.write_u32::<LE>(self.array_size)?;
        w.write_u32::<LE>(self.alpha_mode as u32)?;
        Ok(())
    }
}

/// Writes magic, surface descriptor, DX10 header and `linear_size` bytes of
/// block data. No trailing padding.
pub fn write_dds<W: Write>(mut w: W, surface: &Surface) -> io::Result<()> {
    let pitch = linear_size(surface.width(), surface.height());
    let data = usize::try_from(pitch)
        .ok()
        .and_then(|len| surface.as_bytes().get(..len))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block data shorter than linear size {pitch}"),
            )
        })?;
    // `data` exists, so `pitch` is bounded by the validated image size
    let pitch = data.len() as u32;

    w.write_all(MAGIC)?;
    DdsHeader::bc7(surface.width(), surface.height(), pitch).write(&mut w)?;
    Dx10Header::bc7(surface.srgb()).write(&mut w)?;
    w.write_all(data)?;
    Ok(())
}

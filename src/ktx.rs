//! KTX 1.1 container writer for a single BC7 mip level.
//!
//! https://registry.khronos.org/KTX/specs/1.0/ktxspec.v1.html

use std::io::{self, Write};

use byteorder::{WriteBytesExt, LE};

use crate::Surface;

pub const IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];
pub const ENDIANNESS: u32 = 0x04030201;

pub const GL_RGBA: u32 = 0x1908;
pub const GL_COMPRESSED_RGBA_BPTC_UNORM: u32 = 0x8E8C;
pub const GL_COMPRESSED_SRGB_ALPHA_BPTC_UNORM: u32 = 0x8E8D;

/// Bytes taken by [`KtxHeader`] on disk.
pub const HEADER_SIZE: usize = 64;

/// How the mip level is padded after its image data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KtxPadding {
    /// `3 - ((image_size + 3) % 4)` zero bytes. Matches files written by
    /// older tools byte for byte, but leaves sizes with `size % 4 == 1`
    /// unaligned.
    #[default]
    Compatible,
    /// Pads to the next multiple of 4.
    Aligned,
}

impl KtxPadding {
    pub fn padding_for(self, image_size: u32) -> usize {
        let size = u64::from(image_size);
        let pad = match self {
            Self::Compatible => 3 - (size + 3) % 4,
            Self::Aligned => (4 - size % 4) % 4,
        };
        pad as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KtxHeader {
    pub gl_type: u32,
    pub gl_type_size: u32,
    pub gl_format: u32,
    pub gl_internal_format: u32,
    pub gl_base_internal_format: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub pixel_depth: u32,
    pub number_of_array_elements: u32,
    pub number_of_faces: u32,
    pub number_of_mipmap_levels: u32,
    pub bytes_of_key_value_data: u32,
}

impl KtxHeader {
    /// Header for a plain 2D BC7 texture with one face and one mip level.
    pub fn bc7(width: u32, height: u32, srgb: bool) -> Self {
        Self {
            // compressed data has no GL type/format
            gl_type: 0,
            gl_type_size: 1,
            gl_format: 0,
            gl_internal_format: if srgb {
                GL_COMPRESSED_SRGB_ALPHA_BPTC_UNORM
            } else {
                GL_COMPRESSED_RGBA_BPTC_UNORM
            },
            gl_base_internal_format: GL_RGBA,
            pixel_width: width,
            pixel_height: height,
            pixel_depth: 0,
            number_of_array_elements: 0,
            number_of_faces: 1,
            number_of_mipmap_levels: 1,
            bytes_of_key_value_data: 0,
        }
    }

    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_all(&IDENTIFIER)?;
        w.write_u32::<LE>(ENDIANNESS)?;
        w.write_u32::<LE>(self.gl_type)?;
        w.write_u32::<LE>(self.gl_type_size)?;
        w.write_u32::<LE>(self.gl_format)?;
        w.write_u32::<LE>(self.gl_internal_format)?;
        w.write_u32::<LE>(self.gl_base_internal_format)?;
        w.write_u32::<LE>(self.pixel_width)?;
        w.write_u32::<LE>(self.pixel_height)?;
        w.write_u32::<LE>(self.pixel_depth)?;
        w.write_u32::<LE>(self.number_of_array_elements)?;
        w.write_u32::<LE>(self.number_of_faces)?;
        w.write_u32::<LE>(self.number_of_mipmap_levels)?;
        w.write_u32::<LE>(self.bytes_of_key_value_data)?;
        Ok(())
    }
}

/// Writes header, the `imageSize` prefix, block data and mip padding.
pub fn write_ktx<W: Write>(
    mut w: W,
    surface: &Surface,
    padding: KtxPadding,
) -> io::Result<()> {
    KtxHeader::bc7(surface.width(), surface.height(), surface.srgb())
        .write(&mut w)?;

    let image_size = surface.data_size();
    w.write_u32::<LE>(image_size)?;
    w.write_all(surface.as_bytes())?;

    let pad = padding.padding_for(image_size);
    w.write_all(&[0; 3][..pad])?;
    Ok(())
}

use std::{fs, path::PathBuf, process::ExitCode};

use bc7_container::{
    blocks_from_bytes, dds::linear_size, save_bc7_with, Bc7Block, KtxPadding,
    SaveOptions,
};
use clap::Parser;
use env_logger::Env;

#[derive(Parser)]
struct Wrap {
    /// Raw BC7 blocks, 16 bytes each, row by row
    input: PathBuf,
    /// Destination; `.ktx` or `.dds` picks the container
    output: PathBuf,
    #[clap(long)]
    width: u32,
    #[clap(long)]
    height: u32,
    /// Mark the texture as sRGB instead of linear
    #[clap(long)]
    srgb: bool,
    /// Pad the KTX mip level to a 4-byte boundary instead of using the
    /// legacy padding
    #[clap(long)]
    aligned_padding: bool,
}

#[derive(Parser)]
struct Size {
    #[clap(long)]
    width: u32,
    #[clap(long)]
    height: u32,
}

#[derive(Parser)]
enum Opt {
    /// Wrap raw BC7 data into a KTX or DDS file
    Wrap(Wrap),
    /// Print the sizes a texture of the given dimensions is written with
    Size(Size),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let ok = match Opt::parse() {
        Opt::Wrap(opts) => wrap(opts),
        Opt::Size(opts) => {
            size(opts);
            true
        }
    };
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn wrap(opts: Wrap) -> bool {
    let data = match fs::read(&opts.input) {
        Ok(data) => data,
        Err(err) => {
            log::error!("Failed reading {}: {err}", opts.input.display());
            return false;
        }
    };
    let Some(blocks) = blocks_from_bytes(&data) else {
        log::error!(
            "{} is {} bytes, not a whole number of {}-byte blocks",
            opts.input.display(),
            data.len(),
            Bc7Block::SIZE
        );
        return false;
    };

    let options = SaveOptions {
        ktx_padding: if opts.aligned_padding {
            KtxPadding::Aligned
        } else {
            KtxPadding::Compatible
        },
    };
    // failures are already logged by the library
    let saved = save_bc7_with(
        &opts.output,
        opts.width,
        opts.height,
        &blocks,
        opts.srgb,
        &options,
    )
    .is_ok();
    if saved {
        log::info!(
            "Wrote {}x{} ({} blocks) to {}",
            opts.width,
            opts.height,
            blocks.len(),
            opts.output.display()
        );
    }
    saved
}

fn size(opts: Size) {
    let blocks_x = opts.width.div_ceil(4);
    let blocks_y = opts.height.div_ceil(4);
    let image_size = u64::from(blocks_x) * u64::from(blocks_y) * 16;
    println!("blocks: {blocks_x}x{blocks_y}");
    match u32::try_from(image_size) {
        Ok(image_size) => println!(
            "ktx: {image_size} bytes of image data, {} padding ({} aligned)",
            KtxPadding::Compatible.padding_for(image_size),
            KtxPadding::Aligned.padding_for(image_size),
        ),
        Err(_) => println!("ktx: {image_size} bytes, too large"),
    }
    println!(
        "dds: {} bytes linear size",
        linear_size(opts.width, opts.height)
    );
}

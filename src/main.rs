use clap::{Parser, Subcommand};
use darkroom::{Anchor, Fit, Image, ImageFormat, Toolchain};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "darkroom")]
#[command(about = "FFmpeg-backed image transformations")]
#[command(long_about = "\
FFmpeg-backed image transformations

Operations are collected into a single execution plan and run as one ffmpeg
invocation at commit time. When OUTPUT is omitted the source is overwritten
in place (staged through a temporary file, renamed atomically).

Operation order (flags compose in this fixed sequence):

  resize → crop-thumbnail → thumbnail → extent → crop → rotate → flop → flip

Quality is normalized 1-100 for every format. AVIF/JPEG/JPEG XL/WebP map it
onto the codec's native parameter; PNG and GIF are compacted after the run
via pngquant/gifsicle when installed (skipped with a warning otherwise).

External tools (override names/paths in a TOML file passed via --tools):

  ffmpeg, ffprobe        required
  exiftool               only for --preserve-metadata
  pngquant, gifsicle     only for --quality on PNG/GIF output")]
#[command(version = version_string())]
struct Cli {
    /// Toolchain config file (TOML: ffmpeg/ffprobe/... paths, timeout_secs)
    #[arg(long, global = true)]
    tools: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print source dimensions and frame count
    Probe {
        /// Image to probe
        input: PathBuf,
    },
    /// Transform an image
    Convert(ConvertArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Source image
    input: PathBuf,

    /// Destination; omit to overwrite the source in place
    output: Option<PathBuf>,

    /// Scale to WxH; leave one side empty to derive it (e.g. "800x")
    #[arg(long, value_name = "WxH")]
    resize: Option<String>,

    /// Aspect-preserving fit policy for --resize
    #[arg(long, value_parser = parse_fit, value_name = "upscale|downscale")]
    fit: Option<Fit>,

    /// Fill a WxH box exactly: upscale-fit, then center-crop the overflow
    #[arg(long, value_name = "WxH")]
    crop_thumbnail: Option<String>,

    /// Fit inside a WxH box and letterbox with the background color
    #[arg(long, value_name = "WxH")]
    thumbnail: Option<String>,

    /// Grow the canvas: WxH+X+Y, or WxH@anchor (e.g. "500x500@center")
    #[arg(long, value_name = "WxH+X+Y")]
    extent: Option<String>,

    /// Extract a region: WxH+X+Y, or WxH@anchor (e.g. "300x300@center")
    #[arg(long, value_name = "WxH+X+Y")]
    crop: Option<String>,

    /// Rotate by degrees, filling corners with the background color
    #[arg(long, value_name = "DEGREES", allow_hyphen_values = true)]
    rotate: Option<i32>,

    /// Mirror horizontally
    #[arg(long)]
    flop: bool,

    /// Mirror vertically
    #[arg(long)]
    flip: bool,

    /// Quality 1 (worst) to 100 (best); omit for codec defaults
    #[arg(long)]
    quality: Option<u32>,

    /// Output format; inferred from the destination suffix when omitted
    #[arg(long, value_parser = parse_format)]
    format: Option<ImageFormat>,

    /// Codec override passed to the engine
    #[arg(long)]
    codec: Option<String>,

    /// Fill color: a name, #RRGGBB, or #RRGGBBAA
    #[arg(long, value_name = "COLOR")]
    background: Option<String>,

    /// Loop count for animated output: -1 none, 0 infinite, N extra plays
    #[arg(long = "loop", value_name = "COUNT", allow_hyphen_values = true)]
    loop_count: Option<i32>,

    /// Cap the frame rate of animated output
    #[arg(long)]
    fps: Option<u32>,

    /// Collapse an animated source to its first frame
    #[arg(long)]
    still: bool,

    /// Re-apply the source's metadata after the engine strips it.
    /// Tags may carry GPS positions or device serials
    #[arg(long)]
    preserve_metadata: bool,
}

fn parse_fit(value: &str) -> Result<Fit, String> {
    match value {
        "upscale" | "up" => Ok(Fit::Upscale),
        "downscale" | "down" => Ok(Fit::Downscale),
        other => Err(format!("unknown fit policy: {other}")),
    }
}

fn parse_format(value: &str) -> Result<ImageFormat, String> {
    match value.to_ascii_lowercase().as_str() {
        "png" => Ok(ImageFormat::Png),
        "apng" => Ok(ImageFormat::Apng),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "gif" => Ok(ImageFormat::Gif),
        "webp" => Ok(ImageFormat::Webp),
        "avif" => Ok(ImageFormat::Avif),
        "bmp" => Ok(ImageFormat::Bmp),
        "jxl" | "jpegxl" => Ok(ImageFormat::JpegXl),
        other => Err(format!("unknown format: {other}")),
    }
}

/// Parse "WxH" with either side omissible: "800x600", "800x", "x600".
fn parse_dimensions(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got \"{value}\""))?;
    let parse = |s: &str| -> Result<u32, String> {
        if s.is_empty() {
            Ok(0)
        } else {
            s.parse().map_err(|_| format!("bad dimension \"{s}\""))
        }
    };
    Ok((parse(w)?, parse(h)?))
}

/// Parse "WxH+X+Y" or "WxH@anchor" region placements.
fn parse_region(value: &str) -> Result<(u32, u32, Placement), String> {
    if let Some((dims, anchor)) = value.split_once('@') {
        let (w, h) = parse_dimensions(dims)?;
        return Ok((w, h, Placement::Anchored(parse_anchor(anchor)?)));
    }
    match value.split('+').collect::<Vec<_>>().as_slice() {
        [dims] => {
            let (w, h) = parse_dimensions(dims)?;
            Ok((w, h, Placement::Offset(0, 0)))
        }
        [dims, x, y] => {
            let (w, h) = parse_dimensions(dims)?;
            let x = x.parse().map_err(|_| format!("bad offset \"{x}\""))?;
            let y = y.parse().map_err(|_| format!("bad offset \"{y}\""))?;
            Ok((w, h, Placement::Offset(x, y)))
        }
        _ => Err(format!("expected WxH+X+Y or WxH@anchor, got \"{value}\"")),
    }
}

fn parse_anchor(value: &str) -> Result<Anchor, String> {
    match value {
        "top-left" => Ok(Anchor::TopLeft),
        "top" => Ok(Anchor::Top),
        "top-right" => Ok(Anchor::TopRight),
        "left" => Ok(Anchor::Left),
        "center" => Ok(Anchor::Center),
        "right" => Ok(Anchor::Right),
        "bottom-left" => Ok(Anchor::BottomLeft),
        "bottom" => Ok(Anchor::Bottom),
        "bottom-right" => Ok(Anchor::BottomRight),
        other => Err(format!("unknown anchor: {other}")),
    }
}

enum Placement {
    Offset(u32, u32),
    Anchored(Anchor),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let tools = match &cli.tools {
        Some(path) => Toolchain::load(path)?,
        None => Toolchain::default(),
    };

    match cli.command {
        Command::Probe { input } => {
            let image = Image::open_with(
                &input,
                std::sync::Arc::new(darkroom::SystemExecutor::new()),
                tools,
            )?;
            println!(
                "{}: {}x{}, {} frame(s)",
                input.display(),
                image.native_width(),
                image.native_height(),
                image.frames().max(1),
            );
        }
        Command::Convert(args) => {
            let mut image = Image::open_with(
                &args.input,
                std::sync::Arc::new(darkroom::SystemExecutor::new()),
                tools,
            )?;

            if let Some(color) = &args.background {
                image.set_background_color(color);
            }
            if let Some(resize) = &args.resize {
                let (w, h) = parse_dimensions(resize)?;
                match args.fit {
                    Some(fit) => image.resize_fit(w, h, fit),
                    None => image.resize(w, h),
                };
            }
            if let Some(value) = &args.crop_thumbnail {
                let (w, h) = parse_dimensions(value)?;
                image.crop_thumbnail(w, h);
            }
            if let Some(value) = &args.thumbnail {
                let (w, h) = parse_dimensions(value)?;
                image.thumbnail(w, h);
            }
            if let Some(value) = &args.extent {
                match parse_region(value)? {
                    (w, h, Placement::Offset(x, y)) => image.extent(w, h, x, y),
                    (w, h, Placement::Anchored(anchor)) => image.extent_anchor(w, h, anchor),
                };
            }
            if let Some(value) = &args.crop {
                match parse_region(value)? {
                    (w, h, Placement::Offset(x, y)) => image.crop(w, h, x, y),
                    (w, h, Placement::Anchored(anchor)) => image.crop_anchor(w, h, anchor),
                };
            }
            if let Some(degrees) = args.rotate {
                image.rotate(degrees);
            }
            if args.flop {
                image.flop();
            }
            if args.flip {
                image.flip();
            }
            if let Some(quality) = args.quality {
                image.set_quality(quality);
            }
            if let Some(format) = args.format {
                image.set_format(format);
            }
            if let Some(codec) = &args.codec {
                image.set_codec(codec);
            }
            if let Some(count) = args.loop_count {
                image.set_loop(count);
            }
            if let Some(fps) = args.fps {
                image.set_framerate(fps);
            }
            if args.still {
                image.drop_frames();
            }
            if args.preserve_metadata {
                image.preserve_metadata();
            }

            match &args.output {
                Some(output) => image.write(output)?,
                None => image.overwrite()?,
            }

            let written = args.output.as_deref().unwrap_or(&args.input);
            println!(
                "{} -> {} ({}x{})",
                args.input.display(),
                written.display(),
                image.width(),
                image.height(),
            );
        }
    }

    Ok(())
}

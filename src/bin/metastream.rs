//! metastream CLI - inspect and extract JPEG/PNG metadata blocks.
//!
//! The file is streamed through the incremental reader in fixed-size chunks,
//! the same way a network client would feed it.

use clap::{Parser, Subcommand, ValueEnum};
use metastream_rs::{ImageType, MetadataReader, ProfileSource, ReaderOptions};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Incremental EXIF, XMP, ICC and IPTC extraction for JPEG and PNG
#[derive(Parser)]
#[command(name = "metastream")]
#[command(author = "metastream-rs contributors")]
#[command(version)]
#[command(about = "Stream JPEG/PNG files and report or extract their metadata blocks", long_about = None)]
#[command(after_help = "EXAMPLES:
    metastream info -i photo.jpg
    metastream info -i image.png --chunk-size 1 --extended
    metastream extract -i photo.jpg --exif photo.exif --xmp photo.xmp
    metastream extract -i image.png --icc image.icc")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the metadata blocks found in an image
    ///
    /// Reports which blocks were captured, their sizes, the colour profile
    /// the image describes and its XMP properties.
    #[command(visible_alias = "i")]
    Info {
        #[command(flatten)]
        source: SourceArgs,

        /// Also list every decoded EXIF field
        #[arg(short, long)]
        extended: bool,
    },

    /// Write the captured metadata blocks to files
    #[command(visible_alias = "x")]
    Extract {
        #[command(flatten)]
        source: SourceArgs,

        /// Output path for the raw EXIF block (JPEG only)
        #[arg(long)]
        exif: Option<PathBuf>,

        /// Output path for the XMP packet
        #[arg(long)]
        xmp: Option<PathBuf>,

        /// Output path for the ICC profile
        #[arg(long)]
        icc: Option<PathBuf>,

        /// Output path for the raw IPTC block (JPEG only)
        #[arg(long)]
        iptc: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Input file path
    #[arg(short, long, help = "Path to the JPEG or PNG file")]
    input: PathBuf,

    /// Container type; detected from the magic bytes by default
    #[arg(short = 't', long = "type", default_value = "auto", value_enum)]
    image_type: TypeArg,

    /// Number of bytes handed to the reader per call
    #[arg(short, long, default_value = "4096")]
    chunk_size: usize,

    /// Maximum size of an inflated PNG ICC profile in bytes
    #[arg(long, default_value_t = ReaderOptions::default().max_icc_size)]
    max_icc_size: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum TypeArg {
    /// Detect from the first bytes of the file
    Auto,
    Jpeg,
    Png,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Info { source, extended } => show_info(&source, extended),
        Commands::Extract {
            source,
            exif,
            xmp,
            icc,
            iptc,
        } => extract_blocks(&source, exif, xmp, icc, iptc),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct StreamSummary {
    reader: MetadataReader,
    bytes_read: u64,
}

fn detect_type(path: &Path, requested: TypeArg) -> Result<ImageType, Box<dyn std::error::Error>> {
    match requested {
        TypeArg::Jpeg => Ok(ImageType::Jpeg),
        TypeArg::Png => Ok(ImageType::Png),
        TypeArg::Auto => {
            let mut head = [0u8; 8];
            let mut file = File::open(path)?;
            let mut filled = 0;
            while filled < head.len() {
                let n = file.read(&mut head[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            ImageType::sniff(&head[..filled])
                .ok_or_else(|| format!("{:?} is neither a JPEG nor a PNG file", path).into())
        }
    }
}

/// Feeds the file through a reader chunk by chunk, stopping early once the
/// reader has everything it wants.
fn stream_file(source: &SourceArgs) -> Result<StreamSummary, Box<dyn std::error::Error>> {
    if source.chunk_size == 0 {
        return Err("chunk size must be at least 1".into());
    }

    let image_type = detect_type(&source.input, source.image_type)?;
    let options = ReaderOptions::default().with_max_icc_size(source.max_icc_size);
    let mut reader = MetadataReader::with_options(image_type, options);

    let mut file = File::open(&source.input)?;
    let mut buffer = vec![0u8; source.chunk_size];
    let mut bytes_read = 0u64;

    while !reader.finished() {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        bytes_read += n as u64;
        reader.consume(&buffer[..n]);
    }

    log::debug!("streamed {} bytes, finished: {}", bytes_read, reader.finished());
    Ok(StreamSummary { reader, bytes_read })
}

fn describe_size(block: Option<usize>) -> String {
    match block {
        Some(len) => format!("{} bytes", len),
        None => "-".to_string(),
    }
}

fn show_info(source: &SourceArgs, extended: bool) -> Result<(), Box<dyn std::error::Error>> {
    let StreamSummary {
        mut reader,
        bytes_read,
    } = stream_file(source)?;
    let image_type = reader.image_type();

    println!("File: {:?}", source.input);
    println!("Format: {}", image_type.name());
    println!("Bytes scanned: {}", bytes_read);
    println!("Finished: {}", if reader.finished() { "Yes" } else { "No" });
    println!();

    let profile = reader.get_color_profile();
    let xmp = reader.get_xmp();
    let icc = reader.get_raw_icc();
    let decoded = reader.get_exif_decoded();
    let exif = reader.get_raw_exif();
    let iptc = reader.get_raw_iptc();

    println!("Blocks:");
    if image_type == ImageType::Jpeg {
        println!("  EXIF:  {}", describe_size(exif.as_ref().map(Vec::len)));
        println!("  IPTC:  {}", describe_size(iptc.as_ref().map(Vec::len)));
    }
    println!("  XMP:   {}", describe_size(xmp.as_ref().map(|x| x.as_bytes().len())));
    println!("  ICC:   {}", describe_size(icc.as_ref().map(Vec::len)));
    println!();

    match profile {
        Some(profile) => {
            let source = match profile.source() {
                ProfileSource::Embedded => "embedded ICC",
                ProfileSource::BuiltinSrgb => "built-in sRGB",
                ProfileSource::Synthesized => "synthesized from colorimetry",
            };
            println!("Color profile: {}", source);
            if let Some(description) = profile.description() {
                println!("  Description: {}", description);
            }
            if let Some(c) = profile.colorimetry() {
                println!("  White point: ({:.4}, {:.4})", c.white_point.x, c.white_point.y);
                println!(
                    "  Primaries:   R({:.4}, {:.4}) G({:.4}, {:.4}) B({:.4}, {:.4})",
                    c.red.x, c.red.y, c.green.x, c.green.y, c.blue.x, c.blue.y
                );
                println!("  Gamma:       {:.4}", c.gamma);
            }
        }
        None => println!("Color profile: none"),
    }

    if let Some(xmp) = xmp {
        match xmp.properties() {
            Ok(properties) if !properties.is_empty() => {
                println!();
                println!("XMP properties:");
                for property in properties {
                    println!("  {} = {}", property.name, property.value);
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("XMP packet could not be parsed: {}", e),
        }
    }

    if let Some(decoded) = decoded.filter(|_| extended) {
        println!();
        println!("EXIF fields:");
        for field in decoded.fields() {
            println!("  {} = {}", field.tag, field.display_value().with_unit(&decoded));
        }
    }

    Ok(())
}

fn write_block(
    what: &str,
    path: Option<PathBuf>,
    data: Option<Vec<u8>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(());
    };
    match data {
        Some(data) => {
            fs::write(&path, &data)?;
            println!("✓ Wrote {} ({} bytes) to {:?}", what, data.len(), path);
        }
        None => println!("✗ No {} block found", what),
    }
    Ok(())
}

fn extract_blocks(
    source: &SourceArgs,
    exif: Option<PathBuf>,
    xmp: Option<PathBuf>,
    icc: Option<PathBuf>,
    iptc: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if exif.is_none() && xmp.is_none() && icc.is_none() && iptc.is_none() {
        return Err("nothing to extract; pass at least one of --exif, --xmp, --icc, --iptc".into());
    }

    let StreamSummary { mut reader, .. } = stream_file(source)?;

    write_block("XMP", xmp, reader.get_xmp().map(|x| x.into_bytes()))?;
    write_block("ICC", icc, reader.get_raw_icc())?;
    write_block("EXIF", exif, reader.get_raw_exif())?;
    write_block("IPTC", iptc, reader.get_raw_iptc())?;
    Ok(())
}

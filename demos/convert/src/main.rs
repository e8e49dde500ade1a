use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use istree::{FileStream, Format, Serializer};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WireFormat {
    Binary,
    Text,
    Json,
}

impl From<WireFormat> for Format {
    fn from(value: WireFormat) -> Self {
        match value {
            WireFormat::Binary => Format::Binary,
            WireFormat::Text => Format::Text,
            WireFormat::Json => Format::Json,
        }
    }
}

/// Converts an IST dump between the binary, text and JSON wire formats.
///
/// The tree itself is read and rewritten unchanged; this only exercises the
/// codec layer, not a publisher graph.
#[derive(Debug, Parser)]
struct Cli {
    /// The dump to read.
    input: PathBuf,

    /// The format `input` is encoded in.
    #[arg(short = 'f', long, value_enum)]
    from: WireFormat,

    /// The file to write the converted dump to.
    output: PathBuf,

    /// The format to write `output` in.
    #[arg(short = 't', long, value_enum)]
    to: WireFormat,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut serializer = Serializer::new();

    let mut input = FileStream::open(&cli.input)
        .with_context(|| format!("opening `{}`", cli.input.display()))?;
    serializer
        .stream_to_ist(&mut input, cli.from.into())
        .with_context(|| format!("decoding `{}` as {:?}", cli.input.display(), cli.from))?;

    let damage = serializer.damage();
    if !damage.is_empty() {
        for line in &damage {
            log::warn!("damaged node: {line}");
        }
        log::warn!("{} node(s) were damaged and skipped", damage.len());
    }

    let mut output = FileStream::create(&cli.output)
        .with_context(|| format!("creating `{}`", cli.output.display()))?;
    serializer
        .ist_to_stream(&mut output, cli.to.into())
        .with_context(|| format!("encoding `{}` as {:?}", cli.output.display(), cli.to))?;

    log::info!(
        "converted `{}` ({:?}) to `{}` ({:?})",
        cli.input.display(),
        cli.from,
        cli.output.display(),
        cli.to
    );

    Ok(())
}

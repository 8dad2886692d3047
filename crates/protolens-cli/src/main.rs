//! protolens - Inspect Protocol Buffer payloads without a schema
//!
//! This tool takes a hex or base64 payload, guesses its field structure and
//! prints the resulting tree as an outline or as JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, ValueEnum};
use protolens_core::input::parse_payload_with_encoding;
use protolens_core::render::walk;
use protolens_core::{Decoded, Decoder, DecoderConfig, EmptyPayload, StatsVisitor, TextRenderer};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Inspect Protocol Buffer payloads without a .proto schema
#[derive(Parser, Debug)]
#[command(name = "protolens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Read --file as raw binary instead of hex/base64 text
    #[arg(long, requires = "file")]
    binary: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Do not look for a gRPC length prefix
    #[arg(long)]
    no_grpc_header: bool,

    /// Maximum nesting depth to decode
    #[arg(long, default_value = "64")]
    max_depth: usize,

    /// Show empty length-delimited fields as empty strings instead of empty messages
    #[arg(long)]
    empty_as_leaf: bool,

    /// Do not report undecodable trailing bytes
    #[arg(long)]
    no_leftover: bool,

    /// Print node statistics after the tree
    #[arg(long)]
    stats: bool,
}

#[derive(Args, Debug)]
#[group(required = false, multiple = false)]
struct InputMode {
    /// Payload text (hex or base64); read from stdin when no input is given
    #[arg(short, long)]
    data: Option<String>,

    /// Path to a file containing the payload
    #[arg(short, long)]
    file: Option<PathBuf>,
}

/// Output format for decoded trees
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Indented outline
    Text,
    /// Pretty-printed JSON
    Json,
}

impl Cli {
    fn decoder_config(&self) -> DecoderConfig {
        let empty_payload = if self.empty_as_leaf {
            EmptyPayload::AsLeaf
        } else {
            EmptyPayload::AsMessage
        };

        DecoderConfig::new()
            .grpc_header(!self.no_grpc_header)
            .max_depth(self.max_depth)
            .empty_payload(empty_payload)
            .leftover_node(!self.no_leftover)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let payload = load_payload(&cli)?;
    let output = decode_and_render(&cli, payload)?;
    print!("{}", output);

    Ok(())
}

/// Collect the payload bytes from whichever input was selected
fn load_payload(cli: &Cli) -> Result<Vec<u8>> {
    if let Some(ref text) = cli.input.data {
        return parse_text(text);
    }

    if let Some(ref file) = cli.input.file {
        return load_file(file, cli.binary);
    }

    debug!("Reading payload from stdin");
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read payload from stdin")?;
    parse_text(&text)
}

fn load_file(path: &Path, binary: bool) -> Result<Vec<u8>> {
    if binary {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        info!("Read {} raw bytes from {}", bytes.len(), path.display());
        return Ok(bytes);
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    parse_text(&text)
}

fn parse_text(text: &str) -> Result<Vec<u8>> {
    let (bytes, encoding) =
        parse_payload_with_encoding(text).context("Payload is neither hex nor base64")?;
    info!("Decoded {} bytes of {:?} payload", bytes.len(), encoding);
    Ok(bytes)
}

/// Decode the payload and render it in the requested format
fn decode_and_render(cli: &Cli, payload: Vec<u8>) -> Result<String> {
    let decoder = Decoder::with_config(cli.decoder_config());

    let decoded = decoder.decode(payload);
    if let Some(header) = decoded.grpc_header {
        info!("Skipped gRPC header (message length {})", header.length);
    }
    if let Some(summary) = stop_summary(&decoded) {
        warn!("{}", summary);
    }

    let tree = decoded.nodes(decoder.config().leftover_node);

    let mut output = match cli.format {
        OutputFormat::Text => TextRenderer::new()
            .render(&tree)
            .context("Failed to render tree")?,
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(&tree).context("Failed to serialize tree")?;
            json.push('\n');
            json
        }
    };

    if cli.stats {
        let mut stats = StatsVisitor::default();
        walk(&tree, &mut stats).context("Failed to collect statistics")?;
        output.push_str(&format!("{}\n", stats));
    }

    Ok(output)
}

/// Where decoding stopped and why, if it did not reach the end.
///
/// The failed read can start past the field boundary, e.g. at the length
/// prefix of a short string; that position is reported separately.
fn stop_summary(decoded: &Decoded) -> Option<String> {
    let error = decoded.error.as_ref()?;
    let mut summary = format!(
        "Stopped at offset {} with {} bytes left",
        decoded.leftover.start,
        decoded.leftover.len()
    );
    if let Some(offset) = error.offset().filter(|&o| o != decoded.leftover.start) {
        summary.push_str(&format!(", failed read at offset {}", offset));
    }
    summary.push_str(&format!(": {}", error));
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse_args(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("protolens").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_decoder_config_from_flags() {
        let cli = parse_args(&[
            "--data",
            "00",
            "--no-grpc-header",
            "--max-depth",
            "3",
            "--empty-as-leaf",
            "--no-leftover",
        ]);
        let config = cli.decoder_config();
        assert!(!config.grpc_header);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.empty_payload, EmptyPayload::AsLeaf);
        assert!(!config.leftover_node);
    }

    #[test]
    fn test_data_and_file_conflict() {
        let result = Cli::try_parse_from(["protolens", "--data", "00", "--file", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_binary_requires_file() {
        assert!(Cli::try_parse_from(["protolens", "--binary"]).is_err());
    }

    #[test]
    fn test_text_output() {
        let cli = parse_args(&["--data", "08 96 01 12 07 74 65 73 74 69 6e 67"]);
        let payload = load_payload(&cli).unwrap();
        let output = decode_and_render(&cli, payload).unwrap();
        assert_eq!(output, "1: varint = 150\n2: string = \"testing\"\n");
    }

    #[test]
    fn test_json_output_with_stats() {
        let cli = parse_args(&["--data", "CJYB", "--format", "json", "--stats"]);
        let payload = load_payload(&cli).unwrap();
        let output = decode_and_render(&cli, payload).unwrap();
        assert!(output.contains("\"field_number\": 1"));
        assert!(output.contains("\"value\": \"150\""));
        assert!(output.ends_with("1 nodes (1 varint, 0 string, 0 message, 0 fixed32, 0 fixed64, 0 unknown), depth 1\n"));
    }

    #[test]
    fn test_leftover_reported() {
        let cli = parse_args(&["--data", "08 01 ff"]);
        let output = decode_and_render(&cli, load_payload(&cli).unwrap()).unwrap();
        assert_eq!(output, "1: varint = 1\n0: unknown = ff\n");

        let cli = parse_args(&["--data", "08 01 ff", "--no-leftover"]);
        let output = decode_and_render(&cli, load_payload(&cli).unwrap()).unwrap();
        assert_eq!(output, "1: varint = 1\n");
    }

    #[test]
    fn test_stop_summary() {
        let decoded = Decoder::new().decode(vec![0x08, 0x01, 0xff]);
        assert_eq!(
            stop_summary(&decoded).as_deref(),
            Some("Stopped at offset 2 with 1 bytes left: truncated input at offset 2")
        );

        // The payload read starts at 4 but the field starts at 2
        let decoded = Decoder::new().decode(vec![0x08, 0x01, 0x12, 0x05, 0x61, 0x62]);
        let summary = stop_summary(&decoded).unwrap();
        assert!(summary.starts_with("Stopped at offset 2 with 4 bytes left, failed read at offset 4: "));

        let decoded = Decoder::new().decode(vec![0x08, 0x01]);
        assert_eq!(stop_summary(&decoded), None);
    }

    #[test]
    fn test_text_file_input() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0x08 0x96 0x01").unwrap();

        let path = file.path().to_str().unwrap();
        let cli = parse_args(&["--file", path]);
        assert_eq!(load_payload(&cli).unwrap(), vec![0x08, 0x96, 0x01]);
    }

    #[test]
    fn test_binary_file_input() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x08, 0x96, 0x01]).unwrap();

        let path = file.path().to_str().unwrap();
        let cli = parse_args(&["--file", path, "--binary"]);
        assert_eq!(load_payload(&cli).unwrap(), vec![0x08, 0x96, 0x01]);
    }

    #[test]
    fn test_missing_file() {
        let cli = parse_args(&["--file", "/nonexistent/payload.txt"]);
        assert!(load_payload(&cli).is_err());
    }

    #[test]
    fn test_invalid_text() {
        let cli = parse_args(&["--data", "zz!!"]);
        assert!(load_payload(&cli).is_err());
    }
}

#[macro_use]
extern crate clap;

use asm86::CpuTarget;
use asm86_util::Endian;
use byteorder::WriteBytesExt;
use clap::Arg;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use asm86_asm::SourceMapItem;

const MBR_SIZE: usize = 510;
const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];

#[derive(Debug)]
enum IOErrorContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Asm(asm86_asm::Error),
    Io(std::io::Error, IOErrorContext, PathBuf),
    ImageTooLargeForMbr(usize),
    BadCpuTarget(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => writeln!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IOErrorContext::ReadInput => "Reading input",
                    IOErrorContext::WriteOutput => "Writing output",
                },
                path.display(),
                err
            ),
            Error::Asm(err) => {
                writeln!(f, "Assembling input failed:")?;
                write!(f, "{}", err)
            }
            Error::ImageTooLargeForMbr(len) => write!(
                f,
                "Image is {} bytes, which does not fit in a {}-byte MBR boot sector!",
                len, MBR_SIZE
            ),
            Error::BadCpuTarget(value) => write!(
                f,
                "\"{}\" is not a known CPU target (try I8086, I186, I286, I386 or I486)",
                value
            ),
        }
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input source file to assemble")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the file to write the assembled image to"),
        )
        .arg(
            Arg::with_name("cpu")
                .long("cpu")
                .takes_value(true)
                .value_name("CPU")
                .help("Minimum CPU target: I8086, I186, I286, I386 or I486 (default I486)"),
        )
        .arg(
            Arg::with_name("mbr")
                .long("mbr")
                .help("Pad the image to 510 bytes and append the 0x55 0xAA boot signature"),
        )
        .arg(
            Arg::with_name("listing")
                .long("listing")
                .takes_value(true)
                .value_name("LISTING")
                .help("Sets the file to write a NASM-style listing to"),
        )
        .arg(
            Arg::with_name("labels")
                .long("labels")
                .takes_value(true)
                .value_name("LABELS")
                .help("Sets the file to write resolved label addresses to"),
        )
        .arg(
            Arg::with_name("source_map")
                .short("m")
                .long("source-map")
                .takes_value(true)
                .value_name("SOURCE_MAP")
                .help("Sets the file to write the binary source map to"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");
    let cpu = matches.value_of("cpu");
    let mbr = matches.is_present("mbr");
    let listing = matches.value_of("listing");
    let labels = matches.value_of("labels");
    let source_map = matches.value_of("source_map");

    if let Err(err) = run(input, output, cpu, mbr, listing, labels, source_map) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn run(
    input: &str,
    output: Option<&str>,
    cpu: Option<&str>,
    mbr: bool,
    listing: Option<&str>,
    labels: Option<&str>,
    source_map: Option<&str>,
) -> Result<(), Error> {
    let input_path = Path::new(input);
    let source = read_to_string(input_path)?;

    let cpu_target = match cpu {
        Some(name) => name
            .parse::<CpuTarget>()
            .map_err(|_| Error::BadCpuTarget(name.to_owned()))?,
        None => CpuTarget::default(),
    };

    let (image, map) =
        asm86_asm::assemble_with_cpu(&source, cpu_target).map_err(Error::Asm)?;

    let mut bytes = image.bytes.clone();
    if mbr {
        pad_mbr(&mut bytes)?;
    }

    let output_path: PathBuf = output
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.with_extension("bin"));
    write_file(&output_path, &bytes)?;

    if let Some(path_str) = listing {
        let path = PathBuf::from(path_str);
        write_listing(&path, &source, &image, &map)?;
    }

    if let Some(path_str) = labels {
        let path = PathBuf::from(path_str);
        write_labels(&path, &image)?;
    }

    if let Some(path_str) = source_map {
        let path = PathBuf::from(path_str);
        write_source_map(&path, &map)?;
    }

    Ok(())
}

fn read_to_string(path: &Path) -> Result<String, Error> {
    let file =
        File::open(path).map_err(|err| Error::Io(err, IOErrorContext::ReadInput, path.to_owned()))?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, path.to_owned()))?;
    Ok(contents)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let mut writer = BufWriter::new(
        File::create(path)
            .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, path.to_owned()))?,
    );
    writer
        .write_all(bytes)
        .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, path.to_owned()))
}

fn pad_mbr(bytes: &mut Vec<u8>) -> Result<(), Error> {
    if bytes.len() > MBR_SIZE {
        return Err(Error::ImageTooLargeForMbr(bytes.len()));
    }
    bytes.resize(MBR_SIZE, 0);
    bytes.extend_from_slice(&MBR_SIGNATURE);
    Ok(())
}

fn write_source_map(path: &Path, map: &[SourceMapItem]) -> Result<(), Error> {
    let mut writer = BufWriter::new(
        File::create(path)
            .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, path.to_owned()))?,
    );
    (|| -> std::io::Result<()> {
        for item in map {
            writer.write_u32::<Endian>(item.start_line)?;
            writer.write_u32::<Endian>(item.line_count)?;
        }
        Ok(())
    })()
    .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, path.to_owned()))
}

fn write_labels(path: &Path, image: &asm86::Image) -> Result<(), Error> {
    let mut names: Vec<&String> = image.labels.keys().collect();
    names.sort();
    let mut out = String::new();
    for name in names {
        out.push_str(&format!("{} = 0x{:X}\n", name, image.labels[name]));
    }
    write_file(path, out.as_bytes())
}

/// A simplified NASM-style listing: the assembled image as one hex block
/// followed by the numbered source, one `SourceMapItem` per emitting line.
/// Unlike NASM's per-instruction byte columns, this does not reconstruct
/// per-instruction byte ranges from the flat `Image` (see DESIGN.md).
fn write_listing(
    path: &Path,
    source: &str,
    image: &asm86::Image,
    map: &[SourceMapItem],
) -> Result<(), Error> {
    let emitting_lines: std::collections::HashSet<u32> =
        map.iter().map(|item| item.start_line).collect();

    let mut out = String::new();
    out.push_str(&format!("; origin 0x{:X}\n", image.origin));
    for (row, chunk) in image.bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        out.push_str(&format!(
            "; {:08X}  {}\n",
            image.origin as usize + row * 16,
            hex.join(" ")
        ));
    }
    out.push('\n');
    for (i, line) in source.lines().enumerate() {
        let row = (i + 1) as u32;
        let marker = if emitting_lines.contains(&row) { '*' } else { ' ' };
        out.push_str(&format!("{:5} {} {}\n", row, marker, line));
    }
    write_file(path, out.as_bytes())
}

// SPDX-License-Identifier: Apache-2.0

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use laxdoc::{Error, Value, WriteOptions};

#[derive(Parser)]
#[command(name = "laxdoc")]
#[command(about = "Reads a relaxed JSON or INI document and prints it as JSON.", long_about = None)]
struct Cli {
    /// Input file; standard input when omitted.
    file: Option<PathBuf>,

    /// Parse the input as INI.
    #[arg(long)]
    ini: bool,

    /// Print only the value at this dotted path.
    #[arg(short, long)]
    key: Option<String>,

    #[arg(short, long)]
    pretty: bool,

    /// Indent width for --pretty.
    #[arg(long, default_value_t = 2)]
    indent: usize,

    /// Sort object keys.
    #[arg(short = 'S', long)]
    sort: bool,

    /// Escape non-ASCII characters as \u sequences.
    #[arg(short, long)]
    ascii: bool,

    /// Write the result back into FILE.
    #[arg(short, long, requires = "file")]
    replace: bool,

    /// Print key-frequency statistics instead of the document.
    #[arg(long)]
    stats: bool,

    /// Deepest statistics level to print.
    #[arg(long)]
    stats_depth: Option<usize>,

    /// Hide keys found in fewer than this share of their objects.
    #[arg(long, default_value_t = 0.0)]
    min_ratio: f64,
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(1)
        }
    }
}

fn read_input(cli: &Cli) -> Result<Value, Error> {
    match (&cli.file, cli.ini) {
        (Some(path), true) => laxdoc::parse_ini_file(path),
        (Some(path), false) => laxdoc::parse_file(path),
        (None, ini) => {
            let mut input = Vec::new();
            std::io::stdin()
                .read_to_end(&mut input)
                .map_err(|e| Error::Io {
                    path: PathBuf::from("<stdin>"),
                    source: e,
                })?;
            if ini {
                Ok(laxdoc::parse_ini(&input)?)
            } else {
                Ok(laxdoc::parse(&input)?)
            }
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let root = read_input(&cli)?;
    let mut stdout = std::io::stdout().lock();

    if cli.stats {
        let stats = laxdoc::collect_key_stats(&root)?;
        stdout.write_all(stats.render(cli.stats_depth, cli.min_ratio).as_bytes())?;
        return Ok(());
    }

    let options = WriteOptions::new()
        .with_pretty(cli.pretty)
        .with_indent(cli.indent)
        .with_sort_keys(cli.sort)
        .with_escape_unicode(cli.ascii);

    if let Some(key) = &cli.key {
        let value = root
            .select(key)
            .ok_or_else(|| format!("ERROR: key '{}' not found", key))?;
        laxdoc::write_to(value, &WriteOptions::new(), &mut stdout)?;
        stdout.write_all(b"\n")?;
        return Ok(());
    }

    match &cli.file {
        Some(path) if cli.replace => laxdoc::write_file(path, &root, &options)?,
        _ => {
            laxdoc::write_to(&root, &options, &mut stdout)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

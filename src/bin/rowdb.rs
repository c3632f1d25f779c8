//! # RowDB CLI Entry Point
//!
//! Binary entry point for the RowDB shell.
//!
//! ## Usage
//!
//! ```bash
//! # Open an existing table
//! rowdb ./people.rdb
//!
//! # Create a table with two fields of 10 and 20 characters
//! rowdb --create --fields 10,20 ./people.rdb
//!
//! # Create with an explicit index block size
//! rowdb --create --fields 10,20 --block-size 60 ./people.rdb
//!
//! # Show version / help
//! rowdb --version
//! rowdb --help
//! ```

use std::env;
use std::path::PathBuf;

use eyre::{bail, ensure, eyre, Result, WrapErr};
use rowdb::btree::DEFAULT_BLOCK_SIZE;
use rowdb::cli::Repl;
use rowdb::Table;

/// Everything the flags decide before the shell starts.
struct Invocation {
    create_mode: bool,
    fields: Option<Vec<u32>>,
    block_size: u32,
    table_path: Option<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let invocation = parse_args(env::args().skip(1))?;

    let Some(invocation) = invocation else {
        // --help or --version already printed what was asked for.
        return Ok(());
    };

    let Some(table_path) = invocation.table_path else {
        print_usage();
        return Ok(());
    };

    let table = if invocation.create_mode {
        let Some(fields) = invocation.fields else {
            bail!("creating a table requires --fields, e.g. --fields 10,20");
        };
        Table::create(&table_path, &fields, invocation.block_size)
            .wrap_err_with(|| format!("could not create table '{}'", table_path.display()))?
    } else {
        ensure!(
            invocation.fields.is_none(),
            "--fields only applies together with --create"
        );
        Table::open(&table_path)
            .wrap_err_with(|| format!("could not open table '{}'", table_path.display()))?
    };

    Repl::new(table)?.run()
}

/// Walks the argument stream once. Returns None when a flag like --help
/// answered the invocation by itself.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Invocation>> {
    let mut invocation = Invocation {
        create_mode: false,
        fields: None,
        block_size: DEFAULT_BLOCK_SIZE,
        table_path: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            "-v" | "--version" => {
                println!("rowdb {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "-c" | "--create" => invocation.create_mode = true,
            "-f" | "--fields" => {
                let value = args
                    .next()
                    .ok_or_else(|| eyre!("--fields expects a comma-separated list of lengths"))?;
                invocation.fields = Some(parse_fields(&value)?);
            }
            "-b" | "--block-size" => {
                let value = args
                    .next()
                    .ok_or_else(|| eyre!("--block-size expects a byte count"))?;
                invocation.block_size = value
                    .parse::<u32>()
                    .wrap_err_with(|| format!("'{}' is not a valid block size", value))?;
            }
            flag if flag.starts_with('-') => {
                bail!("unrecognized flag '{}', try --help", flag);
            }
            path => {
                ensure!(
                    invocation.table_path.is_none(),
                    "a table path was already given, '{}' is extra",
                    path
                );
                invocation.table_path = Some(PathBuf::from(path));
            }
        }
    }

    Ok(Some(invocation))
}

fn parse_fields(lengths: &str) -> Result<Vec<u32>> {
    lengths
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .wrap_err_with(|| format!("invalid field length '{}'", part))
        })
        .collect()
}

fn print_usage() {
    println!(
        r#"rowdb {} - embedded keyed row store

Usage:
  rowdb [OPTIONS] TABLE_PATH

Options:
  -c, --create            Create a new table (deletes an existing one)
  -f, --fields LENGTHS    Comma-separated field lengths, e.g. 10,20
  -b, --block-size BYTES  Index block size (default {})
  -h, --help              Show this help
  -v, --version           Show version"#,
        env!("CARGO_PKG_VERSION"),
        DEFAULT_BLOCK_SIZE
    );
}

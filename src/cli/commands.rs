//! # Command Handler
//!
//! Parses and executes shell input. Two kinds of input:
//!
//! - **Data commands** operate on the table:
//!
//!   | Command                    | Description                          |
//!   |----------------------------|--------------------------------------|
//!   | `insert KEY FIELD...`      | Add a row (one value per field)      |
//!   | `remove KEY`               | Delete a row                         |
//!   | `search KEY`               | Look up one row                      |
//!   | `range LOW HIGH`           | All rows with keys in [LOW, HIGH]    |
//!   | `list`                     | Whole table, ascending by key        |
//!
//! - **Dot commands** control the shell and inspect the index:
//!
//!   | Command              | Description                               |
//!   |----------------------|-------------------------------------------|
//!   | `.tree`              | Render the B+Tree, one node per line      |
//!   | `.check`             | Verify the index's structural invariants  |
//!   | `.help`              | Show available commands                   |
//!   | `.quit` / `.exit`    | Leave the shell                           |
//!
//! Rows print with the key right-aligned and each field padded to its
//! declared length, so `list` output lines up in columns.

use crate::table::Table;

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    Output(String),
    Exit,
    Continue,
    Error(String),
}

pub struct CommandHandler;

impl CommandHandler {
    pub fn execute(input: &str, table: &mut Table) -> CommandResult {
        let parts: Vec<&str> = input.split_whitespace().collect();

        let Some(&cmd) = parts.first() else {
            return CommandResult::Continue;
        };
        let args = &parts[1..];

        match cmd.to_lowercase().as_str() {
            ".quit" | ".exit" | ".q" => CommandResult::Exit,
            ".help" | ".h" | ".?" => CommandResult::Output(help_text()),
            ".tree" => match table.render_index() {
                Ok(text) => CommandResult::Output(text.trim_end().to_string()),
                Err(e) => CommandResult::Error(e.to_string()),
            },
            ".check" => match table.verify_index() {
                Ok(()) => CommandResult::Output("index ok".to_string()),
                Err(e) => CommandResult::Error(e.to_string()),
            },
            "insert" => insert(table, args),
            "remove" => remove(table, args),
            "search" => search(table, args),
            "range" => range(table, args),
            "list" => list(table),
            _ => CommandResult::Error(format!(
                "unknown command: {}. Type .help for available commands.",
                cmd
            )),
        }
    }
}

fn parse_key(text: &str) -> Result<i32, CommandResult> {
    text.parse::<i32>()
        .map_err(|_| CommandResult::Error(format!("'{}' is not a 32-bit integer key", text)))
}

fn insert(table: &mut Table, args: &[&str]) -> CommandResult {
    let expected = table.field_lengths().len();
    if args.len() != 1 + expected {
        return CommandResult::Error(format!(
            "usage: insert KEY FIELD... ({} fields expected)",
            expected
        ));
    }

    let key = match parse_key(args[0]) {
        Ok(k) => k,
        Err(e) => return e,
    };

    match table.insert(key, &args[1..]) {
        Ok(true) => CommandResult::Output(format!("inserted {}", key)),
        Ok(false) => CommandResult::Output(format!("duplicate key {}", key)),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

fn remove(table: &mut Table, args: &[&str]) -> CommandResult {
    let [key] = args else {
        return CommandResult::Error("usage: remove KEY".to_string());
    };
    let key = match parse_key(key) {
        Ok(k) => k,
        Err(e) => return e,
    };

    match table.remove(key) {
        Ok(true) => CommandResult::Output(format!("removed {}", key)),
        Ok(false) => CommandResult::Output(format!("no row with key {}", key)),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

fn search(table: &mut Table, args: &[&str]) -> CommandResult {
    let [key] = args else {
        return CommandResult::Error("usage: search KEY".to_string());
    };
    let key = match parse_key(key) {
        Ok(k) => k,
        Err(e) => return e,
    };

    match table.search(key) {
        Ok(Some(fields)) => {
            let row: Vec<String> = std::iter::once(key.to_string()).chain(fields).collect();
            CommandResult::Output(format_row(&row, table.field_lengths()))
        }
        Ok(None) => CommandResult::Output(format!("no row with key {}", key)),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

fn range(table: &mut Table, args: &[&str]) -> CommandResult {
    let [low, high] = args else {
        return CommandResult::Error("usage: range LOW HIGH".to_string());
    };
    let (low, high) = match (parse_key(low), parse_key(high)) {
        (Ok(l), Ok(h)) => (l, h),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    if low > high {
        return CommandResult::Error(format!("invalid range: {} > {}", low, high));
    }

    match table.range_search(low, high) {
        Ok(rows) => CommandResult::Output(format_rows(&rows, table.field_lengths())),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

fn list(table: &mut Table) -> CommandResult {
    match table.scan() {
        Ok(rows) => CommandResult::Output(format_rows(&rows, table.field_lengths())),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// `row` is a stringified key followed by the fields.
fn format_row(row: &[String], field_lengths: &[u32]) -> String {
    let mut line = format!("{:>5}) ", row[0]);
    for (field, &len) in row[1..].iter().zip(field_lengths) {
        line.push_str(&format!("{:<width$} ", field, width = len as usize));
    }
    line.trim_end().to_string()
}

fn format_rows(rows: &[Vec<String>], field_lengths: &[u32]) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }

    let lines: Vec<String> = rows.iter().map(|row| format_row(row, field_lengths)).collect();
    format!(
        "{}\n{} row{}",
        lines.join("\n"),
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    )
}

fn help_text() -> String {
    r#"RowDB commands:

  insert KEY FIELD...   Add a row; one value per declared field
  remove KEY            Delete the row with KEY
  search KEY            Show the row with KEY
  range LOW HIGH        Show all rows with keys in [LOW, HIGH]
  list                  Show the whole table, ascending by key

  .tree                 Render the B+Tree index, one node per line
  .check                Verify the index's structural invariants
  .help, .h, .?         Show this help message
  .quit, .exit, .q      Leave the shell"#
        .to_string()
}

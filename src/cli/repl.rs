//! # REPL - Read-Eval-Print Loop
//!
//! The interactive loop for the RowDB shell. Reads one command per line
//! with rustyline (history, line editing), dispatches it to the command
//! handler, and prints the result. Command errors are displayed but do
//! not terminate the loop; use `.quit` or Ctrl+D to exit.

use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::cli::commands::{CommandHandler, CommandResult};
use crate::cli::history::history_path;
use crate::table::Table;

const PROMPT: &str = "rowdb> ";

pub struct Repl {
    table: Table,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new(table: Table) -> Result<Self> {
        let mut editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;

        if let Some(history_file) = history_path() {
            let _ = editor.load_history(&history_file);
        }

        Ok(Self { table, editor })
    }

    pub fn run(mut self) -> Result<()> {
        println!("RowDB {} - type .help for commands", env!("CARGO_PKG_VERSION"));

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye");
                    break;
                }
                Err(err) => {
                    eprintln!("Error reading input: {}", err);
                    break;
                }
            }
        }

        self.save_history();
        self.table.close()
    }

    fn handle_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }

        self.editor.add_history_entry(trimmed).ok();

        match CommandHandler::execute(trimmed, &mut self.table) {
            CommandResult::Exit => false,
            CommandResult::Output(text) => {
                println!("{}", text);
                true
            }
            CommandResult::Continue => true,
            CommandResult::Error(msg) => {
                eprintln!("Error: {}", msg);
                true
            }
        }
    }

    fn save_history(&mut self) {
        let Some(history_file) = history_path() else {
            return;
        };

        if let Some(parent) = history_file.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Warning: could not create history directory: {}", e);
                return;
            }
        }

        if let Err(e) = self.editor.save_history(&history_file) {
            eprintln!("Warning: could not save history: {}", e);
        }
    }
}

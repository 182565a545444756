//! Line-oriented query shell over an open [`Store`].
//!
//! Commands:
//!
//! - `.tables`: list tables
//! - `.schema <name>`: show a table's columns
//! - `.exit` / `.quit`: leave the shell (end of input does the same)
//! - anything else is run as one SQL statement
//!
//! Statement errors are printed and the loop continues.

use std::io::{BufRead, Write};

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use tracing::debug;

use crate::error::LoadResult;
use crate::store::{QueryResult, Store};

/// Rows shown per query result.
pub const MAX_DISPLAY_ROWS: usize = 100;

const PROMPT: &str = "sql> ";

pub struct Shell<'s, R, W> {
    store: &'s Store,
    input: R,
    output: W,
    max_rows: usize,
}

impl<'s, R: BufRead, W: Write> Shell<'s, R, W> {
    pub fn new(store: &'s Store, input: R, output: W) -> Self {
        Self {
            store,
            input,
            output,
            max_rows: MAX_DISPLAY_ROWS,
        }
    }

    #[must_use]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Read and run commands until `.exit`, `.quit` or end of input.
    ///
    /// Only I/O errors on the shell's own input and output end the loop with an error.
    pub fn run(&mut self) -> LoadResult<()> {
        writeln!(
            self.output,
            "Connected to {}. Enter SQL, or .tables, .schema <name>, .exit",
            self.store.path().display()
        )?;
        let mut line = String::new();
        loop {
            write!(self.output, "{PROMPT}")?;
            self.output.flush()?;
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(());
            }
            let command = line.trim();
            if command.is_empty() {
                continue;
            }
            if !self.dispatch(command)? {
                return Ok(());
            }
        }
    }

    /// Run one command. Returns `false` when the shell should exit.
    fn dispatch(&mut self, command: &str) -> LoadResult<bool> {
        debug!(command, "shell command");
        let lower = command.to_ascii_lowercase();
        match lower.split_whitespace().next() {
            Some(".exit" | ".quit") => return Ok(false),
            Some(".tables") => self.show_tables()?,
            Some(".schema") => match command.split_whitespace().nth(1) {
                Some(name) => self.show_schema(name)?,
                None => writeln!(self.output, "Usage: .schema <table>")?,
            },
            Some(other) if other.starts_with('.') => {
                writeln!(self.output, "Unknown command: {other}")?;
            }
            _ => match self.store.query(command) {
                Ok(result) => self.show_result(&result)?,
                Err(e) => writeln!(self.output, "Error: {e}")?,
            },
        }
        Ok(true)
    }

    fn show_tables(&mut self) -> LoadResult<()> {
        match self.store.tables() {
            Ok(tables) if tables.is_empty() => writeln!(self.output, "No tables")?,
            Ok(tables) => {
                for t in tables {
                    writeln!(self.output, "{t}")?;
                }
            }
            Err(e) => writeln!(self.output, "Error: {e}")?,
        }
        Ok(())
    }

    fn show_schema(&mut self, name: &str) -> LoadResult<()> {
        match self.store.table_columns(name) {
            Ok(columns) if columns.is_empty() => writeln!(self.output, "No such table: {name}")?,
            Ok(columns) => {
                let mut table = styled_table();
                table.set_header(vec!["Column", "Type"]);
                for (column, declared) in columns {
                    table.add_row(vec![column, declared]);
                }
                writeln!(self.output, "{table}")?;
            }
            Err(e) => writeln!(self.output, "Error: {e}")?,
        }
        Ok(())
    }

    fn show_result(&mut self, result: &QueryResult) -> LoadResult<()> {
        if result.columns.is_empty() {
            writeln!(self.output, "OK ({} rows affected)", result.affected.unwrap_or(0))?;
            return Ok(());
        }
        if result.rows.is_empty() {
            writeln!(self.output, "(no rows)")?;
            return Ok(());
        }
        let mut table = styled_table();
        table.set_header(result.columns.clone());
        for row in result.rows.iter().take(self.max_rows) {
            table.add_row(row.iter().map(|v| v.to_string()).collect::<Vec<_>>());
        }
        writeln!(self.output, "{table}")?;
        if result.rows.len() > self.max_rows {
            writeln!(
                self.output,
                "... showing first {} of {} rows",
                self.max_rows,
                result.rows.len()
            )?;
        } else {
            writeln!(self.output, "({} rows)", result.rows.len())?;
        }
        Ok(())
    }
}

fn styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_script(store: &Store, script: &str, max_rows: usize) -> String {
        let mut out = Vec::new();
        Shell::new(store, script.as_bytes(), &mut out)
            .with_max_rows(max_rows)
            .run()
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn commands_and_queries() {
        let store = Store::open_in_memory().unwrap();
        store.query("CREATE TABLE people (name TEXT, age INTEGER)").unwrap();
        store.query("INSERT INTO people VALUES ('Ada', 36), ('Alan', 41)").unwrap();

        let out = run_script(
            &store,
            ".tables\n.schema people\nSELECT name FROM people ORDER BY name\nSELEC nope\n.exit\nSELECT 1\n",
            MAX_DISPLAY_ROWS,
        );
        assert!(out.contains("people\n"));
        assert!(out.contains("INTEGER"));
        assert!(out.contains("Ada"));
        assert!(out.contains("(2 rows)"));
        assert!(out.contains("Error:"));
    }

    #[test]
    fn results_are_capped() {
        let store = Store::open_in_memory().unwrap();
        store.query("CREATE TABLE n (v INTEGER)").unwrap();
        store.query("INSERT INTO n VALUES (1), (2), (3)").unwrap();
        let out = run_script(&store, "SELECT v FROM n\n", 2);
        assert!(out.contains("showing first 2 of 3 rows"));
    }

    #[test]
    fn missing_table_and_eof() {
        let store = Store::open_in_memory().unwrap();
        let out = run_script(&store, ".schema ghost\n.tables", MAX_DISPLAY_ROWS);
        assert!(out.contains("No such table: ghost"));
        assert!(out.contains("No tables"));
    }
}

//! toydb command line interface: loads a catalog manifest and serves a
//! line-oriented SQL REPL.

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use toydb::exec::concat_batches;
use toydb::Database;

#[derive(Parser, Debug)]
#[command(name = "toydb")]
#[command(version)]
#[command(about = "A small read-oriented SQL engine over CSV tables", long_about = None)]
struct Args {
    /// Path to the catalog manifest
    #[arg(default_value = "tdb_manifest.json")]
    manifest: std::path::PathBuf,

    /// Execute one statement and exit
    #[arg(short, long)]
    command: Option<String>,

    /// Rows to print per result (0 prints everything)
    #[arg(long, default_value_t = 50)]
    max_rows: usize,
}

fn main() {
    toydb::logging::init();
    let args = Args::parse();

    let db = match Database::open(&args.manifest) {
        Ok(db) => db,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };

    if let Some(command) = &args.command {
        if let Err(err) = run_statement(&db, command, args.max_rows) {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
        return;
    }

    repl(&db, args.max_rows);
}

fn run_statement(db: &Database, sql: &str, max_rows: usize) -> toydb::Result<()> {
    let batches = db.execute(sql)?;
    let merged = concat_batches(&batches)?;
    let limit = if max_rows == 0 { None } else { Some(max_rows) };
    println!("{}", merged.to_pretty_string(limit));
    println!("({} rows)", merged.row_count());
    Ok(())
}

fn repl(db: &Database, max_rows: usize) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Error: cannot start line editor: {}", err);
            std::process::exit(1);
        }
    };

    loop {
        match editor.readline("toydb> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if let Err(err) = run_statement(db, line, max_rows) {
                    println!("Error: {}", err);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }
}

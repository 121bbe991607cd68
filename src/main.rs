use std::env;
use std::fs;
use std::process;
use std::thread;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use rlogo::Error;
use rlogo::evaluator::{Interpreter, LineSource};

/// Evaluation recurses with expression nesting and call depth, so the
/// interpreter runs on a worker thread with a roomy stack.
const STACK_SIZE: usize = 64 * 1024 * 1024;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut script: Option<String> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("Usage: rlogo [FILE]");
                println!();
                println!("With no argument, starts an interactive session.");
                println!("With a file path, reads the file as the line source.");
                println!();
                println!("quit, exit, or bye (any case) ends a session.");
                process::exit(0);
            }
            other if script.is_none() && !other.starts_with('-') => {
                script = Some(other.to_owned());
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Try 'rlogo --help' for usage information.");
                process::exit(1);
            }
        }
    }

    let handle = thread::Builder::new()
        .stack_size(STACK_SIZE)
        .spawn(move || match script {
            Some(path) => run_file(&path),
            None => run_interactive(),
        })
        .expect("Failed to start interpreter thread");

    let code = handle.join().unwrap_or(1);
    process::exit(code);
}

/// Everything from `;` to end of line is a comment.
fn strip_comment(line: &str) -> String {
    line.split(';').next().unwrap_or("").to_owned()
}

/// Session-ending words, case-insensitive.
fn is_farewell(line: &str) -> bool {
    matches!(
        line.trim().to_lowercase().as_str(),
        "quit" | "exit" | "bye"
    )
}

/// Interactive line source over a rustyline editor. Top-level lines prompt
/// with `? `, continuation lines of a `to ... end` definition with `> `.
struct ReplSource {
    editor: DefaultEditor,
}

impl LineSource for ReplSource {
    fn next_top_level_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            match self.editor.readline("? ") {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());
                    let line = strip_comment(&line);
                    if line.trim().is_empty() {
                        continue;
                    }
                    if is_farewell(&line) {
                        return Ok(None);
                    }
                    return Ok(Some(line));
                }
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => return Ok(None),
                Err(err) => return Err(Error::new(format!("Cannot read input: {err}"))),
            }
        }
    }

    fn next_continuation_line(&mut self) -> Result<String, Error> {
        match self.editor.readline("> ") {
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                Ok(strip_comment(&line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                Err(Error::new("End of input inside a procedure definition"))
            }
            Err(err) => Err(Error::new(format!("Cannot read input: {err}"))),
        }
    }
}

/// Line source over the lines of a script file.
struct FileSource {
    lines: std::vec::IntoIter<String>,
}

impl FileSource {
    fn new(contents: &str) -> Self {
        let lines: Vec<String> = contents.lines().map(strip_comment).collect();
        FileSource {
            lines: lines.into_iter(),
        }
    }
}

impl LineSource for FileSource {
    fn next_top_level_line(&mut self) -> Result<Option<String>, Error> {
        for line in self.lines.by_ref() {
            if line.trim().is_empty() {
                continue;
            }
            if is_farewell(&line) {
                return Ok(None);
            }
            return Ok(Some(line));
        }
        Ok(None)
    }

    fn next_continuation_line(&mut self) -> Result<String, Error> {
        self.lines
            .next()
            .ok_or_else(|| Error::new("End of input inside a procedure definition"))
    }
}

fn run_interactive() -> i32 {
    println!("rlogo - a small Logo-family interpreter");
    println!("Calls are prefix and arity-driven: print sum product 3 4 8");
    println!("Type quit to leave, or end input with Ctrl+D.");
    println!();

    let editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Could not initialize the terminal: {err}");
            return 1;
        }
    };

    let mut interp = Interpreter::new(Box::new(ReplSource { editor }));
    let code = match interp.run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    };
    println!("Goodbye!");
    code
}

fn run_file(path: &str) -> i32 {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            eprintln!("Error loading {path}: {err}");
            return 1;
        }
    };

    let mut interp = Interpreter::new(Box::new(FileSource::new(&contents)));
    match interp.run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}

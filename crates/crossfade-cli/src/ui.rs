//! UI utilities for Crossfade CLI.

use std::io::{self, Write};

use crossfade_core::transfer::{JobOutcome, JobResult};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{style, Color, Stylize};
use crossterm::terminal;
use crossterm::tty::IsTty;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

const NAME_WIDTH: usize = 32;
const BAR_WIDTH: usize = 24;

/// Print an error and, for library errors, a hint on how to fix it.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("Error: {err:#}");

    let suggestion = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<crossfade_core::Error>())
        .and_then(crossfade_core::Error::suggestion);

    if let Some(suggestion) = suggestion {
        eprintln!();
        eprintln!("Suggestion:");
        for line in suggestion.lines() {
            eprintln!("  {line}");
        }
    }
}

/// Color `text` with the color named by a service's color tag.
///
/// Plain text when stdout is not a terminal or the tag is unknown.
pub fn paint(color_tag: &str, text: &str) -> String {
    match tag_color(color_tag) {
        Some(color) if io::stdout().is_tty() => style(text).with(color).to_string(),
        _ => text.to_string(),
    }
}

fn tag_color(color_tag: &str) -> Option<Color> {
    match color_tag.to_ascii_lowercase().as_str() {
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "purple" | "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        _ => None,
    }
}

/// Render the single-line run progress display.
pub fn progress_line(percent: f64, position: usize, total: usize, name: &str) -> String {
    let percent = percent.clamp(0.0, 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "  [{}{}] {:>6.2}%  ({}/{}) {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent,
        position,
        total,
        truncate(name, NAME_WIDTH)
    )
}

/// Redraw the progress line in place.
pub fn redraw(line: &str) {
    print!("\r{line}    ");
    let _ = io::stdout().flush();
}

/// Erase the progress line.
pub fn clear_line() {
    print!("\r{}\r", " ".repeat(NAME_WIDTH + BAR_WIDTH + 32));
    let _ = io::stdout().flush();
}

/// One line describing a finished job.
pub fn result_line(result: &JobResult) -> String {
    match &result.outcome {
        JobOutcome::Succeeded {
            items_transferred,
            items_total,
            items_unmatched,
            ..
        } => {
            let mut line = format!(
                "  ✓ {}: {}/{} tracks",
                result.name, items_transferred, items_total
            );
            if *items_unmatched > 0 {
                line.push_str(&format!(", {items_unmatched} not found"));
            }
            line
        }
        JobOutcome::Failed { error_message } => {
            format!("  ✗ {}: {}", result.name, error_message)
        }
    }
}

/// Line-based questions on stdin.
pub struct Prompter {
    reader: BufReader<Stdin>,
}

impl Prompter {
    /// Create a prompter reading from stdin.
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }

    /// Print `label` and read one trimmed line; `None` at end of input.
    pub async fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        print!("{label}");
        io::stdout().flush()?;

        let mut input = String::new();
        if self.reader.read_line(&mut input).await? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    /// Like [`ask`](Self::ask) but without echo, keeping surrounding spaces.
    ///
    /// Input that is not a terminal is read as a plain line.
    pub async fn ask_secret(&mut self, label: &str) -> io::Result<Option<String>> {
        print!("{label}");
        io::stdout().flush()?;

        if io::stdin().is_tty() {
            return tokio::task::spawn_blocking(read_hidden_line)
                .await
                .map_err(io::Error::other)?;
        }

        let mut input = String::new();
        if self.reader.read_line(&mut input).await? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_line_ending(&input).to_string()))
    }
}

fn read_hidden_line() -> io::Result<Option<String>> {
    terminal::enable_raw_mode()?;
    let line = read_hidden_keys();
    let restored = terminal::disable_raw_mode();
    println!();
    restored?;
    line
}

fn read_hidden_keys() -> io::Result<Option<String>> {
    let mut line = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => return Ok(Some(line)),
            KeyCode::Backspace => {
                line.pop();
            }
            KeyCode::Char('c') if ctrl => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "input cancelled"));
            }
            KeyCode::Char('d') if ctrl && line.is_empty() => return Ok(None),
            KeyCode::Char(c) if !ctrl => line.push(c),
            _ => {}
        }
    }
}

/// Drop the trailing `\n` or `\r\n` of a line read from stdin.
fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

impl Default for Prompter {
    fn default() -> Self {
        Self::new()
    }
}

/// `1 playlist`, `3 playlists`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Truncate a string to fit within a maximum width.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

//! y/N confirmation for terminal front-ends.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal,
};
use std::io::{self, Write};
use std::time::Duration;

/// Ask a yes/no question; anything but `y` means no.
///
/// Reads a single keystroke in raw mode, falling back to a line read when the
/// terminal cannot be put in raw mode (pipes, CI).
pub fn confirm(question: &str) -> bool {
    print!("{} (y/N): ", question);
    let _ = io::stdout().flush();

    if let Ok(answer) = read_single_key() {
        println!("{}", if answer { "y" } else { "n" });
        return answer;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        input.trim().eq_ignore_ascii_case("y")
    } else {
        false
    }
}

fn read_single_key() -> io::Result<bool> {
    terminal::enable_raw_mode()?;

    let result = wait_for_key();

    terminal::disable_raw_mode()?;
    result
}

fn wait_for_key() -> io::Result<bool> {
    loop {
        // timeout counts as "no"
        if !event::poll(Duration::from_secs(30))? {
            return Ok(false);
        }
        if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
            if kind != KeyEventKind::Release {
                return Ok(matches!(code, KeyCode::Char('y' | 'Y')));
            }
        }
    }
}

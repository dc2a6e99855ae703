//! UI utilities for the client.

use std::io::Write;

/// Prompt shown by the line editor
pub fn prompt(username: &str) -> String {
    format!("{}> ", username)
}

/// Print pushed output and redisplay the prompt after it
pub fn print_above_prompt(text: &str, username: &str) {
    print!("{}{}", text, prompt(username));
    std::io::stdout().flush().ok();
}

//! Terminal output for build, lint and test runs
//!
//! One line per component or step: a status mark, the name padded to a
//! column, then the wall time. Failures are followed by the tail of the tool
//! output, since compilers report the decisive error last.

use std::io::Write;

use crate::build::StepResult;

/// Lines of tool output shown under a failure
const EXCERPT_LINES: usize = 12;

/// Width of the name column
const NAME_WIDTH: usize = 28;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Pending line, completed in place by [`print_pending_result`]
pub fn print_step_start(name: &str) {
    print!("  {DIM}…{RESET} {name}");
    let _ = std::io::stdout().flush();
}

pub fn print_step_result(result: &StepResult) {
    print_pending_result(&result.name, result.success, result.duration_ms);
}

/// Overwrite the pending line left by [`print_step_start`]
pub fn print_pending_result(name: &str, success: bool, duration_ms: u64) {
    print!("\r\x1b[2K");
    print_outcome(name, success, duration_ms);
}

pub fn print_outcome(name: &str, success: bool, duration_ms: u64) {
    println!("{}", outcome_line(name, success, duration_ms));
}

fn outcome_line(name: &str, success: bool, duration_ms: u64) -> String {
    let mark = if success {
        format!("{GREEN}✓{RESET}")
    } else {
        format!("{RED}✗{RESET}")
    };
    let time = if duration_ms == 0 {
        String::new()
    } else {
        format!("{DIM}{}{RESET}", format_duration(duration_ms))
    };
    format!("  {} {:<width$} {}", mark, name, time, width = NAME_WIDTH)
        .trim_end()
        .to_string()
}

/// Last lines of a failure's output, indented under its outcome line
pub fn print_excerpt(output: &str) {
    for line in excerpt(output) {
        println!("    {DIM}│{RESET} {line}");
    }
}

fn excerpt(output: &str) -> Vec<String> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let skipped = lines.len().saturating_sub(EXCERPT_LINES);

    let mut shown = Vec::with_capacity(EXCERPT_LINES + 1);
    if skipped > 0 {
        shown.push(format!("… {} earlier lines", skipped));
    }
    shown.extend(lines[skipped..].iter().map(|l| l.to_string()));
    shown
}

pub fn print_summary(succeeded: usize, failed: usize, duration_ms: u64) {
    println!();
    let time = format_duration(duration_ms);
    if failed == 0 {
        println!("{GREEN}{succeeded} ok{RESET} in {time}");
    } else {
        println!("{GREEN}{succeeded} ok{RESET}, {RED}{failed} failed{RESET} in {time}");
    }
}

/// `850ms`, `12.4s`, `3m05s`
pub fn format_duration(ms: u64) -> String {
    match ms {
        0..=999 => format!("{}ms", ms),
        1_000..=59_999 => format!("{:.1}s", ms as f64 / 1000.0),
        _ => format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000),
    }
}

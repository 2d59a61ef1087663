//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for the blame lines themselves, which are the point of the command.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Colored abbreviated commit id. Boundary commits get git's `^` marker.
#[must_use]
pub fn commit_ref(short_id: &str, boundary: bool) -> String {
    if boundary {
        format!("^{short_id}").dimmed().to_string()
    } else {
        short_id.yellow().to_string()
    }
}

/// Author name padded or cut to `width` characters.
#[must_use]
pub fn author_column(name: &str, width: usize) -> String {
    let cut: String = name.chars().take(width).collect();
    format!("{cut:<width$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_ref_colors_match_boundary() {
        colored::control::set_override(true);

        assert_eq!(commit_ref("abc12345", false), "abc12345".yellow().to_string());
        assert_eq!(
            commit_ref("abc12345", true),
            "^abc12345".dimmed().to_string()
        );

        colored::control::set_override(false);
    }

    #[test]
    fn test_author_column_pads() {
        assert_eq!(author_column("Bob", 6), "Bob   ");
    }

    #[test]
    fn test_author_column_truncates_on_char_boundary() {
        assert_eq!(author_column("Zoë Ångström", 5), "Zoë Å");
    }

    #[test]
    fn test_quiet_mode_default() {
        set_quiet(false);
        assert!(!is_quiet());
    }

    #[test]
    fn test_quiet_mode_enabled() {
        set_quiet(true);
        assert!(is_quiet());
        set_quiet(false);
    }
}

//! Output formatting for the CLI.
//!
//! Status messages go to stderr so that a template rendered to stdout can be
//! piped straight into the deploy tool.

use colored::Colorize;

/// Output formatter
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        colored::control::set_override(use_color);

        Self {
            use_color,
            verbosity,
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "OK:".green().bold(), message);
        } else {
            eprintln!("OK: {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print a hint message
    pub fn hint(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "HINT:".cyan().bold(), message);
        } else {
            eprintln!("HINT: {}", message);
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "INFO:".blue(), message);
        } else {
            eprintln!("INFO: {}", message);
        }
    }

    /// Print a table to stdout
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        // Calculate column widths
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let header_line = format_row(headers.iter().copied(), &widths);
        if self.use_color {
            println!("{}", header_line.bright_white().bold());
        } else {
            println!("{}", header_line);
        }

        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        if self.use_color {
            println!("{}", sep.join("-+-").bright_black());
        } else {
            println!("{}", sep.join("-+-"));
        }

        for row in rows {
            println!("{}", format_row(row.iter().map(String::as_str), &widths));
        }
    }
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

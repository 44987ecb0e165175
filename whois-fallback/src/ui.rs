//! Terminal rendering for whois-fallback.
//!
//! Records and summaries go to stdout; progress goes to stderr so piped
//! output stays clean. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Term};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use whois_fallback_lib::{ParsedRecord, Resolution, WhoisResponse};

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner on stderr. Does nothing when stderr is not
/// a terminal.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    pub fn start(message: String) -> Self {
        let running = Arc::new(AtomicBool::new(true));

        if !Term::stderr().is_term() {
            return Self {
                running,
                handle: None,
            };
        }

        let running_clone = running.clone();
        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Lookup output ────────────────────────────────────────────────────────────

/// Bold domain name followed by the strategy and authorities that answered.
pub fn print_domain_header(resolution: &Resolution) {
    let authorities: Vec<&str> = resolution
        .authorities
        .iter()
        .map(|a| a.authority.as_str())
        .collect();

    println!(
        "{} {}",
        style(&resolution.domain).bold(),
        style(format!(
            "via {} ({})",
            resolution.strategy.as_str().to_uppercase(),
            authorities.join(" -> ")
        ))
        .dim(),
    );
}

/// Print a record as `key: value` lines, which parse back to the same record.
pub fn print_record(record: &ParsedRecord) {
    for (key, value) in record.iter() {
        println!("{}: {}", style(key).cyan(), value);
    }
}

/// Print the extracted summary as aligned label/value rows.
pub fn print_summary(summary: &WhoisResponse) {
    for (label, value) in summary_rows(summary) {
        let padded = pad_str(label, 14, Alignment::Left, None);
        match value {
            Some(value) => println!("  {} {}", style(padded).green(), value),
            None => println!("  {} {}", style(padded).green(), style("-").dim()),
        }
    }
}

fn summary_rows(summary: &WhoisResponse) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("Registrar", summary.registrar.name.clone()),
        ("Registrar URL", summary.registrar.url.clone()),
        ("Owner", summary.registrar.owner.clone()),
        ("Tech", summary.registrar.tech.clone()),
        ("Provider", summary.provider.clone()),
        (
            "Expires",
            summary
                .domain_expiration_date
                .map(|date| date.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ),
        (
            "Name servers",
            summary
                .name_servers
                .as_ref()
                .filter(|servers| !servers.is_empty())
                .map(|servers| servers.join(", ")),
        ),
    ]
}

// ── Proxy refresh ────────────────────────────────────────────────────────────

pub fn print_refresh_result(count: usize, path: &Path) {
    if count == 0 {
        eprintln!(
            "{} proxy source returned no usable entries; {} now holds an empty list",
            style("warning:").yellow().bold(),
            path.display()
        );
    } else {
        println!(
            "{} {} prox{} to {}",
            style("Saved").green().bold(),
            count,
            if count == 1 { "y" } else { "ies" },
            path.display()
        );
    }
}

//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use crate::commands::sanitize::SanitizedName;
use crate::commands::scan::ScanReport;
use anyhow::Result;
use console::Term;
use console::style;
use intake_core::PolicyConfig;
use intake_core::StoredFile;
use intake_core::security::ServedFile;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn header(&self, ok: bool, text: &str) {
        if self.use_colors {
            let mark = if ok {
                style("✓").green().bold()
            } else {
                style("✗").red().bold()
            };
            self.line(&format!("{mark} {text}"));
        } else {
            self.line(text);
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_sanitized(&self, names: &[SanitizedName]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for name in names {
            if self.verbose {
                self.line(&format!("{} → {}", name.original, name.sanitized));
            } else {
                self.line(&name.sanitized);
            }
        }

        Ok(())
    }

    fn format_scan_report(&self, report: &ScanReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let accepted = report.outcome.accepted;
        let verdict = if accepted { "Scan passed" } else { "Scan failed" };
        self.header(
            accepted,
            &format!("{verdict}: {}", report.path.display()),
        );

        self.line(&format!("  Declared type: {}", report.declared_mime_type));
        let detected = match (report.malicious_format, report.detected_mime_type) {
            (Some(format), _) if self.use_colors => {
                format!("{} ({format})", style("executable").red().bold())
            }
            (Some(format), _) => format!("executable ({format})"),
            (None, Some(mime)) => mime.to_string(),
            (None, None) => "unknown".to_string(),
        };
        self.line(&format!("  Detected type: {detected}"));
        self.line(&format!("  Size: {}", Self::format_size(report.size_bytes)));

        if let Some(code) = report.outcome.reason_code {
            self.line(&format!("  Reason: {code}"));
        }
        if self.verbose {
            self.line(&format!("  Original name: {}", report.original_name));
            self.line(&format!("  Stage: {}", report.outcome.stage));
        }

        if !report.findings.is_empty() {
            self.line("");
            self.line("Findings:");
            for finding in &report.findings {
                let code = if self.use_colors {
                    style(finding.reason_code).red().to_string()
                } else {
                    format!("[{}]", finding.reason_code)
                };
                self.line(&format!("  {code} {}", finding.detail));
            }
        }

        Ok(())
    }

    fn format_stored_file(&self, stored: &StoredFile) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.header(true, "Upload accepted");
        self.line(&format!("  Category: {}", stored.category));
        self.line(&format!("  Stored as: {}", stored.stored_filename));
        self.line(&format!("  Path: {}", stored.stored_path.display()));

        Ok(())
    }

    fn format_served_file(&self, served: &ServedFile) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.header(true, &format!("Serve allowed: {}", served.path.display()));
        self.line(&format!("  Size: {}", Self::format_size(served.size)));

        if self.verbose {
            self.line("  Headers:");
            for (name, value) in &served.headers {
                self.line(&format!(
                    "    {name}: {}",
                    String::from_utf8_lossy(value.as_bytes())
                ));
            }
        }

        Ok(())
    }

    fn format_policy(&self, config: &PolicyConfig) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.line(&format!("Storage root: {}", config.storage_root.display()));
        self.line(&format!(
            "Scan window: {}",
            Self::format_size(config.scan_limit as u64)
        ));
        self.line(&format!(
            "Archives: {} on disk, {} uncompressed, ratio {}:1",
            Self::format_size(config.archive_max_size),
            Self::format_size(config.archive_max_uncompressed_size),
            config.max_compression_ratio
        ));

        self.line("");
        self.line("Categories:");
        for category in &config.categories {
            let id = if self.use_colors {
                style(&category.id).bold().to_string()
            } else {
                category.id.clone()
            };
            let extensions: Vec<&str> = category
                .allowed_extensions
                .iter()
                .map(String::as_str)
                .collect();
            self.line(&format!(
                "  {id:<12} {:>9}  {}",
                Self::format_size(category.max_size_bytes),
                extensions.join(", ")
            ));

            if self.verbose {
                let mime_types: Vec<&str> = category
                    .allowed_mime_types
                    .iter()
                    .map(String::as_str)
                    .collect();
                self.line(&format!("               types: {}", mime_types.join(", ")));
            }
        }

        self.line("");
        if self.verbose {
            self.line(&format!(
                "Denied extensions: {}",
                config.denied_extensions.join(", ")
            ));
        } else {
            self.line(&format!(
                "Denied extensions: {} (use --verbose to list)",
                config.denied_extensions.len()
            ));
        }

        Ok(())
    }

    fn format_error(&self, _operation: &str, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = term.write_line(&format!("ERROR: {error:?}"));
        }
    }
}

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level for the `contract_audit*` targets given `-v` / `-q` counts.
fn default_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn default_directives(verbose: u8, quiet: bool) -> String {
    let level = default_level(verbose, quiet);
    format!("contract_audit={level},contract_audit_recon={level},contract_audit_io={level}")
}

/// Install the stderr subscriber. `RUST_LOG`, when set, replaces the
/// flag-derived filter entirely.
pub fn init_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose, quiet)));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose > 0);

    // A second init (tests) is not an error worth reporting.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(default_level(3, true), "warn");
        assert_eq!(default_level(0, false), "info");
        assert_eq!(default_level(1, false), "debug");
        assert_eq!(default_level(2, false), "trace");
    }

    #[test]
    fn directives_cover_every_crate() {
        let d = default_directives(0, false);
        assert!(d.contains("contract_audit_recon=info"));
        assert!(d.contains("contract_audit_io=info"));
    }
}

//! Common utilities shared by the harness and its CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use config::HarnessConfig;
pub use error::{Error, Result};

/// Render an argument vector the way a shell user would type it
pub fn display_command(program: &std::path::Path, args: &[String]) -> String {
    let mut parts = vec![program.display().to_string()];
    parts.extend(args.iter().map(|a| {
        if a.is_empty() || a.contains(char::is_whitespace) {
            format!("'{}'", a)
        } else {
            a.clone()
        }
    }));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_display_command_quotes_spaces() {
        let args = vec!["-out".to_string(), "/tmp/a b".to_string()];
        assert_eq!(
            display_command(Path::new("transformix"), &args),
            "transformix -out '/tmp/a b'"
        );
    }
}

use std::collections::HashSet;

use pushsync_core::{scan_artifacts, target_state};

pub fn execute(message: &str) -> anyhow::Result<()> {
    let report = render(message);
    if report.is_empty() {
        println!("no artifact identifiers found");
    } else {
        print!("{report}");
    }
    Ok(())
}

/// One line per distinct identifier, in order of first mention: id, tracker
/// collection, target state (`-` for none).
fn render(message: &str) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    for id in scan_artifacts(message) {
        if !seen.insert(id.clone()) {
            continue;
        }
        let state = target_state(message, &id).map_or("-", |s| s.as_str());
        out.push_str(&format!("{:<10} {:<24} {state}\n", id.as_str(), id.kind().collection()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_identifiers_with_state() {
        let out = render("STARTS US12 and touches DE3");
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("US12"));
        assert!(lines[0].contains("hierarchicalrequirement"));
        assert!(lines[0].ends_with("In-Progress"));
        assert!(lines[1].starts_with("DE3"));
        assert!(lines[1].ends_with('-'));
    }

    #[test]
    fn render_lists_repeated_identifier_once() {
        let out = render("STARTS US12, see US12 and DE3, then DE3 again");
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("US12"));
        assert!(lines[1].starts_with("DE3"));
    }

    #[test]
    fn render_empty_without_identifiers() {
        assert!(render("refactor build script").is_empty());
    }
}

//! Parser for the installer's line-oriented listing output

use envsync_api::ListedIntegration;

/// Words that mark a line as connected
const CONNECTED_MARKERS: &[&str] = &["connected", "success"];

/// Prefixes that negate a marker ("disconnected", "not connected", "unsuccessful")
const NEGATIONS: &[&str] = &["dis", "not ", "un"];

/// Parse listing output into one entry per integration.
///
/// Each non-blank line belongs to the integration named by its leading
/// identifier token; the first line for an identifier wins. Output that
/// yields no tokens produces an empty list.
pub fn parse_listing(output: &str) -> Vec<ListedIntegration> {
    let mut listed: Vec<ListedIntegration> = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        let token: String = line
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if token.is_empty() {
            continue;
        }

        let identifier = token.to_lowercase();
        if listed.iter().any(|l| l.identifier == identifier) {
            continue;
        }
        listed.push(ListedIntegration {
            identifier,
            connected: is_connected(line),
        });
    }

    listed
}

/// Whether a listing line reports a working connection
pub fn is_connected(line: &str) -> bool {
    if line.contains('✗') || line.contains('✘') {
        return false;
    }
    if line.contains('✓') || line.contains('✔') {
        return true;
    }

    let lower = line.to_lowercase();
    CONNECTED_MARKERS.iter().any(|marker| {
        lower.match_indices(marker).any(|(at, _)| {
            let before = &lower[..at];
            !NEGATIONS.iter().any(|neg| before.ends_with(neg))
        })
    })
}

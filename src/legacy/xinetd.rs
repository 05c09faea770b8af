// Service Admin - xinetd Listing
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Parsing of `chkconfig --list --type xinetd` output.

use std::collections::BTreeMap;

use tracing::debug;

/// Parse `name: on|off` lines into a name to enabled map.
///
/// Lines with fewer than two fields, or whose state is neither `on` nor
/// `off` (such as the `xinetd based services:` header), are skipped.
pub fn parse_xinetd_listing(output: &str) -> BTreeMap<String, bool> {
    let mut services = BTreeMap::new();

    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let (Some(name), Some(state)) = (fields.next(), fields.next()) else {
            if !line.trim().is_empty() {
                debug!("Skipping xinetd listing line: {:?}", line);
            }
            continue;
        };

        let enabled = match state {
            "on" => true,
            "off" => false,
            _ => {
                debug!("Skipping xinetd listing line: {:?}", line);
                continue;
            }
        };

        let name = name.trim_end_matches(':');
        if name.is_empty() {
            continue;
        }
        services.insert(name.to_string(), enabled);
    }

    services
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_on_and_off() {
        let listing = "chargen-dgram:  off\nrsync:          on\n";
        let services = parse_xinetd_listing(listing);
        assert_eq!(services.len(), 2);
        assert_eq!(services.get("rsync"), Some(&true));
        assert_eq!(services.get("chargen-dgram"), Some(&false));
    }

    #[test]
    fn malformed_lines_do_not_stop_the_parse() {
        let listing = "xinetd based services:\n\tbroken\n\n\ttftp:\ton\n:\toff\n\ttime-dgram:\toff\n";
        let services = parse_xinetd_listing(listing);
        assert_eq!(services.len(), 2);
        assert_eq!(services.get("tftp"), Some(&true));
        assert_eq!(services.get("time-dgram"), Some(&false));
        assert!(!services.contains_key("broken"));
        assert!(!services.contains_key("xinetd"));
    }

    #[test]
    fn empty_output_is_empty_map() {
        assert!(parse_xinetd_listing("").is_empty());
    }
}

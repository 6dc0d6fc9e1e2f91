//! Hop rendering.

use troute_core::{Hop, HopPrinter};

/// Formats one stabilized hop as a single output line.
///
/// Unanswered probes render as `*`. A `host (address)` label is printed
/// only when it differs from the last printed host within the hop; a `*`
/// placeholder does not reset that state, so a router answering around a
/// lost probe is still labeled once. The round-trip time is printed for
/// every answered probe.
pub fn format_hop(hop: &Hop) -> String {
    let mut line = format!("{}\t", hop.index + 1);
    let mut last_host: Option<&str> = None;

    for probe in &hop.probes {
        if !probe.valid {
            line.push_str("* ");
            continue;
        }

        if last_host != Some(probe.host.as_str()) {
            line.push_str(&format!("{} ({})", probe.host, probe.address));
            last_host = Some(probe.host.as_str());
        }
        line.push_str(&format!(" {:.3} ms ", probe.rtt.as_secs_f64() * 1000.0));
    }

    line.trim_end().to_string()
}

/// Prints hops to standard output.
#[derive(Default)]
pub struct ConsolePrinter;

impl HopPrinter for ConsolePrinter {
    fn print_hop(&mut self, hop: &Hop) {
        println!("{}", format_hop(hop));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use troute_core::{IcmpClass, Probe};

    fn answered(host: &str, address: &str, millis: u64) -> Probe {
        Probe::answered(
            host.to_string(),
            address.to_string(),
            Duration::from_millis(millis),
            IcmpClass::TimeExceeded,
        )
    }

    #[test]
    fn test_repeated_host_label_is_collapsed() {
        let hop = Hop {
            index: 2,
            probes: vec![
                answered("router.example", "10.0.0.1", 10),
                answered("router.example", "10.0.0.1", 12),
                answered("router.example", "10.0.0.1", 9),
            ],
        };
        let line = format_hop(&hop);
        assert!(line.starts_with("3\t"));
        assert_eq!(line.matches("router.example (10.0.0.1)").count(), 1);
        assert_eq!(line.matches(" ms").count(), 3);
    }

    #[test]
    fn test_differing_hosts_are_both_labeled() {
        let hop = Hop {
            index: 0,
            probes: vec![
                answered("a.example", "10.0.0.1", 10),
                answered("b.example", "10.0.0.2", 11),
            ],
        };
        let line = format_hop(&hop);
        assert!(line.contains("a.example (10.0.0.1)"));
        assert!(line.contains("b.example (10.0.0.2)"));
    }

    #[test]
    fn test_unanswered_probes_render_placeholders() {
        let hop = Hop {
            index: 4,
            probes: vec![
                Probe::unanswered(),
                answered("router.example", "10.0.0.1", 10),
                Probe::unanswered(),
            ],
        };
        let line = format_hop(&hop);
        assert!(line.starts_with("5\t* "));
        assert!(line.ends_with('*'));
        assert!(line.contains("router.example"));
    }

    #[test]
    fn test_host_label_survives_an_interleaved_placeholder() {
        let hop = Hop {
            index: 0,
            probes: vec![
                answered("router.example", "10.0.0.1", 10),
                Probe::unanswered(),
                answered("router.example", "10.0.0.1", 12),
            ],
        };
        let line = format_hop(&hop);
        assert_eq!(line.matches("router.example (10.0.0.1)").count(), 1);
        assert_eq!(line.matches(" ms").count(), 2);
        assert!(line.contains('*'));
    }
}

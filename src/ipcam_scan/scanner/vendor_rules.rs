//! Vendor signature table and scorer

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use super::classify::{ratio, ClassifierThresholds};
use crate::ipcam_scan::types::{Fingerprint, VendorGuess};

/// Points per matching text pattern
pub const TEXT_PATTERN_POINTS: i32 = 3;
/// Points per matching realm pattern
pub const REALM_PATTERN_POINTS: i32 = 2;
/// Points per expected port found open
pub const PORT_POINTS: i32 = 1;

/// Vendor signature
#[derive(Debug, Clone, Copy)]
pub struct VendorRule {
    pub vendor: &'static str,
    /// Case-insensitive patterns matched against all fingerprint text
    pub patterns: &'static [&'static str],
    pub ports: &'static [u16],
    pub realms: &'static [&'static str],
}

/// Known vendors, in tie-break order
pub const VENDOR_RULES: &[VendorRule] = &[
    VendorRule {
        vendor: "hikvision",
        patterns: &["hikvision", "ivms", "isapi", "ds-2"],
        ports: &[8000],
        realms: &["hikvision"],
    },
    VendorRule {
        vendor: "dahua",
        patterns: &["dahua", "webs", "dvr"],
        ports: &[37777, 37778],
        realms: &["dahua"],
    },
    VendorRule {
        vendor: "uniview",
        patterns: &["uniview", r"\bunv\b"],
        ports: &[5060],
        realms: &["unv"],
    },
    VendorRule {
        vendor: "axis",
        patterns: &["axis"],
        ports: &[],
        realms: &["axis"],
    },
    VendorRule {
        vendor: "reolink",
        patterns: &["reolink"],
        ports: &[9000],
        realms: &[],
    },
    VendorRule {
        vendor: "seetong",
        patterns: &["seetong"],
        ports: &[8899],
        realms: &[],
    },
];

/// Vendor rule with its patterns compiled
#[derive(Debug)]
pub struct CompiledVendorRule {
    pub vendor: String,
    patterns: Vec<Regex>,
    realms: Vec<Regex>,
    ports: Vec<u16>,
}

impl CompiledVendorRule {
    pub fn compile(rule: &VendorRule) -> Result<Self, regex::Error> {
        Ok(Self {
            vendor: rule.vendor.to_string(),
            patterns: compile_all(rule.patterns)?,
            realms: compile_all(rule.realms)?,
            ports: rule.ports.to_vec(),
        })
    }

    /// Score this rule against a haystack and the open ports
    pub fn score(&self, haystack: &str, open_ports: &[u16]) -> (i32, Vec<String>) {
        let mut score = 0;
        let mut reasons = Vec::new();

        for pattern in &self.patterns {
            if pattern.is_match(haystack) {
                score += TEXT_PATTERN_POINTS;
                reasons.push(format!("match:{}", pattern.as_str()));
            }
        }
        for pattern in &self.realms {
            if pattern.is_match(haystack) {
                score += REALM_PATTERN_POINTS;
                reasons.push(format!("realm:{}", pattern.as_str()));
            }
        }
        for port in &self.ports {
            if open_ports.contains(port) {
                score += PORT_POINTS;
                reasons.push(format!("port:{}", port));
            }
        }

        (score, reasons)
    }
}

fn compile_all(sources: &[&str]) -> Result<Vec<Regex>, regex::Error> {
    sources
        .iter()
        .map(|src| RegexBuilder::new(src).case_insensitive(true).build())
        .collect()
}

/// Compiled form of [`VENDOR_RULES`]
pub fn builtin_rules() -> &'static [CompiledVendorRule] {
    static RULES: OnceLock<Vec<CompiledVendorRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        VENDOR_RULES
            .iter()
            .filter_map(|rule| match CompiledVendorRule::compile(rule) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::error!(vendor = rule.vendor, error = %e, "Invalid vendor rule skipped");
                    None
                }
            })
            .collect()
    })
}

/// Lowercased concatenation of titles, snippets, servers and realms
pub fn fingerprint_haystack(fingerprints: &[Fingerprint]) -> String {
    let titles = fingerprints.iter().map(|f| f.title.as_deref());
    let snippets = fingerprints.iter().map(|f| f.snippet.as_deref());
    let servers = fingerprints.iter().map(|f| f.server.as_deref());
    let realms = fingerprints.iter().map(|f| f.realm.as_deref());

    titles
        .chain(snippets)
        .chain(servers)
        .chain(realms)
        .map(|s| s.unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stage 3: Guess the vendor using the built-in table
pub fn guess_vendor(open_ports: &[u16], fingerprints: &[Fingerprint]) -> VendorGuess {
    guess_vendor_with(
        builtin_rules(),
        &ClassifierThresholds::default(),
        open_ports,
        fingerprints,
    )
}

/// Stage 3: Guess the vendor with an explicit rule set.
///
/// Highest score wins; the earlier rule wins a tie.
pub fn guess_vendor_with(
    rules: &[CompiledVendorRule],
    thresholds: &ClassifierThresholds,
    open_ports: &[u16],
    fingerprints: &[Fingerprint],
) -> VendorGuess {
    let haystack = fingerprint_haystack(fingerprints);

    let mut best: Option<(&CompiledVendorRule, i32, Vec<String>)> = None;
    for rule in rules {
        let (score, reasons) = rule.score(&haystack, open_ports);
        let better = match &best {
            Some((_, best_score, _)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((rule, score, reasons));
        }
    }

    match best {
        Some((rule, score, reasons)) if score > 0 => VendorGuess {
            vendor: Some(rule.vendor.clone()),
            confidence: ratio(score, thresholds.vendor_score_ceiling),
            reasons,
        },
        _ => VendorGuess::none(),
    }
}

//! Probe registration and dispatch
//!
//! This module provides a centralized registry for all debug probe
//! backends, with support for feature-gated inclusion and dynamic help
//! text generation.

use scootflash_core::probe::DebugProbe;

/// Information about a probe backend
pub struct ProbeInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available probes (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_probes() -> Vec<ProbeInfo> {
    let mut probes = Vec::new();

    #[cfg(feature = "dummy")]
    probes.push(ProbeInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory scooter controller emulator for testing",
    });

    probes
}

/// Generate help text listing all available probes
pub fn probe_help() -> String {
    let probes = available_probes();

    if probes.is_empty() {
        return "No probes available (recompile with probe features enabled)".to_string();
    }

    let mut help = String::from("Available probes:\n");
    for p in &probes {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of probe names for CLI help
pub fn probe_names_short() -> String {
    let probes = available_probes();
    let names: Vec<&str> = probes.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Open the named probe backend.
///
/// The probe string can be just the name (e.g., "dummy") or include
/// parameters (e.g., "stlink:serial=0671FF51").
#[allow(unused_variables)]
pub fn open_probe(spec: &str) -> Result<Box<dyn DebugProbe>, Box<dyn std::error::Error>> {
    let (name, _options) = parse_probe_string(spec);

    match name {
        #[cfg(feature = "dummy")]
        "dummy" => {
            log::info!("Opening dummy probe...");
            Ok(Box::new(scootflash_dummy::DummyProbe::new_default()))
        }

        _ => Err(unknown_probe_error(name)),
    }
}

/// Parse a probe string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_probe_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_probe_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown probe: {}\n\n", name);
    msg.push_str(&probe_help());
    msg.push_str("\nUse 'scootflash list-probes' for more details");
    msg.into()
}

//! List commands implementation

use crate::probes;
use scootflash_core::registry;

/// List all supported scooter models
pub fn list_devices() {
    println!("Supported devices:");
    println!();
    println!(
        "{:<8} {:<8} {:<12} {:<12}",
        "Device", "Family", "Drive FW", "BLE FW"
    );
    println!("{}", "-".repeat(44));

    for profile in registry::all_profiles() {
        let family = if profile.secondary_bootloader {
            "ninebot"
        } else {
            "xiaomi"
        };
        println!(
            "{:<8} {:<8} {:<12} {:<12}",
            profile.id,
            family,
            availability(profile.drive_firmware),
            availability(profile.ble_firmware),
        );
    }
    println!();
    println!("Devices without stock firmware require --firmware <image>");
}

fn availability(stock: Option<&'static str>) -> &'static str {
    if stock.is_some() {
        "stock"
    } else {
        "user image"
    }
}

/// List all available probe backends
pub fn list_probes() {
    let probes = probes::available_probes();
    if probes.is_empty() {
        println!("No probes available (recompile with probe features enabled)");
        return;
    }

    println!("Available probes:");
    println!();
    for p in &probes {
        print!("  {:12} - {}", p.name, p.description);
        if !p.aliases.is_empty() {
            print!(" (aliases: {})", p.aliases.join(", "));
        }
        println!();
    }
}

//! Serial port listing with board-mode classification.

use {
    console::style,
    flashcheck::{DetectedPort, detect_ports, format_port_list},
    rust_i18n::t,
};

use crate::config::Config;

/// JSON view of detected ports.
fn ports_json(ports: &[DetectedPort]) -> serde_json::Value {
    ports
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.info.name,
                "mode": p.mode.name(),
                "vid": p.info.vid,
                "pid": p.info.pid,
                "manufacturer": p.info.manufacturer,
                "product": p.info.product,
                "serial": p.info.serial_number,
            })
        })
        .collect()
}

/// List ports, human-readable on stderr or JSON on stdout.
pub(crate) fn cmd_list_ports(config: &Config, json: bool) {
    let detected = detect_ports(&config.board_profile());

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ports_json(&detected)).unwrap_or_default()
        );
        return;
    }

    eprintln!("{}", style(t!("list_ports.header")).bold().underlined());

    if detected.is_empty() {
        eprintln!("  {}", style(t!("list_ports.no_ports")).dim());
        return;
    }
    for line in format_port_list(&detected) {
        eprintln!("  {} {line}", style("•").green());
    }
}

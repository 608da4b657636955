//! Native port enumeration using the `serialport` crate.

use {
    crate::{
        error::Result,
        port::{PortEnumerator, PortInfo},
    },
    log::trace,
};

/// Native port enumerator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePortEnumerator;

impl PortEnumerator for NativePortEnumerator {
    fn list_ports(&mut self) -> Result<Vec<PortInfo>> {
        let ports = serialport::available_ports()?;

        Ok(ports
            .into_iter()
            .map(|p| {
                let (vid, pid, manufacturer, product, serial_number) = match &p.port_type {
                    serialport::SerialPortType::UsbPort(info) => {
                        trace!(
                            "USB port: {} (VID: {:04X}, PID: {:04X})",
                            p.port_name, info.vid, info.pid
                        );
                        (
                            Some(info.vid),
                            Some(info.pid),
                            info.manufacturer
                                .clone(),
                            info.product
                                .clone(),
                            info.serial_number
                                .clone(),
                        )
                    },
                    _ => (None, None, None, None, None),
                };

                PortInfo {
                    name: p.port_name,
                    vid,
                    pid,
                    manufacturer,
                    product,
                    serial_number,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_ports() {
        // This test just verifies that list_ports doesn't panic
        let _ = NativePortEnumerator.list_ports();
    }
}

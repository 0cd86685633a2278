//! Serial port autodetection by description.

use serialport::{SerialPortInfo, SerialPortType};

/// A serial port with the human-readable description used for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct PortListing {
    pub name: String,
    pub description: String,
}

impl From<SerialPortInfo> for PortListing {
    fn from(info: SerialPortInfo) -> Self {
        let description = match info.port_type {
            // Product strings carry the driver's friendly name ("USB Serial Port",
            // "STMicroelectronics STLink Virtual COM Port", ...).
            SerialPortType::UsbPort(usb) => usb
                .product
                .or(usb.manufacturer)
                .unwrap_or_else(|| info.port_name.clone()),
            SerialPortType::PciPort | SerialPortType::BluetoothPort | SerialPortType::Unknown => {
                info.port_name.clone()
            }
        };

        Self {
            name: info.port_name,
            description,
        }
    }
}

/// Enumerates the system's serial ports.
pub fn list_ports() -> Result<Vec<PortListing>, serialport::Error> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(PortListing::from).collect())
}

/// Returns the first listing whose description contains `marker`.
pub fn find_by_description<'a>(ports: &'a [PortListing], marker: &str) -> Option<&'a PortListing> {
    ports.iter().find(|port| port.description.contains(marker))
}

/// Scans the system once and returns the name of the matching port, if any.
pub fn find_port(marker: &str) -> Result<Option<String>, serialport::Error> {
    let ports = list_ports()?;
    let found = find_by_description(&ports, marker).map(|port| port.name.clone());
    match &found {
        Some(name) => log::info!("Found '{}' on {}", marker, name),
        None => log::debug!("No port among {} matches '{}'", ports.len(), marker),
    }
    Ok(found)
}

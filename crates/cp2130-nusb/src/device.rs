//! nusb-backed CP2130 transport
//!
//! This module provides [`UsbTransport`], which claims interface 0 of a
//! CP2130 and implements [`Transport`] with blocking nusb transfers.

use std::time::Duration;

use cp2130_core::protocol::{CP2130_USB_PRODUCT, CP2130_USB_VENDOR, READ_EP, WRITE_EP};
use cp2130_core::{ControlRequest, Transport, TransportError};
use nusb::transfer::{
    Buffer, Bulk, ControlIn, ControlOut, ControlType, In, Out, Recipient, TransferError,
};
use nusb::{Endpoint, Interface, MaybeFuture};

use crate::error::{Result, UsbError};

/// The CP2130 exposes a single vendor-specific interface
const INTERFACE: u8 = 0;

/// Default transfer timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Which device to open and how to talk to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbConfig {
    pub vid: u16,
    pub pid: u16,
    /// Position among the matching devices
    pub index: usize,
    /// Only match a device with this serial number
    pub serial: Option<String>,
    /// Timeout applied to every transfer
    pub timeout: Duration,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            vid: CP2130_USB_VENDOR,
            pid: CP2130_USB_PRODUCT,
            index: 0,
            serial: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl UsbConfig {
    fn matches(&self, info: &nusb::DeviceInfo) -> bool {
        info.vendor_id() == self.vid
            && info.product_id() == self.pid
            && match &self.serial {
                Some(serial) => info.serial_number() == Some(serial.as_str()),
                None => true,
            }
    }
}

/// Information about a connected CP2130
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// USB bus identifier
    pub bus: String,
    /// USB device address
    pub address: u8,
    pub vid: u16,
    pub pid: u16,
    pub serial: Option<String>,
    pub product: Option<String>,
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} at bus {} address {}",
            self.vid, self.pid, self.bus, self.address
        )?;
        if let Some(product) = &self.product {
            write!(f, " \"{}\"", product)?;
        }
        if let Some(serial) = &self.serial {
            write!(f, " serial {}", serial)?;
        }
        Ok(())
    }
}

/// List connected devices matching `config`'s VID, PID and serial
pub fn list_devices(config: &UsbConfig) -> Result<Vec<DeviceInfo>> {
    let devices = nusb::list_devices()
        .wait()
        .map_err(|e| UsbError::OpenFailed(e.to_string()))?
        .filter(|d| config.matches(d))
        .map(|d| DeviceInfo {
            bus: d.bus_id().to_string(),
            address: d.device_address(),
            vid: d.vendor_id(),
            pid: d.product_id(),
            serial: d.serial_number().map(str::to_string),
            product: d.product_string().map(str::to_string),
        })
        .collect();

    Ok(devices)
}

/// CP2130 reached over USB
pub struct UsbTransport {
    interface: Interface,
    /// Bulk OUT endpoint for SPI commands and write data
    out_ep: Endpoint<Bulk, Out>,
    /// Bulk IN endpoint for SPI read data
    in_ep: Endpoint<Bulk, In>,
    timeout: Duration,
}

impl UsbTransport {
    /// Open the device selected by `config`
    pub fn open(config: &UsbConfig) -> Result<Self> {
        let device_info = nusb::list_devices()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?
            .filter(|d| config.matches(d))
            .nth(config.index)
            .ok_or(UsbError::DeviceNotFound {
                vid: config.vid,
                pid: config.pid,
                index: config.index,
            })?;

        log::info!(
            "Opening CP2130 at bus {} address {}",
            device_info.bus_id(),
            device_info.device_address()
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?;

        let interface = device
            .claim_interface(INTERFACE)
            .wait()
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;

        let out_ep = interface
            .endpoint::<Bulk, Out>(WRITE_EP)
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;
        let in_ep = interface
            .endpoint::<Bulk, In>(READ_EP)
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;
        log::debug!(
            "Claimed interface {}, bulk OUT 0x{:02x}, bulk IN 0x{:02x}",
            INTERFACE,
            WRITE_EP,
            READ_EP
        );

        Ok(Self {
            interface,
            out_ep,
            in_ep,
            timeout: config.timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

impl Transport for UsbTransport {
    fn control_in(
        &mut self,
        req: ControlRequest,
        length: u16,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let data = self
            .interface
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: recipient(req.request_type),
                    request: req.request,
                    value: req.value,
                    index: req.index,
                    length,
                },
                self.timeout,
            )
            .wait()
            .map_err(transport_error)?;

        log::trace!("control IN 0x{:02x}: {:02x?}", req.request, data);
        Ok(data)
    }

    fn control_out(
        &mut self,
        req: ControlRequest,
        data: &[u8],
    ) -> std::result::Result<(), TransportError> {
        self.interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: recipient(req.request_type),
                    request: req.request,
                    value: req.value,
                    index: req.index,
                    data,
                },
                self.timeout,
            )
            .wait()
            .map_err(transport_error)?;

        log::trace!("control OUT 0x{:02x}: {} bytes", req.request, data.len());
        Ok(())
    }

    fn bulk_write(&mut self, endpoint: u8, data: &[u8]) -> std::result::Result<(), TransportError> {
        if endpoint != WRITE_EP {
            return Err(TransportError::Other(format!(
                "no bulk OUT endpoint 0x{:02x}",
                endpoint
            )));
        }

        let mut buf = Buffer::new(data.len());
        buf.extend_from_slice(data);
        self.out_ep
            .transfer_blocking(buf, self.timeout)
            .into_result()
            .map_err(transport_error)?;

        log::trace!("USB write {} bytes", data.len());
        Ok(())
    }

    fn bulk_read(
        &mut self,
        endpoint: u8,
        length: usize,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        if endpoint != READ_EP {
            return Err(TransportError::Other(format!(
                "no bulk IN endpoint 0x{:02x}",
                endpoint
            )));
        }

        let max_packet_size = self.in_ep.max_packet_size();
        // Request length must be multiple of max packet size
        let request_len = length.div_ceil(max_packet_size) * max_packet_size;
        let mut buf = Buffer::new(request_len);
        buf.set_requested_len(request_len);

        let data = self
            .in_ep
            .transfer_blocking(buf, self.timeout)
            .into_result()
            .map_err(transport_error)?;

        let received = data.len().min(length);
        log::trace!("USB read {} bytes", received);
        Ok(data[..received].to_vec())
    }
}

/// Recipient bits of bmRequestType
fn recipient(request_type: u8) -> Recipient {
    match request_type & 0x1F {
        0x01 => Recipient::Interface,
        0x02 => Recipient::Endpoint,
        0x03 => Recipient::Other,
        _ => Recipient::Device,
    }
}

fn transport_error(e: TransferError) -> TransportError {
    match e {
        // Blocking transfers are cancelled when the timeout expires
        TransferError::Cancelled => TransportError::Timeout,
        TransferError::Stall => TransportError::Stall,
        TransferError::Disconnected => TransportError::Disconnected,
        other => TransportError::Other(other.to_string()),
    }
}

/// Parse transport options
///
/// Supported options:
/// - `vid=<hex>`: USB vendor ID (default: 10c4)
/// - `pid=<hex>`: USB product ID (default: 87a0)
/// - `index=<n>`: which matching device to open (default: 0)
/// - `serial=<string>`: only open the device with this serial number
/// - `timeout=<ms>`: transfer timeout in milliseconds (default: 1000)
///
/// # Example
///
/// ```
/// let config = cp2130_nusb::parse_options(&[("pid", "87a1"), ("timeout", "250")])?;
/// assert_eq!(config.pid, 0x87A1);
/// # Ok::<(), cp2130_nusb::UsbError>(())
/// ```
pub fn parse_options(options: &[(&str, &str)]) -> Result<UsbConfig> {
    let mut config = UsbConfig::default();

    for (key, value) in options {
        match *key {
            "vid" => config.vid = parse_hex_u16(key, value)?,
            "pid" => config.pid = parse_hex_u16(key, value)?,
            "index" => {
                config.index = value.parse().map_err(|_| {
                    UsbError::ConfigError(format!("Invalid index value: {}", value))
                })?;
            }
            "serial" => config.serial = Some(value.to_string()),
            "timeout" => {
                let ms: u64 = value.parse().map_err(|_| {
                    UsbError::ConfigError(format!("Invalid timeout value: {}", value))
                })?;
                if ms == 0 {
                    return Err(UsbError::ConfigError("timeout must be non-zero".into()));
                }
                config.timeout = Duration::from_millis(ms);
            }
            _ => {
                log::warn!("Unknown CP2130 option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

fn parse_hex_u16(key: &str, value: &str) -> Result<u16> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16)
        .map_err(|_| UsbError::ConfigError(format!("Invalid {} value: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_defaults() {
        let config = parse_options(&[]).unwrap();
        assert_eq!(config, UsbConfig::default());
        assert_eq!(config.vid, 0x10C4);
        assert_eq!(config.pid, 0x87A0);
        assert_eq!(config.timeout, Duration::from_millis(1000));
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[
            ("vid", "0x1234"),
            ("pid", "ABCD"),
            ("index", "2"),
            ("serial", "0001"),
            ("timeout", "50"),
        ])
        .unwrap();
        assert_eq!(config.vid, 0x1234);
        assert_eq!(config.pid, 0xABCD);
        assert_eq!(config.index, 2);
        assert_eq!(config.serial.as_deref(), Some("0001"));
        assert_eq!(config.timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_parse_options_rejects_bad_values() {
        assert!(parse_options(&[("vid", "xyz")]).is_err());
        assert!(parse_options(&[("pid", "10000")]).is_err());
        assert!(parse_options(&[("timeout", "0")]).is_err());
        assert!(parse_options(&[("index", "-1")]).is_err());
    }

    #[test]
    fn test_recipient_bits() {
        assert_eq!(recipient(0xC0), Recipient::Device);
        assert_eq!(recipient(0x40), Recipient::Device);
        assert_eq!(recipient(0x41), Recipient::Interface);
    }

    #[test]
    fn test_transfer_error_mapping() {
        assert_eq!(
            transport_error(TransferError::Cancelled),
            TransportError::Timeout
        );
        assert_eq!(transport_error(TransferError::Stall), TransportError::Stall);
        assert_eq!(
            transport_error(TransferError::Disconnected),
            TransportError::Disconnected
        );
    }
}

//! Transport capability consumed by the chip layer
//!
//! A backend only has to move bytes: vendor control transfers on the default
//! pipe and bulk transfers on numbered endpoints. Timeouts and retries are
//! the backend's business.

use crate::error::TransportError;

/// Setup packet parameters of a control transfer (everything except wLength)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    /// bmRequestType
    pub request_type: u8,
    /// bRequest
    pub request: u8,
    /// wValue
    pub value: u16,
    /// wIndex
    pub index: u16,
}

/// Transport trait for talking to a CP2130
pub trait Transport {
    /// Device-to-host control transfer reading up to `length` bytes
    fn control_in(&mut self, req: ControlRequest, length: u16) -> Result<Vec<u8>, TransportError>;

    /// Host-to-device control transfer; `data` may be empty
    fn control_out(&mut self, req: ControlRequest, data: &[u8]) -> Result<(), TransportError>;

    /// Write all of `data` to a bulk OUT endpoint
    fn bulk_write(&mut self, endpoint: u8, data: &[u8]) -> Result<(), TransportError>;

    /// Read up to `length` bytes from a bulk IN endpoint
    fn bulk_read(&mut self, endpoint: u8, length: usize) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn control_in(&mut self, req: ControlRequest, length: u16) -> Result<Vec<u8>, TransportError> {
        (**self).control_in(req, length)
    }

    fn control_out(&mut self, req: ControlRequest, data: &[u8]) -> Result<(), TransportError> {
        (**self).control_out(req, data)
    }

    fn bulk_write(&mut self, endpoint: u8, data: &[u8]) -> Result<(), TransportError> {
        (**self).bulk_write(endpoint, data)
    }

    fn bulk_read(&mut self, endpoint: u8, length: usize) -> Result<Vec<u8>, TransportError> {
        (**self).bulk_read(endpoint, length)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn control_in(&mut self, req: ControlRequest, length: u16) -> Result<Vec<u8>, TransportError> {
        (**self).control_in(req, length)
    }

    fn control_out(&mut self, req: ControlRequest, data: &[u8]) -> Result<(), TransportError> {
        (**self).control_out(req, data)
    }

    fn bulk_write(&mut self, endpoint: u8, data: &[u8]) -> Result<(), TransportError> {
        (**self).bulk_write(endpoint, data)
    }

    fn bulk_read(&mut self, endpoint: u8, length: usize) -> Result<Vec<u8>, TransportError> {
        (**self).bulk_read(endpoint, length)
    }
}

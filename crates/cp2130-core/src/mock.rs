//! In-memory transport for testing
//!
//! [`MockTransport`] records every transfer and answers from scripted
//! responses. Control IN requests without a scripted response read back
//! zeros; bulk reads are served from a queue, or from a loopback of the
//! last write-read payload when loopback is enabled.

use std::collections::{HashMap, VecDeque};

use crate::error::TransportError;
use crate::protocol::{parse_bulk_header, BulkOp, BULK_HEADER_LEN};
use crate::transport::{ControlRequest, Transport};

/// One recorded transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ControlIn { req: ControlRequest, length: u16 },
    ControlOut { req: ControlRequest, data: Vec<u8> },
    BulkWrite { endpoint: u8, data: Vec<u8> },
    BulkRead { endpoint: u8, length: usize },
}

/// Scripted transport
#[derive(Debug, Default)]
pub struct MockTransport {
    calls: Vec<Call>,
    responses: HashMap<(u8, u16), Vec<u8>>,
    failures: HashMap<u8, TransportError>,
    bulk_failure: Option<TransportError>,
    bulk_responses: VecDeque<Vec<u8>>,
    loopback: bool,
    pending: VecDeque<u8>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer control IN request `request` (any wIndex) with `data`
    pub fn respond(&mut self, request: u8, data: &[u8]) -> &mut Self {
        self.responses.insert((request, u16::MAX), data.to_vec());
        self
    }

    /// Answer control IN request `request` with wIndex `index`
    pub fn respond_at(&mut self, request: u8, index: u16, data: &[u8]) -> &mut Self {
        self.responses.insert((request, index), data.to_vec());
        self
    }

    /// Fail every control transfer with request code `request`
    pub fn fail_request(&mut self, request: u8, error: TransportError) -> &mut Self {
        self.failures.insert(request, error);
        self
    }

    /// Stop failing control transfers
    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Fail every bulk transfer
    pub fn fail_bulk(&mut self, error: TransportError) -> &mut Self {
        self.bulk_failure = Some(error);
        self
    }

    /// Queue one chunk to be returned by the next bulk read
    pub fn queue_bulk(&mut self, data: &[u8]) -> &mut Self {
        self.bulk_responses.push_back(data.to_vec());
        self
    }

    /// Echo write-read payloads back as read data (MOSI wired to MISO)
    pub fn set_loopback(&mut self, loopback: bool) -> &mut Self {
        self.loopback = loopback;
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Payloads of control OUT transfers with request code `request`
    pub fn sent(&self, request: u8) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::ControlOut { req, data } if req.request == request => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    fn check(&self, request: u8) -> Result<(), TransportError> {
        match self.failures.get(&request) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl Transport for MockTransport {
    fn control_in(&mut self, req: ControlRequest, length: u16) -> Result<Vec<u8>, TransportError> {
        self.calls.push(Call::ControlIn { req, length });
        self.check(req.request)?;

        let data = self
            .responses
            .get(&(req.request, req.index))
            .or_else(|| self.responses.get(&(req.request, u16::MAX)))
            .cloned()
            .unwrap_or_else(|| vec![0; length as usize]);
        Ok(data.into_iter().take(length as usize).collect())
    }

    fn control_out(&mut self, req: ControlRequest, data: &[u8]) -> Result<(), TransportError> {
        self.calls.push(Call::ControlOut {
            req,
            data: data.to_vec(),
        });
        self.check(req.request)
    }

    fn bulk_write(&mut self, endpoint: u8, data: &[u8]) -> Result<(), TransportError> {
        self.calls.push(Call::BulkWrite {
            endpoint,
            data: data.to_vec(),
        });
        if let Some(e) = &self.bulk_failure {
            return Err(e.clone());
        }

        if self.loopback {
            if let Some((BulkOp::WriteRead, _)) = parse_bulk_header(data) {
                self.pending.extend(&data[BULK_HEADER_LEN..]);
            }
        }
        Ok(())
    }

    fn bulk_read(&mut self, endpoint: u8, length: usize) -> Result<Vec<u8>, TransportError> {
        self.calls.push(Call::BulkRead { endpoint, length });
        if let Some(e) = &self.bulk_failure {
            return Err(e.clone());
        }

        if let Some(mut chunk) = self.bulk_responses.pop_front() {
            chunk.truncate(length);
            return Ok(chunk);
        }
        let n = length.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQ: ControlRequest = ControlRequest {
        request_type: 0xC0,
        request: 0x46,
        value: 0,
        index: 0,
    };

    #[test]
    fn test_default_response_is_zeros() {
        let mut mock = MockTransport::new();
        assert_eq!(mock.control_in(REQ, 3).unwrap(), vec![0, 0, 0]);
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_indexed_response_preferred() {
        let mut mock = MockTransport::new();
        mock.respond(0x46, &[1]).respond_at(0x46, 2, &[2]);
        assert_eq!(mock.control_in(REQ, 1).unwrap(), vec![1]);
        let req = ControlRequest { index: 2, ..REQ };
        assert_eq!(mock.control_in(req, 1).unwrap(), vec![2]);
    }

    #[test]
    fn test_scripted_failure() {
        let mut mock = MockTransport::new();
        mock.fail_request(0x46, TransportError::Stall);
        assert_eq!(mock.control_in(REQ, 1), Err(TransportError::Stall));
        mock.clear_failures();
        assert!(mock.control_in(REQ, 1).is_ok());
    }
}

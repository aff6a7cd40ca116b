// Copyright 2025 the spatial-telemetry authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Transport error classification
//
// Maps raw reqwest failures onto the transport taxonomy. Anything that
// indicates "no viable connection right now" is transient and routes
// the payload to the offline cache; everything else stays in memory
// for retry.

use crate::error::{SendError, TransportError};

/// Classify a reqwest error into the send taxonomy.
pub fn classify_reqwest_error(err: &reqwest::Error) -> SendError {
    if err.is_timeout() {
        return SendError::Transport(TransportError::Timeout);
    }

    if let Some(transport) = classify_source_chain(err) {
        return SendError::Transport(transport);
    }

    if err.is_connect() {
        // Connection-phase failure with no more specific io kind
        return SendError::Transport(TransportError::HostUnreachable);
    }

    if let Some(status) = err.status() {
        return SendError::Http {
            status: status.as_u16(),
        };
    }

    // Mid-request failures (reset streams, closed sockets) mean the
    // connection went away under us.
    SendError::Transport(TransportError::ConnectionLost)
}

/// Walk the source chain looking for an io error or a message that
/// pins down the transport failure class.
fn classify_source_chain(err: &(dyn std::error::Error + 'static)) -> Option<TransportError> {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if let Some(transport) = classify_io_kind(io.kind()) {
                return Some(transport);
            }
        }

        let message = cause.to_string().to_lowercase();
        if message.contains("dns") || message.contains("resolve") {
            return Some(TransportError::DnsFailure);
        }
        if message.contains("certificate") || message.contains("tls") || message.contains("ssl") {
            return Some(TransportError::Tls);
        }

        source = cause.source();
    }
    None
}

fn classify_io_kind(kind: std::io::ErrorKind) -> Option<TransportError> {
    use std::io::ErrorKind;
    match kind {
        ErrorKind::TimedOut => Some(TransportError::Timeout),
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::NotConnected => Some(TransportError::ConnectionLost),
        ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
            Some(TransportError::HostUnreachable)
        }
        ErrorKind::NetworkDown => Some(TransportError::DataNotAllowed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_to_transport_classes() {
        use std::io::ErrorKind;
        assert_eq!(
            classify_io_kind(ErrorKind::TimedOut),
            Some(TransportError::Timeout)
        );
        assert_eq!(
            classify_io_kind(ErrorKind::ConnectionReset),
            Some(TransportError::ConnectionLost)
        );
        assert_eq!(
            classify_io_kind(ErrorKind::HostUnreachable),
            Some(TransportError::HostUnreachable)
        );
        assert_eq!(classify_io_kind(ErrorKind::InvalidData), None);
    }

    #[test]
    fn source_chain_detects_dns_wording() {
        let inner = std::io::Error::other("failed to resolve host name");
        let transport = classify_source_chain(&inner);
        assert_eq!(transport, Some(TransportError::DnsFailure));
    }

    #[test]
    fn source_chain_detects_tls_wording() {
        let inner = std::io::Error::other("invalid peer certificate");
        let transport = classify_source_chain(&inner);
        assert_eq!(transport, Some(TransportError::Tls));
    }
}

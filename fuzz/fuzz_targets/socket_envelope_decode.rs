#![no_main]

use libfuzzer_sys::fuzz_target;
use lumos_slack::{decode_socket_envelope, Acknowledgment, SocketFrame};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let Ok(envelope) = decode_socket_envelope(&raw) else {
        return;
    };

    match &envelope.frame {
        Some(SocketFrame::EventsApi(_) | SocketFrame::Interactive(_)) => {
            let envelope_id = envelope.envelope_id().unwrap_or_default();
            let ack = Acknowledgment::new(envelope_id).to_text();
            assert!(ack.contains("envelope_id"));
        }
        Some(SocketFrame::Hello(_) | SocketFrame::Disconnect(_)) => {}
        None => assert_eq!(envelope.raw.as_str(), &*raw),
    }
});

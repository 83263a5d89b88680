//! In-proc transport for the local loop: framed `ServerMsg` values over
//! `std::sync::mpsc`, with non-blocking drain helpers. A real socket layer
//! replaces this behind the same send/drain surface.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::frame;
use crate::message::ServerMsg;

#[derive(Clone)]
pub struct Tx(Sender<Vec<u8>>);
pub struct Rx(Receiver<Vec<u8>>);

/// Create a sender/receiver pair. The underlying channel is unbounded.
#[must_use]
pub fn channel() -> (Tx, Rx) {
    let (s, r) = mpsc::channel::<Vec<u8>>();
    (Tx(s), Rx(r))
}

impl Tx {
    /// Frame and send one message; returns false if the receiver is gone.
    #[must_use]
    pub fn send_msg(&self, msg: &ServerMsg) -> bool {
        let mut buf = Vec::new();
        frame::write_msg(&mut buf, msg.to_json().as_bytes());
        self.0.send(buf).is_ok()
    }
}

impl Rx {
    /// Non-blocking receive of a single decoded message.
    pub fn try_recv_msg(&self) -> anyhow::Result<Option<ServerMsg>> {
        match self.0.try_recv() {
            Ok(bytes) => {
                let mut slice: &[u8] = &bytes;
                let payload = frame::read_msg(&mut slice)?;
                let text = std::str::from_utf8(payload)
                    .map_err(|e| anyhow::anyhow!("frame payload not utf-8: {e}"))?;
                Ok(Some(ServerMsg::from_json(text)?))
            }
            Err(_) => Ok(None),
        }
    }

    /// Drain all currently queued messages, stopping at the first bad frame.
    pub fn drain_msgs(&self) -> anyhow::Result<Vec<ServerMsg>> {
        let mut out = Vec::new();
        while let Some(m) = self.try_recv_msg()? {
            out.push(m);
        }
        Ok(out)
    }
}

//! Mock console device for host builds
//!
//! Stands in for the NS16550 under `cargo test`: received bytes are
//! scripted with `push_rx`, transmitted bytes are captured for
//! inspection with `drain_tx`.

use spin::Mutex;

use super::ConsoleDevice;

const RX_CAP: usize = 512;
const TX_CAP: usize = 1024;

struct MockState {
    inited: bool,
    rx: [u8; RX_CAP],
    rx_head: usize,
    rx_len: usize,
    tx: [u8; TX_CAP],
    tx_len: usize,
}

/// Mock console device
pub struct MockUart {
    state: Mutex<MockState>,
}

impl MockUart {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                inited: false,
                rx: [0; RX_CAP],
                rx_head: 0,
                rx_len: 0,
                tx: [0; TX_CAP],
                tx_len: 0,
            }),
        }
    }

    /// Script bytes for the receive path, as if the wire delivered them.
    pub fn push_rx(&self, bytes: &[u8]) {
        let mut s = self.state.lock();
        for &b in bytes {
            if s.rx_len < RX_CAP {
                let at = (s.rx_head + s.rx_len) % RX_CAP;
                s.rx[at] = b;
                s.rx_len += 1;
            }
        }
    }

    /// Move captured transmit bytes into `dst`, returning the count.
    pub fn drain_tx(&self, dst: &mut [u8]) -> usize {
        let mut s = self.state.lock();
        let n = s.tx_len.min(dst.len());
        dst[..n].copy_from_slice(&s.tx[..n]);
        s.tx_len = 0;
        n
    }

    /// Was `init` called on the device?
    pub fn inited(&self) -> bool {
        self.state.lock().inited
    }

    /// Forget everything, including initialization.
    pub fn mock_clear(&self) {
        let mut s = self.state.lock();
        s.inited = false;
        s.rx_head = 0;
        s.rx_len = 0;
        s.tx_len = 0;
    }
}

impl ConsoleDevice for MockUart {
    fn init(&self) {
        self.state.lock().inited = true;
    }

    fn putc(&self, c: u8) {
        let mut s = self.state.lock();
        if s.tx_len < TX_CAP {
            let at = s.tx_len;
            s.tx[at] = c;
            s.tx_len += 1;
        }
    }

    fn try_getc(&self) -> Option<u8> {
        let mut s = self.state.lock();
        if s.rx_len == 0 {
            return None;
        }
        let b = s.rx[s.rx_head];
        s.rx_head = (s.rx_head + 1) % RX_CAP;
        s.rx_len -= 1;
        Some(b)
    }
}

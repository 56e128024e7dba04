//! NS16550 UART driver
//!
//! Register-level driver for the 16550-compatible UART on QEMU virt.
//! The register block is byte-addressed at `base`; the two divisor-latch
//! registers alias RHR/IER while the baud-latch bit is set.
//!
//! Register I/O is not sequenced by default, so every access is followed
//! by an explicit ordering fence.

use core::ptr;
use core::sync::atomic::{fence, Ordering};

use bitflags::bitflags;

use super::ConsoleDevice;

/// Receive holding register (read)
const RHR: usize = 0;
/// Transmit holding register (write)
const THR: usize = 0;
/// Interrupt enable register
const IER: usize = 1;
/// FIFO control register (write)
const FCR: usize = 2;
/// Line control register
const LCR: usize = 3;
/// Line status register
const LSR: usize = 5;
/// Divisor latch LSB (while LCR baud-latch is set)
const DLL: usize = 0;
/// Divisor latch MSB (while LCR baud-latch is set)
const DLM: usize = 1;

bitflags! {
    /// Line status register bits
    struct Lsr: u8 {
        /// A received byte is waiting in RHR.
        const RX_READY = 1 << 0;
        /// THR is empty; the device can accept a byte.
        const TX_IDLE = 1 << 5;
    }
}

bitflags! {
    /// Interrupt enable register bits
    struct Ier: u8 {
        const RX_ENABLE = 1 << 0;
    }
}

bitflags! {
    /// FIFO control register bits
    struct Fcr: u8 {
        const FIFO_ENABLE = 1 << 0;
        /// Clear both FIFOs.
        const FIFO_CLEAR = 3 << 1;
    }
}

bitflags! {
    /// Line control register bits
    struct Lcr: u8 {
        /// 8 data bits, no parity.
        const EIGHT_BITS = 3 << 0;
        /// Expose the divisor latch in registers 0/1.
        const BAUD_LATCH = 1 << 7;
    }
}

/// NS16550 UART component
pub struct Ns16550 {
    base: usize,
}

impl Ns16550 {
    /// Bind the driver to a register block.
    pub const fn new(base: usize) -> Self {
        Self { base }
    }

    fn read_reg(&self, reg: usize) -> u8 {
        let val = unsafe { ptr::read_volatile((self.base + reg) as *const u8) };
        fence(Ordering::SeqCst);
        val
    }

    fn write_reg(&self, reg: usize, val: u8) {
        unsafe { ptr::write_volatile((self.base + reg) as *mut u8, val) };
        fence(Ordering::SeqCst);
    }
}

impl ConsoleDevice for Ns16550 {
    /// Program baud rate, framing and FIFOs, then enable the receive
    /// interrupt. 38.4K baud, 8 data bits, no parity.
    fn init(&self) {
        // Quiesce the device while reprogramming it.
        self.write_reg(IER, 0x00);

        // Special mode to set the baud rate.
        self.write_reg(LCR, Lcr::BAUD_LATCH.bits());
        self.write_reg(DLL, 0x03);
        self.write_reg(DLM, 0x00);

        // Leave baud mode; 8 bits, no parity.
        self.write_reg(LCR, Lcr::EIGHT_BITS.bits());

        // Reset and enable the FIFOs.
        self.write_reg(FCR, (Fcr::FIFO_ENABLE | Fcr::FIFO_CLEAR).bits());

        // Receive interrupts on.
        self.write_reg(IER, Ier::RX_ENABLE.bits());
    }

    fn putc(&self, c: u8) {
        while !Lsr::from_bits_truncate(self.read_reg(LSR)).contains(Lsr::TX_IDLE) {
            core::hint::spin_loop();
        }
        self.write_reg(THR, c);
    }

    fn try_getc(&self) -> Option<u8> {
        if Lsr::from_bits_truncate(self.read_reg(LSR)).contains(Lsr::RX_READY) {
            Some(self.read_reg(RHR))
        } else {
            None
        }
    }
}

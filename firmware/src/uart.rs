//! USART1 transmitter for the MIDI output (TX on PD3).

use avr_device::atmega32u4::USART1;
use footswitch_core::SerialOut;

/// 31250 baud at 16MHz: UBRR = 16MHz / (16 * 31250) - 1
const UBRR_MIDI: u16 = 31;

// UCSR1A bits
const UDRE1: u8 = 1 << 5;
const TXC1: u8 = 1 << 6;
// UCSR1B bits
const TXEN1: u8 = 1 << 3;
// UCSR1C: asynchronous, no parity, 1 stop bit, 8 data bits
const FRAME_8N1: u8 = 0x06;

pub struct MidiUart {
    usart: USART1,
    /// A byte was queued and TXC1 has not been seen since.
    pending: bool,
}

impl MidiUart {
    pub fn new(usart: USART1) -> Self {
        usart.ubrr1.write(|w| unsafe { w.bits(UBRR_MIDI) });
        usart.ucsr1c.write(|w| unsafe { w.bits(FRAME_8N1) });
        usart.ucsr1b.write(|w| unsafe { w.bits(TXEN1) });
        Self {
            usart,
            pending: false,
        }
    }
}

impl SerialOut for MidiUart {
    fn write_blocking(&mut self, byte: u8) {
        while self.usart.ucsr1a.read().bits() & UDRE1 == 0 {}
        // TXC1 is cleared by writing a one
        self.usart.ucsr1a.write(|w| unsafe { w.bits(TXC1) });
        self.usart.udr1.write(|w| unsafe { w.bits(byte) });
        self.pending = true;
    }

    fn flush(&mut self) {
        if self.pending {
            while self.usart.ucsr1a.read().bits() & TXC1 == 0 {}
            self.pending = false;
        }
    }
}

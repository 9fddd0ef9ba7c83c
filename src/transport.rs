//! Transmission strategies for the DAC8554 serial link.
//!
//! The chip understands the same 3-byte frame whether it is wired to a
//! hardware SPI peripheral or to two plain GPIO lines clocked in software.
//! Both wirings are expressed as implementations of [`Transport`]. The
//! choice is made once, at construction, and is immutable afterwards:
//! switching strategies would mean rewiring the board anyway.

use core::convert::Infallible;

use embedded_hal::{
    blocking::{delay::DelayUs, spi},
    digital::v2::OutputPin,
};

/// Delivery strategy for one 3-byte frame.
pub trait Transport {
    /// Error produced by the underlying bus, if it can fail at all.
    type Error;

    /// Bring the clock and data lines to their idle levels.
    fn init_lines(&mut self) -> Result<(), Self::Error>;

    /// Shift the frame out, most significant bit first.
    ///
    /// The frame-sync line is not handled here; the driver brackets this
    /// call with it.
    fn send_frame(&mut self, frame: &[u8; 3]) -> Result<(), Self::Error>;
}

/// Transport over a hardware SPI peripheral.
///
/// The peripheral must be configured for [`MODE`](crate::MODE) and a clock
/// rate the chip supports; [`SPI_CLOCK_HZ`](crate::SPI_CLOCK_HZ) is a
/// known-good value. Only the SCLK and MOSI lines are used, the chip never
/// drives data back.
#[derive(Debug)]
pub struct HardwareSpi<SPI> {
    spi: SPI,
}

impl<SPI, E> HardwareSpi<SPI>
where
    SPI: spi::Write<u8, Error = E>,
{
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Release the bus peripheral.
    pub fn free(self) -> SPI {
        self.spi
    }
}

impl<SPI, E> Transport for HardwareSpi<SPI>
where
    SPI: spi::Write<u8, Error = E>,
{
    type Error = E;

    fn init_lines(&mut self) -> Result<(), E> {
        // Mode and clock rate are properties of the peripheral, owned by
        // the HAL that created it.
        Ok(())
    }

    fn send_frame(&mut self, frame: &[u8; 3]) -> Result<(), E> {
        self.spi.write(frame)
    }
}

/// Default clock pulse width in microseconds. The chip needs 10 ns per
/// phase, so anything a GPIO can express is already comfortable.
const DEFAULT_PULSE_US: u8 = 1;

/// Software-clocked transport over two GPIO lines.
///
/// Useful on boards where the hardware SPI pins are spoken for. Both lines
/// idle high, matching the clock polarity the chip expects; data is
/// sampled by the chip on the falling clock edge.
#[derive(Debug)]
pub struct BitBang<SCLK, DIN, D> {
    sclk: SCLK,
    din: DIN,
    delay: D,
    pulse_us: u8,
}

impl<SCLK, DIN, D> BitBang<SCLK, DIN, D>
where
    SCLK: OutputPin,
    DIN: OutputPin,
    D: DelayUs<u8>,
{
    pub fn new(sclk: SCLK, din: DIN, delay: D) -> Self {
        Self {
            sclk,
            din,
            delay,
            pulse_us: DEFAULT_PULSE_US,
        }
    }

    /// Widen the clock pulse, e.g. for long or noisy wiring. The chip only
    /// specifies a minimum high/low time; the default already clears it.
    pub fn set_clock_pulse(&mut self, us: u8) {
        self.pulse_us = us;
    }

    /// Release the pins and the delay provider.
    pub fn free(self) -> (SCLK, DIN, D) {
        (self.sclk, self.din, self.delay)
    }

    /// One byte, MSB first: present the data bit, then pulse the clock.
    fn shift_out(&mut self, byte: u8) {
        for bit in (0..8).rev() {
            if byte >> bit & 1 == 1 {
                self.din.set_high().ok();
            } else {
                self.din.set_low().ok();
            }
            self.sclk.set_high().ok();
            self.delay.delay_us(self.pulse_us);
            self.sclk.set_low().ok();
            self.delay.delay_us(self.pulse_us);
        }
    }
}

impl<SCLK, DIN, D> Transport for BitBang<SCLK, DIN, D>
where
    SCLK: OutputPin,
    DIN: OutputPin,
    D: DelayUs<u8>,
{
    type Error = Infallible;

    fn init_lines(&mut self) -> Result<(), Infallible> {
        self.sclk.set_high().ok();
        self.din.set_high().ok();
        Ok(())
    }

    fn send_frame(&mut self, frame: &[u8; 3]) -> Result<(), Infallible> {
        for byte in frame {
            self.shift_out(*byte);
        }
        Ok(())
    }
}

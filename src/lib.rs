//! Driver for the Texas Instruments DAC8554 quad channel 16-bit
//! digital-to-analog converter, based on the [`embedded-hal`] traits.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal
//!
//! Datasheet: <http://www.ti.com/lit/ds/symlink/dac8554.pdf>
//!
//! This driver allows you to:
//! - Set one output channel, or all four at once, to a 16-bit value.
//! - Address up to four chips sharing the same clock and data wiring
//!   through the 2-bit chip-select code.
//! - Talk over a hardware SPI peripheral, or bit-bang the protocol over
//!   two GPIO lines on boards where the SPI pins are spoken for.
//! - Remap the 2-bit channel codes to match how the PCB was routed.
//!
//! ## The device
//!
//! The DAC8554 takes 24-bit frames on a write-only serial link: one
//! control byte selecting chip and channel, then the 16-bit value, MSB
//! first. The active-low `SYNC` line brackets each frame and its rising
//! edge latches the value into the addressed register. Beyond the three
//! mandatory lines (`SCLK`, `SYNC`, `DIN`) the chip has enable, address
//! and `LDAC` pins that are often tied off on the PCB; the driver only
//! drives the ones you hand it.
//!
//! There is no feedback channel from the chip, so the driver cannot detect
//! a miswired channel-address table (two channels sharing a code will
//! silently update together) or a chip-select code pointing at the wrong
//! chip. Keeping those straight, and serializing frames when several
//! driver instances share one clock/data pair, is the caller's job.
//!
//! ## Usage
//!
//! ```
//! use dac8554::{Channel, Dac8554, HardwareSpi, Pins};
//! use embedded_hal_mock::{pin, spi};
//!
//! // On real hardware these come from your HAL; the SPI peripheral must
//! // be configured for `dac8554::MODE`.
//! let bus = spi::Mock::new(&[spi::Transaction::write(vec![0b0001_0010, 0xff, 0xff])]);
//! let sync = pin::Mock::new(&[
//!     pin::Transaction::set(pin::State::High),
//!     pin::Transaction::set(pin::State::Low),
//!     pin::Transaction::set(pin::State::High),
//! ]);
//!
//! let mut dac = Dac8554::new(HardwareSpi::new(bus), Pins::new(sync));
//! dac.update_channel(Channel::B, 65535).unwrap();
//! ```

#![cfg_attr(not(test), no_std)]

use embedded_hal::{
    digital::v2::OutputPin,
    spi::{Mode, Phase, Polarity},
};

mod transport;

pub use transport::{BitBang, HardwareSpi, Transport};

/// SPI mode the chip expects (CPOL = 1, CPHA = 0): the clock idles high
/// and data is sampled on the falling edge.
pub const MODE: Mode = Mode {
    polarity: Polarity::IdleHigh,
    phase: Phase::CaptureOnFirstTransition,
};

/// A bus clock rate known to work comfortably; the chip itself is
/// specified up to 50 MHz.
pub const SPI_CLOCK_HZ: u32 = 8_000_000;

/// All possible errors in this crate.
#[derive(Debug)]
pub enum Error<E> {
    /// Communication error on the underlying bus.
    Comm(E),
    /// Numeric channel index outside 0..=3.
    InvalidChannel,
}

/// Output channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    A,
    B,
    C,
    D,
}

impl Channel {
    /// Map the datasheet's numeric convention (0-3 for A-D) to a channel.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Channel::A),
            1 => Some(Channel::B),
            2 => Some(Channel::C),
            3 => Some(Channel::D),
            _ => None,
        }
    }
}

/// Mapping from logical channel to the 2-bit code the chip selects it by.
///
/// The factory default matches the datasheet (A = `0b00` through
/// D = `0b11`). Boards that route the channel selection differently can
/// install their own codes. Uniqueness is not checked: giving two channels
/// the same code aliases them, which is occasionally even what you want.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAddressTable {
    codes: [u8; 4],
}

impl ChannelAddressTable {
    /// Build a table from one code per channel, A through D. Codes are
    /// truncated to their low two bits.
    pub fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self {
            codes: [a & 0b11, b & 0b11, c & 0b11, d & 0b11],
        }
    }

    fn code(&self, channel: Channel) -> u8 {
        self.codes[channel as usize]
    }
}

impl Default for ChannelAddressTable {
    fn default() -> Self {
        Self::new(0b00, 0b01, 0b10, 0b11)
    }
}

/// Placeholder type for an auxiliary line that never reaches the
/// controller. Uninhabited, so an `Option` of it is always `None` and
/// costs nothing at runtime.
#[derive(Debug)]
pub enum Unwired {}

impl OutputPin for Unwired {
    type Error = core::convert::Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        match *self {}
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        match *self {}
    }
}

/// The GPIO lines the driver drives directly.
///
/// Clock and data belong to the transport; frame-sync is the one line
/// every wiring needs. The four auxiliary lines may be hardwired on the
/// PCB instead, in which case they stay `None` and the driver never
/// touches them.
#[derive(Debug)]
pub struct Pins<SYNC, EN, A0, A1, LDAC> {
    /// Active-low frame signal; its rising edge latches the value.
    pub sync: SYNC,
    /// Chip enable, idles low.
    pub enable: Option<EN>,
    /// Chip-select address bit 0, idles low.
    pub addr0: Option<A0>,
    /// Chip-select address bit 1, idles low.
    pub addr1: Option<A1>,
    /// Load-DAC line, idles low.
    pub ldac: Option<LDAC>,
}

impl<SYNC> Pins<SYNC, Unwired, Unwired, Unwired, Unwired> {
    /// Wiring with only the mandatory frame-sync line; every auxiliary
    /// line is hardwired on the board.
    pub fn new(sync: SYNC) -> Self {
        Pins {
            sync,
            enable: None,
            addr0: None,
            addr1: None,
            ldac: None,
        }
    }
}

impl<SYNC, EN, A0, A1, LDAC> Pins<SYNC, EN, A0, A1, LDAC> {
    pub fn with_enable<T>(self, enable: T) -> Pins<SYNC, T, A0, A1, LDAC> {
        Pins {
            sync: self.sync,
            enable: Some(enable),
            addr0: self.addr0,
            addr1: self.addr1,
            ldac: self.ldac,
        }
    }

    pub fn with_addr0<T>(self, addr0: T) -> Pins<SYNC, EN, T, A1, LDAC> {
        Pins {
            sync: self.sync,
            enable: self.enable,
            addr0: Some(addr0),
            addr1: self.addr1,
            ldac: self.ldac,
        }
    }

    pub fn with_addr1<T>(self, addr1: T) -> Pins<SYNC, EN, A0, T, LDAC> {
        Pins {
            sync: self.sync,
            enable: self.enable,
            addr0: self.addr0,
            addr1: Some(addr1),
            ldac: self.ldac,
        }
    }

    pub fn with_ldac<T>(self, ldac: T) -> Pins<SYNC, EN, A0, A1, T> {
        Pins {
            sync: self.sync,
            enable: self.enable,
            addr0: self.addr0,
            addr1: self.addr1,
            ldac: Some(ldac),
        }
    }
}

/// Base pattern of the control byte: bit 4 fixed high, bits 3 and 0 fixed
/// low, selecting the chip's write-through load mode.
const CONTROL_BASE: u8 = 0b0001_0000;

/// Broadcast pattern: bit 5 plus bit 2, the chip's documented
/// "update all channels" combination.
const BROADCAST: u8 = 1 << 5 | 1 << 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Single(Channel),
    All,
}

/// Control byte layout, bit 7 down to bit 0:
/// `[CS1 CS0 ALL x 1 CH1 CH0 0]` - chip-select code in bits 6-7, channel
/// code in bits 1-2, broadcast flag in bit 5.
fn control_byte(chip_select: u8, table: &ChannelAddressTable, selection: Selection) -> u8 {
    let byte = CONTROL_BASE | (chip_select & 0b11) << 6;
    match selection {
        Selection::Single(channel) => byte | table.code(channel) << 1,
        // Bit 1 is don't-care when broadcasting; keep it zero so the
        // frame is reproducible.
        Selection::All => byte | BROADCAST,
    }
}

/// Reached lazily on the first update, or explicitly via
/// [`Dac8554::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Initialized,
}

/// DAC8554 driver.
///
/// Generic over the transport and over each GPIO line it owns, so any
/// `embedded-hal` implementation works. All operations block for a
/// bounded number of pin toggles or one fixed-length bus write; the
/// driver carries no locking and is meant to be used from a single thread
/// of control. Several instances may share clock and data wiring to
/// address parallel chips, but the caller must then keep their frames
/// from interleaving.
#[derive(Debug)]
pub struct Dac8554<T, SYNC, EN, A0, A1, LDAC> {
    transport: T,
    pins: Pins<SYNC, EN, A0, A1, LDAC>,
    table: ChannelAddressTable,
    chip_select: u8,
    state: State,
}

impl<T, SYNC, EN, A0, A1, LDAC> Dac8554<T, SYNC, EN, A0, A1, LDAC>
where
    T: Transport,
    SYNC: OutputPin,
    EN: OutputPin,
    A0: OutputPin,
    A1: OutputPin,
    LDAC: OutputPin,
{
    /// Create a driver addressing chip 0 with the factory channel codes.
    pub fn new(transport: T, pins: Pins<SYNC, EN, A0, A1, LDAC>) -> Self {
        Self {
            transport,
            pins,
            table: ChannelAddressTable::default(),
            chip_select: 0,
            state: State::Uninitialized,
        }
    }

    /// Select which of up to four parallel chips subsequent frames
    /// address. Only the low two bits of `code` are used. The code must
    /// match the levels on the addressed chip's `A1`/`A0` pins.
    pub fn set_chip_select(&mut self, code: u8) {
        self.chip_select = code & 0b11;
    }

    /// Install channel codes matching the PCB routing.
    pub fn set_channel_address_table(&mut self, table: ChannelAddressTable) {
        self.table = table;
    }

    /// Swap in a different set of GPIO lines, handing the old ones back.
    ///
    /// The replacement lines have not been driven to their idle levels
    /// yet, so the driver drops back to uninitialized and runs
    /// [`initialize`](Self::initialize) again before the next frame.
    pub fn replace_pins(
        &mut self,
        pins: Pins<SYNC, EN, A0, A1, LDAC>,
    ) -> Pins<SYNC, EN, A0, A1, LDAC> {
        self.state = State::Uninitialized;
        core::mem::replace(&mut self.pins, pins)
    }

    /// Whether the lines have been driven to their idle levels yet.
    pub fn is_initialized(&self) -> bool {
        self.state == State::Initialized
    }

    /// Drive every owned line to its idle level: frame-sync high, wired
    /// auxiliary lines low, and for the bit-banged transport clock and
    /// data high.
    ///
    /// Runs automatically before the first frame; calling it yourself
    /// just makes the moment explicit. For the hardware SPI transport the
    /// peripheral must separately be configured for [`MODE`]; that
    /// belongs to the HAL owning the bus, not to this driver.
    pub fn initialize(&mut self) -> Result<(), Error<T::Error>> {
        self.transport.init_lines().map_err(Error::Comm)?;
        self.pins.sync.set_high().ok();
        if let Some(enable) = self.pins.enable.as_mut() {
            enable.set_low().ok();
        }
        if let Some(addr0) = self.pins.addr0.as_mut() {
            addr0.set_low().ok();
        }
        if let Some(addr1) = self.pins.addr1.as_mut() {
            addr1.set_low().ok();
        }
        if let Some(ldac) = self.pins.ldac.as_mut() {
            ldac.set_low().ok();
        }
        self.state = State::Initialized;
        Ok(())
    }

    /// Set one channel to `value`.
    ///
    /// The full 16-bit range is legal output; no scaling or validation
    /// happens here.
    pub fn update_channel(&mut self, channel: Channel, value: u16) -> Result<(), Error<T::Error>> {
        self.send(Selection::Single(channel), value)
    }

    /// Set all four channels of the addressed chip to `value` in a single
    /// frame.
    pub fn update_all_channels(&mut self, value: u16) -> Result<(), Error<T::Error>> {
        self.send(Selection::All, value)
    }

    /// [`update_channel`](Self::update_channel) with the datasheet's
    /// numeric channel convention (0-3 for A-D). Fails with
    /// [`Error::InvalidChannel`] before any line is driven if the index
    /// is out of range.
    pub fn update_channel_index(&mut self, index: u8, value: u16) -> Result<(), Error<T::Error>> {
        let channel = Channel::from_index(index).ok_or(Error::InvalidChannel)?;
        self.update_channel(channel, value)
    }

    /// Release the transport and pins.
    pub fn free(self) -> (T, Pins<SYNC, EN, A0, A1, LDAC>) {
        (self.transport, self.pins)
    }

    fn ensure_initialized(&mut self) -> Result<(), Error<T::Error>> {
        if self.state == State::Uninitialized {
            self.initialize()?;
        }
        Ok(())
    }

    fn send(&mut self, selection: Selection, value: u16) -> Result<(), Error<T::Error>> {
        self.ensure_initialized()?;
        let frame = [
            control_byte(self.chip_select, &self.table, selection),
            (value >> 8) as u8,
            value as u8,
        ];
        self.pins.sync.set_low().ok();
        let result = self.transport.send_frame(&frame).map_err(Error::Comm);
        self.pins.sync.set_high().ok();
        result
    }
}

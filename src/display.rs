// display.rs

use std::fmt::{self, Write};

use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};

use crate::*;

pub const LCD_WIDTH: u16 = 128;
pub const LCD_HEIGHT: u16 = 160;

// RGB565
pub const COLOR_BLACK: u16 = 0x0000;
pub const COLOR_WHITE: u16 = 0xFFFF;
pub const COLOR_BLUE: u16 = 0x001F;

const CMD_SWRESET: u8 = 0x01;
const CMD_SLPOUT: u8 = 0x11;
const CMD_COLMOD: u8 = 0x3A;
const CMD_DISPON: u8 = 0x29;
const CMD_CASET: u8 = 0x2A;
const CMD_RASET: u8 = 0x2B;
const CMD_RAMWR: u8 = 0x2C;

const COLMOD_RGB565: u8 = 0x05;

const TEXT_X: u16 = 10;
const VALUE_OFFSET: u16 = 10;

/// Byte transport to the panel controller: command bytes and pixel/parameter data.
/// Writes are fire-and-forget.
pub trait DisplayBus {
    fn command(&mut self, cmd: u8);
    fn data(&mut self, data: &[u8]);
}

/// 4-wire SPI with a data/command select line.
pub struct SpiDisplayBus<SPI, DC> {
    spi: SPI,
    dc: DC,
}

impl<SPI, DC> SpiDisplayBus<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    pub fn new(spi: SPI, dc: DC) -> Self {
        Self { spi, dc }
    }
}

impl<SPI, DC> DisplayBus for SpiDisplayBus<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    fn command(&mut self, cmd: u8) {
        self.dc.set_low().ok();
        self.spi.write(&[cmd]).ok();
    }

    fn data(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.dc.set_high().ok();
        self.spi.write(data).ok();
    }
}

/// ST7735S driven through a `DisplayBus`, with an 8x8 text renderer on top.
pub struct St7735<B> {
    bus: B,
    width: u16,
    height: u16,
}

impl<B: DisplayBus> St7735<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            width: LCD_WIDTH,
            height: LCD_HEIGHT,
        }
    }

    #[cfg(test)]
    pub fn release(self) -> B {
        self.bus
    }

    /// Hardware reset pulse, wake up, 16-bit colour, display on.
    pub fn init<RST, D>(&mut self, rst: &mut RST, delay: &mut D)
    where
        RST: OutputPin,
        D: DelayNs,
    {
        info!("Initializing ST7735S display...");
        rst.set_low().ok();
        delay.delay_ms(100);
        rst.set_high().ok();
        delay.delay_ms(100);

        self.bus.command(CMD_SWRESET);
        delay.delay_ms(150);
        self.bus.command(CMD_SLPOUT);
        delay.delay_ms(255);
        self.bus.command(CMD_COLMOD);
        self.bus.data(&[COLMOD_RGB565]);
        self.bus.command(CMD_DISPON);
    }

    /// Subsequent pixel data lands in the inclusive rectangle (x0,y0)..(x1,y1).
    pub fn set_address_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) {
        let [x0h, x0l] = x0.to_be_bytes();
        let [x1h, x1l] = x1.to_be_bytes();
        self.bus.command(CMD_CASET);
        self.bus.data(&[x0h, x0l, x1h, x1l]);

        let [y0h, y0l] = y0.to_be_bytes();
        let [y1h, y1l] = y1.to_be_bytes();
        self.bus.command(CMD_RASET);
        self.bus.data(&[y0h, y0l, y1h, y1l]);

        self.bus.command(CMD_RAMWR);
    }

    pub fn fill_screen(&mut self, color: u16) {
        self.set_address_window(0, 0, self.width - 1, self.height - 1);
        let mut line = [0u8; LCD_WIDTH as usize * 2];
        for px in line.chunks_exact_mut(2) {
            px.copy_from_slice(&color.to_be_bytes());
        }
        let line = &line[..self.width as usize * 2];
        for _ in 0..self.height {
            self.bus.data(line);
        }
    }

    /// One 2-byte transfer per pixel, background is black.
    pub fn draw_char(&mut self, x: u16, y: u16, c: char, color: u16) {
        let rows = glyph(c);
        // no bounds check, far coordinates wrap
        self.set_address_window(
            x,
            y,
            x.wrapping_add(GLYPH_WIDTH - 1),
            y.wrapping_add(GLYPH_HEIGHT - 1),
        );

        let fg = color.to_be_bytes();
        for row in rows {
            for col in 0..GLYPH_WIDTH {
                if row & (1 << col) != 0 {
                    self.bus.data(&fg);
                } else {
                    self.bus.data(&[0, 0]);
                }
            }
        }
    }

    /// Left to right, wrapping to x=0 one text row down near the right edge.
    /// Returns the cursor after the last character.
    pub fn draw_text(&mut self, x: u16, y: u16, text: &str, color: u16) -> (u16, u16) {
        let (mut x, mut y) = (x, y);
        for c in text.chars() {
            self.draw_char(x, y, c, color);
            x = x.wrapping_add(GLYPH_WIDTH);
            if x > self.width - GLYPH_WIDTH {
                x = 0;
                y = y.wrapping_add(GLYPH_HEIGHT);
            }
        }
        (x, y)
    }

    fn draw_field(&mut self, y: u16, label: &str, value: fmt::Arguments) {
        let mut line: heapless::String<32> = heapless::String::new();
        line.write_fmt(value).ok();
        self.draw_text(TEXT_X, y, label, COLOR_WHITE);
        self.draw_text(TEXT_X, y + VALUE_OFFSET, &line, COLOR_WHITE);
    }

    /// Fixed telemetry screen on a blue background.
    pub fn display_data(&mut self, reading: &SensorReading) {
        let c = reading.climate;
        self.fill_screen(COLOR_BLUE);
        self.draw_field(10, "Temperatura:", format_args!("{:.1} C", c.temperature));
        self.draw_field(40, "Umidade:", format_args!("{:.1} %", c.humidity));
        self.draw_field(70, "KY-028:", format_args!("{}", reading.gas_raw));
        self.draw_field(
            100,
            "Luminosidade:",
            format_args!("{} %", reading.light_percent),
        );
        self.draw_field(130, "Chuva:", format_args!("{} %", reading.rain_percent));
    }
}

impl<B: DisplayBus> Renderer for St7735<B> {
    fn render(&mut self, reading: &SensorReading) {
        self.display_data(reading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, convert::Infallible, rc::Rc};

    #[derive(Clone, Debug, PartialEq)]
    enum Op {
        Cmd(u8),
        Data(Vec<u8>),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl DisplayBus for Recorder {
        fn command(&mut self, cmd: u8) {
            self.ops.push(Op::Cmd(cmd));
        }
        fn data(&mut self, data: &[u8]) {
            self.ops.push(Op::Data(data.to_vec()));
        }
    }

    fn lcd() -> St7735<Recorder> {
        St7735::new(Recorder::default())
    }

    /// Window origins (x0, y0) in the order they were addressed.
    fn window_origins(ops: &[Op]) -> Vec<(u16, u16)> {
        let mut out = Vec::new();
        let mut x0 = 0;
        for pair in ops.windows(2) {
            match pair {
                [Op::Cmd(CMD_CASET), Op::Data(d)] => x0 = u16::from_be_bytes([d[0], d[1]]),
                [Op::Cmd(CMD_RASET), Op::Data(d)] => {
                    out.push((x0, u16::from_be_bytes([d[0], d[1]])))
                }
                _ => {}
            }
        }
        out
    }

    #[test]
    fn window_is_big_endian() {
        let mut lcd = lcd();
        lcd.set_address_window(1, 2, 300, 4);
        assert_eq!(
            lcd.release().ops,
            vec![
                Op::Cmd(0x2A),
                Op::Data(vec![0, 1, 1, 44]),
                Op::Cmd(0x2B),
                Op::Data(vec![0, 2, 0, 4]),
                Op::Cmd(0x2C),
            ]
        );
    }

    #[test]
    fn char_is_64_pixel_writes() {
        let mut lcd = lcd();
        lcd.draw_char(16, 24, '!', 0xF800);
        let ops = lcd.release().ops;

        assert_eq!(ops[1], Op::Data(vec![0, 16, 0, 23]));
        assert_eq!(ops[3], Op::Data(vec![0, 24, 0, 31]));
        let pixels = &ops[5..];
        assert_eq!(pixels.len(), 64);
        assert!(pixels
            .iter()
            .all(|p| matches!(p, Op::Data(d) if d.len() == 2)));

        // first row of '!' is 0x18: columns 3 and 4, LSB leftmost
        let fg = Op::Data(vec![0xF8, 0x00]);
        let bg = Op::Data(vec![0, 0]);
        let row0: Vec<_> = pixels[..8].to_vec();
        assert_eq!(
            row0,
            vec![
                bg.clone(),
                bg.clone(),
                bg.clone(),
                fg.clone(),
                fg.clone(),
                bg.clone(),
                bg.clone(),
                bg.clone()
            ]
        );
        let lit = pixels.iter().filter(|p| **p == fg).count() as u32;
        let ink: u32 = FONT8X8[b'!' as usize].iter().map(|r| r.count_ones()).sum();
        assert_eq!(lit, ink);
    }

    #[test]
    fn unprintable_draws_question_mark() {
        let draw = |c| {
            let mut lcd = lcd();
            lcd.draw_char(0, 0, c, COLOR_WHITE);
            lcd.release().ops
        };
        let question = draw('?');
        assert_eq!(draw('\u{7}'), question);
        assert_eq!(draw('é'), question);
        assert_ne!(draw('!'), question);
    }

    #[test]
    fn eight_chars_advance_to_64() {
        let mut lcd = lcd();
        assert_eq!(lcd.draw_text(0, 0, "ABCDEFGH", COLOR_WHITE), (64, 0));
        let origins = window_origins(&lcd.release().ops);
        assert_eq!(
            origins,
            (0..8u16).map(|i| (i * 8, 0u16)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn text_wraps_at_right_edge() {
        let mut lcd = lcd();
        let text = "0123456789ABCDEFG";
        assert_eq!(lcd.draw_text(0, 0, text, COLOR_WHITE), (8, 8));
        let origins = window_origins(&lcd.release().ops);
        assert_eq!(origins.len(), 17);
        assert_eq!(origins[15], (120, 0));
        assert_eq!(origins[16], (0, 8));
    }

    #[test]
    fn text_runs_off_the_bottom() {
        let mut lcd = lcd();
        let (_, y) = lcd.draw_text(0, 152, "0123456789ABCDEF!", COLOR_WHITE);
        assert_eq!(y, 160);
        let origins = window_origins(&lcd.release().ops);
        assert_eq!(origins.last(), Some(&(0, 160)));
    }

    #[test]
    fn far_coordinates_wrap_instead_of_panicking() {
        let mut lcd = lcd();
        lcd.draw_char(u16::MAX, u16::MAX - 3, 'A', COLOR_WHITE);
        let (_, y) = lcd.draw_text(0, u16::MAX - 3, "0123456789ABCDEF!", COLOR_WHITE);
        assert_eq!(y, 4);
        let ops = lcd.release().ops;
        // first char window: x 65535..=6, y 65532..=3
        assert_eq!(ops[1], Op::Data(vec![0xFF, 0xFF, 0x00, 0x06]));
        assert_eq!(ops[3], Op::Data(vec![0xFF, 0xFC, 0x00, 0x03]));
        assert_eq!(window_origins(&ops).last(), Some(&(0, 4)));
    }

    #[test]
    fn fill_streams_every_pixel() {
        let mut lcd = lcd();
        lcd.fill_screen(COLOR_BLUE);
        let ops = lcd.release().ops;
        assert_eq!(window_origins(&ops), vec![(0, 0)]);
        assert_eq!(ops[1], Op::Data(vec![0, 0, 0, 127]));
        assert_eq!(ops[3], Op::Data(vec![0, 0, 0, 159]));

        let lines = &ops[5..];
        assert_eq!(lines.len(), LCD_HEIGHT as usize);
        let total: usize = lines
            .iter()
            .map(|op| match op {
                Op::Data(d) => {
                    assert!(d.chunks(2).all(|px| px == [0x00, 0x1F]));
                    d.len()
                }
                Op::Cmd(c) => panic!("unexpected command {c:#x}"),
            })
            .sum();
        assert_eq!(total, 128 * 160 * 2);
    }

    #[test]
    fn telemetry_layout() {
        let mut lcd = lcd();
        let reading = SensorReading::from_raw(Climate::new(23.5, 60.0), 0, 4095, 812);
        lcd.render(&reading);
        let origins = window_origins(&lcd.release().ops);

        // full screen clear, then labels and values
        assert_eq!(origins[0], (0, 0));
        for y in [10, 20, 40, 50, 70, 80, 100, 110, 130, 140] {
            assert!(origins.contains(&(TEXT_X, y)), "missing line at y={y}");
        }
        let labels = "Temperatura:Umidade:KY-028:Luminosidade:Chuva:".len();
        let values = "23.5 C60.0 %812100 %0 %".len();
        assert_eq!(origins.len(), 1 + labels + values);
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Wire {
        Command(Vec<u8>),
        Data(Vec<u8>),
    }

    type WireLog = Rc<RefCell<(bool, Vec<Wire>)>>;

    struct FakeDc(WireLog);

    impl embedded_hal::digital::ErrorType for FakeDc {
        type Error = Infallible;
    }

    impl OutputPin for FakeDc {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().0 = false;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().0 = true;
            Ok(())
        }
    }

    struct FakeSpi(WireLog);

    impl embedded_hal::spi::ErrorType for FakeSpi {
        type Error = Infallible;
    }

    impl SpiDevice for FakeSpi {
        fn transaction(
            &mut self,
            operations: &mut [embedded_hal::spi::Operation<'_, u8>],
        ) -> Result<(), Infallible> {
            let mut log = self.0.borrow_mut();
            for op in operations {
                if let embedded_hal::spi::Operation::Write(bytes) = op {
                    let w = if log.0 {
                        Wire::Data(bytes.to_vec())
                    } else {
                        Wire::Command(bytes.to_vec())
                    };
                    log.1.push(w);
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    struct Rst(Vec<bool>);

    impl embedded_hal::digital::ErrorType for Rst {
        type Error = Infallible;
    }

    impl OutputPin for Rst {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.push(false);
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.push(true);
            Ok(())
        }
    }

    #[test]
    fn spi_bus_init_sequence() {
        let log = WireLog::default();
        let bus = SpiDisplayBus::new(FakeSpi(log.clone()), FakeDc(log.clone()));
        let mut lcd = St7735::new(bus);
        let mut rst = Rst(Vec::new());
        lcd.init(&mut rst, &mut NoDelay);
        lcd.set_address_window(0, 0, 7, 7);

        assert_eq!(rst.0, vec![false, true]);
        let wire = log.borrow().1.clone();
        assert_eq!(
            wire[..5],
            [
                Wire::Command(vec![0x01]),
                Wire::Command(vec![0x11]),
                Wire::Command(vec![0x3A]),
                Wire::Data(vec![0x05]),
                Wire::Command(vec![0x29]),
            ]
        );
        assert_eq!(wire[5], Wire::Command(vec![0x2A]));
        assert_eq!(wire[6], Wire::Data(vec![0, 0, 0, 7]));
        assert_eq!(wire.last(), Some(&Wire::Command(vec![0x2C])));
    }

    #[test]
    fn empty_data_is_not_sent() {
        let log = WireLog::default();
        let mut bus = SpiDisplayBus::new(FakeSpi(log.clone()), FakeDc(log.clone()));
        bus.data(&[]);
        assert!(log.borrow().1.is_empty());
    }
}

// EOF

//! Formatted output over a line.
//!
//! [`LineWriter`] is a write-only character sink: every byte goes through
//! [`Line::send_byte`], in call order, with no buffering and no newline
//! translation. The [`line_print!`](crate::line_print) and
//! [`line_println!`](crate::line_println) macros build on it.

use core::fmt;

use serline_driver_api::{LineError, PortConfigurator, UsartHardware};

use crate::line::Line;

/// A [`fmt::Write`] adapter borrowing a [`Line`].
pub struct LineWriter<'a, H, P, const N: usize> {
    line: &'a Line<H, P, N>,
}

impl<H: UsartHardware, P: PortConfigurator, const N: usize> LineWriter<'_, H, P, N> {
    /// Sends one character byte.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::NotOpen`] if the line is closed.
    pub fn put(&mut self, byte: u8) -> Result<(), LineError> {
        self.line.send_byte(byte)
    }
}

impl<H: UsartHardware, P: PortConfigurator, const N: usize> fmt::Write for LineWriter<'_, H, P, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.put(byte).map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}

impl<H, P, const N: usize> Line<H, P, N> {
    /// Returns a formatted-output sink for this line.
    pub const fn writer(&self) -> LineWriter<'_, H, P, N> {
        LineWriter { line: self }
    }
}

/// Formats to a line without a trailing newline.
///
/// Evaluates to [`core::fmt::Result`]; fails only if the line is closed.
#[macro_export]
macro_rules! line_print {
    ($line:expr, $($arg:tt)*) => {
        ::core::fmt::Write::write_fmt(&mut ($line).writer(), ::core::format_args!($($arg)*))
    };
}

/// Formats to a line followed by `"\r\n"`.
#[macro_export]
macro_rules! line_println {
    ($line:expr) => {
        $crate::line_print!($line, "\r\n")
    };
    ($line:expr, $($arg:tt)*) => {
        $crate::line_print!($line, $($arg)*).and_then(|()| $crate::line_print!($line, "\r\n"))
    };
}

#[cfg(test)]
mod tests {
    use core::fmt::Write;

    use serline_driver_api::NoPortConfig;

    use crate::baud::BaudRate;
    use crate::line::Line;
    use crate::sim::SimUsart;

    fn drain(line: &Line<SimUsart, NoPortConfig, 64>, sim: &SimUsart) -> Vec<u8> {
        while sim.pending_dre() {
            line.on_transmit_empty();
        }
        sim.take_transmitted()
    }

    #[test]
    fn writer_sends_bytes_in_order() {
        let sim = SimUsart::new();
        let line: Line<_, _, 64> = Line::new(sim.clone(), NoPortConfig);
        line.open(BaudRate::from_register(1389));

        write!(line.writer(), "Counter value is: 0x{:02X} ", 0x2a).unwrap();
        assert_eq!(drain(&line, &sim), b"Counter value is: 0x2A ".to_vec());

        let mut w = line.writer();
        w.put(b'!').unwrap();
        assert_eq!(drain(&line, &sim), b"!".to_vec());
    }

    #[test]
    fn macros_append_crlf() {
        let sim = SimUsart::new();
        let line: Line<_, _, 64> = Line::new(sim.clone(), NoPortConfig);
        line.open(BaudRate::from_register(1389));

        crate::line_print!(line, "Hello {}", "world").unwrap();
        crate::line_println!(line, "!").unwrap();
        crate::line_println!(line).unwrap();
        assert_eq!(drain(&line, &sim), b"Hello world!\r\n\r\n".to_vec());
    }

    #[test]
    fn closed_line_reports_fmt_error() {
        let sim = SimUsart::new();
        let line: Line<_, _, 64> = Line::new(sim, NoPortConfig);
        assert!(crate::line_print!(line, "x").is_err());
    }
}

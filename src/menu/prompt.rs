//! Line-based operator input
//!
//! Invalid answers never leave this module: the prompt explains what was
//! wrong and asks again.
//!
//! Lines are read on a plain thread and handed over through a channel. A
//! read still pending at shutdown stays on that thread, which nobody joins.

use crate::haptics::Intensity;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Rejected operator input
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum InputError {
    #[error("Please enter a valid number")]
    NotANumber,

    #[error("Please enter a value between 0 and 100")]
    OutOfRange,

    #[error("Duration must be greater than 0")]
    NotPositive,
}

pub fn parse_percent(text: &str) -> Result<Intensity, InputError> {
    let percent: f32 = text.trim().parse().map_err(|_| InputError::NotANumber)?;
    Intensity::from_percent(percent).map_err(|_| InputError::OutOfRange)
}

pub fn parse_seconds(text: &str) -> Result<Duration, InputError> {
    let seconds: f64 = text.trim().parse().map_err(|_| InputError::NotANumber)?;
    if !seconds.is_finite() {
        return Err(InputError::NotANumber);
    }
    if seconds <= 0.0 {
        return Err(InputError::NotPositive);
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| InputError::NotANumber)
}

/// Reads `reader` line by line on a dedicated thread
///
/// The channel closes on EOF or on the first read error.
pub fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::UnboundedReceiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("operator-input".into())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Failed to read operator input: {}", e);
                        break;
                    }
                }
            }
            debug!("Operator input reader finished");
        })?;
    Ok(rx)
}

/// Operator console fed by a line channel
pub struct Console {
    lines: mpsc::UnboundedReceiver<String>,
    shutdown: CancellationToken,
}

impl Console {
    pub fn new(lines: mpsc::UnboundedReceiver<String>, shutdown: CancellationToken) -> Self {
        Self { lines, shutdown }
    }

    /// Console on the process stdin
    pub fn stdin(shutdown: CancellationToken) -> io::Result<Self> {
        let lines = spawn_line_reader(io::BufReader::new(io::stdin()))?;
        Ok(Self::new(lines, shutdown))
    }

    /// Next line, or `None` on EOF, read error or shutdown
    pub async fn read_line(&mut self) -> Option<String> {
        tokio::select! {
            line = self.lines.recv() => line,
            _ = self.shutdown.cancelled() => None,
        }
    }

    pub async fn ask(&mut self, question: &str) -> Option<String> {
        print!("{}", question);
        let _ = std::io::stdout().flush();
        self.read_line().await
    }

    /// Asks until `parse` accepts the answer
    pub async fn ask_until<T, F>(&mut self, question: &str, parse: F) -> Option<T>
    where
        F: Fn(&str) -> Result<T, InputError>,
    {
        loop {
            let answer = self.ask(question).await?;
            match parse(&answer) {
                Ok(value) => return Some(value),
                Err(e) => println!("{}", e.to_string().red()),
            }
        }
    }

    pub async fn ask_intensity(&mut self, motor: &str) -> Option<Intensity> {
        self.ask_until(&format!("Enter {}intensity (0-100%): ", motor), parse_percent)
            .await
    }

    pub async fn ask_duration(&mut self) -> Option<Duration> {
        self.ask_until("Enter duration (seconds): ", parse_seconds)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &'static str) -> Console {
        let (tx, rx) = mpsc::unbounded_channel();
        for line in input.lines() {
            tx.send(line.to_string()).unwrap();
        }
        Console::new(rx, CancellationToken::new())
    }

    /// Reader whose `read` blocks until the test lets it go, like an idle terminal
    struct IdleTerminal(std::sync::mpsc::Receiver<()>);

    impl io::Read for IdleTerminal {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn percent_parsing() {
        assert_eq!(parse_percent(" 50 ").map(Intensity::value), Ok(0.5));
        assert_eq!(parse_percent("100").map(Intensity::value), Ok(1.0));
        assert_eq!(parse_percent("0").map(Intensity::value), Ok(0.0));
        assert_eq!(parse_percent("101"), Err(InputError::OutOfRange));
        assert_eq!(parse_percent("-1"), Err(InputError::OutOfRange));
        assert_eq!(parse_percent("loud"), Err(InputError::NotANumber));
        assert_eq!(parse_percent(""), Err(InputError::NotANumber));
    }

    #[test]
    fn seconds_parsing() {
        assert_eq!(parse_seconds("1.5"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_seconds("0"), Err(InputError::NotPositive));
        assert_eq!(parse_seconds("-2"), Err(InputError::NotPositive));
        assert_eq!(parse_seconds("inf"), Err(InputError::NotANumber));
        assert_eq!(parse_seconds("soon"), Err(InputError::NotANumber));
    }

    #[tokio::test]
    async fn reprompts_until_answer_is_valid() {
        let mut console = console("abc\n150\n40\n");
        let intensity = console.ask_intensity("left motor ").await;
        assert_eq!(intensity.map(Intensity::value), Some(0.4));
    }

    #[tokio::test]
    async fn eof_ends_the_prompt() {
        let mut console = console("0\n");
        assert_eq!(console.ask_duration().await, None);
    }

    #[tokio::test]
    async fn shutdown_interrupts_reading() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let mut console = Console::new(rx, shutdown.clone());
        shutdown.cancel();
        assert_eq!(console.read_line().await, None);
    }

    #[tokio::test]
    async fn line_reader_forwards_lines_until_eof() {
        let lines = spawn_line_reader(io::Cursor::new("1\nq\n")).unwrap();
        let mut console = Console::new(lines, CancellationToken::new());

        assert_eq!(console.read_line().await.as_deref(), Some("1"));
        assert_eq!(console.read_line().await.as_deref(), Some("q"));
        assert_eq!(console.read_line().await, None);
    }

    #[test]
    fn runtime_exits_while_a_terminal_read_is_pending() {
        let (release, idle) = std::sync::mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let shutdown = CancellationToken::new();

        let line = runtime.block_on(async {
            let lines = spawn_line_reader(io::BufReader::new(IdleTerminal(idle))).unwrap();
            let mut console = Console::new(lines, shutdown.clone());
            let trigger = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                trigger.cancel();
            });
            console.read_line().await
        });
        assert_eq!(line, None);

        let dropped_at = std::time::Instant::now();
        drop(runtime);
        assert!(dropped_at.elapsed() < Duration::from_secs(1));

        drop(release);
    }
}

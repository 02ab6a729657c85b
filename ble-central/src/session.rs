//! Interactive read session
//!
//! Scan, pick a peripheral, connect, pick a characteristic, read it. Prompts
//! and listings go to `output`. Selections are whitespace separated tokens
//! read from `input`, so the same flow runs against stdin/stdout or against
//! buffers in tests.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::{
    Central, CharacteristicRef, Error, Manager, Peripheral, ReadConfig, Result, ScanEvent,
    flatten_services,
};

/// Run one complete session against the adapters `manager` reports.
///
/// Out of range or unparsable selections end the session quietly. A peripheral
/// that was connected is always disconnected before returning, even when the
/// read fails.
pub async fn run<M, R, W>(
    manager: &M,
    config: &ReadConfig,
    input: R,
    mut output: W,
) -> Result<()>
where
    M: Manager,
    R: BufRead,
    W: Write,
{
    let adapters = manager.adapters().await?;
    if adapters.is_empty() {
        writeln!(output, "No adapter was found.")?;
    }
    let adapter = pick_adapter(adapters, config.adapter)?;

    match adapter.info().await {
        Ok(info) => log::info!("using adapter {}: {info}", config.adapter),
        Err(e) => log::warn!("could not describe adapter {}: {e}", config.adapter),
    }

    let mut peripherals = Vec::new();
    adapter
        .scan_for(config.scan_duration, |event| -> Result<()> {
            match event {
                ScanEvent::Started => writeln!(output, "Scan started.")?,
                ScanEvent::Stopped => writeln!(output, "Scan stopped.")?,
                ScanEvent::Found(peripheral) => {
                    writeln!(
                        output,
                        "Found device: {} [{}]",
                        peripheral.identifier(),
                        peripheral.address()
                    )?;
                    peripherals.push(peripheral);
                }
            }
            Ok(())
        })
        .await?;

    writeln!(output, "The following devices were found:")?;
    for (i, peripheral) in peripherals.iter().enumerate() {
        writeln!(output, "[{i}] {} [{}]", peripheral.identifier(), peripheral.address())?;
    }

    let mut tokens = Tokens::new(input);
    let selection = prompt(
        &mut tokens,
        &mut output,
        "Please select a device to connect to: ",
        peripherals.len(),
    )?;
    let Some(selection) = selection else {
        log::debug!("no device selected");
        return Ok(());
    };

    let peripheral = &peripherals[selection];
    writeln!(
        output,
        "Connecting to {} [{}]",
        peripheral.identifier(),
        peripheral.address()
    )?;
    peripheral.connect().await?;

    let read = read_selected(peripheral, &mut tokens, &mut output).await;
    let disconnected = peripheral.disconnect().await;

    read?;
    disconnected
}

/// Pick adapter `index`, or fail when the host has no such adapter.
pub fn pick_adapter<C>(adapters: Vec<C>, index: usize) -> Result<C> {
    let count = adapters.len();
    if count == 0 {
        return Err(Error::NoAdapter);
    }
    adapters
        .into_iter()
        .nth(index)
        .ok_or(Error::AdapterOutOfRange { index, count })
}

async fn read_selected<P, R, W>(
    peripheral: &P,
    tokens: &mut Tokens<R>,
    output: &mut W,
) -> Result<()>
where
    P: Peripheral,
    R: BufRead,
    W: Write,
{
    writeln!(output, "Successfully connected, printing services and characteristics..")?;

    let characteristics: Vec<CharacteristicRef> = flatten_services(&peripheral.services());

    writeln!(output, "The following services and characteristics were found:")?;
    for (i, pair) in characteristics.iter().enumerate() {
        writeln!(output, "[{i}] {pair}")?;
    }

    let selection = prompt(
        tokens,
        output,
        "Please select a characteristic to read: ",
        characteristics.len(),
    )?;
    let Some(selection) = selection else {
        log::debug!("no characteristic selected");
        return Ok(());
    };

    let target = characteristics[selection];
    let value = peripheral.read(target.service, target.characteristic).await?;
    writeln!(output, "Characteristic contents were: {}", format_byte_array(&value))?;
    Ok(())
}

/// Whitespace separated tokens pulled from a reader as they are needed.
///
/// Blank lines are skipped, and a line holding several tokens answers several
/// prompts.
struct Tokens<R> {
    input: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            pending: VecDeque::new(),
        }
    }

    /// The next token, or `None` at end of input.
    fn next_token(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending.extend(line.split_whitespace().map(str::to_string));
        }
    }
}

fn prompt<R: BufRead, W: Write>(
    tokens: &mut Tokens<R>,
    output: &mut W,
    message: &str,
    len: usize,
) -> Result<Option<usize>> {
    write!(output, "{message}")?;
    output.flush()?;

    let token = tokens.next_token()?;
    Ok(token.and_then(|token| select(&token, len)))
}

/// Turn a typed selection into an index below `len`.
///
/// Negative, out of range and non-numeric tokens give `None`.
pub fn select(token: &str, len: usize) -> Option<usize> {
    let index: i64 = token.trim().parse().ok()?;
    usize::try_from(index).ok().filter(|i| *i < len)
}

/// Lowercase two digit hex for each byte, each followed by a space.
pub fn format_byte_array(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x} ")).collect()
}

//! Scripted stand-ins for the hardware interfaces.
//!
//! Control-line toggles, delays and bus traffic all land in one shared event
//! log so tests can assert exact sequencing. The bus replays scripted
//! responses instead of talking to a real hub; delays only record, they never
//! sleep.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{bail, ensure, Result};

use crate::hal::{Bus, ControlLine, Delay, HostPort};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SetFrequency(u32),
    Line(&'static str, bool),
    DelayMs(u32),
    DelayUs(u32),
    Write(u8, Vec<u8>),
    Read(u8, usize),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Handle for queueing bus responses after the bus has been moved into a
/// driver.
#[derive(Clone)]
pub struct Script(Rc<RefCell<VecDeque<Vec<u8>>>>);

impl Script {
    pub fn push(&self, response: &[u8]) {
        self.0.borrow_mut().push_back(response.to_vec());
    }
}

pub struct ScriptedBus {
    log: EventLog,
    responses: Rc<RefCell<VecDeque<Vec<u8>>>>,
}

impl ScriptedBus {
    pub fn new(log: EventLog) -> Self {
        ScriptedBus {
            log,
            responses: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub fn script(&self) -> Script {
        Script(self.responses.clone())
    }
}

impl Bus for ScriptedBus {
    fn set_frequency(&mut self, hz: u32) -> Result<()> {
        self.log.borrow_mut().push(Event::SetFrequency(hz));
        Ok(())
    }

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        self.log
            .borrow_mut()
            .push(Event::Write(addr, bytes.to_vec()));
        Ok(())
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<()> {
        let Some(response) = self.responses.borrow_mut().pop_front() else {
            bail!("bus read with no scripted response");
        };
        ensure!(
            response.len() == buf.len(),
            "scripted response is {} bytes, driver asked for {}",
            response.len(),
            buf.len()
        );
        buf.copy_from_slice(&response);
        self.log.borrow_mut().push(Event::Read(addr, buf.len()));
        Ok(())
    }
}

pub struct MockLine {
    name: &'static str,
    log: EventLog,
}

impl MockLine {
    pub fn new(name: &'static str, log: EventLog) -> Self {
        MockLine { name, log }
    }
}

impl ControlLine for MockLine {
    fn set(&mut self, level: bool) -> Result<()> {
        self.log.borrow_mut().push(Event::Line(self.name, level));
        Ok(())
    }
}

pub struct MockDelay {
    log: EventLog,
}

impl MockDelay {
    pub fn new(log: EventLog) -> Self {
        MockDelay { log }
    }
}

impl Delay for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::DelayMs(ms));
    }

    fn delay_us(&mut self, us: u32) {
        self.log.borrow_mut().push(Event::DelayUs(us));
    }
}

#[derive(Default)]
pub struct HostState {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
}

/// Host serial link fed and drained by the test.
#[derive(Clone, Default)]
pub struct MockHost {
    pub state: Rc<RefCell<HostState>>,
}

impl MockHost {
    pub fn feed(&self, bytes: &[u8]) {
        self.state.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Drain everything the dispatcher wrote, as a lossy string.
    pub fn drain_tx(&self) -> String {
        let tx = std::mem::take(&mut self.state.borrow_mut().tx);
        String::from_utf8_lossy(&tx).into_owned()
    }
}

impl HostPort for MockHost {
    fn available(&mut self) -> Result<bool> {
        Ok(!self.state.borrow().rx.is_empty())
    }

    fn read_byte(&mut self) -> Result<u8> {
        match self.state.borrow_mut().rx.pop_front() {
            Some(byte) => Ok(byte),
            None => bail!("host read with no pending bytes"),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.state.borrow_mut().tx.extend_from_slice(bytes);
        Ok(())
    }
}

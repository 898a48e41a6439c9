//! Line-oriented front-end.
//!
//! `rustyline` blocks while reading a line, so the session lives on a host
//! thread that ticks the transport between requests. The prompt thread sends
//! each line over a channel and waits for the reply. Log messages are printed
//! from the host thread through rustyline's external printer so they do not
//! break the input line.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use rustyline::{error::ReadlineError, history::DefaultHistory, Editor, ExternalPrinter};

use crate::console::{self, Level, LogMessage};
use crate::session::{Output, Session};

mod completer;
use completer::ChordHelper;

/// How often the host thread pumps the transport clock.
const TICK: Duration = Duration::from_millis(20);

type PrinterFn = Box<dyn FnMut(String) + Send>;

struct Request {
    line: String,
    reply: Sender<Result<Output>>,
}

/// The host thread that owns the session.
pub struct HostLoop {
    requests: Option<Sender<Request>>,
    join: Option<JoinHandle<()>>,
}

impl HostLoop {
    pub fn spawn(session: Session, printer: Option<PrinterFn>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Request>();
        let join = thread::Builder::new()
            .name("chordcubes-host".into())
            .spawn(move || host_main(session, rx, printer))?;
        Ok(Self { requests: Some(tx), join: Some(join) })
    }

    /// Run one command line on the host thread.
    pub fn request(&self, line: &str) -> Result<Output> {
        let (reply, rx) = mpsc::channel();
        let requests = self.requests.as_ref().ok_or_else(|| anyhow!("host loop stopped"))?;
        requests
            .send(Request { line: line.to_string(), reply })
            .map_err(|_| anyhow!("host loop stopped"))?;
        rx.recv().map_err(|_| anyhow!("host loop stopped"))?
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.requests.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for HostLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn host_main(mut session: Session, rx: Receiver<Request>, mut printer: Option<PrinterFn>) {
    let logs = console::subscribe();
    loop {
        match rx.recv_timeout(TICK) {
            Ok(req) => {
                let result = session.handle_line(&req.line);
                let _ = req.reply.send(result);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        session.tick();
        for msg in logs.drain() {
            let text = format_log(&msg);
            match printer.as_mut() {
                Some(p) => p(text),
                None => eprintln!("{}", text),
            }
        }
    }
    session.transport_mut().stop();
}

fn format_log(msg: &LogMessage) -> String {
    match msg.level {
        Level::Debug | Level::Info => msg.text.clone(),
        Level::Warn | Level::Error => format!("{}: {}", msg.level, msg.text),
    }
}

pub fn run_repl(session: Session) -> Result<()> {
    let mut rl = Editor::<ChordHelper, DefaultHistory>::new()?;
    rl.set_helper(Some(ChordHelper::new()));

    // Background logs go through the external printer so the prompt survives
    let printer: Option<PrinterFn> = match rl.create_external_printer() {
        Ok(mut pr) => Some(Box::new(move |s: String| {
            let _ = pr.print(s);
        })),
        Err(_) => None,
    };
    let host = HostLoop::spawn(session, printer)?;

    loop {
        match rl.readline("♪ ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;
                match host.request(&line) {
                    Ok(Output::None) => {}
                    Ok(Output::Text(t)) => println!("{}", t),
                    Ok(Output::Quit) => break,
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("repl error: {}", err);
                break;
            }
        }
    }
    println!("bye");
    host.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_prefixed_with_level() {
        let warn = LogMessage { level: Level::Warn, text: "[AUDIO] no device".into() };
        assert_eq!(format_log(&warn), "warn: [AUDIO] no device");
        let info = LogMessage { level: Level::Info, text: "[TRANSPORT] bpm set to 90".into() };
        assert_eq!(format_log(&info), "[TRANSPORT] bpm set to 90");
    }
}

//! One long-lived external UCI engine process and its request/response cycle.
//!
//! The session is a small state machine:
//!
//! ```text
//! Closed -> Handshaking -> Ready -> Searching -> Ready -> ... -> Closed
//! ```
//!
//! A reader thread forwards engine stdout over a channel, tagging every line
//! with the number of `bestmove` lines it has passed. The k-th `go` command is
//! therefore answered by exactly the lines tagged k, and anything tagged lower
//! is the late tail of an earlier request.

use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use mateline_core::rules;
use tracing::{debug, info, trace, warn};

use crate::error::EngineError;
use crate::protocol::{Response, parse_response, position_command, setoption_command};
use crate::search::{
    Analyzer, InconclusiveReason, SearchAccumulator, SearchRequest, SearchVerdict,
};

/// How often a blocked read wakes up to check deadlines and the stop flag.
const POLL_SLICE: Duration = Duration::from_millis(20);
const QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Engine process and fixed option settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine binary.
    pub path: PathBuf,
    /// Extra command-line arguments.
    pub args: Vec<String>,
    /// `Threads` option.
    pub threads: usize,
    /// `Hash` option in megabytes.
    pub hash_mb: u32,
    /// `Skill Level` option, if set.
    pub skill_level: Option<u8>,
    /// Additional `setoption` pairs.
    pub extra_options: Vec<(String, String)>,
    /// Limit for the `uci`/`isready` handshake and idle `isready` syncs.
    pub startup_timeout: Duration,
    /// How long to wait for `bestmove` after sending `stop`.
    pub stop_grace: Duration,
    /// How long to wait for an unfinished earlier search before a new one.
    pub settle_timeout: Duration,
    /// How long to wait for the process to exit after `quit`.
    pub quit_timeout: Duration,
    /// Consecutive desynced searches tolerated before the session gives up.
    pub desync_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stockfish"),
            args: Vec::new(),
            threads: 1,
            hash_mb: 16,
            skill_level: None,
            extra_options: Vec::new(),
            startup_timeout: Duration::from_secs(10),
            stop_grace: Duration::from_secs(1),
            settle_timeout: Duration::from_secs(5),
            quit_timeout: Duration::from_millis(300),
            desync_limit: 3,
        }
    }
}

/// Lifecycle state of an [`EngineSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Handshaking,
    Ready,
    Searching,
}

/// Cloneable flag that aborts an in-flight search from another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the current and any later search stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// An engine output line and the request sequence it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tagged {
    seq: u64,
    line: String,
}

/// Forward `lines` over a channel from a background thread, tagging each
/// with the count of `bestmove` lines seen before it.
fn spawn_reader<I>(lines: I) -> io::Result<Receiver<Tagged>>
where
    I: IntoIterator<Item = io::Result<String>>,
    I::IntoIter: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let lines = lines.into_iter();
    thread::Builder::new()
        .name("engine-stdout".to_string())
        .spawn(move || {
            let mut seq = 0u64;
            for line in lines {
                let Ok(line) = line else { break };
                let finishes_request = line.starts_with("bestmove");
                if tx.send(Tagged { seq, line }).is_err() {
                    break;
                }
                if finishes_request {
                    seq += 1;
                }
            }
        })?;
    Ok(rx)
}

/// What made the session send `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopCause {
    Budget,
    Cancelled,
}

/// A running UCI engine and the state needed to talk to it.
pub struct EngineSession {
    config: EngineConfig,
    state: SessionState,
    child: Option<Child>,
    stdin: Option<Box<dyn Write + Send>>,
    rx: Option<Receiver<Tagged>>,
    /// Sequence number the next `go` will carry.
    next_seq: u64,
    /// The last request returned before its `bestmove` arrived.
    unfinished: bool,
    consecutive_desyncs: u32,
    engine_name: Option<String>,
    options: HashSet<String>,
    stop: StopHandle,
}

impl EngineSession {
    /// Spawn the configured engine and complete the handshake.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let mut session = Self::closed(config);
        session.spawn()?;
        Ok(session)
    }

    /// Drive an engine over an arbitrary transport instead of a child process.
    ///
    /// `lines` is the engine's output; the handshake runs before returning.
    pub fn with_transport<W, I>(
        config: EngineConfig,
        writer: W,
        lines: I,
    ) -> Result<Self, EngineError>
    where
        W: Write + Send + 'static,
        I: IntoIterator<Item = io::Result<String>>,
        I::IntoIter: Send + 'static,
    {
        let mut session = Self::closed(config);
        let rx = spawn_reader(lines).map_err(|e| session.unavailable(e.to_string()))?;
        session.attach(Box::new(writer), rx, None)?;
        Ok(session)
    }

    fn closed(config: EngineConfig) -> Self {
        Self {
            config,
            state: SessionState::Closed,
            child: None,
            stdin: None,
            rx: None,
            next_seq: 0,
            unfinished: false,
            consecutive_desyncs: 0,
            engine_name: None,
            options: HashSet::new(),
            stop: StopHandle::new(),
        }
    }

    fn spawn(&mut self) -> Result<(), EngineError> {
        let mut child = Command::new(&self.config.path)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.unavailable(format!("failed to spawn: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.unavailable("no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.unavailable("no stdout".to_string()))?;
        let rx = spawn_reader(BufReader::new(stdout).lines())
            .map_err(|e| self.unavailable(e.to_string()))?;
        info!(path = %self.config.path.display(), pid = child.id(), "engine process started");
        self.attach(Box::new(BufWriter::new(stdin)), rx, Some(child))
    }

    fn attach(
        &mut self,
        writer: Box<dyn Write + Send>,
        rx: Receiver<Tagged>,
        child: Option<Child>,
    ) -> Result<(), EngineError> {
        self.stdin = Some(writer);
        self.rx = Some(rx);
        self.child = child;
        self.next_seq = 0;
        self.unfinished = false;
        self.consecutive_desyncs = 0;
        self.options.clear();
        if let Err(e) = self.handshake() {
            self.close();
            return Err(self.unavailable(e.to_string()));
        }
        Ok(())
    }

    fn unavailable(&self, reason: String) -> EngineError {
        EngineError::Unavailable {
            path: self.config.path.clone(),
            reason,
        }
    }

    fn handshake(&mut self) -> Result<(), EngineError> {
        self.state = SessionState::Handshaking;
        let deadline = Instant::now() + self.config.startup_timeout;

        self.write_line("uci")?;
        loop {
            let tagged = self.recv_until(deadline, "uciok")?;
            match parse_response(&tagged.line) {
                Ok(Response::Id { name }) => self.engine_name = Some(name),
                Ok(Response::Option { name }) => {
                    self.options.insert(name);
                }
                Ok(Response::UciOk) => break,
                _ => {}
            }
        }

        self.set_option_if_available("Threads", &self.config.threads.to_string())?;
        self.set_option_if_available("Hash", &self.config.hash_mb.to_string())?;
        if let Some(level) = self.config.skill_level {
            self.set_option_if_available("Skill Level", &level.to_string())?;
        }
        for (name, value) in self.config.extra_options.clone() {
            self.set_option_if_available(&name, &value)?;
        }

        self.sync_ready(deadline)?;
        self.write_line("ucinewgame")?;
        self.sync_ready(Instant::now() + self.config.startup_timeout)?;

        self.state = SessionState::Ready;
        info!(
            engine = self.engine_name.as_deref().unwrap_or("unknown"),
            options = self.options.len(),
            "engine ready"
        );
        Ok(())
    }

    /// Send `setoption` only for options the engine advertised (or all, if it
    /// advertised none).
    fn set_option_if_available(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        if self.options.is_empty() || self.options.contains(name) {
            self.write_line(&setoption_command(name, value))?;
        } else {
            debug!(option = name, "engine does not advertise option, skipping");
        }
        Ok(())
    }

    /// `isready` and wait for `readyok`, discarding anything else.
    fn sync_ready(&mut self, deadline: Instant) -> Result<(), EngineError> {
        self.write_line("isready")?;
        loop {
            let tagged = self.recv_until(deadline, "readyok")?;
            if tagged.line.trim() == "readyok" {
                return Ok(());
            }
            trace!(seq = tagged.seq, line = %tagged.line, "discarded while syncing");
        }
    }

    /// Wait for the `bestmove` of a request that was abandoned after `stop`.
    fn settle(&mut self) -> Result<(), EngineError> {
        if !self.unfinished {
            return Ok(());
        }
        let pending = self.next_seq.saturating_sub(1);
        let deadline = Instant::now() + self.config.settle_timeout;
        loop {
            let tagged = match self.recv_until(deadline, "bestmove") {
                Ok(tagged) => tagged,
                Err(EngineError::Timeout { .. }) => return Err(EngineError::Unresponsive),
                Err(e) => return Err(e),
            };
            debug!(seq = tagged.seq, line = %tagged.line, "discarded stale line");
            if tagged.seq == pending && tagged.line.starts_with("bestmove") {
                self.unfinished = false;
                return Ok(());
            }
        }
    }

    fn recv_until(
        &mut self,
        deadline: Instant,
        waiting_for: &'static str,
    ) -> Result<Tagged, EngineError> {
        let rx = self.rx.as_ref().ok_or(EngineError::Closed)?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(tagged) => {
                trace!(seq = tagged.seq, line = %tagged.line, "<- engine");
                Ok(tagged)
            }
            Err(RecvTimeoutError::Timeout) => Err(EngineError::Timeout { waiting_for }),
            Err(RecvTimeoutError::Disconnected) => {
                self.state = SessionState::Closed;
                Err(EngineError::Disconnected)
            }
        }
    }

    fn write_line(&mut self, msg: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::Closed)?;
        debug!(cmd = msg, "-> engine");
        stdin.write_all(msg.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }

    /// Run one search and return its verdict.
    ///
    /// Only [`EngineError`]s that leave the session unusable are returned;
    /// timeouts, cancellation, and isolated desyncs become
    /// [`SearchVerdict::Inconclusive`].
    pub fn search(&mut self, request: &SearchRequest) -> Result<SearchVerdict, EngineError> {
        if self.state != SessionState::Ready {
            return Err(EngineError::Closed);
        }
        if self.stop.is_stopped() {
            return Ok(SearchVerdict::Inconclusive(InconclusiveReason::Cancelled));
        }

        self.settle()?;
        self.sync_ready(Instant::now() + self.config.startup_timeout)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.state = SessionState::Searching;

        let fen = rules::to_fen(&request.position);
        self.write_line(&position_command(&fen))?;
        self.write_line(&request.go_params().to_string())?;
        debug!(seq, fen = %fen, mate = request.mate, "search started");

        let result = self.collect(seq, request);
        if self.state == SessionState::Searching {
            self.state = SessionState::Ready;
        }
        result
    }

    /// Read lines for request `seq` until `bestmove`, budget expiry, or desync.
    fn collect(&mut self, seq: u64, request: &SearchRequest) -> Result<SearchVerdict, EngineError> {
        let start = Instant::now();
        let mut deadline = start + request.budget.time;
        let mut stop_cause: Option<StopCause> = None;
        let mut acc = SearchAccumulator::new();

        loop {
            if stop_cause.is_none() && self.stop.is_stopped() {
                self.write_line("stop")?;
                stop_cause = Some(StopCause::Cancelled);
                deadline = Instant::now() + self.config.stop_grace;
            }

            let now = Instant::now();
            if now >= deadline {
                if stop_cause.is_none() {
                    debug!(
                        seq,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "budget exhausted, sending stop"
                    );
                    self.write_line("stop")?;
                    stop_cause = Some(StopCause::Budget);
                    deadline = now + self.config.stop_grace;
                    continue;
                }
                self.unfinished = true;
                let reason = match stop_cause {
                    Some(StopCause::Cancelled) => InconclusiveReason::Cancelled,
                    _ => InconclusiveReason::TimedOut,
                };
                warn!(seq, %reason, "engine did not answer stop in time");
                return Ok(SearchVerdict::Inconclusive(reason));
            }

            let Some(rx) = self.rx.as_ref() else {
                return Err(EngineError::Closed);
            };
            let tagged = match rx.recv_timeout((deadline - now).min(POLL_SLICE)) {
                Ok(tagged) => tagged,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    self.state = SessionState::Closed;
                    return Err(EngineError::Disconnected);
                }
            };

            if tagged.seq < seq {
                debug!(
                    seq = tagged.seq,
                    current = seq,
                    line = %tagged.line,
                    "discarded stale line"
                );
                continue;
            }
            trace!(seq, line = %tagged.line, "<- engine");

            match parse_response(&tagged.line) {
                Ok(Response::Info(info)) => acc.update(info),
                Ok(Response::BestMove { best }) => {
                    self.consecutive_desyncs = 0;
                    if stop_cause == Some(StopCause::Cancelled) {
                        return Ok(SearchVerdict::Inconclusive(InconclusiveReason::Cancelled));
                    }
                    let stats = acc.stats();
                    let verdict = acc.finish(request.budget.depth);
                    debug!(
                        seq,
                        ?verdict,
                        best = ?best.map(|mv| mv.to_string()),
                        nodes = ?stats.nodes,
                        seldepth = ?stats.seldepth,
                        engine_ms = ?stats.time_ms,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "search finished"
                    );
                    return Ok(verdict);
                }
                Ok(_) => {}
                Err(e) => {
                    let terminal = tagged.line.starts_with("bestmove");
                    return self.desynced(e, terminal, stop_cause.is_some());
                }
            }
        }
    }

    /// Give up on the current request after an unparseable line.
    ///
    /// A malformed `bestmove` still ends the request, so there is nothing left
    /// to stop or settle.
    fn desynced(
        &mut self,
        err: EngineError,
        terminal: bool,
        stop_sent: bool,
    ) -> Result<SearchVerdict, EngineError> {
        self.consecutive_desyncs += 1;
        warn!(error = %err, count = self.consecutive_desyncs, terminal, "protocol desync");
        if !terminal {
            if !stop_sent {
                self.write_line("stop")?;
            }
            self.unfinished = true;
        }
        if self.consecutive_desyncs > self.config.desync_limit {
            return Err(EngineError::DesyncLimit {
                count: self.consecutive_desyncs,
            });
        }
        Ok(SearchVerdict::Inconclusive(InconclusiveReason::Desync))
    }

    /// Send `quit`, wait briefly, and kill the process if it is still running.
    ///
    /// Safe to call any number of times.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed && self.stdin.is_none() && self.child.is_none() {
            return;
        }
        if self.state == SessionState::Searching || self.unfinished {
            let _ = self.write_line("stop");
        }
        let _ = self.write_line("quit");
        self.stdin = None;

        if let Some(mut child) = self.child.take() {
            let deadline = Instant::now() + self.config.quit_timeout;
            let mut exited = false;
            while Instant::now() < deadline {
                if let Ok(Some(_)) = child.try_wait() {
                    exited = true;
                    break;
                }
                thread::sleep(QUIT_POLL_INTERVAL);
            }
            if !exited {
                warn!(pid = child.id(), "engine ignored quit, killing");
                let _ = child.kill();
                let _ = child.wait();
            }
        }

        self.rx = None;
        self.state = SessionState::Closed;
        debug!("engine session closed");
    }

    /// Close the current process and start a fresh one with the same config.
    ///
    /// The stop handle is shared with the new process.
    pub fn restart(&mut self) -> Result<(), EngineError> {
        info!("restarting engine");
        self.close();
        self.spawn()
    }

    /// Flag shared with this session for aborting searches.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Name reported by `id name`, if any.
    pub fn engine_name(&self) -> Option<&str> {
        self.engine_name.as_deref()
    }

    /// Sequence number the next request will carry.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Analyzer for EngineSession {
    fn search(&mut self, request: &SearchRequest) -> Result<SearchVerdict, EngineError> {
        EngineSession::search(self, request)
    }

    fn restart(&mut self) -> Result<(), EngineError> {
        EngineSession::restart(self)
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.close();
    }
}

use log::{debug, warn};
use serde_json::Value;
use std::io::BufRead;

use super::error::ClipsError;
use super::interrupt::StopSignal;
use super::job::JobSnapshot;

/// Prefix of every server-sent event line carrying a payload
const DATA_PREFIX: &str = "data: ";

/// Something worth telling the user while a job streams
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The job identifier, reported once
    JobId(String),
    /// A snapshot that differs from the previous message
    Snapshot(JobSnapshot),
}

/// Turns a server-sent event body into a sequence of distinct job snapshots
///
/// Lines that are not `data: <JSON>` are ignored and payloads that do not
/// decode as a snapshot are dropped without any other effect. A snapshot
/// equal to the one right before it is not surfaced again. The iterator ends
/// at the first terminal snapshot, when the body ends, or on a read error.
pub struct SnapshotStream<R> {
    reader: R,
    buf: Vec<u8>,
    last_payload: Option<Value>,
    job_id_seen: bool,
    pending: Option<StreamEvent>,
    finished: bool,
}

impl<R: BufRead> SnapshotStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            last_payload: None,
            job_id_seen: false,
            pending: None,
            finished: false,
        }
    }

    /// Next raw line, `None` once the body is exhausted or unreadable
    fn next_line(&mut self) -> Option<Vec<u8>> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => Some(std::mem::take(&mut self.buf)),
            Err(e) => {
                warn!("Event stream ended early: {}", e);
                None
            }
        }
    }

    fn capture_job_id(&mut self, snapshot: &JobSnapshot) -> Option<StreamEvent> {
        if self.job_id_seen {
            return None;
        }
        let id = snapshot.id.as_ref()?;
        self.job_id_seen = true;
        Some(StreamEvent::JobId(id.clone()))
    }
}

impl<R: BufRead> Iterator for SnapshotStream<R> {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        if self.finished {
            return None;
        }

        loop {
            let Some(raw) = self.next_line() else {
                self.finished = true;
                return None;
            };
            let Ok(line) = std::str::from_utf8(&raw) else {
                debug!("Skipping non UTF-8 event line");
                continue;
            };

            let payload = match decode_data_line(line.trim_end_matches(['\r', '\n'])) {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Discarding {}", e);
                    continue;
                }
            };

            let snapshot = match serde_json::from_value::<JobSnapshot>(payload.clone()) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    debug!("Discarding {}", ClipsError::MalformedMessage(e.to_string()));
                    continue;
                }
            };

            let id_event = self.capture_job_id(&snapshot);
            let duplicate = self.last_payload.as_ref() == Some(&payload);
            self.last_payload = Some(payload);

            let snapshot = (!duplicate).then_some(snapshot);
            if snapshot.as_ref().is_some_and(JobSnapshot::is_terminal) {
                self.finished = true;
            }

            match (id_event, snapshot) {
                (Some(id), Some(snapshot)) => {
                    self.pending = Some(StreamEvent::Snapshot(snapshot));
                    return Some(id);
                }
                (Some(id), None) => return Some(id),
                (None, Some(snapshot)) => return Some(StreamEvent::Snapshot(snapshot)),
                (None, None) => continue,
            }
        }
    }
}

/// Decode one line of the event stream
///
/// Returns `Ok(None)` for lines that carry no payload (blank lines, comments,
/// `event:` fields).
pub fn decode_data_line(line: &str) -> Result<Option<Value>, ClipsError> {
    let Some(json) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    serde_json::from_str(json)
        .map(Some)
        .map_err(|e| ClipsError::MalformedMessage(format!("{} in {:?}", e, json)))
}

/// Drive a stream until the job settles, the body ends, or the user interrupts
///
/// Returns the terminal snapshot when one arrived. The stream (and with it the
/// connection) is dropped before returning.
pub fn follow<R: BufRead>(
    stream: SnapshotStream<R>,
    stop: &StopSignal,
    mut on_event: impl FnMut(&StreamEvent),
) -> Result<Option<JobSnapshot>, ClipsError> {
    let mut terminal = None;

    for event in stream {
        if stop.is_raised() {
            return Err(ClipsError::Cancelled);
        }
        on_event(&event);
        if let StreamEvent::Snapshot(snapshot) = event {
            if snapshot.is_terminal() {
                terminal = Some(snapshot);
            }
        }
    }

    if terminal.is_none() && stop.is_raised() {
        return Err(ClipsError::Cancelled);
    }
    Ok(terminal)
}

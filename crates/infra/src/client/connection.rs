//! The connection loop
//!
//! A single blocking reader: decode a frame, apply it to the core state,
//! post the resulting event. All three core state components live on this
//! thread and are never touched from anywhere else. Event posting is
//! fire-and-forget; a dropped receiver never blocks or kills the loop.
//!
//! Any read error is terminal, including a malformed payload: the stream
//! offers no way to resynchronize on the next frame boundary once a
//! message's length can no longer be trusted.

use std::io::BufReader;
use std::net::TcpStream;
use std::sync::atomic::Ordering;

use crossbeam_channel::Sender;
use tallyarc_core::{AggregationEngine, ModelEvent, TaskDirectory, TimeTaxonomy, UpsertOutcome};
use tracing::{debug, error, info, warn};

use super::Shared;
use crate::wire::{self, Message, ProtocolError};

/// Core state owned by the connection loop thread.
struct LoopState {
    directory: TaskDirectory,
    taxonomy: TimeTaxonomy,
    engine: AggregationEngine,
}

pub(super) fn run(stream: TcpStream, shared: &Shared, events: &Sender<ModelEvent>) {
    let mut reader = BufReader::new(stream);
    let mut state = LoopState {
        directory: TaskDirectory::new(),
        taxonomy: TimeTaxonomy::new(),
        engine: AggregationEngine::new(),
    };

    // Each connection starts from an empty mirror; the presentation layer
    // drops whatever it was showing before the configuration replay.
    let _ = events.send(ModelEvent::Cleared);

    loop {
        let (type_code, payload) = match wire::read_frame(&mut reader) {
            Ok(frame) => frame,
            Err(ProtocolError::EndOfStream) => {
                info!("server closed the connection");
                break;
            }
            Err(e) => {
                error!(error = %e, "read failed, closing connection");
                break;
            }
        };
        match Message::decode(type_code, &payload) {
            Ok(message) => dispatch(message, &mut state, shared, events),
            Err(e) => {
                error!(type_code, error = %e, "undecodable frame, closing connection");
                break;
            }
        }
    }

    shared.connected.store(false, Ordering::Release);
    let _ = events.send(ModelEvent::Disconnected);
}

fn dispatch(
    message: Message,
    state: &mut LoopState,
    shared: &Shared,
    events: &Sender<ModelEvent>,
) {
    match message {
        Message::TaskInfo(task) => {
            let id = task.id;
            match state.directory.upsert(task) {
                UpsertOutcome::New => {
                    let _ = events.send(ModelEvent::NewTask(id));
                }
                UpsertOutcome::Updated { parent_changed, old_parent_id } => {
                    let _ = events.send(ModelEvent::UpdatedTask { id, parent_changed });
                    if parent_changed {
                        let _ = events.send(ModelEvent::ReparentTask { id, old_parent_id });
                    }
                }
            }
        }
        Message::TimeEntryData(categories) => {
            debug!(count = categories.len(), "taxonomy snapshot replaced");
            state.taxonomy.replace(categories);
        }
        Message::TimeEntryModify(delta) => state.taxonomy.apply_modify(delta),
        Message::DailyReport { report, .. } => {
            let tree = state.engine.update(std::slice::from_ref(&report), &state.directory);
            let _ = events.send(ModelEvent::ReportUpdated(Box::new(tree.clone())));
        }
        Message::WeeklyReport { week, .. } => {
            let tree = state.engine.update(&week.days, &state.directory);
            let _ = events.send(ModelEvent::ReportUpdated(Box::new(tree.clone())));
        }
        Message::FailureResponse { request_id, message } => {
            let _ = events.send(ModelEvent::ServerFailure { request_id, message });
        }
        Message::SuccessResponse => {
            let _ = events.send(ModelEvent::ServerSuccess);
        }
        Message::ConfigurationComplete => {
            shared.ready.store(true, Ordering::Release);
            shared.flush_staged();
            let _ = events.send(ModelEvent::ConfigurationComplete);
        }
        Message::BugzillaConfig(bytes) => {
            let _ = events.send(ModelEvent::BugzillaConfig(bytes));
        }
        // Client-originated kinds are never valid inbound; drop them rather
        // than killing the connection.
        Message::CreateTask { .. }
        | Message::UpdateTask { .. }
        | Message::ReparentTask { .. }
        | Message::StartTask { .. }
        | Message::StopTask { .. }
        | Message::FinishTask { .. }
        | Message::RequestConfiguration
        | Message::RequestDailyReport { .. }
        | Message::RequestWeeklyReport { .. } => {
            warn!(type_code = message.type_code(), "ignoring client-bound message from server");
        }
    }
}

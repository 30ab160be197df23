//! Message registry
//!
//! A closed set of message kinds, one encode and one decode function per
//! kind, dispatched by exhaustive match on the frame's type code. Decoding
//! is purely functional: payload bytes in, typed record or `Malformed` out.

use tallyarc_domain::constants::DAYS_PER_WEEK;
use tallyarc_domain::{
    CategoryDelta, ChangeKind, CodeDelta, CodeId, DailyReport, ReportDate, Session, Task, TaskId,
    TaskState, TaxonomyDelta, TimeCategory, TimeCode, TimeEntry, TimePair, WeeklyReport,
};

use super::buffer::{WireReader, WireWriter};
use super::ProtocolError;

/// Frame type codes.
pub mod codes {
    // Server → client
    pub const TASK_INFO: i32 = 1;
    pub const TIME_ENTRY_DATA: i32 = 2;
    pub const TIME_ENTRY_MODIFY: i32 = 3;
    pub const DAILY_REPORT: i32 = 4;
    pub const WEEKLY_REPORT: i32 = 5;
    pub const FAILURE_RESPONSE: i32 = 6;
    pub const SUCCESS_RESPONSE: i32 = 7;
    pub const CONFIGURATION_COMPLETE: i32 = 8;
    pub const BUGZILLA_CONFIG: i32 = 9;

    // Client → server
    pub const CREATE_TASK: i32 = 20;
    pub const UPDATE_TASK: i32 = 21;
    pub const REPARENT_TASK: i32 = 22;
    pub const START_TASK: i32 = 23;
    pub const STOP_TASK: i32 = 24;
    pub const FINISH_TASK: i32 = 25;
    pub const REQUEST_CONFIGURATION: i32 = 26;
    pub const REQUEST_DAILY_REPORT: i32 = 27;
    pub const REQUEST_WEEKLY_REPORT: i32 = 28;
}

/// A typed wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Server → client
    /// Full task record, sent on create and on every update.
    TaskInfo(Task),
    /// Full taxonomy snapshot.
    TimeEntryData(Vec<TimeCategory>),
    /// Incremental taxonomy delta.
    TimeEntryModify(TaxonomyDelta),
    DailyReport { request_id: i32, report: DailyReport },
    WeeklyReport { request_id: i32, week: Box<WeeklyReport> },
    FailureResponse { request_id: i32, message: String },
    SuccessResponse,
    ConfigurationComplete,
    /// Opaque bug-tracker integration payload, passed through unparsed.
    BugzillaConfig(Vec<u8>),

    // Client → server
    CreateTask { request_id: i32, parent_id: TaskId, name: String, time_codes: Vec<CodeId> },
    UpdateTask { request_id: i32, task_id: TaskId, name: String },
    ReparentTask { request_id: i32, task_id: TaskId, parent_id: TaskId, index: i32 },
    StartTask { request_id: i32, task_id: TaskId },
    StopTask { request_id: i32, task_id: TaskId },
    FinishTask { request_id: i32, task_id: TaskId },
    RequestConfiguration,
    RequestDailyReport { request_id: i32, date: ReportDate },
    RequestWeeklyReport { request_id: i32, date: ReportDate },
}

impl Message {
    /// The frame type code of this message.
    pub fn type_code(&self) -> i32 {
        match self {
            Self::TaskInfo(_) => codes::TASK_INFO,
            Self::TimeEntryData(_) => codes::TIME_ENTRY_DATA,
            Self::TimeEntryModify(_) => codes::TIME_ENTRY_MODIFY,
            Self::DailyReport { .. } => codes::DAILY_REPORT,
            Self::WeeklyReport { .. } => codes::WEEKLY_REPORT,
            Self::FailureResponse { .. } => codes::FAILURE_RESPONSE,
            Self::SuccessResponse => codes::SUCCESS_RESPONSE,
            Self::ConfigurationComplete => codes::CONFIGURATION_COMPLETE,
            Self::BugzillaConfig(_) => codes::BUGZILLA_CONFIG,
            Self::CreateTask { .. } => codes::CREATE_TASK,
            Self::UpdateTask { .. } => codes::UPDATE_TASK,
            Self::ReparentTask { .. } => codes::REPARENT_TASK,
            Self::StartTask { .. } => codes::START_TASK,
            Self::StopTask { .. } => codes::STOP_TASK,
            Self::FinishTask { .. } => codes::FINISH_TASK,
            Self::RequestConfiguration => codes::REQUEST_CONFIGURATION,
            Self::RequestDailyReport { .. } => codes::REQUEST_DAILY_REPORT,
            Self::RequestWeeklyReport { .. } => codes::REQUEST_WEEKLY_REPORT,
        }
    }

    /// Encode the payload (frame header excluded).
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut w = WireWriter::new();
        match self {
            Self::TaskInfo(task) => encode_task(&mut w, task)?,
            Self::TimeEntryData(categories) => {
                w.put_count(categories.len())?;
                for category in categories {
                    encode_category(&mut w, category)?;
                }
            }
            Self::TimeEntryModify(delta) => encode_taxonomy_delta(&mut w, delta)?,
            Self::DailyReport { request_id, report } => {
                w.put_i32(*request_id);
                encode_report_body(&mut w, report)?;
            }
            Self::WeeklyReport { request_id, week } => {
                w.put_i32(*request_id);
                for day in &week.days {
                    encode_report_body(&mut w, day)?;
                }
            }
            Self::FailureResponse { request_id, message } => {
                w.put_i32(*request_id);
                w.put_string(message)?;
            }
            Self::SuccessResponse | Self::ConfigurationComplete | Self::RequestConfiguration => {}
            Self::BugzillaConfig(bytes) => return Ok(bytes.clone()),
            Self::CreateTask { request_id, parent_id, name, time_codes } => {
                w.put_i32(*request_id);
                w.put_i32(*parent_id);
                w.put_string(name)?;
                w.put_count(time_codes.len())?;
                for code in time_codes {
                    w.put_i32(*code);
                }
            }
            Self::UpdateTask { request_id, task_id, name } => {
                w.put_i32(*request_id);
                w.put_i32(*task_id);
                w.put_string(name)?;
            }
            Self::ReparentTask { request_id, task_id, parent_id, index } => {
                w.put_i32(*request_id);
                w.put_i32(*task_id);
                w.put_i32(*parent_id);
                w.put_i32(*index);
            }
            Self::StartTask { request_id, task_id }
            | Self::StopTask { request_id, task_id }
            | Self::FinishTask { request_id, task_id } => {
                w.put_i32(*request_id);
                w.put_i32(*task_id);
            }
            Self::RequestDailyReport { request_id, date }
            | Self::RequestWeeklyReport { request_id, date } => {
                w.put_i32(*request_id);
                encode_date(&mut w, *date);
            }
        }
        Ok(w.into_bytes())
    }

    /// Decode a payload for a frame type code.
    pub fn decode(type_code: i32, payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = WireReader::new(payload);
        let message = match type_code {
            codes::TASK_INFO => Self::TaskInfo(decode_task(&mut r)?),
            codes::TIME_ENTRY_DATA => {
                let count = r.count("categories")?;
                let mut categories = Vec::with_capacity(count);
                for _ in 0..count {
                    categories.push(decode_category(&mut r)?);
                }
                Self::TimeEntryData(categories)
            }
            codes::TIME_ENTRY_MODIFY => Self::TimeEntryModify(decode_taxonomy_delta(&mut r)?),
            codes::DAILY_REPORT => Self::DailyReport {
                request_id: r.i32("requestID")?,
                report: decode_report_body(&mut r)?,
            },
            codes::WEEKLY_REPORT => {
                let request_id = r.i32("requestID")?;
                let mut days = Vec::with_capacity(DAYS_PER_WEEK);
                for _ in 0..DAYS_PER_WEEK {
                    days.push(decode_report_body(&mut r)?);
                }
                let days: [DailyReport; DAYS_PER_WEEK] = days
                    .try_into()
                    .map_err(|_| ProtocolError::malformed("weekly report day count"))?;
                Self::WeeklyReport { request_id, week: Box::new(WeeklyReport { days }) }
            }
            codes::FAILURE_RESPONSE => Self::FailureResponse {
                request_id: r.i32("requestID")?,
                message: r.string("message")?,
            },
            codes::SUCCESS_RESPONSE => Self::SuccessResponse,
            codes::CONFIGURATION_COMPLETE => Self::ConfigurationComplete,
            codes::BUGZILLA_CONFIG => return Ok(Self::BugzillaConfig(payload.to_vec())),
            codes::CREATE_TASK => {
                let request_id = r.i32("requestID")?;
                let parent_id = r.i32("parentID")?;
                let name = r.string("name")?;
                let count = r.count("timeCodes")?;
                let mut time_codes = Vec::with_capacity(count);
                for _ in 0..count {
                    time_codes.push(r.i32("timeCode")?);
                }
                Self::CreateTask { request_id, parent_id, name, time_codes }
            }
            codes::UPDATE_TASK => Self::UpdateTask {
                request_id: r.i32("requestID")?,
                task_id: r.i32("taskID")?,
                name: r.string("name")?,
            },
            codes::REPARENT_TASK => Self::ReparentTask {
                request_id: r.i32("requestID")?,
                task_id: r.i32("taskID")?,
                parent_id: r.i32("parentID")?,
                index: r.i32("index")?,
            },
            codes::START_TASK => Self::StartTask {
                request_id: r.i32("requestID")?,
                task_id: r.i32("taskID")?,
            },
            codes::STOP_TASK => Self::StopTask {
                request_id: r.i32("requestID")?,
                task_id: r.i32("taskID")?,
            },
            codes::FINISH_TASK => Self::FinishTask {
                request_id: r.i32("requestID")?,
                task_id: r.i32("taskID")?,
            },
            codes::REQUEST_CONFIGURATION => Self::RequestConfiguration,
            codes::REQUEST_DAILY_REPORT => Self::RequestDailyReport {
                request_id: r.i32("requestID")?,
                date: decode_date(&mut r)?,
            },
            codes::REQUEST_WEEKLY_REPORT => Self::RequestWeeklyReport {
                request_id: r.i32("requestID")?,
                date: decode_date(&mut r)?,
            },
            unknown => {
                return Err(ProtocolError::Malformed(format!("unknown message type {unknown}")))
            }
        };
        r.expect_end("message")?;
        Ok(message)
    }
}

fn encode_date(w: &mut WireWriter, date: ReportDate) {
    w.put_u8(date.month);
    w.put_u8(date.day);
    w.put_i16(date.year);
}

fn decode_date(r: &mut WireReader<'_>) -> Result<ReportDate, ProtocolError> {
    Ok(ReportDate { month: r.u8("month")?, day: r.u8("day")?, year: r.i16("year")? })
}

fn encode_entry(w: &mut WireWriter, entry: TimeEntry) {
    w.put_i32(entry.category_id);
    w.put_i32(entry.code_id);
}

fn decode_entry(r: &mut WireReader<'_>) -> Result<TimeEntry, ProtocolError> {
    Ok(TimeEntry::new(r.i32("categoryID")?, r.i32("codeID")?))
}

fn encode_session(w: &mut WireWriter, session: &Session) -> Result<(), ProtocolError> {
    w.put_i64(session.start_ms);
    w.put_bool(session.stop_ms.is_some());
    w.put_i64(session.stop_ms.unwrap_or(0));
    w.put_count(session.entries.len())?;
    for &entry in &session.entries {
        encode_entry(w, entry);
    }
    Ok(())
}

fn decode_session(r: &mut WireReader<'_>) -> Result<Session, ProtocolError> {
    let start_ms = r.i64("sessionStart")?;
    let has_stop = r.bool("hasStop")?;
    let stop_raw = r.i64("sessionStop")?;
    let count = r.count("sessionEntries")?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(decode_entry(r)?);
    }
    Ok(Session { start_ms, stop_ms: has_stop.then_some(stop_raw), entries })
}

fn encode_task(w: &mut WireWriter, task: &Task) -> Result<(), ProtocolError> {
    w.put_i32(task.id);
    w.put_i32(task.parent_id);
    w.put_i32(task.index_in_parent);
    w.put_u8(task.state.as_wire());
    w.put_bool(task.locked);
    w.put_bool(task.server_controlled);
    w.put_string(&task.name)?;
    w.put_count(task.sessions.len())?;
    for session in &task.sessions {
        encode_session(w, session)?;
    }
    w.put_count(task.entries.len())?;
    for &entry in &task.entries {
        encode_entry(w, entry);
    }
    Ok(())
}

fn decode_task(r: &mut WireReader<'_>) -> Result<Task, ProtocolError> {
    let id = r.i32("taskID")?;
    let parent_id = r.i32("parentID")?;
    let index_in_parent = r.i32("index")?;
    let state_tag = r.u8("state")?;
    let state = TaskState::from_wire(state_tag)
        .ok_or_else(|| ProtocolError::Malformed(format!("unknown task state {state_tag}")))?;
    let locked = r.bool("locked")?;
    let server_controlled = r.bool("serverControlled")?;
    let name = r.string("name")?;
    let session_count = r.count("sessions")?;
    let mut sessions = Vec::with_capacity(session_count);
    for _ in 0..session_count {
        sessions.push(decode_session(r)?);
    }
    let entry_count = r.count("entries")?;
    let mut entries = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        entries.push(decode_entry(r)?);
    }
    Ok(Task {
        id,
        parent_id,
        index_in_parent,
        name,
        state,
        locked,
        server_controlled,
        sessions,
        entries,
    })
}

fn encode_code(w: &mut WireWriter, code: &TimeCode) -> Result<(), ProtocolError> {
    w.put_i32(code.id);
    w.put_string(&code.name)?;
    w.put_bool(code.archived);
    Ok(())
}

fn decode_code(r: &mut WireReader<'_>) -> Result<TimeCode, ProtocolError> {
    Ok(TimeCode { id: r.i32("codeID")?, name: r.string("codeName")?, archived: r.bool("archived")? })
}

fn encode_category(w: &mut WireWriter, category: &TimeCategory) -> Result<(), ProtocolError> {
    w.put_i32(category.id);
    w.put_string(&category.name)?;
    w.put_bool(category.archived);
    w.put_count(category.codes.len())?;
    for code in &category.codes {
        encode_code(w, code)?;
    }
    Ok(())
}

fn decode_category(r: &mut WireReader<'_>) -> Result<TimeCategory, ProtocolError> {
    let id = r.i32("categoryID")?;
    let name = r.string("categoryName")?;
    let archived = r.bool("archived")?;
    let count = r.count("codes")?;
    let mut codes = Vec::with_capacity(count);
    for _ in 0..count {
        codes.push(decode_code(r)?);
    }
    Ok(TimeCategory { id, name, archived, codes })
}

fn change_tag(change: ChangeKind) -> u8 {
    match change {
        ChangeKind::Add => 0,
        ChangeKind::Update => 1,
    }
}

fn change_from_tag(tag: u8) -> Result<ChangeKind, ProtocolError> {
    match tag {
        0 => Ok(ChangeKind::Add),
        1 => Ok(ChangeKind::Update),
        other => Err(ProtocolError::Malformed(format!("unknown change tag {other}"))),
    }
}

fn encode_taxonomy_delta(w: &mut WireWriter, delta: &TaxonomyDelta) -> Result<(), ProtocolError> {
    w.put_count(delta.categories.len())?;
    for (category_index, category) in delta.categories.iter().enumerate() {
        w.put_u8(change_tag(category.change));
        w.put_i32(category.id);
        w.put_string(&category.name)?;
        w.put_bool(category.archived);
        w.put_count(category.codes.len())?;
        for code_delta in &category.codes {
            w.put_u8(change_tag(code_delta.change));
            // Back-reference to the enclosing category's position, so new
            // codes can attach to a category created by the same delta.
            let index = i32::try_from(category_index)
                .map_err(|_| ProtocolError::malformed("category index overflows prefix"))?;
            w.put_i32(index);
            encode_code(w, &code_delta.code)?;
        }
    }
    Ok(())
}

fn decode_taxonomy_delta(r: &mut WireReader<'_>) -> Result<TaxonomyDelta, ProtocolError> {
    let category_count = r.count("deltaCategories")?;
    let mut categories = Vec::with_capacity(category_count);
    for category_index in 0..category_count {
        let change = change_from_tag(r.u8("categoryChange")?)?;
        let id = r.i32("categoryID")?;
        let name = r.string("categoryName")?;
        let archived = r.bool("archived")?;
        let code_count = r.count("deltaCodes")?;
        let mut codes = Vec::with_capacity(code_count);
        for _ in 0..code_count {
            let code_change = change_from_tag(r.u8("codeChange")?)?;
            let back_reference = r.i32("categoryIndex")?;
            if usize::try_from(back_reference).ok() != Some(category_index) {
                return Err(ProtocolError::Malformed(format!(
                    "code back-reference {back_reference} does not name category {category_index}"
                )));
            }
            codes.push(CodeDelta { change: code_change, code: decode_code(r)? });
        }
        categories.push(CategoryDelta { change, id, name, archived, codes });
    }
    Ok(TaxonomyDelta { categories })
}

fn encode_report_body(w: &mut WireWriter, report: &DailyReport) -> Result<(), ProtocolError> {
    w.put_bool(report.found);
    encode_date(w, report.date);
    w.put_i64(report.start_ms);
    w.put_i64(report.end_ms);
    w.put_i64(report.total_ms);
    w.put_count(report.per_entry_ms.len())?;
    for (&entry, &duration_ms) in &report.per_entry_ms {
        encode_entry(w, entry);
        w.put_i64(duration_ms);
    }
    w.put_count(report.time_pairs.len())?;
    for pair in &report.time_pairs {
        w.put_i32(pair.task_id);
        w.put_i32(pair.session_index);
    }
    Ok(())
}

fn decode_report_body(r: &mut WireReader<'_>) -> Result<DailyReport, ProtocolError> {
    let found = r.bool("found")?;
    let date = decode_date(r)?;
    let start_ms = r.i64("start")?;
    let end_ms = r.i64("end")?;
    let total_ms = r.i64("total")?;
    let entry_count = r.count("perEntry")?;
    let mut per_entry_ms = std::collections::BTreeMap::new();
    for _ in 0..entry_count {
        let entry = decode_entry(r)?;
        let duration_ms = r.i64("duration")?;
        per_entry_ms.insert(entry, duration_ms);
    }
    let pair_count = r.count("timePairs")?;
    let mut time_pairs = Vec::with_capacity(pair_count);
    for _ in 0..pair_count {
        time_pairs.push(TimePair { task_id: r.i32("taskID")?, session_index: r.i32("sessionIndex")? });
    }
    Ok(DailyReport { found, date, start_ms, end_ms, total_ms, per_entry_ms, time_pairs })
}

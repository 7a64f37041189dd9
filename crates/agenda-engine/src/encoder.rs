//! Calendar document encoding.
//!
//! Every appointment carries an iCalendar (RFC 5545) document in its `iCalData` field.
//! Scheduled appointments get a freshly generated document on every write; cancelled
//! ones keep their existing document, with each VEVENT marked `STATUS:CANCELLED` and the
//! calendar marked `METHOD:CANCEL`. Cancellation is a text-to-text transform so the
//! original occurrence data (start, end, RRULE) survives untouched.

use chrono::{DateTime, TimeZone, Utc};
use icalendar::parser::{read_calendar, unfold, Component as ParsedComponent, Property};
use icalendar::{Calendar, CalendarDateTime, Component, DatePerhapsTime, EventLike};
use tracing::debug;

use crate::appointment::Appointment;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::recurrence::{map_recurrence, RecurrenceRule};

/// RFC 5545 section 3.1: content lines are folded at 75 octets.
const MAX_LINE_OCTETS: usize = 75;

/// Builds and rewrites calendar documents for appointments.
#[derive(Debug, Clone)]
pub struct CalendarEncoder {
    product_id: String,
}

impl Default for CalendarEncoder {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl CalendarEncoder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            product_id: config.product_id.clone(),
        }
    }

    /// Build a single-event document.
    ///
    /// The event's UID and DTSTAMP are generated per call, so two documents for the same
    /// inputs differ in those two lines only.
    pub fn generate(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        description: &str,
        rule: Option<&RecurrenceRule>,
    ) -> String {
        let mut event = icalendar::Event::new();
        event.summary(description).starts(start).ends(end);
        if let Some(rule) = rule {
            event.add_property("RRULE", rule.to_string());
        }

        let calendar = Calendar::new().push(event.done()).done();
        debug!(
            summary = description,
            recurring = rule.is_some(),
            "generated calendar document"
        );
        self.normalize_header(&calendar.to_string())
    }

    /// Mark every event of `document` cancelled and set `METHOD:CANCEL`.
    ///
    /// Applying this to an already-cancelled document yields the same document again.
    ///
    /// # Errors
    /// Returns `EngineError::Parse` when `document` is empty or not a well-formed
    /// VCALENDAR.
    pub fn cancel(&self, document: &str) -> Result<String> {
        let unfolded = unfold_document(document)?;
        let calendar = read_calendar(&unfolded).map_err(|e| EngineError::Parse(e.to_string()))?;
        let event_count = vevents(&calendar.components).len();

        let mut output = Vec::new();
        for line in content_lines(&unfolded)? {
            match line.name.as_str() {
                "BEGIN" => {
                    output.push(fold_line(line.raw));
                    if line.depth == 1 {
                        output.push("METHOD:CANCEL".to_string());
                    }
                }
                "END" => {
                    if line.component == "VEVENT" {
                        output.push("STATUS:CANCELLED".to_string());
                    }
                    output.push(fold_line(line.raw));
                }
                // Replaced by the markers written above.
                "METHOD" if line.depth == 1 => {}
                "STATUS" if line.component == "VEVENT" => {}
                _ => output.push(fold_line(line.raw)),
            }
        }

        debug!(events = event_count, "cancelled calendar document");
        Ok(join_lines(&output))
    }

    /// Bring `appointment.ical_data` in line with the appointment's current fields.
    ///
    /// Cancelled appointments go through [`CalendarEncoder::cancel`] on their existing
    /// document; everything else is regenerated from scratch.
    pub fn update_calendar(&self, appointment: &mut Appointment) -> Result<()> {
        let document = if appointment.is_cancelled() {
            let current = appointment.ical_data.as_deref().ok_or_else(|| {
                EngineError::Parse("appointment has no calendar document to cancel".to_string())
            })?;
            self.cancel(current)?
        } else {
            let rule = map_recurrence(appointment.active_recurrence());
            self.generate(
                appointment.date_time,
                appointment.end(),
                &appointment.description,
                rule.as_ref(),
            )
        };
        appointment.ical_data = Some(document);
        Ok(())
    }

    /// Swap the library's PRODID for ours and drop the default CALSCALE line.
    fn normalize_header(&self, ics: &str) -> String {
        let mut lines = Vec::new();
        for line in ics.lines() {
            if line.starts_with("PRODID:") {
                lines.push(fold_line(&format!("PRODID:{}", self.product_id)));
                continue;
            }
            if line == "CALSCALE:GREGORIAN" {
                continue;
            }
            lines.push(line.to_string());
        }
        join_lines(&lines)
    }
}

/// A decoded view of a calendar document.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDocument {
    /// Calendar-level `METHOD`, e.g. `CANCEL`.
    pub method: Option<String>,
    pub events: Vec<EncodedEvent>,
}

impl CalendarDocument {
    /// True when the document and every event in it carry the cancellation markers.
    pub fn is_cancelled(&self) -> bool {
        self.method.as_deref() == Some("CANCEL")
            && self
                .events
                .iter()
                .all(|e| e.status.as_deref() == Some("CANCELLED"))
    }
}

/// One VEVENT as read back from a document.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedEvent {
    pub uid: String,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: Option<String>,
    pub recurrence: Option<RecurrenceRule>,
}

/// Decode a document produced by [`CalendarEncoder`] (or any compatible VCALENDAR).
///
/// # Errors
/// Returns `EngineError::Parse` under the same conditions as
/// [`CalendarEncoder::cancel`], and when an event lacks a decodable DTSTART or DTEND.
pub fn parse_document(document: &str) -> Result<CalendarDocument> {
    let unfolded = unfold_document(document)?;
    let lines = content_lines(&unfolded)?;
    let calendar = read_calendar(&unfolded).map_err(|e| EngineError::Parse(e.to_string()))?;

    let method = lines
        .iter()
        .find(|l| l.depth == 1 && l.name == "METHOD")
        .map(|l| l.value.to_string());

    let events = vevents(&calendar.components)
        .into_iter()
        .map(decode_event)
        .collect::<Result<Vec<_>>>()?;

    Ok(CalendarDocument { method, events })
}

fn decode_event(vevent: &ParsedComponent<'_>) -> Result<EncodedEvent> {
    let text = |name: &str| vevent.find_prop(name).map(|p| p.val.to_string());
    let time = |name: &str| {
        vevent
            .find_prop(name)
            .ok_or_else(|| EngineError::Parse(format!("VEVENT without {name}")))
            .and_then(decode_time)
    };

    Ok(EncodedEvent {
        uid: text("UID").unwrap_or_default(),
        summary: text("SUMMARY").unwrap_or_default(),
        start: time("DTSTART")?,
        end: time("DTEND")?,
        status: text("STATUS"),
        recurrence: text("RRULE").map(|r| r.parse()).transpose()?,
    })
}

fn decode_time(prop: &Property<'_>) -> Result<DateTime<Utc>> {
    let invalid = || EngineError::Parse(format!("undecodable {} '{}'", prop.name, prop.val));
    let value = DatePerhapsTime::try_from(prop).map_err(|_| invalid())?;
    match value {
        DatePerhapsTime::Date(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .ok_or_else(invalid),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Ok(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => Ok(naive.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let tz: chrono_tz::Tz = tzid.parse().map_err(|_| invalid())?;
            tz.from_local_datetime(&date_time)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(invalid)
        }
    }
}

/// Every VEVENT, wherever the parser placed it.
fn vevents<'c, 'a>(components: &'c [ParsedComponent<'a>]) -> Vec<&'c ParsedComponent<'a>> {
    let mut found = Vec::new();
    for component in components {
        if component.name == "VEVENT" {
            found.push(component);
        } else {
            found.extend(vevents(&component.components));
        }
    }
    found
}

fn unfold_document(document: &str) -> Result<String> {
    if document.trim().is_empty() {
        return Err(EngineError::Parse("calendar document is empty".to_string()));
    }
    Ok(unfold(document))
}

/// One unfolded content line and where it sits in the component tree.
struct ContentLine<'a> {
    raw: &'a str,
    /// Upper-cased property name (`BEGIN` and `END` included).
    name: String,
    value: &'a str,
    /// Innermost component: the one opened or closed for BEGIN/END lines.
    component: String,
    /// Nesting depth; the VCALENDAR itself is depth 1.
    depth: usize,
}

/// Split an unfolded document into content lines, checking that it is exactly one
/// balanced VCALENDAR.
fn content_lines(unfolded: &str) -> Result<Vec<ContentLine<'_>>> {
    let mut lines = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut calendars = 0;

    for raw in unfolded.lines().filter(|l| !l.trim().is_empty()) {
        let name_end = raw.find([';', ':']).unwrap_or(raw.len());
        let name = raw[..name_end].trim().to_ascii_uppercase();
        let value = raw.split_once(':').map(|(_, v)| v).unwrap_or("");

        match name.as_str() {
            "BEGIN" => {
                let component = value.trim().to_ascii_uppercase();
                if open.is_empty() {
                    if component != "VCALENDAR" || calendars > 0 {
                        return Err(EngineError::Parse(format!(
                            "expected a single VCALENDAR, found BEGIN:{component}"
                        )));
                    }
                    calendars += 1;
                }
                open.push(component.clone());
                lines.push(ContentLine {
                    raw,
                    name,
                    value,
                    component,
                    depth: open.len(),
                });
            }
            "END" => {
                let component = value.trim().to_ascii_uppercase();
                let depth = open.len();
                match open.pop() {
                    Some(current) if current == component => {}
                    current => {
                        return Err(EngineError::Parse(format!(
                            "END:{component} does not close {}",
                            current.as_deref().unwrap_or("anything")
                        )));
                    }
                }
                lines.push(ContentLine {
                    raw,
                    name,
                    value,
                    component,
                    depth,
                });
            }
            _ => {
                let component = open.last().cloned().ok_or_else(|| {
                    EngineError::Parse(format!("content outside VCALENDAR: '{raw}'"))
                })?;
                lines.push(ContentLine {
                    raw,
                    name,
                    value,
                    component,
                    depth: open.len(),
                });
            }
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(EngineError::Parse(format!("unterminated {unclosed}")));
    }
    if calendars == 0 {
        return Err(EngineError::Parse("no VCALENDAR found".to_string()));
    }
    Ok(lines)
}

/// Fold a content line at 75 octets without splitting a UTF-8 sequence.
fn fold_line(line: &str) -> String {
    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            folded.push_str("\r\n ");
            width = 1;
        }
        folded.push(ch);
        width += len;
    }
    folded
}

fn join_lines(lines: &[String]) -> String {
    let mut document = lines.join("\r\n");
    document.push_str("\r\n");
    document
}

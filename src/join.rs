use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::models::{Case, CaseId, CaseWithEvents, Event};

/// Attaches every event to the case sharing its `case_id`.
///
/// Events without a case id, or pointing at a case that was not loaded, are
/// dropped. Cases without events get an empty list.
pub fn join_cases_with_events(cases: &[Case], events: &[Event]) -> Vec<CaseWithEvents> {
    let mut by_case: HashMap<CaseId, Vec<&Event>> = HashMap::new();
    for event in events {
        if let Some(case_id) = event.case_id {
            by_case.entry(case_id).or_default().push(event);
        }
    }

    let known: HashSet<CaseId> = cases.iter().map(|case| case.case_id).collect();
    let dangling = events
        .iter()
        .filter(|event| event.case_id.map_or(true, |id| !known.contains(&id)))
        .count();
    if dangling > 0 {
        warn!(dangling, "events without a matching case were dropped");
    }

    let joined: Vec<CaseWithEvents> = cases
        .iter()
        .map(|case| CaseWithEvents {
            case: case.clone(),
            events: by_case
                .get(&case.case_id)
                .map(|related| related.iter().map(|event| (*event).clone()).collect())
                .unwrap_or_default(),
        })
        .collect();

    debug!(cases = joined.len(), events = events.len(), "joined cases with events");
    joined
}

/// Events recorded against one case, in load order.
pub fn events_for_case(events: &[Event], case_id: CaseId) -> Vec<Event> {
    events
        .iter()
        .filter(|event| event.case_id == Some(case_id))
        .cloned()
        .collect()
}

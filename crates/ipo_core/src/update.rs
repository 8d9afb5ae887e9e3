use crate::{Effect, Msg, PipelineState, RunError, Stage};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not belong to the current stage are ignored, so a stray
/// or repeated completion can never re-trigger a send.
pub fn update(mut state: PipelineState, msg: Msg) -> (PipelineState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start { options, notified } => {
            if state.stage() != Stage::Idle {
                return (state, Vec::new());
            }
            state.begin(options, notified);
            vec![Effect::Fetch]
        }
        Msg::Fetched(result) => {
            if state.stage() != Stage::Fetching {
                return (state, Vec::new());
            }
            match result {
                Ok(markup) => {
                    state.set_stage(Stage::Parsing);
                    vec![Effect::Parse { markup }]
                }
                Err(message) => {
                    state.fail(RunError::Fetch { message });
                    Vec::new()
                }
            }
        }
        Msg::Parsed(result) => {
            if state.stage() != Stage::Parsing {
                return (state, Vec::new());
            }
            match result {
                Ok(listings) => {
                    for rejection in listings.rejected {
                        state.push_error(RunError::Parse {
                            row: rejection.row,
                            reason: rejection.reason,
                        });
                    }
                    if listings.records.is_empty() {
                        state.warn("no valid IPO listings found on the page");
                        state.finish();
                        Vec::new()
                    } else {
                        state.filter(listings.records);
                        state.set_stage(Stage::Notifying);
                        next_delivery(&mut state)
                    }
                }
                Err(message) => {
                    state.fail(RunError::Page { message });
                    Vec::new()
                }
            }
        }
        Msg::Delivered { id, report } => {
            if state.stage() != Stage::Notifying || !state.is_in_flight(&id) {
                return (state, Vec::new());
            }
            let mut effects = Vec::new();
            if let Some(record) = state.apply_delivery(id, report) {
                effects.push(Effect::MarkNotified { record });
            }
            effects.extend(next_delivery(&mut state));
            effects
        }
        Msg::AuthFailed {
            id,
            message,
            report,
        } => {
            if state.stage() != Stage::Notifying || !state.is_in_flight(&id) {
                return (state, Vec::new());
            }
            // Recipients reached before the refusal still count as a send.
            let mut effects = Vec::new();
            if let Some(record) = state.apply_delivery(id, report) {
                effects.push(Effect::MarkNotified { record });
            }
            state.abort_notifying(RunError::Auth { message });
            effects.extend(finish_notifying(&mut state));
            effects
        }
        Msg::StoreFailed { message } => {
            if state.stage().is_terminal() || state.stage() == Stage::Idle {
                return (state, Vec::new());
            }
            state.fail(RunError::Store { message });
            Vec::new()
        }
        Msg::Persisted(result) => {
            if state.stage() != Stage::Persisting {
                return (state, Vec::new());
            }
            match result {
                Ok(()) => state.finish(),
                Err(message) => state.fail(RunError::Store { message }),
            }
            Vec::new()
        }
    };

    (state, effects)
}

fn next_delivery(state: &mut PipelineState) -> Vec<Effect> {
    match state.take_next_pending() {
        Some(record) => vec![Effect::Notify { record }],
        None => finish_notifying(state),
    }
}

fn finish_notifying(state: &mut PipelineState) -> Vec<Effect> {
    if state.has_marked() {
        state.set_stage(Stage::Persisting);
        vec![Effect::PersistHistory]
    } else {
        state.finish();
        Vec::new()
    }
}

//! Input controller: the keystroke-driven state machine.
//!
//! Every action mutates the [`TokenStore`] at its tail (or not at all),
//! re-derives the [`ParseState`] from the tokens, emits the query string to
//! listeners and recomputes suggestions. Multi-select picks are the only state
//! that lives outside the token list until they are confirmed.
use crate::config::ComposerConfig;
use crate::debounce::Fragment;
use crate::options::{LookupRequest, LookupResponse};
use crate::schema::{FilterSchema, OperatorSpec, OptionItem};
use crate::serialize::{serialize, serialize_committed};
use crate::state::{ParseState, Phase, derive_state};
use crate::store::TokenStore;
use crate::suggest::{Suggestion, SuggestionKind, Suggestions, suggest, value_suggestions};
use crate::token::{Bracket, Token};

use crossbeam_channel::Receiver;
use lookup_cancel::LookupEpoch;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type QueryListener = Box<dyn FnMut(&str) + Send>;

/// Discrete UI actions, fed one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// One typed character appended to the raw input.
    Type(char),
    /// The raw input replaced wholesale (paste, programmatic edit).
    SetInput(String),
    Select(usize),
    /// Enter: pick the top suggestion.
    Commit,
    Confirm,
    Cancel,
    Backspace,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// `)` typed while no bracket is open.
    UnbalancedBracket,
    /// The selection does not fit the current phase.
    OutOfPlace,
    /// The selection names nothing in the schema.
    UnknownName,
    NoSuggestion,
}

/// What an action did, and what the host still has to drive.
#[must_use]
#[derive(Debug)]
pub enum Reaction {
    Unchanged,
    Refused(Refusal),
    Applied,
    /// Raw input changed; feed the fragment through the debounce pipeline
    /// and hand it back via [`InputController::on_debounced`].
    Search(Fragment),
    /// Applied, and values must come from an async lookup whose response
    /// goes to [`InputController::apply_lookup`].
    Lookup(LookupRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Completeness {
    Empty,
    Complete,
    /// Brackets left open, or the tail is not a finished clause.
    Incomplete { open_brackets: usize, dangling: bool },
}

pub struct InputController {
    schema: Arc<FilterSchema>,
    config: ComposerConfig,
    store: TokenStore,
    state: ParseState,
    input: String,
    suggestions: Vec<Suggestion>,
    /// Fragment the current suggestion list answers.
    suggested_for: Option<Fragment>,
    loading: bool,
    revision: u64,
    epoch: LookupEpoch,
    query: String,
    listeners: Vec<QueryListener>,
}

impl InputController {
    pub fn new(schema: impl Into<Arc<FilterSchema>>, config: ComposerConfig) -> Self {
        let mut controller = Self {
            schema: schema.into(),
            config,
            store: TokenStore::new(),
            state: ParseState::default(),
            input: String::new(),
            suggestions: Vec::new(),
            suggested_for: None,
            loading: false,
            revision: 0,
            epoch: LookupEpoch::new(),
            query: String::new(),
            listeners: Vec::new(),
        };
        // Start never needs a lookup.
        let _ = controller.refresh();
        controller
    }

    pub fn schema(&self) -> &FilterSchema {
        &self.schema
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn tokens(&self) -> &[Token] {
        self.store.tokens()
    }

    pub fn depth(&self) -> usize {
        self.store.depth()
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Bumped by every token-store mutation and by a cancel that clears the
    /// input, so fragments typed before either are told apart.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The last query string emitted to listeners.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Serialization of every token, including an unfinished tail.
    pub fn full_query(&self) -> String {
        serialize(self.store.tokens())
    }

    pub fn completeness(&self) -> Completeness {
        let Some(tail) = self.store.last() else {
            return Completeness::Empty;
        };
        let open_brackets = self.store.depth();
        let dangling = !tail.ends_clause();
        if open_brackets == 0 && !dangling {
            Completeness::Complete
        } else {
            Completeness::Incomplete {
                open_brackets,
                dangling,
            }
        }
    }

    pub fn on_query_change(&mut self, listener: impl FnMut(&str) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Channel receiving every emitted query string.
    pub fn subscribe(&mut self) -> Receiver<String> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.on_query_change(move |query| {
            let _ = tx.send(query.to_string());
        });
        rx
    }

    pub fn apply(&mut self, action: Action) -> Reaction {
        match action {
            Action::Type(ch) => self.push_char(ch),
            Action::SetInput(text) => self.set_input(text),
            Action::Select(index) => self.select(index),
            Action::Commit => self.commit(),
            Action::Confirm => self.confirm(),
            Action::Cancel => self.cancel(),
            Action::Backspace => self.backspace(),
            Action::Reset => self.reset(),
        }
    }

    pub fn push_char(&mut self, ch: char) -> Reaction {
        let mut text = self.input.clone();
        text.push(ch);
        self.set_input(text)
    }

    /// Handles a new raw input value.
    ///
    /// Brackets and exact operator matches are structural and commit at once;
    /// anything else is forwarded for debounced suggestion lookup.
    pub fn set_input(&mut self, text: impl Into<String>) -> Reaction {
        let text = text.into();
        match text.chars().last() {
            Some('(') => return self.push_bracket(Bracket::Open),
            Some(')') => return self.push_bracket(Bracket::Close),
            _ => {}
        }

        if self.state.phase == Phase::FieldChosen {
            if let Some(op) = self.direct_operator(&text) {
                debug!(symbol = %op.symbol, "operator typed directly");
                return self.commit_operator(op);
            }
        }

        if text == self.input {
            return Reaction::Unchanged;
        }
        self.input = text;
        Reaction::Search(self.fragment())
    }

    /// Deletes one character, or undoes the last logical step when the raw
    /// input is already empty.
    pub fn backspace(&mut self) -> Reaction {
        if self.input.pop().is_some() {
            return Reaction::Search(self.fragment());
        }
        self.undo()
    }

    pub fn select(&mut self, index: usize) -> Reaction {
        match self.suggestions.get(index).cloned() {
            Some(suggestion) => self.choose(&suggestion),
            None => Reaction::Refused(Refusal::NoSuggestion),
        }
    }

    /// Picks the top-ranked suggestion for the current input, computing it
    /// first when the debounced list lags behind.
    pub fn commit(&mut self) -> Reaction {
        if self.suggested_for.as_ref() != Some(&self.fragment()) {
            if let Reaction::Lookup(request) = self.refresh() {
                return Reaction::Lookup(request);
            }
        }
        self.select(0)
    }

    pub fn choose(&mut self, suggestion: &Suggestion) -> Reaction {
        if !accepts(self.state.phase, suggestion.kind) {
            warn!(phase = ?self.state.phase, kind = ?suggestion.kind, "selection out of place");
            return Reaction::Refused(Refusal::OutOfPlace);
        }
        match suggestion.kind {
            SuggestionKind::Field => {
                let Some(field) = self.schema.field(&suggestion.value) else {
                    return Reaction::Refused(Refusal::UnknownName);
                };
                let token = Token::field(field);
                self.push(token)
            }
            SuggestionKind::Operator => {
                let op = self.current_operators().find(|op| op.symbol == suggestion.value);
                match op {
                    Some(op) => self.commit_operator(op),
                    None => Reaction::Refused(Refusal::UnknownName),
                }
            }
            SuggestionKind::Connective => {
                let Some(connective) = self.schema.connective(&suggestion.value) else {
                    return Reaction::Refused(Refusal::UnknownName);
                };
                let token = Token::connective(connective);
                self.push(token)
            }
            SuggestionKind::Value => {
                let item = suggestion.item();
                if self.state.multi_select_active {
                    return self.toggle(item);
                }
                let Some(field) = &self.state.current_field else {
                    return Reaction::Refused(Refusal::OutOfPlace);
                };
                let token = Token::value(&item, field.value_type);
                self.push(token)
            }
        }
    }

    /// Appends the pending multi-select values as `( a , b , ... )`.
    pub fn confirm(&mut self) -> Reaction {
        if !self.state.multi_select_active || self.state.pending_values.is_empty() {
            return Reaction::Unchanged;
        }
        let Some(value_type) = self.state.current_field.as_ref().map(|f| f.value_type) else {
            return Reaction::Unchanged;
        };
        let pending = std::mem::take(&mut self.state.pending_values);
        let mut tokens = Vec::with_capacity(pending.len() * 2 + 1);
        tokens.push(Token::Bracket(Bracket::Open));
        for (index, item) in pending.iter().enumerate() {
            if index > 0 {
                tokens.push(Token::separator());
            }
            tokens.push(Token::value(item, value_type));
        }
        tokens.push(Token::Bracket(Bracket::Close));
        if self.store.push_all(tokens).is_err() {
            return Reaction::Refused(Refusal::UnbalancedBracket);
        }
        self.after_mutation()
    }

    /// Escape. Undoes an in-progress multi-select operator; otherwise closes
    /// the suggestion list and clears the raw input.
    pub fn cancel(&mut self) -> Reaction {
        if self.state.multi_select_active {
            let membership = self.config.membership_operator.as_str();
            if self
                .store
                .last()
                .is_some_and(|token| token.is_operator_symbol(membership))
            {
                self.store.pop();
                return self.after_mutation();
            }
        }
        if self.input.is_empty() && self.suggestions.is_empty() {
            return Reaction::Unchanged;
        }
        // The debounce pipeline never sees the cleared input; a new revision
        // keeps retyped text from matching the fragment it last released.
        self.revision += 1;
        self.input.clear();
        self.suggestions.clear();
        self.suggested_for = None;
        self.epoch.cancel_all();
        self.loading = false;
        Reaction::Applied
    }

    /// Discards the whole predicate.
    pub fn reset(&mut self) -> Reaction {
        info!(tokens = self.store.len(), "predicate reset");
        self.store.clear();
        self.epoch.cancel_all();
        self.loading = false;
        self.after_mutation()
    }

    /// Entry point for fragments coming out of the debounce pipeline.
    /// Fragments typed against an older revision or input are ignored.
    pub fn on_debounced(&mut self, fragment: &Fragment) -> Reaction {
        if fragment.revision != self.revision || fragment.text != self.input {
            debug!(?fragment, "debounced fragment is outdated");
            return Reaction::Unchanged;
        }
        self.refresh()
    }

    pub fn apply_lookup(&mut self, response: LookupResponse) -> Reaction {
        let LookupResponse {
            field,
            search,
            token,
            result,
        } = response;
        if token.is_cancelled() {
            if self.config.discard_stale_lookups {
                info!(%field, %search, version = token.version(), "stale lookup discarded");
                return Reaction::Unchanged;
            }
            debug!(%field, %search, "applying superseded lookup");
        }
        self.loading = false;
        match result {
            Ok(items) => {
                self.suggestions = value_suggestions(&items, &self.state);
                self.suggested_for = Some(Fragment {
                    revision: self.revision,
                    text: search,
                });
            }
            Err(error) => warn!(?error, %field, %search, "option lookup failed"),
        }
        Reaction::Applied
    }

    /// Recomputes suggestions for the current input right away.
    pub fn refresh(&mut self) -> Reaction {
        match suggest(&self.schema, &self.state, &self.input) {
            Suggestions::Ready(list) => {
                self.epoch.cancel_all();
                self.loading = false;
                self.suggestions = list;
                self.suggested_for = Some(self.fragment());
                Reaction::Applied
            }
            Suggestions::Lookup(loader) => {
                let field = self
                    .state
                    .current_field
                    .as_ref()
                    .map(|f| f.name.clone())
                    .unwrap_or_default();
                self.loading = true;
                let token = self.epoch.next();
                debug!(%field, search = %self.input, version = token.version(), "lookup requested");
                Reaction::Lookup(LookupRequest::new(
                    field,
                    self.input.clone(),
                    token,
                    loader,
                ))
            }
        }
    }

    fn fragment(&self) -> Fragment {
        Fragment {
            revision: self.revision,
            text: self.input.clone(),
        }
    }

    fn current_operators(&self) -> impl Iterator<Item = OperatorSpec> + '_ {
        let value_type = self.state.current_field.as_ref().map(|f| f.value_type);
        self.schema
            .operators
            .iter()
            .filter(move |op| value_type.is_some_and(|vt| op.applies_to(vt)))
            .cloned()
    }

    fn direct_operator(&self, typed: &str) -> Option<OperatorSpec> {
        self.current_operators().find(|op| op.matches_typed(typed))
    }

    fn push_bracket(&mut self, bracket: Bracket) -> Reaction {
        if self.store.push(Token::Bracket(bracket)).is_err() {
            warn!("closing bracket refused at depth 0");
            return Reaction::Refused(Refusal::UnbalancedBracket);
        }
        self.after_mutation()
    }

    fn push(&mut self, token: Token) -> Reaction {
        if self.store.push(token).is_err() {
            return Reaction::Refused(Refusal::UnbalancedBracket);
        }
        self.after_mutation()
    }

    fn commit_operator(&mut self, op: OperatorSpec) -> Reaction {
        self.push(Token::operator(&op))
    }

    fn toggle(&mut self, item: OptionItem) -> Reaction {
        let pending = &mut self.state.pending_values;
        match pending.iter().position(|p| *p == item) {
            Some(index) => {
                pending.remove(index);
            }
            None => pending.push(item),
        }
        debug!(pending = self.state.pending_values.len(), "multi-select toggled");

        let free_form = self
            .state
            .current_field
            .as_ref()
            .is_some_and(|f| f.source().is_none());
        if free_form {
            // The echo suggestion has served its purpose.
            self.input.clear();
            return self.refresh();
        }
        for suggestion in &mut self.suggestions {
            suggestion.selected = self.state.pending_values.contains(&suggestion.item());
        }
        Reaction::Applied
    }

    /// Removes the most recent logical step.
    fn undo(&mut self) -> Reaction {
        let Some(token) = self.store.pop() else {
            return Reaction::Unchanged;
        };
        if token.is_close_bracket() {
            let membership = self.config.membership_operator.as_str();
            if let Some(start) = membership_clause_start(self.store.tokens(), membership) {
                // A confirmed `IN (...)` clause goes as one unit.
                self.store.truncate(start);
            }
        }
        self.after_mutation()
    }

    fn after_mutation(&mut self) -> Reaction {
        self.revision += 1;
        self.input.clear();
        self.state = derive_state(
            self.store.tokens(),
            &self.schema,
            &self.config.membership_operator,
        );
        self.emit();
        self.refresh()
    }

    fn emit(&mut self) {
        self.query = serialize_committed(self.store.tokens());
        debug!(query = %self.query, "query emitted");
        for listener in &mut self.listeners {
            listener(&self.query);
        }
    }
}

/// Token kinds each phase takes from the suggestion list.
fn accepts(phase: Phase, kind: SuggestionKind) -> bool {
    match phase {
        Phase::Start => kind == SuggestionKind::Field,
        Phase::FieldChosen => kind == SuggestionKind::Operator,
        Phase::OperatorChosen | Phase::MultiSelect => kind == SuggestionKind::Value,
        Phase::AfterValue => matches!(kind, SuggestionKind::Field | SuggestionKind::Connective),
    }
}

/// After a closing bracket was popped from the tail of `tokens`, returns the
/// index of the membership operator owning that bracket's group, if any.
///
/// The popped bracket is paired with its matching opener rather than with the
/// nearest membership operator, so in `( age IN (1) )` the outer `)` is undone
/// on its own and only the inner one takes the `IN (...)` clause with it.
fn membership_clause_start(tokens: &[Token], membership: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut open = None;
    for (index, token) in tokens.iter().enumerate().rev() {
        match token {
            Token::Bracket(Bracket::Close) => depth += 1,
            Token::Bracket(Bracket::Open) if depth == 0 => {
                open = Some(index);
                break;
            }
            Token::Bracket(Bracket::Open) => depth -= 1,
            _ => {}
        }
    }
    let operator = open?.checked_sub(1)?;
    tokens[operator]
        .is_operator_symbol(membership)
        .then_some(operator)
}

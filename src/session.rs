//! Tokio driver around [`InputController`].
//!
//! Actions are applied synchronously on the caller's task. Raw input
//! fragments go through the debounce pipeline, async lookups run on spawned
//! tasks, and both come back through a single driver loop that owns the
//! order in which they touch the controller.
use crate::config::ComposerConfig;
use crate::controller::{Action, Completeness, InputController, Reaction, Refusal};
use crate::debounce::{Fragment, debounced};
use crate::options::LookupResponse;
use crate::schema::FilterSchema;
use crate::state::Phase;
use crate::suggest::Suggestion;
use crate::token::Token;

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::{
    sync::{
        mpsc::{self, UnboundedSender},
        watch,
    },
    task::JoinHandle,
};
use tracing::debug;

/// Everything a view needs to render the builder.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tokens: Vec<Token>,
    pub suggestions: Vec<Suggestion>,
    pub input: String,
    pub query: String,
    pub loading: bool,
    pub depth: usize,
    pub phase: Phase,
    pub completeness: Completeness,
}

pub struct FilterSession {
    controller: Arc<Mutex<InputController>>,
    fragment_tx: UnboundedSender<Fragment>,
    lookup_tx: UnboundedSender<LookupResponse>,
    query_rx: watch::Receiver<String>,
    driver: JoinHandle<()>,
}

impl FilterSession {
    /// Must be called inside a tokio runtime.
    pub fn spawn(schema: impl Into<Arc<FilterSchema>>, config: ComposerConfig) -> Self {
        let delay = config.debounce();
        let mut controller = InputController::new(schema, config);
        let (query_tx, query_rx) = watch::channel(controller.query().to_string());
        controller.on_query_change(move |query| {
            let _ = query_tx.send(query.to_string());
        });
        let controller = Arc::new(Mutex::new(controller));

        let (fragment_tx, fragment_rx) = mpsc::unbounded_channel();
        let mut debounced_rx = debounced(fragment_rx, delay);
        let (lookup_tx, mut lookup_rx) = mpsc::unbounded_channel::<LookupResponse>();

        let driver = tokio::spawn({
            let controller = controller.clone();
            let lookup_tx = lookup_tx.clone();
            async move {
                loop {
                    tokio::select! {
                        fragment = debounced_rx.recv() => {
                            let Some(fragment) = fragment else { break };
                            let reaction = controller.lock().on_debounced(&fragment);
                            spawn_lookup(reaction, &lookup_tx);
                        }
                        response = lookup_rx.recv() => {
                            let Some(response) = response else { break };
                            let _ = controller.lock().apply_lookup(response);
                        }
                    }
                }
                debug!("session driver stopped");
            }
        });

        Self {
            controller,
            fragment_tx,
            lookup_tx,
            query_rx,
            driver,
        }
    }

    pub fn dispatch(&self, action: Action) -> Result<(), Refusal> {
        let reaction = self.controller.lock().apply(action);
        match reaction {
            Reaction::Refused(refusal) => return Err(refusal),
            Reaction::Search(fragment) => {
                let _ = self.fragment_tx.send(fragment);
            }
            other => spawn_lookup(other, &self.lookup_tx),
        }
        Ok(())
    }

    /// Watch channel carrying the latest emitted query string.
    pub fn query_updates(&self) -> watch::Receiver<String> {
        self.query_rx.clone()
    }

    pub fn query(&self) -> String {
        self.query_rx.borrow().clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let controller = self.controller.lock();
        Snapshot {
            tokens: controller.tokens().to_vec(),
            suggestions: controller.suggestions().to_vec(),
            input: controller.input().to_string(),
            query: controller.query().to_string(),
            loading: controller.is_loading(),
            depth: controller.depth(),
            phase: controller.phase(),
            completeness: controller.completeness(),
        }
    }
}

impl Drop for FilterSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

fn spawn_lookup(reaction: Reaction, lookup_tx: &UnboundedSender<LookupResponse>) {
    let Reaction::Lookup(request) = reaction else {
        return;
    };
    let lookup_tx = lookup_tx.clone();
    tokio::spawn(async move {
        let _ = lookup_tx.send(request.run().await);
    });
}

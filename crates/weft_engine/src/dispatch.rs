//! Action dispatch: named handlers, tuple publishing, and observers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use weft_foundation::{Error, Result, Value};
use weft_spaces::XupleManager;
use weft_storage::{Fact, Token};

use crate::expr::{Bindings, evaluate};
use crate::program::ActionSpec;

/// One rule firing as reported to observers.
#[derive(Clone, Debug)]
pub struct Firing {
    /// The rule that fired.
    pub rule: Arc<str>,
    /// The action name (handler name, or target space for publishes).
    pub action: Arc<str>,
    /// Evaluated arguments (field values for publishes).
    pub args: Vec<Value>,
    /// The complete token that triggered the firing.
    pub token: Token,
    /// The failure, if the action could not be carried out. The match
    /// state that triggered the firing is never rolled back.
    pub error: Option<String>,
}

impl Firing {
    /// Returns true if the action completed without error.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A caller-registered action implementation.
pub trait ActionHandler: Send + Sync {
    /// Invoked once per firing with the evaluated arguments.
    ///
    /// # Errors
    ///
    /// Returns an error to report the firing as failed.
    fn invoke(&self, args: &[Value]) -> Result<()>;
}

impl<F> ActionHandler for F
where
    F: Fn(&[Value]) -> Result<()> + Send + Sync,
{
    fn invoke(&self, args: &[Value]) -> Result<()> {
        self(args)
    }
}

/// Synchronous per-firing notification.
pub trait ActionObserver: Send + Sync {
    /// Called once per firing, after the action ran (or failed).
    fn on_action(&self, firing: &Firing);
}

/// An [`ActionObserver`] that records every firing; useful for tests and
/// introspection.
#[derive(Default)]
pub struct RecordingObserver {
    firings: RwLock<Vec<Firing>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded firings.
    #[must_use]
    pub fn firings(&self) -> Vec<Firing> {
        self.firings.read().clone()
    }

    /// Returns the number of recorded firings.
    #[must_use]
    pub fn count(&self) -> usize {
        self.firings.read().len()
    }
}

impl ActionObserver for RecordingObserver {
    fn on_action(&self, firing: &Firing) {
        self.firings.write().push(firing.clone());
    }
}

/// Routes terminal-node firings to handlers or xuple-spaces and notifies
/// observers.
///
/// Owned by the network; the xuple manager is an injected context object,
/// so its lifecycle stays tied to the owning program.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<Arc<str>, Arc<dyn ActionHandler>>>,
    observers: RwLock<Vec<Arc<dyn ActionObserver>>>,
    spaces: Option<Arc<XupleManager>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no xuple-space sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the xuple manager publishes go to.
    #[must_use]
    pub fn with_spaces(mut self, spaces: Arc<XupleManager>) -> Self {
        self.spaces = Some(spaces);
        self
    }

    /// Registers a named action handler, replacing any previous one.
    pub fn register_handler(&self, name: impl Into<Arc<str>>, handler: Arc<dyn ActionHandler>) {
        self.handlers.write().insert(name.into(), handler);
    }

    /// Registers an observer notified synchronously on every firing.
    pub fn register_observer(&self, observer: Arc<dyn ActionObserver>) {
        self.observers.write().push(observer);
    }

    /// Carries out one firing: evaluates arguments, runs the action, and
    /// notifies observers exactly once, success or failure.
    ///
    /// # Errors
    ///
    /// Returns the evaluation or action error; match state is untouched.
    pub fn dispatch(&self, rule: &Arc<str>, spec: &ActionSpec, token: &Token) -> Result<()> {
        let action: Arc<str> = spec.name().into();
        let bindings = Bindings::Token(token);

        let result = self.run_action(spec, token, &bindings);
        let (args, error) = match &result {
            Ok(args) => (args.clone(), None),
            Err(err) => (Vec::new(), Some(err.to_string())),
        };

        if let Some(message) = &error {
            warn!(rule = %rule, action = %action, error = %message, "action failed");
        } else {
            debug!(rule = %rule, action = %action, "action fired");
        }

        let firing = Firing {
            rule: rule.clone(),
            action,
            args,
            token: token.clone(),
            error,
        };
        for observer in self.observers.read().iter() {
            observer.on_action(&firing);
        }

        result.map(|_| ())
    }

    fn run_action(
        &self,
        spec: &ActionSpec,
        token: &Token,
        bindings: &Bindings<'_>,
    ) -> Result<Vec<Value>> {
        match spec {
            ActionSpec::Invoke { name, args } => {
                let handler = self
                    .handlers
                    .read()
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::unknown_action(name.as_ref()))?;

                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(evaluate(arg, bindings)?);
                }

                handler.invoke(&evaluated)?;
                Ok(evaluated)
            }
            ActionSpec::Publish {
                space,
                fact_type,
                fields,
            } => {
                let Some(spaces) = &self.spaces else {
                    return Err(Error::internal(
                        "publish action fired with no xuple manager attached",
                    ));
                };

                let mut evaluated = Vec::with_capacity(fields.len());
                let mut fact = Fact::new(fact_type.clone());
                for (name, template) in fields {
                    let value = evaluate(template, bindings)?;
                    evaluated.push(value.clone());
                    fact = fact.with_field(name.clone(), value);
                }

                // One xuple per firing, with the firing's facts as provenance.
                spaces.publish(space, Arc::new(fact), token.facts().to_vec())?;
                Ok(evaluated)
            }
        }
    }
}

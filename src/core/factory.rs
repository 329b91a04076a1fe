//! Action bodies and the pluggable kind-to-factory map.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, error};

use super::{ActionDescription, AppResult, MaintenanceError, MaintenanceResult};

/// Executable logic behind one maintenance action.
///
/// The scheduler guarantees `execute` is called at most once per action and
/// never concurrently. Errors are captured into the action's `Failed` state;
/// they never reach the submitter of an asynchronous action.
///
/// # Example
///
/// ```rust,ignore
/// struct DropCollection;
///
/// impl ActionBody for DropCollection {
///     fn execute(&mut self, description: &ActionDescription) -> AppResult<()> {
///         let collection = description
///             .get(COLLECTION)
///             .ok_or_else(|| anyhow::anyhow!("collection missing"))?;
///         storage::drop_collection(collection)?;
///         Ok(())
///     }
/// }
/// ```
pub trait ActionBody: Send {
    /// Run the action to completion on the current thread.
    ///
    /// # Errors
    ///
    /// Any error marks the action `Failed` with the error's text.
    fn execute(&mut self, description: &ActionDescription) -> AppResult<()>;
}

/// Constructor for one action kind. May reject the description's parameters.
pub type ActionConstructor =
    Box<dyn Fn(&ActionDescription) -> AppResult<Box<dyn ActionBody>> + Send + Sync>;

/// Registry of action kinds, filled at startup.
#[derive(Default)]
pub struct ActionFactory {
    kinds: HashMap<String, ActionConstructor>,
}

impl ActionFactory {
    /// Empty factory: every name is unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with the built-in kinds (`noop`) registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register(NoopAction::NAME, |description| {
            Ok(Box::new(NoopAction::from_description(description)?))
        });
        factory
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&ActionDescription) -> AppResult<Box<dyn ActionBody>> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(kind = %name, "registered maintenance action kind");
        self.kinds.insert(name, Box::new(constructor));
        self
    }

    /// Builder-style [`ActionFactory::register`].
    #[must_use]
    pub fn with_kind<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&ActionDescription) -> AppResult<Box<dyn ActionBody>> + Send + Sync + 'static,
    {
        self.register(name, constructor);
        self
    }

    /// Whether `name` resolves to a kind.
    #[must_use]
    pub fn knows(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Registered kind names, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve the description's kind and build its body.
    ///
    /// # Errors
    ///
    /// - `MaintenanceError::UnknownActionKind` if no constructor is registered
    /// - `MaintenanceError::InvalidParameter` if the constructor rejects the
    ///   description
    pub fn create(&self, description: &ActionDescription) -> MaintenanceResult<Box<dyn ActionBody>> {
        let name = description.name();
        let Some(constructor) = self.kinds.get(name) else {
            error!(kind = %name, "unknown maintenance action kind");
            return Err(MaintenanceError::UnknownActionKind(name.to_string()));
        };
        constructor(description).map_err(|e| {
            error!(kind = %name, error = %e, "action constructor rejected parameters");
            MaintenanceError::InvalidParameter(format!("{name}: {e:#}"))
        })
    }
}

impl fmt::Debug for ActionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionFactory")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Built-in action that does nothing, optionally after a pause.
///
/// Honours an optional `sleep-ms` parameter, which lets callers hold an
/// action in `Executing` for a while.
#[derive(Debug, Default, Clone)]
pub struct NoopAction {
    pause: Option<Duration>,
}

impl NoopAction {
    /// Kind name.
    pub const NAME: &'static str = "noop";
    /// Optional pause parameter, in milliseconds.
    pub const SLEEP_MS: &'static str = "sleep-ms";

    /// Build from a description, validating `sleep-ms` if present.
    ///
    /// # Errors
    ///
    /// Fails if `sleep-ms` is not an unsigned integer.
    pub fn from_description(description: &ActionDescription) -> AppResult<Self> {
        let pause = description
            .get(Self::SLEEP_MS)
            .map(|ms| {
                ms.parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| anyhow::anyhow!("invalid {}: {ms:?} ({e})", Self::SLEEP_MS))
            })
            .transpose()?;
        Ok(Self { pause })
    }
}

impl ActionBody for NoopAction {
    fn execute(&mut self, _description: &ActionDescription) -> AppResult<()> {
        if let Some(pause) = self.pause {
            std::thread::sleep(pause);
        }
        Ok(())
    }
}

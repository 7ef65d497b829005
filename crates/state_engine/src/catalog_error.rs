// ---------------------------------------------------------------------------
// CatalogError: why a state catalog could not be built or loaded
// ---------------------------------------------------------------------------

use std::fmt;

/// Build-time failures of [`StateRegistry::build`](crate::registry::StateRegistry::build).
///
/// Any of these is fatal to startup: the engine cannot run on a catalog that
/// is empty, ambiguous, or contains states that can never activate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog contains no states.
    Empty,
    /// More states than the engine supports.
    TooManyStates { count: usize, max: usize },
    /// A definition has an empty name.
    EmptyName { index: usize },
    /// Two definitions share a name.
    DuplicateName(String),
    /// A relation list names a state that is not in the catalog.
    UnknownReference { state: String, reference: String },
    /// A state lists itself in one of its relation lists.
    SelfReference { state: String },
    /// `substate_of` forms a cycle, so no state on it can ever activate.
    SubstateCycle(Vec<String>),
    /// A state is both a substate of and blocked by the same state.
    Unsatisfiable { state: String, other: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "State catalog is empty"),
            CatalogError::TooManyStates { count, max } => {
                write!(f, "State catalog has {count} states, at most {max} are supported")
            }
            CatalogError::EmptyName { index } => {
                write!(f, "State definition at position {index} has an empty name")
            }
            CatalogError::DuplicateName(name) => write!(f, "Duplicate state name: {name}"),
            CatalogError::UnknownReference { state, reference } => {
                write!(f, "State '{state}' references unknown state '{reference}'")
            }
            CatalogError::SelfReference { state } => {
                write!(f, "State '{state}' references itself")
            }
            CatalogError::SubstateCycle(cycle) => {
                write!(f, "Substate cycle: {}", cycle.join(" -> "))
            }
            CatalogError::Unsatisfiable { state, other } => write!(
                f,
                "State '{state}' is both a substate of and blocked by '{other}'"
            ),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Failures reading a serialized catalog from disk or a string.
#[derive(Debug)]
pub enum CatalogLoadError {
    /// I/O error reading the catalog file.
    Io(std::io::Error),
    /// The file is not a valid JSON catalog.
    Parse(serde_json::Error),
    /// The catalog parsed but did not validate.
    Invalid(CatalogError),
}

impl fmt::Display for CatalogLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogLoadError::Io(e) => write!(f, "I/O error: {e}"),
            CatalogLoadError::Parse(e) => write!(f, "Catalog parse error: {e}"),
            CatalogLoadError::Invalid(e) => write!(f, "Invalid catalog: {e}"),
        }
    }
}

impl std::error::Error for CatalogLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogLoadError::Io(e) => Some(e),
            CatalogLoadError::Parse(e) => Some(e),
            CatalogLoadError::Invalid(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for CatalogLoadError {
    fn from(e: std::io::Error) -> Self {
        CatalogLoadError::Io(e)
    }
}

impl From<serde_json::Error> for CatalogLoadError {
    fn from(e: serde_json::Error) -> Self {
        CatalogLoadError::Parse(e)
    }
}

impl From<CatalogError> for CatalogLoadError {
    fn from(e: CatalogError) -> Self {
        CatalogLoadError::Invalid(e)
    }
}

/// A state name lookup found nothing in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown state: {}", self.0)
    }
}

impl std::error::Error for UnknownState {}

use std::path::PathBuf;

/// Failures of unification and inference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("type mismatch: {expected} vs {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("recursive unification: {var} occurs in {ty}")]
    RecursiveUnification { var: String, ty: String },
    #[error("undefined symbol '{0}'")]
    UndefinedSymbol(String),
}

/// Failures of typeclass declaration, registration and lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassError {
    #[error("no instance of {class} for {ty}")]
    MissingInstance { class: String, ty: String },
    #[error("cannot make {ty} an instance of {class}: missing {dependency} instance")]
    MissingDependency {
        class: String,
        dependency: String,
        ty: String,
    },
    #[error("{ty} is already an instance of {class}")]
    DuplicateInstance { class: String, ty: String },
    #[error("instance {class} {ty} is missing method '{method}'")]
    IncompleteInstance {
        class: String,
        ty: String,
        method: String,
    },
    #[error("class {class} has no method '{method}'")]
    UnknownMethod { class: String, method: String },
    #[error("unknown class #{0}")]
    UnknownClass(u32),
    #[error("class {0} is already declared")]
    DuplicateClass(String),
    #[error("class {class} cannot derive an instance for {ty}")]
    NotDerivable { class: String, ty: String },
    #[error("typeclass registry is sealed")]
    Sealed,
}

/// Failures surfaced at a typed-function or dispatch call site.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Class(#[from] ClassError),
    #[error("arity mismatch: expected {expected} argument(s), got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("attempted to call a non-function: {0}")]
    NotCallable(String),
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

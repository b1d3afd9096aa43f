//! Runtime Hindley-Milner inference and typeclass dispatch over dynamically typed values.

pub mod classes;
pub mod config;
pub mod engine;
pub mod error;
pub mod infer;
pub mod prelude;
pub mod typed_fn;
pub mod typeof_bridge;
pub mod types;
pub mod values;

pub use classes::{ClassDecl, ClassId, MethodRecord, Registry, Typeclass};
pub use config::{read_engine_toml, EngineConfig, TraceConfig, TypedFnConfig};
pub use engine::Engine;
pub use error::{ClassError, ConfigError, RuntimeError, TypeError};
pub use infer::{
    analyze, fresh, is_generic, occurs_in, occurs_in_type, unify, Expr, Ident, NonGeneric,
    TypeEnv,
};
pub use prelude::Prelude;
pub use typed_fn::{CallOutcome, Signature, TypedFunc};
pub use typeof_bridge::{type_con_of, type_of};
pub use types::{prune, Type, TypeCon, TypeId, TypeVar, VarSupply};
pub use values::{AdtDecl, AdtValue, Describe, Value, VariantDecl};

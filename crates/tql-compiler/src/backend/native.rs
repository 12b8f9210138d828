//! Native representations of logical types.
//!
//! The backend needs a concrete layout for each type it materializes: the
//! attribute order of tuple values and the arity of function values. Layouts
//! are memoized per compiler instance so structurally equal types share one
//! instance.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::types::{BaseType, ScalarKind};

/// Layout of tuple values: attribute names sorted by name and the native
/// type of each field. Tuple values built by any compilation agree on it.
#[derive(Debug, PartialEq)]
pub struct TupleLayout {
    pub names: Arc<[String]>,
    pub fields: Vec<Arc<NativeType>>,
}

#[derive(Debug, PartialEq)]
pub enum NativeType {
    Void,
    Scalar(ScalarKind),
    List(Arc<NativeType>),
    Set(Arc<NativeType>),
    Optional(Arc<NativeType>),
    Tuple(TupleLayout),
    Function { arity: usize },
    /// Erased type parameter.
    Any,
}

impl NativeType {
    pub fn tuple_layout(&self) -> Option<&TupleLayout> {
        match self {
            NativeType::Tuple(layout) => Some(layout),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct NativeCache {
    entries: FxHashMap<BaseType, Arc<NativeType>>,
}

impl NativeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The native representation of `ty`, created on first request.
    pub fn get(&mut self, ty: &BaseType) -> Arc<NativeType> {
        if let Some(native) = self.entries.get(ty) {
            return Arc::clone(native);
        }
        let native = Arc::new(match ty {
            BaseType::Void => NativeType::Void,
            BaseType::Scalar(kind) => NativeType::Scalar(*kind),
            BaseType::List(of) => NativeType::List(self.get(of)),
            BaseType::Set(of) => NativeType::Set(self.get(of)),
            BaseType::Optional(of) => NativeType::Optional(self.get(of)),
            BaseType::Tuple(tuple) => {
                let mut attributes: Vec<_> = tuple.attributes().collect();
                attributes.sort_by(|a, b| a.0.cmp(b.0));
                let names: Vec<String> = attributes.iter().map(|(name, _)| name.to_string()).collect();
                let fields = attributes.iter().map(|(_, ty)| self.get(ty)).collect();
                NativeType::Tuple(TupleLayout {
                    names: names.into(),
                    fields,
                })
            }
            BaseType::Function(function) => NativeType::Function {
                arity: function.parameters.len(),
            },
            BaseType::Generic(_) => NativeType::Any,
        });
        self.entries.insert(ty.clone(), Arc::clone(&native));
        native
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

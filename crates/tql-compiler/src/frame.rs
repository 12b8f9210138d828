//! Lexical scopes.
//!
//! Frames live in an arena and point at their parent by id. Resolution walks
//! from a frame towards the root and takes the first match, so inner frames
//! shadow outer ones. Every successful resolution is recorded in a reverse
//! reference log (symbol to the spans that referred to it).

use rustc_hash::FxHashMap;
use tql_core::{CompilerError, Name, Span};

/// Handle to a frame in [`Scopes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u32);

/// Handle to a symbol in [`Scopes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

/// Index into the compiler's member table.
pub type MemberId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A module from the catalog; the payload indexes the catalog listing.
    Module(usize),
    /// A value: variable, parameter, constant or function.
    Value,
    /// A typedef.
    Type,
    /// A member of a script-declared module, compiled on demand.
    Member(MemberId),
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: Name,
    pub kind: SymbolKind,
    pub span: Span,
}

#[derive(Debug, Default)]
struct Frame {
    parent: Option<FrameId>,
    symbols: FxHashMap<Name, SymbolId>,
}

#[derive(Debug, Default)]
pub struct Scopes {
    frames: Vec<Frame>,
    symbols: Vec<Symbol>,
    references: FxHashMap<SymbolId, Vec<Span>>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame with no parent.
    pub fn root(&mut self) -> FrameId {
        self.push(None)
    }

    pub fn child(&mut self, parent: FrameId) -> FrameId {
        self.push(Some(parent))
    }

    fn push(&mut self, parent: Option<FrameId>) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(Frame {
            parent,
            symbols: FxHashMap::default(),
        });
        id
    }

    pub fn parent(&self, frame: FrameId) -> Option<FrameId> {
        self.frames[frame.0 as usize].parent
    }

    /// Declare `name` in `frame`. Fails with `DuplicateName` if the frame
    /// already declares it; outer frames are not consulted.
    pub fn add(&mut self, frame: FrameId, name: Name, kind: SymbolKind, span: Span) -> Result<SymbolId, CompilerError> {
        let frame_symbols = &mut self.frames[frame.0 as usize].symbols;
        if frame_symbols.contains_key(&name) {
            return Err(CompilerError::duplicate_name(span, &name));
        }
        let id = SymbolId(self.symbols.len() as u32);
        frame_symbols.insert(name.clone(), id);
        self.symbols.push(Symbol { name, kind, span });
        Ok(id)
    }

    /// Look `name` up through the frame chain without logging a reference.
    pub fn lookup(&self, frame: FrameId, name: &Name) -> Option<SymbolId> {
        let mut current = Some(frame);
        while let Some(id) = current {
            let frame = &self.frames[id.0 as usize];
            if let Some(symbol) = frame.symbols.get(name) {
                return Some(*symbol);
            }
            current = frame.parent;
        }
        None
    }

    /// Resolve `name` from `frame`, logging the reference.
    pub fn resolve(&mut self, frame: FrameId, name: &Name, span: Span) -> Result<SymbolId, CompilerError> {
        let id = self
            .lookup(frame, name)
            .ok_or_else(|| CompilerError::identifier_not_found(span, name))?;
        self.references.entry(id).or_default().push(span);
        Ok(id)
    }

    /// Resolve `name` and require its symbol kind to satisfy `accept`;
    /// otherwise fail with `IncorrectTypeReferenced` naming `expected`.
    pub fn resolve_kind(
        &mut self,
        frame: FrameId,
        name: &Name,
        span: Span,
        expected: &str,
        accept: impl Fn(SymbolKind) -> bool,
    ) -> Result<SymbolId, CompilerError> {
        let id = self.resolve(frame, name, span)?;
        if accept(self.symbol(id).kind) {
            Ok(id)
        } else {
            Err(CompilerError::incorrect_type_referenced(span, name, expected))
        }
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    /// Spans that resolved to `id`, in resolution order.
    pub fn references(&self, id: SymbolId) -> &[Span] {
        self.references.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tql_core::CompilerErrorKind;

    fn n(s: &str) -> Name {
        Name::parse(s)
    }

    #[test]
    fn resolve_walks_to_root() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        let inner = scopes.child(root);
        let id = scopes.add(root, n("x"), SymbolKind::Value, Span::default()).unwrap();
        assert_eq!(scopes.resolve(inner, &n("x"), Span::point(4, 2)).unwrap(), id);
        assert_eq!(scopes.references(id), &[Span::point(4, 2)]);
    }

    #[test]
    fn inner_frame_shadows() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        let inner = scopes.child(root);
        let outer_x = scopes.add(root, n("x"), SymbolKind::Value, Span::default()).unwrap();
        let inner_x = scopes.add(inner, n("x"), SymbolKind::Value, Span::default()).unwrap();
        assert_eq!(scopes.lookup(inner, &n("x")), Some(inner_x));
        assert_eq!(scopes.lookup(root, &n("x")), Some(outer_x));
    }

    #[test]
    fn duplicate_in_same_frame() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.add(root, n("x"), SymbolKind::Value, Span::default()).unwrap();
        let err = scopes.add(root, n("x"), SymbolKind::Type, Span::default()).unwrap_err();
        assert_eq!(err.kind, CompilerErrorKind::DuplicateName);
    }

    #[test]
    fn missing_and_wrong_kind() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.add(root, n("T"), SymbolKind::Type, Span::default()).unwrap();
        let err = scopes.resolve(root, &n("y"), Span::default()).unwrap_err();
        assert_eq!(err.kind, CompilerErrorKind::IdentifierNotFound);
        let err = scopes
            .resolve_kind(root, &n("T"), Span::default(), "module", |k| matches!(k, SymbolKind::Module(_)))
            .unwrap_err();
        assert_eq!(err.kind, CompilerErrorKind::IncorrectTypeReferenced);
    }

    #[test]
    fn qualified_names_are_distinct_keys() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.add(root, n("System.ToList"), SymbolKind::Value, Span::default()).unwrap();
        assert!(scopes.lookup(root, &n("ToList")).is_none());
        assert!(scopes.lookup(root, &n("System.ToList")).is_some());
    }
}

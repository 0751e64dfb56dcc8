//! Structural descriptions of marshallable types and their process-wide cache
use core::any::{type_name, Any, TypeId};
use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::trace;

use crate::{Error, Marshal, Result};

/// Type-erased shared accessor of a record's field
pub type FieldGetter = Arc<dyn for<'a> Fn(&'a (dyn Any + 'static)) -> Option<&'a (dyn Marshal + 'static)> + Send + Sync>;
/// Type-erased exclusive accessor of a record's field
pub type FieldSetter = Arc<dyn for<'a> Fn(&'a mut (dyn Any + 'static)) -> Option<&'a mut (dyn Marshal + 'static)> + Send + Sync>;

pub(crate) fn getter<F>(f: F) -> FieldGetter
    where F: for<'a> Fn(&'a (dyn Any + 'static)) -> Option<&'a (dyn Marshal + 'static)> + Send + Sync + 'static
{
    Arc::new(f)
}

pub(crate) fn setter<F>(f: F) -> FieldSetter
    where F: for<'a> Fn(&'a mut (dyn Any + 'static)) -> Option<&'a mut (dyn Marshal + 'static)> + Send + Sync + 'static
{
    Arc::new(f)
}

/// Shared accessor of the record an embedded field hoists fields out of
pub(crate) type EmbedGetter = Arc<dyn for<'a> Fn(&'a (dyn Any + 'static)) -> Option<&'a (dyn Any + 'static)> + Send + Sync>;
/// Exclusive accessor of the record an embedded field hoists fields out of
pub(crate) type EmbedSetter = Arc<dyn for<'a> Fn(&'a mut (dyn Any + 'static)) -> Option<&'a mut (dyn Any + 'static)> + Send + Sync>;

pub(crate) fn embed_getter<F>(f: F) -> EmbedGetter
    where F: for<'a> Fn(&'a (dyn Any + 'static)) -> Option<&'a (dyn Any + 'static)> + Send + Sync + 'static
{
    Arc::new(f)
}

pub(crate) fn embed_setter<F>(f: F) -> EmbedSetter
    where F: for<'a> Fn(&'a mut (dyn Any + 'static)) -> Option<&'a mut (dyn Any + 'static)> + Send + Sync + 'static
{
    Arc::new(f)
}

/// Width and signedness of an integer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    I8, I16, I32, I64, Isize,
    U8, U16, U32, U64, Usize,
}

/// Width of a floating point type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    F32, F64,
}

/// The structural shape of a type, resolved once and cached by [`Registry`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum TypeDescriptor {
    Unit,
    Bool,
    Int(IntKind),
    Float(FloatKind),
    Char,
    Str,
    /// A value that may be absent, absence maps to `null`
    Optional(TypeRef),
    /// A sequence of elements, a sequence of `u8` is a binary blob
    Seq(TypeRef),
    /// A string-keyed map
    Map { key: TypeRef, value: TypeRef },
    Record(RecordDescriptor),
    /// An arbitrary [`Value`](ser_marshal::Value) passed through as is
    Dynamic,
    /// A type without a JSON mapping, encoding it fails
    Unsupported(&'static str),
}

impl TypeDescriptor {
    /// Return `true` for a byte sized element, sequences of which are blobs
    pub fn is_byte(&self) -> bool {
        matches!(self, TypeDescriptor::Int(IntKind::U8))
    }

    pub fn as_record(&self) -> Option<&RecordDescriptor> {
        match self {
            TypeDescriptor::Record(record) => Some(record),
            _ => None
        }
    }
}

/// A lazy reference to another type's descriptor.
///
/// Element and field types are referenced instead of being resolved in
/// place, so self-referencing types through `Box`, `Option` or `Vec` are
/// fine.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: fn() -> TypeId,
    name: fn() -> &'static str,
    describe: fn(&mut Resolver<'_>) -> Result<TypeDescriptor>,
}

impl TypeRef {
    pub fn of<T: Marshal>() -> Self {
        TypeRef {
            id: TypeId::of::<T>,
            name: type_name::<T>,
            describe: <T as Marshal>::describe,
        }
    }

    pub fn id(&self) -> TypeId {
        (self.id)()
    }

    pub fn name(&self) -> &'static str {
        (self.name)()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.name()).finish()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// How a record's field takes part in marshalling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Encoded and decoded under its JSON name
    Regular,
    /// An embedded record, its fields are listed right after it as if
    /// they were declared on the parent
    Embedded,
    /// Private or tagged `-`, never marshalled
    Skipped,
}

/// A field of a flattened record.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    path: Vec<&'static str>,
    kind: FieldKind,
    options: Vec<&'static str>,
    ty: TypeRef,
    get: FieldGetter,
    get_mut: FieldSetter,
}

impl FieldDescriptor {
    pub(crate) fn new(
        name: String,
        ident: &'static str,
        kind: FieldKind,
        options: Vec<&'static str>,
        ty: TypeRef,
        get: FieldGetter,
        get_mut: FieldSetter
    ) -> Self {
        FieldDescriptor { name, path: vec![ident], kind, options, ty, get, get_mut }
    }

    /// Re-root this field of an embedded record onto the embedding record
    pub(crate) fn embedded_in(
        &self,
        ident: &'static str,
        outer_get: &EmbedGetter,
        outer_get_mut: &EmbedSetter
    ) -> Self {
        let (outer, inner) = (outer_get.clone(), self.get.clone());
        let get = getter(move |record| outer(record).and_then(|embedded| inner(embedded)));
        let (outer, inner) = (outer_get_mut.clone(), self.get_mut.clone());
        let get_mut = setter(move |record| outer(record).and_then(|embedded| inner(embedded)));
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.push(ident);
        path.extend_from_slice(&self.path);
        FieldDescriptor {
            name: self.name.clone(),
            path,
            kind: self.kind,
            options: self.options.clone(),
            ty: self.ty,
            get,
            get_mut,
        }
    }

    /// The JSON object key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The Rust identifier of the field
    pub fn ident(&self) -> &'static str {
        self.path.last().copied().unwrap_or_default()
    }

    /// Identifiers leading from the described record down to the field
    pub fn path(&self) -> &[&'static str] {
        &self.path
    }

    /// Embedding depth, `0` for fields declared on the record itself
    pub fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Tag options following the name, recorded but without effect
    pub fn options(&self) -> &[&'static str] {
        &self.options
    }

    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    /// Borrow the field of `record`, `None` if `record` is not the described type
    pub fn get<'a>(&self, record: &'a (dyn Any + 'static)) -> Option<&'a (dyn Marshal + 'static)> {
        (self.get)(record)
    }

    pub fn get_mut<'a>(&self, record: &'a mut (dyn Any + 'static)) -> Option<&'a mut (dyn Marshal + 'static)> {
        (self.get_mut)(record)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("ty", &self.ty)
            .finish()
    }
}

/// Flattened field list of a record, embedded records expanded in place
/// and name collisions already resolved.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    id: TypeId,
    name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub(crate) fn new(id: TypeId, name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        RecordDescriptor { id, name, fields }
    }

    /// Identity of the record type, a `Box` of the record shares it
    /// together with the rest of the descriptor
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields which are marshalled, in output order
    pub fn regular_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.kind == FieldKind::Regular)
    }

    /// Look up a marshalled field by its JSON name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.regular_fields().find(|field| field.name == name)
    }
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Cache of resolved type descriptors.
///
/// Safe to share between threads, the first descriptor stored for a type
/// is the one every caller sees.
#[derive(Default)]
pub struct Registry {
    cache: RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Return the descriptor of `T`, describing it on the first request
    pub fn resolve<T: Marshal>(&self) -> Result<Arc<TypeDescriptor>> {
        Resolver::new(self).resolve::<T>()
    }

    pub fn resolve_ref(&self, ty: TypeRef) -> Result<Arc<TypeDescriptor>> {
        Resolver::new(self).resolve_ref(ty)
    }

    /// Return the cached descriptor of a type without resolving it
    pub fn get(&self, id: TypeId) -> Option<Arc<TypeDescriptor>> {
        self.cache.read().get(&id).cloned()
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    fn insert(&self, id: TypeId, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        self.cache.write()
            .entry(id)
            .or_insert_with(|| Arc::new(descriptor))
            .clone()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("len", &self.len()).finish()
    }
}

/// A single resolution pass over a [`Registry`].
///
/// Keeps the chain of types being described, so a type embedding itself,
/// directly or not, is reported as [`Error::CyclicType`] instead of
/// recursing forever.
pub struct Resolver<'a> {
    registry: &'a Registry,
    stack: Vec<(TypeId, &'static str)>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Resolver { registry, stack: Vec::new() }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn resolve<T: Marshal>(&mut self) -> Result<Arc<TypeDescriptor>> {
        self.resolve_ref(TypeRef::of::<T>())
    }

    pub fn resolve_ref(&mut self, ty: TypeRef) -> Result<Arc<TypeDescriptor>> {
        let id = ty.id();
        if let Some(descriptor) = self.registry.get(id) {
            return Ok(descriptor)
        }
        if let Some(pos) = self.stack.iter().position(|&(seen, _)| seen == id) {
            let chain: Vec<&str> = self.stack[pos..].iter()
                .map(|&(_, name)| name)
                .chain([ty.name()])
                .collect();
            return Err(Error::CyclicType(chain.join(" -> ")))
        }
        trace!(ty = ty.name(), "describing type");
        self.stack.push((id, ty.name()));
        let res = (ty.describe)(self);
        self.stack.pop();
        Ok(self.registry.insert(id, res?))
    }
}

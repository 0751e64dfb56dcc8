//! Records: named-field types marshalled as JSON objects
use core::any::{type_name, TypeId};
use core::marker::PhantomData;
use std::collections::hash_map::{Entry, HashMap};
use std::collections::HashSet;

use tracing::debug;

use crate::descriptor::{
    embed_getter, embed_setter, getter, setter,
    EmbedGetter, EmbedSetter, FieldDescriptor, FieldGetter, FieldKind, FieldSetter,
    RecordDescriptor, Resolver, TypeDescriptor, TypeRef
};
use crate::{Marshal, Result};

/// A type with named fields, encoded as an object.
///
/// Implement it with the [`record!`](crate::record!) macro which also
/// implements [`Marshal`]. Manual implementations forward
/// [`Marshal::describe`] to [`describe`], [`Marshal::encode`] to
/// [`Encoder::encode_record`](crate::Encoder::encode_record) and
/// [`Marshal::decode`] to [`Decoder::decode_record`](crate::Decoder::decode_record).
pub trait Record: Marshal + Sized {
    /// Declare the fields in declaration order
    fn fields(fields: &mut Fields<Self>);
}

/// Field declarations of a record `R`.
pub struct Fields<R> {
    defs: Vec<FieldDef>,
    _record: PhantomData<fn(&R)>,
}

/// A single field declaration, see [`Fields::field`].
pub struct FieldDef {
    ident: &'static str,
    tag: Option<&'static str>,
    private: bool,
    embed: bool,
    ty: TypeRef,
    get: FieldGetter,
    get_mut: FieldSetter,
    embedded: EmbedGetter,
    embedded_mut: EmbedSetter,
}

impl<R: Record> Fields<R> {
    fn new() -> Self {
        Fields { defs: Vec::new(), _record: PhantomData }
    }

    /// Declare a field by its identifier and accessors
    pub fn field<F: Marshal>(
        &mut self,
        ident: &'static str,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F
    ) -> &mut FieldDef {
        let ident = ident.strip_prefix("r#").unwrap_or(ident);
        self.defs.push(FieldDef {
            ident,
            tag: None,
            private: false,
            embed: false,
            ty: TypeRef::of::<F>(),
            get: getter(move |record| record.downcast_ref::<R>()
                .map(|r| get(r) as &(dyn Marshal + 'static))),
            get_mut: setter(move |record| record.downcast_mut::<R>()
                .map(|r| get_mut(r) as &mut (dyn Marshal + 'static))),
            embedded: embed_getter(move |record| record.downcast_ref::<R>()
                .map(|r| F::embedded(get(r)))),
            embedded_mut: embed_setter(move |record| record.downcast_mut::<R>()
                .map(|r| F::embedded_mut(get_mut(r)))),
        });
        let last = self.defs.len() - 1;
        &mut self.defs[last]
    }
}

impl FieldDef {
    /// Set the tag, `"name,option,..."`
    pub fn tag(&mut self, tag: &'static str) -> &mut Self {
        self.tag = Some(tag);
        self
    }

    /// Exclude the field from marshalling
    pub fn private(&mut self) -> &mut Self {
        self.private = true;
        self
    }

    /// Flatten the fields of a record typed field, or a boxed one, into the parent
    pub fn embed(&mut self) -> &mut Self {
        self.embed = true;
        self
    }
}

/// Implement [`Record`] and [`Marshal`] for a struct with named fields.
///
/// Each listed field may carry a tag after `=` and the flags `#[embed]`
/// and `#[private]`:
///
/// ```
/// use ser_marshal_json::record;
///
/// #[derive(Default)]
/// struct Header { id: u32 }
/// record!(Header { id = "ID" });
///
/// #[derive(Default)]
/// struct Message {
///     header: Header,
///     body: String,
///     secret: String,
/// }
/// record!(Message { #[embed] header, body = "body,omitempty", #[private] secret });
///
/// let msg = Message { header: Header { id: 7 }, body: "hi".into(), secret: "x".into() };
/// let json = ser_marshal_json::encode(&msg).unwrap();
/// assert_eq!(json, br#"{"ID":7,"body":"hi"}"#);
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ty { $( $(#[$flag:ident])* $field:ident $(= $tag:literal)? ),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn fields(fields: &mut $crate::record::Fields<Self>) {
                $(
                    fields.field(stringify!($field), |r| &r.$field, |r| &mut r.$field)
                        $(.tag($tag))?
                        $(.$flag())*;
                )*
            }
        }

        impl $crate::Marshal for $ty {
            fn describe(resolver: &mut $crate::Resolver<'_>) -> $crate::Result<$crate::TypeDescriptor> {
                $crate::record::describe::<Self>(resolver)
            }

            fn encode(&self, encoder: &mut $crate::Encoder<'_>) -> $crate::Result<$crate::Value> {
                encoder.encode_record(self)
            }

            fn decode(&mut self, value: &$crate::Value, decoder: &mut $crate::Decoder<'_>) -> $crate::Result<bool> {
                decoder.decode_record(self, value)
            }
        }
    };
}

/// Describe a record, flattening embedded records and resolving name
/// collisions: the shallowest field wins, a tie goes to the one declared
/// first.
pub fn describe<R: Record>(resolver: &mut Resolver<'_>) -> Result<TypeDescriptor> {
    let mut fields = Fields::<R>::new();
    R::fields(&mut fields);
    let mut flat = Vec::with_capacity(fields.defs.len());
    for def in fields.defs {
        expand(def, resolver, &mut flat)?;
    }
    let flat = dominant_fields(flat);
    debug!(record = type_name::<R>(), fields = flat.len(), "record described");
    Ok(TypeDescriptor::Record(RecordDescriptor::new(TypeId::of::<R>(), type_name::<R>(), flat)))
}

fn expand(def: FieldDef, resolver: &mut Resolver<'_>, out: &mut Vec<FieldDescriptor>) -> Result<()> {
    let FieldDef { ident, tag, private, embed, ty, get, get_mut, embedded, embedded_mut } = def;
    let tag = tag.unwrap_or_default();
    let (tag_name, options) = parse_tag(tag);
    let field = |name: &str, kind| FieldDescriptor::new(
        name.to_owned(), ident, kind, options.clone(), ty, get.clone(), get_mut.clone());

    if private || tag == "-" {
        out.push(field(ident, FieldKind::Skipped));
        return Ok(())
    }
    // an explicitly named embedded record is a regular nested object
    if embed && tag_name.is_empty() {
        let descriptor = resolver.resolve_ref(ty)?;
        if let Some(record) = descriptor.as_record() {
            out.push(field(ident, FieldKind::Embedded));
            out.extend(record.fields().iter()
                .map(|inner| inner.embedded_in(ident, &embedded, &embedded_mut)));
            return Ok(())
        }
    }
    let name = match tag_name {
        "" => ident,
        name if is_valid_tag(name) => name,
        name => {
            debug!(field = ident, tag = name, "invalid tag name, using the field identifier");
            ident
        }
    };
    out.push(field(name, FieldKind::Regular));
    Ok(())
}

fn dominant_fields(fields: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    // name -> (depth, index)
    let mut winners: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, field) in fields.iter().enumerate() {
        if field.kind() != FieldKind::Regular {
            continue
        }
        match winners.entry(field.name()) {
            Entry::Occupied(mut entry) => if field.depth() < entry.get().0 {
                entry.insert((field.depth(), index));
            }
            Entry::Vacant(entry) => {
                entry.insert((field.depth(), index));
            }
        }
    }
    let keep: HashSet<usize> = winners.into_values().map(|(_, index)| index).collect();
    fields.into_iter().enumerate()
        .filter_map(|(index, field)| {
            if field.kind() == FieldKind::Regular && !keep.contains(&index) {
                debug!(field = ?field.path(), name = field.name(), "field shadowed by another of the same name");
                return None
            }
            Some(field)
        })
        .collect()
}

/// Split a tag into the name and the options
pub(crate) fn parse_tag(tag: &str) -> (&str, Vec<&str>) {
    match tag.split_once(',') {
        Some((name, options)) => (name, options.split(',').filter(|o| !o.is_empty()).collect()),
        None => (tag, Vec::new())
    }
}

/// Punctuation is allowed except quotes, backslash and comma
pub(crate) fn is_valid_tag(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c|
        "!#$%&()*+-./:;<=>?@[]^_{|}~ ".contains(c) || c.is_alphanumeric())
}

//! Slot Registry
//!
//! The closed, versioned set of dispatch slots the engine knows how to
//! patch. Each entry says where the slot lives (inline in the type, or in one
//! of the per-category tables the type points to) and which stand-in
//! replaces it.
//!
//! # Design
//! - Fixed static table, immutable for the life of the process
//! - Lookup is an exact-match linear scan; no locking needed
//! - Adding a slot means adding one entry below

use bitflags::bitflags;

use super::stand_in::{Arity, Signature};
use crate::config::HostVersion;

/// Secondary per-category operation tables reached through the type.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Category {
    Number,
    Sequence,
    Mapping,
    Async,
    Buffer,
}

impl Category {
    /// Human-readable table name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
            Self::Async => "async",
            Self::Buffer => "buffer",
        }
    }
}

/// Where a slot is stored relative to the type descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Placement {
    /// Directly in the type descriptor.
    Inline,
    /// In the category table the type descriptor points to.
    Table(Category),
}

bitflags! {
    /// Groups of slots, by protocol.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Protocols: u8 {
        const OBJECT = 1 << 0;
        const NUMBER = 1 << 1;
        const SEQUENCE = 1 << 2;
        const MAPPING = 1 << 3;
        const ASYNC = 1 << 4;
        const BUFFER = 1 << 5;
    }
}

impl Placement {
    /// Protocol group this placement belongs to.
    pub const fn protocol(self) -> Protocols {
        match self {
            Self::Inline => Protocols::OBJECT,
            Self::Table(Category::Number) => Protocols::NUMBER,
            Self::Table(Category::Sequence) => Protocols::SEQUENCE,
            Self::Table(Category::Mapping) => Protocols::MAPPING,
            Self::Table(Category::Async) => Protocols::ASYNC,
            Self::Table(Category::Buffer) => Protocols::BUFFER,
        }
    }
}

/// Static description of one patchable dispatch slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SlotDescriptor {
    /// Field name in the host object model; unique key.
    pub name: &'static str,
    /// Where the field lives.
    pub placement: Placement,
    /// Calling signature the host uses for this slot.
    pub signature: Signature,
    /// First host version exposing this slot.
    pub since: HostVersion,
}

impl SlotDescriptor {
    const fn new(name: &'static str, placement: Placement, signature: Signature) -> Self {
        Self {
            name,
            placement,
            signature,
            since: HostVersion::new(3, 0),
        }
    }

    const fn since(mut self, major: u8, minor: u8) -> Self {
        self.since = HostVersion::new(major, minor);
        self
    }
}

const O1: Signature = Signature::object(Arity::One);
const O2: Signature = Signature::object(Arity::Two);
const O3: Signature = Signature::object(Arity::Three);
const O4: Signature = Signature::object(Arity::Four);
const S1: Signature = Signature::status(Arity::One);
const S2: Signature = Signature::status(Arity::Two);
const S3: Signature = Signature::status(Arity::Three);
const Z1: Signature = Signature::size(Arity::One);

const fn inline(name: &'static str, signature: Signature) -> SlotDescriptor {
    SlotDescriptor::new(name, Placement::Inline, signature)
}

const fn number(name: &'static str, signature: Signature) -> SlotDescriptor {
    SlotDescriptor::new(name, Placement::Table(Category::Number), signature)
}

const fn sequence(name: &'static str, signature: Signature) -> SlotDescriptor {
    SlotDescriptor::new(name, Placement::Table(Category::Sequence), signature)
}

const fn mapping(name: &'static str, signature: Signature) -> SlotDescriptor {
    SlotDescriptor::new(name, Placement::Table(Category::Mapping), signature)
}

const fn asynchronous(name: &'static str, signature: Signature) -> SlotDescriptor {
    SlotDescriptor::new(name, Placement::Table(Category::Async), signature)
}

const fn buffer(name: &'static str, signature: Signature) -> SlotDescriptor {
    SlotDescriptor::new(name, Placement::Table(Category::Buffer), signature)
}

/// Every slot known to the engine, in host declaration order.
static SLOTS: &[SlotDescriptor] = &[
    inline("tp_getattr", O2),
    inline("tp_setattr", S3),
    inline("tp_repr", O1),
    inline("tp_hash", Z1),
    inline("tp_call", O3),
    inline("tp_str", O1),
    inline("tp_getattro", O2),
    inline("tp_setattro", S3),
    inline("tp_richcompare", O3),
    inline("tp_iter", O1),
    inline("tp_iternext", O1),
    inline("tp_descr_get", O3),
    inline("tp_descr_set", S3),
    inline("tp_init", S3),
    inline("tp_alloc", O2),
    inline("tp_new", O3),
    inline("tp_vectorcall", O4).since(3, 8),
    number("nb_add", O2),
    number("nb_subtract", O2),
    number("nb_multiply", O2),
    number("nb_remainder", O2),
    number("nb_divmod", O2),
    number("nb_power", O3),
    number("nb_negative", O1),
    number("nb_positive", O1),
    number("nb_absolute", O1),
    number("nb_bool", S1),
    number("nb_invert", O1),
    number("nb_lshift", O2),
    number("nb_rshift", O2),
    number("nb_and", O2),
    number("nb_xor", O2),
    number("nb_or", O2),
    number("nb_int", O1),
    number("nb_float", O1),
    number("nb_inplace_add", O2),
    number("nb_inplace_subtract", O2),
    number("nb_inplace_multiply", O2),
    number("nb_inplace_remainder", O2),
    number("nb_inplace_power", O3),
    number("nb_inplace_lshift", O2),
    number("nb_inplace_rshift", O2),
    number("nb_inplace_and", O2),
    number("nb_inplace_xor", O2),
    number("nb_inplace_or", O2),
    number("nb_floor_divide", O2),
    number("nb_true_divide", O2),
    number("nb_inplace_floor_divide", O2),
    number("nb_inplace_true_divide", O2),
    number("nb_index", O1),
    number("nb_matrix_multiply", O2).since(3, 5),
    number("nb_inplace_matrix_multiply", O2).since(3, 5),
    sequence("sq_length", Z1),
    sequence("sq_concat", O2),
    sequence("sq_repeat", O2),
    sequence("sq_item", O2),
    sequence("sq_ass_item", S3),
    sequence("sq_contains", S2),
    sequence("sq_inplace_concat", O2),
    sequence("sq_inplace_repeat", O2),
    mapping("mp_length", Z1),
    mapping("mp_subscript", O2),
    mapping("mp_ass_subscript", S3),
    asynchronous("am_await", O1).since(3, 5),
    asynchronous("am_aiter", O1).since(3, 5),
    asynchronous("am_anext", O1).since(3, 5),
    asynchronous("am_send", S3).since(3, 10),
    buffer("bf_getbuffer", S3),
];

/// View of the slot table for one host version.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SlotRegistry {
    host: HostVersion,
}

impl SlotRegistry {
    /// Registry exposing the slots available on `host`.
    pub const fn new(host: HostVersion) -> Self {
        Self { host }
    }

    /// Host version this registry was built for.
    #[inline]
    pub const fn host(&self) -> HostVersion {
        self.host
    }

    /// Look up a slot by exact name.
    pub fn resolve(&self, name: &str) -> Option<&'static SlotDescriptor> {
        self.iter().find(|slot| slot.name == name)
    }

    /// All slots available on this host, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &'static SlotDescriptor> {
        let host = self.host;
        SLOTS.iter().filter(move |slot| slot.since <= host)
    }

    /// Slots belonging to any of `protocols`.
    pub fn in_protocols(
        &self,
        protocols: Protocols,
    ) -> impl Iterator<Item = &'static SlotDescriptor> {
        self.iter()
            .filter(move |slot| protocols.intersects(slot.placement.protocol()))
    }

    /// Number of slots available on this host.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check whether no slot is available on this host.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new(HostVersion::LATEST)
    }
}

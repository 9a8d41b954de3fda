//! Toy host runtime used by the integration tests.
//!
//! Objects are boxed integers; types expose every registry slot as a
//! `SlotCell`, grouped into inline slots and per-category tables the way a
//! real host lays them out.

#![allow(dead_code)]

use std::cell::Cell;
use std::ffi::{c_int, c_void};
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use slotlock::slot::{set_raise_hook, Entry};
use slotlock::{Category, NativeFunction, Placement, SlotCell, SlotRegistry, SlotTable, TypeSlots};

pub type Word = *mut c_void;

thread_local! {
    static RAISED: Cell<Option<&'static str>> = const { Cell::new(None) };
}

fn record_raise(message: &'static str) {
    RAISED.with(|r| r.set(Some(message)));
}

/// Take the "not implemented" error raised on this thread, if any.
pub fn take_raised() -> Option<&'static str> {
    RAISED.with(|r| r.take())
}

/// Wire the engine's stand-ins to this host's error indicator.
pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
    set_raise_hook(record_raise);
    take_raised();
}

#[repr(C)]
pub struct IntObject {
    pub value: i64,
}

pub static ADD_CALLS: AtomicUsize = AtomicUsize::new(0);

fn int_ref<'a>(word: Word) -> &'a IntObject {
    // SAFETY: the toy host only ever passes pointers to live IntObjects.
    unsafe { &*(word as *const IntObject) }
}

pub extern "C" fn int_add(a: Word, b: Word) -> Word {
    ADD_CALLS.fetch_add(1, Ordering::SeqCst);
    let sum = int_ref(a).value + int_ref(b).value;
    Box::into_raw(Box::new(IntObject { value: sum })) as Word
}

pub extern "C" fn int_bool(a: Word) -> c_int {
    (int_ref(a).value != 0) as c_int
}

pub extern "C" fn int_hash(a: Word) -> isize {
    int_ref(a).value as isize
}

pub extern "C" fn int_repr(a: Word) -> Word {
    int_add(a, a)
}

/// Per-slot markers giving every cell a distinct, recognizable original value.
static MARKERS: [u8; 128] = [0; 128];

pub fn marker(index: usize) -> Entry {
    &MARKERS[index] as *const u8 as Entry
}

pub struct ToyTable {
    category: Category,
    cells: Vec<(&'static str, SlotCell)>,
}

impl SlotTable for ToyTable {
    fn slot(&self, name: &str) -> Option<&SlotCell> {
        self.cells.iter().find(|(n, _)| *n == name).map(|(_, c)| c)
    }
}

pub struct ToyType {
    inline: Vec<(&'static str, SlotCell)>,
    tables: Vec<ToyTable>,
}

impl ToyType {
    /// A type exposing every slot of `registry`, each holding its own marker.
    pub fn full(registry: &SlotRegistry) -> Self {
        let mut ty = Self {
            inline: Vec::new(),
            tables: Vec::new(),
        };
        for (index, slot) in registry.iter().enumerate() {
            let cell = SlotCell::new(marker(index));
            match slot.placement {
                Placement::Inline => ty.inline.push((slot.name, cell)),
                Placement::Table(category) => ty.table_mut(category).cells.push((slot.name, cell)),
            }
        }
        ty
    }

    /// A type with working integer operations.
    pub fn int(registry: &SlotRegistry) -> Self {
        let ty = Self::full(registry);
        ty.cell("nb_add").store(int_add as Entry);
        ty.cell("nb_bool").store(int_bool as Entry);
        ty.cell("tp_hash").store(int_hash as Entry);
        ty.cell("tp_repr").store(int_repr as Entry);
        ty
    }

    /// A type without any category tables.
    pub fn bare() -> Self {
        Self {
            inline: vec![("tp_repr", SlotCell::new(int_repr as Entry))],
            tables: Vec::new(),
        }
    }

    fn table_mut(&mut self, category: Category) -> &mut ToyTable {
        let index = match self.tables.iter().position(|t| t.category == category) {
            Some(index) => index,
            None => {
                self.tables.push(ToyTable {
                    category,
                    cells: Vec::new(),
                });
                self.tables.len() - 1
            }
        };
        &mut self.tables[index]
    }

    /// Host-side lookup of any slot by name.
    pub fn cell(&self, name: &str) -> &SlotCell {
        self.inline
            .iter()
            .chain(self.tables.iter().flat_map(|t| t.cells.iter()))
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c)
            .unwrap_or_else(|| panic!("toy type has no slot {name}"))
    }

    /// Current value of every slot, in a stable order.
    pub fn snapshot(&self) -> Vec<(&'static str, Entry)> {
        self.inline
            .iter()
            .chain(self.tables.iter().flat_map(|t| t.cells.iter()))
            .map(|(n, c)| (*n, c.load()))
            .collect()
    }

    /// Run the host's `a + b`.
    pub fn add(&self, a: &IntObject, b: &IntObject) -> Result<i64, &'static str> {
        // SAFETY: nb_add holds either int_add or the two-argument object stand-in.
        let f: extern "C" fn(Word, Word) -> Word = unsafe { mem::transmute(self.cell("nb_add").load()) };
        let result = f(a as *const _ as Word, b as *const _ as Word);
        if result.is_null() {
            return Err(take_raised().expect("null result without a raised error"));
        }
        // SAFETY: int_add returns a freshly boxed IntObject.
        let boxed = unsafe { Box::from_raw(result as *mut IntObject) };
        Ok(boxed.value)
    }

    /// Run the host's truth test.
    pub fn truth(&self, a: &IntObject) -> Result<bool, &'static str> {
        // SAFETY: nb_bool holds either int_bool or the one-argument status stand-in.
        let f: extern "C" fn(Word) -> c_int = unsafe { mem::transmute(self.cell("nb_bool").load()) };
        match f(a as *const _ as Word) {
            -1 => Err(take_raised().expect("-1 without a raised error")),
            v => Ok(v != 0),
        }
    }

    /// Run the host's hash.
    pub fn hash(&self, a: &IntObject) -> Result<isize, &'static str> {
        // SAFETY: tp_hash holds either int_hash or the one-argument size stand-in.
        let f: extern "C" fn(Word) -> isize = unsafe { mem::transmute(self.cell("tp_hash").load()) };
        match f(a as *const _ as Word) {
            -1 => Err(take_raised().expect("-1 without a raised error")),
            v => Ok(v),
        }
    }
}

impl TypeSlots for ToyType {
    fn inline_slot(&self, name: &str) -> Option<&SlotCell> {
        self.inline.iter().find(|(n, _)| *n == name).map(|(_, c)| c)
    }

    fn table(&self, category: Category) -> Option<&dyn SlotTable> {
        self.tables
            .iter()
            .find(|t| t.category == category)
            .map(|t| t as &dyn SlotTable)
    }
}

pub extern "C" fn builtin_len(_module: Word, args: Word) -> Word {
    int_add(args, args)
}

/// A native function object with a (self, args) entry point.
pub struct ToyFunction {
    entry: SlotCell,
}

impl ToyFunction {
    pub fn new() -> Self {
        Self {
            entry: SlotCell::new(builtin_len as Entry),
        }
    }

    pub fn entry_value(&self) -> Entry {
        self.entry.load()
    }

    pub fn call(&self, arg: &IntObject) -> Result<i64, &'static str> {
        // SAFETY: the entry is builtin_len or the two-argument object stand-in.
        let f: extern "C" fn(Word, Word) -> Word = unsafe { mem::transmute(self.entry.load()) };
        let result = f(std::ptr::null_mut(), arg as *const _ as Word);
        if result.is_null() {
            return Err(take_raised().expect("null result without a raised error"));
        }
        // SAFETY: builtin_len returns a freshly boxed IntObject.
        Ok(unsafe { Box::from_raw(result as *mut IntObject) }.value)
    }
}

impl NativeFunction for ToyFunction {
    fn entry(&self) -> &SlotCell {
        &self.entry
    }
}

//! Values manipulated by the engine.
//!
//! Primitive items (`Integer`, `ByteArray`, `Boolean`) behave as values.
//! `Array`, `Struct` and `Map` are shared handles: cloning the item clones the
//! handle, and a mutation through one stack slot is visible through every
//! other slot holding the same container. `Struct` keeps value semantics
//! anyway by being compared deeply and copied whenever it is stored into
//! another container.

use crate::types::bytes::Bytes;
use crate::virtual_machine::errors::VmError;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

pub type ArrayRef = Rc<RefCell<ItemList>>;
pub type MapRef = Rc<RefCell<OrderedMap>>;

#[derive(Clone)]
pub enum StackItem {
    Integer(BigInt),
    ByteArray(Bytes),
    Boolean(bool),
    Array(ArrayRef),
    Struct(ArrayRef),
    Map(MapRef),
    /// Opaque collaborator-owned object.
    InteropInterface(Rc<dyn Any>),
}

impl StackItem {
    pub fn new_array(items: Vec<StackItem>) -> Self {
        StackItem::Array(Rc::new(RefCell::new(ItemList(items))))
    }

    pub fn new_struct(items: Vec<StackItem>) -> Self {
        StackItem::Struct(Rc::new(RefCell::new(ItemList(items))))
    }

    pub fn new_map() -> Self {
        StackItem::Map(Rc::new(RefCell::new(OrderedMap::default())))
    }

    pub fn new_interop<T: Any>(value: T) -> Self {
        StackItem::InteropInterface(Rc::new(value))
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            StackItem::Integer(_) => "Integer",
            StackItem::ByteArray(_) => "ByteArray",
            StackItem::Boolean(_) => "Boolean",
            StackItem::Array(_) => "Array",
            StackItem::Struct(_) => "Struct",
            StackItem::Map(_) => "Map",
            StackItem::InteropInterface(_) => "InteropInterface",
        }
    }

    /// Integers, byte arrays and booleans.
    pub const fn is_primitive(&self) -> bool {
        matches!(
            self,
            StackItem::Integer(_) | StackItem::ByteArray(_) | StackItem::Boolean(_)
        )
    }

    pub const fn is_container(&self) -> bool {
        matches!(
            self,
            StackItem::Array(_) | StackItem::Struct(_) | StackItem::Map(_)
        )
    }

    /// Truthiness. Defined for every variant.
    pub fn to_bool(&self) -> bool {
        match self {
            StackItem::Integer(v) => !v.is_zero(),
            StackItem::ByteArray(bytes) => bytes.iter().any(|&b| b != 0),
            StackItem::Boolean(b) => *b,
            StackItem::Array(_)
            | StackItem::Struct(_)
            | StackItem::Map(_)
            | StackItem::InteropInterface(_) => true,
        }
    }

    /// Numeric value. Byte arrays decode as little-endian two's complement.
    pub fn to_integer(&self) -> Result<BigInt, VmError> {
        match self {
            StackItem::Integer(v) => Ok(v.clone()),
            StackItem::ByteArray(bytes) => Ok(bytes_to_integer(bytes)),
            StackItem::Boolean(b) => Ok(if *b { BigInt::one() } else { BigInt::zero() }),
            other => Err(other.coercion_error("Integer")),
        }
    }

    /// Byte representation of a primitive item.
    pub fn to_bytes(&self) -> Result<Bytes, VmError> {
        match self {
            StackItem::Integer(v) => Ok(Bytes::new(integer_to_bytes(v))),
            StackItem::ByteArray(bytes) => Ok(bytes.clone()),
            StackItem::Boolean(true) => Ok(Bytes::from(&[1u8])),
            StackItem::Boolean(false) => Ok(Bytes::default()),
            other => Err(other.coercion_error("ByteArray")),
        }
    }

    /// Elements of an `Array` or `Struct`.
    pub fn as_array(&self) -> Result<&ArrayRef, VmError> {
        match self {
            StackItem::Array(items) | StackItem::Struct(items) => Ok(items),
            other => Err(other.coercion_error("Array")),
        }
    }

    pub fn as_map(&self) -> Result<&MapRef, VmError> {
        match self {
            StackItem::Map(map) => Ok(map),
            other => Err(other.coercion_error("Map")),
        }
    }

    /// Downcasts an interop handle to the collaborator type it wraps.
    pub fn as_interop<T: Any>(&self) -> Option<&T> {
        match self {
            StackItem::InteropInterface(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    fn coercion_error(&self, to: &'static str) -> VmError {
        VmError::TypeCoercion {
            from: self.type_name(),
            to,
        }
    }

    /// Protocol equality.
    ///
    /// Primitives compare by value, falling back to their byte form when the
    /// variants differ. Structs compare element-wise. Arrays, maps and interop
    /// handles compare by identity.
    pub fn equals(&self, other: &StackItem) -> bool {
        match (self, other) {
            (StackItem::Integer(a), StackItem::Integer(b)) => a == b,
            (StackItem::ByteArray(a), StackItem::ByteArray(b)) => a == b,
            (StackItem::Boolean(a), StackItem::Boolean(b)) => a == b,
            (StackItem::Struct(a), StackItem::Struct(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (StackItem::Array(a), StackItem::Array(b)) => Rc::ptr_eq(a, b),
            (StackItem::Map(a), StackItem::Map(b)) => Rc::ptr_eq(a, b),
            (StackItem::InteropInterface(a), StackItem::InteropInterface(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (a, b) if a.is_primitive() && b.is_primitive() => {
                match (a.to_bytes(), b.to_bytes()) {
                    (Ok(x), Ok(y)) => x == y,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Copy used when a struct is stored into a container: nested structs
    /// are copied, every other item is shared.
    pub fn clone_struct(&self) -> StackItem {
        match self {
            StackItem::Struct(items) => StackItem::new_struct(
                items.borrow().iter().map(StackItem::clone_struct).collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Counts `roots` and every item reachable through their containers.
///
/// Each container is entered once, so shared and cyclic containers are
/// finite. Counting stops as soon as the total passes `limit`.
pub fn count_reachable<'a>(roots: impl IntoIterator<Item = &'a StackItem>, limit: usize) -> usize {
    fn note(item: &StackItem, count: &mut usize, pending: &mut Vec<StackItem>) {
        *count += 1;
        if item.is_container() {
            pending.push(item.clone());
        }
    }

    let mut count = 0;
    let mut pending = Vec::new();
    for root in roots {
        note(root, &mut count, &mut pending);
        if count > limit {
            return count;
        }
    }

    let mut entered: HashSet<*const ()> = HashSet::new();
    while let Some(container) = pending.pop() {
        match &container {
            StackItem::Array(items) | StackItem::Struct(items) => {
                if entered.insert(Rc::as_ptr(items).cast()) {
                    for child in items.borrow().iter() {
                        note(child, &mut count, &mut pending);
                    }
                }
            }
            StackItem::Map(map) => {
                if entered.insert(Rc::as_ptr(map).cast()) {
                    let map = map.borrow();
                    for child in map.keys().chain(map.values()) {
                        note(child, &mut count, &mut pending);
                    }
                }
            }
            _ => {}
        }
        if count > limit {
            return count;
        }
    }
    count
}

/// Drops items without recursing into nested containers. Containers still
/// shared elsewhere only lose a reference.
fn release(mut pending: Vec<StackItem>) {
    while let Some(item) = pending.pop() {
        match item {
            StackItem::Array(items) | StackItem::Struct(items) => {
                if let Ok(cell) = Rc::try_unwrap(items) {
                    pending.append(&mut cell.into_inner().0);
                }
            }
            StackItem::Map(map) => {
                if let Ok(cell) = Rc::try_unwrap(map) {
                    for (key, value) in std::mem::take(&mut cell.into_inner().entries) {
                        pending.push(key);
                        pending.push(value);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Elements of an `Array` or `Struct`.
///
/// Dropping a list tears nested containers down iteratively, so the depth
/// of a nesting never reaches the native stack.
#[derive(Default)]
pub struct ItemList(Vec<StackItem>);

impl Deref for ItemList {
    type Target = Vec<StackItem>;

    fn deref(&self) -> &Vec<StackItem> {
        &self.0
    }
}

impl DerefMut for ItemList {
    fn deref_mut(&mut self) -> &mut Vec<StackItem> {
        &mut self.0
    }
}

impl Drop for ItemList {
    fn drop(&mut self) {
        release(std::mem::take(&mut self.0));
    }
}

/// Minimal little-endian two's complement; zero is the empty buffer.
pub fn integer_to_bytes(v: &BigInt) -> Vec<u8> {
    if v.is_zero() {
        Vec::new()
    } else {
        v.to_signed_bytes_le()
    }
}

pub fn bytes_to_integer(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        BigInt::zero()
    } else {
        BigInt::from_signed_bytes_le(bytes)
    }
}

/// Byte length of the integer's minimal encoding.
pub fn integer_size(v: &BigInt) -> usize {
    if v.is_zero() {
        0
    } else {
        // bits() counts the magnitude; one more bit holds the sign.
        let bits = v.bits() as usize;
        let exact = v.is_negative() && v.magnitude().count_ones() == 1;
        if exact { bits.div_ceil(8) } else { (bits + 1).div_ceil(8) }
    }
}

impl PartialEq for StackItem {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for StackItem {
    /// Containers print their length only; arrays may contain themselves.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackItem::Integer(v) => write!(f, "Integer({v})"),
            StackItem::ByteArray(bytes) => write!(f, "ByteArray({bytes:?})"),
            StackItem::Boolean(b) => write!(f, "Boolean({b})"),
            StackItem::Array(items) => write!(f, "Array(len={})", items.borrow().len()),
            StackItem::Struct(items) => write!(f, "Struct(len={})", items.borrow().len()),
            StackItem::Map(map) => write!(f, "Map(len={})", map.borrow().len()),
            StackItem::InteropInterface(_) => write!(f, "InteropInterface"),
        }
    }
}

impl From<BigInt> for StackItem {
    fn from(v: BigInt) -> Self {
        StackItem::Integer(v)
    }
}

impl From<i64> for StackItem {
    fn from(v: i64) -> Self {
        StackItem::Integer(BigInt::from(v))
    }
}

impl From<usize> for StackItem {
    fn from(v: usize) -> Self {
        StackItem::Integer(BigInt::from(v))
    }
}

impl From<bool> for StackItem {
    fn from(v: bool) -> Self {
        StackItem::Boolean(v)
    }
}

impl From<Bytes> for StackItem {
    fn from(v: Bytes) -> Self {
        StackItem::ByteArray(v)
    }
}

impl From<Vec<u8>> for StackItem {
    fn from(v: Vec<u8>) -> Self {
        StackItem::ByteArray(Bytes::new(v))
    }
}

impl From<&[u8]> for StackItem {
    fn from(v: &[u8]) -> Self {
        StackItem::ByteArray(Bytes::from(v))
    }
}

/// Insertion-ordered map keyed by primitive items.
#[derive(Clone, Default)]
pub struct OrderedMap {
    entries: Vec<(StackItem, StackItem)>,
}

impl Drop for OrderedMap {
    fn drop(&mut self) {
        release(
            self.entries
                .drain(..)
                .flat_map(|(key, value)| [key, value])
                .collect(),
        );
    }
}

impl OrderedMap {
    /// Rejects container and interop keys.
    pub fn check_key(key: &StackItem) -> Result<(), VmError> {
        if key.is_primitive() {
            Ok(())
        } else {
            Err(VmError::InvalidMapKey(key.type_name()))
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &StackItem) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.equals(key))
    }

    pub fn get(&self, key: &StackItem) -> Option<&StackItem> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &StackItem) -> bool {
        self.position(key).is_some()
    }

    /// Inserts or replaces, returning the previous value.
    pub fn insert(&mut self, key: StackItem, value: StackItem) -> Result<Option<StackItem>, VmError> {
        Self::check_key(&key)?;
        match self.position(&key) {
            Some(i) => Ok(Some(std::mem::replace(&mut self.entries[i].1, value))),
            None => {
                self.entries.push((key, value));
                Ok(None)
            }
        }
    }

    pub fn remove(&mut self, key: &StackItem) -> Option<StackItem> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &StackItem> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &StackItem> {
        self.entries.iter().map(|(_, v)| v)
    }
}

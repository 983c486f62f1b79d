//! The type registry and hierarchy engine
//!
//! Every class, interface, array and primitive the compilation touches is
//! interned here exactly once and identified by a stable *class index*.
//! While the scan phase is open, consumers request handles and mark
//! functions used; closing the scan resolves the full hierarchy (field
//! layouts, vtables, itables, instanceof sets), linearizes the types so
//! that supertypes precede subtypes, and drives descriptor and import
//! emission.
//!
//! Records live in a [`TypeArena`] for the lifetime of the compilation;
//! a [`TypeId`] is a copyable handle whose identity is the record itself,
//! so hierarchy links never own their targets.

use crate::jawa::{JawaClassFlags, TypeOpcode};
use crate::jvm::{ClassFileProvider, ClassInfo, FunctionName, UnqualifiedName};
use crate::translate::{Error, FunctionRegistry, ModuleWriter, StringManager};
use crate::wasm::{ValueType, WasmType};
use byteorder::{LittleEndian, WriteBytesExt};
use indexmap::{IndexMap, IndexSet};
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use tracing::{debug, trace};
use typed_arena::Arena;

/// Names of the primitive classes, in class-index order
///
/// The order is part of the external contract: the source language's
/// reflective primitive lookup indexes this table.
pub const PRIMITIVE_CLASSES: [&str; 9] = [
    "boolean", "byte", "char", "double", "float", "int", "long", "short", "void",
];

/// Classes the target runtime defines itself; declared but never defined
const EXT_CLASSES: [&str; 2] = ["java/lang/Object", "java/lang/String"];

/// Reserved slots at the front of every vtable: itable offset, instanceof
/// offset, class-name string id, array component index
pub(crate) const VTABLE_FIRST_FUNCTION_INDEX: usize = 4;

/// Backing storage for type records; outlives the [`TypeManager`]
pub struct TypeArena<'g> {
    types: Arena<TypeData<'g>>,
}

impl<'g> TypeArena<'g> {
    pub fn new() -> TypeArena<'g> {
        TypeArena {
            types: Arena::new(),
        }
    }
}

impl<'g> Default for TypeArena<'g> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an interned type
///
/// Copyable; equality and hashing are the identity of the underlying
/// record, so two handles compare equal exactly when they name the same
/// interned type.
#[derive(Clone, Copy)]
pub struct TypeId<'g>(&'g TypeData<'g>);

impl<'g> PartialEq for TypeId<'g> {
    fn eq(&self, other: &TypeId<'g>) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl<'g> Eq for TypeId<'g> {}

impl<'g> std::hash::Hash for TypeId<'g> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.0, state)
    }
}

impl<'g> Deref for TypeId<'g> {
    type Target = TypeData<'g>;

    fn deref(&self) -> &TypeData<'g> {
        self.0
    }
}

impl<'g> Debug for TypeId<'g> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What kind of entity a record is
enum TypeSort<'g> {
    Primitive,
    Class,
    Array {
        component: WasmType<'g>,
        component_class_index: i32,
    },
}

/// One entry of an instance layout
#[derive(Clone)]
pub struct FieldEntry<'g> {
    /// Class whose classfile declares the field (synthetic fields belong
    /// to the hierarchy root)
    pub owner: String,
    pub name: UnqualifiedName,
    pub field_type: WasmType<'g>,
}

/// An interned type record
///
/// Structure (parent, interfaces, layout, tables) is populated during the
/// hierarchy scan and read-only afterwards; the descriptor offset is
/// assigned during emission.
pub struct TypeData<'g> {
    name: String,
    class_index: usize,
    sort: TypeSort<'g>,
    type_code: Cell<Option<TypeOpcode>>,
    type_index: Cell<Option<usize>>,
    code: Cell<Option<u32>>,
    parent: Cell<Option<TypeId<'g>>>,
    needed_fields: RefCell<HashSet<String>>,
    fields: RefCell<Vec<FieldEntry<'g>>>,
    vtable: RefCell<Vec<FunctionName>>,
    interfaces: RefCell<IndexSet<TypeId<'g>>>,
    instance_ofs: RefCell<IndexSet<TypeId<'g>>>,
    interface_methods: RefCell<IndexMap<TypeId<'g>, Vec<FunctionName>>>,
    target_flags: Cell<Option<JawaClassFlags>>,
    vtable_offset: Cell<usize>,
}

impl<'g> TypeData<'g> {
    fn new(
        name: String,
        class_index: usize,
        sort: TypeSort<'g>,
        type_code: Option<TypeOpcode>,
    ) -> TypeData<'g> {
        TypeData {
            name,
            class_index,
            sort,
            type_code: Cell::new(type_code),
            type_index: Cell::new(None),
            code: Cell::new(None),
            parent: Cell::new(None),
            needed_fields: RefCell::new(HashSet::new()),
            fields: RefCell::new(vec![]),
            vtable: RefCell::new(vec![]),
            interfaces: RefCell::new(IndexSet::new()),
            instance_ofs: RefCell::new(IndexSet::new()),
            interface_methods: RefCell::new(IndexMap::new()),
            target_flags: Cell::new(None),
            vtable_offset: Cell::new(0),
        }
    }

    /// The slash-separated type name (`java/lang/Object`, `[I`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dotted form referenced by the descriptor's string id
    pub fn dotted_name(&self) -> String {
        self.name.replace('/', ".")
    }

    /// The stable index assigned at interning; identity in descriptors,
    /// itables and instanceof lists
    pub fn class_index(&self) -> usize {
        self.class_index
    }

    /// Dense emission index over non-primitive, non-array types; the
    /// import stream counts types in this order
    pub fn type_index(&self) -> Option<usize> {
        self.type_index.get()
    }

    /// The module struct-type code handed back by the writer
    pub fn code(&self) -> Option<u32> {
        self.code.get()
    }

    /// Import opcode of the declaration this type takes (`None` for
    /// primitives and arrays, which are never declared)
    pub fn type_code(&self) -> Option<TypeOpcode> {
        self.type_code.get()
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.sort, TypeSort::Primitive)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.sort, TypeSort::Array { .. })
    }

    /// Component type, when this is an array
    pub fn array_component(&self) -> Option<WasmType<'g>> {
        match &self.sort {
            TypeSort::Array { component, .. } => Some(*component),
            _ => None,
        }
    }

    /// Class index of the array component; −1 for anything but an array
    pub fn component_class_index(&self) -> i32 {
        match &self.sort {
            TypeSort::Array {
                component_class_index,
                ..
            } => *component_class_index,
            _ => -1,
        }
    }

    /// Nearest superclass that is itself registered
    pub fn parent(&self) -> Option<TypeId<'g>> {
        self.parent.get()
    }

    /// Translated access flags; populated by the hierarchy scan
    pub fn target_flags(&self) -> Option<JawaClassFlags> {
        self.target_flags.get()
    }

    /// Byte offset of this type's descriptor in the data section; valid
    /// once emission ran
    pub fn vtable_offset(&self) -> usize {
        self.vtable_offset.get()
    }

    pub(crate) fn set_vtable_offset(&self, offset: usize) {
        self.vtable_offset.set(offset);
    }

    /// Record that some getter or setter touched a field of this name, so
    /// the layout must include it
    pub fn use_field_name(&self, field_name: &str) {
        self.needed_fields
            .borrow_mut()
            .insert(field_name.to_owned());
    }

    /// Instance layout, hierarchy root first; starts with the synthetic
    /// `.vtable` and `.hashcode` words
    pub fn fields(&self) -> Ref<'_, Vec<FieldEntry<'g>>> {
        self.fields.borrow()
    }

    /// Virtual methods in slot order (slot 0 is vtable position 4; the
    /// first four words are reserved)
    pub fn vtable(&self) -> Ref<'_, Vec<FunctionName>> {
        self.vtable.borrow()
    }

    /// All interfaces this type implements, directly or transitively
    pub fn interfaces(&self) -> Ref<'_, IndexSet<TypeId<'g>>> {
        self.interfaces.borrow()
    }

    /// Every type this one is assignable to, most-derived first
    pub fn instance_of(&self) -> Ref<'_, IndexSet<TypeId<'g>>> {
        self.instance_ofs.borrow()
    }

    /// Per-interface dispatch tables, in interface discovery order
    pub fn itables(&self) -> Ref<'_, IndexMap<TypeId<'g>, Vec<FunctionName>>> {
        self.interface_methods.borrow()
    }
}

impl<'g> Debug for TypeData<'g> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Eq, PartialEq, Hash)]
enum TypeKey<'g> {
    Class(String),
    Array(WasmType<'g>),
}

/// The registry and hierarchy engine; one instance per compilation
pub struct TypeManager<'g> {
    arena: &'g TypeArena<'g>,
    types: RefCell<IndexMap<TypeKey<'g>, TypeId<'g>>>,
    ordered: RefCell<IndexSet<TypeId<'g>>>,
    is_finish: Cell<bool>,
    type_table_offset: Cell<usize>,
}

impl<'g> TypeManager<'g> {
    pub fn new(arena: &'g TypeArena<'g>) -> TypeManager<'g> {
        TypeManager {
            arena,
            types: RefCell::new(IndexMap::new()),
            ordered: RefCell::new(IndexSet::new()),
            is_finish: Cell::new(false),
            type_table_offset: Cell::new(0),
        }
    }

    /// Count of registered types
    pub fn size(&self) -> usize {
        self.types.borrow().len()
    }

    /// Whether the scan phase has closed
    pub fn is_finished(&self) -> bool {
        self.is_finish.get()
    }

    /// Byte offset of the flat type table in the data section; valid once
    /// [`TypeManager::prepare_finish`] ran
    pub fn type_table_offset(&self) -> usize {
        self.type_table_offset.get()
    }

    /// Look up an already-registered class or interface
    pub fn lookup(&self, name: &str) -> Option<TypeId<'g>> {
        self.types
            .borrow()
            .get(&TypeKey::Class(name.to_owned()))
            .copied()
    }

    /// Handle for a class or interface, interning it on first request
    ///
    /// The very first registration seeds the registry with the nine
    /// primitive classes (indices 0 to 8) and `java/lang/Object` (index 9).
    pub fn value_of(&self, name: &str) -> Result<TypeId<'g>, Error> {
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }
        self.check_state(name)?;
        // seeding may just have interned the requested name
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }
        Ok(self.intern_class(name))
    }

    /// Handle for the array type over `element`, interning it on first
    /// request
    pub fn array_type(&self, element: WasmType<'g>) -> Result<TypeId<'g>, Error> {
        let key = TypeKey::Array(element);
        let existing = self.types.borrow().get(&key).copied();
        if let Some(id) = existing {
            return Ok(id);
        }
        self.check_state(&element.to_string())?;

        let component_class_index = match element {
            WasmType::Val(ValueType::Bool) => 0,
            WasmType::Val(ValueType::I8) => 1,
            WasmType::Val(ValueType::U16) => 2,
            WasmType::Val(ValueType::F64) => 3,
            WasmType::Val(ValueType::F32) => 4,
            WasmType::Val(ValueType::I32) => 5,
            WasmType::Val(ValueType::I64) => 6,
            WasmType::Val(ValueType::I16) => 7,
            WasmType::Val(ValueType::Externref) => {
                self.value_of("java/lang/Object")?.class_index() as i32
            }
            WasmType::Val(other) => {
                return Err(Error::UnsupportedArrayElement {
                    element_type: other.to_string(),
                })
            }
            WasmType::Struct(id) => id.class_index() as i32,
        };

        let class_index = self.types.borrow().len();
        let data = TypeData::new(
            array_name(&element),
            class_index,
            TypeSort::Array {
                component: element,
                component_class_index,
            },
            None,
        );
        Ok(self.intern(key, data))
    }

    /// Resolve a one-character type descriptor into a handle
    ///
    /// `None` is the `void` return type. A prefix outside the descriptor
    /// grammar falls back to interpreting the whole string as a bare class
    /// name.
    pub fn value_of_sig(&self, sig: &str) -> Result<Option<WasmType<'g>>, Error> {
        let bad = || Error::BadSignature {
            signature: sig.to_owned(),
        };
        let first = sig.chars().next().ok_or_else(bad)?;
        let resolved = match first {
            'Z' => WasmType::Val(ValueType::Bool),
            'B' | 'C' => WasmType::Val(ValueType::I8),
            'S' => WasmType::Val(ValueType::I16),
            'I' => WasmType::Val(ValueType::I32),
            'J' => WasmType::Val(ValueType::I64),
            'F' => WasmType::Val(ValueType::F32),
            'D' => WasmType::Val(ValueType::F64),
            'V' => return Ok(None),
            'L' => {
                if !sig.ends_with(';') || sig.len() < 3 {
                    return Err(bad());
                }
                WasmType::Struct(self.value_of(&sig[1..sig.len() - 1])?)
            }
            '[' => {
                let element = self.value_of_sig(&sig[1..])?.ok_or_else(bad)?;
                WasmType::Struct(self.array_type(element)?)
            }
            // legacy callers pass bare class names
            _ => WasmType::Struct(self.value_of(sig)?),
        };
        Ok(Some(resolved))
    }

    /// Registered types in registry (interning) order
    pub fn registered(&self) -> Vec<TypeId<'g>> {
        self.types.borrow().values().copied().collect()
    }

    /// Registered types in emission order; empty until the hierarchy scan
    /// ran
    pub fn emission_order(&self) -> Vec<TypeId<'g>> {
        self.ordered.borrow().iter().copied().collect()
    }

    fn check_state(&self, requested: &str) -> Result<(), Error> {
        trace!("type: {}", requested);
        if self.is_finish.get() {
            return Err(Error::LateRegistration {
                type_name: requested.to_owned(),
            });
        }
        let empty = self.types.borrow().is_empty();
        if empty {
            for name in PRIMITIVE_CLASSES {
                let class_index = self.types.borrow().len();
                self.intern(
                    TypeKey::Class(name.to_owned()),
                    TypeData::new(name.to_owned(), class_index, TypeSort::Primitive, None),
                );
            }
            // seeded exactly once; later value_of calls reuse this handle
            self.intern_class("java/lang/Object");
        }
        Ok(())
    }

    fn intern_class(&self, name: &str) -> TypeId<'g> {
        let type_code = if EXT_CLASSES.contains(&name) {
            TypeOpcode::ExtClass
        } else {
            TypeOpcode::DeclClass
        };
        let class_index = self.types.borrow().len();
        self.intern(
            TypeKey::Class(name.to_owned()),
            TypeData::new(name.to_owned(), class_index, TypeSort::Class, Some(type_code)),
        )
    }

    fn intern(&self, key: TypeKey<'g>, data: TypeData<'g>) -> TypeId<'g> {
        let data: &'g TypeData<'g> = self.arena.types.alloc(data);
        let id = TypeId(data);
        self.types.borrow_mut().insert(key, id);
        id
    }

    /// Resolve the hierarchy of every registered type
    ///
    /// Run once, after all consumer phases stopped requesting types:
    /// populates field layouts, vtables, interface sets, itables and
    /// instanceof sets, computes the emission order and assigns emission
    /// indices. Field types mentioned by included fields are interned on
    /// the fly and scanned in the same pass.
    pub fn scan_type_hierarchy<P, F>(&self, provider: &P, functions: &mut F) -> Result<(), Error>
    where
        P: ClassFileProvider,
        F: FunctionRegistry,
    {
        let mut index = 0;
        loop {
            let next = self
                .types
                .borrow()
                .get_index(index)
                .map(|(_, id)| *id);
            match next {
                None => break,
                Some(ty) => {
                    self.scan_one(ty, provider, functions)?;
                    index += 1;
                }
            }
        }

        self.compute_emission_order()?;

        for ty in self.ordered.borrow().iter() {
            if ty.is_primitive() || ty.is_array() {
                continue;
            }
            let class_file = provider.get(ty.name()).ok_or_else(|| Error::MissingClass {
                class_name: ty.name().to_owned(),
            })?;
            ty.target_flags
                .set(Some(JawaClassFlags::from_jvm(class_file.access_flags)));
        }

        let mut count = 0;
        for ty in self.ordered.borrow().iter() {
            if ty.is_primitive() || ty.is_array() {
                continue;
            }
            ty.type_index.set(Some(count));
            count += 1;
        }
        Ok(())
    }

    fn scan_one<P, F>(&self, ty: TypeId<'g>, provider: &P, functions: &mut F) -> Result<(), Error>
    where
        P: ClassFileProvider,
        F: FunctionRegistry,
    {
        debug!("scan type hierarchy: {}", ty.name());
        ty.fields.borrow_mut().clear();
        ty.vtable.borrow_mut().clear();
        ty.interface_methods.borrow_mut().clear();
        {
            let mut instance_ofs = ty.instance_ofs.borrow_mut();
            instance_ofs.clear();
            instance_ofs.insert(ty);
        }

        match &ty.sort {
            TypeSort::Primitive => {}
            TypeSort::Array {
                component: WasmType::Val(_),
                ..
            } => {}
            TypeSort::Array { .. } => {
                // reference arrays share Object's layout and vtable
                let mut all_needed = HashSet::new();
                self.list_struct_fields(ty, "java/lang/Object", provider, functions, &mut all_needed)?;
            }
            TypeSort::Class => {
                let class_file = provider.get(ty.name()).ok_or_else(|| Error::MissingClass {
                    class_name: ty.name().to_owned(),
                })?;
                if class_file.is_interface() && ty.type_code.get() == Some(TypeOpcode::DeclClass) {
                    ty.type_code.set(Some(TypeOpcode::DeclInterface));
                }
                self.list_interfaces(ty, class_file, provider, functions)?;
                let mut all_needed = HashSet::new();
                self.list_struct_fields(ty, ty.name(), provider, functions, &mut all_needed)?;
            }
        }
        Ok(())
    }

    /// Walk `class_name` and its superclasses, assembling `ty`'s field
    /// layout and vtable
    ///
    /// Recursion appends after returning, so the hierarchy root
    /// contributes first; `all_needed` accumulates the requested field
    /// names of every level on the way down, gating which declared fields
    /// take layout space at all.
    fn list_struct_fields<P, F>(
        &self,
        ty: TypeId<'g>,
        class_name: &str,
        provider: &P,
        functions: &mut F,
        all_needed: &mut HashSet<String>,
    ) -> Result<(), Error>
    where
        P: ClassFileProvider,
        F: FunctionRegistry,
    {
        let class_file = provider.get(class_name).ok_or_else(|| Error::MissingClass {
            class_name: class_name.to_owned(),
        })?;

        // interfaces contribute no layout
        if class_file.is_interface() {
            return Ok(());
        }

        if let Some(level) = self.lookup(class_name) {
            if level != ty && ty.parent.get().is_none() {
                ty.parent.set(Some(level));
            }
            all_needed.extend(level.needed_fields.borrow().iter().cloned());
            ty.instance_ofs.borrow_mut().insert(level);
        }

        match &class_file.super_name {
            Some(super_name) => {
                self.list_struct_fields(ty, super_name.as_str(), provider, functions, all_needed)?;
            }
            None => {
                // the hierarchy root carries the synthetic dispatch words
                let mut fields = ty.fields.borrow_mut();
                fields.push(FieldEntry {
                    owner: class_name.to_owned(),
                    name: UnqualifiedName::VTABLE,
                    field_type: WasmType::Val(ValueType::I32),
                });
                fields.push(FieldEntry {
                    owner: class_name.to_owned(),
                    name: UnqualifiedName::HASHCODE,
                    field_type: WasmType::Val(ValueType::I32),
                });
            }
        }

        for field in &class_file.fields {
            if field.is_static() {
                continue;
            }
            if !all_needed.contains(field.name.as_str()) {
                continue;
            }
            let field_type = self
                .value_of_sig(&field.descriptor)?
                .ok_or_else(|| Error::BadSignature {
                    signature: field.descriptor.clone(),
                })?;
            ty.fields.borrow_mut().push(FieldEntry {
                owner: class_name.to_owned(),
                name: field.name.clone(),
                field_type,
            });
        }

        for method in &class_file.methods {
            if method.is_static() || method.is_constructor() {
                continue;
            }
            Self::add_or_update_vtable(ty, functions, method.function_name(), false);
        }

        // used default implementations of this level's direct interfaces
        // claim vtable slots too
        for interface_name in &class_file.interfaces {
            let interface_file =
                provider
                    .get(interface_name.as_str())
                    .ok_or_else(|| Error::MissingClass {
                        class_name: interface_name.as_str().to_owned(),
                    })?;
            for method in &interface_file.methods {
                let func_name = method.function_name();
                if functions.is_used(&func_name) {
                    Self::add_or_update_vtable(ty, functions, func_name, true);
                }
            }
        }
        Ok(())
    }

    /// Add a virtual method to the vtable, or replace the slot an override
    /// supersedes
    fn add_or_update_vtable<F: FunctionRegistry>(
        ty: TypeId<'g>,
        functions: &mut F,
        func_name: FunctionName,
        is_default: bool,
    ) {
        let mut vtable = ty.vtable.borrow_mut();
        let mut index = vtable.len();
        let mut replace = false;
        for (slot, existing) in vtable.iter().enumerate() {
            if existing.method_name == func_name.method_name
                && existing.signature == func_name.signature
            {
                // a default only replaces a slot a concrete override
                // already claimed through an itable
                replace = !is_default || functions.itable_index(existing).is_some();
                index = slot;
                break;
            }
        }
        if replace {
            functions.mark_as_needed(&func_name);
            vtable[index] = func_name.clone();
        } else if index == vtable.len() && functions.is_used(&func_name) {
            vtable.push(func_name.clone());
        }
        if index < vtable.len() {
            functions.set_vtable_index(&func_name, index + VTABLE_FIRST_FUNCTION_INDEX);
        }
    }

    /// Collect the interface closure of `ty` and build its itables
    fn list_interfaces<P, F>(
        &self,
        ty: TypeId<'g>,
        class_file: &ClassInfo,
        provider: &P,
        functions: &mut F,
    ) -> Result<(), Error>
    where
        P: ClassFileProvider,
        F: FunctionRegistry,
    {
        ty.interfaces.borrow_mut().clear();

        // classfiles of the superclass chain, most derived first, plus the
        // names of every interface seen (also the default-method search
        // order and the cycle guard)
        let mut class_files: Vec<&ClassInfo> = vec![];
        let mut interface_names: IndexSet<String> = IndexSet::new();
        let mut current = class_file;
        loop {
            class_files.push(current);
            self.list_interface_types(ty, current, provider, &mut interface_names)?;
            match &current.super_name {
                None => break,
                Some(super_name) => {
                    current = provider.get(super_name.as_str()).ok_or_else(|| {
                        Error::MissingClass {
                            class_name: super_name.as_str().to_owned(),
                        }
                    })?;
                }
            }
        }

        // no instances of an abstract class exist, so no itables either
        if class_files[0].is_abstract() {
            return Ok(());
        }

        let interfaces: Vec<TypeId<'g>> = ty.interfaces.borrow().iter().copied().collect();
        for interface in interfaces {
            let interface_file =
                provider
                    .get(interface.name())
                    .ok_or_else(|| Error::MissingClass {
                        class_name: interface.name().to_owned(),
                    })?;

            for interface_method in &interface_file.methods {
                let interface_func = interface_method.function_name();
                if !functions.is_used(&interface_func) {
                    continue;
                }

                let mut implementation = None;
                for level in &class_files {
                    if let Some(method) =
                        level.method(&interface_func.method_name, &interface_func.signature)
                    {
                        implementation = Some(method);
                        break;
                    }
                }
                if implementation.is_none() {
                    // fall back to a default implementation in the closure
                    for interface_name in &interface_names {
                        let candidate =
                            provider
                                .get(interface_name)
                                .ok_or_else(|| Error::MissingClass {
                                    class_name: interface_name.clone(),
                                })?;
                        if let Some(method) = candidate
                            .method(&interface_func.method_name, &interface_func.signature)
                        {
                            implementation = Some(method);
                            break;
                        }
                    }
                }

                match implementation {
                    Some(method) => {
                        let target = method.function_name();
                        functions.mark_as_needed(&target);
                        let mut itables = ty.interface_methods.borrow_mut();
                        let methods = itables.entry(interface).or_default();
                        methods.push(target);
                        // the two-word itable header precedes the entries
                        functions.set_itable_index(&interface_func, methods.len() + 1);
                    }
                    None => {
                        return Err(Error::MissingImplementation {
                            interface_method: interface_func.signature_name(),
                            class_name: ty.name().to_owned(),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Deposit every interface reachable from `class_file` into `ty`'s
    /// interface and instanceof sets
    fn list_interface_types<P>(
        &self,
        ty: TypeId<'g>,
        class_file: &ClassInfo,
        provider: &P,
        interface_names: &mut IndexSet<String>,
    ) -> Result<(), Error>
    where
        P: ClassFileProvider,
    {
        for interface_name in &class_file.interfaces {
            if interface_names.insert(interface_name.as_str().to_owned()) {
                if let Some(interface) = self.lookup(interface_name.as_str()) {
                    ty.interfaces.borrow_mut().insert(interface);
                    ty.instance_ofs.borrow_mut().insert(interface);
                }
                if let Some(interface_file) = provider.get(interface_name.as_str()) {
                    self.list_interface_types(ty, interface_file, provider, interface_names)?;
                }
            }
        }
        Ok(())
    }

    /// Linearize the registry so every type follows its instanceof set
    fn compute_emission_order(&self) -> Result<(), Error> {
        let all: Vec<TypeId<'g>> = self.types.borrow().values().copied().collect();
        let mut ordered: IndexSet<TypeId<'g>> = IndexSet::new();
        while ordered.len() != all.len() {
            let before = ordered.len();
            for ty in &all {
                ordered.insert(*ty);
                let satisfied = ty
                    .instance_ofs
                    .borrow()
                    .iter()
                    .all(|dep| ordered.contains(dep));
                if !satisfied {
                    ordered.shift_remove(ty);
                }
            }
            if ordered.len() == before {
                let remaining = all
                    .iter()
                    .filter(|ty| !ordered.contains(*ty))
                    .map(|ty| ty.name().to_owned())
                    .collect();
                return Err(Error::CycleInHierarchy { remaining });
            }
        }
        *self.ordered.borrow_mut() = ordered;
        Ok(())
    }

    /// Close the scan phase and emit everything
    ///
    /// Resolves the hierarchy if [`TypeManager::scan_type_hierarchy`] has
    /// not run yet, then registers struct types, writes every type
    /// descriptor into the data section, emits the import stream and
    /// finishes with the flat type table. After this returns only read
    /// accessors remain valid and new registrations fail.
    pub fn prepare_finish<P, F, W>(
        &self,
        writer: &mut W,
        provider: &P,
        functions: &mut F,
        strings: &mut StringManager,
    ) -> Result<(), Error>
    where
        P: ClassFileProvider,
        F: FunctionRegistry,
        W: ModuleWriter<'g>,
    {
        if self.ordered.borrow().len() != self.size() {
            self.scan_type_hierarchy(provider, functions)?;
        }
        self.is_finish.set(true);

        let ordered = self.emission_order();
        for ty in &ordered {
            if !ty.is_primitive() && !ty.is_array() {
                let code = writer.write_struct_type(*ty);
                ty.code.set(Some(code));
            }
        }

        for ty in &ordered {
            ty.write_descriptor(writer, strings)?;
        }

        for ty in &ordered {
            if ty.is_primitive() || ty.is_array() {
                continue;
            }
            self.write_import_type(*ty, writer, provider, functions)?;
        }

        // the type table maps every class index to its descriptor offset
        self.type_table_offset.set(writer.data_size());
        let registry = self.registered();
        let data = writer.data();
        for ty in registry {
            data.write_i32::<LittleEndian>(ty.vtable_offset() as i32)?;
        }
        Ok(())
    }
}

/// JVM-reflection-style name of the array over `element` (`[I`,
/// `[Ljava/lang/String;`, `[[D`)
fn array_name(element: &WasmType) -> String {
    match element {
        WasmType::Val(ValueType::Externref) => String::from("[Ljava/lang/Object;"),
        WasmType::Val(value_type) => match value_type.descriptor_char() {
            Some(c) => format!("[{}", c),
            // not storable; array_type rejected it already
            None => format!("[{}", value_type),
        },
        WasmType::Struct(id) if id.is_array() => format!("[{}", id.name()),
        WasmType::Struct(id) => format!("[L{};", id.name()),
    }
}

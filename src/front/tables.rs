//! Identifier, type and string tables.
//!
//! MIPSgen never walks these directly: it goes through named accessor
//! functions (`ident_get_type`, `type_is_array`, `strings_amount`, ...).
//! Keeping the tables behind a narrow query surface
//! means the tree-walker in `back` is agnostic to how the front end actually
//! represents a type or a name -- only `Tables` knows that.

use crate::common::Id;

/// Handle into the [TypeTable].
#[derive(Clone, Copy, PartialEq, Eq, Debug, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u32);

#[derive(Clone, Debug)]
pub enum TypeKind {
    Void,
    Bool,
    Char,
    Integer,
    Floating,
    Pointer(TypeId),
    Array(TypeId),
    /// Member types, in declaration order.
    Structure(Vec<TypeId>),
    Function {
        ret: TypeId,
        params: Vec<TypeId>,
    },
}

#[derive(Clone, Debug)]
pub struct TypeTable {
    types: Vec<TypeKind>,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = TypeTable { types: Vec::new() };
        // The five scalar primitives always occupy the same low indices so
        // callers can use the `TypeTable::VOID`-style constants below
        // without threading a `TypeId` through every test helper.
        table.types.push(TypeKind::Void);
        table.types.push(TypeKind::Bool);
        table.types.push(TypeKind::Char);
        table.types.push(TypeKind::Integer);
        table.types.push(TypeKind::Floating);
        table
    }

    pub const VOID: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    pub const CHAR: TypeId = TypeId(2);
    pub const INTEGER: TypeId = TypeId(3);
    pub const FLOATING: TypeId = TypeId(4);

    pub fn add(&mut self, kind: TypeKind) -> TypeId {
        self.types.push(kind);
        TypeId((self.types.len() - 1) as u32)
    }

    pub fn pointer_to(&mut self, element: TypeId) -> TypeId {
        self.add(TypeKind::Pointer(element))
    }

    pub fn array_of(&mut self, element: TypeId) -> TypeId {
        self.add(TypeKind::Array(element))
    }

    fn get(&self, ty: TypeId) -> &TypeKind {
        &self.types[ty.0 as usize]
    }

    pub fn is_floating(&self, ty: TypeId) -> bool {
        matches!(self.get(ty), TypeKind::Floating)
    }

    pub fn is_array(&self, ty: TypeId) -> bool {
        matches!(self.get(ty), TypeKind::Array(_))
    }

    pub fn is_structure(&self, ty: TypeId) -> bool {
        matches!(self.get(ty), TypeKind::Structure(_))
    }

    pub fn is_pointer(&self, ty: TypeId) -> bool {
        matches!(self.get(ty), TypeKind::Pointer(_))
    }

    pub fn is_scalar(&self, ty: TypeId) -> bool {
        matches!(
            self.get(ty),
            TypeKind::Bool | TypeKind::Char | TypeKind::Integer | TypeKind::Floating | TypeKind::Pointer(_)
        )
    }

    pub fn is_void(&self, ty: TypeId) -> bool {
        matches!(self.get(ty), TypeKind::Void)
    }

    pub fn is_int_class(&self, ty: TypeId) -> bool {
        matches!(self.get(ty), TypeKind::Bool | TypeKind::Char | TypeKind::Integer)
    }

    pub fn is_function(&self, ty: TypeId) -> bool {
        matches!(self.get(ty), TypeKind::Function { .. })
    }

    /// Size in bytes. Every scalar is one word; MIPSgen never allocates a
    /// sub-word stack slot (single precision floats are word-sized too).
    pub fn size(&self, ty: TypeId) -> usize {
        match self.get(ty) {
            TypeKind::Void => 0,
            TypeKind::Bool | TypeKind::Char | TypeKind::Integer | TypeKind::Floating | TypeKind::Pointer(_) => 4,
            TypeKind::Array(elem) => self.size(*elem),
            TypeKind::Structure(members) => members.iter().map(|m| self.size(*m)).sum(),
            TypeKind::Function { .. } => 0,
        }
    }

    pub fn pointer_element(&self, ty: TypeId) -> TypeId {
        match self.get(ty) {
            TypeKind::Pointer(elem) => *elem,
            _ => panic!("type_pointer_get_element_type called on a non-pointer type"),
        }
    }

    pub fn array_element(&self, ty: TypeId) -> TypeId {
        match self.get(ty) {
            TypeKind::Array(elem) => *elem,
            _ => panic!("array element query on a non-array type"),
        }
    }

    pub fn structure_member_amount(&self, ty: TypeId) -> usize {
        match self.get(ty) {
            TypeKind::Structure(members) => members.len(),
            _ => panic!("type_structure_get_member_amount called on a non-structure type"),
        }
    }

    pub fn structure_member_type(&self, ty: TypeId, index: usize) -> TypeId {
        match self.get(ty) {
            TypeKind::Structure(members) => members[index],
            _ => panic!("type_structure_get_member_type called on a non-structure type"),
        }
    }

    /// Byte offset of member `index`, the sum of the sizes of the members
    /// that precede it.
    pub fn structure_member_offset(&self, ty: TypeId, index: usize) -> usize {
        match self.get(ty) {
            TypeKind::Structure(members) => members[..index].iter().map(|m| self.size(*m)).sum(),
            _ => panic!("member offset query on a non-structure type"),
        }
    }

    pub fn function_return(&self, ty: TypeId) -> TypeId {
        match self.get(ty) {
            TypeKind::Function { ret, .. } => *ret,
            _ => panic!("type_function_get_return_type called on a non-function type"),
        }
    }

    pub fn function_parameter_amount(&self, ty: TypeId) -> usize {
        match self.get(ty) {
            TypeKind::Function { params, .. } => params.len(),
            _ => panic!("type_function_get_parameter_amount called on a non-function type"),
        }
    }

    pub fn function_parameter(&self, ty: TypeId, index: usize) -> TypeId {
        match self.get(ty) {
            TypeKind::Function { params, .. } => params[index],
            _ => panic!("function parameter query on a non-function type"),
        }
    }

    /// `type_get_class`: used by cast lowering to tell "integral" (truthy)
    /// from "floating" (falsy) without a full structural match.
    pub fn get_class(&self, ty: TypeId) -> bool {
        self.is_int_class(ty) || matches!(self.get(ty), TypeKind::Bool)
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct IdentEntry {
    pub spelling: Id,
    pub ty: TypeId,
    pub is_local: bool,
}

/// `ident_is_local`, `ident_get_type`, `ident_get_spelling`: one table of
/// identifiers shared by globals, locals and parameters. Identifiers are
/// addressed by a plain index (`usize`), matching how the AST refers to
/// them.
#[derive(Clone, Debug, Default)]
pub struct IdentTable {
    entries: Vec<IdentEntry>,
}

impl IdentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, spelling: &str, ty: TypeId, is_local: bool) -> usize {
        self.entries.push(IdentEntry {
            spelling: Id::from(spelling.to_string()),
            ty,
            is_local,
        });
        self.entries.len() - 1
    }

    pub fn is_local(&self, id: usize) -> bool {
        self.entries[id].is_local
    }

    pub fn get_type(&self, id: usize) -> TypeId {
        self.entries[id].ty
    }

    pub fn get_spelling(&self, id: usize) -> &str {
        &self.entries[id].spelling
    }
}

/// `strings_amount`, `string_get`: the pool of string literals referenced
/// from the AST by index. MIPSgen emits one `.rdata` label per entry (or
/// several, if the literal embeds `%` conversions for `printf`).
#[derive(Clone, Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: impl Into<String>) -> usize {
        self.strings.push(s.into());
        self.strings.len() - 1
    }

    pub fn amount(&self) -> usize {
        self.strings.len()
    }

    pub fn get(&self, index: usize) -> &str {
        &self.strings[index]
    }
}

/// Groups the three tables the backend queries through its accessor
/// surface.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    pub idents: IdentTable,
    pub types: TypeTable,
    pub strings: StringTable,
}

impl Tables {
    pub fn new() -> Self {
        Tables {
            idents: IdentTable::new(),
            types: TypeTable::new(),
            strings: StringTable::new(),
        }
    }
}

//! Struct storage, type equality and memory layout

use super::ty::{Primitive, Type, POINTER_SIZE};
use crate::common::{CompileError, CompileResult, FunctionId, StructId};
use std::cell::OnceCell;
use std::collections::{BTreeMap, HashSet};

/// Data member of a struct
#[derive(Debug, Clone)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
}

/// Method of a struct. `ty` includes the implicit leading `self` parameter.
#[derive(Debug, Clone)]
pub struct StructMethod {
    pub name: String,
    pub assigned_name: String,
    pub function: FunctionId,
    pub ty: Type,
}

/// Constructor of a struct. `ty` includes the implicit leading `self` parameter.
#[derive(Debug, Clone)]
pub struct StructConstructor {
    pub assigned_name: String,
    pub function: FunctionId,
    pub ty: Type,
}

/// Placement of one member inside a struct allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub offset: usize,
    pub size: usize,
}

/// Computed memory layout of a struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub fields: Vec<FieldLayout>,
    pub size: usize,
}

impl StructLayout {
    pub fn offset_of(&self, member: &str) -> Option<usize> {
        self.fields.iter().find(|f| f.name == member).map(|f| f.offset)
    }
}

/// A user-declared `object` type
#[derive(Debug)]
pub struct StructType {
    pub name: String,
    pub assigned_name: String,
    /// Data members in declaration order
    pub members: Vec<StructMember>,
    pub methods: BTreeMap<String, StructMethod>,
    pub final_members: HashSet<String>,
    pub private_members: HashSet<String>,
    pub constructor: Option<StructConstructor>,
    layout: OnceCell<StructLayout>,
}

impl StructType {
    pub fn new(name: impl Into<String>, assigned_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assigned_name: assigned_name.into(),
            members: Vec::new(),
            methods: BTreeMap::new(),
            final_members: HashSet::new(),
            private_members: HashSet::new(),
            constructor: None,
            layout: OnceCell::new(),
        }
    }

    pub fn member(&self, name: &str) -> Option<&Type> {
        self.members.iter().find(|m| m.name == name).map(|m| &m.ty)
    }

    pub fn method(&self, name: &str) -> Option<&StructMethod> {
        self.methods.get(name)
    }

    pub fn is_final(&self, name: &str) -> bool {
        self.final_members.contains(name)
    }

    pub fn is_private(&self, name: &str) -> bool {
        self.private_members.contains(name)
    }

    fn has_name(&self, name: &str) -> bool {
        self.member(name).is_some() || self.methods.contains_key(name)
    }
}

/// Registry of struct types for one compilation
#[derive(Debug, Default)]
pub struct TypeTable {
    structs: Vec<StructType>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_struct(&mut self, def: StructType) -> StructId {
        let id = StructId(self.structs.len());
        self.structs.push(def);
        id
    }

    pub fn get(&self, id: StructId) -> &StructType {
        &self.structs[id.0]
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    // ==================== Struct construction ====================

    /// Append a data member; members and methods share one namespace
    pub fn add_member(
        &mut self,
        id: StructId,
        name: &str,
        ty: Type,
        is_final: bool,
        is_private: bool,
    ) -> CompileResult<()> {
        let def = self.mutable(id)?;
        if def.has_name(name) {
            return Err(CompileError::redeclaration(name));
        }
        def.members.push(StructMember {
            name: name.to_string(),
            ty,
        });
        if is_final {
            def.final_members.insert(name.to_string());
        }
        if is_private {
            def.private_members.insert(name.to_string());
        }
        Ok(())
    }

    pub fn add_method(
        &mut self,
        id: StructId,
        method: StructMethod,
        is_private: bool,
    ) -> CompileResult<()> {
        let def = self.mutable(id)?;
        if def.has_name(&method.name) {
            return Err(CompileError::redeclaration(method.name));
        }
        if is_private {
            def.private_members.insert(method.name.clone());
        }
        def.methods.insert(method.name.clone(), method);
        Ok(())
    }

    pub fn set_constructor(&mut self, id: StructId, ctor: StructConstructor) -> CompileResult<()> {
        let def = self.mutable(id)?;
        if def.constructor.is_some() {
            return Err(CompileError::redeclaration("new"));
        }
        def.constructor = Some(ctor);
        Ok(())
    }

    fn mutable(&mut self, id: StructId) -> CompileResult<&mut StructType> {
        let def = &mut self.structs[id.0];
        if def.layout.get().is_some() {
            return Err(CompileError::type_error(format!(
                "cannot extend '{}' after its layout was computed",
                def.name
            )));
        }
        Ok(def)
    }

    // ==================== Equality ====================

    /// Structural type equality
    ///
    /// Structs are equal when they are the same declaration, or when they
    /// share a name and have pairwise-equal members.
    pub fn equals(&self, a: &Type, b: &Type) -> bool {
        self.equals_assuming(a, b, &mut Vec::new())
    }

    fn equals_assuming(&self, a: &Type, b: &Type, assumed: &mut Vec<(StructId, StructId)>) -> bool {
        match (a, b) {
            (Type::Primitive(x), Type::Primitive(y)) => x == y,
            (Type::Struct(x), Type::Struct(y)) => {
                if x == y || assumed.contains(&(*x, *y)) {
                    return true;
                }
                let (sx, sy) = (self.get(*x), self.get(*y));
                if sx.name != sy.name || sx.members.len() != sy.members.len() {
                    return false;
                }
                // Self-referential members compare coinductively
                assumed.push((*x, *y));
                let equal = sx.members.iter().zip(&sy.members).all(|(mx, my)| {
                    mx.name == my.name && self.equals_assuming(&mx.ty, &my.ty, assumed)
                });
                assumed.pop();
                equal
            }
            (Type::Tuple(xs), Type::Tuple(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|(x, y)| self.equals_assuming(x, y, assumed))
            }
            (Type::Array(x), Type::Array(y)) => self.equals_assuming(x, y, assumed),
            (
                Type::Func { ret: r1, params: p1 },
                Type::Func { ret: r2, params: p2 },
            ) => {
                let rets = match (r1, r2) {
                    (None, None) => true,
                    (Some(x), Some(y)) => self.equals_assuming(x, y, assumed),
                    _ => false,
                };
                rets
                    && p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(x, y)| self.equals_assuming(x, y, assumed))
            }
            (Type::Module { name: n1, .. }, Type::Module { name: n2, .. }) => n1 == n2,
            _ => false,
        }
    }

    // ==================== Size & layout ====================

    /// Size in bytes of a value of this type; `None` when unsized
    pub fn size(&self, ty: &Type) -> Option<usize> {
        match ty {
            Type::Primitive(p) => p.size(),
            Type::Struct(id) => Some(self.layout(*id).size),
            Type::Tuple(elements) => Some(elements.iter().map(|e| self.slot_size(e)).sum()),
            Type::Array(_) | Type::Module { .. } => None,
            Type::Func { .. } => Some(POINTER_SIZE),
        }
    }

    /// Bytes a value of this type occupies when stored inside another value
    pub fn slot_size(&self, ty: &Type) -> usize {
        match ty {
            Type::Primitive(p) => p.size().unwrap_or(POINTER_SIZE),
            _ => POINTER_SIZE,
        }
    }

    /// Member layout of a struct, computed on first request
    ///
    /// Members are ordered by descending size, ties keeping declaration
    /// order, which leaves no padding between them.
    pub fn layout(&self, id: StructId) -> &StructLayout {
        let def = self.get(id);
        def.layout.get_or_init(|| {
            let mut sized: Vec<(&str, usize)> = def
                .members
                .iter()
                .map(|m| (m.name.as_str(), self.slot_size(&m.ty)))
                .collect();
            // stable sort: equal sizes stay in declaration order
            sized.sort_by(|a, b| b.1.cmp(&a.1));

            let mut offset = 0;
            let fields = sized
                .into_iter()
                .map(|(name, size)| {
                    let field = FieldLayout {
                        name: name.to_string(),
                        offset,
                        size,
                    };
                    offset += size;
                    field
                })
                .collect();
            StructLayout { fields, size: offset }
        })
    }

    // ==================== Naming ====================

    /// Human-readable type name for diagnostics
    pub fn describe(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive(p) => p.name().to_string(),
            Type::Struct(id) => self.get(*id).name.clone(),
            Type::Tuple(elements) => format!("tuple<{}>", self.describe_list(elements)),
            Type::Array(element) => format!("array<{}>", self.describe(element)),
            Type::Func { ret, params } => {
                let ret = ret.as_ref().map_or_else(|| "void".to_string(), |r| self.describe(r));
                if params.is_empty() {
                    format!("func<{ret}>")
                } else {
                    format!("func<{ret}, {}>", self.describe_list(params))
                }
            }
            Type::Module { name, .. } => format!("module {name}"),
        }
    }

    /// Unique type key used by the operator-overload registry
    pub fn key(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive(p) => p.name().to_string(),
            Type::Struct(id) => self.get(*id).assigned_name.clone(),
            Type::Tuple(elements) => format!(
                "tuple<{}>",
                elements.iter().map(|e| self.key(e)).collect::<Vec<_>>().join(",")
            ),
            Type::Array(element) => format!("array<{}>", self.key(element)),
            Type::Func { ret, params } => format!(
                "func<{};{}>",
                ret.as_ref().map_or_else(|| "void".to_string(), |r| self.key(r)),
                params.iter().map(|p| self.key(p)).collect::<Vec<_>>().join(",")
            ),
            Type::Module { name, .. } => format!("module:{name}"),
        }
    }

    fn describe_list(&self, types: &[Type]) -> String {
        types.iter().map(|t| self.describe(t)).collect::<Vec<_>>().join(", ")
    }
}

/// Built-in type names available at the root of every module
pub fn builtin_type(name: &str) -> Option<Type> {
    Primitive::from_name(name).map(Type::Primitive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn point(table: &mut TypeTable, assigned: &str) -> StructId {
        let id = table.add_struct(StructType::new("Point", assigned));
        table.add_member(id, "x", Type::int(), false, false).unwrap();
        table.add_member(id, "y", Type::int(), false, false).unwrap();
        id
    }

    #[test]
    fn test_equals_is_reflexive() {
        let mut table = TypeTable::new();
        let p = point(&mut table, "Point$0");
        let samples = [
            Type::int(),
            Type::Struct(p),
            Type::array(Type::float()),
            Type::Tuple(vec![Type::int(), Type::str()]),
            Type::func(None, vec![Type::Struct(p)]),
        ];
        for ty in &samples {
            assert!(table.equals(ty, ty), "{} should equal itself", table.describe(ty));
        }
    }

    #[test]
    fn test_primitives_compare_by_name() {
        let table = TypeTable::new();
        assert!(!table.equals(&Type::int(), &Type::Primitive(Primitive::Uint)));
        assert!(!table.equals(&Type::float(), &Type::Primitive(Primitive::Sfloat)));
        assert!(!table.equals(&Type::int(), &Type::null()));
    }

    #[test]
    fn test_structs_equal_structurally_without_identity() {
        let mut table = TypeTable::new();
        let a = point(&mut table, "Point$0");
        let b = point(&mut table, "Point$1");
        assert!(table.equals(&Type::Struct(a), &Type::Struct(b)));
        assert!(table.equals(&Type::Struct(b), &Type::Struct(a)));

        let c = table.add_struct(StructType::new("Point", "Point$2"));
        table.add_member(c, "x", Type::int(), false, false).unwrap();
        table.add_member(c, "y", Type::float(), false, false).unwrap();
        assert!(!table.equals(&Type::Struct(a), &Type::Struct(c)));

        let d = table.add_struct(StructType::new("Vec2", "Vec2$3"));
        table.add_member(d, "x", Type::int(), false, false).unwrap();
        table.add_member(d, "y", Type::int(), false, false).unwrap();
        assert!(!table.equals(&Type::Struct(a), &Type::Struct(d)));
    }

    #[test]
    fn test_self_referential_structs_terminate() {
        let mut table = TypeTable::new();
        let a = table.add_struct(StructType::new("Node", "Node$0"));
        table.add_member(a, "next", Type::Struct(a), false, false).unwrap();
        let b = table.add_struct(StructType::new("Node", "Node$1"));
        table.add_member(b, "next", Type::Struct(b), false, false).unwrap();
        assert!(table.equals(&Type::Struct(a), &Type::Struct(b)));
    }

    #[test]
    fn test_func_equality_includes_return() {
        let table = TypeTable::new();
        let f = Type::func(Some(Type::int()), vec![Type::int()]);
        let g = Type::func(None, vec![Type::int()]);
        let h = Type::func(Some(Type::int()), vec![Type::int(), Type::int()]);
        assert!(!table.equals(&f, &g));
        assert!(!table.equals(&f, &h));
        assert!(table.equals(&f, &f.clone()));
    }

    #[test]
    fn test_layout_orders_by_size_then_declaration() {
        let mut table = TypeTable::new();
        let id = table.add_struct(StructType::new("Mixed", "Mixed$0"));
        table.add_member(id, "flag", Type::bool(), false, false).unwrap();
        table.add_member(id, "count", Type::int(), false, false).unwrap();
        table.add_member(id, "ratio", Type::float(), false, false).unwrap();
        table.add_member(id, "other", Type::int(), false, false).unwrap();
        table.add_member(id, "name", Type::str(), false, false).unwrap();

        let layout = table.layout(id).clone();
        let order: Vec<(&str, usize)> = layout
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.offset))
            .collect();
        assert_eq!(
            order,
            vec![("ratio", 0), ("name", 8), ("count", 16), ("other", 20), ("flag", 24)]
        );
        assert_eq!(layout.size, 25);
        assert_eq!(table.size(&Type::Struct(id)), Some(25));
    }

    #[test]
    fn test_layout_offsets_are_contiguous_and_memoized() {
        let mut table = TypeTable::new();
        let id = table.add_struct(StructType::new("S", "S$0"));
        table.add_member(id, "a", Type::byte(), false, false).unwrap();
        table.add_member(id, "b", Type::float(), false, false).unwrap();
        table.add_member(id, "c", Type::Primitive(Primitive::Sfloat), false, false).unwrap();

        let first = table.layout(id).clone();
        assert_eq!(first.fields[0].offset, 0);
        for pair in first.fields.windows(2) {
            assert!(pair[0].offset <= pair[1].offset);
            assert_eq!(pair[0].offset + pair[0].size, pair[1].offset);
        }
        let last = first.fields.last().unwrap();
        assert_eq!(last.offset + last.size, table.size(&Type::Struct(id)).unwrap());

        let second = table.layout(id).clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_members_frozen_after_layout() {
        let mut table = TypeTable::new();
        let id = point(&mut table, "Point$0");
        let _ = table.layout(id);
        assert!(table.add_member(id, "z", Type::int(), false, false).is_err());
    }

    #[test]
    fn test_duplicate_member_is_redeclaration() {
        let mut table = TypeTable::new();
        let id = point(&mut table, "Point$0");
        let err = table.add_member(id, "x", Type::float(), false, false).unwrap_err();
        assert!(matches!(err, CompileError::Redeclaration { .. }));
    }

    #[test]
    fn test_unsized_types() {
        let table = TypeTable::new();
        assert_eq!(table.size(&Type::str()), None);
        assert_eq!(table.size(&Type::array(Type::int())), None);
        assert_eq!(table.size(&Type::Tuple(vec![Type::int(), Type::float()])), Some(12));
    }

    #[test]
    fn test_describe_and_key() {
        let mut table = TypeTable::new();
        let p = point(&mut table, "Point$7");
        let ty = Type::func(Some(Type::array(Type::Struct(p))), vec![Type::int()]);
        assert_eq!(table.describe(&ty), "func<array<Point>, int>");
        assert_eq!(table.key(&Type::Struct(p)), "Point$7");
        assert_eq!(table.describe(&Type::func(None, vec![])), "func<void>");
    }
}

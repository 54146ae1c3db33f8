use serde::{Deserialize, Serialize};

/// Source location of a node (1-based line and column, 0 when unknown)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loc {
    pub line: usize,
    pub column: usize,
}

impl Loc {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// An identifier occurrence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name {
    pub id: String,
    #[serde(default)]
    pub loc: Loc,
}

impl Name {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            loc: Loc::default(),
        }
    }

    pub fn at(id: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            id: id.into(),
            loc: Loc::new(line, column),
        }
    }
}

/// Root of one source file: either a module (has a spec) or a program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    #[serde(default)]
    pub imports: Vec<Import>,
    #[serde(default)]
    pub spec: Option<ModuleSpec>, // None for a program
    #[serde(default)]
    pub members: Vec<Member>,
}

impl CompilationUnit {
    pub fn is_module(&self) -> bool {
        self.spec.is_some()
    }

    pub fn is_program(&self) -> bool {
        self.spec.is_none()
    }

    pub fn is_internal(&self) -> bool {
        self.spec.as_ref().is_some_and(|spec| spec.internal)
    }
}

/// `module exposes a, b` or `internal module exposes a`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub exposes: Vec<Name>,
    #[serde(default)]
    pub loc: Loc,
}

/// Import statement: `import m "../dir/file" exposes a, b`
/// or `internal import m "dir/file"` for a whitebox import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub local_name: Name,
    pub path: String,
    #[serde(default)]
    pub path_loc: Loc,
    #[serde(default)]
    pub whitebox: bool,
    #[serde(default)]
    pub exposing: Vec<Name>,
    #[serde(default)]
    pub loc: Loc,
}

impl Import {
    pub fn new(local_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            local_name: Name::new(local_name),
            path: path.into(),
            path_loc: Loc::default(),
            whitebox: false,
            exposing: Vec::new(),
            loc: Loc::default(),
        }
    }
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Member {
    Var(VarDecl),
    Type(TypeDecl),
    Subprogram(SubprogramDecl),
    Prototype(PrototypeDecl),
}

impl Member {
    pub fn name(&self) -> &Name {
        match self {
            Member::Var(decl) => &decl.name,
            Member::Type(decl) => &decl.name,
            Member::Subprogram(decl) => &decl.name,
            Member::Prototype(decl) => &decl.name,
        }
    }

    /// Singleton subprograms and prototypes
    pub fn is_singleton(&self) -> bool {
        match self {
            Member::Subprogram(decl) => decl.singleton,
            Member::Prototype(decl) => decl.singleton,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Const,
    Param,
    Let,
    Var,
}

/// Variable, constant or parameter declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: Name,
    pub permission: Permission,
    #[serde(default)]
    pub datatype: Option<TypeSpec>,
    #[serde(default)]
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDeclKind {
    Struct(Vec<VarDecl>),
    NewType(TypeSpec),
    /// Declared without structure, e.g. for an extern handle
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: Name,
    pub kind: TypeDeclKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubprogramKind {
    Function,
    Activity,
}

/// Subprogram parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: Name,
    pub datatype: TypeSpec,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, datatype: TypeSpec) -> Self {
        Self {
            name: Name::new(name),
            datatype,
        }
    }
}

/// Function or activity with a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubprogramDecl {
    pub name: Name,
    pub kind: SubprogramKind,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub compile_time: bool, // evaluated during compilation only
    #[serde(default)]
    pub inputs: Vec<ParamDecl>,
    #[serde(default)]
    pub outputs: Vec<ParamDecl>,
    #[serde(default)]
    pub result: Option<TypeSpec>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

impl SubprogramDecl {
    pub fn function(name: impl Into<String>) -> Self {
        Self::new(name, SubprogramKind::Function)
    }

    pub fn activity(name: impl Into<String>) -> Self {
        Self::new(name, SubprogramKind::Activity)
    }

    fn new(name: impl Into<String>, kind: SubprogramKind) -> Self {
        Self {
            name: Name::new(name),
            kind,
            singleton: false,
            compile_time: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
            result: None,
            body: Vec::new(),
        }
    }
}

/// Subprogram signature without a body (implemented externally)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrototypeDecl {
    pub name: Name,
    pub kind: SubprogramKind,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub inputs: Vec<ParamDecl>,
    #[serde(default)]
    pub outputs: Vec<ParamDecl>,
    #[serde(default)]
    pub result: Option<TypeSpec>,
}

/// Type expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeSpec {
    Bool,
    Int(u8),
    Nat(u8),
    Bits(u8),
    Float(u8),
    Named(StaticAccessPath),
    Array {
        size: Box<Expr>, // compile-time evaluated
        element: Box<TypeSpec>,
    },
    Slice(Box<TypeSpec>),
}

impl TypeSpec {
    pub fn named(path: &str) -> Self {
        TypeSpec::Named(StaticAccessPath::from_dotted(path))
    }

    pub fn array(size: Expr, element: TypeSpec) -> Self {
        TypeSpec::Array {
            size: Box::new(size),
            element: Box::new(element),
        }
    }
}

/// Compile-time path: `T`, `m.T`, `m.Colors.red`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaticAccessPath {
    pub first: Name,
    #[serde(default)]
    pub rest: Vec<Name>,
}

impl StaticAccessPath {
    /// Builds a path from `a.b.c` text; locations are left unknown
    pub fn from_dotted(text: &str) -> Self {
        let mut parts = text.split('.').map(Name::new);
        let first = parts.next().unwrap_or_else(|| Name::new(text));
        Self {
            first,
            rest: parts.collect(),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &Name> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.segments().map(|n| n.id.as_str()).collect()
    }

    pub fn dotted(&self) -> String {
        self.ids().join(".")
    }
}

/// One access step after the first name of a dynamic path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Access {
    /// `.field` or `.member` of a module
    Field(Name),
    /// `[expr]`
    Index(Expr),
    /// `:member`, an extension member resolved implicitly
    Point(Name),
}

/// Run-time path: `x`, `x.f[i]`, `m.f`, `buf:reset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicAccessPath {
    pub first: Name,
    #[serde(default)]
    pub accesses: Vec<Access>,
}

impl DynamicAccessPath {
    pub fn from_dotted(text: &str) -> Self {
        let mut parts = text.split('.').map(Name::new);
        let first = parts.next().unwrap_or_else(|| Name::new(text));
        Self {
            first,
            accesses: parts.map(Access::Field).collect(),
        }
    }

    /// First name plus the leading run of field accesses, e.g. `m.f` for `m.f[i].g`
    pub fn static_prefix(&self) -> Vec<&str> {
        let mut ids = vec![self.first.id.as_str()];
        for access in &self.accesses {
            match access {
                Access::Field(name) => ids.push(name.id.as_str()),
                _ => break,
            }
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Bits(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Path(DynamicAccessPath),
    /// `prev x`, the value of `x` in the previous reaction
    Prev(DynamicAccessPath),
    Call(Box<Call>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Convert {
        expr: Box<Expr>,
        target: TypeSpec,
    },
    Array(Vec<Expr>),
    Struct {
        datatype: Option<TypeSpec>,
        fields: Vec<(Name, Expr)>,
    },
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn path(text: &str) -> Self {
        Expr::Path(DynamicAccessPath::from_dotted(text))
    }

    pub fn call(call: Call) -> Self {
        Expr::Call(Box::new(call))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

/// Subprogram invocation; `captures` are the singletons handed to a singleton callee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub callee: DynamicAccessPath,
    #[serde(default)]
    pub captures: Vec<StaticAccessPath>,
    #[serde(default)]
    pub inputs: Vec<Expr>,
    #[serde(default)]
    pub outputs: Vec<DynamicAccessPath>,
    #[serde(default)]
    pub loc: Loc,
}

impl Call {
    pub fn new(callee: &str) -> Self {
        Self {
            callee: DynamicAccessPath::from_dotted(callee),
            captures: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            loc: Loc::default(),
        }
    }

    pub fn with_captures(mut self, captures: &[&str]) -> Self {
        self.captures = captures
            .iter()
            .map(|c| StaticAccessPath::from_dotted(c))
            .collect();
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<Expr>) -> Self {
        self.inputs = inputs;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Var(VarDecl),
    Assign {
        lhs: DynamicAccessPath,
        rhs: Expr,
    },
    Call(Call),
    /// `run [receiver =] activity(...)`
    Run {
        receiver: Option<DynamicAccessPath>,
        call: Call,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Repeat {
        body: Vec<Stmt>,
        until: Option<Expr>,
    },
    Await(Expr),
    /// `when cond abort ... end`
    Abort {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Cobegin(Vec<Vec<Stmt>>),
    Assert(Expr),
    Return(Option<Expr>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_path_from_dotted() {
        let path = StaticAccessPath::from_dotted("m.Colors.red");
        assert_eq!(path.first.id, "m");
        assert_eq!(path.ids(), vec!["m", "Colors", "red"]);
        assert_eq!(path.dotted(), "m.Colors.red");
    }

    #[test]
    fn test_dynamic_static_prefix_stops_at_index() {
        let path = DynamicAccessPath {
            first: Name::new("m"),
            accesses: vec![
                Access::Field(Name::new("buf")),
                Access::Index(Expr::int(0)),
                Access::Field(Name::new("len")),
            ],
        };
        assert_eq!(path.static_prefix(), vec!["m", "buf"]);
    }

    #[test]
    fn test_unit_roundtrips_through_json() {
        let unit = CompilationUnit {
            imports: vec![Import::new("m", "../lib/m")],
            spec: Some(ModuleSpec {
                internal: true,
                exposes: vec![Name::new("f")],
                loc: Loc::default(),
            }),
            members: vec![Member::Subprogram(SubprogramDecl::function("f"))],
        };

        let json = serde_json::to_string(&unit).unwrap();
        let back: CompilationUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, unit);
        assert!(back.is_module());
        assert!(back.is_internal());
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let unit: CompilationUnit =
            serde_json::from_str(r#"{"imports":[{"local_name":{"id":"m"},"path":"m"}]}"#)
                .unwrap();
        assert!(unit.is_program());
        assert!(!unit.imports[0].whitebox);
        assert!(unit.members.is_empty());
    }
}

use super::*;
use crate::common::{CompileError, CompileResult, ModuleId};
use crate::driver::{compile, CompileConfig, Environment, FunctionInfo, MemoryLoader};
use crate::ir::{ExprKind, Stmt, StmtKind};
use pretty_assertions::assert_eq;
use std::path::Path;

fn build(files: &[(&str, &str)]) -> (Environment, CompileResult<ModuleId>) {
    let mut loader = MemoryLoader::new();
    for (path, source) in files {
        loader.add_file(*path, *source);
    }
    let mut env = Environment::new(CompileConfig::default(), Box::new(loader));
    let result = compile(&mut env, Path::new("main.bt"));
    (env, result)
}

fn check(source: &str) -> Environment {
    let (env, result) = build(&[("main.bt", source)]);
    if let Err(err) = result {
        panic!("expected {source:?} to compile, got {err}");
    }
    env
}

fn check_err(source: &str) -> CompileError {
    match build(&[("main.bt", source)]).1 {
        Ok(_) => panic!("expected {source:?} to fail"),
        Err(err) => err,
    }
}

fn function<'a>(env: &'a Environment, name: &str) -> &'a FunctionInfo {
    env.functions
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no function {name}"))
}

fn body_of<'a>(env: &'a Environment, name: &str) -> &'a Context {
    let ctx = function(env, name).body_context.expect("body was lowered");
    env.contexts.get(ctx)
}

fn root_body(env: &Environment) -> &[Stmt] {
    &env.module(ModuleId(0)).ir.as_ref().expect("module finished").body
}

// ==================== Scopes ====================

#[test]
fn test_redeclaration_in_same_scope() {
    let err = check_err("var x = 1; var x = 2;");
    assert!(matches!(err, CompileError::Redeclaration { ref name, .. } if name == "x"));
    assert_eq!(err.span().map(|s| s.start), Some(11));
}

#[test]
fn test_function_name_collides_with_variable() {
    assert!(check_err("var f = 1; func f() { }").is_reference_error());
    assert!(check_err("func f() { } var f = 1;").is_reference_error());
}

#[test]
fn test_sibling_functions_are_recorded_in_root() {
    let env = check("func int:test() { return 1; } func foo() { }");
    let root = env.contexts.get(env.module(ModuleId(0)).root);

    assert_eq!(root.functions.len(), 2);
    for name in ["test", "foo"] {
        let info = function(&env, name);
        let id = root.function_declarations.get(&info.assigned_name).copied();
        assert_eq!(id.map(|id| env.function(id).name.as_str()), Some(name));
    }
}

#[test]
fn test_nested_function_sees_later_declaration() {
    check("func int:test() { func int:bar() { return x; } int:x = 0; return bar(); }");
}

#[test]
fn test_straight_line_reference_before_declaration_fails() {
    let err = check_err("func int:test() { return bar(); func int:bar() { return 1; } }");
    assert!(matches!(err, CompileError::Reference { .. }));
}

#[test]
fn test_root_reference_before_declaration_fails() {
    assert!(check_err("var r = later(); func int:later() { return 1; }").is_reference_error());
    check("func a() { b(); } func b() { }");
}

#[test]
fn test_shadowing_in_child_scope() {
    check("var x = 1; func int:foo(int:x) { var x = 2; }");
}

#[test]
fn test_declaration_cannot_see_itself() {
    let err = check_err("func f() { var y = y; }");
    assert!(err.is_reference_error());
}

// ==================== Closures ====================

#[test]
fn test_lexical_mutation_marks_intermediate_scopes() {
    let env = check(
        "func outer() {
            int:count = 0;
            func middle() {
                func inner() { count = count + 1; }
                inner();
            }
            middle();
        }",
    );
    let count = body_of(&env, "outer")
        .assigned_name("count")
        .expect("count declared")
        .to_string();

    for name in ["inner", "middle"] {
        let ctx = body_of(&env, name);
        assert!(!ctx.side_effect_free, "{name} mutates an outer variable");
        assert!(ctx.lexical_modifications.contains(&count));
        assert!(ctx.accesses_lexical_scope);
    }
    let outer = body_of(&env, "outer");
    assert!(outer.side_effect_free);
    assert!(outer.lexical_modifications.is_empty());
}

#[test]
fn test_lexical_lookup_records_definer() {
    let env = check("func outer() { int:x = 1; func inner() { int:y = x; } }");
    let outer_ctx = function(&env, "outer").body_context;
    let inner = body_of(&env, "inner");
    let x = body_of(&env, "outer").assigned_name("x").expect("x declared");

    assert_eq!(inner.lexical_lookups.get(x).copied(), outer_ctx);
    assert!(!inner.accesses_global_scope);
}

#[test]
fn test_global_access_is_not_a_side_effect() {
    let env = check("int:g = 1; func int:f() { g = 2; return g; }");
    let f = body_of(&env, "f");
    assert!(f.accesses_global_scope);
    assert!(!f.accesses_lexical_scope);
    assert!(f.side_effect_free);
}

#[test]
fn test_first_class_functions() {
    let env = check("func foo() { } func bar() { var f = foo; foo(); } func baz() { bar(); }");
    assert!(function(&env, "foo").first_class);
    assert!(!function(&env, "bar").first_class);
    assert!(!function(&env, "baz").first_class);
}

// ==================== Assignment ====================

#[test]
fn test_assigning_to_function_declaration_fails() {
    assert!(check_err("func foo() { } func bar() { foo = bar; }").is_type_error());
}

#[test]
fn test_assignment_requires_equal_types() {
    assert!(check_err("int:x = 1; func f() { x = 2.5; }").is_type_error());
    assert!(check_err("const c = 1; func f() { c = 2; }").is_type_error());
    check("func<int>:f = null; func int:one() { return 1; } func g() { f = one; }");
}

#[test]
fn test_final_member_only_set_in_constructor() {
    let inside = "object Point { final int:x; new(int:x) { self.x = x; } }";
    check(inside);

    let outside = "object Point { final int:x; new(int:x) { self.x = x; } func move() { self.x = 1; } }";
    assert!(check_err(outside).is_type_error());

    let external = "object Point { final int:x; } func f(Point:p) { p.x = 3; }";
    assert!(check_err(external).is_type_error());
}

// ==================== Expressions ====================

#[test]
fn test_binary_operand_rules() {
    assert!(check_err("var x = 1 + 1.0;").is_type_error());
    assert!(check_err("var x = 1.0 & 2.0;").is_type_error());
    assert!(check_err("var x = 1 and 2;").is_type_error());
    assert!(check_err("var b = 1 == null;").is_type_error());
    check("var a = 1 << 2; var b = true or false; var c = 1.5 < 2.5; str:s = \"a\" + \"b\";");
    check("object P { int:x; } func f(P:p) { var b = p == null; var c = null == p; }");
}

#[test]
fn test_unary_operand_rules() {
    check("var n = -1; var f = -2.5; var b = not true; var c = !false; var m = ~1;");
    assert!(check_err("var n = -true;").is_type_error());
    assert!(check_err("var b = not 1;").is_type_error());
    assert!(check_err("var m = ~1.5;").is_type_error());
}

#[test]
fn test_error_points_at_innermost_node() {
    let err = check_err("func f() { var y = 1 + true; }");
    assert!(err.is_type_error());
    assert_eq!(err.span().map(|s| s.start), Some(19));
}

#[test]
fn test_call_arity_and_argument_types() {
    let add = "func int:add(int:a, int:b) { return a + b; }";
    check(&format!("{add} int:x = add(1, 2);"));
    assert!(check_err(&format!("{add} var x = add(1);")).is_type_error());
    assert!(check_err(&format!("{add} var x = add(1, 2.0);")).is_type_error());
    assert!(check_err(&format!("{add} float:x = add(1, 2);")).is_type_error());
    assert!(check_err("int:x = 1; var y = x(2);").is_type_error());
}

#[test]
fn test_method_calls_skip_receiver() {
    let counter = "object Counter { int:n; func int:get() { return self.n; } func add(int:k) { self.n = self.n + k; } }";
    check(&format!("{counter} func f(Counter:c) {{ int:v = c.get(); c.add(2); }}"));
    assert!(check_err(&format!("{counter} func f(Counter:c) {{ c.add(); }}")).is_type_error());
    assert!(check_err(&format!("{counter} func g() {{ }} func f(Counter:c) {{ c.get = g; }}")).is_type_error());
}

#[test]
fn test_private_members() {
    let secret = "object Secret { private int:code; func int:reveal() { return self.code; } }";
    check(secret);
    assert!(check_err(&format!("{secret} func f(Secret:s) {{ var c = s.code; }}")).is_type_error());
}

#[test]
fn test_new_checks_constructor() {
    check("object P { int:x; } var p = new P();");
    assert!(check_err("object P { int:x; } var p = new P(1);").is_type_error());

    let q = "object Q { int:x; new(int:x) { self.x = x; } }";
    check(&format!("{q} var q = new Q(1);"));
    assert!(check_err(&format!("{q} var q = new Q();")).is_type_error());
    assert!(check_err("var i = new int();").is_type_error());
    check("array<int>:a = new array<int>(3);");
}

#[test]
fn test_subscripts() {
    check("array<int>:a = new array<int>(3); int:v = a[0]; int:n = a.length;");
    assert!(check_err("array<int>:a = new array<int>(3); var v = a[1.0];").is_type_error());
    check("str:s = \"hi\"; byte:b = s[0]; int:n = s.length;");
    check("var t = [: 1, 2.5]; float:f = t[1];");
    assert!(check_err("var t = [: 1, 2.5]; var f = t[2];").is_type_error());
    assert!(check_err("var t = [: 1, 2.5]; int:i = 0; var f = t[i];").is_type_error());
    assert!(check_err("int:x = 1; var y = x[0];").is_type_error());
}

#[test]
fn test_operator_overloads_bypass_builtin_rules() {
    let vec = "object Vec { float:x; new(float:x) { self.x = x; } }";
    assert!(check_err(&format!("{vec} var v = new Vec(1.0) + new Vec(2.0);")).is_type_error());

    let env = check(&format!(
        "{vec}
        operator (Vec:a + Vec:b) Vec {{ return new Vec(a.x + b.x); }}
        operator (Vec:v [] int:i) float {{ return v.x; }}
        var v = new Vec(1.0) + new Vec(2.0);
        float:first = v[0];"
    ));
    assert_eq!(env.operators.len(), 2);

    let overload = root_body(&env).iter().find_map(|stmt| match &stmt.kind {
        StmtKind::Declaration { name, value, .. } if name == "v" => match &value.kind {
            ExprKind::Binary { overload, .. } => overload.clone(),
            _ => None,
        },
        _ => None,
    });
    assert!(overload.is_some_and(|name| name.starts_with("operator$")));
}

#[test]
fn test_casts() {
    check("var f = 1 as float; var b = 2.5 as byte;");
    assert!(check_err("var i = \"a\" as int;").is_type_error());
}

#[test]
fn test_null_needs_a_type() {
    assert!(check_err("var x = null;").is_type_error());
    check("object P { int:x; } P:p = null;");
    assert!(check_err("int:x = null;").is_type_error());
}

#[test]
fn test_overloads_apply_before_their_declaration() {
    check(
        "object Vec { float:x; new(float:x) { self.x = x; } }
        var v = new Vec(1.0) + new Vec(2.0);
        var first = v[0];
        float:check = first;
        operator (Vec:a + Vec:b) Vec { return new Vec(a.x + b.x); }
        operator (Vec:w [] int:i) float { return w.x; }",
    );
}

#[test]
fn test_objects_are_visible_throughout_their_scope() {
    check("var p = new P(); object P { int:x; }");
    check("object A { B:b; } object B { int:x; } func f(A:a) { int:v = a.b.x; }");
}

#[test]
fn test_assignment_through_overloaded_subscript_fails() {
    let source = "object Vec { float:x; }
        operator (Vec:v [] int:i) float { return v.x; }
        func f(Vec:v) { v[0] = 1.0; }";
    assert!(check_err(source).is_type_error());
}

// ==================== Statements ====================

#[test]
fn test_control_flow_rules() {
    assert!(check_err("if (1) { }").is_type_error());
    assert!(check_err("func f() { break; }").is_type_error());
    assert!(check_err("return 1;").is_type_error());
    assert!(check_err("func int:f() { return 1.0; }").is_type_error());
    assert!(check_err("func f() { return 1; }").is_type_error());
    assert!(check_err("func int:f() { return; }").is_type_error());
    check("func int:f(int:n) { int:total = 0; for (int:i = 0; i < n; i = i + 1) { if (i == 3) { continue; } total = total + i; } while (true) { break; } do { } while (false); return total; }");
}

#[test]
fn test_break_inside_nested_function_is_not_in_loop() {
    assert!(check_err("func f() { while (true) { func g() { break; } } }").is_type_error());
}

#[test]
fn test_switchtype_is_a_static_assertion() {
    let env = check("int:x = 1; switchtype (x) { case float { } case int { } }");
    let matched = root_body(&env).iter().find_map(|stmt| match &stmt.kind {
        StmtKind::SwitchType { matched, .. } => *matched,
        _ => None,
    });
    assert_eq!(matched, Some(1));

    assert!(check_err("int:x = 1; switchtype (x) { case int { } case int { } }").is_type_error());
    assert!(check_err("int:x = 1; switchtype (x) { case float { } }").is_type_error());
}

#[test]
fn test_struct_layout_from_source() {
    let env = check("object Mixed { bool:flag; float:ratio; int:count; }");
    let layout = env.types.layout(crate::common::StructId(0));
    let offsets: Vec<(&str, usize)> = layout
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.offset))
        .collect();
    assert_eq!(offsets, vec![("ratio", 0), ("count", 8), ("flag", 12)]);
    assert_eq!(layout.size, 13);
}

// ==================== Modules ====================

const UTIL: &str = "
    func int:double(int:x) { return x * 2; }
    object Point { int:x; }
    int:hidden = 0;
    export double;
    export Point;
";

#[test]
fn test_exports() {
    let env = check("func main() { } object P { int:x; } export main; export P;");
    let root = env.contexts.get(env.module(ModuleId(0)).root);
    assert_eq!(root.exports.get("main").map(|e| e.kind), Some(ExportKind::Function));
    assert_eq!(root.exports.get("P").map(|e| e.kind), Some(ExportKind::Type));

    assert!(check_err("func f() { func g() { } export g; }").is_type_error());
    assert!(check_err("int:x = 1; export x;").is_type_error());
    assert!(check_err("export missing;").is_reference_error());
}

#[test]
fn test_from_import_binds_exports() {
    let (env, result) = build(&[
        ("main.bt", "from util import double, Point; int:y = double(2); Point:p = new Point();"),
        ("util.bt", UTIL),
    ]);
    assert!(result.is_ok(), "{:?}", result.err());
    assert_eq!(env.modules().len(), 2);

    let (_, result) = build(&[("main.bt", "from util import hidden;"), ("util.bt", UTIL)]);
    assert!(result.unwrap_err().is_reference_error());
}

#[test]
fn test_module_import_exposes_function_exports() {
    let (_, result) = build(&[
        ("main.bt", "import util; import util as u; int:z = util.double(3) + u.double(1);"),
        ("util.bt", UTIL),
    ]);
    assert!(result.is_ok(), "{:?}", result.err());

    let (_, result) = build(&[("main.bt", "import util as u; var w = u.missing;"), ("util.bt", UTIL)]);
    assert!(result.unwrap_err().is_reference_error());
}

#[test]
fn test_modules_compile_once() {
    let (env, result) = build(&[
        ("main.bt", "import util; from util import double;"),
        ("util.bt", UTIL),
    ]);
    assert!(result.is_ok());
    assert_eq!(env.modules().len(), 2);
    assert_eq!(function(&env, "double").assigned_name, "double$0");
}

#[test]
fn test_import_cycle_is_a_reference_error() {
    let (_, result) = build(&[("main.bt", "import other;"), ("other.bt", "import main;")]);
    assert!(result.unwrap_err().is_reference_error());
}

#[test]
fn test_missing_module() {
    let (_, result) = build(&[("main.bt", "import nowhere;")]);
    let err = result.unwrap_err();
    assert!(err.is_reference_error());
    assert_eq!(err.span().map(|s| s.start), Some(0));
}

fn first_class_of_double(main: &str) -> bool {
    let (env, result) = build(&[("main.bt", main), ("util.bt", UTIL)]);
    assert!(result.is_ok(), "{:?}", result.err());
    function(&env, "double").first_class
}

#[test]
fn test_imported_function_used_as_value_is_first_class() {
    assert!(first_class_of_double("from util import double; func<int, int>:f = double;"));
    assert!(!first_class_of_double("from util import double; int:y = double(2);"));
}

#[test]
fn test_module_member_used_as_value_is_first_class() {
    assert!(first_class_of_double("import util; func<int, int>:f = util.double;"));
    assert!(!first_class_of_double("import util; int:y = util.double(2);"));
}

#[test]
fn test_exports_remember_their_declaration() {
    let (env, result) = build(&[("main.bt", "import util;"), ("util.bt", UTIL)]);
    assert!(result.is_ok());
    let util = env.modules().iter().find(|m| m.name == "util").expect("util compiled");
    let exports = &env.contexts.get(util.root).exports;

    let double = exports.get("double").and_then(|e| e.function);
    assert_eq!(double.map(|id| env.function(id).name.as_str()), Some("double"));
    assert_eq!(exports.get("Point").and_then(|e| e.function), None);
}

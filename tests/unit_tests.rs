//! Integration tests for NyaLang using Unit as the entry point.
//!
//! Each test compiles a complete script from `test_scripts/` and runs the
//! resulting image on the VM.

use std::path::PathBuf;

use nyalang::compiler::image::{MAGIC, MetadataValue};
use nyalang::{CompilationError, NyaError, RuntimeError, Unit, UnitError, Value, Vm};
use rust_decimal::Decimal;

/// Load a test script from the test_scripts directory.
fn load_script(filename: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_scripts")
        .join(filename);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Build a unit from a single test script.
fn build_script(filename: &str) -> Unit {
    build_source(filename, load_script(filename))
}

fn build_source(filename: &str, source: impl Into<String>) -> Unit {
    let mut unit = Unit::new();
    unit.add_source(filename, source).expect("Failed to add source");
    unit.build().expect("Failed to build unit");
    unit
}

fn compile_error(source: &str) -> CompilationError {
    let mut unit = Unit::new();
    unit.add_source("inline.nya", source).unwrap();
    match unit.build() {
        Err(UnitError::Nya(NyaError::Compilation(err))) => err,
        other => panic!("expected a compilation error, got {other:?}"),
    }
}

fn call(unit: &Unit, name: &str) -> Value {
    unit.call(name, vec![])
        .unwrap_or_else(|e| panic!("{name} failed: {e}"))
        .unwrap_or_else(|| panic!("{name} returned nothing"))
}

fn string(s: &str) -> Value {
    Value::from(s)
}

// =============================================================================
// End to End
// =============================================================================

#[test]
fn test_end_to_end_scenario() {
    let unit = build_script("end_to_end.nya");
    let image = unit.image().unwrap();
    assert_eq!(image.name(), "EndToEnd");
    assert_eq!(image.metadata().version, [1, 0, 0, 0]);

    let Some(Value::F64(result)) = unit.run(&[]).unwrap() else {
        panic!("entry point should return a double");
    };
    let expected = 12.0 + (10.0 + 12.0 * 35.0 + (5.4 - 7.4f64)).log10();
    assert!((result - expected).abs() < 1e-6, "{result} != {expected}");
}

#[test]
fn test_zoo_program() {
    let unit = build_script("zoo.nya");
    let image = unit.image().unwrap();
    assert_eq!(image.name(), "Zoo");
    assert_eq!(image.metadata().version, [2, 1, 0, 0]);
    assert_eq!(
        image.metadata().attribute("Company"),
        Some(&MetadataValue::String("Nya Labs".into()))
    );

    let animal = image.find_type("Zoo.Animal").unwrap();
    let cat = image.find_type("Zoo.Cat").unwrap();
    let dog = image.find_type("Zoo.Dog").unwrap();
    assert!(animal < cat);
    assert!(image.is_subtype(cat, dog));

    let entry = image.entry_point().unwrap();
    assert_eq!(image.method_display(entry), "Zoo.Program.Main");

    let mut vm = Vm::new(image).capturing();
    let args = vec!["a".to_string(), "b".to_string()];
    assert_eq!(vm.run_entry(&args).unwrap(), Some(Value::I32(1)));
    assert_eq!(vm.take_output(), vec!["meow", "10", "5", "2"]);
}

// =============================================================================
// Literals and Numbers
// =============================================================================

#[test]
fn test_literals() {
    let unit = build_script("literals.nya");
    assert_eq!(call(&unit, "Byte"), Value::U8(12));
    assert_eq!(call(&unit, "UpperByte"), call(&unit, "Byte"));
    assert_eq!(call(&unit, "Long"), Value::I64(5));
    assert_eq!(call(&unit, "ULong"), Value::U64(7));
    assert_eq!(call(&unit, "Short"), Value::I16(-3));
    assert_eq!(call(&unit, "Exact"), Value::Decimal(Decimal::new(13, 3)));
    assert_eq!(call(&unit, "Single"), Value::F32(7.4));
    assert_eq!(call(&unit, "Wide"), Value::F64(2.5));
    assert_eq!(call(&unit, "Flag"), Value::Bool(true));
    assert_eq!(call(&unit, "Text"), string("tab\there"));
    assert_eq!(call(&unit, "Nothing"), Value::Null);
}

#[test]
fn test_decimal_arithmetic() {
    let unit = build_script("decimals.nya");
    assert_eq!(call(&unit, "Total"), Value::Decimal(Decimal::new(75, 1)));
    assert_eq!(call(&unit, "Discount"), Value::Decimal(Decimal::new(975, 2)));
    assert_eq!(call(&unit, "Half"), Value::Decimal(Decimal::new(5, 1)));
    assert_eq!(call(&unit, "Whole"), Value::I64(42));
}

#[test]
fn test_out_of_range_literal() {
    let err = compile_error("F(): byte { return 300b; }");
    assert!(matches!(err, CompilationError::InvalidLiteral { .. }));
}

// =============================================================================
// Operators
// =============================================================================

#[test]
fn test_right_operator_converts_left_after_both_sides() {
    let unit = build_script("operators.nya");
    let mut vm = unit.vm().unwrap().capturing();
    assert_eq!(vm.call("Run", vec![]).unwrap(), Some(Value::I32(12)));
    assert_eq!(vm.take_output(), vec!["left", "right", "convert"]);
}

#[test]
fn test_native_operators() {
    let unit = build_script("operators.nya");
    assert_eq!(call(&unit, "Shift"), Value::I64(16));
    assert_eq!(call(&unit, "Mixed"), Value::F64(3.5));
    assert_eq!(
        unit.call("Greeting", vec![string("tom")]).unwrap(),
        Some(string("hello tom!"))
    );
}

#[test]
fn test_double_plus_int_truncates_the_double() {
    let unit = build_source(
        "truncate.nya",
        "Sum(): double { x = 2.5d; return x + 1; }
         Compound(): double { x = 2.5d; x += 1; return x; }",
    );
    assert_eq!(call(&unit, "Sum"), Value::F64(3.0));
    assert_eq!(call(&unit, "Compound"), Value::F64(3.0));
}

#[test]
fn test_unsigned_to_double_is_rejected() {
    let err = compile_error("F(x: uint): double { return x; }");
    assert!(matches!(err, CompilationError::Conversion { ref from, ref to, .. } if from == "uint" && to == "double"));
}

// =============================================================================
// Declarations
// =============================================================================

#[test]
fn test_non_public_override_is_rejected() {
    let err = compile_error(
        "class Animal { @public @virtual Speak(): string { return \"...\"; } }
         class Cat : Animal { Speak(): string { return \"meow\"; } }",
    );
    assert!(matches!(err, CompilationError::Visibility { ref name, .. } if name == "Cat.Speak"));
}

#[test]
fn test_public_override_dispatches() {
    let unit = build_source(
        "override.nya",
        "class Animal { @public @virtual Speak(): string { return \"...\"; } }
         class Cat : Animal { @public Speak(): string { return \"meow\"; } }
         Talk(a: Animal): string { return a.Speak(); }
         Run(): string { return Talk(new Cat()); }",
    );
    assert_eq!(call(&unit, "Run"), string("meow"));
}

#[test]
fn test_cyclic_classes() {
    let err = compile_error("class A : C { } class B : A { } class C : B { }");
    assert!(matches!(err, CompilationError::CyclicDependency { .. }));
}

#[test]
fn test_duplicate_entry_point() {
    let err = compile_error(
        "class A { @public !@entry Main() { } }
         class B { @public !@entry Main() { } }",
    );
    assert!(matches!(err, CompilationError::DuplicateEntryPoint { .. }));
}

#[test]
fn test_unimplemented_interface_method() {
    let err = compile_error("interface Dog { DoThing(): int; } class Cat : Dog { }");
    assert!(matches!(err, CompilationError::UnimplementedInterfaceMethod { .. }));
}

#[test]
fn test_missing_return() {
    let err = compile_error("F(): int { x = 1; }");
    assert!(matches!(err, CompilationError::MissingReturn { .. }));
}

// =============================================================================
// Runtime Library
// =============================================================================

#[test]
fn test_optional_parameters_and_coalescing() {
    let unit = build_script("runtime.nya");
    assert_eq!(call(&unit, "WithDefaults"), string("bacon"));
    assert_eq!(call(&unit, "KeepsFirst"), string("tom"));
}

#[test]
fn test_regex_literal() {
    let unit = build_script("runtime.nya");
    assert_eq!(unit.call("IsCat", vec![string("CAT")]).unwrap(), Some(Value::Bool(true)));
    assert_eq!(unit.call("IsCat", vec![string("c@t")]).unwrap(), Some(Value::Bool(true)));
    assert_eq!(unit.call("IsCat", vec![string("dog")]).unwrap(), Some(Value::Bool(false)));
}

#[test]
fn test_collections() {
    let unit = build_script("runtime.nya");
    assert_eq!(call(&unit, "Names"), Value::I32(2));

    let err = unit.call("Ages", vec![]).unwrap_err();
    assert!(matches!(
        err,
        UnitError::Nya(NyaError::Runtime(RuntimeError::TypeMismatch { ref detail, .. })) if detail.contains("tom")
    ));
}

#[test]
fn test_math_and_strings() {
    let unit = build_script("runtime.nya");
    assert_eq!(unit.call("Root", vec![Value::F64(81.0)]).unwrap(), Some(Value::F64(9.0)));
    assert_eq!(unit.call("Length", vec![string("nya")]).unwrap(), Some(Value::I32(3)));
}

// =============================================================================
// Program Images
// =============================================================================

#[test]
fn test_save_image() {
    let unit = build_script("zoo.nya");
    let path = std::env::temp_dir().join(format!("nyalang-zoo-{}.nyx", std::process::id()));
    unit.save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(&bytes[..4], MAGIC);
    assert_eq!(bytes, unit.image().unwrap().to_bytes());
}

#[test]
fn test_sources_compile_together() {
    let mut unit = Unit::new();
    unit.add_source("cat.nya", "class Cat { @public !Lives(): int { return 9; } }").unwrap();
    unit.add_source("main.nya", "class Program { @public !@entry Main(): int { return Cat.Lives(); } }")
        .unwrap();
    unit.build().unwrap();
    assert_eq!(unit.source_count(), 2);
    assert_eq!(unit.run(&[]).unwrap(), Some(Value::I32(9)));
}

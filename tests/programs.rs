use std::time::Duration;

use clesh::value::Value;
use clesh::{compile, run, Console, ErrorKind, Status, VM};

fn scalar(vm: &VM, address: i32) -> Value {
    vm.value_at(address).expect("address in range")
}

fn field(vm: &VM, address: i32, name: &str) -> Value {
    let block = vm.memory().block(address).expect("address in range");
    block.fields.get(name).cloned().unwrap_or(Value::Empty)
}

#[test]
fn test_set_reads_back() {
    let vm = run("set #3 to 5\nstop", 16).expect("Execution failed");
    assert_eq!(scalar(&vm, 3), Value::Number(5));
}

#[test]
fn test_list_field_round_trip() {
    // `#[L]:0` is a field named "0" on the list's first block
    let vm = run("list L alloc 3\nset #[L]:0 to \"x\"\nset #10 to #[L]:0\nstop", 16)
        .expect("Execution failed");
    assert_eq!(field(&vm, 0, "0"), Value::from("x"));
    assert_eq!(scalar(&vm, 10), Value::from("x"));
}

#[test]
fn test_list_indexing() {
    let source = r#"
        list enemies alloc 3
        var i
        label fill
        set #[enemies]:[i]:hp to #[i] * 10
        set #[i] to #[i] + 1
        test #[i] lt 3
        move #[fill]
        set #[i] to 2
        set #20 to #[enemies]:[i]:hp
        stop
    "#;
    let vm = run(source, 32).expect("Execution failed");
    assert_eq!(field(&vm, 0, "hp"), Value::Number(0));
    assert_eq!(field(&vm, 1, "hp"), Value::Number(10));
    assert_eq!(field(&vm, 2, "hp"), Value::Number(20));
    assert_eq!(scalar(&vm, 20), Value::Number(20));
}

#[test]
fn test_hash_access() {
    let source = r#"
        var inventory
        var key
        set #[key] to "gold"
        set #[inventory]:[key] to 250
        set #[key] to "gems"
        set #[inventory]:[key] to 3
        set #[key] to "gold"
        set #20 to #[inventory]:[key]
        set #21 to #[inventory]:missing
        stop
    "#;
    let vm = run(source, 32).expect("Execution failed");
    assert_eq!(field(&vm, 0, "gold"), Value::Number(250));
    assert_eq!(field(&vm, 0, "gems"), Value::Number(3));
    assert_eq!(scalar(&vm, 20), Value::Number(250));
    assert_eq!(scalar(&vm, 21), Value::from("null"));
}

#[test]
fn test_forward_move_skips_block() {
    let vm = run("move #[skip]\nset #10 to 1\nlabel skip\nset #11 to 2\nstop", 16)
        .expect("Execution failed");
    assert_eq!(scalar(&vm, 10), Value::Number(0));
    assert_eq!(scalar(&vm, 11), Value::Number(2));
}

#[test]
fn test_nested_calls() {
    let source = r#"
        var n
        call #[outer]
        stop
        label outer
        set #[n] to #[n] + 1
        call #[inner]
        set #[n] to #[n] * 10
        return
        label inner
        set #[n] to #[n] + 2
        return
    "#;
    let vm = run(source, 32).expect("Execution failed");
    assert_eq!(scalar(&vm, 0), Value::Number(30));
    assert!(vm.is_done());
}

#[test]
fn test_string_comparison() {
    let source = r#"
        var name
        set #[name] to "hero"
        test #[name] eq "hero"
        set #10 to 1
        test #[name] ne "hero"
        set #11 to 1
        test 5 eq "5"
        set #12 to 1
        stop
    "#;
    let vm = run(source, 32).expect("Execution failed");
    assert_eq!(scalar(&vm, 10), Value::Number(1));
    assert_eq!(scalar(&vm, 11), Value::Number(0));
    // numeric comparison: the string side counts as 0
    assert_eq!(scalar(&vm, 12), Value::Number(0));
}

#[test]
fn test_defines_and_builtins() {
    let source = r#"
        define SPEED as 4
        set #10 to [SPEED] * [SCREEN_W]
        set #11 to [KEYBOARD]
        set #12 to [OVERLAY]
        stop
    "#;
    let vm = run(source, 16).expect("Execution failed");
    assert_eq!(scalar(&vm, 10), Value::Number(1600));
    assert_eq!(scalar(&vm, 11), Value::Number(-1));
    assert_eq!(scalar(&vm, 12), Value::Number(5));
}

#[test]
fn test_bare_return_is_runtime_error() {
    let err = run("set #5 to 1\nreturn", 16).unwrap_err();
    assert_eq!(err.kind, ErrorKind::StackUnderflow);
    assert_eq!(err.command, Some(("return".to_string(), 1)));
    assert!(!err.is_compile_error());
}

#[test]
fn test_undefined_label_is_compile_error() {
    let err = run("move #[nowhere]", 16).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndefinedSymbol("nowhere".to_string()));
    assert!(err.is_compile_error());
    assert!(err.to_string().starts_with("[line 1] Error:"));
}

#[test]
fn test_running_off_the_end_halts() {
    let vm = run("set #5 to 1", 8).expect("Execution failed");
    assert!(vm.is_halted());
    assert!(!vm.is_done());
}

#[test]
fn test_yield_and_resume() {
    let source = r#"
        var i
        label top
        set #[i] to #[i] + 1
        test #[i] lt 1000
        move #[top]
        stop
    "#;
    let mut console = Console::new(".");
    let program = compile(source, 16, &mut console).expect("Compile failed");
    let mut vm = VM::new(program).with_quantum(Duration::ZERO);

    let mut calls = 0;
    loop {
        let before = vm.pc();
        let status = vm.execute(&mut console).expect("Execution failed");
        calls += 1;
        assert!(vm.pc() != before || status == Status::Halted);
        if status == Status::Halted {
            break;
        }
    }
    assert_eq!(scalar(&vm, 0), Value::Number(1000));
    assert!(calls > 1000);
}

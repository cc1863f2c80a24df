use pipesh::config::ErrorFormat;
use pipesh::parser::ast::Program;
use pipesh::parser::ParseError;
use pipesh::resolver::{resolve, ResolveError};
use pipesh::{Interpreter, LineOutcome, Runtime};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

fn install_tool(dir: &Path, says: &str) {
    let path = dir.join("tool");
    fs::write(&path, format!("#!/bin/sh\necho {}\n", says)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_path_scan_order() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    install_tool(a.path(), "from-a");
    install_tool(b.path(), "from-b");
    let path = format!("{}:{}", a.path().display(), b.path().display());

    let resolution = resolve("tool", Some(&path)).unwrap();
    assert_eq!(resolution.program, Program::External(a.path().join("tool")));

    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("out.txt");
    let mut runtime = Runtime::new();
    runtime.set_variable("PATH", path);
    let mut interp = Interpreter::new(runtime, ErrorFormat::Text);

    match interp
        .interpret_line(&format!("tool > {}", out.display()))
        .unwrap()
    {
        LineOutcome::Ran(result) => assert_eq!(result.exit_code, 0),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(fs::read_to_string(out).unwrap(), "from-a\n");
}

#[test]
fn test_path_variable_need_not_come_first() {
    let a = TempDir::new().unwrap();
    install_tool(a.path(), "found");

    let mut runtime = Runtime::new();
    runtime.set_variable("EARLY", "x");
    runtime.set_variable("PATH", a.path().display().to_string());
    runtime.set_variable("LATE", "y");
    let mut interp = Interpreter::new(runtime, ErrorFormat::Text);

    assert!(matches!(
        interp.interpret_line("tool").unwrap(),
        LineOutcome::Ran(_)
    ));
}

#[test]
fn test_unreadable_path_entry_is_skipped() {
    let b = TempDir::new().unwrap();
    install_tool(b.path(), "from-b");
    let path = format!("/nonexistent/pipesh:{}", b.path().display());

    let resolution = resolve("tool", Some(&path)).unwrap();
    assert_eq!(resolution.program, Program::External(b.path().join("tool")));
    assert_eq!(resolution.skipped.len(), 1);
}

#[test]
fn test_unknown_command_names_command() {
    let mut runtime = Runtime::new();
    runtime.set_variable("PATH", "/usr/bin:/bin");
    let mut interp = Interpreter::new(runtime, ErrorFormat::Text);

    let err = interp.interpret_line("not_a_real_cmd --flag").unwrap_err();
    assert!(matches!(
        err,
        ParseError::Resolve(ResolveError::NotFound { ref name, .. }) if name == "not_a_real_cmd"
    ));
    assert!(err.to_string().contains("not_a_real_cmd"));
}

#[test]
fn test_unknown_command_spawns_nothing() {
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("out.txt");
    let mut runtime = Runtime::new();
    runtime.set_variable("PATH", "/usr/bin:/bin");
    let mut interp = Interpreter::new(runtime, ErrorFormat::Text);

    // The first stage is valid but must not run because the second is not
    let line = format!("echo hi > {} | not_a_real_cmd", out.display());
    assert!(interp.interpret_line(&line).is_err());
    assert!(!out.exists());
}

#[test]
fn test_missing_path_variable() {
    let mut interp = Interpreter::new(Runtime::new(), ErrorFormat::Text);
    assert!(matches!(
        interp.interpret_line("ls"),
        Err(ParseError::Resolve(ResolveError::PathUnset { .. }))
    ));
}

use pipesh::config::ErrorFormat;
use pipesh::{Interpreter, LineOutcome, PipelineResult, Runtime, StageStatus};
use std::fs;
use tempfile::TempDir;

fn interpreter(temp_dir: &TempDir) -> Interpreter {
    let mut runtime = Runtime::new();
    runtime.set_variable("PATH", "/usr/bin:/bin");
    runtime.set_variable("DIR", temp_dir.path().display().to_string());
    Interpreter::new(runtime, ErrorFormat::Text)
}

fn run(interp: &mut Interpreter, line: &str) -> PipelineResult {
    match interp.interpret_line(line).unwrap() {
        LineOutcome::Ran(result) => result,
        other => panic!("expected a pipeline to run, got {:?}", other),
    }
}

#[test]
fn test_stdout_redirect_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut interp = interpreter(&temp_dir);

    let result = run(&mut interp, "echo hi > $DIR/out.txt");

    assert!(result.success());
    let content = fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
    assert_eq!(content, "hi\n");
}

#[test]
fn test_stdout_append() {
    let temp_dir = TempDir::new().unwrap();
    let mut interp = interpreter(&temp_dir);

    run(&mut interp, "echo hi > $DIR/out.txt");
    run(&mut interp, "echo hi >> $DIR/out.txt");

    let content = fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
    assert_eq!(content, "hi\nhi\n");
}

#[test]
fn test_stdout_redirect_truncates() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("out.txt"), "a much longer previous content\n").unwrap();
    let mut interp = interpreter(&temp_dir);

    run(&mut interp, "echo new > ${DIR}/out.txt");

    let content = fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
    assert_eq!(content, "new\n");
}

#[test]
fn test_append_creates_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut interp = interpreter(&temp_dir);

    run(&mut interp, "echo first >> $DIR/log.txt");

    let content = fs::read_to_string(temp_dir.path().join("log.txt")).unwrap();
    assert_eq!(content, "first\n");
}

#[test]
fn test_stdin_redirect() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("in.txt"), "b\na\n").unwrap();
    let mut interp = interpreter(&temp_dir);

    run(&mut interp, "sort < $DIR/in.txt > $DIR/out.txt");

    let content = fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
    assert_eq!(content, "a\nb\n");
}

#[test]
fn test_output_before_input() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("in.txt"), "b\na\n").unwrap();
    let mut interp = interpreter(&temp_dir);

    run(&mut interp, "sort > $DIR/out.txt < $DIR/in.txt");

    let content = fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
    assert_eq!(content, "a\nb\n");
}

#[test]
fn test_redirect_overrides_pipe() {
    let temp_dir = TempDir::new().unwrap();
    let mut interp = interpreter(&temp_dir);

    let result = run(&mut interp, "echo hi > $DIR/a.txt | cat > $DIR/b.txt");

    assert_eq!(result.exit_code, 0);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("a.txt")).unwrap(),
        "hi\n"
    );
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("b.txt")).unwrap(),
        ""
    );
}

#[test]
fn test_input_redirect_mid_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("in.txt"), "from file\n").unwrap();
    let mut interp = interpreter(&temp_dir);

    run(
        &mut interp,
        "echo from pipe | cat < $DIR/in.txt > $DIR/out.txt",
    );

    let content = fs::read_to_string(temp_dir.path().join("out.txt")).unwrap();
    assert_eq!(content, "from file\n");
}

#[test]
fn test_missing_input_fails_stage_only() {
    let temp_dir = TempDir::new().unwrap();
    let mut interp = interpreter(&temp_dir);

    let result = run(&mut interp, "cat < $DIR/missing.txt");

    assert!(result.started);
    assert!(!result.aborted());
    assert_eq!(result.stages, vec![StageStatus::Exited(1)]);
    assert_eq!(result.exit_code, 1);
}

#[test]
fn test_unwritable_output_fails_stage() {
    let temp_dir = TempDir::new().unwrap();
    let mut interp = interpreter(&temp_dir);

    let result = run(&mut interp, "echo hi > $DIR/no/such/dir/out.txt");
    assert_eq!(result.exit_code, 1);
}

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pipesh::lexer::substitute;
use pipesh::parser::{split_redirects, Parser};
use pipesh::runtime::Runtime;
use std::time::Duration;

/// Substitution and parsing cost per line. Commands are given by path so the
/// numbers do not include PATH directory scans.

fn runtime() -> Runtime {
    let mut runtime = Runtime::new();
    runtime.set_variable("PATH", "/usr/bin:/bin");
    runtime.set_variable("HOME", "/home/bench");
    runtime.set_variable("PATTERN", "error");
    for i in 0..50 {
        runtime.set_variable(format!("VAR_{}", i), format!("value {}", i));
    }
    runtime
}

fn bench_substitution(c: &mut Criterion) {
    let mut group = c.benchmark_group("substitution");
    group.measurement_time(Duration::from_secs(5));
    let runtime = runtime();

    let lines = [
        ("no_references", "/bin/ls -la /tmp | /usr/bin/wc -l > out.txt"),
        ("bare", "/bin/grep $PATTERN $HOME/log.txt"),
        ("braced", "/bin/cat ${HOME}/a ${HOME}/b ${HOME}/c"),
        ("adjacent", "/bin/echo $VAR_$VAR_$VAR_${VAR_1}${VAR_2}"),
    ];

    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| {
                let expansion = substitute(black_box(line), &runtime);
                black_box(expansion);
            });
        });
    }

    group.finish();
}

fn bench_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_line");
    group.measurement_time(Duration::from_secs(5));
    let runtime = runtime();

    let lines = [
        ("comment", "# just a comment"),
        ("assignment", "GREETING = hello world # trailing"),
        ("single", "/bin/ls -la /tmp"),
        (
            "pipeline",
            "/bin/cat < $HOME/in.txt | /usr/bin/sort | /usr/bin/uniq -c >> $HOME/out.txt",
        ),
    ];

    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| {
                let mut parser = Parser::new(&runtime);
                let parsed = parser.parse_line(black_box(line));
                black_box(parsed);
            });
        });
    }

    group.finish();
}

fn bench_split_redirects(c: &mut Criterion) {
    c.bench_function("split_redirects", |b| {
        b.iter(|| {
            let parts = split_redirects(black_box("sort -r -k 2 > out.txt < in.txt"));
            black_box(parts);
        });
    });
}

criterion_group!(
    benches,
    bench_substitution,
    bench_parse_line,
    bench_split_redirects
);
criterion_main!(benches);

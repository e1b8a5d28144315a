use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use modus_core::goal::build::*;
use modus_core::goal::{ConsId, Determinism, Mode, Module, PredDecl, ProcBody, ProcDecl, TypeDefn, VarId};
use tempfile::{tempdir, TempDir};

fn list() -> TypeDefn {
    TypeDefn::new("list", vec![ConsId::functor("[|]", 2), ConsId::atom("[]")])
}

fn body(pred: usize, head: &[u32], typed: &[(u32, &str)], goal: modus_core::goal::Goal) -> ProcBody {
    ProcBody {
        pred,
        proc: 0,
        head_vars: head.iter().map(|v| VarId(*v)).collect(),
        var_names: Default::default(),
        var_types: typed.iter().map(|(v, t)| (VarId(*v), t.to_string())).collect(),
        body: goal,
    }
}

/// `len/2` and `member/2` over lists, plus `broken/1` when asked.
fn module(with_error: bool) -> Module {
    let mut preds = vec![
        PredDecl::new(
            "len",
            vec!["list", "nat"],
            vec![ProcDecl::new(vec![Mode::input(), Mode::output()], Some(Determinism::Det))],
        ),
        PredDecl::new(
            "member",
            vec!["any", "list"],
            vec![ProcDecl::new(vec![Mode::output(), Mode::input()], Some(Determinism::Nondet))],
        ),
    ];
    let mut bodies = vec![
        body(
            0,
            &[0, 1],
            &[(0, "list")],
            disj(vec![
                conj(vec![unify_cons(0, ConsId::atom("[]"), &[]), construct(1, "z", &[])]),
                conj(vec![
                    unify_cons(0, ConsId::functor("[|]", 2), &[2, 3]),
                    call(0, &[3, 4]),
                    construct(1, "s", &[4]),
                ]),
            ]),
        ),
        body(
            1,
            &[0, 1],
            &[(1, "list")],
            disj(vec![
                unify_cons(1, ConsId::functor("[|]", 2), &[0, 2]),
                conj(vec![unify_cons(1, ConsId::functor("[|]", 2), &[3, 4]), call(1, &[0, 4])]),
            ]),
        ),
    ];
    if with_error {
        preds.push(PredDecl::new(
            "broken",
            vec!["any"],
            vec![ProcDecl::new(vec![Mode::output()], Some(Determinism::Det))],
        ));
        bodies.push(body(2, &[0], &[], assign(0, 1)));
    }
    Module { name: "lists".into(), types: vec![list()], preds, bodies }
}

fn write_module(dir: &TempDir, module: &Module) -> PathBuf {
    let path = dir.path().join("lists.json");
    fs::write(&path, serde_json::to_string_pretty(module).expect("serialise module")).expect("write module");
    path
}

fn modus(args: &[&str], file: &Path) -> assert_cmd::assert::Assert {
    Command::cargo_bin("modus")
        .expect("modus binary")
        .args(&args[..1])
        .arg(file)
        .args(&args[1..])
        .assert()
}

#[test]
fn check_clean_module_exits_zero() {
    let td = tempdir().expect("tempdir");
    let file = write_module(&td, &module(false));
    let out = modus(&["check"], &file).success();
    let stderr = String::from_utf8_lossy(&out.get_output().stderr).to_string();
    assert!(stderr.contains("2 procedure(s) passed"), "stderr: {}", stderr);
}

#[test]
fn check_reports_errors_as_json_and_exits_one() {
    let td = tempdir().expect("tempdir");
    let file = write_module(&td, &module(true));
    let out = modus(&["check", "--format", "json"], &file).code(1);
    let stderr = String::from_utf8_lossy(&out.get_output().stderr).to_string();
    let reports: serde_json::Value = serde_json::from_str(&stderr).expect("reports are json");
    let codes: Vec<u64> = reports
        .as_array()
        .expect("array of reports")
        .iter()
        .filter_map(|r| r["code"].as_u64())
        .collect();
    assert!(codes.contains(&104), "codes: {:?}", codes);
}

#[test]
fn build_writes_listing_to_file() {
    let td = tempdir().expect("tempdir");
    let file = write_module(&td, &module(false));
    let listing = td.path().join("lists.txt");
    modus(&["build", "-O", "3", "-o", listing.to_str().expect("utf-8 path")], &file).success();
    let text = fs::read_to_string(&listing).expect("listing written");
    assert!(text.contains("module lists"));
    assert!(text.contains("len/2-0"));
    assert!(text.contains("proceed"));
}

#[test]
fn build_json_is_module_code() {
    let td = tempdir().expect("tempdir");
    let file = write_module(&td, &module(false));
    let out = modus(&["build", "--format", "json", "--opt", "no-licm"], &file).success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    let code: modus_core::ModuleCode = serde_json::from_str(&stdout).expect("module code json");
    assert_eq!(code.name, "lists");
    assert_eq!(code.procs.len(), 2);
}

#[test]
fn unknown_override_is_a_usage_error() {
    let td = tempdir().expect("tempdir");
    let file = write_module(&td, &module(false));
    modus(&["build", "--opt", "no-such-pass"], &file).code(1);
}

#[test]
fn run_enumerates_solutions() {
    let td = tempdir().expect("tempdir");
    let file = write_module(&td, &module(false));
    let out = modus(&["run", "--proc", "member/2", "--arg", "[a, b]"], &file).success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["a", "b"]);

    let out = modus(&["run", "--proc", "len", "--arg", "[a, b]", "-O", "0"], &file).success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert_eq!(stdout.trim(), "s(s(z))");
}

#[test]
fn run_unknown_procedure_fails() {
    let td = tempdir().expect("tempdir");
    let file = write_module(&td, &module(false));
    modus(&["run", "--proc", "nothing"], &file).code(1);
}

#[test]
fn missing_file_is_a_usage_error() {
    let td = tempdir().expect("tempdir");
    modus(&["check"], &td.path().join("absent.json")).code(1);
}

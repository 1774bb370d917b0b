use std::io::Write;
use std::process::{Command, Stdio};

fn dpc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_dpc"))
}

#[test]
fn test_tokens_json() {
    let output = dpc().args(["tokens", "a.b"]).output().unwrap();
    assert!(output.status.success());

    let tokens: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tokens.as_array().unwrap().len(), 3);
    assert_eq!(tokens[0]["type"], "identifier");
    assert_eq!(tokens[1]["text"], ".");
}

#[test]
fn test_parse_json() {
    let output = dpc().args(["parse", "foo.bar[0].yo"]).output().unwrap();
    assert!(output.status.success());

    let compiled: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(compiled["targets"][0]["path"], serde_json::json!(["foo", "bar"]));
    assert_eq!(compiled["constant"], false);
}

#[test]
fn test_parse_error_exits_nonzero() {
    let output = dpc().args(["parse", "a +"]).output().unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Unexpected end of expression"));
    assert!(stderr.contains("<expression>:1:4"));
}

#[test]
fn test_process_stdin() {
    let mut child = dpc()
        .args(["process", "--stdin"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"<p>{name}</p>")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "<p><dp:decorator name=\"text\" type=\"processor\">name</dp:decorator><dp:target></dp:target></p>"
    );
}

#[test]
fn test_process_stdin_json() {
    let mut child = dpc()
        .args(["process", "--stdin", "--json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"[#on:click=form.value go()]")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let compiled: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let decorator = &compiled["decorators"][0];
    assert_eq!(decorator["name"], "on");
    assert_eq!(decorator["type"], "modifier");
    assert_eq!(decorator["label"], "click");
    assert_eq!(decorator["model"], "form.value");
    assert_eq!(decorator["compiled"]["targets"][0]["path"], serde_json::json!(["go"]));
}

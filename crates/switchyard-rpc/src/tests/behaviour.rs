//! Behavioural tests for inbound dispatch using `rstest-bdd`.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use crate::InitializeGate;
use crate::tests::support::{
    CallKind, RecordingServer, TestWorld, definition_location, definition_params,
};

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new(
        RecordingServer::new(),
        InitializeGate::Strict,
        false,
    ))
}

fn definition_request(id: i32) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "textDocument/definition",
        "params": definition_params(),
    })
}

fn initialize_request(id: i32) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {"capabilities": {}},
    })
}

#[given("a strict server")]
fn given_strict_server(world: &RefCell<TestWorld>) {
    *world.borrow_mut() = TestWorld::new(RecordingServer::new(), InitializeGate::Strict, false);
}

#[given("a fallback-terminated strict server")]
fn given_fallback_server(world: &RefCell<TestWorld>) {
    *world.borrow_mut() = TestWorld::new(RecordingServer::new(), InitializeGate::Strict, true);
}

#[given("a permissive server")]
fn given_permissive_server(world: &RefCell<TestWorld>) {
    *world.borrow_mut() =
        TestWorld::new(RecordingServer::new(), InitializeGate::Permissive, false);
}

#[given("the server is initialized")]
fn given_initialized(world: &RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.send(&initialize_request(100));
    world.send(&json!({"jsonrpc": "2.0", "method": "initialized", "params": {}}));
}

#[given("the connection is cancelled")]
fn given_cancelled(world: &RefCell<TestWorld>) {
    world.borrow().token.cancel();
}

#[when("the client sends initialize with id {id}")]
fn when_initialize(world: &RefCell<TestWorld>, id: i32) {
    world.borrow_mut().send(&initialize_request(id));
}

#[when("the client sends request \"{method}\" with id {id}")]
fn when_request(world: &RefCell<TestWorld>, method: String, id: i32) {
    world
        .borrow_mut()
        .send(&json!({"jsonrpc": "2.0", "id": id, "method": method}));
}

#[when("the client sends notification \"{method}\"")]
fn when_notification(world: &RefCell<TestWorld>, method: String) {
    world
        .borrow_mut()
        .send(&json!({"jsonrpc": "2.0", "method": method}));
}

#[when("the client sends a definition request with id {id}")]
fn when_definition(world: &RefCell<TestWorld>, id: i32) {
    world.borrow_mut().send(&definition_request(id));
}

#[when("the client sends a definition request with malformed params")]
fn when_malformed_definition(world: &RefCell<TestWorld>) {
    world.borrow_mut().send(&json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "textDocument/definition",
        "params": {"textDocument": 17},
    }));
}

#[when("the client sends a did open notification")]
fn when_did_open(world: &RefCell<TestWorld>) {
    world.borrow_mut().send(&json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didOpen",
        "params": {
            "textDocument": {
                "uri": "file:///workspace/main.rs",
                "languageId": "rust",
                "version": 1,
                "text": "fn main() {}"
            }
        },
    }));
}

#[when("the client sends malformed bytes")]
fn when_malformed_bytes(world: &RefCell<TestWorld>) {
    world.borrow_mut().send_bytes(b"{\"jsonrpc\": \"2.0\", \"id\": 1,");
}

#[then("the reply to {id} carries server capabilities")]
fn then_capabilities(world: &RefCell<TestWorld>, id: i32) {
    let world = world.borrow();
    let reply = world.last_reply.as_ref().expect("reply missing");
    assert_eq!(reply["id"], json!(id));
    assert_eq!(reply["result"]["capabilities"]["definitionProvider"], json!(true));
}

#[then("the reply to {id} is a single location")]
fn then_single_location(world: &RefCell<TestWorld>, id: i32) {
    let world = world.borrow();
    let reply = world.last_reply.as_ref().expect("reply missing");
    assert_eq!(reply["id"], json!(id));
    let expected = serde_json::to_value(definition_location()).expect("location encodes");
    assert_eq!(reply["result"], expected);
}

#[then("the reply carries error code {code}")]
fn then_error_code(world: &RefCell<TestWorld>, code: i64) {
    assert_eq!(world.borrow().last_error_code(), Some(code));
}

#[then("the reply id is null")]
fn then_reply_id_null(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let reply = world.last_reply.as_ref().expect("reply missing");
    assert_eq!(reply["id"], Value::Null);
}

#[then("the message is not handled")]
fn then_not_handled(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let outcome = world.last_dispatch.as_ref().expect("message was dispatched");
    assert!(!outcome.is_handled());
}

#[then("no reply is owed")]
fn then_no_reply(world: &RefCell<TestWorld>) {
    assert!(world.borrow().last_reply.is_none());
}

#[then("the lifecycle is \"{state}\"")]
fn then_lifecycle(world: &RefCell<TestWorld>, state: String) {
    assert_eq!(world.borrow().lifecycle.state().to_string(), state);
}

#[then("the exit code is {code}")]
fn then_exit_code(world: &RefCell<TestWorld>, code: i32) {
    assert_eq!(world.borrow().lifecycle.exit_code(), Some(code));
}

#[then("the server recorded an initialize call")]
fn then_recorded_initialize(world: &RefCell<TestWorld>) {
    assert!(world.borrow().server.recorded(CallKind::Initialize));
}

#[then("the server recorded no definition call")]
fn then_no_definition(world: &RefCell<TestWorld>) {
    assert!(!world.borrow().server.recorded(CallKind::Definition));
}

#[then("the server recorded no did open call")]
fn then_no_did_open(world: &RefCell<TestWorld>) {
    assert!(!world.borrow().server.recorded(CallKind::DidOpen));
}

#[scenario(path = "tests/features/dispatch.feature")]
fn dispatch_behaviour(#[from(world)] _: RefCell<TestWorld>) {}

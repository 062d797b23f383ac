//! Browser tests, run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use assembler_wasm::Miner;
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn params(target: &str) -> JsValue {
    let params = js_sys::Object::new();
    js_sys::Reflect::set(&params, &"payout".into(), &"miner".into()).unwrap();
    js_sys::Reflect::set(&params, &"height".into(), &JsValue::from(0)).unwrap();
    js_sys::Reflect::set(&params, &"time".into(), &JsValue::from(1_700_000_000u32)).unwrap();
    js_sys::Reflect::set(&params, &"target".into(), &target.into()).unwrap();
    params.into()
}

fn record(txid: &str, hex: &str, fee: i32) -> JsValue {
    let record = js_sys::Object::new();
    js_sys::Reflect::set(&record, &"txid".into(), &txid.into()).unwrap();
    js_sys::Reflect::set(&record, &"hex".into(), &hex.into()).unwrap();
    js_sys::Reflect::set(&record, &"fee".into(), &JsValue::from(fee)).unwrap();
    record.into()
}

#[wasm_bindgen_test]
fn rejects_missing_payout() {
    assert!(Miner::new(js_sys::Object::new().into()).is_err());
}

#[wasm_bindgen_test]
fn mines_block_with_max_target() {
    let mut miner = Miner::new(params(&"ff".repeat(32))).unwrap();

    let records = js_sys::Array::new();
    records.push(&record(&"11".repeat(32), "0100", 1000));
    records.push(&record("not-a-txid", "0100", 1000));
    assert_eq!(miner.load_candidates(records.into()).unwrap(), 1);

    let reject_all = js_sys::Function::new_with_args("hex", "return false;");
    miner.prepare(Some(reject_all)).unwrap();
    miner.mine_batch(16).unwrap();

    let out = miner.get_out_text().unwrap();
    // Header, coinbase and a single coinbase txid
    assert_eq!(out.lines().count(), 3);
}

#[wasm_bindgen_test]
fn first_winning_nonce_is_kept() {
    let mut miner = Miner::new(params(&"ff".repeat(32))).unwrap();
    miner.prepare(None).unwrap();

    miner.mine_batch(16).unwrap();
    let first = miner.get_out_text().unwrap();

    // A found block is terminal: later batches hash nothing and keep nonce 0
    let again = miner.mine_batch(16).unwrap();
    let hashes = js_sys::Reflect::get(&again, &"hashes_computed".into()).unwrap();
    assert_eq!(hashes.as_f64(), Some(0.0));
    let nonce = js_sys::Reflect::get(&again, &"nonce".into()).unwrap();
    assert_eq!(nonce.as_f64(), Some(0.0));

    let out = miner.get_out_text().unwrap();
    assert_eq!(out, first);
    let header = out.lines().next().unwrap();
    assert!(header.ends_with("00000000"));

    let stats = miner.get_stats().unwrap();
    let total = js_sys::Reflect::get(&stats, &"total_hashes".into()).unwrap();
    assert_eq!(total.as_f64(), Some(1.0));
}

#[wasm_bindgen_test]
fn exhausts_search_window() {
    let params = params("01");
    let limits = js_sys::Object::new();
    js_sys::Reflect::set(&limits, &"max_attempts".into(), &JsValue::from(64)).unwrap();
    js_sys::Reflect::set(&params, &"limits".into(), &limits).unwrap();

    let mut miner = Miner::new(params).unwrap();
    miner.prepare(None).unwrap();

    // A target of 1 is met only by the zero hash
    miner.mine_batch(48).unwrap();
    miner.mine_batch(48).unwrap();
    assert!(miner.get_out_text().is_none());
    assert!(miner.mine_batch(1).is_err());

    let stats = miner.get_stats().unwrap();
    let hashes = js_sys::Reflect::get(&stats, &"total_hashes".into()).unwrap();
    assert_eq!(hashes.as_f64(), Some(64.0));
}

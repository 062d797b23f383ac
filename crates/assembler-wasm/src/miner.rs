//! Block assembly controller for the WASM build.

use assembler_core::{
    difficulty::{bits_to_difficulty, expected_hashes, format_difficulty},
    hash::hash_to_display_hex,
    miner::NONCE_SPACE,
    search_batch, AcceptAll, BlockArtifact, BlockAssembler, BlockParams, Error, Hash256,
    PreparedBlock, RawTransactionRecord, SignatureVerifier, TransactionRecord, VerifyError,
};
use wasm_bindgen::prelude::*;

use crate::state::{MiningResultInfo, MiningStats, TemplateInfo};

const SATS_PER_BTC: f64 = 100_000_000.0;

/// Signature verifier backed by a JavaScript callback taking the raw hex.
struct JsVerifier<'a>(&'a js_sys::Function);

impl SignatureVerifier for JsVerifier<'_> {
    fn verify(&self, raw_tx_hex: &str) -> Result<bool, VerifyError> {
        self.0
            .call1(&JsValue::NULL, &JsValue::from_str(raw_tx_hex))
            .map(|verdict| verdict.is_truthy())
            .map_err(|e| VerifyError(format!("{:?}", e)))
    }
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// The main assembly controller.
#[wasm_bindgen]
pub struct Miner {
    /// Validated block parameters.
    assembler: BlockAssembler,
    /// Candidates loaded from JavaScript.
    candidates: Vec<TransactionRecord>,
    /// The block being mined.
    prepared: Option<PreparedBlock>,
    /// The finished block, once a nonce is found.
    artifact: Option<BlockArtifact>,
    /// Mining statistics.
    stats: MiningStats,
    /// Start time of mining.
    start_time: f64,
    /// Whether mining is active.
    is_mining: bool,
    /// Next nonce to try, widened so the end of the nonce space is representable.
    next_nonce: u64,
    /// Nonces left in the search window.
    remaining: u64,
    /// Winning nonce and hash; once set the search is over.
    winner: Option<(u32, Hash256)>,
}

#[wasm_bindgen]
impl Miner {
    /// Create a new miner from block parameters.
    ///
    /// `params` is an object with the `BlockParams` fields; only `payout` is
    /// required. A zero `time` is replaced with the current time.
    #[wasm_bindgen(constructor)]
    pub fn new(params: JsValue) -> Result<Miner, JsValue> {
        let mut params: BlockParams = serde_wasm_bindgen::from_value(params)
            .map_err(|e| JsValue::from_str(&format!("Invalid parameters: {}", e)))?;

        if params.time == 0 {
            params.time = (js_sys::Date::now() / 1000.0) as u32;
        }

        let assembler = BlockAssembler::new(params).map_err(js_error)?;
        let remaining = assembler.params().limits.effective_attempts();
        let next_nonce = u64::from(assembler.params().limits.start_nonce);

        Ok(Miner {
            assembler,
            candidates: Vec::new(),
            prepared: None,
            artifact: None,
            stats: MiningStats::new(),
            start_time: 0.0,
            is_mining: false,
            next_nonce,
            remaining,
            winner: None,
        })
    }

    /// Load candidate transactions.
    ///
    /// `records` is an array of `{ txid, hex, fee }` objects. Records that fail
    /// validation are skipped and reported on the console. Returns the number
    /// of candidates kept.
    #[wasm_bindgen]
    pub fn load_candidates(&mut self, records: JsValue) -> Result<usize, JsValue> {
        let raw: Vec<RawTransactionRecord> = serde_wasm_bindgen::from_value(records)
            .map_err(|e| JsValue::from_str(&format!("Invalid transaction records: {}", e)))?;

        self.candidates = raw
            .into_iter()
            .filter_map(|record| {
                let txid = record.txid.clone();
                match TransactionRecord::try_from(record) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        console_log(&format!("skipping transaction {}: {}", txid, e));
                        None
                    }
                }
            })
            .collect();

        Ok(self.candidates.len())
    }

    /// Select transactions, build the coinbase and the header to mine.
    ///
    /// `verifier` is called with each candidate's raw hex and must return a
    /// truthy value for valid transactions. Without one, every candidate is
    /// accepted.
    #[wasm_bindgen]
    pub fn prepare(&mut self, verifier: Option<js_sys::Function>) -> Result<JsValue, JsValue> {
        let prepared = match &verifier {
            Some(function) => self.assembler.prepare(&self.candidates, &JsVerifier(function)),
            None => self.assembler.prepare(&self.candidates, &AcceptAll),
        }
        .map_err(js_error)?;

        let params = self.assembler.params();
        let difficulty = bits_to_difficulty(params.bits);
        let reward = prepared.reward();

        let info = TemplateInfo {
            height: params.height,
            prev_hash: params.prev_block_hash.clone(),
            bits: params.bits,
            target: self.assembler.target().to_string(),
            difficulty,
            difficulty_display: format_difficulty(difficulty),
            expected_hashes: expected_hashes(self.assembler.target()),
            candidates: self.candidates.len(),
            selected: prepared.transactions.len(),
            fees: prepared.fees,
            reward,
            reward_btc: reward as f64 / SATS_PER_BTC,
            merkle_root: hash_to_display_hex(&prepared.header.merkle_root),
            coinbase_txid: prepared.coinbase.txid_display(),
        };

        let limits = params.limits;
        self.prepared = Some(prepared);
        self.artifact = None;
        self.next_nonce = u64::from(limits.start_nonce);
        self.remaining = limits.effective_attempts();
        self.stats = MiningStats::new();
        self.stats.current_nonce = limits.start_nonce;
        self.winner = None;

        info.to_js()
    }

    /// Mine a batch of nonces.
    ///
    /// Fails once the search window is used up without a winning nonce.
    /// After a block is found no more nonces are tried and the winning
    /// result is returned again.
    #[wasm_bindgen]
    pub fn mine_batch(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| JsValue::from_str("No block prepared"))?;

        if let Some((nonce, hash)) = self.winner {
            return MiningResultInfo::found(nonce, &hash, 0).to_js();
        }

        if self.remaining == 0 || self.next_nonce >= NONCE_SPACE {
            self.stats.exhausted = true;
            let attempts = self.assembler.params().limits.effective_attempts();
            return Err(js_error(Error::SearchExhausted { attempts }));
        }

        let count = u64::from(batch_size).min(self.remaining) as u32;
        let header_without_nonce = prepared.header.serialize_without_nonce();
        let result = search_batch(
            &header_without_nonce,
            &prepared.target,
            self.next_nonce as u32,
            count,
        );

        // Update statistics
        self.stats.total_hashes += result.hashes_computed;
        self.remaining -= result.hashes_computed;
        self.next_nonce += result.hashes_computed;
        self.stats.current_nonce = self.next_nonce.min(u64::from(u32::MAX)) as u32;
        self.stats.exhausted = self.remaining == 0 || self.next_nonce >= NONCE_SPACE;

        if self.start_time > 0.0 {
            self.stats.elapsed_ms = js_sys::Date::now() - self.start_time;
            self.stats.update_hash_rate();
        }

        let info = match result.found {
            Some((nonce, hash)) => {
                let info = MiningResultInfo::found(nonce, &hash, result.hashes_computed);
                self.winner = Some((nonce, hash));
                self.stats.block_found = true;
                self.stats.block_hash = info.hash.clone();
                self.stats.leading_zeros = info.leading_zeros;
                self.artifact = Some(prepared.finish(nonce));
                self.is_mining = false;
                info
            }
            None => MiningResultInfo::not_found(result.hashes_computed),
        };

        info.to_js()
    }

    /// Start mining.
    #[wasm_bindgen]
    pub fn start_mining(&mut self) {
        self.is_mining = true;
        self.start_time = js_sys::Date::now();
    }

    /// Stop mining.
    #[wasm_bindgen]
    pub fn stop_mining(&mut self) {
        self.is_mining = false;
    }

    /// Check if mining is active.
    #[wasm_bindgen(getter)]
    pub fn is_mining(&self) -> bool {
        self.is_mining
    }

    /// Get current mining statistics.
    #[wasm_bindgen]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        self.stats.to_js()
    }

    /// Get the formatted hash rate.
    #[wasm_bindgen]
    pub fn get_hash_rate_display(&self) -> String {
        self.stats.format_hash_rate()
    }

    /// The finished block as `{ header, coinbase_tx, txids }`, or `undefined`.
    #[wasm_bindgen]
    pub fn get_artifact(&self) -> Result<JsValue, JsValue> {
        match &self.artifact {
            Some(artifact) => serde_wasm_bindgen::to_value(artifact)
                .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e))),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// The finished block in the line-oriented output file layout.
    #[wasm_bindgen]
    pub fn get_out_text(&self) -> Option<String> {
        self.artifact.as_ref().map(ToString::to_string)
    }

    /// Drop the prepared block and any result, keeping parameters and candidates.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        let limits = self.assembler.params().limits;
        self.prepared = None;
        self.artifact = None;
        self.stats = MiningStats::new();
        self.next_nonce = u64::from(limits.start_nonce);
        self.remaining = limits.effective_attempts();
        self.start_time = 0.0;
        self.is_mining = false;
        self.winner = None;
    }

    /// Block height being assembled.
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.assembler.params().height
    }

    /// The payout identity.
    #[wasm_bindgen(getter)]
    pub fn payout(&self) -> String {
        self.assembler.params().payout.clone()
    }
}

/// Log to the browser console.
#[wasm_bindgen]
pub fn console_log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

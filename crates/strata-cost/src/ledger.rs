// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory cost ledger.
//!
//! Every provider attempt that reports token usage becomes one [`CostRecord`].
//! Records are append-only and never mutated; the oldest are evicted once
//! `max_retained` is exceeded, while the running totals keep counting.
//! Recording never fails: missing pricing is logged and costed at zero.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use strata_core::{ModelPricing, RequestId, Tier, TokenUsage};
use strum::Display;
use tracing::{debug, warn};

use crate::pricing::calculate_cost;

/// Whether the attempt produced the response or failed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// A single cost record representing one provider attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    /// Unique record identifier (UUID v4).
    pub id: String,
    pub request_id: RequestId,
    pub tenant_id: String,
    pub provider_id: String,
    pub tier: Tier,
    /// Model that served (or was asked to serve) the attempt.
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Calculated cost in USD; zero when pricing is unknown.
    pub cost_usd: f64,
    /// Wall time of the attempt in milliseconds.
    pub latency_ms: u64,
    pub outcome: AttemptOutcome,
    /// ISO 8601 timestamp.
    pub created_at: String,
}

/// Input to [`CostLedger::record`].
#[derive(Debug, Clone)]
pub struct CostEntry {
    pub request_id: RequestId,
    pub tenant_id: String,
    pub provider_id: String,
    pub tier: Tier,
    pub model: String,
    pub usage: TokenUsage,
    /// `None` when neither config nor adapter knows the price.
    pub pricing: Option<ModelPricing>,
    pub latency_ms: u64,
    pub outcome: AttemptOutcome,
}

/// Accumulated usage for one grouping key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostTotals {
    pub records: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl CostTotals {
    fn add(&mut self, record: &CostRecord) {
        self.records += 1;
        self.input_tokens += u64::from(record.input_tokens);
        self.output_tokens += u64::from(record.output_tokens);
        self.cost_usd += record.cost_usd;
    }
}

/// All running totals, copied out of the ledger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerTotals {
    pub overall: CostTotals,
    pub by_provider: BTreeMap<String, CostTotals>,
    pub by_tier: BTreeMap<Tier, CostTotals>,
    pub by_tenant: BTreeMap<String, CostTotals>,
}

#[derive(Debug)]
struct LedgerState {
    records: VecDeque<CostRecord>,
    max_retained: usize,
    overall: CostTotals,
    by_provider: HashMap<String, CostTotals>,
    by_tier: BTreeMap<Tier, CostTotals>,
    by_tenant: HashMap<String, CostTotals>,
}

impl LedgerState {
    fn evict_overflow(&mut self) {
        while self.records.len() > self.max_retained {
            self.records.pop_front();
        }
    }
}

/// Append-only ledger shared by all in-flight requests.
#[derive(Debug)]
pub struct CostLedger {
    state: Mutex<LedgerState>,
}

impl CostLedger {
    /// Create a ledger retaining at most `max_retained` records.
    pub fn new(max_retained: usize) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                records: VecDeque::new(),
                max_retained: max_retained.max(1),
                overall: CostTotals::default(),
                by_provider: HashMap::new(),
                by_tier: BTreeMap::new(),
                by_tenant: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the retention cap, evicting immediately if it shrank.
    pub fn set_max_retained(&self, max_retained: usize) {
        let mut state = self.lock();
        if state.max_retained != max_retained {
            state.max_retained = max_retained.max(1);
            state.evict_overflow();
        }
    }

    /// Cost an attempt and append it. Identical entries yield separate records.
    pub fn record(&self, entry: CostEntry) -> CostRecord {
        let cost_usd = match &entry.pricing {
            Some(pricing) => calculate_cost(&entry.usage, pricing),
            None => {
                warn!(
                    provider = %entry.provider_id,
                    model = %entry.model,
                    "no pricing known for model, recording zero cost"
                );
                0.0
            }
        };

        let record = CostRecord {
            id: uuid::Uuid::new_v4().to_string(),
            request_id: entry.request_id,
            tenant_id: entry.tenant_id,
            provider_id: entry.provider_id,
            tier: entry.tier,
            model: entry.model,
            input_tokens: entry.usage.input_tokens,
            output_tokens: entry.usage.output_tokens,
            cost_usd,
            latency_ms: entry.latency_ms,
            outcome: entry.outcome,
            created_at: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
        };

        debug!(
            request_id = %record.request_id,
            provider = %record.provider_id,
            tier = %record.tier,
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            cost_usd = record.cost_usd,
            outcome = %record.outcome,
            "cost recorded"
        );

        let mut state = self.lock();
        state.overall.add(&record);
        state
            .by_provider
            .entry(record.provider_id.clone())
            .or_default()
            .add(&record);
        state.by_tier.entry(record.tier).or_default().add(&record);
        state
            .by_tenant
            .entry(record.tenant_id.clone())
            .or_default()
            .add(&record);
        state.records.push_back(record.clone());
        state.evict_overflow();

        record
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> Vec<CostRecord> {
        self.lock().records.iter().cloned().collect()
    }

    /// Retained records belonging to one request, in attempt order.
    pub fn records_for_request(&self, request_id: &RequestId) -> Vec<CostRecord> {
        self.lock()
            .records
            .iter()
            .filter(|r| &r.request_id == request_id)
            .cloned()
            .collect()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Total cost over every record ever written, including evicted ones.
    pub fn total_usd(&self) -> f64 {
        self.lock().overall.cost_usd
    }

    pub fn totals(&self) -> LedgerTotals {
        let state = self.lock();
        LedgerTotals {
            overall: state.overall,
            by_provider: state
                .by_provider
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            by_tier: state.by_tier.clone(),
            by_tenant: state
                .by_tenant
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }
}

impl Default for CostLedger {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(provider: &str, tier: Tier, input: u32, output: u32) -> CostEntry {
        CostEntry {
            request_id: RequestId("req-1".into()),
            tenant_id: "tenant-a".into(),
            provider_id: provider.into(),
            tier,
            model: "claude-sonnet-4-20250514".into(),
            usage: TokenUsage {
                input_tokens: input,
                output_tokens: output,
            },
            pricing: Some(ModelPricing::new(0.003, 0.015)),
            latency_ms: 120,
            outcome: AttemptOutcome::Success,
        }
    }

    #[test]
    fn record_computes_cost() {
        let ledger = CostLedger::default();
        let rec = ledger.record(entry("sonnet", Tier::Standard, 1000, 1000));
        assert!((rec.cost_usd - 0.018).abs() < 1e-12);
        assert_eq!(rec.tier, Tier::Standard);
        assert!(!rec.id.is_empty());
        assert!(!rec.created_at.is_empty());
    }

    #[test]
    fn identical_entries_are_not_merged() {
        let ledger = CostLedger::default();
        let a = ledger.record(entry("sonnet", Tier::Standard, 400, 100));
        let b = ledger.record(entry("sonnet", Tier::Standard, 400, 100));
        assert_ne!(a.id, b.id);
        assert_eq!(a.cost_usd, b.cost_usd);
        assert_eq!(ledger.len(), 2);
    }

    #[tracing_test::traced_test]
    #[test]
    fn missing_pricing_records_zero_and_warns() {
        let ledger = CostLedger::default();
        let mut e = entry("mystery", Tier::Fast, 500, 500);
        e.pricing = None;
        let rec = ledger.record(e);
        assert_eq!(rec.cost_usd, 0.0);
        assert_eq!(rec.input_tokens, 500);
        assert!(logs_contain("no pricing known for model"));
    }

    #[test]
    fn totals_group_by_provider_tier_and_tenant() {
        let ledger = CostLedger::default();
        ledger.record(entry("a", Tier::Fast, 1000, 0));
        ledger.record(entry("a", Tier::Fast, 1000, 0));
        let mut other = entry("b", Tier::Deep, 0, 1000);
        other.tenant_id = "tenant-b".into();
        ledger.record(other);

        let totals = ledger.totals();
        assert_eq!(totals.overall.records, 3);
        assert_eq!(totals.by_provider["a"].input_tokens, 2000);
        assert_eq!(totals.by_tier[&Tier::Deep].output_tokens, 1000);
        assert_eq!(totals.by_tenant["tenant-b"].records, 1);
        assert!((ledger.total_usd() - (0.006 + 0.015)).abs() < 1e-12);
    }

    #[test]
    fn eviction_keeps_totals() {
        let ledger = CostLedger::new(2);
        for _ in 0..5 {
            ledger.record(entry("a", Tier::Fast, 1000, 0));
        }
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.totals().overall.records, 5);

        ledger.set_max_retained(1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn records_for_request_filters() {
        let ledger = CostLedger::default();
        ledger.record(entry("a", Tier::Fast, 1, 1));
        let mut other = entry("b", Tier::Fast, 1, 1);
        other.request_id = RequestId("req-2".into());
        ledger.record(other);

        let recs = ledger.records_for_request(&RequestId("req-2".into()));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].provider_id, "b");
    }

    #[test]
    fn record_serializes() {
        let ledger = CostLedger::default();
        let rec = ledger.record(entry("a", Tier::Deep, 1, 1));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["tier"], "deep");
        assert_eq!(json["outcome"], "success");
    }
}

//! FundamentalSnapshot — company fundamentals for the valuation strategies.

use serde::{Deserialize, Serialize};

/// Point-in-time fundamental data for one company.
///
/// Every field is optional: an absent value means "unknown", never zero.
/// The fundamentals-driven strategies check the fields they need and fall
/// back to a Hold signal when any are missing. Growth rates and margins are
/// fractional (0.15 = 15%), not percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub pe_ratio: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub revenue: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub capital_expenditures: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub market_cap: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub profit_margin: Option<f64>,
}

impl FundamentalSnapshot {
    /// Owner earnings: operating cash flow minus capital expenditures.
    /// Falls back to free cash flow when capex is unknown. None when
    /// neither composition is available.
    pub fn owner_earnings(&self) -> Option<f64> {
        match (self.operating_cash_flow, self.capital_expenditures) {
            (Some(ocf), Some(capex)) => Some(ocf - capex.abs()),
            _ => self.free_cash_flow,
        }
    }

    /// PEG ratio, computed from P/E and earnings growth when the reported
    /// field is absent. Growth at or below zero yields None (undefined).
    pub fn effective_peg(&self) -> Option<f64> {
        if let Some(peg) = self.peg_ratio {
            return Some(peg);
        }
        let pe = self.pe_ratio?;
        let growth = self.earnings_growth?;
        if growth <= 0.0 {
            return None;
        }
        // PEG convention divides P/E by the growth rate in percent.
        Some(pe / (growth * 100.0))
    }
}

//! Risk converter: qualitative guidance in, numeric plan out.

pub mod converter;
pub mod instrument;
pub mod parsing;

pub use converter::{
    LotSizing, RiskConverter, RiskDecision, RiskRejection, RiskStage, StopLoss, StopSource,
    Targets, TradeRiskInput,
};
pub use instrument::{HARD_MAX_LOTS, Instrument, InstrumentTable, RiskParams, StopFallback};

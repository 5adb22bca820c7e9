//! Investment parameter extraction
//!
//! Amount, time horizon and risk tolerance are each resolved by an
//! independent scan over the whole utterance, so phrase order never matters.
//! Anything not mentioned falls back to the `InvestmentParameters` default.

use regex::Regex;

use crate::models::{InvestmentParameters, RiskTolerance, TimeHorizon};
use crate::Result;

const NUMBER: &str = r"\d[\d,]*(?:\.\d+)?";

pub struct InvestmentExtractor {
    amount: Regex,
    horizon: Regex,
    risk: Regex,
}

impl InvestmentExtractor {
    pub fn new() -> Result<Self> {
        let amount = Regex::new(&format!(
            r"(?i)(?P<dollar>\$)?\s*(?P<number>{NUMBER})\s*(?:(?P<million>millions?|triệu|tr)\b|(?P<thousand>thousand|nghìn|ngàn|k)\b|(?P<currency>dollars?|usd|vnd|đồng|đ)\b|(?P<suffix>\$))?"
        ))?;

        let horizon = Regex::new(
            r"(?i)\b(?P<term>short|medium|mid|long)[\s-]?term\b|(?P<han>ngắn|trung|dài)\s+hạn",
        )?;

        let risk = Regex::new(
            r"(?i)\b(?P<risk>conservative|moderate|aggressive|low[\s-]risk|high[\s-]risk|an toàn|thận trọng|vừa phải|mạo hiểm)\b",
        )?;

        Ok(Self {
            amount,
            horizon,
            risk,
        })
    }

    pub fn extract(&self, utterance: &str) -> InvestmentParameters {
        InvestmentParameters {
            amount: self.amount(utterance),
            time_horizon: self.time_horizon(utterance),
            risk_tolerance: self.risk_tolerance(utterance),
        }
    }

    /// First number carrying a `$` or a unit; 0 when absent
    fn amount(&self, text: &str) -> f64 {
        let Some(caps) = self.amount.captures_iter(text).find(|caps| {
            ["dollar", "million", "thousand", "currency", "suffix"]
                .iter()
                .any(|group| caps.name(group).is_some())
        }) else {
            return 0.0;
        };

        let token = caps.name("number").map(|m| m.as_str()).unwrap_or_default();

        let multiplier = if caps.name("million").is_some() {
            1_000_000.0
        } else if caps.name("thousand").is_some() {
            1_000.0
        } else {
            1.0
        };

        let cleaned: String = token.chars().filter(|c| *c != ',').collect();
        cleaned
            .parse::<f64>()
            .map(|value| value * multiplier)
            .unwrap_or(0.0)
    }

    fn time_horizon(&self, text: &str) -> TimeHorizon {
        let Some(caps) = self.horizon.captures(text) else {
            return TimeHorizon::default();
        };

        let word = caps
            .name("term")
            .or_else(|| caps.name("han"))
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();

        match word.as_str() {
            "short" | "ngắn" => TimeHorizon::ShortTerm,
            "long" | "dài" => TimeHorizon::LongTerm,
            _ => TimeHorizon::MediumTerm,
        }
    }

    fn risk_tolerance(&self, text: &str) -> RiskTolerance {
        let Some(caps) = self.risk.captures(text) else {
            return RiskTolerance::default();
        };

        let word = caps
            .name("risk")
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();

        if word == "conservative"
            || word.starts_with("low")
            || word == "an toàn"
            || word == "thận trọng"
        {
            RiskTolerance::Conservative
        } else if word == "aggressive" || word.starts_with("high") || word == "mạo hiểm" {
            RiskTolerance::Aggressive
        } else {
            RiskTolerance::Moderate
        }
    }
}
